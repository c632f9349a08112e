use crate::metrics::Metric;
use crate::motif::MotifModel;
use ndarray::Array2;
use std::collections::BTreeMap;

/// Represents a Position Probability Matrix
/// One row per motif position, columns A, C, G, T
pub type ProbabilityMatrix = Array2<f64>;

/// Motifs in the order they were read
pub type MotifCollection = Vec<MotifModel>;

/// One pooled occupancy score per dataset entry, in dataset order
pub type ScoreVector = Vec<f64>;

/// Metric values keyed by metric, ordered as the metrics are declared
pub type MetricReport = BTreeMap<Metric, f64>;
