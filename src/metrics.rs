//! Agreement metrics between predicted occupancies and measured intensities.
//!
//! Three families share one prediction vector: Pearson correlation on raw or
//! transformed values, AUC after splitting the measurements into bound and
//! unbound probes, and Pearson correlation of per-8-mer means.

use crate::dataset::Dataset;
use crate::error::{MotifError, Result};
use crate::sequence::canonical_kmer;
use crate::types::MetricReport;
use log::debug;
use phf::phf_map;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Length of the k-mers aggregated by `MERS` and `LOGMERS`
pub const MER_LENGTH: usize = 8;

/// Upper bound on the number of positives of the AUC split
pub const POSITIVE_CAP: usize = 50;

/// Standard deviations above the mean at which a probe counts as bound
pub const SD_FACTOR: f64 = 4.0;

/// Selectable evaluation metrics
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Metric {
    /// Pearson correlation of intensities and log-occupancy
    Asis,
    /// Pearson correlation of intensities and occupancy
    Exp,
    /// Pearson correlation of log-intensities and log-occupancy
    Log,
    /// AUC-ROC
    Roc,
    /// AUC-PR
    Pr,
    /// AUC-ROC on log-intensities
    RocLog,
    /// AUC-PR on log-intensities
    PrLog,
    /// Pearson correlation of per-8-mer means
    Mers,
    /// Pearson correlation of per-8-mer means of log-intensities
    LogMers,
}

static METRIC_NAMES: phf::Map<&'static str, Metric> = phf_map! {
    "ASIS" => Metric::Asis,
    "EXP" => Metric::Exp,
    "LOG" => Metric::Log,
    "ROC" => Metric::Roc,
    "PR" => Metric::Pr,
    "ROCLOG" => Metric::RocLog,
    "PRLOG" => Metric::PrLog,
    "MERS" => Metric::Mers,
    "LOGMERS" => Metric::LogMers,
};

impl Metric {
    pub const ALL: [Metric; 9] = [
        Metric::Asis,
        Metric::Exp,
        Metric::Log,
        Metric::Roc,
        Metric::Pr,
        Metric::RocLog,
        Metric::PrLog,
        Metric::Mers,
        Metric::LogMers,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Asis => "ASIS",
            Metric::Exp => "EXP",
            Metric::Log => "LOG",
            Metric::Roc => "ROC",
            Metric::Pr => "PR",
            Metric::RocLog => "ROCLOG",
            Metric::PrLog => "PRLOG",
            Metric::Mers => "MERS",
            Metric::LogMers => "LOGMERS",
        }
    }
}

impl FromStr for Metric {
    type Err = MotifError;

    fn from_str(s: &str) -> Result<Self> {
        METRIC_NAMES
            .get(s.trim().to_ascii_uppercase().as_str())
            .copied()
            .ok_or_else(|| MotifError::invalid_parameter("metric", s, "unknown metric"))
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Metrics requested for one evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricSelection {
    /// One metric, reported as a bare number
    Single(Metric),
    /// `all` or a comma-separated list, reported as a record
    Many(Vec<Metric>),
}

impl MetricSelection {
    pub fn metrics(&self) -> &[Metric] {
        match self {
            MetricSelection::Single(metric) => std::slice::from_ref(metric),
            MetricSelection::Many(metrics) => metrics,
        }
    }
}

impl FromStr for MetricSelection {
    type Err = MotifError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(MetricSelection::Many(Metric::ALL.to_vec()));
        }
        if s.contains(',') {
            let metrics = s
                .split(',')
                .map(str::parse)
                .collect::<Result<Vec<Metric>>>()?;
            return Ok(MetricSelection::Many(metrics));
        }
        Ok(MetricSelection::Single(s.parse()?))
    }
}

fn is_constant(xs: &[f64]) -> bool {
    xs.iter().all(|&x| x == xs[0])
}

/// Pearson product-moment correlation coefficient between `x` and `y`.
///
/// # Errors
/// * `MotifError::InvalidInput` - If the lengths differ or a value is NaN or infinite
/// * `MotifError::EmptyInput` - If there are fewer than 2 observations
/// * `MotifError::ZeroVariance` - If either series is constant
pub fn pearson(x: &[f64], y: &[f64]) -> Result<f64> {
    if x.len() != y.len() {
        return Err(MotifError::InvalidInput(format!(
            "correlation: x and y must have the same length ({} vs {})",
            x.len(),
            y.len()
        )));
    }
    if x.len() < 2 {
        return Err(MotifError::empty_input(
            "correlation needs at least 2 observations",
        ));
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(MotifError::InvalidInput(
            "correlation: values must be finite".into(),
        ));
    }
    if is_constant(x) || is_constant(y) {
        return Err(MotifError::ZeroVariance(
            "correlation is undefined for a constant series".into(),
        ));
    }

    let mean_x = x.iter().mean();
    let mean_y = y.iter().mean();

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    Ok(cov / (var_x * var_y).sqrt())
}

/// `ln(v - min + 1)`, compressing heavy-tailed intensities
pub fn log_transform(vals: &[f64]) -> Vec<f64> {
    let mi = Statistics::min(vals.iter());
    vals.iter().map(|v| (v - mi + 1.0).ln()).collect()
}

/// `exp(p - min)`, turning log-occupancies into relative occupancies
pub fn exp_transform(preds: &[f64]) -> Vec<f64> {
    let mi = Statistics::min(preds.iter());
    preds.iter().map(|p| (p - mi).exp()).collect()
}

/// Intensity at or above which a probe counts as bound.
///
/// `mean + 4 * sd`, lowered to the value ranked `n - 50` in ascending order
/// so that at most about 50 probes are positive. For fifty probes or fewer
/// the rank is clamped to 1, which keeps the smallest value negative.
pub fn positive_threshold(vals: &[f64]) -> Result<f64> {
    if vals.is_empty() {
        return Err(MotifError::empty_input("no values to threshold"));
    }

    let threshold = vals.iter().mean() + SD_FACTOR * vals.iter().std_dev();

    let mut sorted = vals.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = sorted
        .len()
        .saturating_sub(POSITIVE_CAP)
        .max(1)
        .min(sorted.len() - 1);

    // a NaN spread (single value) falls back to the rank threshold
    Ok(threshold.min(sorted[rank]))
}

/// Splits predictions into positives and negatives by their measured value.
///
/// Both classes come back sorted ascending, as the AUC routines expect.
pub fn split_classes(vals: &[f64], preds: &[f64]) -> Result<(Vec<f64>, Vec<f64>)> {
    let threshold = positive_threshold(vals)?;

    let mut positives = Vec::new();
    let mut negatives = Vec::new();
    for (&val, &pred) in vals.iter().zip(preds) {
        if val >= threshold {
            positives.push(pred);
        } else {
            negatives.push(pred);
        }
    }
    debug!(
        "threshold {} gives {} positives and {} negatives",
        threshold,
        positives.len(),
        negatives.len()
    );

    if positives.is_empty() || negatives.is_empty() {
        return Err(MotifError::empty_input(format!(
            "AUC split produced {} positives and {} negatives",
            positives.len(),
            negatives.len()
        )));
    }

    positives.sort_by(f64::total_cmp);
    negatives.sort_by(f64::total_cmp);
    Ok((positives, negatives))
}

fn check_classes(positives: &[f64], negatives: &[f64]) -> Result<()> {
    if positives.is_empty() || negatives.is_empty() {
        return Err(MotifError::empty_input(
            "AUC needs at least one positive and one negative",
        ));
    }
    debug_assert!(positives.windows(2).all(|w| w[0] <= w[1]));
    debug_assert!(negatives.windows(2).all(|w| w[0] <= w[1]));
    Ok(())
}

/// Area under the ROC curve of ascending-sorted class scores.
///
/// Equals the probability that a random positive outscores a random
/// negative, ties counting one half.
pub fn auc_roc(positives: &[f64], negatives: &[f64]) -> Result<f64> {
    check_classes(positives, negatives)?;

    let mut below = 0;
    let mut area = 0.0;
    for &p in positives {
        while below < negatives.len() && negatives[below] < p {
            below += 1;
        }
        let tied = negatives[below..].iter().take_while(|&&n| n == p).count();
        area += below as f64 + 0.5 * tied as f64;
    }

    Ok(area / (positives.len() * negatives.len()) as f64)
}

/// Area under the precision-recall curve of ascending-sorted class scores.
///
/// Thresholds are lowered one distinct score at a time, giving one
/// `(tp, fp)` point per threshold. Between consecutive points that gain true
/// positives, precision is interpolated one true positive at a time
/// (Davis & Goadrich); a threshold that only adds false positives adds a
/// point at the same recall with lower precision. The curve is integrated
/// with the trapezoid rule.
pub fn auc_pr(positives: &[f64], negatives: &[f64]) -> Result<f64> {
    check_classes(positives, negatives)?;

    let (mut i, mut j) = (positives.len(), negatives.len());
    let (mut tp, mut fp) = (0usize, 0usize);
    let mut counts: Vec<(usize, usize)> = vec![(0, 0)];

    loop {
        let threshold = match (positives[..i].last(), negatives[..j].last()) {
            (Some(&p), Some(&n)) => p.max(n),
            (Some(&p), None) => p,
            (None, Some(&n)) => n,
            (None, None) => break,
        };

        while i > 0 && positives[i - 1] >= threshold {
            i -= 1;
            tp += 1;
        }
        while j > 0 && negatives[j - 1] >= threshold {
            j -= 1;
            fp += 1;
        }
        counts.push((tp, fp));
    }

    let total = positives.len() as f64;
    let mut points: Vec<(f64, f64)> = Vec::new();
    for w in counts.windows(2) {
        let ((prev_tp, prev_fp), (tp, fp)) = (w[0], w[1]);
        if tp > prev_tp {
            let steps = tp - prev_tp;
            let skew = (fp - prev_fp) as f64 / steps as f64;
            for x in 1..=steps {
                let t = (prev_tp + x) as f64;
                let f = prev_fp as f64 + skew * x as f64;
                points.push((t / total, t / (t + f)));
            }
        } else if tp > 0 {
            let t = tp as f64;
            points.push((t / total, t / (t + fp as f64)));
        }
    }

    // precision is held flat from recall 0 to the first point
    let (r0, p0) = points[0];
    let mut area = r0 * p0;
    for w in points.windows(2) {
        let ((r1, p1), (r2, p2)) = (w[0], w[1]);
        area += (r2 - r1) * (p1 + p2) / 2.0;
    }

    Ok(area)
}

/// Mean prediction and mean value of every canonical 8-mer.
///
/// Each occurrence of a k-mer in a sequence adds that sequence's
/// `(pred, val)` pair to the k-mer's bucket. Returns `(mean_preds, mean_vals)`
/// in canonical k-mer order.
pub fn kmer_means(dataset: &Dataset, preds: &[f64], vals: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut buckets: BTreeMap<Vec<u8>, (f64, f64, usize)> = BTreeMap::new();

    for ((entry, &pred), &val) in dataset.entries().iter().zip(preds).zip(vals) {
        for kmer in entry.sequence.kmers(MER_LENGTH) {
            let bucket = buckets.entry(canonical_kmer(kmer)).or_insert((0.0, 0.0, 0));
            bucket.0 += pred;
            bucket.1 += val;
            bucket.2 += 1;
        }
    }
    debug!("{} distinct canonical {}-mers", buckets.len(), MER_LENGTH);

    buckets
        .values()
        .map(|&(pred_sum, val_sum, n)| (pred_sum / n as f64, val_sum / n as f64))
        .unzip()
}

/// Computes one metric from the predictions of a dataset.
///
/// # Arguments
/// * `metric` - Metric to compute
/// * `dataset` - Measured values and sequences
/// * `preds` - One pooled score per dataset entry, in dataset order
///
/// # Errors
/// * `MotifError::EmptyInput` - If the dataset is empty or an AUC class is empty
/// * `MotifError::InvalidInput` - If `preds` does not match the dataset length, a
///   measured value is not finite, a prediction is NaN, or the metric does not
///   come out finite
/// * `MotifError::ZeroVariance` - If a correlated series is constant
pub fn score(metric: Metric, dataset: &Dataset, preds: &[f64]) -> Result<f64> {
    if dataset.is_empty() {
        return Err(MotifError::empty_input("dataset has no entries"));
    }
    if preds.len() != dataset.len() {
        return Err(MotifError::InvalidInput(format!(
            "{} predictions for {} dataset entries",
            preds.len(),
            dataset.len()
        )));
    }

    let vals = dataset.values();
    if vals.iter().any(|v| !v.is_finite()) {
        return Err(MotifError::InvalidInput(
            "measured values must be finite".into(),
        ));
    }
    if preds.iter().any(|p| p.is_nan()) {
        return Err(MotifError::InvalidInput("predictions contain NaN".into()));
    }

    let value = match metric {
        Metric::Asis => pearson(&vals, preds),
        Metric::Exp => pearson(&vals, &exp_transform(preds)),
        Metric::Log => pearson(&log_transform(&vals), preds),
        Metric::Roc => {
            let (positives, negatives) = split_classes(&vals, preds)?;
            auc_roc(&positives, &negatives)
        }
        Metric::Pr => {
            let (positives, negatives) = split_classes(&vals, preds)?;
            auc_pr(&positives, &negatives)
        }
        Metric::RocLog => {
            let (positives, negatives) = split_classes(&log_transform(&vals), preds)?;
            auc_roc(&positives, &negatives)
        }
        Metric::PrLog => {
            let (positives, negatives) = split_classes(&log_transform(&vals), preds)?;
            auc_pr(&positives, &negatives)
        }
        Metric::Mers => {
            let (mean_preds, mean_vals) = kmer_means(dataset, preds, &vals);
            pearson(&mean_vals, &mean_preds)
        }
        Metric::LogMers => {
            let (mean_preds, mean_vals) = kmer_means(dataset, preds, &log_transform(&vals));
            pearson(&mean_vals, &mean_preds)
        }
    }?;

    if !value.is_finite() {
        return Err(MotifError::InvalidInput(format!(
            "{} evaluated to {}",
            metric, value
        )));
    }
    Ok(value)
}

/// Computes several metrics from one shared prediction vector.
pub fn score_many(metrics: &[Metric], dataset: &Dataset, preds: &[f64]) -> Result<MetricReport> {
    metrics
        .iter()
        .map(|&metric| Ok((metric, score(metric, dataset, preds)?)))
        .collect()
}
