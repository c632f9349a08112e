use crate::dataset::Dataset;
use crate::error::{MotifError, Result};
use crate::motif::MotifModel;
use crate::sequence::Sequence;
use crate::types::ScoreVector;
use log::debug;
use rayon::prelude::*;

/// Log-scores of every window on both strands.
///
/// Returns `2 * (N - L + 1)` values: the forward sweep over offsets
/// `0..=N-L`, then the same sweep over the reverse complement.
///
/// # Errors
/// * `MotifError::SequenceTooShort` - If the sequence is shorter than the motif
///   (reported with index 0; dataset scoring fills in the entry index)
pub fn window_scores(model: &MotifModel, sequence: &Sequence) -> Result<Vec<f64>> {
    let motif_len = model.len();
    if sequence.len() < motif_len {
        return Err(MotifError::SequenceTooShort {
            index: 0,
            length: sequence.len(),
            motif_length: motif_len,
        });
    }

    let windows = sequence.len() - motif_len + 1;
    let reverse = sequence.reverse_complement();
    let mut scores = Vec::with_capacity(2 * windows);
    for strand in [sequence, &reverse] {
        scores.extend((0..windows).map(|offset| model.log_score(strand, offset)));
    }

    Ok(scores)
}

/// Numerically stable `ln(sum(exp(v)))`.
///
/// The maximum is factored out before exponentiating. An empty slice pools
/// to negative infinity.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = values.iter().map(|v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Total log-occupancy of `model` on `sequence`: every window on both
/// strands contributes additively.
pub fn occupancy(model: &MotifModel, sequence: &Sequence) -> Result<f64> {
    Ok(log_sum_exp(&window_scores(model, sequence)?))
}

/// Turns a dataset into one score per entry.
///
/// This is the seam between the evaluation driver and the scanner.
pub trait DatasetScorer {
    fn score_dataset(&self, model: &MotifModel, dataset: &Dataset) -> Result<ScoreVector>;
}

/// Sliding-window scanner pooling both strands with log-sum-exp
#[derive(Debug, Clone, Copy)]
pub struct Scanner {
    parallel: bool,
}

impl Scanner {
    /// Scores entries on the rayon thread pool
    pub fn parallel() -> Self {
        Scanner { parallel: true }
    }

    /// Scores entries one after another on the calling thread
    pub fn sequential() -> Self {
        Scanner { parallel: false }
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Scanner::parallel()
    }
}

fn score_entry(model: &MotifModel, index: usize, sequence: &Sequence) -> Result<f64> {
    occupancy(model, sequence).map_err(|e| match e {
        MotifError::SequenceTooShort {
            length,
            motif_length,
            ..
        } => MotifError::SequenceTooShort {
            index,
            length,
            motif_length,
        },
        other => other,
    })
}

impl DatasetScorer for Scanner {
    fn score_dataset(&self, model: &MotifModel, dataset: &Dataset) -> Result<ScoreVector> {
        debug!(
            "scanning {} sequences with motif {} (length {})",
            dataset.len(),
            model.name(),
            model.len()
        );

        let entries = dataset.entries();
        if self.parallel {
            entries
                .par_iter()
                .enumerate()
                .map(|(idx, entry)| score_entry(model, idx, &entry.sequence))
                .collect()
        } else {
            entries
                .iter()
                .enumerate()
                .map(|(idx, entry)| score_entry(model, idx, &entry.sequence))
                .collect()
        }
    }
}
