use crate::dataset::Dataset;
use crate::error::{MotifError, Result};
use crate::metrics::{self, Metric, MetricSelection};
use crate::motif::MotifModel;
use crate::occupancy::{DatasetScorer, Scanner};
use crate::types::{MetricReport, ScoreVector};
use log::info;
use ndarray::Array2;
use polars::prelude::*;
use serde::Serialize;
use std::io::Write;

/// Outcome of evaluating one motif on one dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Evaluation {
    Single(f64),
    Report(MetricReport),
}

/// One metric for every (motif, dataset) pair.
///
/// Rows follow the order of the motifs, columns the order of the datasets.
#[derive(Debug, Clone)]
pub struct ScoreMatrix {
    models: Vec<String>,
    datasets: Vec<String>,
    scores: Array2<f64>,
}

impl ScoreMatrix {
    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn datasets(&self) -> &[String] {
        &self.datasets
    }

    pub fn scores(&self) -> &Array2<f64> {
        &self.scores
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.scores.get((row, col)).copied()
    }

    /// Converts the matrix into a DataFrame with a "motif" column followed by
    /// one column per dataset label.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut columns = vec![Column::new("motif".into(), self.models.clone())];
        for (col, label) in self.datasets.iter().enumerate() {
            columns.push(Column::new(
                label.as_str().into(),
                self.scores.column(col).to_vec(),
            ));
        }

        Ok(DataFrame::new(columns)?)
    }

    /// Writes the matrix as tab-separated text with a header row.
    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<()> {
        let mut df = self.to_frame()?;
        write_frame_tsv(&mut df, writer)
    }
}

/// Writes a DataFrame as tab-separated text with a header row.
pub fn write_frame_tsv<W: Write>(df: &mut DataFrame, writer: W) -> Result<()> {
    CsvWriter::new(writer)
        .include_header(true)
        .with_separator(b'\t')
        .finish(df)?;
    Ok(())
}

/// Scores motifs on datasets and computes agreement metrics.
///
/// Every evaluation scans the dataset exactly once, however many metrics
/// are requested.
#[derive(Debug, Clone)]
pub struct Evaluator<S = Scanner> {
    scorer: S,
}

impl Evaluator<Scanner> {
    pub fn new() -> Self {
        Evaluator {
            scorer: Scanner::default(),
        }
    }
}

impl Default for Evaluator<Scanner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: DatasetScorer> Evaluator<S> {
    pub fn with_scorer(scorer: S) -> Self {
        Evaluator { scorer }
    }

    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    /// Pooled occupancy of every dataset entry, in dataset order.
    ///
    /// # Errors
    /// * `MotifError::EmptyInput` - If the dataset has no entries
    /// * `MotifError::SequenceTooShort` - If an entry is shorter than the motif
    pub fn predictions(&self, model: &MotifModel, dataset: &Dataset) -> Result<ScoreVector> {
        if dataset.is_empty() {
            return Err(MotifError::empty_input(format!(
                "dataset {} has no entries",
                dataset.label().unwrap_or("")
            )));
        }
        self.scorer.score_dataset(model, dataset)
    }

    pub fn evaluate(&self, model: &MotifModel, dataset: &Dataset, metric: Metric) -> Result<f64> {
        let preds = self.predictions(model, dataset)?;
        metrics::score(metric, dataset, &preds)
    }

    /// Computes every metric of `metrics` from a single scan.
    pub fn evaluate_all(
        &self,
        model: &MotifModel,
        dataset: &Dataset,
        metrics: &[Metric],
    ) -> Result<MetricReport> {
        let preds = self.predictions(model, dataset)?;
        metrics::score_many(metrics, dataset, &preds)
    }

    /// Bare value for a single metric, a report for `all` and metric lists.
    pub fn evaluate_selection(
        &self,
        model: &MotifModel,
        dataset: &Dataset,
        selection: &MetricSelection,
    ) -> Result<Evaluation> {
        match selection {
            MetricSelection::Single(metric) => {
                Ok(Evaluation::Single(self.evaluate(model, dataset, *metric)?))
            }
            MetricSelection::Many(metrics) => Ok(Evaluation::Report(
                self.evaluate_all(model, dataset, metrics)?,
            )),
        }
    }

    /// Evaluates every motif on every dataset.
    ///
    /// # Returns
    /// * `Result<ScoreMatrix>` - Rows in motif order, columns in dataset order.
    ///   Unlabelled datasets are named `dataset1`, `dataset2`, ...
    pub fn score_matrix(
        &self,
        models: &[MotifModel],
        datasets: &[Dataset],
        metric: Metric,
    ) -> Result<ScoreMatrix> {
        let mut scores = Array2::zeros((models.len(), datasets.len()));

        for (row, model) in models.iter().enumerate() {
            info!("motif {} / {}: {}", row + 1, models.len(), model.name());
            for (col, dataset) in datasets.iter().enumerate() {
                scores[[row, col]] = self.evaluate(model, dataset, metric)?;
            }
        }

        let datasets = datasets
            .iter()
            .enumerate()
            .map(|(idx, d)| {
                d.label()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("dataset{}", idx + 1))
            })
            .collect();

        Ok(ScoreMatrix {
            models: models.iter().map(|m| m.name().to_string()).collect(),
            datasets,
            scores,
        })
    }

    /// Predictions paired back with their measurements.
    ///
    /// # Returns
    /// * `Result<DataFrame>` - Columns "sequence", "value" and "score", one row per
    ///   entry in dataset order
    pub fn prediction_frame(&self, model: &MotifModel, dataset: &Dataset) -> Result<DataFrame> {
        let preds = self.predictions(model, dataset)?;
        let sequences: Vec<String> = dataset
            .entries()
            .iter()
            .map(|e| e.sequence.to_string())
            .collect();

        let df = DataFrame::new(vec![
            Column::new("sequence".into(), sequences),
            Column::new("value".into(), dataset.values()),
            Column::new("score".into(), preds),
        ])?;

        Ok(df)
    }
}
