use crate::error::{MotifError, Result};
use crate::sequence::Sequence;
use log::{debug, info};
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Extension of the files picked up when a directory is read
pub const DEFAULT_EXTENSION: &str = "txt";

/// A probe sequence and its measured binding intensity
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetEntry {
    pub sequence: Sequence,
    pub value: f64,
}

/// Measured intensities for a set of probe sequences.
///
/// Entries keep their input order so predictions can be paired back with the
/// measured values.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    label: Option<String>,
    entries: Vec<DatasetEntry>,
}

impl Dataset {
    pub fn new(entries: Vec<DatasetEntry>) -> Self {
        Dataset {
            label: None,
            entries,
        }
    }

    /// Builds a dataset from `(sequence, value)` pairs
    pub fn from_pairs(pairs: &[(&str, f64)]) -> Result<Self> {
        let entries = pairs
            .iter()
            .map(|&(sequence, value)| {
                Ok(DatasetEntry {
                    sequence: Sequence::new(sequence)?,
                    value,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Dataset::new(entries))
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Source file of the entries, relative to the dataset root
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[DatasetEntry] {
        &self.entries
    }

    /// Measured values in entry order
    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.value).collect()
    }

    /// Converts the dataset into a Polars DataFrame.
    ///
    /// # Returns
    /// * `Result<DataFrame>` - A DataFrame with two columns:
    ///   - "sequence": The probe sequences
    ///   - "value": The measured intensities
    pub fn to_frame(&self) -> Result<DataFrame> {
        let sequences: Vec<String> = self
            .entries
            .iter()
            .map(|e| e.sequence.to_string())
            .collect();

        let df = DataFrame::new(vec![
            Column::new("sequence".into(), sequences),
            Column::new("value".into(), self.values()),
        ])?;

        Ok(df)
    }
}

/// Index of the column holding the measured value, if the line has exactly
/// two columns and one of them is numeric. The second column is tried first.
fn value_column(line: &str) -> Option<usize> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != 2 {
        return None;
    }
    if parts[1].parse::<f64>().is_ok() {
        Some(1)
    } else if parts[0].parse::<f64>().is_ok() {
        Some(0)
    } else {
        None
    }
}

/// Reads binding-intensity files of two whitespace-separated columns.
#[derive(Debug, Clone)]
pub struct DatasetReader {
    trim_length: Option<usize>,
    extension: Option<String>,
}

impl Default for DatasetReader {
    fn default() -> Self {
        DatasetReader {
            trim_length: None,
            extension: Some(DEFAULT_EXTENSION.to_string()),
        }
    }
}

impl DatasetReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most the first `length` symbols of every sequence
    pub fn with_trim_length(mut self, length: Option<usize>) -> Self {
        self.trim_length = length;
        self
    }

    /// Only files with this extension are read from directories; `None` reads every file
    pub fn with_extension(mut self, extension: Option<String>) -> Self {
        self.extension = extension;
        self
    }

    /// Parses the content of one dataset file.
    ///
    /// The column order is detected on the first non-blank line. When that line
    /// has no numeric column it is taken as a header and detection is retried
    /// on the next one.
    ///
    /// # Errors
    /// * `MotifError::InvalidFileFormat` - If the column order cannot be detected or a
    ///   line is malformed
    /// * `MotifError::EmptyInput` - If the text holds no entries
    pub fn parse(&self, text: &str, label: Option<String>) -> Result<Dataset> {
        let source = label.as_deref().unwrap_or("dataset").to_string();
        let mut lines = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        let no_entries = || MotifError::empty_input(format!("{} holds no entries", source));

        let first = lines.next().ok_or_else(no_entries)?;
        let (column, start) = match value_column(first.1) {
            Some(column) => (column, first),
            None => {
                let second = lines.next().ok_or_else(no_entries)?;
                let column = value_column(second.1).ok_or_else(|| {
                    MotifError::InvalidFileFormat(format!(
                        "{}: cannot detect column order from line {}: '{}'",
                        source,
                        second.0 + 1,
                        second.1.trim()
                    ))
                })?;
                debug!("{}: skipping header line '{}'", source, first.1.trim());
                (column, second)
            }
        };

        let mut entries = Vec::new();
        for (line_no, line) in std::iter::once(start).chain(lines) {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() != 2 {
                return Err(MotifError::InvalidFileFormat(format!(
                    "{}: line {} should have 2 columns, found {}",
                    source,
                    line_no + 1,
                    parts.len()
                )));
            }

            let value = parts[column].parse::<f64>().map_err(|e| {
                MotifError::InvalidFileFormat(format!(
                    "{}: line {}: invalid value '{}': {}",
                    source,
                    line_no + 1,
                    parts[column],
                    e
                ))
            })?;
            if !value.is_finite() {
                return Err(MotifError::InvalidFileFormat(format!(
                    "{}: line {}: value '{}' is not finite",
                    source,
                    line_no + 1,
                    parts[column]
                )));
            }
            let sequence = Sequence::new(parts[1 - column]).map_err(|e| {
                MotifError::InvalidFileFormat(format!("{}: line {}: {}", source, line_no + 1, e))
            })?;
            let sequence = match self.trim_length {
                Some(length) => sequence.truncated(length),
                None => sequence,
            };

            entries.push(DatasetEntry { sequence, value });
        }

        let dataset = Dataset::new(entries);
        Ok(match label {
            Some(label) => dataset.with_label(label),
            None => dataset,
        })
    }

    /// Reads a single dataset file, labelled with its file name.
    pub fn read_file(&self, path: impl AsRef<Path>) -> Result<Dataset> {
        let path = path.as_ref();
        let label = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.read_labelled(path, label)
    }

    fn read_labelled(&self, path: &Path, label: String) -> Result<Dataset> {
        let text = fs::read_to_string(path)?;
        let dataset = self.parse(&text, Some(label))?;
        debug!("read {} entries from {}", dataset.len(), path.display());
        Ok(dataset)
    }

    /// Reads a dataset file, or every matching file below a directory.
    ///
    /// # Arguments
    /// * `path` - Dataset file or directory
    ///
    /// # Returns
    /// * `Result<Vec<Dataset>>` - One dataset per file, in sorted path order, each
    ///   labelled with its path relative to the directory
    ///
    /// # Errors
    /// * `MotifError::Io` - If a file or directory cannot be read
    /// * `MotifError::EmptyInput` - If a directory holds no matching file
    pub fn read(&self, path: impl AsRef<Path>) -> Result<Vec<Dataset>> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Ok(vec![self.read_file(path)?]);
        }

        let mut files = Vec::new();
        collect_files(path, &mut files)?;
        files.sort();

        let mut datasets = Vec::new();
        for file in files {
            if !self.matches_extension(&file) {
                debug!("ignoring {}", file.display());
                continue;
            }
            let label = file
                .strip_prefix(path)
                .unwrap_or(&file)
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            datasets.push(self.read_labelled(&file, label)?);
        }

        if datasets.is_empty() {
            return Err(MotifError::empty_input(format!(
                "no dataset files found in {}",
                path.display()
            )));
        }
        info!("read {} datasets from {}", datasets.len(), path.display());

        Ok(datasets)
    }

    fn matches_extension(&self, file: &Path) -> bool {
        match &self.extension {
            Some(extension) => file
                .extension()
                .is_some_and(|e| e.to_string_lossy() == extension.as_str()),
            None => true,
        }
    }
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(())
}
