use crate::error::{MotifError, Result};
use crate::sequence::Sequence;
use crate::types::{MotifCollection, ProbabilityMatrix};
use log::debug;
use ndarray::{Array2, Axis};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Pseudocount blended into every matrix unless stated otherwise
pub const DEFAULT_PSEUDOCOUNT: f64 = 4e-4;

/// Pseudocount of the last record of a MEME file, the one closed by end of input
pub const TRAILING_MEME_PSEUDOCOUNT: f64 = 1e-4;

const ANNOTATED_PREFIX: &str = ">letter-probability matrix ";

/// A named motif ready for scoring.
///
/// Holds the smoothed probability matrix and its natural logarithm, so that
/// scoring a window is a sum of table lookups.
#[derive(Debug, Clone)]
pub struct MotifModel {
    name: String,
    matrix: ProbabilityMatrix,
    log_matrix: ProbabilityMatrix,
}

impl MotifModel {
    /// Builds a model from matrix rows of counts or probabilities.
    ///
    /// # Arguments
    /// * `name` - Label used when reporting results
    /// * `rows` - One row per motif position, columns A, C, G, T
    /// * `pseudocount` - Smoothing weight ε in `[0, 1]`; with 0 a zero cell scores `-inf`
    ///
    /// # Errors
    /// * `MotifError::InvalidPwm` - If a row does not have exactly 4 columns, the matrix
    ///   is empty, a cell is negative or not finite, or a row sums to zero
    /// * `MotifError::InvalidParameter` - If the pseudocount is out of range
    pub fn new(name: impl Into<String>, rows: &[Vec<f64>], pseudocount: f64) -> Result<Self> {
        let mut flat = Vec::with_capacity(rows.len() * 4);
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != 4 {
                return Err(MotifError::invalid_pwm(format!(
                    "row {} has {} columns, expected 4",
                    idx + 1,
                    row.len()
                )));
            }
            flat.extend_from_slice(row);
        }

        let counts = Array2::from_shape_vec((rows.len(), 4), flat)
            .map_err(|e| MotifError::invalid_pwm(e.to_string()))?;
        Self::from_matrix(name, counts, pseudocount)
    }

    /// Builds a model from an `L x 4` matrix.
    ///
    /// Every row is normalised to sum to one and then blended with the
    /// uniform distribution: `(1 - ε) * p + ε / 4`.
    pub fn from_matrix(
        name: impl Into<String>,
        counts: ProbabilityMatrix,
        pseudocount: f64,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&pseudocount) {
            return Err(MotifError::invalid_parameter(
                "pseudocount",
                pseudocount,
                "must be in [0, 1]",
            ));
        }
        if counts.ncols() != 4 {
            return Err(MotifError::invalid_pwm(format!(
                "matrix has {} columns, expected 4",
                counts.ncols()
            )));
        }
        if counts.nrows() == 0 {
            return Err(MotifError::invalid_pwm("Empty PWM"));
        }
        if counts.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(MotifError::invalid_pwm(
                "matrix values must be finite and non-negative",
            ));
        }

        let mut matrix = counts;
        for (idx, mut row) in matrix.axis_iter_mut(Axis(0)).enumerate() {
            let total = row.sum();
            if total <= 0.0 {
                return Err(MotifError::invalid_pwm(format!(
                    "row {} sums to zero",
                    idx + 1
                )));
            }
            row.mapv_inplace(|v| (1.0 - pseudocount) * (v / total) + pseudocount / 4.0);
        }
        let log_matrix = matrix.mapv(f64::ln);

        Ok(Self {
            name: name.into(),
            matrix,
            log_matrix,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of motif positions
    pub fn len(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.nrows() == 0
    }

    /// Smoothed probabilities, one row per position
    pub fn matrix(&self) -> &ProbabilityMatrix {
        &self.matrix
    }

    /// Log-probability of the window of `sequence` starting at `offset`:
    /// the sum over positions of `ln(matrix[p][sequence[offset + p]])`.
    ///
    /// # Panics
    /// * Panics if the window runs past the end of the sequence
    pub fn log_score(&self, sequence: &Sequence, offset: usize) -> f64 {
        let window = &sequence.codes()[offset..offset + self.len()];
        self.log_matrix
            .outer_iter()
            .zip(window)
            .map(|(row, &code)| row[code as usize])
            .sum()
    }
}

/// Motif file layouts understood by [`read_motifs`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotifFormat {
    /// Optional `>name` line followed by rows of 4 numbers
    #[default]
    Plain,
    /// MEME text with `MOTIF` and `letter-probability` blocks
    Meme,
    /// `>letter-probability matrix <name>: ...` headers followed by rows
    Annotated,
}

impl MotifFormat {
    /// Parses `text` in this format.
    ///
    /// `fallback_name` names a plain motif that has no header line.
    /// `pseudocount` overrides the per-format defaults when given.
    pub fn parse(
        &self,
        text: &str,
        fallback_name: &str,
        pseudocount: Option<f64>,
    ) -> Result<MotifCollection> {
        match self {
            MotifFormat::Plain => Ok(vec![parse_plain(text, fallback_name, pseudocount)?]),
            MotifFormat::Meme => parse_meme(text, pseudocount),
            MotifFormat::Annotated => parse_annotated(text, pseudocount),
        }
    }
}

impl FromStr for MotifFormat {
    type Err = MotifError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "plain" => Ok(MotifFormat::Plain),
            "meme" => Ok(MotifFormat::Meme),
            "annotated" => Ok(MotifFormat::Annotated),
            _ => Err(MotifError::invalid_parameter(
                "format",
                s,
                "expected one of plain, meme, annotated",
            )),
        }
    }
}

impl fmt::Display for MotifFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MotifFormat::Plain => "plain",
            MotifFormat::Meme => "meme",
            MotifFormat::Annotated => "annotated",
        };
        f.write_str(name)
    }
}

/// Splits a matrix line into exactly four numbers
fn parse_row(line: &str) -> Result<Vec<f64>> {
    let values: Vec<f64> = line
        .split_whitespace()
        .map(|s| s.parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| MotifError::invalid_pwm(format!("Invalid PWM value in '{}': {}", line.trim(), e)))?;

    if values.len() != 4 {
        return Err(MotifError::invalid_pwm(format!(
            "Matrix rows should contain exactly 4 columns, found {} in '{}'",
            values.len(),
            line.trim()
        )));
    }

    Ok(values)
}

/// Parses a single plain matrix.
///
/// A line starting with `>` names the motif; every other non-blank line is a
/// row of four counts or probabilities.
pub fn parse_plain(text: &str, fallback_name: &str, pseudocount: Option<f64>) -> Result<MotifModel> {
    let mut name: Option<String> = None;
    let mut rows = Vec::new();

    for line in text.lines() {
        if let Some(header) = line.strip_prefix('>') {
            name = Some(header.trim().to_string());
        } else if !line.trim().is_empty() {
            rows.push(parse_row(line)?);
        }
    }

    let name = name
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| fallback_name.to_string());
    MotifModel::new(name, &rows, pseudocount.unwrap_or(DEFAULT_PSEUDOCOUNT))
}

/// Parses every motif of a MEME file.
///
/// A `MOTIF` line opens a record, a `letter-probability` line opens its
/// matrix, and a blank line or a `URL` line closes it. Records closed by the
/// next `MOTIF` line get [`DEFAULT_PSEUDOCOUNT`]; the last record gets
/// [`TRAILING_MEME_PSEUDOCOUNT`].
pub fn parse_meme(text: &str, pseudocount: Option<f64>) -> Result<MotifCollection> {
    let mut motifs = Vec::new();
    let mut current: Option<(String, Vec<Vec<f64>>)> = None;
    let mut in_matrix = false;

    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("MOTIF ") {
            if let Some((name, rows)) = current.take() {
                motifs.push(MotifModel::new(
                    name,
                    &rows,
                    pseudocount.unwrap_or(DEFAULT_PSEUDOCOUNT),
                )?);
            }
            current = Some((rest.trim().to_string(), Vec::new()));
            in_matrix = false;
        } else if line.starts_with("letter-probability") {
            in_matrix = true;
        } else if line.starts_with("URL") || line.trim().is_empty() {
            in_matrix = false;
        } else if in_matrix {
            let row = parse_row(line)?;
            match current.as_mut() {
                Some((_, rows)) => rows.push(row),
                None => {
                    return Err(MotifError::InvalidFileFormat(
                        "Matrix rows before the first MOTIF line".into(),
                    ))
                }
            }
        }
    }

    if let Some((name, rows)) = current {
        motifs.push(MotifModel::new(
            name,
            &rows,
            pseudocount.unwrap_or(TRAILING_MEME_PSEUDOCOUNT),
        )?);
    }

    if motifs.is_empty() {
        return Err(MotifError::InvalidFileFormat("No PWMs found".into()));
    }

    Ok(motifs)
}

/// Parses files of `>letter-probability matrix <name>: ...` records.
///
/// The motif name is the header text after the prefix up to the first `:`.
pub fn parse_annotated(text: &str, pseudocount: Option<f64>) -> Result<MotifCollection> {
    let pseudocount = pseudocount.unwrap_or(DEFAULT_PSEUDOCOUNT);
    let mut motifs = Vec::new();
    let mut current: Option<(String, Vec<Vec<f64>>)> = None;

    for line in text.lines() {
        if line.starts_with('>') {
            if let Some((name, rows)) = current.take() {
                motifs.push(MotifModel::new(name, &rows, pseudocount)?);
            }
            let header = line
                .strip_prefix(ANNOTATED_PREFIX)
                .unwrap_or(&line[1..]);
            let name = header.split(':').next().unwrap_or_default().trim();
            current = Some((name.to_string(), Vec::new()));
        } else if !line.trim().is_empty() {
            let row = parse_row(line)?;
            match current.as_mut() {
                Some((_, rows)) => rows.push(row),
                None => {
                    return Err(MotifError::InvalidFileFormat(
                        "Matrix rows before the first header line".into(),
                    ))
                }
            }
        }
    }

    if let Some((name, rows)) = current {
        motifs.push(MotifModel::new(name, &rows, pseudocount)?);
    }

    if motifs.is_empty() {
        return Err(MotifError::InvalidFileFormat("No PWMs found".into()));
    }

    Ok(motifs)
}

/// Reads every motif of a file.
///
/// # Arguments
/// * `path` - Motif file
/// * `format` - Layout of the file
/// * `pseudocount` - Overrides the format's default pseudocounts when given
///
/// # Returns
/// * `Result<MotifCollection>` - Motifs in file order; a plain motif without a
///   header is named after the file stem
///
/// # Errors
/// * `MotifError::Io` - If the file cannot be read
/// * `MotifError::InvalidPwm` - If a matrix row is malformed
/// * `MotifError::InvalidFileFormat` - If the file holds no motif
///
/// # Example
/// ```ignore
/// use pwm_bench::motif::{read_motifs, MotifFormat};
///
/// let motifs = read_motifs("path/to/motifs.meme", MotifFormat::Meme, None).unwrap();
/// for motif in &motifs {
///     println!("{} ({} positions)", motif.name(), motif.len());
/// }
/// ```
pub fn read_motifs(
    path: impl AsRef<Path>,
    format: MotifFormat,
    pseudocount: Option<f64>,
) -> Result<MotifCollection> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let fallback_name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let motifs = format.parse(&text, &fallback_name, pseudocount)?;
    debug!(
        "read {} {} motif(s) from {}",
        motifs.len(),
        format,
        path.display()
    );

    Ok(motifs)
}
