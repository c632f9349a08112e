//! Benchmark DNA binding motifs against measured binding intensities in Rust
//!
//! Motifs are scanned over both strands of every probe, window scores are
//! pooled into one log-occupancy per probe, and the occupancies are compared
//! with the measured intensities by correlation, AUC and 8-mer metrics.

pub mod dataset;
pub mod error;
pub mod eval;
pub mod metrics;
pub mod motif;
pub mod occupancy;
pub mod sequence;
pub mod types;
