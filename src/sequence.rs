use crate::error::{MotifError, Result};
use phf::phf_map;
use std::fmt;
use std::str::FromStr;

/// Column order of every probability matrix: A, C, G, T
pub const ALPHABET: [char; 4] = ['A', 'C', 'G', 'T'];

static BASE_CODES: phf::Map<char, u8> = phf_map! {
    'A' => 0,
    'C' => 1,
    'G' => 2,
    'T' => 3,
    'a' => 0,
    'c' => 1,
    'g' => 2,
    't' => 3,
};

#[inline]
fn complement(code: u8) -> u8 {
    3 - code
}

fn reverse_complement_codes(codes: &[u8]) -> Vec<u8> {
    codes.iter().rev().map(|&c| complement(c)).collect()
}

/// A DNA sequence over the four nucleotides, stored as symbol codes
/// (A=0, C=1, G=2, T=3) so that matrix lookups are direct indexing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sequence {
    codes: Vec<u8>,
}

impl Sequence {
    /// Parses a nucleotide string. Lower-case input is accepted.
    ///
    /// # Errors
    /// * Returns `MotifError::InvalidSequence` on the first symbol outside A, C, G, T
    pub fn new(sequence: &str) -> Result<Self> {
        let codes = sequence
            .chars()
            .enumerate()
            .map(|(position, c)| {
                BASE_CODES.get(&c).copied().ok_or_else(|| {
                    MotifError::invalid_sequence(position, format!("unexpected symbol '{}'", c))
                })
            })
            .collect::<Result<Vec<u8>>>()?;

        Ok(Self { codes })
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Symbol codes in 0..4
    pub fn codes(&self) -> &[u8] {
        &self.codes
    }

    /// Reverses the sequence and substitutes every base with its partner (A ↔ T, C ↔ G).
    pub fn reverse_complement(&self) -> Sequence {
        Sequence {
            codes: reverse_complement_codes(&self.codes),
        }
    }

    /// Extracts `length` symbols starting at `start`, or `None` if the range
    /// runs past the end of the sequence.
    pub fn subsequence(&self, start: usize, length: usize) -> Option<Sequence> {
        let end = start.checked_add(length)?;
        self.codes.get(start..end).map(|codes| Sequence {
            codes: codes.to_vec(),
        })
    }

    /// Keeps at most the first `length` symbols.
    pub fn truncated(&self, length: usize) -> Sequence {
        Sequence {
            codes: self.codes[..length.min(self.codes.len())].to_vec(),
        }
    }

    /// Overlapping windows of `k` symbols on the forward strand.
    ///
    /// # Panics
    /// * Panics if `k` is 0
    pub fn kmers(&self, k: usize) -> std::slice::Windows<'_, u8> {
        self.codes.windows(k)
    }

    /// The lexicographically smaller of this sequence and its reverse complement.
    pub fn canonical(&self) -> Sequence {
        Sequence {
            codes: canonical_kmer(&self.codes),
        }
    }
}

impl FromStr for Sequence {
    type Err = MotifError;

    fn from_str(s: &str) -> Result<Self> {
        Sequence::new(s)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text: String = self
            .codes
            .iter()
            .map(|&c| ALPHABET[c as usize])
            .collect();
        f.write_str(&text)
    }
}

/// Strand-symmetric form of a k-mer given as symbol codes.
///
/// Codes are ordered like their letters (A < C < G < T), so comparing code
/// slices is the same as comparing the nucleotide strings.
pub fn canonical_kmer(kmer: &[u8]) -> Vec<u8> {
    let rc = reverse_complement_codes(kmer);
    if rc.as_slice() < kmer {
        rc
    } else {
        kmer.to_vec()
    }
}

/// Generates the reverse complement of a DNA sequence string.
///
/// # Arguments
/// * `sequence` - Input DNA sequence string
///
/// # Returns
/// * `Result<String>` - The upper-case reverse complement
///
/// # Errors
/// * Returns `MotifError::InvalidSequence` if the input contains characters other than A, T, C, or G
pub fn reverse_complement(sequence: &str) -> Result<String> {
    Ok(Sequence::new(sequence)?.reverse_complement().to_string())
}
