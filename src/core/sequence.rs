use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("Invalid nucleotide '{symbol}' at position {position}")]
    InvalidSymbol { symbol: char, position: usize },

    #[error("Sequence lengths differ: {0} vs {1}")]
    LengthMismatch(usize, usize),

    #[error("Range {start}..{end} is out of bounds for sequence of length {len}")]
    OutOfBounds { start: usize, end: usize, len: usize },
}

/// An immutable run of nucleotides drawn from `{A, C, G, T, N}`.
///
/// Input is case-insensitive; bases are stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Sequence(Vec<u8>);

impl Sequence {
    /// Build a sequence from text, failing on the first unrecognized symbol.
    ///
    /// # Errors
    ///
    /// Returns `SequenceError::InvalidSymbol` if any symbol is not one of `ACGTN`.
    pub fn new(text: &str) -> Result<Self, SequenceError> {
        Self::from_bytes(text.as_bytes())
    }

    /// Build a sequence from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `SequenceError::InvalidSymbol` if any byte is not one of `ACGTN`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SequenceError> {
        let mut bases = Vec::with_capacity(bytes.len());
        for (position, &b) in bytes.iter().enumerate() {
            let upper = b.to_ascii_uppercase();
            if !is_valid_base(upper) {
                return Err(SequenceError::InvalidSymbol {
                    symbol: char::from(b),
                    position,
                });
            }
            bases.push(upper);
        }
        Ok(Self(bases))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Reverse complement; `N` maps to itself.
    #[must_use]
    pub fn reverse_complement(&self) -> Self {
        Self(self.0.iter().rev().map(|&b| complement(b)).collect())
    }

    /// Number of positions at which the two sequences differ.
    ///
    /// # Errors
    ///
    /// Returns `SequenceError::LengthMismatch` if the lengths differ. Comparing
    /// sequences of unequal length is a caller bug, not a large distance.
    pub fn hamming_distance(&self, other: &Sequence) -> Result<usize, SequenceError> {
        if self.len() != other.len() {
            return Err(SequenceError::LengthMismatch(self.len(), other.len()));
        }
        Ok(self
            .0
            .iter()
            .zip(other.0.iter())
            .filter(|(a, b)| a != b)
            .count())
    }

    /// Copy of the half-open range `start..end`.
    ///
    /// # Errors
    ///
    /// Returns `SequenceError::OutOfBounds` if the range does not fit.
    pub fn subrange(&self, start: usize, end: usize) -> Result<Self, SequenceError> {
        if start > end || end > self.len() {
            return Err(SequenceError::OutOfBounds {
                start,
                end,
                len: self.len(),
            });
        }
        Ok(self.slice(start, end))
    }

    /// Unchecked counterpart of [`Sequence::subrange`] for ranges already known to fit.
    pub(crate) fn slice(&self, start: usize, end: usize) -> Self {
        Self(self.0[start..end].to_vec())
    }

    /// Wrap values the caller has already validated.
    pub(crate) fn from_raw(bases: Vec<u8>) -> Self {
        Self(bases)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only ASCII bases are ever stored
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl FromStr for Sequence {
    type Err = SequenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<[u8]> for Sequence {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[must_use]
pub fn is_valid_base(b: u8) -> bool {
    matches!(b, b'A' | b'C' | b'G' | b'T' | b'N')
}

#[must_use]
pub fn complement(b: u8) -> u8 {
    match b {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' => b'A',
        _ => b'N',
    }
}
