use std::fmt;

use thiserror::Error;

/// Offset added to a Phred score to get its printable character ('!' = Q0).
pub const PHRED_OFFSET: u8 = 33;

/// Highest score that still encodes to printable ASCII ('~').
pub const MAX_ENCODABLE_QUALITY: u8 = b'~' - PHRED_OFFSET;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QualityError {
    #[error("Invalid quality character {byte:#04x} at position {position}")]
    InvalidCharacter { byte: u8, position: usize },

    #[error("Quality score {0} cannot be encoded with offset 33")]
    Unencodable(u8),

    #[error("Range {start}..{end} is out of bounds for quality track of length {len}")]
    OutOfBounds { start: usize, end: usize, len: usize },
}

/// Per-base Phred quality scores, parallel to a [`Sequence`](super::sequence::Sequence).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct QualityTrack(Vec<u8>);

impl QualityTrack {
    /// Wrap raw Phred scores.
    ///
    /// # Errors
    ///
    /// Returns `QualityError::Unencodable` if a score would not fit the offset-33 text form.
    pub fn new(scores: Vec<u8>) -> Result<Self, QualityError> {
        if let Some(&q) = scores.iter().find(|&&q| q > MAX_ENCODABLE_QUALITY) {
            return Err(QualityError::Unencodable(q));
        }
        Ok(Self(scores))
    }

    /// Decode offset-33 text (e.g. the fourth line of a FASTQ record).
    ///
    /// # Errors
    ///
    /// Returns `QualityError::InvalidCharacter` for bytes outside `'!'..='~'`.
    pub fn from_phred33(text: &[u8]) -> Result<Self, QualityError> {
        text.iter()
            .enumerate()
            .map(|(position, &byte)| {
                if (PHRED_OFFSET..=b'~').contains(&byte) {
                    Ok(byte - PHRED_OFFSET)
                } else {
                    Err(QualityError::InvalidCharacter { byte, position })
                }
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Encode back to offset-33 bytes.
    #[must_use]
    pub fn to_phred33(&self) -> Vec<u8> {
        self.0.iter().map(|&q| q + PHRED_OFFSET).collect()
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
    pub fn scores(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn get(&self, i: usize) -> Option<u8> {
        self.0.get(i).copied()
    }

    #[must_use]
    pub fn reverse(&self) -> Self {
        Self(self.0.iter().rev().copied().collect())
    }

    /// Copy of the half-open range `start..end`.
    ///
    /// # Errors
    ///
    /// Returns `QualityError::OutOfBounds` if the range does not fit.
    pub fn subrange(&self, start: usize, end: usize) -> Result<Self, QualityError> {
        if start > end || end > self.len() {
            return Err(QualityError::OutOfBounds {
                start,
                end,
                len: self.len(),
            });
        }
        Ok(self.slice(start, end))
    }

    pub(crate) fn slice(&self, start: usize, end: usize) -> Self {
        Self(self.0[start..end].to_vec())
    }

    /// Wrap values the caller has already validated.
    pub(crate) fn from_raw(scores: Vec<u8>) -> Self {
        Self(scores)
    }
}

impl fmt::Display for QualityTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_phred33()))
    }
}
