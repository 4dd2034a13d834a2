use thiserror::Error;

use crate::core::quality::{QualityError, QualityTrack};
use crate::core::sequence::{Sequence, SequenceError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    #[error("Sequence has {sequence} bases but quality track has {quality} scores")]
    LengthMismatch { sequence: usize, quality: usize },

    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error(transparent)]
    Quality(#[from] QualityError),

    #[error("Read names differ between lanes: '{expected}' vs '{found}' ({lane})")]
    NameMismatch {
        expected: String,
        found: String,
        lane: &'static str,
    },
}

/// A sequenced read: optional header, bases, and one quality score per base.
///
/// Reads are immutable; every transform returns a new read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Read {
    header: Option<String>,
    sequence: Sequence,
    quality: QualityTrack,
}

impl Read {
    /// # Errors
    ///
    /// Returns `ReadError::LengthMismatch` if the sequence and quality track differ in length.
    pub fn new(
        header: Option<String>,
        sequence: Sequence,
        quality: QualityTrack,
    ) -> Result<Self, ReadError> {
        if sequence.len() != quality.len() {
            return Err(ReadError::LengthMismatch {
                sequence: sequence.len(),
                quality: quality.len(),
            });
        }
        Ok(Self {
            header,
            sequence,
            quality,
        })
    }

    /// Build a read from FASTQ-style text fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the bases or qualities are malformed or their lengths differ.
    pub fn from_text(header: Option<&str>, bases: &[u8], qualities: &[u8]) -> Result<Self, ReadError> {
        Self::new(
            header.map(str::to_string),
            Sequence::from_bytes(bases)?,
            QualityTrack::from_phred33(qualities)?,
        )
    }

    /// Assemble a read whose sequence and quality are known to have equal length.
    pub(crate) fn from_parts(header: Option<String>, sequence: Sequence, quality: QualityTrack) -> Self {
        debug_assert_eq!(sequence.len(), quality.len());
        Self {
            header,
            sequence,
            quality,
        }
    }

    #[must_use]
    pub fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    /// Read name: the first whitespace-delimited header token, without a `/1`..`/4` mate suffix.
    #[must_use]
    pub fn name(&self) -> &str {
        let token = self
            .header
            .as_deref()
            .and_then(|h| h.split_whitespace().next())
            .unwrap_or("");
        ["/1", "/2", "/3", "/4"]
            .iter()
            .find_map(|suffix| token.strip_suffix(suffix))
            .unwrap_or(token)
    }

    #[must_use]
    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    #[must_use]
    pub fn quality(&self) -> &QualityTrack {
        &self.quality
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    #[must_use]
    pub fn with_header(&self, header: Option<String>) -> Self {
        Self {
            header,
            sequence: self.sequence.clone(),
            quality: self.quality.clone(),
        }
    }

    /// Reverse-complemented bases with reversed qualities.
    #[must_use]
    pub fn reverse_complement(&self) -> Self {
        Self {
            header: self.header.clone(),
            sequence: self.sequence.reverse_complement(),
            quality: self.quality.reverse(),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the range does not fit the read.
    pub fn subrange(&self, start: usize, end: usize) -> Result<Self, ReadError> {
        Ok(Self {
            header: self.header.clone(),
            sequence: self.sequence.subrange(start, end)?,
            quality: self.quality.subrange(start, end)?,
        })
    }

    /// Remove `front` bases from the start and `back` bases from the end,
    /// saturating at an empty read.
    #[must_use]
    pub fn trim(&self, front: usize, back: usize) -> Self {
        let start = front.min(self.len());
        let end = self.len().saturating_sub(back).max(start);
        Self {
            header: self.header.clone(),
            sequence: self.sequence.slice(start, end),
            quality: self.quality.slice(start, end),
        }
    }
}

/// The four lanes describing one physical read: forward, reverse, and the two index reads.
#[derive(Debug, Clone)]
pub struct ReadQuad {
    pub forward: Read,
    pub reverse: Read,
    pub index1: Option<Read>,
    pub index2: Option<Read>,
}

impl ReadQuad {
    /// # Errors
    ///
    /// Returns `ReadError::NameMismatch` if any lane names a different read than the forward lane.
    pub fn new(
        forward: Read,
        reverse: Read,
        index1: Option<Read>,
        index2: Option<Read>,
    ) -> Result<Self, ReadError> {
        let expected = forward.name();
        let lanes = [
            ("reverse", Some(&reverse)),
            ("index1", index1.as_ref()),
            ("index2", index2.as_ref()),
        ];
        for (lane, read) in lanes {
            if let Some(read) = read {
                if read.name() != expected {
                    return Err(ReadError::NameMismatch {
                        expected: expected.to_string(),
                        found: read.name().to_string(),
                        lane,
                    });
                }
            }
        }
        Ok(Self {
            forward,
            reverse,
            index1,
            index2,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(header: &str, bases: &str, quals: &str) -> Read {
        Read::from_text(Some(header), bases.as_bytes(), quals.as_bytes()).unwrap()
    }

    #[test]
    fn test_new_rejects_length_mismatch() {
        let result = Read::from_text(None, b"ACGT", b"III");
        assert_eq!(
            result,
            Err(ReadError::LengthMismatch {
                sequence: 4,
                quality: 3
            })
        );
    }

    #[test]
    fn test_name_strips_mate_suffix() {
        assert_eq!(read("r1/1 extra", "A", "I").name(), "r1");
        assert_eq!(read("r1 1:N:0:ACGT", "A", "I").name(), "r1");
        assert_eq!(read("r1/5", "A", "I").name(), "r1/5");
        let anonymous = Read::from_text(None, b"A", b"I").unwrap();
        assert_eq!(anonymous.name(), "");
    }

    #[test]
    fn test_reverse_complement_reverses_qualities() {
        let r = read("r", "AACG", "!+5?");
        let rc = r.reverse_complement();
        assert_eq!(rc.sequence().to_string(), "CGTT");
        assert_eq!(rc.quality().to_string(), "?5+!");
        assert_eq!(rc.reverse_complement(), r);
    }

    #[test]
    fn test_trim_saturates() {
        let r = read("r", "ACGTAC", "IIIII5");
        assert_eq!(r.trim(2, 1).sequence().to_string(), "GTA");
        assert_eq!(r.trim(0, 0), r);
        assert!(r.trim(4, 4).is_empty());
        assert_eq!(r.trim(4, 4).quality().len(), 0);
    }

    #[test]
    fn test_subrange() {
        let r = read("r", "ACGTAC", "!+5?II");
        let sub = r.subrange(1, 3).unwrap();
        assert_eq!(sub.sequence().to_string(), "CG");
        assert_eq!(sub.quality().to_string(), "+5");
        assert!(r.subrange(5, 7).is_err());
    }

    #[test]
    fn test_read_quad_name_validation() {
        let fwd = read("pair7/1", "ACGT", "IIII");
        let rev = read("pair7/2", "ACGT", "IIII");
        let idx = read("pair7/3", "GGCC", "IIII");
        assert!(ReadQuad::new(fwd.clone(), rev.clone(), Some(idx.clone()), None).is_ok());

        let other = read("pair8/3", "GGCC", "IIII");
        let err = ReadQuad::new(fwd, rev, Some(idx), Some(other)).unwrap_err();
        assert!(matches!(err, ReadError::NameMismatch { lane: "index2", .. }));
    }
}
