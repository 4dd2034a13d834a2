//! CIGAR operations and the fixed read/reference consumption table.
//!
//! | Op | Kind | Read | Reference | In MD |
//! |----|------|------|-----------|-------|
//! | `M` | alignment match | yes | yes | yes |
//! | `I` | insertion | yes | no | no |
//! | `D` | deletion | no | yes | yes |
//! | `N` | skipped region | no | yes | no |
//! | `S` | soft clip | yes | no | no |
//! | `H` | hard clip | no | no | no |
//! | `P` | padding | no | no | no |
//! | `=` | sequence match | yes | yes | yes |
//! | `X` | sequence mismatch | yes | yes | yes |

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CigarError {
    #[error("Empty CIGAR string")]
    Empty,

    #[error("Invalid CIGAR operator '{0}'")]
    InvalidOperator(char),

    #[error("CIGAR operator '{0}' has no length")]
    MissingLength(char),

    #[error("CIGAR operator '{0}' has zero length")]
    ZeroLength(char),

    #[error("CIGAR ends with a length and no operator")]
    TrailingLength,

    #[error("CIGAR operation length overflows")]
    Overflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CigarKind {
    Match,
    Insertion,
    Deletion,
    Skip,
    SoftClip,
    HardClip,
    Pad,
    SequenceMatch,
    SequenceMismatch,
}

impl CigarKind {
    #[must_use]
    pub fn consumes_read(self) -> bool {
        matches!(
            self,
            Self::Match | Self::Insertion | Self::SoftClip | Self::SequenceMatch | Self::SequenceMismatch
        )
    }

    #[must_use]
    pub fn consumes_reference(self) -> bool {
        matches!(
            self,
            Self::Match | Self::Deletion | Self::Skip | Self::SequenceMatch | Self::SequenceMismatch
        )
    }

    /// Positions that have a marker in the MD string
    #[must_use]
    pub fn in_md(self) -> bool {
        matches!(
            self,
            Self::Match | Self::Deletion | Self::SequenceMatch | Self::SequenceMismatch
        )
    }

    /// Read bases aligned to the reference
    #[must_use]
    pub fn is_aligned(self) -> bool {
        matches!(self, Self::Match | Self::SequenceMatch | Self::SequenceMismatch)
    }

    #[must_use]
    pub fn is_clip(self) -> bool {
        matches!(self, Self::SoftClip | Self::HardClip)
    }

    #[must_use]
    pub fn symbol(self) -> char {
        match self {
            Self::Match => 'M',
            Self::Insertion => 'I',
            Self::Deletion => 'D',
            Self::Skip => 'N',
            Self::SoftClip => 'S',
            Self::HardClip => 'H',
            Self::Pad => 'P',
            Self::SequenceMatch => '=',
            Self::SequenceMismatch => 'X',
        }
    }
}

impl TryFrom<char> for CigarKind {
    type Error = CigarError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c {
            'M' => Ok(Self::Match),
            'I' => Ok(Self::Insertion),
            'D' => Ok(Self::Deletion),
            'N' => Ok(Self::Skip),
            'S' => Ok(Self::SoftClip),
            'H' => Ok(Self::HardClip),
            'P' => Ok(Self::Pad),
            '=' => Ok(Self::SequenceMatch),
            'X' => Ok(Self::SequenceMismatch),
            other => Err(CigarError::InvalidOperator(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CigarOp {
    pub kind: CigarKind,
    pub len: usize,
}

impl CigarOp {
    #[must_use]
    pub fn new(kind: CigarKind, len: usize) -> Self {
        Self { kind, len }
    }
}

impl fmt::Display for CigarOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.len, self.kind.symbol())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Cigar(Vec<CigarOp>);

impl Cigar {
    /// Build from operations, merging adjacent runs of the same kind and
    /// dropping zero-length operations.
    #[must_use]
    pub fn new(ops: Vec<CigarOp>) -> Self {
        let mut merged: Vec<CigarOp> = Vec::with_capacity(ops.len());
        for op in ops.into_iter().filter(|op| op.len > 0) {
            match merged.last_mut() {
                Some(last) if last.kind == op.kind => last.len += op.len,
                _ => merged.push(op),
            }
        }
        Self(merged)
    }

    #[must_use]
    pub fn ops(&self) -> &[CigarOp] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// One kind per position, in order
    #[must_use]
    pub fn unroll(&self) -> Vec<CigarKind> {
        self.0
            .iter()
            .flat_map(|op| std::iter::repeat(op.kind).take(op.len))
            .collect()
    }

    /// Inverse of [`Cigar::unroll`]
    #[must_use]
    pub fn roll(kinds: &[CigarKind]) -> Self {
        Self::new(kinds.iter().map(|&kind| CigarOp::new(kind, 1)).collect())
    }

    /// Read bases described, clipped bases included
    #[must_use]
    pub fn read_length(&self) -> usize {
        self.count(CigarKind::consumes_read)
    }

    #[must_use]
    pub fn reference_length(&self) -> usize {
        self.count(CigarKind::consumes_reference)
    }

    /// Positions that should carry an MD marker
    #[must_use]
    pub fn md_length(&self) -> usize {
        self.count(CigarKind::in_md)
    }

    #[must_use]
    pub fn insertions(&self) -> usize {
        self.count(|kind| kind == CigarKind::Insertion)
    }

    #[must_use]
    pub fn has_aligned_bases(&self) -> bool {
        self.0.iter().any(|op| op.kind.is_aligned())
    }

    fn count(&self, predicate: impl Fn(CigarKind) -> bool) -> usize {
        self.0
            .iter()
            .filter(|op| predicate(op.kind))
            .map(|op| op.len)
            .sum()
    }
}

impl FromIterator<CigarOp> for Cigar {
    fn from_iter<I: IntoIterator<Item = CigarOp>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl FromStr for Cigar {
    type Err = CigarError;

    /// Parse CIGAR text; `*` is the empty CIGAR.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(CigarError::Empty);
        }
        if s == "*" {
            return Ok(Self::default());
        }

        let mut ops = Vec::new();
        let mut len: Option<usize> = None;

        for c in s.chars() {
            if let Some(digit) = c.to_digit(10) {
                let value = len
                    .unwrap_or(0)
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(digit as usize))
                    .ok_or(CigarError::Overflow)?;
                len = Some(value);
                continue;
            }

            let kind = CigarKind::try_from(c)?;
            match len.take() {
                None => return Err(CigarError::MissingLength(c)),
                Some(0) => return Err(CigarError::ZeroLength(c)),
                Some(n) => ops.push(CigarOp::new(kind, n)),
            }
        }

        if len.is_some() {
            return Err(CigarError::TrailingLength);
        }

        Ok(Self(ops))
    }
}

impl fmt::Display for Cigar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "*");
        }
        for op in &self.0 {
            write!(f, "{op}")?;
        }
        Ok(())
    }
}
