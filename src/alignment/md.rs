//! The MD alignment annotation as a per-position tape.
//!
//! An MD string such as `0A17T1^C23C7` describes, for every reference-consuming
//! position of an alignment covered by MD, whether the read matched the
//! reference, carried a substitution (the reference base is given), or skipped
//! a deleted reference base (`^` run). Parsing unrolls it into one [`EditOp`]
//! per position so that clipping is a plain positional cut.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Largest single match count accepted while parsing
pub const MAX_MATCH_RUN: usize = 10_000_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditStringError {
    #[error("Empty MD string")]
    Empty,

    #[error("Invalid character '{character}' at position {position} in MD string")]
    InvalidCharacter { character: char, position: usize },

    #[error("Expected a match count at position {0} in MD string")]
    MissingCount(usize),

    #[error("Deletion without bases at position {0} in MD string")]
    EmptyDeletion(usize),

    #[error("Match count {0} exceeds maximum of {MAX_MATCH_RUN}")]
    RunTooLong(usize),
}

/// One reference position of an MD tape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    Match,
    /// Substitution; holds the reference base
    Mismatch(u8),
    /// Deleted reference base; `opens_run` marks the first base after a `^`
    Deletion { base: u8, opens_run: bool },
}

impl EditOp {
    #[must_use]
    pub fn is_edit(self) -> bool {
        !matches!(self, Self::Match)
    }
}

/// Parsed MD string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditString {
    ops: Vec<EditOp>,
}

impl EditString {
    /// Parse MD text matching `[0-9]+(([A-Z]|\^[A-Z]+)[0-9]+)*`.
    ///
    /// # Errors
    ///
    /// Returns an `EditStringError` if the text does not follow the grammar.
    pub fn parse(text: &str) -> Result<Self, EditStringError> {
        if text.is_empty() {
            return Err(EditStringError::Empty);
        }

        let bytes = text.as_bytes();
        let mut ops = Vec::new();
        let mut pos = read_count(bytes, 0, &mut ops)?;

        while pos < bytes.len() {
            let b = bytes[pos];
            if b == b'^' {
                let run_start = pos + 1;
                let mut end = run_start;
                while end < bytes.len() && bytes[end].is_ascii_uppercase() {
                    end += 1;
                }
                if end == run_start {
                    return Err(EditStringError::EmptyDeletion(pos));
                }
                for (i, &base) in bytes[run_start..end].iter().enumerate() {
                    ops.push(EditOp::Deletion {
                        base,
                        opens_run: i == 0,
                    });
                }
                pos = end;
            } else if b.is_ascii_uppercase() {
                ops.push(EditOp::Mismatch(b));
                pos += 1;
            } else {
                return Err(EditStringError::InvalidCharacter {
                    character: char::from(b),
                    position: pos,
                });
            }
            pos = read_count(bytes, pos, &mut ops)?;
        }

        Ok(Self { ops })
    }

    #[must_use]
    pub fn ops(&self) -> &[EditOp] {
        &self.ops
    }

    /// Number of reference positions on the tape
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Remove `left` positions from the front and `right` from the back,
    /// whatever their kind. Clipping more than the tape holds empties it.
    pub fn clip(&mut self, left: usize, right: usize) {
        let left = left.min(self.ops.len());
        self.ops.drain(..left);
        let keep = self.ops.len().saturating_sub(right);
        self.ops.truncate(keep);
    }

    /// Substitutions plus deleted bases
    #[must_use]
    pub fn edit_distance(&self) -> usize {
        self.ops.iter().filter(|op| op.is_edit()).count()
    }
}

fn read_count(bytes: &[u8], start: usize, ops: &mut Vec<EditOp>) -> Result<usize, EditStringError> {
    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == start {
        return match bytes.get(start) {
            Some(&b) if !b.is_ascii_uppercase() && b != b'^' => {
                Err(EditStringError::InvalidCharacter {
                    character: char::from(b),
                    position: start,
                })
            }
            _ => Err(EditStringError::MissingCount(start)),
        };
    }

    let mut count = 0usize;
    for &digit in &bytes[start..end] {
        count = count
            .saturating_mul(10)
            .saturating_add(usize::from(digit - b'0'));
        if count > MAX_MATCH_RUN {
            return Err(EditStringError::RunTooLong(count));
        }
    }
    ops.extend(std::iter::repeat(EditOp::Match).take(count));
    Ok(end)
}

impl FromStr for EditString {
    type Err = EditStringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for EditString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut matches = 0usize;
        let mut in_deletion = false;

        for op in &self.ops {
            match *op {
                EditOp::Match => {
                    matches += 1;
                    in_deletion = false;
                }
                EditOp::Mismatch(base) => {
                    write!(f, "{matches}{}", char::from(base))?;
                    matches = 0;
                    in_deletion = false;
                }
                EditOp::Deletion { base, opens_run } => {
                    if opens_run || !in_deletion {
                        write!(f, "{matches}^")?;
                        matches = 0;
                    }
                    write!(f, "{}", char::from(base))?;
                    in_deletion = true;
                }
            }
        }

        write!(f, "{matches}")
    }
}
