use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::core::sequence::{Sequence, SequenceError};
use crate::core::types::Label;
use crate::parsing::reference_set::ReferenceSetEntry;
use crate::parsing::ParseError;
use crate::utils::validation::{check_reference_limit, validate_label};

/// Configuration errors raised while loading reference sets.
///
/// These indicate a bad reference file and must stop processing before any query is served.
#[derive(Error, Debug)]
pub enum MatcherError {
    #[error("Label '{0}' is already loaded")]
    DuplicateLabel(Label),

    #[error("Sequence {sequence} of '{label}' is already registered under '{existing}'")]
    DuplicateSequence {
        sequence: Sequence,
        label: Label,
        existing: Label,
    },

    #[error("Sequence {sequence} of '{label}' has length {found}, expected {expected}")]
    LengthMismatch {
        sequence: Sequence,
        label: Label,
        expected: usize,
        found: usize,
    },

    #[error("Reference set '{0}' contains no sequences")]
    EmptySet(Label),

    #[error("Invalid label '{label}': {reason}")]
    InvalidLabel { label: String, reason: String },

    #[error("Too many reference sequences: exceeds maximum of {0}")]
    TooManyReferences(usize),

    #[error(transparent)]
    InvalidSequence(#[from] SequenceError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Validated reference sequences with their labels.
///
/// Every sequence has the same length, every label is unique, and no sequence
/// is registered under two labels. Insertion order is preserved.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    /// (sequence, label) in insertion order
    entries: Vec<(Sequence, Label)>,

    /// Index: sequence -> label (exact lookups and duplicate detection)
    sequence_to_label: HashMap<Sequence, Label>,

    /// Index: label -> length of its sequences
    label_to_length: HashMap<Label, usize>,

    /// Common length of every loaded sequence
    sequence_length: Option<usize>,
}

impl ReferenceTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a set of interchangeable sequences under one label.
    ///
    /// The whole set is validated before anything is inserted, so a failed call
    /// leaves the table unchanged.
    ///
    /// # Errors
    ///
    /// Returns a `MatcherError` if the label is invalid or already loaded, the set is
    /// empty, a sequence length differs from the loaded ones, or a sequence is already
    /// registered under another label.
    pub fn add_set(&mut self, sequences: &[Sequence], label: Label) -> Result<(), MatcherError> {
        validate_label(label.as_str()).map_err(|reason| MatcherError::InvalidLabel {
            label: label.0.clone(),
            reason,
        })?;
        if self.label_to_length.contains_key(&label) {
            return Err(MatcherError::DuplicateLabel(label));
        }
        let Some(first) = sequences.first() else {
            return Err(MatcherError::EmptySet(label));
        };
        if check_reference_limit(self.entries.len() + sequences.len()).is_some() {
            return Err(MatcherError::TooManyReferences(
                crate::utils::validation::MAX_REFERENCE_SEQUENCES,
            ));
        }

        let expected = self.sequence_length.unwrap_or(first.len());
        let mut unique: Vec<&Sequence> = Vec::with_capacity(sequences.len());
        for sequence in sequences {
            if sequence.len() != expected {
                return Err(MatcherError::LengthMismatch {
                    sequence: sequence.clone(),
                    label,
                    expected,
                    found: sequence.len(),
                });
            }
            if let Some(existing) = self.sequence_to_label.get(sequence) {
                return Err(MatcherError::DuplicateSequence {
                    sequence: sequence.clone(),
                    label,
                    existing: existing.clone(),
                });
            }
            if unique.contains(&sequence) {
                debug!(label = %label, sequence = %sequence, "Ignoring repeated sequence within set");
                continue;
            }
            unique.push(sequence);
        }

        for sequence in unique {
            self.sequence_to_label
                .insert(sequence.clone(), label.clone());
            self.entries.push((sequence.clone(), label.clone()));
        }
        self.label_to_length.insert(label, expected);
        self.sequence_length = Some(expected);
        Ok(())
    }

    /// Load every entry of a parsed reference-set file.
    ///
    /// # Errors
    ///
    /// Returns the first `MatcherError` raised by [`ReferenceTable::add_set`].
    pub fn add_entries(&mut self, entries: Vec<ReferenceSetEntry>) -> Result<(), MatcherError> {
        for entry in entries {
            self.add_set(&entry.sequences, entry.label)?;
        }
        Ok(())
    }

    /// Exact lookup.
    #[must_use]
    pub fn get(&self, sequence: &Sequence) -> Option<&Label> {
        self.sequence_to_label.get(sequence)
    }

    /// (sequence, label) pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &(Sequence, Label)> {
        self.entries.iter()
    }

    #[must_use]
    pub fn label_length(&self, label: &Label) -> Option<usize> {
        self.label_to_length.get(label).copied()
    }

    #[must_use]
    pub fn sequence_length(&self) -> Option<usize> {
        self.sequence_length
    }

    #[must_use]
    pub fn num_labels(&self) -> usize {
        self.label_to_length.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
