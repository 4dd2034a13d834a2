use std::path::Path;

use crate::core::sequence::Sequence;
use crate::core::types::Label;
use crate::matching::reference::{MatcherError, ReferenceTable};
use crate::matching::SequenceMatcher;
use crate::parsing::reference_set;

/// Exact-lookup matcher for index reads.
///
/// A hash lookup is already O(1), so there is nothing to memoize.
#[derive(Debug, Clone, Default)]
pub struct ExactMatcher {
    references: ReferenceTable,
}

impl ExactMatcher {
    #[must_use]
    pub fn new(references: ReferenceTable) -> Self {
        Self { references }
    }

    /// # Errors
    ///
    /// Returns a `MatcherError` if the file cannot be parsed or is ambiguous.
    pub fn load_file(path: &Path) -> Result<Self, MatcherError> {
        let mut references = ReferenceTable::new();
        references.add_entries(reference_set::parse_file(path)?)?;
        Ok(Self::new(references))
    }

    /// # Errors
    ///
    /// See [`ReferenceTable::add_set`].
    pub fn add_set(&mut self, sequences: &[Sequence], label: Label) -> Result<(), MatcherError> {
        self.references.add_set(sequences, label)
    }

    #[must_use]
    pub fn references(&self) -> &ReferenceTable {
        &self.references
    }
}

impl SequenceMatcher for ExactMatcher {
    fn find(&mut self, query: &Sequence) -> Option<Label> {
        self.references.get(query).cloned()
    }

    fn barcode_length(&self, label: &Label) -> usize {
        self.references.label_length(label).unwrap_or(0)
    }

    fn sequence_length(&self) -> Option<usize> {
        self.references.sequence_length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_only() {
        let mut m = ExactMatcher::default();
        m.add_set(&[Sequence::new("ACGTACGT").unwrap()], Label::new("i7_01"))
            .unwrap();
        assert_eq!(
            m.find(&Sequence::new("acgtacgt").unwrap()),
            Some(Label::new("i7_01"))
        );
        assert_eq!(m.find(&Sequence::new("ACGTACGA").unwrap()), None);
        assert_eq!(m.sequence_length(), Some(8));
        assert_eq!(m.barcode_length(&Label::new("i7_01")), 8);
    }
}
