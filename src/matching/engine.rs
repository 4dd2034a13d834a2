use std::num::NonZeroUsize;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::{Cache, CacheStats};
use crate::core::sequence::Sequence;
use crate::core::types::Label;
use crate::matching::reference::{MatcherError, ReferenceTable};
use crate::matching::SequenceMatcher;
use crate::parsing::reference_set;

/// Default number of memoized queries kept by a [`Matcher`]
pub const DEFAULT_CACHE_CAPACITY: usize = 100_000;

/// Configuration for a [`Matcher`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Largest Hamming distance accepted as a match
    pub max_distance: usize,
    /// Number of memoized queries (hits and misses) kept
    pub cache_capacity: NonZeroUsize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            max_distance: 1,
            cache_capacity: NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

/// Bounded-Hamming-distance nearest-neighbor classifier with memoization.
///
/// Queries are resolved by an exact lookup, then by a linear scan over the
/// references in insertion order keeping the closest one. On ties the
/// first-inserted reference wins. Both matches and misses are memoized.
///
/// The memo is invalidated when its answers could change:
///
/// | Mutation | Memo |
/// |----------|------|
/// | [`Matcher::add_set`] | cleared (a miss may now match) |
/// | [`Matcher::set_max_distance`] lower | cleared (a match may now be out of bounds) |
/// | [`Matcher::set_max_distance`] higher or equal | kept; earlier misses stay misses until evicted |
pub struct Matcher {
    references: ReferenceTable,
    max_distance: usize,
    cache: Cache<Sequence, Option<Label>>,
}

impl Matcher {
    #[must_use]
    pub fn new(config: &MatcherConfig) -> Self {
        Self {
            references: ReferenceTable::new(),
            max_distance: config.max_distance,
            cache: Cache::new(config.cache_capacity),
        }
    }

    /// Build a matcher from an already validated reference table.
    #[must_use]
    pub fn with_references(references: ReferenceTable, config: &MatcherConfig) -> Self {
        Self {
            references,
            max_distance: config.max_distance,
            cache: Cache::new(config.cache_capacity),
        }
    }

    /// Load a reference-set file.
    ///
    /// # Errors
    ///
    /// Returns a `MatcherError` if the file cannot be parsed or contains an ambiguous
    /// or inconsistent reference set.
    pub fn load_file(path: &Path, config: &MatcherConfig) -> Result<Self, MatcherError> {
        let entries = reference_set::parse_file(path)?;
        let mut references = ReferenceTable::new();
        references.add_entries(entries)?;
        debug!(
            path = %path.display(),
            labels = references.num_labels(),
            sequences = references.len(),
            "Loaded reference set"
        );
        Ok(Self::with_references(references, config))
    }

    /// Register another reference set. Clears the memo.
    ///
    /// # Errors
    ///
    /// See [`ReferenceTable::add_set`].
    pub fn add_set(&mut self, sequences: &[Sequence], label: Label) -> Result<(), MatcherError> {
        self.references.add_set(sequences, label)?;
        self.cache.clear();
        Ok(())
    }

    #[must_use]
    pub fn max_distance(&self) -> usize {
        self.max_distance
    }

    /// Change the distance bound. Lowering it clears the memo; raising it does not.
    pub fn set_max_distance(&mut self, max_distance: usize) {
        if max_distance < self.max_distance {
            self.cache.clear();
        }
        self.max_distance = max_distance;
    }

    #[must_use]
    pub fn references(&self) -> &ReferenceTable {
        &self.references
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Best label within the distance bound, memoized.
    pub fn find(&mut self, query: &Sequence) -> Option<Label> {
        if let Some(cached) = self.cache.get(query) {
            return cached.clone();
        }
        let result = self.scan(query);
        self.cache.put(query.clone(), result.clone());
        result
    }

    fn scan(&self, query: &Sequence) -> Option<Label> {
        if let Some(label) = self.references.get(query) {
            return Some(label.clone());
        }

        let mut best: Option<(usize, &Label)> = None;
        for (reference, label) in self.references.iter() {
            // Length mismatch is a failed match for this entry, not an error
            let Ok(distance) = reference.hamming_distance(query) else {
                continue;
            };
            if best.map_or(true, |(d, _)| distance < d) {
                best = Some((distance, label));
                if distance == 0 {
                    break;
                }
            }
        }

        best.filter(|(d, _)| *d <= self.max_distance)
            .map(|(_, label)| label.clone())
    }
}

impl SequenceMatcher for Matcher {
    fn find(&mut self, query: &Sequence) -> Option<Label> {
        Matcher::find(self, query)
    }

    fn barcode_length(&self, label: &Label) -> usize {
        self.references.label_length(label).unwrap_or(0)
    }

    fn sequence_length(&self) -> Option<usize> {
        self.references.sequence_length()
    }
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher")
            .field("references", &self.references.len())
            .field("max_distance", &self.max_distance)
            .field("cache", &self.cache)
            .finish()
    }
}
