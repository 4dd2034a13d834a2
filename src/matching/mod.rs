//! Index and barcode identification.
//!
//! This module provides the matchers that map a noisy query sequence to the label
//! of a known reference group:
//!
//! - [`Matcher`](engine::Matcher): bounded-Hamming-distance nearest neighbor, memoized
//! - [`ExactMatcher`](exact::ExactMatcher): exact lookup, used for index reads
//! - [`ReferenceTable`](reference::ReferenceTable): the validated reference sets both share
//!
//! Callers such as [`ReadProcessor`](crate::merging::processor::ReadProcessor) only
//! depend on the [`SequenceMatcher`] capability.
//!
//! ## Example
//!
//! ```rust
//! use adna_screen::core::sequence::Sequence;
//! use adna_screen::core::types::Label;
//! use adna_screen::matching::engine::{Matcher, MatcherConfig};
//!
//! let config = MatcherConfig { max_distance: 1, ..MatcherConfig::default() };
//! let mut matcher = Matcher::new(&config);
//! matcher.add_set(&[Sequence::new("ATCGATT").unwrap()], Label::new("Q1")).unwrap();
//!
//! let query = Sequence::new("ATCGATG").unwrap();
//! assert_eq!(matcher.find(&query), Some(Label::new("Q1")));
//! ```

pub mod engine;
pub mod exact;
pub mod reference;

use crate::core::sequence::Sequence;
use crate::core::types::Label;

pub use reference::MatcherError;

/// Capability shared by every matcher implementation.
pub trait SequenceMatcher {
    /// Label of the reference group matching `query`, if any.
    fn find(&mut self, query: &Sequence) -> Option<Label>;

    /// Number of read bases occupied by a barcode of the given label (0 if unknown).
    fn barcode_length(&self, label: &Label) -> usize;

    /// Common length of the loaded reference sequences, if any are loaded.
    fn sequence_length(&self) -> Option<usize>;
}
