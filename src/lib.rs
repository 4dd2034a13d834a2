//! # adna-screen
//!
//! A library for screening and processing ancient-DNA sequencing reads.
//!
//! Ancient DNA is fragmented and damaged: inserts are often shorter than the
//! read length, and deamination concentrates errors at the fragment ends.
//! `adna-screen` covers the three steps where that matters:
//!
//! ## Features
//!
//! - **Index and barcode matching**: nearest reference within a Hamming distance bound,
//!   with ambiguous reference sets rejected at load time
//! - **Read merging**: quality-aware overlap merging of read pairs that refuses
//!   to guess between equally good overlaps
//! - **Alignment clipping**: soft or hard clipping of read ends that keeps
//!   alignment start, CIGAR, MD and NM consistent
//! - **Bounded resources**: an LRU [`Cache`](cache::Cache) that releases evicted
//!   values, used for memoized lookups and open output files
//!
//! ## Example
//!
//! ```rust
//! use adna_screen::core::read::Read;
//! use adna_screen::merging::merger::{MergeConfig, MergeOutcome, ReadMerger};
//!
//! let insert = "ACGGTCATTGCAAGTCCTAGGATCGTTACAGCTTGACCATGAGTCAATCGCTATGGACTTCAGCATAGTC";
//! let quals = "I".repeat(insert.len());
//! let forward = Read::from_text(Some("r1"), insert.as_bytes(), quals.as_bytes()).unwrap();
//! let reverse = forward.reverse_complement();
//!
//! let merger = ReadMerger::new(MergeConfig::default()).unwrap();
//! // The reverse read is merged after reverse-complementing it back
//! match merger.merge(&forward, &reverse.reverse_complement()) {
//!     MergeOutcome::Merged { read, offset } => {
//!         assert_eq!(offset, 0);
//!         assert_eq!(read.sequence().to_string(), insert);
//!     }
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Sequences, quality tracks, reads, and experiment keys
//! - [`cache`]: Bounded LRU cache with resource release
//! - [`matching`]: Index and barcode matchers
//! - [`merging`]: Read-pair merging and per-pair processing
//! - [`alignment`]: CIGAR/MD models and the alignment clipper
//! - [`parsing`]: Reference sets, FASTQ, SAM/BAM, and clip policy files
//! - [`cli`]: Command-line interface implementation

pub mod alignment;
pub mod cache;
pub mod cli;
pub mod core;
pub mod matching;
pub mod merging;
pub mod parsing;
pub mod utils;

// Re-export commonly used types for convenience
pub use alignment::clipper::{AlignmentClipper, AlignmentRecord, ClipPolicy};
pub use alignment::md::EditString;
pub use cache::{Cache, Release};
pub use core::read::Read;
pub use core::sequence::Sequence;
pub use core::types::*;
pub use matching::engine::Matcher;
pub use matching::SequenceMatcher;
pub use merging::merger::{MergeConfig, MergeOutcome, ReadMerger};
