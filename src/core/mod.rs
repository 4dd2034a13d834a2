//! Core data types for read screening.
//!
//! This module provides the value types used throughout the library:
//!
//! - [`Sequence`](sequence::Sequence): validated nucleotide string (`A`, `C`, `G`, `T`, `N`)
//! - [`QualityTrack`](quality::QualityTrack): per-base Phred scores with the offset-33 codec
//! - [`Read`](read::Read): header + sequence + qualities, always of equal length
//! - [`ReadQuad`](read::ReadQuad): forward, reverse, and index lanes of one physical read
//! - [`Label`](types::Label), [`ExperimentKey`](types::ExperimentKey): match identities
//!
//! All of them are immutable values; transforms return new instances.

pub mod quality;
pub mod read;
pub mod sequence;
pub mod types;
