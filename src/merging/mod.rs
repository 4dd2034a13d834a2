//! Paired-read overlap merging.
//!
//! Ancient DNA fragments are often shorter than the read length, so the
//! forward read and the reverse-complemented reverse read overlap, sometimes
//! running through into adapter. [`ReadMerger`](merger::ReadMerger) searches
//! the offsets between the two reads, scoring mismatches by base quality, and
//! only merges when exactly one offset is acceptable.
//!
//! [`ReadProcessor`](processor::ReadProcessor) wraps the merger with index and
//! barcode identification, producing an
//! [`ExperimentKey`](crate::core::types::ExperimentKey) for every read pair.

pub mod merger;
pub mod processor;
