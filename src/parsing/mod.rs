//! Readers and writers for the files the tools consume and produce.
//!
//! This module provides parsers for:
//!
//! - **Reference sets**: index/barcode sequences with their labels
//! - **FASTQ**: plain or gzip input into [`Read`](crate::core::read::Read)s, and
//!   per-experiment FASTQ output with a bounded number of open files
//! - **SAM/BAM**: header and records through `noodles`
//! - **Clip policies**: per-read-group clip length and mode
//!
//! ## Reference set format
//!
//! One entry per line, whitespace separated:
//!
//! ```text
//! # sequences (colon-delimited, equal length)   label
//! ACGTACG:ACGTACC                                 bc_01
//! TTGACCA                                         bc_02
//! ```

use thiserror::Error;

pub mod alignment;
pub mod fastq;
pub mod policy;
pub mod reference_set;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("noodles error: {0}")]
    Noodles(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Too many reference sequences: {0} exceeds maximum allowed")]
    TooManyEntries(usize),
}
