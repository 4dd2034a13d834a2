//! Command-line interface for adna-screen.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **merge**: Identify indexes and barcodes, merge overlapping read pairs, and
//!   write one FASTQ per experiment
//! - **clip**: Clip damaged bases from both ends of aligned reads in a SAM/BAM file
//! - **lookup**: Resolve sequences against a reference set (diagnostics)
//!
//! ## Usage
//!
//! ```text
//! # Merge read pairs, demultiplexing by p7 barcode
//! adna-screen merge -1 r1.fq.gz -2 r2.fq.gz --p7 p7.txt -o merged/
//!
//! # Hard-clip two bases from each end, with per-library overrides
//! adna-screen clip in.bam out.bam --clip-length 2 --mode hard --policy libraries.tsv
//!
//! # Which barcode does a sequence belong to?
//! adna-screen lookup --references p7.txt ACGTACG TTGACCA --format json
//! ```

use clap::{Parser, Subcommand};

pub mod clip;
pub mod lookup;
pub mod merge;

#[derive(Parser)]
#[command(name = "adna-screen")]
#[command(version)]
#[command(about = "Screen ancient-DNA reads: barcode matching, read merging, and alignment clipping")]
#[command(
    long_about = "adna-screen processes ancient-DNA sequencing data.\n\nIt provides:\n- Index and barcode identification with bounded mismatches\n- Quality-aware merging of overlapping read pairs\n- Clipping of damage-prone read ends in aligned records, keeping CIGAR, MD and NM consistent"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format for summaries
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Merge overlapping read pairs and split them by experiment
    Merge(merge::MergeArgs),

    /// Clip both ends of aligned reads
    Clip(clip::ClipArgs),

    /// Look up sequences in a reference set
    Lookup(lookup::LookupArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Print a serializable summary as pretty JSON on stdout.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
