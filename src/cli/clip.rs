use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use tracing::{info, warn};

use crate::alignment::clipper::{AlignmentClipper, AlignmentRecord, ClipPolicy, ClipPolicyTable};
use crate::cli::OutputFormat;
use crate::core::types::ClipMode;
use crate::parsing::alignment::{AlignmentReader, AlignmentWriter};
use crate::parsing::policy;

#[derive(Args)]
pub struct ClipArgs {
    /// Input alignments (SAM or BAM)
    pub input: PathBuf,

    /// Output alignments (SAM or BAM, chosen by extension)
    pub output: PathBuf,

    /// Bases to clip from each end
    #[arg(short = 'n', long, default_value = "2")]
    pub clip_length: usize,

    /// Soft-clip (keep bases) or hard-clip (remove bases)
    #[arg(short, long, value_enum, default_value = "soft")]
    pub mode: ClipMode,

    /// Per-read-group overrides: TSV of read group, clip length, soft|hard
    #[arg(long)]
    pub policy: Option<PathBuf>,
}

/// Record counts for a clip run
#[derive(Debug, Default, Serialize)]
pub struct ClipStats {
    pub records: usize,
    pub clipped: usize,
    /// Written unchanged
    pub unmapped: usize,
    /// Could not be clipped; logged and left out
    pub skipped: usize,
    /// No aligned base left after clipping
    pub dropped: usize,
}

/// Execute clip subcommand
///
/// # Errors
///
/// Returns an error if the policy file is invalid, or the input cannot be read
/// or the output written. Individual bad records are skipped, not errors.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: ClipArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let default = ClipPolicy {
        length: args.clip_length,
        mode: args.mode,
    };
    let policies = match &args.policy {
        Some(path) => policy::parse_policy_file(path, default)
            .with_context(|| format!("Failed to load clip policy {}", path.display()))?,
        None => ClipPolicyTable::new(default),
    };
    if verbose {
        eprintln!(
            "Clipping {} {} base(s) per end, {} read group override(s)",
            default.mode,
            default.length,
            policies.len()
        );
    }
    let clipper = AlignmentClipper::new(policies);

    let reader = AlignmentReader::open(&args.input)
        .with_context(|| format!("Failed to open {}", args.input.display()))?;
    let mut writer = AlignmentWriter::create(&args.output, reader.header())
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    let (_, records) = reader.into_parts();
    let mut stats = ClipStats::default();

    for result in records {
        let mut record =
            result.with_context(|| format!("Failed to read {}", args.input.display()))?;
        stats.records += 1;

        if record.flags().is_unmapped() || record.cigar().as_ref().is_empty() {
            writer.write(&record)?;
            stats.unmapped += 1;
            continue;
        }

        let clipped = AlignmentRecord::from_record_buf(&record).and_then(|mut rec| {
            clipper.clip(&mut rec)?;
            Ok(rec)
        });

        let rec = match clipped {
            Ok(rec) => rec,
            Err(e) => {
                let name = record
                    .name()
                    .map(|n| String::from_utf8_lossy(n).into_owned())
                    .unwrap_or_default();
                warn!(record = %name, error = %e, "Skipping record");
                stats.skipped += 1;
                continue;
            }
        };

        if !rec.has_aligned_bases() {
            stats.dropped += 1;
            continue;
        }

        if let Err(e) = rec.apply_to(&mut record) {
            warn!(record = %rec.name, error = %e, "Skipping record");
            stats.skipped += 1;
            continue;
        }

        writer.write(&record)?;
        stats.clipped += 1;
    }

    writer
        .finish()
        .with_context(|| format!("Failed to finish {}", args.output.display()))?;
    info!(
        records = stats.records,
        clipped = stats.clipped,
        skipped = stats.skipped,
        dropped = stats.dropped,
        "Clipping complete"
    );

    match format {
        OutputFormat::Text => {
            println!("Records:   {}", stats.records);
            println!("Clipped:   {}", stats.clipped);
            println!("Unmapped:  {}", stats.unmapped);
            println!("Skipped:   {}", stats.skipped);
            println!("Dropped:   {}", stats.dropped);
        }
        OutputFormat::Json => crate::cli::print_json(&stats)?,
    }

    Ok(())
}
