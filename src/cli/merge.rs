use std::io::BufRead;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Args;
use serde::Serialize;
use tracing::{debug, info};

use crate::cache::CacheStats;
use crate::cli::OutputFormat;
use crate::core::read::{Read, ReadQuad};
use crate::matching::engine::{Matcher, MatcherConfig, DEFAULT_CACHE_CAPACITY};
use crate::matching::exact::ExactMatcher;
use crate::matching::SequenceMatcher;
use crate::merging::merger::{MergeConfig, ReadMerger};
use crate::merging::processor::{MergeStats, ProcessOutcome, ReadProcessor};
use crate::parsing::fastq::{self, ExperimentSinks, FastqReads};
use crate::utils::validation::validate_suffix;

#[derive(Args)]
pub struct MergeArgs {
    /// Forward reads (FASTQ, optionally gzipped)
    #[arg(short = '1', long)]
    pub forward: PathBuf,

    /// Reverse reads (FASTQ, optionally gzipped)
    #[arg(short = '2', long)]
    pub reverse: PathBuf,

    /// First index reads (i7)
    #[arg(long)]
    pub index1: Option<PathBuf>,

    /// Second index reads (i5)
    #[arg(long)]
    pub index2: Option<PathBuf>,

    /// Reference set for the i7 index
    #[arg(long, requires = "index1")]
    pub i7: Option<PathBuf>,

    /// Reference set for the i5 index
    #[arg(long, requires = "index2")]
    pub i5: Option<PathBuf>,

    /// Reference set for the inline barcode on the forward read
    #[arg(long)]
    pub p5: Option<PathBuf>,

    /// Reference set for the inline barcode on the reverse read
    #[arg(long)]
    pub p7: Option<PathBuf>,

    /// Mismatches tolerated in inline barcodes
    #[arg(long, default_value = "1")]
    pub max_distance: usize,

    /// Mismatches tolerated in index reads (0 uses exact lookup)
    #[arg(long, default_value = "0")]
    pub index_max_distance: usize,

    /// Number of barcode lookups memoized per matcher
    #[arg(long, default_value_t = DEFAULT_CACHE_CAPACITY)]
    pub cache_capacity: usize,

    /// Directory for the per-experiment FASTQ files
    #[arg(short, long)]
    pub output_dir: PathBuf,

    /// Suffix of the output file names
    #[arg(long, default_value = ".fq")]
    pub suffix: String,

    /// Maximum number of output files open at once
    #[arg(long, default_value = "64")]
    pub max_open_files: usize,

    // === Merge options ===
    /// Mismatch penalty budget within the minimum overlap
    #[arg(long, default_value = "3.0")]
    pub max_penalty: f64,

    /// Minimum overlap between the reads
    #[arg(long, default_value = "10")]
    pub min_overlap: usize,

    /// Minimum length of a merged read
    #[arg(long, default_value = "30")]
    pub min_length: usize,

    /// Passing offsets enumerated before a pair is called ambiguous
    #[arg(long, default_value = "16")]
    pub max_candidates: usize,

    /// Quality at which a mismatch counts as high-confidence
    #[arg(long, default_value = "20")]
    pub quality_threshold: u8,
}

impl MergeArgs {
    fn merge_config(&self) -> MergeConfig {
        MergeConfig {
            max_penalty: self.max_penalty,
            min_overlap: self.min_overlap,
            min_length: self.min_length,
            max_candidates: self.max_candidates,
            quality_threshold: self.quality_threshold,
            ..MergeConfig::default()
        }
    }

    fn matcher_config(&self, max_distance: usize) -> anyhow::Result<MatcherConfig> {
        let cache_capacity =
            NonZeroUsize::new(self.cache_capacity).context("--cache-capacity must be at least 1")?;
        Ok(MatcherConfig {
            max_distance,
            cache_capacity,
        })
    }
}

#[derive(Serialize)]
struct MergeSummary {
    #[serde(flatten)]
    stats: MergeStats,
    merge_rate: f64,
    output_files: usize,
    output_cache: CacheStats,
}

/// Execute merge subcommand
///
/// # Errors
///
/// Returns an error if an input cannot be read, a reference set is invalid,
/// the lanes disagree on read names or record counts, or an output cannot be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: MergeArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    validate_suffix(&args.suffix).map_err(anyhow::Error::msg)?;
    let max_open = NonZeroUsize::new(args.max_open_files)
        .context("--max-open-files must be at least 1")?;

    let merger = ReadMerger::new(args.merge_config()).context("Invalid merge settings")?;
    let mut processor = build_processor(&args, merger)?;

    let mut forward = open(&args.forward)?;
    let mut reverse = open(&args.reverse)?;
    let mut index1 = args.index1.as_deref().map(open).transpose()?;
    let mut index2 = args.index2.as_deref().map(open).transpose()?;

    std::fs::create_dir_all(&args.output_dir).with_context(|| {
        format!("Failed to create output directory {}", args.output_dir.display())
    })?;
    let mut sinks = ExperimentSinks::new(&args.output_dir, &args.suffix, max_open);

    let mut stats = MergeStats::default();
    let mut record = 0usize;

    loop {
        let f = forward.next().transpose()?;
        let r = reverse.next().transpose()?;
        let i1 = next_optional(index1.as_mut())?;
        let i2 = next_optional(index2.as_mut())?;

        let (f, r) = match (f, r) {
            (None, None) => {
                if i1.is_some() || i2.is_some() {
                    bail!("Index reads continue past the end of the read pairs");
                }
                break;
            }
            (Some(f), Some(r)) => (f, r),
            _ => bail!("Forward and reverse inputs have different numbers of records"),
        };
        record += 1;

        if (index1.is_some() && i1.is_none()) || (index2.is_some() && i2.is_none()) {
            bail!("Index reads end before record {record}");
        }

        let quad = ReadQuad::new(f, r, i1, i2)
            .with_context(|| format!("Inconsistent read lanes at record {record}"))?;

        let outcome = processor.process(&quad);
        stats.record(&outcome);

        if let ProcessOutcome::Merged { key, read } = &outcome {
            sinks.write(key, read).with_context(|| {
                format!("Failed to write {}", sinks.path_for(key).display())
            })?;
        }

        if record % 1_000_000 == 0 {
            info!(records = record, merged = stats.merged, "Progress");
        }
    }

    let output_files = sinks.paths().count();
    let output_cache = sinks.finish().context("Failed to close output files")?;
    debug!(
        evictions = output_cache.evictions,
        forced_closes = output_cache.forced_closes,
        "Output file cache"
    );

    let summary = MergeSummary {
        merge_rate: stats.merge_rate(),
        stats,
        output_files,
        output_cache,
    };

    match format {
        OutputFormat::Text => print_text_summary(&summary, verbose),
        OutputFormat::Json => crate::cli::print_json(&summary)?,
    }

    Ok(())
}

fn open(path: &Path) -> anyhow::Result<FastqReads<Box<dyn BufRead>>> {
    fastq::open_reader(path).with_context(|| format!("Failed to open {}", path.display()))
}

fn next_optional(
    reads: Option<&mut FastqReads<Box<dyn BufRead>>>,
) -> anyhow::Result<Option<Read>> {
    match reads {
        Some(reads) => Ok(reads.next().transpose()?),
        None => Ok(None),
    }
}

fn build_processor(args: &MergeArgs, merger: ReadMerger) -> anyhow::Result<ReadProcessor> {
    let mut processor = ReadProcessor::new(merger);

    if let Some(path) = &args.i7 {
        processor = processor.with_i7(load_index(path, args)?);
    }
    if let Some(path) = &args.i5 {
        processor = processor.with_i5(load_index(path, args)?);
    }
    if let Some(path) = &args.p5 {
        processor = processor.with_p5(load_barcodes(path, args)?);
    }
    if let Some(path) = &args.p7 {
        processor = processor.with_p7(load_barcodes(path, args)?);
    }

    Ok(processor)
}

fn load_index(path: &Path, args: &MergeArgs) -> anyhow::Result<Box<dyn SequenceMatcher>> {
    let context = || format!("Failed to load index set {}", path.display());
    if args.index_max_distance == 0 {
        let matcher = ExactMatcher::load_file(path).with_context(context)?;
        info!(path = %path.display(), sequences = matcher.references().len(), "Loaded index set");
        Ok(Box::new(matcher))
    } else {
        let config = args.matcher_config(args.index_max_distance)?;
        let matcher = Matcher::load_file(path, &config).with_context(context)?;
        info!(path = %path.display(), sequences = matcher.references().len(), "Loaded index set");
        Ok(Box::new(matcher))
    }
}

fn load_barcodes(path: &Path, args: &MergeArgs) -> anyhow::Result<Box<dyn SequenceMatcher>> {
    let config = args.matcher_config(args.max_distance)?;
    let matcher = Matcher::load_file(path, &config)
        .with_context(|| format!("Failed to load barcode set {}", path.display()))?;
    info!(path = %path.display(), sequences = matcher.references().len(), "Loaded barcode set");
    Ok(Box::new(matcher))
}

fn print_text_summary(summary: &MergeSummary, verbose: bool) {
    let stats = &summary.stats;
    println!("Read pairs:  {}", stats.read_pairs);
    println!(
        "Merged:      {} ({:.1}%)",
        stats.merged,
        summary.merge_rate * 100.0
    );
    println!("Ambiguous:   {}", stats.ambiguous);
    println!("No overlap:  {}", stats.no_overlap);
    println!("Output files: {}", summary.output_files);

    if verbose {
        println!("\nMerged reads per experiment (i5:i7:p5:p7):");
        for (key, count) in &stats.experiments {
            println!("   {key}\t{count}");
        }
        println!(
            "\nOutput file cache: {} evictions, {} reopen closes",
            summary.output_cache.evictions, summary.output_cache.forced_closes
        );
    }
}
