use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::core::sequence::Sequence;
use crate::matching::engine::{Matcher, MatcherConfig};

#[derive(Args)]
pub struct LookupArgs {
    /// Reference set file
    #[arg(short, long)]
    pub references: PathBuf,

    /// Largest Hamming distance accepted as a match
    #[arg(short = 'd', long, default_value = "1")]
    pub max_distance: usize,

    /// Sequences to look up
    #[arg(required = true)]
    pub queries: Vec<String>,
}

#[derive(Serialize)]
struct LookupResult {
    query: String,
    label: Option<String>,
}

/// Execute lookup subcommand
///
/// # Errors
///
/// Returns an error if the reference set cannot be loaded or a query is not a DNA sequence.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: LookupArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let config = MatcherConfig {
        max_distance: args.max_distance,
        cache_capacity: NonZeroUsize::MIN.saturating_add(args.queries.len()),
    };
    let mut matcher = Matcher::load_file(&args.references, &config)
        .with_context(|| format!("Failed to load reference set {}", args.references.display()))?;

    if verbose {
        eprintln!(
            "Loaded {} sequences under {} labels",
            matcher.references().len(),
            matcher.references().num_labels()
        );
    }

    let mut results = Vec::with_capacity(args.queries.len());
    for query in &args.queries {
        let sequence =
            Sequence::new(query).with_context(|| format!("Invalid query sequence '{query}'"))?;
        let label = matcher.find(&sequence);
        results.push(LookupResult {
            query: sequence.to_string(),
            label: label.map(|l| l.to_string()),
        });
    }

    match format {
        OutputFormat::Text => {
            for result in &results {
                println!("{}\t{}", result.query, result.label.as_deref().unwrap_or("-"));
            }
        }
        OutputFormat::Json => crate::cli::print_json(&results)?,
    }

    Ok(())
}
