use clap::Parser;
use colored::*;
use idresolver::resolver::cache;
use idresolver::{IdResolver, ResolverError, TaxonId};
use serde::Serialize;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// Print what a resolver cache file contains
#[derive(Parser, Debug)]
#[command(name = "inspect_cache", version)]
struct Args {
    /// Cache file written by a previous loading run
    cache: PathBuf,

    /// Only show partitions of this taxon
    #[arg(long)]
    taxon: Option<TaxonId>,

    /// Only show partitions of this feature class
    #[arg(long)]
    class: Option<String>,

    /// Resolve an identifier or synonym in every shown partition
    #[arg(long)]
    lookup: Option<String>,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct PartitionSummary {
    taxon: u32,
    feature_class: String,
    canonical_ids: usize,
    synonyms: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    lookup: Option<Vec<String>>,
}

fn main() {
    let log_level = std::env::var("IDRESOLVER_LOG").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("{} {}", "Error:".red().bold(), e);

        let exit_code = match e.downcast_ref::<ResolverError>() {
            Some(ResolverError::CacheCorrupt { .. }) => 2,
            Some(ResolverError::Io(_)) => 3,
            _ => 1,
        };
        process::exit(exit_code);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let resolver = cache::restore(&args.cache)?;
    let summaries = summarize(&resolver, &args);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("{}", "No matching partitions".yellow());
        return Ok(());
    }

    for summary in &summaries {
        println!(
            "{} {}/{}",
            "Partition".bold(),
            summary.taxon,
            summary.feature_class.cyan()
        );
        println!("  Canonical ids: {}", summary.canonical_ids);
        println!("  Synonyms:      {}", summary.synonyms);
        if let Some(ref matches) = summary.lookup {
            let shown = if matches.is_empty() {
                "unknown".dimmed().to_string()
            } else {
                matches.join(", ").green().to_string()
            };
            println!("  Lookup:        {}", shown);
        }
    }

    Ok(())
}

fn summarize(resolver: &IdResolver, args: &Args) -> Vec<PartitionSummary> {
    resolver
        .partition_keys()
        .filter(|key| args.taxon.map_or(true, |taxon| key.taxon == taxon))
        .filter(|key| args.class.as_deref().map_or(true, |class| key.feature_class == class))
        .filter_map(|key| {
            let index = resolver.partition(key.taxon, &key.feature_class)?;
            Some(PartitionSummary {
                taxon: key.taxon.value(),
                feature_class: key.feature_class.clone(),
                canonical_ids: index.count_canonical_ids(),
                synonyms: index.count_synonyms(),
                lookup: args
                    .lookup
                    .as_deref()
                    .map(|id| index.resolve(id).into_iter().collect()),
            })
        })
        .collect()
}
