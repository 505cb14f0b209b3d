//! CLI entry point for applying inclusion/exclusion criteria to a CSV file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use hamelin_criteria::{CriteriaSet, Dataset, FilterConfig, FilterReport, Rule, apply_criteria};
use serde::Serialize;
use tracing::info;

/// Command-line arguments for the criteria filter
#[derive(Parser, Debug)]
#[command(
    author = "Hamelin Team",
    version,
    about = "Apply inclusion/exclusion criteria to a tabular dataset",
    long_about = "Filters a CSV dataset with a JSON list of rules.\n\n\
                  A row is kept when it satisfies at least one inclusion rule \
                  (or there are none) and no exclusion rule.\n\n\
                  Example rules file:\n  \
                  [{\"variable\": \"age\", \"operator\": \">=\", \"value\": 18, \"kind\": \"inclusion\"},\n   \
                  {\"variable\": \"bmi\", \"operator\": \"between\", \"value\": [40, 80], \"kind\": \"exclusion\"}]"
)]
struct Args {
    /// Input CSV file path
    #[arg(short, long)]
    input: PathBuf,

    /// JSON file containing the list of rules
    #[arg(short, long)]
    criteria: PathBuf,

    /// Where to write the filtered CSV (nothing is written if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Warn when fewer rows than this remain
    #[arg(long, default_value_t = hamelin_criteria::DEFAULT_MIN_SAMPLE_SIZE)]
    min_sample_size: usize,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables logging so stdout only contains the JSON document.
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Only show warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` takes precedence over `--log-level`.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// JSON document printed with `--json`.
#[derive(Serialize)]
struct JsonSummary<'a> {
    input: String,
    output: Option<String>,
    stats: &'a hamelin_criteria::FilterStats,
    warnings: &'a [hamelin_criteria::FilterWarning],
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    if !args.input.exists() {
        return Err(anyhow!("Input file not found: {}", args.input.display()));
    }

    let config = FilterConfig::builder()
        .min_sample_size(args.min_sample_size)
        .build()?;

    let rules = load_rules(&args.criteria)?;
    info!("Loaded {} rule(s) from {}", rules.len(), args.criteria.display());

    let dataset = Dataset::read_csv(&args.input)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;

    let mut criteria = CriteriaSet::from_rules(rules);
    let report = apply_criteria(&dataset, &mut criteria, &config)?;

    if let Some(ref output) = args.output {
        if let Some(parent) = output.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
            info!("Created output directory: {}", parent.display());
        }
        report.dataset.write_csv(output)?;
    }

    if args.json {
        print_json(&args, &report)
    } else {
        print_summary(&report);
        Ok(())
    }
}

fn load_rules(path: &Path) -> Result<Vec<Rule>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read criteria file {}", path.display()))?;
    let rules: Vec<Rule> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid criteria file {}", path.display()))?;
    Ok(rules)
}

fn print_json(args: &Args, report: &FilterReport) -> Result<()> {
    let summary = JsonSummary {
        input: args.input.display().to_string(),
        output: args.output.as_ref().map(|p| p.display().to_string()),
        stats: &report.stats,
        warnings: &report.warnings,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Human-readable summary.
///
/// Uses `println!` so the summary is visible regardless of log level.
fn print_summary(report: &FilterReport) {
    let stats = &report.stats;

    println!("\n{}", "=".repeat(60));
    println!("CRITERIA FILTER SUMMARY");
    println!("{}", "=".repeat(60));
    println!("  Original instances:  {}", stats.original_count);
    println!("  Filtered instances:  {}", stats.filtered_count);
    println!(
        "  Removed instances:   {} ({:.1}%)",
        stats.removed_count, stats.removed_percent
    );
    println!("  Inclusion rules:     {}", stats.inclusion_rule_count);
    println!("  Exclusion rules:     {}", stats.exclusion_rule_count);
    if stats.skipped_rule_count > 0 {
        println!("  Skipped rules:       {}", stats.skipped_rule_count);
    }

    if !report.warnings.is_empty() {
        println!("\nWARNINGS");
        println!("{}", "-".repeat(40));
        for warning in &report.warnings {
            println!("  - {}", warning.message());
        }
    }
    println!("{}", "=".repeat(60));
}
