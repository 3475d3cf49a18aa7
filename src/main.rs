use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use decoupy_rs::report::CouplingReport;
use decoupy_rs::{Decoupler, FaultPolicy};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Command line interface configuration using `clap`.
///
/// Every `.py` file under either root is an entry. The report lists, per entry, the modules
/// located under either root that it reaches through its imports.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// First package root to compare.
    ///
    /// Must be an existing directory. It need not be a package: a plain directory of
    /// scripts is walked the same way.
    root_a: PathBuf,

    /// Second package root to compare.
    ///
    /// May be nested inside the first root; files under both are scanned once.
    root_b: PathBuf,

    /// Extra directory to resolve imports against (repeatable).
    ///
    /// Searched after the parent of the roots' common base, in the order given.
    /// Directories that do not exist are skipped. Modules found here are only reported
    /// when they live under one of the roots.
    #[arg(long = "search-path", value_name = "DIR")]
    search_paths: Vec<PathBuf>,

    /// Also resolve imports against the entries of PYTHONPATH.
    ///
    /// They are appended after any `--search-path` directories.
    #[arg(long)]
    pythonpath: bool,

    /// Recover imports from files that do not parse, line by line.
    ///
    /// Useful for legacy Python 2 trees. The files are still listed as parse faults.
    #[arg(long, conflicts_with = "strict")]
    recover: bool,

    /// Fail when any file does not parse.
    ///
    /// The reported file is the one with the lowest path, whatever the thread scheduling.
    #[arg(long)]
    strict: bool,

    /// Resolve files on a single thread.
    ///
    /// The output is the same as a parallel run.
    #[arg(long)]
    sequential: bool,

    /// Output raw JSON.
    ///
    /// Prints the report as pretty JSON (entries, faults and summary) instead of the
    /// colored listing.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    // Logs go to stderr so that `--json` output stays parseable. RUST_LOG overrides the level.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    // Explicit directories first, then PYTHONPATH.
    let mut search_paths = cli.search_paths.clone();
    if cli.pythonpath {
        if let Some(value) = std::env::var_os("PYTHONPATH") {
            search_paths.extend(std::env::split_paths(&value));
        }
    }
    let fault_policy = if cli.strict {
        FaultPolicy::Abort
    } else if cli.recover {
        FaultPolicy::Recover
    } else {
        FaultPolicy::Skip
    };

    let decoupler = Decoupler::new()
        .with_search_paths(search_paths)
        .with_fault_policy(fault_policy)
        .with_parallel(!cli.sequential);

    let analysis = decoupler
        .analyze(&cli.root_a, &cli.root_b)
        .with_context(|| {
            format!(
                "analysis of {} and {} failed",
                cli.root_a.display(),
                cli.root_b.display()
            )
        })?;
    // Entries sorted by path, dependencies by identity.
    let report = CouplingReport::from_analysis(&analysis);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    // Human-readable summary.
    println!("\n{}", "Package Coupling Results".bold());
    println!("========================\n");
    println!("Summary:");
    println!(" * Files scanned: {}", report.analysis_summary.total_files);
    println!(" * Coupled files: {}", report.analysis_summary.coupled_entries);
    if !report.faults.is_empty() {
        println!(" * Parse faults: {}", report.faults.len());
    }

    if report.entries.is_empty() {
        println!("\n{}", "No coupling found.".green());
    } else {
        println!("\n - Coupled Files");
        println!("===============");
        for (i, entry) in report.entries.iter().enumerate() {
            println!(" {}. {}", i + 1, entry.file.display().to_string().yellow());
            for dep in &entry.dependencies {
                println!("    └─ {} ({})", dep.name, dep.path.display());
            }
        }
    }

    if !report.faults.is_empty() {
        println!("\n - Parse Faults");
        println!("==============");
        for (i, fault) in report.faults.iter().enumerate() {
            println!(" {}. {}", i + 1, fault.to_string().red());
        }
    }

    Ok(())
}
