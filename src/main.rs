mod config;
mod convert;
mod document;
mod error;
mod extract;
mod load;
mod transform;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

#[derive(Parser)]
#[command(name = "labsheet", about = "Lab report to tracking-workbook converter")]
struct Cli {
    /// Directory holding extract/, normalize/ and load/ config documents
    #[arg(long, default_value = "schemas", global = true)]
    schemas: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one report and update the workbook
    Convert {
        /// Lab report PDF
        #[arg(short, long)]
        report: PathBuf,
        /// Tracking workbook to update
        #[arg(short, long)]
        workbook: PathBuf,
        /// Load config to apply
        #[arg(short, long)]
        target: String,
        /// Output path (default: update the workbook in place)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Convert every report under a directory into one workbook
    Batch {
        /// Directory walked recursively for .pdf reports
        #[arg(short, long)]
        dir: PathBuf,
        #[arg(short, long)]
        workbook: PathBuf,
        #[arg(short, long)]
        target: String,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// List loaded configuration documents
    Configs,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let registry = config::Registry::load_dir(&cli.schemas)?;

    let result = match cli.command {
        Commands::Convert {
            report,
            workbook,
            target,
            out,
        } => run_convert(&registry, &report, workbook, &target, out),
        Commands::Batch {
            dir,
            workbook,
            target,
            out,
        } => run_batch(&registry, &dir, workbook, &target, out),
        Commands::Configs => {
            print_configs(&registry);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

fn run_convert(
    registry: &config::Registry,
    report: &Path,
    workbook: PathBuf,
    target: &str,
    out: Option<PathBuf>,
) -> Result<()> {
    let report_bytes =
        fs::read(report).with_context(|| format!("reading {}", report.display()))?;
    let bytes =
        fs::read(&workbook).with_context(|| format!("reading {}", workbook.display()))?;

    let outcome = convert::convert_report(registry, &report_bytes, &bytes, target)?;
    if !outcome.issues.is_empty() {
        println!("{} field issue(s); see warnings above", outcome.issues.len());
    }

    let out_path = out.unwrap_or(workbook);
    fs::write(&out_path, outcome.workbook)
        .with_context(|| format!("writing {}", out_path.display()))?;
    println!(
        "Updated {} with {} ({})",
        out_path.display(),
        outcome.report_type,
        outcome.sampling_date
    );
    Ok(())
}

fn run_batch(
    registry: &config::Registry,
    dir: &Path,
    workbook: PathBuf,
    target: &str,
    out: Option<PathBuf>,
) -> Result<()> {
    let reports = collect_reports(dir)?;
    if reports.is_empty() {
        println!("No PDF reports under {}", dir.display());
        return Ok(());
    }

    let bytes =
        fs::read(&workbook).with_context(|| format!("reading {}", workbook.display()))?;
    let mut book = convert::read_workbook(&bytes)?;

    let pb = ProgressBar::new(reports.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec})")?
            .progress_chars("=> "),
    );

    let mut ok = 0;
    let mut errors = 0;
    for path in &reports {
        let converted = fs::read(path)
            .map_err(|e| error::ConvertError::Document(e.to_string()))
            .and_then(|bytes| document::read_report(&bytes))
            .and_then(|page| convert::apply_report(registry, &mut book, &page, target));
        match converted {
            Ok(_) => ok += 1,
            Err(e) => {
                warn!("{}: {}", path.display(), e);
                errors += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let out_path = out.unwrap_or(workbook);
    fs::write(&out_path, convert::write_workbook(&book)?)
        .with_context(|| format!("writing {}", out_path.display()))?;
    println!(
        "Done: {} converted, {} failed. Wrote {}",
        ok,
        errors,
        out_path.display()
    );
    Ok(())
}

fn print_configs(registry: &config::Registry) {
    println!("extract:");
    for (name, config) in registry.extract_configs() {
        println!("  {} (matches /{}/)", name, config.match_pattern);
    }
    println!("normalize:");
    for name in registry.normalize_names() {
        println!("  {}", name);
    }
    println!("load:");
    for name in registry.load_names() {
        println!("  {}", name);
    }
}

fn collect_reports(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut reports = Vec::new();
    walk(dir, &mut reports)?;
    reports.sort();
    Ok(reports)
}

fn walk(dir: &Path, reports: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, reports)?;
        } else if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        {
            reports.push(path);
        }
    }
    Ok(())
}
