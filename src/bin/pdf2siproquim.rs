//! CLI binary for pdf2siproquim.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2siproquim::{
    convert, convert_to_file, BranchDirectory, ConversionConfig, ConversionOutput, Period,
};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert for the previous month, map text to stdout
  pdf2siproquim relatorio.pdf --cnpj 60.960.473/0006-77

  # Write the map (and exclusion report, if any) into a directory
  pdf2siproquim relatorio.pdf --cnpj 60960473000677 -o maps/

  # Explicit period
  pdf2siproquim relatorio.pdf --cnpj 60960473000677 --month 3 --year 2025 -o maps/

  # Branch directory for blank-name repair (JSON object: CNPJ -> name)
  pdf2siproquim relatorio.pdf --cnpj 60960473000677 --branches filiais.json -o maps/

  # Machine-readable run summary
  pdf2siproquim relatorio.pdf --cnpj 60960473000677 -o maps/ --json

OUTPUT FILES:
  {MMM}{YYYY}_{cnpj}_{source}.txt             the positional map (EM/TN/CC lines)
  {MMM}{YYYY}_{cnpj}_{source}_exclusoes.txt   written only when records were excluded

ENVIRONMENT VARIABLES:
  SIPROQUIM_CNPJ       Issuer CNPJ (same as --cnpj)
  SIPROQUIM_OUTPUT     Output directory (same as --output-dir)
"#;

/// Convert transport invoice PDFs to SIPROQUIM fixed-width TXT maps.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2siproquim",
    version,
    about = "Convert transport invoice PDFs to SIPROQUIM fixed-width TXT maps",
    long_about = "Extract invoice records from a transport PDF (DANFE/CTe report), validate \
every CPF/CNPJ with the official Modulo-11 check digits, and render the survivors as the \
fixed-width positional text file the SIPROQUIM 2 portal accepts. Rejected records are listed \
in a companion exclusion report instead of silently corrupting the upload.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Write artifacts into this directory instead of printing the map to
    /// stdout.
    #[arg(short = 'o', long = "output-dir", env = "SIPROQUIM_OUTPUT")]
    output_dir: Option<PathBuf>,

    /// Issuer CNPJ for the EM header, with or without formatting.
    #[arg(long, env = "SIPROQUIM_CNPJ")]
    cnpj: String,

    /// Reporting month (1-12). Default: the previous calendar month.
    #[arg(long, requires = "year")]
    month: Option<u32>,

    /// Reporting year. Default: the previous calendar month's year.
    #[arg(long, requires = "month")]
    year: Option<i32>,

    /// JSON file mapping CNPJ to canonical name, used to repair blank party
    /// names.
    #[arg(long)]
    branches: Option<PathBuf>,

    /// Keep records whose valid CPF fails the CNPJ check on its zero-padded
    /// 14-digit rendering, instead of excluding them.
    #[arg(long)]
    keep_unrenderable_cpf: bool,

    /// Output a structured JSON run summary instead of human-readable text.
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

/// What `--json` prints: the run counters, the rejects, and where the
/// artifacts landed.
#[derive(Serialize)]
struct JsonSummary<'a> {
    stats: &'a pdf2siproquim::ConversionStats,
    exclusions: &'a [pdf2siproquim::ExclusionEntry],
    map_path: Option<&'a std::path::Path>,
    exclusion_path: Option<&'a std::path::Path>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner owns the terminal while it runs; keep library INFO logs
    // out of its way unless the user asked for them.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    let spinner = if show_progress {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix("Converting");
        bar.set_message(cli.input.display().to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        Some(bar)
    } else {
        None
    };

    // ── Run conversion ───────────────────────────────────────────────────
    let result = if let Some(ref output_dir) = cli.output_dir {
        convert_to_file(&cli.input, output_dir, &config)
            .map(|(output, artifacts)| (output, Some(artifacts)))
    } else {
        convert(&cli.input, &config).map(|output| (output, None))
    };

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    let (output, artifacts) = result.context("Conversion failed")?;

    // ── Report ───────────────────────────────────────────────────────────
    if cli.json {
        let summary = JsonSummary {
            stats: &output.stats,
            exclusions: &output.exclusions,
            map_path: artifacts.as_ref().map(|a| a.map_path.as_path()),
            exclusion_path: artifacts
                .as_ref()
                .and_then(|a| a.exclusion_path.as_deref()),
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
        return Ok(());
    }

    if artifacts.is_none() {
        // No output dir: the map text itself goes to stdout, everything
        // else to stderr.
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.file_text.as_bytes())
            .context("Failed to write to stdout")?;
    }

    if !cli.quiet {
        print_summary(&output, artifacts.as_ref(), &config);
    }
    Ok(())
}

fn print_summary(
    output: &ConversionOutput,
    artifacts: Option<&pdf2siproquim::WrittenArtifacts>,
    config: &ConversionConfig,
) {
    let s = &output.stats;
    let tick = if s.excluded == 0 {
        green("✔")
    } else {
        yellow("⚠")
    };
    eprintln!(
        "{tick}  {}  {} extracted, {} accepted, {} excluded  {}",
        bold(&config.period.to_string()),
        s.extracted,
        bold(&s.accepted.to_string()),
        if s.excluded == 0 {
            s.excluded.to_string()
        } else {
            yellow(&s.excluded.to_string())
        },
        dim(&format!("{}ms", s.duration_ms)),
    );
    if s.duplicates > 0 || s.corrected > 0 {
        eprintln!(
            "   {}",
            dim(&format!(
                "{} duplicates dropped, {} names repaired from the branch directory",
                s.duplicates, s.corrected
            ))
        );
    }
    if let Some(artifacts) = artifacts {
        eprintln!("   map        {}", bold(&artifacts.map_path.display().to_string()));
        match &artifacts.exclusion_path {
            Some(path) => {
                eprintln!("   exclusions {}", yellow(&path.display().to_string()))
            }
            None => eprintln!("   exclusions {}", dim("none")),
        }
    }
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder(&cli.cnpj);

    if let (Some(month), Some(year)) = (cli.month, cli.year) {
        builder = builder.period(Period::new(month, year).context("Invalid period")?);
    }

    if let Some(ref path) = cli.branches {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read branch directory from {path:?}"))?;
        let entries: HashMap<String, String> = serde_json::from_str(&text)
            .with_context(|| format!("Branch directory {path:?} is not a JSON object of CNPJ -> name"))?;
        builder = builder.branches(BranchDirectory::from_entries(entries));
    }

    if cli.keep_unrenderable_cpf {
        builder = builder.reject_unrenderable_cpf(false);
    }

    builder.build().context("Invalid configuration")
}
