mod bridge;
mod report;

use std::fs;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing::{Level, debug, warn};
use tracing_subscriber::EnvFilter;

use crate::bridge::ParseResult;
use crate::report::{FileReport, ValidationOutput};

/// Exit code when any input did not parse cleanly
const EXIT_NOT_OK: i32 = 2;

#[derive(Parser)]
#[command(name = "alloy-validate")]
#[command(about = "Validate Alloy configuration files through the C parser boundary", long_about = None)]
struct Cli {
    /// Log boundary calls at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate config files and report their diagnostics
    Validate {
        /// Files or glob patterns
        #[arg(required = true)]
        paths: Vec<String>,

        /// Print the full JSON payload for each file
        #[arg(long)]
        show_payload: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Print the JSON envelope for one file
    Parse {
        path: PathBuf,

        #[arg(long)]
        pretty: bool,
    },

    /// Print the JSON envelope for one expression
    Expr {
        text: String,

        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    if cli.no_color || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    match cli.command {
        Commands::Validate {
            paths,
            show_payload,
            format,
        } => {
            let files = expand_paths(&paths)?;
            if files.is_empty() {
                anyhow::bail!("no configuration files to validate");
            }

            let mut reports = Vec::with_capacity(files.len());
            for path in files {
                reports.push(validate_file(path)?);
            }

            match format {
                Format::Text => {
                    for report in &reports {
                        report::print_text(report, show_payload);
                    }
                    report::print_summary(&reports);
                }
                Format::Json => {
                    let output = ValidationOutput::new(&reports, show_payload);
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
            }

            if !reports.iter().all(FileReport::is_ok) {
                std::process::exit(EXIT_NOT_OK);
            }
        }

        Commands::Parse { path, pretty } => {
            let data = fs::read(&path)
                .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;
            let result = bridge::parse_file(&path.display().to_string(), &data)?;
            print_payload(&result, pretty);
        }

        Commands::Expr { text, pretty } => {
            let result = bridge::parse_expression(&text)?;
            print_payload(&result, pretty);
        }
    }

    Ok(())
}

/// Resolve arguments to existing files. Glob patterns are expanded; paths
/// that do not exist are skipped with a warning.
fn expand_paths(args: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for arg in args {
        if is_glob(arg) {
            let matches: Vec<PathBuf> = glob::glob(arg)
                .map_err(|e| anyhow::anyhow!("invalid glob pattern '{}': {}", arg, e))?
                .filter_map(Result::ok)
                .filter(|p| p.is_file())
                .collect();
            if matches.is_empty() {
                warn!(pattern = %arg, "glob pattern matched no files");
                eprintln!("{} pattern {} matched no files", "warning:".yellow(), arg);
            }
            files.extend(matches);
        } else {
            let path = PathBuf::from(arg);
            if path.exists() {
                files.push(path);
            } else {
                eprintln!(
                    "{} skipping missing configuration {}",
                    "warning:".yellow(),
                    path.display()
                );
            }
        }
    }

    Ok(files)
}

fn is_glob(arg: &str) -> bool {
    arg.contains(['*', '?', '['])
}

fn validate_file(path: PathBuf) -> anyhow::Result<FileReport> {
    let data =
        fs::read(&path).map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;

    let started = Instant::now();
    let result = bridge::parse_file(&path.display().to_string(), &data)?;
    let elapsed = started.elapsed();
    debug!(
        path = %path.display(),
        status = %result.status,
        elapsed = %humantime::format_duration(elapsed),
        "validated"
    );

    Ok(FileReport {
        path,
        result,
        elapsed,
    })
}

fn print_payload(result: &ParseResult, pretty: bool) {
    if pretty {
        println!("{}", report::pretty(&result.payload));
    } else {
        println!("{}", result.payload);
    }
    if result.status != alloy_ffi::Status::Ok {
        std::process::exit(EXIT_NOT_OK);
    }
}
