mod config;
mod discover;
mod report;
mod runner;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use bqspec_eval::{BigQueryClient, FixtureClient, QueryClient};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::runner::{ClientSlot, FileReport};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Run declarative BigQuery query specs.
#[derive(Parser)]
#[command(name = "bqspec", version, about = "Declarative testing for BigQuery SQL")]
struct Cli {
    /// Run a single spec file
    #[arg(short = 'f', conflicts_with = "dir")]
    file: Option<PathBuf>,

    /// Run every .yaml/.yml spec under this directory
    #[arg(short = 'd', default_value = ".")]
    dir: PathBuf,

    /// Serve rows from a JSON fixture file instead of querying BigQuery
    #[arg(long)]
    rows: Option<PathBuf>,

    /// Stop after validation; no query is run
    #[arg(long)]
    validate_only: bool,

    /// Output format (text or json)
    #[arg(long, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long)]
    quiet: bool,

    /// Log pipeline steps to stderr
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Configuration file (default: ./bqspec.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// BigQuery project, overriding the configuration file
    #[arg(long)]
    project: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let paths = match discover::discover(cli.file.as_deref(), &cli.dir) {
        Ok(paths) => paths,
        Err(e) => {
            report_error(&e, cli.output, cli.quiet);
            process::exit(1);
        }
    };

    let client = if cli.validate_only {
        Err("no query client in validate-only mode".to_string())
    } else if let Some(rows) = &cli.rows {
        Ok(Box::new(FixtureClient::from_path(rows)) as Box<dyn QueryClient>)
    } else {
        let config = match config::load_config(cli.config.as_deref()) {
            Ok(config) => config,
            Err(e) => {
                report_error(&format!("error: {}", e), cli.output, cli.quiet);
                process::exit(1);
            }
        };
        bigquery_client(&config, cli.project.as_deref())
    };
    let slot: ClientSlot<'_> = match &client {
        Ok(client) => Ok(client.as_ref()),
        Err(message) => Err(message.as_str()),
    };

    let reports: Vec<FileReport> = paths
        .iter()
        .map(|path| runner::run_file(path, slot, cli.validate_only))
        .collect();

    if let Err(e) = print_reports(&reports, cli.output, cli.quiet) {
        report_error(&format!("error: {}", e), cli.output, cli.quiet);
        process::exit(1);
    }

    if reports.iter().any(|r| r.status.is_failure()) {
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Missing credentials are not fatal here: they only matter once a file
/// reaches the query step.
fn bigquery_client(config: &Config, project: Option<&str>) -> Result<Box<dyn QueryClient>, String> {
    let bigquery = config::resolve_bigquery(config, project)?;
    tracing::debug!(project = %bigquery.project, endpoint = %bigquery.endpoint, "using BigQuery");
    Ok(Box::new(BigQueryClient::new(bigquery)))
}

fn print_reports(reports: &[FileReport], output: OutputFormat, quiet: bool) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match output {
        OutputFormat::Text => {
            for report in reports {
                report::write_text(&mut out, report, quiet)?;
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report::to_json(reports))
                .map_err(io::Error::other)?;
            writeln!(out, "{}", json)?;
        }
    }
    out.flush()
}

/// Report a fatal error on stderr in the selected output format.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => eprintln!("{}", serde_json::json!({ "error": msg })),
    }
}
