use chrono::NaiveDate;
use clap::{Args, Parser};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::app::{ReportApplication, ReportRun, ReportSettings};
use crate::config::{AppConfig, parse_timeout_ms};
use crate::error::AppError;
use crate::telemetry;
use crate::workflows::maintenance::render::{
    HtmlDocument, OutlineBlock, OutlineDocument, Typography,
};
use crate::workflows::maintenance::{AssemblySummary, FileStore};

#[derive(Parser, Debug)]
#[command(
    name = "property-report",
    about = "Generate the maintenance status report for monitored properties",
    version
)]
pub struct Cli {
    /// Preferences namespace; loads `<NAMESPACE>.env` before `.env`
    pub namespace: Option<String>,
    #[command(flatten)]
    pub report: ReportArgs,
}

#[derive(Args, Debug, Default)]
pub struct ReportArgs {
    /// Override the configured property data file (.csv or .json)
    #[arg(long)]
    pub data_file: Option<PathBuf>,
    /// Override the directory receiving property.html
    #[arg(long)]
    pub report_dir: Option<PathBuf>,
    /// Maximum wait for the data load, in milliseconds
    #[arg(long, value_parser = parse_timeout_arg)]
    pub timeout_ms: Option<std::time::Duration>,
    /// Evaluate deadlines as of this date (YYYY-MM-DD) instead of now
    #[arg(long, value_parser = parse_date)]
    pub as_of: Option<NaiveDate>,
    /// Print the report outline instead of writing a file
    #[arg(long)]
    pub dry_run: bool,
    /// With --dry-run, print the outline as JSON
    #[arg(long, requires = "dry_run")]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct DryRunOutput<'a> {
    summary: AssemblySummary,
    blocks: &'a [OutlineBlock],
}

pub fn run() -> Result<(), AppError> {
    execute(Cli::parse())
}

pub fn execute(cli: Cli) -> Result<(), AppError> {
    let Cli { namespace, report } = cli;
    let mut config = AppConfig::load(namespace.as_deref())?;

    if let Some(data_file) = report.data_file {
        config.storage.data_file = data_file;
    }
    if let Some(directory) = report.report_dir {
        config.report.directory = directory;
    }
    if let Some(timeout) = report.timeout_ms {
        config.report.load_timeout = timeout;
    }

    telemetry::init(&config.telemetry)?;
    info!(
        namespace = namespace.as_deref().unwrap_or("default"),
        data_file = %config.storage.data_file.display(),
        "configuration loaded"
    );

    let mut settings = ReportSettings::from(&config.report);
    settings.as_of = report.as_of.and_then(|date| date.and_hms_opt(0, 0, 0));

    let store = Arc::new(FileStore::open(&config.storage.data_file)?);
    let app = ReportApplication::new(store, settings);

    let result = if report.dry_run {
        app.generate(|| Ok(OutlineDocument::new()))
            .map_err(AppError::from)
            .and_then(|run| print_outline(&run, report.json))
    } else {
        let path = config.report.output_path();
        let font_family = config.report.font_family.clone();
        app.generate(|| HtmlDocument::create(&path, Typography::new(font_family)?))
            .map_err(AppError::from)
            .map(|run| print_written(&run))
    };

    if let Ok(store) = Arc::try_unwrap(app.into_store()) {
        store.shutdown();
    }
    result
}

fn print_outline(run: &ReportRun<OutlineDocument>, json: bool) -> Result<(), AppError> {
    if json {
        let output = DryRunOutput {
            summary: run.summary,
            blocks: run.document.blocks(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print!("{}", run.document.render_text()?);
    println!();
    print_summary(&run.summary);
    Ok(())
}

fn print_written(run: &ReportRun<HtmlDocument>) {
    print_summary(&run.summary);
    println!("Report written to {}", run.document.path().display());
}

fn print_summary(summary: &AssemblySummary) {
    println!(
        "Properties: {}, items: {} ({} overdue, {} notice due)",
        summary.properties, summary.items, summary.overdue, summary.notice_due
    );
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

fn parse_timeout_arg(raw: &str) -> Result<std::time::Duration, String> {
    parse_timeout_ms(raw).map_err(|err| err.to_string())
}
