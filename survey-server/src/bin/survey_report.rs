//! survey-report - Offline report generation
//!
//! Writes an analytics report for one survey straight from the database,
//! without the HTTP server. Without `--public-id` the most recently created
//! survey that has responses is used.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use survey_analytics::ReportFormat;
use survey_common::config::{RootFolderInitializer, RootFolderResolver};
use survey_server::report_file;

#[derive(Parser, Debug)]
#[command(name = "survey-report")]
#[command(about = "Generate an analytics report for a stored survey")]
#[command(version)]
struct Args {
    /// Root folder holding the database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Survey to report on (defaults to the latest survey with responses)
    #[arg(short, long)]
    public_id: Option<String>,

    /// Directory the report is written to
    #[arg(short, long, default_value = "survey_reports")]
    output_dir: PathBuf,

    /// Report format: pdf, json or xlsx
    #[arg(short, long, default_value = "pdf")]
    format: String,

    /// Skip chart rendering
    #[arg(long)]
    no_charts: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolver = RootFolderResolver::new("survey-report");
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&resolver.toml().logging.level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let format: ReportFormat = args
        .format
        .parse()
        .with_context(|| format!("Invalid format '{}'", args.format))?;

    let initializer = RootFolderInitializer::new(resolver.resolve_with(args.root_folder.as_deref()));
    let db_path = initializer.database_path();
    if !db_path.exists() {
        bail!("Database not found at {}", db_path.display());
    }
    let db = survey_common::db::init_database(&db_path)
        .await
        .context("Failed to open database")?;

    let public_id = report_file::resolve_public_id(&db, args.public_id).await?;
    let path = report_file::write_report(
        &db,
        &public_id,
        &args.output_dir,
        format,
        !args.no_charts,
    )
    .await
    .with_context(|| format!("Failed to write report for survey {}", public_id))?;
    println!("{}", path.display());

    db.close().await;
    Ok(())
}
