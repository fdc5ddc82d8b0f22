//! CLI entry point for the student report pipeline.
//!
//! With no subcommand, runs the batch pipeline over the configured workbook
//! and writes the cleaned CSV, the summary workbook and the figures. `serve`
//! starts the upload dashboard instead.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use student_report::config::PipelineConfig;
use student_report::{dashboard, pipeline};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "student_report")]
#[command(about = "Clean, summarize and chart student grade workbooks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the batch pipeline (the default)
    Run {
        /// Workbook to process, overriding the configured input
        #[arg(short, long, value_name = "XLSX")]
        input: Option<PathBuf>,
    },
    /// Serve the upload dashboard on localhost
    Serve {
        /// Port to listen on, overriding the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/student_report.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("student_report.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let mut config = PipelineConfig::from_env()?;

    match cli.command.unwrap_or(Commands::Run { input: None }) {
        Commands::Run { input } => {
            if let Some(input) = input {
                config.input_path = input;
            }
            let input = config.input_path.clone();

            // Blocking work: parsing, plotting and file writes.
            let summary = tokio::task::spawn_blocking(move || pipeline::run(&config))
                .await?
                .with_context(|| format!("failed to build report from {}", input.display()))?;

            info!(
                cleaned = %summary.cleaned_path.display(),
                summary = %summary.summary_path.display(),
                figures = summary.figures.len(),
                "Outputs ready"
            );
        }
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.dashboard.port);
            dashboard::serve(config, port)
                .await
                .with_context(|| format!("dashboard failed on port {port}"))?;
        }
    }

    Ok(())
}
