//! End-to-end runs: load → merge → normalize/validate → impute → aggregate → export → render.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::impute::{self, CleaningReport};
use crate::merge::merge_sheets;
use crate::normalize::Normalizer;
use crate::output::{Artifacts, write_artifacts};
use crate::parser::{Sheet, load_workbook, load_workbook_bytes};
use crate::record::{DraftRecord, StudentRecord};
use crate::render::{Chart, plan_charts, render_figures};
use crate::summary::aggregate::{kpis, summarize};
use crate::summary::types::{Kpis, SummaryTable};
use crate::validate;

/// Everything computed from one input workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub tracks: Vec<String>,
    pub records: Vec<StudentRecord>,
    pub tables: Vec<SummaryTable>,
    pub kpis: Kpis,
    pub report: CleaningReport,
}

impl PipelineOutcome {
    pub fn artifacts(&self, config: &PipelineConfig) -> Result<Artifacts> {
        Artifacts::render(&self.records, &self.tables, config.summary_decimals)
    }

    pub fn charts(&self, config: &PipelineConfig) -> Vec<Chart> {
        plan_charts(&self.tables, &self.records, &config.histogram_subjects)
    }
}

/// Cleans and aggregates already-parsed sheets.
///
/// Fails when there are no sheets, when the first sheet lacks an expected
/// column, or when no row survives cleaning.
pub fn process_sheets(sheets: Vec<Sheet>, config: &PipelineConfig) -> Result<PipelineOutcome> {
    let table = merge_sheets(sheets)?;
    let normalizer = Normalizer::new(&config.tokens);

    let drafts: Vec<DraftRecord> = table
        .rows
        .into_iter()
        .map(|mut row| {
            row.cells = row.cells.into_iter().map(|c| normalizer.cell(c)).collect();
            validate::draft(&row, &normalizer)
        })
        .collect();

    let (records, report) =
        impute::clean(drafts, &config.impute_categorical, config.drop_duplicates);
    if records.is_empty() {
        return Err(PipelineError::NoRowsSurvived {
            dropped: report.dropped(),
        });
    }

    let tables = summarize(&records, &config.dimensions);
    let kpis = kpis(&records);

    Ok(PipelineOutcome {
        tracks: table.tracks,
        records,
        tables,
        kpis,
        report,
    })
}

/// Runs the pipeline over an in-memory xlsx file.
pub fn process_bytes(bytes: &[u8], config: &PipelineConfig) -> Result<PipelineOutcome> {
    process_sheets(load_workbook_bytes(bytes)?, config)
}

pub fn process_file(path: impl AsRef<Path>, config: &PipelineConfig) -> Result<PipelineOutcome> {
    process_sheets(load_workbook(path)?, config)
}

/// Result of a batch run.
#[derive(Debug)]
pub struct RunSummary {
    pub outcome: PipelineOutcome,
    pub cleaned_path: PathBuf,
    pub summary_path: PathBuf,
    pub figures: Vec<PathBuf>,
}

/// Processes `config.input_path` and writes the cleaned CSV, the summary
/// workbook and the figures.
///
/// Nothing is written when processing or rendering the artifacts fails.
/// Figures come last and never fail the run.
#[tracing::instrument(skip_all, fields(input = %config.input_path.display()))]
pub fn run(config: &PipelineConfig) -> Result<RunSummary> {
    let outcome = process_file(&config.input_path, config)?;
    let artifacts = outcome.artifacts(config)?;

    let cleaned_path = config.cleaned_path();
    let summary_path = config.summary_path();
    write_artifacts(&artifacts, &cleaned_path, &summary_path)?;

    let figures = match render_figures(&outcome.charts(config), &config.figures_dir) {
        Ok(figures) => figures,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "Figures not rendered");
            Vec::new()
        }
    };

    info!(
        students = outcome.kpis.total_students,
        tracks = outcome.kpis.tracks,
        dropped = outcome.report.dropped(),
        figures = figures.len(),
        "Report complete"
    );

    Ok(RunSummary {
        outcome,
        cleaned_path,
        summary_path,
        figures,
    })
}
