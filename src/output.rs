//! Output formatting and persistence for the cleaned table and its summaries.
//!
//! Both artifacts are rendered in memory first; [`write_artifacts`] only
//! touches the disk once everything rendered successfully.

use csv::WriterBuilder;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::record::StudentRecord;
use crate::summary::types::{SummaryRow, SummaryTable};
use crate::summary::utility::round_to;

pub const METRIC_HEADERS: [&str; 9] = [
    "Nb Students",
    "Math",
    "English",
    "Science",
    "History",
    "ProjectScore",
    "Attendance (%)",
    "Pass Rate (%)",
    "Attendance/Project Corr (%)",
];

/// Serializes the cleaned records as CSV with a header row.
pub fn cleaned_csv(records: &[StudentRecord]) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    writer
        .into_inner()
        .map_err(|e| PipelineError::Csv(e.into_error().into()))
}

/// Builds the summary workbook: one sheet per table, bold header row.
///
/// Metrics are rounded to `decimals` places; pass rate and correlation are
/// written in percent and an undefined correlation is left blank.
pub fn summary_xlsx(tables: &[SummaryTable], decimals: u32) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    for table in tables {
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name(&table.name()))?;

        let key_headers = table.key_headers();
        for (col, header) in key_headers.iter().chain(METRIC_HEADERS.iter()).enumerate() {
            sheet.write_string_with_format(0, col as u16, *header, &header_format)?;
        }

        for (i, row) in table.rows.iter().enumerate() {
            write_row(sheet, i as u32 + 1, row, decimals)?;
        }

        sheet.autofit();
    }

    Ok(workbook.save_to_buffer()?)
}

/// Metric cells of a row in [`METRIC_HEADERS`] order: count, rounded means,
/// pass rate and correlation in percent. An undefined correlation is `None`.
pub fn metric_cells(row: &SummaryRow, decimals: u32) -> Vec<Option<f64>> {
    let mut cells = vec![Some(row.count as f64)];
    cells.extend(
        [
            row.math,
            row.english,
            row.science,
            row.history,
            row.project_score,
            row.attendance_rate,
            row.pass_rate * 100.0,
        ]
        .into_iter()
        .map(|v| Some(round_to(v, decimals))),
    );
    cells.push(
        row.attendance_project_corr
            .map(|corr| round_to(corr * 100.0, decimals)),
    );
    cells
}

fn write_row(sheet: &mut Worksheet, r: u32, row: &SummaryRow, decimals: u32) -> Result<()> {
    let mut col: u16 = 0;
    for key in &row.key {
        sheet.write_string(r, col, key)?;
        col += 1;
    }

    for cell in metric_cells(row, decimals) {
        if let Some(value) = cell {
            sheet.write_number(r, col, value)?;
        }
        col += 1;
    }

    Ok(())
}

/// Excel sheet names are limited to 31 characters and forbid `[]:*?/\`.
fn sheet_name(name: &str) -> String {
    name.chars()
        .map(|c| if "[]:*?/\\".contains(c) { '-' } else { c })
        .take(31)
        .collect()
}

/// Rendered output files, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifacts {
    pub cleaned_csv: Vec<u8>,
    pub summary_xlsx: Vec<u8>,
}

impl Artifacts {
    pub fn render(
        records: &[StudentRecord],
        tables: &[SummaryTable],
        decimals: u32,
    ) -> Result<Self> {
        Ok(Artifacts {
            cleaned_csv: cleaned_csv(records)?,
            summary_xlsx: summary_xlsx(tables, decimals)?,
        })
    }
}

/// Writes both artifacts, creating parent directories and overwriting existing files.
///
/// Both files are first written next to their targets as `<name>.tmp` and
/// only then renamed into place. Files being replaced are moved aside to
/// `<name>.bak` until both renames succeed, so a failure at any step leaves
/// the previous pair (or nothing) on disk.
pub fn write_artifacts(artifacts: &Artifacts, cleaned_path: &Path, summary_path: &Path) -> Result<()> {
    let targets = [
        (cleaned_path, artifacts.cleaned_csv.as_slice()),
        (summary_path, artifacts.summary_xlsx.as_slice()),
    ];

    for (path, _) in targets {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
    }

    let mut staged: Vec<PathBuf> = Vec::with_capacity(targets.len());
    for (path, bytes) in targets {
        let temp = sibling(path, "tmp");
        if let Err(e) = fs::write(&temp, bytes) {
            remove_all(&staged);
            let _ = fs::remove_file(&temp);
            return Err(PipelineError::io(&temp, e));
        }
        debug!(path = %temp.display(), bytes = bytes.len(), "Staged output");
        staged.push(temp);
    }

    let mut backups: Vec<(PathBuf, &Path)> = Vec::new();
    let mut placed: Vec<&Path> = Vec::new();
    let mut failure = None;

    for (path, _) in targets {
        if path.is_file() {
            let backup = sibling(path, "bak");
            if let Err(e) = fs::rename(path, &backup) {
                failure = Some(PipelineError::io(path, e));
                break;
            }
            backups.push((backup, path));
        }
    }

    if failure.is_none() {
        for (temp, (path, _)) in staged.iter().zip(targets) {
            if let Err(e) = fs::rename(temp, path) {
                failure = Some(PipelineError::io(path, e));
                break;
            }
            placed.push(path);
        }
    }

    if let Some(err) = failure {
        warn!(error = %err, "Output write failed, restoring previous files");
        for path in placed {
            let _ = fs::remove_file(path);
        }
        for (backup, path) in &backups {
            let _ = fs::rename(backup, path);
        }
        remove_all(&staged);
        return Err(err);
    }

    for (backup, _) in &backups {
        let _ = fs::remove_file(backup);
    }
    for (path, _) in targets {
        info!(path = %path.display(), "Output written");
    }

    Ok(())
}

fn sibling(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(extension);
    path.with_file_name(name)
}

fn remove_all(paths: &[PathBuf]) {
    for path in paths {
        let _ = fs::remove_file(path);
    }
}
