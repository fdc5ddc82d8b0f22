#![allow(dead_code)]

use rust_xlsxwriter::Workbook;
use std::path::Path;
use student_report::config::PipelineConfig;

pub const HEADER: [&str; 14] = [
    "StudentID",
    "FirstName",
    "LastName",
    "Class",
    "Cohort",
    "Term",
    "Math",
    "English",
    "Science",
    "History",
    "Attendance (%)",
    "ProjectScore",
    "IncomeStudent",
    "Passed (Y/N)",
];

/// A row in [`HEADER`] order. Empty strings become blank cells; anything that
/// parses as a number is written as a number, except the StudentID.
pub type Row = [&'static str; 14];

pub fn student(id: &'static str, math: &'static str, passed: &'static str) -> Row {
    [
        id, "ada", "LOVELACE", "10a", "23-24", "1", math, "70", "65", "60", "90", "75", "Y",
        passed,
    ]
}

/// Builds an xlsx workbook with one sheet per `(name, rows)` pair.
pub fn workbook(sheets: &[(&str, Vec<Row>)]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    for (name, rows) in sheets {
        let sheet = workbook.add_worksheet();
        sheet.set_name(*name).unwrap();
        for (col, header) in HEADER.iter().enumerate() {
            sheet.write_string(0, col as u16, *header).unwrap();
        }
        for (r, row) in rows.iter().enumerate() {
            let r = r as u32 + 1;
            for (col, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                match value.parse::<f64>() {
                    Ok(n) if col != 0 => sheet.write_number(r, col as u16, n).unwrap(),
                    _ => sheet.write_string(r, col as u16, *value).unwrap(),
                };
            }
        }
    }
    workbook.save_to_buffer().unwrap()
}

/// Two Tracks; Track A's second student has no Math score.
pub fn sample_workbook() -> Vec<u8> {
    workbook(&[
        (
            "A",
            vec![
                student("1001", "80", "Y"),
                student("1002", "", "N"),
                student("1003", "90", "Y"),
            ],
        ),
        (
            "B",
            vec![student("2001", "55", "N"), student("2002", "65", "Yes")],
        ),
    ])
}

/// Default config with every output placed under `dir`.
pub fn config_in(dir: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.input_path = dir.join("grades.xlsx");
    config.output_dir = dir.join("outputs");
    config.figures_dir = dir.join("outputs/figures");
    config.dashboard.reports_dir = dir.join("reports");
    config
}
