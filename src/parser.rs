//! XLSX workbook parser for Track sheets.

use calamine::{Data, Reader, Xlsx, open_workbook};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::PipelineError;

/// A loosely typed spreadsheet cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Renders the cell as trimmed text. Integral numbers lose their fraction.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.trim().to_string()),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            Cell::Number(n) => Some(n.to_string()),
            Cell::Bool(b) => Some(b.to_string()),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) => Cell::Number(dt.as_f64()),
            other => Cell::Text(other.to_string()),
        }
    }
}

/// One worksheet: its name, header row and data rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    /// Splits raw rows into a header (first non-blank row) and data rows.
    ///
    /// Returns `None` when every row is blank.
    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Option<Self> {
        let mut rows = rows.into_iter().skip_while(|row| row.iter().all(Cell::is_empty));
        let header = rows
            .next()?
            .iter()
            .map(|cell| cell.as_text().unwrap_or_default())
            .collect();

        Some(Sheet {
            name: name.into(),
            header,
            rows: rows.collect(),
        })
    }
}

/// Opens the workbook at `path` and returns its non-empty sheets in workbook order.
pub fn load_workbook(path: impl AsRef<Path>) -> Result<Vec<Sheet>, PipelineError> {
    let path = path.as_ref();
    debug!(path = %path.display(), "Opening workbook");
    let workbook: Xlsx<_> = open_workbook(path)?;
    read_sheets(workbook)
}

/// Parses an in-memory xlsx file, e.g. an uploaded one.
///
/// # Errors
///
/// Returns an error if the bytes are not a readable xlsx workbook.
pub fn load_workbook_bytes(bytes: &[u8]) -> Result<Vec<Sheet>, PipelineError> {
    let workbook = Xlsx::new(Cursor::new(bytes.to_vec()))?;
    read_sheets(workbook)
}

fn read_sheets<RS>(mut workbook: Xlsx<RS>) -> Result<Vec<Sheet>, PipelineError>
where
    RS: std::io::Read + std::io::Seek,
{
    let mut sheets = Vec::new();

    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name)?;
        let rows = range
            .rows()
            .map(|row| row.iter().map(Cell::from).collect())
            .collect();

        match Sheet::from_rows(name.trim(), rows) {
            Some(sheet) => {
                debug!(sheet = %sheet.name, rows = sheet.rows.len(), "Sheet read");
                sheets.push(sheet);
            }
            None => warn!(sheet = %name, "Skipping empty sheet"),
        }
    }

    Ok(sheets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    #[test]
    fn test_parse_invalid_bytes() {
        let result = load_workbook_bytes(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(result.is_err());
    }

    #[test]
    fn test_as_text_drops_integral_fraction() {
        assert_eq!(Cell::Number(1234.0).as_text().as_deref(), Some("1234"));
        assert_eq!(Cell::Number(12.5).as_text().as_deref(), Some("12.5"));
        assert_eq!(Cell::Text("  10a ".into()).as_text().as_deref(), Some("10a"));
        assert_eq!(Cell::Empty.as_text(), None);
    }

    #[test]
    fn test_from_rows_skips_leading_blank_rows() {
        let sheet = Sheet::from_rows(
            "A",
            vec![
                vec![Cell::Empty, Cell::Empty],
                vec![Cell::Text("StudentID".into()), Cell::Text(" Math ".into())],
                vec![Cell::Number(1234.0), Cell::Number(80.0)],
            ],
        )
        .unwrap();

        assert_eq!(sheet.header, vec!["StudentID", "Math"]);
        assert_eq!(sheet.rows.len(), 1);
    }

    #[test]
    fn test_from_rows_blank_sheet() {
        assert!(Sheet::from_rows("A", vec![vec![Cell::Empty]]).is_none());
        assert!(Sheet::from_rows("A", vec![]).is_none());
    }

    #[test]
    fn test_load_workbook_bytes_reads_every_sheet() {
        let mut workbook = Workbook::new();
        for (name, value) in [("Science", 80.0), ("Arts", 70.0)] {
            let sheet = workbook.add_worksheet();
            sheet.set_name(name).unwrap();
            sheet.write_string(0, 0, "StudentID").unwrap();
            sheet.write_string(0, 1, "Math").unwrap();
            sheet.write_number(1, 0, 1234).unwrap();
            sheet.write_number(1, 1, value).unwrap();
        }
        workbook.add_worksheet().set_name("Empty").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let sheets = load_workbook_bytes(&bytes).unwrap();

        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].name, "Science");
        assert_eq!(sheets[1].name, "Arts");
        assert_eq!(sheets[1].rows[0], vec![Cell::Number(1234.0), Cell::Number(70.0)]);
    }
}
