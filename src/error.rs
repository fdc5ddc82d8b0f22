use std::path::PathBuf;
use thiserror::Error;

/// Failures that halt the pipeline before any output is written.
///
/// Per-field validation problems and incomplete rows are not errors: they are
/// recovered by marking values missing and dropping rows.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("workbook contains no sheets")]
    NoSheets,

    #[error("sheet '{sheet}' is missing expected column '{column}'")]
    MissingColumn { sheet: String, column: &'static str },

    #[error("no rows survived cleaning ({dropped} dropped)")]
    NoRowsSurvived { dropped: usize },

    #[error("failed to read workbook: {0}")]
    Workbook(#[from] calamine::XlsxError),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
