//! Concatenates per-Track sheets into one table aligned on the expected schema.

use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::parser::{Cell, Sheet};
use crate::record::Column;
use crate::validate::title_case;

/// A raw row tagged with its Track. `cells` is indexed by [`Column::index`].
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub track: String,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedTable {
    /// Track names in sheet order.
    pub tracks: Vec<String>,
    pub rows: Vec<MergedRow>,
}

/// Where each expected column sits in a sheet's header, first occurrence wins.
fn locate_columns(header: &[String]) -> ([Option<usize>; Column::COUNT], Vec<String>) {
    let mut positions = [None; Column::COUNT];
    let mut unexpected = Vec::new();

    for (i, name) in header.iter().enumerate() {
        match Column::from_header(name) {
            Some(column) if positions[column.index()].is_none() => {
                positions[column.index()] = Some(i);
            }
            Some(_) => unexpected.push(format!("{name} (duplicate)")),
            None if name.trim().is_empty() => {}
            None => unexpected.push(name.clone()),
        }
    }

    (positions, unexpected)
}

/// Merges `sheets` into one table, adding the Track taken from each
/// (title-cased) sheet name.
///
/// The first sheet must carry every expected column. Later sheets are coerced
/// onto that schema: unexpected columns are dropped and absent ones are filled
/// with missing cells, both with a warning. Fully blank rows are skipped.
#[tracing::instrument(skip_all, fields(sheets = sheets.len()))]
pub fn merge_sheets(sheets: Vec<Sheet>) -> Result<MergedTable> {
    let first = sheets.first().ok_or(PipelineError::NoSheets)?;
    let (positions, _) = locate_columns(&first.header);
    if let Some(column) = Column::ALL.into_iter().find(|c| positions[c.index()].is_none()) {
        return Err(PipelineError::MissingColumn {
            sheet: first.name.clone(),
            column: column.header(),
        });
    }

    let mut table = MergedTable::default();

    for sheet in sheets {
        let track = title_case(&sheet.name);
        let (positions, unexpected) = locate_columns(&sheet.header);
        if !unexpected.is_empty() {
            warn!(sheet = %sheet.name, columns = ?unexpected, "Dropping unexpected columns");
        }

        let absent: Vec<&str> = Column::ALL
            .iter()
            .filter(|c| positions[c.index()].is_none())
            .map(|c| c.header())
            .collect();
        if !absent.is_empty() {
            warn!(sheet = %sheet.name, columns = ?absent, "Columns absent, values treated as missing");
        }

        let before = table.rows.len();
        for row in sheet.rows {
            if row.iter().all(Cell::is_empty) {
                continue;
            }

            let cells = positions
                .iter()
                .map(|pos| pos.and_then(|i| row.get(i).cloned()).unwrap_or_default())
                .collect();

            table.rows.push(MergedRow {
                track: track.clone(),
                cells,
            });
        }

        debug!(sheet = %sheet.name, rows = table.rows.len() - before, "Sheet merged");
        table.tracks.push(track);
    }

    info!(
        tracks = table.tracks.len(),
        rows = table.rows.len(),
        "Sheets merged"
    );
    Ok(table)
}
