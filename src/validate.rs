//! Per-field parsing of merged rows into [`DraftRecord`]s.
//!
//! Every parser is total: a value that does not conform to its field's format
//! comes back as `None` and is left for imputation or row dropping.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::merge::MergedRow;
use crate::normalize::Normalizer;
use crate::parser::Cell;
use crate::record::{Column, DraftRecord, Score};

static STUDENT_ID_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}$").unwrap());
static CLASS_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}[A-Z]$").unwrap());
static COHORT_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}-\d{2}$").unwrap());

pub fn student_id(cell: &Cell) -> Option<String> {
    let text = cell.as_text()?;
    STUDENT_ID_PATTERN.is_match(&text).then_some(text)
}

pub fn class_code(cell: &Cell) -> Option<String> {
    let text = cell.as_text()?.to_uppercase();
    CLASS_PATTERN.is_match(&text).then_some(text)
}

pub fn cohort(cell: &Cell) -> Option<String> {
    let text = cell.as_text()?;
    COHORT_PATTERN.is_match(&text).then_some(text)
}

pub fn term(cell: &Cell) -> Option<u8> {
    let value = number(cell)?;
    if value == 1.0 {
        Some(1)
    } else if value == 2.0 {
        Some(2)
    } else {
        None
    }
}

/// A score or attendance percentage in `[0, 100]`.
pub fn score(cell: &Cell) -> Option<f64> {
    number(cell).filter(|v| (0.0..=100.0).contains(v))
}

/// Trims and title-cases a personal name.
pub fn name(cell: &Cell) -> Option<String> {
    let text = cell.as_text()?;
    (!text.is_empty()).then(|| title_case(&text))
}

fn number(cell: &Cell) -> Option<f64> {
    let value = match cell {
        Cell::Number(n) => *n,
        Cell::Text(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

/// Uppercases the first letter of every alphabetic run and lowercases the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// Builds a draft from a merged row whose cells already went through
/// [`Normalizer::cell`].
pub fn draft(row: &MergedRow, normalizer: &Normalizer) -> DraftRecord {
    let cell = |column: Column| &row.cells[column.index()];

    let mut draft = DraftRecord::new(row.track.clone());
    draft.student_id = student_id(cell(Column::StudentId));
    draft.first_name = name(cell(Column::FirstName));
    draft.last_name = name(cell(Column::LastName));
    draft.class = class_code(cell(Column::Class));
    draft.cohort = cohort(cell(Column::Cohort));
    draft.term = term(cell(Column::Term));
    for s in Score::ALL {
        *draft.score_mut(s) = score(cell(s.column()));
    }
    draft.income_student = normalizer.boolean(cell(Column::IncomeStudent));
    draft.passed = normalizer.boolean(cell(Column::Passed));
    draft
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn test_student_id_format() {
        assert_eq!(student_id(&text("1234")).as_deref(), Some("1234"));
        assert_eq!(student_id(&Cell::Number(4321.0)).as_deref(), Some("4321"));
        assert_eq!(student_id(&text("0042")).as_deref(), Some("0042"));
        assert_eq!(student_id(&text("12A4")), None);
        assert_eq!(student_id(&text("12345")), None);
        assert_eq!(student_id(&Cell::Number(123.0)), None);
        assert_eq!(student_id(&Cell::Number(1234.5)), None);
    }

    #[test]
    fn test_class_code_is_uppercased() {
        assert_eq!(class_code(&text("10a")).as_deref(), Some("10A"));
        assert_eq!(class_code(&text("10AB")), None);
        assert_eq!(class_code(&text("1A")), None);
    }

    #[test]
    fn test_cohort_format() {
        assert_eq!(cohort(&text("23-24")).as_deref(), Some("23-24"));
        assert_eq!(cohort(&text("2023-24")), None);
        assert_eq!(cohort(&text("23/24")), None);
    }

    #[test]
    fn test_term_values() {
        assert_eq!(term(&Cell::Number(1.0)), Some(1));
        assert_eq!(term(&text("2")), Some(2));
        assert_eq!(term(&Cell::Number(3.0)), None);
        assert_eq!(term(&Cell::Number(1.5)), None);
        assert_eq!(term(&text("first")), None);
    }

    #[test]
    fn test_score_range() {
        assert_eq!(score(&Cell::Number(0.0)), Some(0.0));
        assert_eq!(score(&Cell::Number(100.0)), Some(100.0));
        assert_eq!(score(&text(" 72.5 ")), Some(72.5));
        assert_eq!(score(&Cell::Number(-1.0)), None);
        assert_eq!(score(&Cell::Number(100.5)), None);
        assert_eq!(score(&text("inf")), None);
        assert_eq!(score(&Cell::Bool(true)), None);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("mary-jane o'neil"), "Mary-Jane O'Neil");
        assert_eq!(title_case("SMITH"), "Smith");
    }

    #[test]
    fn test_draft_marks_malformed_fields_missing() {
        let mut cells = vec![Cell::Empty; Column::COUNT];
        cells[Column::StudentId.index()] = text("12A4");
        cells[Column::FirstName.index()] = text("ada");
        cells[Column::Class.index()] = text("10b");
        cells[Column::Term.index()] = Cell::Number(5.0);
        cells[Column::Math.index()] = Cell::Number(150.0);
        cells[Column::English.index()] = Cell::Number(64.0);
        cells[Column::Passed.index()] = text("Yes");
        let row = MergedRow {
            track: "Science".into(),
            cells,
        };

        let draft = draft(&row, &Normalizer::default());

        assert_eq!(draft.track, "Science");
        assert_eq!(draft.student_id, None);
        assert_eq!(draft.first_name.as_deref(), Some("Ada"));
        assert_eq!(draft.class.as_deref(), Some("10B"));
        assert_eq!(draft.term, None);
        assert_eq!(draft.math, None);
        assert_eq!(draft.english, Some(64.0));
        assert_eq!(draft.passed, Some(true));
        assert_eq!(draft.income_student, None);
    }
}
