//! Column schema of the input workbook and the typed student records built from it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A column every Track sheet is expected to carry, in workbook order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    StudentId,
    FirstName,
    LastName,
    Class,
    Cohort,
    Term,
    Math,
    English,
    Science,
    History,
    Attendance,
    ProjectScore,
    IncomeStudent,
    Passed,
}

impl Column {
    pub const COUNT: usize = 14;

    pub const ALL: [Column; Column::COUNT] = [
        Column::StudentId,
        Column::FirstName,
        Column::LastName,
        Column::Class,
        Column::Cohort,
        Column::Term,
        Column::Math,
        Column::English,
        Column::Science,
        Column::History,
        Column::Attendance,
        Column::ProjectScore,
        Column::IncomeStudent,
        Column::Passed,
    ];

    /// Header text as it appears in the workbook and in the cleaned CSV.
    pub fn header(self) -> &'static str {
        match self {
            Column::StudentId => "StudentID",
            Column::FirstName => "FirstName",
            Column::LastName => "LastName",
            Column::Class => "Class",
            Column::Cohort => "Cohort",
            Column::Term => "Term",
            Column::Math => "Math",
            Column::English => "English",
            Column::Science => "Science",
            Column::History => "History",
            Column::Attendance => "Attendance (%)",
            Column::ProjectScore => "ProjectScore",
            Column::IncomeStudent => "IncomeStudent",
            Column::Passed => "Passed (Y/N)",
        }
    }

    /// Resolves a header cell, ignoring surrounding whitespace and ASCII case.
    pub fn from_header(name: &str) -> Option<Column> {
        let name = name.trim();
        Column::ALL
            .into_iter()
            .find(|c| c.header().eq_ignore_ascii_case(name))
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// Numeric 0–100 fields, imputed with the Track mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Score {
    Math,
    English,
    Science,
    History,
    #[serde(rename = "Attendance (%)", alias = "Attendance")]
    Attendance,
    ProjectScore,
}

impl Score {
    pub const ALL: [Score; 6] = [
        Score::Math,
        Score::English,
        Score::Science,
        Score::History,
        Score::Attendance,
        Score::ProjectScore,
    ];

    /// The four graded subjects shown side by side in the reports.
    pub const SUBJECTS: [Score; 4] = [Score::Math, Score::English, Score::Science, Score::History];

    pub fn column(self) -> Column {
        match self {
            Score::Math => Column::Math,
            Score::English => Column::English,
            Score::Science => Column::Science,
            Score::History => Column::History,
            Score::Attendance => Column::Attendance,
            Score::ProjectScore => Column::ProjectScore,
        }
    }

    pub fn label(self) -> &'static str {
        self.column().header()
    }
}

/// Fields imputed with the Track mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Categorical {
    Class,
    Cohort,
    Term,
    IncomeStudent,
    #[serde(rename = "Passed (Y/N)", alias = "Passed")]
    Passed,
}

impl Categorical {
    pub const ALL: [Categorical; 5] = [
        Categorical::Class,
        Categorical::Cohort,
        Categorical::Term,
        Categorical::IncomeStudent,
        Categorical::Passed,
    ];
}

/// A value of a [`Categorical`] field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Text(String),
    Term(u8),
    Flag(bool),
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Text(s) => f.write_str(s),
            Category::Term(t) => write!(f, "{t}"),
            Category::Flag(b) => write!(f, "{b}"),
        }
    }
}

/// A record mid-cleaning. `None` marks a value that was absent or failed validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftRecord {
    pub track: String,
    pub student_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub class: Option<String>,
    pub cohort: Option<String>,
    pub term: Option<u8>,
    pub math: Option<f64>,
    pub english: Option<f64>,
    pub science: Option<f64>,
    pub history: Option<f64>,
    pub attendance: Option<f64>,
    pub project_score: Option<f64>,
    pub income_student: Option<bool>,
    pub passed: Option<bool>,
}

impl DraftRecord {
    pub fn new(track: impl Into<String>) -> Self {
        DraftRecord {
            track: track.into(),
            ..Default::default()
        }
    }

    pub fn score(&self, score: Score) -> Option<f64> {
        match score {
            Score::Math => self.math,
            Score::English => self.english,
            Score::Science => self.science,
            Score::History => self.history,
            Score::Attendance => self.attendance,
            Score::ProjectScore => self.project_score,
        }
    }

    pub fn score_mut(&mut self, score: Score) -> &mut Option<f64> {
        match score {
            Score::Math => &mut self.math,
            Score::English => &mut self.english,
            Score::Science => &mut self.science,
            Score::History => &mut self.history,
            Score::Attendance => &mut self.attendance,
            Score::ProjectScore => &mut self.project_score,
        }
    }

    pub fn category(&self, column: Categorical) -> Option<Category> {
        match column {
            Categorical::Class => self.class.clone().map(Category::Text),
            Categorical::Cohort => self.cohort.clone().map(Category::Text),
            Categorical::Term => self.term.map(Category::Term),
            Categorical::IncomeStudent => self.income_student.map(Category::Flag),
            Categorical::Passed => self.passed.map(Category::Flag),
        }
    }

    /// Stores `value` when it has the shape of `column`; mismatched shapes are ignored.
    pub fn set_category(&mut self, column: Categorical, value: Category) {
        match (column, value) {
            (Categorical::Class, Category::Text(s)) => self.class = Some(s),
            (Categorical::Cohort, Category::Text(s)) => self.cohort = Some(s),
            (Categorical::Term, Category::Term(t)) => self.term = Some(t),
            (Categorical::IncomeStudent, Category::Flag(b)) => self.income_student = Some(b),
            (Categorical::Passed, Category::Flag(b)) => self.passed = Some(b),
            _ => {}
        }
    }

    /// Columns that are still missing.
    pub fn missing_columns(&self) -> Vec<Column> {
        let mut missing = Vec::new();
        if self.student_id.is_none() {
            missing.push(Column::StudentId);
        }
        if self.first_name.is_none() {
            missing.push(Column::FirstName);
        }
        if self.last_name.is_none() {
            missing.push(Column::LastName);
        }
        if self.class.is_none() {
            missing.push(Column::Class);
        }
        if self.cohort.is_none() {
            missing.push(Column::Cohort);
        }
        if self.term.is_none() {
            missing.push(Column::Term);
        }
        for score in Score::ALL {
            if self.score(score).is_none() {
                missing.push(score.column());
            }
        }
        if self.income_student.is_none() {
            missing.push(Column::IncomeStudent);
        }
        if self.passed.is_none() {
            missing.push(Column::Passed);
        }
        missing
    }

    /// Converts into a [`StudentRecord`] when no field is missing.
    pub fn into_record(self) -> Option<StudentRecord> {
        Some(StudentRecord {
            student_id: self.student_id?,
            first_name: self.first_name?,
            last_name: self.last_name?,
            class: self.class?,
            cohort: self.cohort?,
            term: self.term?,
            math: self.math?,
            english: self.english?,
            science: self.science?,
            history: self.history?,
            attendance: self.attendance?,
            project_score: self.project_score?,
            income_student: self.income_student?,
            passed: self.passed?,
            track: self.track,
        })
    }
}

/// A fully cleaned row. Field order is the column order of the cleaned CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRecord {
    #[serde(rename = "StudentID")]
    pub student_id: String,
    #[serde(rename = "FirstName")]
    pub first_name: String,
    #[serde(rename = "LastName")]
    pub last_name: String,
    #[serde(rename = "Class")]
    pub class: String,
    #[serde(rename = "Cohort")]
    pub cohort: String,
    #[serde(rename = "Term")]
    pub term: u8,
    #[serde(rename = "Math")]
    pub math: f64,
    #[serde(rename = "English")]
    pub english: f64,
    #[serde(rename = "Science")]
    pub science: f64,
    #[serde(rename = "History")]
    pub history: f64,
    #[serde(rename = "Attendance (%)")]
    pub attendance: f64,
    #[serde(rename = "ProjectScore")]
    pub project_score: f64,
    #[serde(rename = "IncomeStudent")]
    pub income_student: bool,
    #[serde(rename = "Passed (Y/N)")]
    pub passed: bool,
    #[serde(rename = "Track")]
    pub track: String,
}

impl StudentRecord {
    pub fn score(&self, score: Score) -> f64 {
        match score {
            Score::Math => self.math,
            Score::English => self.english,
            Score::Science => self.science,
            Score::History => self.history,
            Score::Attendance => self.attendance,
            Score::ProjectScore => self.project_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_header_ignores_case_and_whitespace() {
        assert_eq!(Column::from_header("  studentid "), Some(Column::StudentId));
        assert_eq!(Column::from_header("ATTENDANCE (%)"), Some(Column::Attendance));
        assert_eq!(Column::from_header("Nickname"), None);
    }

    #[test]
    fn test_column_index_follows_schema_order() {
        for (i, column) in Column::ALL.iter().enumerate() {
            assert_eq!(column.index(), i);
        }
    }

    #[test]
    fn test_into_record_requires_every_field() {
        let mut draft = complete_draft();
        assert!(draft.clone().into_record().is_some());

        draft.history = None;
        assert_eq!(draft.missing_columns(), vec![Column::History]);
        assert!(draft.into_record().is_none());
    }

    #[test]
    fn test_set_category_ignores_mismatched_shape() {
        let mut draft = DraftRecord::new("A");
        draft.set_category(Categorical::Term, Category::Text("x".into()));
        assert_eq!(draft.term, None);

        draft.set_category(Categorical::Term, Category::Term(2));
        assert_eq!(draft.category(Categorical::Term), Some(Category::Term(2)));
    }

    fn complete_draft() -> DraftRecord {
        DraftRecord {
            track: "A".into(),
            student_id: Some("1234".into()),
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
            class: Some("10A".into()),
            cohort: Some("23-24".into()),
            term: Some(1),
            math: Some(90.0),
            english: Some(80.0),
            science: Some(70.0),
            history: Some(60.0),
            attendance: Some(95.0),
            project_score: Some(88.0),
            income_student: Some(false),
            passed: Some(true),
        }
    }
}
