//! Data types used by the aggregation step.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::record::StudentRecord;

/// A field records can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dimension {
    Track,
    Cohort,
    #[serde(alias = "IncomeStudent")]
    Income,
}

impl Dimension {
    pub fn label(self) -> &'static str {
        match self {
            Dimension::Track => "Track",
            Dimension::Cohort => "Cohort",
            Dimension::Income => "Income Status",
        }
    }

    /// The record's value along this dimension, as shown in reports.
    pub fn value(self, record: &StudentRecord) -> String {
        match self {
            Dimension::Track => record.track.clone(),
            Dimension::Cohort => record.cohort.clone(),
            Dimension::Income if record.income_student => "Income Student".to_string(),
            Dimension::Income => "Non-Income Student".to_string(),
        }
    }
}

/// An ordered combination of dimensions, e.g. Track × Cohort.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupBy(Vec<Dimension>);

impl GroupBy {
    pub fn new(dimensions: Vec<Dimension>) -> Self {
        GroupBy(dimensions)
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.0
    }

    /// The single dimension, if this grouping has exactly one.
    pub fn single(&self) -> Option<Dimension> {
        match self.0.as_slice() {
            [d] => Some(*d),
            _ => None,
        }
    }

    pub fn key(&self, record: &StudentRecord) -> Vec<String> {
        self.0.iter().map(|d| d.value(record)).collect()
    }

    /// Name used for the summary sheet, e.g. `Track x Cohort`.
    pub fn name(&self) -> String {
        let names: Vec<&str> = self
            .0
            .iter()
            .map(|d| match d {
                Dimension::Income => "Income",
                other => other.label(),
            })
            .collect();
        names.join(" x ")
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Metrics for one non-empty group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub key: Vec<String>,
    pub count: usize,
    pub math: f64,
    pub english: f64,
    pub science: f64,
    pub history: f64,
    pub project_score: f64,
    pub attendance_rate: f64,
    /// Fraction of records with Passed = true, in `[0, 1]`.
    pub pass_rate: f64,
    /// Pearson correlation of Attendance and ProjectScore; `None` when undefined.
    pub attendance_project_corr: Option<f64>,
}

/// All groups of one [`GroupBy`], ordered by key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTable {
    pub group_by: GroupBy,
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    pub fn name(&self) -> String {
        self.group_by.name()
    }

    /// Header labels for the key columns.
    pub fn key_headers(&self) -> Vec<&'static str> {
        self.group_by.dimensions().iter().map(|d| d.label()).collect()
    }
}

/// Headline figures for the whole cleaned table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub total_students: usize,
    pub tracks: usize,
    pub cohorts: usize,
    /// Fraction in `[0, 1]`; `None` for an empty table.
    pub pass_rate: Option<f64>,
}
