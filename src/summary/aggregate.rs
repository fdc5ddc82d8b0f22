use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::record::{Score, StudentRecord};
use crate::summary::types::{GroupBy, Kpis, SummaryRow, SummaryTable};
use crate::summary::utility::{mean, pearson};

/// Aggregates `records` into one [`SummaryRow`] per non-empty group of `group_by`.
///
/// Groups come out sorted by key. A combination with no records never
/// produces a row.
pub fn aggregate(records: &[StudentRecord], group_by: &GroupBy) -> SummaryTable {
    let mut groups: BTreeMap<Vec<String>, Vec<&StudentRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(group_by.key(record)).or_default().push(record);
    }

    let rows = groups
        .into_iter()
        .map(|(key, members)| summarize_group(key, &members))
        .collect::<Vec<_>>();

    debug!(group_by = %group_by, groups = rows.len(), "Aggregated");

    SummaryTable {
        group_by: group_by.clone(),
        rows,
    }
}

/// Aggregates once per requested grouping, preserving the request order.
#[tracing::instrument(skip_all, fields(records = records.len(), groupings = dimensions.len()))]
pub fn summarize(records: &[StudentRecord], dimensions: &[GroupBy]) -> Vec<SummaryTable> {
    dimensions.iter().map(|g| aggregate(records, g)).collect()
}

fn summarize_group(key: Vec<String>, members: &[&StudentRecord]) -> SummaryRow {
    let series = |score: Score| -> Vec<f64> { members.iter().map(|r| r.score(score)).collect() };

    let attendance = series(Score::Attendance);
    let project = series(Score::ProjectScore);
    let passed = members.iter().filter(|r| r.passed).count();

    SummaryRow {
        key,
        count: members.len(),
        math: mean(&series(Score::Math)),
        english: mean(&series(Score::English)),
        science: mean(&series(Score::Science)),
        history: mean(&series(Score::History)),
        project_score: mean(&project),
        attendance_rate: mean(&attendance),
        pass_rate: passed as f64 / members.len() as f64,
        attendance_project_corr: pearson(&attendance, &project),
    }
}

pub fn kpis(records: &[StudentRecord]) -> Kpis {
    let tracks: BTreeSet<&str> = records.iter().map(|r| r.track.as_str()).collect();
    let cohorts: BTreeSet<&str> = records.iter().map(|r| r.cohort.as_str()).collect();
    let passed = records.iter().filter(|r| r.passed).count();

    Kpis {
        total_students: records.len(),
        tracks: tracks.len(),
        cohorts: cohorts.len(),
        pass_rate: (!records.is_empty()).then(|| passed as f64 / records.len() as f64),
    }
}
