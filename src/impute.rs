//! Fills missing values from per-Track statistics and drops rows that stay incomplete.

use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::record::{Categorical, DraftRecord, Score, StudentRecord};
use crate::stats::TrackStatistics;

/// What cleaning did to the merged table.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CleaningReport {
    pub input_rows: usize,
    pub imputed_scores: usize,
    pub imputed_categories: usize,
    pub dropped_incomplete: usize,
    pub dropped_duplicates: usize,
}

impl CleaningReport {
    pub fn dropped(&self) -> usize {
        self.dropped_incomplete + self.dropped_duplicates
    }
}

/// Fills every missing score with its Track mean and every missing
/// `categorical` value with its Track mode. Identifiers are left untouched.
pub fn impute(
    drafts: &mut [DraftRecord],
    categorical: &[Categorical],
    stats: &TrackStatistics,
    report: &mut CleaningReport,
) {
    for draft in drafts.iter_mut() {
        for score in Score::ALL {
            if draft.score(score).is_none() {
                if let Some(mean) = stats.mean(&draft.track, score) {
                    *draft.score_mut(score) = Some(mean);
                    report.imputed_scores += 1;
                }
            }
        }

        for &column in categorical {
            if draft.category(column).is_none() {
                if let Some(mode) = stats.mode(&draft.track, column) {
                    draft.set_category(column, mode.clone());
                    report.imputed_categories += 1;
                }
            }
        }
    }
}

/// Keeps drafts with every field present.
pub fn complete(drafts: Vec<DraftRecord>, report: &mut CleaningReport) -> Vec<StudentRecord> {
    let mut records = Vec::with_capacity(drafts.len());
    for draft in drafts {
        let missing = draft.missing_columns();
        if !missing.is_empty() {
            debug!(
                track = %draft.track,
                student_id = ?draft.student_id,
                missing = ?missing,
                "Dropping incomplete row"
            );
            report.dropped_incomplete += 1;
            continue;
        }
        records.extend(draft.into_record());
    }
    records
}

/// Drops repeated (StudentID, Term, Track) rows, keeping the first.
pub fn drop_duplicates(
    records: Vec<StudentRecord>,
    report: &mut CleaningReport,
) -> Vec<StudentRecord> {
    let mut seen = HashSet::new();
    let before = records.len();
    let kept: Vec<StudentRecord> = records
        .into_iter()
        .filter(|r| seen.insert((r.student_id.clone(), r.term, r.track.clone())))
        .collect();
    report.dropped_duplicates += before - kept.len();
    kept
}

/// Runs imputation, completion and deduplication over validated drafts.
#[tracing::instrument(skip_all, fields(rows = drafts.len()))]
pub fn clean(
    mut drafts: Vec<DraftRecord>,
    categorical: &[Categorical],
    dedupe: bool,
) -> (Vec<StudentRecord>, CleaningReport) {
    let mut report = CleaningReport {
        input_rows: drafts.len(),
        ..Default::default()
    };

    let stats = TrackStatistics::from_drafts(&drafts, categorical);
    impute(&mut drafts, categorical, &stats, &mut report);

    let mut records = complete(drafts, &mut report);
    if dedupe {
        records = drop_duplicates(records, &mut report);
    }

    if report.dropped() > 0 {
        warn!(
            dropped_incomplete = report.dropped_incomplete,
            dropped_duplicates = report.dropped_duplicates,
            "Rows dropped during cleaning"
        );
    }
    info!(
        kept = records.len(),
        imputed_scores = report.imputed_scores,
        imputed_categories = report.imputed_categories,
        "Cleaning complete"
    );

    (records, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full(track: &str, id: &str) -> DraftRecord {
        DraftRecord {
            track: track.into(),
            student_id: Some(id.into()),
            first_name: Some("Ada".into()),
            last_name: Some("Byron".into()),
            class: Some("10A".into()),
            cohort: Some("23-24".into()),
            term: Some(1),
            math: Some(50.0),
            english: Some(50.0),
            science: Some(50.0),
            history: Some(50.0),
            attendance: Some(90.0),
            project_score: Some(70.0),
            income_student: Some(false),
            passed: Some(true),
        }
    }

    #[test]
    fn test_missing_math_gets_track_mean() {
        let mut drafts = vec![full("A", "0001"), full("A", "0002"), full("A", "0003")];
        drafts[0].math = Some(80.0);
        drafts[1].math = None;
        drafts[2].math = Some(90.0);

        let (records, report) = clean(drafts, &Categorical::ALL, true);

        assert_eq!(records.len(), 3);
        assert_eq!(records[1].math, 85.0);
        assert_eq!(report.imputed_scores, 1);
    }

    #[test]
    fn test_statistics_do_not_cross_tracks() {
        let mut drafts = vec![full("A", "0001"), full("B", "0002"), full("B", "0003")];
        drafts[0].math = Some(20.0);
        drafts[1].math = Some(60.0);
        drafts[2].math = None;

        let (records, _) = clean(drafts, &Categorical::ALL, true);

        assert_eq!(records[2].math, 60.0);
    }

    #[test]
    fn test_missing_boolean_gets_track_mode() {
        let mut drafts = vec![full("A", "0001"), full("A", "0002"), full("A", "0003")];
        drafts[0].passed = Some(false);
        drafts[1].passed = Some(false);
        drafts[2].passed = None;

        let (records, report) = clean(drafts, &Categorical::ALL, true);

        assert!(!records[2].passed);
        assert_eq!(report.imputed_categories, 1);
    }

    #[test]
    fn test_identifier_is_never_imputed() {
        let mut drafts = vec![full("A", "0001"), full("A", "0002")];
        drafts[1].student_id = None;

        let (records, report) = clean(drafts, &Categorical::ALL, true);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].student_id, "0001");
        assert_eq!(report.dropped_incomplete, 1);
    }

    #[test]
    fn test_track_without_any_value_drops_rows() {
        let mut drafts = vec![full("A", "0001"), full("B", "0002")];
        drafts[1].history = None;

        let (records, report) = clean(drafts, &Categorical::ALL, true);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].track, "A");
        assert_eq!(report.dropped_incomplete, 1);
    }

    #[test]
    fn test_categorical_outside_config_is_not_imputed() {
        let mut drafts = vec![full("A", "0001"), full("A", "0002")];
        drafts[1].cohort = None;

        let (records, _) = clean(drafts, &[Categorical::Passed], true);

        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_duplicates_keep_first() {
        let mut drafts = vec![full("A", "0001"), full("A", "0001"), full("B", "0001")];
        drafts[1].math = Some(10.0);
        let mut second_term = full("A", "0001");
        second_term.term = Some(2);
        drafts.push(second_term);

        let (records, report) = clean(drafts.clone(), &Categorical::ALL, true);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].math, 50.0);
        assert_eq!(report.dropped_duplicates, 1);

        let (records, _) = clean(drafts, &Categorical::ALL, false);
        assert_eq!(records.len(), 4);
    }
}
