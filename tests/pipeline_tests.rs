mod common;

use common::{config_in, sample_workbook, student, workbook};
use rust_xlsxwriter::Workbook;
use student_report::config::PipelineConfig;
use student_report::error::PipelineError;
use student_report::output::cleaned_csv;
use student_report::pipeline::{process_bytes, run};
use student_report::summary::types::Dimension;

#[test]
fn test_missing_math_gets_track_mean() {
    let outcome = process_bytes(&sample_workbook(), &PipelineConfig::default()).unwrap();

    let imputed = outcome
        .records
        .iter()
        .find(|r| r.student_id == "1002")
        .unwrap();
    assert_eq!(imputed.math, 85.0);
    assert_eq!(imputed.track, "A");
    assert_eq!(outcome.report.imputed_scores, 1);
    assert_eq!(outcome.report.dropped(), 0);
}

#[test]
fn test_track_pass_rate() {
    let outcome = process_bytes(&sample_workbook(), &PipelineConfig::default()).unwrap();

    let by_track = outcome
        .tables
        .iter()
        .find(|t| t.group_by.single() == Some(Dimension::Track))
        .unwrap();

    assert_eq!(by_track.rows.len(), 2);
    let a = &by_track.rows[0];
    assert_eq!(a.key, vec!["A".to_string()]);
    assert_eq!(a.count, 3);
    assert!((a.pass_rate - 2.0 / 3.0).abs() < 1e-9);
    assert!((a.math - 85.0).abs() < 1e-9);

    let b = &by_track.rows[1];
    assert_eq!(b.pass_rate, 0.5);
    assert_eq!(outcome.kpis.total_students, 5);
    assert_eq!(outcome.kpis.tracks, 2);
}

#[test]
fn test_malformed_student_id_drops_row() {
    let bytes = workbook(&[(
        "A",
        vec![student("1001", "80", "Y"), student("12A4", "90", "Y")],
    )]);

    let outcome = process_bytes(&bytes, &PipelineConfig::default()).unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].student_id, "1001");
    assert_eq!(outcome.report.dropped_incomplete, 1);
}

#[test]
fn test_sentinels_are_imputed() {
    let bytes = workbook(&[(
        "A",
        vec![
            student("1001", "70", "Y"),
            student("1002", "NA", "N"),
            student("1003", "Waived", "N"),
            student("1004", "90", "Y"),
        ],
    )]);

    let outcome = process_bytes(&bytes, &PipelineConfig::default()).unwrap();

    assert_eq!(outcome.records.len(), 4);
    assert_eq!(outcome.records[1].math, 80.0);
    assert_eq!(outcome.records[2].math, 80.0);
}

#[test]
fn test_fields_are_canonical_after_cleaning() {
    let outcome = process_bytes(&sample_workbook(), &PipelineConfig::default()).unwrap();

    for record in &outcome.records {
        assert_eq!(record.first_name, "Ada");
        assert_eq!(record.last_name, "Lovelace");
        assert_eq!(record.class, "10A");
        assert_eq!(record.term, 1);
        assert!(record.income_student);
    }
    let passed: Vec<bool> = outcome.records.iter().map(|r| r.passed).collect();
    assert_eq!(passed, vec![true, false, true, false, true]);
}

#[test]
fn test_cleaned_csv_is_byte_identical_across_runs() {
    let config = PipelineConfig::default();
    let bytes = sample_workbook();

    let first = process_bytes(&bytes, &config).unwrap();
    let second = process_bytes(&bytes, &config).unwrap();

    assert_eq!(first.tables, second.tables);
    assert_eq!(
        cleaned_csv(&first.records).unwrap(),
        cleaned_csv(&second.records).unwrap()
    );

    let csv = String::from_utf8(cleaned_csv(&first.records).unwrap()).unwrap();
    assert!(csv.lines().nth(2).unwrap().contains(",85.0,"));
    assert!(csv.lines().skip(1).all(|l| l.ends_with(",A") || l.ends_with(",B")));
}

#[test]
fn test_workbook_without_sheets_is_rejected() {
    let mut empty = Workbook::new();
    empty.add_worksheet();
    let bytes = empty.save_to_buffer().unwrap();

    let err = process_bytes(&bytes, &PipelineConfig::default()).unwrap_err();

    assert!(matches!(err, PipelineError::NoSheets));
}

#[test]
fn test_first_sheet_missing_column_is_rejected() {
    let mut book = Workbook::new();
    let sheet = book.add_worksheet();
    sheet.set_name("A").unwrap();
    for (col, header) in common::HEADER.iter().take(13).enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    let bytes = book.save_to_buffer().unwrap();

    let err = process_bytes(&bytes, &PipelineConfig::default()).unwrap_err();

    match err {
        PipelineError::MissingColumn { sheet, column } => {
            assert_eq!(sheet, "A");
            assert_eq!(column, "Passed (Y/N)");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_no_surviving_rows_is_rejected() {
    let bytes = workbook(&[(
        "A",
        vec![student("12A4", "80", "Y"), student("", "90", "Y")],
    )]);

    let err = process_bytes(&bytes, &PipelineConfig::default()).unwrap_err();

    assert!(matches!(err, PipelineError::NoRowsSurvived { dropped: 2 }));
}

#[test]
fn test_invalid_bytes_are_rejected() {
    let err = process_bytes(b"not a workbook", &PipelineConfig::default()).unwrap_err();
    assert!(matches!(err, PipelineError::Workbook(_)));
}

#[test]
fn test_run_writes_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    std::fs::write(&config.input_path, sample_workbook()).unwrap();

    let summary = run(&config).unwrap();

    assert_eq!(summary.cleaned_path, dir.path().join("outputs/cleaned_dataset.csv"));
    assert!(summary.cleaned_path.exists());
    assert!(summary.summary_path.exists());
    assert!(!dir.path().join("outputs/cleaned_dataset.csv.tmp").exists());
    assert_eq!(summary.outcome.records.len(), 5);

    let names: Vec<_> = summary
        .figures
        .iter()
        .map(|p| p.strip_prefix(&config.figures_dir).unwrap().to_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "avg_scores_by_track.png",
            "pass_rate_by_track.png",
            "avg_math_scores_by_track.png",
            "avg_scores_by_cohort.png",
            "pass_rate_by_cohort.png",
            "avg_scores_by_income_status.png",
            "pass_rate_by_income_status.png",
            "history_grades_by_track.png",
            "math_grades_by_track.png",
            "attendance_vs_project_by_track.png",
        ]
    );
    for figure in &summary.figures {
        assert!(std::fs::read(figure).unwrap().starts_with(b"\x89PNG"));
    }
}

#[test]
fn test_run_missing_input_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    assert!(run(&config).is_err());
    assert!(!config.output_dir.exists());
}
