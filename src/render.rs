//! PNG charts of the summaries and the cleaned table.
//!
//! [`plan_charts`] decides what is plotted; [`draw_chart`] only turns a
//! [`Chart`] into pixels with `plotters`.

use anyhow::{Context, Result};
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::record::{Score, StudentRecord};
use crate::summary::types::{Dimension, SummaryTable};

const PASTEL: [RGBColor; 8] = [
    RGBColor(161, 201, 244),
    RGBColor(255, 180, 130),
    RGBColor(141, 229, 161),
    RGBColor(255, 159, 155),
    RGBColor(208, 187, 255),
    RGBColor(222, 187, 155),
    RGBColor(250, 176, 228),
    RGBColor(207, 207, 207),
];

const SIZE: (u32, u32) = (1000, 600);
const HISTOGRAM_BINS: usize = 14;

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

/// One figure, with the data it plots.
#[derive(Debug, Clone, PartialEq)]
pub enum Chart {
    /// Grouped vertical bars on a 0–100 axis: one group per category, one bar per series.
    Bars {
        file: String,
        title: String,
        x_desc: String,
        y_desc: String,
        categories: Vec<String>,
        series: Vec<Series>,
    },
    /// Overlaid histograms over 0–100, one series per Track.
    Histogram {
        file: String,
        title: String,
        x_desc: String,
        series: Vec<Series>,
    },
    /// Attendance vs ProjectScore, one panel per Track.
    Scatter {
        file: String,
        title: String,
        panels: Vec<(String, Vec<(f64, f64)>)>,
    },
}

impl Chart {
    pub fn file(&self) -> &str {
        match self {
            Chart::Bars { file, .. } | Chart::Histogram { file, .. } | Chart::Scatter { file, .. } => file,
        }
    }
}

fn slug(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Track => "track",
        Dimension::Cohort => "cohort",
        Dimension::Income => "income_status",
    }
}

/// Chooses the figures for a run. Bar charts are planned for every
/// single-dimension table present in `tables`.
pub fn plan_charts(
    tables: &[SummaryTable],
    records: &[StudentRecord],
    histogram_subjects: &[Score],
) -> Vec<Chart> {
    let mut charts = Vec::new();

    for table in tables {
        let Some(dimension) = table.group_by.single() else {
            continue;
        };
        let categories: Vec<String> = table.rows.iter().map(|r| r.key[0].clone()).collect();

        let subjects = [
            ("Math", table.rows.iter().map(|r| r.math).collect::<Vec<_>>()),
            ("English", table.rows.iter().map(|r| r.english).collect()),
            ("Science", table.rows.iter().map(|r| r.science).collect()),
            ("History", table.rows.iter().map(|r| r.history).collect()),
        ];
        charts.push(Chart::Bars {
            file: format!("avg_scores_by_{}.png", slug(dimension)),
            title: format!("Average Scores by {} and Subject", dimension.label()),
            x_desc: dimension.label().to_string(),
            y_desc: "Average Score".to_string(),
            categories: categories.clone(),
            series: subjects
                .into_iter()
                .map(|(name, values)| Series {
                    name: name.to_string(),
                    values,
                })
                .collect(),
        });

        charts.push(Chart::Bars {
            file: format!("pass_rate_by_{}.png", slug(dimension)),
            title: format!("Pass Rate by {}", dimension.label()),
            x_desc: dimension.label().to_string(),
            y_desc: "Pass Rate (%)".to_string(),
            categories: categories.clone(),
            series: vec![Series {
                name: "Pass Rate (%)".to_string(),
                values: table.rows.iter().map(|r| r.pass_rate * 100.0).collect(),
            }],
        });

        if dimension == Dimension::Track {
            charts.push(Chart::Bars {
                file: "avg_math_scores_by_track.png".to_string(),
                title: "Average Mathematics Scores by Track".to_string(),
                x_desc: "Track".to_string(),
                y_desc: "Average Math Score".to_string(),
                categories,
                series: vec![Series {
                    name: "Math".to_string(),
                    values: table.rows.iter().map(|r| r.math).collect(),
                }],
            });
        }
    }

    let mut by_track: BTreeMap<&str, Vec<&StudentRecord>> = BTreeMap::new();
    for record in records {
        by_track.entry(record.track.as_str()).or_default().push(record);
    }

    for &subject in histogram_subjects {
        charts.push(Chart::Histogram {
            file: format!("{}_grades_by_track.png", subject.label().to_lowercase()),
            title: format!("Distributions of {} Grades by Track", subject.label()),
            x_desc: format!("{} grade", subject.label()),
            series: by_track
                .iter()
                .map(|(track, rows)| Series {
                    name: track.to_string(),
                    values: rows.iter().map(|r| r.score(subject)).collect(),
                })
                .collect(),
        });
    }

    if !by_track.is_empty() {
        charts.push(Chart::Scatter {
            file: "attendance_vs_project_by_track.png".to_string(),
            title: "Attendance vs Project Score by Track".to_string(),
            panels: by_track
                .iter()
                .map(|(track, rows)| {
                    let points = rows.iter().map(|r| (r.attendance, r.project_score)).collect();
                    (track.to_string(), points)
                })
                .collect(),
        });
    }

    charts
}

/// Bin counts over `[0, 100]`; 100 falls in the last bin.
pub fn histogram_counts(values: &[f64], bins: usize) -> Vec<usize> {
    let mut counts = vec![0; bins];
    let width = 100.0 / bins as f64;
    for &v in values {
        let i = ((v / width).floor() as usize).min(bins - 1);
        counts[i] += 1;
    }
    counts
}

/// Draws `chart` into `dir`, returning the written path.
pub fn draw_chart(chart: &Chart, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(chart.file());
    let drawn = match chart {
        Chart::Bars {
            title,
            x_desc,
            y_desc,
            categories,
            series,
            ..
        } => draw_bars(&path, title, x_desc, y_desc, categories, series),
        Chart::Histogram {
            title,
            x_desc,
            series,
            ..
        } => draw_histogram(&path, title, x_desc, series),
        Chart::Scatter { title, panels, .. } => draw_scatter(&path, title, panels),
    };
    drawn.with_context(|| format!("failed to draw {}", path.display()))?;
    Ok(path)
}

/// Draws every chart, skipping (with a warning) any that fails.
pub fn render_figures(charts: &[Chart], dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create figures dir {}", dir.display()))?;

    let mut written = Vec::new();
    for chart in charts {
        match draw_chart(chart, dir) {
            Ok(path) => written.push(path),
            Err(e) => warn!(file = chart.file(), error = %format!("{e:#}"), "Skipping figure"),
        }
    }

    info!(figures = written.len(), dir = %dir.display(), "Figures rendered");
    Ok(written)
}

fn category_label(categories: &[String], x: f64) -> String {
    let nearest = x.round();
    if (x - nearest).abs() > 1e-6 || nearest < 0.0 {
        return String::new();
    }
    categories.get(nearest as usize).cloned().unwrap_or_default()
}

fn draw_bars(
    path: &Path,
    title: &str,
    x_desc: &str,
    y_desc: &str,
    categories: &[String],
    series: &[Series],
) -> Result<()> {
    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let n = categories.len().max(1);
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..100f64)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|x| category_label(categories, *x))
        .x_desc(x_desc)
        .y_desc(y_desc)
        .draw()?;

    let group_width = 0.8;
    let bar_width = group_width / series.len().max(1) as f64;

    for (j, s) in series.iter().enumerate() {
        let color = PASTEL[j % PASTEL.len()];
        let bars = s.values.iter().enumerate().map(move |(i, v)| {
            let x0 = i as f64 - group_width / 2.0 + j as f64 * bar_width;
            Rectangle::new([(x0, 0.0), (x0 + bar_width, v.clamp(0.0, 100.0))], color.filled())
        });
        let anno = chart.draw_series(bars)?;
        if series.len() > 1 {
            anno.label(s.name.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));
        }
    }

    if series.len() > 1 {
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

fn draw_histogram(path: &Path, title: &str, x_desc: &str, series: &[Series]) -> Result<()> {
    let counts: Vec<Vec<usize>> = series
        .iter()
        .map(|s| histogram_counts(&s.values, HISTOGRAM_BINS))
        .collect();
    let y_max = counts.iter().flatten().copied().max().unwrap_or(0).max(1) as f64 * 1.1;

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..100f64, 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc("Number of students")
        .draw()?;

    let width = 100.0 / HISTOGRAM_BINS as f64;
    for (j, (s, bins)) in series.iter().zip(&counts).enumerate() {
        let color = PASTEL[j % PASTEL.len()];
        let bars = bins.iter().enumerate().map(move |(i, &c)| {
            let x0 = i as f64 * width;
            Rectangle::new([(x0, 0.0), (x0 + width, c as f64)], color.mix(0.55).filled())
        });
        chart
            .draw_series(bars)?
            .label(s.name.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_scatter(path: &Path, title: &str, panels: &[(String, Vec<(f64, f64)>)]) -> Result<()> {
    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(title, ("sans-serif", 28))?;

    let areas = root.split_evenly((1, panels.len().max(1)));
    for (j, ((track, points), area)) in panels.iter().zip(areas.iter()).enumerate() {
        let color = PASTEL[j % PASTEL.len()];
        let mut chart = ChartBuilder::on(area)
            .caption(track.as_str(), ("sans-serif", 20))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(45)
            .build_cartesian_2d(0f64..100f64, 0f64..100f64)?;

        chart
            .configure_mesh()
            .x_desc("Attendance Rate (%)")
            .y_desc("Project Score")
            .draw()?;

        chart.draw_series(
            points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 4, color.mix(0.8).filled())),
        )?;
    }

    root.present()?;
    Ok(())
}
