//! Interactive dashboard: upload a workbook, browse the summaries and figures,
//! download the cleaned CSV and the summary workbook.
//!
//! Uploads are processed by the same pipeline as the batch run. Results are
//! memoized in a [`PipelineCache`] keyed by the upload's content hash, which
//! doubles as the report id in every download URL.

use actix_web::{App, HttpResponse, HttpServer, get, post, web};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

use crate::cache::{PipelineCache, content_key};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::impute::CleaningReport;
use crate::output::{METRIC_HEADERS, metric_cells};
use crate::pipeline::{PipelineOutcome, process_bytes};
use crate::record::StudentRecord;
use crate::render::render_figures;
use crate::summary::types::{Kpis, SummaryTable};

const INDEX_HTML: &str = include_str!("../static/index.html");
const PREVIEW_ROWS: usize = 50;

/// A processed upload, kept in the cache.
#[derive(Debug)]
pub struct Report {
    pub id: String,
    pub generated_at: DateTime<Utc>,
    pub outcome: PipelineOutcome,
    pub cleaned_csv: Bytes,
    pub summary_xlsx: Bytes,
    pub figures_dir: PathBuf,
    pub figures: Vec<String>,
}

impl Report {
    /// Runs the pipeline over `bytes` and renders the report's figures under
    /// `<reports_dir>/<id>/`.
    pub fn build(id: &str, bytes: &[u8], config: &PipelineConfig) -> Result<Self, PipelineError> {
        let outcome = process_bytes(bytes, config)?;
        let artifacts = outcome.artifacts(config)?;

        let figures_dir = config.dashboard.reports_dir.join(id);
        let figures = match render_figures(&outcome.charts(config), &figures_dir) {
            Ok(paths) => paths
                .iter()
                .filter_map(|p| p.file_name()?.to_str().map(String::from))
                .collect(),
            Err(e) => {
                warn!(report = id, error = %format!("{e:#}"), "Figures not rendered");
                Vec::new()
            }
        };

        Ok(Report {
            id: id.to_string(),
            generated_at: Utc::now(),
            outcome,
            cleaned_csv: Bytes::from(artifacts.cleaned_csv),
            summary_xlsx: Bytes::from(artifacts.summary_xlsx),
            figures_dir,
            figures,
        })
    }

    /// Deletes the report's rendered figures from disk.
    fn remove_figures(&self) {
        match std::fs::remove_dir_all(&self.figures_dir) {
            Ok(()) => debug!(report = %self.id, dir = %self.figures_dir.display(), "Removed figures"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(report = %self.id, error = %e, "Failed to remove figures"),
        }
    }
}

/// Shared server state: the config and the report cache.
///
/// The cache lock is only held for lookups and inserts. Uploads are processed
/// outside it, so downloads and other uploads never wait behind a build.
pub struct DashboardState {
    config: PipelineConfig,
    cache: Mutex<PipelineCache<Report>>,
}

impl DashboardState {
    pub fn new(config: PipelineConfig) -> Self {
        let cache = PipelineCache::new(config.dashboard.cache_entries);
        DashboardState {
            config,
            cache: Mutex::new(cache),
        }
    }

    fn cache(&self) -> MutexGuard<'_, PipelineCache<Report>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn report(&self, id: &str) -> Option<Arc<Report>> {
        self.cache().get(id)
    }

    /// Returns the cached report for `bytes`, processing them on a miss.
    pub fn report_for(&self, bytes: &[u8]) -> Result<Arc<Report>, PipelineError> {
        self.report_or_build(bytes, |id| Report::build(id, bytes, &self.config))
    }

    fn report_or_build<F>(&self, bytes: &[u8], build: F) -> Result<Arc<Report>, PipelineError>
    where
        F: FnOnce(&str) -> Result<Report, PipelineError>,
    {
        let id = content_key(bytes);
        if let Some(hit) = self.report(&id) {
            debug!(report = %id, "Cache hit");
            return Ok(hit);
        }

        let report = build(&id)?;
        let (report, evicted) = self.cache().insert(id, report);
        for (_, old) in evicted {
            old.remove_figures();
        }
        Ok(report)
    }
}

#[derive(Serialize)]
struct TableView {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl TableView {
    fn new(table: &SummaryTable, decimals: u32) -> Self {
        let columns = table
            .key_headers()
            .into_iter()
            .chain(METRIC_HEADERS)
            .map(String::from)
            .collect();

        let rows = table
            .rows
            .iter()
            .map(|row| {
                row.key
                    .iter()
                    .map(|k| Value::from(k.as_str()))
                    .chain(metric_cells(row, decimals).into_iter().map(Value::from))
                    .collect()
            })
            .collect();

        TableView {
            name: table.name(),
            columns,
            rows,
        }
    }
}

#[derive(Serialize)]
struct ReportView<'a> {
    id: &'a str,
    generated_at: DateTime<Utc>,
    tracks: &'a [String],
    kpis: &'a Kpis,
    cleaning: &'a CleaningReport,
    tables: Vec<TableView>,
    preview: &'a [StudentRecord],
    figures: &'a [String],
    downloads: Value,
}

impl<'a> ReportView<'a> {
    fn new(report: &'a Report, decimals: u32) -> Self {
        let outcome = &report.outcome;
        let preview_len = outcome.records.len().min(PREVIEW_ROWS);
        ReportView {
            id: &report.id,
            generated_at: report.generated_at,
            tracks: &outcome.tracks,
            kpis: &outcome.kpis,
            cleaning: &outcome.report,
            tables: outcome
                .tables
                .iter()
                .map(|t| TableView::new(t, decimals))
                .collect(),
            preview: &outcome.records[..preview_len],
            figures: &report.figures,
            downloads: json!({
                "cleaned_csv": format!("/api/reports/{}/cleaned.csv", report.id),
                "summary_xlsx": format!("/api/reports/{}/summary.xlsx", report.id),
            }),
        }
    }
}

fn not_found(id: &str) -> HttpResponse {
    HttpResponse::NotFound().json(json!({ "error": format!("unknown report '{id}'") }))
}

#[get("/")]
async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

/// Body: the raw bytes of an xlsx workbook.
#[post("/api/reports")]
async fn create_report(state: web::Data<DashboardState>, body: web::Bytes) -> HttpResponse {
    if body.is_empty() {
        return HttpResponse::BadRequest().json(json!({ "error": "empty upload" }));
    }

    let worker_state = state.clone();
    let result = web::block(move || {
        worker_state
            .report_for(&body)
            .map_err(|e| e.to_string())
    })
    .await;

    match result {
        Ok(Ok(report)) => {
            info!(report = %report.id, students = report.outcome.kpis.total_students, "Report served");
            HttpResponse::Ok().json(ReportView::new(&report, state.config.summary_decimals))
        }
        Ok(Err(message)) => {
            warn!(error = %message, "Upload rejected");
            HttpResponse::UnprocessableEntity().json(json!({ "error": message }))
        }
        Err(e) => {
            error!(error = %e, "Report worker failed");
            HttpResponse::InternalServerError().json(json!({ "error": "report worker failed" }))
        }
    }
}

#[get("/api/reports/{id}")]
async fn get_report(state: web::Data<DashboardState>, path: web::Path<String>) -> HttpResponse {
    let id = path.into_inner();
    match state.report(&id) {
        Some(report) => {
            HttpResponse::Ok().json(ReportView::new(&report, state.config.summary_decimals))
        }
        None => not_found(&id),
    }
}

#[get("/api/reports/{id}/cleaned.csv")]
async fn download_cleaned(state: web::Data<DashboardState>, path: web::Path<String>) -> HttpResponse {
    let id = path.into_inner();
    match state.report(&id) {
        Some(report) => HttpResponse::Ok()
            .content_type("text/csv")
            .insert_header((
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", state.config.cleaned_file),
            ))
            .body(report.cleaned_csv.clone()),
        None => not_found(&id),
    }
}

#[get("/api/reports/{id}/summary.xlsx")]
async fn download_summary(state: web::Data<DashboardState>, path: web::Path<String>) -> HttpResponse {
    let id = path.into_inner();
    match state.report(&id) {
        Some(report) => HttpResponse::Ok()
            .content_type("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")
            .insert_header((
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", state.config.summary_file),
            ))
            .body(report.summary_xlsx.clone()),
        None => not_found(&id),
    }
}

#[get("/api/reports/{id}/figures/{name}")]
async fn figure(state: web::Data<DashboardState>, path: web::Path<(String, String)>) -> HttpResponse {
    let (id, name) = path.into_inner();
    let Some(report) = state.report(&id) else {
        return not_found(&id);
    };
    // Only names the report rendered itself, never arbitrary paths.
    if !report.figures.contains(&name) {
        return HttpResponse::NotFound().json(json!({ "error": format!("unknown figure '{name}'") }));
    }

    match tokio::fs::read(report.figures_dir.join(&name)).await {
        Ok(png) => HttpResponse::Ok().content_type("image/png").body(png),
        Err(e) => {
            error!(report = %id, figure = %name, error = %e, "Failed to read figure");
            HttpResponse::InternalServerError().json(json!({ "error": "figure unavailable" }))
        }
    }
}

/// Registers the dashboard routes.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(create_report)
        .service(get_report)
        .service(download_cleaned)
        .service(download_summary)
        .service(figure);
}

/// Serves the dashboard on `127.0.0.1:<port>` until the process is stopped.
pub async fn serve(config: PipelineConfig, port: u16) -> std::io::Result<()> {
    let upload_limit = config.dashboard.max_upload_bytes;
    let state = web::Data::new(DashboardState::new(config));

    info!(url = %format!("http://127.0.0.1:{port}"), "Dashboard listening");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(web::PayloadConfig::new(upload_limit))
            .configure(routes)
    })
    .bind(("127.0.0.1", port))?
    .run()
    .await
}
