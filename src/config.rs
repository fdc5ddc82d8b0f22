use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::record::{Categorical, Score};
use crate::summary::types::{Dimension, GroupBy};

/// Environment variable naming the JSON config file.
pub const CONFIG_ENV: &str = "STUDENT_REPORT_CONFIG";

/// Config file looked up in the working directory when [`CONFIG_ENV`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "student_report.json";

/// Settings for a pipeline run. Every field has a default, so a config file
/// only needs the keys it overrides:
///
/// ```json
/// {
///   "input_path": "grades.xlsx",
///   "tokens": { "missing": ["NA", "-", "absent"] },
///   "histogram_subjects": ["English", "Science"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub cleaned_file: String,
    pub summary_file: String,
    pub figures_dir: PathBuf,
    pub tokens: TokenConfig,
    pub impute_categorical: Vec<Categorical>,
    pub drop_duplicates: bool,
    pub dimensions: Vec<GroupBy>,
    pub histogram_subjects: Vec<Score>,
    pub summary_decimals: u32,
    pub dashboard: DashboardConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            input_path: PathBuf::from("student_grades_2027-2028.xlsx"),
            output_dir: PathBuf::from("outputs"),
            cleaned_file: "cleaned_dataset.csv".to_string(),
            summary_file: "summary_report.xlsx".to_string(),
            figures_dir: PathBuf::from("outputs/figures"),
            tokens: TokenConfig::default(),
            impute_categorical: Categorical::ALL.to_vec(),
            drop_duplicates: true,
            dimensions: vec![
                GroupBy::new(vec![Dimension::Track]),
                GroupBy::new(vec![Dimension::Cohort]),
                GroupBy::new(vec![Dimension::Income]),
                GroupBy::new(vec![Dimension::Track, Dimension::Cohort]),
                GroupBy::new(vec![Dimension::Track, Dimension::Income]),
            ],
            histogram_subjects: vec![Score::History, Score::Math],
            summary_decimals: 1,
            dashboard: DashboardConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: PipelineConfig = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config
            .checked()
            .with_context(|| format!("invalid config {}", path.display()))
    }

    /// Rejects empty groupings and drops repeated ones, keeping the first.
    ///
    /// Each grouping becomes one summary sheet, so its name must be non-empty
    /// and unique.
    pub fn checked(mut self) -> Result<Self> {
        if self.dimensions.iter().any(|g| g.dimensions().is_empty()) {
            bail!("dimensions contains an empty grouping");
        }

        let before = self.dimensions.len();
        let mut seen = Vec::with_capacity(before);
        self.dimensions.retain(|g| {
            let name = g.name();
            let fresh = !seen.contains(&name);
            if fresh {
                seen.push(name);
            }
            fresh
        });
        if self.dimensions.len() < before {
            warn!(
                removed = before - self.dimensions.len(),
                "Ignoring repeated groupings in dimensions"
            );
        }

        Ok(self)
    }

    /// Resolves the config from [`CONFIG_ENV`], then [`DEFAULT_CONFIG_FILE`], then defaults.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            info!(path = %path, "Loading config from {}", CONFIG_ENV);
            return Self::load(path);
        }

        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            info!(path = DEFAULT_CONFIG_FILE, "Loading config");
            return Self::load(DEFAULT_CONFIG_FILE);
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn cleaned_path(&self) -> PathBuf {
        self.output_dir.join(&self.cleaned_file)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output_dir.join(&self.summary_file)
    }
}

/// Spellings recognized by the normalizer. Matching ignores case and surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub missing: Vec<String>,
    pub truthy: Vec<String>,
    pub falsy: Vec<String>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        let owned = |tokens: &[&str]| tokens.iter().map(|t| t.to_string()).collect();
        TokenConfig {
            missing: owned(&["", "NA", "N/A", "NaN", "-", "None", "null", "Waived"]),
            truthy: owned(&["Y", "Yes", "True", "1", "1.0"]),
            falsy: owned(&["N", "No", "False", "0", "0.0"]),
        }
    }
}

/// Settings for the `serve` subcommand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub port: u16,
    pub cache_entries: usize,
    pub max_upload_bytes: usize,
    /// Per-upload figures are rendered under `<reports_dir>/<report id>/`.
    pub reports_dir: PathBuf,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            port: 8501,
            cache_entries: 16,
            max_upload_bytes: 20 * 1024 * 1024,
            reports_dir: PathBuf::from("outputs/reports"),
        }
    }
}
