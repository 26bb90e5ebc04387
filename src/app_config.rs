use anyhow::{anyhow, Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Project root; relative document paths resolve against it
    #[serde(default)]
    pub project_root: Option<PathBuf>,

    /// Marker inserted before the extension of generated files
    #[serde(default = "default_output_suffix")]
    pub output_suffix: String,

    /// Name of the chunk option that flags exercise chunks
    #[serde(default = "default_live_option")]
    pub live_option: String,

    /// Extensions picked up when a directory is given as input
    #[serde(default = "default_document_extensions")]
    pub document_extensions: Vec<String>,

    /// Single-line comment marker per chunk language
    #[serde(default = "default_comment_markers")]
    pub comment_markers: BTreeMap<String, String>,

    /// Validation render settings
    #[serde(default)]
    pub render: RenderConfig,

    /// Batch processing settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Documents processed by a plain batch run, grouped by project area
    #[serde(default = "default_batches")]
    pub batches: Vec<BatchGroup>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Settings for the external validation render
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RenderConfig {
    /// Render each document before generating its exercise
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// R front end used to render documents
    #[serde(default = "default_render_command")]
    pub command: String,

    /// Render timeout in seconds
    #[serde(default = "default_render_timeout_secs")]
    pub timeout_secs: u64,

    /// R packages that must be installed before rendering
    #[serde(default = "default_required_packages")]
    pub required_packages: Vec<String>,

    /// Install missing packages during the pre-flight check
    #[serde(default)]
    pub install_missing: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: default_render_command(),
            timeout_secs: default_render_timeout_secs(),
            required_packages: default_required_packages(),
            install_missing: false,
        }
    }
}

/// Settings for batch runs
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BatchConfig {
    /// Maximum number of documents processed at once
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Stop scheduling documents after the first failure
    #[serde(default)]
    pub fail_fast: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            fail_fast: false,
        }
    }
}

/// A project area and the tutorial documents that belong to it
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BatchGroup {
    /// Project area name, used in log output
    pub area: String,

    /// Document paths, relative to the project root
    pub documents: Vec<PathBuf>,
}

impl BatchGroup {
    pub fn new(area: &str, documents: &[&str]) -> Self {
        Self {
            area: area.to_string(),
            documents: documents.iter().map(PathBuf::from).collect(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    // @returns: Matching filter for the log facade
    pub fn to_level_filter(&self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

fn default_output_suffix() -> String {
    "-live".to_string()
}

fn default_live_option() -> String {
    "live".to_string()
}

fn default_document_extensions() -> Vec<String> {
    vec!["Rmd".to_string(), "rmd".to_string()]
}

fn default_comment_markers() -> BTreeMap<String, String> {
    [
        ("r", "#"),
        ("python", "#"),
        ("bash", "#"),
        ("sh", "#"),
        ("sql", "--"),
        ("rcpp", "//"),
        ("stan", "//"),
    ]
    .into_iter()
    .map(|(language, marker)| (language.to_string(), marker.to_string()))
    .collect()
}

fn default_true() -> bool {
    true
}

fn default_render_command() -> String {
    "Rscript".to_string()
}

fn default_render_timeout_secs() -> u64 {
    600 // DESeq2 tutorials fit models on full count matrices
}

fn default_required_packages() -> Vec<String> {
    vec!["rmarkdown".to_string(), "DESeq2".to_string()]
}

fn default_jobs() -> usize {
    4
}

fn default_batches() -> Vec<BatchGroup> {
    vec![
        BatchGroup::new(
            "differential-expression",
            &[
                "DE_analysis/01_import_counts.Rmd",
                "DE_analysis/02_normalisation_and_qc.Rmd",
                "DE_analysis/03_DESeq2_model.Rmd",
                "DE_analysis/04_results_and_visualisation.Rmd",
            ],
        ),
        BatchGroup::new(
            "exploratory-analysis",
            &[
                "exploratory/01_vst_and_pca.Rmd",
                "exploratory/02_sample_clustering.Rmd",
            ],
        ),
    ]
}

impl Config {
    /// Load a configuration file, falling back to defaults for missing fields
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;

        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.output_suffix.is_empty() {
            return Err(anyhow!("Output suffix must not be empty"));
        }

        if self.live_option.trim().is_empty() {
            return Err(anyhow!("Live option name must not be empty"));
        }

        if let Some((language, _)) = self
            .comment_markers
            .iter()
            .find(|(_, marker)| marker.trim().is_empty())
        {
            return Err(anyhow!("Empty comment marker for language '{}'", language));
        }

        if self.batch.jobs == 0 {
            return Err(anyhow!("Batch jobs must be at least 1"));
        }

        if self.render.enabled && self.render.command.trim().is_empty() {
            return Err(anyhow!("Render command is required when rendering is enabled"));
        }

        Ok(())
    }

    /// Every configured batch document, in area order
    pub fn batch_documents(&self) -> Vec<PathBuf> {
        self.batches
            .iter()
            .flat_map(|group| group.documents.iter().cloned())
            .collect()
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            project_root: None,
            output_suffix: default_output_suffix(),
            live_option: default_live_option(),
            document_extensions: default_document_extensions(),
            comment_markers: default_comment_markers(),
            render: RenderConfig::default(),
            batch: BatchConfig::default(),
            batches: default_batches(),
            log_level: LogLevel::default(),
        }
    }
}
