use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app_config::Config;
use crate::file_utils::FileManager;
use crate::generator::{BatchOptions, BatchReport, Generator};
use crate::render::{Renderer, RscriptRenderer};

// @module: Application controller for exercise generation

// @const: Issues log written to the project root after failed runs
const ISSUES_LOG_FILE: &str = "exgen.issues.log";

/// Main application controller for exercise generation
pub struct Controller {
    // @field: App configuration
    pub config: Config,

    // @field: Explicit project root
    root: PathBuf,

    // @field: Validation renderer
    renderer: Arc<dyn Renderer>,
}

impl Controller {
    // @method: Create a new controller with the given configuration and project root
    pub fn with_config<P: Into<PathBuf>>(config: Config, root: P) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        let renderer = Arc::new(RscriptRenderer::from_config(&config.render));

        Ok(Self {
            config,
            root: root.into(),
            renderer,
        })
    }

    /// Replace the renderer used for validation and pre-flight checks
    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Build the generator for this run
    pub fn generator(&self) -> Generator {
        Generator::from_config(self.root.clone(), &self.config, self.renderer.clone())
    }

    /// Run the configured batch of documents
    pub async fn run_batch(&self) -> Result<BatchReport> {
        for group in &self.config.batches {
            info!("{}: {} document(s)", group.area, group.documents.len());
        }

        let sources = self.config.batch_documents();
        if sources.is_empty() {
            return Err(anyhow!("No documents configured for batch processing"));
        }

        self.process(sources).await
    }

    /// Run on explicit files or directories
    pub async fn run_paths(&self, inputs: &[PathBuf]) -> Result<BatchReport> {
        let sources = self.collect_sources(inputs)?;
        if sources.is_empty() {
            return Err(anyhow!("No documents found in the given paths"));
        }

        self.process(sources).await
    }

    /// Expand directories into the documents they contain
    ///
    /// Command-line paths are relative to the working directory, so they are
    /// made absolute before the generator resolves anything against the root.
    pub fn collect_sources(&self, inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut sources = Vec::new();

        for input in inputs {
            let input = std::path::absolute(input)
                .with_context(|| format!("Failed to resolve input path: {:?}", input))?;

            if FileManager::dir_exists(&input) {
                let mut found = FileManager::find_documents(
                    &input,
                    &self.config.document_extensions,
                    &self.config.output_suffix,
                )?;
                sources.append(&mut found);
            } else if FileManager::file_exists(&input) {
                sources.push(input);
            } else {
                return Err(anyhow!("Input path does not exist: {:?}", input));
            }
        }

        Ok(sources)
    }

    async fn process(&self, sources: Vec<PathBuf>) -> Result<BatchReport> {
        let start_time = std::time::Instant::now();
        let generator = self.generator();

        if generator.render_enabled() {
            generator
                .preflight(&self.config.render.required_packages, self.config.render.install_missing)
                .await
                .context("Pre-flight dependency check failed")?;
        } else {
            warn!("Validation render disabled, documents are not executed before generation");
        }

        // Create a progress bar for document tracking
        let progress_bar = ProgressBar::new(sources.len() as u64);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("=>-"));
        progress_bar.set_message("Generating exercises");

        let callback_bar = progress_bar.clone();
        let report = generator
            .generate_batch(&sources, &BatchOptions::from_config(&self.config), move |current, _total| {
                callback_bar.set_position(current as u64);
            })
            .await;

        progress_bar.finish_with_message("Done");

        let summary_message = format!(
            "Exercise generation completed: {} generated, {} failed, {} skipped",
            report.generated_count(),
            report.failed_count(),
            report.skipped_count()
        );
        info!("{} in {}", summary_message, Self::format_duration(start_time.elapsed()));

        if report.failed_count() > 0 {
            self.write_issues_log(&report, &summary_message);
        }

        Ok(report)
    }

    fn write_issues_log(&self, report: &BatchReport, summary_message: &str) {
        let log_file_path = self.root.join(ISSUES_LOG_FILE);
        let mut lines = vec![summary_message.to_string()];
        lines.extend(
            report
                .failures()
                .map(|(source, error)| format!("  {}: {}", source.display(), error)),
        );

        if let Err(e) = FileManager::append_to_log_file(&log_file_path, &lines.join("\n")) {
            warn!("Failed to write issues log: {}", e);
        } else {
            info!("Issues written to {}", log_file_path.display());
        }
    }

    // Format duration in a human-readable format
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;

        if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
