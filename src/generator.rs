/*!
 * Exercise generation.
 *
 * `Generator` ties the pieces together for one document (validate, parse,
 * transform, write) and runs batches of documents with bounded concurrency.
 * The project root is passed in explicitly; relative document paths are
 * resolved against it and nothing here looks for the root on its own.
 */

use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::app_config::Config;
use crate::document::Document;
use crate::errors::GenerateError;
use crate::exercise::ExerciseTransformer;
use crate::file_utils::FileManager;
use crate::render::Renderer;

/// What to do with the rest of a batch once a document fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the failure and keep processing the remaining documents
    #[default]
    Continue,
    /// Stop scheduling new documents after the first failure
    FailFast,
}

/// Batch run settings
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Maximum number of documents in flight
    pub jobs: usize,
    pub policy: FailurePolicy,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            jobs: 4,
            policy: FailurePolicy::Continue,
        }
    }
}

impl BatchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            jobs: config.batch.jobs.max(1),
            policy: if config.batch.fail_fast {
                FailurePolicy::FailFast
            } else {
                FailurePolicy::Continue
            },
        }
    }
}

/// Result for one document of a batch
#[derive(Debug)]
pub enum DocumentOutcome {
    /// Exercise written to the given path
    Generated(PathBuf),
    /// Generation failed
    Failed(GenerateError),
    /// Not attempted because an earlier document failed under fail-fast
    Skipped,
}

/// Per-document results of a batch run, in input order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<(PathBuf, DocumentOutcome)>,
}

impl BatchReport {
    pub fn generated_count(&self) -> usize {
        self.count(|outcome| matches!(outcome, DocumentOutcome::Generated(_)))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|outcome| matches!(outcome, DocumentOutcome::Failed(_)))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|outcome| matches!(outcome, DocumentOutcome::Skipped))
    }

    /// Failures with the source they belong to
    pub fn failures(&self) -> impl Iterator<Item = (&PathBuf, &GenerateError)> {
        self.outcomes.iter().filter_map(|(source, outcome)| match outcome {
            DocumentOutcome::Failed(error) => Some((source, error)),
            _ => None,
        })
    }

    pub fn is_success(&self) -> bool {
        self.failed_count() == 0 && self.skipped_count() == 0
    }

    fn count(&self, predicate: impl Fn(&DocumentOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, outcome)| predicate(outcome)).count()
    }
}

/// Generates exercise documents from authored tutorials
#[derive(Clone)]
pub struct Generator {
    /// Project root used to resolve relative paths
    root: PathBuf,

    /// Marker inserted before the output extension
    output_suffix: String,

    transformer: ExerciseTransformer,

    renderer: Arc<dyn Renderer>,

    /// Whether `generate` validates by rendering first
    render_enabled: bool,
}

impl Generator {
    /// Create a generator rooted at `root`
    pub fn new<P: Into<PathBuf>>(root: P, transformer: ExerciseTransformer, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            root: root.into(),
            output_suffix: "-live".to_string(),
            transformer,
            renderer,
            render_enabled: true,
        }
    }

    /// Create a generator from the application configuration
    pub fn from_config<P: Into<PathBuf>>(root: P, config: &Config, renderer: Arc<dyn Renderer>) -> Self {
        Self::new(root, ExerciseTransformer::from_config(config), renderer)
            .with_output_suffix(&config.output_suffix)
            .with_render(config.render.enabled)
    }

    pub fn with_output_suffix(mut self, suffix: &str) -> Self {
        self.output_suffix = suffix.to_string();
        self
    }

    /// Enable or disable the validation render inside `generate`
    pub fn with_render(mut self, enabled: bool) -> Self {
        self.render_enabled = enabled;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn render_enabled(&self) -> bool {
        self.render_enabled
    }

    /// Resolve a document path against the project root
    pub fn resolve<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Path the exercise for `source` is written to
    pub fn output_path<P: AsRef<Path>>(&self, source: P) -> PathBuf {
        FileManager::generate_output_path(self.resolve(source), &self.output_suffix)
    }

    /// Render the document once to prove it executes
    pub async fn validate<P: AsRef<Path>>(&self, source: P) -> Result<(), GenerateError> {
        let source = self.resolve(source);
        self.renderer
            .render(&source)
            .await
            .map_err(|e| GenerateError::Render { path: source, source: e })
    }

    /// Read and parse a document
    pub fn parse<P: AsRef<Path>>(&self, source: P) -> Result<Document, GenerateError> {
        let source = self.resolve(source);
        let content = FileManager::read_to_string(&source).map_err(|e| GenerateError::Io {
            path: source.clone(),
            source: e,
        })?;

        Document::parse(&content)
            .map(|document| document.with_source_file(&source))
            .map_err(|e| GenerateError::Parse { path: source, source: e })
    }

    /// Produce the exercise version of a parsed document
    pub fn transform(&self, document: &Document) -> Result<Document, GenerateError> {
        self.transformer
            .transform(document)
            .map_err(|e| GenerateError::Parse {
                path: document.source_file.clone(),
                source: e,
            })
    }

    /// Generate the exercise for one document and return where it was written
    pub async fn generate<P: AsRef<Path>>(&self, source: P) -> Result<PathBuf, GenerateError> {
        let source = self.resolve(source);
        if FileManager::is_generated(&source, &self.output_suffix) {
            return Err(GenerateError::AlreadyExercise(source));
        }

        if self.render_enabled {
            self.validate(&source).await?;
        }

        let document = self.parse(&source)?;
        let exercise = self.transform(&document)?;

        let output_path = FileManager::generate_output_path(&source, &self.output_suffix);
        FileManager::write_atomic(&output_path, &exercise.to_string()).map_err(|e| GenerateError::Io {
            path: output_path.clone(),
            source: e,
        })?;

        info!("Success: {}", output_path.display());
        Ok(output_path)
    }

    /// Check that every required package is installed, installing if asked
    ///
    /// Fails with `RendererUnavailable` when the check itself cannot run,
    /// `InstallFailed` when installation errors, and `DependencyMissing` when
    /// packages are still missing afterwards.
    pub async fn preflight(&self, packages: &[String], install_missing: bool) -> Result<(), GenerateError> {
        let mut missing = self.check_packages(packages).await?;

        if !missing.is_empty() && install_missing {
            warn!("Missing packages: {}", missing.join(", "));
            if let Err(e) = self.renderer.install_packages(&missing).await {
                error!("Installing {} failed: {}", missing.join(", "), e);
                return Err(GenerateError::InstallFailed {
                    packages: missing,
                    source: e,
                });
            }
            missing = self.check_packages(packages).await?;
        }

        if missing.is_empty() {
            debug!("All required packages are installed");
            Ok(())
        } else {
            Err(GenerateError::DependencyMissing(missing))
        }
    }

    async fn check_packages(&self, packages: &[String]) -> Result<Vec<String>, GenerateError> {
        self.renderer
            .missing_packages(packages)
            .await
            .map_err(GenerateError::RendererUnavailable)
    }

    /// Generate exercises for many documents
    ///
    /// Documents run concurrently up to `options.jobs`; the report lists them
    /// in input order. Under `FailFast`, documents not yet started when a
    /// failure is seen are reported as skipped.
    pub async fn generate_batch(
        &self,
        sources: &[PathBuf],
        options: &BatchOptions,
        progress_callback: impl Fn(usize, usize) + Clone + Send + 'static,
    ) -> BatchReport {
        let total = sources.len();
        let processed = Arc::new(AtomicUsize::new(0));
        let stop = Arc::new(AtomicBool::new(false));

        let mut results = stream::iter(sources.iter().cloned().enumerate())
            .map(|(index, source)| {
                let processed = processed.clone();
                let stop = stop.clone();
                let progress_callback = progress_callback.clone();
                let policy = options.policy;

                async move {
                    let outcome = if stop.load(Ordering::SeqCst) {
                        DocumentOutcome::Skipped
                    } else {
                        match self.generate(&source).await {
                            Ok(output) => DocumentOutcome::Generated(output),
                            Err(e) => {
                                error!("Error processing file {}: {}", source.display(), e);
                                if policy == FailurePolicy::FailFast {
                                    stop.store(true, Ordering::SeqCst);
                                }
                                DocumentOutcome::Failed(e)
                            }
                        }
                    };

                    let current = processed.fetch_add(1, Ordering::SeqCst) + 1;
                    progress_callback(current, total);

                    (index, source, outcome)
                }
            })
            .buffer_unordered(options.jobs.max(1))
            .collect::<Vec<_>>()
            .await;

        // Sort results by index to maintain input order
        results.sort_by_key(|(index, _, _)| *index);

        BatchReport {
            outcomes: results
                .into_iter()
                .map(|(_, source, outcome)| (source, outcome))
                .collect(),
        }
    }
}
