/*!
 * Validation rendering through R.
 *
 * Before an exercise is generated, the authored tutorial is rendered once so
 * that a tutorial whose own code fails never produces an exercise. The actual
 * rendering is done by `rmarkdown` through `Rscript`; this module only drives
 * the process, enforces a timeout and reports failures.
 */

use async_trait::async_trait;
use log::{debug, info, warn};
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

use crate::app_config::RenderConfig;
use crate::errors::RenderError;

/// Something that can render a document to prove it executes
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render the document, discarding the rendered output
    async fn render(&self, path: &Path) -> Result<(), RenderError>;

    /// Which of `packages` are not installed
    async fn missing_packages(&self, packages: &[String]) -> Result<Vec<String>, RenderError>;

    /// Install the given packages
    async fn install_packages(&self, packages: &[String]) -> Result<(), RenderError>;
}

/// Renders with `Rscript -e "rmarkdown::render(...)"`
#[derive(Debug, Clone)]
pub struct RscriptRenderer {
    command: String,
    timeout: Duration,
}

impl RscriptRenderer {
    pub fn new(command: &str, timeout_secs: u64) -> Self {
        Self {
            command: command.to_string(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(&config.command, config.timeout_secs)
    }

    /// Run an R expression with the configured timeout
    async fn run_expression(&self, expression: &str) -> Result<Output, RenderError> {
        let future = Command::new(&self.command)
            .args(["--vanilla", "-e", expression])
            .kill_on_drop(true)
            .output();

        let output = tokio::select! {
            result = future => {
                result.map_err(|e| RenderError::Spawn(format!("{}: {}", self.command, e)))?
            },
            _ = tokio::time::sleep(self.timeout) => {
                return Err(RenderError::TimedOut(self.timeout.as_secs()));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RenderError::Failed {
                status: output.status.code(),
                stderr: filter_render_stderr(&stderr),
            });
        }

        Ok(output)
    }
}

#[async_trait]
impl Renderer for RscriptRenderer {
    async fn render(&self, path: &Path) -> Result<(), RenderError> {
        // Rendered HTML and intermediates go to a scratch directory
        let scratch = tempfile::tempdir()
            .map_err(|e| RenderError::Spawn(format!("failed to create scratch directory: {}", e)))?;
        let scratch_path = scratch.path().to_string_lossy().to_string();

        let expression = format!(
            "rmarkdown::render(input = {}, output_dir = {}, intermediates_dir = {}, quiet = TRUE, envir = new.env())",
            r_string_literal(&path.to_string_lossy()),
            r_string_literal(&scratch_path),
            r_string_literal(&scratch_path),
        );

        debug!("Rendering {:?}", path);
        self.run_expression(&expression).await?;
        Ok(())
    }

    async fn missing_packages(&self, packages: &[String]) -> Result<Vec<String>, RenderError> {
        if packages.is_empty() {
            return Ok(Vec::new());
        }

        let expression = format!(
            "pkgs <- {}; missing <- pkgs[!vapply(pkgs, requireNamespace, logical(1), quietly = TRUE)]; cat(missing, sep = '\\n')",
            r_character_vector(packages)
        );

        let output = self.run_expression(&expression).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn install_packages(&self, packages: &[String]) -> Result<(), RenderError> {
        if packages.is_empty() {
            return Ok(());
        }

        info!("Installing R packages: {}", packages.join(", "));
        let expression = format!(
            "if (!requireNamespace('BiocManager', quietly = TRUE)) install.packages('BiocManager', repos = 'https://cloud.r-project.org'); BiocManager::install({}, ask = FALSE, update = FALSE)",
            r_character_vector(packages)
        );

        if let Err(e) = self.run_expression(&expression).await {
            warn!("Package installation failed: {}", e);
            return Err(e);
        }
        Ok(())
    }
}

/// Quote a string as an R single-quoted literal
pub fn r_string_literal(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

fn r_character_vector(values: &[String]) -> String {
    let items: Vec<String> = values.iter().map(|v| r_string_literal(v)).collect();
    format!("c({})", items.join(", "))
}

/// Filter renderer stderr to the lines that explain a failure, dropping knitr
/// progress output.
fn filter_render_stderr(stderr: &str) -> String {
    let noise_prefixes = [
        "processing file:",
        "output file:",
        "label:",
        "|",
        "ordinary text without R code",
        "/usr/lib/rstudio",
        "/usr/bin/pandoc",
    ];

    let meaningful: Vec<&str> = stderr
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                return false;
            }
            !noise_prefixes.iter().any(|p| trimmed.starts_with(p))
        })
        .collect();

    if meaningful.is_empty() {
        "unknown render error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}
