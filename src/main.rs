// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{debug, info, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};

use exgen::app_config::{self, Config};
use exgen::app_controller::Controller;
use exgen::file_utils::FileManager;
use exgen::BatchReport;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate exercises for the configured batch of tutorials (default command)
    Batch,

    /// Generate exercises for specific documents or directories
    Generate {
        /// R Markdown files or directories containing them
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,
    },

    /// Generate shell completions for exgen
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// exgen - Exercise generator for R Markdown tutorials
///
/// Produces "fill-in-the-blank" versions of tutorials: chunks flagged
/// `live = TRUE` keep their comments but lose their code.
#[derive(Parser, Debug)]
#[command(name = "exgen")]
#[command(version)]
#[command(about = "Generate exercise versions of R Markdown tutorials")]
#[command(long_about = "exgen renders each tutorial once to make sure it runs, then writes a
<name>-live.Rmd copy in which every chunk flagged `live = TRUE` keeps only its comments.

EXAMPLES:
    exgen                                       # Process the configured batch
    exgen generate DE_analysis/03_DESeq2_model.Rmd
    exgen generate --skip-render lessons/      # Every .Rmd under lessons/, no render
    exgen --fail-fast -j 1                      # Stop at the first failing tutorial
    exgen completions bash > exgen.bash        # Generate bash completions

CONFIGURATION:
    Configuration is read from exgen.json by default. You can specify a different
    file with --config-path. When the file does not exist the built-in defaults
    are used.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Project root used to resolve batch documents (default: nearest directory with .git)
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "exgen.json")]
    config_path: String,

    /// Skip the validation render
    #[arg(long, global = true)]
    skip_render: bool,

    /// Stop after the first failing document
    #[arg(long, global = true)]
    fail_fast: bool,

    /// Number of documents processed at once
    #[arg(short, long, global = true)]
    jobs: Option<usize>,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour and tag for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "ERROR"),
            Level::Warn => ("\x1B[1;33m", "WARN "),
            Level::Info => ("\x1B[1;32m", "INFO "),
            Level::Debug => ("\x1B[1;36m", "DEBUG"),
            Level::Trace => ("\x1B[1;35m", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        // The level filter is adjusted at runtime through log::set_max_level
        metadata.level() <= self.level.max(log::max_level())
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (colour, tag) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", colour, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // The level is updated after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "exgen", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli)?;
    log::set_max_level(config.log_level.to_level_filter());

    let root = resolve_root(cli.root.as_deref(), &config)?;
    info!("Project root: {}", root.display());

    let controller = Controller::with_config(config, root)?;

    let report = match cli.command {
        Some(Commands::Generate { paths }) => controller.run_paths(&paths).await?,
        Some(Commands::Batch) | None => controller.run_batch().await?,
        Some(Commands::Completions { .. }) => return Ok(()),
    };

    finish(&report)
}

/// Load the configuration file if present and apply command line overrides
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let config_path = Path::new(&cli.config_path);
    let mut config = if config_path.exists() {
        Config::from_file(config_path)?
    } else {
        debug!("Config file not found at '{}', using defaults.", cli.config_path);
        Config::default()
    };

    if cli.skip_render {
        config.render.enabled = false;
    }

    if cli.fail_fast {
        config.batch.fail_fast = true;
    }

    if let Some(jobs) = cli.jobs {
        config.batch.jobs = jobs;
    }

    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }

    Ok(config)
}

/// Explicit root, configured root, nearest `.git` ancestor, then the working directory
fn resolve_root(cli_root: Option<&Path>, config: &Config) -> Result<PathBuf> {
    if let Some(root) = cli_root.or(config.project_root.as_deref()) {
        return Ok(std::path::absolute(root)?);
    }

    let current_dir = std::env::current_dir()?;
    Ok(FileManager::find_project_root(&current_dir).unwrap_or(current_dir))
}

fn finish(report: &BatchReport) -> Result<()> {
    if report.is_success() {
        return Ok(());
    }

    Err(anyhow!(
        "{} document(s) failed, {} skipped",
        report.failed_count(),
        report.skipped_count()
    ))
}
