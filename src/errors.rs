/*!
 * Error types for the exgen application.
 *
 * This module contains custom error types for the different stages of exercise
 * generation, using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while splitting a document into segments or transforming a chunk
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A code fence was opened but never closed
    #[error("Unterminated code fence opened at line {line}")]
    UnterminatedFence {
        /// 1-based line of the opening fence
        line: usize,
    },

    /// The opening fence line could not be read as a chunk header
    #[error("Malformed chunk header at line {line}: {reason}")]
    MalformedHeader {
        /// 1-based line of the opening fence
        line: usize,
        /// What was wrong with the header
        reason: String,
    },

    /// The option list inside a chunk header is not well-formed
    #[error("Malformed chunk options at line {line}: {reason}")]
    MalformedOptions {
        line: usize,
        reason: String,
    },

    /// The live option carries a value that is not a boolean
    #[error("Invalid value for option '{option}' at line {line}: {value}")]
    InvalidFlag {
        line: usize,
        option: String,
        value: String,
    },

    /// A live chunk uses a language with no configured comment marker
    #[error("No comment marker configured for language '{language}' (chunk {segment} at line {line})")]
    UnknownLanguage {
        line: usize,
        /// Index of the chunk within the document's segment sequence
        segment: usize,
        language: String,
    },
}

impl ParseError {
    /// Line of the offending chunk
    pub fn line(&self) -> usize {
        match self {
            Self::UnterminatedFence { line }
            | Self::MalformedHeader { line, .. }
            | Self::MalformedOptions { line, .. }
            | Self::InvalidFlag { line, .. }
            | Self::UnknownLanguage { line, .. } => *line,
        }
    }
}

/// Errors raised by the external validation render
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The renderer process could not be started
    #[error("Failed to start renderer: {0}")]
    Spawn(String),

    /// The renderer exited with a failure status
    #[error("Render failed (exit status {status:?}): {stderr}")]
    Failed {
        /// Exit code if the process exited normally
        status: Option<i32>,
        /// Filtered renderer diagnostics
        stderr: String,
    },

    /// The renderer did not finish in time
    #[error("Render timed out after {0} seconds")]
    TimedOut(u64),
}

/// Errors that can occur while generating one exercise document
#[derive(Error, Debug)]
pub enum GenerateError {
    /// The source document is malformed
    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    /// The source document failed its validation render
    #[error("Render error in {path}: {source}")]
    Render {
        path: PathBuf,
        #[source]
        source: RenderError,
    },

    /// Reading the source or writing the output failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Required external packages are not installed
    #[error("Missing dependencies: {}", .0.join(", "))]
    DependencyMissing(Vec<String>),

    /// Installing missing packages failed
    #[error("Failed to install {}: {source}", .packages.join(", "))]
    InstallFailed {
        packages: Vec<String>,
        #[source]
        source: RenderError,
    },

    /// The renderer could not be run to check installed packages
    #[error("Renderer unavailable: {0}")]
    RendererUnavailable(#[source] RenderError),

    /// The source is itself a generated exercise document
    #[error("Refusing to generate from an exercise document: {0}")]
    AlreadyExercise(PathBuf),
}

impl GenerateError {
    /// Source path the error refers to, when there is one
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Parse { path, .. }
            | Self::Render { path, .. }
            | Self::Io { path, .. }
            | Self::AlreadyExercise(path) => Some(path),
            Self::DependencyMissing(_)
            | Self::InstallFailed { .. }
            | Self::RendererUnavailable(_) => None,
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from document parsing
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error from the validation render
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Error from exercise generation
    #[error("Generation error: {0}")]
    Generate(#[from] GenerateError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
