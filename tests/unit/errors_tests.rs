/*!
 * Tests for error types
 */

use std::error::Error;
use std::io;
use std::path::PathBuf;
use exgen::errors::{AppError, GenerateError, ParseError, RenderError};

/// Test parse error messages and line access
#[test]
fn test_parse_error_shouldReportLine() {
    let error = ParseError::UnterminatedFence { line: 12 };
    assert_eq!(error.to_string(), "Unterminated code fence opened at line 12");
    assert_eq!(error.line(), 12);

    let error = ParseError::UnknownLanguage {
        line: 7,
        segment: 3,
        language: "julia".to_string(),
    };
    assert!(error.to_string().contains("'julia'"));
    assert_eq!(error.line(), 7);
}

/// Test that generation errors carry the source path and cause
#[test]
fn test_generate_error_shouldExposePathAndSource() {
    let path = PathBuf::from("DE_analysis/03_DESeq2_model.Rmd");
    let error = GenerateError::Parse {
        path: path.clone(),
        source: ParseError::UnterminatedFence { line: 4 },
    };

    assert_eq!(error.path(), Some(&path));
    assert!(error.to_string().contains("03_DESeq2_model.Rmd"));
    assert!(error.source().is_some());

    let error = GenerateError::Render {
        path: path.clone(),
        source: RenderError::TimedOut(600),
    };
    assert!(error.to_string().contains("600 seconds"));

    let error = GenerateError::DependencyMissing(vec!["DESeq2".to_string(), "apeglm".to_string()]);
    assert_eq!(error.path(), None);
    assert_eq!(error.to_string(), "Missing dependencies: DESeq2, apeglm");

    let error = GenerateError::RendererUnavailable(RenderError::Spawn("Rscript: not found".to_string()));
    assert_eq!(error.path(), None);
    assert_eq!(error.to_string(), "Renderer unavailable: Failed to start renderer: Rscript: not found");
    assert!(error.source().is_some());

    let error = GenerateError::InstallFailed {
        packages: vec!["DESeq2".to_string(), "apeglm".to_string()],
        source: RenderError::TimedOut(600),
    };
    assert_eq!(error.path(), None);
    assert_eq!(error.to_string(), "Failed to install DESeq2, apeglm: Render timed out after 600 seconds");
}

/// Test conversions into the application error
#[test]
fn test_app_error_conversions() {
    let error: AppError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
    assert!(matches!(error, AppError::File(_)));

    let error: AppError = ParseError::UnterminatedFence { line: 1 }.into();
    assert!(matches!(error, AppError::Parse(_)));

    let error: AppError = anyhow::anyhow!("something else").into();
    assert_eq!(error.to_string(), "Unknown error: something else");
}
