/*!
 * Tests for app configuration functionality
 */

use anyhow::Result;
use std::path::PathBuf;
use exgen::app_config::{Config, LogLevel};
use log::LevelFilter;
use crate::common;

/// Test that the default configuration is valid and complete
#[test]
fn test_default_config_shouldBeValid() -> Result<()> {
    let config = Config::default();
    config.validate()?;

    assert_eq!(config.output_suffix, "-live");
    assert_eq!(config.live_option, "live");
    assert_eq!(config.comment_markers.get("r").map(String::as_str), Some("#"));
    assert_eq!(config.comment_markers.get("sql").map(String::as_str), Some("--"));
    assert!(config.render.enabled);
    assert_eq!(config.render.command, "Rscript");
    assert_eq!(config.render.timeout_secs, 600);
    assert!(config.render.required_packages.contains(&"DESeq2".to_string()));
    assert_eq!(config.batch.jobs, 4);
    assert!(!config.batch.fail_fast);
    assert_eq!(config.log_level, LogLevel::Info);

    Ok(())
}

/// Test that the default batch lists documents in area order
#[test]
fn test_batch_documents_shouldFlattenGroupsInOrder() {
    let documents = Config::default().batch_documents();

    assert_eq!(documents.len(), 6);
    assert_eq!(documents[0], PathBuf::from("DE_analysis/01_import_counts.Rmd"));
    assert_eq!(documents[3], PathBuf::from("DE_analysis/04_results_and_visualisation.Rmd"));
    assert_eq!(documents[5], PathBuf::from("exploratory/02_sample_clustering.Rmd"));
}

/// Test validation failures
#[test]
fn test_validate_withBadValues_shouldFail() {
    let mut config = Config::default();
    config.output_suffix = String::new();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.live_option = "  ".to_string();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.comment_markers.insert("julia".to_string(), " ".to_string());
    let error = config.validate().unwrap_err();
    assert!(error.to_string().contains("julia"));

    let mut config = Config::default();
    config.batch.jobs = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.render.command = String::new();
    assert!(config.validate().is_err());
    config.render.enabled = false;
    assert!(config.validate().is_ok());
}

/// Test loading a partial configuration file
#[test]
fn test_from_file_withPartialJson_shouldFillDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "exgen.json",
        r#"{
            "output_suffix": "-exercise",
            "render": { "enabled": false },
            "batch": { "fail_fast": true },
            "batches": [
                { "area": "intro", "documents": ["intro/01_setup.Rmd"] }
            ],
            "log_level": "debug"
        }"#,
    )?;

    let config = Config::from_file(&path)?;
    config.validate()?;

    assert_eq!(config.output_suffix, "-exercise");
    assert_eq!(config.live_option, "live");
    assert!(!config.render.enabled);
    assert_eq!(config.render.command, "Rscript");
    assert!(config.batch.fail_fast);
    assert_eq!(config.batch.jobs, 4);
    assert_eq!(config.batch_documents(), vec![PathBuf::from("intro/01_setup.Rmd")]);
    assert_eq!(config.log_level.to_level_filter(), LevelFilter::Debug);

    Ok(())
}

/// Test that invalid JSON and missing files are reported
#[test]
fn test_from_file_withBadInput_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "exgen.json", "{ not json")?;

    assert!(Config::from_file(&path).is_err());
    assert!(Config::from_file(temp_dir.path().join("missing.json")).is_err());

    Ok(())
}
