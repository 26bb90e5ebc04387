/*!
 * Tests for single-document exercise generation
 */

use anyhow::Result;
use std::fs;
use std::sync::Arc;
use exgen::app_config::Config;
use exgen::errors::{GenerateError, ParseError, RenderError};
use exgen::generator::Generator;
use crate::common;
use crate::common::mock_renderer::MockRenderer;

fn generator(root: &std::path::Path, renderer: Arc<MockRenderer>) -> Generator {
    Generator::from_config(root, &Config::default(), renderer)
}

/// Test that generation writes the exercise next to the untouched source
#[tokio::test]
async fn test_generate_shouldWriteExerciseAndKeepSource() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_tutorial(temp_dir.path(), "DE_analysis/03_DESeq2_model.Rmd")?;
    let renderer = Arc::new(MockRenderer::new());

    let output = generator(temp_dir.path(), renderer.clone()).generate(&source).await?;

    assert_eq!(output, temp_dir.path().join("DE_analysis/03_DESeq2_model-live.Rmd"));
    assert_eq!(fs::read_to_string(&output)?, common::TUTORIAL_EXERCISE);
    assert_eq!(fs::read_to_string(&source)?, common::TUTORIAL);
    assert_eq!(renderer.rendered_paths(), vec![source]);

    Ok(())
}

/// Test that relative paths resolve against the project root
#[tokio::test]
async fn test_generate_withRelativePath_shouldResolveAgainstRoot() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_tutorial(temp_dir.path(), "exploratory/01_vst_and_pca.Rmd")?;
    let generator = generator(temp_dir.path(), Arc::new(MockRenderer::new()));

    let output = generator.generate("exploratory/01_vst_and_pca.Rmd").await?;

    assert_eq!(output, temp_dir.path().join("exploratory/01_vst_and_pca-live.Rmd"));
    assert_eq!(generator.output_path("exploratory/01_vst_and_pca.Rmd"), output);
    assert!(output.is_file());

    Ok(())
}

/// Test that an existing exercise is replaced
#[tokio::test]
async fn test_generate_withExistingOutput_shouldOverwrite() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_tutorial(temp_dir.path(), "model.Rmd")?;
    common::create_test_file(temp_dir.path(), "model-live.Rmd", "stale exercise\n")?;

    let output = generator(temp_dir.path(), Arc::new(MockRenderer::new())).generate(&source).await?;

    assert_eq!(fs::read_to_string(output)?, common::TUTORIAL_EXERCISE);

    Ok(())
}

/// Test that a document without live chunks produces an identical copy
#[tokio::test]
async fn test_generate_withoutLiveChunks_shouldCopyContent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_file(temp_dir.path(), "counts.Rmd", common::PLAIN_TUTORIAL)?;

    let output = generator(temp_dir.path(), Arc::new(MockRenderer::new())).generate(&source).await?;

    assert_eq!(fs::read_to_string(output)?, common::PLAIN_TUTORIAL);

    Ok(())
}

/// Test that a render failure leaves no output behind
#[tokio::test]
async fn test_generate_withRenderFailure_shouldNotWriteOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_tutorial(temp_dir.path(), "broken.Rmd")?;
    let generator = generator(temp_dir.path(), Arc::new(MockRenderer::new().failing_on("broken.Rmd")));

    let error = generator.generate(&source).await.unwrap_err();

    match error {
        GenerateError::Render { path, source: RenderError::Failed { status, stderr } } => {
            assert_eq!(path, source);
            assert_eq!(status, Some(1));
            assert!(stderr.contains("object 'dds' not found"));
        }
        other => panic!("expected render error, got {:?}", other),
    }
    assert!(!temp_dir.path().join("broken-live.Rmd").exists());

    Ok(())
}

/// Test that a malformed document leaves no output behind
#[tokio::test]
async fn test_generate_withUnterminatedFence_shouldFailWithParseError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_file(
        temp_dir.path(),
        "unterminated.Rmd",
        "# Title\n\n```{r fit, live = TRUE}\ndds <- DESeq(dds)\n",
    )?;

    let error = generator(temp_dir.path(), Arc::new(MockRenderer::new()))
        .generate(&source)
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        GenerateError::Parse { source: ParseError::UnterminatedFence { line: 3 }, .. }
    ));
    assert!(!temp_dir.path().join("unterminated-live.Rmd").exists());

    Ok(())
}

/// Test that disabling render skips the renderer entirely
#[tokio::test]
async fn test_generate_withRenderDisabled_shouldNotRender() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_tutorial(temp_dir.path(), "broken.Rmd")?;
    let renderer = Arc::new(MockRenderer::new().failing_on("broken.Rmd"));
    let generator = generator(temp_dir.path(), renderer.clone()).with_render(false);

    let output = generator.generate(&source).await?;

    assert!(output.is_file());
    assert!(renderer.rendered_paths().is_empty());

    Ok(())
}

/// Test that validate only renders and writes nothing
#[tokio::test]
async fn test_validate_shouldRenderWithoutWriting() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_tutorial(temp_dir.path(), "model.Rmd")?;
    let renderer = Arc::new(MockRenderer::new());

    generator(temp_dir.path(), renderer.clone()).validate("model.Rmd").await?;

    assert_eq!(renderer.rendered_paths(), vec![source]);
    assert!(!temp_dir.path().join("model-live.Rmd").exists());

    Ok(())
}

/// Test that exercise documents are refused as input
#[tokio::test]
async fn test_generate_withExerciseInput_shouldRefuse() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_file(temp_dir.path(), "model-live.Rmd", common::TUTORIAL_EXERCISE)?;
    let renderer = Arc::new(MockRenderer::new());

    let error = generator(temp_dir.path(), renderer.clone()).generate(&source).await.unwrap_err();

    assert!(matches!(error, GenerateError::AlreadyExercise(ref path) if *path == source));
    assert!(renderer.rendered_paths().is_empty());
    assert!(!temp_dir.path().join("model-live-live.Rmd").exists());

    Ok(())
}

/// Test that a missing source is an I/O error
#[tokio::test]
async fn test_generate_withMissingSource_shouldFailWithIo() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let generator = generator(temp_dir.path(), Arc::new(MockRenderer::new())).with_render(false);

    let error = generator.generate("missing.Rmd").await.unwrap_err();

    match error {
        GenerateError::Io { path, .. } => assert_eq!(path, temp_dir.path().join("missing.Rmd")),
        other => panic!("expected I/O error, got {:?}", other),
    }

    Ok(())
}

/// Test that an unwritable output path is an I/O error
#[tokio::test]
async fn test_generate_withOutputPathOccupiedByDirectory_shouldFailWithIo() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_tutorial(temp_dir.path(), "model.Rmd")?;
    fs::create_dir_all(temp_dir.path().join("model-live.Rmd/inner"))?;

    let error = generator(temp_dir.path(), Arc::new(MockRenderer::new()))
        .generate(&source)
        .await
        .unwrap_err();

    match error {
        GenerateError::Io { path, .. } => assert_eq!(path, temp_dir.path().join("model-live.Rmd")),
        other => panic!("expected I/O error, got {:?}", other),
    }
    assert_eq!(fs::read_to_string(&source)?, common::TUTORIAL);

    Ok(())
}

/// Test that a live chunk in an unknown language fails generation
#[tokio::test]
async fn test_generate_withUnknownLiveLanguage_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_file(
        temp_dir.path(),
        "julia.Rmd",
        "```{julia, live = TRUE}\nx = 1\n```\n",
    )?;

    let error = generator(temp_dir.path(), Arc::new(MockRenderer::new()))
        .generate(&source)
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        GenerateError::Parse { source: ParseError::UnknownLanguage { .. }, .. }
    ));
    assert!(!temp_dir.path().join("julia-live.Rmd").exists());

    Ok(())
}

/// Test the pre-flight dependency check
#[tokio::test]
async fn test_preflight_shouldReportOrInstallMissingPackages() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let packages = vec!["rmarkdown".to_string(), "DESeq2".to_string()];

    let all_installed = generator(temp_dir.path(), Arc::new(MockRenderer::new()));
    all_installed.preflight(&packages, false).await?;

    let missing = generator(temp_dir.path(), Arc::new(MockRenderer::new().with_missing(&["DESeq2"])));
    match missing.preflight(&packages, false).await {
        Err(GenerateError::DependencyMissing(names)) => assert_eq!(names, vec!["DESeq2".to_string()]),
        other => panic!("expected missing dependency, got {:?}", other),
    }

    let installable = generator(temp_dir.path(), Arc::new(MockRenderer::new().with_missing(&["DESeq2"])));
    installable.preflight(&packages, true).await?;

    Ok(())
}

/// Test that a failed installation reports the installer output
#[tokio::test]
async fn test_preflight_withFailingInstall_shouldKeepInstallerError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let packages = vec!["rmarkdown".to_string(), "DESeq2".to_string()];
    let generator = generator(
        temp_dir.path(),
        Arc::new(MockRenderer::new().with_missing(&["DESeq2"]).with_failing_install()),
    );

    let error = generator.preflight(&packages, true).await.unwrap_err();

    match &error {
        GenerateError::InstallFailed { packages, source: RenderError::Failed { stderr, .. } } => {
            assert_eq!(packages, &vec!["DESeq2".to_string()]);
            assert!(stderr.contains("non-zero exit status"));
        }
        other => panic!("expected install failure, got {:?}", other),
    }
    assert!(error.to_string().contains("DESeq2"));
    assert!(error.to_string().contains("non-zero exit status"));

    Ok(())
}

/// Test that a renderer that cannot start is not reported as a missing package
#[tokio::test]
async fn test_preflight_withUnavailableRenderer_shouldFailWithOwnError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let packages = vec!["rmarkdown".to_string()];
    let generator = generator(temp_dir.path(), Arc::new(MockRenderer::new().with_unavailable()));

    let error = generator.preflight(&packages, false).await.unwrap_err();

    assert!(matches!(
        error,
        GenerateError::RendererUnavailable(RenderError::Spawn(_))
    ));
    assert!(error.to_string().contains("Rscript"));

    Ok(())
}
