/*!
 * Common test utilities for the exgen test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;


/// Routes `log` output through the test harness; safe to call repeatedly
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
///
/// `filename` may contain subdirectories; they are created as needed.
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// A tutorial with one live chunk between ordinary chunks
pub const TUTORIAL: &str = r#"---
title: "Fitting the DESeq2 model"
output: html_document
---

```{r setup, include = FALSE}
knitr::opts_chunk$set(echo = TRUE)
library(DESeq2)
```

## Building the dataset

```{r fit, live = TRUE}
# Build the DESeq2 dataset from the count matrix
dds <- DESeqDataSetFromMatrix(countData = counts,
                              colData = samples,
                              design = ~ condition)
# Run size factors, dispersions and the Wald test in one go
dds <- DESeq(dds)
```

Now look at the results.

```{r results}
res <- results(dds)
summary(res)
```
"#;

/// The exercise generated from `TUTORIAL`
pub const TUTORIAL_EXERCISE: &str = r#"---
title: "Fitting the DESeq2 model"
output: html_document
---

```{r setup, include = FALSE}
knitr::opts_chunk$set(echo = TRUE)
library(DESeq2)
```

## Building the dataset

```{r fit}
# Build the DESeq2 dataset from the count matrix
# Run size factors, dispersions and the Wald test in one go
```

Now look at the results.

```{r results}
res <- results(dds)
summary(res)
```
"#;

/// A tutorial without any live chunk
pub const PLAIN_TUTORIAL: &str = r#"# Counts

Load the counts first.

```{r load}
counts <- read.csv("counts.csv", row.names = 1)
```

```bash
ls data/
```
"#;

/// Writes `TUTORIAL` under the given relative path
pub fn create_tutorial(dir: &Path, filename: &str) -> Result<PathBuf> {
    create_test_file(dir, filename, TUTORIAL)
}
