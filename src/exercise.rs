/*!
 * Exercise transform.
 *
 * Turns an authored tutorial into its exercise counterpart: every chunk
 * flagged with the live option loses its executable statements but keeps its
 * comments, and the flag itself is dropped from the chunk header. Prose and
 * unflagged chunks pass through untouched.
 */

use log::debug;
use std::collections::BTreeMap;

use crate::app_config::Config;
use crate::document::{line_content, CodeChunk, Document, OptionValue, Segment};
use crate::errors::ParseError;

/// Applies the live-chunk transform to parsed documents
#[derive(Debug, Clone)]
pub struct ExerciseTransformer {
    /// Option name that marks exercise chunks
    live_option: String,

    /// Comment marker per lowercase language tag
    comment_markers: BTreeMap<String, String>,
}

impl ExerciseTransformer {
    pub fn new(live_option: &str, comment_markers: BTreeMap<String, String>) -> Self {
        Self {
            live_option: live_option.to_string(),
            comment_markers: comment_markers
                .into_iter()
                .map(|(language, marker)| (language.to_lowercase(), marker))
                .collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.live_option, config.comment_markers.clone())
    }

    /// Comment marker configured for a language tag (case-insensitive)
    pub fn comment_marker(&self, language: &str) -> Option<&str> {
        self.comment_markers
            .get(&language.to_lowercase())
            .map(String::as_str)
    }

    /// Whether a chunk is an exercise target
    ///
    /// Plain fenced blocks are never live. A live option with a value that is
    /// not a boolean literal is rejected.
    pub fn is_live(&self, chunk: &CodeChunk) -> Result<bool, ParseError> {
        let Some(header) = chunk.header() else {
            return Ok(false);
        };

        match header.get(&self.live_option) {
            None => Ok(false),
            Some(OptionValue::Bool(live)) => Ok(live),
            Some(OptionValue::Text(value)) => Err(ParseError::InvalidFlag {
                line: chunk.line,
                option: self.live_option.clone(),
                value,
            }),
        }
    }

    /// Produce the exercise version of a document
    pub fn transform(&self, document: &Document) -> Result<Document, ParseError> {
        let mut segments = Vec::with_capacity(document.segments.len());

        for (index, segment) in document.segments.iter().enumerate() {
            let transformed = match segment {
                Segment::Code(chunk) => {
                    if self.is_live(chunk)? {
                        Segment::Code(self.transform_chunk(index, chunk)?)
                    } else {
                        segment.clone()
                    }
                }
                Segment::Prose { .. } => segment.clone(),
            };
            segments.push(transformed);
        }

        Ok(Document::new(document.source_file.clone(), segments))
    }

    /// Parse, transform and re-serialise document text
    pub fn transform_text(&self, content: &str) -> Result<String, ParseError> {
        let document = Document::parse(content)?;
        Ok(self.transform(&document)?.to_string())
    }

    /// Strip statements from a live chunk and drop its live option
    pub fn transform_chunk(&self, segment: usize, chunk: &CodeChunk) -> Result<CodeChunk, ParseError> {
        let language = chunk.language().unwrap_or_default();
        let marker = self
            .comment_marker(language)
            .ok_or_else(|| ParseError::UnknownLanguage {
                line: chunk.line,
                segment,
                language: language.to_string(),
            })?;

        let kept = retain_comments(&chunk.lines, marker);
        debug!(
            "Chunk at line {}: kept {} of {} lines",
            chunk.line,
            kept.len(),
            chunk.lines.len()
        );

        let stripped = match chunk.header() {
            Some(header) => chunk.with_header(header.without(&self.live_option)),
            None => chunk.clone(),
        };

        Ok(stripped.with_lines(kept))
    }
}

/// Keep the lines whose content starts with `marker` after leading whitespace
pub fn retain_comments(lines: &[String], marker: &str) -> Vec<String> {
    lines
        .iter()
        .filter(|line| line_content(line).trim_start().starts_with(marker))
        .cloned()
        .collect()
}
