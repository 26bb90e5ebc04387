/*!
 * Splitting R Markdown text into segments.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use super::header::ChunkHeader;
use super::model::{line_content, ChunkKind, CodeChunk, Document, Segment};
use crate::errors::ParseError;

// @const: Opening fence: indentation, a run of 3+ backticks, then the info text
static OPENING_FENCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[ \t]*(`{3,})([^`]*)$").expect("opening fence regex is valid")
});

// @const: Closing fence: a bare run of 3+ backticks
static CLOSING_FENCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[ \t]*(`{3,})[ \t]*$").expect("closing fence regex is valid")
});

/// Chunk under construction while scanning lines
struct OpenChunk {
    line: usize,
    opening: String,
    ticks: usize,
    kind: ChunkKind,
    lines: Vec<String>,
}

impl Document {
    /// Parse R Markdown text into an ordered segment sequence
    pub fn parse(content: &str) -> Result<Self, ParseError> {
        let mut segments = Vec::new();
        let mut prose = String::new();
        let mut open: Option<OpenChunk> = None;

        for (index, raw) in content.split_inclusive('\n').enumerate() {
            let line_number = index + 1;
            let line = line_content(raw);

            if let Some(mut chunk) = open.take() {
                if is_closing_fence(line, chunk.ticks) {
                    segments.push(Segment::Code(CodeChunk {
                        line: chunk.line,
                        opening: chunk.opening,
                        ticks: chunk.ticks,
                        kind: chunk.kind,
                        lines: chunk.lines,
                        closing: raw.to_string(),
                    }));
                } else {
                    chunk.lines.push(raw.to_string());
                    open = Some(chunk);
                }
                continue;
            }

            match parse_opening_fence(raw, line_number)? {
                Some(chunk) => {
                    if !prose.is_empty() {
                        segments.push(Segment::Prose {
                            text: std::mem::take(&mut prose),
                        });
                    }
                    open = Some(chunk);
                }
                None => prose.push_str(raw),
            }
        }

        if let Some(chunk) = open {
            return Err(ParseError::UnterminatedFence { line: chunk.line });
        }

        if !prose.is_empty() {
            segments.push(Segment::Prose { text: prose });
        }

        debug!(
            "Parsed {} segments ({} code chunks)",
            segments.len(),
            segments.iter().filter(|s| s.is_code()).count()
        );

        Ok(Document::new(Default::default(), segments))
    }
}

fn is_closing_fence(line: &str, opening_ticks: usize) -> bool {
    CLOSING_FENCE_REGEX
        .captures(line)
        .and_then(|caps| caps.get(1))
        .is_some_and(|ticks| ticks.as_str().len() >= opening_ticks)
}

fn parse_opening_fence(raw: &str, line_number: usize) -> Result<Option<OpenChunk>, ParseError> {
    let line = line_content(raw);
    let Some(caps) = OPENING_FENCE_REGEX.captures(line) else {
        return Ok(None);
    };
    let (Some(ticks), Some(info)) = (caps.get(1), caps.get(2)) else {
        return Ok(None);
    };

    let info_text = info.as_str();
    let trimmed = info_text.trim();
    let kind = if trimmed.starts_with('{') {
        if trimmed.len() < 2 || !trimmed.ends_with('}') {
            return Err(ParseError::MalformedHeader {
                line: line_number,
                reason: "missing closing brace".to_string(),
            });
        }
        let open_brace = info.start() + (info_text.len() - info_text.trim_start().len());
        let close_brace = open_brace + trimmed.len() - 1;
        let header_span = open_brace + 1..close_brace;
        let header = ChunkHeader::parse(&line[header_span.clone()], line_number)?;
        ChunkKind::Executable {
            header,
            header_span,
        }
    } else {
        ChunkKind::Plain {
            info: trimmed.to_string(),
        }
    };

    Ok(Some(OpenChunk {
        line: line_number,
        opening: raw.to_string(),
        ticks: ticks.as_str().len(),
        kind,
        lines: Vec::new(),
    }))
}
