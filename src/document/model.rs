/*!
 * Core document model types.
 *
 * A document is an ordered sequence of segments: runs of prose and fenced
 * code blocks. Every segment keeps its raw text so that an untouched document
 * serialises back to exactly the bytes it was parsed from.
 */

use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};

use super::header::ChunkHeader;

/// What kind of fence opened a code block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkKind {
    /// Executable chunk: ```` ```{r label, key = value} ````
    Executable {
        header: ChunkHeader,
        /// Byte range of the header text inside the opening line's braces
        header_span: Range<usize>,
    },
    /// Plain fenced block: ```` ```r ```` or ```` ``` ````
    Plain {
        info: String,
    },
}

/// A fenced code block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeChunk {
    /// 1-based line of the opening fence
    pub line: usize,

    /// Opening fence line, including its line ending
    pub opening: String,

    /// Number of backticks in the opening fence
    pub ticks: usize,

    /// Executable header or plain info string
    pub kind: ChunkKind,

    /// Body lines, each including its line ending
    pub lines: Vec<String>,

    /// Closing fence line, including its line ending if there was one
    pub closing: String,
}

impl CodeChunk {
    /// Language tag of the chunk, if it has one
    pub fn language(&self) -> Option<&str> {
        match &self.kind {
            ChunkKind::Executable { header, .. } => Some(header.language.as_str()),
            ChunkKind::Plain { info } => info.split_whitespace().next(),
        }
    }

    /// Parsed header for executable chunks
    pub fn header(&self) -> Option<&ChunkHeader> {
        match &self.kind {
            ChunkKind::Executable { header, .. } => Some(header),
            ChunkKind::Plain { .. } => None,
        }
    }

    /// Body line contents without line endings
    pub fn body(&self) -> Vec<&str> {
        self.lines.iter().map(|line| line_content(line)).collect()
    }

    /// Replace the header, re-rendering only the text between the braces
    pub fn with_header(&self, header: ChunkHeader) -> Self {
        match &self.kind {
            ChunkKind::Executable { header_span, .. } => {
                let rendered = header.to_string();
                let opening = format!(
                    "{}{}{}",
                    &self.opening[..header_span.start],
                    rendered,
                    &self.opening[header_span.end..]
                );
                let header_span = header_span.start..header_span.start + rendered.len();
                Self {
                    opening,
                    kind: ChunkKind::Executable { header, header_span },
                    ..self.clone()
                }
            }
            ChunkKind::Plain { .. } => self.clone(),
        }
    }

    /// Replace the body lines, keeping both fences
    pub fn with_lines(&self, lines: Vec<String>) -> Self {
        Self {
            lines,
            ..self.clone()
        }
    }
}

impl fmt::Display for CodeChunk {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.opening)?;
        for line in &self.lines {
            write!(f, "{}", line)?;
        }
        write!(f, "{}", self.closing)
    }
}

/// A contiguous unit of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Prose { text: String },
    Code(CodeChunk),
}

impl Segment {
    pub fn is_code(&self) -> bool {
        matches!(self, Self::Code(_))
    }

    pub fn as_code(&self) -> Option<&CodeChunk> {
        match self {
            Self::Code(chunk) => Some(chunk),
            Self::Prose { .. } => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Prose { text } => write!(f, "{}", text),
            Self::Code(chunk) => write!(f, "{}", chunk),
        }
    }
}

/// An R Markdown document as an ordered sequence of segments
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    /// File the document was read from (empty for in-memory documents)
    pub source_file: PathBuf,

    /// Segments in source order
    pub segments: Vec<Segment>,
}

impl Document {
    /// Create a document from already split segments
    pub fn new(source_file: PathBuf, segments: Vec<Segment>) -> Self {
        Self {
            source_file,
            segments,
        }
    }

    /// Set the source file path.
    pub fn with_source_file<P: AsRef<Path>>(mut self, source_file: P) -> Self {
        self.source_file = source_file.as_ref().to_path_buf();
        self
    }

    /// All code chunks in order, paired with their segment index
    pub fn code_chunks(&self) -> impl Iterator<Item = (usize, &CodeChunk)> {
        self.segments
            .iter()
            .enumerate()
            .filter_map(|(index, segment)| segment.as_code().map(|chunk| (index, chunk)))
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

/// Strip a trailing `\n` or `\r\n` from a raw line
pub fn line_content(raw: &str) -> &str {
    let without_lf = raw.strip_suffix('\n').unwrap_or(raw);
    without_lf.strip_suffix('\r').unwrap_or(without_lf)
}
