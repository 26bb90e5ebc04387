/*!
 * Document modeling for R Markdown tutorials.
 *
 * This module provides the segment model used by exercise generation:
 * - Lossless parsing of prose and fenced code blocks
 * - Chunk header parsing (language tag, label, `key = value` options)
 * - Byte-for-byte serialisation of untouched documents
 */

pub mod header;
pub mod model;
pub mod parser;

// Re-export types used by other modules
pub use header::{ChunkHeader, ChunkOption, OptionValue};
pub use model::{line_content, ChunkKind, CodeChunk, Document, Segment};
