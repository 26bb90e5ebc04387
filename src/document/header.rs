/*!
 * Chunk header parsing.
 *
 * An executable chunk opens with a fence like ```` ```{r label, echo = FALSE} ````.
 * The text between the braces is the header: a language tag followed by a
 * comma-separated list of bare tokens and `key = value` pairs. Values may
 * contain commas inside quotes or brackets (`fig.dim = c(6, 4)`), so the
 * list is split at top level only.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::ops::Range;

use crate::errors::ParseError;

static LANGUAGE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_.+-]+$").expect("language regex is valid")
});

static KEY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z._][A-Za-z0-9._-]*$").expect("key regex is valid")
});

/// Typed view of an option value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Text(String),
}

impl OptionValue {
    /// Interpret raw option text, recognising R and lowercase boolean literals
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim() {
            "TRUE" | "T" | "true" => Self::Bool(true),
            "FALSE" | "F" | "false" => Self::Bool(false),
            other => Self::Text(other.to_string()),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Text(_) => None,
        }
    }
}

/// One entry of a chunk header's option list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOption {
    /// A bare token; the first one is the chunk label
    Flag(String),
    /// A `key = value` pair; `raw` is the item text exactly as written
    Pair {
        key: String,
        value: String,
        raw: String,
    },
}

impl ChunkOption {
    /// Option name (the token itself for flags)
    pub fn key(&self) -> &str {
        match self {
            Self::Flag(token) => token,
            Self::Pair { key, .. } => key,
        }
    }

    /// Value of the option; bare tokens read as `true`
    pub fn value(&self) -> OptionValue {
        match self {
            Self::Flag(_) => OptionValue::Bool(true),
            Self::Pair { value, .. } => OptionValue::from_raw(value),
        }
    }

    fn raw(&self) -> &str {
        match self {
            Self::Flag(token) => token,
            Self::Pair { raw, .. } => raw,
        }
    }
}

impl fmt::Display for ChunkOption {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.raw())
    }
}

/// Parsed content of an executable chunk's braces
///
/// The header text is kept as written, so rendering an unmodified header
/// reproduces it exactly and removing an option leaves the rest untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Language tag, e.g. `r`
    pub language: String,

    /// Whether the language was followed by a comma (`{r, echo=FALSE}`)
    pub leading_comma: bool,

    /// Options in source order
    pub options: Vec<ChunkOption>,

    /// Header text as written between the braces
    source: String,

    /// End of the language tag in `source`
    language_end: usize,

    /// Byte range of each option item in `source`
    spans: Vec<Range<usize>>,
}

impl ChunkHeader {
    /// Parse the text between a fence's braces
    ///
    /// `line` is the 1-based line of the fence and is only used for error reporting.
    pub fn parse(inner: &str, line: usize) -> Result<Self, ParseError> {
        let trimmed = inner.trim();
        if trimmed.is_empty() {
            return Err(ParseError::MalformedHeader {
                line,
                reason: "empty chunk header".to_string(),
            });
        }

        let language_start = inner.len() - inner.trim_start().len();
        let language_end = language_start
            + trimmed
                .find(|c: char| c.is_whitespace() || c == ',')
                .unwrap_or(trimmed.len());
        let language = &inner[language_start..language_end];

        if language.is_empty() {
            return Err(ParseError::MalformedHeader {
                line,
                reason: "missing language tag".to_string(),
            });
        }
        if !LANGUAGE_REGEX.is_match(language) {
            return Err(ParseError::MalformedHeader {
                line,
                reason: format!("invalid language tag '{}'", language),
            });
        }

        let after_language = &inner[language_end..];
        let mut rest_start = language_end + (after_language.len() - after_language.trim_start().len());
        let leading_comma = inner[rest_start..].starts_with(',');
        if leading_comma {
            rest_start += 1;
        }
        let rest = &inner[rest_start..];

        let mut options = Vec::new();
        let mut spans = Vec::new();
        if !rest.trim().is_empty() {
            for range in split_top_level(rest, ',', line)? {
                let item = &rest[range.clone()];
                options.push(parse_option(item, line)?);
                spans.push(trimmed_span(item, rest_start + range.start));
            }
        }

        Ok(Self {
            language: language.to_string(),
            leading_comma,
            options,
            source: inner.to_string(),
            language_end,
            spans,
        })
    }

    /// Chunk label: the first option when it is a bare token
    pub fn label(&self) -> Option<&str> {
        match self.options.first() {
            Some(ChunkOption::Flag(token)) => Some(token.as_str()),
            _ => None,
        }
    }

    /// Options other than the label, with their position in `options`
    fn named_options(&self) -> impl DoubleEndedIterator<Item = (usize, &ChunkOption)> {
        let skip = usize::from(self.label().is_some());
        self.options.iter().enumerate().skip(skip)
    }

    /// Value of the last option named `key`; the label never matches
    pub fn get(&self, key: &str) -> Option<OptionValue> {
        self.named_options()
            .rev()
            .find(|(_, option)| option.key() == key)
            .map(|(_, option)| option.value())
    }

    /// Option mapping in source order, label excluded; later duplicates override earlier ones
    pub fn option_map(&self) -> Vec<(String, OptionValue)> {
        let mut map: Vec<(String, OptionValue)> = Vec::new();
        for (_, option) in self.named_options() {
            let value = option.value();
            match map.iter_mut().find(|(key, _)| key == option.key()) {
                Some(entry) => entry.1 = value,
                None => map.push((option.key().to_string(), value)),
            }
        }
        map
    }

    /// Copy of this header with every option named `key` removed
    ///
    /// The label is kept even if it reads `key`. Each remaining option keeps
    /// the separator written before it; a removed first option hands its
    /// separator to the option that follows.
    pub fn without(&self, key: &str) -> Self {
        let removed: Vec<usize> = self
            .named_options()
            .filter(|(_, option)| option.key() == key)
            .map(|(index, _)| index)
            .collect();
        if removed.is_empty() {
            return self.clone();
        }

        let mut source = self.source[..self.language_end].to_string();
        let mut options = Vec::new();
        let mut spans = Vec::new();

        for (index, option) in self.options.iter().enumerate() {
            if removed.contains(&index) {
                continue;
            }
            let separator = if options.is_empty() {
                &self.source[self.language_end..self.spans[0].start]
            } else {
                &self.source[self.item_end(index)..self.spans[index].start]
            };
            source.push_str(separator);
            let start = source.len();
            source.push_str(&self.source[self.spans[index].clone()]);
            spans.push(start..source.len());
            options.push(option.clone());
        }

        let tail_start = self.spans.last().map_or(self.language_end, |span| span.end);
        source.push_str(&self.source[tail_start..]);

        let leading_comma = !options.is_empty() && self.leading_comma;
        Self {
            language: self.language.clone(),
            leading_comma,
            options,
            source,
            language_end: self.language_end,
            spans,
        }
    }

    /// End of the item before `index`, or of the language tag for the first item
    fn item_end(&self, index: usize) -> usize {
        match index {
            0 => self.language_end,
            _ => self.spans[index - 1].end,
        }
    }
}

impl fmt::Display for ChunkHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// Range of `text` without surrounding whitespace, offset into the enclosing string
fn trimmed_span(text: &str, offset: usize) -> Range<usize> {
    let start = offset + (text.len() - text.trim_start().len());
    start..start + text.trim().len()
}

fn parse_option(item: &str, line: usize) -> Result<ChunkOption, ParseError> {
    let item = item.trim();
    if item.is_empty() {
        return Err(ParseError::MalformedOptions {
            line,
            reason: "empty option".to_string(),
        });
    }

    let parts = split_top_level(item, '=', line)?;
    if parts.len() == 1 {
        return Ok(ChunkOption::Flag(item.to_string()));
    }

    // Only the first top-level '=' separates key from value
    let key = item[parts[0].clone()].trim();
    let value = item[parts[0].end + 1..].trim();

    if !KEY_REGEX.is_match(key) {
        return Err(ParseError::MalformedOptions {
            line,
            reason: format!("invalid option name '{}'", key),
        });
    }
    if value.is_empty() {
        return Err(ParseError::MalformedOptions {
            line,
            reason: format!("option '{}' has no value", key),
        });
    }

    Ok(ChunkOption::Pair {
        key: key.to_string(),
        value: value.to_string(),
        raw: item.to_string(),
    })
}

/// Split `text` on `separator` outside quotes and brackets, returning byte ranges
fn split_top_level(text: &str, separator: char, line: usize) -> Result<Vec<Range<usize>>, ParseError> {
    let mut parts = Vec::new();
    let mut depth: Vec<char> = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (index, c) in text.char_indices() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == open {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '(' => depth.push(')'),
            '[' => depth.push(']'),
            '{' => depth.push('}'),
            ')' | ']' | '}' => {
                if depth.pop() != Some(c) {
                    return Err(ParseError::MalformedOptions {
                        line,
                        reason: format!("unbalanced '{}'", c),
                    });
                }
            }
            c if c == separator && depth.is_empty() => {
                parts.push(start..index);
                start = index + c.len_utf8();
            }
            _ => {}
        }
    }

    if let Some(open) = quote {
        return Err(ParseError::MalformedOptions {
            line,
            reason: format!("unterminated {} quote", open),
        });
    }
    if let Some(close) = depth.last() {
        return Err(ParseError::MalformedOptions {
            line,
            reason: format!("missing '{}'", close),
        });
    }

    parts.push(start..text.len());
    Ok(parts)
}
