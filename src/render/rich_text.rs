// src/render/rich_text.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::AppError;

/// Inline LaTeX spans are delimited as `[: ... ]` inside span text.
static LATEX_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[:(.*?)\]").expect("latex span pattern is valid"));

/// Style flags carried by a rich-text span. Unknown attribute keys are
/// ignored; `box` marks the span for rendering inside a bordered inset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SpanAttributes {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default, rename = "box")]
    pub boxed: bool,
}

/// One `{insert, attributes}` record of a rich-text markup list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Span {
    pub insert: String,
    #[serde(default)]
    pub attributes: SpanAttributes,
}

/// Parses rich-text markup into an ordered span list.
///
/// Markup is a JSON array of `{insert, attributes}` records. Malformed
/// JSON is rejected with `BadRequest`, never evaluated. A plain string
/// that is not bracketed is wrapped as a single unstyled span. Spans with
/// empty text are dropped, which merges their neighbors.
pub fn parse_rich_text(markup: &str) -> Result<Vec<Span>, AppError> {
    let trimmed = markup.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if !trimmed.starts_with('[') {
        return Ok(vec![Span {
            insert: markup.to_string(),
            attributes: SpanAttributes::default(),
        }]);
    }

    let spans: Vec<Span> = serde_json::from_str(trimmed)
        .map_err(|e| AppError::BadRequest(format!("Malformed rich-text markup: {}", e)))?;

    Ok(spans.into_iter().filter(|s| !s.insert.is_empty()).collect())
}

/// A span segment after LaTeX extraction: either literal text (styled by
/// the owning span's attributes) or the inner LaTeX source of a math span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Latex(String),
}

/// Splits span text on `[: ... ]` delimiters, preserving order.
pub fn segment_latex(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last_end = 0;

    for captures in LATEX_SPAN.captures_iter(text) {
        let whole = captures.get(0).expect("regex match has group 0");
        if whole.start() > last_end {
            segments.push(Segment::Text(text[last_end..whole.start()].to_string()));
        }
        segments.push(Segment::Latex(captures[1].to_string()));
        last_end = whole.end();
    }

    if last_end < text.len() {
        segments.push(Segment::Text(text[last_end..].to_string()));
    }

    segments
}
