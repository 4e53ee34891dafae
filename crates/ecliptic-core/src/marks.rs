//! Inline annotation marker codec.
//!
//! Annotations are persisted inside the entry's content string as inline
//! `<mark>` elements carrying the annotation id and comment as data
//! attributes, with the anchored text as the element payload:
//!
//! ```text
//! before <mark data-annotation-id="UUID" data-comment="why">anchored</mark> after
//! ```
//!
//! This module converts between that serialized form and the in-memory
//! [`DocumentModel`] used while editing.
//!
//! # Rules
//!
//! 1. Markers never alter the visible text: the payload is the literal
//!    anchored text, and text outside markers is entity-escaped only.
//! 2. `comment` and the anchored text round-trip byte-for-byte, including
//!    quotes and ampersands.
//! 3. A marker missing its id or comment attribute is malformed: it is
//!    dropped from the decoded annotation list but its payload stays
//!    visible as plain text. Decode never fails on bad markup.
//! 4. Nested marker markup (legacy output from overlapping highlights)
//!    is flattened: inner tags are stripped, inner text is kept.
//! 5. Decode emits annotations in document order.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;
use uuid::Uuid;

/// A marker element: well-formed open tag, non-greedy payload, close tag.
static MARK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<mark\b([^>]*)>(.*?)</mark>"#).expect("static regex"));

/// Annotation id attribute inside a marker's open tag.
static ATTR_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"data-annotation-id\s*=\s*"([^"]*)""#).expect("static regex"));

/// Comment attribute inside a marker's open tag.
static ATTR_COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"data-comment\s*=\s*"([^"]*)""#).expect("static regex"));

/// Stray marker tags (unpaired opens, leftover closes, flattened nesting).
static STRAY_MARK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"</?mark\b[^>]*>"#).expect("static regex"));

// =============================================================================
// DOCUMENT MODEL
// =============================================================================

/// An annotation span anchored in the live document text.
///
/// `range` is a byte range into [`DocumentModel::text`], always on UTF-8
/// character boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedSpan {
    pub id: Uuid,
    pub comment: String,
    pub range: Range<usize>,
}

/// The in-memory view of an entry's content while it is being edited:
/// plain text plus non-overlapping annotation spans in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentModel {
    pub text: String,
    pub marks: Vec<MarkedSpan>,
}

impl DocumentModel {
    /// Create a model over plain text with no annotations.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    /// The literal text a span is anchored to.
    pub fn anchored_text(&self, mark: &MarkedSpan) -> &str {
        &self.text[mark.range.clone()]
    }
}

/// An `(id, comment, anchoredText)` triple extracted from one marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationSeed {
    pub id: Uuid,
    pub comment: String,
    pub anchored_text: String,
}

/// Result of decoding a serialized content string.
#[derive(Debug, Clone)]
pub struct DecodedDocument {
    /// Rebuilt editing model (plain text + spans).
    pub model: DocumentModel,
    /// Display-safe HTML: markers rewritten into presentation spans with
    /// a tooltip affordance, edit-only attributes stripped.
    pub display_html: String,
    /// Extracted annotations, in document order.
    pub annotations: Vec<AnnotationSeed>,
}

// =============================================================================
// ESCAPING
// =============================================================================

/// Escape text content for embedding in the serialized markup.
pub fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape an attribute value (text escaping plus double quotes).
pub fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

/// Reverse [`escape_attr`]/[`escape_text`]. `&amp;` is resolved last so
/// double-escaped input survives one round unharmed.
pub fn unescape(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

// =============================================================================
// ENCODE
// =============================================================================

/// Serialize a document model into the stored content string.
///
/// Spans are emitted in start order. Spans that fall outside the text or
/// off a character boundary are skipped with a warning rather than
/// corrupting the output; the store prevents them from arising.
pub fn encode(model: &DocumentModel) -> String {
    let mut marks: Vec<&MarkedSpan> = model.marks.iter().collect();
    marks.sort_by_key(|m| m.range.start);

    let mut out = String::with_capacity(model.text.len() + marks.len() * 64);
    let mut cursor = 0usize;

    for mark in marks {
        let Some(payload) = model.text.get(mark.range.clone()) else {
            warn!(
                subsystem = "core",
                component = "marks",
                op = "encode",
                annotation_id = %mark.id,
                "Span out of bounds, skipping marker"
            );
            continue;
        };
        if mark.range.start < cursor {
            warn!(
                subsystem = "core",
                component = "marks",
                op = "encode",
                annotation_id = %mark.id,
                "Overlapping span, skipping marker"
            );
            continue;
        }

        out.push_str(&escape_text(&model.text[cursor..mark.range.start]));
        out.push_str("<mark data-annotation-id=\"");
        out.push_str(&mark.id.to_string());
        out.push_str("\" data-comment=\"");
        out.push_str(&escape_attr(&mark.comment));
        out.push_str("\">");
        out.push_str(&escape_text(payload));
        out.push_str("</mark>");
        cursor = mark.range.end;
    }

    out.push_str(&escape_text(&model.text[cursor..]));
    out
}

// =============================================================================
// DECODE
// =============================================================================

/// Parse a stored content string back into a document model, a display
/// rendering, and the ordered annotation list.
///
/// Never fails: malformed markers degrade to plain text (rule 3) and
/// stray marker tags are stripped (rule 4).
pub fn decode(serialized: &str) -> DecodedDocument {
    let mut model = DocumentModel::default();
    let mut display = String::with_capacity(serialized.len());
    let mut annotations = Vec::new();
    let mut dropped = 0usize;
    let mut cursor = 0usize;

    for caps in MARK_RE.captures_iter(serialized) {
        let whole = caps.get(0).expect("match group 0");
        let attrs = &caps[1];
        let payload_raw = flatten_payload(&caps[2]);

        push_plain(&serialized[cursor..whole.start()], &mut model, &mut display);
        cursor = whole.end();

        let id = ATTR_ID_RE
            .captures(attrs)
            .and_then(|c| Uuid::parse_str(&c[1]).ok());
        let comment = ATTR_COMMENT_RE
            .captures(attrs)
            .map(|c| unescape(&c[1]))
            .filter(|c| !c.is_empty());

        match (id, comment) {
            (Some(id), Some(comment)) => {
                let text = unescape(&payload_raw);
                let start = model.text.len();
                model.text.push_str(&text);
                model.marks.push(MarkedSpan {
                    id,
                    comment: comment.clone(),
                    range: start..model.text.len(),
                });

                display.push_str("<span class=\"annotation\" data-annotation-id=\"");
                display.push_str(&id.to_string());
                display.push_str("\" title=\"");
                display.push_str(&escape_attr(&comment));
                display.push_str("\">");
                display.push_str(&payload_raw);
                display.push_str("</span>");

                annotations.push(AnnotationSeed {
                    id,
                    comment,
                    anchored_text: text,
                });
            }
            _ => {
                // Malformed: payload survives as plain, unstyled text.
                dropped += 1;
                push_plain(&payload_raw, &mut model, &mut display);
            }
        }
    }

    push_plain(&serialized[cursor..], &mut model, &mut display);

    if dropped > 0 {
        warn!(
            subsystem = "core",
            component = "marks",
            op = "decode",
            marker_count = annotations.len(),
            dropped_count = dropped,
            "Dropped malformed annotation markers"
        );
    }

    DecodedDocument {
        model,
        display_html: display,
        annotations,
    }
}

/// Append an escaped storage segment to both the model text (unescaped)
/// and the display rendering (as-is), stripping stray marker tags.
fn push_plain(segment: &str, model: &mut DocumentModel, display: &mut String) {
    let cleaned = STRAY_MARK_RE.replace_all(segment, "");
    display.push_str(&cleaned);
    model.text.push_str(&unescape(&cleaned));
}

/// Strip nested marker markup out of a payload, keeping its text.
fn flatten_payload(payload: &str) -> String {
    STRAY_MARK_RE.replace_all(payload, "").into_owned()
}
