//! In-memory annotation store for an editing session.
//!
//! While an entry is open for editing, this store is the single source of
//! truth for which annotations exist. It is hydrated from the mark
//! codec's decode step on load and diffed against the previously
//! persisted rows on save (see [`reconcile`]).
//!
//! Annotations are only ever created here, in an active editing session;
//! `anchored_text` is snapshotted once at creation and never re-derived
//! from the document afterwards.

use std::collections::HashSet;
use std::ops::Range;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::defaults::MAX_COMMENT_CHARS;
use crate::marks::{DecodedDocument, DocumentModel, MarkedSpan};
use crate::models::AnnotationRow;
use crate::selection::Selection;

/// A session annotation: the persisted fields plus the span it is
/// anchored to in the live document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: Uuid,
    pub comment: String,
    /// Snapshot of the selected text at creation time.
    pub anchored_text: String,
    /// Byte range into the session's document text.
    pub range: Range<usize>,
    pub created_at: DateTime<Utc>,
}

impl Annotation {
    /// The span this annotation contributes to the mark codec.
    pub fn to_span(&self) -> MarkedSpan {
        MarkedSpan {
            id: self.id,
            comment: self.comment.clone(),
            range: self.range.clone(),
        }
    }

    /// The persisted row this annotation maps to.
    pub fn to_row(&self, entry_id: Uuid) -> AnnotationRow {
        AnnotationRow {
            id: self.id,
            entry_id,
            comment: self.comment.clone(),
            selected_text: self.anchored_text.clone(),
            created_at: self.created_at,
        }
    }
}

/// The annotation create/delete operations one save must apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// In memory but not yet persisted.
    pub to_create: Vec<Annotation>,
    /// Persisted but no longer in memory.
    pub to_delete: Vec<Uuid>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty()
    }
}

/// Set difference by id between the previously persisted rows and the
/// current in-memory annotations.
///
/// Pure and recomputable: it must run before any persistence write, so a
/// mid-save failure leaves both sets intact and the same plan falls out
/// of a retry. Annotations present on both sides are untouched (there is
/// no comment-edit path once created).
pub fn reconcile(persisted: &[AnnotationRow], current: &[Annotation]) -> ReconcilePlan {
    let persisted_ids: HashSet<Uuid> = persisted.iter().map(|row| row.id).collect();
    let current_ids: HashSet<Uuid> = current.iter().map(|a| a.id).collect();

    let to_create = current
        .iter()
        .filter(|a| !persisted_ids.contains(&a.id))
        .cloned()
        .collect();
    let to_delete = persisted
        .iter()
        .filter(|row| !current_ids.contains(&row.id))
        .map(|row| row.id)
        .collect();

    ReconcilePlan {
        to_create,
        to_delete,
    }
}

// =============================================================================
// ANNOTATION STORE
// =============================================================================

/// Per-session annotation store, kept in document order (by span start).
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    annotations: Vec<Annotation>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from the mark codec's decode output. Order comes
    /// from the document, not from insertion.
    pub fn hydrate(decoded: &DecodedDocument, persisted: &[AnnotationRow]) -> Self {
        let annotations = decoded
            .model
            .marks
            .iter()
            .map(|span| Annotation {
                id: span.id,
                comment: span.comment.clone(),
                anchored_text: decoded.model.anchored_text(span).to_string(),
                range: span.range.clone(),
                // created_at is immutable once persisted; fresh markers
                // without a row get stamped now and keep it through save.
                created_at: persisted
                    .iter()
                    .find(|row| row.id == span.id)
                    .map(|row| row.created_at)
                    .unwrap_or_else(Utc::now),
            })
            .collect();
        Self { annotations }
    }

    /// Create an annotation over a settled selection.
    ///
    /// Declines (returns `None`, mutating nothing) when the trimmed
    /// comment is empty or oversized, or when the selection intersects an
    /// existing annotation's span — overlapping highlights are rejected
    /// rather than nested.
    pub fn create(&mut self, selection: &Selection, comment: &str) -> Option<&Annotation> {
        self.create_with_id(Uuid::now_v7(), selection, comment)
    }

    /// Create with a caller-supplied id (promoting an annotation carried
    /// over from a prior session or a temporary pre-save entry).
    pub fn create_with_id(
        &mut self,
        id: Uuid,
        selection: &Selection,
        comment: &str,
    ) -> Option<&Annotation> {
        let comment = comment.trim();
        if comment.is_empty() || comment.chars().count() > MAX_COMMENT_CHARS {
            return None;
        }
        if self.annotations.iter().any(|a| a.id == id) {
            return None;
        }
        if self.overlaps(&selection.range()) {
            debug!(
                subsystem = "core",
                component = "annotations",
                op = "create",
                annotation_id = %id,
                "Selection overlaps an existing annotation, declining"
            );
            return None;
        }

        let annotation = Annotation {
            id,
            comment: comment.to_string(),
            anchored_text: selection.text.clone(),
            range: selection.range(),
            created_at: Utc::now(),
        };

        let pos = self
            .annotations
            .partition_point(|a| a.range.start < annotation.range.start);
        self.annotations.insert(pos, annotation);
        Some(&self.annotations[pos])
    }

    /// Remove an annotation by id. Idempotent: unknown ids are a no-op.
    pub fn delete(&mut self, id: Uuid) -> bool {
        let before = self.annotations.len();
        self.annotations.retain(|a| a.id != id);
        self.annotations.len() != before
    }

    /// Current annotations, in document order.
    pub fn list(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn get(&self, id: Uuid) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Project the store onto a plain text into a codec document model.
    pub fn to_model(&self, text: &str) -> DocumentModel {
        DocumentModel {
            text: text.to_string(),
            marks: self.annotations.iter().map(Annotation::to_span).collect(),
        }
    }

    fn overlaps(&self, range: &Range<usize>) -> bool {
        self.annotations
            .iter()
            .any(|a| range.start < a.range.end && a.range.start < range.end)
    }
}

// =============================================================================
// SAVE GATE
// =============================================================================

/// Guards against overlapping save submissions for one editing session.
///
/// Persistence is async relative to the UI; a second "Save" while one is
/// in flight must not start a second reconcile/write sequence against the
/// same entry.
#[derive(Debug, Default)]
pub struct SaveGate {
    in_flight: bool,
}

impl SaveGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to begin a save. Returns false if one is already in flight.
    pub fn begin(&mut self) -> bool {
        if self.in_flight {
            return false;
        }
        self.in_flight = true;
        true
    }

    /// Mark the in-flight save as settled (success or failure).
    pub fn finish(&mut self) {
        self.in_flight = false;
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight
    }
}
