//! Core data models for ecliptic.
//!
//! These types are shared across all ecliptic crates and represent the
//! core domain entities: journal entries, annotations, tags, narratives,
//! and the celestial events entries hang off of.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// =============================================================================
// SESSION CONTEXT
// =============================================================================

/// Identity of the authenticated user, threaded explicitly into every
/// user-scoped operation instead of read from ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: Uuid,
}

impl SessionContext {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

// =============================================================================
// CELESTIAL EVENTS
// =============================================================================

/// Kind of calendar event an entry can be journaled against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Solar or lunar eclipse.
    Eclipse,
    /// Planetary return (e.g. Saturn return).
    Return,
    /// Transit of a planet over a natal position.
    Transit,
    /// Sign ingress.
    Ingress,
    /// Retrograde station.
    Retrograde,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Eclipse => write!(f, "eclipse"),
            Self::Return => write!(f, "return"),
            Self::Transit => write!(f, "transit"),
            Self::Ingress => write!(f, "ingress"),
            Self::Retrograde => write!(f, "retrograde"),
        }
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "eclipse" => Ok(Self::Eclipse),
            "return" => Ok(Self::Return),
            "transit" => Ok(Self::Transit),
            "ingress" => Ok(Self::Ingress),
            "retrograde" => Ok(Self::Retrograde),
            _ => Err(format!("Invalid event kind: {}", s)),
        }
    }
}

/// A calendar event (eclipse, return, transit, ...) entries attach to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CelestialEvent {
    pub id: Uuid,
    pub kind: EventKind,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    /// None for instantaneous events (stations, exact transits).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
    /// Free-form astro metadata (bodies, degrees, houses).
    pub metadata: JsonValue,
}

/// Request to create a celestial event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub kind: EventKind,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: JsonValue,
}

// =============================================================================
// TAGS
// =============================================================================

/// A tag from the fixed taxonomy (planets, houses, transit themes).
///
/// The taxonomy is seeded server-side; entries and narratives reference
/// tags by id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    /// URL-safe identifier, unique across the taxonomy.
    pub slug: String,
    /// Grouping for pickers (e.g. "planets", "houses", "themes").
    pub group_name: String,
}

// =============================================================================
// JOURNAL ENTRIES
// =============================================================================

/// A journal entry.
///
/// `content` is the stored markup string: narrative text with zero or
/// more inline annotation markers embedded (see [`crate::marks`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Event this entry was journaled against, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<Uuid>,
    pub title: String,
    pub content: String,
    /// `sha256:<hex>` hash of `content`, refreshed on every save.
    pub content_hash: String,
    pub tag_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Entry metadata for list views (no content body).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrySummary {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<Uuid>,
    pub title: String,
    /// First ~200 chars of the plain (marker-stripped) content.
    pub snippet: String,
    pub tag_ids: Vec<Uuid>,
    pub annotation_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a journal entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEntryRequest {
    pub title: String,
    /// Markup string, usually with no markers yet at creation time.
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<Uuid>,
    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
}

// =============================================================================
// ANNOTATIONS
// =============================================================================

/// A persisted annotation row, parallel to the inline marker in the
/// owning entry's content.
///
/// `selected_text` is a snapshot taken at creation time. It is never
/// re-derived from the document afterwards, so heavy edits elsewhere in
/// the entry can leave it pointing at text that no longer reads the same.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRow {
    pub id: Uuid,
    pub entry_id: Uuid,
    pub comment: String,
    pub selected_text: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// NARRATIVES
// =============================================================================

/// A user-defined narrative: a named collection of entries populated by
/// required-tag rules, manual curation, or both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Narrative {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Entries carrying every one of these tags qualify automatically.
    /// Empty means membership is manual-only.
    pub required_tags: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Narrative metadata for list views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeSummary {
    pub id: Uuid,
    pub title: String,
    pub required_tags: Vec<Uuid>,
    pub entry_count: i64,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a narrative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNarrativeRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required_tags: Vec<Uuid>,
}

/// Request to update a narrative.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateNarrativeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Replaces the whole required-tag set when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_tags: Option<Vec<Uuid>>,
}

/// A manual membership edge between an entry and a narrative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeEntryLink {
    pub narrative_id: Uuid,
    pub entry_id: Uuid,
    pub added_at: DateTime<Utc>,
}
