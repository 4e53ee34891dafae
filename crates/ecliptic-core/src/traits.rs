//! Core traits for ecliptic abstractions.
//!
//! These traits define the persistence interfaces the database layer
//! implements, keeping the content model and resolvers testable without
//! a live store.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// ENTRY REPOSITORY
// =============================================================================

/// Request for listing journal entries.
#[derive(Debug, Clone, Default)]
pub struct ListEntriesRequest {
    /// Restrict to entries attached to this event.
    pub event_id: Option<Uuid>,
    /// Require every one of these tags.
    pub tag_ids: Vec<Uuid>,
    /// Case-insensitive title substring match.
    pub title_query: Option<String>,
    /// Maximum results.
    pub limit: Option<i64>,
    /// Pagination offset.
    pub offset: Option<i64>,
}

/// Response for listing journal entries.
#[derive(Debug, Clone)]
pub struct ListEntriesResponse {
    pub entries: Vec<EntrySummary>,
    pub total: i64,
}

/// Repository for journal entry persistence.
#[async_trait]
pub trait EntryRepository: Send + Sync {
    /// Insert a new entry for the session user.
    async fn insert(&self, ctx: &SessionContext, req: CreateEntryRequest) -> Result<Uuid>;

    /// Fetch a full entry (content, tags) by id.
    async fn fetch(&self, ctx: &SessionContext, id: Uuid) -> Result<Entry>;

    /// List the session user's entries.
    async fn list(&self, ctx: &SessionContext, req: ListEntriesRequest)
        -> Result<ListEntriesResponse>;

    /// Overwrite an entry's content (and its content hash).
    async fn update_content(&self, ctx: &SessionContext, id: Uuid, content: &str) -> Result<()>;

    /// Update an entry's title.
    async fn update_title(&self, ctx: &SessionContext, id: Uuid, title: &str) -> Result<()>;

    /// Delete an entry, cascading to its annotations, tag rows, and
    /// manual narrative edges.
    async fn delete(&self, ctx: &SessionContext, id: Uuid) -> Result<()>;
}

// =============================================================================
// ANNOTATION REPOSITORY
// =============================================================================

/// Repository for the annotations table, parallel to inline markers.
#[async_trait]
pub trait AnnotationRepository: Send + Sync {
    /// All annotation rows for an entry, oldest first.
    async fn list_for_entry(&self, entry_id: Uuid) -> Result<Vec<AnnotationRow>>;

    /// Insert the rows a reconciliation marked as created.
    async fn insert_many(&self, rows: &[AnnotationRow]) -> Result<()>;

    /// Delete the ids a reconciliation marked as removed.
    async fn delete_many(&self, entry_id: Uuid, ids: &[Uuid]) -> Result<()>;

    /// Remove every annotation owned by an entry.
    async fn delete_for_entry(&self, entry_id: Uuid) -> Result<()>;
}

// =============================================================================
// TAG REPOSITORY
// =============================================================================

/// Repository for the fixed tag taxonomy and entry tagging.
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// The whole taxonomy, grouped then alphabetical.
    async fn list(&self) -> Result<Vec<Tag>>;

    /// Tag ids attached to an entry.
    async fn get_entry_tags(&self, entry_id: Uuid) -> Result<Vec<Uuid>>;

    /// Replace an entry's tag set.
    async fn set_entry_tags(&self, entry_id: Uuid, tag_ids: &[Uuid]) -> Result<()>;
}

// =============================================================================
// NARRATIVE REPOSITORY
// =============================================================================

/// Repository for narratives and their manual membership edges.
#[async_trait]
pub trait NarrativeRepository: Send + Sync {
    async fn insert(&self, ctx: &SessionContext, req: CreateNarrativeRequest) -> Result<Uuid>;

    async fn fetch(&self, ctx: &SessionContext, id: Uuid) -> Result<Narrative>;

    /// All of the session user's narratives.
    async fn list(&self, ctx: &SessionContext) -> Result<Vec<NarrativeSummary>>;

    async fn update(
        &self,
        ctx: &SessionContext,
        id: Uuid,
        req: UpdateNarrativeRequest,
    ) -> Result<()>;

    /// Delete a narrative, cascading to its manual edges. Automatic
    /// (tag-derived) qualification is untouched by definition.
    async fn delete(&self, ctx: &SessionContext, id: Uuid) -> Result<()>;

    /// Create a manual membership edge. Idempotent.
    async fn link_entry(&self, narrative_id: Uuid, entry_id: Uuid) -> Result<()>;

    /// Remove a manual membership edge. Idempotent.
    async fn unlink_entry(&self, narrative_id: Uuid, entry_id: Uuid) -> Result<()>;

    /// Narrative ids manually linked to an entry.
    async fn manual_edges_for_entry(&self, entry_id: Uuid) -> Result<Vec<Uuid>>;

    /// Member entries of a narrative: the union of tag-qualified and
    /// manually linked entries, newest first.
    async fn member_entries(
        &self,
        ctx: &SessionContext,
        narrative_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EntrySummary>>;
}

// =============================================================================
// EVENT REPOSITORY
// =============================================================================

/// Repository for the celestial event calendar.
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn insert(&self, req: CreateEventRequest) -> Result<Uuid>;

    async fn fetch(&self, id: Uuid) -> Result<CelestialEvent>;

    /// Events overlapping the given window, soonest first.
    async fn list_in_range(
        &self,
        from: chrono::DateTime<chrono::Utc>,
        to: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<CelestialEvent>>;
}
