//! Narrative repository implementation.
//!
//! Membership is the union of tag-derived qualification and manual
//! edges. Listing members resolves that union in SQL; saving a
//! membership edit goes through the core resolver so only the manually
//! controllable edges are ever written.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use ecliptic_core::{
    narratives as resolver, CreateNarrativeRequest, EdgeChanges, EntrySummary, Error, Narrative,
    NarrativeRepository, NarrativeSummary, Result, SessionContext, UpdateNarrativeRequest,
};

/// Membership condition shared by member listing and counting: a manual
/// edge exists, or the narrative's required tags are non-empty and every
/// one of them is on the entry.
const MEMBER_CONDITION: &str = r#"
    EXISTS (
        SELECT 1 FROM narrative_entry ne
        WHERE ne.narrative_id = n.id AND ne.entry_id = e.id
    )
    OR (
        cardinality(n.required_tags) > 0
        AND NOT EXISTS (
            SELECT 1 FROM unnest(n.required_tags) AS rt(tag_id)
            WHERE NOT EXISTS (
                SELECT 1 FROM entry_tag et
                WHERE et.entry_id = e.id AND et.tag_id = rt.tag_id
            )
        )
    )
"#;

/// PostgreSQL implementation of NarrativeRepository.
pub struct PgNarrativeRepository {
    pool: Pool<Postgres>,
}

impl PgNarrativeRepository {
    /// Create a new PgNarrativeRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Persist a membership edit for an entry.
    ///
    /// `checked` is the set of narrative ids the user left selected in
    /// the membership UI. The edit is diffed through the core resolver,
    /// so narratives the entry auto-qualifies for are never linked or
    /// unlinked here regardless of how the UI rendered them.
    pub async fn save_membership(
        &self,
        ctx: &SessionContext,
        entry_id: Uuid,
        checked: &HashSet<Uuid>,
    ) -> Result<EdgeChanges> {
        let narratives = self.fetch_all(ctx).await?;

        let entry_tags: HashSet<Uuid> =
            sqlx::query("SELECT tag_id FROM entry_tag WHERE entry_id = $1")
                .bind(entry_id)
                .fetch_all(&self.pool)
                .await
                .map_err(Error::Database)?
                .into_iter()
                .map(|r| r.get("tag_id"))
                .collect();

        let existing_manual: HashSet<Uuid> = self
            .manual_edges_for_entry(entry_id)
            .await?
            .into_iter()
            .collect();

        let changes =
            resolver::diff_manual_edges(checked, &entry_tags, &narratives, &existing_manual);

        for narrative_id in &changes.to_link {
            self.link_entry(*narrative_id, entry_id).await?;
        }
        for narrative_id in &changes.to_unlink {
            self.unlink_entry(*narrative_id, entry_id).await?;
        }

        tracing::debug!(
            subsystem = "db",
            component = "narratives",
            op = "save_membership",
            entry_id = %entry_id,
            created_count = changes.to_link.len(),
            deleted_count = changes.to_unlink.len(),
            "Applied manual membership edges"
        );
        Ok(changes)
    }

    /// All of the user's narratives with their required-tag sets.
    async fn fetch_all(&self, ctx: &SessionContext) -> Result<Vec<Narrative>> {
        let rows = sqlx::query(
            "SELECT id, user_id, title, description, required_tags, created_at, updated_at
             FROM narrative WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(ctx.user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(map_narrative).collect())
    }
}

fn map_narrative(row: sqlx::postgres::PgRow) -> Narrative {
    Narrative {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        description: row.get("description"),
        required_tags: row.get("required_tags"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl NarrativeRepository for PgNarrativeRepository {
    async fn insert(&self, ctx: &SessionContext, req: CreateNarrativeRequest) -> Result<Uuid> {
        let id = Uuid::now_v7();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO narrative (id, user_id, title, description, required_tags, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6)",
        )
        .bind(id)
        .bind(ctx.user_id)
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.required_tags)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    async fn fetch(&self, ctx: &SessionContext, id: Uuid) -> Result<Narrative> {
        let row = sqlx::query(
            "SELECT id, user_id, title, description, required_tags, created_at, updated_at
             FROM narrative WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(ctx.user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(map_narrative).ok_or(Error::NarrativeNotFound(id))
    }

    async fn list(&self, ctx: &SessionContext) -> Result<Vec<NarrativeSummary>> {
        let sql = format!(
            "SELECT n.id, n.title, n.required_tags, n.updated_at,
                    COALESCE((
                        SELECT COUNT(*) FROM entry e
                        WHERE e.user_id = n.user_id AND ({MEMBER_CONDITION})
                    ), 0) as entry_count
             FROM narrative n
             WHERE n.user_id = $1
             ORDER BY n.title"
        );
        let rows = sqlx::query(&sql)
            .bind(ctx.user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|r| NarrativeSummary {
                id: r.get("id"),
                title: r.get("title"),
                required_tags: r.get("required_tags"),
                entry_count: r.get("entry_count"),
                updated_at: r.get("updated_at"),
            })
            .collect())
    }

    async fn update(
        &self,
        ctx: &SessionContext,
        id: Uuid,
        req: UpdateNarrativeRequest,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE narrative
             SET title = COALESCE($1, title),
                 description = COALESCE($2, description),
                 required_tags = COALESCE($3, required_tags),
                 updated_at = $4
             WHERE id = $5 AND user_id = $6",
        )
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.required_tags)
        .bind(Utc::now())
        .bind(id)
        .bind(ctx.user_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NarrativeNotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, ctx: &SessionContext, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query("DELETE FROM narrative_entry WHERE narrative_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        let result = sqlx::query("DELETE FROM narrative WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(ctx.user_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NarrativeNotFound(id));
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn link_entry(&self, narrative_id: Uuid, entry_id: Uuid) -> Result<()> {
        sqlx::query(
            "INSERT INTO narrative_entry (narrative_id, entry_id, added_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (narrative_id, entry_id) DO NOTHING",
        )
        .bind(narrative_id)
        .bind(entry_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn unlink_entry(&self, narrative_id: Uuid, entry_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM narrative_entry WHERE narrative_id = $1 AND entry_id = $2")
            .bind(narrative_id)
            .bind(entry_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn manual_edges_for_entry(&self, entry_id: Uuid) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            "SELECT narrative_id FROM narrative_entry WHERE entry_id = $1",
        )
        .bind(entry_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(|r| r.get("narrative_id")).collect())
    }

    async fn member_entries(
        &self,
        ctx: &SessionContext,
        narrative_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EntrySummary>> {
        let sql = format!(
            "SELECT e.id, e.event_id, e.title, e.content, e.created_at, e.updated_at,
                    COALESCE((SELECT array_agg(et.tag_id) FROM entry_tag et WHERE et.entry_id = e.id), '{{}}') as tag_ids,
                    COALESCE((SELECT COUNT(*) FROM annotation a WHERE a.entry_id = e.id), 0) as annotation_count
             FROM entry e
             JOIN narrative n ON n.id = $1
             WHERE e.user_id = $2 AND n.user_id = $2 AND ({MEMBER_CONDITION})
             ORDER BY e.created_at DESC
             LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query(&sql)
            .bind(narrative_id)
            .bind(ctx.user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let content: String = row.get("content");
                EntrySummary {
                    id: row.get("id"),
                    event_id: row.get("event_id"),
                    title: row.get("title"),
                    snippet: ecliptic_core::marks::decode(&content)
                        .model
                        .text
                        .chars()
                        .take(200)
                        .collect(),
                    tag_ids: row.get("tag_ids"),
                    annotation_count: row.get("annotation_count"),
                    created_at: row.get("created_at"),
                    updated_at: row.get("updated_at"),
                }
            })
            .collect())
    }
}
