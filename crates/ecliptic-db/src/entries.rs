//! Journal entry repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use ecliptic_core::{
    marks, CreateEntryRequest, Entry, EntryRepository, EntrySummary, Error, ListEntriesRequest,
    ListEntriesResponse, Result, SessionContext,
};

use crate::escape_like;

/// PostgreSQL implementation of EntryRepository.
pub struct PgEntryRepository {
    pool: Pool<Postgres>,
}

impl PgEntryRepository {
    /// Create a new PgEntryRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Compute the `sha256:<hex>` hash of a content string.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

/// Derive a list snippet from stored content: markers stripped, first
/// 200 characters.
fn snippet_of(content: &str) -> String {
    marks::decode(content).model.text.chars().take(200).collect()
}

/// Append tag-subset filters: one EXISTS per required tag.
fn add_tag_filters(query: &mut String, param_idx: &mut usize, tag_count: usize) {
    for _ in 0..tag_count {
        query.push_str(&format!(
            "AND EXISTS (SELECT 1 FROM entry_tag et WHERE et.entry_id = e.id AND et.tag_id = ${}) ",
            param_idx
        ));
        *param_idx += 1;
    }
}

fn map_row_to_summary(row: sqlx::postgres::PgRow) -> EntrySummary {
    let content: String = row.get("content");
    EntrySummary {
        id: row.get("id"),
        event_id: row.get("event_id"),
        title: row.get("title"),
        snippet: snippet_of(&content),
        tag_ids: row.get("tag_ids"),
        annotation_count: row.get("annotation_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SUMMARY_COLUMNS: &str = r#"
    e.id, e.event_id, e.title, e.content, e.created_at, e.updated_at,
    COALESCE((SELECT array_agg(et.tag_id) FROM entry_tag et WHERE et.entry_id = e.id), '{}') as tag_ids,
    COALESCE((SELECT COUNT(*) FROM annotation a WHERE a.entry_id = e.id), 0) as annotation_count
"#;

#[async_trait]
impl EntryRepository for PgEntryRepository {
    async fn insert(&self, ctx: &SessionContext, req: CreateEntryRequest) -> Result<Uuid> {
        let id = Uuid::now_v7();
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query(
            "INSERT INTO entry (id, user_id, event_id, title, content, content_hash, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7)",
        )
        .bind(id)
        .bind(ctx.user_id)
        .bind(req.event_id)
        .bind(&req.title)
        .bind(&req.content)
        .bind(hash_content(&req.content))
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        for tag_id in &req.tag_ids {
            sqlx::query(
                "INSERT INTO entry_tag (entry_id, tag_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;

        tracing::info!(
            subsystem = "db",
            component = "entries",
            op = "insert",
            entry_id = %id,
            user_id = %ctx.user_id,
            "Created journal entry"
        );
        Ok(id)
    }

    async fn fetch(&self, ctx: &SessionContext, id: Uuid) -> Result<Entry> {
        let row = sqlx::query(
            r#"
            SELECT e.id, e.user_id, e.event_id, e.title, e.content, e.content_hash,
                   e.created_at, e.updated_at,
                   COALESCE((SELECT array_agg(et.tag_id) FROM entry_tag et WHERE et.entry_id = e.id), '{}') as tag_ids
            FROM entry e
            WHERE e.id = $1 AND e.user_id = $2
            "#,
        )
        .bind(id)
        .bind(ctx.user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        let row = row.ok_or(Error::EntryNotFound(id))?;
        Ok(Entry {
            id: row.get("id"),
            user_id: row.get("user_id"),
            event_id: row.get("event_id"),
            title: row.get("title"),
            content: row.get("content"),
            content_hash: row.get("content_hash"),
            tag_ids: row.get("tag_ids"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    async fn list(
        &self,
        ctx: &SessionContext,
        req: ListEntriesRequest,
    ) -> Result<ListEntriesResponse> {
        let limit = req.limit.unwrap_or(ecliptic_core::defaults::PAGE_LIMIT);
        let limit = limit.clamp(0, ecliptic_core::defaults::PAGE_LIMIT_MAX);
        let offset = req.offset.unwrap_or(0).max(0);

        let mut filters = String::new();
        let mut param_idx = 2; // $1 is user_id

        if req.event_id.is_some() {
            filters.push_str(&format!("AND e.event_id = ${} ", param_idx));
            param_idx += 1;
        }
        add_tag_filters(&mut filters, &mut param_idx, req.tag_ids.len());
        if req.title_query.is_some() {
            filters.push_str(&format!(
                "AND e.title ILIKE '%' || ${} || '%' ESCAPE '\\' ",
                param_idx
            ));
            param_idx += 1;
        }

        let list_sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM entry e WHERE e.user_id = $1 {filters}
             ORDER BY e.created_at DESC LIMIT ${} OFFSET ${}",
            param_idx,
            param_idx + 1
        );
        let count_sql =
            format!("SELECT COUNT(*) as total FROM entry e WHERE e.user_id = $1 {filters}");

        let escaped_title = req.title_query.as_deref().map(escape_like);

        let mut list_query = sqlx::query(&list_sql).bind(ctx.user_id);
        let mut count_query = sqlx::query(&count_sql).bind(ctx.user_id);
        if let Some(event_id) = req.event_id {
            list_query = list_query.bind(event_id);
            count_query = count_query.bind(event_id);
        }
        for tag_id in &req.tag_ids {
            list_query = list_query.bind(tag_id);
            count_query = count_query.bind(tag_id);
        }
        if let Some(ref title) = escaped_title {
            list_query = list_query.bind(title);
            count_query = count_query.bind(title);
        }
        list_query = list_query.bind(limit).bind(offset);

        let rows = list_query
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        let total: i64 = count_query
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?
            .get("total");

        Ok(ListEntriesResponse {
            entries: rows.into_iter().map(map_row_to_summary).collect(),
            total,
        })
    }

    async fn update_content(&self, ctx: &SessionContext, id: Uuid, content: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE entry SET content = $1, content_hash = $2, updated_at = $3
             WHERE id = $4 AND user_id = $5",
        )
        .bind(content)
        .bind(hash_content(content))
        .bind(Utc::now())
        .bind(id)
        .bind(ctx.user_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::EntryNotFound(id));
        }
        Ok(())
    }

    async fn update_title(&self, ctx: &SessionContext, id: Uuid, title: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE entry SET title = $1, updated_at = $2 WHERE id = $3 AND user_id = $4",
        )
        .bind(title)
        .bind(Utc::now())
        .bind(id)
        .bind(ctx.user_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::EntryNotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, ctx: &SessionContext, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // Owned rows first: annotations, tag rows, manual narrative edges.
        sqlx::query("DELETE FROM annotation WHERE entry_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        sqlx::query("DELETE FROM entry_tag WHERE entry_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        sqlx::query("DELETE FROM narrative_entry WHERE entry_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        let result = sqlx::query("DELETE FROM entry WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(ctx.user_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            // Rolls back the dependent deletes above.
            return Err(Error::EntryNotFound(id));
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_content_is_prefixed_and_stable() {
        let h1 = hash_content("the moon");
        let h2 = hash_content("the moon");
        assert!(h1.starts_with("sha256:"));
        assert_eq!(h1, h2);
        assert_ne!(h1, hash_content("the sun"));
    }

    #[test]
    fn test_snippet_strips_markers() {
        let content = "a <mark data-annotation-id=\"00000000-0000-7000-8000-000000000000\" data-comment=\"c\">b</mark> c";
        assert_eq!(snippet_of(content), "a b c");
    }

    #[test]
    fn test_snippet_truncates_at_200_chars() {
        let content = "x".repeat(500);
        assert_eq!(snippet_of(&content).chars().count(), 200);
    }

    #[test]
    fn test_add_tag_filters_numbers_params() {
        let mut query = String::new();
        let mut idx = 2;
        add_tag_filters(&mut query, &mut idx, 2);
        assert!(query.contains("et.tag_id = $2"));
        assert!(query.contains("et.tag_id = $3"));
        assert_eq!(idx, 4);
    }
}
