//! Tag taxonomy repository implementation.
//!
//! The taxonomy is fixed (seeded server-side); this repository only reads
//! it and maintains the entry-to-tag join rows.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use ecliptic_core::{Error, Result, Tag, TagRepository};

/// PostgreSQL implementation of TagRepository.
pub struct PgTagRepository {
    pool: Pool<Postgres>,
}

impl PgTagRepository {
    /// Create a new PgTagRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagRepository for PgTagRepository {
    async fn list(&self) -> Result<Vec<Tag>> {
        let rows = sqlx::query(
            "SELECT id, name, slug, group_name FROM tag ORDER BY group_name, name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|r| Tag {
                id: r.get("id"),
                name: r.get("name"),
                slug: r.get("slug"),
                group_name: r.get("group_name"),
            })
            .collect())
    }

    async fn get_entry_tags(&self, entry_id: Uuid) -> Result<Vec<Uuid>> {
        let rows = sqlx::query("SELECT tag_id FROM entry_tag WHERE entry_id = $1")
            .bind(entry_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.into_iter().map(|r| r.get("tag_id")).collect())
    }

    async fn set_entry_tags(&self, entry_id: Uuid, tag_ids: &[Uuid]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query("DELETE FROM entry_tag WHERE entry_id = $1")
            .bind(entry_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        for tag_id in tag_ids {
            sqlx::query(
                "INSERT INTO entry_tag (entry_id, tag_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(entry_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }
}
