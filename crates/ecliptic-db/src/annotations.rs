//! Annotation row repository implementation.
//!
//! Rows here are the persisted half of the annotation model; the inline
//! markers in the owning entry's content are the other half. The editing
//! session (see [`crate::editing`]) keeps the two in step.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use ecliptic_core::{AnnotationRepository, AnnotationRow, Error, Result};

/// PostgreSQL implementation of AnnotationRepository.
pub struct PgAnnotationRepository {
    pool: Pool<Postgres>,
}

impl PgAnnotationRepository {
    /// Create a new PgAnnotationRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_row(row: sqlx::postgres::PgRow) -> AnnotationRow {
    AnnotationRow {
        id: row.get("id"),
        entry_id: row.get("entry_id"),
        comment: row.get("comment"),
        selected_text: row.get("selected_text"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl AnnotationRepository for PgAnnotationRepository {
    async fn list_for_entry(&self, entry_id: Uuid) -> Result<Vec<AnnotationRow>> {
        let rows = sqlx::query(
            "SELECT id, entry_id, comment, selected_text, created_at
             FROM annotation
             WHERE entry_id = $1
             ORDER BY created_at, id",
        )
        .bind(entry_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(map_row).collect())
    }

    async fn insert_many(&self, rows: &[AnnotationRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        for row in rows {
            sqlx::query(
                "INSERT INTO annotation (id, entry_id, comment, selected_text, created_at)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(row.id)
            .bind(row.entry_id)
            .bind(&row.comment)
            .bind(&row.selected_text)
            .bind(row.created_at)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }
        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn delete_many(&self, entry_id: Uuid, ids: &[Uuid]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        sqlx::query("DELETE FROM annotation WHERE entry_id = $1 AND id = ANY($2)")
            .bind(entry_id)
            .bind(ids)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn delete_for_entry(&self, entry_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM annotation WHERE entry_id = $1")
            .bind(entry_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}
