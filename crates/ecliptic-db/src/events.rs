//! Celestial event repository implementation.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use ecliptic_core::{
    CelestialEvent, CreateEventRequest, Error, EventKind, EventRepository, Result,
};

/// PostgreSQL implementation of EventRepository.
pub struct PgEventRepository {
    pool: Pool<Postgres>,
}

impl PgEventRepository {
    /// Create a new PgEventRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_event(row: sqlx::postgres::PgRow) -> Result<CelestialEvent> {
    let kind: String = row.get("kind");
    let kind = EventKind::from_str(&kind).map_err(Error::Serialization)?;
    Ok(CelestialEvent {
        id: row.get("id"),
        kind,
        title: row.get("title"),
        starts_at: row.get("starts_at"),
        ends_at: row.get("ends_at"),
        metadata: row.get("metadata"),
    })
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn insert(&self, req: CreateEventRequest) -> Result<Uuid> {
        let id = Uuid::now_v7();

        sqlx::query(
            "INSERT INTO celestial_event (id, kind, title, starts_at, ends_at, metadata)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(req.kind.to_string())
        .bind(&req.title)
        .bind(req.starts_at)
        .bind(req.ends_at)
        .bind(&req.metadata)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    async fn fetch(&self, id: Uuid) -> Result<CelestialEvent> {
        let row = sqlx::query(
            "SELECT id, kind, title, starts_at, ends_at, metadata
             FROM celestial_event WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        map_event(row.ok_or(Error::EventNotFound(id))?)
    }

    async fn list_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CelestialEvent>> {
        let rows = sqlx::query(
            "SELECT id, kind, title, starts_at, ends_at, metadata
             FROM celestial_event
             WHERE starts_at <= $2 AND COALESCE(ends_at, starts_at) >= $1
             ORDER BY starts_at",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter().map(map_event).collect()
    }
}
