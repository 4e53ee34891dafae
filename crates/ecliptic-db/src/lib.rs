//! # ecliptic-db
//!
//! PostgreSQL database layer for ecliptic.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for entries, annotations, tags,
//!   narratives, and celestial events
//! - The editing-session orchestration (decode on load, reconcile and
//!   two-phase write on save)
//!
//! ## Example
//!
//! ```rust,ignore
//! use ecliptic_db::{Database, EditingSession};
//! use ecliptic_core::SessionContext;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/ecliptic").await?;
//!     let ctx = SessionContext::new(user_id);
//!
//!     let mut session =
//!         EditingSession::open(&ctx, entry_id, &db.entries, &db.annotations).await?;
//!     // ... annotate, edit ...
//!     session.save(&ctx, &db.entries, &db.annotations).await?;
//!     Ok(())
//! }
//! ```

pub mod annotations;
pub mod editing;
pub mod entries;
pub mod events;
pub mod narratives;
pub mod pool;
pub mod tags;

// Re-export core types
pub use ecliptic_core::*;

// Re-export repository implementations
pub use annotations::PgAnnotationRepository;
pub use editing::EditingSession;
pub use entries::{hash_content, PgEntryRepository};
pub use events::PgEventRepository;
pub use narratives::PgNarrativeRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use tags::PgTagRepository;

use sqlx::PgPool;

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Convenience bundle of all repositories over one shared pool.
pub struct Database {
    pub pool: PgPool,
    pub entries: PgEntryRepository,
    pub annotations: PgAnnotationRepository,
    pub tags: PgTagRepository,
    pub narratives: PgNarrativeRepository,
    pub events: PgEventRepository,
}

impl Database {
    /// Connect with default pool configuration.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url).await?;
        Ok(Self::from_pool(pool))
    }

    /// Build the repository bundle over an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            entries: PgEntryRepository::new(pool.clone()),
            annotations: PgAnnotationRepository::new(pool.clone()),
            tags: PgTagRepository::new(pool.clone()),
            narratives: PgNarrativeRepository::new(pool.clone()),
            events: PgEventRepository::new(pool.clone()),
            pool,
        }
    }
}
