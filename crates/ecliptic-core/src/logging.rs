//! Structured logging field name constants for ecliptic.
//!
//! All crates use these constants for consistent structured logging
//! fields, so log aggregation tools can query by standardized names
//! across every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Failed save or query, requires user retry |
//! | WARN  | Recoverable issue (malformed marker dropped, pool pressure) |
//! | INFO  | Lifecycle events, completed saves |
//! | DEBUG | Decision points, reconciliation plans |
//! | TRACE | Per-marker and per-row iteration |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "core", "db"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "marks", "editing", "pool", "narratives"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "decode", "save", "reconcile", "resolve_membership"
pub const OPERATION: &str = "op";

/// Acting user id.
pub const USER_ID: &str = "user_id";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Journal entry UUID being operated on.
pub const ENTRY_ID: &str = "entry_id";

/// Annotation UUID being operated on.
pub const ANNOTATION_ID: &str = "annotation_id";

/// Narrative UUID being operated on.
pub const NARRATIVE_ID: &str = "narrative_id";

/// Celestial event UUID being operated on.
pub const EVENT_ID: &str = "event_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a query.
pub const RESULT_COUNT: &str = "result_count";

/// Number of markers decoded from a content string.
pub const MARKER_COUNT: &str = "marker_count";

/// Number of malformed markers dropped during decode.
pub const DROPPED_COUNT: &str = "dropped_count";

/// Annotation rows inserted by a save.
pub const CREATED_COUNT: &str = "created_count";

/// Annotation rows deleted by a save.
pub const DELETED_COUNT: &str = "deleted_count";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Which save phase failed ("content" or "annotations").
pub const SAVE_PHASE: &str = "save_phase";
