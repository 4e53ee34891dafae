//! Error types for ecliptic.

use thiserror::Error;

/// Result type alias using ecliptic's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Phase of a two-phase entry save.
///
/// Content and annotation rows are written in two independent calls, so a
/// failed save reports which write did not land. An `Annotations` failure
/// means the content update already committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePhase {
    /// Writing the encoded content string (and content hash).
    Content,
    /// Applying annotation row inserts/deletes from reconciliation.
    Annotations,
}

impl std::fmt::Display for SavePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Content => write!(f, "content"),
            Self::Annotations => write!(f, "annotations"),
        }
    }
}

/// Core error type for ecliptic operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Journal entry not found
    #[error("Entry not found: {0}")]
    EntryNotFound(uuid::Uuid),

    /// Narrative not found
    #[error("Narrative not found: {0}")]
    NarrativeNotFound(uuid::Uuid),

    /// Celestial event not found
    #[error("Event not found: {0}")]
    EventNotFound(uuid::Uuid),

    /// Entry save failed during one of its two write phases
    #[error("Save failed during {phase} phase: {reason}")]
    SaveFailed { phase: SavePhase, reason: String },

    /// A save is already in flight for this editing session
    #[error("Save already in progress for entry {0}")]
    SaveInProgress(uuid::Uuid),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display_entry_not_found() {
        let id = Uuid::nil();
        let err = Error::EntryNotFound(id);
        assert_eq!(err.to_string(), format!("Entry not found: {}", id));
    }

    #[test]
    fn test_error_display_narrative_not_found() {
        let id = Uuid::new_v4();
        let err = Error::NarrativeNotFound(id);
        assert!(err.to_string().contains(&id.to_string()));
    }

    #[test]
    fn test_error_display_save_failed_names_phase() {
        let err = Error::SaveFailed {
            phase: SavePhase::Annotations,
            reason: "connection reset".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Save failed during annotations phase: connection reset"
        );
    }

    #[test]
    fn test_save_phase_display() {
        assert_eq!(SavePhase::Content.to_string(), "content");
        assert_eq!(SavePhase::Annotations.to_string(), "annotations");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
