//! # ecliptic-core
//!
//! Core types, traits, and the annotation content model for ecliptic —
//! a journaling application layered on astrological calendar events.
//!
//! This crate holds everything that does not touch the database: the
//! inline-marker codec, the selection tracker, the per-session annotation
//! store with its save reconciliation, and the narrative membership
//! resolver.

pub mod annotations;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod marks;
pub mod models;
pub mod narratives;
pub mod selection;
pub mod traits;

// Re-export commonly used types at crate root
pub use annotations::{reconcile, Annotation, AnnotationStore, ReconcilePlan, SaveGate};
pub use error::{Error, Result, SavePhase};
pub use marks::{decode, encode, AnnotationSeed, DecodedDocument, DocumentModel, MarkedSpan};
pub use models::*;
pub use narratives::{
    auto_qualifies, diff_manual_edges, resolve, EdgeChanges, MembershipState,
};
pub use selection::{normalize, RawSelection, Selection, SelectionTracker};
pub use traits::*;
