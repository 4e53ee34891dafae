//! Centralized default constants for ecliptic.
//!
//! Shared defaults live here instead of being scattered as magic numbers
//! across the crates.

use std::time::Duration;

// =============================================================================
// SELECTION TRACKING
// =============================================================================

/// Settle delay before a text selection is surfaced to the annotation UI.
///
/// Selections change rapidly while the user drags; the tracker waits this
/// long after the last change before reporting a stable selection.
pub const SELECTION_SETTLE_MS: u64 = 300;

/// [`SELECTION_SETTLE_MS`] as a `Duration`.
pub const SELECTION_SETTLE: Duration = Duration::from_millis(SELECTION_SETTLE_MS);

// =============================================================================
// ANNOTATIONS
// =============================================================================

/// Maximum accepted comment length in characters.
pub const MAX_COMMENT_CHARS: usize = 2000;

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for list endpoints.
pub const PAGE_LIMIT: i64 = 50;

/// Hard ceiling on requested page sizes.
pub const PAGE_LIMIT_MAX: i64 = 200;
