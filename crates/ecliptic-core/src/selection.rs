//! Text-selection tracking for the annotation editor.
//!
//! The editing surface reports raw selection changes continuously while
//! the user drags or shift-navigates. This module normalizes those events
//! into a stable [`Selection`] descriptor and debounces them so the
//! "add annotation" affordance does not flicker mid-drag.
//!
//! The tracker is a pure state machine over injected instants: callers
//! pass `Instant::now()` into [`SelectionTracker::observe`] and
//! [`SelectionTracker::settled`], so there are no timers and the debounce
//! is directly testable.

use std::ops::Range;
use std::time::{Duration, Instant};

use crate::defaults::SELECTION_SETTLE;

/// A raw selection change as reported by the editing surface.
///
/// Offsets are byte offsets into the document text and may arrive
/// reversed (anchor after focus) for backwards drags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSelection {
    pub anchor: usize,
    pub focus: usize,
}

impl RawSelection {
    pub fn new(anchor: usize, focus: usize) -> Self {
        Self { anchor, focus }
    }
}

/// A normalized selection: `start < end`, `text` is the exact substring
/// between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Selection {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Normalize a raw selection against the document text.
///
/// Returns `None` for collapsed selections, selections that are
/// whitespace-only after trimming, and offsets that fall outside the
/// text or off a character boundary. Offsets are never trimmed: a
/// selection of `"  hello "` keeps its original bounds, only selections
/// with no non-whitespace content at all are rejected.
pub fn normalize(raw: RawSelection, text: &str) -> Option<Selection> {
    let (start, end) = if raw.anchor <= raw.focus {
        (raw.anchor, raw.focus)
    } else {
        (raw.focus, raw.anchor)
    };

    if start == end {
        return None;
    }

    let selected = text.get(start..end)?;
    if selected.trim().is_empty() {
        return None;
    }

    Some(Selection {
        start,
        end,
        text: selected.to_string(),
    })
}

/// Debouncing selection observer.
///
/// Feed every selection-change event through [`observe`](Self::observe);
/// read the stable result with [`settled`](Self::settled), which yields
/// the selection only once the settle delay has elapsed since the last
/// change.
#[derive(Debug, Clone)]
pub struct SelectionTracker {
    settle: Duration,
    pending: Option<Selection>,
    changed_at: Option<Instant>,
}

impl Default for SelectionTracker {
    fn default() -> Self {
        Self::new(SELECTION_SETTLE)
    }
}

impl SelectionTracker {
    pub fn new(settle: Duration) -> Self {
        Self {
            settle,
            pending: None,
            changed_at: None,
        }
    }

    /// Record a selection-change event at `at`.
    ///
    /// `raw = None` means the surface reported the selection cleared.
    pub fn observe(&mut self, raw: Option<RawSelection>, text: &str, at: Instant) {
        self.pending = raw.and_then(|r| normalize(r, text));
        self.changed_at = Some(at);
    }

    /// The current selection, once it has settled.
    ///
    /// Returns `None` while a drag is still in motion (settle delay not
    /// yet elapsed) or when there is no actionable selection.
    pub fn settled(&self, at: Instant) -> Option<&Selection> {
        let changed_at = self.changed_at?;
        if at.duration_since(changed_at) < self.settle {
            return None;
        }
        self.pending.as_ref()
    }

    /// The latest normalized selection, ignoring the settle delay.
    ///
    /// Surfacing the affordance early from this is a UX refinement, not
    /// an error.
    pub fn current(&self) -> Option<&Selection> {
        self.pending.as_ref()
    }

    /// Drop any pending selection (e.g. on editor blur).
    pub fn clear(&mut self) {
        self.pending = None;
        self.changed_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "  hello  world  ";

    #[test]
    fn test_normalize_collapsed_is_none() {
        assert_eq!(normalize(RawSelection::new(4, 4), DOC), None);
    }

    #[test]
    fn test_normalize_single_space_is_none() {
        // DOC[1..2] is a single space.
        assert_eq!(normalize(RawSelection::new(1, 2), DOC), None);
    }

    #[test]
    fn test_normalize_whitespace_only_is_none() {
        assert_eq!(normalize(RawSelection::new(7, 9), DOC), None);
    }

    #[test]
    fn test_normalize_keeps_offsets_and_surrounding_spaces() {
        // " hello " — whitespace-padded but contains content, so it is
        // kept with its original bounds intact.
        let sel = normalize(RawSelection::new(1, 8), DOC).unwrap();
        assert_eq!(sel.start, 1);
        assert_eq!(sel.end, 8);
        assert_eq!(sel.text, " hello ");
    }

    #[test]
    fn test_normalize_exact_word() {
        let sel = normalize(RawSelection::new(2, 7), DOC).unwrap();
        assert_eq!(sel.text, "hello");
    }

    #[test]
    fn test_normalize_swaps_reversed_offsets() {
        let sel = normalize(RawSelection::new(7, 2), DOC).unwrap();
        assert_eq!((sel.start, sel.end), (2, 7));
        assert_eq!(sel.text, "hello");
    }

    #[test]
    fn test_normalize_out_of_bounds_is_none() {
        assert_eq!(normalize(RawSelection::new(0, 999), DOC), None);
    }

    #[test]
    fn test_normalize_non_char_boundary_is_none() {
        let doc = "éclipse";
        // Offset 1 splits the two-byte é.
        assert_eq!(normalize(RawSelection::new(1, 4), doc), None);
    }

    #[test]
    fn test_tracker_waits_for_settle() {
        let mut tracker = SelectionTracker::new(Duration::from_millis(300));
        let t0 = Instant::now();

        tracker.observe(Some(RawSelection::new(2, 7)), DOC, t0);
        assert!(tracker.settled(t0).is_none());
        assert!(tracker
            .settled(t0 + Duration::from_millis(299))
            .is_none());

        let settled = tracker.settled(t0 + Duration::from_millis(300)).unwrap();
        assert_eq!(settled.text, "hello");
    }

    #[test]
    fn test_tracker_restarts_on_change() {
        let mut tracker = SelectionTracker::new(Duration::from_millis(300));
        let t0 = Instant::now();

        tracker.observe(Some(RawSelection::new(2, 7)), DOC, t0);
        // Drag continues 200ms later; the clock restarts.
        let t1 = t0 + Duration::from_millis(200);
        tracker.observe(Some(RawSelection::new(2, 14)), DOC, t1);

        assert!(tracker.settled(t0 + Duration::from_millis(350)).is_none());
        let settled = tracker.settled(t1 + Duration::from_millis(300)).unwrap();
        assert_eq!(settled.text, "hello  world");
    }

    #[test]
    fn test_tracker_cleared_selection_settles_to_none() {
        let mut tracker = SelectionTracker::new(Duration::from_millis(300));
        let t0 = Instant::now();

        tracker.observe(Some(RawSelection::new(2, 7)), DOC, t0);
        tracker.observe(None, DOC, t0 + Duration::from_millis(100));
        assert!(tracker
            .settled(t0 + Duration::from_secs(1))
            .is_none());
    }

    #[test]
    fn test_tracker_current_ignores_settle() {
        let mut tracker = SelectionTracker::default();
        let t0 = Instant::now();
        tracker.observe(Some(RawSelection::new(2, 7)), DOC, t0);
        assert_eq!(tracker.current().unwrap().text, "hello");
    }
}
