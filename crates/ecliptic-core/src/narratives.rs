//! Narrative membership resolution.
//!
//! An entry belongs to a narrative either automatically — the entry's tag
//! set contains every one of the narrative's required tags — or through
//! an explicit, user-curated membership edge. The two are a union:
//! a manual edge may coexist with automatic qualification, and saving
//! membership edits only ever touches the manual edges.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Narrative;

/// Whether an entry's tags automatically satisfy a required-tag set.
///
/// An empty required-tag set never auto-satisfies: it means the
/// narrative is manual-only.
pub fn auto_qualifies(required_tags: &[Uuid], entry_tags: &HashSet<Uuid>) -> bool {
    !required_tags.is_empty() && required_tags.iter().all(|t| entry_tags.contains(t))
}

/// Resolved membership of one entry in one narrative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipState {
    pub narrative_id: Uuid,
    /// Tag-derived qualification.
    pub automatic: bool,
    /// An explicit membership edge exists.
    pub manual: bool,
}

impl MembershipState {
    /// Member through either mechanism.
    pub fn is_member(&self) -> bool {
        self.automatic || self.manual
    }

    /// Automatic membership cannot be toggled off directly; the UI shows
    /// it selected but disabled. Removing it means changing the entry's
    /// tags or the narrative's required tags.
    pub fn is_locked(&self) -> bool {
        self.automatic
    }
}

/// Resolve an entry's membership across the narratives in scope.
///
/// Output order follows `narratives`.
pub fn resolve(
    entry_tags: &HashSet<Uuid>,
    narratives: &[Narrative],
    manual_edges: &HashSet<Uuid>,
) -> Vec<MembershipState> {
    narratives
        .iter()
        .map(|n| MembershipState {
            narrative_id: n.id,
            automatic: auto_qualifies(&n.required_tags, entry_tags),
            manual: manual_edges.contains(&n.id),
        })
        .collect()
}

/// Manual-edge changes one membership save must apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeChanges {
    pub to_link: Vec<Uuid>,
    pub to_unlink: Vec<Uuid>,
}

impl EdgeChanges {
    pub fn is_empty(&self) -> bool {
        self.to_link.is_empty() && self.to_unlink.is_empty()
    }
}

/// Diff a membership edit (the set of narratives the user left checked)
/// against the existing manual edges.
///
/// Only the manually controllable subset is diffed: narratives the entry
/// auto-qualifies for are excluded entirely, so a toggle UI that shows
/// them checked-and-locked never creates or deletes edges for them.
/// Output order follows `narratives`.
pub fn diff_manual_edges(
    checked: &HashSet<Uuid>,
    entry_tags: &HashSet<Uuid>,
    narratives: &[Narrative],
    existing_manual: &HashSet<Uuid>,
) -> EdgeChanges {
    let mut changes = EdgeChanges::default();

    for narrative in narratives {
        if auto_qualifies(&narrative.required_tags, entry_tags) {
            continue;
        }
        let wants = checked.contains(&narrative.id);
        let has = existing_manual.contains(&narrative.id);
        match (wants, has) {
            (true, false) => changes.to_link.push(narrative.id),
            (false, true) => changes.to_unlink.push(narrative.id),
            _ => {}
        }
    }

    changes
}
