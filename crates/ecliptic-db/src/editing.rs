//! Editing-session orchestration: load an entry into a consistent
//! in-memory view, and save it back with annotation reconciliation.
//!
//! Saving is a two-phase write against two tables: phase 1 persists the
//! re-encoded content string, phase 2 applies the annotation row
//! inserts/deletes computed by reconciliation. The phases are not
//! transactional across tables; a phase-2 failure leaves the content
//! saved but the rows stale. The failing phase is reported in
//! [`Error::SaveFailed`] and the in-memory session is left untouched, so
//! a user-initiated retry recomputes the same pure reconciliation and
//! converges.

use std::time::Instant;

use tracing::{info, warn};
use uuid::Uuid;

use ecliptic_core::{
    annotations::{reconcile, AnnotationStore, SaveGate},
    marks, AnnotationRepository, AnnotationRow, EntryRepository, Error, Result, SavePhase,
    Selection, SessionContext,
};

/// An entry opened for editing: the decoded document, the live
/// annotation store, and the persisted baseline the next save diffs
/// against.
pub struct EditingSession {
    entry_id: Uuid,
    /// Plain document text (markers stripped).
    text: String,
    /// Display rendering with annotation tooltips, for read views.
    display_html: String,
    store: AnnotationStore,
    baseline: Vec<AnnotationRow>,
    gate: SaveGate,
}

impl EditingSession {
    /// Fetch an entry's content and annotation rows and decode them into
    /// a consistent in-memory view.
    pub async fn open(
        ctx: &SessionContext,
        entry_id: Uuid,
        entries: &dyn EntryRepository,
        annotations: &dyn AnnotationRepository,
    ) -> Result<Self> {
        let entry = entries.fetch(ctx, entry_id).await?;
        let baseline = annotations.list_for_entry(entry_id).await?;

        let decoded = marks::decode(&entry.content);
        let store = AnnotationStore::hydrate(&decoded, &baseline);

        Ok(Self {
            entry_id,
            text: decoded.model.text,
            display_html: decoded.display_html,
            store,
            baseline,
            gate: SaveGate::new(),
        })
    }

    pub fn entry_id(&self) -> Uuid {
        self.entry_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn display_html(&self) -> &str {
        &self.display_html
    }

    pub fn annotations(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn is_saving(&self) -> bool {
        self.gate.is_saving()
    }

    /// Attach an annotation to a settled selection. Declines silently
    /// (returns None) on invalid input or overlap, per the store rules.
    pub fn annotate(&mut self, selection: &Selection, comment: &str) -> Option<Uuid> {
        self.store.create(selection, comment).map(|a| a.id)
    }

    /// Remove an annotation. Idempotent.
    pub fn remove_annotation(&mut self, id: Uuid) {
        self.store.delete(id);
    }

    /// Replace the session document with freshly edited content from the
    /// editing surface (markers included).
    ///
    /// Annotations whose markers were removed from the content drop out
    /// of the store here and are deleted by the next save's
    /// reconciliation. Surviving annotations keep their original
    /// creation timestamps.
    pub fn refresh_content(&mut self, serialized: &str) {
        // Known rows: the persisted baseline plus anything created this
        // session, so re-hydration never re-stamps created_at.
        let mut known = self.baseline.clone();
        for annotation in self.store.list() {
            if !known.iter().any(|row| row.id == annotation.id) {
                known.push(annotation.to_row(self.entry_id));
            }
        }

        let decoded = marks::decode(serialized);
        self.store = AnnotationStore::hydrate(&decoded, &known);
        self.text = decoded.model.text;
        self.display_html = decoded.display_html;
    }

    /// Save the session: re-encode the content, then apply the
    /// annotation reconciliation.
    ///
    /// Returns [`Error::SaveInProgress`] if a prior save has not
    /// settled. On failure the in-memory store, text, and baseline are
    /// all unchanged; see the module docs for partial-failure behavior.
    pub async fn save(
        &mut self,
        ctx: &SessionContext,
        entries: &dyn EntryRepository,
        annotations: &dyn AnnotationRepository,
    ) -> Result<()> {
        if !self.gate.begin() {
            return Err(Error::SaveInProgress(self.entry_id));
        }
        let outcome = self.save_inner(ctx, entries, annotations).await;
        self.gate.finish();
        outcome
    }

    async fn save_inner(
        &mut self,
        ctx: &SessionContext,
        entries: &dyn EntryRepository,
        annotations: &dyn AnnotationRepository,
    ) -> Result<()> {
        let start = Instant::now();

        // Pure and recomputable; runs before any write.
        let plan = reconcile(&self.baseline, self.store.list());
        let encoded = marks::encode(&self.store.to_model(&self.text));

        if let Err(e) = entries.update_content(ctx, self.entry_id, &encoded).await {
            warn!(
                subsystem = "db",
                component = "editing",
                op = "save",
                entry_id = %self.entry_id,
                save_phase = "content",
                error = %e,
                "Save failed before content was written"
            );
            return Err(Error::SaveFailed {
                phase: SavePhase::Content,
                reason: e.to_string(),
            });
        }

        let to_create: Vec<AnnotationRow> = plan
            .to_create
            .iter()
            .map(|a| a.to_row(self.entry_id))
            .collect();

        let applied = async {
            annotations.insert_many(&to_create).await?;
            annotations.delete_many(self.entry_id, &plan.to_delete).await
        }
        .await;

        if let Err(e) = applied {
            warn!(
                subsystem = "db",
                component = "editing",
                op = "save",
                entry_id = %self.entry_id,
                save_phase = "annotations",
                error = %e,
                "Content saved but annotation rows were not reconciled"
            );
            return Err(Error::SaveFailed {
                phase: SavePhase::Annotations,
                reason: e.to_string(),
            });
        }

        // Both phases landed: the store's view is the new baseline.
        self.baseline = self
            .store
            .list()
            .iter()
            .map(|a| a.to_row(self.entry_id))
            .collect();

        info!(
            subsystem = "db",
            component = "editing",
            op = "save",
            entry_id = %self.entry_id,
            user_id = %ctx.user_id,
            created_count = to_create.len(),
            deleted_count = plan.to_delete.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Saved entry and reconciled annotations"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;
    use ecliptic_core::{
        normalize, CreateEntryRequest, Entry, ListEntriesRequest, ListEntriesResponse,
        RawSelection,
    };

    /// In-memory stand-in for the entry table.
    struct MemEntries {
        content: Mutex<HashMap<Uuid, String>>,
        fail_update: AtomicBool,
    }

    impl MemEntries {
        fn with_entry(id: Uuid, content: &str) -> Self {
            let mut map = HashMap::new();
            map.insert(id, content.to_string());
            Self {
                content: Mutex::new(map),
                fail_update: AtomicBool::new(false),
            }
        }

        fn stored(&self, id: Uuid) -> String {
            self.content.lock().unwrap().get(&id).cloned().unwrap()
        }
    }

    #[async_trait]
    impl EntryRepository for MemEntries {
        async fn insert(&self, _ctx: &SessionContext, _req: CreateEntryRequest) -> Result<Uuid> {
            Err(Error::Internal("not used in tests".to_string()))
        }

        async fn fetch(&self, ctx: &SessionContext, id: Uuid) -> Result<Entry> {
            let content = self
                .content
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .ok_or(Error::EntryNotFound(id))?;
            Ok(Entry {
                id,
                user_id: ctx.user_id,
                event_id: None,
                title: "test".to_string(),
                content_hash: crate::entries::hash_content(&content),
                content,
                tag_ids: vec![],
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
        }

        async fn list(
            &self,
            _ctx: &SessionContext,
            _req: ListEntriesRequest,
        ) -> Result<ListEntriesResponse> {
            Ok(ListEntriesResponse {
                entries: vec![],
                total: 0,
            })
        }

        async fn update_content(
            &self,
            _ctx: &SessionContext,
            id: Uuid,
            content: &str,
        ) -> Result<()> {
            if self.fail_update.load(Ordering::SeqCst) {
                return Err(Error::Internal("connection lost".to_string()));
            }
            self.content.lock().unwrap().insert(id, content.to_string());
            Ok(())
        }

        async fn update_title(&self, _ctx: &SessionContext, _id: Uuid, _title: &str) -> Result<()> {
            Ok(())
        }

        async fn delete(&self, _ctx: &SessionContext, id: Uuid) -> Result<()> {
            self.content.lock().unwrap().remove(&id);
            Ok(())
        }
    }

    /// In-memory stand-in for the annotation table.
    #[derive(Default)]
    struct MemAnnotations {
        rows: Mutex<Vec<AnnotationRow>>,
        fail_insert: AtomicBool,
    }

    impl MemAnnotations {
        fn ids(&self) -> Vec<Uuid> {
            self.rows.lock().unwrap().iter().map(|r| r.id).collect()
        }
    }

    #[async_trait]
    impl AnnotationRepository for MemAnnotations {
        async fn list_for_entry(&self, entry_id: Uuid) -> Result<Vec<AnnotationRow>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.entry_id == entry_id)
                .cloned()
                .collect())
        }

        async fn insert_many(&self, rows: &[AnnotationRow]) -> Result<()> {
            if self.fail_insert.load(Ordering::SeqCst) {
                return Err(Error::Internal("insert refused".to_string()));
            }
            self.rows.lock().unwrap().extend_from_slice(rows);
            Ok(())
        }

        async fn delete_many(&self, entry_id: Uuid, ids: &[Uuid]) -> Result<()> {
            self.rows
                .lock()
                .unwrap()
                .retain(|r| r.entry_id != entry_id || !ids.contains(&r.id));
            Ok(())
        }

        async fn delete_for_entry(&self, entry_id: Uuid) -> Result<()> {
            self.rows.lock().unwrap().retain(|r| r.entry_id != entry_id);
            Ok(())
        }
    }

    fn ctx() -> SessionContext {
        SessionContext::new(Uuid::now_v7())
    }

    fn seeded(entry_id: Uuid, id: Uuid) -> (MemEntries, MemAnnotations) {
        let content = format!(
            "pluto <mark data-annotation-id=\"{id}\" data-comment=\"intense\">went direct</mark> today"
        );
        let entries = MemEntries::with_entry(entry_id, &content);
        let annotations = MemAnnotations::default();
        annotations.rows.lock().unwrap().push(AnnotationRow {
            id,
            entry_id,
            comment: "intense".to_string(),
            selected_text: "went direct".to_string(),
            created_at: Utc::now(),
        });
        (entries, annotations)
    }

    #[tokio::test]
    async fn test_open_decodes_into_consistent_view() {
        let entry_id = Uuid::now_v7();
        let existing = Uuid::now_v7();
        let (entries, annotations) = seeded(entry_id, existing);

        let session = EditingSession::open(&ctx(), entry_id, &entries, &annotations)
            .await
            .unwrap();

        assert_eq!(session.text(), "pluto went direct today");
        assert_eq!(session.annotations().len(), 1);
        assert_eq!(
            session.annotations().get(existing).unwrap().anchored_text,
            "went direct"
        );
        assert!(session.display_html().contains("title=\"intense\""));
    }

    #[tokio::test]
    async fn test_save_persists_creates_and_deletes() {
        let entry_id = Uuid::now_v7();
        let existing = Uuid::now_v7();
        let (entries, annotations) = seeded(entry_id, existing);
        let ctx = ctx();

        let mut session = EditingSession::open(&ctx, entry_id, &entries, &annotations)
            .await
            .unwrap();

        session.remove_annotation(existing);
        let selection = normalize(RawSelection::new(0, 5), session.text()).unwrap();
        let added = session.annotate(&selection, "underworld").unwrap();

        session.save(&ctx, &entries, &annotations).await.unwrap();

        assert_eq!(annotations.ids(), vec![added]);
        let stored = entries.stored(entry_id);
        assert!(stored.contains(&added.to_string()));
        assert!(!stored.contains(&existing.to_string()));

        // A second save with no edits is a no-op plan.
        session.save(&ctx, &entries, &annotations).await.unwrap();
        assert_eq!(annotations.ids(), vec![added]);
    }

    #[tokio::test]
    async fn test_failed_content_phase_reports_and_leaves_state() {
        let entry_id = Uuid::now_v7();
        let existing = Uuid::now_v7();
        let (entries, annotations) = seeded(entry_id, existing);
        let ctx = ctx();

        let mut session = EditingSession::open(&ctx, entry_id, &entries, &annotations)
            .await
            .unwrap();
        session.remove_annotation(existing);

        entries.fail_update.store(true, Ordering::SeqCst);
        let err = session.save(&ctx, &entries, &annotations).await.unwrap_err();
        match err {
            Error::SaveFailed { phase, .. } => assert_eq!(phase, SavePhase::Content),
            other => panic!("unexpected error: {other}"),
        }
        // Nothing was written and the session can retry.
        assert_eq!(annotations.ids(), vec![existing]);
        assert!(!session.is_saving());

        entries.fail_update.store(false, Ordering::SeqCst);
        session.save(&ctx, &entries, &annotations).await.unwrap();
        assert!(annotations.ids().is_empty());
    }

    #[tokio::test]
    async fn test_failed_annotation_phase_retries_to_convergence() {
        let entry_id = Uuid::now_v7();
        let existing = Uuid::now_v7();
        let (entries, annotations) = seeded(entry_id, existing);
        let ctx = ctx();

        let mut session = EditingSession::open(&ctx, entry_id, &entries, &annotations)
            .await
            .unwrap();
        let selection = normalize(RawSelection::new(0, 5), session.text()).unwrap();
        let added = session.annotate(&selection, "underworld").unwrap();

        annotations.fail_insert.store(true, Ordering::SeqCst);
        let err = session.save(&ctx, &entries, &annotations).await.unwrap_err();
        match err {
            Error::SaveFailed { phase, .. } => assert_eq!(phase, SavePhase::Annotations),
            other => panic!("unexpected error: {other}"),
        }
        // Partial outcome: content landed, rows did not.
        assert!(entries.stored(entry_id).contains(&added.to_string()));
        assert_eq!(annotations.ids(), vec![existing]);

        annotations.fail_insert.store(false, Ordering::SeqCst);
        session.save(&ctx, &entries, &annotations).await.unwrap();
        let mut ids = annotations.ids();
        ids.sort();
        let mut expected = vec![existing, added];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_refresh_content_drops_removed_markers() {
        let entry_id = Uuid::now_v7();
        let existing = Uuid::now_v7();
        let (entries, annotations) = seeded(entry_id, existing);
        let ctx = ctx();

        let mut session = EditingSession::open(&ctx, entry_id, &entries, &annotations)
            .await
            .unwrap();
        let created_at = session.annotations().get(existing).unwrap().created_at;

        // The user deleted the highlighted phrase in the editor.
        session.refresh_content("pluto today");
        assert!(session.annotations().is_empty());
        assert_eq!(session.text(), "pluto today");

        // Reinstating the marker keeps the original creation timestamp.
        let content = format!(
            "pluto <mark data-annotation-id=\"{existing}\" data-comment=\"intense\">went direct</mark>"
        );
        session.refresh_content(&content);
        assert_eq!(
            session.annotations().get(existing).unwrap().created_at,
            created_at
        );

        session.save(&ctx, &entries, &annotations).await.unwrap();
        assert_eq!(annotations.ids(), vec![existing]);
    }
}
