//! End-to-end tests for the annotation content model: decode a stored
//! content string, edit through the store, re-encode, and verify the
//! persisted form still round-trips.

use ecliptic_core::annotations::{reconcile, AnnotationStore};
use ecliptic_core::marks::{decode, encode, DocumentModel, MarkedSpan};
use ecliptic_core::models::AnnotationRow;
use ecliptic_core::selection::{normalize, RawSelection};
use uuid::Uuid;

fn span(id: Uuid, comment: &str, range: std::ops::Range<usize>) -> MarkedSpan {
    MarkedSpan {
        id,
        comment: comment.to_string(),
        range,
    }
}

fn row_for(id: Uuid, entry_id: Uuid, comment: &str, text: &str) -> AnnotationRow {
    AnnotationRow {
        id,
        entry_id,
        comment: comment.to_string(),
        selected_text: text.to_string(),
        created_at: chrono::Utc::now(),
    }
}

#[test]
fn decode_encode_decode_preserves_annotation_triples() {
    let a = Uuid::now_v7();
    let b = Uuid::now_v7();

    let mut model = DocumentModel::new("mars squared my natal sun during the eclipse");
    model.marks.push(span(a, "felt \"stuck\" all week", 0..12));
    model.marks.push(span(b, "drained & tired", 37..44));

    let stored = encode(&model);

    // Load: decode, hydrate the session store, project back to a model.
    let decoded = decode(&stored);
    let store = AnnotationStore::hydrate(&decoded, &[]);
    let reencoded = encode(&store.to_model(&decoded.model.text));

    // Save round: the re-encoded string decodes to the same triples.
    let final_decoded = decode(&reencoded);
    let before: Vec<_> = decoded
        .annotations
        .iter()
        .map(|s| (s.id, s.comment.clone(), s.anchored_text.clone()))
        .collect();
    let after: Vec<_> = final_decoded
        .annotations
        .iter()
        .map(|s| (s.id, s.comment.clone(), s.anchored_text.clone()))
        .collect();

    assert_eq!(before, after);
    assert_eq!(after[0].1, "felt \"stuck\" all week");
    assert_eq!(after[1].2, "eclipse");
}

#[test]
fn edit_session_create_delete_then_reconcile() {
    let entry_id = Uuid::now_v7();
    let kept = Uuid::now_v7();
    let removed = Uuid::now_v7();

    let mut model = DocumentModel::new("venus entered libra this morning");
    model.marks.push(span(kept, "keep me", 0..5));
    model.marks.push(span(removed, "delete me", 14..19));
    let stored = encode(&model);

    let persisted = vec![
        row_for(kept, entry_id, "keep me", "venus"),
        row_for(removed, entry_id, "delete me", "libra"),
    ];

    let decoded = decode(&stored);
    let mut store = AnnotationStore::hydrate(&decoded, &persisted);

    // User deletes one annotation and highlights a new phrase.
    store.delete(removed);
    let selection = normalize(
        RawSelection::new(20, 32),
        &decoded.model.text,
    )
    .expect("non-empty selection");
    let added = store.create(&selection, "fresh start").expect("created").id;

    let plan = reconcile(&persisted, store.list());
    assert_eq!(plan.to_delete, vec![removed]);
    let created: Vec<Uuid> = plan.to_create.iter().map(|a| a.id).collect();
    assert_eq!(created, vec![added]);

    // The next encode carries exactly the surviving markers.
    let reencoded = encode(&store.to_model(&decoded.model.text));
    let final_decoded = decode(&reencoded);
    let ids: Vec<Uuid> = final_decoded.annotations.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![kept, added]);
}

#[test]
fn malformed_marker_survives_as_plain_text_through_a_save() {
    let good = Uuid::now_v7();
    let content = format!(
        "sound <mark data-comment=\"no id here\">broken</mark> and \
         <mark data-annotation-id=\"{good}\" data-comment=\"ok\">fine</mark>"
    );

    let decoded = decode(&content);
    assert_eq!(decoded.annotations.len(), 1);
    assert_eq!(decoded.annotations[0].id, good);
    assert_eq!(decoded.model.text, "sound broken and fine");

    // Re-encoding drops the broken marker's markup but keeps its text.
    let store = AnnotationStore::hydrate(&decoded, &[]);
    let reencoded = encode(&store.to_model(&decoded.model.text));
    assert!(reencoded.contains("sound broken and"));
    let final_decoded = decode(&reencoded);
    assert_eq!(final_decoded.annotations.len(), 1);
    assert_eq!(final_decoded.model.text, "sound broken and fine");
}
