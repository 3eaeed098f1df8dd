//! Both schema generations answer the same questions the same way.

use apkg::entity::Deck;
use apkg::store::Generation;
use apkg::{Collection, OpenOptions};

use crate::common::fixtures::{
    CARD_ADIOS, CARD_HOLA, DEFAULT_DECK, GRAVE_OID, MODEL_ID, NOTE_HOLA, PackageFixture,
    REVIEW_ID, SPANISH_DECK,
};
use crate::common::init_test_logging;

fn open_both() -> [Collection; 2] {
    [PackageFixture::typed(), PackageFixture::legacy()]
        .map(|fixture| Collection::open_bytes(fixture.build(), OpenOptions::default()).unwrap())
}

#[test]
fn generation_is_detected_from_the_database() {
    init_test_logging();
    let [typed, legacy] = open_both();
    assert_eq!(typed.generation(), Generation::TypedTables);
    assert_eq!(legacy.generation(), Generation::LegacyJson);
    assert_eq!(legacy.summary().unwrap().schema_version, 11);
}

#[test]
fn decks_read_the_same_from_both_generations() {
    init_test_logging();
    let [typed, legacy] = open_both();

    let mut from_table = typed.decks().unwrap();
    let mut from_json = legacy.decks().unwrap();
    from_table.sort_by_key(|d| d.id);
    from_json.sort_by_key(|d| d.id);
    assert_eq!(from_table, from_json);
    assert_eq!(
        from_json,
        vec![Deck::new(DEFAULT_DECK, "Default"), Deck::new(SPANISH_DECK, "Spanish")]
    );

    for col in [&typed, &legacy] {
        assert_eq!(col.deck(SPANISH_DECK).unwrap().map(|d| d.name), Some("Spanish".to_string()));
        assert_eq!(col.deck(42).unwrap(), None);
    }
}

#[test]
fn traversal_is_identical_across_generations() {
    init_test_logging();
    for col in open_both() {
        let generation = col.generation();

        let in_spanish = col.cards_in_deck(SPANISH_DECK).unwrap();
        assert_eq!(
            in_spanish.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![CARD_HOLA],
            "{generation}"
        );

        let note = col.note_for_card(CARD_HOLA).unwrap().unwrap();
        assert_eq!(note.id, NOTE_HOLA, "{generation}");
        assert_eq!(col.model_for_note(&note).unwrap().unwrap().id, MODEL_ID);
        assert_eq!(col.notes_of_model(MODEL_ID).unwrap().len(), 2, "{generation}");
        assert_eq!(col.cards_for_note(NOTE_HOLA).unwrap().len(), 1, "{generation}");
        assert_eq!(col.card(CARD_ADIOS).unwrap().unwrap().did, DEFAULT_DECK);

        let reviews = col.reviews_of_card(CARD_HOLA).unwrap();
        assert_eq!(reviews.len(), 1, "{generation}");
        assert_eq!(reviews[0].id, REVIEW_ID);
        assert_eq!(reviews[0].last_ivl, 4);
        assert!(col.reviews_of_card(CARD_ADIOS).unwrap().is_empty());
        assert_eq!(col.revlog_entry(REVIEW_ID).unwrap(), Some(reviews[0].clone()));

        assert_eq!(col.grave(GRAVE_OID).unwrap().map(|g| g.grave_type), Some(1));
        assert_eq!(col.grave(7).unwrap(), None);
        col.close().unwrap();
    }
}

#[test]
fn missing_rows_are_absent_not_errors() {
    init_test_logging();
    for col in open_both() {
        assert_eq!(col.note(1).unwrap(), None);
        assert_eq!(col.card(1).unwrap(), None);
        assert_eq!(col.model(1).unwrap(), None);
        assert_eq!(col.note_for_card(1).unwrap(), None);
        assert!(col.cards_in_deck(1234).unwrap().is_empty());
    }
}

#[test]
fn legacy_deck_add_keeps_unknown_keys_and_survives_export() {
    init_test_logging();
    let mut legacy =
        Collection::open_bytes(PackageFixture::legacy().build(), OpenOptions::default()).unwrap();
    legacy.add_deck(&Deck::new(7, "French")).unwrap();
    legacy
        .add_deck(&Deck::new(SPANISH_DECK, "Spanish::Verbs"))
        .unwrap();
    assert!(legacy.is_dirty());

    let decks_json: serde_json::Value =
        serde_json::from_str(&legacy.col().unwrap().unwrap().decks).unwrap();
    let spanish = &decks_json[SPANISH_DECK.to_string()];
    assert_eq!(spanish["name"], "Spanish::Verbs");
    assert_eq!(spanish["desc"], "verbs");
    assert_eq!(spanish["conf"], 1);

    let reopened = Collection::open_bytes(legacy.export().unwrap(), OpenOptions::default()).unwrap();
    assert_eq!(reopened.generation(), Generation::LegacyJson);
    assert_eq!(reopened.decks().unwrap().len(), 3);
    assert_eq!(reopened.deck(7).unwrap(), Some(Deck::new(7, "French")));
}

#[test]
fn typed_deck_add_replaces_by_id() {
    init_test_logging();
    let mut typed =
        Collection::open_bytes(PackageFixture::typed().build(), OpenOptions::default()).unwrap();
    typed.add_deck(&Deck::new(DEFAULT_DECK, "Inbox")).unwrap();
    assert_eq!(typed.decks().unwrap().len(), 2);
    assert_eq!(
        typed.deck(DEFAULT_DECK).unwrap().map(|d| d.name),
        Some("Inbox".to_string())
    );
}
