//! Container tests: open strategies, export and reopen.

use std::io::{Cursor, Write};

use apkg::store::{Generation, Scratch};
use apkg::{ApkgError, Collection, Compression, OpenOptions, OpenStrategy};
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::{CompressionMethod, ZipArchive};

use crate::common::fixtures::{
    self, CARD_HOLA, HOLA_AUDIO, HOLA_FIELDS, NOTE_HOLA, PackageFixture,
};
use crate::common::init_test_logging;

const STRATEGIES: [OpenStrategy; 3] = [
    OpenStrategy::Memory,
    OpenStrategy::ScratchFile,
    OpenStrategy::Streamed,
];

fn zip_of(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in members {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[test]
fn every_strategy_reads_the_same_collection() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = PackageFixture::typed().write_to(dir.path(), "deck.apkg");

    for strategy in STRATEGIES {
        let col = Collection::open_path(&path, OpenOptions::default().with_strategy(strategy))
            .unwrap_or_else(|e| panic!("{strategy:?}: {e}"));
        let summary = col.summary().unwrap();
        assert_eq!(summary.generation, Generation::TypedTables, "{strategy:?}");
        assert_eq!(summary.decks, 2, "{strategy:?}");
        assert_eq!(summary.models, 1, "{strategy:?}");
        assert_eq!(summary.notes, 2, "{strategy:?}");
        assert_eq!(summary.cards, 2, "{strategy:?}");
        assert_eq!(summary.revlog, 1, "{strategy:?}");
        assert_eq!(summary.graves, 1, "{strategy:?}");
        assert_eq!(summary.media, 1, "{strategy:?}");

        assert_eq!(col.note(NOTE_HOLA).unwrap().unwrap().flds, HOLA_FIELDS);
        assert_eq!(
            col.media_content("hola.mp3").unwrap().as_deref(),
            Some(HOLA_AUDIO)
        );
        col.close().unwrap();
    }
}

#[test]
fn export_then_reopen_preserves_every_row() {
    init_test_logging();
    let original = Collection::open_bytes(PackageFixture::typed().build(), OpenOptions::default())
        .unwrap();
    let exported = original.export().unwrap();
    let reopened = Collection::open_bytes(exported, OpenOptions::default()).unwrap();

    assert_eq!(reopened.generation(), original.generation());
    assert_eq!(reopened.decks().unwrap(), original.decks().unwrap());
    assert_eq!(reopened.models().unwrap(), original.models().unwrap());
    assert_eq!(reopened.notes().unwrap(), original.notes().unwrap());
    assert_eq!(reopened.cards().unwrap(), original.cards().unwrap());
    assert_eq!(reopened.revlog().unwrap(), original.revlog().unwrap());
    assert_eq!(reopened.graves().unwrap(), original.graves().unwrap());
    assert_eq!(reopened.media_entries(), original.media_entries());
    assert_eq!(
        reopened.media_content("hola.mp3").unwrap().as_deref(),
        Some(HOLA_AUDIO)
    );

    let card = reopened.card(CARD_HOLA).unwrap().unwrap();
    assert_eq!((card.due, card.ivl, card.factor, card.reps), (120, 10, 2500, 3));
}

#[test]
fn export_writes_current_member_layout() {
    init_test_logging();
    let col = Collection::open_bytes(PackageFixture::legacy().build(), OpenOptions::default())
        .unwrap();
    let exported = col.export().unwrap();

    let names = fixtures::member_names(&exported);
    assert_eq!(names.first().map(String::as_str), Some("collection.anki21"));
    assert_eq!(names.last().map(String::as_str), Some("media"));
    assert!(names.contains(&"0".to_string()));
    assert!(!names.contains(&"collection.anki2".to_string()));

    let manifest = fixtures::manifest(&exported);
    assert_eq!(manifest.get("0").and_then(|v| v.as_str()), Some("hola.mp3"));
}

#[test]
fn newer_database_member_wins_over_older() {
    init_test_logging();
    let typed = PackageFixture::typed().build();
    let database = fixtures::member(&typed, "collection.anki21").unwrap();
    let package = zip_of(&[
        ("collection.anki2", b"stale placeholder".as_slice()),
        ("collection.anki21", database.as_slice()),
        ("media", b"{}".as_slice()),
    ]);

    let col = Collection::open_bytes(package, OpenOptions::default()).unwrap();
    assert_eq!(col.notes().unwrap().len(), 2);
}

#[test]
fn empty_collection_exports_an_empty_manifest() {
    init_test_logging();
    let col = Collection::create(OpenOptions::default()).unwrap();
    let exported = col.export().unwrap();
    assert!(fixtures::manifest(&exported).is_empty());

    let reopened = Collection::open_bytes(exported, OpenOptions::default()).unwrap();
    let summary = reopened.summary().unwrap();
    assert_eq!(summary.generation, Generation::TypedTables);
    assert_eq!(summary.notes, 0);
    assert_eq!(summary.media, 0);
    assert!(summary.created.is_some());
}

#[test]
fn stored_compression_applies_to_every_member() {
    init_test_logging();
    let options = OpenOptions {
        compression: Compression::Stored,
        ..OpenOptions::default()
    };
    let col = Collection::open_bytes(PackageFixture::typed().build(), options).unwrap();
    let exported = col.export().unwrap();

    let mut archive = ZipArchive::new(Cursor::new(exported)).unwrap();
    for i in 0..archive.len() {
        let member = archive.by_index(i).unwrap();
        assert_eq!(member.compression(), CompressionMethod::Stored, "{}", member.name());
    }
}

#[test]
fn scratch_files_live_only_as_long_as_the_collection() {
    init_test_logging();
    let scratch_root = tempfile::tempdir().unwrap();
    let package_dir = tempfile::tempdir().unwrap();
    let path = PackageFixture::typed().write_to(package_dir.path(), "deck.apkg");
    let entries = || std::fs::read_dir(scratch_root.path()).unwrap().count();

    let options = OpenOptions {
        scratch: Scratch::new(Some(scratch_root.path().to_path_buf())),
        ..OpenOptions::default()
    };

    let in_memory = Collection::open_path(&path, options.clone()).unwrap();
    assert_eq!(entries(), 0);
    in_memory.close().unwrap();

    let on_disk =
        Collection::open_path(&path, options.with_strategy(OpenStrategy::ScratchFile)).unwrap();
    assert_eq!(entries(), 1);
    on_disk.close().unwrap();
    assert_eq!(entries(), 0);
}

#[test]
fn export_to_then_open_path() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("copy.apkg");
    let col = Collection::open_bytes(PackageFixture::legacy().build(), OpenOptions::default())
        .unwrap();
    col.export_to(&target).unwrap();
    col.close().unwrap();

    let copy = Collection::open_path(&target, OpenOptions::default()).unwrap();
    assert_eq!(copy.origin(), Some(target.as_path()));
    assert_eq!(copy.notes().unwrap().len(), 2);
}

#[test]
fn open_reader_consumes_any_reader() {
    init_test_logging();
    let bytes = PackageFixture::typed().build();
    let col = Collection::open_reader(Cursor::new(bytes), OpenOptions::default()).unwrap();
    assert_eq!(col.origin(), None);
    assert_eq!(col.cards().unwrap().len(), 2);
}

#[test]
fn missing_manifest_means_no_media() {
    init_test_logging();
    let bytes = PackageFixture::typed().without_manifest().build();
    let col = Collection::open_bytes(bytes, OpenOptions::default()).unwrap();
    assert!(col.media_entries().is_empty());
    assert_eq!(col.media_content("hola.mp3").unwrap(), None);
}

#[test]
fn non_zip_input_is_an_invalid_container() {
    init_test_logging();
    let result = Collection::open_bytes(b"definitely not a zip".to_vec(), OpenOptions::default());
    assert!(matches!(result, Err(ApkgError::InvalidContainer(_))));
}

#[test]
fn zip_without_database_is_an_invalid_container() {
    init_test_logging();
    let package = zip_of(&[("media", b"{}".as_slice()), ("0", b"x".as_slice())]);
    let result = Collection::open_bytes(package, OpenOptions::default());
    assert!(matches!(result, Err(ApkgError::InvalidContainer(_))));
}

#[test]
fn database_member_that_is_not_sqlite_is_an_invalid_container() {
    init_test_logging();
    let garbage = vec![0x5a_u8; 4096];
    let package = zip_of(&[
        ("collection.anki21", garbage.as_slice()),
        ("media", b"{}".as_slice()),
    ]);
    let result = Collection::open_bytes(package, OpenOptions::default());
    assert!(matches!(result, Err(ApkgError::InvalidContainer(_))));
}

#[test]
fn collection_built_from_scratch_round_trips() {
    init_test_logging();
    use apkg::entity::{Card, Deck, Model, Note, Template};

    let mut col = Collection::create(OpenOptions::default()).unwrap();
    let model = Model::new(42, "Two sided")
        .with_field("Front")
        .with_field("Back")
        .with_template(Template::new("Forward", "{{Front}}", "{{FrontSide}}<hr>{{Back}}"));
    col.add_deck(&Deck::new(9, "Geography")).unwrap();
    col.add_model(&model).unwrap();
    let mut note = Note::new(100, None, "Capital of Peru\u{1f}Lima", 42);
    col.add_note(&mut note).unwrap();
    col.add_card(&Card::new(200, 100, 9, 0)).unwrap();
    let entry = col.add_media("peru.png", vec![0, 159, 146, 150]).unwrap();
    assert_eq!(entry, "0");

    let reopened = Collection::open_bytes(col.export().unwrap(), OpenOptions::default()).unwrap();
    assert_eq!(reopened.deck(9).unwrap(), Some(Deck::new(9, "Geography")));
    assert_eq!(reopened.model(42).unwrap(), Some(model));
    let stored = reopened.note(100).unwrap().unwrap();
    assert_eq!(stored.flds, note.flds);
    assert_eq!(stored.guid, note.guid);
    assert_eq!(reopened.card(200).unwrap(), Some(Card::new(200, 100, 9, 0)));
    assert_eq!(
        reopened.media_content("peru.png").unwrap(),
        Some(vec![0, 159, 146, 150])
    );

    let card = reopened.card(200).unwrap().unwrap();
    let rendered = reopened.render_card(&card).unwrap().unwrap();
    assert_eq!(rendered.back(), "Capital of Peru<hr>Lima");
}
