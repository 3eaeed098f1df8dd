//! Media manifest handling: entry allocation, rebinding and export.

use apkg::{ApkgError, Collection, OpenOptions};

use crate::common::fixtures::{self, HOLA_AUDIO, PackageFixture};
use crate::common::init_test_logging;

#[test]
fn new_entries_continue_after_the_highest_number() {
    init_test_logging();
    let bytes = PackageFixture::typed()
        .with_media("7", "adios.mp3", b"ID3-adios")
        .with_media("2", "hello.png", b"PNG")
        .build();
    let mut col = Collection::open_bytes(bytes, OpenOptions::default()).unwrap();

    assert_eq!(col.add_media("new.png", b"NEW".to_vec()).unwrap(), "8");
    assert_eq!(col.add_media("newer.png", b"NEWER".to_vec()).unwrap(), "9");
    assert!(col.is_dirty());

    let entries: Vec<String> = col.media_entries().into_iter().map(|e| e.entry).collect();
    assert_eq!(entries, vec!["0", "2", "7", "8", "9"]);
}

#[test]
fn empty_collection_starts_at_zero() {
    init_test_logging();
    let mut col = Collection::create(OpenOptions::default()).unwrap();
    assert_eq!(col.add_media("a.png", b"A".to_vec()).unwrap(), "0");
    assert_eq!(col.add_media("b.png", b"B".to_vec()).unwrap(), "1");
}

#[test]
fn re_adding_a_filename_rebinds_it() {
    init_test_logging();
    let mut col =
        Collection::open_bytes(PackageFixture::typed().build(), OpenOptions::default()).unwrap();

    let entry = col.add_media("hola.mp3", b"ID3-new-take".to_vec()).unwrap();
    assert_eq!(entry, "1");
    assert_eq!(col.media().entry_name("hola.mp3"), Some("1"));
    assert_eq!(col.media().len(), 1);
    assert_eq!(
        col.media_content("hola.mp3").unwrap().as_deref(),
        Some(b"ID3-new-take".as_slice())
    );

    let exported = col.export().unwrap();
    let manifest = fixtures::manifest(&exported);
    assert_eq!(manifest.len(), 1);
    assert_eq!(manifest.get("1").and_then(|v| v.as_str()), Some("hola.mp3"));
    assert_eq!(fixtures::member(&exported, "0"), None);
}

#[test]
fn added_media_survives_export() {
    init_test_logging();
    let mut col =
        Collection::open_bytes(PackageFixture::legacy().build(), OpenOptions::default()).unwrap();
    col.add_media("chart.svg", b"<svg/>".to_vec()).unwrap();

    let reopened = Collection::open_bytes(col.export().unwrap(), OpenOptions::default()).unwrap();
    assert_eq!(
        reopened.media_content("chart.svg").unwrap().as_deref(),
        Some(b"<svg/>".as_slice())
    );
    assert_eq!(
        reopened.media_content("hola.mp3").unwrap().as_deref(),
        Some(HOLA_AUDIO)
    );
}

#[test]
fn dangling_manifest_entries_read_as_absent_and_are_dropped_on_export() {
    init_test_logging();
    let bytes = PackageFixture::typed()
        .with_dangling_media("3", "lost.jpg")
        .build();
    let mut col = Collection::open_bytes(bytes, OpenOptions::default()).unwrap();

    assert_eq!(col.media().entry_name("lost.jpg"), Some("3"));
    assert_eq!(col.media_content("lost.jpg").unwrap(), None);
    assert_eq!(col.media_content("never-listed.jpg").unwrap(), None);
    // The dangling entry still reserves its number.
    assert_eq!(col.add_media("found.jpg", b"JPG".to_vec()).unwrap(), "4");

    let manifest = fixtures::manifest(&col.export().unwrap());
    assert!(manifest.get("3").is_none());
    assert_eq!(manifest.get("4").and_then(|v| v.as_str()), Some("found.jpg"));
}

#[test]
fn non_numeric_entries_are_kept_but_do_not_advance_allocation() {
    init_test_logging();
    let bytes = PackageFixture::typed()
        .with_media("cover", "cover.png", b"PNG")
        .build();
    let mut col = Collection::open_bytes(bytes, OpenOptions::default()).unwrap();
    assert_eq!(col.add_media("x.png", b"X".to_vec()).unwrap(), "1");

    let entries: Vec<String> = col.media_entries().into_iter().map(|e| e.entry).collect();
    assert_eq!(entries, vec!["0", "1", "cover"]);
    assert_eq!(
        col.media_content("cover.png").unwrap().as_deref(),
        Some(b"PNG".as_slice())
    );
}

#[test]
fn manifest_with_non_string_values_is_malformed() {
    init_test_logging();
    use std::io::{Cursor, Write};
    use zip::write::{SimpleFileOptions, ZipWriter};

    let typed = PackageFixture::typed().build();
    let database = fixtures::member(&typed, "collection.anki21").unwrap();
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("collection.anki21", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(&database).unwrap();
    writer.start_file("media", SimpleFileOptions::default()).unwrap();
    writer.write_all(br#"{"0": 12}"#).unwrap();
    let package = writer.finish().unwrap().into_inner();

    let result = Collection::open_bytes(package, OpenOptions::default());
    assert!(matches!(result, Err(ApkgError::MalformedData { what: "media", .. })));
}

#[test]
fn filename_listed_twice_keeps_both_members_through_export() {
    init_test_logging();
    let bytes = PackageFixture::typed()
        .with_media("4", "hola.mp3", b"ID3-hola-retake")
        .build();
    let col = Collection::open_bytes(bytes, OpenOptions::default()).unwrap();

    assert_eq!(col.media().len(), 1);
    assert_eq!(col.media().entry_name("hola.mp3"), Some("4"));
    assert_eq!(
        col.media_content("hola.mp3").unwrap().as_deref(),
        Some(b"ID3-hola-retake".as_slice())
    );

    let exported = col.export().unwrap();
    let manifest = fixtures::manifest(&exported);
    assert_eq!(manifest.get("0").and_then(|v| v.as_str()), Some("hola.mp3"));
    assert_eq!(manifest.get("4").and_then(|v| v.as_str()), Some("hola.mp3"));
    assert_eq!(fixtures::member(&exported, "0").as_deref(), Some(HOLA_AUDIO));
}
