//! The `apkg` binary end to end.

use serde_json::json;

use crate::common::cli::CliRunner;
use crate::common::fixtures::{
    CARD_HOLA, HOLA_AUDIO, NOTE_HOLA, PackageFixture, SPANISH_DECK,
};
use crate::common::init_test_logging;

fn setup(fixture: &PackageFixture) -> (tempfile::TempDir, CliRunner) {
    let dir = tempfile::tempdir().unwrap();
    fixture.write_to(dir.path(), "deck.apkg");
    let cli = CliRunner::new().in_dir(dir.path());
    (dir, cli)
}

#[test]
fn info_reports_counts_and_generation() {
    init_test_logging();
    let (_dir, cli) = setup(&PackageFixture::legacy());
    cli.run_robot(&["info", "deck.apkg"])
        .assert_success()
        .assert_json_field("/path", &json!("deck.apkg"))
        .assert_json_field("/summary/generation", &json!("legacy-json"))
        .assert_json_field("/summary/notes", &json!(2))
        .assert_json_field("/summary/cards", &json!(2))
        .assert_json_field("/summary/media", &json!(1));
}

#[test]
fn decks_models_and_notes_as_json() {
    init_test_logging();
    let (_dir, cli) = setup(&PackageFixture::typed());

    cli.run_robot(&["decks", "deck.apkg"])
        .assert_success()
        .assert_json_array_len("", 2);

    cli.run_robot(&["models", "deck.apkg"])
        .assert_success()
        .assert_json_field("/0/name", &json!("Basic"))
        .assert_json_field("/0/fields", &json!(["Front", "Back"]))
        .assert_json_field("/0/templates", &json!(["Card 1"]));

    let notes = cli.run_robot(&["notes", "deck.apkg"]);
    notes.assert_success().assert_json_array_len("", 2);
    let json = notes.json();
    let hola = json
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["id"] == json!(NOTE_HOLA))
        .unwrap();
    assert_eq!(hola["model"], "Basic");
    assert_eq!(hola["fields"][0], json!({"name": "Front", "value": "hola"}));
    assert_eq!(hola["tags"], json!(["spanish"]));
    assert_eq!(hola["media"], json!(["hola.mp3"]));
}

#[test]
fn cards_can_be_filtered_by_deck() {
    init_test_logging();
    let (_dir, cli) = setup(&PackageFixture::typed());
    let deck = SPANISH_DECK.to_string();
    cli.run_robot(&["cards", "deck.apkg", "--deck", &deck])
        .assert_success()
        .assert_json_array_len("", 1)
        .assert_json_field("/0/id", &json!(CARD_HOLA))
        .assert_json_field("/0/ivl", &json!(10));
}

#[test]
fn render_selects_sides() {
    init_test_logging();
    let (_dir, cli) = setup(&PackageFixture::typed());
    let card = CARD_HOLA.to_string();

    let both = cli.run_robot(&["render", "deck.apkg", "--card", &card]);
    both.assert_success()
        .assert_json_field("/question", &json!("hola"))
        .assert_json_field("/answer", &json!("hola<hr id=answer>hello [sound:hola.mp3]"));

    let question = cli.run_robot(&["render", "deck.apkg", "--card", &card, "--side", "question"]);
    question.assert_success();
    assert!(question.json().get("answer").is_none());

    cli.run(&["render", "deck.apkg", "--card", &card])
        .assert_success()
        .assert_stdout_contains("Question")
        .assert_stdout_contains("hello [sound:hola.mp3]");
}

#[test]
fn set_field_rewrites_the_package() {
    init_test_logging();
    let (_dir, cli) = setup(&PackageFixture::legacy());
    let note = NOTE_HOLA.to_string();

    cli.run_robot(&[
        "set-field", "deck.apkg", "--note", &note, "--field", "Back", "--value", "hi there",
    ])
    .assert_success()
    .assert_json_field("/changed", &json!(true));

    let notes = cli.run_robot(&["notes", "deck.apkg"]).json();
    let hola = notes
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["id"] == json!(NOTE_HOLA))
        .cloned()
        .unwrap();
    assert_eq!(hola["fields"][1]["value"], "hi there");

    cli.run_robot(&[
        "set-field", "deck.apkg", "--note", &note, "--field", "Back", "--value", "hi there",
    ])
    .assert_success()
    .assert_json_field("/changed", &json!(false));
}

#[test]
fn media_can_be_added_listed_and_extracted() {
    init_test_logging();
    let (dir, cli) = setup(&PackageFixture::typed());
    std::fs::write(dir.path().join("cat.png"), b"PNG-cat").unwrap();

    cli.run_robot(&["add-media", "deck.apkg", "cat.png"])
        .assert_success()
        .assert_json_field("/entry", &json!("1"))
        .assert_json_field("/filename", &json!("cat.png"));

    let listed = cli.run_robot(&["media", "deck.apkg"]);
    listed
        .assert_success()
        .assert_json_array_len("", 2)
        .assert_json_field("/0/filename", &json!("hola.mp3"))
        .assert_json_field("/0/size", &json!(HOLA_AUDIO.len()))
        .assert_json_field("/1/filename", &json!("cat.png"));
    let digest = listed.json()[1]["sha256"].as_str().unwrap().to_string();
    assert_eq!(digest.len(), 64);

    cli.run_robot(&["extract-media", "deck.apkg", "hola.mp3", "--output", "out.mp3"])
        .assert_success()
        .assert_json_field("/bytes", &json!(HOLA_AUDIO.len()));
    assert_eq!(std::fs::read(dir.path().join("out.mp3")).unwrap(), HOLA_AUDIO);
}

#[test]
fn new_creates_an_empty_package_and_refuses_to_clobber() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let cli = CliRunner::new().in_dir(dir.path());

    cli.run_robot(&["new", "fresh.apkg"])
        .assert_success()
        .assert_json_field("/success", &json!(true));
    cli.run_robot(&["info", "fresh.apkg"])
        .assert_success()
        .assert_json_field("/summary/generation", &json!("typed-tables"))
        .assert_json_field("/summary/notes", &json!(0));

    let again = cli.run_robot(&["new", "fresh.apkg"]);
    again.assert_exit_code(1);
    assert_eq!(again.error_json()["error"], json!(true));
    cli.run_robot(&["new", "fresh.apkg", "--force"]).assert_success();
}

#[test]
fn init_config_writes_settings_that_load() {
    init_test_logging();
    let (dir, cli) = setup(&PackageFixture::typed());

    cli.run_robot(&["init-config", "conf/apkg.toml"]).assert_success();
    let text = std::fs::read_to_string(dir.path().join("conf/apkg.toml")).unwrap();
    assert!(text.contains("strategy"), "{text}");

    cli.run_robot(&["--config", "conf/apkg.toml", "decks", "deck.apkg"])
        .assert_success()
        .assert_json_array_len("", 2);

    std::fs::write(
        dir.path().join("streamed.yaml"),
        "open:\n  strategy: streamed\n",
    )
    .unwrap();
    cli.run_robot(&["--config", "streamed.yaml", "info", "deck.apkg"])
        .assert_success()
        .assert_json_field("/summary/cards", &json!(2));
}

#[test]
fn errors_exit_nonzero_with_a_json_report() {
    init_test_logging();
    let (dir, cli) = setup(&PackageFixture::typed());
    std::fs::write(dir.path().join("junk.apkg"), b"not a zip at all").unwrap();

    let junk = cli.run_robot(&["info", "junk.apkg"]);
    junk.assert_exit_code(1);
    let report = junk.error_json();
    assert_eq!(report["error"], json!(true));
    assert_eq!(report["recoverable"], json!(true));
    assert!(report["message"].as_str().unwrap().contains("Invalid package container"));

    let missing_card = cli.run_robot(&["render", "deck.apkg", "--card", "5"]);
    missing_card.assert_exit_code(1);
    assert!(
        missing_card.error_json()["message"]
            .as_str()
            .unwrap()
            .contains("Card not found: 5")
    );

    cli.run(&["--config", "nowhere.toml", "decks", "deck.apkg"])
        .assert_exit_code(1)
        .assert_stderr_contains("Configuration file not found");
}

#[test]
fn version_reports_the_crate_version() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    CliRunner::new()
        .in_dir(dir.path())
        .run_robot(&["version"])
        .assert_success()
        .assert_json_field("/version", &json!(env!("CARGO_PKG_VERSION")));
}
