//! Output mode abstraction for robot and human output.

use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::cli::{Cli, RenderSide};
use crate::collection::CollectionSummary;
use crate::entity::{Card, Deck, Model, Note};
use crate::error::ApkgError;
use crate::fields::{FieldEntry, FieldMap};
use crate::package::MediaEntry;
use crate::render::RenderedCard;

pub mod human;
pub mod robot;

pub use human::HumanOutput;
pub use robot::RobotOutput;

// === Views ===

/// A note type as listed by `apkg models`.
#[derive(Debug, Clone, Serialize)]
pub struct ModelView {
    pub id: i64,
    pub name: String,
    pub fields: Vec<String>,
    pub templates: Vec<String>,
}

impl From<&Model> for ModelView {
    fn from(model: &Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            fields: model.field_names().map(str::to_string).collect(),
            templates: model.tmpls.iter().map(|t| t.name.clone()).collect(),
        }
    }
}

/// A note with its fields resolved against its model.
#[derive(Debug, Clone, Serialize)]
pub struct NoteView {
    pub id: i64,
    pub guid: String,
    pub mid: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub tags: Vec<String>,
    /// Named fields, or a single unnamed entry per slot when the model is missing.
    pub fields: Vec<FieldEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<String>,
}

impl NoteView {
    pub fn new(note: &Note, model: Option<&Model>) -> Self {
        let fields = match model {
            Some(model) => FieldMap::from_raw(model, &note.flds).iter().cloned().collect(),
            None => FieldMap::from_raw(&unnamed_model(note), &note.flds)
                .iter()
                .cloned()
                .collect(),
        };
        Self {
            id: note.id,
            guid: note.guid.clone(),
            mid: note.mid,
            model: model.map(|m| m.name.clone()),
            tags: note.tags.split_whitespace().map(str::to_string).collect(),
            fields,
            media: note.media_references(),
        }
    }
}

/// Stand-in model naming slots by position, for notes whose model is gone.
fn unnamed_model(note: &Note) -> Model {
    let slots = note.flds.split(crate::entity::FIELD_SEPARATOR).count();
    (0..slots).fold(Model::new(note.mid, ""), |model, i| model.with_field(format!("#{i}")))
}

/// One media file as listed by `apkg media`.
#[derive(Debug, Clone, Serialize)]
pub struct MediaView {
    pub entry: String,
    pub filename: String,
    /// `None` when the manifest lists a file the archive lacks.
    pub size: Option<usize>,
    pub sha256: Option<String>,
}

impl MediaView {
    pub fn new(entry: MediaEntry, content: Option<&[u8]>) -> Self {
        Self {
            entry: entry.entry,
            filename: entry.filename,
            size: content.map(<[u8]>::len),
            sha256: content.map(|bytes| hex::encode(Sha256::digest(bytes))),
        }
    }
}

/// The parts of a rendered card selected by `--side`.
#[derive(Debug, Clone, Serialize)]
pub struct RenderView<'a> {
    pub card: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<&'a str>,
    pub css: &'a str,
}

impl<'a> RenderView<'a> {
    pub fn new(card: i64, rendered: &'a RenderedCard, side: RenderSide) -> Self {
        let question = matches!(side, RenderSide::Question | RenderSide::Both);
        let answer = matches!(side, RenderSide::Answer | RenderSide::Both);
        Self {
            card,
            question: question.then(|| rendered.front()),
            answer: answer.then(|| rendered.back()),
            css: rendered.css(),
        }
    }
}

/// Build metadata reported by `apkg version`.
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    pub version: &'static str,
    pub git_sha: &'static str,
    pub git_dirty: bool,
    pub build_timestamp: &'static str,
    pub rustc_version: &'static str,
    pub target: &'static str,
}

// === Output Mode ===

/// Robot output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotFormat {
    /// Pretty-printed JSON (default for --robot).
    Json,
    /// Single-line JSON (--format=json-compact).
    JsonCompact,
}

/// Determines how command output is rendered.
#[derive(Debug)]
pub enum OutputMode {
    /// JSON output for agents and scripting.
    Robot(RobotFormat),
    /// Styled terminal output for human users.
    Human,
}

impl OutputMode {
    /// Create OutputMode from CLI arguments.
    #[must_use]
    pub const fn from_cli(cli: &Cli) -> Self {
        if cli.use_json() {
            let format = if cli.use_compact_json() {
                RobotFormat::JsonCompact
            } else {
                RobotFormat::Json
            };
            Self::Robot(format)
        } else {
            Self::Human
        }
    }

    #[must_use]
    pub const fn is_robot(&self) -> bool {
        matches!(self, Self::Robot(_))
    }

    /// Convert into the appropriate Output implementation.
    #[must_use]
    pub fn into_output(self) -> Box<dyn Output> {
        match self {
            Self::Robot(format) => Box::new(RobotOutput::new(format)),
            Self::Human => Box::new(HumanOutput::new()),
        }
    }
}

/// Trait for all output operations.
///
/// Commands call these methods without knowing the output mode.
pub trait Output {
    // Basic messages
    fn success(&self, message: &str);
    fn error(&self, error: &ApkgError);
    fn warning(&self, message: &str);

    // Inspection
    fn summary(&self, path: &Path, summary: &CollectionSummary);
    fn deck_list(&self, decks: &[Deck]);
    fn model_list(&self, models: &[ModelView]);
    fn note_list(&self, notes: &[NoteView]);
    fn card_list(&self, cards: &[Card]);
    fn rendered(&self, view: &RenderView<'_>);

    // Media
    fn media_list(&self, media: &[MediaView]);
    fn media_added(&self, filename: &str, entry: &str);
    fn media_extracted(&self, filename: &str, path: &Path, bytes: usize);

    // Editing
    fn field_updated(&self, note: i64, field: &str, changed: bool);

    // Metadata
    fn version_info(&self, info: &VersionInfo);
}
