//! Domain types for the rows and JSON blobs of a collection.
//!
//! Row-backed entities (`Card`, `Note`, `Revlog`, `Grave`, `Col`) carry every
//! persisted column so that an export round trip is lossless. JSON-backed
//! entities (`Model` and legacy decks) keep unknown keys in `extra`.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Byte delimiting a note's field slots in their raw stored form.
pub const FIELD_SEPARATOR: char = '\u{1f}';

/// A deck, regardless of which schema generation it was read from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Deck {
    pub id: i64,
    pub name: String,
}

impl Deck {
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A field definition inside a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    #[serde(default)]
    pub name: String,
    /// Stored ordinal. Slot binding uses list position, not this value.
    #[serde(default)]
    pub ord: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Field {
    #[must_use]
    pub fn new(name: impl Into<String>, ord: i64) -> Self {
        Self {
            name: name.into(),
            ord,
            extra: Map::new(),
        }
    }
}

/// A card template: one question/answer format pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub name: String,
    /// Question format.
    #[serde(default)]
    pub qfmt: String,
    /// Answer format.
    #[serde(default)]
    pub afmt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ord: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Template {
    #[must_use]
    pub fn new(name: impl Into<String>, qfmt: impl Into<String>, afmt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qfmt: qfmt.into(),
            afmt: afmt.into(),
            ord: None,
            extra: Map::new(),
        }
    }
}

/// A note type: field schema plus card templates and stylesheet.
///
/// Always persisted as JSON inside `col.models`, keyed by the string form of
/// `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub flds: Vec<Field>,
    #[serde(default)]
    pub tmpls: Vec<Template>,
    #[serde(default)]
    pub css: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Model {
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            flds: Vec::new(),
            tmpls: Vec::new(),
            css: String::new(),
            extra: Map::new(),
        }
    }

    /// Append a field whose ordinal is its list position.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>) -> Self {
        let ord = i64::try_from(self.flds.len()).unwrap_or(i64::MAX);
        self.flds.push(Field::new(name, ord));
        self
    }

    #[must_use]
    pub fn with_template(mut self, template: Template) -> Self {
        self.tmpls.push(template);
        self
    }

    #[must_use]
    pub fn with_css(mut self, css: impl Into<String>) -> Self {
        self.css = css.into();
        self
    }

    /// Field names in slot order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.flds.iter().map(|f| f.name.as_str())
    }

    /// Template selected by a card ordinal, if in range.
    pub fn template(&self, ordinal: i64) -> Option<&Template> {
        usize::try_from(ordinal).ok().and_then(|i| self.tmpls.get(i))
    }

    /// Fields whose stored `ord` disagrees with their list position.
    pub fn misordered_fields(&self) -> Vec<&Field> {
        self.flds
            .iter()
            .enumerate()
            .filter(|(pos, f)| i64::try_from(*pos).ok() != Some(f.ord))
            .map(|(_, f)| f)
            .collect()
    }
}

/// A note: the raw field values shared by one or more cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    /// 10-character token; generated on insert when empty.
    pub guid: String,
    /// Model (note type) id.
    pub mid: i64,
    #[serde(rename = "mod")]
    pub modified: i64,
    pub usn: i64,
    pub tags: String,
    /// Unit-separator delimited field values.
    pub flds: String,
    /// Sort field.
    pub sfld: String,
    pub csum: i64,
    pub flags: i64,
    pub data: String,
    /// Unsaved in-memory changes to `flds`.
    #[serde(skip)]
    pub dirty: bool,
}

static SOUND_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[sound:(.*?)\]").expect("valid sound regex"));
static IMG_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<img[^>]+src=["']([^"']+)["'][^>]*>"#).expect("valid img regex")
});

impl Note {
    /// Create a note. An empty `guid` is filled in when the note is added.
    #[must_use]
    pub fn new(id: i64, guid: Option<&str>, flds: impl Into<String>, mid: i64) -> Self {
        Self {
            id,
            guid: guid.unwrap_or_default().to_string(),
            mid,
            modified: 0,
            usn: -1,
            tags: String::new(),
            flds: flds.into(),
            sfld: String::new(),
            csum: 0,
            flags: 0,
            data: String::new(),
            dirty: false,
        }
    }

    /// Value of the first field slot.
    pub fn first_field(&self) -> &str {
        self.flds.split(FIELD_SEPARATOR).next().unwrap_or_default()
    }

    /// Replace the raw fields, marking the note dirty iff they changed.
    pub fn set_raw_fields(&mut self, flds: String) -> bool {
        if self.flds == flds {
            return false;
        }
        self.flds = flds;
        self.dirty = true;
        true
    }

    /// Media filenames referenced by `[sound:...]` and `<img src=...>`.
    pub fn media_references(&self) -> Vec<String> {
        let sounds = SOUND_REF.captures_iter(&self.flds);
        let images = IMG_REF.captures_iter(&self.flds);
        sounds
            .chain(images)
            .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
            .collect()
    }
}

/// A card: one rendering of a note through one template.
///
/// Scheduler columns are carried verbatim; nothing here computes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: i64,
    /// Note id.
    pub nid: i64,
    /// Deck id.
    pub did: i64,
    /// Template ordinal.
    pub ord: i64,
    #[serde(rename = "mod")]
    pub modified: i64,
    pub usn: i64,
    #[serde(rename = "type")]
    pub card_type: i64,
    pub queue: i64,
    pub due: i64,
    pub ivl: i64,
    pub factor: i64,
    pub reps: i64,
    pub lapses: i64,
    pub left: i64,
    pub odue: i64,
    pub odid: i64,
    pub flags: i64,
    pub data: String,
}

impl Card {
    /// Create a new, never-reviewed card.
    #[must_use]
    pub fn new(id: i64, nid: i64, did: i64, ord: i64) -> Self {
        Self {
            id,
            nid,
            did,
            ord,
            modified: 0,
            usn: -1,
            card_type: 0,
            queue: 0,
            due: 0,
            ivl: 0,
            factor: 0,
            reps: 0,
            lapses: 0,
            left: 0,
            odue: 0,
            odid: 0,
            flags: 0,
            data: String::new(),
        }
    }
}

/// One review log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revlog {
    pub id: i64,
    /// Card id.
    pub cid: i64,
    pub usn: i64,
    pub ease: i64,
    pub ivl: i64,
    #[serde(rename = "lastIvl")]
    pub last_ivl: i64,
    pub factor: i64,
    pub time: i64,
    #[serde(rename = "type")]
    pub review_type: i64,
}

/// A deletion record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grave {
    pub usn: i64,
    /// Original id of the deleted object.
    pub oid: i64,
    #[serde(rename = "type")]
    pub grave_type: i64,
}

/// The singleton collection row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Col {
    pub id: i64,
    /// Creation time, epoch seconds.
    pub crt: i64,
    #[serde(rename = "mod")]
    pub modified: i64,
    /// Schema modification time.
    pub scm: i64,
    pub ver: i64,
    pub dty: i64,
    pub usn: i64,
    /// Last sync time.
    pub ls: i64,
    pub conf: String,
    pub models: String,
    pub decks: String,
    pub dconf: String,
    pub tags: String,
}
