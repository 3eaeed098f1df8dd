//! The open-collection facade.
//!
//! A [`Collection`] owns the mounted database and media index of one
//! package. All traversal between entities (card to note, note to model,
//! deck to cards) goes through it rather than through back-references on
//! the entity values.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::entity::{Card, Col, Deck, Grave, Model, Note, Revlog};
use crate::error::{ApkgError, Result};
use crate::fields::FieldMap;
use crate::package::{self, ArchiveSource, MediaEntry, MediaIndex, OpenOptions, OpenedPackage};
use crate::render::{self, RenderedCard};
use crate::repo::{
    CardRepository, ColRepository, DeckRepository, GraveRepository, ModelRepository,
    NoteRepository, RevlogRepository,
};
use crate::store::{Generation, SchemaStore};

/// Counts and metadata of an open collection.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionSummary {
    pub generation: Generation,
    pub schema_version: i64,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub decks: usize,
    pub models: usize,
    pub notes: i64,
    pub cards: i64,
    pub revlog: i64,
    pub graves: i64,
    pub media: usize,
}

/// An open collection.
///
/// Dropping a collection releases its database and scratch files without
/// writing anything back; use [`Collection::close`] to flush edits.
#[derive(Debug)]
pub struct Collection {
    store: SchemaStore,
    media: MediaIndex,
    origin: Option<PathBuf>,
    options: OpenOptions,
    dirty: bool,
}

impl Collection {
    /// A new, empty collection that has never been stored anywhere.
    #[instrument(skip(options))]
    pub fn create(options: OpenOptions) -> Result<Self> {
        let store = SchemaStore::create(options.scratch.clone())?;
        info!("Created empty collection");
        Ok(Self {
            store,
            media: MediaIndex::empty(),
            origin: None,
            options,
            dirty: false,
        })
    }

    /// Open a package file. With write-back enabled, [`close`](Self::close)
    /// rewrites this file when the collection was modified.
    #[instrument(skip(path, options), fields(path = %path.as_ref().display()))]
    pub fn open_path(path: impl AsRef<Path>, options: OpenOptions) -> Result<Self> {
        let path = path.as_ref();
        let source = match options.strategy {
            package::OpenStrategy::Streamed => ArchiveSource::File(path.to_path_buf()),
            _ => ArchiveSource::from_bytes(std::fs::read(path)?),
        };
        let mut collection = Self::open_source(source, options)?;
        collection.origin = Some(path.to_path_buf());
        Ok(collection)
    }

    /// Open a package held in memory.
    pub fn open_bytes(bytes: Vec<u8>, options: OpenOptions) -> Result<Self> {
        Self::open_source(ArchiveSource::from_bytes(bytes), options)
    }

    /// Open a package from any reader. The reader is consumed to the end.
    pub fn open_reader<R: Read>(mut reader: R, options: OpenOptions) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::open_bytes(bytes, options)
    }

    fn open_source(source: ArchiveSource, options: OpenOptions) -> Result<Self> {
        let OpenedPackage { store, media } = package::open(source, &options)?;
        Ok(Self {
            store,
            media,
            origin: None,
            options,
            dirty: false,
        })
    }

    pub const fn generation(&self) -> Generation {
        self.store.generation()
    }

    /// The file this collection was opened from, if any.
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    pub const fn options(&self) -> &OpenOptions {
        &self.options
    }

    /// Whether anything was changed since opening.
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub const fn media(&self) -> &MediaIndex {
        &self.media
    }

    pub fn col(&self) -> Result<Option<Col>> {
        ColRepository::new(&self.store).get()
    }

    pub fn summary(&self) -> Result<CollectionSummary> {
        let col = self.col()?;
        let timestamp = |secs: i64| DateTime::<Utc>::from_timestamp(secs, 0);
        Ok(CollectionSummary {
            generation: self.generation(),
            schema_version: col.as_ref().map_or(0, |c| c.ver),
            created: col.as_ref().and_then(|c| timestamp(c.crt)),
            modified: col.as_ref().and_then(|c| timestamp(c.modified)),
            decks: self.decks()?.len(),
            models: self.models()?.len(),
            notes: self.store.count("notes")?,
            cards: self.store.count("cards")?,
            revlog: self.store.count("revlog")?,
            graves: self.store.count("graves")?,
            media: self.media.len(),
        })
    }

    // Decks

    pub fn decks(&self) -> Result<Vec<Deck>> {
        DeckRepository::new(&self.store).list()
    }

    pub fn deck(&self, id: i64) -> Result<Option<Deck>> {
        DeckRepository::new(&self.store).get(id)
    }

    pub fn add_deck(&mut self, deck: &Deck) -> Result<()> {
        DeckRepository::new(&self.store).add(deck)?;
        self.dirty = true;
        Ok(())
    }

    // Models

    pub fn models(&self) -> Result<Vec<Model>> {
        ModelRepository::new(&self.store).list()
    }

    pub fn model(&self, id: i64) -> Result<Option<Model>> {
        ModelRepository::new(&self.store).get(id)
    }

    pub fn add_model(&mut self, model: &Model) -> Result<()> {
        ModelRepository::new(&self.store).add(model)?;
        self.dirty = true;
        Ok(())
    }

    // Notes

    pub fn notes(&self) -> Result<Vec<Note>> {
        NoteRepository::new(&self.store).list()
    }

    pub fn note(&self, id: i64) -> Result<Option<Note>> {
        NoteRepository::new(&self.store).get(id)
    }

    pub fn notes_of_model(&self, mid: i64) -> Result<Vec<Note>> {
        NoteRepository::new(&self.store).list_by_model(mid)
    }

    /// Insert a note, generating its guid when empty.
    pub fn add_note(&mut self, note: &mut Note) -> Result<()> {
        NoteRepository::new(&self.store).add(note)?;
        self.dirty = true;
        Ok(())
    }

    /// Persist a note's edited fields. Returns `false` when it had no edits.
    #[instrument(skip(self, note), fields(id = note.id))]
    pub fn save_note(&mut self, note: &mut Note) -> Result<bool> {
        if !note.dirty {
            debug!("Note unchanged; nothing to save");
            return Ok(false);
        }
        NoteRepository::new(&self.store).update_fields(note)?;
        self.dirty = true;
        Ok(true)
    }

    /// Copy a field map's edits into a note's raw fields.
    ///
    /// Returns whether the note changed. A clean map changes nothing.
    pub fn update_note_fields(note: &mut Note, fields: &FieldMap) -> bool {
        fields.is_dirty() && note.set_raw_fields(fields.to_raw())
    }

    /// Named view of a note's fields, or `None` when its model is missing.
    pub fn field_map(&self, note: &Note) -> Result<Option<FieldMap>> {
        Ok(self
            .model_for_note(note)?
            .map(|model| FieldMap::from_raw(&model, &note.flds)))
    }

    /// Set one named field of a stored note and save it.
    ///
    /// Returns whether the stored value changed.
    #[instrument(skip(self, value))]
    pub fn set_note_field(&mut self, note_id: i64, field: &str, value: &str) -> Result<bool> {
        let mut note = self.note(note_id)?.ok_or(ApkgError::NotFound {
            entity: "Note",
            id: note_id,
        })?;
        let model = self.model_for_note(&note)?.ok_or(ApkgError::NotFound {
            entity: "Model",
            id: note.mid,
        })?;
        let mut fields = FieldMap::from_raw(&model, &note.flds);
        if fields.get(field).is_none() {
            return Err(ApkgError::InvalidArgument(format!(
                "Note type '{}' has no field '{field}'",
                model.name
            )));
        }
        if !fields.set(field, value) {
            return Ok(false);
        }
        Self::update_note_fields(&mut note, &fields);
        self.save_note(&mut note)
    }

    // Cards

    pub fn cards(&self) -> Result<Vec<Card>> {
        CardRepository::new(&self.store).list()
    }

    pub fn card(&self, id: i64) -> Result<Option<Card>> {
        CardRepository::new(&self.store).get(id)
    }

    pub fn add_card(&mut self, card: &Card) -> Result<()> {
        CardRepository::new(&self.store).add(card)?;
        self.dirty = true;
        Ok(())
    }

    pub fn cards_for_note(&self, note_id: i64) -> Result<Vec<Card>> {
        CardRepository::new(&self.store).list_by_note(note_id)
    }

    pub fn cards_in_deck(&self, deck_id: i64) -> Result<Vec<Card>> {
        CardRepository::new(&self.store).list_by_deck(deck_id)
    }

    pub fn note_for_card(&self, card_id: i64) -> Result<Option<Note>> {
        NoteRepository::new(&self.store).get_by_card(card_id)
    }

    pub fn model_for_note(&self, note: &Note) -> Result<Option<Model>> {
        self.model(note.mid)
    }

    // Review history

    pub fn revlog(&self) -> Result<Vec<Revlog>> {
        RevlogRepository::new(&self.store).list()
    }

    pub fn revlog_entry(&self, id: i64) -> Result<Option<Revlog>> {
        RevlogRepository::new(&self.store).get(id)
    }

    pub fn reviews_of_card(&self, card_id: i64) -> Result<Vec<Revlog>> {
        RevlogRepository::new(&self.store).list_by_card(card_id)
    }

    pub fn graves(&self) -> Result<Vec<Grave>> {
        GraveRepository::new(&self.store).list()
    }

    pub fn grave(&self, oid: i64) -> Result<Option<Grave>> {
        GraveRepository::new(&self.store).get_by_oid(oid)
    }

    // Rendering

    /// Render a card through its note's model and the template at its
    /// ordinal. `None` when any of those is missing.
    #[instrument(skip(self, card), fields(card = card.id))]
    pub fn render_card(&self, card: &Card) -> Result<Option<RenderedCard>> {
        let Some(note) = self.note(card.nid)? else {
            warn!(nid = card.nid, "Card references a missing note");
            return Ok(None);
        };
        let Some(model) = self.model_for_note(&note)? else {
            warn!(mid = note.mid, "Note references a missing model");
            return Ok(None);
        };
        let Some(template) = model.template(card.ord) else {
            warn!(ord = card.ord, templates = model.tmpls.len(), "Card ordinal has no template");
            return Ok(None);
        };
        Ok(Some(render::render_card(&note, &model, template)))
    }

    // Media

    pub fn media_entries(&self) -> Vec<MediaEntry> {
        self.media.entries()
    }

    pub fn media_content(&self, filename: &str) -> Result<Option<Vec<u8>>> {
        self.media.content(filename)
    }

    /// Every media binding with its bytes.
    pub fn media_contents(&self) -> Result<Vec<(MediaEntry, Option<Vec<u8>>)>> {
        self.media.contents()
    }

    /// Add a media file and return its archive entry name.
    pub fn add_media(&mut self, filename: &str, bytes: Vec<u8>) -> Result<String> {
        let entry = self.media.add(filename, bytes)?;
        self.dirty = true;
        Ok(entry)
    }

    // Export

    /// Build a complete package from the current state.
    pub fn export(&self) -> Result<Vec<u8>> {
        package::build(&self.store, &self.media, self.options.compression)
    }

    /// Export to a file, replacing it atomically.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn export_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.export()?;
        package::write_atomic(path.as_ref(), &bytes)
    }

    /// Close the collection, writing it back to its origin when it was
    /// modified and write-back is enabled.
    ///
    /// A write-back failure is returned; the database and scratch files are
    /// released either way.
    #[instrument(skip(self), fields(dirty = self.dirty))]
    pub fn close(self) -> Result<()> {
        let flushed = match (&self.origin, self.dirty && self.options.write_back) {
            (Some(origin), true) => {
                info!(path = %origin.display(), "Writing collection back");
                self.export_to(origin)
            }
            (None, true) => {
                debug!("Modified collection has no origin; nothing written");
                Ok(())
            }
            _ => Ok(()),
        };
        self.store.close();
        flushed
    }
}
