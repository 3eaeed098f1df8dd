//! Rows of the `notes` table.

use rusqlite::{Row, params};
use tracing::{debug, instrument};

use crate::entity::Note;
use crate::error::{ApkgError, Result};
use crate::guid;
use crate::store::{SchemaStore, int_at, text_at};

use super::{query_all, query_one};

const COLUMNS: &str = "id, guid, mid, mod, usn, tags, flds, sfld, csum, flags, data";

pub struct NoteRepository<'s> {
    store: &'s SchemaStore,
}

impl<'s> NoteRepository<'s> {
    pub const fn new(store: &'s SchemaStore) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Result<Vec<Note>> {
        query_all(
            self.store,
            "notes",
            &format!("SELECT {COLUMNS} FROM notes"),
            [],
            map_row,
        )
    }

    pub fn get(&self, id: i64) -> Result<Option<Note>> {
        query_one(
            self.store,
            "note",
            &format!("SELECT {COLUMNS} FROM notes WHERE id = ?1"),
            params![id],
            map_row,
        )
    }

    /// Notes of one model.
    pub fn list_by_model(&self, mid: i64) -> Result<Vec<Note>> {
        query_all(
            self.store,
            "notes",
            &format!("SELECT {COLUMNS} FROM notes WHERE mid = ?1"),
            params![mid],
            map_row,
        )
    }

    /// The note owning a card.
    pub fn get_by_card(&self, card_id: i64) -> Result<Option<Note>> {
        let columns = COLUMNS
            .split(", ")
            .map(|c| format!("n.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        query_one(
            self.store,
            "note",
            &format!("SELECT {columns} FROM notes n JOIN cards c ON c.nid = n.id WHERE c.id = ?1"),
            params![card_id],
            map_row,
        )
    }

    /// Insert a note.
    ///
    /// An empty guid is replaced by a generated one, an empty sort field by
    /// the first field and a zero modification time by the current time.
    /// The note is updated in place with what was written.
    #[instrument(skip(self, note), fields(id = note.id))]
    pub fn add(&self, note: &mut Note) -> Result<()> {
        if note.guid.is_empty() {
            note.guid = guid::generate();
        }
        if note.sfld.is_empty() {
            note.sfld = note.first_field().to_string();
        }
        if note.modified == 0 {
            note.modified = chrono::Utc::now().timestamp();
        }

        self.store
            .conn()
            .execute(
                &format!(
                    "INSERT INTO notes ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
                ),
                params![
                    note.id,
                    note.guid,
                    note.mid,
                    note.modified,
                    note.usn,
                    note.tags,
                    note.flds,
                    note.sfld,
                    note.csum,
                    note.flags,
                    note.data,
                ],
            )
            .map_err(|e| ApkgError::Persistence(format!("Failed to insert note: {e}")))?;
        note.dirty = false;
        debug!(guid = %note.guid, "Note stored");
        Ok(())
    }

    /// Write back a note's raw fields, sort field and modification time.
    ///
    /// Updating a note that does not exist is a persistence error.
    #[instrument(skip(self, note), fields(id = note.id))]
    pub fn update_fields(&self, note: &mut Note) -> Result<()> {
        note.sfld = note.first_field().to_string();
        note.modified = chrono::Utc::now().timestamp();
        let rows = self
            .store
            .conn()
            .execute(
                "UPDATE notes SET flds = ?1, sfld = ?2, mod = ?3 WHERE id = ?4",
                params![note.flds, note.sfld, note.modified, note.id],
            )
            .map_err(|e| ApkgError::Persistence(format!("Failed to update note: {e}")))?;
        if rows == 0 {
            return Err(ApkgError::Persistence(format!(
                "Failed to update note {}: no such row",
                note.id
            )));
        }
        note.dirty = false;
        debug!("Note fields saved");
        Ok(())
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: int_at(row, 0)?,
        guid: text_at(row, 1)?,
        mid: int_at(row, 2)?,
        modified: int_at(row, 3)?,
        usn: int_at(row, 4)?,
        tags: text_at(row, 5)?,
        flds: text_at(row, 6)?,
        sfld: text_at(row, 7)?,
        csum: int_at(row, 8)?,
        flags: int_at(row, 9)?,
        data: text_at(row, 10)?,
        dirty: false,
    })
}
