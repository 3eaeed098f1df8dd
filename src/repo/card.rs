//! Rows of the `cards` table, every column included.

use rusqlite::{Row, params};
use tracing::{debug, instrument};

use crate::entity::Card;
use crate::error::{ApkgError, Result};
use crate::store::{SchemaStore, int_at, text_at};

use super::{query_all, query_one};

const COLUMNS: &str = "id, nid, did, ord, mod, usn, type, queue, due, ivl, factor, reps, lapses, left, odue, odid, flags, data";

pub struct CardRepository<'s> {
    store: &'s SchemaStore,
}

impl<'s> CardRepository<'s> {
    pub const fn new(store: &'s SchemaStore) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Result<Vec<Card>> {
        query_all(
            self.store,
            "cards",
            &format!("SELECT {COLUMNS} FROM cards"),
            [],
            map_row,
        )
    }

    pub fn get(&self, id: i64) -> Result<Option<Card>> {
        query_one(
            self.store,
            "card",
            &format!("SELECT {COLUMNS} FROM cards WHERE id = ?1"),
            params![id],
            map_row,
        )
    }

    /// Cards generated from one note.
    pub fn list_by_note(&self, nid: i64) -> Result<Vec<Card>> {
        query_all(
            self.store,
            "cards",
            &format!("SELECT {COLUMNS} FROM cards WHERE nid = ?1 ORDER BY ord"),
            params![nid],
            map_row,
        )
    }

    /// Cards filed in one deck.
    pub fn list_by_deck(&self, did: i64) -> Result<Vec<Card>> {
        query_all(
            self.store,
            "cards",
            &format!("SELECT {COLUMNS} FROM cards WHERE did = ?1"),
            params![did],
            map_row,
        )
    }

    #[instrument(skip(self, card), fields(id = card.id, nid = card.nid, did = card.did))]
    pub fn add(&self, card: &Card) -> Result<()> {
        self.store
            .conn()
            .execute(
                &format!(
                    "INSERT INTO cards ({COLUMNS}) VALUES \
                     (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)"
                ),
                params![
                    card.id,
                    card.nid,
                    card.did,
                    card.ord,
                    card.modified,
                    card.usn,
                    card.card_type,
                    card.queue,
                    card.due,
                    card.ivl,
                    card.factor,
                    card.reps,
                    card.lapses,
                    card.left,
                    card.odue,
                    card.odid,
                    card.flags,
                    card.data,
                ],
            )
            .map_err(|e| ApkgError::Persistence(format!("Failed to insert card: {e}")))?;
        debug!("Card stored");
        Ok(())
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Card> {
    Ok(Card {
        id: int_at(row, 0)?,
        nid: int_at(row, 1)?,
        did: int_at(row, 2)?,
        ord: int_at(row, 3)?,
        modified: int_at(row, 4)?,
        usn: int_at(row, 5)?,
        card_type: int_at(row, 6)?,
        queue: int_at(row, 7)?,
        due: int_at(row, 8)?,
        ivl: int_at(row, 9)?,
        factor: int_at(row, 10)?,
        reps: int_at(row, 11)?,
        lapses: int_at(row, 12)?,
        left: int_at(row, 13)?,
        odue: int_at(row, 14)?,
        odid: int_at(row, 15)?,
        flags: int_at(row, 16)?,
        data: text_at(row, 17)?,
    })
}
