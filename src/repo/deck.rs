//! Decks from either the `decks` table or the `col.decks` JSON object.

use rusqlite::{Row, params};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::entity::Deck;
use crate::error::{ApkgError, Result};
use crate::store::{ColBlob, Generation, SchemaStore, int_at, text_at};

use super::{parse_id_key, parse_id_map, query_all, query_one};

const WHAT: &str = "decks";

pub struct DeckRepository<'s> {
    store: &'s SchemaStore,
}

impl<'s> DeckRepository<'s> {
    pub const fn new(store: &'s SchemaStore) -> Self {
        Self { store }
    }

    /// All decks. Legacy JSON decks come back in stored key order.
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<Deck>> {
        match self.store.generation() {
            Generation::TypedTables => query_all(
                self.store,
                WHAT,
                "SELECT id, name FROM decks",
                [],
                map_row,
            ),
            Generation::LegacyJson => self.list_legacy(),
        }
    }

    #[instrument(skip(self))]
    pub fn get(&self, id: i64) -> Result<Option<Deck>> {
        match self.store.generation() {
            Generation::TypedTables => query_one(
                self.store,
                "deck",
                "SELECT id, name FROM decks WHERE id = ?1",
                params![id],
                map_row,
            ),
            Generation::LegacyJson => Ok(self.list_legacy()?.into_iter().find(|d| d.id == id)),
        }
    }

    /// Insert or replace a deck by id.
    #[instrument(skip(self), fields(id = deck.id, name = %deck.name))]
    pub fn add(&self, deck: &Deck) -> Result<()> {
        match self.store.generation() {
            Generation::TypedTables => {
                self.store
                    .conn()
                    .execute(
                        "INSERT OR REPLACE INTO decks (id, name) VALUES (?1, ?2)",
                        params![deck.id, deck.name],
                    )
                    .map_err(|e| ApkgError::Persistence(format!("Failed to insert deck: {e}")))?;
            }
            Generation::LegacyJson => self.add_legacy(deck)?,
        }
        debug!("Deck stored");
        Ok(())
    }

    fn list_legacy(&self) -> Result<Vec<Deck>> {
        let map = parse_id_map(WHAT, &self.store.col_json(ColBlob::Decks)?)?;
        map.iter()
            .map(|(key, value)| {
                let id = parse_id_key(WHAT, key)?;
                let name = value
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ApkgError::malformed(WHAT, format!("deck {key} has no name")))?;
                Ok(Deck::new(id, name))
            })
            .collect()
    }

    /// Read-merge-write of the whole `col.decks` object. Other keys of an
    /// existing entry are left untouched.
    fn add_legacy(&self, deck: &Deck) -> Result<()> {
        let mut map = parse_id_map(WHAT, &self.store.col_json(ColBlob::Decks)?)?;
        let key = deck.id.to_string();
        match map.get_mut(&key) {
            Some(Value::Object(existing)) => {
                existing.insert("id".to_string(), json!(deck.id));
                existing.insert("name".to_string(), json!(deck.name));
            }
            _ => {
                map.insert(key, json!({ "id": deck.id, "name": deck.name }));
            }
        }
        let text = serde_json::to_string(&map).map_err(|e| ApkgError::malformed(WHAT, e))?;
        self.store.set_col_json(ColBlob::Decks, &text)
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Deck> {
    Ok(Deck {
        id: int_at(row, 0)?,
        name: text_at(row, 1)?,
    })
}
