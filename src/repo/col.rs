//! The singleton `col` row.

use rusqlite::Row;

use crate::entity::Col;
use crate::error::Result;
use crate::store::{SchemaStore, int_at, text_at};

use super::query_one;

pub struct ColRepository<'s> {
    store: &'s SchemaStore,
}

impl<'s> ColRepository<'s> {
    pub const fn new(store: &'s SchemaStore) -> Self {
        Self { store }
    }

    /// The collection row, or `None` for a database without one.
    pub fn get(&self) -> Result<Option<Col>> {
        query_one(
            self.store,
            "col",
            "SELECT id, crt, mod, scm, ver, dty, usn, ls, conf, models, decks, dconf, tags FROM col LIMIT 1",
            [],
            map_row,
        )
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Col> {
    Ok(Col {
        id: int_at(row, 0)?,
        crt: int_at(row, 1)?,
        modified: int_at(row, 2)?,
        scm: int_at(row, 3)?,
        ver: int_at(row, 4)?,
        dty: int_at(row, 5)?,
        usn: int_at(row, 6)?,
        ls: int_at(row, 7)?,
        conf: text_at(row, 8)?,
        models: text_at(row, 9)?,
        decks: text_at(row, 10)?,
        dconf: text_at(row, 11)?,
        tags: text_at(row, 12)?,
    })
}
