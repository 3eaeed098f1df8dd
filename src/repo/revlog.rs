//! Read-only access to the review log.

use rusqlite::{Row, params};

use crate::entity::Revlog;
use crate::error::Result;
use crate::store::{SchemaStore, int_at};

use super::{query_all, query_one};

const COLUMNS: &str = "id, cid, usn, ease, ivl, lastIvl, factor, time, type";

pub struct RevlogRepository<'s> {
    store: &'s SchemaStore,
}

impl<'s> RevlogRepository<'s> {
    pub const fn new(store: &'s SchemaStore) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Result<Vec<Revlog>> {
        query_all(
            self.store,
            "revlog",
            &format!("SELECT {COLUMNS} FROM revlog"),
            [],
            map_row,
        )
    }

    pub fn get(&self, id: i64) -> Result<Option<Revlog>> {
        query_one(
            self.store,
            "revlog entry",
            &format!("SELECT {COLUMNS} FROM revlog WHERE id = ?1"),
            params![id],
            map_row,
        )
    }

    /// Reviews of one card, oldest first.
    pub fn list_by_card(&self, cid: i64) -> Result<Vec<Revlog>> {
        query_all(
            self.store,
            "revlog",
            &format!("SELECT {COLUMNS} FROM revlog WHERE cid = ?1 ORDER BY id"),
            params![cid],
            map_row,
        )
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Revlog> {
    Ok(Revlog {
        id: int_at(row, 0)?,
        cid: int_at(row, 1)?,
        usn: int_at(row, 2)?,
        ease: int_at(row, 3)?,
        ivl: int_at(row, 4)?,
        last_ivl: int_at(row, 5)?,
        factor: int_at(row, 6)?,
        time: int_at(row, 7)?,
        review_type: int_at(row, 8)?,
    })
}
