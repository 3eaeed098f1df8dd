//! Read-only access to deletion records.

use rusqlite::{Row, params};

use crate::entity::Grave;
use crate::error::Result;
use crate::store::{SchemaStore, int_at};

use super::{query_all, query_one};

pub struct GraveRepository<'s> {
    store: &'s SchemaStore,
}

impl<'s> GraveRepository<'s> {
    pub const fn new(store: &'s SchemaStore) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Result<Vec<Grave>> {
        query_all(self.store, "graves", "SELECT usn, oid, type FROM graves", [], map_row)
    }

    /// The grave recording deletion of `oid`. Graves have no id of their own.
    pub fn get_by_oid(&self, oid: i64) -> Result<Option<Grave>> {
        query_one(
            self.store,
            "grave",
            "SELECT usn, oid, type FROM graves WHERE oid = ?1 LIMIT 1",
            params![oid],
            map_row,
        )
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Grave> {
    Ok(Grave {
        usn: int_at(row, 0)?,
        oid: int_at(row, 1)?,
        grave_type: int_at(row, 2)?,
    })
}
