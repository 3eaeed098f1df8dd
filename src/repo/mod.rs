//! Per-entity repositories over a mounted [`SchemaStore`].
//!
//! Each repository borrows the store for its lifetime. Lookups report misses
//! as `None` or an empty list; storage failures surface as
//! [`ApkgError::Persistence`](crate::error::ApkgError::Persistence) and
//! undecodable JSON blobs as
//! [`ApkgError::MalformedData`](crate::error::ApkgError::MalformedData).

mod card;
mod col;
mod deck;
mod grave;
mod model;
mod note;
mod revlog;

pub use card::CardRepository;
pub use col::ColRepository;
pub use deck::DeckRepository;
pub use grave::GraveRepository;
pub use model::ModelRepository;
pub use note::NoteRepository;
pub use revlog::RevlogRepository;

use rusqlite::{Params, Row};
use serde_json::{Map, Value};

use crate::error::{ApkgError, Result};
use crate::store::SchemaStore;

/// Run a query and collect every mapped row.
fn query_all<T, P: Params>(
    store: &SchemaStore,
    what: &str,
    sql: &str,
    params: P,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
    let mut stmt = store
        .conn()
        .prepare(sql)
        .map_err(|e| ApkgError::Persistence(format!("Failed to prepare {what} query: {e}")))?;
    let rows = stmt
        .query_map(params, map)
        .map_err(|e| ApkgError::Persistence(format!("Failed to query {what}: {e}")))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| ApkgError::Persistence(format!("Failed to read {what} row: {e}")))?);
    }
    Ok(out)
}

/// Run a query expected to return at most one row.
fn query_one<T, P: Params>(
    store: &SchemaStore,
    what: &str,
    sql: &str,
    params: P,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Option<T>> {
    match store.conn().query_row(sql, params, map) {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(ApkgError::Persistence(format!("Failed to get {what}: {e}"))),
    }
}

/// Decode a `col` JSON blob keyed by stringified id. Blank text is empty.
fn parse_id_map(what: &'static str, text: &str) -> Result<Map<String, Value>> {
    if text.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(text).map_err(|e| ApkgError::malformed(what, e))? {
        Value::Object(map) => Ok(map),
        other => Err(ApkgError::malformed(
            what,
            format!("expected a JSON object, found {}", json_kind(&other)),
        )),
    }
}

fn parse_id_key(what: &'static str, key: &str) -> Result<i64> {
    key.parse()
        .map_err(|_| ApkgError::malformed(what, format!("key {key:?} is not a numeric id")))
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
