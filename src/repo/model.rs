//! Note types from the `col.models` JSON object (both generations).

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::entity::Model;
use crate::error::{ApkgError, Result};
use crate::store::{ColBlob, SchemaStore};

use super::{parse_id_key, parse_id_map};

const WHAT: &str = "models";

pub struct ModelRepository<'s> {
    store: &'s SchemaStore,
}

impl<'s> ModelRepository<'s> {
    pub const fn new(store: &'s SchemaStore) -> Self {
        Self { store }
    }

    /// All models in stored key order.
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<Model>> {
        let map = parse_id_map(WHAT, &self.store.col_json(ColBlob::Models)?)?;
        map.into_iter()
            .map(|(key, value)| decode(&key, value))
            .collect()
    }

    #[instrument(skip(self))]
    pub fn get(&self, id: i64) -> Result<Option<Model>> {
        let mut map = parse_id_map(WHAT, &self.store.col_json(ColBlob::Models)?)?;
        let key = id.to_string();
        map.remove(&key).map(|value| decode(&key, value)).transpose()
    }

    /// Insert or replace a model by id.
    #[instrument(skip(self, model), fields(id = model.id, name = %model.name))]
    pub fn add(&self, model: &Model) -> Result<()> {
        if model.id == 0 {
            return Err(ApkgError::InvalidArgument(
                "Model id must be non-zero".to_string(),
            ));
        }
        let misordered = model.misordered_fields();
        if !misordered.is_empty() {
            warn!(
                count = misordered.len(),
                "Model has fields whose ord disagrees with their position; position is used"
            );
        }

        let mut map = parse_id_map(WHAT, &self.store.col_json(ColBlob::Models)?)?;
        let value = serde_json::to_value(model).map_err(|e| ApkgError::malformed(WHAT, e))?;
        map.insert(model.id.to_string(), value);
        let text = serde_json::to_string(&map).map_err(|e| ApkgError::malformed(WHAT, e))?;
        self.store.set_col_json(ColBlob::Models, &text)?;
        debug!("Model stored");
        Ok(())
    }
}

fn decode(key: &str, value: Value) -> Result<Model> {
    let id = parse_id_key(WHAT, key)?;
    let mut model: Model = serde_json::from_value(value)
        .map_err(|e| ApkgError::malformed(WHAT, format!("model {key}: {e}")))?;
    if model.id == 0 {
        model.id = id;
    }
    Ok(model)
}
