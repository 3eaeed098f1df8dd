//! Name-addressable, dirty-tracked view of a note's raw fields.
//!
//! Slots are bound to names by their position in the model's field list.
//! The stored `ord` attribute of a field is ignored for binding.

use std::collections::HashMap;

use serde::Serialize;

use crate::entity::{FIELD_SEPARATOR, Model};

/// One named slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldEntry {
    pub name: String,
    pub value: String,
    #[serde(skip)]
    modified: bool,
}

impl FieldEntry {
    pub const fn is_modified(&self) -> bool {
        self.modified
    }
}

/// Parsed fields of one note against one model.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    entries: Vec<FieldEntry>,
    index: HashMap<String, usize>,
    dirty: bool,
}

impl FieldMap {
    /// Split `raw` on the unit separator and bind slots to the model's fields.
    ///
    /// Slots missing from `raw` are empty strings. Extra slots beyond the
    /// model's field count are dropped.
    pub fn from_raw(model: &Model, raw: &str) -> Self {
        let mut values = raw.split(FIELD_SEPARATOR);
        let mut entries = Vec::with_capacity(model.flds.len());
        let mut index = HashMap::with_capacity(model.flds.len());

        for (pos, name) in model.field_names().enumerate() {
            let value = values.next().unwrap_or_default().to_string();
            // First definition wins for duplicated names.
            index.entry(name.to_string()).or_insert(pos);
            entries.push(FieldEntry {
                name: name.to_string(),
                value,
                modified: false,
            });
        }

        Self {
            entries,
            index,
            dirty: false,
        }
    }

    /// Value of a named field, or `None` if the model has no such field.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.index
            .get(name)
            .map(|&i| self.entries[i].value.as_str())
    }

    /// Set a named field. Returns whether the stored value changed.
    ///
    /// Unknown names are ignored and report no change.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> bool {
        let Some(&i) = self.index.get(name) else {
            return false;
        };
        let value = value.into();
        let entry = &mut self.entries[i];
        if entry.value == value {
            return false;
        }
        entry.value = value;
        entry.modified = true;
        self.dirty = true;
        true
    }

    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn reset_dirty(&mut self) {
        self.dirty = false;
        for entry in &mut self.entries {
            entry.modified = false;
        }
    }

    /// Re-join slots with the unit separator in positional order.
    pub fn to_raw(&self) -> String {
        let mut raw = String::new();
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                raw.push(FIELD_SEPARATOR);
            }
            raw.push_str(&entry.value);
        }
        raw
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Plain `{name -> value}` map used by the template engine.
    pub fn to_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::with_capacity(self.entries.len());
        for entry in &self.entries {
            map.entry(entry.name.clone())
                .or_insert_with(|| entry.value.clone());
        }
        map
    }
}

impl<'a> IntoIterator for &'a FieldMap {
    type Item = &'a FieldEntry;
    type IntoIter = std::slice::Iter<'a, FieldEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
