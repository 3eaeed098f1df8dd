//! The `media` manifest: archive entry names bound to human filenames.

use std::collections::HashMap;
use std::io::{Read, Seek, Write};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument, trace, warn};
use zip::{CompressionMethod, ZipArchive};
use zip::result::ZipError;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::error::{ApkgError, Result};

use super::{ArchiveSource, MEDIA_MANIFEST_ENTRY};

/// One manifest binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaEntry {
    /// Decimal archive member name.
    pub entry: String,
    pub filename: String,
}

/// Mutable index of a collection's media.
///
/// Content of entries carried over from the source archive is read on
/// demand; added content is held in memory until export.
#[derive(Debug, Default)]
pub struct MediaIndex {
    /// Every binding read or added, including entries shadowed by a
    /// newer binding of the same filename.
    by_entry: HashMap<String, String>,
    /// Live entry of each filename.
    by_filename: HashMap<String, String>,
    added: HashMap<String, Vec<u8>>,
    next_entry: u64,
    source: Option<ArchiveSource>,
}

impl MediaIndex {
    /// Index with no media and no source archive.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse the manifest of an archive.
    ///
    /// A missing manifest yields an empty index; undecodable JSON is
    /// [`ApkgError::MalformedData`].
    #[instrument(skip(archive, source))]
    pub fn load<R: Read + Seek>(archive: &mut ZipArchive<R>, source: ArchiveSource) -> Result<Self> {
        let text = match archive.by_name(MEDIA_MANIFEST_ENTRY) {
            Ok(mut file) => {
                let mut text = String::new();
                file.read_to_string(&mut text)
                    .map_err(|e| ApkgError::malformed("media", e))?;
                text
            }
            Err(ZipError::FileNotFound) => {
                warn!("Package has no media manifest");
                String::new()
            }
            Err(e) => {
                return Err(ApkgError::InvalidContainer(format!(
                    "Failed to read media manifest: {e}"
                )));
            }
        };

        let mut index = Self {
            source: Some(source),
            ..Self::default()
        };
        if text.trim().is_empty() {
            return Ok(index);
        }

        let manifest: Map<String, Value> =
            serde_json::from_str(&text).map_err(|e| ApkgError::malformed("media", e))?;
        for (entry, filename) in manifest {
            let Value::String(filename) = filename else {
                return Err(ApkgError::malformed(
                    "media",
                    format!("entry {entry:?} does not map to a filename"),
                ));
            };
            if let Ok(n) = entry.parse::<u64>() {
                let next = n.checked_add(1).ok_or_else(|| {
                    ApkgError::malformed(
                        "media",
                        format!("entry {entry:?} leaves no room for further entries"),
                    )
                })?;
                index.next_entry = index.next_entry.max(next);
            }
            index.bind_loaded(entry, filename);
        }
        debug!(
            count = index.by_filename.len(),
            shadowed = index.by_entry.len() - index.by_filename.len(),
            next = index.next_entry,
            "Media manifest loaded"
        );
        Ok(index)
    }

    /// Record a manifest binding. When a filename is listed twice the
    /// higher entry is live and the other is kept for export.
    fn bind_loaded(&mut self, entry: String, filename: String) {
        let live_is_newer = self
            .by_filename
            .get(&filename)
            .is_some_and(|live| entry_order(live, &entry).is_gt());
        if live_is_newer {
            debug!(entry = %entry, filename = %filename, "Media entry shadowed");
        } else if let Some(shadowed) = self.by_filename.insert(filename.clone(), entry.clone()) {
            debug!(entry = %shadowed, filename = %filename, "Media entry shadowed");
        }
        self.by_entry.insert(entry, filename);
    }

    pub fn len(&self) -> usize {
        self.by_filename.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_filename.is_empty()
    }

    /// Archive entry name holding `filename`.
    pub fn entry_name(&self, filename: &str) -> Option<&str> {
        self.by_filename.get(filename).map(String::as_str)
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.by_filename.keys().map(String::as_str)
    }

    /// Live bindings ordered by numeric entry name.
    pub fn entries(&self) -> Vec<MediaEntry> {
        sorted(self.by_filename.iter().map(|(filename, entry)| (entry, filename)))
    }

    /// Every binding that is written on export, shadowed ones included.
    fn stored_entries(&self) -> Vec<MediaEntry> {
        sorted(self.by_entry.iter())
    }

    /// Bytes of a media file, or `None` if unknown or absent from the archive.
    #[instrument(skip(self))]
    pub fn content(&self, filename: &str) -> Result<Option<Vec<u8>>> {
        let Some(entry) = self.by_filename.get(filename) else {
            return Ok(None);
        };
        if let Some(bytes) = self.added.get(entry) {
            return Ok(Some(bytes.clone()));
        }
        match &self.source {
            Some(source) => read_entry(&mut source.archive()?, entry),
            None => Ok(None),
        }
    }

    /// Live bindings with their bytes, read through one pass over the
    /// source archive.
    #[instrument(skip(self))]
    pub fn contents(&self) -> Result<Vec<(MediaEntry, Option<Vec<u8>>)>> {
        let mut source = self.source.as_ref().map(ArchiveSource::archive).transpose()?;
        self.entries()
            .into_iter()
            .map(|media| {
                let bytes = match (self.added.get(&media.entry), source.as_mut()) {
                    (Some(bytes), _) => Some(bytes.clone()),
                    (None, Some(archive)) => read_entry(archive, &media.entry)?,
                    (None, None) => None,
                };
                Ok((media, bytes))
            })
            .collect()
    }

    /// Store new content under `filename` and return its entry name.
    ///
    /// Entry numbers are never reused; re-adding a filename binds it to a
    /// fresh entry and drops every earlier binding of that name.
    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    pub fn add(&mut self, filename: &str, bytes: Vec<u8>) -> Result<String> {
        let next = self.next_entry.checked_add(1).ok_or_else(|| {
            ApkgError::malformed("media", "entry numbers are exhausted")
        })?;
        let entry = self.next_entry.to_string();
        self.next_entry = next;

        if self.by_filename.remove(filename).is_some() {
            let added = &mut self.added;
            self.by_entry.retain(|previous, bound| {
                if bound.as_str() != filename {
                    return true;
                }
                added.remove(previous);
                debug!(previous = %previous, "Media filename rebound");
                false
            });
        }
        self.by_filename.insert(filename.to_string(), entry.clone());
        self.by_entry.insert(entry.clone(), filename.to_string());
        self.added.insert(entry.clone(), bytes);
        debug!(entry = %entry, "Media added");
        Ok(entry)
    }

    /// Write every media member and return the manifest of what was written.
    ///
    /// Carried-over members already compressed with `method` are copied raw
    /// from the source archive; others are decoded and written again.
    pub(crate) fn write_entries<W: Write + Seek>(
        &self,
        writer: &mut ZipWriter<W>,
        method: CompressionMethod,
    ) -> Result<Map<String, Value>> {
        let options = SimpleFileOptions::default().compression_method(method);
        let mut source = self.source.as_ref().map(ArchiveSource::archive).transpose()?;
        let mut manifest = Map::new();

        for MediaEntry { entry, filename } in self.stored_entries() {
            if let Some(bytes) = self.added.get(&entry) {
                writer.start_file(entry.as_str(), options).map_err(write_err)?;
                writer.write_all(bytes)?;
            } else {
                let Some(archive) = source.as_mut() else {
                    warn!(entry = %entry, "Media entry has no content; skipped");
                    continue;
                };
                match archive.by_name(&entry) {
                    Ok(file) if file.compression() == method => {
                        writer.raw_copy_file(file).map_err(write_err)?;
                    }
                    Ok(file) => {
                        let bytes = read_file(file, &entry)?;
                        writer.start_file(entry.as_str(), options).map_err(write_err)?;
                        writer.write_all(&bytes)?;
                    }
                    Err(ZipError::FileNotFound) => {
                        warn!(entry = %entry, "Media entry missing from source archive; skipped");
                        continue;
                    }
                    Err(e) => {
                        return Err(ApkgError::InvalidContainer(format!(
                            "Failed to copy media entry {entry}: {e}"
                        )));
                    }
                }
            }
            trace!(entry = %entry, filename = %filename, "Wrote media entry");
            manifest.insert(entry, Value::String(filename));
        }
        Ok(manifest)
    }
}

fn sorted<'a>(bindings: impl Iterator<Item = (&'a String, &'a String)>) -> Vec<MediaEntry> {
    let mut entries: Vec<MediaEntry> = bindings
        .map(|(entry, filename)| MediaEntry {
            entry: entry.clone(),
            filename: filename.clone(),
        })
        .collect();
    entries.sort_by(|a, b| entry_order(&a.entry, &b.entry));
    entries
}

/// Bytes of one member, or `None` when the manifest lists it but the
/// archive does not hold it.
fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, entry: &str) -> Result<Option<Vec<u8>>> {
    match archive.by_name(entry) {
        Ok(file) => read_file(file, entry).map(Some),
        Err(ZipError::FileNotFound) => {
            warn!(entry = %entry, "Media entry listed in manifest is missing from archive");
            Ok(None)
        }
        Err(e) => Err(ApkgError::InvalidContainer(format!(
            "Failed to open media entry {entry}: {e}"
        ))),
    }
}

fn read_file<R: Read>(mut file: R, entry: &str) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| {
        ApkgError::InvalidContainer(format!("Failed to read media entry {entry}: {e}"))
    })?;
    Ok(bytes)
}

fn entry_order(a: &str, b: &str) -> std::cmp::Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

fn write_err(e: ZipError) -> ApkgError {
    ApkgError::Storage(format!("Failed to write package: {e}"))
}
