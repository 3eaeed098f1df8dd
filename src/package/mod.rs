//! `.apkg` container codec.
//!
//! A package is a zip archive holding the collection database, a `media`
//! manifest and one member per media file. [`open`] mounts the database
//! using one of three [`OpenStrategy`] variants; [`build`] writes a new
//! archive from a live store and media index.

pub mod media;

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};
use zip::result::ZipError;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::{CompressionMethod, ZipArchive};

use crate::error::{ApkgError, Result};
use crate::store::{SchemaStore, Scratch};

pub use media::{MediaEntry, MediaIndex};

/// Database member written by current clients, and by every export.
pub const DATABASE_ENTRY: &str = "collection.anki21";
/// Database member of older packages, read only when the newer one is absent.
pub const LEGACY_DATABASE_ENTRY: &str = "collection.anki2";
pub const MEDIA_MANIFEST_ENTRY: &str = "media";

/// How the database member is mounted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OpenStrategy {
    /// Restore into an in-memory connection; no file outlives the open call.
    #[default]
    Memory,
    /// Write the member to a private scratch directory and open it there.
    ScratchFile,
    /// Copy the member straight from the archive into the scratch directory.
    Streamed,
}

/// Compression applied to every member on export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Compression {
    #[default]
    Deflated,
    Stored,
}

impl Compression {
    const fn method(self) -> CompressionMethod {
        match self {
            Self::Deflated => CompressionMethod::Deflated,
            Self::Stored => CompressionMethod::Stored,
        }
    }
}

/// Settings for opening and exporting a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOptions {
    pub strategy: OpenStrategy,
    pub scratch: Scratch,
    pub compression: Compression,
    /// Rewrite the originating file on close when there are unsaved changes.
    pub write_back: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            strategy: OpenStrategy::default(),
            scratch: Scratch::default(),
            compression: Compression::default(),
            write_back: true,
        }
    }
}

impl OpenOptions {
    #[must_use]
    pub const fn with_strategy(mut self, strategy: OpenStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// Where archive bytes come from. Cloning is cheap.
#[derive(Debug, Clone)]
pub enum ArchiveSource {
    Bytes(Arc<[u8]>),
    File(PathBuf),
}

impl ArchiveSource {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::Bytes(Arc::from(bytes))
    }

    /// A fresh reader over the archive.
    pub fn archive(&self) -> Result<ZipArchive<Box<dyn ReadSeek>>> {
        let reader: Box<dyn ReadSeek> = match self {
            Self::Bytes(bytes) => Box::new(Cursor::new(Arc::clone(bytes))),
            Self::File(path) => Box::new(BufReader::new(File::open(path)?)),
        };
        ZipArchive::new(reader)
            .map_err(|e| ApkgError::InvalidContainer(format!("Not a readable zip archive: {e}")))
    }
}

/// A mounted package.
#[derive(Debug)]
pub struct OpenedPackage {
    pub store: SchemaStore,
    pub media: MediaIndex,
}

/// Mount the database member of a package and load its media manifest.
#[instrument(skip(source, options), fields(strategy = ?options.strategy))]
pub fn open(source: ArchiveSource, options: &OpenOptions) -> Result<OpenedPackage> {
    let mut archive = source.archive()?;
    let entry = locate_database(&archive)?;
    debug!(entry, "Located database member");

    let store = match options.strategy {
        OpenStrategy::Memory => {
            let bytes = read_member(&mut archive, entry)?;
            let file = options.scratch.file(".anki21")?;
            std::fs::write(file.path(), &bytes)
                .map_err(|e| ApkgError::Storage(format!("Failed to write scratch database: {e}")))?;
            let store = SchemaStore::restore_from(file.path(), options.scratch.clone())?;
            if let Err(e) = file.close() {
                warn!(error = %e, "Failed to remove scratch database");
            }
            store
        }
        OpenStrategy::ScratchFile => {
            let bytes = read_member(&mut archive, entry)?;
            let dir = options.scratch.dir()?;
            let path = dir.path().join(DATABASE_ENTRY);
            std::fs::write(&path, &bytes)
                .map_err(|e| ApkgError::Storage(format!("Failed to write scratch database: {e}")))?;
            SchemaStore::open_file(&path, dir, options.scratch.clone())?
        }
        OpenStrategy::Streamed => {
            let dir = options.scratch.dir()?;
            let path = dir.path().join(DATABASE_ENTRY);
            {
                let mut member = archive.by_name(entry).map_err(|e| {
                    ApkgError::InvalidContainer(format!("Failed to open {entry}: {e}"))
                })?;
                let mut out = File::create(&path).map_err(|e| {
                    ApkgError::Storage(format!("Failed to create scratch database: {e}"))
                })?;
                let copied = std::io::copy(&mut member, &mut out)
                    .map_err(|e| ApkgError::Storage(format!("Failed to stream {entry}: {e}")))?;
                debug!(bytes = copied, "Streamed database member");
            }
            SchemaStore::open_file(&path, dir, options.scratch.clone())?
        }
    };

    let media = MediaIndex::load(&mut archive, source)?;
    info!(generation = %store.generation(), media = media.len(), "Package opened");
    Ok(OpenedPackage { store, media })
}

fn locate_database<R: Read + Seek>(archive: &ZipArchive<R>) -> Result<&'static str> {
    let mut legacy = false;
    for name in archive.file_names() {
        if name == DATABASE_ENTRY {
            return Ok(DATABASE_ENTRY);
        }
        legacy |= name == LEGACY_DATABASE_ENTRY;
    }
    if legacy {
        Ok(LEGACY_DATABASE_ENTRY)
    } else {
        Err(ApkgError::InvalidContainer(format!(
            "Package contains neither {DATABASE_ENTRY} nor {LEGACY_DATABASE_ENTRY}"
        )))
    }
}

fn read_member<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>> {
    let mut member = archive
        .by_name(name)
        .map_err(|e| ApkgError::InvalidContainer(format!("Failed to open {name}: {e}")))?;
    let mut bytes = Vec::with_capacity(usize::try_from(member.size()).unwrap_or(0));
    member
        .read_to_end(&mut bytes)
        .map_err(|e| ApkgError::InvalidContainer(format!("Failed to read {name}: {e}")))?;
    Ok(bytes)
}

/// Write a complete package: database, media members, then the manifest.
#[instrument(skip_all, fields(compression = ?compression))]
pub fn build(store: &SchemaStore, media: &MediaIndex, compression: Compression) -> Result<Vec<u8>> {
    let database = store.snapshot()?;
    let options = SimpleFileOptions::default().compression_method(compression.method());
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    writer.start_file(DATABASE_ENTRY, options).map_err(write_err)?;
    writer.write_all(&database)?;

    let manifest = media.write_entries(&mut writer, compression.method())?;
    let manifest_json = serde_json::to_vec(&manifest).map_err(|e| ApkgError::malformed("media", e))?;
    writer.start_file(MEDIA_MANIFEST_ENTRY, options).map_err(write_err)?;
    writer.write_all(&manifest_json)?;

    let bytes = writer.finish().map_err(write_err)?.into_inner();
    info!(bytes = bytes.len(), media = manifest.len(), "Package built");
    Ok(bytes)
}

fn write_err(e: ZipError) -> ApkgError {
    ApkgError::Storage(format!("Failed to write package: {e}"))
}

/// Replace `path` with `bytes` through a temp file in the same directory.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| ApkgError::Storage(format!("Failed to create {}: {e}", dir.display())))?;
    tmp.write_all(bytes)
        .map_err(|e| ApkgError::Storage(format!("Failed to write package: {e}")))?;
    tmp.persist(path).map_err(|e| {
        ApkgError::Storage(format!("Failed to replace {}: {}", path.display(), e.error))
    })?;
    debug!(path = %path.display(), "Package written");
    Ok(())
}
