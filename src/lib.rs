//! apkg - read, edit, render and write Anki `.apkg` packages.
//!
//! The library is layered bottom-up:
//!
//! - `package`: zip container codec and media index
//! - `store`: the mounted SQLite database and its schema generation
//! - `repo`: per-entity repositories over the store
//! - `entity`, `fields`, `guid`: domain types and the named field view
//! - `render`: template substitution for card questions and answers
//! - `collection`: the facade tying the above together
//!
//! `cli`, `output`, `config` and `logging` back the `apkg` binary.
#![forbid(unsafe_code)]

pub mod cli;
pub mod collection;
pub mod config;
pub mod entity;
pub mod error;
pub mod fields;
pub mod guid;
pub mod logging;
pub mod output;
pub mod package;
pub mod render;
pub mod repo;
pub mod store;

pub use collection::{Collection, CollectionSummary};
pub use error::{ApkgError, Result};
pub use package::{Compression, OpenOptions, OpenStrategy};
