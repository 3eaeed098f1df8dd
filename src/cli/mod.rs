//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::package::OpenStrategy;

/// apkg - inspect, edit, render and re-export Anki packages.
///
/// Robot Mode: Use --robot or --format=json for machine-parseable output.
#[derive(Parser, Debug)]
#[command(name = "apkg", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (text for humans, json for agents/scripts)
    #[arg(
        long,
        short = 'f',
        default_value = "text",
        global = true,
        env = "APKG_FORMAT"
    )]
    pub format: OutputFormat,

    /// Robot mode: equivalent to --format=json
    #[arg(long, global = true)]
    pub robot: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Settings file (.toml, .yaml or .yml)
    #[arg(long, global = true, env = "APKG_CONFIG")]
    pub config: Option<PathBuf>,

    /// How to mount the package database (overrides the settings file)
    #[arg(long, global = true, value_enum)]
    pub strategy: Option<OpenStrategy>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with optional color
    #[default]
    Text,
    /// JSON output for scripts and agents
    Json,
    /// Compact JSON (single line)
    JsonCompact,
}

impl Cli {
    /// Returns true if output should be JSON (robot mode or explicit --format=json).
    pub const fn use_json(&self) -> bool {
        self.robot || matches!(self.format, OutputFormat::Json | OutputFormat::JsonCompact)
    }

    /// Returns true if output should be compact JSON.
    pub const fn use_compact_json(&self) -> bool {
        matches!(self.format, OutputFormat::JsonCompact)
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    // === Inspection ===
    /// Show collection metadata and entity counts
    Info(PackageArgs),

    /// List decks
    Decks(PackageArgs),

    /// List note types with their fields and templates
    Models(PackageArgs),

    /// List notes with named fields
    Notes(PackageArgs),

    /// List cards
    Cards(CardsArgs),

    /// Render a card's question and answer HTML
    Render(RenderArgs),

    // === Media ===
    /// List media files with sizes and SHA-256 digests
    Media(PackageArgs),

    /// Write one media file to disk
    ExtractMedia(ExtractMediaArgs),

    /// Add a media file to the package
    AddMedia(AddMediaArgs),

    // === Editing ===
    /// Set one field of a note and save the package
    SetField(SetFieldArgs),

    /// Create an empty package
    New(NewArgs),

    // === Utilities ===
    /// Write a settings file with default values
    InitConfig(InitConfigArgs),

    /// Show version and build information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// === Argument Structs ===

#[derive(Parser, Debug)]
pub struct PackageArgs {
    /// Path to the .apkg file
    pub package: PathBuf,
}

#[derive(Parser, Debug)]
pub struct CardsArgs {
    /// Path to the .apkg file
    pub package: PathBuf,

    /// Only cards in this deck
    #[arg(long, short = 'd')]
    pub deck: Option<i64>,
}

#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Path to the .apkg file
    pub package: PathBuf,

    /// Card id
    #[arg(long, short = 'c')]
    pub card: i64,

    /// Which side to print
    #[arg(long, short = 's', value_enum, default_value = "both")]
    pub side: RenderSide,
}

/// Sides of a rendered card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum RenderSide {
    Question,
    Answer,
    #[default]
    Both,
}

#[derive(Parser, Debug)]
pub struct ExtractMediaArgs {
    /// Path to the .apkg file
    pub package: PathBuf,

    /// Media filename as referenced by notes
    pub name: String,

    /// Destination file
    #[arg(long, short = 'o')]
    pub output: PathBuf,
}

#[derive(Parser, Debug)]
pub struct AddMediaArgs {
    /// Path to the .apkg file
    pub package: PathBuf,

    /// File to add
    pub file: PathBuf,

    /// Filename to store it under (defaults to the file's name)
    #[arg(long, short = 'n')]
    pub name: Option<String>,
}

#[derive(Parser, Debug)]
pub struct SetFieldArgs {
    /// Path to the .apkg file
    pub package: PathBuf,

    /// Note id
    #[arg(long)]
    pub note: i64,

    /// Field name
    #[arg(long)]
    pub field: String,

    /// New field content
    #[arg(long)]
    pub value: String,
}

#[derive(Parser, Debug)]
pub struct NewArgs {
    /// Where to write the new package
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct InitConfigArgs {
    /// Where to write the settings file (.toml, .yaml or .yml)
    pub path: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
