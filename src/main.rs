//! apkg CLI - inspect, edit, render and re-export Anki packages.
//!
//! Provides both human-friendly and agent-friendly (robot mode) interfaces.
#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::io;
use std::path::Path;

use clap::Parser;
use tracing::{debug, info};

use apkg::cli::{self, Cli, Commands};
use apkg::collection::Collection;
use apkg::config::{self, Settings};
use apkg::error::{ApkgError, Result, ResultExt};
use apkg::logging;
use apkg::output::{MediaView, ModelView, NoteView, Output, OutputMode, RenderView, VersionInfo};
use apkg::package::OpenOptions;

/// Build information embedded at compile time.
mod build_info {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    pub fn git_sha() -> &'static str {
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown")
    }

    pub fn git_dirty() -> bool {
        option_env!("VERGEN_GIT_DIRTY") == Some("true")
    }

    pub fn build_timestamp() -> &'static str {
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown")
    }

    pub fn rustc_semver() -> &'static str {
        option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown")
    }

    pub fn target() -> &'static str {
        option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown")
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.use_json(), cli.verbose, cli.quiet);

    let output = OutputMode::from_cli(&cli).into_output();
    if let Err(e) = run(&cli, output.as_ref()) {
        output.error(&e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli, out: &dyn Output) -> Result<()> {
    match &cli.command {
        Commands::Info(args) => cmd_info(cli, out, &args.package),
        Commands::Decks(args) => cmd_decks(cli, out, &args.package),
        Commands::Models(args) => cmd_models(cli, out, &args.package),
        Commands::Notes(args) => cmd_notes(cli, out, &args.package),
        Commands::Cards(args) => cmd_cards(cli, out, args),
        Commands::Render(args) => cmd_render(cli, out, args),
        Commands::Media(args) => cmd_media(cli, out, &args.package),
        Commands::ExtractMedia(args) => cmd_extract_media(cli, out, args),
        Commands::AddMedia(args) => cmd_add_media(cli, out, args),
        Commands::SetField(args) => cmd_set_field(cli, out, args),
        Commands::New(args) => cmd_new(cli, out, args),
        Commands::InitConfig(args) => cmd_init_config(out, args),
        Commands::Version => cmd_version(out),
        Commands::Completions(args) => cmd_completions(args),
    }
}

// === Collection Access ===

fn open_options(cli: &Cli) -> Result<OpenOptions> {
    let settings = config::resolve_settings(cli.config.as_deref())?;
    let mut options = settings.open_options();
    if let Some(strategy) = cli.strategy {
        debug!(?strategy, "Strategy overridden on the command line");
        options.strategy = strategy;
    }
    Ok(options)
}

fn open(cli: &Cli, path: &Path) -> Result<Collection> {
    Collection::open_path(path, open_options(cli)?)
}

/// Close an edited collection, warning when the edit will not be kept.
fn close_edited(col: Collection, out: &dyn Output) -> Result<()> {
    if col.is_dirty() && !col.options().write_back {
        out.warning("export.write_back is disabled; the package file was not changed");
    }
    col.close()
}

// === Inspection ===

fn cmd_info(cli: &Cli, out: &dyn Output, path: &Path) -> Result<()> {
    let col = open(cli, path)?;
    out.summary(path, &col.summary()?);
    col.close()
}

fn cmd_decks(cli: &Cli, out: &dyn Output, path: &Path) -> Result<()> {
    let col = open(cli, path)?;
    out.deck_list(&col.decks()?);
    col.close()
}

fn cmd_models(cli: &Cli, out: &dyn Output, path: &Path) -> Result<()> {
    let col = open(cli, path)?;
    let models: Vec<ModelView> = col.models()?.iter().map(ModelView::from).collect();
    out.model_list(&models);
    col.close()
}

fn cmd_notes(cli: &Cli, out: &dyn Output, path: &Path) -> Result<()> {
    let col = open(cli, path)?;
    let models: HashMap<i64, _> = col.models()?.into_iter().map(|m| (m.id, m)).collect();
    let notes: Vec<NoteView> = col
        .notes()?
        .iter()
        .map(|note| NoteView::new(note, models.get(&note.mid)))
        .collect();
    out.note_list(&notes);
    col.close()
}

fn cmd_cards(cli: &Cli, out: &dyn Output, args: &cli::CardsArgs) -> Result<()> {
    let col = open(cli, &args.package)?;
    let cards = match args.deck {
        Some(deck) => col.cards_in_deck(deck)?,
        None => col.cards()?,
    };
    out.card_list(&cards);
    col.close()
}

fn cmd_render(cli: &Cli, out: &dyn Output, args: &cli::RenderArgs) -> Result<()> {
    let col = open(cli, &args.package)?;
    let card = col.card(args.card)?.ok_or(ApkgError::NotFound {
        entity: "Card",
        id: args.card,
    })?;
    let rendered = col.render_card(&card)?.ok_or_else(|| {
        ApkgError::Other(format!(
            "Card {} cannot be rendered: its note, note type or template is missing",
            args.card
        ))
    })?;
    out.rendered(&RenderView::new(card.id, &rendered, args.side));
    col.close()
}

// === Media ===

fn cmd_media(cli: &Cli, out: &dyn Output, path: &Path) -> Result<()> {
    let col = open(cli, path)?;
    let media: Vec<MediaView> = col
        .media_contents()?
        .into_iter()
        .map(|(entry, content)| MediaView::new(entry, content.as_deref()))
        .collect();
    out.media_list(&media);
    col.close()
}

fn cmd_extract_media(cli: &Cli, out: &dyn Output, args: &cli::ExtractMediaArgs) -> Result<()> {
    let col = open(cli, &args.package)?;
    let bytes = col.media_content(&args.name)?.ok_or_else(|| {
        ApkgError::InvalidArgument(format!("No media file named '{}' in package", args.name))
    })?;
    std::fs::write(&args.output, &bytes)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!(path = %args.output.display(), bytes = bytes.len(), "Media extracted");
    out.media_extracted(&args.name, &args.output, bytes.len());
    col.close()
}

fn cmd_add_media(cli: &Cli, out: &dyn Output, args: &cli::AddMediaArgs) -> Result<()> {
    let name = match &args.name {
        Some(name) => name.clone(),
        None => args
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ApkgError::InvalidArgument(format!(
                    "Cannot derive a media name from '{}'; pass --name",
                    args.file.display()
                ))
            })?,
    };
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let mut col = open(cli, &args.package)?;
    let entry = col.add_media(&name, bytes)?;
    close_edited(col, out)?;
    out.media_added(&name, &entry);
    Ok(())
}

// === Editing ===

fn cmd_set_field(cli: &Cli, out: &dyn Output, args: &cli::SetFieldArgs) -> Result<()> {
    let mut col = open(cli, &args.package)?;
    let changed = col.set_note_field(args.note, &args.field, &args.value)?;
    close_edited(col, out)?;
    out.field_updated(args.note, &args.field, changed);
    Ok(())
}

fn cmd_new(cli: &Cli, out: &dyn Output, args: &cli::NewArgs) -> Result<()> {
    if args.output.exists() && !args.force {
        return Err(ApkgError::InvalidArgument(format!(
            "'{}' already exists; pass --force to overwrite",
            args.output.display()
        )));
    }
    let col = Collection::create(open_options(cli)?)?;
    col.export_to(&args.output)?;
    col.close()?;
    out.success(&format!("Created empty package {}", args.output.display()));
    Ok(())
}

// === Utilities ===

fn cmd_init_config(out: &dyn Output, args: &cli::InitConfigArgs) -> Result<()> {
    if args.path.exists() && !args.force {
        return Err(ApkgError::InvalidArgument(format!(
            "'{}' already exists; pass --force to overwrite",
            args.path.display()
        )));
    }
    config::save_settings(&Settings::default(), &args.path)?;
    out.success(&format!("Wrote settings to {}", args.path.display()));
    Ok(())
}

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn cmd_version(out: &dyn Output) -> Result<()> {
    out.version_info(&VersionInfo {
        version: build_info::VERSION,
        git_sha: build_info::git_sha(),
        git_dirty: build_info::git_dirty(),
        build_timestamp: build_info::build_timestamp(),
        rustc_version: build_info::rustc_semver(),
        target: build_info::target(),
    });
    Ok(())
}

#[allow(clippy::unnecessary_wraps)]
fn cmd_completions(args: &cli::CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    clap_complete::generate(args.shell, &mut Cli::command(), "apkg", &mut io::stdout());
    Ok(())
}
