//! Human-friendly terminal output using `console` styling.

use std::path::Path;

use console::{Term, style};
use tracing::{debug, trace};

use crate::collection::CollectionSummary;
use crate::entity::{Card, Deck};
use crate::error::ApkgError;

use super::{MediaView, ModelView, NoteView, Output, RenderView, VersionInfo};

/// Longest field preview printed by `notes`.
const PREVIEW_CHARS: usize = 60;

/// Styled terminal output implementation for human users.
pub struct HumanOutput {
    out: Term,
    err: Term,
}

impl Default for HumanOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanOutput {
    pub fn new() -> Self {
        debug!("Creating HumanOutput");
        Self {
            out: Term::stdout(),
            err: Term::stderr(),
        }
    }

    fn line(&self, text: &str) {
        if let Err(e) = self.out.write_line(text) {
            trace!(error = %e, "Failed to write to stdout");
        }
    }

    fn err_line(&self, text: &str) {
        if let Err(e) = self.err.write_line(text) {
            trace!(error = %e, "Failed to write to stderr");
        }
    }

    fn heading(&self, title: &str, count: usize) {
        self.line(&format!(
            "{} {}",
            style(title).bold().cyan(),
            style(format!("({count})")).dim()
        ));
    }

    fn key_value(&self, key: &str, value: impl std::fmt::Display) {
        self.line(&format!("  {:<16} {value}", style(key).dim()));
    }
}

fn preview(value: &str) -> String {
    let flat: String = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(PREVIEW_CHARS - 1).collect();
    format!("{cut}…")
}

fn or_dash<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

impl Output for HumanOutput {
    fn success(&self, message: &str) {
        self.line(&format!("{} {message}", style("[OK]").green().bold()));
    }

    fn error(&self, error: &ApkgError) {
        debug!(
            error = %error,
            recoverable = error.is_user_recoverable(),
            "Outputting error"
        );
        self.err_line(&format!("{}: {error}", style("Error").red().bold()));
        if let Some(suggestion) = error.suggestion() {
            self.err_line(&format!("{}: {suggestion}", style("Hint").yellow()));
        }
    }

    fn warning(&self, message: &str) {
        self.err_line(&format!("{} {message}", style("[WARN]").yellow().bold()));
    }

    fn summary(&self, path: &Path, summary: &CollectionSummary) {
        self.line(&style(path.display()).bold().to_string());
        self.key_value("generation", summary.generation);
        self.key_value("schema version", summary.schema_version);
        self.key_value("created", or_dash(summary.created.map(|t| t.to_rfc3339())));
        self.key_value("modified", or_dash(summary.modified.map(|t| t.to_rfc3339())));
        self.key_value("decks", summary.decks);
        self.key_value("note types", summary.models);
        self.key_value("notes", summary.notes);
        self.key_value("cards", summary.cards);
        self.key_value("reviews", summary.revlog);
        self.key_value("graves", summary.graves);
        self.key_value("media", summary.media);
    }

    fn deck_list(&self, decks: &[Deck]) {
        self.heading("Decks", decks.len());
        for deck in decks {
            self.line(&format!("  {:>15}  {}", style(deck.id).dim(), deck.name));
        }
    }

    fn model_list(&self, models: &[ModelView]) {
        self.heading("Note types", models.len());
        for model in models {
            self.line(&format!("  {:>15}  {}", style(model.id).dim(), style(&model.name).bold()));
            self.line(&format!("                   fields: {}", model.fields.join(", ")));
            self.line(&format!("                   templates: {}", model.templates.join(", ")));
        }
    }

    fn note_list(&self, notes: &[NoteView]) {
        self.heading("Notes", notes.len());
        for note in notes {
            self.line(&format!(
                "  {:>15}  {} {}",
                style(note.id).dim(),
                note.model.as_deref().unwrap_or("?"),
                style(&note.guid).dim()
            ));
            for field in &note.fields {
                self.line(&format!(
                    "                   {}: {}",
                    style(&field.name).cyan(),
                    preview(&field.value)
                ));
            }
        }
    }

    fn card_list(&self, cards: &[Card]) {
        self.heading("Cards", cards.len());
        for card in cards {
            self.line(&format!(
                "  {:>15}  note {}  deck {}  template {}  due {}  ivl {}",
                style(card.id).dim(),
                card.nid,
                card.did,
                card.ord,
                card.due,
                card.ivl
            ));
        }
    }

    fn rendered(&self, view: &RenderView<'_>) {
        if let Some(question) = view.question {
            self.line(&style("── Question ──").cyan().bold().to_string());
            self.line(question);
        }
        if let Some(answer) = view.answer {
            self.line(&style("── Answer ──").cyan().bold().to_string());
            self.line(answer);
        }
    }

    fn media_list(&self, media: &[MediaView]) {
        self.heading("Media", media.len());
        for item in media {
            self.line(&format!(
                "  {:>6}  {:<32} {:>10}  {}",
                style(&item.entry).dim(),
                item.filename,
                or_dash(item.size),
                style(or_dash(item.sha256.as_deref())).dim()
            ));
        }
    }

    fn media_added(&self, filename: &str, entry: &str) {
        self.success(&format!("Added {filename} as entry {entry}"));
    }

    fn media_extracted(&self, filename: &str, path: &Path, bytes: usize) {
        self.success(&format!("Wrote {filename} to {} ({bytes} bytes)", path.display()));
    }

    fn field_updated(&self, note: i64, field: &str, changed: bool) {
        if changed {
            self.success(&format!("Updated field '{field}' of note {note}"));
        } else {
            self.warning(&format!("Field '{field}' of note {note} already had that value"));
        }
    }

    fn version_info(&self, info: &VersionInfo) {
        self.line(&format!("apkg {}", info.version));
        self.line(&format!(
            "git: {}{}",
            info.git_sha,
            if info.git_dirty { " (dirty)" } else { "" }
        ));
        self.line(&format!("built: {}", info.build_timestamp));
        self.line(&format!("rustc: {}", info.rustc_version));
        self.line(&format!("target: {}", info.target));
    }
}
