//! Robot mode JSON output implementation.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, instrument, trace, warn};

use crate::collection::CollectionSummary;
use crate::entity::{Card, Deck};
use crate::error::ApkgError;

use super::{MediaView, ModelView, NoteView, Output, RenderView, RobotFormat, VersionInfo};

/// JSON output implementation for agents and scripting.
pub struct RobotOutput {
    format: RobotFormat,
}

impl RobotOutput {
    #[instrument]
    pub fn new(format: RobotFormat) -> Self {
        debug!(?format, "Creating RobotOutput");
        Self { format }
    }

    fn to_json<T: Serialize + ?Sized>(&self, data: &T, pretty: bool) -> Option<String> {
        let result = if pretty {
            serde_json::to_string_pretty(data)
        } else {
            serde_json::to_string(data)
        };
        match result {
            Ok(json) => Some(json),
            Err(e) => {
                warn!(error = %e, "Failed to serialize output");
                None
            }
        }
    }

    /// Output any serializable data as JSON to stdout.
    #[instrument(skip(self, data), fields(format = ?self.format))]
    fn output_json<T: Serialize + ?Sized>(&self, data: &T) {
        let pretty = self.format == RobotFormat::Json;
        if let Some(json) = self.to_json(data, pretty) {
            trace!(json_len = json.len(), "JSON serialized");
            println!("{json}");
        }
    }

    /// Output pretty JSON to stderr.
    fn output_json_stderr<T: Serialize>(&self, data: &T) {
        if let Some(json) = self.to_json(data, true) {
            eprintln!("{json}");
        }
    }
}

impl Output for RobotOutput {
    fn success(&self, message: &str) {
        self.output_json(&serde_json::json!({
            "success": true,
            "message": message
        }));
    }

    #[instrument(skip(self))]
    fn error(&self, error: &ApkgError) {
        debug!(error = %error, "Robot: error");
        self.output_json_stderr(&serde_json::json!({
            "error": true,
            "message": error.to_string(),
            "suggestion": error.suggestion(),
            "recoverable": error.is_user_recoverable(),
        }));
    }

    fn warning(&self, message: &str) {
        self.output_json(&serde_json::json!({
            "warning": true,
            "message": message
        }));
    }

    fn summary(&self, path: &Path, summary: &CollectionSummary) {
        self.output_json(&serde_json::json!({
            "path": path.display().to_string(),
            "summary": summary,
        }));
    }

    fn deck_list(&self, decks: &[Deck]) {
        self.output_json(decks);
    }

    fn model_list(&self, models: &[ModelView]) {
        self.output_json(models);
    }

    fn note_list(&self, notes: &[NoteView]) {
        self.output_json(notes);
    }

    fn card_list(&self, cards: &[Card]) {
        self.output_json(cards);
    }

    fn rendered(&self, view: &RenderView<'_>) {
        self.output_json(view);
    }

    fn media_list(&self, media: &[MediaView]) {
        self.output_json(media);
    }

    fn media_added(&self, filename: &str, entry: &str) {
        self.output_json(&serde_json::json!({
            "success": true,
            "filename": filename,
            "entry": entry,
        }));
    }

    fn media_extracted(&self, filename: &str, path: &Path, bytes: usize) {
        self.output_json(&serde_json::json!({
            "success": true,
            "filename": filename,
            "path": path.display().to_string(),
            "bytes": bytes,
        }));
    }

    fn field_updated(&self, note: i64, field: &str, changed: bool) {
        self.output_json(&serde_json::json!({
            "success": true,
            "note": note,
            "field": field,
            "changed": changed,
        }));
    }

    fn version_info(&self, info: &VersionInfo) {
        self.output_json(info);
    }
}
