//! Card rendering: question/answer HTML from a note, its model and a template.
//!
//! The pure layer here never fails: missing pieces render as empty strings.
//! Lookup of the note, model and template for a card happens in
//! [`Collection::render_card`](crate::collection::Collection::render_card),
//! which reports a missing piece as `None`.

mod template;

use std::collections::HashMap;

use serde::Serialize;

use crate::entity::{Model, Note, Template};
use crate::fields::FieldMap;

pub use template::{TYPE_ANSWER_INPUT, render};

/// A fully rendered card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedCard {
    fields: HashMap<String, String>,
    front: String,
    back: String,
    css: String,
}

impl RenderedCard {
    /// Field names mapped to their raw content.
    pub const fn fields(&self) -> &HashMap<String, String> {
        &self.fields
    }

    /// Rendered question HTML.
    pub fn front(&self) -> &str {
        &self.front
    }

    /// Rendered answer HTML.
    pub fn back(&self) -> &str {
        &self.back
    }

    /// The model's stylesheet.
    pub fn css(&self) -> &str {
        &self.css
    }
}

/// Build the `{field name -> value}` map for a note under a model.
pub fn field_values(note: &Note, model: &Model) -> HashMap<String, String> {
    FieldMap::from_raw(model, &note.flds).to_map()
}

/// Render question, answer and stylesheet in one go.
pub fn render_card(note: &Note, model: &Model, template: &Template) -> RenderedCard {
    let fields = field_values(note, model);
    let front = render(&template.qfmt, &fields, None);
    let back = render(&template.afmt, &fields, Some(&front));
    RenderedCard {
        fields,
        front,
        back,
        css: model.css.clone(),
    }
}

pub fn render_question(note: &Note, model: &Model, template: &Template) -> String {
    let fields = field_values(note, model);
    render(&template.qfmt, &fields, None)
}

/// Render the answer side, with `{{FrontSide}}` bound to the question.
pub fn render_answer(note: &Note, model: &Model, template: &Template) -> String {
    let fields = field_values(note, model);
    let question = render(&template.qfmt, &fields, None);
    render(&template.afmt, &fields, Some(&question))
}
