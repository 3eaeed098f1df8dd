//! Three-pass textual template substitution.
//!
//! 1. `{{#Name}}...{{/Name}}` kept iff the field's trimmed value is non-empty.
//! 2. `{{^Name}}...{{/Name}}` kept iff the field is empty or absent.
//! 3. Remaining `{{...}}` tags resolved against the field map.
//!
//! Closing tags pair with the nearest following close of the same name, and
//! kept block content is processed again so nested blocks of distinct names
//! resolve in the same pass.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Literal substituted for `{{type:Field}}`.
pub const TYPE_ANSWER_INPUT: &str = "<input type='text' value='' class='type-input' />";

static POSITIVE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{#([^}]+)\}\}").expect("valid open-tag regex"));
static NEGATIVE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\^([^}]+)\}\}").expect("valid open-tag regex"));
static SIMPLE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^}#/^]+)\}\}").expect("valid tag regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Positive,
    Negative,
}

/// Render one format string.
///
/// `front_side` is the already-rendered question when rendering an answer;
/// `{{FrontSide}}` renders empty when it is `None`.
pub fn render(template: &str, fields: &HashMap<String, String>, front_side: Option<&str>) -> String {
    let result = process_sections(template, fields, Section::Positive);
    let result = process_sections(&result, fields, Section::Negative);
    substitute_tags(&result, fields, front_side)
}

fn has_content(fields: &HashMap<String, String>, name: &str) -> bool {
    fields.get(name).is_some_and(|v| !v.trim().is_empty())
}

fn process_sections(template: &str, fields: &HashMap<String, String>, kind: Section) -> String {
    let open = match kind {
        Section::Positive => &*POSITIVE_OPEN,
        Section::Negative => &*NEGATIVE_OPEN,
    };

    let mut out = String::with_capacity(template.len());
    let mut cursor = 0;
    let mut search_from = 0;

    while let Some(caps) = open.captures_at(template, search_from) {
        let Some(whole) = caps.get(0) else { break };
        let raw_name = &caps[1];
        let close = format!("{{{{/{raw_name}}}}}");

        let Some(rel_end) = template[whole.end()..].find(&close) else {
            // Unclosed: leave the tag as text and keep scanning after it.
            search_from = whole.end();
            continue;
        };
        let inner_end = whole.end() + rel_end;
        let inner = &template[whole.end()..inner_end];

        let filled = has_content(fields, raw_name.trim());
        let keep = match kind {
            Section::Positive => filled,
            Section::Negative => !filled,
        };

        out.push_str(&template[cursor..whole.start()]);
        if keep {
            out.push_str(&process_sections(inner, fields, kind));
        }

        cursor = inner_end + close.len();
        search_from = cursor;
    }

    out.push_str(&template[cursor..]);
    out
}

fn substitute_tags(
    template: &str,
    fields: &HashMap<String, String>,
    front_side: Option<&str>,
) -> String {
    SIMPLE_TAG
        .replace_all(template, |caps: &Captures<'_>| {
            resolve_tag(caps[1].trim(), fields, front_side)
        })
        .into_owned()
}

fn resolve_tag(inner: &str, fields: &HashMap<String, String>, front_side: Option<&str>) -> String {
    if inner == "FrontSide" {
        return front_side.unwrap_or_default().to_string();
    }
    if let Some(name) = inner.strip_prefix("cloze:") {
        return fields.get(name).cloned().unwrap_or_default();
    }
    if inner.starts_with("type:") {
        return TYPE_ANSWER_INPUT.to_string();
    }
    if let Some(name) = inner.strip_prefix("hint:") {
        return hint(name, fields.get(name).map_or("", String::as_str));
    }

    if let Some(value) = fields.get(inner) {
        return value.clone();
    }
    // Unknown modifier prefix such as `text:Field`: retry with the last segment.
    match inner.rsplit_once(':') {
        Some((_, name)) => fields.get(name).cloned().unwrap_or_default(),
        None => String::new(),
    }
}

fn hint(name: &str, value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    format!(
        "<a class='hint' href='#' onclick='this.style.display=\"none\";\
         document.getElementById(\"hint_{name}\").style.display=\"block\";return false;'>\
         Show {name}</a><div id='hint_{name}' style='display:none'>{value}</div>"
    )
}
