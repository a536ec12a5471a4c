//! Heading extraction and anchor ids.
//!
//! Anchor ids are derived from heading text:
//!
//! ```text
//! "Getting Started!"  → getting-started
//! "API / Reference"   → api-reference
//! "Configuração"      → configuração
//! "!!!"               → section
//! ```
//!
//! Within one document every id is unique. A repeated id gets `-2`, `-3`, …
//! in order of appearance, skipping any suffix another heading already took:
//!
//! ```text
//! ## Setup      → setup
//! ## Setup!!    → setup-2
//! ## Setup 2    → setup-2-2   (setup-2 is taken)
//! ```
//!
//! `## Title {#custom}` uses `custom` verbatim. Explicit ids are claimed
//! before any derived id, so a derived id never takes one an author wrote;
//! only a second explicit use of the same id gets a suffix.
//! Both the validator and the renderer call [`extract_headings`], so the
//! ids a link checks against are exactly the ids the page carries.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use std::collections::HashSet;

/// Markdown extensions enabled everywhere a body is parsed.
pub fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
}

/// A heading in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// 1 for `#`, up to 6.
    pub level: u8,
    /// Plain text of the heading (inline markup dropped).
    pub text: String,
    /// Unique anchor id within the document.
    pub id: String,
}

/// Slugify heading text into an anchor id.
pub fn anchor_id(text: &str) -> String {
    let mut id = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !id.is_empty() {
                id.push('-');
            }
            pending_dash = false;
            id.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if id.is_empty() {
        "section".to_string()
    } else {
        id
    }
}

/// Hands out collision-free ids in order of appearance.
#[derive(Debug, Default)]
struct AnchorSet {
    taken: HashSet<String>,
}

impl AnchorSet {
    fn claim(&mut self, base: String) -> String {
        if self.taken.insert(base.clone()) {
            return base;
        }
        (2..)
            .map(|n| format!("{base}-{n}"))
            .find(|candidate| self.taken.insert(candidate.clone()))
            .unwrap_or(base)
    }
}

/// All headings of a Markdown body, in order, with unique ids.
pub fn extract_headings(body: &str) -> Vec<Heading> {
    let mut raw: Vec<(u8, Option<String>, String)> = Vec::new();
    let mut current: Option<(u8, Option<String>, String)> = None;

    for event in Parser::new_ext(body, markdown_options()) {
        match event {
            Event::Start(Tag::Heading { level, id, .. }) => {
                current = Some((level as u8, id.map(|id| id.to_string()), String::new()));
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, _, buf)) = current.as_mut() {
                    buf.push_str(&text);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some((_, _, buf)) = current.as_mut() {
                    buf.push(' ');
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, explicit, text)) = current.take() {
                    raw.push((level, explicit, text.trim().to_string()));
                }
            }
            _ => {}
        }
    }

    let mut anchors = AnchorSet::default();
    let explicit: Vec<Option<String>> = raw
        .iter_mut()
        .map(|(_, id, _)| id.take().map(|id| anchors.claim(id)))
        .collect();
    raw.into_iter()
        .zip(explicit)
        .map(|((level, _, text), id)| Heading {
            level,
            id: id.unwrap_or_else(|| anchors.claim(anchor_id(&text))),
            text,
        })
        .collect()
}

/// Text of the first level-1 heading, if any.
pub fn first_title(body: &str) -> Option<String> {
    extract_headings(body)
        .into_iter()
        .find(|h| h.level == 1)
        .map(|h| h.text)
}
