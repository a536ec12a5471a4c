//! Client-side search index.
//!
//! Each locale root gets a `search-index.json` that `search.js` fetches on
//! first use. One entry per served document:
//!
//! ```json
//! {
//!   "title": "Routing",
//!   "url": "/pt-BR/routing/",
//!   "headings": ["Path parameters", "Wildcards"],
//!   "excerpt": "Routes map a method and a path pattern to a handler…",
//!   "tags": ["routing"],
//!   "untranslated": true
//! }
//! ```
//!
//! The excerpt is the body's plain text (headings and code blocks left out)
//! cut at `build.search_excerpt_chars` characters.

use crate::anchors;
use crate::locale::ResolvedTree;
use crate::render::SiteContext;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchEntry {
    pub title: String,
    pub url: String,
    pub headings: Vec<String>,
    pub excerpt: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub untranslated: bool,
    /// Source file modification time, seconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<u64>,
}

/// Entries for every document of a locale, in slug order.
pub fn build_search_index(
    tree: &ResolvedTree,
    ctx: &SiteContext,
    excerpt_chars: usize,
) -> Vec<SearchEntry> {
    tree.documents
        .values()
        .map(|resolved| {
            let doc = &resolved.doc;
            SearchEntry {
                title: doc.title.clone(),
                url: ctx.page_url(&doc.slug),
                headings: anchors::extract_headings(&doc.body)
                    .into_iter()
                    .filter(|h| h.level > 1)
                    .map(|h| h.text)
                    .collect(),
                excerpt: excerpt(&doc.body, excerpt_chars),
                tags: doc.tags.iter().cloned().collect(),
                untranslated: resolved.is_untranslated(),
                updated: doc.last_modified,
            }
        })
        .collect()
}

pub fn search_index_json(entries: &[SearchEntry]) -> Result<String, serde_json::Error> {
    serde_json::to_string(entries)
}

/// Plain text of a Markdown body, whitespace collapsed, cut at `max_chars`
/// characters with a trailing ellipsis.
pub fn excerpt(body: &str, max_chars: usize) -> String {
    let mut text = String::new();
    let mut skip_depth = 0usize;
    for event in Parser::new_ext(body, anchors::markdown_options()) {
        match event {
            Event::Start(Tag::Heading { .. } | Tag::CodeBlock(_)) => skip_depth += 1,
            Event::End(TagEnd::Heading(_) | TagEnd::CodeBlock) => {
                skip_depth = skip_depth.saturating_sub(1);
                text.push(' ');
            }
            Event::Text(t) | Event::Code(t) if skip_depth == 0 => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            Event::End(TagEnd::Paragraph | TagEnd::Item) => text.push(' '),
            _ => {}
        }
    }
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", collapsed[..cut].trim_end()),
        None => collapsed,
    }
}
