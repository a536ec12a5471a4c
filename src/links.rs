//! Cross-reference validation: stage 4 of the build pipeline.
//!
//! Every internal link and image in every resolved document is checked
//! against the locale's resolved tree before anything is written. One
//! broken reference anywhere fails the build.
//!
//! ## What counts as internal
//!
//! Anything without a URL scheme and not protocol-relative:
//!
//! ```text
//! ./setup.md#install     relative to the source file's directory
//! ../api                 dot segments are normalized
//! /guide/setup           absolute from the locale root
//! 020-guide/index.md     file names with NNN- prefixes work too
//! #usage                 anchor on the same page
//! /img/logo.svg          static asset, must exist under static/
//! diagram.png            static asset relative to the page's directory,
//!                        so guide/setup links static/guide/diagram.png
//! https://example.com    external, never checked
//! ```
//!
//! A page target is looked up by slug first, then by source path. An
//! anchor must match a heading id of the target *as served by this locale*,
//! so a fallback page linking into a translated page is checked against
//! the translation's headings.

use crate::anchors;
use crate::locale::ResolvedTree;
use crate::naming;
use crate::types::Document;
use pulldown_cmark::{Event, Parser, Tag};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

const PAGE_EXTENSIONS: &[&str] = &["md", "mdx", "html"];

/// Why a reference does not resolve.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokenReason {
    #[error("missing page `{slug}`")]
    MissingSlug { slug: String },
    #[error("missing anchor `#{anchor}` in page `{slug}`")]
    MissingAnchor { slug: String, anchor: String },
    #[error("missing static asset `{path}`")]
    MissingAsset { path: String },
}

/// A reference that failed to resolve, with everything needed to fix it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("[{locale}] {}: link to `{target}`: {reason}", .source_path.display())]
pub struct BrokenReference {
    pub locale: String,
    pub source_path: PathBuf,
    pub target: String,
    pub reason: BrokenReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Link,
    Image,
}

/// An internal reference found in a Markdown body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub kind: RefKind,
    pub target: String,
}

/// What a reference points at once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Page { slug: String, anchor: Option<String> },
    /// A file under `static/`, by its path relative to that directory.
    Asset { path: String },
}

/// Whether a link target leaves the site.
pub fn is_external(url: &str) -> bool {
    if url.starts_with("//") {
        return true;
    }
    match url.split_once(':') {
        Some((scheme, _)) => {
            scheme.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Internal links and images of a body, in document order.
///
/// Code spans and code blocks never produce references.
pub fn extract_references(body: &str) -> Vec<Reference> {
    Parser::new_ext(body, anchors::markdown_options())
        .filter_map(|event| match event {
            Event::Start(Tag::Link { dest_url, .. }) => Some((RefKind::Link, dest_url)),
            Event::Start(Tag::Image { dest_url, .. }) => Some((RefKind::Image, dest_url)),
            _ => None,
        })
        .filter(|(_, url)| !url.is_empty() && !is_external(url))
        .map(|(kind, url)| Reference {
            kind,
            target: url.to_string(),
        })
        .collect()
}

/// `path?query#anchor` → (`path`, `anchor`).
fn split_target(raw: &str) -> (&str, Option<&str>) {
    let (rest, anchor) = match raw.split_once('#') {
        Some((rest, anchor)) => (rest, Some(anchor).filter(|a| !a.is_empty())),
        None => (raw, None),
    };
    let path = rest.split_once('?').map(|(p, _)| p).unwrap_or(rest);
    (path, anchor)
}

/// Resolves references against one locale's resolved tree.
pub struct LinkResolver<'a> {
    tree: &'a ResolvedTree,
    assets: &'a BTreeSet<String>,
    listings: HashSet<String>,
    by_path_key: HashMap<&'a str, &'a str>,
    by_source_key: HashMap<&'a str, &'a str>,
    anchors: HashMap<&'a str, HashSet<String>>,
}

impl<'a> LinkResolver<'a> {
    pub fn new(tree: &'a ResolvedTree, assets: &'a BTreeSet<String>) -> Self {
        let mut by_path_key = HashMap::new();
        let mut by_source_key = HashMap::new();
        let mut anchors = HashMap::new();
        for (slug, resolved) in &tree.documents {
            by_path_key.insert(resolved.doc.path_key.as_str(), slug.as_str());
            by_source_key.insert(resolved.doc.source_key.as_str(), slug.as_str());
            let ids = anchors::extract_headings(&resolved.doc.body)
                .into_iter()
                .map(|h| h.id)
                .collect();
            anchors.insert(slug.as_str(), ids);
        }
        let listings = tree
            .listing_slugs()
            .into_iter()
            .filter(|slug| !tree.contains(slug))
            .collect();
        Self {
            tree,
            assets,
            listings,
            by_path_key,
            by_source_key,
            anchors,
        }
    }

    fn is_page(&self, slug: &str) -> bool {
        self.tree.contains(slug) || self.listings.contains(slug)
    }

    fn lookup(&self, literal: &str, normalized: &str) -> Option<String> {
        [literal, normalized]
            .into_iter()
            .find(|key| self.is_page(key))
            .map(String::from)
            .or_else(|| self.by_path_key.get(normalized).map(|s| s.to_string()))
            .or_else(|| self.by_source_key.get(literal).map(|s| s.to_string()))
    }

    fn page(&self, slug: String, anchor: Option<&str>) -> Result<Resolved, BrokenReason> {
        if let Some(anchor) = anchor {
            let found = self
                .anchors
                .get(slug.as_str())
                .is_some_and(|ids| ids.contains(anchor));
            if !found {
                return Err(BrokenReason::MissingAnchor {
                    slug,
                    anchor: anchor.to_string(),
                });
            }
        }
        Ok(Resolved::Page {
            slug,
            anchor: anchor.map(String::from),
        })
    }

    /// Resolve `raw` as written in `source`.
    pub fn resolve(&self, source: &Document, raw: &str) -> Result<Resolved, BrokenReason> {
        let (path, anchor) = split_target(raw);
        if path.is_empty() {
            return self.page(source.slug.clone(), anchor);
        }

        let absolute = path.starts_with('/');
        let mut segments: Vec<&str> = if absolute {
            Vec::new()
        } else {
            source.dir.split('/').filter(|s| !s.is_empty()).collect()
        };
        for part in path.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(BrokenReason::MissingSlug {
                            slug: path.to_string(),
                        });
                    }
                }
                part => segments.push(part),
            }
        }

        // A literal file path (`020-guide/index.md`) may match a source key.
        let mut extension = None;
        if let Some(last) = segments.pop() {
            match last.rsplit_once('.') {
                Some((stem, ext)) if !stem.is_empty() => {
                    extension = Some(ext.to_ascii_lowercase());
                    if PAGE_EXTENSIONS.contains(&extension.as_deref().unwrap_or_default()) {
                        segments.push(stem);
                    } else {
                        segments.push(last);
                    }
                }
                _ => segments.push(last),
            }
        }
        let is_page_link = extension
            .as_deref()
            .is_none_or(|ext| PAGE_EXTENSIONS.contains(&ext));

        let literal = segments.join("/");
        if let Some(slug) = self.by_source_key.get(literal.as_str()) {
            return self.page(slug.to_string(), anchor);
        }
        if segments.last().is_some_and(|s| naming::is_index_stem(s)) {
            segments.pop();
        }
        let literal = segments.join("/");
        let normalized: Vec<String> = segments.iter().map(|s| naming::slug_segment(s)).collect();
        let normalized = normalized.join("/");
        if let Some(slug) = self.lookup(&literal, &normalized) {
            return self.page(slug, anchor);
        }

        if !is_page_link {
            let path = literal;
            if self.assets.contains(&path) {
                return Ok(Resolved::Asset { path });
            }
            return Err(BrokenReason::MissingAsset { path });
        }
        Err(BrokenReason::MissingSlug { slug: normalized })
    }
}

/// Check every reference of every document the locale serves.
///
/// Returns the number of references checked, or every broken one.
pub fn validate(
    tree: &ResolvedTree,
    assets: &BTreeSet<String>,
) -> Result<usize, Vec<BrokenReference>> {
    let resolver = LinkResolver::new(tree, assets);
    let mut checked = 0;
    let mut broken = Vec::new();
    for resolved in tree.documents.values() {
        for reference in extract_references(&resolved.doc.body) {
            checked += 1;
            if let Err(reason) = resolver.resolve(&resolved.doc, &reference.target) {
                broken.push(BrokenReference {
                    locale: tree.locale.clone(),
                    source_path: resolved.doc.source_path.clone(),
                    target: reference.target,
                    reason,
                });
            }
        }
    }
    debug!(locale = %tree.locale, checked, broken = broken.len(), "Validated references");
    if broken.is_empty() {
        Ok(checked)
    } else {
        Err(broken)
    }
}
