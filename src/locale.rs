//! Locale resolution: stage 2 of the build pipeline.
//!
//! Every locale serves the full default-locale page set. A page the locale
//! translated is served from its own tree; anything else falls back to the
//! default locale's document and is flagged untranslated:
//!
//! ```text
//! en (default):  intro   routing   api
//! pt-BR tree:    intro                     extras
//!                  │        │       │        │
//! resolved:      Own    Fallback Fallback LocaleOnly
//! ```
//!
//! Lookup is two levels deep and never chains: the locale's own tree, then
//! the default tree. Pages that only exist in a locale (`LocaleOnly`) are
//! published for that locale but take no part in the parity report.

use crate::anchors;
use crate::scan::BLOG_SLUG;
use crate::types::{CategoryMeta, DocKind, Document, LocaleTree};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Where a resolved document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    /// The locale's own translation.
    Own,
    /// Default-locale content standing in for a missing translation.
    Fallback,
    /// Present in the locale but not in the default tree.
    LocaleOnly,
}

/// A document as served by one locale.
#[derive(Debug, Clone)]
pub struct ResolvedDoc {
    pub doc: Arc<Document>,
    pub origin: Origin,
}

impl ResolvedDoc {
    pub fn is_untranslated(&self) -> bool {
        self.origin == Origin::Fallback
    }
}

/// A locale's complete page set after fallback.
#[derive(Debug, Clone)]
pub struct ResolvedTree {
    pub locale: String,
    pub is_default: bool,
    pub documents: BTreeMap<String, ResolvedDoc>,
    pub categories: BTreeMap<String, CategoryMeta>,
}

/// Translation coverage of one locale against the default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParityReport {
    pub locale: String,
    pub translated: usize,
    pub untranslated: Vec<String>,
    pub locale_only: Vec<String>,
}

/// Documents sharing a tag, for the generated tag pages.
#[derive(Debug, Clone)]
pub struct TagGroup<'a> {
    /// The tag as first written (in slug order of the documents).
    pub label: String,
    pub docs: Vec<&'a ResolvedDoc>,
}

/// Slug of the tag index page.
pub const TAGS_SLUG: &str = "tags";

/// `Release Notes` → `tags/release-notes`.
pub fn tag_slug(tag: &str) -> String {
    format!("{TAGS_SLUG}/{}", anchors::anchor_id(tag))
}

/// Two-level lookup: the locale's own document, else the default's.
pub fn resolve<'a>(
    locale: &'a LocaleTree,
    default: &'a LocaleTree,
    slug: &str,
) -> Option<&'a Arc<Document>> {
    locale
        .documents
        .get(slug)
        .or_else(|| default.documents.get(slug))
}

/// Merge a locale tree over the default tree.
///
/// The result holds every default slug plus the locale-only additions.
/// Resolving the default tree against itself marks everything `Own`.
pub fn resolve_tree(default: &LocaleTree, locale: &LocaleTree) -> ResolvedTree {
    let is_default = locale.locale == default.locale;
    let mut documents = BTreeMap::new();

    for slug in default.documents.keys() {
        let Some(doc) = resolve(locale, default, slug) else {
            continue;
        };
        let origin = if locale.documents.contains_key(slug) {
            Origin::Own
        } else {
            debug!(locale = %locale.locale, slug = %slug, "Falling back to default locale");
            Origin::Fallback
        };
        documents.insert(
            slug.clone(),
            ResolvedDoc {
                doc: Arc::clone(doc),
                origin,
            },
        );
    }
    for (slug, doc) in &locale.documents {
        if !default.documents.contains_key(slug) {
            documents.insert(
                slug.clone(),
                ResolvedDoc {
                    doc: Arc::clone(doc),
                    origin: Origin::LocaleOnly,
                },
            );
        }
    }

    let mut categories = default.categories.clone();
    for (dir, meta) in &locale.categories {
        let merged = categories.entry(dir.clone()).or_default();
        if meta.label.is_some() {
            merged.label = meta.label.clone();
        }
        if meta.position.is_some() {
            merged.position = meta.position;
        }
        if meta.prefix_position.is_some() {
            merged.prefix_position = meta.prefix_position;
        }
    }

    ResolvedTree {
        locale: locale.locale.clone(),
        is_default,
        documents,
        categories,
    }
}

impl ResolvedTree {
    pub fn get(&self, slug: &str) -> Option<&ResolvedDoc> {
        self.documents.get(slug)
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.documents.contains_key(slug)
    }

    /// Docs pages in slug order.
    pub fn docs(&self) -> impl Iterator<Item = &ResolvedDoc> {
        self.documents.values().filter(|d| d.doc.kind == DocKind::Doc)
    }

    /// Blog posts, newest first (undated last), then by slug.
    pub fn posts(&self) -> Vec<&ResolvedDoc> {
        let mut posts: Vec<&ResolvedDoc> = self
            .documents
            .values()
            .filter(|d| d.doc.kind == DocKind::Post)
            .collect();
        posts.sort_by(|a, b| {
            b.doc
                .date
                .cmp(&a.doc.date)
                .then_with(|| a.doc.slug.cmp(&b.doc.slug))
        });
        posts
    }

    /// Slugs served from the default locale.
    pub fn untranslated(&self) -> Vec<&str> {
        self.slugs_with(Origin::Fallback)
    }

    /// Slugs that exist only in this locale.
    pub fn locale_only(&self) -> Vec<&str> {
        self.slugs_with(Origin::LocaleOnly)
    }

    fn slugs_with(&self, origin: Origin) -> Vec<&str> {
        self.documents
            .iter()
            .filter(|(_, d)| d.origin == origin)
            .map(|(slug, _)| slug.as_str())
            .collect()
    }

    /// Tagged documents grouped by tag slug. Tags that differ only in case or
    /// punctuation share a page.
    pub fn tags(&self) -> BTreeMap<String, TagGroup<'_>> {
        let mut groups: BTreeMap<String, TagGroup<'_>> = BTreeMap::new();
        for resolved in self.documents.values() {
            for tag in &resolved.doc.tags {
                let group = groups.entry(tag_slug(tag)).or_insert_with(|| TagGroup {
                    label: tag.clone(),
                    docs: Vec::new(),
                });
                if !group.docs.iter().any(|d| d.doc.slug == resolved.doc.slug) {
                    group.docs.push(resolved);
                }
            }
        }
        groups
    }

    /// Slugs of the generated listing pages: the blog index when there are
    /// posts, the tag index and one page per tag when anything is tagged.
    pub fn listing_slugs(&self) -> Vec<String> {
        let mut slugs = Vec::new();
        if self.documents.values().any(|d| d.doc.kind == DocKind::Post) {
            slugs.push(BLOG_SLUG.to_string());
        }
        let tags = self.tags();
        if !tags.is_empty() {
            slugs.push(TAGS_SLUG.to_string());
            slugs.extend(tags.into_keys());
        }
        slugs
    }

    pub fn parity_report(&self) -> ParityReport {
        ParityReport {
            locale: self.locale.clone(),
            translated: self
                .documents
                .values()
                .filter(|d| d.origin == Origin::Own)
                .count(),
            untranslated: self.untranslated().into_iter().map(String::from).collect(),
            locale_only: self.locale_only().into_iter().map(String::from).collect(),
        }
    }
}
