//! Shared types used across all pipeline stages.
//!
//! A [`Document`] is created once by the loader and then shared read-only
//! (behind `Arc`) by every locale tree that resolves to it, so a fallback
//! page in ten locales is still one allocation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

/// Which content section a document was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocKind {
    /// A page under `docs/`, part of the sidebar.
    Doc,
    /// A dated entry under `blog/`, listed on the blog index.
    Post,
}

/// One content unit: a Markdown file with its parsed metadata.
///
/// Identity is `(locale, slug)`. The slug doubles as the translation group:
/// `intro` in `en` and `intro` in `pt-BR` are the same page.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub locale: String,
    /// URL path below the locale root without slashes at either end
    /// (`guide/setup`). Empty for the docs landing page.
    pub slug: String,
    pub kind: DocKind,
    pub title: String,
    pub sidebar_label: Option<String>,
    pub description: Option<String>,
    /// Explicit ordering hint: front matter `position`, else the filename prefix.
    pub position: Option<i64>,
    pub tags: BTreeSet<String>,
    /// `YYYY-MM-DD`, blog posts only.
    pub date: Option<String>,
    pub draft: bool,
    /// Markdown after the front matter block.
    pub body: String,
    /// Path relative to the content root (`i18n/pt-BR/docs/intro.md`).
    pub source_path: PathBuf,
    /// Slug of the directory the file lives in (`guide`, `blog`, or empty).
    pub dir: String,
    /// Slug derived from the file path alone, before any `slug` override.
    pub path_key: String,
    /// Path below the section root without extension or prefix stripping
    /// (`010-guide/020-setup`). Lets links use literal file names.
    pub source_key: String,
    /// Whether this is an `index`/`README` file standing for its directory.
    pub is_index: bool,
    /// File modification time, seconds since the Unix epoch.
    pub last_modified: Option<u64>,
    /// Front matter keys that have no meaning here.
    pub unknown_keys: Vec<String>,
}

impl Document {
    /// Label for sidebar entries: `sidebar_label`, falling back to the title.
    pub fn nav_label(&self) -> &str {
        self.sidebar_label.as_deref().unwrap_or(&self.title)
    }

    /// URL path relative to the locale root, with a trailing slash
    /// (empty for the landing page).
    pub fn url_path(&self) -> String {
        slug_url_path(&self.slug)
    }

    /// Output file relative to the locale root.
    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(&self.slug).join("index.html")
    }
}

/// `guide/setup` → `guide/setup/`, `` → ``.
pub fn slug_url_path(slug: &str) -> String {
    if slug.is_empty() {
        String::new()
    } else {
        format!("{slug}/")
    }
}

/// Directory metadata from a `_category_.yml` file or the directory name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CategoryMeta {
    /// Sidebar label for the directory group.
    pub label: Option<String>,
    /// Ordering hint among the directory's siblings.
    pub position: Option<i64>,
    /// `NNN-` prefix of the directory name; the weakest position hint.
    #[serde(skip)]
    pub prefix_position: Option<i64>,
}

/// Everything the loader found for one locale.
#[derive(Debug, Clone, Default)]
pub struct LocaleTree {
    pub locale: String,
    /// Documents keyed by slug (docs pages and blog posts share the key space).
    pub documents: BTreeMap<String, Arc<Document>>,
    /// Category metadata keyed by directory slug.
    pub categories: BTreeMap<String, CategoryMeta>,
}

impl LocaleTree {
    pub fn empty(locale: &str) -> Self {
        Self {
            locale: locale.to_string(),
            ..Default::default()
        }
    }
}
