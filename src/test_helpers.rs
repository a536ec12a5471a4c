//! Shared test utilities for the simple-docs test suite.
//!
//! Provides fixture setup, in-memory document builders, lookup helpers and
//! navigation tree assertions.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let (trees, config) = load_fixture_trees(tmp.path());
//!
//! let setup = find_doc(&trees[0], "guide/setup");
//! assert_eq!(setup.title, "Setup");
//!
//! let en = tree("en", &[("intro", "Intro"), ("api", "API")]);
//! let nav = build_navigation(&resolve_tree(&en, &en));
//! assert_nav_shape(&nav, &[("API", &[]), ("Intro", &[])]);
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use crate::config::{SiteConfig, load_config};
use crate::nav::NavNode;
use crate::scan::scan;
use crate::types::{DocKind, Document, LocaleTree};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/content/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/content");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Scan the fixture copy at `root` with its own `config.toml`.
pub fn load_fixture_trees(root: &Path) -> (Vec<LocaleTree>, SiteConfig) {
    let config = load_config(root).unwrap();
    let trees = scan(root, &config).unwrap();
    (trees, config)
}

/// Builds a throwaway content root file by file.
///
/// ```rust
/// let tmp = ContentBuilder::new()
///     .file("docs/010-intro.md", "# Intro")
///     .file("docs/guide/_category_.yml", "label: Guide")
///     .build();
/// ```
#[derive(Default)]
pub struct ContentBuilder {
    files: Vec<(PathBuf, String)>,
}

impl ContentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, path: &str, content: &str) -> Self {
        self.files.push((PathBuf::from(path), content.to_string()));
        self
    }

    pub fn build(self) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for (path, content) in self.files {
            let full = tmp.path().join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(full, content).unwrap();
        }
        tmp
    }
}

// =========================================================================
// In-memory documents
// =========================================================================

/// A docs page with an empty body, as if loaded from `docs/<slug>.md`.
///
/// `dir` is the slug's parent; every key equals the slug. Tests override
/// whatever fields they care about.
pub fn doc(locale: &str, slug: &str, title: &str) -> Document {
    let dir = slug.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
    let file = if slug.is_empty() { "index" } else { slug };
    Document {
        locale: locale.to_string(),
        slug: slug.to_string(),
        kind: DocKind::Doc,
        title: title.to_string(),
        sidebar_label: None,
        description: None,
        position: None,
        tags: BTreeSet::new(),
        date: None,
        draft: false,
        body: String::new(),
        source_path: PathBuf::from(format!("docs/{file}.md")),
        dir: dir.to_string(),
        path_key: slug.to_string(),
        source_key: slug.to_string(),
        is_index: false,
        last_modified: None,
        unknown_keys: Vec::new(),
    }
}

/// A locale tree holding one [`doc`] per `(slug, title)` pair.
pub fn tree(locale: &str, pages: &[(&str, &str)]) -> LocaleTree {
    let mut tree = LocaleTree::empty(locale);
    for (slug, title) in pages {
        tree.documents
            .insert(slug.to_string(), Arc::new(doc(locale, slug, title)));
    }
    tree
}

// =========================================================================
// Lookups (panic with a clear message on miss)
// =========================================================================

/// Find a document by slug. Panics if not found.
pub fn find_doc<'a>(tree: &'a LocaleTree, slug: &str) -> &'a Document {
    tree.documents.get(slug).map(Arc::as_ref).unwrap_or_else(|| {
        let slugs: Vec<&str> = tree.documents.keys().map(String::as_str).collect();
        panic!(
            "document '{slug}' not found in locale '{}'. Available: {slugs:?}",
            tree.locale
        )
    })
}

// =========================================================================
// Navigation helpers
// =========================================================================

fn nav_labels(forest: &[NavNode]) -> Vec<&str> {
    forest.iter().map(|n| n.label.as_str()).collect()
}

/// Assert that a sidebar forest matches an expected shape.
///
/// Each entry is `(label, child labels)`. Use `&[]` for leaf nodes.
///
/// ```rust
/// assert_nav_shape(&nav, &[
///     ("Introduction", &[]),
///     ("User Guide", &["Setup", "Advanced"]),
/// ]);
/// ```
pub fn assert_nav_shape(forest: &[NavNode], expected: &[(&str, &[&str])]) {
    let expected_labels: Vec<&str> = expected.iter().map(|(l, _)| *l).collect();
    assert_eq!(
        nav_labels(forest),
        expected_labels,
        "nav top-level labels mismatch"
    );

    for ((label, children), node) in expected.iter().zip(forest) {
        assert_eq!(
            nav_labels(&node.children),
            children.to_vec(),
            "nav children of '{label}' mismatch"
        );
    }
}
