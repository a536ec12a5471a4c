//! Navigation building: stage 3 of the build pipeline.
//!
//! Turns a resolved locale tree into the sidebar forest. Documents are
//! grouped by the directory they live in; a directory's `index` page becomes
//! the target of the directory node itself.
//!
//! ```text
//! docs/                               sidebar
//! ├── 010-intro.md                    ├── Introduction        (10)
//! ├── routing.md  (position: 15)      ├── Routing             (15)
//! ├── 020-guide/                      ├── User Guide → guide  (20)
//! │   ├── _category_.yml              │   ├── Setup           (1)
//! │   ├── index.md                    │   └── Advanced        (2)
//! │   ├── setup.md   (position: 1)    └── API                 (50)
//! │   └── advanced.md (position: 2)
//! └── 050-api.md
//! ```
//!
//! ## Ordering
//!
//! Each level is ordered on its own; a directory and a page only ever
//! compare as siblings. The ordering key of a node is its explicit position
//! or, without one, its 1-based rank in lexical slug order among the
//! siblings. Siblings sort by key, then slug, then pages before directories,
//! which makes the order total and repeatable.
//!
//! A directory takes its position from its category file, else from its
//! index page, else from its `NNN-` prefix. Directories without any visible
//! page are dropped.

use crate::locale::{ResolvedDoc, ResolvedTree};
use crate::metadata;
use crate::naming;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NavError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Ordering key of a node among its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderKey {
    pub value: i64,
    /// Whether `value` was authored (position, category, prefix) or is the
    /// lexical rank.
    pub explicit: bool,
}

/// One sidebar entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavNode {
    pub label: String,
    /// Page the entry links to. `None` for a directory without an index page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Slug of the page, or of the directory for groups. Unique per level.
    pub path: String,
    pub order: OrderKey,
    /// The target page is served from the default locale.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub untranslated: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NavNode>,
}

impl NavNode {
    /// Whether this node or any descendant targets `slug`.
    pub fn contains(&self, slug: &str) -> bool {
        self.slug.as_deref() == Some(slug) || self.children.iter().any(|c| c.contains(slug))
    }
}

#[derive(Default)]
struct DirGroup<'a> {
    index: Option<&'a ResolvedDoc>,
    pages: Vec<&'a ResolvedDoc>,
    subdirs: BTreeMap<String, DirGroup<'a>>,
}

/// Build the sidebar forest of one locale. Blog posts are not part of it.
pub fn build_navigation(tree: &ResolvedTree) -> Vec<NavNode> {
    let mut root = DirGroup::default();
    for resolved in tree.docs() {
        let doc = &resolved.doc;
        let mut group = &mut root;
        for segment in doc.dir.split('/').filter(|s| !s.is_empty()) {
            group = group.subdirs.entry(segment.to_string()).or_default();
        }
        if doc.is_index && !doc.dir.is_empty() && group.index.is_none() {
            group.index = Some(resolved);
        } else {
            group.pages.push(resolved);
        }
    }
    build_level(&root, "", tree)
}

struct Candidate {
    position: Option<i64>,
    path: String,
    is_dir: bool,
    node: NavNode,
}

fn build_level(group: &DirGroup<'_>, dir_slug: &str, tree: &ResolvedTree) -> Vec<NavNode> {
    let mut candidates: Vec<Candidate> = Vec::new();

    for page in &group.pages {
        candidates.push(Candidate {
            position: page.doc.position,
            path: page.doc.slug.clone(),
            is_dir: false,
            node: NavNode {
                label: page.doc.nav_label().to_string(),
                slug: Some(page.doc.slug.clone()),
                path: page.doc.slug.clone(),
                order: OrderKey {
                    value: 0,
                    explicit: false,
                },
                untranslated: page.is_untranslated(),
                children: Vec::new(),
            },
        });
    }

    for (segment, subgroup) in &group.subdirs {
        let sub_slug = naming::join_slug([dir_slug, segment.as_str()]);
        let children = build_level(subgroup, &sub_slug, tree);
        if subgroup.index.is_none() && children.is_empty() {
            continue;
        }
        let category = tree.categories.get(&sub_slug).cloned().unwrap_or_default();
        let index_doc = subgroup.index.map(|r| &r.doc);
        let position = category
            .position
            .or_else(|| index_doc.and_then(|d| d.position))
            .or(category.prefix_position);
        let fallback_label = segment.replace('-', " ");
        let label = metadata::resolve(&[
            category.label.as_deref(),
            index_doc.map(|d| d.nav_label()),
            Some(fallback_label.as_str()),
        ])
        .unwrap_or_else(|| segment.clone());

        candidates.push(Candidate {
            position,
            path: sub_slug.clone(),
            is_dir: true,
            node: NavNode {
                label,
                slug: index_doc.map(|d| d.slug.clone()),
                path: sub_slug,
                order: OrderKey {
                    value: 0,
                    explicit: false,
                },
                untranslated: subgroup.index.is_some_and(ResolvedDoc::is_untranslated),
                children,
            },
        });
    }

    // Rank in lexical slug order is the key of siblings without a position.
    candidates.sort_by(|a, b| a.path.cmp(&b.path).then(a.is_dir.cmp(&b.is_dir)));
    for (rank, candidate) in candidates.iter_mut().enumerate() {
        candidate.node.order = match candidate.position {
            Some(value) => OrderKey {
                value,
                explicit: true,
            },
            None => OrderKey {
                value: rank as i64 + 1,
                explicit: false,
            },
        };
    }
    candidates.sort_by(|a, b| {
        a.node
            .order
            .value
            .cmp(&b.node.order.value)
            .then_with(|| a.path.cmp(&b.path))
            .then(a.is_dir.cmp(&b.is_dir))
    });
    candidates.into_iter().map(|c| c.node).collect()
}

/// Slugs of every targeted node in depth-first display order.
///
/// Drives the previous/next links at the bottom of each page.
pub fn reading_order(forest: &[NavNode]) -> Vec<&str> {
    fn walk<'a>(nodes: &'a [NavNode], out: &mut Vec<&'a str>) {
        for node in nodes {
            if let Some(slug) = &node.slug {
                out.push(slug);
            }
            walk(&node.children, out);
        }
    }
    let mut out = Vec::new();
    walk(forest, &mut out);
    out
}

/// Serialize a forest to the `_nav.json` format.
pub fn navigation_json(forest: &[NavNode]) -> Result<String, NavError> {
    Ok(serde_json::to_string_pretty(forest)?)
}

pub fn save_navigation(path: &Path, forest: &[NavNode]) -> Result<(), NavError> {
    fs::write(path, navigation_json(forest)?)?;
    Ok(())
}

pub fn load_navigation(path: &Path) -> Result<Vec<NavNode>, NavError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::resolve_tree;
    use crate::test_helpers::*;
    use crate::types::{CategoryMeta, LocaleTree};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn labels(forest: &[NavNode]) -> Vec<&str> {
        forest.iter().map(|n| n.label.as_str()).collect()
    }

    fn add(tree: &mut LocaleTree, slug: &str, title: &str, position: Option<i64>) {
        let mut d = doc(&tree.locale, slug, title);
        d.position = position;
        tree.documents.insert(slug.to_string(), Arc::new(d));
    }

    fn nav_of(tree: &LocaleTree) -> Vec<NavNode> {
        build_navigation(&resolve_tree(tree, tree))
    }

    #[test]
    fn positioned_sibling_among_unpositioned() {
        let mut en = LocaleTree::empty("en");
        add(&mut en, "charlie", "Charlie", Some(2));
        add(&mut en, "alpha", "Alpha", None);
        add(&mut en, "bravo", "Bravo", None);
        // alpha → rank 1, bravo → rank 2 (ties with charlie, wins on slug), charlie → 2.
        assert_eq!(labels(&nav_of(&en)), vec!["Alpha", "Bravo", "Charlie"]);

        let mut en = LocaleTree::empty("en");
        add(&mut en, "alpha", "Alpha", Some(2));
        add(&mut en, "bravo", "Bravo", None);
        add(&mut en, "charlie", "Charlie", None);
        // bravo → 2 (after alpha on slug), charlie → 3.
        assert_eq!(labels(&nav_of(&en)), vec!["Alpha", "Bravo", "Charlie"]);

        let mut en = LocaleTree::empty("en");
        add(&mut en, "alpha", "Alpha", None);
        add(&mut en, "bravo", "Bravo", None);
        add(&mut en, "charlie", "Charlie", Some(1));
        // charlie's 1 ties alpha's rank and loses on slug.
        assert_eq!(labels(&nav_of(&en)), vec!["Alpha", "Charlie", "Bravo"]);
    }

    #[test]
    fn explicit_positions_sort_numerically() {
        let mut en = LocaleTree::empty("en");
        add(&mut en, "a", "A", Some(30));
        add(&mut en, "b", "B", Some(10));
        add(&mut en, "c", "C", Some(20));
        let nav = nav_of(&en);
        assert_eq!(labels(&nav), vec!["B", "C", "A"]);
        assert!(nav.iter().all(|n| n.order.explicit));
    }

    #[test]
    fn directories_nest_and_use_index_pages() {
        let mut en = LocaleTree::empty("en");
        add(&mut en, "intro", "Intro", Some(1));
        let mut index = doc("en", "guide", "Guide Home");
        index.is_index = true;
        index.dir = "guide".into();
        index.position = Some(2);
        en.documents.insert("guide".into(), Arc::new(index));
        let mut setup = doc("en", "guide/setup", "Setup");
        setup.dir = "guide".into();
        en.documents.insert("guide/setup".into(), Arc::new(setup));

        let nav = nav_of(&en);
        assert_nav_shape(&nav, &[("Intro", &[]), ("Guide Home", &["Setup"])]);
        assert_eq!(nav[1].slug.as_deref(), Some("guide"));
        assert_eq!(nav[1].path, "guide");
    }

    #[test]
    fn directory_position_precedence() {
        let mut en = LocaleTree::empty("en");
        add(&mut en, "middle", "Middle", Some(5));
        let mut page = doc("en", "group/page", "Page");
        page.dir = "group".into();
        en.documents.insert("group/page".into(), Arc::new(page));

        // Prefix only: 9 sorts after 5.
        en.categories.insert(
            "group".into(),
            CategoryMeta {
                prefix_position: Some(9),
                ..Default::default()
            },
        );
        assert_eq!(labels(&nav_of(&en)), vec!["Middle", "group"]);

        // Category position wins over the prefix.
        en.categories.get_mut("group").unwrap().position = Some(1);
        en.categories.get_mut("group").unwrap().label = Some("Group".into());
        assert_eq!(labels(&nav_of(&en)), vec!["Group", "Middle"]);
    }

    #[test]
    fn page_sorts_before_directory_with_same_key_and_slug() {
        let mut en = LocaleTree::empty("en");
        add(&mut en, "api", "API", Some(1));
        add(&mut en, "guide", "Guide Page", Some(3));
        let mut setup = doc("en", "guide/setup", "Setup");
        setup.dir = "guide".into();
        en.documents.insert("guide/setup".into(), Arc::new(setup));
        en.categories.insert(
            "guide".into(),
            CategoryMeta {
                label: Some("Guide Section".into()),
                position: Some(3),
                ..Default::default()
            },
        );

        let nav = nav_of(&en);
        assert_nav_shape(
            &nav,
            &[("API", &[]), ("Guide Page", &[]), ("Guide Section", &["Setup"])],
        );
        assert_eq!((nav[1].order.value, nav[1].path.as_str()), (3, "guide"));
        assert_eq!((nav[2].order.value, nav[2].path.as_str()), (3, "guide"));
        assert_eq!(nav[1].slug.as_deref(), Some("guide"));
        assert_eq!(nav[2].slug, None);
    }

    #[test]
    fn directory_without_index_has_no_target() {
        let mut en = LocaleTree::empty("en");
        let mut page = doc("en", "ref/types", "Types");
        page.dir = "ref".into();
        en.documents.insert("ref/types".into(), Arc::new(page));
        let nav = nav_of(&en);
        assert_eq!(nav[0].label, "ref");
        assert_eq!(nav[0].slug, None);
        assert_eq!(nav[0].children[0].slug.as_deref(), Some("ref/types"));
    }

    #[test]
    fn empty_directories_are_omitted() {
        let mut en = LocaleTree::empty("en");
        add(&mut en, "intro", "Intro", None);
        en.categories.insert("ghost".into(), CategoryMeta::default());
        assert_eq!(labels(&nav_of(&en)), vec!["Intro"]);
    }

    #[test]
    fn blog_posts_are_not_in_the_sidebar() {
        let mut en = LocaleTree::empty("en");
        add(&mut en, "intro", "Intro", None);
        let mut post = doc("en", "blog/hello", "Hello");
        post.kind = crate::types::DocKind::Post;
        post.dir = "blog".into();
        en.documents.insert("blog/hello".into(), Arc::new(post));
        assert_eq!(labels(&nav_of(&en)), vec!["Intro"]);
    }

    #[test]
    fn untranslated_pages_are_flagged() {
        let en = tree("en", &[("intro", "Intro"), ("api", "API")]);
        let pt = tree("pt-BR", &[("intro", "Introdução")]);
        let nav = build_navigation(&resolve_tree(&en, &pt));
        let api = nav.iter().find(|n| n.path == "api").unwrap();
        let intro = nav.iter().find(|n| n.path == "intro").unwrap();
        assert!(api.untranslated);
        assert!(!intro.untranslated);
        assert_eq!(intro.label, "Introdução");
    }

    #[test]
    fn reading_order_is_depth_first() {
        let tmp = setup_fixtures();
        let (trees, _) = load_fixture_trees(tmp.path());
        let nav = build_navigation(&resolve_tree(&trees[0], &trees[0]));
        assert_eq!(
            reading_order(&nav),
            vec!["", "intro", "routing", "guide", "guide/setup", "guide/advanced", "api"]
        );
    }

    #[test]
    fn nav_json_round_trip() {
        let tmp = setup_fixtures();
        let (trees, _) = load_fixture_trees(tmp.path());
        let nav = build_navigation(&resolve_tree(&trees[0], &trees[1]));

        let out = TempDir::new().unwrap();
        let path = out.path().join("_nav.json");
        save_navigation(&path, &nav).unwrap();
        assert_eq!(load_navigation(&path).unwrap(), nav);
    }

    proptest! {
        #[test]
        fn ordering_is_deterministic_and_total(
            entries in prop::collection::btree_map("[a-z]{1,6}", prop::option::of(-3i64..6), 1..10)
        ) {
            let mut en = LocaleTree::empty("en");
            for (slug, position) in &entries {
                add(&mut en, slug, slug, *position);
            }
            let first = nav_of(&en);
            prop_assert_eq!(&first, &nav_of(&en));
            prop_assert_eq!(first.len(), entries.len());
            for pair in first.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                prop_assert!(
                    (a.order.value, &a.path) < (b.order.value, &b.path),
                    "{:?} before {:?}", a, b
                );
            }
        }
    }
}
