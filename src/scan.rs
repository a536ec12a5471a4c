//! Content discovery: stage 1 of the build pipeline.
//!
//! Walks the default content tree and every locale override tree, parses
//! front matter and produces one [`LocaleTree`] per locale.
//!
//! ## Directory Structure
//!
//! ```text
//! content/                            # Content root
//! ├── config.toml                     # Site configuration (optional)
//! ├── docs/                           # Default-locale docs pages
//! │   ├── index.md                    # Landing page (slug "")
//! │   ├── 010-intro.md                # slug "intro", position 10
//! │   └── 020-guide/
//! │       ├── _category_.yml          # label / position for the group
//! │       ├── index.md                # slug "guide" (the group's page)
//! │       └── setup.md                # slug "guide/setup"
//! ├── blog/
//! │   └── 2024-03-01-release.md       # slug "blog/release", dated
//! ├── static/                         # Copied verbatim to the output root
//! └── i18n/
//!     └── pt-BR/
//!         ├── docs/010-intro.md       # Translation of "intro"
//!         └── blog/
//! ```
//!
//! ## Rules
//!
//! - Markdown files are `.md` and `.mdx`. Hidden entries and names starting
//!   with `_` (partials) are skipped, except `_category_` files.
//! - Slugs drop extensions and `NNN-` prefixes; `index`/`README` stand for
//!   their directory. Front matter `slug` can rename the page.
//! - Within a locale, two files resolving to the same slug are an error.
//! - A locale without an override directory is an empty tree; the resolver
//!   falls back to the default locale for every page.
//! - Drafts are dropped here unless `build.include_drafts` is set.

use crate::anchors;
use crate::config::SiteConfig;
use crate::metadata::{self, FrontMatter};
use crate::naming;
use crate::types::{CategoryMeta, DocKind, Document, LocaleTree};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: malformed front matter: {reason}")]
    MalformedFrontMatter { path: PathBuf, reason: String },
    #[error("{path}: malformed category file: {reason}")]
    MalformedCategory { path: PathBuf, reason: String },
    #[error("duplicate slug `{slug}` in locale {locale}: {first} and {second}")]
    DuplicateSlug {
        locale: String,
        slug: String,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("{path}: `{slug}` would be emitted inside the output of locale {locale}")]
    LocaleCollision {
        locale: String,
        slug: String,
        path: PathBuf,
    },
}

impl ScanError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        ScanError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// URL prefix of blog posts, independent of the source directory name.
pub const BLOG_SLUG: &str = "blog";

const MARKDOWN_EXTENSIONS: &[&str] = &["md", "mdx"];
const CATEGORY_FILES: &[&str] = &["_category_.yml", "_category_.yaml", "_category_.json"];

/// Where a content file sits, as seen by [`parse_document`].
#[derive(Debug, Clone)]
pub struct SourceFile<'a> {
    pub locale: &'a str,
    pub kind: DocKind,
    /// Path relative to the section root (`docs/` or `blog/` of the locale).
    pub rel_path: &'a Path,
    /// Path relative to the content root, for diagnostics.
    pub source_path: PathBuf,
    pub last_modified: Option<u64>,
}

/// Load every declared locale: the default tree first, then the overrides
/// in parallel.
pub fn scan(root: &Path, config: &SiteConfig) -> Result<Vec<LocaleTree>, ScanError> {
    let codes: Vec<&str> = config
        .ordered_locales()
        .iter()
        .map(|l| l.code.as_str())
        .collect();
    scan_locales(root, config, &codes)
}

/// Load the default tree plus the given locales, default first.
///
/// The default locale is always loaded, it is the fallback for everyone.
/// Its pages are served from the output root, so none may start with the
/// code of another declared locale.
pub fn scan_locales(
    root: &Path,
    config: &SiteConfig,
    codes: &[&str],
) -> Result<Vec<LocaleTree>, ScanError> {
    let default_tree = load_locale_tree(root, &config.default_locale, config)?;
    for (slug, doc) in &default_tree.documents {
        if let Some(locale) = colliding_locale(slug, config) {
            return Err(ScanError::LocaleCollision {
                locale: locale.to_string(),
                slug: slug.clone(),
                path: doc.source_path.clone(),
            });
        }
    }
    let others = codes
        .par_iter()
        .filter(|code| **code != config.default_locale)
        .map(|code| load_locale_tree(root, code, config))
        .collect::<Result<Vec<_>, _>>()?;

    let mut trees = Vec::with_capacity(others.len() + 1);
    trees.push(default_tree);
    trees.extend(others);
    Ok(trees)
}

/// The non-default locale whose output subtree `rel` falls into, if any.
///
/// Compared without case so the check holds on case-insensitive filesystems.
fn colliding_locale<'c>(rel: &str, config: &'c SiteConfig) -> Option<&'c str> {
    let first = rel.split('/').next().filter(|s| !s.is_empty())?;
    config
        .locales
        .iter()
        .map(|l| l.code.as_str())
        .filter(|code| *code != config.default_locale)
        .find(|code| code.eq_ignore_ascii_case(first))
}

/// Directory holding a locale's docs and blog sections.
pub fn locale_content_dir(root: &Path, locale: &str, config: &SiteConfig) -> PathBuf {
    if locale == config.default_locale {
        root.to_path_buf()
    } else {
        root.join(&config.content.i18n_dir).join(locale)
    }
}

/// Load one locale's documents and category metadata.
pub fn load_locale_tree(
    root: &Path,
    locale: &str,
    config: &SiteConfig,
) -> Result<LocaleTree, ScanError> {
    let base = locale_content_dir(root, locale, config);
    let mut tree = LocaleTree::empty(locale);

    let docs_root = base.join(&config.content.docs_dir);
    if docs_root.is_dir() {
        load_section(root, &docs_root, DocKind::Doc, config, &mut tree)?;
    } else if locale != config.default_locale {
        debug!(locale, path = %docs_root.display(), "No docs override directory");
    }
    let blog_root = base.join(&config.content.blog_dir);
    if blog_root.is_dir() {
        load_section(root, &blog_root, DocKind::Post, config, &mut tree)?;
    }

    info!(
        locale,
        documents = tree.documents.len(),
        categories = tree.categories.len(),
        "Loaded locale tree"
    );
    Ok(tree)
}

fn load_section(
    root: &Path,
    section_root: &Path,
    kind: DocKind,
    config: &SiteConfig,
    tree: &mut LocaleTree,
) -> Result<(), ScanError> {
    let walker = WalkDir::new(section_root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e.file_name().to_string_lossy().as_ref()));

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(section_root).to_path_buf();
            ScanError::Io {
                path,
                source: e.into(),
            }
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let rel_path = path.strip_prefix(section_root).unwrap_or(path);
        let file_name = entry.file_name().to_string_lossy();
        let source_path = path.strip_prefix(root).unwrap_or(path).to_path_buf();

        if CATEGORY_FILES.contains(&file_name.as_ref()) {
            if kind == DocKind::Doc {
                load_category(path, rel_path, &source_path, tree)?;
            }
            continue;
        }
        if file_name.starts_with('_') || !is_markdown(path) {
            continue;
        }

        let content = fs::read_to_string(path).map_err(|e| ScanError::io(&source_path, e))?;
        let last_modified = fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs());
        let file = SourceFile {
            locale: &tree.locale,
            kind,
            rel_path,
            source_path,
            last_modified,
        };
        let Some(doc) = parse_document(&file, &content, config)? else {
            continue;
        };
        if kind == DocKind::Doc {
            register_directories(rel_path, tree);
        }
        insert_document(tree, doc)?;
    }
    Ok(())
}

fn insert_document(tree: &mut LocaleTree, doc: Document) -> Result<(), ScanError> {
    if let Some(existing) = tree.documents.get(&doc.slug) {
        return Err(ScanError::DuplicateSlug {
            locale: tree.locale.clone(),
            slug: doc.slug,
            first: existing.source_path.clone(),
            second: doc.source_path,
        });
    }
    debug!(
        locale = %tree.locale,
        slug = %doc.slug,
        path = %doc.source_path.display(),
        "Loaded document"
    );
    tree.documents.insert(doc.slug.clone(), doc.into());
    Ok(())
}

/// Record every directory above a docs file, with its `NNN-` prefix as the
/// fallback position. Category files fill in the label and explicit position.
fn register_directories(rel_path: &Path, tree: &mut LocaleTree) {
    let dirs = path_segments(rel_path.parent().unwrap_or(Path::new("")));
    for depth in 1..=dirs.len() {
        let slug = dir_slug(&dirs[..depth]);
        tree.categories
            .entry(slug)
            .or_insert_with(|| implicit_category(&dirs[depth - 1]));
    }
}

fn implicit_category(dir_name: &str) -> CategoryMeta {
    CategoryMeta {
        prefix_position: naming::parse_entry_name(dir_name).number.map(i64::from),
        ..Default::default()
    }
}

fn load_category(
    path: &Path,
    rel_path: &Path,
    source_path: &Path,
    tree: &mut LocaleTree,
) -> Result<(), ScanError> {
    let content = fs::read_to_string(path).map_err(|e| ScanError::io(source_path, e))?;
    let meta: CategoryMeta = if content.trim().is_empty() {
        CategoryMeta::default()
    } else {
        // JSON is a subset of YAML, one parser covers all three extensions.
        serde_yaml::from_str(&content).map_err(|e| ScanError::MalformedCategory {
            path: source_path.to_path_buf(),
            reason: e.to_string(),
        })?
    };
    let dirs = path_segments(rel_path.parent().unwrap_or(Path::new("")));
    let Some(last) = dirs.last() else {
        // A category file at the section root describes nothing.
        warn!(path = %source_path.display(), "Ignoring category file at the docs root");
        return Ok(());
    };
    let entry = tree
        .categories
        .entry(dir_slug(&dirs))
        .or_insert_with(|| implicit_category(last));
    if meta.label.is_some() {
        entry.label = meta.label;
    }
    if meta.position.is_some() {
        entry.position = meta.position;
    }
    Ok(())
}

/// Build a [`Document`] from a file's content.
///
/// Returns `Ok(None)` for drafts when drafts are not included.
pub fn parse_document(
    file: &SourceFile<'_>,
    content: &str,
    config: &SiteConfig,
) -> Result<Option<Document>, ScanError> {
    let malformed = |reason: String| ScanError::MalformedFrontMatter {
        path: file.source_path.clone(),
        reason,
    };

    let split = metadata::split_front_matter(content).map_err(|e| malformed(e.to_string()))?;
    let front_matter = match split.front_matter {
        Some((format, block)) => {
            metadata::parse_front_matter(format, block).map_err(|e| malformed(e.to_string()))?
        }
        None => FrontMatter::default(),
    };

    if !front_matter.unknown_keys.is_empty() {
        let keys = front_matter.unknown_keys.join(", ");
        if config.front_matter.deny_unknown_keys {
            return Err(malformed(format!("unknown key(s): {keys}")));
        }
        warn!(path = %file.source_path.display(), keys = %keys, "Unknown front matter keys");
    }

    if front_matter.draft && !config.build.include_drafts {
        debug!(path = %file.source_path.display(), "Skipping draft");
        return Ok(None);
    }

    let mut segments = path_segments(&file.rel_path.with_extension(""));
    let stem = segments.pop().unwrap_or_default();
    let dir_segments = segments;

    let section_prefix: Vec<String> = match file.kind {
        DocKind::Doc => Vec::new(),
        DocKind::Post => vec![BLOG_SLUG.to_string()],
    };
    let (name_date, stem_name) = match file.kind {
        DocKind::Doc => (None, stem.as_str()),
        DocKind::Post => naming::split_date_prefix(&stem),
    };
    let parsed = naming::parse_entry_name(&stem);
    let is_index = naming::is_index_stem(stem_name);

    let mut dir_parts = section_prefix.clone();
    dir_parts.extend(dir_segments.iter().map(|s| naming::slug_segment(s)));
    let dir = naming::join_slug(dir_parts.iter().map(String::as_str));

    let leaf = if is_index {
        None
    } else if file.kind == DocKind::Doc {
        Some(naming::slug_segment(&stem))
    } else {
        Some(stem_name.to_string())
    };
    let path_key = naming::join_slug(dir_parts.iter().map(String::as_str).chain(leaf.as_deref()));

    let mut raw_parts = section_prefix;
    raw_parts.extend(dir_segments.iter().cloned());
    raw_parts.push(stem.clone());
    let source_key = naming::join_slug(raw_parts.iter().map(String::as_str));

    let slug = match front_matter.slug.as_deref() {
        Some(custom) => override_slug(&path_key, custom).map_err(malformed)?,
        None => path_key.clone(),
    };

    let fallback_title = if is_index {
        dir_segments
            .last()
            .map(|d| naming::parse_entry_name(d).display_title)
            .unwrap_or_else(|| config.title.clone())
    } else if file.kind == DocKind::Post {
        stem_name.replace('-', " ")
    } else {
        parsed.display_title.clone()
    };
    let heading_title = anchors::first_title(split.body);
    let title = metadata::resolve(&[
        front_matter.title.as_deref(),
        heading_title.as_deref(),
        Some(fallback_title.as_str()),
        Some(stem.as_str()),
    ])
    .unwrap_or_else(|| stem.clone());

    let position = front_matter.position.or_else(|| {
        (file.kind == DocKind::Doc)
            .then_some(parsed.number)
            .flatten()
            .map(i64::from)
    });

    Ok(Some(Document {
        locale: file.locale.to_string(),
        slug,
        kind: file.kind,
        title,
        sidebar_label: front_matter.sidebar_label,
        description: front_matter.description,
        position,
        tags: front_matter.tags.into_iter().collect(),
        date: front_matter.date.or_else(|| name_date.map(String::from)),
        draft: front_matter.draft,
        body: split.body.to_string(),
        source_path: file.source_path.clone(),
        dir,
        path_key,
        source_key,
        is_index,
        last_modified: file.last_modified,
        unknown_keys: front_matter.unknown_keys,
    }))
}

/// Apply a front matter `slug`: `/a/b` replaces the whole slug, `name`
/// replaces the last segment.
fn override_slug(path_key: &str, custom: &str) -> Result<String, String> {
    let cleaned: Vec<&str> = custom.split('/').filter(|s| !s.is_empty()).collect();
    if cleaned.iter().any(|s| *s == "." || *s == "..") {
        return Err(format!("slug `{custom}` must not contain `.` or `..` segments"));
    }
    let custom_slug = cleaned.join("/");
    if custom.starts_with('/') {
        return Ok(custom_slug);
    }
    Ok(match path_key.rsplit_once('/') {
        Some((parent, _)) => naming::join_slug([parent, custom_slug.as_str()]),
        None => custom_slug,
    })
}

/// Every file under `static/`, as `/`-separated paths relative to it.
pub fn list_static_assets(root: &Path, config: &SiteConfig) -> Result<BTreeSet<String>, ScanError> {
    let static_root = root.join(&config.content.static_dir);
    let mut assets = BTreeSet::new();
    if !static_root.is_dir() {
        return Ok(assets);
    }
    for entry in WalkDir::new(&static_root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(&static_root).to_path_buf();
            ScanError::Io {
                path,
                source: e.into(),
            }
        })?;
        if entry.file_type().is_file() {
            let rel = entry.path().strip_prefix(&static_root).unwrap_or(entry.path());
            let rel = path_segments(rel).join("/");
            if let Some(locale) = colliding_locale(&rel, config) {
                return Err(ScanError::LocaleCollision {
                    locale: locale.to_string(),
                    path: entry.path().to_path_buf(),
                    slug: rel,
                });
            }
            assets.insert(rel);
        }
    }
    debug!(count = assets.len(), "Listed static assets");
    Ok(assets)
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            MARKDOWN_EXTENSIONS
                .iter()
                .any(|m| ext.eq_ignore_ascii_case(m))
        })
        .unwrap_or(false)
}

fn path_segments(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

fn dir_slug(dirs: &[String]) -> String {
    let segments: Vec<String> = dirs.iter().map(|d| naming::slug_segment(d)).collect();
    naming::join_slug(segments.iter().map(String::as_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LocaleConfig;
    use crate::test_helpers::*;
    use pretty_assertions::assert_eq;

    fn parse(rel: &str, kind: DocKind, content: &str) -> Result<Option<Document>, ScanError> {
        parse_with(rel, kind, content, &SiteConfig::default())
    }

    fn parse_with(
        rel: &str,
        kind: DocKind,
        content: &str,
        config: &SiteConfig,
    ) -> Result<Option<Document>, ScanError> {
        let rel_path = Path::new(rel);
        let file = SourceFile {
            locale: "en",
            kind,
            rel_path,
            source_path: Path::new("docs").join(rel),
            last_modified: None,
        };
        parse_document(&file, content, config)
    }

    fn parse_ok(rel: &str, content: &str) -> Document {
        parse(rel, DocKind::Doc, content).unwrap().unwrap()
    }

    // =========================================================================
    // parse_document: slugs
    // =========================================================================

    #[test]
    fn slug_strips_extension_and_prefixes() {
        let doc = parse_ok("020-guide/010-setup.md", "# Setup");
        assert_eq!(doc.slug, "guide/setup");
        assert_eq!(doc.dir, "guide");
        assert_eq!(doc.source_key, "020-guide/010-setup");
        assert_eq!(doc.position, Some(10));
        assert!(!doc.is_index);
    }

    #[test]
    fn index_and_readme_map_to_directory() {
        let doc = parse_ok("020-guide/index.md", "# Guide");
        assert_eq!(doc.slug, "guide");
        assert_eq!(doc.dir, "guide");
        assert!(doc.is_index);

        let root = parse_ok("README.md", "hello");
        assert_eq!(root.slug, "");
        assert!(root.is_index);
    }

    #[test]
    fn front_matter_slug_replaces_last_segment() {
        let doc = parse_ok("guide/setup.md", "---\nslug: install\n---\n");
        assert_eq!(doc.slug, "guide/install");
        assert_eq!(doc.path_key, "guide/setup");
    }

    #[test]
    fn absolute_front_matter_slug_replaces_everything() {
        let doc = parse_ok("guide/setup.md", "---\nslug: /start/here/\n---\n");
        assert_eq!(doc.slug, "start/here");
    }

    #[test]
    fn dot_segments_in_slug_are_rejected() {
        let err = parse("a.md", DocKind::Doc, "---\nslug: ../x\n---\n").unwrap_err();
        assert!(matches!(err, ScanError::MalformedFrontMatter { .. }));
    }

    #[test]
    fn blog_slug_drops_date_prefix() {
        let doc = parse("2024-03-01-release-notes.md", DocKind::Post, "Body")
            .unwrap()
            .unwrap();
        assert_eq!(doc.slug, "blog/release-notes");
        assert_eq!(doc.date.as_deref(), Some("2024-03-01"));
        assert_eq!(doc.title, "release notes");
        assert_eq!(doc.position, None);
    }

    #[test]
    fn blog_front_matter_date_wins() {
        let doc = parse("2024-03-01-post.md", DocKind::Post, "---\ndate: 2024-04-02\n---\n")
            .unwrap()
            .unwrap();
        assert_eq!(doc.date.as_deref(), Some("2024-04-02"));
    }

    // =========================================================================
    // parse_document: titles, positions, metadata
    // =========================================================================

    #[test]
    fn title_resolution_order() {
        let fm = parse_ok("010-intro.md", "---\ntitle: From FM\n---\n# From Heading\n");
        assert_eq!(fm.title, "From FM");
        let heading = parse_ok("010-intro.md", "# From Heading\n");
        assert_eq!(heading.title, "From Heading");
        let file = parse_ok("010-getting-started.md", "no heading");
        assert_eq!(file.title, "getting started");
    }

    #[test]
    fn front_matter_position_wins_over_prefix() {
        let doc = parse_ok("010-intro.md", "---\nposition: 3\n---\n");
        assert_eq!(doc.position, Some(3));
        let unnumbered = parse_ok("intro.md", "");
        assert_eq!(unnumbered.position, None);
    }

    #[test]
    fn metadata_fields_are_carried() {
        let doc = parse_ok(
            "api.md",
            "---\nsidebar_label: API\ndescription: The API\ntags: [rust, http]\n---\nbody",
        );
        assert_eq!(doc.nav_label(), "API");
        assert_eq!(doc.description.as_deref(), Some("The API"));
        assert_eq!(doc.tags.iter().collect::<Vec<_>>(), vec!["http", "rust"]);
        assert_eq!(doc.body, "body");
    }

    #[test]
    fn malformed_front_matter_names_the_file() {
        let err = parse("broken.md", DocKind::Doc, "---\ntitle: [oops\n---\n").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("docs/broken.md"), "{msg}");
        assert!(matches!(err, ScanError::MalformedFrontMatter { .. }));
    }

    #[test]
    fn unterminated_front_matter_is_malformed() {
        let err = parse("open.md", DocKind::Doc, "---\ntitle: x\n# Body").unwrap_err();
        assert!(err.to_string().contains("unterminated"));
    }

    #[test]
    fn unknown_keys_warn_by_default() {
        let doc = parse_ok("a.md", "---\nauthor: me\n---\n");
        assert_eq!(doc.unknown_keys, vec!["author"]);
    }

    #[test]
    fn unknown_keys_fail_when_denied() {
        let mut config = SiteConfig::default();
        config.front_matter.deny_unknown_keys = true;
        let err = parse_with("a.md", DocKind::Doc, "---\nauthor: me\n---\n", &config).unwrap_err();
        assert!(err.to_string().contains("author"));
    }

    #[test]
    fn drafts_are_skipped_unless_included() {
        assert!(parse("a.md", DocKind::Doc, "---\ndraft: true\n---\n").unwrap().is_none());
        let mut config = SiteConfig::default();
        config.build.include_drafts = true;
        let doc = parse_with("a.md", DocKind::Doc, "---\ndraft: true\n---\n", &config)
            .unwrap()
            .unwrap();
        assert!(doc.draft);
    }

    // =========================================================================
    // load_locale_tree / scan
    // =========================================================================

    #[test]
    fn scan_loads_fixture_locales() {
        let tmp = setup_fixtures();
        let config = crate::config::load_config(tmp.path()).unwrap();
        let trees = scan(tmp.path(), &config).unwrap();

        let locales: Vec<&str> = trees.iter().map(|t| t.locale.as_str()).collect();
        assert_eq!(locales, vec!["en", "pt-BR"]);

        let en = &trees[0];
        assert_eq!(
            en.documents.keys().map(String::as_str).collect::<Vec<_>>(),
            vec![
                "",
                "api",
                "blog/hello-world",
                "blog/routing-deep-dive",
                "guide",
                "guide/advanced",
                "guide/setup",
                "intro",
                "routing",
            ]
        );
        assert_eq!(find_doc(en, "guide/setup").title, "Setup");

        let pt = &trees[1];
        assert_eq!(find_doc(pt, "intro").title, "Introdução");
        assert!(pt.documents.contains_key("extras"));
        assert!(!pt.documents.contains_key("routing"));
    }

    #[test]
    fn category_files_set_label_and_position() {
        let tmp = setup_fixtures();
        let config = crate::config::load_config(tmp.path()).unwrap();
        let en = load_locale_tree(tmp.path(), "en", &config).unwrap();
        let guide = en.categories.get("guide").unwrap();
        assert_eq!(guide.label.as_deref(), Some("User Guide"));
        assert_eq!(guide.position, Some(25));
    }

    #[test]
    fn directory_prefix_is_implicit_position() {
        let tmp = ContentBuilder::new()
            .file("docs/030-reference/types.md", "# Types")
            .build();
        let en = load_locale_tree(tmp.path(), "en", &SiteConfig::default()).unwrap();
        assert_eq!(
            en.categories.get("reference"),
            Some(&CategoryMeta {
                label: None,
                position: None,
                prefix_position: Some(30),
            })
        );
    }

    #[test]
    fn missing_override_directory_is_empty_tree() {
        let tmp = ContentBuilder::new().file("docs/intro.md", "# Intro").build();
        let mut config = SiteConfig::default();
        config.locales.push(crate::config::LocaleConfig {
            code: "fr".into(),
            label: None,
        });
        let fr = load_locale_tree(tmp.path(), "fr", &config).unwrap();
        assert!(fr.documents.is_empty());
        assert_eq!(fr.locale, "fr");
    }

    #[test]
    fn duplicate_slugs_are_rejected() {
        let tmp = ContentBuilder::new()
            .file("docs/010-intro.md", "# A")
            .file("docs/intro.md", "# B")
            .build();
        let err = load_locale_tree(tmp.path(), "en", &SiteConfig::default()).unwrap_err();
        match err {
            ScanError::DuplicateSlug { slug, .. } => assert_eq!(slug, "intro"),
            other => panic!("expected DuplicateSlug, got {other:?}"),
        }
    }

    fn with_pt_br() -> SiteConfig {
        let mut config = SiteConfig::default();
        config.locales.push(LocaleConfig {
            code: "pt-BR".into(),
            label: None,
        });
        config
    }

    #[test]
    fn default_pages_cannot_shadow_a_locale_subtree() {
        let tmp = ContentBuilder::new()
            .file("docs/intro.md", "# Intro")
            .file("docs/pt-br/notes.md", "# Notes")
            .build();
        let err = scan(tmp.path(), &with_pt_br()).unwrap_err();
        match err {
            ScanError::LocaleCollision { locale, slug, .. } => {
                assert_eq!(locale, "pt-BR");
                assert_eq!(slug, "pt-br/notes");
            }
            other => panic!("expected LocaleCollision, got {other:?}"),
        }

        // Only the default tree is served from the root.
        let tmp = ContentBuilder::new()
            .file("docs/intro.md", "# Intro")
            .file("i18n/pt-BR/docs/en/notes.md", "# Notas")
            .build();
        assert!(scan(tmp.path(), &with_pt_br()).is_ok());
    }

    #[test]
    fn static_assets_cannot_shadow_a_locale_subtree() {
        let tmp = ContentBuilder::new()
            .file("static/pt-BR/index.html", "mine")
            .build();
        match list_static_assets(tmp.path(), &with_pt_br()).unwrap_err() {
            ScanError::LocaleCollision { slug, .. } => assert_eq!(slug, "pt-BR/index.html"),
            other => panic!("expected LocaleCollision, got {other:?}"),
        }
        assert!(list_static_assets(tmp.path(), &SiteConfig::default()).is_ok());
    }

    #[test]
    fn hidden_and_partial_files_are_skipped() {
        let tmp = ContentBuilder::new()
            .file("docs/.hidden.md", "# Hidden")
            .file("docs/_partial.md", "# Partial")
            .file("docs/notes.txt", "not markdown")
            .file("docs/page.mdx", "# Page")
            .build();
        let en = load_locale_tree(tmp.path(), "en", &SiteConfig::default()).unwrap();
        assert_eq!(en.documents.keys().collect::<Vec<_>>(), vec!["page"]);
    }

    #[test]
    fn malformed_category_file_is_error() {
        let tmp = ContentBuilder::new()
            .file("docs/guide/a.md", "# A")
            .file("docs/guide/_category_.yml", "position: [1\n")
            .build();
        let err = load_locale_tree(tmp.path(), "en", &SiteConfig::default()).unwrap_err();
        assert!(matches!(err, ScanError::MalformedCategory { .. }));
    }

    #[test]
    fn static_assets_are_listed_relative() {
        let tmp = setup_fixtures();
        let assets = list_static_assets(tmp.path(), &SiteConfig::default()).unwrap();
        assert!(assets.contains("img/logo.svg"));
        assert!(assets.contains("robots.txt"));
    }
}
