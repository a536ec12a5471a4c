//! Build orchestration.
//!
//! ```text
//!             ┌────────── per locale, parallel ──────────┐
//! scan ──────▶│ resolve ─▶ navigate ─▶ validate           │──▶ barrier
//! (default    └───────────────────────────────────────────┘      │
//!  first)                                                        ▼
//!             ┌────────── per locale, parallel ──────────┐  any broken
//!             │ render ─▶ search index ─▶ emit            │◀─ reference?
//!             └───────────────────────────────────────────┘  stop here
//! ```
//!
//! Validation of every locale finishes before the first byte is written,
//! so a broken reference never leaves partial output. Emission failures are
//! isolated per locale: the other locales still land, and the build reports
//! every failure at the end.

use crate::cache::EmitStats;
use crate::config::{ConfigError, SiteConfig};
use crate::emit::{self, EmitError, EmitOptions, EmitReport, OutputFile, OutputWriteError};
use crate::links::{self, BrokenReference};
use crate::locale::{self, ParityReport, ResolvedTree};
use crate::nav::{self, NavError, NavNode};
use crate::render::{self, LocaleLink, Renderer, SiteContext};
use crate::scan::{self, ScanError};
use crate::search;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{info, warn};

/// File names written at every locale root next to the pages.
pub const NAV_FILE: &str = "_nav.json";
pub const SEARCH_INDEX_FILE: &str = "search-index.json";
pub const STYLESHEET_FILE: &str = "style.css";
pub const SEARCH_SCRIPT_FILE: &str = "search.js";

/// Shared cancellation flag. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn as_atomic(&self) -> &AtomicBool {
        &self.0
    }
}

/// An emission failure and the part of the site it hit.
#[derive(Error, Debug)]
#[error("[{scope}] {source}")]
pub struct EmitFailure {
    /// Locale code, or `static` for the asset copy.
    pub scope: String,
    #[source]
    pub source: OutputWriteError,
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("unknown locale `{0}`")]
    UnknownLocale(String),
    #[error("{} broken reference(s)", .0.len())]
    BrokenReferences(Vec<BrokenReference>),
    #[error("{} output write failure(s)", .0.len())]
    OutputWrite(Vec<EmitFailure>),
    #[error(transparent)]
    Nav(#[from] NavError),
    #[error("search index: {0}")]
    Json(#[from] serde_json::Error),
    #[error("build aborted")]
    Aborted,
}

/// Which locales a run covers.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Restrict validation and emission to one locale. The default tree is
    /// still loaded for fallback.
    pub only_locale: Option<String>,
    pub cancel: CancelFlag,
}

/// Per-locale outcome of validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleSummary {
    pub locale: String,
    pub is_default: bool,
    pub documents: usize,
    pub references: usize,
    pub parity: ParityReport,
    pub navigation: Vec<NavNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub locales: Vec<LocaleSummary>,
    pub assets: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub check: CheckReport,
    pub emitted: Vec<EmitReport>,
    pub assets: EmitStats,
    pub output: PathBuf,
}

/// A locale ready to render: resolved, navigated and validated.
struct PreparedLocale {
    tree: ResolvedTree,
    nav: Vec<NavNode>,
    summary: LocaleSummary,
}

struct Prepared {
    /// Locales selected for this run, default first.
    selected: Vec<PreparedLocale>,
    /// Served slugs per declared locale, for the language switcher.
    links: Vec<LocaleLink>,
    assets: BTreeSet<String>,
}

/// Validate everything a build would emit, without writing anything.
pub fn check(root: &Path, config: &SiteConfig, options: &BuildOptions) -> Result<CheckReport, BuildError> {
    let prepared = prepare(root, config, options)?;
    Ok(check_report(&prepared))
}

/// Full pipeline: load, validate, render and emit into `output`.
pub fn build(
    root: &Path,
    output: &Path,
    config: &SiteConfig,
    options: &BuildOptions,
) -> Result<BuildReport, BuildError> {
    let prepared = prepare(root, config, options)?;
    if options.cancel.is_cancelled() {
        return Err(BuildError::Aborted);
    }

    info!(output = %output.display(), "Emitting site");
    let static_root = root.join(&config.content.static_dir);
    let mut failures = Vec::new();
    let assets = emit::copy_static_assets(
        &static_root,
        output,
        &prepared.assets,
        config.build.write_retries,
    )
    .unwrap_or_else(|source| {
        failures.push(EmitFailure {
            scope: "static".into(),
            source,
        });
        EmitStats::default()
    });

    let emit_options = EmitOptions {
        write_retries: config.build.write_retries,
        cancel: options.cancel.as_atomic(),
    };
    let results: Vec<Result<EmitReport, BuildError>> = prepared
        .selected
        .par_iter()
        .map(|locale| emit_prepared(output, config, locale, &prepared, &emit_options))
        .collect();

    let mut emitted = Vec::new();
    let mut aborted = false;
    for result in results {
        match result {
            Ok(report) => emitted.push(report),
            Err(BuildError::OutputWrite(mut f)) => failures.append(&mut f),
            Err(BuildError::Aborted) => aborted = true,
            Err(e) => return Err(e),
        }
    }
    if aborted {
        warn!("Build cancelled, unfinished locales were not committed");
        return Err(BuildError::Aborted);
    }
    if !failures.is_empty() {
        return Err(BuildError::OutputWrite(failures));
    }

    Ok(BuildReport {
        check: check_report(&prepared),
        emitted,
        assets,
        output: output.to_path_buf(),
    })
}

fn check_report(prepared: &Prepared) -> CheckReport {
    CheckReport {
        locales: prepared.selected.iter().map(|l| l.summary.clone()).collect(),
        assets: prepared.assets.len(),
    }
}

fn prepare(root: &Path, config: &SiteConfig, options: &BuildOptions) -> Result<Prepared, BuildError> {
    let declared: Vec<&str> = config
        .ordered_locales()
        .iter()
        .map(|l| l.code.as_str())
        .collect();
    let codes: Vec<&str> = match &options.only_locale {
        Some(only) if !declared.contains(&only.as_str()) => {
            return Err(BuildError::UnknownLocale(only.clone()));
        }
        Some(only) => vec![only.as_str()],
        None => declared.clone(),
    };

    info!(root = %root.display(), locales = ?codes, "Loading content");
    let trees = scan::scan_locales(root, config, &codes)?;
    let assets = scan::list_static_assets(root, config)?;
    let default_tree = &trees[0];

    let resolved: Vec<(ResolvedTree, Vec<NavNode>)> = trees
        .par_iter()
        .map(|tree| {
            let resolved = locale::resolve_tree(default_tree, tree);
            let nav = nav::build_navigation(&resolved);
            (resolved, nav)
        })
        .collect();

    let default_slugs = Arc::new(render::served_slugs(&resolved[0].0));
    let links = config
        .ordered_locales()
        .into_iter()
        .map(|l| {
            let slugs = resolved
                .iter()
                .find(|(tree, _)| tree.locale == l.code)
                .map(|(tree, _)| Arc::new(render::served_slugs(tree)))
                .unwrap_or_else(|| Arc::clone(&default_slugs));
            LocaleLink {
                code: l.code.clone(),
                label: l.display_label().to_string(),
                base_path: config.locale_base_path(&l.code),
                slugs,
            }
        })
        .collect();

    let validated: Vec<Result<PreparedLocale, Vec<BrokenReference>>> = resolved
        .into_par_iter()
        .filter(|(tree, _)| codes.contains(&tree.locale.as_str()))
        .map(|(tree, nav)| {
            let references = links::validate(&tree, &assets)?;
            let summary = LocaleSummary {
                locale: tree.locale.clone(),
                is_default: tree.is_default,
                documents: tree.documents.len(),
                references,
                parity: tree.parity_report(),
                navigation: nav.clone(),
            };
            if !tree.is_default && !summary.parity.untranslated.is_empty() {
                warn!(
                    locale = %tree.locale,
                    untranslated = summary.parity.untranslated.len(),
                    "Serving untranslated pages from the default locale"
                );
            }
            Ok(PreparedLocale { tree, nav, summary })
        })
        .collect();

    let mut selected = Vec::new();
    let mut broken = Vec::new();
    for result in validated {
        match result {
            Ok(locale) => selected.push(locale),
            Err(mut b) => broken.append(&mut b),
        }
    }
    if !broken.is_empty() {
        return Err(BuildError::BrokenReferences(broken));
    }
    info!(locales = selected.len(), assets = assets.len(), "Content validated");
    Ok(Prepared {
        selected,
        links,
        assets,
    })
}

/// Everything written at one locale root.
fn locale_files(
    config: &SiteConfig,
    locale: &PreparedLocale,
    prepared: &Prepared,
) -> Result<Vec<OutputFile>, BuildError> {
    let ctx = SiteContext::new(config, &locale.tree.locale, prepared.links.clone());
    let renderer = Renderer::new(&ctx, &locale.tree, &locale.nav, &prepared.assets);
    let mut files: Vec<OutputFile> = renderer.render_all().into_iter().map(Into::into).collect();

    let index = search::build_search_index(&locale.tree, &ctx, config.build.search_excerpt_chars);
    files.push(OutputFile::new(SEARCH_INDEX_FILE, search::search_index_json(&index)?));
    files.push(OutputFile::new(NAV_FILE, nav::navigation_json(&locale.nav)?));
    files.push(OutputFile::new(STYLESHEET_FILE, render::stylesheet(config)));
    files.push(OutputFile::new(SEARCH_SCRIPT_FILE, render::SEARCH_JS));
    Ok(files)
}

fn emit_prepared(
    output: &Path,
    config: &SiteConfig,
    locale: &PreparedLocale,
    prepared: &Prepared,
    options: &EmitOptions<'_>,
) -> Result<EmitReport, BuildError> {
    let code = &locale.tree.locale;
    let files = locale_files(config, locale, prepared)?;
    let locale_dir = if locale.tree.is_default { "" } else { code.as_str() };
    emit::emit_locale(output, code, locale_dir, &files, options).map_err(|e| match e {
        EmitError::Write(source) => BuildError::OutputWrite(vec![EmitFailure {
            scope: code.clone(),
            source,
        }]),
        EmitError::Cancelled(_) => BuildError::Aborted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config;
    use crate::test_helpers::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn check_fixture_site() {
        let tmp = setup_fixtures();
        let config = load_config(tmp.path()).unwrap();
        let report = check(tmp.path(), &config, &BuildOptions::default()).unwrap();

        let codes: Vec<&str> = report.locales.iter().map(|l| l.locale.as_str()).collect();
        assert_eq!(codes, vec!["en", "pt-BR"]);
        assert!(report.locales[0].references > 0);
        let pt = &report.locales[1];
        assert_eq!(pt.parity.locale_only, vec!["extras".to_string()]);
        assert!(pt.parity.untranslated.contains(&"routing".to_string()));
        assert_eq!(report.assets, 2);
    }

    #[test]
    fn broken_link_fails_before_emission() {
        let tmp = setup_fixtures();
        std::fs::write(
            tmp.path().join("docs/broken.md"),
            "# Broken\n\nSee [nothing](./missing-page).\n",
        )
        .unwrap();
        let config = load_config(tmp.path()).unwrap();
        let out = TempDir::new().unwrap();

        let err = build(tmp.path(), out.path(), &config, &BuildOptions::default()).unwrap_err();
        let BuildError::BrokenReferences(broken) = err else {
            panic!("expected broken references");
        };
        // Reported once per locale serving the page.
        assert_eq!(broken.len(), 2);
        assert!(broken.iter().all(|b| b.target == "./missing-page"));
        assert!(broken[0].source_path.ends_with("docs/broken.md"));
        assert!(std::fs::read_dir(out.path()).unwrap().next().is_none());
    }

    #[test]
    fn only_locale_must_be_declared() {
        let tmp = setup_fixtures();
        let config = load_config(tmp.path()).unwrap();
        let options = BuildOptions {
            only_locale: Some("fr".into()),
            ..Default::default()
        };
        assert!(matches!(
            check(tmp.path(), &config, &options),
            Err(BuildError::UnknownLocale(code)) if code == "fr"
        ));
    }

    #[test]
    fn only_locale_emits_just_that_locale() {
        let tmp = setup_fixtures();
        let config = load_config(tmp.path()).unwrap();
        let out = TempDir::new().unwrap();
        let options = BuildOptions {
            only_locale: Some("pt-BR".into()),
            ..Default::default()
        };
        let report = build(tmp.path(), out.path(), &config, &options).unwrap();
        assert_eq!(report.emitted.len(), 1);
        assert!(out.path().join("pt-BR/index.html").is_file());
        assert!(!out.path().join("index.html").exists());
    }

    #[test]
    fn cancelled_build_writes_no_pages() {
        let tmp = setup_fixtures();
        let config = load_config(tmp.path()).unwrap();
        let out = TempDir::new().unwrap();
        let options = BuildOptions::default();
        options.cancel.cancel();
        assert!(matches!(
            build(tmp.path(), out.path(), &config, &options),
            Err(BuildError::Aborted)
        ));
        assert!(!out.path().join("index.html").exists());
    }
}
