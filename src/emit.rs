//! Output emission: stage 6 of the build pipeline.
//!
//! Each locale is emitted in two phases so a failed or cancelled locale never
//! leaves a half-written tree behind:
//!
//! ```text
//! 1. Stage    pages → dist/.simple-docs/staging/pt-BR/…   (cancel checked per page)
//! 2. Commit   staging → dist/pt-BR/…                       (rename, skip unchanged)
//!             remove files the previous build emitted and this one did not
//!             save dist/.simple-docs/pt-BR.json
//! ```
//!
//! A failure while staging deletes the staging tree and leaves the output
//! untouched. A failure during commit leaves `pt-BR.incomplete` in the
//! metadata directory until the next successful emission of that locale, which
//! then compares against the files on disk rather than the stale manifest.
//!
//! Locales are independent: one locale's failure does not stop the others,
//! which is why every function here returns its own error instead of
//! aborting the process.

use crate::cache::{self, EmitManifest, EmitStats};
use crate::render::Page;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Manifest key for the static asset copy, which belongs to no locale.
pub const STATIC_MANIFEST: &str = "_static";

#[derive(Error, Debug)]
#[error("cannot write {}: {source}", .path.display())]
pub struct OutputWriteError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl OutputWriteError {
    fn new(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum EmitError {
    #[error(transparent)]
    Write(#[from] OutputWriteError),
    #[error("emission of locale `{0}` was cancelled")]
    Cancelled(String),
}

/// A file to emit, relative to its locale root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: String,
    pub contents: Vec<u8>,
}

impl OutputFile {
    pub fn new(path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

impl From<Page> for OutputFile {
    fn from(page: Page) -> Self {
        Self::new(page.path, page.html)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EmitOptions<'a> {
    /// Extra attempts for transient I/O errors.
    pub write_retries: u32,
    pub cancel: &'a AtomicBool,
}

/// Result of emitting one locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitReport {
    pub locale: String,
    pub locale_root: PathBuf,
    pub stats: EmitStats,
}

fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
    )
}

/// Run `op`, retrying transient failures up to `retries` more times.
pub fn with_retries<T>(retries: u32, mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    let mut attempt = 0;
    loop {
        match op() {
            Err(e) if is_transient(&e) && attempt < retries => {
                attempt += 1;
                debug!(attempt, error = %e, "Retrying transient write failure");
                thread::sleep(Duration::from_millis(10 * u64::from(attempt)));
            }
            result => return result,
        }
    }
}

fn write_file(path: &Path, contents: &[u8], retries: u32) -> Result<(), OutputWriteError> {
    if let Some(parent) = path.parent() {
        with_retries(retries, || fs::create_dir_all(parent))
            .map_err(|e| OutputWriteError::new(parent, e))?;
    }
    with_retries(retries, || fs::write(path, contents)).map_err(|e| OutputWriteError::new(path, e))
}

fn remove_staging(staging: &Path) {
    if staging.exists()
        && let Err(e) = fs::remove_dir_all(staging)
    {
        warn!(path = %staging.display(), error = %e, "Could not remove staging directory");
    }
}

/// `""` + `guide/index.html` → `guide/index.html`, `pt-BR` + … → `pt-BR/guide/index.html`.
fn root_relative(locale_dir: &str, path: &str) -> String {
    if locale_dir.is_empty() {
        path.to_string()
    } else {
        format!("{locale_dir}/{path}")
    }
}

/// Emit one locale's files under `output_root/locale_dir`.
///
/// `locale_dir` is empty for the default locale.
pub fn emit_locale(
    output_root: &Path,
    locale: &str,
    locale_dir: &str,
    files: &[OutputFile],
    options: &EmitOptions<'_>,
) -> Result<EmitReport, EmitError> {
    let staging = cache::staging_dir(output_root, locale);
    remove_staging(&staging);

    let mut current = EmitManifest::empty(locale);
    for file in files {
        if options.cancel.load(Ordering::Relaxed) {
            remove_staging(&staging);
            return Err(EmitError::Cancelled(locale.to_string()));
        }
        let staged = staging.join(&file.path);
        if let Err(e) = write_file(&staged, &file.contents, options.write_retries) {
            remove_staging(&staging);
            return Err(e.into());
        }
        current.files.insert(
            root_relative(locale_dir, &file.path),
            cache::hash_bytes(&file.contents),
        );
    }
    if options.cancel.load(Ordering::Relaxed) {
        remove_staging(&staging);
        return Err(EmitError::Cancelled(locale.to_string()));
    }
    debug!(locale, files = files.len(), "Staged locale");

    let result = commit(output_root, locale, locale_dir, files, &staging, &current, options);
    remove_staging(&staging);
    let stats = result?;

    let locale_root = output_root.join(locale_dir);
    info!(locale, root = %locale_root.display(), %stats, "Emitted locale");
    Ok(EmitReport {
        locale: locale.to_string(),
        locale_root,
        stats,
    })
}

fn commit(
    output_root: &Path,
    locale: &str,
    locale_dir: &str,
    files: &[OutputFile],
    staging: &Path,
    current: &EmitManifest,
    options: &EmitOptions<'_>,
) -> Result<EmitStats, OutputWriteError> {
    let marker = cache::incomplete_marker(output_root, locale);
    let interrupted = cache::load_incomplete(output_root, locale);
    let previous = EmitManifest::load(output_root, locale);

    // Everything this locale may own after the previous commit, however far it got.
    let mut owned: BTreeSet<String> = previous.files.keys().cloned().collect();
    if let Some(paths) = &interrupted {
        warn!(
            locale,
            paths = paths.len(),
            "Previous commit was interrupted; checking output on disk"
        );
        owned.extend(paths.iter().cloned());
    }
    let mut touched = owned.clone();
    touched.extend(current.files.keys().cloned());
    with_retries(options.write_retries, || cache::save_incomplete(output_root, locale, &touched))
        .map_err(|e| OutputWriteError::new(&marker, e))?;

    let mut stats = EmitStats::default();
    for file in files {
        let rel = root_relative(locale_dir, &file.path);
        let target = output_root.join(&rel);
        let unchanged = current.files.get(&rel).is_some_and(|hash| {
            if interrupted.is_some() {
                cache::hash_file(&target).is_ok_and(|on_disk| &on_disk == hash)
            } else {
                previous.is_unchanged(&rel, hash, output_root)
            }
        });
        if unchanged {
            stats.unchanged += 1;
            continue;
        }
        if let Some(parent) = target.parent() {
            with_retries(options.write_retries, || fs::create_dir_all(parent))
                .map_err(|e| OutputWriteError::new(parent, e))?;
        }
        with_retries(options.write_retries, || fs::rename(staging.join(&file.path), &target))
            .map_err(|e| OutputWriteError::new(&target, e))?;
        stats.written += 1;
    }

    let stale = owned.iter().filter(|rel| !current.files.contains_key(*rel));
    stats.removed = remove_stale(output_root, stale);
    current
        .save(output_root)
        .map_err(|e| OutputWriteError::new(cache::manifest_path(output_root, locale), e))?;
    fs::remove_file(&marker).map_err(|e| OutputWriteError::new(&marker, e))?;
    Ok(stats)
}

/// Delete each of `stale`, then any directories that left empty.
fn remove_stale<'a>(output_root: &Path, stale: impl Iterator<Item = &'a String>) -> u32 {
    let mut removed = 0;
    for rel in stale {
        let path = output_root.join(rel);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "Removed stale output");
                removed += 1;
                let mut dir = path.parent();
                // remove_dir fails on non-empty directories, which ends the walk.
                while let Some(d) = dir {
                    if d == output_root || fs::remove_dir(d).is_err() {
                        break;
                    }
                    dir = d.parent();
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Could not remove stale output"),
        }
    }
    removed
}

/// Copy every static asset verbatim to the same relative path under the
/// output root. Unchanged assets are skipped; assets removed from `static/`
/// since the last build are deleted.
pub fn copy_static_assets(
    static_root: &Path,
    output_root: &Path,
    assets: &BTreeSet<String>,
    write_retries: u32,
) -> Result<EmitStats, OutputWriteError> {
    let previous = EmitManifest::load(output_root, STATIC_MANIFEST);
    let mut current = EmitManifest::empty(STATIC_MANIFEST);
    let mut stats = EmitStats::default();

    for rel in assets {
        let source = static_root.join(rel);
        let hash = cache::hash_file(&source).map_err(|e| OutputWriteError::new(&source, e))?;
        if previous.is_unchanged(rel, &hash, output_root) {
            stats.unchanged += 1;
        } else {
            let target = output_root.join(rel);
            if let Some(parent) = target.parent() {
                with_retries(write_retries, || fs::create_dir_all(parent))
                    .map_err(|e| OutputWriteError::new(parent, e))?;
            }
            with_retries(write_retries, || fs::copy(&source, &target))
                .map_err(|e| OutputWriteError::new(&target, e))?;
            stats.written += 1;
        }
        current.files.insert(rel.clone(), hash);
    }

    let stale: Vec<String> = previous.stale_paths(&current).map(str::to_string).collect();
    stats.removed = remove_stale(output_root, stale.iter());
    current
        .save(output_root)
        .map_err(|e| OutputWriteError::new(cache::manifest_path(output_root, STATIC_MANIFEST), e))?;
    info!(%stats, "Copied static assets");
    Ok(stats)
}
