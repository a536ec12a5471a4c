//! Emit manifests for change-aware output.
//!
//! Every successful emission of a locale records which files it wrote and
//! the SHA-256 of each. The next build uses the record two ways:
//!
//! - a file whose new content hashes to the recorded value, and which is
//!   still on disk, is left untouched (its mtime survives, so rsync and CDN
//!   uploads skip it);
//! - a recorded file the new build no longer produces is deleted.
//!
//! Files the manifest does not mention are never touched, so hand-placed
//! files in the output tree and other locales' files are safe.
//!
//! ## Storage
//!
//! One JSON file per locale under the metadata directory:
//!
//! ```text
//! dist/
//! ├── .simple-docs/
//! │   ├── en.json            # manifest for the default locale
//! │   ├── pt-BR.json
//! │   └── staging/           # per-locale staging trees during a build
//! ├── index.html
//! └── pt-BR/index.html
//! ```
//!
//! While a locale's commit runs, `pt-BR.incomplete` lists every path the
//! commit may touch. If the commit stops half-way the marker survives, and
//! the next emission of that locale distrusts the manifest: it compares
//! against the files on disk instead and treats the listed paths as its own.
//!
//! Hashes are content-based rather than mtime-based so they survive
//! `git checkout` and CI caches that reset modification times.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Metadata directory inside the output root.
pub const META_DIR: &str = ".simple-docs";

/// Version of the manifest format. Bump to invalidate every stored manifest.
const MANIFEST_VERSION: u32 = 1;

/// Files one locale emitted, keyed by path relative to the output root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitManifest {
    pub version: u32,
    pub locale: String,
    /// Output-root-relative path → SHA-256 hex digest.
    pub files: BTreeMap<String, String>,
}

impl EmitManifest {
    pub fn empty(locale: &str) -> Self {
        Self {
            version: MANIFEST_VERSION,
            locale: locale.to_string(),
            files: BTreeMap::new(),
        }
    }

    /// Load a locale's manifest. Missing, unreadable or outdated manifests
    /// load as empty: the build then rewrites everything and deletes nothing.
    pub fn load(output_root: &Path, locale: &str) -> Self {
        let Ok(content) = std::fs::read_to_string(manifest_path(output_root, locale)) else {
            return Self::empty(locale);
        };
        match serde_json::from_str::<Self>(&content) {
            Ok(m) if m.version == MANIFEST_VERSION && m.locale == locale => m,
            _ => Self::empty(locale),
        }
    }

    pub fn save(&self, output_root: &Path) -> io::Result<()> {
        let path = manifest_path(output_root, &self.locale);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Whether `rel_path` already holds content with `hash`.
    pub fn is_unchanged(&self, rel_path: &str, hash: &str, output_root: &Path) -> bool {
        self.files.get(rel_path).is_some_and(|h| h == hash) && output_root.join(rel_path).is_file()
    }

    /// Paths recorded here that `current` no longer contains.
    pub fn stale_paths<'a>(&'a self, current: &'a EmitManifest) -> impl Iterator<Item = &'a str> {
        self.files
            .keys()
            .filter(|path| !current.files.contains_key(*path))
            .map(String::as_str)
    }
}

pub fn manifest_path(output_root: &Path, locale: &str) -> PathBuf {
    output_root.join(META_DIR).join(format!("{locale}.json"))
}

/// Marker left when a locale's commit stopped half-way.
pub fn incomplete_marker(output_root: &Path, locale: &str) -> PathBuf {
    output_root.join(META_DIR).join(format!("{locale}.incomplete"))
}

/// Record the paths a commit is about to touch.
pub fn save_incomplete(
    output_root: &Path,
    locale: &str,
    paths: &BTreeSet<String>,
) -> io::Result<()> {
    let path = incomplete_marker(output_root, locale);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(paths)?)
}

/// Paths listed by a marker an interrupted commit left behind, or `None`
/// when the last commit of `locale` finished. A marker that cannot be parsed
/// still counts as interrupted, with no paths.
pub fn load_incomplete(output_root: &Path, locale: &str) -> Option<BTreeSet<String>> {
    let content = std::fs::read_to_string(incomplete_marker(output_root, locale)).ok()?;
    Some(serde_json::from_str(&content).unwrap_or_default())
}

/// Staging tree for one locale.
pub fn staging_dir(output_root: &Path, locale: &str) -> PathBuf {
    output_root.join(META_DIR).join("staging").join(locale)
}

/// SHA-256 of a byte slice, as a hex string.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// SHA-256 of a file's contents, as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(hash_bytes(&bytes))
}

/// What emission did to the output tree.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EmitStats {
    pub written: u32,
    pub unchanged: u32,
    pub removed: u32,
}

impl EmitStats {
    pub fn total(&self) -> u32 {
        self.written + self.unchanged
    }
}

impl std::ops::AddAssign for EmitStats {
    fn add_assign(&mut self, other: Self) {
        self.written += other.written;
        self.unchanged += other.unchanged;
        self.removed += other.removed;
    }
}

impl fmt::Display for EmitStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unchanged > 0 {
            write!(
                f,
                "{} written, {} unchanged ({} total)",
                self.written,
                self.unchanged,
                self.total()
            )?;
        } else {
            write!(f, "{} written", self.written)?;
        }
        if self.removed > 0 {
            write!(f, ", {} removed", self.removed)?;
        }
        Ok(())
    }
}
