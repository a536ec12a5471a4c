//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. The file lives in
//! the content root and is layered over the stock defaults key by key, so a
//! site only writes down what it changes. CLI flags are applied last.
//!
//! ## Config File Location
//!
//! ```text
//! content/
//! ├── config.toml              # Site config (overrides stock defaults)
//! ├── docs/
//! ├── blog/
//! ├── static/
//! └── i18n/
//!     └── pt-BR/
//!         └── docs/
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! title = "Documentation"
//! base_path = "/"            # URL prefix the site is served under
//! default_locale = "en"
//!
//! [[locales]]
//! code = "en"
//! label = "English"          # Shown in the language switcher
//!
//! [content]
//! docs_dir = "docs"
//! blog_dir = "blog"
//! static_dir = "static"
//! i18n_dir = "i18n"
//!
//! [front_matter]
//! deny_unknown_keys = false  # Unknown keys are warnings unless true
//!
//! [build]
//! max_threads = 4            # Omit for auto = CPU cores
//! write_retries = 3          # Retries for transient write errors
//! include_drafts = false
//! search_excerpt_chars = 280
//!
//! [colors.light]
//! background = "#ffffff"
//! # ...
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Site title, shown in the header and page titles.
    pub title: String,
    /// URL path prefix the emitted site is served under. Must start and end with `/`.
    pub base_path: String,
    /// Locale whose tree is authoritative and served at the output root.
    pub default_locale: String,
    /// Declared locales, in switcher order.
    pub locales: Vec<LocaleConfig>,
    /// Content directory names, relative to the content root.
    pub content: ContentConfig,
    /// Front matter policy.
    pub front_matter: FrontMatterConfig,
    /// Build knobs (parallelism, retries, drafts, search).
    pub build: BuildConfig,
    /// Color schemes for light and dark modes.
    pub colors: ColorConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Documentation".to_string(),
            base_path: "/".to_string(),
            default_locale: "en".to_string(),
            locales: vec![LocaleConfig {
                code: "en".to_string(),
                label: Some("English".to_string()),
            }],
            content: ContentConfig::default(),
            front_matter: FrontMatterConfig::default(),
            build: BuildConfig::default(),
            colors: ColorConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_path.starts_with('/') || !self.base_path.ends_with('/') {
            return Err(ConfigError::Validation(format!(
                "base_path must start and end with '/', got `{}`",
                self.base_path
            )));
        }
        if self.locales.is_empty() {
            return Err(ConfigError::Validation(
                "at least one locale must be declared".into(),
            ));
        }
        let mut seen = HashSet::new();
        for locale in &self.locales {
            if !is_valid_locale_code(&locale.code) {
                return Err(ConfigError::Validation(format!(
                    "invalid locale code `{}`",
                    locale.code
                )));
            }
            if !seen.insert(locale.code.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "locale `{}` is declared twice",
                    locale.code
                )));
            }
        }
        if !seen.contains(self.default_locale.as_str()) {
            return Err(ConfigError::Validation(format!(
                "default_locale `{}` is not among the declared locales",
                self.default_locale
            )));
        }
        for (key, dir) in [
            ("content.docs_dir", &self.content.docs_dir),
            ("content.blog_dir", &self.content.blog_dir),
            ("content.static_dir", &self.content.static_dir),
            ("content.i18n_dir", &self.content.i18n_dir),
        ] {
            if dir.is_empty() || dir.contains(['/', '\\']) || dir == "." || dir == ".." {
                return Err(ConfigError::Validation(format!(
                    "{key} must be a single directory name, got `{dir}`"
                )));
            }
        }
        if self.build.write_retries > 10 {
            return Err(ConfigError::Validation(
                "build.write_retries must be 0-10".into(),
            ));
        }
        if self.build.search_excerpt_chars == 0 {
            return Err(ConfigError::Validation(
                "build.search_excerpt_chars must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Declared locales with the default locale first, then declaration order.
    pub fn ordered_locales(&self) -> Vec<&LocaleConfig> {
        let mut ordered: Vec<&LocaleConfig> = self
            .locales
            .iter()
            .filter(|l| l.code == self.default_locale)
            .collect();
        ordered.extend(self.locales.iter().filter(|l| l.code != self.default_locale));
        ordered
    }

    /// URL prefix of a locale's root: `base_path` for the default locale,
    /// `base_path<code>/` for the others.
    pub fn locale_base_path(&self, code: &str) -> String {
        if code == self.default_locale {
            self.base_path.clone()
        } else {
            format!("{}{}/", self.base_path, code)
        }
    }

    /// Apply command-line overrides on top of the file configuration.
    ///
    /// `--locale` replaces the declared locale set (labels are kept for codes
    /// that were already declared). The default locale is always part of the
    /// set, prepended when the flags leave it out.
    pub fn apply_overrides(&mut self, overrides: &CliOverrides) -> Result<(), ConfigError> {
        if let Some(default_locale) = &overrides.default_locale {
            self.default_locale = default_locale.clone();
        }
        if !overrides.locales.is_empty() {
            let mut locales: Vec<LocaleConfig> = overrides
                .locales
                .iter()
                .map(|code| LocaleConfig {
                    code: code.clone(),
                    label: self
                        .locales
                        .iter()
                        .find(|l| &l.code == code)
                        .and_then(|l| l.label.clone()),
                })
                .collect();
            if !locales.iter().any(|l| l.code == self.default_locale) {
                let label = self
                    .locales
                    .iter()
                    .find(|l| l.code == self.default_locale)
                    .and_then(|l| l.label.clone());
                locales.insert(
                    0,
                    LocaleConfig {
                        code: self.default_locale.clone(),
                        label,
                    },
                );
            }
            self.locales = locales;
        }
        if overrides.include_drafts {
            self.build.include_drafts = true;
        }
        self.validate()
    }
}

/// Settings the CLI can override after `config.toml` is loaded.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub locales: Vec<String>,
    pub default_locale: Option<String>,
    pub include_drafts: bool,
}

/// Locale codes are BCP 47-ish: ASCII alphanumerics separated by `-` or `_`.
fn is_valid_locale_code(code: &str) -> bool {
    !code.is_empty()
        && code
            .split(['-', '_'])
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// A declared locale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocaleConfig {
    /// Locale code, also the output subdirectory for non-default locales.
    pub code: String,
    /// Human label for the language switcher. Falls back to the code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl LocaleConfig {
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.code)
    }
}

/// Content directory names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentConfig {
    pub docs_dir: String,
    pub blog_dir: String,
    pub static_dir: String,
    /// Holds one `<code>/` override tree per non-default locale.
    pub i18n_dir: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            docs_dir: "docs".to_string(),
            blog_dir: "blog".to_string(),
            static_dir: "static".to_string(),
            i18n_dir: "i18n".to_string(),
        }
    }
}

/// Front matter policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrontMatterConfig {
    /// Treat unrecognized front matter keys as errors instead of warnings.
    pub deny_unknown_keys: bool,
}

/// Build settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Maximum number of worker threads.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_threads: Option<usize>,
    /// How many times a transient output write error is retried.
    pub write_retries: u32,
    /// Emit documents marked `draft: true`.
    pub include_drafts: bool,
    /// Plain-text excerpt length stored per page in `search-index.json`.
    pub search_excerpt_chars: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            max_threads: None,
            write_retries: 3,
            include_drafts: false,
            search_excerpt_chars: 280,
        }
    }
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &BuildConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_threads.map(|n| n.clamp(1, cores)).unwrap_or(cores)
}

/// Color configuration for light and dark modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorConfig {
    /// Light mode color scheme.
    pub light: ColorScheme,
    /// Dark mode color scheme.
    pub dark: ColorScheme,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            light: ColorScheme::default_light(),
            dark: ColorScheme::default_dark(),
        }
    }
}

/// Individual color scheme (light or dark).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorScheme {
    /// Background color.
    pub background: String,
    /// Primary text color.
    pub text: String,
    /// Muted/secondary text color (sidebar, table of contents, dates).
    pub text_muted: String,
    /// Border color.
    pub border: String,
    /// Link color.
    pub link: String,
    /// Link hover color.
    pub link_hover: String,
    /// Background of code blocks and the untranslated notice.
    pub surface: String,
}

impl ColorScheme {
    pub fn default_light() -> Self {
        Self {
            background: "#ffffff".to_string(),
            text: "#1c1e21".to_string(),
            text_muted: "#606770".to_string(),
            border: "#dadde1".to_string(),
            link: "#1b5fc1".to_string(),
            link_hover: "#0b3d91".to_string(),
            surface: "#f5f6f7".to_string(),
        }
    }

    pub fn default_dark() -> Self {
        Self {
            background: "#1b1b1d".to_string(),
            text: "#e3e3e3".to_string(),
            text_muted: "#a0a4ab".to_string(),
            border: "#3a3b3c".to_string(),
            link: "#7fb0ff".to_string(),
            link_hover: "#b3d0ff".to_string(),
            surface: "#242526".to_string(),
        }
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::default_light()
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely. This
///   includes arrays, so `[[locales]]` in a user file replaces the stock list.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given content root.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Simple Docs Configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file at the content root (content/config.toml).
# Unknown keys will cause an error.

# Site title, shown in the header and in every page title.
title = "Documentation"

# URL path prefix the site is served under. Must start and end with "/".
base_path = "/"

# Locale served at the output root. Every other locale is emitted
# under /<code>/ and falls back to this locale's pages when untranslated.
default_locale = "en"

# ---------------------------------------------------------------------------
# Locales
# ---------------------------------------------------------------------------
# One [[locales]] entry per language, in language-switcher order.
# Override trees live under content/i18n/<code>/docs and .../blog.
[[locales]]
code = "en"
label = "English"

# [[locales]]
# code = "pt-BR"
# label = "Português"

# ---------------------------------------------------------------------------
# Content layout
# ---------------------------------------------------------------------------
[content]
docs_dir = "docs"
blog_dir = "blog"
static_dir = "static"
i18n_dir = "i18n"

# ---------------------------------------------------------------------------
# Front matter
# ---------------------------------------------------------------------------
[front_matter]
# Unknown keys are reported as warnings. Set to true to fail the build.
deny_unknown_keys = false

# ---------------------------------------------------------------------------
# Build
# ---------------------------------------------------------------------------
[build]
# Maximum worker threads.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_threads = 4

# Retries for transient write errors (would-block, interrupted, timed out).
write_retries = 3

# Emit documents marked `draft: true`.
include_drafts = false

# Plain-text excerpt length per page in search-index.json.
search_excerpt_chars = 280

# ---------------------------------------------------------------------------
# Colors - Light mode (prefers-color-scheme: light)
# ---------------------------------------------------------------------------
[colors.light]
background = "#ffffff"
text = "#1c1e21"
text_muted = "#606770"    # Sidebar, table of contents, dates
border = "#dadde1"
link = "#1b5fc1"
link_hover = "#0b3d91"
surface = "#f5f6f7"       # Code blocks, notices

# ---------------------------------------------------------------------------
# Colors - Dark mode (prefers-color-scheme: dark)
# ---------------------------------------------------------------------------
[colors.dark]
background = "#1b1b1d"
text = "#e3e3e3"
text_muted = "#a0a4ab"
border = "#3a3b3c"
link = "#7fb0ff"
link_hover = "#b3d0ff"
surface = "#242526"
"##
}

/// Generate CSS custom properties from color config.
pub fn generate_color_css(colors: &ColorConfig) -> String {
    format!(
        r#":root {{
    --color-bg: {light_bg};
    --color-text: {light_text};
    --color-text-muted: {light_text_muted};
    --color-border: {light_border};
    --color-link: {light_link};
    --color-link-hover: {light_link_hover};
    --color-surface: {light_surface};
}}

@media (prefers-color-scheme: dark) {{
    :root {{
        --color-bg: {dark_bg};
        --color-text: {dark_text};
        --color-text-muted: {dark_text_muted};
        --color-border: {dark_border};
        --color-link: {dark_link};
        --color-link-hover: {dark_link_hover};
        --color-surface: {dark_surface};
    }}
}}"#,
        light_bg = colors.light.background,
        light_text = colors.light.text,
        light_text_muted = colors.light.text_muted,
        light_border = colors.light.border,
        light_link = colors.light.link,
        light_link_hover = colors.light.link_hover,
        light_surface = colors.light.surface,
        dark_bg = colors.dark.background,
        dark_text = colors.dark.text,
        dark_text_muted = colors.dark.text_muted,
        dark_border = colors.dark.border,
        dark_link = colors.dark.link,
        dark_link_hover = colors.dark.link_hover,
        dark_surface = colors.dark.surface,
    )
}
