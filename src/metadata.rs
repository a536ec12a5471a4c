//! Front matter parsing and metadata resolution.
//!
//! A content unit may open with a metadata block fenced by `---` (YAML) or
//! `+++` (TOML):
//!
//! ```text
//! ---
//! title: Routing
//! position: 2
//! tags: [http, server]
//! ---
//! # Routing
//! ...
//! ```
//!
//! ## Recognized keys
//!
//! | key             | type            | effect                                   |
//! |-----------------|-----------------|------------------------------------------|
//! | `title`         | string          | page title                               |
//! | `position`      | integer         | ordering hint among siblings             |
//! | `slug`          | string          | replaces the last slug segment, or the whole slug when it starts with `/` |
//! | `tags`          | list of strings | tag pages                                |
//! | `sidebar_label` | string          | label in the sidebar instead of the title|
//! | `description`   | string          | `<meta name="description">` and listings |
//! | `draft`         | bool            | skipped unless drafts are enabled        |
//! | `date`          | `YYYY-MM-DD`    | blog post date                           |
//!
//! Anything else is recorded in [`FrontMatter::unknown_keys`]; the loader
//! decides whether that is a warning or an error.
//!
//! ## Resolution priority
//!
//! Each field is resolved independently. The first non-empty value wins:
//!
//! - **Title**: front matter `title` → first `#` heading → filename title
//! - **Position**: front matter `position` → filename number prefix

use crate::naming;
use serde::Deserialize;
use thiserror::Error;

/// Keys with a meaning of their own. Everything else is reported as unknown.
pub const KNOWN_KEYS: &[&str] = &[
    "title",
    "position",
    "slug",
    "tags",
    "sidebar_label",
    "description",
    "draft",
    "date",
];

#[derive(Error, Debug)]
pub enum FrontMatterError {
    #[error("unterminated {0} front matter block")]
    Unterminated(&'static str),
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("front matter must be a mapping of keys to values")]
    NotAMapping,
    #[error("invalid date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),
}

/// Fence style of a front matter block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontMatterFormat {
    Yaml,
    Toml,
}

impl FrontMatterFormat {
    fn name(self) -> &'static str {
        match self {
            FrontMatterFormat::Yaml => "YAML",
            FrontMatterFormat::Toml => "TOML",
        }
    }

    fn fence(self) -> &'static str {
        match self {
            FrontMatterFormat::Yaml => "---",
            FrontMatterFormat::Toml => "+++",
        }
    }
}

/// Parsed front matter. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub position: Option<i64>,
    pub slug: Option<String>,
    pub tags: Vec<String>,
    pub sidebar_label: Option<String>,
    pub description: Option<String>,
    pub draft: bool,
    pub date: Option<String>,
    /// Keys present in the block but not in [`KNOWN_KEYS`], sorted.
    #[serde(skip)]
    pub unknown_keys: Vec<String>,
}

/// A source file split into its front matter block and body.
#[derive(Debug, PartialEq)]
pub struct SplitSource<'a> {
    pub front_matter: Option<(FrontMatterFormat, &'a str)>,
    pub body: &'a str,
}

/// Split a leading front matter block off `content`.
///
/// The opening fence must be the very first line (a UTF-8 BOM is ignored).
/// A file without an opening fence has no front matter; an opening fence
/// without its closing twin is an error.
pub fn split_front_matter(content: &str) -> Result<SplitSource<'_>, FrontMatterError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let format = match content.lines().next().map(str::trim_end) {
        Some("---") => FrontMatterFormat::Yaml,
        Some("+++") => FrontMatterFormat::Toml,
        _ => {
            return Ok(SplitSource {
                front_matter: None,
                body: content,
            });
        }
    };

    let block_start = content.find('\n').map(|i| i + 1).unwrap_or(content.len());
    let mut offset = block_start;
    for line in content[block_start..].split_inclusive('\n') {
        if line.trim_end() == format.fence() {
            return Ok(SplitSource {
                front_matter: Some((format, &content[block_start..offset])),
                body: &content[offset + line.len()..],
            });
        }
        offset += line.len();
    }
    Err(FrontMatterError::Unterminated(format.name()))
}

/// Parse the text between the fences.
pub fn parse_front_matter(
    format: FrontMatterFormat,
    block: &str,
) -> Result<FrontMatter, FrontMatterError> {
    let mut front_matter = match format {
        FrontMatterFormat::Yaml => parse_yaml(block)?,
        FrontMatterFormat::Toml => parse_toml(block)?,
    };
    if let Some(date) = &front_matter.date
        && !naming::is_valid_date(date)
    {
        return Err(FrontMatterError::InvalidDate(date.clone()));
    }
    front_matter.unknown_keys.sort();
    Ok(front_matter)
}

fn parse_yaml(block: &str) -> Result<FrontMatter, FrontMatterError> {
    if block.trim().is_empty() {
        return Ok(FrontMatter::default());
    }
    let mapping = match serde_yaml::from_str::<serde_yaml::Value>(block)? {
        serde_yaml::Value::Mapping(mapping) => mapping,
        serde_yaml::Value::Null => return Ok(FrontMatter::default()),
        _ => return Err(FrontMatterError::NotAMapping),
    };
    let unknown_keys = mapping
        .keys()
        .map(|key| match key.as_str() {
            Some(name) => name.to_string(),
            None => serde_yaml::to_string(key)
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
        })
        .filter(|name| !KNOWN_KEYS.contains(&name.as_str()))
        .collect();
    let mut front_matter: FrontMatter =
        serde_yaml::from_value(serde_yaml::Value::Mapping(mapping))?;
    front_matter.unknown_keys = unknown_keys;
    Ok(front_matter)
}

fn parse_toml(block: &str) -> Result<FrontMatter, FrontMatterError> {
    let mut table: toml::Table = toml::from_str(block)?;
    let unknown_keys = table
        .keys()
        .filter(|k| !KNOWN_KEYS.contains(&k.as_str()))
        .cloned()
        .collect();
    // TOML has a native date type; keep the text form.
    if let Some(toml::Value::Datetime(date)) = table.get("date") {
        let text = date.to_string();
        table.insert("date".to_string(), toml::Value::String(text));
    }
    let mut front_matter: FrontMatter = toml::Value::Table(table).try_into()?;
    front_matter.unknown_keys = unknown_keys;
    Ok(front_matter)
}

/// Resolve a metadata field from multiple sources.
///
/// Takes a list of optional values in priority order and returns the first
/// non-None, non-empty value.
///
/// ```text
/// title: resolve(&[front_matter_title, first_heading, filename_title])
/// ```
pub fn resolve(sources: &[Option<&str>]) -> Option<String> {
    sources
        .iter()
        .filter_map(|opt| {
            opt.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
        .next()
}
