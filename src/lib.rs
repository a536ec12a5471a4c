//! # Simple Docs
//!
//! A static documentation site builder for multi-locale Markdown content.
//! Your filesystem is the data source: directories become sidebar groups,
//! pages are ordered by numeric prefix or front matter, and every locale
//! serves the full page set, falling back to the default locale where a
//! translation is missing.
//!
//! # Architecture: Six-Stage Pipeline
//!
//! ```text
//! 1. Scan       content/        →  LocaleTree per locale     (files → documents)
//! 2. Resolve    LocaleTrees     →  ResolvedTree per locale   (fallback to default)
//! 3. Navigate   ResolvedTree    →  sidebar forest            (ordering, grouping)
//! 4. Validate   ResolvedTree    →  ok | broken references    (links, anchors, assets)
//! 5. Render     tree + forest   →  HTML pages                (maud layout)
//! 6. Emit       pages           →  dist/, dist/<locale>/     (staged, change-aware)
//! ```
//!
//! Stages 2–4 run per locale in parallel and must all succeed before stage
//! 5 starts: a broken link in any locale means nothing is written. Stages
//! 5–6 again run per locale in parallel, and a write failure in one locale
//! does not stop the others. [`pipeline`] wires the stages together.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Stage 1: walks docs, blog and locale override trees, parses front matter |
//! | [`locale`] | Stage 2: two-level fallback lookup, untranslated and locale-only pages |
//! | [`nav`] | Stage 3: sidebar forest with deterministic ordering, `_nav.json` |
//! | [`links`] | Stage 4: internal link extraction, resolution and validation |
//! | [`render`] | Stage 5: page layout, sidebar, table of contents, language switcher |
//! | [`emit`] | Stage 6: staging, commit, stale-file removal, static asset copy |
//! | [`pipeline`] | Orchestration, cancellation and the build/check entry points |
//! | [`config`] | `config.toml` loading, merging over stock defaults, validation, CSS colors |
//! | [`types`] | Shared types: `Document`, `LocaleTree`, `CategoryMeta` |
//! | [`naming`] | `NNN-name` and `YYYY-MM-DD-name` filename conventions |
//! | [`metadata`] | Front matter splitting and parsing (YAML and TOML) |
//! | [`anchors`] | Heading extraction and collision-free anchor ids |
//! | [`search`] | Per-locale `search-index.json` |
//! | [`cache`] | Emit manifests with content hashes |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Slugs Are the Translation Key
//!
//! `docs/010-intro.md` and `i18n/pt-BR/docs/intro.md` are the same page
//! because both resolve to the slug `intro`. Translators can rename files
//! freely as long as the slug matches; a `slug:` front matter key pins it.
//!
//! ## One Anchor Algorithm
//!
//! The validator and the renderer both call [`anchors::extract_headings`].
//! An anchor the validator accepted is, by construction, an id on the
//! rendered page.
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/), a compile-time
//! HTML macro system. Malformed templates are build errors, interpolation is
//! escaped, and there is no template directory to ship.
//!
//! ## Deterministic Output
//!
//! Documents live in `BTreeMap`s, sibling order is total, and nothing
//! time-dependent reaches the HTML. The same content always renders to the
//! same bytes, which is what lets the emitter skip unchanged files.

pub mod anchors;
pub mod cache;
pub mod config;
pub mod emit;
pub mod links;
pub mod locale;
pub mod metadata;
pub mod naming;
pub mod nav;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod scan;
pub mod search;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
