//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Output is organized by locale and by page, not by file. Every page leads
//! with its sidebar position and label; slugs and translation state follow as
//! secondary context. Diagnostics go to stderr through `tracing`; what is
//! printed here is the result listing on stdout.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! en (default): 9 pages, 12 references
//!     001 Welcome → /
//!     002 Introduction → intro
//!     003 User Guide → guide
//!         001 Setup → guide/setup
//! pt-BR: 10 pages, 12 references
//!     Translated: 1, untranslated: 8, locale-only: 1
//!     002 Introdução → intro
//!     003 Routing → routing (untranslated)
//! Static assets: 2
//! ```
//!
//! ## Build
//!
//! ```text
//! en → dist/: 14 written
//! pt-BR → dist/pt-BR: 12 written, 2 unchanged (14 total)
//! static → 2 written
//! ```
//!
//! ## Errors
//!
//! One line per failure, so a build with five broken links prints five
//! lines:
//!
//! ```text
//! error: [en] docs/index.md: link to `./missing-page`: missing page `missing-page`
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes it out. Format functions
//! are pure.

use crate::nav::NavNode;
use crate::pipeline::{BuildError, BuildReport, CheckReport, LocaleSummary};

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

// ============================================================================
// Navigation tree
// ============================================================================

/// Sidebar forest as indented, numbered lines.
///
/// ```text
/// 001 Introduction → intro
/// 002 User Guide → guide
///     001 Setup → guide/setup
/// 003 Extras (untranslated)
/// ```
pub fn format_navigation(forest: &[NavNode], depth: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, node) in forest.iter().enumerate() {
        let target = match node.slug.as_deref() {
            Some("") => " → /".to_string(),
            Some(slug) => format!(" → {slug}"),
            None => String::new(),
        };
        let flag = if node.untranslated { " (untranslated)" } else { "" };
        lines.push(format!(
            "{}{} {}{}{}",
            indent(depth),
            format_index(i + 1),
            node.label,
            target,
            flag
        ));
        lines.extend(format_navigation(&node.children, depth + 1));
    }
    lines
}

// ============================================================================
// Check
// ============================================================================

fn locale_header(summary: &LocaleSummary) -> String {
    format!(
        "{}{}: {}, {}",
        summary.locale,
        if summary.is_default { " (default)" } else { "" },
        plural(summary.documents, "page", "pages"),
        plural(summary.references, "reference", "references"),
    )
}

pub fn format_check_report(report: &CheckReport) -> Vec<String> {
    let mut lines = Vec::new();
    for summary in &report.locales {
        lines.push(locale_header(summary));
        if !summary.is_default {
            let parity = &summary.parity;
            lines.push(format!(
                "{}Translated: {}, untranslated: {}, locale-only: {}",
                indent(1),
                parity.translated,
                parity.untranslated.len(),
                parity.locale_only.len()
            ));
        }
        lines.extend(format_navigation(&summary.navigation, 1));
    }
    lines.push(format!("Static assets: {}", report.assets));
    lines
}

pub fn print_check_report(report: &CheckReport) {
    for line in format_check_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Build
// ============================================================================

pub fn format_build_report(report: &BuildReport) -> Vec<String> {
    let mut lines = format_check_report(&report.check);
    for emitted in &report.emitted {
        lines.push(format!(
            "{} → {}: {}",
            emitted.locale,
            emitted.locale_root.display(),
            emitted.stats
        ));
    }
    lines.push(format!("static → {}", report.assets));
    lines
}

pub fn print_build_report(report: &BuildReport) {
    for line in format_build_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Errors
// ============================================================================

/// One line per failure.
pub fn format_error(error: &BuildError) -> Vec<String> {
    match error {
        BuildError::BrokenReferences(broken) => {
            broken.iter().map(|b| format!("error: {b}")).collect()
        }
        BuildError::OutputWrite(failures) => {
            failures.iter().map(|f| format!("error: {f}")).collect()
        }
        other => vec![format!("error: {other}")],
    }
}

pub fn print_error(error: &BuildError) {
    for line in format_error(error) {
        eprintln!("{}", line);
    }
}
