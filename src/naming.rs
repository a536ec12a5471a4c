//! Filename conventions for content units and directories.
//!
//! Every path segment under a content tree may carry an optional numeric
//! prefix (`NNN-`) that orders it among its siblings. The prefix never shows
//! up in slugs or URLs:
//!
//! - `010-getting-started.md` → slug segment `getting-started`, position 10
//! - `020-Guides/` → slug segment `Guides`, position 20
//! - `routing.md` → slug segment `routing`, no position
//!
//! Blog posts use a date prefix instead: `2024-03-01-release-notes.md` is
//! dated 2024-03-01 and has the slug segment `release-notes`.
//!
//! ## Display Titles
//!
//! When neither front matter nor a heading names a page, the display title
//! is the segment with dashes turned into spaces:
//! `040-who-am-i.md` → "who am i".

/// Result of parsing a numbered entry name like `020-My-Guides`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedName {
    /// Number prefix if present (e.g., `20` from `020-My-Guides`)
    pub number: Option<u32>,
    /// Raw name part after `NNN-`, dashes preserved. Empty if number-only.
    /// For unnumbered entries, this is the full input.
    pub name: String,
    /// Display title: name with dashes converted to spaces.
    pub display_title: String,
}

/// Parse an entry name following the `NNN-name` convention.
///
/// - `"020-My-Guides"` → number=Some(20), name="My-Guides", display_title="My Guides"
/// - `"001"` → number=Some(1), name="", display_title=""
/// - `"routing"` → number=None, name="routing", display_title="routing"
pub fn parse_entry_name(name: &str) -> ParsedName {
    if let Some(dash_pos) = name.find('-') {
        let prefix = &name[..dash_pos];
        if let Ok(num) = prefix.parse::<u32>() {
            let raw = &name[dash_pos + 1..];
            return ParsedName {
                number: Some(num),
                name: raw.to_string(),
                display_title: raw.replace('-', " "),
            };
        }
    }
    if let Ok(num) = name.parse::<u32>() {
        return ParsedName {
            number: Some(num),
            name: String::new(),
            display_title: String::new(),
        };
    }
    ParsedName {
        number: None,
        name: name.to_string(),
        display_title: name.replace('-', " "),
    }
}

/// Slug form of one path segment: the `NNN-` prefix removed.
///
/// A number-only segment keeps its digits, otherwise `001.md` would
/// produce an empty slug.
pub fn slug_segment(segment: &str) -> String {
    let parsed = parse_entry_name(segment);
    if parsed.name.is_empty() {
        segment.to_string()
    } else {
        parsed.name
    }
}

/// Join already-normalized slug segments, skipping empty ones.
pub fn join_slug<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    segments
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether a file stem names its directory's landing page.
pub fn is_index_stem(stem: &str) -> bool {
    stem.eq_ignore_ascii_case("index") || stem.eq_ignore_ascii_case("readme")
}

/// Split a `YYYY-MM-DD-` prefix off a blog post stem.
///
/// Returns `(Some(date), rest)` when the stem starts with a valid date,
/// `(None, stem)` otherwise.
pub fn split_date_prefix(stem: &str) -> (Option<&str>, &str) {
    if stem.len() > 11 && stem.as_bytes()[10] == b'-' && is_valid_date(&stem[..10]) {
        (Some(&stem[..10]), &stem[11..])
    } else {
        (None, stem)
    }
}

fn days_in_month(year: u32, month: u32) -> u32 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) => 29,
        2 => 28,
        _ => 31,
    }
}

/// Validate an ISO `YYYY-MM-DD` calendar date, leap years included.
pub fn is_valid_date(date: &str) -> bool {
    let bytes = date.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return false;
    }
    let digits = |range: std::ops::Range<usize>| -> Option<u32> {
        let part = &date[range];
        part.bytes()
            .all(|b| b.is_ascii_digit())
            .then(|| part.parse().ok())
            .flatten()
    };
    match (digits(0..4), digits(5..7), digits(8..10)) {
        (Some(year), Some(month), Some(day)) => {
            (1..=12).contains(&month) && (1..=days_in_month(year, month)).contains(&day)
        }
        _ => false,
    }
}
