//! Shared cell parsing utilities.
//!
//! Public statistical tables decorate their numbers with thousands
//! separators, currency/unit suffixes, and footnote annotations. The
//! helpers here turn those decorated strings into plain values, and
//! [`normalize_name`] produces the fold every name join in the pipeline
//! keys on.

use crate::SourceError;

/// Cleans a raw table cell: collapses whitespace and strips trailing
/// annotation markers (`*1`, `※2`, bare `*` or `†`).
///
/// Bracketed `[1]`-style references are normally removed at scrape time;
/// this also drops any that survive (CSV sources bypass the HTML cleaner).
#[must_use]
pub fn clean_cell(value: &str) -> String {
    let collapsed = strip_bracket_refs(value)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    let mut out: &str = &collapsed;
    loop {
        let trimmed = out.trim_end();
        let without_digits = trimmed.trim_end_matches(|c: char| c.is_ascii_digit());

        if without_digits.len() < trimmed.len() {
            // Trailing digits only form an annotation when a marker
            // precedes them ("305,000*1").
            if let Some(stripped) = without_digits.strip_suffix(['*', '※']) {
                out = stripped;
                continue;
            }
            break;
        }

        if let Some(stripped) = trimmed.strip_suffix(['*', '※', '†']) {
            out = stripped;
            continue;
        }
        break;
    }

    out.trim().to_owned()
}

/// Parses a decimal number that may carry thousands separators
/// (`1,234,567`, full-width `，`, or thin spaces).
///
/// # Errors
///
/// Returns [`SourceError::Parse`] naming the offending string when the
/// cell is empty or not a number.
pub fn parse_decimal(value: &str) -> Result<f64, SourceError> {
    let cleaned = clean_cell(value);
    let digits: String = cleaned
        .chars()
        .filter(|c| !matches!(c, ',' | '，' | ' '))
        .collect();

    if digits.is_empty() {
        return Err(SourceError::Parse {
            message: format!("empty numeric cell (raw: '{value}')"),
        });
    }

    digits.parse::<f64>().map_err(|_| SourceError::Parse {
        message: format!("could not parse '{value}' as a number"),
    })
}

/// Parses a price cell, stripping any of the configured currency/unit
/// suffixes (e.g. `"JPY/sq.m"`) before numeric parsing.
///
/// Suffix matching is ASCII-case-insensitive; the first matching suffix
/// wins.
///
/// # Errors
///
/// Returns [`SourceError::Parse`] naming the offending string when the
/// remainder is not a number.
pub fn parse_price(value: &str, suffixes: &[String]) -> Result<f64, SourceError> {
    let cleaned = clean_cell(value);

    let mut numeric: &str = &cleaned;
    for suffix in suffixes {
        let suffix = suffix.trim();
        if suffix.is_empty() {
            continue;
        }
        if let Some(head) = strip_suffix_ignore_ascii_case(&cleaned, suffix) {
            numeric = head;
            break;
        }
    }

    parse_decimal(numeric)
}

/// Normalizes a place name for joining: trims, collapses inner
/// whitespace, and lowercases.
///
/// Every join between independently sourced tables keys on this fold —
/// raw names are never compared directly.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Removes `[N]`-style references where `N` is all digits.
fn strip_bracket_refs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('[') {
        let (before, after) = rest.split_at(start);
        out.push_str(before);

        if let Some(end) = after.find(']') {
            let inner = &after[1..end];
            if !inner.is_empty() && inner.chars().all(|c| c.is_ascii_digit()) {
                rest = &after[end + 1..];
                continue;
            }
        }

        out.push('[');
        rest = &after[1..];
    }

    out.push_str(rest);
    out
}

/// Strips `suffix` from the end of `value`, ignoring ASCII case.
fn strip_suffix_ignore_ascii_case<'a>(value: &'a str, suffix: &str) -> Option<&'a str> {
    let split = value.len().checked_sub(suffix.len())?;
    if !value.is_char_boundary(split) {
        return None;
    }
    let (head, tail) = value.split_at(split);
    tail.eq_ignore_ascii_case(suffix).then(|| head.trim_end())
}
