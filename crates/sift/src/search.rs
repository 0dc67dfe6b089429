//! IMAP SEARCH fragment construction
//!
//! Fragments accumulate verbatim: every filter appends its term plus a
//! trailing space and never rewrites what came before, so applying the
//! same filter twice yields the term twice. Composition wraps the raw
//! fragments in parentheses without trimming them first; trimming happens
//! once, when the final SEARCH argument is built.

use chrono::{Datelike, NaiveDate};

/// Fixed 3-letter English month abbreviations for IMAP date literals
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Format a date as an IMAP date literal, e.g. `5-Jan-2024`.
///
/// The day carries no leading zero and the month is always the English
/// abbreviation, independent of locale.
pub(crate) fn format_date(date: NaiveDate) -> String {
    format!(
        "{}-{}-{}",
        date.day(),
        MONTHS[date.month0() as usize],
        date.year()
    )
}

/// Append one search term (`TO x`, `ON 5-Jan-2024`, ...) to a fragment
pub(crate) fn append_term(fragment: &str, keyword: &str, value: &str) -> String {
    format!("{fragment}{keyword} {value} ")
}

/// Fragment matching either side
pub(crate) fn or(left: &str, right: &str) -> String {
    format!("OR ({left}) ({right}) ")
}

/// Fragment matching `left` but not `right`
pub(crate) fn difference(left: &str, right: &str) -> String {
    format!("({left}) NOT ({right}) ")
}

/// Fragment matching everything outside `fragment`
pub(crate) fn complement(fragment: &str) -> String {
    format!("NOT ({fragment}) ")
}

/// Final SEARCH argument: the accumulated fragment wrapped in
/// parentheses, or `(ALL)` when nothing was filtered.
pub(crate) fn search_argument(fragment: &str) -> String {
    let trimmed = fragment.trim();
    if trimmed.is_empty() {
        "(ALL)".to_string()
    } else {
        format!("({trimmed})")
    }
}
