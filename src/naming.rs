//! Filename-derived naming: slugs, display titles and sort keys.
//!
//! Downloaded documents keep whatever name their author gave them, including
//! spaces, punctuation and non-ASCII letters. Everything that ends up in an
//! output path goes through [`slugify`], and everything shown to readers goes
//! through [`title_from_stem`].
//!
//! ## Slugs
//!
//! - `"Week 1 — Intro"` → `"week-1-intro"`
//! - `"note!!"` → `"note"`
//! - `"Giriş"` → `"giri"` (non-ASCII letters are separators)
//! - `"!!!"` → `"item"` (fallback)
//!
//! ## Sort keys
//!
//! A title that starts with a run of 1–4 digits is ordered by that number, so
//! `"2 Giriş"` comes before `"10 Giriş"`. Longer digit runs (dates, ids) are
//! not treated as ordering numbers.

use crate::types::SortKey;

/// Placeholder used when a name slugifies to nothing.
pub const SLUG_FALLBACK: &str = "item";

/// Longest digit run accepted as an ordering number.
const MAX_NUMBER_DIGITS: usize = 4;

/// Lowercase, hyphen-separated, URL-safe token for `text`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;
    for c in text.trim().chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    if slug.is_empty() {
        SLUG_FALLBACK.to_string()
    } else {
        slug
    }
}

/// Display title: underscores and hyphens become spaces.
///
/// Falls back to the raw stem when nothing but separators remain.
pub fn title_from_stem(stem: &str) -> String {
    let title = stem.replace(['_', '-'], " ");
    let title = title.trim();
    if title.is_empty() {
        stem.to_string()
    } else {
        title.to_string()
    }
}

/// Leading ordering number of a title, if it has one.
///
/// - `"03 Lecture"` → `Some(3)`
/// - `"2.1 Sets"` → `Some(2)`
/// - `"20240101 Exam"` → `None` (more than four digits)
/// - `"Lecture 3"` → `None`
pub fn leading_number(title: &str) -> Option<u32> {
    let trimmed = title.trim_start();
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 || digits > MAX_NUMBER_DIGITS {
        return None;
    }
    trimmed[..digits].parse().ok()
}

/// Sort key for a display title.
pub fn sort_key(title: &str) -> SortKey {
    SortKey {
        number: leading_number(title),
        title: title.to_lowercase(),
    }
}
