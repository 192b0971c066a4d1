//! Derived-value helpers for content rendering.
//!
//! Pure functions shared by the accessors and the route layer: URL slug
//! derivation, estimated reading time, and human-readable tenure strings
//! for experience entries. None of these touch the store.

use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Average adult reading speed used for the read-time estimate.
pub const WORDS_PER_MINUTE: usize = 200;

// Characters that survive slugification besides separators.
static NON_SLUG_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s_-]").unwrap());
// Runs of whitespace, underscores and hyphens collapse to one hyphen.
static SEPARATOR_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s_-]+").unwrap());
static SLUG_FORMAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap());

/// Derives a URL slug from a post title.
///
/// Lowercases, strips everything that is not a letter, digit or
/// separator, collapses separator runs into single hyphens and trims
/// hyphens from both ends. Applying it to its own output changes
/// nothing, so stored slugs can be re-derived safely.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped = NON_SLUG_CHARS.replace_all(&lowered, "");
    let hyphenated = SEPARATOR_RUNS.replace_all(stripped.trim(), "-");
    hyphenated.trim_matches('-').to_string()
}

/// Checks a caller-supplied slug against the canonical shape.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty() && slug.len() <= 200 && SLUG_FORMAT.is_match(slug)
}

/// Estimated reading time in whole minutes, never less than one.
pub fn reading_time_minutes(content: &str) -> u32 {
    let words = content.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1) as u32
}

/// Formats the tenure of an experience entry as "2y 3m", "2y" or "4m".
///
/// An ongoing position ignores any stored end date and runs to today;
/// a finished position with no end date recorded also falls back to
/// today. Months are approximated as 30-day blocks. A negative span
/// clamps to "0m" rather than producing nonsense.
pub fn format_duration(start: NaiveDate, end: Option<NaiveDate>, current: bool) -> String {
    let today = Utc::now().date_naive();
    let until = if current { today } else { end.unwrap_or(today) };

    let days = (until - start).num_days().max(0);
    let total_months = days / 30;
    let years = total_months / 12;
    let months = total_months % 12;

    if years > 0 && months > 0 {
        format!("{}y {}m", years, months)
    } else if years > 0 {
        format!("{}y", years)
    } else {
        format!("{}m", months)
    }
}

// ===== Tests =====

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_strips_punctuation_and_collapses_separators() {
        assert_eq!(slugify("Hello, World!  Foo--Bar"), "hello-world-foo-bar");
        assert_eq!(slugify("Rust   &   Axum"), "rust-axum");
        assert_eq!(slugify("snake_case_title"), "snake-case-title");
    }

    #[test]
    fn slugify_trims_leading_and_trailing_hyphens() {
        assert_eq!(slugify("--- Edge Case ---"), "edge-case");
        assert_eq!(slugify("  spaced out  "), "spaced-out");
    }

    #[test]
    fn slugify_handles_degenerate_input() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!???"), "");
        assert_eq!(slugify("日本語"), "");
    }

    #[test]
    fn slugify_is_idempotent() {
        for title in ["Hello, World!", "a--b__c  d", "Already-A-Slug", "42 things"] {
            let once = slugify(title);
            assert_eq!(slugify(&once), once, "not stable for {title:?}");
        }
    }

    #[test]
    fn slugify_output_is_url_safe() {
        let slug = slugify("Ünïcode & Symbols ©ompany (2024)");
        assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        assert!(is_valid_slug(&slug) || slug.is_empty());
    }

    #[test]
    fn valid_slug_rejects_bad_shapes() {
        assert!(is_valid_slug("hello-world-2"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("Hello-World"));
        assert!(!is_valid_slug("two--hyphens"));
        assert!(!is_valid_slug("-leading"));
        assert!(!is_valid_slug("trailing-"));
    }

    #[test]
    fn reading_time_rounds_up_with_a_floor_of_one() {
        assert_eq!(reading_time_minutes(""), 1);
        assert_eq!(reading_time_minutes("one two three"), 1);

        let exactly_two = "word ".repeat(400);
        assert_eq!(reading_time_minutes(&exactly_two), 2);

        let just_over = "word ".repeat(401);
        assert_eq!(reading_time_minutes(&just_over), 3);
    }

    #[test]
    fn reading_time_is_monotonic_in_word_count() {
        let mut last = 0;
        for words in [0, 1, 199, 200, 201, 1000, 5000] {
            let estimate = reading_time_minutes(&"w ".repeat(words));
            assert!(estimate >= last, "estimate dropped at {words} words");
            last = estimate;
        }
    }

    #[test]
    fn duration_formats_years_and_months() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2022, 7, 1).unwrap();
        assert_eq!(format_duration(start, Some(end), false), "2y 6m");
    }

    #[test]
    fn duration_omits_the_zero_component() {
        let start = NaiveDate::from_ymd_opt(2021, 3, 1).unwrap();

        let four_months = NaiveDate::from_ymd_opt(2021, 7, 5).unwrap();
        assert_eq!(format_duration(start, Some(four_months), false), "4m");

        let whole_years = NaiveDate::from_ymd_opt(2023, 2, 25).unwrap();
        assert_eq!(format_duration(start, Some(whole_years), false), "2y");
    }

    #[test]
    fn duration_of_an_ongoing_position_ignores_the_end_date() {
        let start = Utc::now().date_naive() - chrono::Duration::days(400);
        let stale_end = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        assert_eq!(
            format_duration(start, Some(stale_end), true),
            format_duration(start, None, false),
        );
    }

    #[test]
    fn duration_clamps_negative_spans() {
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let before_start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(format_duration(start, Some(before_start), false), "0m");
    }

    #[test]
    fn duration_under_a_month_is_zero_months() {
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let three_weeks = NaiveDate::from_ymd_opt(2024, 6, 22).unwrap();
        assert_eq!(format_duration(start, Some(three_weeks), false), "0m");
    }
}
