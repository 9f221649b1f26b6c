//! Permissive feed date parsing.
//!
//! Feeds in the wild carry RFC 822 and RFC 3339 dates plus dozens of
//! malformed variants: missing zones, swapped paddings, bare Unix
//! timestamps, locale month names. One ordered list of layouts is tried
//! until something sticks, so no adapter embeds its own date logic.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DateError {
    #[error("date parser: empty value")]
    Empty,
    #[error("date parser: failed to parse date {0:?}")]
    Unparseable(String),
}

/// Layouts carrying a numeric UTC offset, tried with [`DateTime::parse_from_str`].
const OFFSET_FORMATS: &[&str] = &[
    "%a, %d %b %Y %H:%M:%S %z",
    "%a, %d %b %Y %H:%M:%S%z",
    "%a, %d %b %Y %H:%M %z",
    "%a, %d %b %y %H:%M:%S %z",
    "%a %d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M:%S %z",
    "%d %B %Y %H:%M:%S %z",
    "%Y-%m-%dT%H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%dT%H:%M%z",
    "%d.%m.%Y %z",
];

/// Layouts ending in a named zone abbreviation. The name cannot be mapped
/// back to an offset, so it is skipped and the time is taken as UTC, which
/// is how aggregators have always read `GMT`-less RSS dates.
const NAMED_ZONE_FORMATS: &[&str] = &[
    "%a, %d %b %Y %H:%M:%S %Z",
    "%a, %d %b %Y %H:%M %Z",
    "%a, %d %b %y %H:%M:%S %Z",
    "%a %d %b %Y %H:%M:%S %Z",
    "%a %b %d %H:%M:%S %Z %Y",
    "%d %b %Y %H:%M:%S %Z",
    "%d %b %Y %H:%M %Z",
    "%d %B %Y %H:%M:%S %Z",
    "%B %d, %Y %H:%M:%S %Z",
    "%b %d, %Y %H:%M:%S %Z",
    "%m/%d/%Y %H:%M:%S %Z",
];

/// Zone-less layouts, read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%a %b %d %H:%M:%S %Y",
    "%a, %d %b %Y %H:%M:%S",
    "%a, %d %b %Y %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d at %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d %b %Y %H:%M:%S",
    "%d %B %Y %H:%M:%S",
    "%B %d, %Y %I:%M:%S %p",
    "%B %d, %Y %H:%M:%S",
    "%B %d, %Y %I:%M %p",
    "%b %d, %Y %I:%M:%S %p",
    "%b %d %Y %I:%M:%S%p",
    "%A, %B %d, %Y %I:%M%p",
    "%A, %d %B %Y %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d/%m/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %H:%M:%S",
    "%H:%M %d.%m.%Y",
];

/// Date-only layouts, read as UTC midnight.
const DATE_FORMATS: &[&str] = &[
    "%a, %d %b %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%A, %B %d, %Y",
    "%Y %B %d",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%m/%d/%Y",
    "%m-%d-%Y",
];

/// Parses a feed date string against the layout tables.
///
/// Bare integers are treated as Unix timestamps. When every layout fails,
/// the last whitespace-delimited token is dropped and the remainder is
/// retried, which rescues dates with trailing garbage like
/// `"Tue, 03 Jun 2003 09:39:21 GMT Hora estándar"`.
pub fn parse(value: &str) -> Result<DateTime<Utc>, DateError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DateError::Empty);
    }

    if let Ok(timestamp) = trimmed.parse::<i64>() {
        if let Some(parsed) = DateTime::from_timestamp(timestamp, 0) {
            return Ok(parsed);
        }
    }

    let normalized = replace_non_english_words(trimmed);
    let candidate = normalized.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc2822(candidate) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(candidate) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for layout in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(candidate, layout) {
            return Ok(parsed.with_timezone(&Utc));
        }
    }

    for layout in NAMED_ZONE_FORMATS.iter().chain(NAIVE_FORMATS) {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(candidate, layout) {
            return Ok(parsed.and_utc());
        }
    }

    for layout in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(candidate, layout) {
            if let Some(midnight) = parsed.and_hms_opt(0, 0, 0) {
                return Ok(midnight.and_utc());
            }
        }
    }

    // Drop trailing tokens and retry; bail out once nothing is left.
    if let Some(last_space) = trimmed.rfind(' ') {
        if last_space > 0 {
            return parse(&trimmed[..last_space])
                .map_err(|_| DateError::Unparseable(value.to_string()));
        }
    }

    Err(DateError::Unparseable(value.to_string()))
}

/// Rewrites German and French day/month abbreviations to English so the
/// layout tables apply. The replacement list mirrors what actually shows up
/// in feeds, not a full locale table.
fn replace_non_english_words(value: &str) -> String {
    const REPLACEMENTS: &[(&str, &str)] = &[
        ("Mo,", "Mon,"),
        ("Di,", "Tue,"),
        ("Mi,", "Wed,"),
        ("Do,", "Thu,"),
        ("Fr,", "Fri,"),
        ("Sa,", "Sat,"),
        ("So,", "Sun,"),
        ("Mär ", "Mar "),
        ("Mai ", "May "),
        ("Okt ", "Oct "),
        ("Dez ", "Dec "),
        ("lun,", "Mon,"),
        ("mar,", "Tue,"),
        ("mer,", "Wed,"),
        ("jeu,", "Thu,"),
        ("ven,", "Fri,"),
        ("sam,", "Sat,"),
        ("dim,", "Sun,"),
        ("avr ", "Apr "),
        ("mai ", "May "),
        ("jui ", "Jun "),
    ];

    let mut out = value.to_string();
    for (from, to) in REPLACEMENTS {
        if out.contains(from) {
            out = out.replace(from, to);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_rfc822_with_gmt() {
        let parsed = parse("Tue, 03 Jun 2003 09:39:21 GMT").unwrap();
        assert_eq!(
            (parsed.year(), parsed.month(), parsed.day()),
            (2003, 6, 3)
        );
        assert_eq!(parsed.hour(), 9);
    }

    #[test]
    fn test_rfc822_single_digit_day() {
        let parsed = parse("Tue, 3 Jun 2003 09:39:21 GMT").unwrap();
        assert_eq!(parsed.day(), 3);
    }

    #[test]
    fn test_rfc3339() {
        let parsed = parse("2003-06-03T09:39:21Z").unwrap();
        assert_eq!(parsed.minute(), 39);
    }

    #[test]
    fn test_rfc3339_with_offset() {
        let parsed = parse("2019-01-26T08:02:28+01:00").unwrap();
        assert_eq!(parsed.hour(), 7); // normalized to UTC
    }

    #[test]
    fn test_unix_timestamp() {
        let parsed = parse("1405544146").unwrap();
        assert_eq!(parsed.year(), 2014);
    }

    #[test]
    fn test_date_only() {
        let parsed = parse("2003-06-03").unwrap();
        assert_eq!(parsed.hour(), 0);
    }

    #[test]
    fn test_german_weekday_and_month() {
        let parsed = parse("Mi, 02 Okt 2019 14:00:00 +0200").unwrap();
        assert_eq!((parsed.month(), parsed.day()), (10, 2));
    }

    #[test]
    fn test_trailing_garbage_is_retried() {
        let parsed = parse("Tue, 03 Jun 2003 09:39:21 GMT extra junk").unwrap();
        assert_eq!(parsed.year(), 2003);
    }

    #[test]
    fn test_known_obsolete_zone_keeps_offset() {
        // EST is an RFC 2822 obs-zone with a defined -0500 offset.
        let parsed = parse("Thu, 30 Apr 2015 08:57:00 EST").unwrap();
        assert_eq!(parsed.hour(), 13);
    }

    #[test]
    fn test_unknown_named_zone_read_as_utc() {
        let parsed = parse("Thu, 30 Apr 2015 08:57:00 CEST").unwrap();
        assert_eq!(parsed.hour(), 8);
    }

    #[test]
    fn test_empty_value_errors() {
        assert!(matches!(parse("   "), Err(DateError::Empty)));
    }

    #[test]
    fn test_garbage_errors() {
        assert!(parse("certainly-not-a-date").is_err());
    }
}
