//! Date helper functions

use chrono::{DateTime, FixedOffset, Locale, NaiveDate, TimeZone};

/// Parse a publication timestamp as sent by the content API
///
/// Accepts RFC 3339, the API's `2021-03-15T19:25:28+0000` form and plain
/// `YYYY-MM-DD` dates (taken as midnight UTC).
pub fn parse_date(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt);
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    let utc = FixedOffset::east_opt(0)?;
    utc.from_local_datetime(&date.and_hms_opt(0, 0, 0)?).single()
}

/// Format a date with a date-fns style pattern (`dd MMM yyyy`)
///
/// Month names follow `language`: any `pt` variant uses Portuguese names,
/// everything else English. Moment-style uppercase `YYYY`/`DD` are
/// accepted as well.
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>, format: &str, language: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let chrono_format = date_fns_to_chrono_format(format);
    date.format_localized(&chrono_format, locale_for(language))
        .to_string()
}

fn locale_for(language: &str) -> Locale {
    if language.to_ascii_lowercase().starts_with("pt") {
        Locale::pt_BR
    } else {
        Locale::en_US
    }
}

fn date_fns_to_chrono_format(format: &str) -> String {
    // Longest tokens first within each unit
    let replacements = [
        ("%", "%%"),
        ("yyyy", "%Y"),
        ("YYYY", "%Y"),
        ("yy", "%y"),
        ("YY", "%y"),
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        ("dd", "%d"),
        ("DD", "%d"),
        ("HH", "%H"),
        ("mm", "%M"),
        ("ss", "%S"),
    ];

    let mut result = format.to_string();

    for (from, to) in replacements {
        result = result.replace(from, to);
    }

    result
}

/// Format an optional API timestamp; absent or unparsable dates give ""
pub fn format_publication_date(date: Option<&str>, format: &str, language: &str) -> String {
    date.and_then(parse_date)
        .map(|dt| format_date(&dt, format, language))
        .unwrap_or_default()
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}
