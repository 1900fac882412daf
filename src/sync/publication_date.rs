use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

const RFC1123_NUMERIC_ZONE: &str = "%a, %d %b %Y %H:%M:%S %z";
const RFC1123_WITHOUT_ZONE: &str = "%a, %d %b %Y %H:%M:%S";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("could not parse publication date {0:?}")]
pub struct UnparseableDate(pub String);

/// Parses a publication date as found in feeds. Formats are tried in order:
///
/// 1. RFC 1123 with a numeric zone, `Mon, 02 Jan 2006 15:04:05 -0700`
/// 2. RFC 1123 with a zone name, `Mon, 02 Jan 2006 15:04:05 GMT`
/// 3. RFC 3339, `2006-01-02T15:04:05Z`
/// 4. `Mon, 02 Jan 2006 15:04:05 CEST` with any zone abbreviation. Unknown
///    abbreviations are read as UTC.
pub fn parse(raw: &str) -> Result<DateTime<Utc>, UnparseableDate> {
    let value = raw.trim();

    let parsed = DateTime::parse_from_str(value, RFC1123_NUMERIC_ZONE)
        .or_else(|_| DateTime::parse_from_rfc2822(value))
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
        .or_else(|| parse_with_zone_abbreviation(value));

    match parsed {
        Some(date) => Ok(date.with_timezone(&Utc)),
        None => Err(UnparseableDate(raw.to_string())),
    }
}

fn parse_with_zone_abbreviation(value: &str) -> Option<DateTime<FixedOffset>> {
    let (date_time, zone) = value.rsplit_once(' ')?;

    if zone.is_empty() || !zone.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let naive = NaiveDateTime::parse_from_str(date_time.trim_end(), RFC1123_WITHOUT_ZONE).ok()?;
    let offset = FixedOffset::east_opt(zone_offset_in_seconds(zone))?;

    offset.from_local_datetime(&naive).single()
}

fn zone_offset_in_seconds(zone: &str) -> i32 {
    const HOUR: i32 = 3600;

    match zone.to_ascii_uppercase().as_str() {
        "CET" | "BST" | "WEST" | "WAT" => HOUR,
        "CEST" | "EET" | "SAST" | "CAT" => 2 * HOUR,
        "EEST" | "MSK" | "EAT" => 3 * HOUR,
        "IST" => 5 * HOUR + 30 * 60,
        "HKT" | "AWST" => 8 * HOUR,
        "JST" | "KST" => 9 * HOUR,
        "AEST" => 10 * HOUR,
        "AEDT" => 11 * HOUR,
        "NZST" => 12 * HOUR,
        "NZDT" => 13 * HOUR,
        "AST" | "EDT" => -4 * HOUR,
        "EST" | "CDT" => -5 * HOUR,
        "CST" | "MDT" => -6 * HOUR,
        "MST" | "PDT" => -7 * HOUR,
        "PST" | "AKDT" => -8 * HOUR,
        "AKST" => -9 * HOUR,
        "HST" => -10 * HOUR,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::{parse, UnparseableDate};
    use chrono::{DateTime, Utc};
    use test_case::test_case;

    fn utc(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value).unwrap().into()
    }

    #[test_case("Mon, 02 Jan 2006 15:04:05 -0700", "2006-01-02T22:04:05Z" ; "rfc1123 numeric zone")]
    #[test_case("Mon, 02 Jan 2006 15:04:05 +0000", "2006-01-02T15:04:05Z" ; "rfc1123 utc offset")]
    #[test_case("Mon, 02 Jan 2006 15:04:05 GMT", "2006-01-02T15:04:05Z" ; "rfc1123 zone name")]
    #[test_case("Mon, 02 Jan 2006 15:04:05 EST", "2006-01-02T20:04:05Z" ; "rfc1123 us zone name")]
    #[test_case("2006-01-02T15:04:05Z", "2006-01-02T15:04:05Z" ; "rfc3339 utc")]
    #[test_case("2006-01-02T15:04:05+01:00", "2006-01-02T14:04:05Z" ; "rfc3339 offset")]
    #[test_case("Mon, 02 Jan 2006 15:04:05 CEST", "2006-01-02T13:04:05Z" ; "known abbreviation")]
    #[test_case("Mon, 02 Jan 2006 15:04:05 XYZ", "2006-01-02T15:04:05Z" ; "unknown abbreviation")]
    #[test_case("  Tue, 19 Oct 2004 11:09:11 -0400 ", "2004-10-19T15:09:11Z" ; "surrounding whitespace")]
    fn it_parses_supported_formats(raw: &str, expected: &str) {
        assert_eq!(parse(raw), Ok(utc(expected)));
    }

    #[test_case("not-a-date" ; "garbage")]
    #[test_case("" ; "empty")]
    #[test_case("02/01/2006" ; "slashes")]
    #[test_case("Mon, 02 Jan 2006 15:04:05 +7" ; "broken offset")]
    #[test_case("Mon, 02 Jan 2006 25:04:05 GMT" ; "invalid hour")]
    fn it_reports_unparseable_dates(raw: &str) {
        assert_eq!(parse(raw), Err(UnparseableDate(raw.to_string())));
    }

    #[test]
    fn it_keeps_the_original_string_in_the_error() {
        let error = parse("yesterday").unwrap_err();

        assert_eq!(error.to_string(), "could not parse publication date \"yesterday\"");
    }
}
