//! Rule validation and time-of-day parsing.
//!
//! Policies are validated when they are written, so evaluation can treat a
//! malformed window as a configuration fault rather than a user error.

use agentwallet_types::{PolicyRules, TimeWindow};
use chrono::{DateTime, FixedOffset, Timelike, Utc};

use crate::error::{PolicyError, PolicyResult};

/// Validate a policy rule set.
///
/// Rejects malformed `HH:MM` bounds, unrecognized timezones and zero caps.
pub fn validate_rules(rules: &PolicyRules) -> PolicyResult<()> {
    if rules.spending_limit_lamports == Some(0) {
        return Err(PolicyError::ZeroCap("spending_limit_lamports"));
    }
    if rules.daily_limit_lamports == Some(0) {
        return Err(PolicyError::ZeroCap("daily_limit_lamports"));
    }
    if let Some(window) = &rules.time_window {
        parse_window(window)?;
    }
    Ok(())
}

/// Parse `HH:MM` into minutes since midnight.
pub fn parse_minute_of_day(value: &str) -> PolicyResult<u32> {
    let invalid = || PolicyError::InvalidTime(value.to_string());
    let (hours, minutes) = value.split_once(':').ok_or_else(invalid)?;
    if hours.is_empty() || hours.len() > 2 || minutes.len() != 2 {
        return Err(invalid());
    }
    if !hours.bytes().chain(minutes.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    Ok(hours * 60 + minutes)
}

/// Parse a timezone into a fixed UTC offset.
///
/// Accepted forms: `UTC`, `Z`, `±HH:MM`, and `UTC±HH` or `UTC±HH:MM`.
/// IANA region names are rejected; there is no tz database here.
pub fn parse_timezone(tz: &str) -> PolicyResult<FixedOffset> {
    let unknown = || PolicyError::UnknownTimezone(tz.to_string());
    let trimmed = tz.trim();
    if trimmed.eq_ignore_ascii_case("utc") || trimmed == "Z" {
        return FixedOffset::east_opt(0).ok_or_else(unknown);
    }

    let (offset, minutes_required) = match trimmed.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("utc") => (&trimmed[3..], false),
        _ => (trimmed, true),
    };

    let sign = match offset.as_bytes().first() {
        Some(b'+') => 1,
        Some(b'-') => -1,
        _ => return Err(unknown()),
    };
    let body = &offset[1..];
    let (hours, minutes) = match body.split_once(':') {
        Some((h, m)) => (h, m),
        None if !minutes_required => (body, "00"),
        None => return Err(unknown()),
    };
    if hours.len() != 2 || minutes.len() != 2 {
        return Err(unknown());
    }
    if !hours.bytes().chain(minutes.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(unknown());
    }
    let hours: i32 = hours.parse().map_err(|_| unknown())?;
    let minutes: i32 = minutes.parse().map_err(|_| unknown())?;
    if hours > 14 || minutes > 59 {
        return Err(unknown());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(unknown)
}

/// A validated time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedWindow {
    pub start: u32,
    pub end: u32,
    pub offset: FixedOffset,
}

impl ParsedWindow {
    /// Whether `now` falls inside the window, bounds inclusive.
    ///
    /// A window whose start is after its end wraps midnight, so `22:00` to
    /// `06:00` covers the night.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.offset);
        let minute = local.hour() * 60 + local.minute();
        if self.start <= self.end {
            self.start <= minute && minute <= self.end
        } else {
            minute >= self.start || minute <= self.end
        }
    }
}

/// Parse the bounds and timezone of a window.
pub fn parse_window(window: &TimeWindow) -> PolicyResult<ParsedWindow> {
    Ok(ParsedWindow {
        start: parse_minute_of_day(&window.start)?,
        end: parse_minute_of_day(&window.end)?,
        offset: parse_timezone(&window.timezone)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window(start: &str, end: &str, tz: &str) -> TimeWindow {
        TimeWindow {
            start: start.into(),
            end: end.into(),
            timezone: tz.into(),
        }
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, h, m, 0).unwrap()
    }

    #[test]
    fn test_parse_minute_of_day() {
        assert_eq!(parse_minute_of_day("00:00").unwrap(), 0);
        assert_eq!(parse_minute_of_day("9:30").unwrap(), 570);
        assert_eq!(parse_minute_of_day("23:59").unwrap(), 1439);

        for bad in ["24:00", "12:60", "12", "12:5", "ab:cd", "", "-1:00", "+9:00", "123:00"] {
            assert!(parse_minute_of_day(bad).is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_parse_timezone_forms() {
        let secs = |tz: &str| parse_timezone(tz).unwrap().local_minus_utc();
        assert_eq!(secs("UTC"), 0);
        assert_eq!(secs("Z"), 0);
        assert_eq!(secs("+05:30"), 5 * 3600 + 30 * 60);
        assert_eq!(secs("-08:00"), -8 * 3600);
        assert_eq!(secs("UTC+02"), 2 * 3600);
        assert_eq!(secs("UTC-03:30"), -(3 * 3600 + 30 * 60));

        for bad in ["America/New_York", "+5", "+0530", "UTC+2", "EST", "", "UTC+15:00", "UTC++1:00"] {
            assert!(parse_timezone(bad).is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_window_inclusive_bounds() {
        let w = parse_window(&window("09:00", "17:00", "UTC")).unwrap();
        assert!(w.contains(at(9, 0)));
        assert!(w.contains(at(17, 0)));
        assert!(!w.contains(at(8, 59)));
        assert!(!w.contains(at(17, 1)));
    }

    #[test]
    fn test_window_uses_declared_timezone() {
        // 12:00 UTC is 17:30 in +05:30
        let w = parse_window(&window("17:00", "18:00", "+05:30")).unwrap();
        assert!(w.contains(at(12, 0)));
        let utc = parse_window(&window("17:00", "18:00", "UTC")).unwrap();
        assert!(!utc.contains(at(12, 0)));
    }

    #[test]
    fn test_window_wraps_midnight() {
        let w = parse_window(&window("22:00", "06:00", "UTC")).unwrap();
        assert!(w.contains(at(23, 30)));
        assert!(w.contains(at(0, 0)));
        assert!(w.contains(at(6, 0)));
        assert!(!w.contains(at(12, 0)));
        assert!(!w.contains(at(21, 59)));
    }

    #[test]
    fn test_validate_rules() {
        assert!(validate_rules(&PolicyRules::default()).is_ok());

        let zero = PolicyRules {
            spending_limit_lamports: Some(0),
            ..PolicyRules::default()
        };
        assert!(matches!(validate_rules(&zero), Err(PolicyError::ZeroCap(_))));

        let bad_tz = PolicyRules {
            time_window: Some(window("09:00", "17:00", "Mars/Olympus")),
            ..PolicyRules::default()
        };
        assert!(matches!(validate_rules(&bad_tz), Err(PolicyError::UnknownTimezone(_))));

        let bad_time = PolicyRules {
            time_window: Some(window("9am", "17:00", "UTC")),
            ..PolicyRules::default()
        };
        assert!(matches!(validate_rules(&bad_time), Err(PolicyError::InvalidTime(_))));
    }
}
