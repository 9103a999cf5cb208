//! Time resolution: platform timestamp tokens, simple clock times in user
//! text, and the next occurrence of a recurring local-time schedule.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use regex::Regex;

/// Platform-native timestamp markup: `<t:SECONDS>` or `<t:SECONDS:style>`.
static PLATFORM_TS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<t:(\d+)(?::[dDtTfFR])?>").expect("platform timestamp regex"));

/// Simple clock time: `11am`, `2 pm`, `20:00`, `8:30am`, optionally preceded
/// by `at` or `@`.
static CLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:(?:at|@)\s*)?(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\b").expect("clock regex")
});

/// Extract the first platform timestamp token from free text.
pub fn extract_platform_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let caps = PLATFORM_TS_RE.captures(text)?;
    let secs: i64 = caps[1].parse().ok()?;
    DateTime::from_timestamp(secs, 0)
}

/// Extract the first clock-time pattern from free text and resolve it to the
/// next occurrence of that local time strictly after `now` in `tz`.
///
/// Only the first match is used; `"bring 2 potions"` therefore parses as
/// 02:00. That ambiguity is inherent to matching bare numbers and is kept
/// rather than guessed around.
pub fn parse_natural_time(text: &str, tz: Tz, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let caps = CLOCK_RE.captures(text)?;
    let mut hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps.get(2).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);

    if let Some(meridiem) = caps.get(3) {
        hour %= 12;
        if meridiem.as_str().eq_ignore_ascii_case("pm") {
            hour += 12;
        }
    }
    if hour > 23 || minute > 59 {
        return None;
    }

    let now_local = now.with_timezone(&tz);
    let today = now_local.date_naive();
    let candidate = local_at(tz, today, hour, minute)?;
    if candidate > now_local {
        return Some(candidate.with_timezone(&Utc));
    }
    // Already passed today; same wall-clock time tomorrow.
    local_at(tz, today + Duration::days(1), hour, minute).map(|c| c.with_timezone(&Utc))
}

/// Resolve an event time from line-up text: platform tokens are unambiguous
/// and win; natural-language parsing is the fallback.
pub fn resolve_event_time(text: &str, tz: Tz, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    extract_platform_timestamp(text).or_else(|| parse_natural_time(text, tz, now))
}

/// Earliest candidate strictly after `now` among today's `hours` (local,
/// minute 0); when all of today's candidates have passed, the smallest hour
/// on the following day. Never returns an instant at or before `now`.
pub fn next_recurring(now: DateTime<Utc>, tz: Tz, hours: &[u32]) -> DateTime<Utc> {
    let now_local = now.with_timezone(&tz);
    let today = now_local.date_naive();

    let next_today = hours
        .iter()
        .filter_map(|&h| local_at(tz, today, h, 0))
        .filter(|c| *c > now_local)
        .min();
    if let Some(next) = next_today {
        return next.with_timezone(&Utc);
    }

    let min_hour = hours.iter().copied().min().unwrap_or(0);
    local_at(tz, today + Duration::days(1), min_hour, 0)
        .map(|c| c.with_timezone(&Utc))
        .unwrap_or_else(|| now + Duration::days(1))
}

fn local_at(tz: Tz, date: NaiveDate, hour: u32, minute: u32) -> Option<DateTime<Tz>> {
    use chrono::TimeZone;
    let naive = date.and_hms_opt(hour, minute, 0)?;
    tz.from_local_datetime(&naive).earliest()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Asia::Manila;

    fn manila(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Manila
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .single()
            .expect("valid local time")
            .with_timezone(&Utc)
    }

    const HOURS: [u32; 8] = [11, 14, 17, 20, 23, 2, 5, 8];

    #[test]
    fn test_next_recurring_same_day() {
        let now = manila(2026, 8, 7, 9, 0);
        assert_eq!(next_recurring(now, Manila, &HOURS), manila(2026, 8, 7, 11, 0));
    }

    #[test]
    fn test_next_recurring_wraps_to_smallest_hour() {
        let now = manila(2026, 8, 7, 23, 30);
        assert_eq!(next_recurring(now, Manila, &HOURS), manila(2026, 8, 8, 2, 0));
    }

    #[test]
    fn test_next_recurring_strictly_after_now() {
        // Exactly on a candidate: must return the following one, never `now`.
        let now = manila(2026, 8, 7, 11, 0);
        let next = next_recurring(now, Manila, &HOURS);
        assert!(next > now);
        assert_eq!(next, manila(2026, 8, 7, 14, 0));
    }

    #[test]
    fn test_next_recurring_between_small_hours() {
        let now = manila(2026, 8, 7, 3, 15);
        assert_eq!(next_recurring(now, Manila, &HOURS), manila(2026, 8, 7, 5, 0));
    }

    #[test]
    fn test_parse_natural_time_pm() {
        let now = manila(2026, 8, 7, 10, 0);
        let parsed = parse_natural_time("let's go 2pm", Manila, now);
        assert_eq!(parsed, Some(manila(2026, 8, 7, 14, 0)));
    }

    #[test]
    fn test_parse_natural_time_rolls_to_tomorrow() {
        let now = manila(2026, 8, 7, 15, 0);
        let parsed = parse_natural_time("let's go 2pm", Manila, now);
        assert_eq!(parsed, Some(manila(2026, 8, 8, 14, 0)));
    }

    #[test]
    fn test_parse_natural_time_variants() {
        let now = manila(2026, 8, 7, 6, 0);
        assert_eq!(
            parse_natural_time("siege at 8:30am", Manila, now),
            Some(manila(2026, 8, 7, 8, 30))
        );
        assert_eq!(
            parse_natural_time("starts @ 20:00", Manila, now),
            Some(manila(2026, 8, 7, 20, 0))
        );
        // 12-hour normalization: 12am is midnight, 12pm is noon.
        assert_eq!(
            parse_natural_time("12pm", Manila, now),
            Some(manila(2026, 8, 7, 12, 0))
        );
        assert_eq!(
            parse_natural_time("12am", Manila, now),
            Some(manila(2026, 8, 8, 0, 0))
        );
    }

    #[test]
    fn test_parse_natural_time_rejects_out_of_range() {
        let now = manila(2026, 8, 7, 6, 0);
        assert_eq!(parse_natural_time("meet at 25:00", Manila, now), None);
        assert_eq!(parse_natural_time("99:99", Manila, now), None);
        assert_eq!(parse_natural_time("no time here", Manila, now), None);
    }

    #[test]
    fn test_parse_natural_time_first_match_wins() {
        let now = manila(2026, 8, 7, 6, 0);
        // Known quirk: a bare count parses as a clock time.
        assert_eq!(
            parse_natural_time("bring 2 potions at 9pm", Manila, now),
            Some(manila(2026, 8, 8, 2, 0))
        );
    }

    #[test]
    fn test_extract_platform_timestamp() {
        let expected = DateTime::from_timestamp(1_700_000_000, 0).expect("valid ts");
        assert_eq!(extract_platform_timestamp("see <t:1700000000:R>"), Some(expected));
        assert_eq!(extract_platform_timestamp("see <t:1700000000>"), Some(expected));
        assert_eq!(extract_platform_timestamp("<t:notanumber>"), None);
        // Overflowing second counts are malformed, not a panic.
        assert_eq!(extract_platform_timestamp("<t:99999999999999999999>"), None);
        assert_eq!(extract_platform_timestamp("plain text"), None);
    }

    #[test]
    fn test_resolve_event_time_platform_token_wins() {
        let now = manila(2026, 8, 7, 6, 0);
        let expected = DateTime::from_timestamp(1_700_000_000, 0).expect("valid ts");
        assert_eq!(
            resolve_event_time("8pm <t:1700000000>", Manila, now),
            Some(expected)
        );
        assert_eq!(
            resolve_event_time("8pm tonight", Manila, now),
            Some(manila(2026, 8, 7, 20, 0))
        );
        assert_eq!(resolve_event_time("no schedule", Manila, now), None);
    }
}
