use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;

/// Returns the current time in the configured timezone.
pub fn now_in_timezone(tz: &Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(tz)
}

/// Returns the current UTC time, aligned with the configured timezone.
pub fn now_utc(tz: &Tz) -> DateTime<Utc> {
    now_in_timezone(tz).with_timezone(&Utc)
}

/// Returns today's date in the configured timezone.
pub fn today_local(tz: &Tz) -> NaiveDate {
    now_in_timezone(tz).date_naive()
}

/// Rounds to two decimal places (hour totals, installments).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Expands an inclusive date range into individual calendar days.
pub fn expand_range(from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut cursor = from;
    while cursor <= to {
        days.push(cursor);
        match cursor.succ_opt() {
            Some(next) => cursor = next,
            None => break,
        }
    }
    days
}

/// Counts business days in the inclusive range, excluding the designated
/// non-working day of week.
pub fn business_days(from: NaiveDate, to: NaiveDate, non_working: Weekday) -> u32 {
    expand_range(from, to)
        .into_iter()
        .filter(|day| day.weekday() != non_working)
        .count() as u32
}

/// Parses an "HH:MM" wall-clock string.
pub fn parse_hour(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}

/// Duration in hours between two wall-clock times. A window that resolves
/// earlier than its start wraps past midnight; the result is always below 24h.
/// Equal times are ambiguous (zero or a full day) and yield None.
pub fn hour_window(from: NaiveTime, to: NaiveTime) -> Option<f64> {
    if from == to {
        return None;
    }
    let mut diff = to - from;
    if diff < Duration::zero() {
        diff += Duration::hours(24);
    }
    Some(diff.num_minutes() as f64 / 60.0)
}

/// Mean of minutes-since-midnight samples formatted as "HH:MM",
/// or "--:--" when there are no samples.
pub fn average_clock(samples: &[u32]) -> String {
    if samples.is_empty() {
        return "--:--".to_string();
    }
    let mean = samples.iter().map(|m| *m as u64).sum::<u64>() / samples.len() as u64;
    format!("{:02}:{:02}", mean / 60, mean % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn today_local_matches_timezone_date() {
        let tz = chrono_tz::UTC;
        let result = today_local(&tz);
        assert_eq!(result, now_in_timezone(&tz).date_naive());
    }

    #[test]
    fn round2_rounds_half_up() {
        assert_eq!(round2(8.555), 8.56);
        assert_eq!(round2(8.0), 8.0);
    }

    #[test]
    fn expand_range_is_inclusive() {
        let days = expand_range(date(2024, 6, 3), date(2024, 6, 7));
        assert_eq!(days.len(), 5);
        assert_eq!(days[0], date(2024, 6, 3));
        assert_eq!(days[4], date(2024, 6, 7));
    }

    #[test]
    fn business_days_excludes_non_working_weekday() {
        // Mon 2024-06-03 .. Fri 2024-06-07, no Sunday in range
        assert_eq!(business_days(date(2024, 6, 3), date(2024, 6, 7), Weekday::Sun), 5);
        // Sat 2024-06-08 .. Mon 2024-06-10 crosses a Sunday
        assert_eq!(business_days(date(2024, 6, 8), date(2024, 6, 10), Weekday::Sun), 2);
    }

    #[test]
    fn hour_window_handles_midnight_wrap() {
        let from = parse_hour("22:00").unwrap();
        let to = parse_hour("06:00").unwrap();
        assert_eq!(hour_window(from, to), Some(8.0));
    }

    #[test]
    fn hour_window_rejects_equal_times() {
        let t = parse_hour("09:00").unwrap();
        assert_eq!(hour_window(t, t), None);
    }

    #[test]
    fn hour_window_plain_difference() {
        let from = parse_hour("09:30").unwrap();
        let to = parse_hour("14:00").unwrap();
        assert_eq!(hour_window(from, to), Some(4.5));
    }

    #[test]
    fn parse_hour_rejects_malformed_values() {
        assert!(parse_hour("25:00").is_none());
        assert!(parse_hour("9am").is_none());
        assert!(parse_hour("").is_none());
        assert!(parse_hour("14:30").is_some());
    }

    #[test]
    fn average_clock_formats_mean_and_sentinel() {
        assert_eq!(average_clock(&[]), "--:--");
        // 09:00 and 09:30 average to 09:15
        assert_eq!(average_clock(&[540, 570]), "09:15");
    }
}
