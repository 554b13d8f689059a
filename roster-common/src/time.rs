//! Timestamp utilities

use chrono::{DateTime, Duration, SubsecRound, TimeZone, Utc};

/// Current UTC timestamp, truncated to the microsecond precision records are
/// stored with
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Latest instant that survives an RFC 3339 round trip (four-digit year)
pub fn latest_storable() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59)
        .single()
        .map(|at| at + Duration::microseconds(999_999))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Current time as Unix epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Timestamp `days` after `start`, saturating at [`latest_storable`]
pub fn add_days(start: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    let latest = latest_storable();
    start
        .checked_add_signed(Duration::days(i64::from(days)))
        .map_or(latest, |at| at.min(latest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_now_returns_recent_timestamp() {
        let timestamp = now();
        // After 2000-01-01, before 2100-01-01
        assert!(timestamp.timestamp() > 946_684_800);
        assert!(timestamp.timestamp() < 4_102_444_800);
    }

    #[test]
    fn test_now_has_microsecond_precision() {
        use chrono::Timelike;
        assert_eq!(now().nanosecond() % 1_000, 0);
    }

    #[test]
    fn test_now_millis_matches_now() {
        let millis = now_millis();
        let seconds = now().timestamp();
        assert!((millis / 1000 - seconds).abs() <= 1);
    }

    #[test]
    fn test_add_days() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = add_days(start, 30);
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_add_days_zero_is_identity() {
        let start = Utc.with_ymd_and_hms(2024, 6, 15, 12, 30, 0).unwrap();
        assert_eq!(add_days(start, 0), start);
    }

    #[test]
    fn test_add_days_saturates_at_four_digit_year() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = add_days(start, u32::MAX);
        assert_eq!(end, latest_storable());

        let text = end.to_rfc3339_opts(chrono::SecondsFormat::Micros, true);
        assert_eq!(text, "9999-12-31T23:59:59.999999Z");
        assert!(DateTime::parse_from_rfc3339(&text).is_ok());
    }
}
