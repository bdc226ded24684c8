//! # Day Rollover
//!
//! The daily amount restarts whenever an increment lands on a different
//! calendar day than the previous one. Days are measured in a fixed reference
//! zone so every process agrees on where midnight is, regardless of the host
//! clock's local zone. The default is +03:30 (Tehran, no DST).
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

use crate::models::Daily;

pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 210;

pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// `None` when the offset is outside +-24h.
pub fn reference_zone(offset_minutes: i32) -> Option<FixedOffset> {
    offset_minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
}

pub fn default_zone() -> FixedOffset {
    reference_zone(DEFAULT_UTC_OFFSET_MINUTES).unwrap_or_else(|| Utc.fix())
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn day_of(millis: i64, zone: FixedOffset) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp_millis(millis).map(|time| time.with_timezone(&zone).date_naive())
}

/// Calendar day as stored next to the counter, e.g. `2026-10-18`.
pub fn day_key(millis: i64, zone: FixedOffset) -> String {
    day_of(millis, zone)
        .map(|day| day.format(DAY_KEY_FORMAT).to_string())
        .unwrap_or_default()
}

pub fn same_day(a: i64, b: i64, zone: FixedOffset) -> bool {
    match (day_of(a, zone), day_of(b, zone)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Daily state after adding `amount` at `now`.
pub fn roll(daily: Daily, amount: u64, now: i64, zone: FixedOffset) -> Daily {
    let amount = if same_day(daily.last_update, now, zone) {
        daily.amount.saturating_add(amount)
    } else {
        amount
    };

    Daily {
        amount,
        last_update: now,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn millis(zone: FixedOffset, y: i32, m: u32, d: u32, h: u32, min: u32) -> i64 {
        zone.with_ymd_and_hms(y, m, d, h, min, 0)
            .single()
            .unwrap()
            .timestamp_millis()
    }

    #[test]
    fn accumulates_within_the_same_day() {
        let zone = default_zone();
        let daily = Daily {
            amount: 7,
            last_update: millis(zone, 2026, 10, 18, 0, 5),
        };
        let now = millis(zone, 2026, 10, 18, 23, 59);

        let rolled = roll(daily, 3, now, zone);

        assert_eq!(rolled.amount, 10);
        assert_eq!(rolled.last_update, now);
    }

    #[test]
    fn resets_to_increment_on_next_day() {
        let zone = default_zone();
        let daily = Daily {
            amount: 7,
            last_update: millis(zone, 2026, 10, 18, 23, 59),
        };

        let rolled = roll(daily, 4, millis(zone, 2026, 10, 19, 0, 0), zone);

        assert_eq!(rolled.amount, 4);
    }

    #[test]
    fn midnight_follows_reference_zone_not_utc() {
        let zone = default_zone();
        // 20:00 and 21:00 UTC straddle midnight at +03:30
        let before = Utc.with_ymd_and_hms(2026, 10, 18, 20, 0, 0).unwrap().timestamp_millis();
        let after = Utc.with_ymd_and_hms(2026, 10, 18, 21, 0, 0).unwrap().timestamp_millis();

        assert!(!same_day(before, after, zone));
        assert!(same_day(before, after, Utc.fix()));
    }

    #[test]
    fn never_updated_counter_starts_fresh() {
        let zone = default_zone();
        let rolled = roll(Daily::default(), 1, millis(zone, 2026, 10, 18, 12, 0), zone);

        assert_eq!(rolled.amount, 1);
    }

    #[test]
    fn day_key_is_iso_date_in_zone() {
        let zone = default_zone();

        assert_eq!(day_key(millis(zone, 2026, 1, 2, 0, 30), zone), "2026-01-02");
    }

    #[test]
    fn rejects_out_of_range_offsets() {
        assert!(reference_zone(24 * 60).is_none());
        assert!(reference_zone(-330).is_some());
    }
}
