//! Rotating competition cycle: how many days are left before the next reward payout.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use tracing::warn;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleStatus {
    pub days_passed: i64,
    pub cycle_length: i64,
    pub cycle_offset: i64,
    pub days_remaining: i64,
}

impl CycleStatus {
    /// Zero-based number of the cycle `now` falls into.
    pub fn cycle_index(&self) -> i64 {
        self.days_passed.div_euclid(self.cycle_length)
    }

    /// Last day of the cycle; the ranking at its close decides the rewards.
    pub fn is_final_day(&self) -> bool {
        self.days_remaining == 1
    }

    pub fn label(&self) -> String {
        days_label(self.days_remaining)
    }
}

pub fn cycle_status<Tz: TimeZone>(
    now: &DateTime<Tz>,
    epoch: &DateTime<Tz>,
    cycle_length: u32,
) -> CycleStatus {
    let length = i64::from(cycle_length.max(1));
    let elapsed_ms = now
        .clone()
        .signed_duration_since(epoch.clone())
        .num_milliseconds();
    let days_passed = elapsed_ms.div_euclid(MILLIS_PER_DAY).max(0);
    let cycle_offset = ((days_passed % length) + length) % length;
    let days_remaining = if cycle_offset == 0 {
        length
    } else {
        length - cycle_offset
    };

    CycleStatus {
        days_passed,
        cycle_length: length,
        cycle_offset,
        days_remaining,
    }
}

/// Resolves the configured wall-clock start in the local time zone.
pub fn local_epoch(start: NaiveDateTime) -> DateTime<Local> {
    match Local.from_local_datetime(&start).earliest() {
        Some(epoch) => epoch,
        None => {
            warn!("Cycle start {start} does not exist in local time, reading it as UTC");
            Local.from_utc_datetime(&start)
        }
    }
}

pub fn days_label(days: i64) -> String {
    if days == 1 {
        format!("{days} day")
    } else {
        format!("{days} days")
    }
}

/// First cycle a winner of `won_in_cycle` may compete in again.
pub fn reentry_cycle(won_in_cycle: i64, cooldown_days: u32, cycle_length: u32) -> i64 {
    let length = i64::from(cycle_length.max(1));
    let cooldown = i64::from(cooldown_days);
    let skipped = (cooldown + length - 1) / length;
    won_in_cycle + 1 + skipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset};

    fn epoch() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 10, 1, 0, 0, 0)
            .unwrap()
    }

    fn remaining_after(offset: Duration) -> i64 {
        cycle_status(&(epoch() + offset), &epoch(), 10).days_remaining
    }

    #[test]
    fn full_cycle_on_day_zero() {
        let status = cycle_status(&epoch(), &epoch(), 10);
        assert_eq!(status.days_passed, 0);
        assert_eq!(status.cycle_offset, 0);
        assert_eq!(status.days_remaining, 10);
    }

    #[test]
    fn reference_points() {
        assert_eq!(remaining_after(Duration::days(9)), 1);
        assert_eq!(remaining_after(Duration::days(10)), 10);
        assert_eq!(remaining_after(Duration::days(20)), 10);
        assert_eq!(remaining_after(Duration::days(25)), 5);
        assert_eq!(remaining_after(Duration::days(30)), 10);
    }

    #[test]
    fn partial_days_round_down() {
        assert_eq!(remaining_after(Duration::hours(23)), 10);
        assert_eq!(remaining_after(Duration::hours(24 * 9 + 23)), 1);
        assert_eq!(remaining_after(Duration::hours(24 * 10 - 1)), 1);
    }

    #[test]
    fn before_epoch_clamps_to_full_cycle() {
        let status = cycle_status(&(epoch() - Duration::days(3)), &epoch(), 10);
        assert_eq!(status.days_passed, 0);
        assert_eq!(status.days_remaining, 10);
        assert_eq!(remaining_after(-Duration::minutes(1)), 10);
    }

    #[test]
    fn remaining_always_within_cycle() {
        for hours in 0..(24 * 95) {
            let remaining = remaining_after(Duration::hours(hours));
            assert!((1..=10).contains(&remaining), "hours={hours} remaining={remaining}");
        }
    }

    #[test]
    fn final_day_flag_and_cycle_index() {
        let status = cycle_status(&(epoch() + Duration::days(19)), &epoch(), 10);
        assert!(status.is_final_day());
        assert_eq!(status.cycle_index(), 1);

        let status = cycle_status(&(epoch() + Duration::days(20)), &epoch(), 10);
        assert!(!status.is_final_day());
        assert_eq!(status.cycle_index(), 2);
    }

    #[test]
    fn labels_pluralize() {
        assert_eq!(days_label(1), "1 day");
        assert_eq!(days_label(5), "5 days");
        assert_eq!(days_label(10), "10 days");
        let status = cycle_status(&(epoch() + Duration::days(9)), &epoch(), 10);
        assert_eq!(status.label(), "1 day");
    }

    #[test]
    fn zero_length_is_treated_as_one_day_cycles() {
        let status = cycle_status(&(epoch() + Duration::days(4)), &epoch(), 0);
        assert_eq!(status.days_remaining, 1);
    }

    #[test]
    fn winner_cooldown_skips_whole_cycles() {
        assert_eq!(reentry_cycle(0, 20, 10), 3);
        assert_eq!(reentry_cycle(2, 15, 10), 5);
        assert_eq!(reentry_cycle(4, 0, 10), 5);
    }

    #[test]
    fn local_epoch_keeps_wall_clock() {
        let start = chrono::NaiveDate::from_ymd_opt(2025, 10, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(local_epoch(start).naive_local(), start);
    }
}
