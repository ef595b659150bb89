//! Streak counting over the set of calendar days that have a check-in.

use chrono::{Duration, NaiveDate};
use std::collections::BTreeSet;

/// Count consecutive days with an entry, walking backward from `today`.
///
/// Returns 0 when `today` itself has no entry. Time of day is irrelevant:
/// callers pass calendar days, duplicates allowed.
pub fn current_streak<I>(days: I, today: NaiveDate) -> u32
where
    I: IntoIterator<Item = NaiveDate>,
{
    let days: BTreeSet<NaiveDate> = days.into_iter().collect();
    let mut streak = 0;
    let mut check = today;
    while days.contains(&check) {
        streak += 1;
        check -= Duration::days(1);
    }
    streak
}

/// Longest run of consecutive calendar days anywhere in `days`
pub fn longest_streak<I>(days: I) -> u32
where
    I: IntoIterator<Item = NaiveDate>,
{
    let days: BTreeSet<NaiveDate> = days.into_iter().collect();
    let mut longest = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;
    for day in days {
        run = match prev {
            Some(p) if day == p + Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(day);
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap() + Duration::days(offset)
    }

    #[test]
    fn contiguous_days_count_back_from_today() {
        let days = vec![day(0), day(0), day(-1), day(-2), day(-4)];
        assert_eq!(current_streak(days, day(0)), 3);
    }

    #[test]
    fn gap_breaks_the_count() {
        assert_eq!(current_streak(vec![day(0), day(-2)], day(0)), 1);
    }

    #[test]
    fn no_entry_today_is_zero() {
        assert_eq!(current_streak(vec![day(-1), day(-2)], day(0)), 0);
        assert_eq!(current_streak(Vec::new(), day(0)), 0);
    }

    #[test]
    fn longest_run_spans_history() {
        let days = vec![day(-10), day(-9), day(-8), day(-7), day(-3), day(0), day(-1)];
        assert_eq!(longest_streak(days), 4);
        assert_eq!(longest_streak(Vec::new()), 0);
    }

    #[test]
    fn runs_cross_month_boundaries() {
        let end_of_feb = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let first_of_march = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(current_streak(vec![end_of_feb, first_of_march], first_of_march), 2);
    }
}
