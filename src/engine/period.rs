use chrono::{Datelike, Duration, Local, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::models::config::GoalPeriod;

/// Calendar window a goal or tally is evaluated over.
/// `start` is inclusive, `end` is the exclusive start of the next window,
/// so the whole last day is covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodWindow {
    pub period: GoalPeriod,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl PeriodWindow {
    /// The week (Sunday through Saturday) or calendar month containing `now`.
    pub fn containing(period: GoalPeriod, now: NaiveDateTime) -> Self {
        let today = now.date();
        let (start_date, end_date) = match period {
            GoalPeriod::Weekly => {
                let offset = today.weekday().num_days_from_sunday() as i64;
                let start = today - Duration::days(offset);
                (start, start + Duration::days(7))
            }
            GoalPeriod::Monthly => {
                let start = first_of_month(today);
                (start, start + Months::new(1))
            }
        };
        PeriodWindow {
            period,
            start: start_date.and_time(NaiveTime::MIN),
            end: end_date.and_time(NaiveTime::MIN),
        }
    }

    /// Window containing the current local time. Recomputed on every call.
    pub fn current(period: GoalPeriod) -> Self {
        Self::containing(period, Local::now().naive_local())
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        ts >= self.start && ts < self.end
    }

    /// Last calendar day covered by the window.
    pub fn last_day(&self) -> NaiveDate {
        (self.end - Duration::days(1)).date()
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.day0() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_week_starts_on_sunday() {
        // 2024-03-13 is a Wednesday
        let w = PeriodWindow::containing(GoalPeriod::Weekly, at(2024, 3, 13, 14, 30));
        assert_eq!(w.start, at(2024, 3, 10, 0, 0));
        assert_eq!(w.end, at(2024, 3, 17, 0, 0));
        assert_eq!(w.last_day(), NaiveDate::from_ymd_opt(2024, 3, 16).unwrap());
    }

    #[test]
    fn test_week_on_sunday_and_saturday() {
        let sunday = PeriodWindow::containing(GoalPeriod::Weekly, at(2024, 3, 10, 0, 0));
        assert_eq!(sunday.start, at(2024, 3, 10, 0, 0));
        let saturday = PeriodWindow::containing(GoalPeriod::Weekly, at(2024, 3, 16, 23, 59));
        assert_eq!(saturday.start, at(2024, 3, 10, 0, 0));
    }

    #[test]
    fn test_week_across_month_boundary() {
        // 2024-05-01 is a Wednesday; the week began in April.
        let w = PeriodWindow::containing(GoalPeriod::Weekly, at(2024, 5, 1, 8, 0));
        assert_eq!(w.start, at(2024, 4, 28, 0, 0));
        assert_eq!(w.end, at(2024, 5, 5, 0, 0));
    }

    #[test]
    fn test_month_window() {
        let w = PeriodWindow::containing(GoalPeriod::Monthly, at(2024, 2, 15, 12, 0));
        assert_eq!(w.start, at(2024, 2, 1, 0, 0));
        assert_eq!(w.end, at(2024, 3, 1, 0, 0));
        assert_eq!(w.last_day(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let dec = PeriodWindow::containing(GoalPeriod::Monthly, at(2023, 12, 31, 23, 0));
        assert_eq!(dec.start, at(2023, 12, 1, 0, 0));
        assert_eq!(dec.end, at(2024, 1, 1, 0, 0));
    }

    #[test]
    fn test_contains_whole_last_day() {
        let w = PeriodWindow::containing(GoalPeriod::Monthly, at(2024, 4, 10, 0, 0));
        assert!(w.contains(at(2024, 4, 1, 0, 0)));
        assert!(w.contains(at(2024, 4, 30, 23, 59)));
        assert!(!w.contains(at(2024, 5, 1, 0, 0)));
        assert!(!w.contains(at(2024, 3, 31, 23, 59)));
    }

    #[test]
    fn test_current_week_spans_seven_days() {
        let w = PeriodWindow::current(GoalPeriod::Weekly);
        assert_eq!(w.end - w.start, Duration::days(7));
        assert_eq!(w.start.weekday(), chrono::Weekday::Sun);
    }
}
