//! Compiles date-based working-time definitions into calendar vectors.
//!
//! Hosts rarely want to hand-write per-unit code vectors. A [`CalendarDef`]
//! describes a span of dates with a weekly working pattern and holidays;
//! [`CalendarDef::compile_days`] renders one code per day for the binary
//! flavors, and [`CalendarDef::compile_hours`] renders one code per hour for
//! the ternary flavor, with regular and overtime hour ranges per working
//! day.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Weekly working pattern. Days use chrono's days-from-Sunday numbering
/// (0 = Sunday, 6 = Saturday).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WeekPattern {
    pub working_days: Vec<u8>,
}

impl Default for WeekPattern {
    fn default() -> Self {
        Self { working_days: vec![1, 2, 3, 4, 5] } // Mon-Fri
    }
}

impl WeekPattern {
    pub fn is_working(&self, date: NaiveDate) -> bool {
        let weekday = date.weekday().num_days_from_sunday() as u8;
        self.working_days.contains(&weekday)
    }
}

/// Holiday spanning `start..=end`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Holiday {
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Holiday {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Half-open hour range within a working day, `start < end <= hours_per_day`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourRange {
    pub start: u8,
    pub end: u8,
}

impl HourRange {
    fn contains(&self, hour: u8) -> bool {
        hour >= self.start && hour < self.end
    }

    fn overlaps(&self, other: &HourRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Hour layout of a working day: how many units the day compiles to, and
/// which of them are regular or overtime.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DayHours {
    pub hours_per_day: u8,
    pub regular: Vec<HourRange>,
    pub overtime: Vec<HourRange>,
}

impl Default for DayHours {
    fn default() -> Self {
        Self {
            hours_per_day: 10,
            regular: vec![HourRange { start: 0, end: 8 }],
            overtime: vec![HourRange { start: 8, end: 10 }],
        }
    }
}

/// A span of dates with a weekly pattern and holidays.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CalendarDef {
    pub start: NaiveDate,
    pub days: u32,
    pub week: WeekPattern,
    pub holidays: Vec<Holiday>,
}

/// Invalid working-time definitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("calendar span is empty")]
    EmptySpan,

    #[error("weekly pattern has no working day")]
    NoWorkingDays,

    #[error("weekday {0} is out of range (0 = Sunday .. 6 = Saturday)")]
    InvalidWeekday(u8),

    #[error("hour range {start}..{end} is invalid for a {hours_per_day}-hour day")]
    InvalidHourRange { start: u8, end: u8, hours_per_day: u8 },

    #[error("regular and overtime hour ranges overlap at {start}..{end}")]
    OverlappingHourRanges { start: u8, end: u8 },

    #[error("calendar span overflows the supported date range")]
    SpanOutOfRange,
}

impl CalendarDef {
    pub fn new(start: NaiveDate, days: u32) -> Self {
        Self { start, days, week: WeekPattern::default(), holidays: Vec::new() }
    }

    pub fn week(mut self, week: WeekPattern) -> Self {
        self.week = week;
        self
    }

    pub fn holiday(mut self, holiday: Holiday) -> Self {
        self.holidays.push(holiday);
        self
    }

    fn validate(&self) -> Result<(), BuildError> {
        if self.days == 0 {
            return Err(BuildError::EmptySpan);
        }
        if self.week.working_days.is_empty() {
            return Err(BuildError::NoWorkingDays);
        }
        if let Some(&bad) = self.week.working_days.iter().find(|&&d| d > 6) {
            return Err(BuildError::InvalidWeekday(bad));
        }
        Ok(())
    }

    fn is_working_day(&self, date: NaiveDate) -> bool {
        self.week.is_working(date) && !self.holidays.iter().any(|h| h.contains(date))
    }

    /// One code per day: `1` on working days, `0` on weekends and holidays.
    pub fn compile_days(&self) -> Result<Vec<i32>, BuildError> {
        self.validate()?;
        let mut codes = Vec::with_capacity(self.days as usize);
        for offset in 0..self.days {
            let date = self
                .start
                .checked_add_days(Days::new(u64::from(offset)))
                .ok_or(BuildError::SpanOutOfRange)?;
            codes.push(i32::from(self.is_working_day(date)));
        }
        Ok(codes)
    }

    /// `hours_per_day` codes per day: `1` in regular ranges, `2` in
    /// overtime ranges, `0` elsewhere; non-working days are all zero.
    pub fn compile_hours(&self, hours: &DayHours) -> Result<Vec<i32>, BuildError> {
        self.validate()?;
        if hours.hours_per_day == 0 {
            return Err(BuildError::EmptySpan);
        }
        for range in hours.regular.iter().chain(&hours.overtime) {
            if range.start >= range.end || range.end > hours.hours_per_day {
                return Err(BuildError::InvalidHourRange {
                    start: range.start,
                    end: range.end,
                    hours_per_day: hours.hours_per_day,
                });
            }
        }
        for reg in &hours.regular {
            if let Some(ovr) = hours.overtime.iter().find(|o| o.overlaps(reg)) {
                return Err(BuildError::OverlappingHourRanges {
                    start: reg.start.max(ovr.start),
                    end: reg.end.min(ovr.end),
                });
            }
        }

        let mut codes = Vec::with_capacity(self.days as usize * hours.hours_per_day as usize);
        for offset in 0..self.days {
            let date = self
                .start
                .checked_add_days(Days::new(u64::from(offset)))
                .ok_or(BuildError::SpanOutOfRange)?;
            let working = self.is_working_day(date);
            for hour in 0..hours.hours_per_day {
                let code = if !working {
                    0
                } else if hours.regular.iter().any(|r| r.contains(hour)) {
                    1
                } else if hours.overtime.iter().any(|r| r.contains(hour)) {
                    2
                } else {
                    0
                };
                codes.push(code);
            }
        }
        Ok(codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
    }

    #[test]
    fn week_of_days_compiles_weekend_gap() {
        let codes = CalendarDef::new(monday(), 9).compile_days().unwrap();
        // Mon..Fri working, Sat/Sun off, Mon/Tue working
        assert_eq!(codes, vec![1, 1, 1, 1, 1, 0, 0, 1, 1]);
    }

    #[test]
    fn holiday_blanks_working_days() {
        let def = CalendarDef::new(monday(), 5).holiday(Holiday {
            name: "maintenance".into(),
            start: NaiveDate::from_ymd_opt(2025, 1, 7).unwrap(),
            end: NaiveDate::from_ymd_opt(2025, 1, 8).unwrap(),
        });
        assert_eq!(def.compile_days().unwrap(), vec![1, 0, 0, 1, 1]);
    }

    #[test]
    fn custom_week_pattern() {
        let def = CalendarDef::new(monday(), 7).week(WeekPattern { working_days: vec![6, 0] });
        // only Saturday and Sunday work
        assert_eq!(def.compile_days().unwrap(), vec![0, 0, 0, 0, 0, 1, 1]);
    }

    #[test]
    fn hours_tag_regular_and_overtime() {
        let def = CalendarDef::new(monday(), 2);
        let hours = DayHours {
            hours_per_day: 4,
            regular: vec![HourRange { start: 0, end: 2 }],
            overtime: vec![HourRange { start: 3, end: 4 }],
        };
        assert_eq!(def.compile_hours(&hours).unwrap(), vec![1, 1, 0, 2, 1, 1, 0, 2]);
    }

    #[test]
    fn non_working_day_compiles_to_zero_hours() {
        let saturday = NaiveDate::from_ymd_opt(2025, 1, 11).unwrap();
        let def = CalendarDef::new(saturday, 1);
        let hours = DayHours {
            hours_per_day: 3,
            regular: vec![HourRange { start: 0, end: 3 }],
            overtime: vec![],
        };
        assert_eq!(def.compile_hours(&hours).unwrap(), vec![0, 0, 0]);
    }

    #[test]
    fn rejects_empty_span_and_bad_weekdays() {
        assert_eq!(CalendarDef::new(monday(), 0).compile_days(), Err(BuildError::EmptySpan));
        let def = CalendarDef::new(monday(), 3).week(WeekPattern { working_days: vec![7] });
        assert_eq!(def.compile_days(), Err(BuildError::InvalidWeekday(7)));
        let def = CalendarDef::new(monday(), 3).week(WeekPattern { working_days: vec![] });
        assert_eq!(def.compile_days(), Err(BuildError::NoWorkingDays));
    }

    #[test]
    fn rejects_overlapping_hour_ranges() {
        let def = CalendarDef::new(monday(), 1);
        let hours = DayHours {
            hours_per_day: 8,
            regular: vec![HourRange { start: 0, end: 5 }],
            overtime: vec![HourRange { start: 4, end: 6 }],
        };
        assert_eq!(
            def.compile_hours(&hours),
            Err(BuildError::OverlappingHourRanges { start: 4, end: 5 })
        );
    }

    #[test]
    fn rejects_out_of_day_hour_range() {
        let def = CalendarDef::new(monday(), 1);
        let hours = DayHours {
            hours_per_day: 4,
            regular: vec![HourRange { start: 2, end: 6 }],
            overtime: vec![],
        };
        assert!(matches!(def.compile_hours(&hours), Err(BuildError::InvalidHourRange { .. })));
    }

    #[test]
    fn compiled_days_feed_the_pool() {
        use crate::{CalendarPool, TaskDoms};

        let codes = CalendarDef::new(monday(), 9).compile_days().unwrap();
        let mut pool = CalendarPool::new();
        let cal = pool.no_over(&codes);
        let doms = TaskDoms::without_over(0, 8, 0, 9);
        // 6 working days: latest start of a 2-day run is the final Monday
        assert_eq!(cal.bound_start(&doms, 2, false), 7);
    }
}
