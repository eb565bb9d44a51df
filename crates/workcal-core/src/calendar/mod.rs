//! Working-time calendars and their bound queries.
//!
//! A calendar is an immutable vector of unit codes with prefix tables built
//! once at construction. Three flavors exist:
//!
//! - [`NoOverCalendar`] — binary codes, overtime pinned to zero
//! - [`DayCalendar`] — binary codes, overtime buys work on non-working days
//! - [`HourCalendar`] — ternary codes with tagged overtime hours and the
//!   head-and-tail endpoint rule
//!
//! The [`Calendar`] enum dispatches every query to its flavor;
//! [`CalendarPool`] interns calendars by their code vector so tasks that
//! follow the same working pattern share one object.

mod day;
mod hour;
mod no_over;
mod prefix;

pub use day::DayCalendar;
pub use hour::HourCalendar;
pub use no_over::NoOverCalendar;

use crate::TaskDoms;
use prefix::PrefixMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Classification of calendar units a query may count against.
///
/// Binary flavors track a single class, so `Regular` and `Any` coincide
/// there and `Overtime` matches nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeType {
    Regular,
    Overtime,
    Any,
}

/// A working-time calendar of one of the three flavors.
#[derive(Debug, Clone)]
pub enum Calendar {
    NoOver(NoOverCalendar),
    Day(DayCalendar),
    Hour(HourCalendar),
}

impl Calendar {
    /// Calendar length L.
    pub fn size(&self) -> i32 {
        match self {
            Calendar::NoOver(c) => c.work.len(),
            Calendar::Day(c) => c.work.len(),
            Calendar::Hour(c) => c.all.len(),
        }
    }

    /// Table for `tt`, or `None` when the flavor does not track it.
    fn table(&self, tt: TimeType) -> Option<&PrefixMap> {
        match self {
            Calendar::NoOver(c) => match tt {
                TimeType::Overtime => None,
                _ => Some(&c.work),
            },
            Calendar::Day(c) => match tt {
                TimeType::Overtime => None,
                _ => Some(&c.work),
            },
            Calendar::Hour(c) => Some(match tt {
                TimeType::Regular => &c.regular,
                TimeType::Overtime => &c.overtime,
                TimeType::Any => &c.all,
            }),
        }
    }

    pub fn workable(&self, time: i32, tt: TimeType) -> bool {
        self.table(tt).is_some_and(|m| m.workable(time))
    }

    /// Smallest workable `u >= time`, or `L + 1` when none remains.
    pub fn next_workable(&self, time: i32, tt: TimeType) -> i32 {
        self.table(tt).map_or(self.size() + 1, |m| m.next_workable(time))
    }

    /// Largest workable `u <= time`, or `-1` when none precedes.
    pub fn previous_workable(&self, time: i32, tt: TimeType) -> i32 {
        self.table(tt).map_or(-1, |m| m.previous_workable(time))
    }

    /// Units of type `tt` in `[begin, end)`, clamped to the calendar.
    pub fn count_time(&self, begin: i32, end: i32, tt: TimeType) -> i32 {
        self.table(tt).map_or(0, |m| m.count(begin, end))
    }

    /// Smallest `e` with `count_time(start, e, tt) == working`; `start` for
    /// non-positive amounts, `L + 1` when the units run out.
    pub fn get_end(&self, start: i32, working: i32, tt: TimeType) -> i32 {
        match self.table(tt) {
            Some(m) => m.get_end(start, working),
            None => {
                if working <= 0 {
                    start
                } else {
                    self.size() + 1
                }
            }
        }
    }

    /// Largest `s` with `count_time(s, end, tt) == working`; `end` for
    /// non-positive amounts, `-1` when the units run out. Not defined for
    /// overtime units.
    pub fn get_start(&self, end: i32, working: i32, tt: TimeType) -> i32 {
        assert!(tt != TimeType::Overtime, "get_start is not defined on overtime units");
        match self.table(tt) {
            Some(m) => m.get_start(end, working),
            None => {
                if working <= 0 {
                    end
                } else {
                    -1
                }
            }
        }
    }

    /// Tightest feasible start. `i32::MAX` / `i32::MIN` when no placement
    /// exists (min and max queries always agree on feasibility).
    pub fn bound_start(&self, doms: &TaskDoms, p: i32, min: bool) -> i32 {
        match self {
            Calendar::NoOver(c) => c.bound_start(doms, p, min),
            Calendar::Day(c) => c.bound_start(doms, p, min),
            Calendar::Hour(c) => c.bound_start(doms, p, min),
        }
    }

    /// Tightest feasible elapsed span.
    pub fn bound_elapsed(&self, doms: &TaskDoms, p: i32, min: bool) -> i32 {
        match self {
            Calendar::NoOver(c) => c.bound_elapsed(doms, p, min),
            Calendar::Day(c) => c.bound_elapsed(doms, p, min),
            Calendar::Hour(c) => c.bound_elapsed(doms, p, min),
        }
    }

    /// Tightest feasible overtime quantity.
    pub fn bound_over(&self, doms: &TaskDoms, p: i32, min: bool) -> i32 {
        match self {
            Calendar::NoOver(c) => c.bound_over(doms, p, min),
            Calendar::Day(c) => c.bound_over(doms, p, min),
            Calendar::Hour(c) => c.bound_over(doms, p, min),
        }
    }

    /// Latest feasible start completing by `lct`, or `i32::MIN`.
    pub fn lst(&self, lct: i32, doms: &TaskDoms, p: i32) -> i32 {
        match self {
            Calendar::NoOver(c) => c.lst(lct, doms, p),
            Calendar::Day(c) => c.lst(lct, doms, p),
            Calendar::Hour(c) => c.lst(lct, doms, p),
        }
    }

    /// Earliest feasible completion starting at or after `est`, or
    /// `i32::MAX`.
    pub fn ect(&self, est: i32, doms: &TaskDoms, p: i32) -> i32 {
        match self {
            Calendar::NoOver(c) => c.ect(est, doms, p),
            Calendar::Day(c) => c.ect(est, doms, p),
            Calendar::Hour(c) => c.ect(est, doms, p),
        }
    }
}

/// Interning registry for calendars, keyed by flavor and code vector.
///
/// Tasks following the same working pattern share one `Arc<Calendar>`; the
/// pool owns the storage for the lifetime of a solver run.
#[derive(Debug, Default)]
pub struct CalendarPool {
    no_over: HashMap<Vec<i32>, Arc<Calendar>>,
    day: HashMap<Vec<i32>, Arc<Calendar>>,
    hour: HashMap<Vec<i32>, Arc<Calendar>>,
}

impl CalendarPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_over(&mut self, codes: &[i32]) -> Arc<Calendar> {
        self.no_over
            .entry(codes.to_vec())
            .or_insert_with(|| Arc::new(Calendar::NoOver(NoOverCalendar::new(codes))))
            .clone()
    }

    pub fn day(&mut self, codes: &[i32]) -> Arc<Calendar> {
        self.day
            .entry(codes.to_vec())
            .or_insert_with(|| Arc::new(Calendar::Day(DayCalendar::new(codes))))
            .clone()
    }

    pub fn hour(&mut self, codes: &[i32]) -> Arc<Calendar> {
        self.hour
            .entry(codes.to_vec())
            .or_insert_with(|| Arc::new(Calendar::Hour(HourCalendar::new(codes))))
            .clone()
    }
}
