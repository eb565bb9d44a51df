//! # workcal-solver
//!
//! Calendar and cumulative-calendar propagators for working-time
//! scheduling.
//!
//! This crate provides:
//! - The host interface ([`host::Engine`], [`host::Propagator`]) through
//!   which propagators read and write variable bounds and emit clauses
//! - Per-task calendar propagators keeping one task's start, elapsed and
//!   overtime variables bound-consistent with its calendar
//! - A time-table cumulative propagator over calendar-corrected compulsory
//!   parts, with lazy-clause-generation explanations
//! - A reversible sparse set backed by the host trail
//! - A reference host ([`testing::TestEngine`]) driving propagation to a
//!   fixpoint in tests
//!
//! ## Example
//!
//! ```rust
//! use workcal_core::CalendarPool;
//! use workcal_solver::calendar_day;
//! use workcal_solver::testing::TestEngine;
//!
//! let mut host = TestEngine::new();
//! let mut pool = CalendarPool::new();
//! let start = host.new_var(0, 6);
//! let over = host.new_var(0, 2);
//! let elapsed = host.new_var(4, 7);
//!
//! let prop = calendar_day(&mut host, &mut pool, start, over, elapsed, 4,
//!                         &[1, 1, 0, 0, 1, 1, 1]);
//! host.register(Box::new(prop));
//! assert!(host.run_to_fixpoint());
//! assert_eq!(host.bounds(start), (0, 1));
//! ```

pub mod cumulative;
pub mod host;
pub mod rev_set;
pub mod task_prop;
pub mod testing;

pub use cumulative::CumulativeCalendarProp;
pub use rev_set::ReversibleSparseSet;
pub use task_prop::CalendarTaskProp;

use host::{Engine, VarId};
use std::sync::Arc;
use workcal_core::{Calendar, CalendarPool};

fn assert_task_shape(host: &dyn Engine, start: VarId, elapsed: VarId, p: i32, len: usize) {
    assert!(p >= 0, "working amount must be non-negative");
    assert!((p as usize) < len, "working amount must fit the calendar");
    assert!(host.min(start) >= 0, "start must be non-negative");
    assert!((host.max(start) as usize) < len, "start must lie on the calendar");
    assert!(host.min(elapsed) >= 0, "elapsed must be non-negative");
    assert!(host.max(elapsed) as usize <= len, "elapsed cannot exceed the calendar");
}

/// Per-task propagator on a binary calendar with overtime pinned to zero.
pub fn calendar_no_over(
    host: &mut dyn Engine,
    pool: &mut CalendarPool,
    start: VarId,
    elapsed: VarId,
    p: i32,
    calendar: &[i32],
) -> CalendarTaskProp {
    assert_task_shape(host, start, elapsed, p, calendar.len());
    CalendarTaskProp::new(start, None, elapsed, p, pool.no_over(calendar))
}

/// Per-task propagator on a binary calendar where overtime buys work on
/// non-working days.
pub fn calendar_day(
    host: &mut dyn Engine,
    pool: &mut CalendarPool,
    start: VarId,
    over: VarId,
    elapsed: VarId,
    p: i32,
    calendar: &[i32],
) -> CalendarTaskProp {
    assert_task_shape(host, start, elapsed, p, calendar.len());
    assert!(host.min(over) >= 0, "overtime must be non-negative");
    assert!(host.max(over) <= p, "overtime cannot exceed the working amount");
    CalendarTaskProp::new(start, Some(over), elapsed, p, pool.day(calendar))
}

/// Per-task propagator on a ternary calendar with tagged overtime hours.
pub fn calendar_hour(
    host: &mut dyn Engine,
    pool: &mut CalendarPool,
    start: VarId,
    over: VarId,
    elapsed: VarId,
    p: i32,
    calendar: &[i32],
) -> CalendarTaskProp {
    assert_task_shape(host, start, elapsed, p, calendar.len());
    assert!(host.min(over) >= 0, "overtime must be non-negative");
    assert!(host.max(over) <= p, "overtime cannot exceed the working amount");
    CalendarTaskProp::new(start, Some(over), elapsed, p, pool.hour(calendar))
}

fn assert_cumulative_shape(
    host: &dyn Engine,
    start: &[VarId],
    over: &[VarId],
    elapsed: &[VarId],
    dur: &[i32],
    usage: &[i32],
    calendars: &[Vec<i32>],
    cals_followed: &[i32],
) {
    let n = start.len();
    assert_eq!(n, over.len(), "task vectors must share one length");
    assert_eq!(n, elapsed.len(), "task vectors must share one length");
    assert_eq!(n, dur.len(), "task vectors must share one length");
    assert_eq!(n, usage.len(), "task vectors must share one length");
    assert_eq!(n, cals_followed.len(), "task vectors must share one length");
    for i in 0..n {
        assert!(host.min(over[i]) >= 0, "overtime must be non-negative");
        assert!(dur[i] >= 0, "duration must be non-negative");
        assert!(usage[i] >= 0, "usage must be non-negative");
        assert!(host.min(elapsed[i]) >= 0, "elapsed must be non-negative");
        assert!(cals_followed[i] >= -1, "calendar reference out of range");
        if cals_followed[i] >= 0 {
            assert!(
                (cals_followed[i] as usize) < calendars.len(),
                "calendar reference out of range"
            );
        }
    }
    for pair in calendars.windows(2) {
        assert_eq!(pair[0].len(), pair[1].len(), "calendars must share one length");
    }
}

fn build_cals(
    pool: &mut CalendarPool,
    calendars: &[Vec<i32>],
    cals_followed: &[i32],
    hour: bool,
) -> Vec<Option<Arc<Calendar>>> {
    cals_followed
        .iter()
        .map(|&followed| {
            if followed == -1 {
                None
            } else {
                let codes = &calendars[followed as usize];
                Some(if hour { pool.hour(codes) } else { pool.day(codes) })
            }
        })
        .collect()
}

/// Cumulative resource constraint over tasks following binary calendars.
/// `cals_followed[i] == -1` leaves task i uncorrected.
pub fn cumulative_calendar_day(
    host: &mut dyn Engine,
    pool: &mut CalendarPool,
    start: &[VarId],
    over: &[VarId],
    elapsed: &[VarId],
    dur: &[i32],
    usage: &[i32],
    limit: i32,
    calendars: &[Vec<i32>],
    cals_followed: &[i32],
) -> CumulativeCalendarProp {
    assert_cumulative_shape(host, start, over, elapsed, dur, usage, calendars, cals_followed);
    for cal in calendars {
        for &code in cal {
            assert!(code == 0 || code == 1, "day calendar entries must be 0 or 1");
        }
    }
    let cals = build_cals(pool, calendars, cals_followed, false);
    CumulativeCalendarProp::new(
        host,
        start.to_vec(),
        over.to_vec(),
        elapsed.to_vec(),
        dur.to_vec(),
        usage.to_vec(),
        limit,
        cals,
    )
}

/// Cumulative resource constraint over tasks following ternary calendars.
pub fn cumulative_calendar_hour(
    host: &mut dyn Engine,
    pool: &mut CalendarPool,
    start: &[VarId],
    over: &[VarId],
    elapsed: &[VarId],
    dur: &[i32],
    usage: &[i32],
    limit: i32,
    calendars: &[Vec<i32>],
    cals_followed: &[i32],
) -> CumulativeCalendarProp {
    assert_cumulative_shape(host, start, over, elapsed, dur, usage, calendars, cals_followed);
    for cal in calendars {
        for &code in cal {
            assert!((0..=2).contains(&code), "hour calendar entries must be 0, 1 or 2");
        }
    }
    let cals = build_cals(pool, calendars, cals_followed, true);
    CumulativeCalendarProp::new(
        host,
        start.to_vec(),
        over.to_vec(),
        elapsed.to_vec(),
        dur.to_vec(),
        usage.to_vec(),
        limit,
        cals,
    )
}
