//! Per-task calendar propagator.
//!
//! Keeps the start, elapsed and overtime variables of one task
//! bound-consistent with its calendar: each axis is narrowed to the
//! tightest values for which some feasible placement exists, given the
//! current bounds of the other axes. Binary calendars without overtime omit
//! the overtime variable entirely.

use crate::host::{Clause, Engine, EventMask, PropagatorId, Propagator, VarId};
use std::sync::Arc;
use tracing::{debug, trace};
use workcal_core::{Calendar, TaskDoms};

pub struct CalendarTaskProp {
    start: VarId,
    elapsed: VarId,
    over: Option<VarId>,
    p: i32,
    cal: Arc<Calendar>,
}

// Bound codes for explanation selection: the updated bound's opposite-side
// literal of the same variable is the only one left out of the tail.
const START_MIN: usize = 0;
const START_MAX: usize = 1;
const ELAPSED_MIN: usize = 2;
const ELAPSED_MAX: usize = 3;
const OVER_MIN: usize = 4;
const OVER_MAX: usize = 5;

impl CalendarTaskProp {
    pub fn new(start: VarId, over: Option<VarId>, elapsed: VarId, p: i32, cal: Arc<Calendar>) -> Self {
        Self { start, elapsed, over, p, cal }
    }

    fn doms(&self, host: &dyn Engine) -> TaskDoms {
        match self.over {
            Some(over) => TaskDoms::new(
                host.min(self.start),
                host.max(self.start),
                host.min(self.elapsed),
                host.max(self.elapsed),
                host.min(over),
                host.max(over),
            ),
            None => TaskDoms::without_over(
                host.min(self.start),
                host.max(self.start),
                host.min(self.elapsed),
                host.max(self.elapsed),
            ),
        }
    }

    fn explain_update(&self, host: &dyn Engine, updated: usize) -> Option<Clause> {
        if !host.lazy_explanations() {
            return None;
        }
        let mut tail = Vec::new();
        if updated != START_MAX {
            tail.push(host.min_lit(self.start));
        }
        if updated != START_MIN {
            tail.push(host.max_lit(self.start));
        }
        if updated != ELAPSED_MAX {
            tail.push(host.min_lit(self.elapsed));
        }
        if updated != ELAPSED_MIN {
            tail.push(host.max_lit(self.elapsed));
        }
        if let Some(over) = self.over {
            if updated != OVER_MAX {
                tail.push(host.min_lit(over));
            }
            if updated != OVER_MIN {
                tail.push(host.max_lit(over));
            }
        }
        Some(Clause::for_update(tail))
    }

    fn submit_conflict(&self, host: &mut dyn Engine) {
        let clause = if host.lazy_explanations() {
            let mut lits = vec![
                host.min_lit(self.start),
                host.max_lit(self.start),
                host.min_lit(self.elapsed),
                host.max_lit(self.elapsed),
            ];
            if let Some(over) = self.over {
                lits.push(host.min_lit(over));
                lits.push(host.max_lit(over));
            }
            Some(Clause::for_conflict(lits))
        } else {
            None
        };
        debug!(p = self.p, "no feasible placement on the calendar");
        host.submit_conflict(clause);
    }

    fn filter_start(&self, host: &mut dyn Engine, new: &mut TaskDoms) -> bool {
        new.min_s = self.cal.bound_start(new, self.p, true);
        if new.min_s == i32::MAX {
            self.submit_conflict(host);
            return false;
        }
        new.max_s = self.cal.bound_start(new, self.p, false);
        debug_assert!(new.max_s != i32::MIN, "min and max queries must agree on feasibility");

        if new.min_s > host.min(self.start) {
            trace!(min_s = new.min_s, "tightening start lower bound");
            let reason = self.explain_update(host, START_MIN);
            if !host.set_min(self.start, new.min_s, reason) {
                return false;
            }
        }
        if new.max_s < host.max(self.start) {
            trace!(max_s = new.max_s, "tightening start upper bound");
            let reason = self.explain_update(host, START_MAX);
            if !host.set_max(self.start, new.max_s, reason) {
                return false;
            }
        }
        true
    }

    fn filter_elapsed(&self, host: &mut dyn Engine, new: &mut TaskDoms) -> bool {
        new.min_e = self.cal.bound_elapsed(new, self.p, true);
        if new.min_e == i32::MAX {
            self.submit_conflict(host);
            return false;
        }
        new.max_e = self.cal.bound_elapsed(new, self.p, false);
        debug_assert!(new.max_e != i32::MIN, "min and max queries must agree on feasibility");

        if new.min_e > host.min(self.elapsed) {
            trace!(min_e = new.min_e, "tightening elapsed lower bound");
            let reason = self.explain_update(host, ELAPSED_MIN);
            if !host.set_min(self.elapsed, new.min_e, reason) {
                return false;
            }
        }
        if new.max_e < host.max(self.elapsed) {
            trace!(max_e = new.max_e, "tightening elapsed upper bound");
            let reason = self.explain_update(host, ELAPSED_MAX);
            if !host.set_max(self.elapsed, new.max_e, reason) {
                return false;
            }
        }
        true
    }

    fn filter_over(&self, host: &mut dyn Engine, new: &mut TaskDoms) -> bool {
        let Some(over) = self.over else {
            return true;
        };
        new.min_o = self.cal.bound_over(new, self.p, true);
        if new.min_o == i32::MAX {
            self.submit_conflict(host);
            return false;
        }
        new.max_o = self.cal.bound_over(new, self.p, false);
        debug_assert!(new.max_o != i32::MIN, "min and max queries must agree on feasibility");

        if new.min_o > host.min(over) {
            trace!(min_o = new.min_o, "tightening overtime lower bound");
            let reason = self.explain_update(host, OVER_MIN);
            if !host.set_min(over, new.min_o, reason) {
                return false;
            }
        }
        if new.max_o < host.max(over) {
            trace!(max_o = new.max_o, "tightening overtime upper bound");
            let reason = self.explain_update(host, OVER_MAX);
            if !host.set_max(over, new.max_o, reason) {
                return false;
            }
        }
        true
    }
}

impl Propagator for CalendarTaskProp {
    fn attach(&self, id: PropagatorId, host: &mut dyn Engine) {
        host.add_watch(self.start, id, 0, EventMask::BOUNDS);
        match self.over {
            Some(over) => {
                host.add_watch(over, id, 1, EventMask::BOUNDS);
                host.add_watch(self.elapsed, id, 2, EventMask::BOUNDS);
            }
            None => host.add_watch(self.elapsed, id, 1, EventMask::BOUNDS),
        }
    }

    fn propagate(&mut self, host: &mut dyn Engine) -> bool {
        // Fixed axis order; each filter sees the bounds the previous one
        // produced, so repeated calls land on the same fixpoint.
        let mut new = self.doms(host);
        if !self.filter_start(host, &mut new) {
            return false;
        }
        if !self.filter_elapsed(host, &mut new) {
            return false;
        }
        if !self.filter_over(host, &mut new) {
            return false;
        }
        true
    }
}
