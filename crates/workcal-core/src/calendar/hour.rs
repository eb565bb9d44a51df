//! Ternary calendar distinguishing regular from overtime hours.
//!
//! A placement `[s, e)` works every regular hour it contains; the remaining
//! working amount is overtime. The window's endpoints must be worked, so an
//! endpoint sitting on an overtime hour claims one unit of the overtime
//! budget `p - count(s, e, regular)` — the head-and-tail constraint.

use super::prefix::PrefixMap;
use crate::TaskDoms;

#[derive(Debug, Clone)]
pub struct HourCalendar {
    pub(crate) regular: PrefixMap,
    pub(crate) overtime: PrefixMap,
    pub(crate) all: PrefixMap,
}

impl HourCalendar {
    pub(crate) fn new(codes: &[i32]) -> Self {
        assert!(!codes.is_empty(), "calendar must have at least one unit");
        for &code in codes {
            assert!((0..=2).contains(&code), "hour calendar entries must be 0, 1 or 2");
        }
        Self {
            regular: PrefixMap::build(codes, |c| c == 1),
            overtime: PrefixMap::build(codes, |c| c == 2),
            all: PrefixMap::build(codes, |c| c >= 1),
        }
    }

    fn len(&self) -> i32 {
        self.all.len()
    }

    fn is_over(&self, t: i32) -> bool {
        self.overtime.workable(t)
    }

    /// Overtime claimed by the window's endpoints must fit the budget left
    /// after the regular hours are accounted for.
    fn verify_head_and_tail(&self, start: i32, end: i32, p: i32) -> bool {
        if end <= start {
            return true;
        }
        let budget = p - self.regular.count(start, end);
        let mut needed = 0;
        if self.is_over(start) {
            needed += 1;
        }
        if end - 1 != start && self.is_over(end - 1) {
            needed += 1;
        }
        needed <= budget
    }

    /// Smallest end for a placement at `start` honoring the elapsed floor
    /// and the overtime cap. A head/tail violation may be repaired by
    /// covering one more regular hour.
    fn get_min_end(&self, start: i32, min_e: i32, max_o: i32, p: i32) -> i32 {
        let mut end = self.all.next_workable(start + min_e - 1) + 1;
        if self.regular.count(start, end) < p - max_o {
            end = self.regular.get_end(start, p - max_o);
        }
        if end <= self.len() && !self.verify_head_and_tail(start, end, p) {
            let extended = self.regular.get_end(end, 1);
            if extended <= self.len() && self.verify_head_and_tail(start, extended, p) {
                end = extended;
            }
        }
        end
    }

    /// Largest end for a placement at `start` honoring the elapsed cap and
    /// the overtime floor. A head/tail violation sheds the overtime tail,
    /// except for a unit task trapped in a single workable block.
    fn get_max_end(&self, start: i32, max_e: i32, min_o: i32, p: i32) -> i32 {
        let cap = self.len().min(start.saturating_add(max_e));
        let mut end = self.all.previous_workable(cap - 1) + 1;
        if self.regular.count(start, end) > p - min_o {
            end = self.regular.get_end(start, p - min_o);
        }
        if end > start
            && end <= self.len()
            && !self.verify_head_and_tail(start, end, p)
            && self.is_over(end - 1)
        {
            let same_block = self.all.count(start, end) == end - start;
            if !(p == 1 && same_block) {
                end = self.all.previous_workable(end - 2) + 1;
            }
        }
        end
    }

    fn feasible_min_end(&self, doms: &TaskDoms, p: i32, start: i32) -> Option<i32> {
        let end = self.get_min_end(start, doms.min_e, doms.max_o, p);
        (end <= self.len()
            && end - start <= doms.max_e
            && self.regular.count(start, end) <= p - doms.min_o
            && self.verify_head_and_tail(start, end, p))
            .then_some(end)
    }

    fn feasible_max_end(&self, doms: &TaskDoms, p: i32, start: i32) -> Option<i32> {
        let end = self.get_max_end(start, doms.max_e, doms.min_o, p);
        (end <= self.len()
            && end - start >= doms.min_e
            && self.regular.count(start, end) >= p - doms.max_o
            && self.regular.count(start, end) <= p - doms.min_o
            && self.verify_head_and_tail(start, end, p))
            .then_some(end)
    }

    pub fn bound_start(&self, doms: &TaskDoms, p: i32, min: bool) -> i32 {
        if min {
            let mut s = self.all.next_workable(doms.min_s);
            while s <= doms.max_s {
                let end = self.get_min_end(s, doms.min_e, doms.max_o, p);
                if end > self.len() {
                    break;
                }
                if end - s <= doms.max_e
                    && self.regular.count(s, end) <= p - doms.min_o
                    && self.verify_head_and_tail(s, end, p)
                {
                    return s;
                }
                s = self.all.next_workable(s + 1);
            }
            i32::MAX
        } else {
            let mut s = self.all.previous_workable(doms.max_s.min(self.len() - 1));
            while s >= doms.min_s.max(0) {
                if self.feasible_min_end(doms, p, s).is_some() {
                    return s;
                }
                s = self.all.previous_workable(s - 1);
            }
            i32::MIN
        }
    }

    pub fn bound_elapsed(&self, doms: &TaskDoms, p: i32, min: bool) -> i32 {
        let mut best = if min { i32::MAX } else { i32::MIN };
        let mut s = self.all.next_workable(doms.min_s);
        while s <= doms.max_s {
            if min {
                let end = self.get_min_end(s, doms.min_e, doms.max_o, p);
                if end > self.len() {
                    break;
                }
                if end - s <= doms.max_e
                    && self.regular.count(s, end) <= p - doms.min_o
                    && self.verify_head_and_tail(s, end, p)
                {
                    best = best.min(end - s);
                    if best == doms.min_e {
                        return best;
                    }
                }
            } else if let Some(end) = self.feasible_max_end(doms, p, s) {
                best = best.max(end - s);
                if best == doms.max_e {
                    return best;
                }
            }
            s = self.all.next_workable(s + 1);
        }
        best
    }

    pub fn bound_over(&self, doms: &TaskDoms, p: i32, min: bool) -> i32 {
        let mut best = if min { i32::MAX } else { i32::MIN };
        let mut s = self.all.next_workable(doms.min_s);
        while s <= doms.max_s {
            if min {
                if let Some(end) = self.feasible_max_end(doms, p, s) {
                    best = best.min(p - self.regular.count(s, end));
                    if best == doms.min_o {
                        return best;
                    }
                }
            } else {
                let end = self.get_min_end(s, doms.min_e, doms.max_o, p);
                if end > self.len() {
                    break;
                }
                if end - s <= doms.max_e
                    && self.regular.count(s, end) <= p - doms.min_o
                    && self.verify_head_and_tail(s, end, p)
                {
                    best = best.max(p - self.regular.count(s, end));
                    if best == doms.max_o {
                        return best;
                    }
                }
            }
            s = self.all.next_workable(s + 1);
        }
        best
    }

    /// Latest feasible start completing by `lct`.
    pub fn lst(&self, lct: i32, doms: &TaskDoms, p: i32) -> i32 {
        let cap = lct.min(self.len());
        let rough = self.regular.get_start(cap, (p - doms.max_o).max(0));
        let mut s = self.all.previous_workable(doms.max_s.min(rough));
        while s >= doms.min_s.max(0) {
            let end = self.get_min_end(s, doms.min_e, doms.max_o, p);
            if end <= cap
                && end - s <= doms.max_e
                && self.regular.count(s, end) <= p - doms.min_o
                && self.verify_head_and_tail(s, end, p)
            {
                return s;
            }
            s = self.all.previous_workable(s - 1);
        }
        i32::MIN
    }

    /// Earliest feasible completion starting at or after `est`.
    pub fn ect(&self, est: i32, doms: &TaskDoms, p: i32) -> i32 {
        let mut s = self.all.next_workable(doms.min_s.max(est));
        while s <= doms.max_s {
            let end = self.get_min_end(s, doms.min_e, doms.max_o, p);
            if end > self.len() {
                break;
            }
            if end - s <= doms.max_e
                && self.regular.count(s, end) <= p - doms.min_o
                && self.verify_head_and_tail(s, end, p)
            {
                return end;
            }
            s = self.all.next_workable(s + 1);
        }
        i32::MAX
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cal() -> HourCalendar {
        HourCalendar::new(&[2, 1, 1, 2])
    }

    #[test]
    fn head_overtime_fits_its_budget() {
        // window [0,2) works one regular hour and its overtime head
        let doms = TaskDoms::new(0, 3, 0, 4, 0, 1);
        assert_eq!(cal().bound_start(&doms, 2, true), 0);
    }

    #[test]
    fn final_overtime_anchor_is_infeasible() {
        // from 3 there is no second workable unit on the calendar
        let doms = TaskDoms::new(0, 3, 0, 4, 0, 1);
        assert_eq!(cal().bound_start(&doms, 2, false), 2);
    }

    #[test]
    fn double_overtime_endpoints_need_two_units() {
        // [0,4) carries head and tail overtime but no budget remains
        let c = cal();
        assert!(!c.verify_head_and_tail(0, 4, 2));
        assert!(c.verify_head_and_tail(0, 4, 4));
        assert!(c.verify_head_and_tail(1, 3, 2));
    }

    #[test]
    fn max_end_sheds_overtime_tail_without_budget() {
        let c = cal();
        // p=2 from 1: both regular hours consume the budget, so the
        // overtime tail at 3 is shed
        assert_eq!(c.get_max_end(1, 4, 0, 2), 3);
        // p=3 leaves one unit of budget for the tail
        assert_eq!(c.get_max_end(1, 4, 0, 3), 4);
    }

    #[test]
    fn unit_task_in_single_block_keeps_its_tail() {
        let c = HourCalendar::new(&[1, 2]);
        // p=1, head and tail in one workable block: retraction is skipped
        assert_eq!(c.get_max_end(0, 2, 0, 1), 2);
    }

    #[test]
    fn elapsed_bounds_respect_head_and_tail() {
        let doms = TaskDoms::new(0, 2, 0, 4, 0, 1);
        assert_eq!(cal().bound_elapsed(&doms, 2, true), 1);
        assert_eq!(cal().bound_elapsed(&doms, 2, false), 2);
    }

    #[test]
    fn over_bounds_on_ternary_calendar() {
        let doms = TaskDoms::new(0, 2, 1, 2, 0, 1);
        assert_eq!(cal().bound_over(&doms, 2, true), 0);
        assert_eq!(cal().bound_over(&doms, 2, false), 1);
    }

    #[test]
    fn infeasible_start_bounds_return_sentinel_pair() {
        // p=4 needs both overtime endpoints, beyond the budget
        let doms = TaskDoms::new(0, 3, 0, 4, 0, 1);
        assert_eq!(cal().bound_start(&doms, 4, true), i32::MAX);
        assert_eq!(cal().bound_start(&doms, 4, false), i32::MIN);
    }

    #[test]
    fn ect_and_lst_on_ternary_calendar() {
        let doms = TaskDoms::new(0, 3, 0, 4, 0, 1);
        assert_eq!(cal().ect(0, &doms, 2), 2);
        assert_eq!(cal().ect(1, &doms, 2), 2);
        assert_eq!(cal().ect(2, &doms, 2), 3);
        assert_eq!(cal().lst(4, &doms, 2), 2);
        assert_eq!(cal().lst(3, &doms, 2), 2);
        assert_eq!(cal().lst(2, &doms, 2), 1);
    }

    #[test]
    fn all_overtime_calendar_places_work_on_budget() {
        let c = HourCalendar::new(&[2, 2, 2]);
        let doms = TaskDoms::new(0, 2, 0, 3, 0, 2);
        // two units of work need two overtime units; both endpoints claim one
        assert_eq!(c.bound_start(&doms, 2, true), 0);
        let tight = TaskDoms::new(0, 2, 0, 3, 0, 1);
        assert_eq!(c.bound_start(&tight, 2, true), i32::MAX);
    }
}
