//! Binary calendar where work on non-working days is bought with overtime.
//!
//! A placement `[s, e)` works every working unit it contains; the remainder
//! of the working amount, `p - count(s, e)`, is performed as overtime and
//! must fit the task's overtime domain. The minimal end of a placement
//! honors the elapsed floor and the overtime cap; the maximal end honors
//! the elapsed cap and the overtime floor.

use super::prefix::PrefixMap;
use crate::TaskDoms;

#[derive(Debug, Clone)]
pub struct DayCalendar {
    pub(crate) work: PrefixMap,
}

impl DayCalendar {
    pub(crate) fn new(codes: &[i32]) -> Self {
        assert!(!codes.is_empty(), "calendar must have at least one unit");
        for &code in codes {
            assert!(code == 0 || code == 1, "day calendar entries must be 0 or 1");
        }
        Self { work: PrefixMap::build(codes, |c| c == 1) }
    }

    fn len(&self) -> i32 {
        self.work.len()
    }

    /// Smallest end for a placement at `start` honoring the elapsed floor
    /// `min_e` and the overtime cap `max_o`. May exceed the calendar.
    fn get_min_end(&self, start: i32, min_e: i32, max_o: i32, p: i32) -> i32 {
        let mut end = self.work.next_workable(start + min_e - 1) + 1;
        if self.work.count(start, end) < p - max_o {
            end = self.work.get_end(start, p - max_o);
        }
        end
    }

    /// Largest end for a placement at `start` honoring the elapsed cap
    /// `max_e` and the overtime floor `min_o`.
    fn get_max_end(&self, start: i32, max_e: i32, min_o: i32, p: i32) -> i32 {
        let cap = self.len().min(start.saturating_add(max_e));
        let mut end = self.work.previous_workable(cap - 1) + 1;
        if self.work.count(start, end) > p - min_o {
            end = self.work.get_end(start, p - min_o);
        }
        end
    }

    /// Minimal feasible end anchored at `start`, checking the remaining
    /// domain conditions (elapsed cap, overtime floor).
    fn feasible_min_end(&self, doms: &TaskDoms, p: i32, start: i32) -> Option<i32> {
        let end = self.get_min_end(start, doms.min_e, doms.max_o, p);
        (end <= self.len()
            && end - start <= doms.max_e
            && self.work.count(start, end) <= p - doms.min_o)
            .then_some(end)
    }

    /// Maximal feasible end anchored at `start`, checking the remaining
    /// domain conditions (elapsed floor, overtime cap).
    fn feasible_max_end(&self, doms: &TaskDoms, p: i32, start: i32) -> Option<i32> {
        let end = self.get_max_end(start, doms.max_e, doms.min_o, p);
        (end <= self.len()
            && end - start >= doms.min_e
            && self.work.count(start, end) >= p - doms.max_o
            && self.work.count(start, end) <= p - doms.min_o)
            .then_some(end)
    }

    pub fn bound_start(&self, doms: &TaskDoms, p: i32, min: bool) -> i32 {
        if min {
            let mut s = self.work.next_workable(doms.min_s);
            while s <= doms.max_s {
                let end = self.get_min_end(s, doms.min_e, doms.max_o, p);
                if end > self.len() {
                    // min end is a max of two anchor-monotone quantities
                    break;
                }
                if end - s <= doms.max_e && self.work.count(s, end) <= p - doms.min_o {
                    return s;
                }
                s = self.work.next_workable(s + 1);
            }
            i32::MAX
        } else {
            let mut s = self.work.previous_workable(doms.max_s.min(self.len() - 1));
            while s >= doms.min_s.max(0) {
                if self.feasible_min_end(doms, p, s).is_some() {
                    return s;
                }
                s = self.work.previous_workable(s - 1);
            }
            i32::MIN
        }
    }

    pub fn bound_elapsed(&self, doms: &TaskDoms, p: i32, min: bool) -> i32 {
        let mut best = if min { i32::MAX } else { i32::MIN };
        let mut s = self.work.next_workable(doms.min_s);
        while s <= doms.max_s {
            if min {
                let end = self.get_min_end(s, doms.min_e, doms.max_o, p);
                if end > self.len() {
                    break;
                }
                if end - s <= doms.max_e && self.work.count(s, end) <= p - doms.min_o {
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
            s = self.work.next_workable(s + 1);
        }
        best
    }

    pub fn bound_over(&self, doms: &TaskDoms, p: i32, min: bool) -> i32 {
        let mut best = if min { i32::MAX } else { i32::MIN };
        let mut s = self.work.next_workable(doms.min_s);
        while s <= doms.max_s {
            if min {
                // the widest window packs in the most working units
                if let Some(end) = self.feasible_max_end(doms, p, s) {
                    best = best.min(p - self.work.count(s, end));
                    if best == doms.min_o {
                        return best;
                    }
                }
            } else {
                let end = self.get_min_end(s, doms.min_e, doms.max_o, p);
                if end > self.len() {
                    break;
                }
                if end - s <= doms.max_e && self.work.count(s, end) <= p - doms.min_o {
                    best = best.max(p - self.work.count(s, end));
                    if best == doms.max_o {
                        return best;
                    }
                }
            }
            s = self.work.next_workable(s + 1);
        }
        best
    }

    /// Latest feasible start completing by `lct`.
    pub fn lst(&self, lct: i32, doms: &TaskDoms, p: i32) -> i32 {
        let cap = lct.min(self.len());
        let rough = self.work.get_start(cap, (p - doms.max_o).max(0));
        let mut s = self.work.previous_workable(doms.max_s.min(rough));
        while s >= doms.min_s.max(0) {
            let end = self.get_min_end(s, doms.min_e, doms.max_o, p);
            if end <= cap && end - s <= doms.max_e && self.work.count(s, end) <= p - doms.min_o {
                return s;
            }
            s = self.work.previous_workable(s - 1);
        }
        i32::MIN
    }

    /// Earliest feasible completion starting at or after `est`.
    pub fn ect(&self, est: i32, doms: &TaskDoms, p: i32) -> i32 {
        let mut s = self.work.next_workable(doms.min_s.max(est));
        while s <= doms.max_s {
            let end = self.get_min_end(s, doms.min_e, doms.max_o, p);
            if end > self.len() {
                break;
            }
            if end - s <= doms.max_e && self.work.count(s, end) <= p - doms.min_o {
                return end;
            }
            s = self.work.next_workable(s + 1);
        }
        i32::MAX
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cal() -> DayCalendar {
        DayCalendar::new(&[1, 1, 0, 0, 1, 1, 1])
    }

    #[test]
    fn overtime_buys_gap_days() {
        // p=4 with up to 2 overtime: minimal window from 0 spans the gap,
        // working 3 units and buying 1
        let doms = TaskDoms::new(0, 6, 4, 7, 0, 2);
        assert_eq!(cal().bound_start(&doms, 4, true), 0);
        assert_eq!(cal().bound_start(&doms, 4, false), 1);
    }

    #[test]
    fn elapsed_bounds_with_overtime() {
        let doms = TaskDoms::new(0, 1, 4, 7, 0, 2);
        assert_eq!(cal().bound_elapsed(&doms, 4, true), 4);
        assert_eq!(cal().bound_elapsed(&doms, 4, false), 6);
    }

    #[test]
    fn over_bounds_follow_window_width() {
        let doms = TaskDoms::new(0, 1, 4, 6, 0, 2);
        assert_eq!(cal().bound_over(&doms, 4, true), 0);
        assert_eq!(cal().bound_over(&doms, 4, false), 2);
    }

    #[test]
    fn overtime_floor_forces_narrow_windows() {
        // with at least 2 overtime units, the window may keep at most
        // p - 2 = 2 working units
        let doms = TaskDoms::new(0, 6, 0, 7, 2, 2);
        assert_eq!(cal().bound_start(&doms, 4, true), 0);
        let end = cal().get_max_end(0, 7, 2, 4);
        assert_eq!(end, 2);
        assert_eq!(cal().work.count(0, end), 2);
    }

    #[test]
    fn min_end_honors_elapsed_floor() {
        // elapsed floor pushes the end past the gap to the next working unit
        assert_eq!(cal().get_min_end(0, 4, 2, 4), 5);
        // work requirement pushes further than the floor alone
        assert_eq!(cal().get_min_end(0, 1, 0, 3), 5);
    }

    #[test]
    fn infeasible_when_overtime_cannot_cover() {
        // p=6 but only 5 working units and max_o=0
        let doms = TaskDoms::new(0, 6, 0, 7, 0, 0);
        assert_eq!(cal().bound_start(&doms, 6, true), i32::MAX);
        assert_eq!(cal().bound_start(&doms, 6, false), i32::MIN);
        // one overtime unit makes it placeable
        let doms = TaskDoms::new(0, 6, 0, 7, 0, 1);
        assert_eq!(cal().bound_start(&doms, 6, true), 0);
    }

    #[test]
    fn ect_tracks_minimal_completion() {
        let doms = TaskDoms::new(0, 6, 4, 7, 0, 2);
        assert_eq!(cal().ect(0, &doms, 4), 5);
        assert_eq!(cal().ect(1, &doms, 4), 5);
    }

    #[test]
    fn lst_respects_completion_deadline() {
        let doms = TaskDoms::new(0, 6, 4, 7, 0, 2);
        assert_eq!(cal().lst(5, &doms, 4), 1);
        assert_eq!(cal().lst(4, &doms, 4), i32::MIN);
    }
}
