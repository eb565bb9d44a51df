//! Binary calendar with overtime pinned to zero.
//!
//! A placement anchored at `s` works the first `p` workable units at or
//! after `s`; its end is fully determined by the anchor. Feasibility only
//! asks that the end stays on the calendar and the elapsed span fits the
//! task's elapsed domain.

use super::prefix::PrefixMap;
use crate::TaskDoms;

#[derive(Debug, Clone)]
pub struct NoOverCalendar {
    pub(crate) work: PrefixMap,
}

impl NoOverCalendar {
    pub(crate) fn new(codes: &[i32]) -> Self {
        assert!(!codes.is_empty(), "calendar must have at least one unit");
        for &code in codes {
            assert!(code == 0 || code == 1, "binary calendar entries must be 0 or 1");
        }
        Self { work: PrefixMap::build(codes, |c| c == 1) }
    }

    fn len(&self) -> i32 {
        self.work.len()
    }

    /// Elapsed span of the placement anchored at `start`, when feasible.
    fn feasible_elapsed(&self, doms: &TaskDoms, p: i32, start: i32) -> Option<i32> {
        let end = self.work.get_end(start, p);
        (end <= self.len() && doms.min_e <= end - start && end - start <= doms.max_e)
            .then(|| end - start)
    }

    pub fn bound_start(&self, doms: &TaskDoms, p: i32, min: bool) -> i32 {
        if min {
            let mut s = self.work.next_workable(doms.min_s);
            while s <= doms.max_s {
                let end = self.work.get_end(s, p);
                if end > self.len() {
                    // the minimal end only grows with the anchor
                    break;
                }
                if doms.min_e <= end - s && end - s <= doms.max_e {
                    return s;
                }
                s = self.work.next_workable(s + 1);
            }
            i32::MAX
        } else {
            let mut s = self.work.previous_workable(doms.max_s.min(self.len() - 1));
            while s >= doms.min_s.max(0) {
                if self.feasible_elapsed(doms, p, s).is_some() {
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
            let end = self.work.get_end(s, p);
            if end > self.len() {
                break;
            }
            if doms.min_e <= end - s && end - s <= doms.max_e {
                if min {
                    best = best.min(end - s);
                    if best == doms.min_e {
                        return best;
                    }
                } else {
                    best = best.max(end - s);
                    if best == doms.max_e {
                        return best;
                    }
                }
            }
            s = self.work.next_workable(s + 1);
        }
        best
    }

    pub fn bound_over(&self, _doms: &TaskDoms, _p: i32, _min: bool) -> i32 {
        0
    }

    /// Latest feasible start completing by `lct`.
    pub fn lst(&self, lct: i32, doms: &TaskDoms, p: i32) -> i32 {
        let cap = lct.min(self.len());
        let rough = self.work.get_start(cap, p);
        let mut s = self.work.previous_workable(doms.max_s.min(rough));
        while s >= doms.min_s.max(0) {
            let end = self.work.get_end(s, p);
            if end <= cap && doms.min_e <= end - s && end - s <= doms.max_e {
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
            let end = self.work.get_end(s, p);
            if end > self.len() {
                break;
            }
            if doms.min_e <= end - s && end - s <= doms.max_e {
                return end;
            }
            s = self.work.next_workable(s + 1);
        }
        i32::MAX
    }
}
