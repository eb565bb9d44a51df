//! Cumulative resource propagator with calendar-corrected task windows.
//!
//! Builds a time-table profile from the compulsory parts of the tasks,
//! where each part records the summed usage of the tasks whose compulsory
//! interval covers it. A profile level above the resource limit is a
//! conflict. Unfixed tasks are then swept through the profile: wherever the
//! remaining capacity cannot accommodate a task, its start bounds are
//! pushed past the offending part, re-deriving the task's reachable
//! completion from its calendar after every push.

use crate::host::{Clause, Engine, EventMask, Lit, PropagatorId, Propagator, VarId};
use crate::host::{neg_geq_lit, neg_leq_lit};
use crate::rev_set::ReversibleSparseSet;
use std::sync::Arc;
use tracing::{debug, trace};
use workcal_core::{Calendar, PrefilledSparseSet, TaskDoms};

#[derive(Debug, Clone, Default)]
struct ProfilePart {
    begin: i32,
    end: i32,
    level: i32,
    tasks: Vec<usize>,
}

pub struct CumulativeCalendarProp {
    start: Vec<VarId>,
    over: Vec<VarId>,
    elapsed: Vec<VarId>,
    dur: Vec<i32>,
    usage: Vec<i32>,
    limit: i32,
    cals: Vec<Option<Arc<Calendar>>>,

    omega: ReversibleSparseSet,
    unfixed_tasks: ReversibleSparseSet,
    tasks_in_profile: PrefilledSparseSet,

    ordered_lst: Vec<usize>,
    ordered_ect: Vec<usize>,
    actual_lst: Vec<i32>,
    actual_ect: Vec<i32>,

    profile: Vec<ProfilePart>,
    profile_len: usize,
}

impl CumulativeCalendarProp {
    pub fn new(
        host: &mut dyn Engine,
        start: Vec<VarId>,
        over: Vec<VarId>,
        elapsed: Vec<VarId>,
        dur: Vec<i32>,
        usage: Vec<i32>,
        limit: i32,
        cals: Vec<Option<Arc<Calendar>>>,
    ) -> Self {
        let n = start.len();
        assert!(n > 0, "cumulative constraint needs at least one task");
        Self {
            omega: ReversibleSparseSet::new(host, 0, n as i32 - 1),
            unfixed_tasks: ReversibleSparseSet::new(host, 0, n as i32 - 1),
            tasks_in_profile: PrefilledSparseSet::new(0, n as i32 - 1),
            ordered_lst: vec![0; n],
            ordered_ect: vec![0; n],
            actual_lst: vec![0; n],
            actual_ect: vec![0; n],
            profile: vec![ProfilePart::default(); 2 * n + 1],
            profile_len: 0,
            start,
            over,
            elapsed,
            dur,
            usage,
            limit,
            cals,
        }
    }

    fn task_doms(&self, host: &dyn Engine, t: usize) -> TaskDoms {
        TaskDoms::new(
            host.min(self.start[t]),
            host.max(self.start[t]),
            host.min(self.elapsed[t]),
            host.max(self.elapsed[t]),
            host.min(self.over[t]),
            host.max(self.over[t]),
        )
    }

    /// Completion from a start (`given_start`) or start from a completion,
    /// corrected by the task's calendar when it has one.
    fn other_extremity(&self, host: &dyn Engine, t: usize, time: i32, given_start: bool) -> i32 {
        match &self.cals[t] {
            None => {
                if given_start {
                    time + self.dur[t]
                } else {
                    time - self.dur[t]
                }
            }
            Some(cal) => {
                let doms = self.task_doms(host, t);
                if given_start {
                    cal.ect(time, &doms, self.dur[t])
                } else {
                    cal.lst(time, &doms, self.dur[t])
                }
            }
        }
    }

    /// Calendar-corrected duration anchored at `time`. Zero signals that no
    /// completion is feasible from this anchor.
    fn actual_dur(&self, host: &dyn Engine, t: usize, time: i32, given_start: bool) -> i32 {
        if self.cals[t].is_none() {
            return self.dur[t];
        }
        let val = self.other_extremity(host, t, time, given_start);
        if val == i32::MIN || val == i32::MAX {
            return 0;
        }
        if given_start {
            debug_assert!(val >= time);
            val - time
        } else {
            debug_assert!(val <= time);
            time - val
        }
    }

    fn build_profile(&mut self, host: &mut dyn Engine, max_level: &mut i32) -> bool {
        let n_omega = self.omega.len(host);
        let mut m = 0;
        for i in 0..n_omega {
            let t = self.omega.get(i) as usize;
            if let Some(cal) = &self.cals[t] {
                let doms = self.task_doms(host, t);
                self.actual_lst[t] = cal.bound_start(&doms, self.dur[t], false);
                self.actual_ect[t] = cal.ect(host.min(self.start[t]), &doms, self.dur[t]);
            } else {
                self.actual_lst[t] = host.max(self.start[t]);
                self.actual_ect[t] = host.min(self.start[t]) + self.dur[t];
            }
            if self.actual_lst[t] < self.actual_ect[t] {
                self.ordered_lst[m] = t;
                self.ordered_ect[m] = t;
                m += 1;
            }
        }

        {
            let Self { ordered_lst, ordered_ect, actual_lst, actual_ect, .. } = self;
            ordered_lst[..m].sort_unstable_by_key(|&t| actual_lst[t]);
            ordered_ect[..m].sort_unstable_by_key(|&t| actual_ect[t]);
        }

        let mut size = 1;
        let mut height = 0;
        let mut ending = i32::MAX;
        self.tasks_in_profile.clear();
        let mut i_lst = 0;
        let mut i_ect = 0;

        if i_lst < m {
            ending = self.actual_lst[self.ordered_lst[i_lst]];
        }
        self.profile[0].begin = i32::MIN;
        self.profile[0].end = ending;
        self.profile[0].level = 0;
        self.profile[0].tasks.clear();

        while i_lst < m || i_ect < m {
            let begin = ending;

            // close the tasks whose compulsory part has ended
            while i_ect < m && self.actual_ect[self.ordered_ect[i_ect]] <= begin {
                let t = self.ordered_ect[i_ect];
                debug_assert!(self.tasks_in_profile.contains(t as i32));
                self.tasks_in_profile.remove(t as i32);
                height -= self.usage[t];
                i_ect += 1;
            }

            // open the tasks whose compulsory part begins here
            while i_lst < m && self.actual_lst[self.ordered_lst[i_lst]] == begin {
                let t = self.ordered_lst[i_lst];
                debug_assert!(!self.tasks_in_profile.contains(t as i32));
                self.tasks_in_profile.insert(t as i32);
                height += self.usage[t];
                i_lst += 1;
            }

            if i_lst < m {
                ending = self.actual_lst[self.ordered_lst[i_lst]];
            }
            if i_ect < m && (ending > self.actual_ect[self.ordered_ect[i_ect]] || i_lst >= m) {
                ending = self.actual_ect[self.ordered_ect[i_ect]];
            }

            if height > self.limit {
                let point_begin = begin + (ending - begin) / 2;
                let mut expl = Vec::new();
                if host.lazy_explanations() {
                    let tasks: Vec<usize> =
                        self.tasks_in_profile.as_slice().iter().map(|&t| t as usize).collect();
                    self.analyse_tasks(
                        host,
                        &mut expl,
                        &tasks,
                        height - self.limit - 1,
                        point_begin,
                        point_begin + 1,
                    );
                }
                debug!(height, limit = self.limit, begin, ending, "resource overload");
                submit_conflict(host, expl);
                return false;
            }

            self.profile[size].begin = begin;
            self.profile[size].end = ending;
            self.profile[size].level = height;
            self.profile[size].tasks.clear();
            self.profile[size]
                .tasks
                .extend(self.tasks_in_profile.as_slice().iter().map(|&t| t as usize));
            if height > *max_level {
                *max_level = height;
            }
            size += 1;
        }

        self.profile[size - 1].end = i32::MAX;
        self.profile_len = size;
        trace!(parts = size, max_level = *max_level, "profile rebuilt");
        true
    }

    /// Index of the part containing `t`.
    fn find_profile(&self, t: i32) -> usize {
        let mut left = 0;
        let mut right = self.profile_len - 1;
        while left < right {
            let middle = (right + left + 1) / 2;
            if self.profile[middle].begin <= t {
                left = middle;
            } else {
                right = middle - 1;
            }
        }
        debug_assert!(self.profile[left].begin <= t && self.profile[left].end > t);
        left
    }

    fn filter_lower_bound(&mut self, host: &mut dyn Engine, task: usize) -> bool {
        let mut s = host.min(self.start[task]);
        let lst = self.actual_lst[task];
        let ect = self.actual_ect[task];
        let has_no_comp_part = lst >= ect;

        let mut j = self.find_profile(s) as isize;
        let mut current_dur = self.actual_dur(host, task, s, true);
        if current_dur == 0 {
            self.submit_calendar_conflict(host, task);
            return false;
        }

        while (j as usize) < self.profile_len && self.profile[j as usize].begin < s + current_dur {
            let (p_begin, p_end, p_level) = {
                let part = &self.profile[j as usize];
                (part.begin, part.end, part.level)
            };
            // parts already counting this task's own compulsory part are skipped
            if has_no_comp_part || lst >= p_end || ect <= p_begin {
                if self.limit - self.usage[task] < p_level {
                    // point-wise push: up to the part end, or as far as the
                    // task currently reaches into the part
                    let expl_end = (s + current_dur).min(p_end);
                    let reason = if host.lazy_explanations() {
                        let lift_usage = p_level + self.usage[task] - self.limit - 1;
                        let expl_begin = expl_end - 1;
                        let mut expl = Vec::new();
                        if expl_end <= s + host.min(self.elapsed[task]) {
                            // no calendar correction involved: plain
                            // time-table literals
                            let e_min = host.min(self.elapsed[task]);
                            expl.push(neg_geq_lit(host, self.start[task], expl_end - e_min));
                            if host.root_min(self.elapsed[task]) < e_min {
                                expl.push(neg_geq_lit(host, self.elapsed[task], e_min));
                            }
                        } else {
                            self.push_root_deviation_lits(host, task, &mut expl, true, false);
                        }
                        let tasks = self.profile[j as usize].tasks.clone();
                        self.analyse_tasks(host, &mut expl, &tasks, lift_usage, expl_begin, expl_end);
                        Some(Clause::for_update(expl))
                    } else {
                        None
                    };
                    trace!(task, expl_end, level = p_level, "start pushed past profile part");
                    if expl_end > host.min(self.start[task])
                        && !host.set_min(self.start[task], expl_end, reason)
                    {
                        return false;
                    }
                    s = expl_end;
                    current_dur = self.actual_dur(host, task, s, true);
                    if current_dur == 0 {
                        self.submit_calendar_conflict(host, task);
                        return false;
                    }
                    if expl_end < p_end {
                        // landed inside the part: look at it again
                        j -= 1;
                    }
                }
            }
            j += 1;
        }
        true
    }

    fn filter_upper_bound(&mut self, host: &mut dyn Engine, task: usize) -> bool {
        let lst = self.actual_lst[task];
        let mut e = self.other_extremity(host, task, lst, true);
        let ect = self.actual_ect[task];
        let has_no_comp_part = lst >= ect;

        let mut j = self.find_profile(e - 1) as isize;
        let mut current_dur = self.actual_dur(host, task, e, false);
        if current_dur == 0 {
            self.submit_calendar_conflict(host, task);
            return false;
        }

        while j >= 0 && self.profile[j as usize].end > e - current_dur {
            let (p_begin, p_end, p_level) = {
                let part = &self.profile[j as usize];
                (part.begin, part.end, part.level)
            };
            if has_no_comp_part || lst >= p_end || ect <= p_begin {
                if self.limit - self.usage[task] < p_level {
                    let expl_begin = p_begin.max(e - current_dur);
                    // latest start completing by the pushed-back completion
                    let val = self.other_extremity(host, task, expl_begin, false);
                    let reason = if host.lazy_explanations() {
                        let lift_usage = p_level + self.usage[task] - self.limit - 1;
                        let expl_end = expl_begin + 1;
                        let mut expl = Vec::new();
                        let s_max = host.max(self.start[task]);
                        let e_min = host.min(self.elapsed[task]);
                        if val >= p_begin.max(s_max) - e_min {
                            expl.push(neg_leq_lit(host, self.start[task], p_begin.max(s_max)));
                            if host.root_min(self.elapsed[task]) < e_min {
                                expl.push(neg_geq_lit(host, self.elapsed[task], e_min));
                            }
                        } else {
                            self.push_root_deviation_lits(host, task, &mut expl, false, true);
                        }
                        let tasks = self.profile[j as usize].tasks.clone();
                        self.analyse_tasks(host, &mut expl, &tasks, lift_usage, expl_begin, expl_end);
                        Some(Clause::for_update(expl))
                    } else {
                        None
                    };
                    trace!(task, val, level = p_level, "start capped before profile part");
                    if val < host.max(self.start[task])
                        && !host.set_max(self.start[task], val, reason)
                    {
                        return false;
                    }
                    e = expl_begin;
                    current_dur = self.actual_dur(host, task, e, false);
                    if current_dur == 0 {
                        self.submit_calendar_conflict(host, task);
                        return false;
                    }
                    if p_begin < expl_begin {
                        j += 1;
                    }
                }
            }
            j -= 1;
        }
        true
    }

    /// Point-wise explanation of the tasks holding up a profile part.
    /// Tasks whose usage fits in the remaining slack are lifted out.
    fn analyse_tasks(
        &self,
        host: &mut dyn Engine,
        expl: &mut Vec<Lit>,
        tasks: &[usize],
        mut slack: i32,
        point_begin: i32,
        point_end: i32,
    ) {
        if !host.lazy_explanations() {
            return;
        }
        for &t in tasks {
            if slack >= self.usage[t] {
                slack -= self.usage[t];
                continue;
            }
            let s_min = host.min(self.start[t]);
            let s_max = host.max(self.start[t]);
            let e_min = host.min(self.elapsed[t]);
            if s_max <= point_begin && point_end <= s_min + e_min {
                // the rigid interval alone covers the point
                if host.root_min(self.start[t]) + e_min <= point_end {
                    expl.push(neg_geq_lit(host, self.start[t], point_end - e_min));
                }
                if point_begin < host.root_max(self.start[t]) {
                    expl.push(neg_leq_lit(host, self.start[t], point_begin));
                }
                if host.root_min(self.elapsed[t]) < e_min {
                    expl.push(neg_geq_lit(host, self.elapsed[t], e_min));
                }
            } else {
                // the cover relies on the calendar correction
                self.push_root_deviation_lits(host, t, expl, true, true);
            }
        }
    }

    /// Every bound literal of the task's variables that moved since the
    /// root.
    fn push_root_deviation_lits(
        &self,
        host: &mut dyn Engine,
        t: usize,
        expl: &mut Vec<Lit>,
        start_min: bool,
        start_max: bool,
    ) {
        if start_min && host.min(self.start[t]) > host.root_min(self.start[t]) {
            expl.push(host.min_lit(self.start[t]));
        }
        if start_max && host.max(self.start[t]) < host.root_max(self.start[t]) {
            expl.push(host.max_lit(self.start[t]));
        }
        if host.min(self.elapsed[t]) > host.root_min(self.elapsed[t]) {
            expl.push(host.min_lit(self.elapsed[t]));
        }
        if host.max(self.elapsed[t]) < host.root_max(self.elapsed[t]) {
            expl.push(host.max_lit(self.elapsed[t]));
        }
        if host.min(self.over[t]) > host.root_min(self.over[t]) {
            expl.push(host.min_lit(self.over[t]));
        }
        if host.max(self.over[t]) < host.root_max(self.over[t]) {
            expl.push(host.max_lit(self.over[t]));
        }
    }

    fn submit_calendar_conflict(&self, host: &mut dyn Engine, task: usize) {
        let clause = if host.lazy_explanations() {
            let mut expl = Vec::new();
            self.push_root_deviation_lits(host, task, &mut expl, true, true);
            Some(Clause::for_conflict(expl))
        } else {
            None
        };
        debug!(task, "no feasible completion on the task calendar");
        host.submit_conflict(clause);
    }
}

fn submit_conflict(host: &mut dyn Engine, expl: Vec<Lit>) {
    let clause = host.lazy_explanations().then(|| Clause::for_conflict(expl));
    host.submit_conflict(clause);
}

impl Propagator for CumulativeCalendarProp {
    fn priority(&self) -> i32 {
        3
    }

    fn attach(&self, id: PropagatorId, host: &mut dyn Engine) {
        let n = self.start.len();
        for i in 0..n {
            host.add_watch(self.start[i], id, i, EventMask::BOUNDS);
            host.add_watch(self.elapsed[i], id, n + i, EventMask::BOUNDS);
            host.add_watch(self.over[i], id, 2 * n + i, EventMask::BOUNDS);
        }
    }

    fn propagate(&mut self, host: &mut dyn Engine) -> bool {
        // The per-task calendar propagators are assumed to have reached
        // bound consistency with the calendars already.
        for i in (0..self.unfixed_tasks.len(host)).rev() {
            let t = self.unfixed_tasks.get(i);
            if host.is_fixed(self.start[t as usize]) && host.is_fixed(self.elapsed[t as usize]) {
                self.unfixed_tasks.remove(host, t);
            }
        }
        let n_unfixed = self.unfixed_tasks.len(host);

        let mut max_level = 0;
        if !self.build_profile(host, &mut max_level) {
            return false;
        }

        for i in 0..n_unfixed {
            let t = self.unfixed_tasks.get(i) as usize;
            if host.min(self.elapsed[t]) == 0 || max_level + self.usage[t] <= self.limit {
                continue;
            }
            if !self.filter_lower_bound(host, t) {
                return false;
            }
            if !self.filter_upper_bound(host, t) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestEngine;

    fn two_task_prop(host: &mut TestEngine, limit: i32) -> CumulativeCalendarProp {
        // A: S in [1,3], dur 4 -> compulsory [3,5); B: S in [2,4], dur 3 ->
        // compulsory [4,5)
        let s_a = host.new_var(1, 3);
        let o_a = host.new_var(0, 0);
        let e_a = host.new_var(4, 4);
        let s_b = host.new_var(2, 4);
        let o_b = host.new_var(0, 0);
        let e_b = host.new_var(3, 3);
        CumulativeCalendarProp::new(
            host,
            vec![s_a, s_b],
            vec![o_a, o_b],
            vec![e_a, e_b],
            vec![4, 3],
            vec![1, 1],
            limit,
            vec![None, None],
        )
    }

    #[test]
    fn profile_parts_tile_the_line() {
        let mut host = TestEngine::new();
        let mut prop = two_task_prop(&mut host, 2);
        let mut max_level = 0;
        assert!(prop.build_profile(&mut host, &mut max_level));

        assert_eq!(prop.profile_len, 4);
        assert_eq!(prop.profile[0].begin, i32::MIN);
        assert_eq!(prop.profile[prop.profile_len - 1].end, i32::MAX);
        for j in 1..prop.profile_len {
            assert_eq!(prop.profile[j].begin, prop.profile[j - 1].end);
        }
    }

    #[test]
    fn profile_levels_sum_member_usage() {
        let mut host = TestEngine::new();
        let mut prop = two_task_prop(&mut host, 2);
        let mut max_level = 0;
        assert!(prop.build_profile(&mut host, &mut max_level));

        for j in 0..prop.profile_len {
            let part = &prop.profile[j];
            let sum: i32 = part.tasks.iter().map(|&t| prop.usage[t]).sum();
            assert_eq!(part.level, sum, "part {j}");
        }
        assert_eq!(prop.profile[1].level, 1);
        assert_eq!(prop.profile[2].level, 2);
        assert_eq!(prop.profile[2].tasks, vec![0, 1]);
        assert_eq!(max_level, 2);
    }

    #[test]
    fn find_profile_locates_the_covering_part() {
        let mut host = TestEngine::new();
        let mut prop = two_task_prop(&mut host, 2);
        let mut max_level = 0;
        assert!(prop.build_profile(&mut host, &mut max_level));

        assert_eq!(prop.find_profile(0), 0);
        assert_eq!(prop.find_profile(3), 1);
        assert_eq!(prop.find_profile(4), 2);
        assert_eq!(prop.find_profile(100), 3);
    }

    #[test]
    fn overlapping_compulsory_parts_overload_the_profile() {
        let mut host = TestEngine::new();
        let mut prop = two_task_prop(&mut host, 1);
        let mut max_level = 0;
        assert!(!prop.build_profile(&mut host, &mut max_level));
        assert!(host.has_failed());
    }
}
