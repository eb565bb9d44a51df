//! Prefix-indexed lookup tables for one time-type of a calendar.
//!
//! `idx[t]` holds the number of matching units in `[0, t]` minus one, so an
//! all-leading-gap prefix reads -1. `pos[k]` holds the position of the k-th
//! matching unit (0-indexed). Together they answer workability, counting
//! and completion queries in constant time.

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PrefixMap {
    idx: Vec<i32>,
    pos: Vec<i32>,
}

impl PrefixMap {
    pub fn build(codes: &[i32], matches: impl Fn(i32) -> bool) -> Self {
        let mut idx = Vec::with_capacity(codes.len());
        let mut pos = Vec::new();
        let mut count = -1;
        for (t, &code) in codes.iter().enumerate() {
            if matches(code) {
                count += 1;
                pos.push(t as i32);
            }
            idx.push(count);
        }
        Self { idx, pos }
    }

    /// Calendar length L.
    pub fn len(&self) -> i32 {
        self.idx.len() as i32
    }

    /// Number of matching units in `[0, t)`, clamped to the calendar.
    fn hits_before(&self, t: i32) -> i32 {
        if t <= 0 {
            0
        } else {
            self.idx[(t.min(self.len()) - 1) as usize] + 1
        }
    }

    pub fn workable(&self, t: i32) -> bool {
        t >= 0 && t < self.len() && self.hits_before(t + 1) > self.hits_before(t)
    }

    /// Smallest workable `u >= t`, or `L + 1` when none remains.
    pub fn next_workable(&self, t: i32) -> i32 {
        let k = self.hits_before(t.max(0)) as usize;
        if k < self.pos.len() {
            self.pos[k]
        } else {
            self.len() + 1
        }
    }

    /// Largest workable `u <= t`, or `-1` when none precedes.
    pub fn previous_workable(&self, t: i32) -> i32 {
        if t < 0 {
            return -1;
        }
        let k = self.hits_before(t.saturating_add(1));
        if k == 0 {
            -1
        } else {
            self.pos[(k - 1) as usize]
        }
    }

    /// Matching units in `[begin, end)`, clamped to `[0, L)`.
    pub fn count(&self, begin: i32, end: i32) -> i32 {
        let b = begin.max(0);
        let e = end.min(self.len());
        if e <= b {
            0
        } else {
            self.hits_before(e) - self.hits_before(b)
        }
    }

    /// Smallest `e` with `count(start, e) == working`; `start` when
    /// `working <= 0`, `L + 1` when the units run out.
    pub fn get_end(&self, start: i32, working: i32) -> i32 {
        if working <= 0 {
            return start;
        }
        let k = self.hits_before(start.max(0)) + working - 1;
        if k >= 0 && (k as usize) < self.pos.len() {
            self.pos[k as usize] + 1
        } else {
            self.len() + 1
        }
    }

    /// Largest `s` with `count(s, end) == working`; `end` when
    /// `working <= 0`, `-1` when the units run out.
    pub fn get_start(&self, end: i32, working: i32) -> i32 {
        if working <= 0 {
            return end;
        }
        let k = self.hits_before(end.min(self.len())) - working;
        if k >= 0 {
            self.pos[k as usize]
        } else {
            -1
        }
    }
}
