//! End-to-end propagation of the per-task calendar propagators through the
//! reference host.

use pretty_assertions::assert_eq;
use workcal_core::CalendarPool;
use workcal_solver::host::Engine;
use workcal_solver::testing::TestEngine;
use workcal_solver::{calendar_day, calendar_hour, calendar_no_over};

const WEEK: [i32; 7] = [1, 1, 0, 0, 1, 1, 1];

#[test]
fn binary_calendar_tightens_start_and_elapsed() {
    let mut host = TestEngine::new();
    let mut pool = CalendarPool::new();
    let start = host.new_var(0, 6);
    let elapsed = host.new_var(0, 7);

    let prop = calendar_no_over(&mut host, &mut pool, start, elapsed, 3, &WEEK);
    host.register(Box::new(prop));

    assert!(host.run_to_fixpoint());
    assert_eq!(host.bounds(start), (0, 4));
    assert_eq!(host.bounds(elapsed), (3, 5));
}

#[test]
fn propagation_is_idempotent() {
    let mut host = TestEngine::new();
    let mut pool = CalendarPool::new();
    let start = host.new_var(0, 6);
    let elapsed = host.new_var(0, 7);

    let prop = calendar_no_over(&mut host, &mut pool, start, elapsed, 3, &WEEK);
    host.register(Box::new(prop));

    assert!(host.run_to_fixpoint());
    let updates = host.reasons.len();
    assert!(host.run_to_fixpoint());
    assert_eq!(host.reasons.len(), updates);
}

#[test]
fn day_calendar_buys_gap_days_with_overtime() {
    let mut host = TestEngine::new();
    let mut pool = CalendarPool::new();
    let start = host.new_var(0, 6);
    let over = host.new_var(0, 2);
    let elapsed = host.new_var(4, 7);

    let prop = calendar_day(&mut host, &mut pool, start, over, elapsed, 4, &WEEK);
    host.register(Box::new(prop));

    assert!(host.run_to_fixpoint());
    assert_eq!(host.bounds(start), (0, 1));
    assert_eq!(host.bounds(elapsed), (4, 6));
    assert_eq!(host.bounds(over), (0, 2));
}

#[test]
fn hour_calendar_charges_overtime_endpoints() {
    let mut host = TestEngine::new();
    let mut pool = CalendarPool::new();
    let start = host.new_var(0, 3);
    let over = host.new_var(0, 1);
    let elapsed = host.new_var(0, 4);

    let prop = calendar_hour(&mut host, &mut pool, start, over, elapsed, 2, &[2, 1, 1, 2]);
    host.register(Box::new(prop));

    assert!(host.run_to_fixpoint());
    assert_eq!(host.bounds(start), (0, 2));
    assert_eq!(host.bounds(elapsed), (1, 2));
    assert_eq!(host.bounds(over), (0, 1));
}

#[test]
fn fully_working_calendar_pins_elapsed_to_work() {
    let mut host = TestEngine::new();
    let mut pool = CalendarPool::new();
    let start = host.new_var(0, 3);
    let over = host.new_var(0, 0);
    let elapsed = host.new_var(0, 4);

    let prop = calendar_day(&mut host, &mut pool, start, over, elapsed, 2, &[1, 1, 1, 1]);
    host.register(Box::new(prop));

    assert!(host.run_to_fixpoint());
    assert_eq!(host.bounds(start), (0, 2));
    assert_eq!(host.bounds(elapsed), (2, 2));
}

#[test]
fn impossible_work_amount_reports_a_conflict() {
    let mut host = TestEngine::new();
    let mut pool = CalendarPool::new();
    let start = host.new_var(0, 6);
    let elapsed = host.new_var(0, 7);

    let s_min = host.min_lit(start);
    let s_max = host.max_lit(start);
    let e_min = host.min_lit(elapsed);
    let e_max = host.max_lit(elapsed);

    let prop = calendar_no_over(&mut host, &mut pool, start, elapsed, 6, &WEEK);
    host.register(Box::new(prop));

    assert!(!host.run_to_fixpoint());
    assert!(host.has_failed());
    let conflict = host.conflict().expect("conflict clause");
    assert_eq!(conflict.lits, vec![s_min, s_max, e_min, e_max]);
}

#[test]
fn update_reason_drops_the_opposite_bound_of_the_updated_variable() {
    let mut host = TestEngine::new();
    let mut pool = CalendarPool::new();
    let start = host.new_var(0, 6);
    let elapsed = host.new_var(0, 7);

    // literals as they read when the start upper bound is tightened
    let s_max = host.max_lit(start);
    let e_min = host.min_lit(elapsed);
    let e_max = host.max_lit(elapsed);

    let prop = calendar_no_over(&mut host, &mut pool, start, elapsed, 3, &WEEK);
    host.register(Box::new(prop));

    assert!(host.run_to_fixpoint());
    let reason = host.last_reason(start).expect("start update carries a reason");
    assert_eq!(reason.tail(), &[s_max, e_min, e_max]);
}

#[test]
fn explanations_are_skipped_when_lazy_is_off() {
    let mut host = TestEngine::with_lazy(false);
    let mut pool = CalendarPool::new();
    let start = host.new_var(0, 6);
    let elapsed = host.new_var(0, 7);

    let prop = calendar_no_over(&mut host, &mut pool, start, elapsed, 6, &WEEK);
    host.register(Box::new(prop));

    assert!(!host.run_to_fixpoint());
    assert!(host.has_failed());
    assert!(host.conflict().is_none());
}

#[test]
fn backtracking_restores_propagated_bounds() {
    let mut host = TestEngine::new();
    let mut pool = CalendarPool::new();
    let start = host.new_var(0, 6);
    let elapsed = host.new_var(0, 7);

    let prop = calendar_no_over(&mut host, &mut pool, start, elapsed, 3, &WEEK);
    host.register(Box::new(prop));
    assert!(host.run_to_fixpoint());
    assert_eq!(host.bounds(elapsed), (3, 5));

    host.push_level();
    assert!(host.set_min(start, 4, None));
    assert!(host.run_to_fixpoint());
    assert_eq!(host.bounds(start), (4, 4));
    assert_eq!(host.bounds(elapsed), (3, 3));

    host.backtrack();
    assert_eq!(host.bounds(start), (0, 4));
    assert_eq!(host.bounds(elapsed), (3, 5));
}

#[test]
fn compiled_week_calendar_drives_propagation() {
    use chrono::NaiveDate;
    use workcal_core::CalendarDef;

    let monday = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
    let codes = CalendarDef::new(monday, 9).compile_days().unwrap();

    let mut host = TestEngine::new();
    let mut pool = CalendarPool::new();
    let start = host.new_var(0, 8);
    let elapsed = host.new_var(0, 9);

    let prop = calendar_no_over(&mut host, &mut pool, start, elapsed, 6, &codes);
    host.register(Box::new(prop));

    assert!(host.run_to_fixpoint());
    // six working days need the weekend spanned; only Monday and Tuesday fit
    assert_eq!(host.bounds(start), (0, 1));
    assert_eq!(host.bounds(elapsed), (8, 8));
}
