//! Tweener recycling

mod common;

use blinc_tween::{Accessor, Ease, LoopType, Scheduler, SchedulerConfig, Vec2};
use common::{assert_close, cell, run, Counter};
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn test_reused_tweener_starts_from_defaults() {
    common::init_tracing();
    let mut scheduler = Scheduler::with_config(SchedulerConfig::pooled());
    let first = cell(0.0);
    let old_completes = Counter::new();
    let old = scheduler.to(Accessor::shared(first.clone()), 1.0, 2.0);
    scheduler
        .settings(old)
        .unwrap()
        .ease(Ease::Linear)
        .delay(0.5)
        .loops(3, LoopType::Yoyo)
        .int_id(7)
        .on_complete(old_completes.callback());

    assert_eq!(scheduler.complete(old), Ok(true));
    assert_eq!(old_completes.get(), 1);
    assert!(!scheduler.is_active(old));
    assert_eq!(scheduler.stats().pooled, 1);

    let second = cell(0.0);
    let reused = scheduler.to(Accessor::shared(second.clone()), 1.0, 1.0);
    assert_eq!(scheduler.stats().pooled, 0);
    assert_ne!(reused, old);
    assert_eq!(scheduler.delay(reused), Ok(0.0));
    assert_eq!(scheduler.loops(reused), Ok(1));
    assert_eq!(
        scheduler.count_where(&blinc_tween::TweenFilter::all().with_int_id(7)),
        0
    );

    // Default ease is OutQuad: 1 - (1 - 0.5)^2
    run(&mut scheduler, 2, 0.25);
    assert_close(second.get(), 0.75);
    assert_close(first.get(), 1.0);

    run(&mut scheduler, 2, 0.25);
    assert_close(second.get(), 1.0);
    assert_eq!(old_completes.get(), 1);
}

#[test]
fn test_pool_is_bucketed_by_value_type() {
    let mut scheduler = Scheduler::with_config(SchedulerConfig::pooled());
    let value = cell(0.0);
    let id = scheduler.to(Accessor::shared(value), 1.0, 1.0);
    scheduler.kill(id, false).unwrap();
    assert_eq!(scheduler.stats().pooled, 1);

    let point = Rc::new(Cell::new(Vec2::ZERO));
    scheduler.to(Accessor::shared(point), Vec2::ONE, 1.0);
    assert_eq!(scheduler.stats().pooled, 1);
    assert_eq!(scheduler.stats().tweeners, 1);
}

#[test]
fn test_sequences_and_non_recyclable_tweens_are_not_pooled() {
    let mut scheduler = Scheduler::with_config(SchedulerConfig::pooled());
    let (a, b) = (cell(0.0), cell(0.0));
    let kept = scheduler.to(Accessor::shared(a), 1.0, 1.0);
    let child = scheduler.to(Accessor::shared(b), 1.0, 1.0);
    scheduler.settings(kept).unwrap().recyclable(false);
    let seq = scheduler.sequence();
    scheduler.append(seq, child).unwrap();

    assert_eq!(scheduler.kill_all(), 2);
    let stats = scheduler.stats();
    assert_eq!(stats.pooled, 0);
    assert_eq!((stats.tweeners, stats.sequences, stats.active), (0, 0, 0));
}

#[test]
fn test_kill_all_pools_and_clear_empties_pool() {
    let mut scheduler = Scheduler::with_config(SchedulerConfig::pooled());
    for _ in 0..3 {
        scheduler.to(Accessor::shared(cell(0.0)), 1.0, 1.0);
    }
    assert_eq!(scheduler.kill_all(), 3);
    assert_eq!(scheduler.stats().pooled, 3);

    scheduler.clear();
    let stats = scheduler.stats();
    assert_eq!((stats.pooled, stats.tweeners, stats.active), (0, 0, 0));
}

#[test]
fn test_full_pool_evicts_before_growing() {
    let config = SchedulerConfig::pooled().with_capacity(2, 2);
    let mut scheduler = Scheduler::with_config(config);
    let a = scheduler.to(Accessor::shared(cell(0.0)), 1.0, 1.0);
    let b = scheduler.to(Accessor::shared(cell(0.0)), 1.0, 1.0);
    scheduler.kill(a, false).unwrap();
    scheduler.kill(b, false).unwrap();
    assert_eq!(scheduler.stats().pooled, 2);

    let point = Rc::new(Cell::new(Vec2::ZERO));
    scheduler.to(Accessor::shared(point), Vec2::ONE, 1.0);
    let stats = scheduler.stats();
    assert_eq!(stats.pooled, 1);
    assert_eq!(stats.max_tweeners, 2);
}
