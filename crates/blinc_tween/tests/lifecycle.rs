//! Creation, deferred kills and callback re-entrancy

mod common;

use blinc_tween::{Accessor, LoopType, Scheduler, TweenError};
use common::{assert_close, cell, linear, run, Counter, Journal};
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn test_kill_from_callback_skips_victim_only() {
    common::init_tracing();
    let mut scheduler = Scheduler::new();
    let (a, b, c, d) = (cell(0.0), cell(0.0), cell(0.0), cell(0.0));
    let short = linear(&mut scheduler, &a, 1.0, 0.5);
    let victim = linear(&mut scheduler, &b, 1.0, 1.0);
    let third = linear(&mut scheduler, &c, 1.0, 1.0);
    let fourth = linear(&mut scheduler, &d, 1.0, 1.0);

    let victim_kills = Counter::new();
    scheduler
        .settings(victim)
        .unwrap()
        .on_kill(victim_kills.callback());
    let third_updates = Counter::new();
    scheduler
        .settings(third)
        .unwrap()
        .on_update(third_updates.callback());

    let spawned: Rc<Cell<Option<blinc_tween::TweenId>>> = Rc::new(Cell::new(None));
    let late = cell(0.0);
    {
        let spawned = spawned.clone();
        let late = late.clone();
        scheduler.settings(short).unwrap().on_complete(move |s| {
            s.kill(victim, false).unwrap();
            let id = s.to(Accessor::shared(late.clone()), 1.0, 1.0);
            spawned.set(Some(id));
        });
    }

    scheduler.update(0.5, 0.5);
    assert_close(a.get(), 1.0);
    assert_close(b.get(), 0.0);
    assert_close(c.get(), 0.5);
    assert_close(d.get(), 0.5);
    assert_eq!(third_updates.get(), 1);
    assert_eq!(victim_kills.get(), 1);
    assert_eq!(scheduler.status(victim), Err(TweenError::InvalidHandle));
    assert_eq!(scheduler.status(short), Err(TweenError::InvalidHandle));

    // Created mid-pass, first advanced by the next pass
    let spawned = spawned.get().unwrap();
    assert_eq!(scheduler.position(spawned), Ok(0.0));
    assert_close(late.get(), 0.0);
    scheduler.update(0.5, 0.5);
    assert!(late.get() > 0.0);
    assert_eq!(scheduler.kill(victim, false), Err(TweenError::InvalidHandle));
}

#[test]
fn test_self_kill_from_update_fires_kill_once() {
    let mut scheduler = Scheduler::new();
    let value = cell(0.0);
    let id = linear(&mut scheduler, &value, 1.0, 1.0);
    let journal = Journal::new();
    let log = journal.clone();
    let mut on_update = journal.callback("update");
    scheduler
        .settings(id)
        .unwrap()
        .on_update(move |s| {
            on_update(s);
            s.kill(id, false).unwrap();
            s.kill(id, false).unwrap();
        })
        .on_kill(log.callback("kill"));

    run(&mut scheduler, 3, 0.25);
    assert_eq!(journal.entries(), vec!["update", "kill"]);
    assert_close(value.get(), 0.25);
    assert!(!scheduler.is_active(id));
}

#[test]
fn test_kill_with_complete_fires_complete_then_kill() {
    let mut scheduler = Scheduler::new();
    let value = cell(0.0);
    let id = linear(&mut scheduler, &value, 3.0, 1.0);
    let journal = Journal::new();
    scheduler
        .settings(id)
        .unwrap()
        .on_complete(journal.callback("complete"))
        .on_kill(journal.callback("kill"));

    scheduler.kill(id, true).unwrap();
    assert_eq!(journal.entries(), vec!["complete", "kill"]);
    assert_close(value.get(), 3.0);
}

#[test]
fn test_pause_from_step_complete() {
    let mut scheduler = Scheduler::new();
    let value = cell(0.0);
    let id = linear(&mut scheduler, &value, 1.0, 1.0);
    let pauses = Counter::new();
    scheduler
        .settings(id)
        .unwrap()
        .loops(3, LoopType::Restart)
        .on_step_complete(move |s| {
            assert_eq!(s.pause(id), Ok(true));
        })
        .on_pause(pauses.callback());

    run(&mut scheduler, 8, 0.25);
    assert_eq!(scheduler.completed_loops(id), Ok(1));
    assert_eq!(scheduler.is_playing(id), Ok(false));
    assert_close(scheduler.position(id).unwrap(), 1.0);
    assert_eq!(pauses.get(), 1);

    assert_eq!(scheduler.play(id), Ok(true));
    run(&mut scheduler, 1, 0.25);
    assert_eq!(scheduler.completed_loops(id), Ok(1));
    assert_close(value.get(), 0.25);
}

#[test]
fn test_kill_all_from_callback_stops_the_pass() {
    let mut scheduler = Scheduler::new();
    let cells: Vec<_> = (0..3).map(|_| cell(0.0)).collect();
    let ids: Vec<_> = cells
        .iter()
        .map(|c| linear(&mut scheduler, c, 1.0, 1.0))
        .collect();
    let kills = Counter::new();
    for id in &ids {
        scheduler.settings(*id).unwrap().on_kill(kills.callback());
    }
    scheduler.settings(ids[0]).unwrap().on_update(|s| {
        s.kill_all();
    });

    scheduler.update(0.25, 0.25);
    assert_close(cells[0].get(), 0.25);
    assert_close(cells[1].get(), 0.0);
    assert_close(cells[2].get(), 0.0);
    assert_eq!(kills.get(), 3);
    let stats = scheduler.stats();
    assert_eq!((stats.tweeners, stats.active), (0, 0));
}

#[test]
fn test_unreachable_target_kills_only_its_tween() {
    let mut scheduler = Scheduler::new();
    let gone = cell(0.0);
    let kept = cell(0.0);
    let broken = scheduler.to(Accessor::weak(&gone), 1.0, 1.0);
    let healthy = linear(&mut scheduler, &kept, 1.0, 1.0);
    let broken_kills = Counter::new();
    scheduler
        .settings(broken)
        .unwrap()
        .on_kill(broken_kills.callback());
    drop(gone);

    scheduler.update(0.5, 0.5);
    assert!(!scheduler.is_active(broken));
    assert_eq!(broken_kills.get(), 1);
    assert_close(kept.get(), 0.5);
    assert!(scheduler.is_active(healthy));
}

#[test]
fn test_relative_end_and_changed_start() {
    let mut scheduler = Scheduler::new();
    let value = cell(10.0);
    let id = linear(&mut scheduler, &value, 5.0, 1.0);
    let updates = Counter::new();
    scheduler
        .settings(id)
        .unwrap()
        .relative(true)
        .on_update(updates.callback());

    scheduler.update(0.5, 0.5);
    assert_close(value.get(), 12.5);
    let values = scheduler.tween_values::<f32>(id).unwrap();
    assert_close(values.end, 15.0);
    assert_eq!(updates.get(), 1);

    scheduler.change_start_value(id, 11.0f32).unwrap();
    assert_close(value.get(), 11.0);
    assert_eq!(scheduler.position(id), Ok(0.0));
    assert_eq!(updates.get(), 1);

    scheduler.update(0.5, 0.5);
    assert_close(value.get(), 13.0);
    assert!(matches!(
        scheduler.change_start_value(id, 1.0f64),
        Err(TweenError::ValueTypeMismatch { .. })
    ));
}

#[test]
fn test_settings_on_dead_handle() {
    let mut scheduler = Scheduler::new();
    let id = linear(&mut scheduler, &cell(0.0), 1.0, 1.0);
    scheduler.kill(id, false).unwrap();
    assert!(matches!(
        scheduler.settings(id),
        Err(TweenError::InvalidHandle)
    ));
    assert_eq!(scheduler.play(id), Err(TweenError::InvalidHandle));
    assert!(!scheduler.is_active(id));
}

#[test]
fn test_settings_on_running_tween_are_ignored() {
    common::init_tracing();
    let mut scheduler = Scheduler::new();
    let value = cell(0.0);
    let id = linear(&mut scheduler, &value, 1.0, 1.0);
    scheduler.settings(id).unwrap().on_update(move |s| {
        s.settings(id).unwrap().time_scale(4.0);
    });

    run(&mut scheduler, 2, 0.25);
    assert_close(value.get(), 0.5);

    scheduler.settings(id).unwrap().time_scale(2.0);
    run(&mut scheduler, 1, 0.25);
    assert_close(value.get(), 1.0);
}
