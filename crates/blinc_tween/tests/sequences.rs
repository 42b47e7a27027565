//! Sequence composition, markers and nesting

mod common;

use blinc_tween::{Accessor, LoopType, Scheduler, SequencedItem, TweenError};
use common::{assert_close, cell, linear, run, Journal};

#[test]
fn test_append_join_and_duration() {
    common::init_tracing();
    let mut scheduler = Scheduler::new();
    let (a, b, c) = (cell(0.0), cell(0.0), cell(0.0));
    let first = linear(&mut scheduler, &a, 1.0, 2.0);
    let joined = linear(&mut scheduler, &b, 1.0, 5.0);
    let last = linear(&mut scheduler, &c, 1.0, 1.0);

    let seq = scheduler.sequence();
    scheduler.append(seq, first).unwrap();
    scheduler.join(seq, joined).unwrap();
    assert_close(scheduler.duration(seq, false).unwrap(), 5.0);

    scheduler.append(seq, last).unwrap();
    assert_close(scheduler.duration(seq, false).unwrap(), 6.0);

    let entries = scheduler.sequence_entries(seq).unwrap();
    let placement: Vec<_> = entries
        .iter()
        .map(|e| (e.item, e.position, e.end_position))
        .collect();
    assert_eq!(
        placement,
        vec![
            (SequencedItem::Tween(first), 0.0, 2.0),
            (SequencedItem::Tween(joined), 0.0, 5.0),
            (SequencedItem::Tween(last), 5.0, 6.0),
        ]
    );
    assert_eq!(scheduler.is_sequenced(last), Ok(true));
    assert!(scheduler.is_active(last));
    // Only the sequence itself is dispatched
    assert_eq!(scheduler.stats().active, 1);
}

#[test]
fn test_prepend_and_intervals_shift_entries() {
    let mut scheduler = Scheduler::new();
    let (a, b) = (cell(0.0), cell(0.0));
    let first = linear(&mut scheduler, &a, 1.0, 1.0);
    let second = linear(&mut scheduler, &b, 1.0, 1.0);
    scheduler.settings(second).unwrap().delay(0.5);

    let seq = scheduler.sequence();
    scheduler.append(seq, first).unwrap();
    scheduler.prepend_interval(seq, 1.0).unwrap();
    scheduler.prepend(seq, second).unwrap();
    scheduler.append_interval(seq, 0.25).unwrap();

    let entries = scheduler.sequence_entries(seq).unwrap();
    // The prepended child's delay is folded into its start offset
    assert_eq!(entries[0].item, SequencedItem::Tween(first));
    assert_close(entries[0].position, 2.5);
    assert_eq!(entries[1].item, SequencedItem::Tween(second));
    assert_close(entries[1].position, 0.5);
    assert_close(entries[1].end_position, 1.5);
    assert_close(scheduler.duration(seq, false).unwrap(), 3.75);
    assert_close(scheduler.delay(second).unwrap(), 0.0);
}

#[test]
fn test_markers_fire_in_timeline_order() {
    let mut scheduler = Scheduler::new();
    let journal = Journal::new();
    let (a, b) = (cell(0.0), cell(0.0));
    let first = linear(&mut scheduler, &a, 1.0, 1.0);
    let second = linear(&mut scheduler, &b, 1.0, 1.0);

    let seq = scheduler.sequence();
    scheduler.append_callback(seq, journal.callback("start")).unwrap();
    scheduler.append(seq, first).unwrap();
    scheduler.insert_callback(seq, 0.5, journal.callback("mid")).unwrap();
    scheduler.append(seq, second).unwrap();
    scheduler.append_callback(seq, journal.callback("end")).unwrap();
    scheduler
        .settings(seq)
        .unwrap()
        .on_complete(journal.callback("complete"));

    run(&mut scheduler, 8, 0.25);
    assert_eq!(journal.entries(), vec!["start", "mid", "end", "complete"]);
    assert_close(a.get(), 1.0);
    assert_close(b.get(), 1.0);
    assert!(!scheduler.is_active(seq));
    assert_eq!(scheduler.stats().sequences, 0);
    assert_eq!(scheduler.stats().tweeners, 0);
}

#[test]
fn test_goto_skips_markers() {
    let mut scheduler = Scheduler::new();
    let journal = Journal::new();
    let a = cell(0.0);
    let child = linear(&mut scheduler, &a, 4.0, 2.0);

    let seq = scheduler.sequence();
    scheduler.append(seq, child).unwrap();
    scheduler.insert_callback(seq, 1.0, journal.callback("marker")).unwrap();

    scheduler.goto(seq, 1.5, false).unwrap();
    assert_close(a.get(), 3.0);
    assert!(journal.entries().is_empty());
}

#[test]
fn test_nested_sequences_drive_grandchildren() {
    let mut scheduler = Scheduler::new();
    let (a, b) = (cell(0.0), cell(0.0));
    let outer_child = linear(&mut scheduler, &a, 10.0, 1.0);
    let inner_child = linear(&mut scheduler, &b, 10.0, 1.0);

    let inner = scheduler.sequence();
    scheduler.append(inner, inner_child).unwrap();
    let outer = scheduler.sequence();
    scheduler.append(outer, outer_child).unwrap();
    scheduler.append(outer, inner).unwrap();
    assert_close(scheduler.duration(outer, false).unwrap(), 2.0);

    run(&mut scheduler, 6, 0.25);
    assert_close(a.get(), 10.0);
    assert_close(b.get(), 5.0);

    assert_eq!(scheduler.play(inner), Err(TweenError::Sequenced));
    assert_eq!(scheduler.kill(inner_child, false), Err(TweenError::Sequenced));

    run(&mut scheduler, 2, 0.25);
    assert_close(b.get(), 10.0);
    let stats = scheduler.stats();
    assert_eq!((stats.tweeners, stats.sequences), (0, 0));
}

#[test]
fn test_yoyo_sequence_runs_children_backwards() {
    let mut scheduler = Scheduler::new();
    let a = cell(0.0);
    let child = linear(&mut scheduler, &a, 10.0, 1.0);
    let seq = scheduler.sequence();
    scheduler.append(seq, child).unwrap();
    scheduler.settings(seq).unwrap().loops(2, LoopType::Yoyo);

    run(&mut scheduler, 3, 0.25);
    assert_close(a.get(), 7.5);
    run(&mut scheduler, 2, 0.25);
    assert_eq!(scheduler.completed_loops(seq), Ok(1));
    assert_close(a.get(), 7.5);
    run(&mut scheduler, 2, 0.25);
    assert_close(a.get(), 2.5);
}

#[test]
fn test_children_are_locked_once_started() {
    let mut scheduler = Scheduler::new();
    let (a, b) = (cell(0.0), cell(0.0));
    let first = linear(&mut scheduler, &a, 1.0, 1.0);
    let late = linear(&mut scheduler, &b, 1.0, 1.0);
    let seq = scheduler.sequence();
    scheduler.append(seq, first).unwrap();

    run(&mut scheduler, 1, 0.25);
    assert_eq!(scheduler.append(seq, late), Err(TweenError::Locked));
    assert!(scheduler.is_active(late));

    let other = scheduler.sequence();
    assert!(scheduler.append(other, first).is_err());
    assert!(scheduler.append(seq, seq).is_err());
}

#[test]
fn test_unreachable_child_is_dropped() {
    let mut scheduler = Scheduler::new();
    let gone = cell(0.0);
    let kept = cell(0.0);
    let weak = scheduler.to(Accessor::weak(&gone), 1.0, 1.0);
    let strong = linear(&mut scheduler, &kept, 1.0, 1.0);

    let seq = scheduler.sequence();
    scheduler.append(seq, weak).unwrap();
    scheduler.join(seq, strong).unwrap();
    drop(gone);

    run(&mut scheduler, 2, 0.25);
    assert_close(kept.get(), 0.5);
    assert!(scheduler.is_active(seq));

    let entries = scheduler.sequence_entries(seq).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].item, SequencedItem::Tween(strong));
    assert_eq!(scheduler.status(weak), Err(TweenError::InvalidHandle));
    assert_eq!(scheduler.stats().tweeners, 1);
}
