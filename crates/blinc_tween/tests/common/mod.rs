//! Shared helpers for the integration tests

#![allow(dead_code)]

use blinc_tween::{Accessor, Ease, Scheduler, TweenId};
use std::cell::Cell;
use std::rc::Rc;

/// Route `tracing` output to the test harness, honoring `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn cell(value: f32) -> Rc<Cell<f32>> {
    Rc::new(Cell::new(value))
}

/// Linear float tween writing into `target`
pub fn linear(
    scheduler: &mut Scheduler,
    target: &Rc<Cell<f32>>,
    end: f32,
    duration: f32,
) -> TweenId {
    let id = scheduler.to(Accessor::shared(target.clone()), end, duration);
    scheduler.settings(id).unwrap().ease(Ease::Linear);
    id
}

/// Counts how many times its callbacks ran
#[derive(Clone, Default)]
pub struct Counter(Rc<Cell<u32>>);

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u32 {
        self.0.get()
    }

    pub fn callback(&self) -> impl FnMut(&mut Scheduler) + 'static {
        let count = self.0.clone();
        move |_| count.set(count.get() + 1)
    }
}

/// Records labelled events in order
#[derive(Clone, Default)]
pub struct Journal(Rc<std::cell::RefCell<Vec<&'static str>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<&'static str> {
        self.0.borrow().clone()
    }

    pub fn callback(&self, label: &'static str) -> impl FnMut(&mut Scheduler) + 'static {
        let log = self.0.clone();
        move |_| log.borrow_mut().push(label)
    }
}

pub fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-4,
        "expected {expected}, got {actual}"
    );
}

/// Advance the normal phase `steps` times by `dt`
pub fn run(scheduler: &mut Scheduler, steps: usize, dt: f32) {
    for _ in 0..steps {
        scheduler.update(dt, dt);
    }
}
