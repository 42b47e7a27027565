//! Tween lifecycle callbacks
//!
//! Callbacks are additive: every registration appends a subscriber. A
//! callback receives the scheduler so it can start, pause or kill other
//! units while a dispatch pass is running.

use crate::error::TweenError;
use crate::scheduler::Scheduler;
use smallvec::SmallVec;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// A lifecycle notification
pub type TweenCallback = Box<dyn FnMut(&mut Scheduler)>;

/// Lifecycle events a callback can subscribe to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TweenEvent {
    /// First activation after the delay, fired once
    Start,
    /// Every time the tween starts playing
    Play,
    /// Playback stopped without being killed by completion
    Pause,
    /// The tween reached position 0 with no completed loops
    Rewind,
    /// Every per-tick update
    Update,
    /// A loop boundary was crossed
    StepComplete,
    /// All loops completed
    Complete,
    /// The tween is being retired
    Kill,
}

/// Subscribers for a single event
#[derive(Default)]
pub(crate) struct CallbackList {
    callbacks: SmallVec<[TweenCallback; 1]>,
}

impl CallbackList {
    pub fn push(&mut self, callback: TweenCallback) {
        self.callbacks.push(callback);
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Invoke every subscriber in registration order
    ///
    /// Stops at the first panicking subscriber.
    pub fn invoke(&mut self, scheduler: &mut Scheduler) -> Result<(), TweenError> {
        for callback in self.callbacks.iter_mut() {
            guard(|| callback(scheduler))?;
        }
        Ok(())
    }
}

/// All callback lists of a tween
#[derive(Default)]
pub(crate) struct TweenCallbacks {
    on_start: CallbackList,
    on_play: CallbackList,
    on_pause: CallbackList,
    on_rewind: CallbackList,
    on_update: CallbackList,
    on_step_complete: CallbackList,
    on_complete: CallbackList,
    on_kill: CallbackList,
}

impl TweenCallbacks {
    pub fn list_mut(&mut self, event: TweenEvent) -> &mut CallbackList {
        match event {
            TweenEvent::Start => &mut self.on_start,
            TweenEvent::Play => &mut self.on_play,
            TweenEvent::Pause => &mut self.on_pause,
            TweenEvent::Rewind => &mut self.on_rewind,
            TweenEvent::Update => &mut self.on_update,
            TweenEvent::StepComplete => &mut self.on_step_complete,
            TweenEvent::Complete => &mut self.on_complete,
            TweenEvent::Kill => &mut self.on_kill,
        }
    }

    pub fn add(&mut self, event: TweenEvent, callback: TweenCallback) {
        self.list_mut(event).push(callback);
    }

    pub fn has_any(&self) -> bool {
        !(self.on_start.is_empty()
            && self.on_play.is_empty()
            && self.on_pause.is_empty()
            && self.on_rewind.is_empty()
            && self.on_update.is_empty()
            && self.on_step_complete.is_empty()
            && self.on_complete.is_empty()
            && self.on_kill.is_empty())
    }
}

/// Run user code, converting a panic into [`TweenError::CallbackPanicked`]
pub(crate) fn guard<R>(f: impl FnOnce() -> R) -> Result<R, TweenError> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let message = panic_message(payload.as_ref());
        tracing::error!("tween callback panicked: {}", message);
        TweenError::CallbackPanicked(message)
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
