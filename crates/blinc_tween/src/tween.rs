//! Tween state shared by tweeners and sequences
//!
//! A [`Tween`] is either a leaf tweener bound to one value or a sequence of
//! child tweens. Both share the same lifecycle: configuring, running after
//! startup, and retired once complete or killed.

use crate::callbacks::{TweenCallback, TweenCallbacks, TweenEvent};
use crate::config::SchedulerConfig;
use crate::easing::{CustomEase, Ease};
use crate::error::TweenError;
use crate::plugins::{TweenValue, ValuePlugin, ValueShape};
use crate::scheduler::{Scheduler, TweenId};
use crate::sequence::SequenceBody;
use crate::tweener::AnyTweener;

/// How a tween behaves when it starts a new loop
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LoopType {
    /// Each loop restarts from the beginning
    #[default]
    Restart,
    /// Loops alternate forward and backward
    Yoyo,
    /// Each loop starts where the previous one ended
    Incremental,
}

/// The dispatch category a tween is driven by
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UpdatePhase {
    #[default]
    Normal,
    Late,
    Fixed,
    /// Only advanced through [`Scheduler::manual_update`]
    Manual,
}

impl UpdatePhase {
    pub const ALL: [UpdatePhase; 4] = [
        UpdatePhase::Normal,
        UpdatePhase::Late,
        UpdatePhase::Fixed,
        UpdatePhase::Manual,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            UpdatePhase::Normal => 0,
            UpdatePhase::Late => 1,
            UpdatePhase::Fixed => 2,
            UpdatePhase::Manual => 3,
        }
    }
}

/// How a seek was requested
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SeekMode {
    /// Per-tick advancement, every callback fires
    Update,
    /// Absolute jump, on-update is suppressed
    Goto,
    /// Internal rewind, only the visible state changes
    Silent,
}

/// Loop state of a parent sequence while it drives a child
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParentLoop {
    pub loop_type: LoopType,
    /// Zero based loop cycle the parent is currently sweeping
    pub cycle: i32,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct SeekContext {
    pub mode: SeekMode,
    pub parent: Option<ParentLoop>,
}

impl SeekContext {
    pub fn top(mode: SeekMode) -> Self {
        Self { mode, parent: None }
    }

    pub fn nested(mode: SeekMode, parent: ParentLoop) -> Self {
        Self {
            mode,
            parent: Some(parent),
        }
    }
}

pub(crate) enum TweenKind {
    Tweener(Box<dyn AnyTweener>),
    Sequence(SequenceBody),
}

pub(crate) struct Tween {
    pub kind: TweenKind,
    pub callbacks: TweenCallbacks,
    /// Owning sequence, if nested
    pub parent: Option<TweenId>,

    pub duration: f32,
    pub delay: f32,
    pub loops: i32,
    pub loop_type: LoopType,
    pub ease: Ease,
    pub custom_ease: Option<CustomEase>,
    pub overshoot: f32,
    pub period: f32,
    pub time_scale: f32,
    pub autokill: bool,
    pub recyclable: bool,
    pub is_relative: bool,
    pub is_speed_based: bool,
    pub is_independent_update: bool,
    pub update_phase: UpdatePhase,
    pub is_backwards: bool,

    pub creation_locked: bool,
    pub startup_done: bool,
    pub played_once: bool,
    pub delay_complete: bool,
    pub elapsed_delay: f32,
    pub position: f32,
    pub full_duration: f32,
    pub completed_loops: i32,
    pub is_playing: bool,
    pub is_complete: bool,
}

impl Tween {
    pub fn new(kind: TweenKind, config: &SchedulerConfig) -> Self {
        let is_sequence = matches!(kind, TweenKind::Sequence(_));
        Self {
            kind,
            callbacks: TweenCallbacks::default(),
            parent: None,
            duration: 0.0,
            delay: 0.0,
            loops: 1,
            loop_type: config.default_loop_type,
            ease: if is_sequence {
                Ease::Linear
            } else {
                config.default_ease
            },
            custom_ease: None,
            overshoot: config.default_overshoot,
            period: config.default_period,
            time_scale: 1.0,
            autokill: config.default_autokill,
            recyclable: !is_sequence && config.default_recyclable,
            is_relative: false,
            is_speed_based: false,
            is_independent_update: config.default_independent_update,
            update_phase: config.default_update_phase,
            is_backwards: false,
            creation_locked: false,
            startup_done: false,
            played_once: false,
            delay_complete: true,
            elapsed_delay: 0.0,
            position: 0.0,
            full_duration: 0.0,
            completed_loops: 0,
            is_playing: true,
            is_complete: false,
        }
    }

    /// Return every field to its default, dropping callbacks and bindings
    pub fn reset(&mut self, config: &SchedulerConfig) {
        let mut kind = std::mem::replace(
            &mut self.kind,
            TweenKind::Sequence(SequenceBody::default()),
        );
        if let TweenKind::Tweener(tweener) = &mut kind {
            tweener.reset();
        }
        *self = Tween::new(kind, config);
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.kind, TweenKind::Sequence(_))
    }

    pub fn shape(&self) -> Option<ValueShape> {
        match &self.kind {
            TweenKind::Tweener(tweener) => Some(tweener.shape()),
            TweenKind::Sequence(_) => None,
        }
    }

    pub fn has_loops(&self) -> bool {
        self.loops == -1 || self.loops > 1
    }

    pub fn compute_full_duration(&self) -> f32 {
        if self.loops > -1 {
            self.duration * self.loops as f32
        } else {
            f32::INFINITY
        }
    }

    /// Loop position and completed loops matching absolute time `to`
    pub fn loop_target(&self, to: f32) -> (f32, i32) {
        loop_target(to, self.duration, self.loops)
    }

    pub fn status(&self) -> TweenStatus {
        TweenStatus {
            position: self.position,
            completed_loops: self.completed_loops,
            loops: self.loops,
            duration: self.duration,
            delay: self.delay,
            elapsed_delay: self.elapsed_delay,
            is_playing: self.is_playing,
            is_backwards: self.is_backwards,
            is_complete: self.is_complete,
            is_sequenced: self.parent.is_some(),
            startup_done: self.startup_done,
            update_phase: self.update_phase,
        }
    }

    fn unlocked(&self) -> Result<(), TweenError> {
        if self.parent.is_some() {
            Err(TweenError::Sequenced)
        } else if self.creation_locked {
            Err(TweenError::Locked)
        } else {
            Ok(())
        }
    }
}

/// Split absolute time `to` into `(position, completed_loops)`
pub(crate) fn loop_target(to: f32, duration: f32, loops: i32) -> (f32, i32) {
    let to = to.max(0.0);
    if duration <= 0.0 {
        return if loops == -1 { (0.0, 1) } else { (0.0, loops) };
    }
    let completed_loops = (to / duration).floor() as i32;
    let position = to % duration;
    if loops != -1 && completed_loops >= loops {
        (duration, loops)
    } else if position >= duration {
        (0.0, completed_loops)
    } else {
        (position, completed_loops)
    }
}

/// Read-only snapshot of a tween's playback state
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TweenStatus {
    pub position: f32,
    pub completed_loops: i32,
    pub loops: i32,
    pub duration: f32,
    pub delay: f32,
    pub elapsed_delay: f32,
    pub is_playing: bool,
    pub is_backwards: bool,
    pub is_complete: bool,
    pub is_sequenced: bool,
    pub startup_done: bool,
    pub update_phase: UpdatePhase,
}

impl TweenStatus {
    /// Loops that count toward elapsed time
    fn counted_loops(&self) -> i32 {
        if self.position >= self.duration && self.completed_loops > 0 {
            self.completed_loops - 1
        } else {
            self.completed_loops
        }
    }

    /// Elapsed time, optionally including completed loops
    pub fn elapsed(&self, include_loops: bool) -> f32 {
        if include_loops {
            self.counted_loops() as f32 * self.duration + self.position
        } else {
            self.position
        }
    }

    pub fn full_duration(&self) -> f32 {
        if self.loops > -1 {
            self.duration * self.loops as f32
        } else {
            f32::INFINITY
        }
    }

    /// Elapsed time as a fraction in `[0, 1]`
    pub fn elapsed_percentage(&self, include_loops: bool) -> f32 {
        if include_loops {
            let full = self.full_duration();
            if full <= 0.0 || full.is_infinite() {
                return 0.0;
            }
            self.elapsed(true) / full
        } else if self.duration <= 0.0 {
            if self.is_complete {
                1.0
            } else {
                0.0
            }
        } else {
            self.position / self.duration
        }
    }
}

/// Chainable configuration view over a single tween
///
/// ```ignore
/// scheduler
///     .settings(id)?
///     .ease(Ease::InOutSine)
///     .loops(3, LoopType::Yoyo)
///     .on_complete(|_| println!("done"));
/// ```
///
/// Invalid settings are logged and ignored so a chain never aborts halfway.
pub struct TweenSettings<'a> {
    scheduler: &'a mut Scheduler,
    id: TweenId,
}

impl<'a> TweenSettings<'a> {
    pub(crate) fn new(scheduler: &'a mut Scheduler, id: TweenId) -> Self {
        Self { scheduler, id }
    }

    pub fn id(&self) -> TweenId {
        self.id
    }

    fn update(
        self,
        what: &'static str,
        f: impl FnOnce(&mut Tween) -> Result<(), TweenError>,
    ) -> Self {
        let exists = self.scheduler.contains(self.id);
        let result = match self.scheduler.tween_mut(self.id) {
            Some(tween) => f(tween),
            None if exists => Err(TweenError::Locked),
            None => Err(TweenError::InvalidHandle),
        };
        if let Err(err) = result {
            tracing::warn!("ignoring {} for tween {:?}: {}", what, self.id, err);
        }
        self
    }

    fn log(self, what: &'static str, result: Result<(), TweenError>) -> Self {
        if let Err(err) = result {
            tracing::warn!("ignoring {} for tween {:?}: {}", what, self.id, err);
        }
        self
    }

    pub fn ease(self, ease: Ease) -> Self {
        self.update("ease", |t| {
            t.ease = ease;
            t.custom_ease = None;
            Ok(())
        })
    }

    /// Ease with an explicit overshoot (back and elastic curves)
    pub fn ease_overshoot(self, ease: Ease, overshoot: f32) -> Self {
        self.update("ease", |t| {
            t.ease = ease;
            t.custom_ease = None;
            t.overshoot = overshoot;
            Ok(())
        })
    }

    pub fn ease_elastic(self, ease: Ease, amplitude: f32, period: f32) -> Self {
        self.update("ease", |t| {
            t.ease = ease;
            t.custom_ease = None;
            t.overshoot = amplitude;
            t.period = period;
            Ok(())
        })
    }

    /// Custom function or sampled curve, overriding the named ease
    pub fn custom_ease(self, ease: CustomEase) -> Self {
        self.update("custom ease", |t| {
            t.custom_ease = Some(ease);
            Ok(())
        })
    }

    /// Set the loop count (`-1` loops forever) and loop type
    pub fn loops(self, loops: i32, loop_type: LoopType) -> Self {
        self.update("loops", |t| {
            t.unlocked()?;
            t.loops = match loops {
                l if l < -1 => -1,
                0 => 1,
                l => l,
            };
            t.loop_type = loop_type;
            if !t.is_sequence() {
                t.full_duration = t.compute_full_duration();
            }
            Ok(())
        })
    }

    pub fn delay(self, delay: f32) -> Self {
        self.update("delay", |t| {
            if t.parent.is_some() {
                return Err(TweenError::Sequenced);
            }
            t.delay = delay.max(0.0);
            t.delay_complete = t.delay <= 0.0;
            Ok(())
        })
    }

    pub fn time_scale(self, time_scale: f32) -> Self {
        self.update("time scale", |t| {
            t.time_scale = time_scale;
            Ok(())
        })
    }

    /// Retire the tween as soon as it completes
    pub fn autokill(self, autokill: bool) -> Self {
        self.update("autokill", |t| {
            t.unlocked()?;
            t.autokill = autokill;
            Ok(())
        })
    }

    /// Return the tweener to the pool once retired
    pub fn recyclable(self, recyclable: bool) -> Self {
        self.update("recyclable", |t| {
            if t.is_sequence() {
                return Err(TweenError::InvalidSequence("sequences are never pooled"));
            }
            t.recyclable = recyclable;
            Ok(())
        })
    }

    /// Treat the end value as an offset from the start value
    pub fn relative(self, relative: bool) -> Self {
        self.update("relative", |t| {
            t.unlocked()?;
            if t.startup_done {
                return Err(TweenError::Locked);
            }
            t.is_relative = relative;
            Ok(())
        })
    }

    /// Interpret the duration as units per second
    pub fn speed_based(self, speed_based: bool) -> Self {
        self.update("speed based", |t| {
            t.unlocked()?;
            if t.is_sequence() {
                return Err(TweenError::InvalidSequence(
                    "sequences cannot be speed based",
                ));
            }
            t.is_speed_based = speed_based;
            Ok(())
        })
    }

    /// Advance with the independent delta instead of the regular one
    pub fn independent_update(self, independent: bool) -> Self {
        self.update("independent update", |t| {
            t.is_independent_update = independent;
            Ok(())
        })
    }

    pub fn update_phase(self, phase: UpdatePhase) -> Self {
        let result = self.scheduler.set_update_phase(self.id, phase);
        self.log("update phase", result)
    }

    pub fn int_id(self, id: i32) -> Self {
        let result = self
            .scheduler
            .tags_mut(self.id)
            .map(|tags| tags.int_id = Some(id));
        self.log("int id", result)
    }

    pub fn string_id(self, id: impl Into<String>) -> Self {
        let id = id.into();
        let result = self
            .scheduler
            .tags_mut(self.id)
            .map(|tags| tags.string_id = Some(id));
        self.log("string id", result)
    }

    /// Opaque key of the object being animated
    pub fn target(self, target: u64) -> Self {
        let result = self
            .scheduler
            .tags_mut(self.id)
            .map(|tags| tags.target = Some(target));
        self.log("target", result)
    }

    /// Subscribe to a lifecycle event
    pub fn on(self, event: TweenEvent, callback: impl FnMut(&mut Scheduler) + 'static) -> Self {
        let result = self
            .scheduler
            .add_callback(self.id, event, Box::new(callback) as TweenCallback);
        self.log("callback", result)
    }

    pub fn on_start(self, callback: impl FnMut(&mut Scheduler) + 'static) -> Self {
        self.on(TweenEvent::Start, callback)
    }

    pub fn on_play(self, callback: impl FnMut(&mut Scheduler) + 'static) -> Self {
        self.on(TweenEvent::Play, callback)
    }

    pub fn on_pause(self, callback: impl FnMut(&mut Scheduler) + 'static) -> Self {
        self.on(TweenEvent::Pause, callback)
    }

    pub fn on_rewind(self, callback: impl FnMut(&mut Scheduler) + 'static) -> Self {
        self.on(TweenEvent::Rewind, callback)
    }

    pub fn on_update(self, callback: impl FnMut(&mut Scheduler) + 'static) -> Self {
        self.on(TweenEvent::Update, callback)
    }

    pub fn on_step_complete(self, callback: impl FnMut(&mut Scheduler) + 'static) -> Self {
        self.on(TweenEvent::StepComplete, callback)
    }

    pub fn on_complete(self, callback: impl FnMut(&mut Scheduler) + 'static) -> Self {
        self.on(TweenEvent::Complete, callback)
    }

    pub fn on_kill(self, callback: impl FnMut(&mut Scheduler) + 'static) -> Self {
        self.on(TweenEvent::Kill, callback)
    }

    /// Replace the plugin options of a tweener animating `T`
    pub fn plugin_options<T: TweenValue>(
        self,
        options: <T::Plugin as ValuePlugin>::Options,
    ) -> Self {
        self.update("plugin options", |t| {
            t.tweener_core_mut::<T::Plugin>()?.set_options(options);
            Ok(())
        })
    }

    /// Play from the live value to it, see [`Scheduler::set_from`]
    pub fn from(self, relative: bool) -> Self {
        let result = self.scheduler.set_from(self.id, relative);
        self.log("from", result)
    }

    /// Play from an explicit value, see [`Scheduler::set_from_value`]
    pub fn from_value<T: TweenValue>(self, value: T, relative: bool) -> Self {
        let result = self.scheduler.set_from_value(self.id, value, relative);
        self.log("from value", result)
    }
}
