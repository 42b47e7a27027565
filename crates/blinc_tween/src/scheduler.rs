//! Tween scheduler
//!
//! The scheduler owns every tween, tweener and sequence. Handles returned to
//! callers are generational [`TweenId`]s, so a handle to a retired tween
//! resolves to nothing instead of aliasing a recycled unit.
//!
//! A tween's state is taken out of its slot while its own code runs (seek,
//! callbacks, controls). Anything that would retire or re-enter a tween that
//! is taken out is queued and applied when it goes back:
//!
//! - kills requested while any tween is running go to a kill list that is
//!   flushed once the outermost operation returns
//! - controls aimed at a running tween are applied when it is checked back in
//! - queries on a running tween read the status snapshot stored in its slot

use crate::accessor::Accessor;
use crate::callbacks::{TweenCallback, TweenEvent};
use crate::config::SchedulerConfig;
use crate::error::TweenError;
use crate::plugins::{TweenValue, ValuePlugin};
use crate::registry::{ActiveSlots, TweenerPool};
use crate::sequence::SequenceBody;
use crate::tween::{
    SeekContext, SeekMode, Tween, TweenKind, TweenSettings, TweenStatus, UpdatePhase,
};
use crate::tweener::TweenerCore;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

new_key_type! {
    /// Handle to a tween or sequence owned by a [`Scheduler`]
    pub struct TweenId;
}

/// Lookup tags used by filtered operations
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct TweenTags {
    pub int_id: Option<i32>,
    pub string_id: Option<String>,
    pub target: Option<u64>,
}

/// A control queued against a tween that was running when it was issued
pub(crate) enum Control {
    Play,
    PlayForward,
    PlayBackwards,
    Pause,
    TogglePause,
    Rewind { include_delay: bool },
    Restart { include_delay: bool },
    Complete,
    Goto { to: f32, and_play: bool },
    Flip,
    AddCallback(TweenEvent, TweenCallback),
}

impl Control {
    fn name(&self) -> &'static str {
        match self {
            Control::Play => "play",
            Control::PlayForward => "play forward",
            Control::PlayBackwards => "play backwards",
            Control::Pause => "pause",
            Control::TogglePause => "toggle pause",
            Control::Rewind { .. } => "rewind",
            Control::Restart { .. } => "restart",
            Control::Complete => "complete",
            Control::Goto { .. } => "goto",
            Control::Flip => "flip",
            Control::AddCallback(..) => "add callback",
        }
    }
}

pub(crate) struct TweenSlot {
    /// `None` while the tween is checked out
    pub tween: Option<Box<Tween>>,
    /// Last known state, served while the tween is checked out
    pub status: TweenStatus,
    pub active_index: Option<usize>,
    pub phase: UpdatePhase,
    pub is_sequence: bool,
    /// Owned by a sequence and driven only through it
    pub sequenced: bool,
    /// Marked for retirement; no longer dispatched or controllable
    pub killed: bool,
    pub tags: TweenTags,
    pub deferred: SmallVec<[Control; 2]>,
}

impl TweenSlot {
    pub fn new(tween: Option<Box<Tween>>, phase: UpdatePhase) -> Self {
        let status = tween.as_ref().map(|t| t.status()).unwrap_or_default();
        let is_sequence = tween.as_ref().is_some_and(|t| t.is_sequence());
        Self {
            tween,
            status,
            active_index: None,
            phase,
            is_sequence,
            sequenced: false,
            killed: false,
            tags: TweenTags::default(),
            deferred: SmallVec::new(),
        }
    }

    fn status(&self) -> TweenStatus {
        self.tween.as_ref().map_or(self.status, |t| t.status())
    }
}

/// Selects top-level tweens for the `*_where` operations
///
/// Every criterion that is set must match; an empty filter matches all.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TweenFilter {
    pub int_id: Option<i32>,
    pub string_id: Option<String>,
    pub target: Option<u64>,
    pub phase: Option<UpdatePhase>,
    pub playing: Option<bool>,
}

impl TweenFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_int_id(mut self, id: i32) -> Self {
        self.int_id = Some(id);
        self
    }

    pub fn with_string_id(mut self, id: impl Into<String>) -> Self {
        self.string_id = Some(id.into());
        self
    }

    pub fn with_target(mut self, target: u64) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_phase(mut self, phase: UpdatePhase) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn with_playing(mut self, playing: bool) -> Self {
        self.playing = Some(playing);
        self
    }

    fn matches(&self, slot: &TweenSlot) -> bool {
        fn check<T: PartialEq>(wanted: &Option<T>, actual: &Option<T>) -> bool {
            wanted.is_none() || wanted == actual
        }
        check(&self.int_id, &slot.tags.int_id)
            && check(&self.string_id, &slot.tags.string_id)
            && check(&self.target, &slot.tags.target)
            && self.phase.map_or(true, |phase| phase == slot.phase)
            && self
                .playing
                .map_or(true, |playing| playing == slot.status().is_playing)
    }
}

/// Registry counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Tweens in the active array
    pub active: usize,
    /// Active tweens per phase, indexed like [`UpdatePhase::ALL`]
    pub per_phase: [usize; 4],
    /// Live tweeners, nested ones included
    pub tweeners: usize,
    /// Live sequences, nested ones included
    pub sequences: usize,
    pub pooled: usize,
    pub max_tweeners: usize,
    pub max_sequences: usize,
    pub active_capacity: usize,
}

/// Owns and drives every tween
///
/// All operations are single threaded. Callbacks receive `&mut Scheduler`
/// and may create, control or kill tweens while a dispatch pass runs.
pub struct Scheduler {
    config: SchedulerConfig,
    tweens: SlotMap<TweenId, TweenSlot>,
    active: ActiveSlots,
    pool: TweenerPool,
    kill_list: Vec<TweenId>,
    /// Number of tweens currently checked out
    depth: u32,
    dispatching: bool,
    /// Bumped by `kill_all` and `clear` to stop a running pass
    clear_epoch: u64,
    time_scale: f32,
    tweener_count: usize,
    sequence_count: usize,
    max_tweeners: usize,
    max_sequences: usize,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        let capacity = config.max_tweeners + config.max_sequences;
        Self {
            tweens: SlotMap::with_capacity_and_key(capacity),
            active: ActiveSlots::with_capacity(capacity),
            pool: TweenerPool::default(),
            kill_list: Vec::new(),
            depth: 0,
            dispatching: false,
            clear_epoch: 0,
            time_scale: config.time_scale,
            tweener_count: 0,
            sequence_count: 0,
            max_tweeners: config.max_tweeners,
            max_sequences: config.max_sequences,
            config,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Create a tweener animating `accessor` toward `end` over `duration`
    ///
    /// The tweener plays automatically on the next dispatch of its phase.
    pub fn to<T: TweenValue>(&mut self, accessor: Accessor<T>, end: T, duration: f32) -> TweenId {
        let mut tween = self.acquire_tweener::<T::Plugin>(accessor, end);
        tween.duration = duration.max(0.0);
        tween.full_duration = tween.compute_full_duration();
        let id = self.register(tween);
        tracing::trace!("created {} tween {:?}", std::any::type_name::<T>(), id);
        id
    }

    /// Create an empty sequence
    pub fn sequence(&mut self) -> TweenId {
        self.sequence_with_capacity(0)
    }

    pub fn sequence_with_capacity(&mut self, capacity: usize) -> TweenId {
        if self.sequence_count >= self.max_sequences {
            self.max_sequences += self.config.capacity_increment;
            tracing::debug!("raising sequence capacity to {}", self.max_sequences);
        }
        let body = SequenceBody::with_capacity(capacity);
        let tween = Box::new(Tween::new(TweenKind::Sequence(body), &self.config));
        let id = self.register(tween);
        tracing::trace!("created sequence {:?}", id);
        id
    }

    /// Chainable configuration view, see [`TweenSettings`]
    pub fn settings(&mut self, id: TweenId) -> Result<TweenSettings<'_>, TweenError> {
        if !self.tweens.contains_key(id) {
            return Err(TweenError::InvalidHandle);
        }
        Ok(TweenSettings::new(self, id))
    }

    fn acquire_tweener<P: ValuePlugin>(
        &mut self,
        accessor: Accessor<P::Value>,
        end: P::Value,
    ) -> Box<Tween> {
        if let Some(mut tween) = self.pool.acquire(P::SHAPE) {
            if let Ok(core) = tween.tweener_core_mut::<P>() {
                core.bind(accessor, end);
                tracing::trace!("reusing pooled {:?} tweener", P::SHAPE);
                return tween;
            }
        }
        if self.tweener_count + self.pool.len() >= self.max_tweeners && !self.pool.evict_oldest()
        {
            self.max_tweeners += self.config.capacity_increment;
            tracing::debug!("raising tweener capacity to {}", self.max_tweeners);
        }
        let core = TweenerCore::<P>::new(accessor, end);
        Box::new(Tween::new(TweenKind::Tweener(Box::new(core)), &self.config))
    }

    fn register(&mut self, tween: Box<Tween>) -> TweenId {
        let phase = tween.update_phase;
        if tween.is_sequence() {
            self.sequence_count += 1;
        } else {
            self.tweener_count += 1;
        }
        let id = self.tweens.insert(TweenSlot::new(Some(tween), phase));
        self.active.reorganize(&mut self.tweens);
        self.active
            .push(&mut self.tweens, id, self.config.capacity_increment);
        id
    }

    // ========================================================================
    // Slot access
    // ========================================================================

    pub(crate) fn contains(&self, id: TweenId) -> bool {
        self.tweens.contains_key(id)
    }

    pub(crate) fn tween_mut(&mut self, id: TweenId) -> Option<&mut Tween> {
        self.tweens.get_mut(id)?.tween.as_deref_mut()
    }

    pub(crate) fn tween_ref(&self, id: TweenId) -> Result<&Tween, TweenError> {
        self.tweens
            .get(id)
            .ok_or(TweenError::InvalidHandle)?
            .tween
            .as_deref()
            .ok_or(TweenError::Locked)
    }

    /// Mutable access, failing with `Locked` while the tween is running
    pub(crate) fn tween_mut_checked(&mut self, id: TweenId) -> Result<&mut Tween, TweenError> {
        self.tweens
            .get_mut(id)
            .ok_or(TweenError::InvalidHandle)?
            .tween
            .as_deref_mut()
            .ok_or(TweenError::Locked)
    }

    pub(crate) fn tags_mut(&mut self, id: TweenId) -> Result<&mut TweenTags, TweenError> {
        self.tweens
            .get_mut(id)
            .map(|slot| &mut slot.tags)
            .ok_or(TweenError::InvalidHandle)
    }

    pub(crate) fn add_callback(
        &mut self,
        id: TweenId,
        event: TweenEvent,
        callback: TweenCallback,
    ) -> Result<(), TweenError> {
        let slot = self.tweens.get_mut(id).ok_or(TweenError::InvalidHandle)?;
        match slot.tween.as_mut() {
            Some(tween) => tween.callbacks.add(event, callback),
            None => slot.deferred.push(Control::AddCallback(event, callback)),
        }
        Ok(())
    }

    pub(crate) fn set_update_phase(
        &mut self,
        id: TweenId,
        phase: UpdatePhase,
    ) -> Result<(), TweenError> {
        let slot = self.tweens.get_mut(id).ok_or(TweenError::InvalidHandle)?;
        if slot.phase == phase {
            return Ok(());
        }
        let previous = std::mem::replace(&mut slot.phase, phase);
        slot.status.update_phase = phase;
        if let Some(tween) = slot.tween.as_mut() {
            tween.update_phase = phase;
        }
        if slot.active_index.is_some() {
            self.active.change_phase(previous, phase);
        }
        tracing::trace!("tween {:?} moved from {:?} to {:?}", id, previous, phase);
        Ok(())
    }

    /// Take a tween out of the active array because a sequence now owns it
    pub(crate) fn deactivate(&mut self, id: TweenId) {
        self.active.remove(&mut self.tweens, id);
        if let Some(slot) = self.tweens.get_mut(id) {
            slot.sequenced = true;
        }
    }

    /// Publish a running tween's state so queries can see it
    pub(crate) fn store_status(&mut self, id: TweenId, status: TweenStatus) {
        if let Some(slot) = self.tweens.get_mut(id) {
            slot.status = status;
        }
    }

    /// Retired, marked for retirement, or unknown
    pub(crate) fn is_killed(&self, id: TweenId) -> bool {
        self.tweens.get(id).map_or(true, |slot| slot.killed)
    }

    /// Take a tween out of its slot so its code can run against the scheduler
    pub(crate) fn checkout(&mut self, id: TweenId) -> Option<Box<Tween>> {
        let tween = self.tweens.get_mut(id)?.tween.take()?;
        self.depth += 1;
        Some(tween)
    }

    /// Return a checked-out tween and apply whatever was queued against it
    ///
    /// If the slot disappeared meanwhile (`kill_all` or `clear`), the tween
    /// is retired here instead.
    pub(crate) fn checkin(&mut self, id: TweenId, mut tween: Box<Tween>) {
        self.depth = self.depth.saturating_sub(1);
        let pending = match self.tweens.get_mut(id) {
            Some(slot) => {
                let mut pending: SmallVec<[Control; 2]> = SmallVec::new();
                for control in std::mem::take(&mut slot.deferred) {
                    match control {
                        Control::AddCallback(event, callback) => {
                            tween.callbacks.add(event, callback)
                        }
                        Control::Complete => pending.push(Control::Complete),
                        other if !slot.killed => pending.push(other),
                        other => {
                            tracing::trace!(
                                "dropping {} for killed tween {:?}",
                                other.name(),
                                id
                            )
                        }
                    }
                }
                slot.status = tween.status();
                slot.tween = Some(tween);
                pending
            }
            None => {
                tracing::debug!("tween {:?} was retired while running", id);
                if tween.parent.is_none() {
                    self.depth += 1;
                    if let Err(err) = tween.callbacks.list_mut(TweenEvent::Kill).invoke(self) {
                        tracing::warn!("on_kill of tween {:?} failed: {}", id, err);
                    }
                    self.depth -= 1;
                }
                self.dispose(tween);
                SmallVec::new()
            }
        };
        for control in pending {
            self.run_checked_out(id, control);
        }
        if self.depth == 0 {
            self.flush_kills();
        }
    }

    /// Mark a tween for retirement, retiring it now if nothing is running
    pub(crate) fn kill_marked(&mut self, id: TweenId) {
        let Some(slot) = self.tweens.get_mut(id) else {
            return;
        };
        if slot.killed {
            return;
        }
        slot.killed = true;
        self.kill_list.push(id);
        if self.depth == 0 {
            self.flush_kills();
        }
    }

    fn flush_kills(&mut self) {
        while !self.kill_list.is_empty() {
            let batch = std::mem::take(&mut self.kill_list);
            for id in batch {
                self.despawn(id);
            }
        }
    }

    /// Fire on_kill, free the slot and dispose of the tween
    fn despawn(&mut self, id: TweenId) {
        let Some(slot) = self.tweens.get_mut(id) else {
            return;
        };
        slot.killed = true;
        let Some(mut tween) = slot.tween.take() else {
            // Running: checkin finds the slot gone and finishes the job
            self.remove_slot(id);
            return;
        };
        slot.status = tween.status();

        self.depth += 1;
        if let Err(err) = tween.callbacks.list_mut(TweenEvent::Kill).invoke(self) {
            tracing::warn!("on_kill of tween {:?} failed: {}", id, err);
        }
        self.depth -= 1;

        self.remove_slot(id);
        tracing::trace!("retired tween {:?}", id);
        self.dispose(tween);
    }

    fn remove_slot(&mut self, id: TweenId) -> Option<TweenSlot> {
        self.active.remove(&mut self.tweens, id);
        let slot = self.tweens.remove(id)?;
        if slot.is_sequence {
            self.sequence_count = self.sequence_count.saturating_sub(1);
        } else {
            self.tweener_count = self.tweener_count.saturating_sub(1);
        }
        Some(slot)
    }

    /// Release a retired tween: children of a sequence are dropped, recyclable
    /// tweeners go back to the pool
    fn dispose(&mut self, mut tween: Box<Tween>) {
        if let TweenKind::Sequence(body) = &tween.kind {
            for child in body.child_ids() {
                self.retire_nested(child);
            }
            return;
        }
        if tween.recyclable {
            tween.reset(&self.config);
            self.pool.push(tween);
        }
    }

    /// Drop a nested tween and its own children without any callbacks
    pub(crate) fn retire_nested(&mut self, id: TweenId) {
        let Some(slot) = self.remove_slot(id) else {
            return;
        };
        if let Some(tween) = slot.tween {
            if let TweenKind::Sequence(body) = &tween.kind {
                for child in body.child_ids() {
                    self.retire_nested(child);
                }
            }
        }
    }

    /// Seek a top-level tween outside of a dispatch pass
    pub(crate) fn seek_detached(
        &mut self,
        id: TweenId,
        position: f32,
        completed_loops: i32,
        ctx: SeekContext,
    ) {
        let Some(mut tween) = self.checkout(id) else {
            return;
        };
        let kill = self.do_goto(id, &mut tween, position, completed_loops, ctx);
        self.checkin(id, tween);
        if kill {
            self.kill_marked(id);
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Advance every tween in the [`UpdatePhase::Normal`] phase
    pub fn update(&mut self, dt: f32, independent_dt: f32) {
        self.dispatch(UpdatePhase::Normal, dt, independent_dt);
    }

    pub fn late_update(&mut self, dt: f32, independent_dt: f32) {
        self.dispatch(UpdatePhase::Late, dt, independent_dt);
    }

    pub fn fixed_update(&mut self, dt: f32, independent_dt: f32) {
        self.dispatch(UpdatePhase::Fixed, dt, independent_dt);
    }

    /// Advance tweens in the [`UpdatePhase::Manual`] phase
    pub fn manual_update(&mut self, dt: f32, independent_dt: f32) {
        self.dispatch(UpdatePhase::Manual, dt, independent_dt);
    }

    /// Advance every active tween of `phase`
    ///
    /// Tweens created during the pass are first advanced by the next pass.
    /// Calling this from inside a callback of a running pass is ignored.
    pub fn dispatch(&mut self, phase: UpdatePhase, dt: f32, independent_dt: f32) {
        if self.dispatching {
            tracing::warn!(
                "ignoring {:?} dispatch requested from inside a running pass",
                phase
            );
            return;
        }
        if self.active.phase_count(phase) == 0 {
            return;
        }
        self.active.reorganize(&mut self.tweens);

        let epoch = self.clear_epoch;
        let len = self.active.len();
        self.dispatching = true;
        self.active.begin_pass();
        self.depth += 1;
        for index in 0..len {
            if self.clear_epoch != epoch {
                tracing::debug!("{:?} pass stopped: scheduler was cleared", phase);
                break;
            }
            if let Some(id) = self.active.get(index) {
                self.dispatch_one(id, phase, dt, independent_dt);
            }
        }
        self.depth -= 1;
        self.active.end_pass();
        self.dispatching = false;
        if self.depth == 0 {
            self.flush_kills();
        }
    }

    fn dispatch_one(&mut self, id: TweenId, phase: UpdatePhase, dt: f32, independent_dt: f32) {
        match self.tweens.get(id) {
            Some(slot) if !slot.killed && !slot.sequenced && slot.phase == phase => {}
            _ => return,
        }
        let Some(mut tween) = self.checkout(id) else {
            return;
        };
        let kill = self.advance(id, &mut tween, dt, independent_dt);
        self.checkin(id, tween);
        if kill {
            self.kill_marked(id);
        }
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Scale applied on top of every tween's own time scale
    pub fn set_time_scale(&mut self, time_scale: f32) {
        self.time_scale = time_scale;
    }

    // ========================================================================
    // Control
    // ========================================================================

    /// Resume playback; returns whether anything changed
    pub fn play(&mut self, id: TweenId) -> Result<bool, TweenError> {
        self.control(id, Control::Play)
    }

    pub fn play_forward(&mut self, id: TweenId) -> Result<bool, TweenError> {
        self.control(id, Control::PlayForward)
    }

    pub fn play_backwards(&mut self, id: TweenId) -> Result<bool, TweenError> {
        self.control(id, Control::PlayBackwards)
    }

    pub fn pause(&mut self, id: TweenId) -> Result<bool, TweenError> {
        self.control(id, Control::Pause)
    }

    pub fn toggle_pause(&mut self, id: TweenId) -> Result<bool, TweenError> {
        self.control(id, Control::TogglePause)
    }

    /// Seek to the start and pause
    pub fn rewind(&mut self, id: TweenId, include_delay: bool) -> Result<bool, TweenError> {
        self.control(id, Control::Rewind { include_delay })
    }

    /// Rewind and play forward from the start
    pub fn restart(&mut self, id: TweenId, include_delay: bool) -> Result<bool, TweenError> {
        self.control(id, Control::Restart { include_delay })
    }

    /// Jump to the end of the last loop; infinite tweens are left alone
    pub fn complete(&mut self, id: TweenId) -> Result<bool, TweenError> {
        self.control(id, Control::Complete)
    }

    /// Seek to absolute time `to` (loops included) and optionally keep playing
    pub fn goto(&mut self, id: TweenId, to: f32, and_play: bool) -> Result<bool, TweenError> {
        self.control(id, Control::Goto { to, and_play })
    }

    /// Reverse the playback direction
    pub fn flip(&mut self, id: TweenId) -> Result<bool, TweenError> {
        self.control(id, Control::Flip)
    }

    /// Retire a tween, optionally completing it first
    ///
    /// Kills requested while tweens are running take effect once the current
    /// operation unwinds. Killing twice is a no-op.
    pub fn kill(&mut self, id: TweenId, complete: bool) -> Result<(), TweenError> {
        let slot = self.tweens.get(id).ok_or(TweenError::InvalidHandle)?;
        if slot.sequenced {
            tracing::warn!("cannot kill tween {:?}: it is nested in a sequence", id);
            return Err(TweenError::Sequenced);
        }
        if slot.killed {
            return Ok(());
        }
        if complete {
            self.control(id, Control::Complete)?;
        }
        self.kill_marked(id);
        Ok(())
    }

    fn control(&mut self, id: TweenId, control: Control) -> Result<bool, TweenError> {
        let slot = self.tweens.get_mut(id).ok_or(TweenError::InvalidHandle)?;
        if slot.sequenced {
            tracing::warn!(
                "cannot {} tween {:?}: it is nested in a sequence",
                control.name(),
                id
            );
            return Err(TweenError::Sequenced);
        }
        if slot.killed {
            return Ok(false);
        }
        if slot.tween.is_none() {
            tracing::trace!("deferring {} for running tween {:?}", control.name(), id);
            slot.deferred.push(control);
            return Ok(true);
        }
        Ok(self.run_checked_out(id, control))
    }

    fn run_checked_out(&mut self, id: TweenId, control: Control) -> bool {
        let Some(mut tween) = self.checkout(id) else {
            return false;
        };
        let (changed, kill) = self.run_control(id, &mut tween, control);
        self.checkin(id, tween);
        if kill {
            self.kill_marked(id);
        }
        changed
    }

    /// Apply a control; returns `(changed, needs_kill)`
    fn run_control(&mut self, id: TweenId, tween: &mut Tween, control: Control) -> (bool, bool) {
        match control {
            Control::Play => (self.play_tween(id, tween), false),
            Control::PlayForward => {
                if tween.is_complete {
                    tween.is_backwards = false;
                    tween.is_playing = false;
                    (false, false)
                } else if tween.is_backwards {
                    tween.is_backwards = false;
                    self.play_tween(id, tween);
                    (true, false)
                } else {
                    (self.play_tween(id, tween), false)
                }
            }
            Control::PlayBackwards => {
                if tween.completed_loops == 0 && tween.position <= 0.0 {
                    tween.is_backwards = true;
                    tween.is_playing = false;
                    (false, false)
                } else if !tween.is_backwards {
                    tween.is_backwards = true;
                    self.play_tween(id, tween);
                    (true, false)
                } else {
                    (self.play_tween(id, tween), false)
                }
            }
            Control::Pause => (self.pause_tween(id, tween), false),
            Control::TogglePause => {
                if tween.is_playing {
                    (self.pause_tween(id, tween), false)
                } else {
                    (self.play_tween(id, tween), false)
                }
            }
            Control::Rewind { include_delay } => self.rewind_tween(id, tween, include_delay),
            Control::Restart { include_delay } => {
                let was_paused = !tween.is_playing;
                tween.is_backwards = false;
                let (_, kill) = self.rewind_tween(id, tween, include_delay);
                if kill {
                    return (true, true);
                }
                tween.is_playing = true;
                if was_paused && tween.played_once && tween.delay_complete {
                    self.fire(id, tween, TweenEvent::Play);
                }
                (true, false)
            }
            Control::Complete => {
                if tween.loops == -1 || tween.is_complete {
                    return (false, false);
                }
                let (duration, loops) = (tween.duration, tween.loops);
                let ctx = SeekContext::top(SeekMode::Goto);
                let kill = self.do_goto(id, tween, duration, loops, ctx);
                tween.is_playing = false;
                (true, kill || tween.autokill)
            }
            Control::Goto { to, and_play } => {
                if !tween.startup_done && !self.startup(id, tween) {
                    return (false, true);
                }
                let was_playing = tween.is_playing;
                tween.is_playing = and_play;
                tween.delay_complete = true;
                tween.elapsed_delay = tween.delay;
                let (position, loops) = tween.loop_target(to);
                let kill =
                    self.do_goto(id, tween, position, loops, SeekContext::top(SeekMode::Goto));
                if !and_play && was_playing && !kill {
                    self.fire(id, tween, TweenEvent::Pause);
                }
                (true, kill)
            }
            Control::Flip => {
                tween.is_backwards = !tween.is_backwards;
                (true, false)
            }
            Control::AddCallback(event, callback) => {
                tween.callbacks.add(event, callback);
                (true, false)
            }
        }
    }

    fn play_tween(&mut self, id: TweenId, tween: &mut Tween) -> bool {
        let can_play = if tween.is_backwards {
            tween.completed_loops > 0 || tween.position > 0.0
        } else {
            !tween.is_complete
        };
        if tween.is_playing || !can_play {
            return false;
        }
        tween.is_playing = true;
        if tween.played_once && tween.delay_complete {
            self.fire(id, tween, TweenEvent::Play);
        }
        true
    }

    fn pause_tween(&mut self, id: TweenId, tween: &mut Tween) -> bool {
        if !tween.is_playing {
            return false;
        }
        tween.is_playing = false;
        self.fire(id, tween, TweenEvent::Pause);
        true
    }

    fn rewind_tween(
        &mut self,
        id: TweenId,
        tween: &mut Tween,
        include_delay: bool,
    ) -> (bool, bool) {
        let was_playing = tween.is_playing;
        tween.is_playing = false;
        let mut rewound = false;
        if tween.delay > 0.0 {
            if include_delay {
                rewound = tween.elapsed_delay > 0.0;
                tween.elapsed_delay = 0.0;
                tween.delay_complete = false;
            } else {
                rewound = tween.elapsed_delay < tween.delay;
                tween.elapsed_delay = tween.delay;
                tween.delay_complete = true;
            }
        }
        if tween.position > 0.0 || tween.completed_loops > 0 || !tween.startup_done {
            rewound = true;
            if self.do_goto(id, tween, 0.0, 0, SeekContext::top(SeekMode::Goto)) {
                return (true, true);
            }
            if was_playing {
                self.fire(id, tween, TweenEvent::Pause);
            }
        }
        (rewound, false)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Snapshot of a tween's playback state
    pub fn status(&self, id: TweenId) -> Result<TweenStatus, TweenError> {
        self.tweens
            .get(id)
            .map(TweenSlot::status)
            .ok_or(TweenError::InvalidHandle)
    }

    pub fn elapsed(&self, id: TweenId, include_loops: bool) -> Result<f32, TweenError> {
        Ok(self.status(id)?.elapsed(include_loops))
    }

    pub fn elapsed_percentage(&self, id: TweenId, include_loops: bool) -> Result<f32, TweenError> {
        Ok(self.status(id)?.elapsed_percentage(include_loops))
    }

    /// Length of one loop, or of every loop when `include_loops` is set
    ///
    /// Speed-based tweeners report their real duration only after startup.
    pub fn duration(&self, id: TweenId, include_loops: bool) -> Result<f32, TweenError> {
        let status = self.status(id)?;
        Ok(if include_loops {
            status.full_duration()
        } else {
            status.duration
        })
    }

    pub fn full_duration(&self, id: TweenId) -> Result<f32, TweenError> {
        self.duration(id, true)
    }

    pub fn position(&self, id: TweenId) -> Result<f32, TweenError> {
        Ok(self.status(id)?.position)
    }

    pub fn completed_loops(&self, id: TweenId) -> Result<i32, TweenError> {
        Ok(self.status(id)?.completed_loops)
    }

    pub fn loops(&self, id: TweenId) -> Result<i32, TweenError> {
        Ok(self.status(id)?.loops)
    }

    pub fn delay(&self, id: TweenId) -> Result<f32, TweenError> {
        Ok(self.status(id)?.delay)
    }

    pub fn elapsed_delay(&self, id: TweenId) -> Result<f32, TweenError> {
        Ok(self.status(id)?.elapsed_delay)
    }

    pub fn is_playing(&self, id: TweenId) -> Result<bool, TweenError> {
        Ok(self.status(id)?.is_playing)
    }

    pub fn is_backwards(&self, id: TweenId) -> Result<bool, TweenError> {
        Ok(self.status(id)?.is_backwards)
    }

    pub fn is_complete(&self, id: TweenId) -> Result<bool, TweenError> {
        Ok(self.status(id)?.is_complete)
    }

    pub fn is_sequenced(&self, id: TweenId) -> Result<bool, TweenError> {
        self.tweens
            .get(id)
            .map(|slot| slot.sequenced)
            .ok_or(TweenError::InvalidHandle)
    }

    /// Whether the handle still refers to a live, unkilled tween
    pub fn is_active(&self, id: TweenId) -> bool {
        self.tweens.get(id).is_some_and(|slot| !slot.killed)
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            active: self.active.count(),
            per_phase: UpdatePhase::ALL.map(|phase| self.active.phase_count(phase)),
            tweeners: self.tweener_count,
            sequences: self.sequence_count,
            pooled: self.pool.len(),
            max_tweeners: self.max_tweeners,
            max_sequences: self.max_sequences,
            active_capacity: self.active.capacity(),
        }
    }

    // ========================================================================
    // Global and filtered operations
    // ========================================================================

    fn matching(&self, filter: &TweenFilter) -> Vec<TweenId> {
        self.tweens
            .iter()
            .filter(|(_, slot)| !slot.sequenced && !slot.killed && filter.matches(slot))
            .map(|(id, _)| id)
            .collect()
    }

    /// Number of live top-level tweens matching `filter`
    pub fn count_where(&self, filter: &TweenFilter) -> usize {
        self.tweens
            .values()
            .filter(|slot| !slot.sequenced && !slot.killed && filter.matches(slot))
            .count()
    }

    fn control_where(&mut self, filter: &TweenFilter, control: impl Fn() -> Control) -> usize {
        self.matching(filter)
            .into_iter()
            .filter(|id| self.control(*id, control()).unwrap_or(false))
            .count()
    }

    /// Pause matching tweens; returns how many changed
    pub fn pause_where(&mut self, filter: &TweenFilter) -> usize {
        self.control_where(filter, || Control::Pause)
    }

    pub fn play_where(&mut self, filter: &TweenFilter) -> usize {
        self.control_where(filter, || Control::Play)
    }

    pub fn rewind_where(&mut self, filter: &TweenFilter, include_delay: bool) -> usize {
        self.control_where(filter, || Control::Rewind { include_delay })
    }

    pub fn complete_where(&mut self, filter: &TweenFilter) -> usize {
        self.control_where(filter, || Control::Complete)
    }

    pub fn kill_where(&mut self, filter: &TweenFilter, complete: bool) -> usize {
        self.matching(filter)
            .into_iter()
            .filter(|id| self.kill(*id, complete).is_ok())
            .count()
    }

    pub fn pause_all(&mut self) -> usize {
        self.pause_where(&TweenFilter::all())
    }

    pub fn play_all(&mut self) -> usize {
        self.play_where(&TweenFilter::all())
    }

    /// Retire every top-level tween, firing their on_kill callbacks
    ///
    /// A dispatch pass in progress stops after the current tween, and kills
    /// it had queued are dropped.
    pub fn kill_all(&mut self) -> usize {
        let ids: Vec<TweenId> = self
            .tweens
            .iter()
            .filter(|(_, slot)| !slot.sequenced)
            .map(|(id, _)| id)
            .collect();
        self.clear_epoch += 1;
        self.kill_list.clear();
        let count = ids.len();
        for id in ids {
            self.despawn(id);
        }
        if self.depth == 0 {
            self.flush_kills();
        }
        tracing::debug!("killed {} tweens", count);
        count
    }

    /// Drop every tween, the pool and all counters without any callbacks
    ///
    /// Tweens that are running when this is called still get their on_kill
    /// when they unwind.
    pub fn clear(&mut self) {
        self.clear_epoch += 1;
        self.kill_list.clear();
        self.tweens.clear();
        self.active.clear();
        self.pool.clear();
        self.tweener_count = 0;
        self.sequence_count = 0;
        self.max_tweeners = self.config.max_tweeners;
        self.max_sequences = self.config.max_sequences;
        self.time_scale = self.config.time_scale;
        tracing::debug!("scheduler cleared");
    }
}
