//! Seeking
//!
//! Every position change of a tween goes through [`Scheduler::do_goto`]:
//! regular per-tick advancement, explicit gotos, rewinds and the nested
//! seeks a sequence issues for its children. The target is always given as
//! `(position inside the loop, completed loops)`.
//!
//! A sequence maps its own time to a timeline position (eased, mirrored on
//! odd yoyo cycles) and sweeps its entries between the previous and the new
//! timeline position. Crossing a loop boundary is split into one sweep per
//! cycle so markers and children see every boundary in order.

use crate::callbacks::{guard, TweenEvent};
use crate::easing::{self, Ease};
use crate::plugins::EvalFrame;
use crate::scheduler::{Scheduler, TweenId};
use crate::sequence::EntryKind;
use crate::tween::{LoopType, ParentLoop, SeekContext, SeekMode, Tween, TweenKind};

/// One pass over a sequence's entries
#[derive(Clone, Copy, Debug)]
struct Sweep {
    from: f32,
    to: f32,
    backwards: bool,
    mode: SeekMode,
    cycle: i32,
}

impl Sweep {
    /// Direction follows the timeline positions
    fn between(from: f32, to: f32, mode: SeekMode, cycle: i32) -> Self {
        Self {
            from,
            to,
            backwards: to < from,
            mode,
            cycle,
        }
    }
}

/// Consume `delta` from the pending delay; returns what is left for playback
fn consume_delay(tween: &mut Tween, delta: f32) -> f32 {
    let elapsed = tween.elapsed_delay + delta;
    if elapsed > tween.delay {
        tween.elapsed_delay = tween.delay;
        tween.delay_complete = true;
        elapsed - tween.delay
    } else {
        tween.elapsed_delay = elapsed.max(0.0);
        0.0
    }
}

/// Loop position and completed loops after playing `delta` seconds
pub(crate) fn tick_target(tween: &Tween, delta: f32) -> (f32, i32) {
    let duration = tween.duration;
    let loops = tween.loops;
    let mut completed_loops = tween.completed_loops;
    if duration <= 0.0 {
        let target_loops = if loops == -1 {
            completed_loops + 1
        } else {
            loops
        };
        return (0.0, target_loops);
    }

    // The end of a loop is the last instant of that loop, not the start of the next
    let mut position = tween.position;
    if position >= duration && completed_loops > 0 {
        completed_loops -= 1;
    }
    if tween.is_backwards {
        position -= delta;
        while position < 0.0 && completed_loops > -1 {
            position += duration;
            completed_loops -= 1;
        }
        if completed_loops < 0 {
            position = 0.0;
            completed_loops = 0;
        }
    } else {
        position += delta;
        while position >= duration && (loops == -1 || completed_loops < loops) {
            position -= duration;
            completed_loops += 1;
        }
    }
    if loops != -1 && completed_loops >= loops {
        position = duration;
    }
    (position, completed_loops)
}

/// `(cycle, local)` for a loop state; the end of a loop belongs to that loop
fn cycle_point(completed_loops: i32, position: f32, duration: f32) -> (i32, f32) {
    if duration > 0.0 && position >= duration && completed_loops > 0 {
        (completed_loops - 1, duration)
    } else {
        (completed_loops, position)
    }
}

/// Timeline position of a sequence at `local` time inside `cycle`
fn timeline_at(tween: &Tween, cycle: i32, local: f32) -> f32 {
    let duration = tween.duration;
    let eased = if tween.ease == Ease::Linear && tween.custom_ease.is_none() {
        local
    } else {
        duration
            * easing::evaluate(
                tween.ease,
                tween.custom_ease.as_ref(),
                local,
                duration,
                tween.overshoot,
                tween.period,
            )
    };
    if tween.loop_type == LoopType::Yoyo && cycle % 2 != 0 {
        duration - eased
    } else {
        eased
    }
}

fn timeline(tween: &Tween, (cycle, local): (i32, f32)) -> f32 {
    timeline_at(tween, cycle, local)
}

impl Scheduler {
    /// Run startup once: read start values, compute durations, sort entries
    ///
    /// Returns `false` when the tween cannot start and must be killed.
    pub(crate) fn startup(&mut self, id: TweenId, tween: &mut Tween) -> bool {
        let result = match &mut tween.kind {
            TweenKind::Tweener(tweener) => tweener
                .startup(tween.is_relative, tween.is_speed_based, tween.duration)
                .map(|duration| tween.duration = duration),
            TweenKind::Sequence(body) => {
                if body.entries.is_empty() && !tween.callbacks.has_any() {
                    Err(crate::error::TweenError::InvalidSequence(
                        "sequence has no entries and no callbacks",
                    ))
                } else {
                    body.sort_entries();
                    Ok(())
                }
            }
        };
        if let Err(err) = result {
            let what = match &tween.kind {
                TweenKind::Tweener(tweener) => tweener.value_type_name(),
                TweenKind::Sequence(_) => "sequence",
            };
            tracing::warn!("tween {:?} ({}) failed to start: {}", id, what, err);
            return false;
        }

        if let TweenKind::Sequence(body) = &tween.kind {
            // Entries cannot move once the timeline is laid out
            tween.creation_locked = true;
            if tween.is_relative {
                for child in body.child_ids() {
                    if let Ok(child) = self.tween_mut_checked(child) {
                        if !child.startup_done {
                            child.is_relative = true;
                        }
                    }
                }
            }
        }
        tween.startup_done = true;
        tween.full_duration = tween.compute_full_duration();
        tracing::trace!(
            "tween {:?} started: duration {} x {} loops",
            id,
            tween.duration,
            tween.loops
        );
        true
    }

    /// Invoke the subscribers of `event`; returns whether the tween is now killed
    pub(crate) fn fire(&mut self, id: TweenId, tween: &mut Tween, event: TweenEvent) -> bool {
        if tween.callbacks.list_mut(event).is_empty() {
            return false;
        }
        self.store_status(id, tween.status());
        if let Err(err) = tween.callbacks.list_mut(event).invoke(self) {
            tracing::warn!("{:?} callback of tween {:?} failed, killing it: {}", event, id, err);
            self.kill_marked(id);
            return true;
        }
        self.is_killed(id)
    }

    /// Per-tick advancement of a top-level tween; returns whether to kill it
    pub(crate) fn advance(
        &mut self,
        id: TweenId,
        tween: &mut Tween,
        dt: f32,
        independent_dt: f32,
    ) -> bool {
        if !tween.is_playing {
            return false;
        }
        tween.creation_locked = true;

        let base = if tween.is_independent_update {
            independent_dt
        } else {
            dt
        };
        let mut delta = base * tween.time_scale * self.time_scale();
        if delta.abs() < self.config().update_epsilon {
            return false;
        }
        if !tween.delay_complete {
            delta = consume_delay(tween, delta);
            if !tween.delay_complete {
                return false;
            }
            if tween.played_once && self.fire(id, tween, TweenEvent::Play) {
                return true;
            }
        }
        if !tween.startup_done && !self.startup(id, tween) {
            return true;
        }
        let (position, completed_loops) = tick_target(tween, delta);
        self.do_goto(id, tween, position, completed_loops, SeekContext::top(SeekMode::Update))
    }

    /// Move a tween to `(to_position, to_completed_loops)` and fire callbacks
    ///
    /// Returns whether the tween must be killed: it completed with autokill,
    /// its target is gone, or a callback killed it.
    pub(crate) fn do_goto(
        &mut self,
        id: TweenId,
        tween: &mut Tween,
        to_position: f32,
        to_completed_loops: i32,
        ctx: SeekContext,
    ) -> bool {
        if !tween.startup_done && !self.startup(id, tween) {
            return true;
        }
        if !tween.played_once && ctx.mode == SeekMode::Update {
            tween.played_once = true;
            if self.fire(id, tween, TweenEvent::Start) || self.fire(id, tween, TweenEvent::Play) {
                return true;
            }
        }

        let prev_position = tween.position;
        let prev_completed_loops = tween.completed_loops;
        tween.completed_loops = to_completed_loops;
        let was_rewound = prev_position <= 0.0 && prev_completed_loops <= 0;
        let was_complete = tween.is_complete;
        if tween.loops != -1 {
            tween.is_complete = tween.completed_loops == tween.loops;
        }

        let completed_steps = match ctx.mode {
            SeekMode::Update if tween.is_backwards => {
                let steps = if tween.completed_loops < prev_completed_loops {
                    prev_completed_loops - tween.completed_loops
                } else if to_position <= 0.0 && !was_rewound {
                    1
                } else {
                    0
                };
                if was_complete {
                    steps - 1
                } else {
                    steps
                }
            }
            SeekMode::Update | SeekMode::Goto => {
                (tween.completed_loops - prev_completed_loops).max(0)
            }
            SeekMode::Silent => 0,
        };

        tween.position = to_position;
        if tween.position > tween.duration {
            tween.position = tween.duration;
        } else if tween.position <= 0.0 {
            tween.position = if tween.completed_loops > 0 || tween.is_complete {
                tween.duration
            } else {
                0.0
            };
        }

        let was_playing = tween.is_playing;
        if tween.is_playing {
            tween.is_playing = if tween.is_backwards {
                !(tween.completed_loops == 0 && tween.position <= 0.0)
            } else {
                !tween.is_complete
            };
        }

        let use_inverse = tween.loop_type == LoopType::Yoyo
            && tween.has_loops()
            && if tween.position < tween.duration {
                tween.completed_loops % 2 != 0
            } else {
                tween.completed_loops % 2 == 0
            };

        let failed = if tween.is_sequence() {
            self.apply_sequence(id, tween, prev_position, prev_completed_loops, ctx.mode)
        } else {
            self.apply_tweener(id, tween, use_inverse, ctx.parent)
        };
        if failed || self.is_killed(id) {
            return true;
        }

        let silent = ctx.mode == SeekMode::Silent;
        let nested = ctx.parent.is_some();
        if ctx.mode == SeekMode::Update && self.fire(id, tween, TweenEvent::Update) {
            return true;
        }
        if !silent
            && tween.position <= 0.0
            && tween.completed_loops <= 0
            && !was_rewound
            && self.fire(id, tween, TweenEvent::Rewind)
        {
            return true;
        }
        for _ in 0..completed_steps.max(0) {
            if self.fire(id, tween, TweenEvent::StepComplete) {
                return true;
            }
        }
        if !silent
            && !nested
            && tween.is_complete
            && !was_complete
            && self.fire(id, tween, TweenEvent::Complete)
        {
            return true;
        }
        if !silent
            && !nested
            && was_playing
            && !tween.is_playing
            && (!tween.is_complete || !tween.autokill)
            && self.fire(id, tween, TweenEvent::Pause)
        {
            return true;
        }
        tween.autokill && tween.is_complete
    }

    /// Write the eased value of a tweener; returns whether its target failed
    fn apply_tweener(
        &mut self,
        id: TweenId,
        tween: &mut Tween,
        use_inverse: bool,
        parent: Option<ParentLoop>,
    ) -> bool {
        let frame = EvalFrame {
            ease: tween.ease,
            custom_ease: tween.custom_ease.as_ref(),
            overshoot: tween.overshoot,
            period: tween.period,
            elapsed: tween.position,
            use_inverse,
            duration: tween.duration,
            loop_type: tween.loop_type,
            loops: tween.loops,
            completed_loops: tween.completed_loops,
            at_loop_end: tween.position >= tween.duration,
            parent,
        };
        let TweenKind::Tweener(tweener) = &mut tween.kind else {
            return false;
        };
        match tweener.apply(&frame) {
            Ok(()) => false,
            Err(err) => {
                tracing::warn!("tween {:?} lost its target, killing it: {}", id, err);
                true
            }
        }
    }

    /// Sweep a sequence's entries from its previous loop state to the current one
    fn apply_sequence(
        &mut self,
        id: TweenId,
        tween: &mut Tween,
        prev_position: f32,
        prev_completed_loops: i32,
        mode: SeekMode,
    ) -> bool {
        let duration = tween.duration;
        let from = cycle_point(prev_completed_loops, prev_position, duration);
        let to = cycle_point(tween.completed_loops, tween.position, duration);
        let backwards = to.0 < from.0 || (to.0 == from.0 && to.1 < from.1);

        if duration <= 0.0 {
            let sweep = Sweep {
                from: 0.0,
                to: 0.0,
                backwards,
                mode,
                cycle: (to.0 - 1).max(0),
            };
            return self.sweep(id, tween, sweep);
        }
        if from.0 == to.0 {
            let sweep = Sweep::between(timeline(tween, from), timeline(tween, to), mode, to.0);
            return self.sweep(id, tween, sweep);
        }

        let yoyo = tween.loop_type == LoopType::Yoyo;
        if mode != SeekMode::Update {
            // Jumps land directly on the target cycle
            let target = timeline(tween, to);
            if yoyo {
                let sweep = Sweep::between(timeline(tween, from), target, mode, to.0);
                return self.sweep(id, tween, sweep);
            }
            let (reset_from, reset_to) = if backwards {
                (0.0, duration)
            } else {
                // Children the timeline never reached need startup before the
                // reset can put them on this cycle's baseline
                let prime = Sweep::between(0.0, duration, SeekMode::Silent, to.0);
                if self.sweep(id, tween, prime) {
                    return true;
                }
                (duration, 0.0)
            };
            let reset = Sweep::between(reset_from, reset_to, SeekMode::Silent, to.0);
            let land = Sweep::between(reset_to, target, mode, to.0);
            return self.sweep(id, tween, reset) || self.sweep(id, tween, land);
        }

        if backwards {
            let leave = Sweep::between(
                timeline(tween, from),
                timeline_at(tween, from.0, 0.0),
                mode,
                from.0,
            );
            if leave.from != leave.to && self.sweep(id, tween, leave) {
                return true;
            }
            for cycle in (to.0..from.0).rev() {
                if self.is_killed(id) {
                    return true;
                }
                let local = if cycle == to.0 { to.1 } else { 0.0 };
                if !yoyo {
                    let restore = Sweep::between(0.0, duration, SeekMode::Silent, cycle);
                    if self.sweep(id, tween, restore) {
                        return true;
                    }
                }
                let enter = Sweep::between(
                    timeline_at(tween, cycle, duration),
                    timeline_at(tween, cycle, local),
                    mode,
                    cycle,
                );
                if self.sweep(id, tween, enter) {
                    return true;
                }
            }
        } else {
            let leave = Sweep::between(
                timeline(tween, from),
                timeline_at(tween, from.0, duration),
                mode,
                from.0,
            );
            if leave.from != leave.to && self.sweep(id, tween, leave) {
                return true;
            }
            for cycle in from.0 + 1..=to.0 {
                if self.is_killed(id) {
                    return true;
                }
                let local = if cycle == to.0 { to.1 } else { duration };
                if !yoyo {
                    let rewind = Sweep::between(duration, 0.0, SeekMode::Silent, cycle);
                    if self.sweep(id, tween, rewind) {
                        return true;
                    }
                }
                let enter = Sweep::between(
                    timeline_at(tween, cycle, 0.0),
                    timeline_at(tween, cycle, local),
                    mode,
                    cycle,
                );
                if self.sweep(id, tween, enter) {
                    return true;
                }
            }
        }
        false
    }

    /// Visit the entries between two timeline positions in travel order
    ///
    /// Markers fire only during regular updates. Children that fail are
    /// removed from the sequence and retired. Returns whether the sequence
    /// itself was killed along the way.
    fn sweep(&mut self, id: TweenId, tween: &mut Tween, sweep: Sweep) -> bool {
        let parent = ParentLoop {
            loop_type: tween.loop_type,
            cycle: sweep.cycle,
        };
        let TweenKind::Sequence(body) = &mut tween.kind else {
            return false;
        };
        let entries = &mut body.entries;
        let fire_markers = sweep.mode == SeekMode::Update;

        if !sweep.backwards {
            let mut index = 0;
            while index < entries.len() {
                let (start, end) = (entries[index].position, entries[index].end_position);
                if start > sweep.to
                    || (start > 0.0 && end <= sweep.from)
                    || (start <= 0.0 && end < sweep.from)
                {
                    index += 1;
                    continue;
                }
                match &mut entries[index].kind {
                    EntryKind::Callback(callback) => {
                        if fire_markers {
                            if guard(|| callback(self)).is_err() {
                                self.kill_marked(id);
                                return true;
                            }
                            if self.is_killed(id) {
                                return true;
                            }
                        }
                    }
                    EntryKind::Child(child) => {
                        let child = *child;
                        if !self.goto_child(child, sweep.to - start, false, sweep.mode, parent) {
                            tracing::debug!(
                                "dropping failed child {:?} from sequence {:?}",
                                child,
                                id
                            );
                            entries.remove(index);
                            self.retire_nested(child);
                            continue;
                        }
                        if self.is_killed(id) {
                            return true;
                        }
                    }
                }
                index += 1;
            }
        } else {
            let mut index = entries.len();
            while index > 0 {
                index -= 1;
                let (start, end) = (entries[index].position, entries[index].end_position);
                if end < sweep.to || start > sweep.from {
                    continue;
                }
                match &mut entries[index].kind {
                    EntryKind::Callback(callback) => {
                        if fire_markers && start < sweep.from {
                            if guard(|| callback(self)).is_err() {
                                self.kill_marked(id);
                                return true;
                            }
                            if self.is_killed(id) {
                                return true;
                            }
                        }
                    }
                    EntryKind::Child(child) => {
                        let child = *child;
                        if !self.goto_child(child, sweep.to - start, true, sweep.mode, parent) {
                            tracing::debug!(
                                "dropping failed child {:?} from sequence {:?}",
                                child,
                                id
                            );
                            entries.remove(index);
                            self.retire_nested(child);
                            continue;
                        }
                        if self.is_killed(id) {
                            return true;
                        }
                    }
                }
            }
        }
        false
    }

    /// Seek a nested child to `local` time; returns whether it is still alive
    fn goto_child(
        &mut self,
        child: TweenId,
        local: f32,
        backwards: bool,
        mode: SeekMode,
        parent: ParentLoop,
    ) -> bool {
        let Some(mut tween) = self.checkout(child) else {
            return false;
        };
        if backwards && !tween.startup_done {
            self.checkin(child, tween);
            return true;
        }
        tween.is_backwards = backwards;
        let (position, completed_loops) = if tween.duration <= 0.0 {
            if backwards && local <= 0.0 {
                (0.0, 0)
            } else {
                (0.0, tween.loops)
            }
        } else {
            tween.loop_target(local)
        };
        let kill = self.do_goto(
            child,
            &mut tween,
            position,
            completed_loops,
            SeekContext::nested(mode, parent),
        );
        self.checkin(child, tween);
        !kill && !self.is_killed(child)
    }
}
