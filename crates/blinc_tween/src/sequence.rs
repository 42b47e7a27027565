//! Sequences
//!
//! A sequence owns an ordered list of child tweens and callback markers,
//! each placed at an offset inside the sequence timeline. Children are
//! removed from the scheduler's active registry when inserted and are only
//! ever advanced by their parent.

use crate::callbacks::TweenCallback;
use crate::error::TweenError;
use crate::scheduler::{Scheduler, TweenId};
use crate::tween::TweenKind;
use smallvec::SmallVec;

pub(crate) enum EntryKind {
    Child(TweenId),
    Callback(TweenCallback),
}

pub(crate) struct SequenceEntry {
    pub kind: EntryKind,
    pub position: f32,
    pub end_position: f32,
}

#[derive(Default)]
pub(crate) struct SequenceBody {
    pub entries: Vec<SequenceEntry>,
    /// Position of the most recently inserted child, used by join
    pub last_insert_time: f32,
}

impl SequenceBody {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            last_insert_time: 0.0,
        }
    }

    pub fn child_ids(&self) -> SmallVec<[TweenId; 8]> {
        self.entries
            .iter()
            .filter_map(|entry| match entry.kind {
                EntryKind::Child(id) => Some(id),
                EntryKind::Callback(_) => None,
            })
            .collect()
    }

    /// Stable sort by start position, ties keep insertion order
    pub fn sort_entries(&mut self) {
        self.entries
            .sort_by(|a, b| a.position.total_cmp(&b.position));
    }

    fn shift(&mut self, by: f32) {
        for entry in &mut self.entries {
            entry.position += by;
            entry.end_position += by;
        }
    }
}

/// What a sequence entry holds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequencedItem {
    Tween(TweenId),
    Callback,
}

/// Read-only placement of one sequence entry
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SequencedEntryInfo {
    pub item: SequencedItem,
    pub position: f32,
    pub end_position: f32,
}

impl Scheduler {
    /// Add `child` at the current end of `sequence`
    pub fn append(&mut self, sequence: TweenId, child: TweenId) -> Result<(), TweenError> {
        let at = self.sequence_duration(sequence)?;
        self.insert(sequence, at, child)
    }

    /// Add `child` at the start position of the last inserted child
    pub fn join(&mut self, sequence: TweenId, child: TweenId) -> Result<(), TweenError> {
        let at = self.with_sequence(sequence, |_, body| Ok(body.last_insert_time))?;
        self.insert(sequence, at, child)
    }

    /// Add `child` at the start, pushing every other entry back by its length
    pub fn prepend(&mut self, sequence: TweenId, child: TweenId) -> Result<(), TweenError> {
        let nested_loop_cap = self.config().nested_loop_cap;
        let length = {
            let tween = self.validate_child(sequence, child)?;
            // Same loop count insert will settle on
            let loops = if tween.loops == -1 {
                nested_loop_cap
            } else {
                tween.loops.max(1)
            };
            tween.delay + tween.duration * loops as f32
        };
        self.with_sequence(sequence, |tween, body| {
            body.shift(length);
            tween.duration += length;
            Ok(())
        })?;
        self.insert(sequence, 0.0, child)
    }

    /// Add `child` at an explicit position
    ///
    /// The child's delay is folded into its start offset. Infinite loops are
    /// replaced by the configured finite cap and speed-based timing is
    /// dropped, since a sequence needs every child to have a finite length.
    pub fn insert(&mut self, sequence: TweenId, at: f32, child: TweenId) -> Result<(), TweenError> {
        self.validate_child(sequence, child)?;
        self.with_sequence(sequence, |_, _| Ok(()))?;
        self.deactivate(child);

        let nested_loop_cap = self.config().nested_loop_cap;
        let (position, end_position) = {
            let tween = self.tween_mut_checked(child)?;
            tween.parent = Some(sequence);
            tween.creation_locked = true;
            if tween.loops == -1 {
                tracing::warn!(
                    "tween {:?} loops forever, capping at {} loops inside sequence {:?}",
                    child,
                    nested_loop_cap,
                    sequence
                );
                tween.loops = nested_loop_cap;
            }
            if tween.is_speed_based {
                tracing::warn!(
                    "tween {:?} is speed based, which sequences do not support; using its duration",
                    child
                );
                tween.is_speed_based = false;
            }
            tween.autokill = false;
            let position = at + tween.delay;
            tween.delay = 0.0;
            tween.elapsed_delay = 0.0;
            tween.delay_complete = true;
            let end = position + tween.duration * tween.loops as f32;
            (position, end)
        };

        self.with_sequence(sequence, |tween, body| {
            body.last_insert_time = position;
            body.entries.push(SequenceEntry {
                kind: EntryKind::Child(child),
                position,
                end_position,
            });
            if end_position > tween.duration {
                tween.duration = end_position;
            }
            Ok(())
        })?;
        tracing::trace!(
            "inserted {:?} into sequence {:?} at {}..{}",
            child,
            sequence,
            position,
            end_position
        );
        Ok(())
    }

    /// Extend the sequence by an empty interval at its end
    pub fn append_interval(&mut self, sequence: TweenId, interval: f32) -> Result<(), TweenError> {
        self.with_sequence(sequence, |tween, _| {
            tween.duration += interval.max(0.0);
            Ok(())
        })
    }

    /// Insert an empty interval at the start, pushing every entry back
    pub fn prepend_interval(&mut self, sequence: TweenId, interval: f32) -> Result<(), TweenError> {
        let interval = interval.max(0.0);
        self.with_sequence(sequence, |tween, body| {
            body.shift(interval);
            tween.duration += interval;
            Ok(())
        })
    }

    /// Add a zero-width callback marker at the current end
    pub fn append_callback(
        &mut self,
        sequence: TweenId,
        callback: impl FnMut(&mut Scheduler) + 'static,
    ) -> Result<(), TweenError> {
        let at = self.sequence_duration(sequence)?;
        self.insert_callback(sequence, at, callback)
    }

    /// Add a zero-width callback marker at the start
    pub fn prepend_callback(
        &mut self,
        sequence: TweenId,
        callback: impl FnMut(&mut Scheduler) + 'static,
    ) -> Result<(), TweenError> {
        self.insert_callback(sequence, 0.0, callback)
    }

    /// Add a zero-width callback marker at `at`
    ///
    /// Markers fire once each time the timeline crosses their position in
    /// either direction during regular updates, but never on explicit seeks.
    pub fn insert_callback(
        &mut self,
        sequence: TweenId,
        at: f32,
        callback: impl FnMut(&mut Scheduler) + 'static,
    ) -> Result<(), TweenError> {
        let at = at.max(0.0);
        self.with_sequence(sequence, move |tween, body| {
            body.entries.push(SequenceEntry {
                kind: EntryKind::Callback(Box::new(callback)),
                position: at,
                end_position: at,
            });
            if at > tween.duration {
                tween.duration = at;
            }
            Ok(())
        })
    }

    /// Placement of every entry of a sequence, in timeline order once started
    pub fn sequence_entries(
        &self,
        sequence: TweenId,
    ) -> Result<Vec<SequencedEntryInfo>, TweenError> {
        let tween = self.tween_ref(sequence)?;
        let TweenKind::Sequence(body) = &tween.kind else {
            return Err(TweenError::InvalidSequence("tween is not a sequence"));
        };
        Ok(body
            .entries
            .iter()
            .map(|entry| SequencedEntryInfo {
                item: match entry.kind {
                    EntryKind::Child(id) => SequencedItem::Tween(id),
                    EntryKind::Callback(_) => SequencedItem::Callback,
                },
                position: entry.position,
                end_position: entry.end_position,
            })
            .collect())
    }

    fn sequence_duration(&mut self, sequence: TweenId) -> Result<f32, TweenError> {
        self.with_sequence(sequence, |tween, _| Ok(tween.duration))
    }

    /// Run `f` on an unlocked top-level sequence
    fn with_sequence<R>(
        &mut self,
        sequence: TweenId,
        f: impl FnOnce(&mut crate::tween::Tween, &mut SequenceBody) -> Result<R, TweenError>,
    ) -> Result<R, TweenError> {
        let result = self.tween_mut_checked(sequence).and_then(|tween| {
            if !tween.is_sequence() {
                return Err(TweenError::InvalidSequence("tween is not a sequence"));
            }
            if tween.creation_locked {
                return Err(TweenError::Locked);
            }
            // Split the borrow so the closure sees both the tween and its body
            let mut kind = std::mem::replace(
                &mut tween.kind,
                TweenKind::Sequence(SequenceBody::default()),
            );
            let result = match &mut kind {
                TweenKind::Sequence(body) => f(tween, body),
                TweenKind::Tweener(_) => {
                    Err(TweenError::InvalidSequence("tween is not a sequence"))
                }
            };
            tween.kind = kind;
            result
        });
        if let Err(err) = &result {
            tracing::warn!("sequence {:?}: {}", sequence, err);
        }
        result
    }

    /// Check that `child` may be nested into `sequence`
    fn validate_child(
        &self,
        sequence: TweenId,
        child: TweenId,
    ) -> Result<&crate::tween::Tween, TweenError> {
        let result = if sequence == child {
            Err(TweenError::InvalidSequence("a sequence cannot contain itself"))
        } else {
            self.tween_ref(child).and_then(|tween| {
                if tween.parent.is_some() {
                    Err(TweenError::InvalidSequence("tween is already nested"))
                } else if tween.creation_locked || tween.startup_done {
                    Err(TweenError::Locked)
                } else if self.is_killed(child) {
                    Err(TweenError::InvalidHandle)
                } else {
                    Ok(tween)
                }
            })
        };
        if let Err(err) = &result {
            tracing::warn!("cannot nest {:?} into sequence {:?}: {}", child, sequence, err);
        }
        result
    }
}
