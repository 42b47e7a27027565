//! Active slot array and tweener pool
//!
//! The active array is the dense range the dispatch loop walks. Removing a
//! tween leaves a hole that is only compacted by an explicit reorganize pass,
//! so indices stay valid while a dispatch pass is running.

use crate::plugins::ValueShape;
use crate::scheduler::{TweenId, TweenSlot};
use crate::tween::{Tween, UpdatePhase};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use std::collections::VecDeque;

pub(crate) struct ActiveSlots {
    slots: Vec<Option<TweenId>>,
    /// End of the occupied range
    len: usize,
    /// A hole exists below `len`
    dirty: bool,
    count: usize,
    phase_counts: [usize; 4],
    /// A dispatch pass is walking the range; indices must not move
    iterating: bool,
}

impl ActiveSlots {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            len: 0,
            dirty: false,
            count: 0,
            phase_counts: [0; 4],
            iterating: false,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn phase_count(&self, phase: UpdatePhase) -> usize {
        self.phase_counts[phase.index()]
    }

    pub fn get(&self, index: usize) -> Option<TweenId> {
        self.slots.get(index).copied().flatten()
    }

    /// Place `id` after the occupied range, growing by `increment` when full
    pub fn push(
        &mut self,
        tweens: &mut SlotMap<TweenId, TweenSlot>,
        id: TweenId,
        increment: usize,
    ) {
        let Some(slot) = tweens.get_mut(id) else {
            return;
        };
        if slot.active_index.is_some() {
            return;
        }
        if self.len == self.slots.len() {
            let capacity = self.slots.len() + increment.max(1);
            tracing::debug!("growing active tween slots to {}", capacity);
            self.slots.resize(capacity, None);
        }
        self.slots[self.len] = Some(id);
        slot.active_index = Some(self.len);
        self.len += 1;
        self.count += 1;
        self.phase_counts[slot.phase.index()] += 1;
    }

    pub fn remove(&mut self, tweens: &mut SlotMap<TweenId, TweenSlot>, id: TweenId) {
        let Some(slot) = tweens.get_mut(id) else {
            return;
        };
        let Some(index) = slot.active_index.take() else {
            return;
        };
        self.slots[index] = None;
        self.count -= 1;
        self.phase_counts[slot.phase.index()] -= 1;

        if self.iterating || index + 1 != self.len {
            self.dirty = true;
            return;
        }
        self.trim();
    }

    fn trim(&mut self) {
        while self.len > 0 && self.slots[self.len - 1].is_none() {
            self.len -= 1;
        }
        if self.count == 0 {
            self.len = 0;
            self.dirty = false;
        }
    }

    pub fn begin_pass(&mut self) -> bool {
        !std::mem::replace(&mut self.iterating, true)
    }

    pub fn end_pass(&mut self) {
        self.iterating = false;
        self.trim();
    }

    /// Move an active tween's membership to another phase
    pub fn change_phase(&mut self, from: UpdatePhase, to: UpdatePhase) {
        self.phase_counts[from.index()] -= 1;
        self.phase_counts[to.index()] += 1;
    }

    /// Slide occupied slots down so the active range is dense again
    pub fn reorganize(&mut self, tweens: &mut SlotMap<TweenId, TweenSlot>) {
        if !self.dirty || self.iterating {
            return;
        }
        let mut write = 0;
        for read in 0..self.len {
            let Some(id) = self.slots[read] else {
                continue;
            };
            if write != read {
                self.slots[write] = Some(id);
                self.slots[read] = None;
                if let Some(slot) = tweens.get_mut(id) {
                    slot.active_index = Some(write);
                }
            }
            write += 1;
        }
        tracing::trace!("reorganized active tweens: {} -> {}", self.len, write);
        self.len = write;
        self.dirty = false;
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.len = 0;
        self.dirty = false;
        self.count = 0;
        self.phase_counts = [0; 4];
    }
}

/// Retired tweeners waiting for reuse, bucketed by value shape
#[derive(Default)]
pub(crate) struct TweenerPool {
    buckets: FxHashMap<ValueShape, VecDeque<(u64, Box<Tween>)>>,
    next_stamp: u64,
    len: usize,
}

impl TweenerPool {
    pub fn len(&self) -> usize {
        self.len
    }

    /// Most recently retired tweener of `shape`
    pub fn acquire(&mut self, shape: ValueShape) -> Option<Box<Tween>> {
        let (_, tween) = self.buckets.get_mut(&shape)?.pop_back()?;
        self.len -= 1;
        Some(tween)
    }

    /// Park a reset tweener; sequences are refused
    pub fn push(&mut self, tween: Box<Tween>) -> bool {
        let Some(shape) = tween.shape() else {
            return false;
        };
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        self.buckets
            .entry(shape)
            .or_default()
            .push_back((stamp, tween));
        self.len += 1;
        true
    }

    /// Drop the tweener that has been pooled the longest
    pub fn evict_oldest(&mut self) -> bool {
        let oldest = self
            .buckets
            .iter()
            .filter_map(|(shape, bucket)| bucket.front().map(|(stamp, _)| (*stamp, *shape)))
            .min_by_key(|(stamp, _)| *stamp);
        let Some((_, shape)) = oldest else {
            return false;
        };
        if let Some(bucket) = self.buckets.get_mut(&shape) {
            if bucket.pop_front().is_some() {
                self.len -= 1;
                tracing::debug!("evicted pooled {:?} tweener", shape);
                return true;
            }
        }
        false
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.len = 0;
    }
}
