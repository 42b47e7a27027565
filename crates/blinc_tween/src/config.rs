//! Scheduler configuration

use crate::easing::{Ease, DEFAULT_OVERSHOOT};
use crate::tween::{LoopType, UpdatePhase};

/// Defaults applied to new tweens plus registry capacity settings
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SchedulerConfig {
    pub default_ease: Ease,
    pub default_overshoot: f32,
    pub default_period: f32,
    pub default_loop_type: LoopType,
    pub default_autokill: bool,
    /// Retired tweeners go back to the pool instead of being dropped
    pub default_recyclable: bool,
    pub default_update_phase: UpdatePhase,
    pub default_independent_update: bool,
    /// Soft cap on live tweeners (active plus pooled)
    pub max_tweeners: usize,
    /// Soft cap on live sequences
    pub max_sequences: usize,
    /// Growth step for the caps and the active slot array
    pub capacity_increment: usize,
    /// Global time scale applied to every dispatch
    pub time_scale: f32,
    /// Deltas smaller than this are ignored by dispatch
    pub update_epsilon: f32,
    /// Loop count substituted for infinite loops inside a sequence
    pub nested_loop_cap: i32,
}

impl SchedulerConfig {
    /// Recycle tweeners by default
    pub fn pooled() -> Self {
        Self {
            default_recyclable: true,
            ..Self::default()
        }
    }

    /// Larger capacity for scenes with many simultaneous tweens
    pub fn large() -> Self {
        Self {
            max_tweeners: 1250,
            max_sequences: 250,
            capacity_increment: 250,
            ..Self::default()
        }
    }

    pub fn with_ease(mut self, ease: Ease) -> Self {
        self.default_ease = ease;
        self
    }

    pub fn with_overshoot(mut self, overshoot: f32) -> Self {
        self.default_overshoot = overshoot;
        self
    }

    pub fn with_period(mut self, period: f32) -> Self {
        self.default_period = period;
        self
    }

    pub fn with_loop_type(mut self, loop_type: LoopType) -> Self {
        self.default_loop_type = loop_type;
        self
    }

    pub fn with_autokill(mut self, autokill: bool) -> Self {
        self.default_autokill = autokill;
        self
    }

    pub fn with_recyclable(mut self, recyclable: bool) -> Self {
        self.default_recyclable = recyclable;
        self
    }

    pub fn with_update_phase(mut self, phase: UpdatePhase) -> Self {
        self.default_update_phase = phase;
        self
    }

    pub fn with_independent_update(mut self, independent: bool) -> Self {
        self.default_independent_update = independent;
        self
    }

    pub fn with_capacity(mut self, max_tweeners: usize, max_sequences: usize) -> Self {
        self.max_tweeners = max_tweeners;
        self.max_sequences = max_sequences;
        self
    }

    pub fn with_capacity_increment(mut self, increment: usize) -> Self {
        self.capacity_increment = increment.max(1);
        self
    }

    pub fn with_time_scale(mut self, time_scale: f32) -> Self {
        self.time_scale = time_scale;
        self
    }

    pub fn with_update_epsilon(mut self, epsilon: f32) -> Self {
        self.update_epsilon = epsilon;
        self
    }

    pub fn with_nested_loop_cap(mut self, cap: i32) -> Self {
        self.nested_loop_cap = cap.max(1);
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_ease: Ease::OutQuad,
            default_overshoot: DEFAULT_OVERSHOOT,
            default_period: 0.0,
            default_loop_type: LoopType::Restart,
            default_autokill: true,
            default_recyclable: false,
            default_update_phase: UpdatePhase::Normal,
            default_independent_update: false,
            max_tweeners: 200,
            max_sequences: 50,
            capacity_increment: 50,
            time_scale: 1.0,
            update_epsilon: 1e-6,
            nested_loop_cap: i32::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let config = SchedulerConfig::default();
        assert_eq!(config.default_ease, Ease::OutQuad);
        assert!(!config.default_recyclable);
        assert_eq!(config.nested_loop_cap, i32::MAX);

        assert!(SchedulerConfig::pooled().default_recyclable);
        assert!(SchedulerConfig::large().max_tweeners > config.max_tweeners);
    }

    #[test]
    fn test_builders() {
        let config = SchedulerConfig::default()
            .with_ease(Ease::Linear)
            .with_capacity(4, 2)
            .with_capacity_increment(0)
            .with_time_scale(0.5);
        assert_eq!(config.default_ease, Ease::Linear);
        assert_eq!(config.max_tweeners, 4);
        assert_eq!(config.max_sequences, 2);
        assert_eq!(config.capacity_increment, 1);
        assert_eq!(config.time_scale, 0.5);
    }
}
