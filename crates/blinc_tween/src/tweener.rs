//! Leaf tweens
//!
//! A tweener binds one [`ValuePlugin`] to one [`Accessor`] and an end value.
//! The plugin type is erased behind [`AnyTweener`] so the scheduler can keep
//! tweeners of every shape in one arena, and recovered by downcasting for
//! the typed value-changing operations.

use crate::accessor::Accessor;
use crate::error::TweenError;
use crate::plugins::{EvalFrame, TweenValue, TweenValues, ValuePlugin, ValueShape};
use crate::scheduler::{Scheduler, TweenId};
use crate::tween::{SeekContext, SeekMode, Tween, TweenKind};
use std::any::Any;
use std::marker::PhantomData;

/// Object-safe view of a [`TweenerCore`]
pub(crate) trait AnyTweener {
    fn shape(&self) -> ValueShape;

    fn value_type_name(&self) -> &'static str;

    /// Capture the start value and compute the change
    ///
    /// Returns the effective duration, which differs from `duration` for
    /// speed-based tweeners.
    fn startup(
        &mut self,
        relative: bool,
        speed_based: bool,
        duration: f32,
    ) -> Result<f32, TweenError>;

    fn apply(&mut self, frame: &EvalFrame<'_>) -> Result<(), TweenError>;

    fn set_from(&mut self, relative: bool) -> Result<(), TweenError>;

    /// Drop the target binding and values so the tweener can be pooled
    fn reset(&mut self);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub(crate) struct TweenerCore<P: ValuePlugin> {
    accessor: Option<Accessor<P::Value>>,
    values: TweenValues<P::Value>,
    options: P::Options,
    has_manually_set_start_value: bool,
    is_from: bool,
    _plugin: PhantomData<P>,
}

impl<P: ValuePlugin> TweenerCore<P> {
    pub fn new(accessor: Accessor<P::Value>, end: P::Value) -> Self {
        let mut core = Self {
            accessor: None,
            values: TweenValues::default(),
            options: P::Options::default(),
            has_manually_set_start_value: false,
            is_from: false,
            _plugin: PhantomData,
        };
        core.bind(accessor, end);
        core
    }

    /// Rebind a pooled tweener to a new target
    pub fn bind(&mut self, accessor: Accessor<P::Value>, end: P::Value) {
        self.accessor = Some(accessor);
        self.values = TweenValues {
            end,
            ..TweenValues::default()
        };
    }

    pub fn values(&self) -> TweenValues<P::Value> {
        self.values
    }

    pub fn set_options(&mut self, options: P::Options) {
        self.options = options;
    }

    fn accessor_mut(&mut self) -> Result<&mut Accessor<P::Value>, TweenError> {
        self.accessor
            .as_mut()
            .ok_or_else(|| TweenError::target_gone("tweener has no target"))
    }

    fn set_from_value(&mut self, from: P::Value, relative: bool) -> Result<(), TweenError> {
        let accessor = self
            .accessor
            .as_mut()
            .ok_or_else(|| TweenError::target_gone("tweener has no target"))?;
        P::set_from_value(&self.options, &mut self.values, accessor, from, relative)?;
        self.has_manually_set_start_value = true;
        self.is_from = true;
        Ok(())
    }

    fn change_start(&mut self, start: P::Value, started: bool) {
        self.has_manually_set_start_value = true;
        self.values.start = start;
        if started {
            P::set_change_value(&mut self.values);
        }
    }

    fn change_end(
        &mut self,
        end: P::Value,
        snap_start: bool,
        started: bool,
    ) -> Result<(), TweenError> {
        self.values.end = end;
        if started {
            if snap_start {
                let current = self.accessor_mut()?.get()?;
                self.values.start = P::convert_to_start_value(current);
            }
            P::set_change_value(&mut self.values);
        }
        Ok(())
    }
}

impl<P: ValuePlugin> AnyTweener for TweenerCore<P> {
    fn shape(&self) -> ValueShape {
        P::SHAPE
    }

    fn value_type_name(&self) -> &'static str {
        std::any::type_name::<P::Value>()
    }

    fn startup(
        &mut self,
        relative: bool,
        speed_based: bool,
        duration: f32,
    ) -> Result<f32, TweenError> {
        let accessor = self
            .accessor
            .as_mut()
            .ok_or_else(|| TweenError::target_gone("tweener has no target"))?;
        if !self.has_manually_set_start_value {
            self.values.start = P::convert_to_start_value(accessor.get()?);
        }
        if relative && !self.is_from {
            P::set_relative_end_value(&mut self.values);
        }
        P::set_change_value(&mut self.values);
        if speed_based {
            Ok(P::speed_based_duration(
                &self.options,
                duration,
                self.values.change,
            ))
        } else {
            Ok(duration)
        }
    }

    fn apply(&mut self, frame: &EvalFrame<'_>) -> Result<(), TweenError> {
        let accessor = self
            .accessor
            .as_mut()
            .ok_or_else(|| TweenError::target_gone("tweener has no target"))?;
        P::evaluate_and_apply(&self.options, frame, &self.values, accessor)
    }

    fn set_from(&mut self, relative: bool) -> Result<(), TweenError> {
        let accessor = self
            .accessor
            .as_mut()
            .ok_or_else(|| TweenError::target_gone("tweener has no target"))?;
        P::set_from(&self.options, &mut self.values, accessor, relative)?;
        self.has_manually_set_start_value = true;
        self.is_from = true;
        Ok(())
    }

    fn reset(&mut self) {
        self.accessor = None;
        self.values = TweenValues::default();
        self.options = P::Options::default();
        self.has_manually_set_start_value = false;
        self.is_from = false;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Tween {
    /// Downcast to the typed core of a tweener
    pub(crate) fn tweener_core_mut<P: ValuePlugin>(
        &mut self,
    ) -> Result<&mut TweenerCore<P>, TweenError> {
        let TweenKind::Tweener(tweener) = &mut self.kind else {
            return Err(TweenError::InvalidSequence(
                "value operations need a tweener",
            ));
        };
        let expected = tweener.shape();
        tweener
            .as_any_mut()
            .downcast_mut::<TweenerCore<P>>()
            .ok_or(TweenError::ValueTypeMismatch {
                expected,
                found: std::any::type_name::<P::Value>(),
            })
    }
}

// ============================================================================
// Typed value operations
// ============================================================================

impl Scheduler {
    /// Current start, end and change values of a tweener animating `T`
    pub fn tween_values<T: TweenValue>(&self, id: TweenId) -> Result<TweenValues<T>, TweenError> {
        let tween = self.tween_ref(id)?;
        let TweenKind::Tweener(tweener) = &tween.kind else {
            return Err(TweenError::InvalidSequence(
                "value operations need a tweener",
            ));
        };
        tweener
            .as_any()
            .downcast_ref::<TweenerCore<T::Plugin>>()
            .map(|core| core.values())
            .ok_or(TweenError::ValueTypeMismatch {
                expected: tweener.shape(),
                found: std::any::type_name::<T>(),
            })
    }

    /// Replace the start value and rewind without firing on-update
    pub fn change_start_value<T: TweenValue>(
        &mut self,
        id: TweenId,
        start: T,
    ) -> Result<(), TweenError> {
        self.change_values_with(id, "change start value", |tween| {
            let started = tween.startup_done;
            tween.tweener_core_mut::<T::Plugin>()?.change_start(start, started);
            Ok(())
        })
    }

    /// Replace the end value and rewind without firing on-update
    ///
    /// With `snap_start` the start value is re-read from the target.
    pub fn change_end_value<T: TweenValue>(
        &mut self,
        id: TweenId,
        end: T,
        snap_start: bool,
    ) -> Result<(), TweenError> {
        self.change_values_with(id, "change end value", |tween| {
            let started = tween.startup_done;
            tween
                .tweener_core_mut::<T::Plugin>()?
                .change_end(end, snap_start, started)?;
            tween.is_relative = false;
            Ok(())
        })
    }

    /// Replace both start and end values and rewind without firing on-update
    pub fn change_values<T: TweenValue>(
        &mut self,
        id: TweenId,
        start: T,
        end: T,
    ) -> Result<(), TweenError> {
        self.change_values_with(id, "change values", |tween| {
            let started = tween.startup_done;
            let core = tween.tweener_core_mut::<T::Plugin>()?;
            core.change_end(end, false, false)?;
            core.change_start(start, started);
            tween.is_relative = false;
            Ok(())
        })
    }

    /// Turn a tweener into a "from" tweener
    ///
    /// The live value becomes the end value and the configured end value
    /// (added to the live value when `relative`) becomes the start, which is
    /// written to the target immediately.
    pub fn set_from(&mut self, id: TweenId, relative: bool) -> Result<(), TweenError> {
        self.from_with(id, |tween| match &mut tween.kind {
            TweenKind::Tweener(tweener) => tweener.set_from(relative),
            TweenKind::Sequence(_) => Err(TweenError::InvalidSequence(
                "sequences cannot play from a value",
            )),
        })
    }

    /// Start from an explicit value, written to the target immediately
    pub fn set_from_value<T: TweenValue>(
        &mut self,
        id: TweenId,
        from: T,
        relative: bool,
    ) -> Result<(), TweenError> {
        self.from_with(id, |tween| {
            tween
                .tweener_core_mut::<T::Plugin>()?
                .set_from_value(from, relative)
        })
    }

    fn from_with(
        &mut self,
        id: TweenId,
        f: impl FnOnce(&mut Tween) -> Result<(), TweenError>,
    ) -> Result<(), TweenError> {
        let tween = self.tween_mut_checked(id)?;
        if tween.parent.is_some() {
            return Err(TweenError::Sequenced);
        }
        if tween.creation_locked || tween.startup_done {
            return Err(TweenError::Locked);
        }
        match f(tween) {
            Ok(()) => Ok(()),
            Err(err @ TweenError::ValueTypeMismatch { .. }) => {
                tracing::error!("set from on tween {:?}: {}", id, err);
                Err(err)
            }
            Err(err) => {
                tracing::warn!("tween {:?} lost its target while setting from: {}", id, err);
                self.kill_marked(id);
                Err(err)
            }
        }
    }

    fn change_values_with(
        &mut self,
        id: TweenId,
        what: &'static str,
        f: impl FnOnce(&mut Tween) -> Result<(), TweenError>,
    ) -> Result<(), TweenError> {
        let tween = self.tween_mut_checked(id)?;
        if tween.parent.is_some() {
            tracing::warn!("{} ignored: tween {:?} is nested in a sequence", what, id);
            return Err(TweenError::Sequenced);
        }
        if let Err(err) = f(tween) {
            match err {
                TweenError::ValueTypeMismatch { .. } => {
                    tracing::error!("{} on tween {:?}: {}", what, id, err)
                }
                _ => tracing::warn!("{} on tween {:?}: {}", what, id, err),
            }
            return Err(err);
        }
        let started = tween.startup_done;
        if started {
            self.seek_detached(id, 0.0, 0, SeekContext::top(SeekMode::Silent));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::Vec2;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_startup_reads_start_and_applies_relative() {
        let cell = Rc::new(Cell::new(10.0f32));
        let mut core =
            TweenerCore::<crate::plugins::FloatPlugin>::new(Accessor::shared(cell.clone()), 5.0);
        let duration = core.startup(true, false, 1.0).unwrap();
        assert_eq!(duration, 1.0);
        let values = core.values();
        assert_eq!(values.start, 10.0);
        assert_eq!(values.end, 15.0);
        assert_eq!(values.change, 5.0);
    }

    #[test]
    fn test_speed_based_startup_duration() {
        let cell = Rc::new(Cell::new(Vec2::ZERO));
        let mut core = TweenerCore::<crate::plugins::Vector2Plugin>::new(
            Accessor::shared(cell),
            Vec2::new(6.0, 8.0),
        );
        let duration = core.startup(false, true, 2.0).unwrap();
        assert_eq!(duration, 5.0);
    }

    #[test]
    fn test_startup_fails_when_target_is_gone() {
        let cell = Rc::new(Cell::new(1.0f32));
        let mut core =
            TweenerCore::<crate::plugins::FloatPlugin>::new(Accessor::weak(&cell), 5.0);
        drop(cell);
        assert!(matches!(
            core.startup(false, false, 1.0),
            Err(TweenError::TargetUnavailable(_))
        ));
    }

    #[test]
    fn test_reset_drops_binding() {
        let cell = Rc::new(Cell::new(1.0f32));
        let mut core =
            TweenerCore::<crate::plugins::FloatPlugin>::new(Accessor::shared(cell.clone()), 5.0);
        assert_eq!(Rc::strong_count(&cell), 3);
        core.reset();
        assert_eq!(Rc::strong_count(&cell), 1);
        assert_eq!(core.values(), TweenValues::default());
        assert!(core.startup(false, false, 1.0).is_err());
    }
}
