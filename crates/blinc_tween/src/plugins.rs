//! Value plugins
//!
//! A plugin is a stateless strategy that knows how to tween one value shape:
//! how to compute relative and change values, how long a speed-based tween
//! lasts, and how to write an eased value back through an [`Accessor`].
//! Plugins are selected statically through [`TweenValue`].

use crate::accessor::Accessor;
use crate::easing::{self, CustomEase, Ease};
use crate::error::TweenError;
use crate::tween::{LoopType, ParentLoop};
use crate::values::{Color, Vec2, Vec3, Vec4};
use std::fmt;

/// Concrete shape of a tweened value, used to bucket pooled tweeners
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueShape {
    Float,
    Double,
    Int,
    Vector2,
    Vector3,
    Vector4,
    Color,
}

/// Start, end and change values of a tweener
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TweenValues<T> {
    pub start: T,
    pub end: T,
    pub change: T,
}

/// Everything a plugin needs to evaluate one frame
#[derive(Clone, Copy, Debug)]
pub struct EvalFrame<'a> {
    pub ease: Ease,
    pub custom_ease: Option<&'a CustomEase>,
    pub overshoot: f32,
    pub period: f32,
    /// Position inside the current loop
    pub elapsed: f32,
    /// Mirrored yoyo loop: progress runs from 1 back to 0
    pub use_inverse: bool,
    pub duration: f32,
    pub loop_type: LoopType,
    pub loops: i32,
    pub completed_loops: i32,
    /// The tween sits exactly at the end of a loop
    pub at_loop_end: bool,
    /// Loop state of the enclosing sequence, if any
    pub parent: Option<ParentLoop>,
}

/// Per-shape tweening strategy
pub trait ValuePlugin: 'static {
    type Value: Copy + Default + fmt::Debug + PartialEq + 'static;
    type Options: Clone + Default + fmt::Debug + 'static;

    const SHAPE: ValueShape;

    fn add(a: Self::Value, b: Self::Value) -> Self::Value;
    fn sub(a: Self::Value, b: Self::Value) -> Self::Value;
    fn scale(value: Self::Value, factor: f32) -> Self::Value;

    /// Distance covered by a change, used for speed-based durations
    fn magnitude(value: Self::Value) -> f32;

    /// Write a value through the accessor, honoring the plugin options
    fn write(
        options: &Self::Options,
        value: Self::Value,
        accessor: &mut Accessor<Self::Value>,
    ) -> Result<(), TweenError>;

    fn convert_to_start_value(current: Self::Value) -> Self::Value {
        current
    }

    fn set_relative_end_value(values: &mut TweenValues<Self::Value>) {
        values.end = Self::add(values.start, values.end);
    }

    fn set_change_value(values: &mut TweenValues<Self::Value>) {
        values.change = Self::sub(values.end, values.start);
    }

    /// Convert a units-per-second rate into a duration in seconds
    fn speed_based_duration(
        _options: &Self::Options,
        units_per_second: f32,
        change: Self::Value,
    ) -> f32 {
        if units_per_second <= 0.0 {
            return 0.0;
        }
        Self::magnitude(change) / units_per_second
    }

    /// Turn the tweener into a "from" tweener
    ///
    /// The live value becomes the end, the configured end (or live value
    /// plus configured end when relative) becomes the start, and the start
    /// is written immediately.
    fn set_from(
        options: &Self::Options,
        values: &mut TweenValues<Self::Value>,
        accessor: &mut Accessor<Self::Value>,
        relative: bool,
    ) -> Result<(), TweenError> {
        let prev_end = values.end;
        values.end = accessor.get()?;
        values.start = if relative {
            Self::add(values.end, prev_end)
        } else {
            prev_end
        };
        Self::write(options, values.start, accessor)
    }

    /// Start from an explicit value
    fn set_from_value(
        options: &Self::Options,
        values: &mut TweenValues<Self::Value>,
        accessor: &mut Accessor<Self::Value>,
        mut from: Self::Value,
        relative: bool,
    ) -> Result<(), TweenError> {
        if relative {
            let current = accessor.get()?;
            values.end = Self::add(values.end, current);
            from = Self::add(from, current);
        }
        values.start = from;
        Self::write(options, from, accessor)
    }

    fn lerp(start: Self::Value, change: Self::Value, progress: f32) -> Self::Value {
        Self::add(start, Self::scale(change, progress))
    }

    /// Evaluate the ease for `frame` and write the resulting value
    fn evaluate_and_apply(
        options: &Self::Options,
        frame: &EvalFrame<'_>,
        values: &TweenValues<Self::Value>,
        accessor: &mut Accessor<Self::Value>,
    ) -> Result<(), TweenError> {
        let mut start = values.start;
        if frame.loop_type == LoopType::Incremental {
            let loops = if frame.at_loop_end && frame.completed_loops > 0 {
                frame.completed_loops - 1
            } else {
                frame.completed_loops
            };
            start = Self::add(start, Self::scale(values.change, loops as f32));
        }
        if let Some(parent) = frame.parent {
            if parent.loop_type == LoopType::Incremental {
                let own = if frame.loop_type == LoopType::Incremental {
                    frame.loops.max(1) as f32
                } else {
                    1.0
                };
                start = Self::add(
                    start,
                    Self::scale(values.change, own * parent.cycle as f32),
                );
            }
        }

        let mut progress = easing::evaluate(
            frame.ease,
            frame.custom_ease,
            frame.elapsed,
            frame.duration,
            frame.overshoot,
            frame.period,
        );
        if frame.use_inverse {
            progress = 1.0 - progress;
        }
        Self::write(options, Self::lerp(start, values.change, progress), accessor)
    }
}

/// Maps a value type to the plugin that tweens it
pub trait TweenValue: Copy + Default + fmt::Debug + PartialEq + 'static {
    type Plugin: ValuePlugin<Value = Self>;
}

// ============================================================================
// Options
// ============================================================================

/// Options for float tweens
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FloatOptions {
    /// Round the written value to the nearest integer
    pub snapping: bool,
}

/// Restrict a vector tween to a single component
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AxisConstraint {
    #[default]
    None,
    X,
    Y,
    Z,
    W,
}

/// Options for vector tweens
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VectorOptions {
    pub axis_constraint: AxisConstraint,
    pub snapping: bool,
}

/// Options for color tweens
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ColorOptions {
    /// Only the alpha channel is tweened
    pub alpha_only: bool,
}

// ============================================================================
// Scalar plugins
// ============================================================================

pub struct FloatPlugin;

impl ValuePlugin for FloatPlugin {
    type Value = f32;
    type Options = FloatOptions;
    const SHAPE: ValueShape = ValueShape::Float;

    fn add(a: f32, b: f32) -> f32 {
        a + b
    }

    fn sub(a: f32, b: f32) -> f32 {
        a - b
    }

    fn scale(value: f32, factor: f32) -> f32 {
        value * factor
    }

    fn magnitude(value: f32) -> f32 {
        value.abs()
    }

    fn write(
        options: &FloatOptions,
        value: f32,
        accessor: &mut Accessor<f32>,
    ) -> Result<(), TweenError> {
        accessor.set(if options.snapping { value.round() } else { value })
    }
}

pub struct DoublePlugin;

impl ValuePlugin for DoublePlugin {
    type Value = f64;
    type Options = FloatOptions;
    const SHAPE: ValueShape = ValueShape::Double;

    fn add(a: f64, b: f64) -> f64 {
        a + b
    }

    fn sub(a: f64, b: f64) -> f64 {
        a - b
    }

    fn scale(value: f64, factor: f32) -> f64 {
        value * factor as f64
    }

    fn magnitude(value: f64) -> f32 {
        value.abs() as f32
    }

    fn write(
        options: &FloatOptions,
        value: f64,
        accessor: &mut Accessor<f64>,
    ) -> Result<(), TweenError> {
        accessor.set(if options.snapping { value.round() } else { value })
    }
}

/// Integer tweens interpolate in float space and round on write
pub struct IntPlugin;

impl ValuePlugin for IntPlugin {
    type Value = i32;
    type Options = ();
    const SHAPE: ValueShape = ValueShape::Int;

    fn add(a: i32, b: i32) -> i32 {
        a.saturating_add(b)
    }

    fn sub(a: i32, b: i32) -> i32 {
        a.saturating_sub(b)
    }

    fn scale(value: i32, factor: f32) -> i32 {
        (value as f32 * factor).round() as i32
    }

    fn magnitude(value: i32) -> f32 {
        value.unsigned_abs() as f32
    }

    fn lerp(start: i32, change: i32, progress: f32) -> i32 {
        (start as f32 + change as f32 * progress).round() as i32
    }

    fn write(_options: &(), value: i32, accessor: &mut Accessor<i32>) -> Result<(), TweenError> {
        accessor.set(value)
    }
}

// ============================================================================
// Vector plugins
// ============================================================================

trait Axes: Copy {
    fn set_axis(&mut self, axis: AxisConstraint, from: &Self);
    fn rounded(&self) -> Self;
}

impl Axes for Vec2 {
    fn set_axis(&mut self, axis: AxisConstraint, from: &Self) {
        match axis {
            AxisConstraint::X => self.x = from.x,
            AxisConstraint::Y => self.y = from.y,
            _ => {}
        }
    }

    fn rounded(&self) -> Self {
        self.round()
    }
}

impl Axes for Vec3 {
    fn set_axis(&mut self, axis: AxisConstraint, from: &Self) {
        match axis {
            AxisConstraint::X => self.x = from.x,
            AxisConstraint::Y => self.y = from.y,
            AxisConstraint::Z => self.z = from.z,
            _ => {}
        }
    }

    fn rounded(&self) -> Self {
        self.round()
    }
}

impl Axes for Vec4 {
    fn set_axis(&mut self, axis: AxisConstraint, from: &Self) {
        match axis {
            AxisConstraint::X => self.x = from.x,
            AxisConstraint::Y => self.y = from.y,
            AxisConstraint::Z => self.z = from.z,
            AxisConstraint::W => self.w = from.w,
            AxisConstraint::None => {}
        }
    }

    fn rounded(&self) -> Self {
        self.round()
    }
}

fn write_vector<V: Axes + 'static>(
    options: &VectorOptions,
    value: V,
    accessor: &mut Accessor<V>,
) -> Result<(), TweenError> {
    let value = if options.snapping {
        value.rounded()
    } else {
        value
    };
    if options.axis_constraint == AxisConstraint::None {
        return accessor.set(value);
    }
    let mut current = accessor.get()?;
    current.set_axis(options.axis_constraint, &value);
    accessor.set(current)
}

pub struct Vector2Plugin;

impl ValuePlugin for Vector2Plugin {
    type Value = Vec2;
    type Options = VectorOptions;
    const SHAPE: ValueShape = ValueShape::Vector2;

    fn add(a: Vec2, b: Vec2) -> Vec2 {
        a + b
    }

    fn sub(a: Vec2, b: Vec2) -> Vec2 {
        a - b
    }

    fn scale(value: Vec2, factor: f32) -> Vec2 {
        value * factor
    }

    fn magnitude(value: Vec2) -> f32 {
        value.length()
    }

    fn write(
        options: &VectorOptions,
        value: Vec2,
        accessor: &mut Accessor<Vec2>,
    ) -> Result<(), TweenError> {
        write_vector(options, value, accessor)
    }
}

pub struct Vector3Plugin;

impl ValuePlugin for Vector3Plugin {
    type Value = Vec3;
    type Options = VectorOptions;
    const SHAPE: ValueShape = ValueShape::Vector3;

    fn add(a: Vec3, b: Vec3) -> Vec3 {
        a + b
    }

    fn sub(a: Vec3, b: Vec3) -> Vec3 {
        a - b
    }

    fn scale(value: Vec3, factor: f32) -> Vec3 {
        value * factor
    }

    fn magnitude(value: Vec3) -> f32 {
        value.length()
    }

    fn write(
        options: &VectorOptions,
        value: Vec3,
        accessor: &mut Accessor<Vec3>,
    ) -> Result<(), TweenError> {
        write_vector(options, value, accessor)
    }
}

pub struct Vector4Plugin;

impl ValuePlugin for Vector4Plugin {
    type Value = Vec4;
    type Options = VectorOptions;
    const SHAPE: ValueShape = ValueShape::Vector4;

    fn add(a: Vec4, b: Vec4) -> Vec4 {
        a + b
    }

    fn sub(a: Vec4, b: Vec4) -> Vec4 {
        a - b
    }

    fn scale(value: Vec4, factor: f32) -> Vec4 {
        value * factor
    }

    fn magnitude(value: Vec4) -> f32 {
        value.length()
    }

    fn write(
        options: &VectorOptions,
        value: Vec4,
        accessor: &mut Accessor<Vec4>,
    ) -> Result<(), TweenError> {
        write_vector(options, value, accessor)
    }
}

// ============================================================================
// Color plugin
// ============================================================================

pub struct ColorPlugin;

impl ValuePlugin for ColorPlugin {
    type Value = Color;
    type Options = ColorOptions;
    const SHAPE: ValueShape = ValueShape::Color;

    fn add(a: Color, b: Color) -> Color {
        a + b
    }

    fn sub(a: Color, b: Color) -> Color {
        a - b
    }

    fn scale(value: Color, factor: f32) -> Color {
        value * factor
    }

    fn magnitude(value: Color) -> f32 {
        value.length()
    }

    fn write(
        options: &ColorOptions,
        value: Color,
        accessor: &mut Accessor<Color>,
    ) -> Result<(), TweenError> {
        if !options.alpha_only {
            return accessor.set(value);
        }
        let current = accessor.get()?;
        accessor.set(current.with_alpha(value.a))
    }
}

impl TweenValue for f32 {
    type Plugin = FloatPlugin;
}

impl TweenValue for f64 {
    type Plugin = DoublePlugin;
}

impl TweenValue for i32 {
    type Plugin = IntPlugin;
}

impl TweenValue for Vec2 {
    type Plugin = Vector2Plugin;
}

impl TweenValue for Vec3 {
    type Plugin = Vector3Plugin;
}

impl TweenValue for Vec4 {
    type Plugin = Vector4Plugin;
}

impl TweenValue for Color {
    type Plugin = ColorPlugin;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn frame(elapsed: f32, duration: f32) -> EvalFrame<'static> {
        EvalFrame {
            ease: Ease::Linear,
            custom_ease: None,
            overshoot: easing::DEFAULT_OVERSHOOT,
            period: 0.0,
            elapsed,
            use_inverse: false,
            duration,
            loop_type: LoopType::Restart,
            loops: 1,
            completed_loops: 0,
            at_loop_end: false,
            parent: None,
        }
    }

    #[test]
    fn test_relative_and_change_values() {
        let mut values = TweenValues {
            start: 10.0f32,
            end: 5.0,
            change: 0.0,
        };
        FloatPlugin::set_relative_end_value(&mut values);
        FloatPlugin::set_change_value(&mut values);
        assert_eq!(values.end, 15.0);
        assert_eq!(values.change, 5.0);
    }

    #[test]
    fn test_speed_based_duration() {
        assert_eq!(
            FloatPlugin::speed_based_duration(&FloatOptions::default(), 2.0, -10.0),
            5.0
        );
        let change = Vec2::new(3.0, 4.0);
        assert_eq!(
            Vector2Plugin::speed_based_duration(&VectorOptions::default(), 5.0, change),
            1.0
        );
        assert_eq!(IntPlugin::speed_based_duration(&(), 0.0, 10), 0.0);
    }

    #[test]
    fn test_zero_duration_applies_full_change() {
        let cell = Rc::new(Cell::new(0.0f32));
        let mut accessor = Accessor::shared(cell.clone());
        let values = TweenValues {
            start: 0.0,
            end: 8.0,
            change: 8.0,
        };
        FloatPlugin::evaluate_and_apply(
            &FloatOptions::default(),
            &frame(0.0, 0.0),
            &values,
            &mut accessor,
        )
            .unwrap();
        assert_eq!(cell.get(), 8.0);
    }

    #[test]
    fn test_incremental_offsets() {
        let cell = Rc::new(Cell::new(0.0f32));
        let mut accessor = Accessor::shared(cell.clone());
        let values = TweenValues {
            start: 0.0,
            end: 2.0,
            change: 2.0,
        };

        let mut f = frame(0.5, 1.0);
        f.loop_type = LoopType::Incremental;
        f.loops = 3;
        f.completed_loops = 2;
        FloatPlugin::evaluate_and_apply(&FloatOptions::default(), &f, &values, &mut accessor)
            .unwrap();
        assert_eq!(cell.get(), 5.0);

        // End of the last loop
        f.elapsed = 1.0;
        f.completed_loops = 3;
        f.at_loop_end = true;
        FloatPlugin::evaluate_and_apply(&FloatOptions::default(), &f, &values, &mut accessor)
            .unwrap();
        assert_eq!(cell.get(), 6.0);

        // Parent sequence on its second cycle compounds by the child's loop count
        let mut f = frame(0.0, 1.0);
        f.loop_type = LoopType::Incremental;
        f.loops = 3;
        f.parent = Some(ParentLoop {
            loop_type: LoopType::Incremental,
            cycle: 1,
        });
        FloatPlugin::evaluate_and_apply(&FloatOptions::default(), &f, &values, &mut accessor)
            .unwrap();
        assert_eq!(cell.get(), 6.0);
    }

    #[test]
    fn test_inverse_mirrors_progress() {
        let cell = Rc::new(Cell::new(0.0f32));
        let mut accessor = Accessor::shared(cell.clone());
        let values = TweenValues {
            start: 0.0,
            end: 4.0,
            change: 4.0,
        };
        let mut f = frame(0.5, 1.0);
        f.ease = Ease::OutQuad;
        f.use_inverse = true;
        FloatPlugin::evaluate_and_apply(&FloatOptions::default(), &f, &values, &mut accessor)
            .unwrap();
        assert_eq!(cell.get(), 1.0);
    }

    #[test]
    fn test_int_rounding_and_snapping() {
        let cell = Rc::new(Cell::new(0i32));
        let mut accessor = Accessor::shared(cell.clone());
        let values = TweenValues {
            start: 0,
            end: 3,
            change: 3,
        };
        IntPlugin::evaluate_and_apply(&(), &frame(0.5, 1.0), &values, &mut accessor).unwrap();
        assert_eq!(cell.get(), 2);

        let cell = Rc::new(Cell::new(0.0f32));
        let mut accessor = Accessor::shared(cell.clone());
        FloatPlugin::write(&FloatOptions { snapping: true }, 2.6, &mut accessor).unwrap();
        assert_eq!(cell.get(), 3.0);
    }

    #[test]
    fn test_axis_constraint_only_touches_one_component() {
        let cell = Rc::new(Cell::new(Vec3::new(1.0, 2.0, 3.0)));
        let mut accessor = Accessor::shared(cell.clone());
        let options = VectorOptions {
            axis_constraint: AxisConstraint::Y,
            snapping: false,
        };
        Vector3Plugin::write(&options, Vec3::new(9.0, 9.0, 9.0), &mut accessor).unwrap();
        assert_eq!(cell.get(), Vec3::new(1.0, 9.0, 3.0));
    }

    #[test]
    fn test_alpha_only_color() {
        let cell = Rc::new(Cell::new(Color::RED));
        let mut accessor = Accessor::shared(cell.clone());
        let options = ColorOptions { alpha_only: true };
        ColorPlugin::write(&options, Color::rgba(0.0, 1.0, 0.0, 0.25), &mut accessor).unwrap();
        assert_eq!(cell.get(), Color::rgba(1.0, 0.0, 0.0, 0.25));
    }

    #[test]
    fn test_set_from_swaps_start_and_end() {
        let cell = Rc::new(Cell::new(3.0f32));
        let mut accessor = Accessor::shared(cell.clone());
        let mut values = TweenValues {
            start: 0.0,
            end: 10.0,
            change: 0.0,
        };
        FloatPlugin::set_from(&FloatOptions::default(), &mut values, &mut accessor, false).unwrap();
        assert_eq!(values.start, 10.0);
        assert_eq!(values.end, 3.0);
        assert_eq!(cell.get(), 10.0);

        let cell = Rc::new(Cell::new(3.0f32));
        let mut accessor = Accessor::shared(cell.clone());
        let mut values = TweenValues {
            start: 0.0,
            end: 10.0,
            change: 0.0,
        };
        FloatPlugin::set_from(&FloatOptions::default(), &mut values, &mut accessor, true).unwrap();
        assert_eq!(values.start, 13.0);
        assert_eq!(cell.get(), 13.0);
    }
}
