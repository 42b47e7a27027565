//! Blinc Tween Engine
//!
//! Eased interpolation of typed values, composable sequences and a pooled
//! scheduler that drives them from host frame ticks.
//!
//! # Features
//!
//! - **Tweeners**: Animate any value reachable through a getter/setter pair
//! - **Value Plugins**: Float, double, int, vectors and colors, with
//!   relative, from, snapping and axis-constrained variants
//! - **Easing**: Named curves, custom functions and sampled curves
//! - **Loops**: Restart, yoyo and incremental loops, finite or infinite
//! - **Sequences**: Append, join, prepend and insert tweens and callback
//!   markers on a shared timeline, nested to any depth
//! - **Seeking**: Deterministic goto, rewind, restart and complete
//! - **Scheduling**: Update phases, time scales, tag filters and tweener
//!   pooling behind generational handles
//!
//! # Example
//!
//! ```ignore
//! use blinc_tween::{Accessor, Ease, LoopType, Scheduler};
//! use std::{cell::Cell, rc::Rc};
//!
//! let mut scheduler = Scheduler::new();
//! let opacity = Rc::new(Cell::new(0.0f32));
//! let fade = scheduler.to(Accessor::shared(opacity.clone()), 1.0, 0.3);
//! scheduler
//!     .settings(fade)?
//!     .ease(Ease::OutCubic)
//!     .loops(2, LoopType::Yoyo);
//!
//! // once per frame
//! scheduler.update(dt, unscaled_dt);
//! ```

pub mod accessor;
pub mod callbacks;
pub mod config;
pub mod easing;
pub mod error;
pub mod plugins;
mod registry;
pub mod scheduler;
mod seek;
pub mod sequence;
pub mod tween;
mod tweener;
pub mod values;

pub use accessor::{Accessor, Getter, Setter};
pub use callbacks::{TweenCallback, TweenEvent};
pub use config::SchedulerConfig;
pub use easing::{CustomEase, Ease, EaseCurve, EaseFunction, DEFAULT_OVERSHOOT};
pub use error::TweenError;
pub use plugins::{
    AxisConstraint, ColorOptions, ColorPlugin, DoublePlugin, EvalFrame, FloatOptions,
    FloatPlugin, IntPlugin, TweenValue, TweenValues, ValuePlugin, ValueShape, Vector2Plugin,
    Vector3Plugin, Vector4Plugin, VectorOptions,
};
pub use scheduler::{Scheduler, SchedulerStats, TweenFilter, TweenId};
pub use sequence::{SequencedEntryInfo, SequencedItem};
pub use tween::{LoopType, ParentLoop, TweenSettings, TweenStatus, UpdatePhase};
pub use values::{Color, Vec2, Vec3, Vec4};
