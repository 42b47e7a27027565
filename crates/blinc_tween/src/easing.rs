//! Easing functions for tweens
//!
//! Every curve maps `(elapsed, duration, overshoot, period)` to a progress
//! value that is nominally in `[0, 1]` (elastic and back curves overshoot).
//! A custom function or sampled curve, when present, takes precedence over
//! the named curve.

use std::f32::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::rc::Rc;

const TWO_PI: f32 = PI * 2.0;

/// Default overshoot used by back and elastic curves
pub const DEFAULT_OVERSHOOT: f32 = 1.70158;

/// Named easing curves
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Ease {
    Linear,
    InSine,
    OutSine,
    InOutSine,
    InQuad,
    #[default]
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
    InQuart,
    OutQuart,
    InOutQuart,
    InQuint,
    OutQuint,
    InOutQuint,
    InExpo,
    OutExpo,
    InOutExpo,
    InCirc,
    OutCirc,
    InOutCirc,
    InElastic,
    OutElastic,
    InOutElastic,
    InBack,
    OutBack,
    InOutBack,
    InBounce,
    OutBounce,
    InOutBounce,
    /// CSS-style cubic bezier through (0,0), (x1,y1), (x2,y2), (1,1)
    CubicBezier(f32, f32, f32, f32),
}

/// User supplied easing function: `(elapsed, duration, overshoot, period) -> progress`
pub type EaseFunction = Rc<dyn Fn(f32, f32, f32, f32) -> f32>;

/// A piecewise linear curve sampled over normalized time
#[derive(Clone, Debug, PartialEq)]
pub struct EaseCurve {
    /// `(time, value)` pairs sorted by time, time in `[0, 1]`
    points: Vec<(f32, f32)>,
}

impl EaseCurve {
    /// Build a curve from `(time, value)` points
    ///
    /// Points are sorted by time. An empty point list behaves like linear.
    pub fn new(mut points: Vec<(f32, f32)>) -> Self {
        points.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        Self { points }
    }

    /// Sample a function at `samples + 1` evenly spaced times
    pub fn sample<F>(samples: usize, f: F) -> Self
    where
        F: Fn(f32) -> f32,
    {
        let samples = samples.max(1);
        let points = (0..=samples)
            .map(|i| {
                let t = i as f32 / samples as f32;
                (t, f(t))
            })
            .collect();
        Self { points }
    }

    /// Evaluate the curve at normalized time `t`
    pub fn evaluate(&self, t: f32) -> f32 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return t,
        };
        if t <= first.0 {
            return first.1;
        }
        if t >= last.0 {
            return last.1;
        }

        let next = self.points.partition_point(|p| p.0 <= t);
        let (t0, v0) = self.points[next - 1];
        let (t1, v1) = self.points[next];
        if (t1 - t0).abs() < f32::EPSILON {
            return v1;
        }
        v0 + (v1 - v0) * ((t - t0) / (t1 - t0))
    }
}

/// Custom easing that overrides the named curve of a tween
#[derive(Clone)]
pub enum CustomEase {
    Function(EaseFunction),
    Curve(Rc<EaseCurve>),
}

impl CustomEase {
    /// Wrap a closure as a custom ease
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(f32, f32, f32, f32) -> f32 + 'static,
    {
        CustomEase::Function(Rc::new(f))
    }

    /// Wrap a sampled curve as a custom ease
    pub fn curve(curve: EaseCurve) -> Self {
        CustomEase::Curve(Rc::new(curve))
    }

    fn evaluate(&self, time: f32, duration: f32, overshoot: f32, period: f32) -> f32 {
        match self {
            CustomEase::Function(f) => f(time, duration, overshoot, period),
            CustomEase::Curve(curve) => curve.evaluate(time / duration),
        }
    }
}

impl fmt::Debug for CustomEase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomEase::Function(_) => f.write_str("CustomEase::Function(..)"),
            CustomEase::Curve(curve) => f.debug_tuple("CustomEase::Curve").field(curve).finish(),
        }
    }
}

/// Evaluate an ease at `time` within `duration`
///
/// A non-positive duration returns `1.0`, meaning the whole change is applied
/// at once.
pub fn evaluate(
    ease: Ease,
    custom: Option<&CustomEase>,
    time: f32,
    duration: f32,
    overshoot: f32,
    period: f32,
) -> f32 {
    if duration <= 0.0 {
        return 1.0;
    }
    if let Some(custom) = custom {
        return custom.evaluate(time, duration, overshoot, period);
    }
    ease.evaluate(time, duration, overshoot, period)
}

impl Ease {
    /// Evaluate this named curve (`duration` must be positive)
    pub fn evaluate(self, time: f32, duration: f32, overshoot: f32, period: f32) -> f32 {
        let t = time / duration;
        match self {
            Ease::Linear => t,
            Ease::InSine => 1.0 - (t * FRAC_PI_2).cos(),
            Ease::OutSine => (t * FRAC_PI_2).sin(),
            Ease::InOutSine => -0.5 * ((PI * t).cos() - 1.0),
            Ease::InQuad => t * t,
            Ease::OutQuad => -t * (t - 2.0),
            Ease::InOutQuad => {
                let t = t * 2.0;
                if t < 1.0 {
                    0.5 * t * t
                } else {
                    let t = t - 1.0;
                    -0.5 * (t * (t - 2.0) - 1.0)
                }
            }
            Ease::InCubic => t * t * t,
            Ease::OutCubic => {
                let t = t - 1.0;
                t * t * t + 1.0
            }
            Ease::InOutCubic => {
                let t = t * 2.0;
                if t < 1.0 {
                    0.5 * t * t * t
                } else {
                    let t = t - 2.0;
                    0.5 * (t * t * t + 2.0)
                }
            }
            Ease::InQuart => t * t * t * t,
            Ease::OutQuart => {
                let t = t - 1.0;
                -(t * t * t * t - 1.0)
            }
            Ease::InOutQuart => {
                let t = t * 2.0;
                if t < 1.0 {
                    0.5 * t * t * t * t
                } else {
                    let t = t - 2.0;
                    -0.5 * (t * t * t * t - 2.0)
                }
            }
            Ease::InQuint => t * t * t * t * t,
            Ease::OutQuint => {
                let t = t - 1.0;
                t * t * t * t * t + 1.0
            }
            Ease::InOutQuint => {
                let t = t * 2.0;
                if t < 1.0 {
                    0.5 * t * t * t * t * t
                } else {
                    let t = t - 2.0;
                    0.5 * (t * t * t * t * t + 2.0)
                }
            }
            Ease::InExpo => {
                if time == 0.0 {
                    0.0
                } else {
                    2f32.powf(10.0 * (t - 1.0))
                }
            }
            Ease::OutExpo => {
                if time == duration {
                    1.0
                } else {
                    1.0 - 2f32.powf(-10.0 * t)
                }
            }
            Ease::InOutExpo => {
                if time == 0.0 {
                    return 0.0;
                }
                if time == duration {
                    return 1.0;
                }
                let t = t * 2.0;
                if t < 1.0 {
                    0.5 * 2f32.powf(10.0 * (t - 1.0))
                } else {
                    0.5 * (2.0 - 2f32.powf(-10.0 * (t - 1.0)))
                }
            }
            Ease::InCirc => -((1.0 - t * t).max(0.0).sqrt() - 1.0),
            Ease::OutCirc => {
                let t = t - 1.0;
                (1.0 - t * t).max(0.0).sqrt()
            }
            Ease::InOutCirc => {
                let t = t * 2.0;
                if t < 1.0 {
                    -0.5 * ((1.0 - t * t).max(0.0).sqrt() - 1.0)
                } else {
                    let t = t - 2.0;
                    0.5 * ((1.0 - t * t).max(0.0).sqrt() + 1.0)
                }
            }
            Ease::InElastic => in_elastic(time, duration, overshoot, period),
            Ease::OutElastic => out_elastic(time, duration, overshoot, period),
            Ease::InOutElastic => in_out_elastic(time, duration, overshoot, period),
            Ease::InBack => t * t * ((overshoot + 1.0) * t - overshoot),
            Ease::OutBack => {
                let t = t - 1.0;
                t * t * ((overshoot + 1.0) * t + overshoot) + 1.0
            }
            Ease::InOutBack => {
                let s = overshoot * 1.525;
                let t = t * 2.0;
                if t < 1.0 {
                    0.5 * (t * t * ((s + 1.0) * t - s))
                } else {
                    let t = t - 2.0;
                    0.5 * (t * t * ((s + 1.0) * t + s) + 2.0)
                }
            }
            Ease::InBounce => bounce_in(time, duration),
            Ease::OutBounce => bounce_out(time, duration),
            Ease::InOutBounce => {
                if time < duration * 0.5 {
                    bounce_in(time * 2.0, duration) * 0.5
                } else {
                    bounce_out(time * 2.0 - duration, duration) * 0.5 + 0.5
                }
            }
            Ease::CubicBezier(x1, y1, x2, y2) => cubic_bezier_ease(t, x1, y1, x2, y2),
        }
    }
}

/// Amplitude and phase shift shared by the elastic curves
fn elastic_shape(amplitude: f32, period: f32) -> (f32, f32) {
    if amplitude < 1.0 {
        (1.0, period / 4.0)
    } else {
        (amplitude, period / TWO_PI * (1.0 / amplitude).asin())
    }
}

fn in_elastic(time: f32, duration: f32, overshoot: f32, period: f32) -> f32 {
    if time == 0.0 {
        return 0.0;
    }
    let t = time / duration;
    if t == 1.0 {
        return 1.0;
    }
    let period = if period == 0.0 { duration * 0.3 } else { period };
    let (amplitude, s) = elastic_shape(overshoot, period);
    let t = t - 1.0;
    -(amplitude * 2f32.powf(10.0 * t) * ((t * duration - s) * TWO_PI / period).sin())
}

fn out_elastic(time: f32, duration: f32, overshoot: f32, period: f32) -> f32 {
    if time == 0.0 {
        return 0.0;
    }
    let t = time / duration;
    if t == 1.0 {
        return 1.0;
    }
    let period = if period == 0.0 { duration * 0.3 } else { period };
    let (amplitude, s) = elastic_shape(overshoot, period);
    amplitude * 2f32.powf(-10.0 * t) * ((t * duration - s) * TWO_PI / period).sin() + 1.0
}

fn in_out_elastic(time: f32, duration: f32, overshoot: f32, period: f32) -> f32 {
    if time == 0.0 {
        return 0.0;
    }
    let t = time / (duration * 0.5);
    if t == 2.0 {
        return 1.0;
    }
    let period = if period == 0.0 {
        duration * (0.3 * 1.5)
    } else {
        period
    };
    let (amplitude, s) = elastic_shape(overshoot, period);
    let t = t - 1.0;
    let wave = ((t * duration - s) * TWO_PI / period).sin();
    if t < 0.0 {
        -0.5 * (amplitude * 2f32.powf(10.0 * t) * wave)
    } else {
        amplitude * 2f32.powf(-10.0 * t) * wave * 0.5 + 1.0
    }
}

fn bounce_in(time: f32, duration: f32) -> f32 {
    1.0 - bounce_out(duration - time, duration)
}

fn bounce_out(time: f32, duration: f32) -> f32 {
    let t = time / duration;
    if t < 1.0 / 2.75 {
        7.5625 * t * t
    } else if t < 2.0 / 2.75 {
        let t = t - 1.5 / 2.75;
        7.5625 * t * t + 0.75
    } else if t < 2.5 / 2.75 {
        let t = t - 2.25 / 2.75;
        7.5625 * t * t + 0.9375
    } else {
        let t = t - 2.625 / 2.75;
        7.5625 * t * t + 0.984375
    }
}

/// Cubic bezier easing calculation (matches CSS spec / browser implementations).
///
/// Uses Newton-Raphson with binary-search fallback for robustness.
/// Computes in f64 internally to avoid f32 precision jitter.
fn cubic_bezier_ease(t: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }

    let x = t as f64;
    let (x1, y1, x2, y2) = (x1 as f64, y1 as f64, x2 as f64, y2 as f64);

    let mut p = x;
    for _ in 0..8 {
        let err = bezier_sample(p, x1, x2) - x;
        if err.abs() < 1e-7 {
            return bezier_sample(p, y1, y2) as f32;
        }
        let slope = bezier_slope(p, x1, x2);
        if slope.abs() < 1e-7 {
            break;
        }
        p -= err / slope;
    }

    let mut lo = 0.0_f64;
    let mut hi = 1.0_f64;
    p = x;
    for _ in 0..20 {
        let val = bezier_sample(p, x1, x2);
        if (val - x).abs() < 1e-7 {
            break;
        }
        if val < x {
            lo = p;
        } else {
            hi = p;
        }
        p = (lo + hi) * 0.5;
    }

    bezier_sample(p, y1, y2) as f32
}

#[inline]
fn bezier_sample(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    ((a * t + b) * t + c) * t
}

#[inline]
fn bezier_slope(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    (3.0 * a * t + 2.0 * b) * t + c
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMED: &[Ease] = &[
        Ease::Linear,
        Ease::InSine,
        Ease::OutSine,
        Ease::InOutSine,
        Ease::InQuad,
        Ease::OutQuad,
        Ease::InOutQuad,
        Ease::InCubic,
        Ease::OutCubic,
        Ease::InOutCubic,
        Ease::InQuart,
        Ease::OutQuart,
        Ease::InOutQuart,
        Ease::InQuint,
        Ease::OutQuint,
        Ease::InOutQuint,
        Ease::InExpo,
        Ease::OutExpo,
        Ease::InOutExpo,
        Ease::InCirc,
        Ease::OutCirc,
        Ease::InOutCirc,
        Ease::InElastic,
        Ease::OutElastic,
        Ease::InOutElastic,
        Ease::InBack,
        Ease::OutBack,
        Ease::InOutBack,
        Ease::InBounce,
        Ease::OutBounce,
        Ease::InOutBounce,
    ];

    fn eval(ease: Ease, t: f32) -> f32 {
        evaluate(ease, None, t, 1.0, DEFAULT_OVERSHOOT, 0.0)
    }

    #[test]
    fn test_named_curves_hit_endpoints() {
        for &ease in NAMED {
            assert!(eval(ease, 0.0).abs() < 1e-3, "{ease:?} at 0");
            assert!((eval(ease, 1.0) - 1.0).abs() < 1e-3, "{ease:?} at 1");
        }
    }

    #[test]
    fn test_duration_scaling() {
        let a = evaluate(Ease::InOutCubic, None, 0.3, 1.0, DEFAULT_OVERSHOOT, 0.0);
        let b = evaluate(Ease::InOutCubic, None, 1.5, 5.0, DEFAULT_OVERSHOOT, 0.0);
        assert!((a - b).abs() < 1e-5);
    }

    #[test]
    fn test_zero_duration_applies_full_change() {
        assert_eq!(evaluate(Ease::InQuad, None, 0.0, 0.0, DEFAULT_OVERSHOOT, 0.0), 1.0);
        assert_eq!(evaluate(Ease::Linear, None, 3.0, -1.0, DEFAULT_OVERSHOOT, 0.0), 1.0);
    }

    #[test]
    fn test_quad_midpoints() {
        assert!((eval(Ease::InQuad, 0.5) - 0.25).abs() < 1e-6);
        assert!((eval(Ease::OutQuad, 0.5) - 0.75).abs() < 1e-6);
        assert!((eval(Ease::InOutQuad, 0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_back_overshoots() {
        assert!(eval(Ease::InBack, 0.2) < 0.0);
        assert!(eval(Ease::OutBack, 0.8) > 1.0);
    }

    #[test]
    fn test_bounce_in_mirrors_out() {
        for i in 0..=10 {
            let t = i as f32 / 10.0;
            let sum = eval(Ease::InBounce, t) + eval(Ease::OutBounce, 1.0 - t);
            assert!((sum - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_custom_function_takes_precedence() {
        let custom = CustomEase::function(|_, _, _, _| 0.42);
        let v = evaluate(Ease::Linear, Some(&custom), 0.9, 1.0, DEFAULT_OVERSHOOT, 0.0);
        assert_eq!(v, 0.42);
    }

    #[test]
    fn test_sampled_curve() {
        let curve = EaseCurve::new(vec![(1.0, 1.0), (0.0, 0.0), (0.5, 0.8)]);
        assert!((curve.evaluate(0.25) - 0.4).abs() < 1e-6);
        assert!((curve.evaluate(0.75) - 0.9).abs() < 1e-6);
        assert_eq!(curve.evaluate(-1.0), 0.0);
        assert_eq!(curve.evaluate(2.0), 1.0);

        let custom = CustomEase::curve(EaseCurve::sample(100, |t| t * t));
        let v = evaluate(Ease::Linear, Some(&custom), 1.0, 2.0, DEFAULT_OVERSHOOT, 0.0);
        assert!((v - 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_cubic_bezier_linear_control_points() {
        let linear = Ease::CubicBezier(0.0, 0.0, 1.0, 1.0);
        for i in 0..=10 {
            let t = i as f32 / 10.0;
            assert!((eval(linear, t) - t).abs() < 1e-4);
        }
    }
}
