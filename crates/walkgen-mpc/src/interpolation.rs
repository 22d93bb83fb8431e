//! Curves used to fill the actuation samples between two feedback ticks.
//!
//! * exact cubic propagation of a jerk-driven axis,
//! * quintic blends for the trunk yaw,
//! * Bezier swing-foot trajectories with zero velocity and acceleration at
//!   liftoff and touchdown.

use nalgebra::{Vector3, Vector4};

// ---------------------------------------------------------------------------
// Jerk propagation
// ---------------------------------------------------------------------------

/// Position, velocity and acceleration of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisSample {
    pub position: f64,
    pub velocity: f64,
    pub acceleration: f64,
}

/// State of an axis `t` seconds after `state` under constant `jerk`.
#[must_use]
pub fn propagate(state: &Vector4<f64>, jerk: f64, t: f64) -> AxisSample {
    let (p, v, a) = (state[0], state[1], state[2]);
    AxisSample {
        position: p + v * t + a * t * t / 2.0 + jerk * t.powi(3) / 6.0,
        velocity: v + a * t + jerk * t * t / 2.0,
        acceleration: a + jerk * t,
    }
}

// ---------------------------------------------------------------------------
// Quintic blend
// ---------------------------------------------------------------------------

/// `p(t) = sum c_k t^k` matching position, velocity and acceleration at
/// both ends of `[0, duration]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuinticPolynomial {
    coefficients: [f64; 6],
    duration: f64,
}

impl QuinticPolynomial {
    /// Blend from `start = (p0, v0, a0)` to `end = (p1, v1, a1)`.
    #[must_use]
    pub fn new(start: [f64; 3], end: [f64; 3], duration: f64) -> Self {
        let [p0, v0, a0] = start;
        let [p1, v1, a1] = end;
        let t = duration;
        let h = p1 - p0;
        let c3 = (10.0 * h - (6.0 * v0 + 4.0 * v1) * t - (3.0 * a0 - a1) * t * t / 2.0) / t.powi(3);
        let c4 = (-15.0 * h + (8.0 * v0 + 7.0 * v1) * t + (3.0 * a0 - 2.0 * a1) * t * t / 2.0)
            / t.powi(4);
        let c5 = (6.0 * h - 3.0 * (v0 + v1) * t - (a0 - a1) * t * t / 2.0) / t.powi(5);
        Self {
            coefficients: [p0, v0, a0 / 2.0, c3, c4, c5],
            duration,
        }
    }

    pub const fn duration(&self) -> f64 {
        self.duration
    }

    /// Value, first and second derivative at `t`, clamped to the interval.
    #[must_use]
    pub fn sample(&self, t: f64) -> AxisSample {
        let t = t.clamp(0.0, self.duration);
        let c = &self.coefficients;
        let position = c.iter().rev().fold(0.0, |acc, ck| acc * t + ck);
        let velocity = ((((5.0 * c[5] * t + 4.0 * c[4]) * t + 3.0 * c[3]) * t + 2.0 * c[2]) * t)
            + c[1];
        let acceleration = ((20.0 * c[5] * t + 12.0 * c[4]) * t + 6.0 * c[3]) * t + 2.0 * c[2];
        AxisSample {
            position,
            velocity,
            acceleration,
        }
    }
}

// ---------------------------------------------------------------------------
// Swing foot
// ---------------------------------------------------------------------------

// S-curve from 0 to 1. Three repeated control points at each end zero the
// velocity and acceleration there.
const BEZIER_S: [f64; 12] = [
    0.0, 0.0, 0.0, //
    0.5, 0.5, //
    0.5, 0.5, //
    0.5, 0.5, //
    1.0, 1.0, 1.0,
];

// Height bump, zero with zero slope and curvature at both ends.
const BEZIER_H: [f64; 12] = [
    0.0, 0.0, 0.0, //
    0.9, 0.9, //
    1.0, 1.0, //
    0.9, 0.9, //
    0.0, 0.0, 0.0,
];

/// `bezier_eval(&BEZIER_H, 0.5)`, used to normalise the apex to the
/// requested height.
const BEZIER_H_PEAK: f64 = 0.886230468750;

/// De Casteljau evaluation.
fn bezier_eval(points: &[f64], t: f64) -> f64 {
    let mut work = points.to_vec();
    for k in 1..work.len() {
        for i in 0..(work.len() - k) {
            work[i] = work[i] * (1.0 - t) + work[i + 1] * t;
        }
    }
    work.first().copied().unwrap_or(0.0)
}

/// Control points of the derivative curve.
#[allow(clippy::cast_precision_loss)]
fn hodograph(points: &[f64]) -> Vec<f64> {
    let degree = points.len().saturating_sub(1) as f64;
    points.windows(2).map(|w| degree * (w[1] - w[0])).collect()
}

/// Value, first and second derivative of a Bezier curve with respect to
/// its parameter.
fn bezier_profile(points: &[f64], t: f64) -> [f64; 3] {
    let first = hodograph(points);
    let second = hodograph(&first);
    [
        bezier_eval(points, t),
        bezier_eval(&first, t),
        bezier_eval(&second, t),
    ]
}

/// Normalised progress along the swing, `(s, ds/dphase, d2s/dphase2)`.
#[must_use]
pub fn swing_progress(phase: f64) -> [f64; 3] {
    bezier_profile(&BEZIER_S, phase.clamp(0.0, 1.0))
}

/// Swing foot position, velocity and acceleration.
///
/// `start` and `target` are world positions at liftoff and touchdown,
/// `phase` runs from 0 to 1 over `duration` seconds, and the foot rises
/// `step_height` above the straight line between them.
#[must_use]
pub fn swing_foot(
    start: &Vector3<f64>,
    target: &Vector3<f64>,
    phase: f64,
    step_height: f64,
    duration: f64,
) -> [Vector3<f64>; 3] {
    let t = phase.clamp(0.0, 1.0);
    let [s, ds, dds] = swing_progress(t);
    let [h, dh, ddh] = bezier_profile(&BEZIER_H, t).map(|v| v * step_height / BEZIER_H_PEAK);
    let delta = target - start;
    let lift = Vector3::z();

    let position = start + delta * s + lift * h;
    if duration < 1e-10 {
        return [position, Vector3::zeros(), Vector3::zeros()];
    }
    let rate = 1.0 / duration;
    let velocity = (delta * ds + lift * dh) * rate;
    let acceleration = (delta * dds + lift * ddh) * rate * rate;
    [position, velocity, acceleration]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn propagation_matches_closed_form() {
        let state = Vector4::new(1.0, 0.5, -0.2, 1.0);
        let s = propagate(&state, 3.0, 0.1);
        assert_relative_eq!(s.position, 1.0 + 0.05 - 0.001 + 0.0005, epsilon = 1e-12);
        assert_relative_eq!(s.velocity, 0.5 - 0.02 + 0.015, epsilon = 1e-12);
        assert_relative_eq!(s.acceleration, -0.2 + 0.3, epsilon = 1e-12);
    }

    #[test]
    fn quintic_matches_boundary_conditions() {
        let q = QuinticPolynomial::new([0.2, 0.1, -0.3], [1.0, 0.5, 0.0], 0.8);
        let a = q.sample(0.0);
        assert_relative_eq!(a.position, 0.2, epsilon = 1e-12);
        assert_relative_eq!(a.velocity, 0.1, epsilon = 1e-12);
        assert_relative_eq!(a.acceleration, -0.3, epsilon = 1e-12);
        let b = q.sample(0.8);
        assert_relative_eq!(b.position, 1.0, epsilon = 1e-10);
        assert_relative_eq!(b.velocity, 0.5, epsilon = 1e-10);
        assert_relative_eq!(b.acceleration, 0.0, epsilon = 1e-9);
        // Clamped past the end.
        assert_relative_eq!(q.sample(2.0).position, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn quintic_derivatives_are_consistent() {
        let q = QuinticPolynomial::new([0.0, 0.0, 0.0], [0.4, 0.2, 0.0], 0.8);
        let h = 1e-6;
        let t = 0.3;
        let fd = (q.sample(t + h).position - q.sample(t - h).position) / (2.0 * h);
        assert_relative_eq!(fd, q.sample(t).velocity, epsilon = 1e-7);
    }

    #[test]
    fn swing_starts_and_ends_at_rest() {
        let start = Vector3::new(0.0, 0.1, 0.0);
        let target = Vector3::new(0.2, 0.12, 0.0);
        for phase in [0.0, 1.0] {
            let [p, v, a] = swing_foot(&start, &target, phase, 0.05, 0.8);
            let expected = if phase == 0.0 { start } else { target };
            assert_relative_eq!(p, expected, epsilon = 1e-10);
            assert_relative_eq!(v, Vector3::zeros(), epsilon = 1e-10);
            assert_relative_eq!(a, Vector3::zeros(), epsilon = 1e-9);
        }
    }

    #[test]
    fn swing_apex_reaches_step_height() {
        let start = Vector3::zeros();
        let target = Vector3::new(0.1, 0.0, 0.0);
        let [p, _, _] = swing_foot(&start, &target, 0.5, 0.05, 0.8);
        assert_relative_eq!(p.z, 0.05, epsilon = 1e-9);
        assert_relative_eq!(p.x, 0.05, epsilon = 1e-9);
    }

    #[test]
    fn swing_velocity_matches_finite_difference() {
        let start = Vector3::new(0.0, 0.1, 0.0);
        let target = Vector3::new(0.3, 0.1, 0.0);
        let duration = 0.8;
        let h = 1e-6;
        let phase = 0.37;
        let [_, v, a] = swing_foot(&start, &target, phase, 0.05, duration);
        let [p_plus, v_plus, _] = swing_foot(&start, &target, phase + h / duration, 0.05, duration);
        let [p_minus, v_minus, _] =
            swing_foot(&start, &target, phase - h / duration, 0.05, duration);
        assert_relative_eq!((p_plus - p_minus) / (2.0 * h), v, epsilon = 1e-6);
        assert_relative_eq!((v_plus - v_minus) / (2.0 * h), a, epsilon = 1e-4);
    }
}
