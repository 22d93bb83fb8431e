//! Shared data types: body states, support states, references and hulls.

use nalgebra::{DVector, Vector4};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, StateError};

/// Velocities below this magnitude count as "no reference".
pub const REFERENCE_EPSILON: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Axis / BodyType
// ---------------------------------------------------------------------------

/// Tracked axis of a rigid body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
    Yaw,
}

impl Axis {
    pub const ALL: [Self; 4] = [Self::X, Self::Y, Self::Z, Self::Yaw];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
            Self::Yaw => "yaw",
        }
    }
}

/// Named rigid bodies tracked by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyType {
    CoM,
    Base,
    LeftFoot,
    RightFoot,
}

impl BodyType {
    pub const ALL: [Self; 4] = [Self::CoM, Self::Base, Self::LeftFoot, Self::RightFoot];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CoM => "com",
            Self::Base => "base",
            Self::LeftFoot => "left_foot",
            Self::RightFoot => "right_foot",
        }
    }
}

// ---------------------------------------------------------------------------
// BodyState
// ---------------------------------------------------------------------------

/// Per-axis state `(position, velocity, acceleration, 1)`.
///
/// The trailing 1 is the homogeneous component used by the affine
/// dynamics `S * state + U * jerk`.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyState {
    pub x: Vector4<f64>,
    pub y: Vector4<f64>,
    pub z: Vector4<f64>,
    pub yaw: Vector4<f64>,
}

impl Default for BodyState {
    fn default() -> Self {
        Self::at_rest(0.0, 0.0, 0.0, 0.0)
    }
}

impl BodyState {
    /// Body at the given pose with zero velocity and acceleration.
    #[must_use]
    pub fn at_rest(x: f64, y: f64, z: f64, yaw: f64) -> Self {
        Self {
            x: Vector4::new(x, 0.0, 0.0, 1.0),
            y: Vector4::new(y, 0.0, 0.0, 1.0),
            z: Vector4::new(z, 0.0, 0.0, 1.0),
            yaw: Vector4::new(yaw, 0.0, 0.0, 1.0),
        }
    }

    #[must_use]
    pub const fn axis(&self, axis: Axis) -> &Vector4<f64> {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
            Axis::Yaw => &self.yaw,
        }
    }

    pub const fn axis_mut(&mut self, axis: Axis) -> &mut Vector4<f64> {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
            Axis::Z => &mut self.z,
            Axis::Yaw => &mut self.yaw,
        }
    }

    /// Check that every axis is finite and homogeneous.
    pub fn validate(&self) -> Result<(), StateError> {
        for axis in Axis::ALL {
            let v = self.axis(axis);
            if v.iter().any(|c| !c.is_finite()) {
                return Err(StateError::NonFinite { axis: axis.name() });
            }
            if (v[3] - 1.0).abs() > f64::EPSILON {
                return Err(StateError::NotHomogeneous { axis: axis.name() });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Support
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportPhase {
    DoubleSupport,
    SingleSupport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Foot {
    Left,
    Right,
}

impl Foot {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    #[must_use]
    pub const fn body(self) -> BodyType {
        match self {
            Self::Left => BodyType::LeftFoot,
            Self::Right => BodyType::RightFoot,
        }
    }

    /// +1 for the left foot, -1 for the right foot.
    #[must_use]
    pub const fn lateral_sign(self) -> f64 {
        match self {
            Self::Left => 1.0,
            Self::Right => -1.0,
        }
    }
}

/// Support phase at one instant of the preview.
///
/// `foot` is the stance foot in single support and the last stance foot in
/// double support.
#[derive(Debug, Clone, PartialEq)]
pub struct SupportState {
    pub phase: SupportPhase,
    pub foot: Foot,
    pub start_time: f64,
    /// Time at which the current phase is due to end.
    pub time_limit: f64,
    pub step_number: u32,
    pub nb_steps_left: u32,
    pub state_changed: bool,
    pub in_transitional_ds: bool,
}

impl Default for SupportState {
    fn default() -> Self {
        Self {
            phase: SupportPhase::DoubleSupport,
            foot: Foot::Left,
            start_time: 0.0,
            time_limit: f64::INFINITY,
            step_number: 0,
            nb_steps_left: 1,
            state_changed: false,
            in_transitional_ds: false,
        }
    }
}

impl SupportState {
    #[must_use]
    pub fn is_single_support(&self) -> bool {
        self.phase == SupportPhase::SingleSupport
    }
}

// ---------------------------------------------------------------------------
// References
// ---------------------------------------------------------------------------

/// One value per QP sample for each planar axis.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSeries {
    pub x: DVector<f64>,
    pub y: DVector<f64>,
    pub yaw: DVector<f64>,
}

impl ReferenceSeries {
    #[must_use]
    pub fn zeros(n: usize) -> Self {
        Self {
            x: DVector::zeros(n),
            y: DVector::zeros(n),
            yaw: DVector::zeros(n),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Per-sample reference in the robot (local) and world (global) frames.
///
/// Callers write `local`; `global` is recomputed each tick from the
/// previewed yaw.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub local: ReferenceSeries,
    pub global: ReferenceSeries,
}

pub type VelocityReference = Reference;
pub type PositionReference = Reference;

impl Reference {
    #[must_use]
    pub fn zeros(n: usize) -> Self {
        Self {
            local: ReferenceSeries::zeros(n),
            global: ReferenceSeries::zeros(n),
        }
    }

    /// Same local value at every sample.
    #[must_use]
    pub fn constant(n: usize, x: f64, y: f64, yaw: f64) -> Self {
        let mut reference = Self::zeros(n);
        reference.local.x.fill(x);
        reference.local.y.fill(y);
        reference.local.yaw.fill(yaw);
        reference
    }

    /// Per-sample local profiles; each must hold exactly `n` values.
    pub fn from_profiles(n: usize, x: &[f64], y: &[f64], yaw: &[f64]) -> Result<Self, StateError> {
        for profile in [x, y, yaw] {
            if profile.len() != n {
                return Err(StateError::ReferenceLength {
                    expected: n,
                    got: profile.len(),
                });
            }
            if profile.iter().any(|v| !v.is_finite()) {
                return Err(StateError::NonFinite { axis: "reference" });
            }
        }
        let mut reference = Self::zeros(n);
        reference.local.x.copy_from_slice(x);
        reference.local.y.copy_from_slice(y);
        reference.local.yaw.copy_from_slice(yaw);
        Ok(reference)
    }

    #[must_use]
    pub fn horizon(&self) -> usize {
        self.local.len()
    }

    /// True when the first sample commands no motion on any axis.
    #[must_use]
    pub fn is_zero_at_start(&self) -> bool {
        if self.local.is_empty() {
            return true;
        }
        self.local.x[0].abs() < REFERENCE_EPSILON
            && self.local.y[0].abs() < REFERENCE_EPSILON
            && self.local.yaw[0].abs() < REFERENCE_EPSILON
    }

    pub fn set_zero(&mut self) {
        self.local.x.fill(0.0);
        self.local.y.fill(0.0);
        self.local.yaw.fill(0.0);
        self.global.x.fill(0.0);
        self.global.y.fill(0.0);
        self.global.yaw.fill(0.0);
    }
}

// ---------------------------------------------------------------------------
// Hull
// ---------------------------------------------------------------------------

/// Half-plane `normal . p <= offset` in the hull frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfPlane {
    pub normal: [f64; 2],
    pub offset: f64,
}

/// Convex polygon given by its vertices in the base frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hull {
    pub vertices: Vec<[f64; 2]>,
}

impl Hull {
    #[must_use]
    pub fn rectangle(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            vertices: vec![[x_min, y_min], [x_max, y_min], [x_max, y_max], [x_min, y_max]],
        }
    }

    fn signed_area(&self) -> f64 {
        let n = self.vertices.len();
        (0..n)
            .map(|i| {
                let a = self.vertices[i];
                let b = self.vertices[(i + 1) % n];
                a[0] * b[1] - b[0] * a[1]
            })
            .sum::<f64>()
            * 0.5
    }

    pub fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        let n = self.vertices.len();
        if n < 3 {
            return Err(ConfigError::DegenerateHull { name, vertices: n });
        }
        if self.vertices.iter().flatten().any(|v| !v.is_finite()) {
            return Err(ConfigError::NonConvexHull(name));
        }
        let area = self.signed_area();
        if area.abs() < 1e-12 {
            return Err(ConfigError::NonConvexHull(name));
        }
        let sign = area.signum();
        let mut turning = 0.0;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            let c = self.vertices[(i + 2) % n];
            let (e1, e2) = ([b[0] - a[0], b[1] - a[1]], [c[0] - b[0], c[1] - b[1]]);
            let cross = e1[0] * e2[1] - e1[1] * e2[0];
            if cross * sign < -1e-12 {
                return Err(ConfigError::NonConvexHull(name));
            }
            turning += cross.atan2(e1[0] * e2[0] + e1[1] * e2[1]);
        }
        // A star turns the same way at every vertex but winds more than once.
        if (turning.abs() - std::f64::consts::TAU).abs() > 1e-6 {
            return Err(ConfigError::NonConvexHull(name));
        }
        Ok(())
    }

    /// Mirror across the sagittal plane (y -> -y), keeping the winding.
    #[must_use]
    pub fn mirrored(&self) -> Self {
        Self {
            vertices: self.vertices.iter().rev().map(|v| [v[0], -v[1]]).collect(),
        }
    }

    /// Outward half-planes, one per edge. Accepts either winding.
    #[must_use]
    pub fn half_planes(&self) -> Vec<HalfPlane> {
        let n = self.vertices.len();
        let sign = self.signed_area().signum();
        (0..n)
            .filter_map(|i| {
                let a = self.vertices[i];
                let b = self.vertices[(i + 1) % n];
                let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
                let len = dx.hypot(dy);
                if len < 1e-12 {
                    return None;
                }
                let normal = [sign * dy / len, -sign * dx / len];
                Some(HalfPlane {
                    normal,
                    offset: normal[0] * a[0] + normal[1] * a[1],
                })
            })
            .collect()
    }
}
