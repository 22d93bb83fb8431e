//! Condensed linear dynamics of a jerk-driven triple integrator.
//!
//! For a body axis with state `x = (p, v, a, 1)` and a piecewise-constant
//! jerk sequence `j`, every sampled quantity over the horizon is affine:
//!
//! ```text
//! q = S x + U j
//! ```
//!
//! Sample `i` lies `first + i * T` after the current instant, where
//! `first` is the (possibly shorter) duration of the first sample. `U` is
//! lower triangular: a jerk never acts on earlier samples.
//!
//! The CoP variant encodes the inverted pendulum `cop = p - (h/g) a` and
//! caches `U^-1` so that a CoP trajectory can be mapped back to jerks. The
//! position integral is accumulated from the current instant.

use nalgebra::{DMatrix, DVector, Vector4};
use walkgen_core::ConfigError;

/// Pivot magnitude under which `U` is treated as singular.
pub const INVERSE_EPSILON: f64 = 1e-8;

/// Quantity produced by a [`LinearDynamic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DynamicKind {
    /// Time integral of the position since the current instant.
    PositionIntegral,
    Position,
    Velocity,
    Acceleration,
    Jerk,
    Cop,
}

impl DynamicKind {
    pub const ALL: [Self; 6] = [
        Self::PositionIntegral,
        Self::Position,
        Self::Velocity,
        Self::Acceleration,
        Self::Jerk,
        Self::Cop,
    ];
}

/// `q = S x + U j` over a horizon of `N` samples.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearDynamic {
    pub kind: DynamicKind,
    /// N x 4; the homogeneous column is zero for a pure integrator.
    pub s: DMatrix<f64>,
    /// N x N, lower triangular.
    pub u: DMatrix<f64>,
    pub u_t: DMatrix<f64>,
    /// Present for the CoP variant only.
    pub u_inv: Option<DMatrix<f64>>,
    pub u_inv_t: Option<DMatrix<f64>>,
}

impl LinearDynamic {
    #[must_use]
    pub fn horizon(&self) -> usize {
        self.u.nrows()
    }

    /// `S x`: trajectory with zero jerk.
    #[must_use]
    pub fn free_response(&self, state: &Vector4<f64>) -> DVector<f64> {
        &self.s * state
    }

    /// `S x + U j`.
    #[must_use]
    pub fn apply(&self, state: &Vector4<f64>, input: &DVector<f64>) -> DVector<f64> {
        self.free_response(state) + &self.u * input
    }

    /// Re-express this dynamic with the CoP trajectory as input.
    ///
    /// From `cop = S_c x + U_c j` it follows `j = U_c^-1 (cop - S_c x)`, so
    /// `q = (S - U U_c^-1 S_c) x + (U U_c^-1) cop`.
    ///
    /// # Panics
    /// If `cop` carries no cached inverse.
    #[must_use]
    pub fn in_cop_space(&self, cop: &Self) -> Self {
        let u_inv = cop
            .u_inv
            .as_ref()
            .unwrap_or_else(|| panic!("{:?} dynamic has no cached inverse", cop.kind));
        let n = self.horizon();
        let (s, u) = if self.kind == DynamicKind::Cop {
            (DMatrix::zeros(n, 4), DMatrix::identity(n, n))
        } else {
            let u = &self.u * u_inv;
            let s = &self.s - &u * &cop.s;
            (s, u)
        };
        let u_t = u.transpose();
        Self {
            kind: self.kind,
            s,
            u,
            u_t,
            u_inv: None,
            u_inv_t: None,
        }
    }
}

/// Builder of [`LinearDynamic`] matrices for one sampling configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearDynamicsModel {
    sampling_period: f64,
    horizon: usize,
    height_over_gravity: f64,
}

impl LinearDynamicsModel {
    pub const fn new(sampling_period: f64, horizon: usize, height_over_gravity: f64) -> Self {
        Self {
            sampling_period,
            horizon,
            height_over_gravity,
        }
    }

    pub const fn horizon(&self) -> usize {
        self.horizon
    }

    pub const fn sampling_period(&self) -> f64 {
        self.sampling_period
    }

    /// Effect at `lag` after the end of a unit jerk held for `duration`.
    fn kernel(kind: DynamicKind, duration: f64, lag: f64, hg: f64) -> f64 {
        let position =
            |d: f64, l: f64| d.powi(3) / 6.0 + d.powi(2) / 2.0 * l + d * l.powi(2) / 2.0;
        match kind {
            DynamicKind::PositionIntegral => {
                let (d, l) = (duration, lag);
                d.powi(4) / 24.0 + d.powi(3) * l / 6.0 + d * d * l * l / 4.0 + d * l.powi(3) / 6.0
            }
            DynamicKind::Position => position(duration, lag),
            DynamicKind::Velocity => duration.powi(2) / 2.0 + duration * lag,
            DynamicKind::Acceleration => duration,
            DynamicKind::Cop => position(duration, lag) - hg * duration,
            DynamicKind::Jerk => 0.0,
        }
    }

    fn state_row(kind: DynamicKind, t: f64, hg: f64) -> [f64; 4] {
        match kind {
            DynamicKind::PositionIntegral => [t, t * t / 2.0, t.powi(3) / 6.0, 0.0],
            DynamicKind::Position => [1.0, t, t * t / 2.0, 0.0],
            DynamicKind::Velocity => [0.0, 1.0, t, 0.0],
            DynamicKind::Acceleration => [0.0, 0.0, 1.0, 0.0],
            DynamicKind::Cop => [1.0, t, t * t / 2.0 - hg, 0.0],
            DynamicKind::Jerk => [0.0; 4],
        }
    }

    /// Build the matrices of `kind` with a first sample of `first_period`.
    #[allow(clippy::cast_precision_loss)]
    pub fn build(
        &self,
        kind: DynamicKind,
        first_period: f64,
    ) -> Result<LinearDynamic, ConfigError> {
        let n = self.horizon;
        let period = self.sampling_period;
        let hg = self.height_over_gravity;

        let mut s = DMatrix::zeros(n, 4);
        let mut u = DMatrix::zeros(n, n);
        if kind == DynamicKind::Jerk {
            u.fill_with_identity();
        } else {
            for i in 0..n {
                let t = first_period + i as f64 * period;
                let row = Self::state_row(kind, t, hg);
                for (c, value) in row.iter().enumerate() {
                    s[(i, c)] = *value;
                }
                u[(i, 0)] = Self::kernel(kind, first_period, i as f64 * period, hg);
                for j in 1..=i {
                    u[(i, j)] = Self::kernel(kind, period, (i - j) as f64 * period, hg);
                }
            }
        }

        let (u_inv, u_inv_t) = if kind == DynamicKind::Cop {
            let inv = lower_triangular_inverse(&u, INVERSE_EPSILON)
                .ok_or(ConfigError::SingularCopDynamics(first_period))?;
            let inv_t = inv.transpose();
            (Some(inv), Some(inv_t))
        } else {
            (None, None)
        };

        let u_t = u.transpose();
        Ok(LinearDynamic {
            kind,
            s,
            u,
            u_t,
            u_inv,
            u_inv_t,
        })
    }
}

/// Inverse of a lower-triangular matrix by forward substitution.
///
/// Returns `None` when a pivot is smaller than `eps` in magnitude.
#[must_use]
pub fn lower_triangular_inverse(m: &DMatrix<f64>, eps: f64) -> Option<DMatrix<f64>> {
    let n = m.nrows();
    if (0..n).any(|i| m[(i, i)].abs() < eps) {
        return None;
    }
    m.solve_lower_triangular(&DMatrix::identity(n, n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const T: f64 = 0.1;
    const HG: f64 = 0.8 / 9.81;

    /// Exact piecewise-cubic integration of a jerk sequence.
    fn integrate(state: [f64; 3], jerks: &[f64], first: f64) -> Vec<[f64; 4]> {
        let [mut p, mut v, mut a] = state;
        let mut integral = 0.0;
        let mut out = Vec::new();
        for (i, j) in jerks.iter().enumerate() {
            let dt = if i == 0 { first } else { T };
            integral += p * dt + v * dt * dt / 2.0 + a * dt.powi(3) / 6.0 + j * dt.powi(4) / 24.0;
            p += v * dt + a * dt * dt / 2.0 + j * dt.powi(3) / 6.0;
            v += a * dt + j * dt * dt / 2.0;
            a += j * dt;
            out.push([p, v, a, integral]);
        }
        out
    }

    #[test]
    fn position_u_is_causal_with_cubic_diagonal() {
        let model = LinearDynamicsModel::new(T, 16, HG);
        let first = 0.04;
        let dynamic = model.build(DynamicKind::Position, first).unwrap();
        for i in 0..16 {
            for j in (i + 1)..16 {
                assert_eq!(dynamic.u[(i, j)], 0.0);
            }
        }
        assert_relative_eq!(dynamic.u[(0, 0)], first.powi(3) / 6.0, epsilon = 1e-15);
        for i in 1..16 {
            assert_relative_eq!(dynamic.u[(i, i)], T.powi(3) / 6.0, epsilon = 1e-15);
        }
        assert_relative_eq!(dynamic.u_t, dynamic.u.transpose());
    }

    #[test]
    fn matrices_match_integration() {
        let model = LinearDynamicsModel::new(T, 6, HG);
        let first = 0.06;
        let state = Vector4::new(0.2, -0.1, 0.3, 1.0);
        let jerks = DVector::from_vec(vec![1.0, -2.0, 0.5, 0.0, 3.0, -1.0]);
        let expected = integrate([0.2, -0.1, 0.3], jerks.as_slice(), first);

        let pos = model.build(DynamicKind::Position, first).unwrap().apply(&state, &jerks);
        let vel = model.build(DynamicKind::Velocity, first).unwrap().apply(&state, &jerks);
        let acc = model
            .build(DynamicKind::Acceleration, first)
            .unwrap()
            .apply(&state, &jerks);
        let cop = model.build(DynamicKind::Cop, first).unwrap().apply(&state, &jerks);
        let integral = model
            .build(DynamicKind::PositionIntegral, first)
            .unwrap()
            .apply(&state, &jerks);
        for (i, [p, v, a, int]) in expected.iter().enumerate() {
            assert_relative_eq!(integral[i], *int, epsilon = 1e-12);
            assert_relative_eq!(pos[i], *p, epsilon = 1e-12);
            assert_relative_eq!(vel[i], *v, epsilon = 1e-12);
            assert_relative_eq!(acc[i], *a, epsilon = 1e-12);
            assert_relative_eq!(cop[i], p - HG * a, epsilon = 1e-12);
        }
    }

    #[test]
    fn jerk_dynamic_is_identity() {
        let model = LinearDynamicsModel::new(T, 5, HG);
        let dynamic = model.build(DynamicKind::Jerk, T).unwrap();
        assert_relative_eq!(dynamic.u, DMatrix::identity(5, 5));
        assert_relative_eq!(dynamic.s, DMatrix::zeros(5, 4));
        assert!(dynamic.u_inv.is_none());
    }

    #[test]
    fn cop_inverse_is_exact() {
        for n in [1, 4, 16] {
            for first in [0.02, 0.1] {
                let model = LinearDynamicsModel::new(T, n, HG);
                let dynamic = model.build(DynamicKind::Cop, first).unwrap();
                let inv = dynamic.u_inv.as_ref().unwrap();
                assert_relative_eq!(inv * &dynamic.u, DMatrix::identity(n, n), epsilon = 1e-9);
                assert_relative_eq!(
                    dynamic.u_inv_t.clone().unwrap(),
                    inv.transpose(),
                    epsilon = 1e-15
                );
            }
        }
    }

    #[test]
    fn singular_cop_dynamics_are_rejected() {
        // T^3/6 == h T / g makes every pivot vanish.
        let period = (6.0 * HG).sqrt();
        let model = LinearDynamicsModel::new(period, 3, HG);
        assert!(matches!(
            model.build(DynamicKind::Cop, period),
            Err(ConfigError::SingularCopDynamics(_))
        ));
    }

    #[test]
    fn cop_space_dynamics_reproduce_jerk_space() {
        let model = LinearDynamicsModel::new(T, 8, HG);
        let first = 0.08;
        let cop = model.build(DynamicKind::Cop, first).unwrap();
        let pos = model.build(DynamicKind::Position, first).unwrap();
        let jerk = model.build(DynamicKind::Jerk, first).unwrap();
        let state = Vector4::new(0.05, 0.1, -0.2, 1.0);
        let jerks = DVector::from_fn(8, |i, _| (i as f64 * 0.7).sin());

        let cop_traj = cop.apply(&state, &jerks);
        let pos_cop = pos.in_cop_space(&cop);
        assert_relative_eq!(
            pos_cop.apply(&state, &cop_traj),
            pos.apply(&state, &jerks),
            epsilon = 1e-9
        );
        let jerk_cop = jerk.in_cop_space(&cop);
        assert_relative_eq!(jerk_cop.apply(&state, &cop_traj), jerks, epsilon = 1e-8);
        let cop_cop = cop.in_cop_space(&cop);
        assert_relative_eq!(cop_cop.u, DMatrix::identity(8, 8));
    }
}
