//! Tracked bodies, their condensed dynamics and the output interpolation.

use std::collections::HashMap;

use nalgebra::{DVector, Vector3, Vector4};
use tracing::debug;
use walkgen_core::{
    Axis, BodyState, BodyType, ConfigError, DecisionVariable, Foot, Locomotion, StateError,
    SupportState, WalkgenConfig,
};

use crate::dynamics::{DynamicKind, LinearDynamic, LinearDynamicsModel};
use crate::interpolation::{AxisSample, propagate, swing_foot, swing_progress};
use crate::solution::{AxisTrajectory, MpcSolution, VariableBlock};

// ---------------------------------------------------------------------------
// RigidBody
// ---------------------------------------------------------------------------

/// One tracked body.
///
/// Bodies driven by the QP carry one set of dynamics per first-sample slot,
/// both with jerk as input and with the configured decision variable as
/// input.
#[derive(Debug, Clone)]
pub struct RigidBody {
    body: BodyType,
    state: BodyState,
    dynamics: HashMap<DynamicKind, Vec<LinearDynamic>>,
    decision_dynamics: HashMap<DynamicKind, Vec<LinearDynamic>>,
}

impl RigidBody {
    fn new(body: BodyType, state: BodyState) -> Self {
        Self {
            body,
            state,
            dynamics: HashMap::new(),
            decision_dynamics: HashMap::new(),
        }
    }

    pub const fn body_type(&self) -> BodyType {
        self.body
    }

    pub const fn state(&self) -> &BodyState {
        &self.state
    }

    /// Jerk-input dynamic of `kind` for the given first-sample slot.
    ///
    /// # Panics
    /// If the body has no such dynamic.
    #[must_use]
    pub fn dynamic(&self, kind: DynamicKind, slot: usize) -> &LinearDynamic {
        Self::lookup(&self.dynamics, self.body, kind, slot)
    }

    /// Dynamic of `kind` with the decision variable as input.
    ///
    /// # Panics
    /// If the body has no such dynamic.
    #[must_use]
    pub fn decision_dynamic(&self, kind: DynamicKind, slot: usize) -> &LinearDynamic {
        Self::lookup(&self.decision_dynamics, self.body, kind, slot)
    }

    fn lookup(
        table: &HashMap<DynamicKind, Vec<LinearDynamic>>,
        body: BodyType,
        kind: DynamicKind,
        slot: usize,
    ) -> &LinearDynamic {
        table
            .get(&kind)
            .and_then(|slots| slots.get(slot))
            .unwrap_or_else(|| panic!("{} has no {kind:?} dynamic for slot {slot}", body.name()))
    }

    fn compute_dynamics(
        &mut self,
        model: &LinearDynamicsModel,
        kinds: &[DynamicKind],
        first_periods: &[f64],
        decision: DecisionVariable,
    ) -> Result<(), ConfigError> {
        self.dynamics.clear();
        self.decision_dynamics.clear();
        for &kind in kinds {
            let slots = first_periods
                .iter()
                .map(|&first| model.build(kind, first))
                .collect::<Result<Vec<_>, _>>()?;
            self.dynamics.insert(kind, slots);
        }

        let cop_slots = self.dynamics.get(&DynamicKind::Cop);
        for (&kind, slots) in &self.dynamics {
            let converted = match (decision, cop_slots) {
                (DecisionVariable::Cop, Some(cops)) => slots
                    .iter()
                    .zip(cops)
                    .map(|(dynamic, cop)| dynamic.in_cop_space(cop))
                    .collect(),
                _ => slots.clone(),
            };
            self.decision_dynamics.insert(kind, converted);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Swing plan
// ---------------------------------------------------------------------------

/// Liftoff and touchdown of the foot currently in the air.
#[derive(Debug, Clone, PartialEq)]
pub struct SwingPlan {
    pub foot: Foot,
    pub start: Vector3<f64>,
    pub start_yaw: f64,
    pub target: Vector3<f64>,
    pub target_yaw: f64,
    pub start_time: f64,
    pub end_time: f64,
}

// ---------------------------------------------------------------------------
// RigidBodySystem
// ---------------------------------------------------------------------------

/// All tracked bodies plus the committed support state.
#[derive(Debug, Clone)]
pub struct RigidBodySystem {
    config: WalkgenConfig,
    com: RigidBody,
    base: RigidBody,
    feet: Option<[RigidBody; 2]>,
    current_support: SupportState,
    pending_support: Option<SupportState>,
    swing: Option<SwingPlan>,
}

impl RigidBodySystem {
    /// Bodies at their initial poses with dynamics for every first-sample
    /// slot.
    pub fn new(config: &WalkgenConfig) -> Result<Self, ConfigError> {
        let robot = &config.robot;
        let com = RigidBody::new(
            BodyType::CoM,
            BodyState::at_rest(
                robot.com_offset_local[0],
                robot.com_offset_local[1],
                robot.com_height,
                0.0,
            ),
        );
        let base = RigidBody::new(BodyType::Base, BodyState::default());
        let feet = (robot.locomotion == Locomotion::Walking).then(|| {
            let [lx, ly] = robot.left_foot_position;
            let [rx, ry] = robot.right_foot_position;
            [
                RigidBody::new(BodyType::LeftFoot, BodyState::at_rest(lx, ly, 0.0, 0.0)),
                RigidBody::new(BodyType::RightFoot, BodyState::at_rest(rx, ry, 0.0, 0.0)),
            ]
        });

        let mut system = Self {
            config: config.clone(),
            com,
            base,
            feet,
            current_support: SupportState::default(),
            pending_support: None,
            swing: None,
        };
        system.compute_dynamics()?;
        Ok(system)
    }

    /// Rebuild every dynamic from the configuration.
    pub fn compute_dynamics(&mut self) -> Result<(), ConfigError> {
        let mpc = &self.config.mpc;
        let model = LinearDynamicsModel::new(
            mpc.qp_sampling_period,
            mpc.nb_samples_qp,
            self.config.robot.height_over_gravity(),
        );
        let first_periods: Vec<f64> = (0..mpc.mpc_steps_per_qp())
            .map(|slot| mpc.slot_first_period(slot))
            .collect();

        self.com.compute_dynamics(
            &model,
            &DynamicKind::ALL,
            &first_periods,
            mpc.decision_variable,
        )?;
        self.base.compute_dynamics(
            &model,
            &[
                DynamicKind::PositionIntegral,
                DynamicKind::Position,
                DynamicKind::Velocity,
                DynamicKind::Acceleration,
                DynamicKind::Jerk,
            ],
            &first_periods,
            DecisionVariable::Jerk,
        )?;
        debug!(
            slots = first_periods.len(),
            horizon = mpc.nb_samples_qp,
            decision = ?mpc.decision_variable,
            "Computed body dynamics"
        );
        Ok(())
    }

    pub const fn config(&self) -> &WalkgenConfig {
        &self.config
    }

    pub const fn com(&self) -> &RigidBody {
        &self.com
    }

    pub const fn base(&self) -> &RigidBody {
        &self.base
    }

    /// Feet are only tracked for walking robots.
    #[must_use]
    pub fn body(&self, body: BodyType) -> Option<&RigidBody> {
        match body {
            BodyType::CoM => Some(&self.com),
            BodyType::Base => Some(&self.base),
            BodyType::LeftFoot => self.feet.as_ref().map(|f| &f[0]),
            BodyType::RightFoot => self.feet.as_ref().map(|f| &f[1]),
        }
    }

    fn body_mut(&mut self, body: BodyType) -> Option<&mut RigidBody> {
        match body {
            BodyType::CoM => Some(&mut self.com),
            BodyType::Base => Some(&mut self.base),
            BodyType::LeftFoot => self.feet.as_mut().map(|f| &mut f[0]),
            BodyType::RightFoot => self.feet.as_mut().map(|f| &mut f[1]),
        }
    }

    /// Overwrite a body state after checking it.
    pub fn set_body_state(&mut self, body: BodyType, state: BodyState) -> Result<(), StateError> {
        state.validate()?;
        let target = self
            .body_mut(body)
            .ok_or(StateError::MissingBody(body.name()))?;
        target.state = state;
        Ok(())
    }

    // -- support ------------------------------------------------------------

    pub const fn current_support(&self) -> &SupportState {
        &self.current_support
    }

    /// Queue a support state; it replaces the current one at the next tick.
    pub fn set_current_support(&mut self, support: SupportState) {
        self.pending_support = Some(support);
    }

    pub fn commit_pending_support(&mut self) {
        if let Some(support) = self.pending_support.take() {
            self.current_support = support;
            self.swing = None;
        }
    }

    pub(crate) fn replace_current_support(&mut self, support: SupportState) {
        self.current_support = support;
    }

    pub const fn swing_plan(&self) -> Option<&SwingPlan> {
        self.swing.as_ref()
    }

    // -- prediction ---------------------------------------------------------

    /// Predicted trajectory of `kind` for one planar axis of a QP body,
    /// using the jerks stored in `solution`.
    #[must_use]
    pub fn predict(
        &self,
        body: BodyType,
        kind: DynamicKind,
        axis: Axis,
        solution: &MpcSolution,
    ) -> DVector<f64> {
        let rigid = match body {
            BodyType::CoM => &self.com,
            BodyType::Base => &self.base,
            other => panic!("{} is not a QP body", other.name()),
        };
        let [(x_axis, x_block), (_, y_block)] = VariableBlock::planar(body);
        let block = if axis == x_axis { x_block } else { y_block };
        let jerks = DVector::from_column_slice(solution.jerk(block));
        rigid
            .dynamic(kind, solution.first_period_slot)
            .apply(rigid.state.axis(axis), &jerks)
    }

    // -- interpolation ------------------------------------------------------

    /// Fill the actuation-rate trajectories of every body for the interval
    /// starting at `time`.
    #[allow(clippy::cast_precision_loss)]
    pub fn interpolate_bodies(&mut self, solution: &mut MpcSolution, time: f64) {
        let steps = self.config.mpc.actuation_steps_per_mpc();
        let dt = self.config.mpc.actuation_sampling_period;
        let profile = solution.orientation.profile;

        for rigid in [&self.com, &self.base] {
            let body = rigid.body;
            for (axis, block) in VariableBlock::planar(body) {
                let jerk = solution.jerk(block).first().copied().unwrap_or(0.0);
                let trajectory = solution.body_mut(body).axis_mut(axis);
                trajectory.clear();
                for k in 1..=steps {
                    trajectory.push(propagate(rigid.state.axis(axis), jerk, k as f64 * dt));
                }
            }
            let trajectory = solution.body_mut(body);
            hold(trajectory.axis_mut(Axis::Z), rigid.state.z[0], steps);
            let yaw = trajectory.axis_mut(Axis::Yaw);
            yaw.clear();
            for k in 1..=steps {
                yaw.push(profile.sample(time + k as f64 * dt));
            }
        }

        let hg = self.config.robot.height_over_gravity();
        let com = solution.body(BodyType::CoM);
        let cop = |axis: Axis| -> Vec<f64> {
            let t = com.axis(axis);
            t.position
                .iter()
                .zip(&t.acceleration)
                .map(|(p, a)| p - hg * a)
                .collect()
        };
        let (cop_x, cop_y) = (cop(Axis::X), cop(Axis::Y));
        solution.cop_x = cop_x;
        solution.cop_y = cop_y;

        if self.feet.is_some() {
            self.interpolate_feet(solution, time, steps, dt);
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn interpolate_feet(&mut self, solution: &mut MpcSolution, time: f64, steps: usize, dt: f64) {
        let current = solution.support_states.current.clone();
        if !current.is_single_support() {
            self.swing = None;
            for foot in [Foot::Left, Foot::Right] {
                self.hold_foot(solution, foot, steps);
            }
            return;
        }

        let swing_foot_side = current.foot.opposite();
        let replan = self
            .swing
            .as_ref()
            .is_none_or(|plan| current.state_changed || plan.foot != swing_foot_side);
        if replan {
            let Some(state) = self.body(swing_foot_side.body()).map(|b| b.state.clone()) else {
                return;
            };
            let start = Vector3::new(state.x[0], state.y[0], state.z[0]);
            self.swing = Some(SwingPlan {
                foot: swing_foot_side,
                start,
                start_yaw: state.yaw[0],
                target: start,
                target_yaw: state.yaw[0],
                start_time: current.start_time,
                end_time: current.time_limit,
            });
        }

        let frozen = solution
            .support_states
            .previewed
            .first()
            .is_some_and(|s| s.in_transitional_ds);
        if replan || !frozen {
            let (target, target_yaw) = self.foothold(solution, swing_foot_side, current.time_limit);
            if let Some(plan) = self.swing.as_mut() {
                plan.target = target;
                plan.target_yaw = target_yaw;
            }
        }

        self.hold_foot(solution, current.foot, steps);

        let Some(plan) = self.swing.clone() else {
            return;
        };
        let height = self.config.robot.free_flying_foot_max_height;
        let duration = plan.end_time - plan.start_time;
        let trajectory = solution.body_mut(plan.foot.body());
        trajectory.clear();
        for k in 1..=steps {
            let t = time + k as f64 * dt;
            let phase = if duration > 0.0 {
                (t - plan.start_time) / duration
            } else {
                1.0
            };
            let [p, v, a] = swing_foot(&plan.start, &plan.target, phase, height, duration);
            for (i, axis) in [Axis::X, Axis::Y, Axis::Z].into_iter().enumerate() {
                trajectory.axis_mut(axis).push(AxisSample {
                    position: p[i],
                    velocity: v[i],
                    acceleration: a[i],
                });
            }
            let [s, ds, dds] = swing_progress(phase);
            let delta = plan.target_yaw - plan.start_yaw;
            let rate = if duration > 0.0 { 1.0 / duration } else { 0.0 };
            trajectory.axis_mut(Axis::Yaw).push(AxisSample {
                position: plan.start_yaw + delta * s,
                velocity: delta * ds * rate,
                acceleration: delta * dds * rate * rate,
            });
        }
    }

    /// Landing pose of `foot`: beside the predicted base at touchdown.
    fn foothold(&self, solution: &MpcSolution, foot: Foot, touchdown: f64) -> (Vector3<f64>, f64) {
        let times = &solution.sampling_times;
        let sample = (0..times.len().saturating_sub(1))
            .min_by(|&a, &b| {
                (times[a + 1] - touchdown)
                    .abs()
                    .total_cmp(&(times[b + 1] - touchdown).abs())
            })
            .unwrap_or(0);
        let base_x = self.predict(BodyType::Base, DynamicKind::Position, Axis::X, solution);
        let base_y = self.predict(BodyType::Base, DynamicKind::Position, Axis::Y, solution);
        let (bx, by) = (
            base_x.get(sample).copied().unwrap_or(self.base.state.x[0]),
            base_y.get(sample).copied().unwrap_or(self.base.state.y[0]),
        );
        let yaw = solution.orientation.profile.sample(touchdown).position;
        let lateral = foot.lateral_sign() * self.config.robot.half_stance_width();
        (
            Vector3::new(bx - yaw.sin() * lateral, by + yaw.cos() * lateral, 0.0),
            yaw,
        )
    }

    fn hold_foot(&self, solution: &mut MpcSolution, foot: Foot, steps: usize) {
        let Some(state) = self.body(foot.body()).map(|b| b.state.clone()) else {
            return;
        };
        let trajectory = solution.body_mut(foot.body());
        for axis in Axis::ALL {
            hold(trajectory.axis_mut(axis), state.axis(axis)[0], steps);
        }
    }

    /// Move every tracked body to the last interpolated sample.
    pub fn update_body_state(&mut self, solution: &MpcSolution) {
        for body in BodyType::ALL {
            let trajectory = solution.body(body);
            let Some(rigid) = self.body_mut(body) else {
                continue;
            };
            for axis in Axis::ALL {
                if let Some(last) = trajectory.axis(axis).last() {
                    *rigid.state.axis_mut(axis) =
                        Vector4::new(last.position, last.velocity, last.acceleration, 1.0);
                }
            }
        }
    }
}

fn hold(trajectory: &mut AxisTrajectory, position: f64, steps: usize) {
    trajectory.clear();
    for _ in 0..steps {
        trajectory.push(AxisSample {
            position,
            velocity: 0.0,
            acceleration: 0.0,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use walkgen_core::{SupportPhase, sampling_times};

    use crate::orientation::YawProfile;

    fn solution_with_jerks(n: usize, jerks: &[f64; 4]) -> MpcSolution {
        let mut solution = MpcSolution {
            jerks: DVector::from_fn(4 * n, |i, _| jerks[i / n]),
            sampling_times: sampling_times(0.0, 0.1, 0.1, n),
            first_period_slot: 4,
            ..MpcSolution::default()
        };
        solution.orientation.profile = YawProfile::hold(0.0, 0.0);
        solution
    }

    #[test]
    fn dynamics_exist_for_every_slot() {
        let config = WalkgenConfig::default();
        let system = RigidBodySystem::new(&config).unwrap();
        for slot in 0..5 {
            let d = system.com().dynamic(DynamicKind::Cop, slot);
            assert!(d.u_inv.is_some());
            assert_eq!(d.horizon(), 16);
            let first = config.mpc.slot_first_period(slot);
            assert_relative_eq!(
                d.u[(0, 0)],
                first.powi(3) / 6.0 - 0.8 / 9.81 * first,
                epsilon = 1e-15
            );
        }
        let _ = system.base().dynamic(DynamicKind::Velocity, 4);
    }

    #[test]
    #[should_panic(expected = "base has no Cop dynamic")]
    fn base_has_no_cop_dynamic() {
        let system = RigidBodySystem::new(&WalkgenConfig::default()).unwrap();
        let _ = system.base().dynamic(DynamicKind::Cop, 0);
    }

    #[test]
    fn rolling_robot_tracks_no_feet() {
        let mut config = WalkgenConfig::default();
        config.robot.locomotion = Locomotion::Rolling;
        let mut system = RigidBodySystem::new(&config).unwrap();
        assert!(system.body(BodyType::LeftFoot).is_none());
        assert_eq!(
            system.set_body_state(BodyType::RightFoot, BodyState::default()),
            Err(StateError::MissingBody("right_foot"))
        );
    }

    #[test]
    fn set_body_state_validates() {
        let mut system = RigidBodySystem::new(&WalkgenConfig::default()).unwrap();
        let mut bad = BodyState::default();
        bad.x[0] = f64::INFINITY;
        assert!(system.set_body_state(BodyType::Base, bad).is_err());
        let good = BodyState::at_rest(0.3, 0.0, 0.0, 0.1);
        system.set_body_state(BodyType::Base, good.clone()).unwrap();
        assert_eq!(system.base().state(), &good);
    }

    #[test]
    fn pending_support_is_committed_once() {
        let mut system = RigidBodySystem::new(&WalkgenConfig::default()).unwrap();
        let support = SupportState {
            phase: SupportPhase::SingleSupport,
            foot: Foot::Right,
            ..SupportState::default()
        };
        system.set_current_support(support.clone());
        assert_eq!(system.current_support().phase, SupportPhase::DoubleSupport);
        system.commit_pending_support();
        assert_eq!(system.current_support(), &support);
    }

    #[test]
    fn interpolation_follows_first_jerk_and_updates_state() {
        let config = WalkgenConfig::default();
        let mut system = RigidBodySystem::new(&config).unwrap();
        let mut solution = solution_with_jerks(16, &[1.0, -1.0, 0.5, 0.0]);
        system.interpolate_bodies(&mut solution, 0.0);

        let com_x = solution.body(BodyType::CoM).axis(Axis::X);
        assert_eq!(com_x.len(), 4);
        let t: f64 = 0.02;
        assert_relative_eq!(com_x.position[3], t.powi(3) / 6.0, epsilon = 1e-15);
        assert_relative_eq!(com_x.acceleration[3], t, epsilon = 1e-15);
        assert_relative_eq!(
            solution.cop_x[3],
            t.powi(3) / 6.0 - 0.8 / 9.81 * t,
            epsilon = 1e-12
        );
        // Double support: feet hold.
        let left = solution.body(BodyType::LeftFoot).axis(Axis::Y);
        assert!(left.position.iter().all(|&y| (y - 0.1).abs() < 1e-15));

        system.update_body_state(&solution);
        assert_relative_eq!(system.com().state().x[2], t, epsilon = 1e-15);
        assert_relative_eq!(system.base().state().x[1], 0.5 * t * t / 2.0, epsilon = 1e-15);
        assert_relative_eq!(system.com().state().z[0], 0.8);
    }

    #[test]
    fn swing_foot_lands_beside_base() {
        let config = WalkgenConfig::default();
        let mut system = RigidBodySystem::new(&config).unwrap();
        let mut solution = solution_with_jerks(16, &[0.0; 4]);
        solution.support_states.current = SupportState {
            phase: SupportPhase::SingleSupport,
            foot: Foot::Left,
            start_time: 0.0,
            time_limit: 0.02,
            state_changed: true,
            ..SupportState::default()
        };
        system.interpolate_bodies(&mut solution, 0.0);
        let plan = system.swing_plan().unwrap();
        assert_eq!(plan.foot, Foot::Right);
        assert_relative_eq!(plan.target, Vector3::new(0.0, -0.1, 0.0), epsilon = 1e-12);

        let right = solution.body(BodyType::RightFoot);
        assert_relative_eq!(right.axis(Axis::Y).position[3], -0.1, epsilon = 1e-12);
        assert_relative_eq!(right.axis(Axis::Z).position[3], 0.0, epsilon = 1e-12);
        assert!(right.axis(Axis::Z).position[1] > 0.0);
    }
}
