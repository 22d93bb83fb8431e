//! Tick-driven walking pattern generator.
//!
//! [`Walkgen::online`] is called by an external scheduler at the actuation
//! rate (or slower). Two cadences gate the work inside a call:
//!
//! 1. The update cadence (QP period) stamps the QP time and collects the
//!    latest velocity reference.
//! 2. The feedback cadence (MPC period) commits that reference and any
//!    deferred support state, then runs
//!    preview -> objective -> constraints -> solve -> convert -> interpolate.

use tracing::{debug, info, warn};
use walkgen_core::{
    BodyState, BodyType, Cadence, Locomotion, PONDERATION_MOVING, PONDERATION_STANDING,
    PositionReference, StateError, SupportState, VelocityReference, WalkgenConfig, WalkgenError,
    sampling_times,
};
use walkgen_qp::{QpSolver, build_solver};

use crate::generator::QpGenerator;
use crate::orientation::OrientationPreview;
use crate::rigid_body::RigidBodySystem;
use crate::solution::MpcSolution;
use crate::support::SupportPreview;

/// The walking pattern generator. Single-threaded; owns every buffer it
/// touches.
pub struct Walkgen {
    config: WalkgenConfig,
    solver: Box<dyn QpSolver>,
    generator: QpGenerator,
    support_preview: SupportPreview,
    orientation_preview: OrientationPreview,
    robot: RigidBodySystem,
    solution: MpcSolution,

    /// Written by the setters.
    incoming_velocity: VelocityReference,
    /// Collected at the update cadence.
    pending_velocity: VelocityReference,
    /// Used by the current tick.
    velocity: VelocityReference,
    position: PositionReference,

    update_gate: Cadence,
    feedback_gate: Cadence,
}

impl Walkgen {
    /// Validate `config` and build every component.
    pub fn new(config: WalkgenConfig) -> Result<Self, WalkgenError> {
        config.validate()?;
        let mpc = &config.mpc;
        info!(
            horizon = mpc.nb_samples_qp,
            qp_period = mpc.qp_sampling_period,
            mpc_period = mpc.mpc_sampling_period,
            actuation_period = mpc.actuation_sampling_period,
            solver = ?mpc.solver,
            decision = ?mpc.decision_variable,
            order = ?mpc.variable_order,
            locomotion = ?config.robot.locomotion,
            "Initializing walking pattern generator"
        );

        let robot = RigidBodySystem::new(&config)?;
        let generator = QpGenerator::new(&config, &robot);
        let n = mpc.nb_samples_qp;
        Ok(Self {
            solver: build_solver(mpc),
            generator,
            support_preview: SupportPreview::new(&config),
            orientation_preview: OrientationPreview::new(&config),
            robot,
            solution: MpcSolution::default(),
            incoming_velocity: VelocityReference::zeros(n),
            pending_velocity: VelocityReference::zeros(n),
            velocity: VelocityReference::zeros(n),
            position: PositionReference::zeros(n),
            update_gate: Cadence::new(mpc.qp_sampling_period, 0.0),
            feedback_gate: Cadence::new(mpc.mpc_sampling_period, 0.0),
            config,
        })
    }

    /// Advance the generator to `time`.
    ///
    /// Runs the QP when the feedback cadence is due and returns the fresh
    /// solution; otherwise returns the previous one with `new_trajectory`
    /// cleared. With `preview_next_state`, bodies are moved to the end of
    /// the interpolated interval.
    ///
    /// A solver failure is returned as is; the next call starts a new tick.
    pub fn online(
        &mut self,
        time: f64,
        preview_next_state: bool,
    ) -> Result<&MpcSolution, WalkgenError> {
        if self.update_gate.is_due(time) {
            self.solution.qp_time = self.update_gate.advance();
            self.pending_velocity.clone_from(&self.incoming_velocity);
        }
        if !self.feedback_gate.is_due(time) {
            self.solution.new_trajectory = false;
            return Ok(&self.solution);
        }

        self.solution.reset();
        self.velocity.clone_from(&self.pending_velocity);
        self.robot.commit_pending_support();

        let current = self.robot.current_support();
        if self.config.robot.locomotion == Locomotion::Walking
            && current.is_single_support()
            && current.nb_steps_left == 0
        {
            self.velocity.set_zero();
        }
        let ponderation = if self.velocity.is_zero_at_start() {
            PONDERATION_STANDING
        } else {
            PONDERATION_MOVING
        };

        let mpc = &self.config.mpc;
        let first_period = self.update_gate.deadline() - self.feedback_gate.deadline();
        let feedback_time = self.feedback_gate.advance();
        let slot = mpc.first_period_slot(first_period);
        let times = sampling_times(
            feedback_time,
            mpc.slot_first_period(slot),
            mpc.qp_sampling_period,
            mpc.nb_samples_qp,
        );

        let supports = self
            .support_preview
            .preview(self.robot.current_support(), &self.velocity, &times);
        self.robot.replace_current_support(supports.current.clone());
        let trunk_yaw = self.robot.base().state().yaw;
        let orientation = self.orientation_preview.preview(&trunk_yaw, &self.velocity, &times);

        self.generator.begin_tick(slot);
        self.generator.set_active_ponderation(ponderation);
        self.generator.compute_orientation_matrices(&orientation);
        self.generator
            .compute_reference_vector(&mut self.velocity, &mut self.position);
        self.generator
            .build_objective(&self.robot, &self.velocity, &self.position);
        self.generator.build_constraints(&self.robot, &supports);

        self.solution.feedback_time = feedback_time;
        self.solution.sampling_times = times;
        self.solution.support_states = supports;
        self.solution.orientation = orientation;
        self.generator
            .compute_warm_start(&mut self.solution, self.solver.supports_warm_start());

        if let Err(err) = self
            .generator
            .solve(self.solver.as_mut(), &mut self.solution)
        {
            warn!(
                time = feedback_time,
                solver = self.solver.name(),
                error = %err,
                "QP solve failed"
            );
            return Err(err.into());
        }
        self.generator
            .convert_solution(&self.robot, &mut self.solution);
        self.robot
            .interpolate_bodies(&mut self.solution, feedback_time);
        self.solution.new_trajectory = true;

        if preview_next_state {
            self.robot.update_body_state(&self.solution);
        }
        debug!(
            time = feedback_time,
            slot,
            ponderation,
            steps = self.solution.support_states.nb_previewed_steps(),
            iterations = self.solution.solver_iterations,
            solve_time_us = self.solution.solve_time_us,
            warm = self.solution.use_warm_start,
            "Feedback tick"
        );
        Ok(&self.solution)
    }

    // -- references ---------------------------------------------------------

    /// Constant local velocity over the whole horizon.
    pub fn set_velocity_reference(
        &mut self,
        dx: f64,
        dy: f64,
        dyaw: f64,
    ) -> Result<(), StateError> {
        if ![dx, dy, dyaw].iter().all(|v| v.is_finite()) {
            return Err(StateError::NonFinite { axis: "reference" });
        }
        self.incoming_velocity = VelocityReference::constant(self.horizon(), dx, dy, dyaw);
        Ok(())
    }

    /// Per-sample local velocity; each profile must hold one value per QP
    /// sample.
    pub fn set_velocity_reference_profile(
        &mut self,
        dx: &[f64],
        dy: &[f64],
        dyaw: &[f64],
    ) -> Result<(), StateError> {
        self.incoming_velocity = VelocityReference::from_profiles(self.horizon(), dx, dy, dyaw)?;
        Ok(())
    }

    /// Constant base position target. It is rotated by the previewed yaw
    /// but never shifted by the current pose, so with a constant heading it
    /// is a fixed point of the world frame.
    pub fn set_position_reference(&mut self, x: f64, y: f64, yaw: f64) -> Result<(), StateError> {
        if ![x, y, yaw].iter().all(|v| v.is_finite()) {
            return Err(StateError::NonFinite { axis: "reference" });
        }
        self.position = PositionReference::constant(self.horizon(), x, y, yaw);
        Ok(())
    }

    pub const fn velocity_reference(&self) -> &VelocityReference {
        &self.velocity
    }

    // -- support and bodies -------------------------------------------------

    /// Replace the support state at the next feedback tick.
    pub fn set_current_support_state(&mut self, support: SupportState) {
        self.robot.set_current_support(support);
    }

    pub const fn current_support_state(&self) -> &SupportState {
        self.robot.current_support()
    }

    /// `None` for feet of a rolling robot.
    #[must_use]
    pub fn body_state(&self, body: BodyType) -> Option<&BodyState> {
        self.robot.body(body).map(|b| b.state())
    }

    pub fn set_body_state(&mut self, body: BodyType, state: BodyState) -> Result<(), StateError> {
        self.robot.set_body_state(body, state)
    }

    // -- accessors ----------------------------------------------------------

    pub const fn solution(&self) -> &MpcSolution {
        &self.solution
    }

    pub const fn robot(&self) -> &RigidBodySystem {
        &self.robot
    }

    pub const fn generator(&self) -> &QpGenerator {
        &self.generator
    }

    pub const fn config(&self) -> &WalkgenConfig {
        &self.config
    }

    const fn horizon(&self) -> usize {
        self.config.mpc.nb_samples_qp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use walkgen_core::{Foot, SupportPhase};
    use walkgen_test_utils::{short_horizon_config, walking_config};

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = walking_config();
        config.mpc.nb_samples_qp = 0;
        assert!(matches!(Walkgen::new(config), Err(WalkgenError::Config(_))));
    }

    #[test]
    fn feedback_runs_at_mpc_rate() {
        let mut walkgen = Walkgen::new(short_horizon_config(8)).unwrap();
        let solution = walkgen.online(0.0, false).unwrap();
        assert!(solution.new_trajectory);
        assert_eq!(solution.first_period_slot, 4);
        assert_eq!(solution.sampling_times.len(), 9);

        let solution = walkgen.online(0.01, false).unwrap();
        assert!(!solution.new_trajectory);

        let solution = walkgen.online(0.02, false).unwrap();
        assert!(solution.new_trajectory);
        assert_eq!(solution.first_period_slot, 3);
        assert!((solution.sampling_times[1] - 0.1).abs() < 1e-9);
    }

    #[test]
    fn profile_reference_checks_length() {
        let mut walkgen = Walkgen::new(short_horizon_config(8)).unwrap();
        let short = [0.1; 3];
        let full = [0.1; 8];
        assert_eq!(
            walkgen.set_velocity_reference_profile(&short, &full, &full),
            Err(StateError::ReferenceLength {
                expected: 8,
                got: 3
            })
        );
        assert!(walkgen.set_velocity_reference_profile(&full, &full, &full).is_ok());
        assert!(walkgen.set_velocity_reference(f64::NAN, 0.0, 0.0).is_err());
    }

    #[test]
    fn support_state_is_applied_at_next_tick() {
        let mut walkgen = Walkgen::new(short_horizon_config(8)).unwrap();
        let support = SupportState {
            phase: SupportPhase::SingleSupport,
            foot: Foot::Right,
            start_time: 0.0,
            time_limit: 10.0,
            nb_steps_left: 2,
            ..SupportState::default()
        };
        walkgen.set_current_support_state(support);
        assert_eq!(walkgen.current_support_state().phase, SupportPhase::DoubleSupport);
        walkgen.online(0.0, false).unwrap();
        assert_eq!(walkgen.current_support_state().phase, SupportPhase::SingleSupport);
        assert_eq!(walkgen.current_support_state().foot, Foot::Right);
    }

    #[test]
    fn reference_takes_effect_after_update_boundary() {
        let mut walkgen = Walkgen::new(short_horizon_config(8)).unwrap();
        walkgen.online(0.0, true).unwrap();
        walkgen.set_velocity_reference(0.1, 0.0, 0.0).unwrap();
        // Mid-QP-period feedback ticks still use the collected reference.
        for time in [0.02, 0.04, 0.06, 0.08] {
            walkgen.online(time, true).unwrap();
            assert!(walkgen.velocity_reference().is_zero_at_start());
            assert_eq!(walkgen.solution().active_ponderation, PONDERATION_STANDING);
        }
        walkgen.online(0.1, true).unwrap();
        assert!(!walkgen.velocity_reference().is_zero_at_start());
        assert_eq!(walkgen.solution().active_ponderation, PONDERATION_MOVING);
    }

    #[test]
    fn rolling_robot_has_no_feet() {
        let mut config = walking_config();
        config.robot.locomotion = Locomotion::Rolling;
        let walkgen = Walkgen::new(config).unwrap();
        assert!(walkgen.body_state(BodyType::LeftFoot).is_none());
        assert!(walkgen.body_state(BodyType::CoM).is_some());
    }
}
