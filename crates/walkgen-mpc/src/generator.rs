//! QP assembly, solve and conversion for one feedback tick.
//!
//! The decision vector is `[com x | com y | base x | base y]`, each block
//! one value per QP sample. The CoM blocks hold either jerks or CoP
//! positions depending on [`DecisionVariable`]; the base blocks always hold
//! jerks.
//!
//! Per axis the cost is
//!
//! ```text
//! w_cop/2  |cop - base - r|^2      w_com/2  |com - base - r|^2
//! w_cj/2   |com jerk|^2            w_bj/2   |base jerk|^2
//! w_bv/2   |base vel - v_ref|^2    w_bp/2   |base pos - p_ref|^2
//! w_bi/2   |int base pos - int p_ref|^2
//! ```
//!
//! where `r` is the desired CoM offset from the base and the integrals run
//! from the current instant to each sample. Every term is affine
//! in the decision vector, so the Hessian depends on the dynamics and the
//! weights only and is cached per (first-sample slot, ponderation). Each
//! tick only instantiates the gradient from cached templates.
//!
//! The generator is a strict state machine; calling a stage out of order
//! is a programming error and panics.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, trace};
use walkgen_core::{
    Axis, BodyType, DecisionVariable, Foot, HalfPlane, Ponderation, PositionReference,
    ReferenceSeries, SolveError, SupportPhase, SupportState, VelocityReference, WalkgenConfig,
};
use walkgen_qp::{QpProblem, QpSolver, WarmStart};

use crate::dynamics::{DynamicKind, LinearDynamic};
use crate::orientation::OrientationSequence;
use crate::rigid_body::RigidBodySystem;
use crate::solution::{MpcSolution, VariableBlock};
use crate::support::SupportSequence;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorStage {
    Idle,
    ObjectiveBuilt,
    ConstraintsBuilt,
    Solved,
    Converted,
}

// ---------------------------------------------------------------------------
// Cached objective
// ---------------------------------------------------------------------------

/// Hessian and gradient factors for one (slot, ponderation) pair.
///
/// The gradient of a CoM block is
/// `com_state * x_com + com_base_state * x_base + com_centering * r`, and
/// likewise for a base block with the velocity and position references.
#[derive(Debug, Clone)]
struct ObjectiveTemplate {
    hessian: DMatrix<f64>,
    com_state: DMatrix<f64>,
    com_base_state: DMatrix<f64>,
    com_centering: DMatrix<f64>,
    base_com_state: DMatrix<f64>,
    base_base_state: DMatrix<f64>,
    base_centering: DMatrix<f64>,
    base_velocity: DMatrix<f64>,
    base_position: DMatrix<f64>,
    base_position_integral: DMatrix<f64>,
}

impl ObjectiveTemplate {
    fn new(robot: &RigidBodySystem, slot: usize, weights: &Ponderation) -> Self {
        let com = robot.com();
        let base = robot.base();
        let cc = com.decision_dynamic(DynamicKind::Cop, slot);
        let cp = com.decision_dynamic(DynamicKind::Position, slot);
        let cj = com.decision_dynamic(DynamicKind::Jerk, slot);
        let bp = base.decision_dynamic(DynamicKind::Position, slot);
        let bv = base.decision_dynamic(DynamicKind::Velocity, slot);
        let bi = base.decision_dynamic(DynamicKind::PositionIntegral, slot);
        let n = cc.horizon();

        let w_cop = weights.cop_centering;
        let w_com = weights.com_centering;
        let w_cj = weights.com_jerk_min;
        let w_bj = weights.base_jerk_min;
        let w_bv = weights.base_velocity;
        let w_bp = weights.base_position;
        let w_bi = weights.base_position_int;

        // w_cop U_cc^T + w_com U_cp^T
        let centering_t = &cc.u_t * w_cop + &cp.u_t * w_com;

        let q_cc = &cc.u_t * &cc.u * w_cop + &cp.u_t * &cp.u * w_com + &cj.u_t * &cj.u * w_cj;
        let q_cb = -(&centering_t * &bp.u);
        let q_bb = &bp.u_t * &bp.u * (w_cop + w_com + w_bp)
            + DMatrix::identity(n, n) * w_bj
            + &bv.u_t * &bv.u * w_bv
            + &bi.u_t * &bi.u * w_bi;

        let mut hessian = DMatrix::zeros(4 * n, 4 * n);
        for (c, b) in [
            (VariableBlock::ComX, VariableBlock::BaseX),
            (VariableBlock::ComY, VariableBlock::BaseY),
        ] {
            let (c, b) = (c.index() * n, b.index() * n);
            hessian.view_mut((c, c), (n, n)).copy_from(&q_cc);
            hessian.view_mut((c, b), (n, n)).copy_from(&q_cb);
            hessian.view_mut((b, c), (n, n)).copy_from(&q_cb.transpose());
            hessian.view_mut((b, b), (n, n)).copy_from(&q_bb);
        }
        let hessian = (&hessian + hessian.transpose()) * 0.5;

        Self {
            hessian,
            com_state: &cc.u_t * &cc.s * w_cop + &cp.u_t * &cp.s * w_com + &cj.u_t * &cj.s * w_cj,
            com_base_state: -(&centering_t * &bp.s),
            com_centering: -centering_t.clone(),
            base_com_state: -(&bp.u_t * (&cc.s * w_cop + &cp.s * w_com)),
            base_base_state: &bp.u_t * &bp.s * (w_cop + w_com + w_bp)
                + &bv.u_t * &bv.s * w_bv
                + &bi.u_t * &bi.s * w_bi,
            base_centering: &bp.u_t * (w_cop + w_com),
            base_velocity: &bv.u_t * (-w_bv),
            base_position: &bp.u_t * (-w_bp),
            base_position_integral: &bi.u_t * (-w_bi),
        }
    }
}

// ---------------------------------------------------------------------------
// Rotations and hulls
// ---------------------------------------------------------------------------

/// Diagonals of the per-sample rotation `R(yaw_i)`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrientationMatrices {
    pub xx: DVector<f64>,
    pub xy: DVector<f64>,
    pub yx: DVector<f64>,
    pub yy: DVector<f64>,
}

impl OrientationMatrices {
    #[must_use]
    pub fn from_yaw(yaw: &DVector<f64>) -> Self {
        let cos = yaw.map(f64::cos);
        let sin = yaw.map(f64::sin);
        Self {
            xy: -&sin,
            yx: sin,
            xx: cos.clone(),
            yy: cos,
        }
    }
}

/// Rotate the planar part of `local` into the world frame.
pub fn rotate_to_global(
    local: &ReferenceSeries,
    rotation: &OrientationMatrices,
    global: &mut ReferenceSeries,
) {
    global.x = rotation.xx.component_mul(&local.x) + rotation.xy.component_mul(&local.y);
    global.y = rotation.yx.component_mul(&local.x) + rotation.yy.component_mul(&local.y);
    global.yaw.clone_from(&local.yaw);
}

/// Inverse of [`rotate_to_global`].
pub fn rotate_to_local(
    global: &ReferenceSeries,
    rotation: &OrientationMatrices,
    local: &mut ReferenceSeries,
) {
    local.x = rotation.xx.component_mul(&global.x) + rotation.yx.component_mul(&global.y);
    local.y = rotation.xy.component_mul(&global.x) + rotation.yy.component_mul(&global.y);
    local.yaw.clone_from(&global.yaw);
}

#[derive(Debug, Clone)]
struct CopHulls {
    double_support: Vec<HalfPlane>,
    left: Vec<HalfPlane>,
    right: Vec<HalfPlane>,
}

impl CopHulls {
    fn for_support(&self, support: &SupportState) -> &[HalfPlane] {
        if support.in_transitional_ds {
            return &self.double_support;
        }
        match (support.phase, support.foot) {
            (SupportPhase::DoubleSupport, _) => &self.double_support,
            (SupportPhase::SingleSupport, Foot::Left) => &self.left,
            (SupportPhase::SingleSupport, Foot::Right) => &self.right,
        }
    }

    fn max_edges(&self) -> usize {
        self.double_support
            .len()
            .max(self.left.len())
            .max(self.right.len())
    }
}

// ---------------------------------------------------------------------------
// QpGenerator
// ---------------------------------------------------------------------------

/// Builds, solves and converts the walking QP. Owns the reusable problem
/// buffers; not meant to be shared between threads.
#[derive(Debug, Clone)]
pub struct QpGenerator {
    config: WalkgenConfig,
    horizon: usize,
    /// Indexed `[slot][ponderation]`.
    templates: Vec<Vec<ObjectiveTemplate>>,
    cop_hulls: CopHulls,
    com_hull: Vec<HalfPlane>,
    nb_constraints: usize,
    problem: QpProblem,
    rotation: OrientationMatrices,
    centering: ReferenceSeries,
    /// Integral of the global position reference up to each sample.
    position_integral: ReferenceSeries,
    slot: usize,
    ponderation: usize,
    stage: GeneratorStage,
}

impl QpGenerator {
    /// Precompute the objective templates for every slot and ponderation.
    pub fn new(config: &WalkgenConfig, robot: &RigidBodySystem) -> Self {
        let horizon = config.mpc.nb_samples_qp;
        let robot_config = &config.robot;
        let single = &robot_config.cop_hull_single_support;
        let cop_hulls = CopHulls {
            double_support: robot_config.cop_hull_double_support.half_planes(),
            left: single.half_planes(),
            right: single.mirrored().half_planes(),
        };
        let com_hull = robot_config.com_hull.half_planes();
        let nb_constraints = (cop_hulls.max_edges() + com_hull.len() + 4) * horizon;

        let mut generator = Self {
            config: config.clone(),
            horizon,
            templates: Vec::new(),
            cop_hulls,
            com_hull,
            nb_constraints,
            problem: QpProblem::new(4 * horizon, nb_constraints),
            rotation: OrientationMatrices::from_yaw(&DVector::zeros(horizon)),
            centering: ReferenceSeries::zeros(horizon),
            position_integral: ReferenceSeries::zeros(horizon),
            slot: 0,
            ponderation: 0,
            stage: GeneratorStage::Idle,
        };
        generator.precompute_objective(robot);
        generator
    }

    /// Cache Hessians and gradient factors. Only needed again when the
    /// dynamics or weights change.
    pub fn precompute_objective(&mut self, robot: &RigidBodySystem) {
        let slots = self.config.mpc.mpc_steps_per_qp();
        self.templates = (0..slots)
            .map(|slot| {
                self.config
                    .mpc
                    .ponderation
                    .iter()
                    .map(|weights| ObjectiveTemplate::new(robot, slot, weights))
                    .collect()
            })
            .collect();
        debug!(
            slots,
            ponderations = self.config.mpc.ponderation.len(),
            variables = self.nb_variables(),
            constraints = self.nb_constraints,
            "Precomputed QP objective templates"
        );
    }

    pub const fn stage(&self) -> GeneratorStage {
        self.stage
    }

    pub const fn problem(&self) -> &QpProblem {
        &self.problem
    }

    pub const fn nb_variables(&self) -> usize {
        4 * self.horizon
    }

    pub const fn nb_constraints(&self) -> usize {
        self.nb_constraints
    }

    pub const fn active_ponderation(&self) -> usize {
        self.ponderation
    }

    pub const fn orientation_matrices(&self) -> &OrientationMatrices {
        &self.rotation
    }

    fn expect_stage(&self, expected: GeneratorStage, operation: &str) {
        assert_eq!(
            self.stage, expected,
            "{operation} called in stage {:?}, expected {expected:?}",
            self.stage
        );
    }

    /// Start a tick whose first sample uses the given slot.
    pub fn begin_tick(&mut self, slot: usize) {
        assert!(
            slot < self.templates.len(),
            "first-sample slot {slot} out of range ({} slots)",
            self.templates.len()
        );
        self.slot = slot;
        self.stage = GeneratorStage::Idle;
    }

    /// Select the weight set of this tick. Only allowed before the
    /// objective is built.
    pub fn set_active_ponderation(&mut self, ponderation: usize) {
        self.expect_stage(GeneratorStage::Idle, "set_active_ponderation");
        assert!(
            ponderation < self.templates[self.slot].len(),
            "ponderation {ponderation} out of range"
        );
        self.ponderation = ponderation;
    }

    // -- references ---------------------------------------------------------

    /// Rotation diagonals from the previewed yaw.
    pub fn compute_orientation_matrices(&mut self, orientation: &OrientationSequence) {
        self.expect_stage(GeneratorStage::Idle, "compute_orientation_matrices");
        assert_eq!(
            orientation.yaw.len(),
            self.horizon,
            "orientation preview length mismatch"
        );
        self.rotation = OrientationMatrices::from_yaw(&orientation.yaw);
    }

    /// Fill the global parts of the references and the centering offset.
    ///
    /// Both references are rotated by the previewed yaw. The position
    /// reference is a world-frame target; it is also integrated over the
    /// sample durations for the integral term.
    pub fn compute_reference_vector(
        &mut self,
        velocity: &mut VelocityReference,
        position: &mut PositionReference,
    ) {
        self.expect_stage(GeneratorStage::Idle, "compute_reference_vector");
        assert_eq!(velocity.horizon(), self.horizon, "velocity reference length mismatch");
        assert_eq!(position.horizon(), self.horizon, "position reference length mismatch");

        rotate_to_global(&velocity.local, &self.rotation, &mut velocity.global);
        rotate_to_global(&position.local, &self.rotation, &mut position.global);

        let first = self.config.mpc.slot_first_period(self.slot);
        let period = self.config.mpc.qp_sampling_period;
        let (mut ix, mut iy) = (0.0, 0.0);
        for i in 0..self.horizon {
            let dt = if i == 0 { first } else { period };
            ix += position.global.x[i] * dt;
            iy += position.global.y[i] * dt;
            self.position_integral.x[i] = ix;
            self.position_integral.y[i] = iy;
        }

        let [ox, oy] = self.config.robot.com_offset_local;
        self.centering.x = &self.rotation.xx * ox + &self.rotation.xy * oy;
        self.centering.y = &self.rotation.yx * ox + &self.rotation.yy * oy;
    }

    // -- objective ----------------------------------------------------------

    /// Copy the cached Hessian and instantiate the gradient for the current
    /// states and references.
    pub fn build_objective(
        &mut self,
        robot: &RigidBodySystem,
        velocity: &VelocityReference,
        position: &PositionReference,
    ) {
        self.expect_stage(GeneratorStage::Idle, "build_objective");
        let n = self.horizon;
        self.problem.reset(self.nb_variables(), self.nb_constraints);

        let template = &self.templates[self.slot][self.ponderation];
        assert_eq!(
            template.hessian.nrows(),
            self.nb_variables(),
            "objective template size mismatch"
        );
        self.problem.hessian.copy_from(&template.hessian);

        let com = robot.com().state();
        let base = robot.base().state();
        for ((axis, com_block), (_, base_block)) in VariableBlock::planar(BodyType::CoM)
            .into_iter()
            .zip(VariableBlock::planar(BodyType::Base))
        {
            let (xc, xb) = (com.axis(axis), base.axis(axis));
            let (centering, vel, pos, pos_int) = match axis {
                Axis::X => (
                    &self.centering.x,
                    &velocity.global.x,
                    &position.global.x,
                    &self.position_integral.x,
                ),
                _ => (
                    &self.centering.y,
                    &velocity.global.y,
                    &position.global.y,
                    &self.position_integral.y,
                ),
            };
            let com_gradient = &template.com_state * xc
                + &template.com_base_state * xb
                + &template.com_centering * centering;
            let base_gradient = &template.base_com_state * xc
                + &template.base_base_state * xb
                + &template.base_centering * centering
                + &template.base_velocity * vel
                + &template.base_position * pos
                + &template.base_position_integral * pos_int;
            self.problem
                .gradient
                .rows_mut(com_block.index() * n, n)
                .copy_from(&com_gradient);
            self.problem
                .gradient
                .rows_mut(base_block.index() * n, n)
                .copy_from(&base_gradient);
        }
        self.stage = GeneratorStage::ObjectiveBuilt;
    }

    // -- constraints --------------------------------------------------------

    /// Assemble every inequality row and variable bound.
    pub fn build_constraints(&mut self, robot: &RigidBodySystem, supports: &SupportSequence) {
        self.expect_stage(GeneratorStage::ObjectiveBuilt, "build_constraints");
        assert_eq!(
            supports.previewed.len(),
            self.horizon,
            "support preview length mismatch"
        );
        let mut row = 0;
        row = self.build_constraints_cop(robot, supports, row);
        row = self.build_constraints_com(robot, row);
        row = self.build_constraints_base_velocity(robot, row);
        row = self.build_constraints_base_acceleration(robot, row);
        assert_eq!(row, self.nb_constraints, "constraint row count mismatch");
        self.build_constraints_base_jerk();
        self.stage = GeneratorStage::ConstraintsBuilt;
    }

    /// CoP inside the support hull, which turns with the previewed yaw.
    /// Samples whose hull has fewer edges keep unbounded padding rows.
    fn build_constraints_cop(
        &mut self,
        robot: &RigidBodySystem,
        supports: &SupportSequence,
        mut row: usize,
    ) -> usize {
        let cop = robot.com().decision_dynamic(DynamicKind::Cop, self.slot);
        let base = robot.base().decision_dynamic(DynamicKind::Position, self.slot);
        let relative = relative_free_response(robot, cop, base);
        for edge in 0..self.cop_hulls.max_edges() {
            for (sample, support) in supports.previewed.iter().enumerate() {
                if let Some(plane) = self.cop_hulls.for_support(support).get(edge) {
                    let rows = HullRows {
                        rotation: &self.rotation,
                        dynamic: cop,
                        base,
                        relative: &relative,
                    };
                    rows.fill(&mut self.problem, row, sample, plane);
                }
                row += 1;
            }
        }
        row
    }

    /// CoM within its hull around the base.
    fn build_constraints_com(&mut self, robot: &RigidBodySystem, mut row: usize) -> usize {
        let com = robot.com().decision_dynamic(DynamicKind::Position, self.slot);
        let base = robot.base().decision_dynamic(DynamicKind::Position, self.slot);
        let relative = relative_free_response(robot, com, base);
        let rows = HullRows {
            rotation: &self.rotation,
            dynamic: com,
            base,
            relative: &relative,
        };
        for plane in &self.com_hull {
            for sample in 0..self.horizon {
                rows.fill(&mut self.problem, row, sample, plane);
                row += 1;
            }
        }
        row
    }

    fn build_constraints_base_velocity(&mut self, robot: &RigidBodySystem, row: usize) -> usize {
        let limit = self.config.robot.base_velocity_limit;
        self.base_box_rows(robot, DynamicKind::Velocity, limit, row)
    }

    fn build_constraints_base_acceleration(
        &mut self,
        robot: &RigidBodySystem,
        row: usize,
    ) -> usize {
        let limit = self.config.robot.base_acceleration_limit;
        self.base_box_rows(robot, DynamicKind::Acceleration, limit, row)
    }

    /// `|S x + U b| <= limit` per sample and axis.
    fn base_box_rows(
        &mut self,
        robot: &RigidBodySystem,
        kind: DynamicKind,
        limit: f64,
        mut row: usize,
    ) -> usize {
        let n = self.horizon;
        let base = robot.base();
        let dynamic = base.decision_dynamic(kind, self.slot);
        for (axis, block) in VariableBlock::planar(BodyType::Base) {
            let free = dynamic.free_response(base.state().axis(axis));
            for sample in 0..n {
                self.problem
                    .constraints
                    .view_mut((row, block.index() * n), (1, n))
                    .copy_from(&dynamic.u.row(sample));
                self.problem.constraint_lower[row] = -limit - free[sample];
                self.problem.constraint_upper[row] = limit - free[sample];
                row += 1;
            }
        }
        row
    }

    /// Box bounds on base jerks; CoM variables stay unbounded.
    fn build_constraints_base_jerk(&mut self) {
        let n = self.horizon;
        let limit = self.config.robot.base_jerk_limit;
        for (_, block) in VariableBlock::planar(BodyType::Base) {
            self.problem
                .variable_lower
                .rows_mut(block.index() * n, n)
                .fill(-limit);
            self.problem
                .variable_upper
                .rows_mut(block.index() * n, n)
                .fill(limit);
        }
    }

    // -- solve --------------------------------------------------------------

    /// Seed `solution` with last tick's answer when it fits this problem.
    pub fn compute_warm_start(&self, solution: &mut MpcSolution, solver_supports_warm_start: bool) {
        self.expect_stage(GeneratorStage::ConstraintsBuilt, "compute_warm_start");
        let n = self.nb_variables();
        let m = self.nb_constraints + n;
        solution.use_warm_start = self.config.mpc.warm_start
            && solver_supports_warm_start
            && solution.initial_solution.len() == n
            && solution.initial_constraints.len() == m;
        if !solution.use_warm_start {
            solution.initial_solution = DVector::zeros(n);
            solution.initial_constraints = DVector::zeros(m);
        }
    }

    /// Hand the problem to `solver`. Failures are returned unchanged and
    /// leave the generator waiting for the next tick.
    pub fn solve(
        &mut self,
        solver: &mut dyn QpSolver,
        solution: &mut MpcSolution,
    ) -> Result<(), SolveError> {
        self.expect_stage(GeneratorStage::ConstraintsBuilt, "solve");
        let warm_start = solution.use_warm_start.then(|| WarmStart {
            primal: solution.initial_solution.clone(),
            dual: solution.initial_constraints.clone(),
        });
        let answer = solver.solve(&self.problem, warm_start.as_ref())?;
        assert_eq!(
            answer.x.len(),
            self.nb_variables(),
            "solver returned a primal of the wrong size"
        );
        trace!(
            solver = solver.name(),
            iterations = answer.iterations,
            warm = solution.use_warm_start,
            "QP solved"
        );
        solution.qp_solution = answer.x;
        solution.constraints = answer.multipliers;
        solution.solver_iterations = answer.iterations;
        solution.solve_time_us = answer.solve_time_us;
        solution.active_ponderation = self.ponderation;
        solution.first_period_slot = self.slot;
        self.stage = GeneratorStage::Solved;
        Ok(())
    }

    /// Express the answer as jerks, recovering CoM jerks from a CoP
    /// trajectory when needed.
    pub fn convert_solution(&mut self, robot: &RigidBodySystem, solution: &mut MpcSolution) {
        self.expect_stage(GeneratorStage::Solved, "convert_solution");
        let n = self.horizon;
        let mut jerks = solution.qp_solution.clone();
        if self.config.mpc.decision_variable == DecisionVariable::Cop {
            let cop = robot.com().dynamic(DynamicKind::Cop, self.slot);
            let u_inv = cop
                .u_inv
                .as_ref()
                .unwrap_or_else(|| panic!("CoP dynamic of slot {} has no inverse", self.slot));
            for (axis, block) in VariableBlock::planar(BodyType::CoM) {
                let start = block.index() * n;
                let target = solution.qp_solution.rows(start, n);
                let free = cop.free_response(robot.com().state().axis(axis));
                let jerk = u_inv * (target - free);
                jerks.rows_mut(start, n).copy_from(&jerk);
            }
        }
        solution.jerks = jerks;
        self.stage = GeneratorStage::Converted;
    }
}

/// Free response of `dynamic` on the CoM minus the base position, per axis.
fn relative_free_response(
    robot: &RigidBodySystem,
    dynamic: &LinearDynamic,
    base: &LinearDynamic,
) -> [DVector<f64>; 2] {
    let com = robot.com().state();
    let base_state = robot.base().state();
    [Axis::X, Axis::Y].map(|axis| {
        dynamic.free_response(com.axis(axis)) - base.free_response(base_state.axis(axis))
    })
}

/// Writer of `n . R^T (p - base) <= d` rows for one CoM-side dynamic.
struct HullRows<'a> {
    rotation: &'a OrientationMatrices,
    dynamic: &'a LinearDynamic,
    base: &'a LinearDynamic,
    relative: &'a [DVector<f64>; 2],
}

impl HullRows<'_> {
    fn fill(&self, problem: &mut QpProblem, row: usize, sample: usize, plane: &HalfPlane) {
        let n = self.dynamic.horizon();
        let [nx, ny] = plane.normal;
        let ax = nx * self.rotation.xx[sample] + ny * self.rotation.xy[sample];
        let ay = nx * self.rotation.yx[sample] + ny * self.rotation.yy[sample];
        let u = self.dynamic.u.row(sample);
        let b = self.base.u.row(sample);
        for (block, coefficient, source) in [
            (VariableBlock::ComX, ax, &u),
            (VariableBlock::ComY, ay, &u),
            (VariableBlock::BaseX, -ax, &b),
            (VariableBlock::BaseY, -ay, &b),
        ] {
            problem
                .constraints
                .view_mut((row, block.index() * n), (1, n))
                .copy_from(&(source * coefficient));
        }
        problem.constraint_upper[row] =
            plane.offset - ax * self.relative[0][sample] - ay * self.relative[1][sample];
    }
}
