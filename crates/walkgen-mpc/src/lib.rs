//! Model predictive walking pattern generator.
//!
//! Each feedback tick runs the pipeline
//!
//! 1. **Support preview**: support phases and footsteps over the horizon
//! 2. **Orientation preview**: trunk yaw at every QP sample
//! 3. **QP generation**: cost and constraints in CoM/base jerks (or CoP)
//! 4. **Solve and convert**: solver answer back to jerks
//! 5. **Interpolation**: body trajectories at the actuation period
//!
//! # Architecture
//!
//! The CoM follows the cart-table model: its CoP is
//! `p - (h / g) * p_ddot` on each planar axis. Jerk is piecewise constant
//! over each QP sample, so every derived trajectory is an affine map
//! `S x + U j` of the initial state and the jerks. These condensed matrices
//! are built once per first-sample duration at construction, together with
//! the Hessians of every weight set; a tick only fills gradients, bounds and
//! constraint rows.

pub mod dynamics;
pub mod generator;
pub mod interpolation;
pub mod orientation;
pub mod rigid_body;
pub mod solution;
pub mod support;
pub mod walkgen;

pub use dynamics::{DynamicKind, LinearDynamic, LinearDynamicsModel, lower_triangular_inverse};
pub use generator::{
    GeneratorStage, OrientationMatrices, QpGenerator, rotate_to_global, rotate_to_local,
};
pub use interpolation::{AxisSample, QuinticPolynomial, propagate, swing_foot};
pub use orientation::{OrientationPreview, OrientationSequence, YawProfile};
pub use rigid_body::{RigidBody, RigidBodySystem, SwingPlan};
pub use solution::{AxisTrajectory, BodyTrajectory, MpcSolution, VariableBlock};
pub use support::{SupportPreview, SupportSequence};
pub use walkgen::Walkgen;
