//! QP solver adapter for the walking pattern generator.
//!
//! The generator hands over a dense, fixed-shape problem
//! ([`QpProblem`]) and gets back a primal vector plus signed multipliers.
//! Two backends are available and picked from the configuration:
//!
//! - **Clarabel**: interior point, no warm start.
//! - **OSQP**: operator splitting with warm start and polishing.
//!
//! A variable-order permutation can be layered on top of either backend
//! through [`OrderedSolver`].

pub mod interior_point;
pub mod operator_splitting;
pub mod problem;
pub mod solver;

pub use interior_point::ClarabelSolver;
pub use operator_splitting::OsqpSolver;
pub use problem::{Permutation, QpProblem, QpSolution, WarmStart};
pub use solver::{OrderedSolver, QpSolver, build_solver};
