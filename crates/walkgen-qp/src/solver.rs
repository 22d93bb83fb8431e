//! Solver abstraction and backend selection.

use walkgen_core::{MpcConfig, SolveError, SolverKind, VariableOrder};

use crate::interior_point::ClarabelSolver;
use crate::operator_splitting::OsqpSolver;
use crate::problem::{Permutation, QpProblem, QpSolution, WarmStart};

/// A QP backend.
///
/// Implementations are stateless across calls apart from scratch memory;
/// the warm start, when supported, is only a performance hint.
pub trait QpSolver {
    fn name(&self) -> &'static str;

    fn supports_warm_start(&self) -> bool;

    fn solve(
        &mut self,
        problem: &QpProblem,
        warm_start: Option<&WarmStart>,
    ) -> Result<QpSolution, SolveError>;
}

/// Backend wrapper that hands the problem over in a permuted variable
/// order and maps the answer back.
pub struct OrderedSolver {
    inner: Box<dyn QpSolver>,
    permutation: Permutation,
    scratch: QpProblem,
}

impl OrderedSolver {
    pub fn new(inner: Box<dyn QpSolver>, permutation: Permutation) -> Self {
        Self {
            inner,
            permutation,
            scratch: QpProblem::new(0, 0),
        }
    }

    pub const fn permutation(&self) -> &Permutation {
        &self.permutation
    }
}

impl QpSolver for OrderedSolver {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn supports_warm_start(&self) -> bool {
        self.inner.supports_warm_start()
    }

    fn solve(
        &mut self,
        problem: &QpProblem,
        warm_start: Option<&WarmStart>,
    ) -> Result<QpSolution, SolveError> {
        self.permutation.permute_problem(problem, &mut self.scratch);
        let warm = warm_start.map(|ws| WarmStart {
            primal: self.permutation.permute_primal(&ws.primal),
            dual: self.permutation.permute_dual(&ws.dual),
        });
        let mut solution = self.inner.solve(&self.scratch, warm.as_ref())?;
        solution.x = self.permutation.restore_primal(&solution.x);
        solution.multipliers = self.permutation.restore_dual(&solution.multipliers);
        Ok(solution)
    }
}

/// Build the backend named in the configuration.
///
/// The decision vector is `[com x | com y | base x | base y]`, each block
/// `nb_samples_qp` long; `Interleaved` pairs the x and y blocks of each body.
pub fn build_solver(config: &MpcConfig) -> Box<dyn QpSolver> {
    let backend: Box<dyn QpSolver> = match config.solver {
        SolverKind::Clarabel => Box::new(ClarabelSolver::new(config.solver_settings.clone())),
        SolverKind::Osqp => Box::new(OsqpSolver::new(config.solver_settings.clone())),
    };
    match config.variable_order {
        VariableOrder::Blocked => backend,
        VariableOrder::Interleaved => {
            let n = config.nb_samples_qp;
            Box::new(OrderedSolver::new(
                backend,
                Permutation::interleave_pairs(4 * n, n),
            ))
        }
    }
}
