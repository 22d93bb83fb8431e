//! Operator-splitting backend built on OSQP.
//!
//! OSQP has no separate variable bounds, so they are appended as identity
//! rows: `l <= C x <= u` with `C = [A; I]`. Its dual vector then has the
//! canonical `m + n` layout and the same sign convention as [`QpSolution`],
//! so multipliers and warm starts pass through unchanged.

use std::borrow::Cow;
use std::time::Instant;

use nalgebra::{DMatrix, DVector};
use osqp::{CscMatrix, Problem, Settings, Status};
use tracing::debug;
use walkgen_core::{SolveError, SolverSettings};

use crate::problem::{QpProblem, QpSolution, WarmStart};
use crate::solver::QpSolver;

/// OSQP treats magnitudes beyond this as infinite.
const OSQP_INFINITY: f64 = 1e30;

/// OSQP-backed QP solver with warm start and polishing.
pub struct OsqpSolver {
    settings: SolverSettings,
}

impl OsqpSolver {
    pub const fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }

    pub const fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    fn osqp_settings(&self) -> Settings {
        let s = &self.settings;
        Settings::default()
            .verbose(false)
            .rho(s.osqp_rho)
            .sigma(s.osqp_sigma)
            .alpha(s.osqp_alpha)
            .max_iter(s.osqp_max_iter)
            .eps_abs(s.osqp_tolerance)
            .eps_rel(s.osqp_tolerance)
            .adaptive_rho(s.osqp_adaptive_rho)
            .polish(s.osqp_polish)
            .warm_start(true)
    }

    /// Stack rows and variable bounds into `C`, `l` and `u`.
    fn stack(problem: &QpProblem) -> (DMatrix<f64>, Vec<f64>, Vec<f64>) {
        let n = problem.nb_variables();
        let m = problem.nb_constraints();
        let mut c = DMatrix::zeros(m + n, n);
        c.view_mut((0, 0), (m, n)).copy_from(&problem.constraints);
        c.view_mut((m, 0), (n, n)).fill_with_identity();

        let clamp = |v: &f64| (*v).clamp(-OSQP_INFINITY, OSQP_INFINITY);
        let lower: Vec<f64> = problem
            .constraint_lower
            .iter()
            .chain(problem.variable_lower.iter())
            .map(clamp)
            .collect();
        let upper: Vec<f64> = problem
            .constraint_upper
            .iter()
            .chain(problem.variable_upper.iter())
            .map(clamp)
            .collect();
        (c, lower, upper)
    }
}

impl QpSolver for OsqpSolver {
    fn name(&self) -> &'static str {
        "osqp"
    }

    fn supports_warm_start(&self) -> bool {
        true
    }

    fn solve(
        &mut self,
        problem: &QpProblem,
        warm_start: Option<&WarmStart>,
    ) -> Result<QpSolution, SolveError> {
        let start = Instant::now();
        let n = problem.nb_variables();

        let (c, lower, upper) = Self::stack(problem);
        if lower.iter().zip(&upper).any(|(l, u)| l > u) {
            return Err(SolveError::Infeasible);
        }

        let p_csc = dense_to_csc(&problem.hessian, true);
        let a_csc = dense_to_csc(&c, false);
        let q: Vec<f64> = problem.gradient.iter().copied().collect();
        let mut osqp = Problem::new(p_csc, &q, a_csc, &lower, &upper, &self.osqp_settings())
            .map_err(|e| SolveError::Setup(format!("{e:?}")))?;

        if let Some(ws) = warm_start
            && ws.primal.len() == n
            && ws.dual.len() == lower.len()
        {
            osqp.warm_start(ws.primal.as_slice(), ws.dual.as_slice());
        }

        let status = osqp.solve();
        let iterations = status.iter();
        let solution = match status {
            Status::Solved(solution) => solution,
            Status::SolvedInaccurate(solution) => {
                debug!(iterations, "osqp returned an inaccurate solution");
                solution
            }
            Status::MaxIterationsReached(_) => {
                return Err(SolveError::MaxIterations(self.settings.osqp_max_iter));
            }
            Status::PrimalInfeasible(_)
            | Status::PrimalInfeasibleInaccurate(_)
            | Status::DualInfeasible(_)
            | Status::DualInfeasibleInaccurate(_) => return Err(SolveError::Infeasible),
            Status::NonConvex(_) => {
                return Err(SolveError::Numerical("non-convex objective".into()));
            }
            _ => return Err(SolveError::Numerical("unexpected osqp status".into())),
        };

        let x = DVector::from_column_slice(solution.x());
        let multipliers = DVector::from_column_slice(solution.y());
        debug!(
            iterations,
            violation = problem.max_violation(&x),
            "osqp solve finished"
        );

        Ok(QpSolution {
            x,
            multipliers,
            iterations,
            solve_time_us: u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX),
        })
    }
}

/// Dense matrix to OSQP CSC form; `upper` keeps the upper triangle only.
fn dense_to_csc(m: &DMatrix<f64>, upper: bool) -> CscMatrix<'static> {
    let (nrows, ncols) = m.shape();
    let mut indptr = vec![0usize; ncols + 1];
    let mut indices = Vec::new();
    let mut data = Vec::new();

    for j in 0..ncols {
        let last = if upper { nrows.min(j + 1) } else { nrows };
        for i in 0..last {
            let v = m[(i, j)];
            if v != 0.0 {
                indices.push(i);
                data.push(v);
            }
        }
        indptr[j + 1] = indices.len();
    }

    CscMatrix {
        nrows,
        ncols,
        indptr: Cow::Owned(indptr),
        indices: Cow::Owned(indices),
        data: Cow::Owned(data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::tests::textbook_problem;
    use approx::assert_relative_eq;

    fn solver() -> OsqpSolver {
        OsqpSolver::new(SolverSettings::default())
    }

    #[test]
    fn textbook_qp() {
        let solution = solver().solve(&textbook_problem(), None).unwrap();
        assert_relative_eq!(solution.x[0], 2.0 / 3.0, epsilon = 1e-5);
        assert_relative_eq!(solution.x[1], 4.0 / 3.0, epsilon = 1e-5);
    }

    #[test]
    fn multipliers_use_canonical_layout() {
        let solution = solver().solve(&textbook_problem(), None).unwrap();
        assert_eq!(solution.multipliers.len(), 3 + 2);
        assert_relative_eq!(solution.multipliers[0], 28.0 / 9.0, epsilon = 1e-4);
        assert_relative_eq!(solution.multipliers[1], 4.0 / 9.0, epsilon = 1e-4);
        assert!(solution.multipliers[2].abs() < 1e-4);
    }

    #[test]
    fn warm_start_from_solution_does_not_slow_down() {
        let problem = textbook_problem();
        let mut s = solver();
        let cold = s.solve(&problem, None).unwrap();
        let warm = WarmStart {
            primal: cold.x.clone(),
            dual: cold.multipliers.clone(),
        };
        let hot = s.solve(&problem, Some(&warm)).unwrap();
        assert_relative_eq!(hot.x, cold.x, epsilon = 1e-5);
        assert!(hot.iterations <= cold.iterations);
    }

    #[test]
    fn mismatched_warm_start_is_ignored() {
        let warm = WarmStart {
            primal: DVector::zeros(5),
            dual: DVector::zeros(1),
        };
        let solution = solver().solve(&textbook_problem(), Some(&warm)).unwrap();
        assert_relative_eq!(solution.x[1], 4.0 / 3.0, epsilon = 1e-5);
    }

    #[test]
    fn unconstrained_minimum() {
        let mut problem = QpProblem::new(2, 0);
        problem.hessian = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 4.0]);
        problem.gradient = DVector::from_vec(vec![-2.0, 4.0]);
        let solution = solver().solve(&problem, None).unwrap();
        assert_relative_eq!(solution.x[0], 1.0, epsilon = 1e-5);
        assert_relative_eq!(solution.x[1], -1.0, epsilon = 1e-5);
    }

    #[test]
    fn infeasible_problem_is_detected() {
        let mut problem = QpProblem::new(1, 1);
        problem.hessian[(0, 0)] = 1.0;
        problem.constraints[(0, 0)] = 1.0;
        problem.constraint_upper[0] = -1.0;
        problem.variable_lower[0] = 0.0;
        assert_eq!(solver().solve(&problem, None), Err(SolveError::Infeasible));
    }

    #[test]
    fn crossed_bounds_are_infeasible() {
        let mut problem = QpProblem::new(1, 0);
        problem.hessian[(0, 0)] = 1.0;
        problem.variable_lower[0] = 1.0;
        problem.variable_upper[0] = 0.0;
        assert_eq!(solver().solve(&problem, None), Err(SolveError::Infeasible));
    }

    #[test]
    fn hessian_is_passed_as_upper_triangle() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 3.0, 3.0, 2.0]);
        let upper = dense_to_csc(&m, true);
        assert_eq!(upper.data.len(), 3);
        assert_eq!(&upper.indices[..], &[0, 0, 1]);
        let full = dense_to_csc(&DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 2.0]), false);
        assert_eq!(&full.indptr[..], &[0, 1, 2]);
    }
}
