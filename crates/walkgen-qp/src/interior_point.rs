//! Interior-point backend built on Clarabel.
//!
//! Two-sided bounds are split into one-sided rows `a^T x <= u` and
//! `-a^T x <= -l` of a single nonnegative cone; infinite sides are
//! dropped. Clarabel has no warm start, so the hint is ignored.

use std::time::Instant;

use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT::NonnegativeConeT,
};
use nalgebra::{DMatrix, DVector};
use tracing::debug;
use walkgen_core::{SolveError, SolverSettings};

use crate::problem::{QpProblem, QpSolution, WarmStart};
use crate::solver::QpSolver;

/// Below this magnitude a dense entry is not stored in the CSC matrix.
const SPARSITY_THRESHOLD: f64 = 1e-15;

/// Row of the stacked cone and where it came from.
#[derive(Debug, Clone, Copy)]
struct StackedRow {
    /// Index in the canonical multiplier vector (rows then variables).
    source: usize,
    /// +1 for an upper side, -1 for a lower side.
    sign: f64,
}

/// Clarabel-backed QP solver.
pub struct ClarabelSolver {
    settings: SolverSettings,
}

impl ClarabelSolver {
    pub const fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }

    pub const fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    /// Stack every finite bound as `A_stack x <= b_stack`.
    fn stack_inequalities(problem: &QpProblem) -> (DMatrix<f64>, Vec<f64>, Vec<StackedRow>) {
        let n = problem.nb_variables();
        let m = problem.nb_constraints();

        let mut rows = Vec::new();
        for i in 0..m {
            if problem.constraint_upper[i].is_finite() {
                rows.push((StackedRow { source: i, sign: 1.0 }, problem.constraint_upper[i]));
            }
            if problem.constraint_lower[i].is_finite() {
                rows.push((StackedRow { source: i, sign: -1.0 }, -problem.constraint_lower[i]));
            }
        }
        for j in 0..n {
            if problem.variable_upper[j].is_finite() {
                rows.push((StackedRow { source: m + j, sign: 1.0 }, problem.variable_upper[j]));
            }
            if problem.variable_lower[j].is_finite() {
                rows.push((StackedRow { source: m + j, sign: -1.0 }, -problem.variable_lower[j]));
            }
        }

        let mut a_stack = DMatrix::zeros(rows.len(), n);
        let mut b_stack = Vec::with_capacity(rows.len());
        let mut origin = Vec::with_capacity(rows.len());
        for (r, (row, bound)) in rows.into_iter().enumerate() {
            if row.source < m {
                for j in 0..n {
                    a_stack[(r, j)] = row.sign * problem.constraints[(row.source, j)];
                }
            } else {
                a_stack[(r, row.source - m)] = row.sign;
            }
            b_stack.push(bound);
            origin.push(row);
        }
        (a_stack, b_stack, origin)
    }
}

impl QpSolver for ClarabelSolver {
    fn name(&self) -> &'static str {
        "clarabel"
    }

    fn supports_warm_start(&self) -> bool {
        false
    }

    fn solve(
        &mut self,
        problem: &QpProblem,
        _warm_start: Option<&WarmStart>,
    ) -> Result<QpSolution, SolveError> {
        let start = Instant::now();
        let n = problem.nb_variables();
        let m = problem.nb_constraints();

        let (a_stack, b_stack, origin) = Self::stack_inequalities(problem);
        let p_csc = dmatrix_to_csc_upper_tri(&problem.hessian);
        let a_csc = dmatrix_to_csc(&a_stack);
        let q: Vec<f64> = problem.gradient.iter().copied().collect();
        let cones = if b_stack.is_empty() {
            Vec::new()
        } else {
            vec![NonnegativeConeT(b_stack.len())]
        };

        let tol = self.settings.tolerance;
        let settings = DefaultSettingsBuilder::default()
            .max_iter(self.settings.max_iter)
            .verbose(false)
            .tol_gap_abs(tol)
            .tol_gap_rel(tol)
            .tol_feas(tol)
            .build()
            .map_err(|e| SolveError::Setup(format!("{e:?}")))?;

        let mut solver = DefaultSolver::new(&p_csc, &q, &a_csc, &b_stack, &cones, settings)
            .map_err(|e| SolveError::Setup(format!("{e:?}")))?;
        solver.solve();
        let sol = &solver.solution;

        debug!(
            status = ?sol.status,
            iterations = sol.iterations,
            rows = b_stack.len(),
            "clarabel solve finished"
        );

        match sol.status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => {}
            SolverStatus::PrimalInfeasible
            | SolverStatus::AlmostPrimalInfeasible
            | SolverStatus::DualInfeasible
            | SolverStatus::AlmostDualInfeasible => return Err(SolveError::Infeasible),
            SolverStatus::MaxIterations => {
                return Err(SolveError::MaxIterations(self.settings.max_iter));
            }
            other => return Err(SolveError::Numerical(format!("{other:?}"))),
        }

        let x = DVector::from_column_slice(&sol.x[..n]);
        let mut multipliers = DVector::zeros(m + n);
        for (row, z) in origin.iter().zip(&sol.z) {
            multipliers[row.source] += row.sign * z;
        }

        Ok(QpSolution {
            x,
            multipliers,
            iterations: sol.iterations,
            solve_time_us: u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX),
        })
    }
}

/// Convert a nalgebra `DMatrix<f64>` to a Clarabel `CscMatrix<f64>` (full matrix).
fn dmatrix_to_csc(m: &DMatrix<f64>) -> CscMatrix<f64> {
    let (nrows, ncols) = m.shape();
    let mut colptr = vec![0usize; ncols + 1];
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();

    for j in 0..ncols {
        for i in 0..nrows {
            let v = m[(i, j)];
            if v.abs() > SPARSITY_THRESHOLD {
                rowval.push(i);
                nzval.push(v);
            }
        }
        colptr[j + 1] = rowval.len();
    }

    CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
}

/// Convert a symmetric `DMatrix<f64>` to its upper triangle in CSC form.
fn dmatrix_to_csc_upper_tri(m: &DMatrix<f64>) -> CscMatrix<f64> {
    let (nrows, ncols) = m.shape();
    let mut colptr = vec![0usize; ncols + 1];
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();

    for j in 0..ncols {
        for i in 0..nrows.min(j + 1) {
            let v = m[(i, j)];
            if v.abs() > SPARSITY_THRESHOLD {
                rowval.push(i);
                nzval.push(v);
            }
        }
        colptr[j + 1] = rowval.len();
    }

    CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::tests::textbook_problem;
    use approx::assert_relative_eq;

    #[test]
    fn textbook_qp() {
        let mut solver = ClarabelSolver::new(SolverSettings::default());
        let solution = solver.solve(&textbook_problem(), None).unwrap();
        assert_relative_eq!(solution.x[0], 2.0 / 3.0, epsilon = 1e-6);
        assert_relative_eq!(solution.x[1], 4.0 / 3.0, epsilon = 1e-6);
    }

    #[test]
    fn multipliers_mark_active_rows() {
        let mut solver = ClarabelSolver::new(SolverSettings::default());
        let solution = solver.solve(&textbook_problem(), None).unwrap();
        // x1 + x2 <= 2 and -x1 + 2 x2 <= 2 are active.
        assert_relative_eq!(solution.multipliers[0], 28.0 / 9.0, epsilon = 1e-4);
        assert_relative_eq!(solution.multipliers[1], 4.0 / 9.0, epsilon = 1e-4);
        assert!(solution.multipliers[2].abs() < 1e-4);
    }

    #[test]
    fn infeasible_bounds_are_reported() {
        let mut problem = QpProblem::new(1, 1);
        problem.hessian[(0, 0)] = 1.0;
        problem.constraints[(0, 0)] = 1.0;
        problem.constraint_upper[0] = -1.0;
        problem.variable_lower[0] = 0.0;
        let mut solver = ClarabelSolver::new(SolverSettings::default());
        assert_eq!(solver.solve(&problem, None), Err(SolveError::Infeasible));
    }

    #[test]
    fn dense_to_csc_skips_zeros() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 2.0]);
        let csc = dmatrix_to_csc(&m);
        assert_eq!(csc.nzval.len(), 2);
        let upper = dmatrix_to_csc_upper_tri(&DMatrix::from_row_slice(2, 2, &[1.0, 3.0, 3.0, 2.0]));
        assert_eq!(upper.nzval.len(), 3);
    }
}
