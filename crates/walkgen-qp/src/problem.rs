//! Fixed-shape QP request and response.
//!
//! ```text
//! minimize    1/2 x^T H x + g^T x
//! subject to  lbA <= A x <= ubA
//!             lb  <=   x <= ub
//! ```
//!
//! Infinite bounds mean "unbounded on that side". Multipliers are reported
//! as one signed vector of length `m + n`: constraint rows first, then
//! variable bounds. A positive value marks an active upper bound, a
//! negative value an active lower bound.

use nalgebra::{DMatrix, DVector};

/// Dense QP in the layout above.
#[derive(Debug, Clone, PartialEq)]
pub struct QpProblem {
    pub hessian: DMatrix<f64>,
    pub gradient: DVector<f64>,
    pub constraints: DMatrix<f64>,
    pub constraint_lower: DVector<f64>,
    pub constraint_upper: DVector<f64>,
    pub variable_lower: DVector<f64>,
    pub variable_upper: DVector<f64>,
}

impl QpProblem {
    /// Zero objective, zero rows, unbounded everywhere.
    #[must_use]
    pub fn new(nb_variables: usize, nb_constraints: usize) -> Self {
        Self {
            hessian: DMatrix::zeros(nb_variables, nb_variables),
            gradient: DVector::zeros(nb_variables),
            constraints: DMatrix::zeros(nb_constraints, nb_variables),
            constraint_lower: DVector::from_element(nb_constraints, f64::NEG_INFINITY),
            constraint_upper: DVector::from_element(nb_constraints, f64::INFINITY),
            variable_lower: DVector::from_element(nb_variables, f64::NEG_INFINITY),
            variable_upper: DVector::from_element(nb_variables, f64::INFINITY),
        }
    }

    #[must_use]
    pub fn nb_variables(&self) -> usize {
        self.gradient.len()
    }

    #[must_use]
    pub fn nb_constraints(&self) -> usize {
        self.constraint_lower.len()
    }

    /// Reset to the empty problem of the given shape, reallocating only
    /// when the shape changes.
    pub fn reset(&mut self, nb_variables: usize, nb_constraints: usize) {
        if self.nb_variables() != nb_variables || self.nb_constraints() != nb_constraints {
            *self = Self::new(nb_variables, nb_constraints);
            return;
        }
        self.hessian.fill(0.0);
        self.gradient.fill(0.0);
        self.constraints.fill(0.0);
        self.constraint_lower.fill(f64::NEG_INFINITY);
        self.constraint_upper.fill(f64::INFINITY);
        self.variable_lower.fill(f64::NEG_INFINITY);
        self.variable_upper.fill(f64::INFINITY);
    }

    #[must_use]
    pub fn objective(&self, x: &DVector<f64>) -> f64 {
        0.5 * x.dot(&(&self.hessian * x)) + self.gradient.dot(x)
    }

    /// Largest bound violation of `x` over rows and variables.
    #[must_use]
    pub fn max_violation(&self, x: &DVector<f64>) -> f64 {
        let ax = &self.constraints * x;
        let rows = (0..ax.len()).map(|i| {
            (self.constraint_lower[i] - ax[i])
                .max(ax[i] - self.constraint_upper[i])
                .max(0.0)
        });
        let vars = (0..x.len()).map(|i| {
            (self.variable_lower[i] - x[i])
                .max(x[i] - self.variable_upper[i])
                .max(0.0)
        });
        rows.chain(vars).fold(0.0, f64::max)
    }
}

/// Starting point handed to backends that support warm starts.
#[derive(Debug, Clone, PartialEq)]
pub struct WarmStart {
    pub primal: DVector<f64>,
    /// Signed multipliers, `m + n` entries.
    pub dual: DVector<f64>,
}

/// Result of a successful solve.
#[derive(Debug, Clone, PartialEq)]
pub struct QpSolution {
    pub x: DVector<f64>,
    /// Signed multipliers, `m + n` entries.
    pub multipliers: DVector<f64>,
    pub iterations: u32,
    pub solve_time_us: u64,
}

// ---------------------------------------------------------------------------
// Permutation
// ---------------------------------------------------------------------------

/// Reordering of the decision vector between the generator's canonical
/// layout and the layout handed to a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    /// `to_solver[canonical] = solver index`.
    to_solver: Vec<usize>,
}

impl Permutation {
    #[must_use]
    pub fn identity(n: usize) -> Self {
        Self {
            to_solver: (0..n).collect(),
        }
    }

    /// Interleave consecutive pairs of blocks of length `block_len`.
    ///
    /// `[x0 x1 .. | y0 y1 ..]` becomes `[x0 y0 x1 y1 ..]` for every pair of
    /// blocks in the vector.
    #[must_use]
    pub fn interleave_pairs(n: usize, block_len: usize) -> Self {
        assert!(
            block_len > 0 && n % (2 * block_len) == 0,
            "vector of {n} cannot be split into pairs of {block_len}-blocks"
        );
        let group = 2 * block_len;
        let to_solver = (0..n)
            .map(|v| {
                let base = (v / group) * group;
                let within = v % group;
                let axis = within / block_len;
                let sample = within % block_len;
                base + 2 * sample + axis
            })
            .collect();
        Self { to_solver }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.to_solver.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_solver.is_empty()
    }

    #[must_use]
    pub fn to_solver(&self, canonical: usize) -> usize {
        self.to_solver[canonical]
    }

    /// Write `problem` in solver order into `out`.
    pub fn permute_problem(&self, problem: &QpProblem, out: &mut QpProblem) {
        let n = problem.nb_variables();
        let m = problem.nb_constraints();
        assert_eq!(n, self.len(), "permutation size mismatch");
        out.reset(n, m);
        for (i, &pi) in self.to_solver.iter().enumerate() {
            out.gradient[pi] = problem.gradient[i];
            out.variable_lower[pi] = problem.variable_lower[i];
            out.variable_upper[pi] = problem.variable_upper[i];
            for (j, &pj) in self.to_solver.iter().enumerate() {
                out.hessian[(pi, pj)] = problem.hessian[(i, j)];
            }
            out.constraints
                .column_mut(pi)
                .copy_from(&problem.constraints.column(i));
        }
        out.constraint_lower.copy_from(&problem.constraint_lower);
        out.constraint_upper.copy_from(&problem.constraint_upper);
    }

    /// Canonical primal vector to solver order.
    #[must_use]
    pub fn permute_primal(&self, x: &DVector<f64>) -> DVector<f64> {
        let mut out = DVector::zeros(x.len());
        for (i, &pi) in self.to_solver.iter().enumerate() {
            out[pi] = x[i];
        }
        out
    }

    /// Solver-order primal vector back to canonical order.
    #[must_use]
    pub fn restore_primal(&self, x: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(x.len(), self.to_solver.iter().map(|&pi| x[pi]))
    }

    /// Canonical multipliers (rows then variables) to solver order.
    #[must_use]
    pub fn permute_dual(&self, y: &DVector<f64>) -> DVector<f64> {
        let m = y.len() - self.len();
        let mut out = y.clone();
        for (i, &pi) in self.to_solver.iter().enumerate() {
            out[m + pi] = y[m + i];
        }
        out
    }

    /// Solver-order multipliers back to canonical order.
    #[must_use]
    pub fn restore_dual(&self, y: &DVector<f64>) -> DVector<f64> {
        let m = y.len() - self.len();
        let mut out = y.clone();
        for (i, &pi) in self.to_solver.iter().enumerate() {
            out[m + i] = y[m + pi];
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn interleave_pairs_layout() {
        let p = Permutation::interleave_pairs(6, 3);
        // [x0 x1 x2 y0 y1 y2] -> [x0 y0 x1 y1 x2 y2]
        let order: Vec<usize> = (0..6).map(|i| p.to_solver(i)).collect();
        assert_eq!(order, vec![0, 2, 4, 1, 3, 5]);
    }

    #[test]
    fn interleave_keeps_groups_separate() {
        let p = Permutation::interleave_pairs(8, 2);
        let order: Vec<usize> = (0..8).map(|i| p.to_solver(i)).collect();
        assert_eq!(order, vec![0, 2, 1, 3, 4, 6, 5, 7]);
    }

    #[test]
    fn primal_and_dual_restore() {
        let p = Permutation::interleave_pairs(4, 2);
        let x = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        assert_relative_eq!(p.restore_primal(&p.permute_primal(&x)), x);

        let y = DVector::from_vec(vec![9.0, 1.0, 2.0, 3.0, 4.0]);
        let permuted = p.permute_dual(&y);
        assert_relative_eq!(permuted[0], 9.0);
        assert_relative_eq!(p.restore_dual(&permuted), y);
    }

    #[test]
    fn permuted_problem_has_same_objective() {
        let mut problem = QpProblem::new(4, 1);
        problem.hessian = DMatrix::from_row_slice(
            4,
            4,
            &[
                4.0, 1.0, 0.0, 0.5, //
                1.0, 3.0, 0.2, 0.0, //
                0.0, 0.2, 2.0, 0.1, //
                0.5, 0.0, 0.1, 1.0,
            ],
        );
        problem.gradient = DVector::from_vec(vec![1.0, -1.0, 0.5, 2.0]);
        problem.constraints = DMatrix::from_row_slice(1, 4, &[1.0, 2.0, 3.0, 4.0]);

        let p = Permutation::interleave_pairs(4, 2);
        let mut out = QpProblem::new(0, 0);
        p.permute_problem(&problem, &mut out);

        let x = DVector::from_vec(vec![0.3, -0.2, 0.7, 0.1]);
        let xp = p.permute_primal(&x);
        assert_relative_eq!(problem.objective(&x), out.objective(&xp), epsilon = 1e-12);
        assert_relative_eq!(
            (&problem.constraints * &x)[0],
            (&out.constraints * &xp)[0],
            epsilon = 1e-12
        );
    }

    #[test]
    fn max_violation_ignores_infinite_bounds() {
        let mut problem = QpProblem::new(2, 1);
        problem.constraints = DMatrix::from_row_slice(1, 2, &[1.0, 1.0]);
        problem.constraint_upper[0] = 1.0;
        problem.variable_lower.fill(0.0);
        let x = DVector::from_vec(vec![1.0, 0.5]);
        assert_relative_eq!(problem.max_violation(&x), 0.5, epsilon = 1e-12);
        let x = DVector::from_vec(vec![-0.25, 0.5]);
        assert_relative_eq!(problem.max_violation(&x), 0.25, epsilon = 1e-12);
    }
}
