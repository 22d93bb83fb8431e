//! Output of one feedback tick.

use std::ops::Range;

use nalgebra::DVector;
use walkgen_core::{Axis, BodyType};

use crate::interpolation::AxisSample;
use crate::orientation::OrientationSequence;
use crate::support::SupportSequence;

/// Blocks of the decision and jerk vectors, each `nb_samples_qp` long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableBlock {
    ComX,
    ComY,
    BaseX,
    BaseY,
}

impl VariableBlock {
    pub const ALL: [Self; 4] = [Self::ComX, Self::ComY, Self::BaseX, Self::BaseY];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn range(self, horizon: usize) -> Range<usize> {
        let start = self.index() * horizon;
        start..start + horizon
    }

    /// x and y blocks of a body driven by the QP.
    ///
    /// # Panics
    /// For bodies that are not part of the decision vector.
    #[must_use]
    pub fn planar(body: BodyType) -> [(Axis, Self); 2] {
        match body {
            BodyType::CoM => [(Axis::X, Self::ComX), (Axis::Y, Self::ComY)],
            BodyType::Base => [(Axis::X, Self::BaseX), (Axis::Y, Self::BaseY)],
            other => panic!("{} is not a QP body", other.name()),
        }
    }
}

/// Interpolated samples of one axis, one entry per actuation instant.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AxisTrajectory {
    pub position: Vec<f64>,
    pub velocity: Vec<f64>,
    pub acceleration: Vec<f64>,
}

impl AxisTrajectory {
    pub fn clear(&mut self) {
        self.position.clear();
        self.velocity.clear();
        self.acceleration.clear();
    }

    pub fn push(&mut self, sample: AxisSample) {
        self.position.push(sample.position);
        self.velocity.push(sample.velocity);
        self.acceleration.push(sample.acceleration);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.position.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.position.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<AxisSample> {
        Some(AxisSample {
            position: *self.position.last()?,
            velocity: *self.velocity.last()?,
            acceleration: *self.acceleration.last()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BodyTrajectory {
    axes: [AxisTrajectory; 4],
}

impl BodyTrajectory {
    #[must_use]
    pub fn axis(&self, axis: Axis) -> &AxisTrajectory {
        &self.axes[axis.index()]
    }

    pub fn axis_mut(&mut self, axis: Axis) -> &mut AxisTrajectory {
        &mut self.axes[axis.index()]
    }

    pub fn clear(&mut self) {
        self.axes.iter_mut().for_each(AxisTrajectory::clear);
    }
}

/// Everything produced by one feedback tick.
#[derive(Debug, Clone, PartialEq)]
pub struct MpcSolution {
    /// True when this tick produced fresh trajectories.
    pub new_trajectory: bool,
    /// Start of the current QP sample.
    pub qp_time: f64,
    pub feedback_time: f64,
    pub first_period_slot: usize,
    pub active_ponderation: usize,
    /// `nb_samples_qp + 1` instants, starting at `feedback_time`.
    pub sampling_times: Vec<f64>,
    pub support_states: SupportSequence,
    pub orientation: OrientationSequence,

    /// Raw decision vector in canonical block order.
    pub qp_solution: DVector<f64>,
    /// Signed multipliers, rows then variables.
    pub constraints: DVector<f64>,
    pub initial_solution: DVector<f64>,
    pub initial_constraints: DVector<f64>,
    pub use_warm_start: bool,

    /// Jerks in block order, whatever the decision variable.
    pub jerks: DVector<f64>,

    pub(crate) bodies: [BodyTrajectory; 4],
    pub cop_x: Vec<f64>,
    pub cop_y: Vec<f64>,

    pub solver_iterations: u32,
    pub solve_time_us: u64,
}

impl Default for MpcSolution {
    fn default() -> Self {
        Self {
            new_trajectory: false,
            qp_time: 0.0,
            feedback_time: 0.0,
            first_period_slot: 0,
            active_ponderation: 0,
            sampling_times: Vec::new(),
            support_states: SupportSequence::default(),
            orientation: OrientationSequence::default(),
            qp_solution: DVector::zeros(0),
            constraints: DVector::zeros(0),
            initial_solution: DVector::zeros(0),
            initial_constraints: DVector::zeros(0),
            use_warm_start: false,
            jerks: DVector::zeros(0),
            bodies: Default::default(),
            cop_x: Vec::new(),
            cop_y: Vec::new(),
            solver_iterations: 0,
            solve_time_us: 0,
        }
    }
}

impl MpcSolution {
    /// Keep the last answer as the next warm start and clear the rest.
    pub fn reset(&mut self) {
        self.initial_solution = std::mem::replace(&mut self.qp_solution, DVector::zeros(0));
        self.initial_constraints = std::mem::replace(&mut self.constraints, DVector::zeros(0));
        self.use_warm_start = false;
        self.new_trajectory = false;
        self.jerks = DVector::zeros(0);
        self.bodies.iter_mut().for_each(BodyTrajectory::clear);
        self.cop_x.clear();
        self.cop_y.clear();
        self.solver_iterations = 0;
        self.solve_time_us = 0;
    }

    #[must_use]
    pub fn body(&self, body: BodyType) -> &BodyTrajectory {
        &self.bodies[body.index()]
    }

    pub fn body_mut(&mut self, body: BodyType) -> &mut BodyTrajectory {
        &mut self.bodies[body.index()]
    }

    /// Jerk samples of one block.
    #[must_use]
    pub fn jerk(&self, block: VariableBlock) -> &[f64] {
        let horizon = self.jerks.len() / VariableBlock::ALL.len();
        &self.jerks.as_slice()[block.range(horizon)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_moves_answer_to_warm_start() {
        let mut solution = MpcSolution {
            qp_solution: DVector::from_element(8, 1.0),
            constraints: DVector::from_element(12, -2.0),
            jerks: DVector::from_element(8, 3.0),
            new_trajectory: true,
            ..MpcSolution::default()
        };
        solution.body_mut(BodyType::CoM).axis_mut(Axis::X).push(AxisSample::default());
        solution.reset();
        assert_eq!(solution.initial_solution.len(), 8);
        assert_eq!(solution.initial_constraints[0], -2.0);
        assert!(solution.qp_solution.is_empty());
        assert!(solution.jerks.is_empty());
        assert!(!solution.new_trajectory);
        assert!(solution.body(BodyType::CoM).axis(Axis::X).is_empty());
    }

    #[test]
    fn jerk_blocks_split_the_vector() {
        let solution = MpcSolution {
            jerks: DVector::from_fn(8, |i, _| i as f64),
            ..MpcSolution::default()
        };
        assert_eq!(solution.jerk(VariableBlock::ComY), &[2.0, 3.0]);
        assert_eq!(solution.jerk(VariableBlock::BaseY), &[6.0, 7.0]);
    }

    #[test]
    #[should_panic(expected = "left_foot is not a QP body")]
    fn feet_have_no_blocks() {
        let _ = VariableBlock::planar(BodyType::LeftFoot);
    }
}
