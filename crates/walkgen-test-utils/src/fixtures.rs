//! Ready-made configurations.

use approx::relative_eq;
use walkgen_core::{
    Axis, BodyState, DecisionVariable, Locomotion, SolverKind, VariableOrder, WalkgenConfig,
};

/// Default walking robot: Clarabel backend, jerk decision variable.
pub fn walking_config() -> WalkgenConfig {
    WalkgenConfig::default()
}

/// Wheeled robot that never leaves double support.
pub fn rolling_config() -> WalkgenConfig {
    let mut config = WalkgenConfig::default();
    config.robot.locomotion = Locomotion::Rolling;
    config
}

/// OSQP backend on the interleaved variable layout.
pub fn interleaved_osqp_config() -> WalkgenConfig {
    let mut config = WalkgenConfig::default();
    config.mpc.solver = SolverKind::Osqp;
    config.mpc.variable_order = VariableOrder::Interleaved;
    config
}

/// CoP decision variable solved by OSQP.
pub fn cop_osqp_config() -> WalkgenConfig {
    let mut config = WalkgenConfig::default();
    config.mpc.solver = SolverKind::Osqp;
    config.mpc.decision_variable = DecisionVariable::Cop;
    config
}

/// Walking config with a shorter horizon for unit-level checks.
pub fn short_horizon_config(nb_samples: usize) -> WalkgenConfig {
    let mut config = WalkgenConfig::default();
    config.mpc.nb_samples_qp = nb_samples;
    config
}

/// Assert that two body states agree on every axis.
///
/// # Panics
/// With the first mismatching axis.
pub fn assert_states_close(actual: &BodyState, expected: &BodyState, epsilon: f64) {
    for axis in Axis::ALL {
        let (a, e) = (actual.axis(axis), expected.axis(axis));
        assert!(
            relative_eq!(*a, *e, epsilon = epsilon),
            "{} axis differs: {a:?} vs {e:?}",
            axis.name()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_validate() {
        for config in [
            walking_config(),
            rolling_config(),
            interleaved_osqp_config(),
            cop_osqp_config(),
            short_horizon_config(8),
        ] {
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn states_close_accepts_equal_states() {
        let state = BodyState::at_rest(0.1, -0.2, 0.8, 0.3);
        assert_states_close(&state, &state.clone(), 1e-12);
    }

    #[test]
    #[should_panic(expected = "yaw axis differs")]
    fn states_close_reports_axis() {
        let a = BodyState::at_rest(0.0, 0.0, 0.0, 0.0);
        let b = BodyState::at_rest(0.0, 0.0, 0.0, 0.5);
        assert_states_close(&a, &b, 1e-9);
    }
}
