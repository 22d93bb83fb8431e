use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::Hull;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_qp_sampling_period() -> f64 {
    0.1
}
const fn default_mpc_sampling_period() -> f64 {
    0.02
}
const fn default_actuation_sampling_period() -> f64 {
    0.005
}
const fn default_nb_samples_qp() -> usize {
    16
}
const fn default_step_period() -> f64 {
    0.8
}
const fn default_ds_period() -> f64 {
    1e9
}
const fn default_ds_ss_period() -> f64 {
    0.8
}
const fn default_nb_steps_ss_ds() -> u32 {
    2
}
const fn default_true() -> bool {
    true
}
const fn default_max_iter() -> u32 {
    200
}
const fn default_tolerance() -> f64 {
    1e-8
}
const fn default_osqp_rho() -> f64 {
    0.1
}
const fn default_osqp_sigma() -> f64 {
    1e-6
}
const fn default_osqp_alpha() -> f64 {
    1.6
}
const fn default_osqp_max_iter() -> u32 {
    4000
}
const fn default_osqp_tolerance() -> f64 {
    1e-6
}
const fn default_com_height() -> f64 {
    0.8
}
const fn default_gravity() -> f64 {
    9.81
}
const fn default_left_foot() -> [f64; 2] {
    [0.0, 0.1]
}
const fn default_right_foot() -> [f64; 2] {
    [0.0, -0.1]
}
const fn default_foot_max_height() -> f64 {
    0.05
}
fn default_cop_hull_ds() -> Hull {
    Hull::rectangle(-0.1, 0.1, -0.1, 0.1)
}
fn default_cop_hull_ss() -> Hull {
    Hull::rectangle(-0.08, 0.08, -0.03, 0.1)
}
fn default_com_hull() -> Hull {
    Hull::rectangle(-0.05, 0.05, -0.05, 0.05)
}
const fn default_base_velocity_limit() -> f64 {
    1.0
}
const fn default_base_acceleration_limit() -> f64 {
    1.0
}
const fn default_base_jerk_limit() -> f64 {
    10.0
}
const fn default_max_yaw_rate() -> f64 {
    1.0
}
fn default_ponderation() -> Vec<Ponderation> {
    vec![Ponderation::moving(), Ponderation::standing()]
}

// ---------------------------------------------------------------------------
// Enumerated choices
// ---------------------------------------------------------------------------

/// QP backend, chosen once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    #[default]
    Clarabel,
    Osqp,
}

/// Meaning of the CoM block of the decision vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionVariable {
    /// CoM jerk per sample.
    #[default]
    Jerk,
    /// CoP position per sample; jerk is recovered through `U_inv`.
    Cop,
}

/// Layout of the decision vector handed to the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableOrder {
    /// All x samples of a body, then all y samples.
    #[default]
    Blocked,
    /// x and y of each sample side by side.
    Interleaved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locomotion {
    #[default]
    Walking,
    /// Wheeled base: the support never leaves double support.
    Rolling,
}

// ---------------------------------------------------------------------------
// Ponderation
// ---------------------------------------------------------------------------

/// One set of QP cost weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ponderation {
    pub com_jerk_min: f64,
    pub base_jerk_min: f64,
    pub cop_centering: f64,
    pub com_centering: f64,
    pub base_velocity: f64,
    pub base_position: f64,
    /// Weight on the time integral of the base position error.
    #[serde(default)]
    pub base_position_int: f64,
}

impl Ponderation {
    /// Weights used while a velocity is commanded.
    #[must_use]
    pub const fn moving() -> Self {
        Self {
            com_jerk_min: 1e-5,
            base_jerk_min: 1e-5,
            cop_centering: 10.0,
            com_centering: 1.0,
            base_velocity: 1.0,
            base_position: 0.0,
            base_position_int: 0.0,
        }
    }

    /// Weights used with a zero reference.
    #[must_use]
    pub const fn standing() -> Self {
        Self {
            com_jerk_min: 1e-5,
            base_jerk_min: 1e-5,
            cop_centering: 10.0,
            com_centering: 10.0,
            base_velocity: 1.0,
            base_position: 0.0,
            base_position_int: 0.0,
        }
    }

    fn weights(&self) -> [(&'static str, f64); 7] {
        [
            ("com_jerk_min", self.com_jerk_min),
            ("base_jerk_min", self.base_jerk_min),
            ("cop_centering", self.cop_centering),
            ("com_centering", self.com_centering),
            ("base_velocity", self.base_velocity),
            ("base_position", self.base_position),
            ("base_position_int", self.base_position_int),
        ]
    }
}

/// Index of the ponderation used while moving.
pub const PONDERATION_MOVING: usize = 0;
/// Index of the ponderation used with a zero reference.
pub const PONDERATION_STANDING: usize = 1;

// ---------------------------------------------------------------------------
// SolverSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings {
    /// Interior-point iteration cap.
    #[serde(default = "default_max_iter")]
    pub max_iter: u32,

    /// Feasibility and gap tolerance.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// OSQP step size (initial value when adaptive).
    #[serde(default = "default_osqp_rho")]
    pub osqp_rho: f64,

    /// OSQP proximal regularisation.
    #[serde(default = "default_osqp_sigma")]
    pub osqp_sigma: f64,

    /// OSQP over-relaxation factor in (0, 2).
    #[serde(default = "default_osqp_alpha")]
    pub osqp_alpha: f64,

    #[serde(default = "default_osqp_max_iter")]
    pub osqp_max_iter: u32,

    /// Absolute and relative residual tolerance of OSQP.
    #[serde(default = "default_osqp_tolerance")]
    pub osqp_tolerance: f64,

    #[serde(default = "default_true")]
    pub osqp_adaptive_rho: bool,

    /// Refine the OSQP result on its active set.
    #[serde(default = "default_true")]
    pub osqp_polish: bool,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iter: default_max_iter(),
            tolerance: default_tolerance(),
            osqp_rho: default_osqp_rho(),
            osqp_sigma: default_osqp_sigma(),
            osqp_alpha: default_osqp_alpha(),
            osqp_max_iter: default_osqp_max_iter(),
            osqp_tolerance: default_osqp_tolerance(),
            osqp_adaptive_rho: true,
            osqp_polish: true,
        }
    }
}

// ---------------------------------------------------------------------------
// MpcConfig
// ---------------------------------------------------------------------------

/// Timing, horizon and weighting of the MPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MpcConfig {
    /// Spacing of QP samples in seconds (default: 0.1).
    #[serde(default = "default_qp_sampling_period")]
    pub qp_sampling_period: f64,

    /// Feedback period in seconds (default: 0.02). Must divide the QP period.
    #[serde(default = "default_mpc_sampling_period")]
    pub mpc_sampling_period: f64,

    /// Output interpolation period in seconds (default: 0.005).
    #[serde(default = "default_actuation_sampling_period")]
    pub actuation_sampling_period: f64,

    /// Horizon length N (default: 16).
    #[serde(default = "default_nb_samples_qp")]
    pub nb_samples_qp: usize,

    #[serde(default = "default_step_period")]
    pub step_period: f64,

    /// Duration of double support once the robot stops.
    #[serde(default = "default_ds_period")]
    pub ds_period: f64,

    /// Double support kept before the first step after a start.
    #[serde(default = "default_ds_ss_period")]
    pub ds_ss_period: f64,

    /// Steps taken after the reference vanishes before settling in DS.
    #[serde(default = "default_nb_steps_ss_ds")]
    pub nb_steps_ss_ds: u32,

    #[serde(default = "default_true")]
    pub warm_start: bool,

    #[serde(default)]
    pub solver: SolverKind,

    #[serde(default)]
    pub solver_settings: SolverSettings,

    #[serde(default)]
    pub decision_variable: DecisionVariable,

    #[serde(default)]
    pub variable_order: VariableOrder,

    /// Weight sets indexed by the active ponderation selector.
    #[serde(default = "default_ponderation")]
    pub ponderation: Vec<Ponderation>,
}

impl Default for MpcConfig {
    fn default() -> Self {
        Self {
            qp_sampling_period: default_qp_sampling_period(),
            mpc_sampling_period: default_mpc_sampling_period(),
            actuation_sampling_period: default_actuation_sampling_period(),
            nb_samples_qp: default_nb_samples_qp(),
            step_period: default_step_period(),
            ds_period: default_ds_period(),
            ds_ss_period: default_ds_ss_period(),
            nb_steps_ss_ds: default_nb_steps_ss_ds(),
            warm_start: true,
            solver: SolverKind::default(),
            solver_settings: SolverSettings::default(),
            decision_variable: DecisionVariable::default(),
            variable_order: VariableOrder::default(),
            ponderation: default_ponderation(),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_ratio(coarse: f64, fine: f64) -> Option<usize> {
    let ratio = coarse / fine;
    let rounded = ratio.round();
    ((ratio - rounded).abs() < 1e-6 && rounded >= 1.0).then_some(rounded as usize)
}

impl MpcConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("qp_sampling_period", self.qp_sampling_period),
            ("mpc_sampling_period", self.mpc_sampling_period),
            ("actuation_sampling_period", self.actuation_sampling_period),
            ("step_period", self.step_period),
            ("ds_period", self.ds_period),
            ("ds_ss_period", self.ds_ss_period),
        ] {
            if !(value > 0.0) || !value.is_finite() {
                return Err(ConfigError::NonPositivePeriod { name, value });
            }
        }
        if self.actuation_sampling_period > self.mpc_sampling_period
            || self.mpc_sampling_period > self.qp_sampling_period
        {
            return Err(ConfigError::PeriodOrdering {
                actuation: self.actuation_sampling_period,
                mpc: self.mpc_sampling_period,
                qp: self.qp_sampling_period,
            });
        }
        if whole_ratio(self.qp_sampling_period, self.mpc_sampling_period).is_none() {
            return Err(ConfigError::IncommensuratePeriods {
                coarse: "qp",
                coarse_value: self.qp_sampling_period,
                fine: "mpc",
                fine_value: self.mpc_sampling_period,
            });
        }
        if whole_ratio(self.mpc_sampling_period, self.actuation_sampling_period).is_none() {
            return Err(ConfigError::IncommensuratePeriods {
                coarse: "mpc",
                coarse_value: self.mpc_sampling_period,
                fine: "actuation",
                fine_value: self.actuation_sampling_period,
            });
        }
        if self.nb_samples_qp == 0 {
            return Err(ConfigError::ZeroHorizon);
        }
        if self.ponderation.len() <= PONDERATION_STANDING {
            return Err(ConfigError::PonderationTable(self.ponderation.len()));
        }
        for weights in &self.ponderation {
            for (field, value) in weights.weights() {
                if !(value >= 0.0) || !value.is_finite() {
                    return Err(ConfigError::InvalidValue {
                        field: field.into(),
                        message: format!("weight {value} must be finite and >= 0"),
                    });
                }
            }
        }
        let settings = &self.solver_settings;
        if [
            settings.tolerance,
            settings.osqp_tolerance,
            settings.osqp_rho,
            settings.osqp_sigma,
        ]
        .iter()
        .any(|v| !(*v > 0.0) || !v.is_finite())
        {
            return Err(ConfigError::InvalidValue {
                field: "solver_settings".into(),
                message: "tolerances, rho and sigma must be finite and > 0".into(),
            });
        }
        if !(settings.osqp_alpha > 0.0 && settings.osqp_alpha < 2.0) {
            return Err(ConfigError::InvalidValue {
                field: "solver_settings.osqp_alpha".into(),
                message: format!("{} must lie in (0, 2)", settings.osqp_alpha),
            });
        }
        Ok(())
    }

    /// Feedback ticks per QP sample, which is also the number of distinct
    /// first-sample durations.
    #[must_use]
    pub fn mpc_steps_per_qp(&self) -> usize {
        whole_ratio(self.qp_sampling_period, self.mpc_sampling_period).unwrap_or(1)
    }

    /// Interpolated output samples per feedback tick.
    #[must_use]
    pub fn actuation_steps_per_mpc(&self) -> usize {
        whole_ratio(self.mpc_sampling_period, self.actuation_sampling_period).unwrap_or(1)
    }

    /// Slot index of a first-sample duration: `mpc -> 0`, ..., `qp -> steps - 1`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn first_period_slot(&self, first_period: f64) -> usize {
        let steps = self.mpc_steps_per_qp();
        let slot = (first_period / self.mpc_sampling_period).round().max(1.0) as usize - 1;
        slot.min(steps - 1)
    }

    /// Duration of the first sample for a given slot.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn slot_first_period(&self, slot: usize) -> f64 {
        (slot + 1) as f64 * self.mpc_sampling_period
    }
}

// ---------------------------------------------------------------------------
// RobotConfig
// ---------------------------------------------------------------------------

/// Geometry and limits of the robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotConfig {
    #[serde(default)]
    pub locomotion: Locomotion,

    /// Constant CoM height used by the inverted pendulum (default: 0.8 m).
    #[serde(default = "default_com_height")]
    pub com_height: f64,

    #[serde(default = "default_gravity")]
    pub gravity: f64,

    /// Initial left foot position [x, y] in the world frame.
    #[serde(default = "default_left_foot")]
    pub left_foot_position: [f64; 2],

    #[serde(default = "default_right_foot")]
    pub right_foot_position: [f64; 2],

    #[serde(default = "default_foot_max_height")]
    pub free_flying_foot_max_height: f64,

    /// Desired CoM/CoP offset from the base, in the robot frame.
    #[serde(default)]
    pub com_offset_local: [f64; 2],

    /// CoP hull relative to the base in double support.
    #[serde(default = "default_cop_hull_ds")]
    pub cop_hull_double_support: Hull,

    /// CoP hull relative to the base in single support on the left foot.
    /// Mirrored for the right foot.
    #[serde(default = "default_cop_hull_ss")]
    pub cop_hull_single_support: Hull,

    #[serde(default = "default_com_hull")]
    pub com_hull: Hull,

    #[serde(default = "default_base_velocity_limit")]
    pub base_velocity_limit: f64,

    #[serde(default = "default_base_acceleration_limit")]
    pub base_acceleration_limit: f64,

    #[serde(default = "default_base_jerk_limit")]
    pub base_jerk_limit: f64,

    /// Clamp applied to commanded yaw rates.
    #[serde(default = "default_max_yaw_rate")]
    pub max_yaw_rate: f64,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            locomotion: Locomotion::default(),
            com_height: default_com_height(),
            gravity: default_gravity(),
            left_foot_position: default_left_foot(),
            right_foot_position: default_right_foot(),
            free_flying_foot_max_height: default_foot_max_height(),
            com_offset_local: [0.0; 2],
            cop_hull_double_support: default_cop_hull_ds(),
            cop_hull_single_support: default_cop_hull_ss(),
            com_hull: default_com_hull(),
            base_velocity_limit: default_base_velocity_limit(),
            base_acceleration_limit: default_base_acceleration_limit(),
            base_jerk_limit: default_base_jerk_limit(),
            max_yaw_rate: default_max_yaw_rate(),
        }
    }
}

impl RobotConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("com_height", self.com_height),
            ("gravity", self.gravity),
            ("base_velocity_limit", self.base_velocity_limit),
            ("base_acceleration_limit", self.base_acceleration_limit),
            ("base_jerk_limit", self.base_jerk_limit),
            ("max_yaw_rate", self.max_yaw_rate),
        ] {
            if !(value > 0.0) || !value.is_finite() {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    message: format!("{value} must be finite and > 0"),
                });
            }
        }
        if !(self.free_flying_foot_max_height >= 0.0)
            || !self.free_flying_foot_max_height.is_finite()
        {
            return Err(ConfigError::InvalidValue {
                field: "free_flying_foot_max_height".into(),
                message: format!("{} must be finite and >= 0", self.free_flying_foot_max_height),
            });
        }
        for (field, value) in [
            ("com_offset_local", self.com_offset_local),
            ("left_foot_position", self.left_foot_position),
            ("right_foot_position", self.right_foot_position),
        ] {
            if value.iter().any(|v| !v.is_finite()) {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    message: format!("{value:?} must be finite"),
                });
            }
        }
        self.cop_hull_double_support
            .validate("cop_hull_double_support")?;
        self.cop_hull_single_support
            .validate("cop_hull_single_support")?;
        self.com_hull.validate("com_hull")?;
        Ok(())
    }

    /// Pendulum constant `h / g` of the CoP relation.
    #[must_use]
    pub fn height_over_gravity(&self) -> f64 {
        self.com_height / self.gravity
    }

    /// Half the lateral distance between the initial feet.
    #[must_use]
    pub fn half_stance_width(&self) -> f64 {
        0.5 * (self.left_foot_position[1] - self.right_foot_position[1]).abs()
    }
}

// ---------------------------------------------------------------------------
// WalkgenConfig
// ---------------------------------------------------------------------------

/// Full generator configuration. Immutable once the generator is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalkgenConfig {
    #[serde(default)]
    pub mpc: MpcConfig,
    #[serde(default)]
    pub robot: RobotConfig,
}

impl WalkgenConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.mpc.validate()?;
        self.robot.validate()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_config_is_valid() {
        let config = WalkgenConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mpc.mpc_steps_per_qp(), 5);
        assert_eq!(config.mpc.actuation_steps_per_mpc(), 4);
    }

    #[test]
    fn rejects_bad_period_ordering() {
        let mut config = WalkgenConfig::default();
        config.mpc.mpc_sampling_period = 0.2;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PeriodOrdering { .. })
        ));
    }

    #[test]
    fn rejects_non_positive_period() {
        let mut config = WalkgenConfig::default();
        config.mpc.actuation_sampling_period = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositivePeriod {
                name: "actuation_sampling_period",
                ..
            })
        ));
    }

    #[test]
    fn rejects_incommensurate_periods() {
        let mut config = WalkgenConfig::default();
        config.mpc.mpc_sampling_period = 0.03;
        config.mpc.actuation_sampling_period = 0.01;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::IncommensuratePeriods { coarse: "qp", .. })
        ));
    }

    #[test]
    fn rejects_zero_horizon_and_short_table() {
        let mut config = WalkgenConfig::default();
        config.mpc.nb_samples_qp = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroHorizon)));

        let mut config = WalkgenConfig::default();
        config.mpc.ponderation.truncate(1);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PonderationTable(1))
        ));
    }

    #[test]
    fn rejects_degenerate_hull() {
        let mut config = WalkgenConfig::default();
        config.robot.com_hull = Hull {
            vertices: vec![[0.0, 0.0], [0.1, 0.0]],
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DegenerateHull {
                name: "com_hull",
                vertices: 2
            })
        ));
    }

    #[test]
    fn rejects_non_finite_robot_values() {
        let mut config = WalkgenConfig::default();
        config.robot.base_jerk_limit = f64::INFINITY;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "base_jerk_limit"
        ));

        let mut config = WalkgenConfig::default();
        config.robot.com_height = f64::NAN;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "com_height"
        ));

        let mut config = WalkgenConfig::default();
        config.robot.com_offset_local = [f64::NAN, 0.0];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "com_offset_local"
        ));

        let mut config = WalkgenConfig::default();
        config.robot.right_foot_position = [0.0, f64::NEG_INFINITY];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "right_foot_position"
        ));

        let mut config = WalkgenConfig::default();
        config.robot.free_flying_foot_max_height = f64::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_finite_weights_and_solver_settings() {
        let mut config = WalkgenConfig::default();
        config.mpc.ponderation[PONDERATION_MOVING].base_position_int = f64::NAN;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "base_position_int"
        ));

        let mut config = WalkgenConfig::default();
        config.mpc.solver_settings.osqp_rho = f64::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn first_period_slots() {
        let mpc = MpcConfig::default();
        assert_eq!(mpc.first_period_slot(0.02), 0);
        assert_eq!(mpc.first_period_slot(0.1), 4);
        assert_eq!(mpc.first_period_slot(0.06 + 1e-9), 2);
        assert_relative_eq!(mpc.slot_first_period(2), 0.06, epsilon = 1e-12);
    }

    #[test]
    fn toml_partial_document_uses_defaults() {
        let text = r#"
            [mpc]
            nb_samples_qp = 8
            solver = "osqp"
            decision_variable = "cop"

            [robot]
            locomotion = "rolling"
            com_height = 0.5
        "#;
        let config = WalkgenConfig::from_toml_str(text).unwrap();
        assert_eq!(config.mpc.nb_samples_qp, 8);
        assert_eq!(config.mpc.solver, SolverKind::Osqp);
        assert_eq!(config.mpc.decision_variable, DecisionVariable::Cop);
        assert_eq!(config.robot.locomotion, Locomotion::Rolling);
        assert_relative_eq!(config.robot.com_height, 0.5);
        assert_relative_eq!(config.mpc.qp_sampling_period, 0.1);
    }

    #[test]
    fn toml_round_trip() {
        let config = WalkgenConfig::default();
        let text = toml::to_string(&config).unwrap();
        let parsed = WalkgenConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn toml_invalid_value_is_rejected() {
        let text = "[mpc]\nqp_sampling_period = -0.1\n";
        assert!(WalkgenConfig::from_toml_str(text).is_err());
    }
}
