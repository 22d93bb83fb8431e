// walkgen-core: config, errors, time gating and shared types for the walking pattern generator.

pub mod config;
pub mod error;
pub mod time;
pub mod types;

pub use config::{
    DecisionVariable, Locomotion, MpcConfig, PONDERATION_MOVING, PONDERATION_STANDING,
    Ponderation, RobotConfig, SolverKind, SolverSettings, VariableOrder, WalkgenConfig,
};
pub use error::{ConfigError, SolveError, StateError, WalkgenError};
pub use time::{Cadence, TIME_EPSILON, sampling_times};
pub use types::{
    Axis, BodyState, BodyType, Foot, HalfPlane, Hull, PositionReference, REFERENCE_EPSILON,
    Reference, ReferenceSeries, SupportPhase, SupportState, VelocityReference,
};
