use thiserror::Error;

/// Top-level error type for the walking pattern generator.
#[derive(Debug, Error)]
pub enum WalkgenError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Solve error: {0}")]
    Solve(#[from] SolveError),
}

/// Configuration errors. All of them are raised before the first tick.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid {name}: {value} (must be > 0)")]
    NonPositivePeriod { name: &'static str, value: f64 },

    #[error("Sampling periods must satisfy actuation <= mpc <= qp (got {actuation}, {mpc}, {qp})")]
    PeriodOrdering { actuation: f64, mpc: f64, qp: f64 },

    #[error("{coarse} period {coarse_value} is not a multiple of {fine} period {fine_value}")]
    IncommensuratePeriods {
        coarse: &'static str,
        coarse_value: f64,
        fine: &'static str,
        fine_value: f64,
    },

    #[error("Horizon must contain at least one sample")]
    ZeroHorizon,

    #[error("Hull {name} has {vertices} vertices (need at least 3)")]
    DegenerateHull { name: &'static str, vertices: usize },

    #[error("Hull {0} is not convex or has zero area")]
    NonConvexHull(&'static str),

    #[error("Ponderation table has {0} entries (need moving and zero-reference entries)")]
    PonderationTable(usize),

    #[error("CoP dynamics are singular for a first sampling period of {0} s")]
    SingularCopDynamics(f64),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// State and reference errors raised at mutation boundaries.
///
/// Copy + static messages for cheap propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("Reference length mismatch: expected {expected}, got {got}")]
    ReferenceLength { expected: usize, got: usize },

    #[error("Non-finite value in {axis} axis state")]
    NonFinite { axis: &'static str },

    #[error("Homogeneous component of {axis} axis state must be 1")]
    NotHomogeneous { axis: &'static str },

    #[error("Body {0} is not tracked for this robot")]
    MissingBody(&'static str),
}

/// QP solver failures, reported to the caller without retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("QP is infeasible")]
    Infeasible,

    #[error("QP solver hit the iteration limit ({0})")]
    MaxIterations(u32),

    #[error("QP solver numerical failure: {0}")]
    Numerical(String),

    #[error("QP solver setup failed: {0}")]
    Setup(String),
}
