//! Shared test fixtures and utilities for walkgen crates.
//!
//! Provides ready-made configurations for the walking and rolling robots,
//! deterministic RNG setup and body-state assertions.

pub mod fixtures;
pub mod rng;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use fixtures::{
    assert_states_close, cop_osqp_config, interleaved_osqp_config, rolling_config,
    short_horizon_config, walking_config,
};
pub use rng::{deterministic_vec, random_body_state, seeded_rng};
