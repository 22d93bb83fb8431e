//! Deterministic RNG utilities for reproducible tests.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use walkgen_core::{Axis, BodyState};

/// Create a deterministic `ChaCha8Rng` from a seed.
///
/// All test randomization should go through this to ensure reproducibility.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Deterministic values in `[-1, 1)`.
pub fn deterministic_vec(dim: usize, seed: u64) -> Vec<f64> {
    let mut rng = seeded_rng(seed);
    (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

/// Body state with every derivative drawn in `[-scale, scale)`.
pub fn random_body_state(rng: &mut impl Rng, scale: f64) -> BodyState {
    let mut state = BodyState::default();
    for axis in Axis::ALL {
        let values = state.axis_mut(axis);
        for i in 0..3 {
            values[i] = rng.gen_range(-scale..scale);
        }
    }
    state
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
