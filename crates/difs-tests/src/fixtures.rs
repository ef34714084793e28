//! Shared fixtures for DIFS test suites.

use rand::{Rng, SeedableRng};

/// Deterministic pseudo-random bytes for repeatable round-trip tests.
pub fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen()).collect()
}
