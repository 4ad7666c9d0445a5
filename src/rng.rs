//! Seeded random stream shared by every stochastic decision.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// The simulation's random generator
pub type SimRng = ChaCha8Rng;

/// Create a deterministic RNG from a seed.
pub fn create_rng(seed: u64) -> SimRng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Draw a fresh seed from the OS for runs that do not ask for one.
pub fn random_seed() -> u64 {
    rand::thread_rng().gen()
}

/// Bernoulli trial: `true` with probability `p`.
///
/// Draws exactly one value from the stream regardless of `p`.
#[inline]
pub fn chance(rng: &mut SimRng, p: f64) -> bool {
    rng.gen::<f64>() < p
}
