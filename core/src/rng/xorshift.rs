//! xorshift64* random number generator
//!
//! Fast, high-quality PRNG that is deterministic and suitable for
//! simulation purposes.
//!
//! # Algorithm
//!
//! xorshift64* is a variant of xorshift that passes TestU01's BigCrush
//! statistical tests. It uses 64-bit state and produces 64-bit output.
//!
//! # Determinism
//!
//! Same seed → same sequence of random numbers. This is CRITICAL for:
//! - Debugging (reproduce exact simulation)
//! - Testing (verify behavior)
//! - Branching (resume the exact future sequence from a snapshot)

use serde::{Deserialize, Serialize};

/// Deterministic random number generator using xorshift64*
///
/// Tracks the number of values drawn so the consumption position is
/// observable and can be captured in snapshots.
///
/// # Example
/// ```
/// use wallet_simulator_core::Xorshift64Star;
///
/// let mut rng = Xorshift64Star::new(12345);
/// let value = rng.next_u64();
/// let unit = rng.next_f64(); // [0.0, 1.0)
/// assert_eq!(rng.draws(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Xorshift64Star {
    /// Internal state (64-bit)
    state: u64,
    /// Number of values drawn since construction
    draws: u64,
}

impl Xorshift64Star {
    /// Create a new generator with the given seed
    ///
    /// A zero seed is coerced to 1 (xorshift requirement).
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 1 } else { seed };
        Self { state, draws: 0 }
    }

    /// Generate the next random u64 value
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        self.draws += 1;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Generate a random f64 in [0.0, 1.0)
    ///
    /// Useful for sampling from probability distributions.
    pub fn next_f64(&mut self) -> f64 {
        let value = self.next_u64();
        (value >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// Sample a normally distributed value via the Box-Muller transform
    ///
    /// Consumes exactly two draws per call, so the stream position after a
    /// sample is independent of the sampled value.
    pub fn next_gaussian(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(f64::MIN_POSITIVE);
        let u2 = self.next_f64();
        let mag = (-2.0 * u1.ln()).sqrt();
        mean + std_dev * mag * (std::f64::consts::TAU * u2).cos()
    }

    /// Current internal state (for cursor inspection)
    pub fn state(&self) -> u64 {
        self.state
    }

    /// Number of values drawn since construction
    pub fn draws(&self) -> u64 {
        self.draws
    }
}
