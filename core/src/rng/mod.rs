//! Deterministic random number generation
//!
//! Uses the xorshift64* algorithm for fast, deterministic random numbers.
//! CRITICAL: All randomness in the simulator MUST go through this module.
//!
//! Every stochastic node draws from its own substream, derived from the
//! master seed and a stable hash of the node identifier. Substreams never
//! depend on evaluation order or on which other nodes exist, so adding or
//! removing a node cannot perturb another node's sampled sequence.

mod xorshift;

pub use xorshift::Xorshift64Star;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Seeded source of per-node random substreams
///
/// Substream seeds combine the master seed with the first 8 bytes of the
/// SHA-256 digest of the stream identifier. The derivation depends only on
/// (master seed, identifier), never on call count or the rest of the node
/// set.
///
/// The full substream map is the source's **cursor**: cloning or serializing
/// a `RandomSource` captures every substream's exact position, so a restored
/// source reproduces the exact future sequence.
///
/// # Example
/// ```
/// use wallet_simulator_core::RandomSource;
///
/// let mut source = RandomSource::new(42);
/// let a = source.substream("salary").next_f64();
///
/// // Same seed and identifier → same value, regardless of other streams.
/// let mut other = RandomSource::new(42);
/// other.substream("rent").next_f64();
/// assert_eq!(other.substream("salary").next_f64(), a);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomSource {
    /// Master seed all substreams are derived from
    master_seed: u64,

    /// Materialized substreams, keyed by stream identifier
    ///
    /// BTreeMap keeps serialization and iteration deterministic.
    streams: BTreeMap<String, Xorshift64Star>,
}

impl RandomSource {
    /// Create a new source from a master seed
    pub fn new(master_seed: u64) -> Self {
        Self {
            master_seed,
            streams: BTreeMap::new(),
        }
    }

    /// Get the master seed
    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Get the substream for a stream identifier, deriving it on first use
    pub fn substream(&mut self, stream_id: &str) -> &mut Xorshift64Star {
        let master_seed = self.master_seed;
        self.streams
            .entry(stream_id.to_string())
            .or_insert_with(|| Xorshift64Star::new(derive_seed(master_seed, stream_id)))
    }

    /// Number of substreams materialized so far
    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    /// Inspect a substream's cursor without advancing it
    pub fn stream_position(&self, stream_id: &str) -> Option<&Xorshift64Star> {
        self.streams.get(stream_id)
    }
}

/// Derive a substream seed from the master seed and a stable identifier hash
fn derive_seed(master_seed: u64, stream_id: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(stream_id.as_bytes());
    let digest = hasher.finalize();

    let mut tag_bytes = [0u8; 8];
    tag_bytes.copy_from_slice(&digest[..8]);
    let tag = u64::from_le_bytes(tag_bytes);

    let seed = master_seed ^ tag;
    if seed == 0 {
        1
    } else {
        seed
    }
}
