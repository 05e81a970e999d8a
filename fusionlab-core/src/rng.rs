//! Deterministic RNG hierarchy.
//!
//! A master seed (the config's `random_seed`) generates deterministic
//! sub-seeds for each `(symbol, stream)` pair. Sub-seeds are derived via BLAKE3
//! hashing, independently of thread scheduling order, so a batch produces the
//! same slippage jitter regardless of how many workers run it.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Named random streams. Each consumer gets its own stream so adding a new
/// consumer never shifts the draws of an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RngStream {
    SlippageJitter,
}

impl RngStream {
    fn tag(self) -> &'static [u8] {
        match self {
            RngStream::SlippageJitter => b"slippage-jitter",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RngHierarchy {
    master_seed: u64,
}

impl RngHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Derive a deterministic sub-seed for a specific (symbol, stream).
    pub fn sub_seed(&self, symbol: &str, stream: RngStream) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        hasher.update(stream.tag());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    /// Create a seeded StdRng for a sub-stream.
    pub fn rng_for(&self, symbol: &str, stream: RngStream) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(symbol, stream))
    }
}
