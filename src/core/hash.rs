//! State Hashing
//!
//! SHA-256 fingerprint of the engine state. Two engines built from the same
//! seed and fed the same inputs produce the same hash every tick, which makes
//! replays and regressions easy to compare from the logs.

use sha2::{Sha256, Digest};
use super::coord::{Coord, Orientation};

/// 32-byte SHA-256 digest.
pub type StateHash = [u8; 32];

/// Feeds grid values into SHA-256 in a fixed little-endian layout.
///
/// The digest depends on call order, so callers must visit entities in a
/// stable order.
pub struct StateHasher {
    hasher: Sha256,
}

impl StateHasher {
    /// Start a digest under `domain`.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Little-endian u32.
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Little-endian u64.
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Both axes, x first.
    #[inline]
    pub fn update_coord(&mut self, value: Coord) {
        self.hasher.update(value.x.to_le_bytes());
        self.hasher.update(value.y.to_le_bytes());
    }

    /// Quarter-turn index as one byte.
    #[inline]
    pub fn update_orientation(&mut self, value: Orientation) {
        self.hasher.update([value.index() as u8]);
    }

    /// Finish the digest.
    pub fn finalize(self) -> StateHash {
        self.hasher.finalize().into()
    }
}

/// Hash one engine state.
///
/// Iteration and seed always go first; the closure adds the placements.
pub fn compute_state_hash<F>(iteration: u64, rng_seed: u64, add_state: F) -> StateHash
where
    F: FnOnce(&mut StateHasher),
{
    let mut hasher = StateHasher::new(b"PIXELGRID_STATE_V1");
    hasher.update_u64(iteration);
    hasher.update_u64(rng_seed);
    add_state(&mut hasher);
    hasher.finalize()
}

// =============================================================================
// TESTS
// =============================================================================
