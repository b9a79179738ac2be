//! Deterministic random number generation
//!
//! Every consumer draws from its own ChaCha stream, seeded from
//! (master seed, stream label, index), so adding a stream never shifts the
//! values another stream produces.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub struct RngManager {
    master_seed: u64,
}

impl RngManager {
    pub fn new(seed: u64) -> Self {
        Self { master_seed: seed }
    }

    /// Stream for a labelled consumer.
    pub fn stream(&self, label: &str) -> ChaCha8Rng {
        self.indexed_stream(label, 0)
    }

    /// Stream for one item (e.g. one soil plot) of a labelled consumer.
    pub fn indexed_stream(&self, label: &str, index: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.derive_seed(label_hash(label), index))
    }

    fn derive_seed(&self, label: u64, index: u64) -> u64 {
        let mut seed = self.master_seed;
        seed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        seed ^= label.wrapping_mul(1103515245);
        seed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        seed ^= index.wrapping_mul(48271);
        seed
    }
}

impl Default for RngManager {
    fn default() -> Self {
        Self::new(42)
    }
}

// FNV-1a; stable across platforms and releases, unlike `DefaultHasher`.
fn label_hash(label: &str) -> u64 {
    label.bytes().fold(0xcbf29ce484222325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x100000001b3)
    })
}

pub trait RngExt {
    /// Uniform offset in `[-spread, spread)`; zero when `spread` is not positive.
    fn jitter(&mut self, spread: f64) -> f64;
}

impl<R: Rng> RngExt for R {
    fn jitter(&mut self, spread: f64) -> f64 {
        if spread > 0.0 {
            self.gen_range(-spread..spread)
        } else {
            0.0
        }
    }
}
