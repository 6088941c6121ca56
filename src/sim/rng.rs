//! Seeded randomness and value noise
//!
//! Terrain generation samples `value_noise_2d`, which is a pure function of
//! coordinate + seed, so any cell can be regenerated without replaying a
//! stream. `SeededStream` is only used where order-dependent draws are fine
//! (spawn jitter, random retargeting).

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Reproducible uniform stream: same seed, same infinite sequence
#[derive(Debug, Clone)]
pub struct SeededStream {
    rng: Pcg32,
}

impl SeededStream {
    pub fn new(seed: u32) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed as u64),
        }
    }

    /// Next value in [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    /// Uniform value in [lo, hi)
    pub fn range(&mut self, lo: f64, hi: f64) -> f64 {
        if hi <= lo {
            return lo;
        }
        lo + (hi - lo) * self.next_f64()
    }

    /// Uniform index in [0, n); returns 0 for n == 0
    pub fn index(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        self.rng.random_range(0..n)
    }

    /// True with probability `p`
    pub fn chance(&mut self, p: f64) -> bool {
        p > 0.0 && self.next_f64() < p
    }
}

/// Stateless integer hash of a lattice point, mapped to [0, 1)
#[inline]
pub fn hash_2d(x: i32, y: i32, seed: u32) -> f64 {
    let mut h = seed
        ^ (x as u32).wrapping_mul(0x27d4_eb2d)
        ^ (y as u32).wrapping_mul(0x1656_67b1).rotate_left(13);
    h = (h ^ (h >> 16)).wrapping_mul(0x85eb_ca6b);
    h = (h ^ (h >> 13)).wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h as f64 / 4_294_967_296.0
}

#[inline]
fn smoothstep(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

/// Bilinear value noise with smoothstep-eased weights, in [0, 1)
pub fn value_noise_2d(x: f64, y: f64, seed: u32) -> f64 {
    let x0 = x.floor();
    let y0 = y.floor();
    let tx = smoothstep(x - x0);
    let ty = smoothstep(y - y0);
    let (ix, iy) = (x0 as i32, y0 as i32);

    let v00 = hash_2d(ix, iy, seed);
    let v10 = hash_2d(ix.wrapping_add(1), iy, seed);
    let v01 = hash_2d(ix, iy.wrapping_add(1), seed);
    let v11 = hash_2d(ix.wrapping_add(1), iy.wrapping_add(1), seed);

    let top = v00 + (v10 - v00) * tx;
    let bottom = v01 + (v11 - v01) * tx;
    top + (bottom - top) * ty
}

/// FNV-1a of user seed text; blank text draws a fresh random seed
pub fn seed_from_text(text: &str) -> u32 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return random_seed();
    }
    trimmed.bytes().fold(FNV_OFFSET, |h, b| {
        (h ^ b as u32).wrapping_mul(FNV_PRIME)
    })
}

/// Non-reproducible seed from the thread RNG
pub fn random_seed() -> u32 {
    rand::random::<u32>()
}

/// Per-level generation seed derived from the run's master seed
pub fn derive_level_seed(master: u32, level: u32) -> u32 {
    let mut h = master ^ level.wrapping_mul(0x9e37_79b9);
    h = (h ^ (h >> 15)).wrapping_mul(0x2c1b_3c6d);
    h = (h ^ (h >> 12)).wrapping_mul(0x297a_2d39);
    h ^ (h >> 15)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_stream_is_reproducible() {
        let mut a = SeededStream::new(42);
        let mut b = SeededStream::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_f64().to_bits(), b.next_f64().to_bits());
        }
    }

    #[test]
    fn test_stream_differs_by_seed() {
        let mut a = SeededStream::new(1);
        let mut b = SeededStream::new(2);
        let same = (0..16).filter(|_| a.next_f64() == b.next_f64()).count();
        assert!(same < 16);
    }

    #[test]
    fn test_hash_is_pure() {
        assert_eq!(hash_2d(3, -7, 99), hash_2d(3, -7, 99));
        assert_ne!(hash_2d(3, -7, 99), hash_2d(3, -7, 100));
    }

    #[test]
    fn test_noise_matches_lattice_at_integers() {
        // Weights are zero at lattice points, so the hash value comes through unchanged
        let v = value_noise_2d(4.0, 9.0, 7);
        assert!((v - hash_2d(4, 9, 7)).abs() < 1e-12);
    }

    #[test]
    fn test_seed_from_text_fnv() {
        // Known FNV-1a 32-bit vector
        assert_eq!(seed_from_text("a"), 0xe40c_292c);
        assert_eq!(seed_from_text("  a  "), 0xe40c_292c);
        assert_eq!(seed_from_text("brick"), seed_from_text("brick"));
    }

    #[test]
    fn test_level_seeds_vary() {
        assert_ne!(derive_level_seed(5, 1), derive_level_seed(5, 2));
        assert_eq!(derive_level_seed(5, 1), derive_level_seed(5, 1));
    }

    proptest! {
        #[test]
        fn prop_noise_in_unit_range(x in -1000.0f64..1000.0, y in -1000.0f64..1000.0, seed: u32) {
            let v = value_noise_2d(x, y, seed);
            prop_assert!((0.0..1.0).contains(&v));
        }

        #[test]
        fn prop_hash_in_unit_range(x: i32, y: i32, seed: u32) {
            let v = hash_2d(x, y, seed);
            prop_assert!((0.0..1.0).contains(&v));
        }
    }
}
