use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;

/// Large odd constant used to spread derived seeds across the seed space.
const SEED_DERIVATION_PRIME: u64 = 0x9E37_79B9_7F4A_7C15;

/// Create a deterministic RNG from a seed.
pub fn create_rng(seed: u64) -> ChaCha12Rng {
    ChaCha12Rng::seed_from_u64(seed)
}

/// Derive the seed of the `run`-th independent run from a base seed.
pub fn derive_seed(base_seed: u64, run: usize) -> u64 {
    base_seed.wrapping_add((run as u64).wrapping_mul(SEED_DERIVATION_PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn same_seed_yields_same_stream() {
        let mut a = create_rng(7);
        let mut b = create_rng(7);
        for _ in 0..16 {
            assert_eq!(a.random::<u64>(), b.random::<u64>());
        }
    }

    #[test]
    fn derived_seeds_are_distinct() {
        let seeds: Vec<u64> = (0..8).map(|run| derive_seed(42, run)).collect();
        assert_eq!(seeds[0], 42);
        for (i, a) in seeds.iter().enumerate() {
            for b in &seeds[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
