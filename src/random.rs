// Random keys, IVs and filler for the simulated servers.
//
// None of this needs to be cryptographically strong; the attacks must simply
// not rely on being able to predict it.
use std::ops::RangeInclusive;

use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};

pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Deterministic bytes, for reproducible tests.
pub fn random_bytes_with_seed<const N: usize>(seed: u64) -> [u8; N] {
    let mut bytes = [0u8; N];
    StdRng::seed_from_u64(seed).fill_bytes(&mut bytes);
    bytes
}

pub fn random_vec(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

pub fn random_range(range: RangeInclusive<usize>) -> usize {
    rand::thread_rng().gen_range(range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_bytes_generates_different_bytes() {
        let key_1 = random_bytes::<16>();
        let key_2 = random_bytes::<16>();

        assert_ne!(key_1, key_2);
    }

    #[test]
    fn random_bytes_with_seed_is_reproducible() {
        assert_eq!(
            random_bytes_with_seed::<16>(101),
            random_bytes_with_seed::<16>(101)
        );
        assert_ne!(
            random_bytes_with_seed::<16>(101),
            random_bytes_with_seed::<16>(102)
        );
    }

    #[test]
    fn random_range_stays_in_bounds() {
        for _ in 0..100 {
            let n = random_range(5..=10);
            assert!((5..=10).contains(&n));
        }
    }
}
