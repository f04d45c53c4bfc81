// Breaking repeating-key XOR.
//
// First we guess the key size. For the right key size `k`, consecutive
// `k`-byte blocks were XOR-ed with the same key, so their Hamming distance is
// the distance between two chunks of English, which is small. For a wrong key
// size the blocks look like noise. We average the normalised distance over
// every consecutive pair of blocks and keep the few smallest.
//
// For each candidate key size we then:
//   - Transpose the ciphertext so that column `i` holds byte `i` of every
//     block. Every byte in a column was XOR-ed with the same key byte.
//   - Break each column as a single-byte XOR cipher.
//   - Assemble the column keys, decrypt the whole ciphertext and score it.
//
// The best-scoring candidate wins. Multiples of the real key size decrypt to
// the same plaintext, so the winning key is reported in its shortest
// repeating form.

use std::ops::RangeInclusive;

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::{
    brute_force_byte_xor_cipher, hamming_distance, repeating_xor_cipher,
    score_english_by_frequency, Error, Result,
};

#[derive(Debug, Clone)]
pub struct RepeatingXorConfig {
    /// Key sizes to consider.
    pub key_sizes: RangeInclusive<usize>,
    /// How many of the most likely key sizes to fully break.
    pub candidates: usize,
}

impl Default for RepeatingXorConfig {
    fn default() -> Self {
        Self {
            key_sizes: 2..=40,
            candidates: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepeatingXorCrack {
    pub key: Vec<u8>,
    pub plaintext: Vec<u8>,
    pub score: f64,
}

#[instrument(skip_all, fields(len = bytes.len()))]
pub fn brute_force_repeating_xor(
    bytes: &[u8],
    config: &RepeatingXorConfig,
) -> Result<RepeatingXorCrack> {
    let key_sizes = sorted_edit_distances(bytes, config.key_sizes.clone());
    if key_sizes.is_empty() {
        return Err(Error::InsufficientCiphertext { len: bytes.len() });
    }
    debug!(candidates = ?&key_sizes[..config.candidates.min(key_sizes.len())], "ranked key sizes");

    let mut best: Option<RepeatingXorCrack> = None;
    for &(_, key_size) in key_sizes.iter().take(config.candidates.max(1)) {
        let key = crack_with_key_size(bytes, key_size);
        let plaintext = repeating_xor_cipher(bytes, &key);
        let score = score_english_by_frequency(&plaintext);
        debug!(key_size, score, "cracked candidate key");
        // Strictly greater, so the earlier (more likely) key size wins ties.
        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(RepeatingXorCrack {
                key,
                plaintext,
                score,
            });
        }
    }

    let mut crack = best.ok_or(Error::InsufficientCiphertext { len: bytes.len() })?;
    crack.key = shortest_period(&crack.key).to_vec();
    Ok(crack)
}

/// Split `bytes` into `key_size` columns, column `i` holding every byte whose
/// index is `i` modulo `key_size`.
pub fn transpose_blocks(bytes: &[u8], key_size: usize) -> Vec<Vec<u8>> {
    (0..key_size)
        .map(|column| {
            bytes
                .iter()
                .skip(column)
                .step_by(key_size)
                .copied()
                .collect()
        })
        .collect()
}

/// Recover the most likely key of exactly `key_size` bytes.
pub fn crack_with_key_size(bytes: &[u8], key_size: usize) -> Vec<u8> {
    transpose_blocks(bytes, key_size)
        .par_iter()
        .map(|column| brute_force_byte_xor_cipher(column).key)
        .collect()
}

// Key sizes that leave fewer than two whole blocks are dropped.
fn sorted_edit_distances(bytes: &[u8], key_sizes: RangeInclusive<usize>) -> Vec<(f64, usize)> {
    let mut distances: Vec<(f64, usize)> = key_sizes
        .into_par_iter()
        .filter_map(|key_size| Some((normalized_edit_distance(bytes, key_size)?, key_size)))
        .collect();
    // Stable, so equal distances keep ascending key size order.
    distances.sort_by(|a, b| a.0.total_cmp(&b.0));
    distances
}

fn normalized_edit_distance(bytes: &[u8], key_size: usize) -> Option<f64> {
    if key_size == 0 {
        return None;
    }
    let blocks: Vec<&[u8]> = bytes.chunks_exact(key_size).collect();
    if blocks.len() < 2 {
        return None;
    }
    let total: f64 = blocks
        .windows(2)
        .map(|pair| hamming_distance(pair[0], pair[1]) as f64 / key_size as f64)
        .sum();
    Some(total / (blocks.len() - 1) as f64)
}

fn shortest_period(key: &[u8]) -> &[u8] {
    (1..key.len())
        .filter(|period| key.len() % period == 0)
        .find(|&period| key.iter().enumerate().all(|(i, b)| *b == key[i % period]))
        .map_or(key, |period| &key[..period])
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    use crate::attacks::test_support::init_tracing;
    use crate::base64_decode;

    fn read_passage() -> Vec<u8> {
        std::fs::read("./data/repeating_xor.txt").unwrap()
    }

    // The two-line "Burning 'em, if you ain't quick and nimble" verse under
    // "ICE" is only 74 bytes, too short for the key size to rank near the top.
    // A longer passage under the same key stands in for it.
    #[rstest]
    #[case(b"ICE")]
    #[case(b"Terminator X: Bring the noise")]
    fn brute_force_repeating_xor_recovers_key_and_plaintext(#[case] key: &[u8]) {
        init_tracing();
        let plaintext = read_passage();
        let ciphertext = repeating_xor_cipher(&plaintext, key);

        let crack = brute_force_repeating_xor(&ciphertext, &RepeatingXorConfig::default()).unwrap();

        assert_eq!(crack.key, key);
        assert_eq!(crack.plaintext, plaintext);
    }

    #[test]
    fn brute_force_repeating_xor_breaks_vanilla_ice_ciphertext() {
        let encoded = std::fs::read_to_string("./data/repeating_xor.b64").unwrap();
        let ciphertext = base64_decode(&encoded).unwrap();

        let crack = brute_force_repeating_xor(&ciphertext, &RepeatingXorConfig::default()).unwrap();

        assert_eq!(crack.key, b"Terminator X: Bring the noise");
        assert!(crack
            .plaintext
            .starts_with(b"I'm back and I'm ringin' the bell \n"));
        assert!(crack.plaintext.ends_with(b"Play that funky music \n"));
    }

    #[test]
    fn brute_force_repeating_xor_rejects_tiny_ciphertext() {
        let result = brute_force_repeating_xor(b"abc", &RepeatingXorConfig::default());

        assert!(matches!(
            result,
            Err(Error::InsufficientCiphertext { len: 3 })
        ));
    }

    #[test]
    fn transpose_blocks_groups_bytes_by_key_position() {
        let columns = transpose_blocks(b"abcdefgh", 3);

        assert_eq!(
            columns,
            vec![b"adg".to_vec(), b"beh".to_vec(), b"cf".to_vec()]
        );
    }

    #[test]
    fn normalized_edit_distance_averages_all_pairs() {
        // Pairs: (ab, ab) differ in 0 bits, (ab, cd) in 3 bits.
        let distance = normalized_edit_distance(b"ababcd", 2).unwrap();

        assert_eq!(distance, (0.0 + 3.0 / 2.0) / 2.0);
    }

    #[rstest]
    #[case(b"ICEICEICE", b"ICE")]
    #[case(b"ICEICEIC", b"ICEICEIC")]
    #[case(b"AAAA", b"A")]
    #[case(b"KEY", b"KEY")]
    fn shortest_period_finds_smallest_repeating_unit(#[case] key: &[u8], #[case] expected: &[u8]) {
        assert_eq!(shortest_period(key), expected);
    }
}
