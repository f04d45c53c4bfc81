// Detecting ECB.
//
// ECB encrypts every block independently, so equal plaintext blocks give equal
// ciphertext blocks. Any structured plaintext long enough to repeat a block
// will show that repetition in the ciphertext, whereas CBC (or random bytes)
// almost never repeats a 16-byte block.

use std::collections::HashSet;

use tracing::debug;

use crate::aes::{Key, BLOCK_SIZE};
use crate::oracle::EncryptionOracle;
use crate::{
    encrypt_aes_128_cbc, encrypt_aes_128_ecb, random_bytes, random_range, random_vec, Result,
};

pub fn has_repeated_block(bytes: &[u8], block_size: usize) -> bool {
    count_block_repetitions(bytes, block_size) > 0
}

/// Return a score for how likely some bytes were encrypted using ECB.
///
/// The score is the ratio of repeated blocks to blocks, between 0 and 1. It is
/// not a probability, only something to rank candidates by.
pub fn score_ecb_likelihood(bytes: &[u8], block_size: usize) -> f64 {
    let n_blocks = bytes.len() / block_size.max(1);
    if n_blocks == 0 {
        return 0.;
    }
    count_block_repetitions(bytes, block_size) as f64 / n_blocks as f64
}

/// Index of the candidate most likely to be ECB encrypted.
///
/// `None` if no candidate repeats a block. The first candidate wins ties.
pub fn find_ecb_encrypted<T: AsRef<[u8]>>(candidates: &[T], block_size: usize) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, candidate) in candidates.iter().enumerate() {
        let score = score_ecb_likelihood(candidate.as_ref(), block_size);
        if score > best.map_or(0.0, |(_, s)| s) {
            best = Some((idx, score));
        }
    }
    best.map(|(idx, _)| idx)
}

fn count_block_repetitions(bytes: &[u8], block_size: usize) -> usize {
    if block_size == 0 {
        return 0;
    }
    let mut seen_blocks = HashSet::new();
    bytes
        .chunks_exact(block_size)
        .filter(|block| !seen_blocks.insert(*block))
        .count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMode {
    Ecb,
    Cbc,
}

/// Encrypts under a mode picked at random when the oracle is built.
///
/// Each query is wrapped in 5-10 random bytes on both sides before being
/// encrypted, so the attacker never controls whole blocks exactly.
pub struct RandomModeOracle {
    key: Key,
    mode: BlockMode,
    iv: [u8; BLOCK_SIZE],
}

impl RandomModeOracle {
    pub fn new() -> Self {
        let mode = if rand::random::<bool>() {
            BlockMode::Ecb
        } else {
            BlockMode::Cbc
        };
        Self::with_mode(mode)
    }

    pub fn with_mode(mode: BlockMode) -> Self {
        Self {
            key: random_bytes(),
            mode,
            iv: random_bytes(),
        }
    }

    /// The mode actually in use, for checking a detection.
    pub fn mode(&self) -> BlockMode {
        self.mode
    }
}

impl Default for RandomModeOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl EncryptionOracle for RandomModeOracle {
    fn encrypt(&self, input: &[u8]) -> Result<Vec<u8>> {
        let plaintext = [
            random_vec(random_range(5..=10)),
            input.to_vec(),
            random_vec(random_range(5..=10)),
        ]
        .concat();
        Ok(match self.mode {
            BlockMode::Ecb => encrypt_aes_128_ecb(&plaintext, &self.key),
            BlockMode::Cbc => encrypt_aes_128_cbc(&plaintext, &self.key, &self.iv),
        })
    }
}

/// Tell whether `oracle` encrypts with ECB or CBC.
///
/// Five blocks of identical input leave at least three whole identical blocks
/// however much random filler the oracle adds in front.
pub fn detect_block_mode<O: EncryptionOracle>(oracle: &O, block_size: usize) -> Result<BlockMode> {
    let ciphertext = oracle.encrypt(&vec![b'A'; 5 * block_size])?;
    let mode = if has_repeated_block(&ciphertext, block_size) {
        BlockMode::Ecb
    } else {
        BlockMode::Cbc
    };
    debug!(?mode, "detected block mode");
    Ok(mode)
}
