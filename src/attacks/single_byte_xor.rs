// Breaking a single-byte XOR cipher.
//
// Every byte of the message was XOR-ed with the same key byte, so there are
// only 256 candidate plaintexts. We decrypt with each of them, score each
// candidate with the Englishness scorer and keep the best one.
//
// The 256 trials are independent, so rayon spreads them over threads. To keep
// the outcome identical to a sequential scan we reduce with a total order:
// the higher score wins and, on a tie, the lower key byte wins.

use rayon::prelude::*;

use crate::{score_english_by_frequency, xor_with_byte};

#[derive(Debug, Clone, PartialEq)]
pub struct XorCrackResult {
    pub key: u8,
    pub plaintext: Vec<u8>,
    pub score: f64,
}

impl XorCrackResult {
    /// The plaintext, with invalid UTF-8 replaced.
    pub fn message(&self) -> String {
        String::from_utf8_lossy(&self.plaintext).to_string()
    }

    fn better_of(self, other: Self) -> Self {
        match self.score.total_cmp(&other.score) {
            std::cmp::Ordering::Greater => self,
            std::cmp::Ordering::Less => other,
            std::cmp::Ordering::Equal if self.key <= other.key => self,
            std::cmp::Ordering::Equal => other,
        }
    }
}

pub fn brute_force_byte_xor_cipher(bytes: &[u8]) -> XorCrackResult {
    (0..=255u8)
        .into_par_iter()
        .map(|key| {
            let plaintext = xor_with_byte(bytes, key);
            let score = score_english_by_frequency(&plaintext);
            XorCrackResult {
                key,
                plaintext,
                score,
            }
        })
        .reduce_with(XorCrackResult::better_of)
        // The range is never empty.
        .unwrap_or_else(|| XorCrackResult {
            key: 0,
            plaintext: bytes.to_vec(),
            score: 0.0,
        })
}

/// Find which of `candidates` was encrypted with single-byte XOR.
///
/// Every candidate is brute forced and the one whose best plaintext looks the
/// most like English wins, first candidate on ties. Returns its index along
/// with the crack. `None` if there are no candidates.
pub fn find_byte_xor_encrypted<T: AsRef<[u8]>>(
    candidates: &[T],
) -> Option<(usize, XorCrackResult)> {
    candidates
        .iter()
        .map(|candidate| brute_force_byte_xor_cipher(candidate.as_ref()))
        .enumerate()
        .fold(None, |best: Option<(usize, XorCrackResult)>, (idx, result)| match best {
            Some(best) if best.1.score >= result.score => Some(best),
            _ => Some((idx, result)),
        })
}
