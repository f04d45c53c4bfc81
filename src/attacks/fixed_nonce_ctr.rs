// Breaking fixed-nonce CTR.
//
// CTR turns AES into a stream cipher: ciphertext = plaintext ⊕ keystream. If
// the nonce is reused, every message is XOR-ed with the same keystream, and
// byte `i` of every ciphertext was encrypted with the same keystream byte.
//
// Two ways in:
//   - Guess some plaintext for one ciphertext. XOR-ing the guess with it gives
//     that stretch of keystream, which decrypts the same stretch of every
//     other ciphertext. A good guess makes all of them read like English.
//   - Truncate every ciphertext to the shortest one and treat the lot as
//     repeating-key XOR with the key size known: the key is the keystream.

use tracing::{debug, instrument};

use crate::aes::Key;
use crate::{aes_128_ctr, crack_with_key_size, score_english_by_frequency, Error, Result};

/// Encrypt each plaintext separately under CTR with the same, all-zero nonce.
pub fn encrypt_with_fixed_nonce<T: AsRef<[u8]>>(plaintexts: &[T], key: &Key) -> Vec<Vec<u8>> {
    let nonce = [0u8; 8];
    plaintexts
        .iter()
        .map(|plaintext| aes_128_ctr(plaintext.as_ref(), key, &nonce, 0))
        .collect()
}

/// The keystream implied by `guess` being the start of `ciphertext`'s
/// plaintext. Only as long as the shorter of the two.
pub fn keystream_from_guess(ciphertext: &[u8], guess: &[u8]) -> Vec<u8> {
    ciphertext.iter().zip(guess).map(|(c, g)| c ^ g).collect()
}

/// Decrypt as much of each ciphertext as `keystream` covers.
pub fn apply_keystream<T: AsRef<[u8]>>(ciphertexts: &[T], keystream: &[u8]) -> Vec<Vec<u8>> {
    ciphertexts
        .iter()
        .map(|ciphertext| {
            ciphertext
                .as_ref()
                .iter()
                .zip(keystream)
                .map(|(c, k)| c ^ k)
                .collect()
        })
        .collect()
}

/// Mean Englishness of the partial decryptions under `keystream`.
pub fn score_guess<T: AsRef<[u8]>>(ciphertexts: &[T], keystream: &[u8]) -> f64 {
    if ciphertexts.is_empty() {
        return 0.0;
    }
    let total: f64 = apply_keystream(ciphertexts, keystream)
        .iter()
        .map(|plaintext| score_english_by_frequency(plaintext))
        .sum();
    total / ciphertexts.len() as f64
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixedNonceCrack {
    /// Recovered keystream, as long as the shortest ciphertext.
    pub keystream: Vec<u8>,
    /// Each ciphertext decrypted as far as the keystream reaches.
    pub plaintexts: Vec<Vec<u8>>,
}

/// Recover the shared keystream statistically.
///
/// Everything past the shortest ciphertext is dropped: a column needs a byte
/// from every message to be scored fairly.
#[instrument(skip_all, fields(n = ciphertexts.len()))]
pub fn break_fixed_nonce_ctr<T: AsRef<[u8]>>(ciphertexts: &[T]) -> Result<FixedNonceCrack> {
    let key_size = ciphertexts
        .iter()
        .map(|c| c.as_ref().len())
        .min()
        .unwrap_or(0);
    if key_size == 0 {
        return Err(Error::InsufficientCiphertext { len: 0 });
    }
    debug!(key_size, "truncating ciphertexts");

    let joined: Vec<u8> = ciphertexts
        .iter()
        .flat_map(|c| c.as_ref()[..key_size].iter().copied())
        .collect();
    let keystream = crack_with_key_size(&joined, key_size);
    let plaintexts = apply_keystream(ciphertexts, &keystream);
    Ok(FixedNonceCrack {
        keystream,
        plaintexts,
    })
}
