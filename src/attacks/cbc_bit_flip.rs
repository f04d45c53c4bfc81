// CBC bitflipping attacks
//
// CBC decrypts block i as
//
//                 P_i = D(C_i) ⊕ C_{i-1}.
//
// Flipping a bit of C_{i-1} flips the same bit of P_i and scrambles P_{i-1}.
// If we know the plaintext P_i we can therefore turn it into any plaintext F
// of our choosing by setting
//
//                 C_{i-1} := C_{i-1} ⊕ P_i ⊕ F.
//
// The server strips `;` and `=` from our input so we can't send
// `;admin=true` directly. We send harmless filler instead and flip it into
// `;admin=true` afterwards.

use tracing::{debug, instrument};

use crate::aes::{Block, Key};
use crate::oracle::EncryptionOracle;
use crate::{decrypt_aes_128_cbc, detect_block_size, encrypt_aes_128_cbc, random_bytes};
use crate::{Error, Result};

/// The server: wraps user data in a fixed query string and encrypts it.
pub struct CbcQueryOracle {
    key: Key,
    iv: Block,
}

impl CbcQueryOracle {
    pub const QUERY_PREFIX: &'static [u8] = b"comment1=cooking%20MCs;userdata=";
    pub const QUERY_SUFFIX: &'static [u8] = b";comment2=%20like%20a%20pound%20of%20bacon";

    pub fn new(key: Key, iv: Block) -> Self {
        Self { key, iv }
    }

    pub fn random() -> Self {
        Self::new(random_bytes(), random_bytes())
    }

    /// Decrypt a query and check whether it grants admin rights.
    pub fn is_admin(&self, ciphertext: &[u8]) -> Result<bool> {
        let plaintext = decrypt_aes_128_cbc(ciphertext, &self.key, &self.iv)?;
        Ok(plaintext
            .split(|b| *b == b';')
            .any(|field| field == b"admin=true"))
    }
}

impl EncryptionOracle for CbcQueryOracle {
    fn encrypt(&self, input: &[u8]) -> Result<Vec<u8>> {
        let user_data: Vec<u8> = input
            .iter()
            .copied()
            .filter(|b| !matches!(b, b';' | b'='))
            .collect();
        let plaintext = [Self::QUERY_PREFIX, &user_data, Self::QUERY_SUFFIX].concat();
        Ok(encrypt_aes_128_cbc(&plaintext, &self.key, &self.iv))
    }
}

/// Rewrite the plaintext at `offset` from `known` to `desired`.
///
/// `offset` indexes the full plaintext. The bytes flipped live in the
/// preceding ciphertext block, so `offset` must be past the first block.
pub fn flip_bytes(
    ciphertext: &[u8],
    offset: usize,
    known: &[u8],
    desired: &[u8],
    block_size: usize,
) -> Result<Vec<u8>> {
    if known.len() != desired.len() {
        return Err(Error::LengthMismatch {
            left: known.len(),
            right: desired.len(),
        });
    }
    if offset < block_size || offset + known.len() > ciphertext.len() {
        return Err(Error::FlipOutOfRange { offset });
    }

    let mut flipped = ciphertext.to_vec();
    for (i, (k, d)) in known.iter().zip(desired).enumerate() {
        flipped[offset + i - block_size] ^= k ^ d;
    }
    Ok(flipped)
}

/// Forge a query ciphertext that the server reads as `admin=true`.
///
/// `prefix_len` is the length of the fixed text the server puts in front of
/// our input.
#[instrument(skip_all)]
pub fn forge_admin_cbc_ciphertext<O: EncryptionOracle>(
    oracle: &O,
    prefix_len: usize,
) -> Result<Vec<u8>> {
    let block_size = detect_block_size(oracle)?;

    // Pad our input out so the target block starts on a block boundary, and
    // make sure there is a block before it to flip.
    let mut n_fill = (block_size - prefix_len % block_size) % block_size;
    if prefix_len + n_fill < block_size {
        n_fill += block_size;
    }
    let offset = prefix_len + n_fill;
    debug!(block_size, offset, "target block located");

    let desired = b";admin=true";
    let target: Vec<u8> = std::iter::repeat(b'A')
        .take(block_size - desired.len())
        .chain(desired.iter().copied())
        .collect();
    let known = vec![b'A'; block_size];

    let ciphertext = oracle.encrypt(&vec![b'A'; n_fill + block_size])?;
    flip_bytes(&ciphertext, offset, &known, &target, block_size)
}
