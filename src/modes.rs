// AES-128 in ECB, CBC and CTR modes.
//
// ECB and CBC encryption always pad. ECB decryption returns the raw decrypted
// blocks and leaves unpadding to the caller; CBC decryption validates and
// strips the padding, with a raw variant for callers that need the padding
// bytes.
use crate::aes::{AesCipher, Block, Key, BLOCK_SIZE};
use crate::{pkcs7_pad, pkcs7_unpad, Error, Result};

pub const NONCE_SIZE: usize = 8;

pub fn encrypt_aes_128_ecb(plaintext: &[u8], key: &Key) -> Vec<u8> {
    let cipher = AesCipher::new(key);
    let padded = pkcs7_pad(plaintext, BLOCK_SIZE as u8);
    let mut ciphertext = Vec::with_capacity(padded.len());
    for block in blocks(&padded) {
        ciphertext.extend_from_slice(&cipher.encrypt_block(&block));
    }
    ciphertext
}

pub fn decrypt_aes_128_ecb(ciphertext: &[u8], key: &Key) -> Result<Vec<u8>> {
    check_aligned(ciphertext)?;
    let cipher = AesCipher::new(key);
    let mut plaintext = Vec::with_capacity(ciphertext.len());
    for block in blocks(ciphertext) {
        plaintext.extend_from_slice(&cipher.decrypt_block(&block));
    }
    Ok(plaintext)
}

pub fn encrypt_aes_128_cbc(plaintext: &[u8], key: &Key, iv: &Block) -> Vec<u8> {
    let cipher = AesCipher::new(key);
    let padded = pkcs7_pad(plaintext, BLOCK_SIZE as u8);
    let mut ciphertext = Vec::with_capacity(padded.len());

    let mut last_block = *iv;
    for mut block in blocks(&padded) {
        xor_in_place(&mut block, &last_block);
        last_block = cipher.encrypt_block(&block);
        ciphertext.extend_from_slice(&last_block);
    }
    ciphertext
}

/// Decrypt CBC and strip the PKCS#7 padding.
///
/// Fails with [`Error::InvalidPadding`] if the decrypted padding is malformed.
pub fn decrypt_aes_128_cbc(ciphertext: &[u8], key: &Key, iv: &Block) -> Result<Vec<u8>> {
    let message = decrypt_aes_128_cbc_raw(ciphertext, key, iv)?;
    pkcs7_unpad(&message, BLOCK_SIZE as u8)
}

/// Decrypt CBC without touching the padding.
pub fn decrypt_aes_128_cbc_raw(ciphertext: &[u8], key: &Key, iv: &Block) -> Result<Vec<u8>> {
    check_aligned(ciphertext)?;
    let cipher = AesCipher::new(key);
    let mut message = Vec::with_capacity(ciphertext.len());

    // Each plaintext block is XOR-ed with the previous *ciphertext* block.
    let mut last_block = *iv;
    for ciphertext_block in blocks(ciphertext) {
        let mut message_block = cipher.decrypt_block(&ciphertext_block);
        xor_in_place(&mut message_block, &last_block);
        message.extend_from_slice(&message_block);
        last_block = ciphertext_block;
    }
    Ok(message)
}

/// AES-128 in CTR mode. Encryption and decryption are the same operation.
///
/// The counter block is the 8-byte nonce followed by the 64-bit block counter
/// in little-endian order. The counter wraps to zero on overflow.
pub fn aes_128_ctr(
    message: &[u8],
    key: &Key,
    nonce: &[u8; NONCE_SIZE],
    initial_counter: u64,
) -> Vec<u8> {
    let cipher = AesCipher::new(key);
    let mut output = Vec::with_capacity(message.len());
    let mut counter = initial_counter;
    let mut ctr_block = [0u8; BLOCK_SIZE];
    ctr_block[..NONCE_SIZE].copy_from_slice(nonce);
    for message_block in message.chunks(BLOCK_SIZE) {
        ctr_block[NONCE_SIZE..].copy_from_slice(&counter.to_le_bytes());
        let keystream = cipher.encrypt_block(&ctr_block);
        output.extend(message_block.iter().zip(keystream).map(|(m, k)| m ^ k));
        counter = counter.wrapping_add(1);
    }
    output
}

fn check_aligned(bytes: &[u8]) -> Result<()> {
    if bytes.len() % BLOCK_SIZE != 0 {
        return Err(Error::MisalignedInput {
            len: bytes.len(),
            block_size: BLOCK_SIZE,
        });
    }
    Ok(())
}

// Callers guarantee `bytes` is block-aligned.
fn blocks(bytes: &[u8]) -> impl Iterator<Item = Block> + '_ {
    bytes.chunks_exact(BLOCK_SIZE).map(|chunk| {
        let mut block = [0u8; BLOCK_SIZE];
        block.copy_from_slice(chunk);
        block
    })
}

fn xor_in_place(block: &mut Block, other: &Block) {
    block.iter_mut().zip(other).for_each(|(b, o)| *b ^= o);
}
