// Single-block AES-128, backed by the `aes` crate.
//
// Everything else in the crate builds modes of operation on top of these two
// block operations, so this is the only place that touches the cipher
// directly.
use ::aes::cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
use ::aes::Aes128;

pub const BLOCK_SIZE: usize = 16;
pub const KEY_SIZE: usize = 16;

pub type Key = [u8; KEY_SIZE];
pub type Block = [u8; BLOCK_SIZE];

pub struct AesCipher {
    cipher: Aes128,
}

impl AesCipher {
    pub fn new(key: &Key) -> Self {
        Self {
            cipher: Aes128::new(GenericArray::from_slice(key)),
        }
    }

    pub fn encrypt_block(&self, plaintext: &Block) -> Block {
        let mut block = *plaintext;
        self.cipher
            .encrypt_block(GenericArray::from_mut_slice(&mut block));
        block
    }

    pub fn decrypt_block(&self, ciphertext: &Block) -> Block {
        let mut block = *ciphertext;
        self.cipher
            .decrypt_block(GenericArray::from_mut_slice(&mut block));
        block
    }
}
