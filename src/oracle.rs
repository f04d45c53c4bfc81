// The narrow views an attacker gets of a server.
//
// Attacks are written against these traits only. The in-process servers in
// `attacks::*` implement them, but anything that can answer the same question
// (a network client, a recorded transcript) can stand in.
use crate::Result;

/// Encrypts attacker-chosen bytes under some fixed, unknown state.
pub trait EncryptionOracle {
    fn encrypt(&self, input: &[u8]) -> Result<Vec<u8>>;
}

/// Reports whether a ciphertext decrypts to correctly padded plaintext.
///
/// Bad padding is an `Ok(false)`, it is the signal the attack feeds on. An
/// `Err` means the query itself was malformed, e.g. not block-aligned.
pub trait PaddingOracle {
    fn padding_valid(&self, ciphertext: &[u8]) -> Result<bool>;
}

impl<T: EncryptionOracle + ?Sized> EncryptionOracle for &T {
    fn encrypt(&self, input: &[u8]) -> Result<Vec<u8>> {
        (**self).encrypt(input)
    }
}

impl<T: PaddingOracle + ?Sized> PaddingOracle for &T {
    fn padding_valid(&self, ciphertext: &[u8]) -> Result<bool> {
        (**self).padding_valid(ciphertext)
    }
}
