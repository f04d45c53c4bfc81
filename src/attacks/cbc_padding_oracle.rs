// The CBC padding oracle.
//
// The formula for CBC decryption is
//
//                 P_i = D(C_i) ⊕ C_{i-1}.
//
// If we send the server a two-block ciphertext `X || C_i` for some block `X`
// we control, the last plaintext block it decrypts is
//
//                 P' = D(C_i) ⊕ X = P_i ⊕ C_{i-1} ⊕ X.
//
// The server won't tell us P', only whether it ends in valid padding. But
// that is enough. Vary the last byte of X until the padding is valid; then
// (almost certainly) P' ends in 0x01, so
//
//                 P_i[15] = 0x01 ⊕ C_{i-1}[15] ⊕ X[15].
//
// Knowing P_i[15] we can set X[15] so that P'[15] = 0x02, and vary X[14]
// until P' ends in 0x02 0x02. Repeat for every byte of every block, with the
// IV standing in as C_0.
//
// "Almost certainly": at the last byte, P' could also happen to end in
// 0x02 0x02 (or 0x03 0x03 0x03, ...) and a second guess validates. Changing
// the byte before the one we are guessing breaks those longer paddings but
// leaves a 0x01 alone, so re-checking with it changed leaves the true guess.

use tracing::{debug, instrument, trace};

use crate::aes::{Block, Key, BLOCK_SIZE};
use crate::oracle::PaddingOracle;
use crate::{
    base64_decode, decrypt_aes_128_cbc_raw, encrypt_aes_128_cbc, is_pkcs7_padded, pkcs7_unpad,
    random_bytes, random_range, Error, Result,
};

/// Base64 messages the server picks from.
pub const PLAINTEXTS: [&str; 10] = [
    "MDAwMDAwTm93IHRoYXQgdGhlIHBhcnR5IGlzIGp1bXBpbmc=",
    "MDAwMDAxV2l0aCB0aGUgYmFzcyBraWNrZWQgaW4gYW5kIHRoZSBWZWdhJ3MgYXJlIHB1bXBpbic=",
    "MDAwMDAyUXVpY2sgdG8gdGhlIHBvaW50LCB0byB0aGUgcG9pbnQsIG5vIGZha2luZw==",
    "MDAwMDAzQ29va2luZyBNQydzIGxpa2UgYSBwb3VuZCBvZiBiYWNvbg==",
    "MDAwMDA0QnVybmluZyAnZW0sIGlmIHlvdSBhaW4ndCBxdWljayBhbmQgbmltYmxl",
    "MDAwMDA1SSBnbyBjcmF6eSB3aGVuIEkgaGVhciBhIGN5bWJhbA==",
    "MDAwMDA2QW5kIGEgaGlnaCBoYXQgd2l0aCBhIHNvdXBlZCB1cCB0ZW1wbw==",
    "MDAwMDA3SSdtIG9uIGEgcm9sbCwgaXQncyB0aW1lIHRvIGdvIHNvbG8=",
    "MDAwMDA4b2xsaW4nIGluIG15IGZpdmUgcG9pbnQgb2g=",
    "MDAwMDA5aXRoIG15IHJhZy10b3AgZG93biBzbyBteSBoYWlyIGNhbiBibG93",
];

/// The server: encrypts under a fixed key and IV, and will tell anyone
/// whether a ciphertext decrypts to valid padding.
pub struct CbcPaddingOracle {
    key: Key,
    iv: Block,
}

impl CbcPaddingOracle {
    pub fn new(key: Key, iv: Block) -> Self {
        Self { key, iv }
    }

    pub fn random() -> Self {
        Self::new(random_bytes(), random_bytes())
    }

    /// Encrypt `plaintext`, returning the IV alongside the ciphertext.
    pub fn encrypt(&self, plaintext: &[u8]) -> (Block, Vec<u8>) {
        (self.iv, encrypt_aes_128_cbc(plaintext, &self.key, &self.iv))
    }

    /// Encrypt one of [`PLAINTEXTS`], chosen at random.
    pub fn encrypt_random_plaintext(&self) -> Result<(Block, Vec<u8>)> {
        let encoded = PLAINTEXTS[random_range(0..=PLAINTEXTS.len() - 1)];
        Ok(self.encrypt(&base64_decode(encoded)?))
    }
}

impl PaddingOracle for CbcPaddingOracle {
    fn padding_valid(&self, ciphertext: &[u8]) -> Result<bool> {
        let decrypted = decrypt_aes_128_cbc_raw(ciphertext, &self.key, &self.iv)?;
        Ok(is_pkcs7_padded(&decrypted, BLOCK_SIZE as u8).is_some())
    }
}

/// Decrypt `ciphertext` using nothing but padding checks.
#[instrument(skip_all, fields(len = ciphertext.len()))]
pub fn cbc_padding_oracle_attack<O: PaddingOracle>(
    ciphertext: &[u8],
    iv: &Block,
    oracle: &O,
) -> Result<Vec<u8>> {
    if ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(Error::MisalignedInput {
            len: ciphertext.len(),
            block_size: BLOCK_SIZE,
        });
    }

    let mut previous: Block = *iv;
    let mut plaintext = Vec::with_capacity(ciphertext.len());
    for (block_idx, chunk) in ciphertext.chunks_exact(BLOCK_SIZE).enumerate() {
        let mut block = [0u8; BLOCK_SIZE];
        block.copy_from_slice(chunk);
        let recovered = crack_block(oracle, block_idx, &previous, &block)?;
        debug!(block_idx, "recovered block");
        plaintext.extend_from_slice(&recovered);
        previous = block;
    }
    pkcs7_unpad(&plaintext, BLOCK_SIZE as u8)
}

fn crack_block<O: PaddingOracle>(
    oracle: &O,
    block_idx: usize,
    previous: &Block,
    block: &Block,
) -> Result<Block> {
    let mut recovered = [0u8; BLOCK_SIZE];
    for pad_len in 1..=BLOCK_SIZE {
        let position = BLOCK_SIZE - pad_len;
        let pad = pad_len as u8;

        // Make every byte we already know decrypt to the padding value.
        let mut forged = [0u8; BLOCK_SIZE];
        for k in position + 1..BLOCK_SIZE {
            forged[k] = recovered[k] ^ pad ^ previous[k];
        }

        let mut candidates = valid_guesses(oracle, &mut forged, block, position)?;
        if candidates.len() > 1 && position > 0 {
            forged[position - 1] ^= 0xff;
            candidates = candidates
                .into_iter()
                .filter_map(|guess| {
                    forged[position] = guess;
                    match padding_valid(oracle, &forged, block) {
                        Ok(true) => Some(Ok(guess)),
                        Ok(false) => None,
                        Err(e) => Some(Err(e)),
                    }
                })
                .collect::<Result<Vec<u8>>>()?;
        }

        let guess = match candidates.as_slice() {
            [guess] => *guess,
            [] => {
                return Err(Error::ByteRecoveryFailed {
                    position: block_idx * BLOCK_SIZE + position,
                })
            }
            _ => {
                return Err(Error::AmbiguousPaddingGuess {
                    block: block_idx,
                    position,
                    candidates: candidates.len(),
                })
            }
        };
        recovered[position] = guess ^ pad ^ previous[position];
        trace!(block_idx, position, byte = recovered[position], "recovered byte");
    }
    Ok(recovered)
}

fn valid_guesses<O: PaddingOracle>(
    oracle: &O,
    forged: &mut Block,
    block: &Block,
    position: usize,
) -> Result<Vec<u8>> {
    let mut guesses = Vec::new();
    for guess in 0..=255u8 {
        forged[position] = guess;
        if padding_valid(oracle, forged, block)? {
            guesses.push(guess);
        }
    }
    Ok(guesses)
}

fn padding_valid<O: PaddingOracle>(oracle: &O, forged: &Block, block: &Block) -> Result<bool> {
    oracle.padding_valid(&[forged.as_slice(), block.as_slice()].concat())
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    use crate::attacks::test_support::init_tracing;

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    #[case(4)]
    #[case(5)]
    #[case(6)]
    #[case(7)]
    #[case(8)]
    #[case(9)]
    fn cbc_padding_oracle_attack_recovers_plaintext(#[case] idx: usize) {
        init_tracing();
        let expected = base64_decode(PLAINTEXTS[idx]).unwrap();
        // Fresh keys each round, so the ambiguous-guess path gets exercised
        // now and then.
        for _ in 0..3 {
            let oracle = CbcPaddingOracle::random();
            let (iv, ciphertext) = oracle.encrypt(&expected);

            let plaintext = cbc_padding_oracle_attack(&ciphertext, &iv, &oracle).unwrap();

            assert_eq!(plaintext, expected);
        }
    }

    #[test]
    fn cbc_padding_oracle_attack_on_random_plaintext() {
        let oracle = CbcPaddingOracle::random();
        let (iv, ciphertext) = oracle.encrypt_random_plaintext().unwrap();

        let plaintext = cbc_padding_oracle_attack(&ciphertext, &iv, &oracle).unwrap();

        let known: Vec<Vec<u8>> = PLAINTEXTS
            .iter()
            .map(|p| base64_decode(p).unwrap())
            .collect();
        assert!(known.contains(&plaintext));
    }

    #[test]
    fn cbc_padding_oracle_attack_resolves_ambiguous_last_byte() {
        let plaintext = b"sixteen byte msgXY";
        // With a zeroed forged block the second-to-last byte decrypts to 0x02,
        // so a trailing 0x02 validates alongside the trailing 0x01.
        let mut iv = [0u8; BLOCK_SIZE];
        iv[14] = plaintext[14] ^ 0x02;
        let oracle = CbcPaddingOracle::new([2u8; 16], iv);
        let (iv, ciphertext) = oracle.encrypt(plaintext);

        let mut first_block = [0u8; BLOCK_SIZE];
        first_block.copy_from_slice(&ciphertext[..BLOCK_SIZE]);
        let guesses = valid_guesses(&oracle, &mut [0u8; BLOCK_SIZE], &first_block, 15).unwrap();
        assert_eq!(guesses.len(), 2);

        let recovered = cbc_padding_oracle_attack(&ciphertext, &iv, &oracle).unwrap();

        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn cbc_padding_oracle_attack_reports_unresolvable_guesses() {
        struct AlwaysValid;

        impl PaddingOracle for AlwaysValid {
            fn padding_valid(&self, _ciphertext: &[u8]) -> Result<bool> {
                Ok(true)
            }
        }

        assert!(matches!(
            cbc_padding_oracle_attack(&[0u8; 32], &[0u8; 16], &AlwaysValid),
            Err(Error::AmbiguousPaddingGuess {
                block: 0,
                position: 15,
                candidates: 256
            })
        ));
    }

    #[test]
    fn padding_oracle_reports_padding_validity() {
        let oracle = CbcPaddingOracle::random();
        let (_, mut ciphertext) = oracle.encrypt(b"sixteen byte msg");

        assert!(oracle.padding_valid(&ciphertext).unwrap());
        // The last block is all padding, 0x10. Flipping the low bit of the
        // block before turns it into 0x11, longer than a block.
        ciphertext[15] ^= 0x01;
        assert!(!oracle.padding_valid(&ciphertext).unwrap());
    }

    #[test]
    fn padding_oracle_rejects_misaligned_queries() {
        let oracle = CbcPaddingOracle::random();

        assert!(matches!(
            oracle.padding_valid(&[0u8; 17]),
            Err(Error::MisalignedInput { .. })
        ));
    }

    #[test]
    fn attack_rejects_misaligned_ciphertext() {
        let oracle = CbcPaddingOracle::random();

        assert!(matches!(
            cbc_padding_oracle_attack(&[0u8; 20], &[0u8; 16], &oracle),
            Err(Error::MisalignedInput { len: 20, .. })
        ));
    }
}
