// Byte-at-a-time ECB decryption.
//
// The server encrypts `prefix || attacker input || secret` under ECB with a
// fixed key. In the simple case the prefix is empty, in the harder case it is
// a fixed number of random bytes we don't know.
//
// The trick is to choose an input length that pushes exactly one unknown byte
// of the secret into the last position of a block we know everything else
// about. With `block_size - 1` filler bytes, the first block of the
// ciphertext is `Enc(AAAAAAAAAAAAAAA || s0)`. We then ask the oracle to
// encrypt `AAAAAAAAAAAAAAA || g` for every byte `g` until one of them
// produces the same block, and that `g` is `s0`. For the next byte we send
// one less filler byte, so the block becomes `AAAAAAAAAAAAAA || s0 || s1`,
// and guess `AAAAAAAAAAAAAA || s0 || g`. Once a whole block is known the
// window just slides along: the last 15 recovered bytes plus a guess.
//
// With a random prefix, we first work out how many filler bytes complete the
// prefix's last block and which block our input then starts at. From there
// the simple attack runs unchanged, with those filler bytes always in front
// and the comparison moved to that block.

use tracing::{debug, instrument, trace};

use crate::aes::{Key, BLOCK_SIZE};
use crate::oracle::EncryptionOracle;
use crate::{encrypt_aes_128_ecb, has_repeated_block, random_bytes, random_range, random_vec};
use crate::{Error, Result};

/// Longest run of input fed to an oracle while waiting for its output to grow.
pub const MAX_BLOCK_SIZE_PROBE: usize = 256;

/// Filler bytes tried, in order, when locating the end of a random prefix.
pub const PREFIX_FILLER_BYTES: &[u8] = b"ABCDEFGH";

const FILLER: u8 = b'A';

/// The server: encrypts `prefix || input || secret` under a fixed key.
pub struct EcbSuffixOracle {
    key: Key,
    prefix: Vec<u8>,
    secret: Vec<u8>,
}

impl EcbSuffixOracle {
    pub fn new(key: Key, secret: Vec<u8>) -> Self {
        Self::with_prefix(key, Vec::new(), secret)
    }

    pub fn with_prefix(key: Key, prefix: Vec<u8>, secret: Vec<u8>) -> Self {
        Self {
            key,
            prefix,
            secret,
        }
    }

    /// An oracle with a random key and up to sixteen blocks of random prefix.
    pub fn with_random_prefix(secret: Vec<u8>) -> Self {
        let prefix = random_vec(random_range(1..=16 * BLOCK_SIZE));
        Self::with_prefix(random_bytes(), prefix, secret)
    }
}

impl EncryptionOracle for EcbSuffixOracle {
    fn encrypt(&self, input: &[u8]) -> Result<Vec<u8>> {
        let plaintext = [self.prefix.as_slice(), input, &self.secret].concat();
        Ok(encrypt_aes_128_ecb(&plaintext, &self.key))
    }
}

/// Feed the oracle ever longer inputs until its output grows. The size of
/// that step is the block size.
pub fn detect_block_size<O: EncryptionOracle>(oracle: &O) -> Result<usize> {
    let initial_len = oracle.encrypt(&[])?.len();
    for n in 1..=MAX_BLOCK_SIZE_PROBE {
        let len = oracle.encrypt(&vec![FILLER; n])?.len();
        if len > initial_len {
            return Ok(len - initial_len);
        }
    }
    Err(Error::BlockSizeNotFound)
}

/// Check the oracle uses ECB: five blocks of identical input must produce
/// repeated ciphertext blocks.
pub fn confirm_ecb<O: EncryptionOracle>(oracle: &O, block_size: usize) -> Result<()> {
    let ciphertext = oracle.encrypt(&vec![FILLER; 5 * block_size])?;
    if has_repeated_block(&ciphertext, block_size) {
        Ok(())
    } else {
        Err(Error::NotEcb)
    }
}

#[instrument(skip_all)]
pub fn byte_at_a_time_ecb_decrypt<O: EncryptionOracle>(oracle: &O) -> Result<Vec<u8>> {
    let block_size = detect_block_size(oracle)?;
    debug!(block_size, "detected block size");
    confirm_ecb(oracle, block_size)?;

    let alignment = Alignment {
        pad: 0,
        start_block: 0,
    };
    recover_secret(oracle, block_size, alignment)
}

#[instrument(skip_all)]
pub fn random_prefix_byte_at_a_time_ecb_decrypt<O: EncryptionOracle>(
    oracle: &O,
) -> Result<Vec<u8>> {
    let block_size = detect_block_size(oracle)?;
    debug!(block_size, "detected block size");
    confirm_ecb(oracle, block_size)?;

    let alignment = find_prefix_alignment(oracle, block_size)?;
    debug!(
        pad = alignment.pad,
        start_block = alignment.start_block,
        "aligned past random prefix"
    );
    recover_secret(oracle, block_size, alignment)
}

/// Where the attacker's input can start on a block boundary.
///
/// Sending `pad` filler bytes completes the prefix's last block, after which
/// the next input byte is the first byte of block `start_block`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Alignment {
    pad: usize,
    start_block: usize,
}

// The filler byte could coincide with the bytes around our input (the end of
// the prefix or the start of the secret) and make the measurement come out
// wrong. Only trust an answer once two different fillers agree on it.
fn find_prefix_alignment<O: EncryptionOracle>(oracle: &O, block_size: usize) -> Result<Alignment> {
    let first_block = first_changed_block(oracle, block_size)?;
    let mut seen = Vec::new();
    for &filler in PREFIX_FILLER_BYTES {
        let Some(alignment) = align_with_filler(oracle, block_size, first_block, filler)? else {
            continue;
        };
        if seen.contains(&alignment) {
            return Ok(alignment);
        }
        trace!(filler, ?alignment, "candidate alignment");
        seen.push(alignment);
    }
    Err(Error::PrefixAlignmentNotFound)
}

// Blocks before the one holding our first input byte are pure prefix and never
// change. Duplicates among them must not be mistaken for our filler.
fn first_changed_block<O: EncryptionOracle>(oracle: &O, block_size: usize) -> Result<usize> {
    let c1 = oracle.encrypt(b"0")?;
    let c2 = oracle.encrypt(b"1")?;
    c1.chunks(block_size)
        .zip(c2.chunks(block_size))
        .position(|(a, b)| a != b)
        .ok_or(Error::PrefixAlignmentNotFound)
}

// Four blocks of filler always contain two whole, identical, adjacent blocks.
// The first such pair starts where our input begins on a block boundary. We
// then shrink the filler a byte at a time, watching only that pair: it stays
// equal until the filler is one byte short of `pad + 2 * block_size`. Repeats
// further on, inside the secret, don't count.
fn align_with_filler<O: EncryptionOracle>(
    oracle: &O,
    block_size: usize,
    first_block: usize,
    filler: u8,
) -> Result<Option<Alignment>> {
    let payload_len = 4 * block_size;
    let ciphertext = oracle.encrypt(&vec![filler; payload_len])?;
    let Some(start_block) = first_adjacent_duplicate(&ciphertext, block_size, first_block) else {
        return Ok(None);
    };

    // Shortest filler that still keeps the pair equal.
    let mut shortest = payload_len;
    while shortest > 0 {
        let ciphertext = oracle.encrypt(&vec![filler; shortest - 1])?;
        if !blocks_equal(&ciphertext, block_size, start_block) {
            break;
        }
        shortest -= 1;
    }
    if shortest == 0 {
        return Ok(None);
    }

    Ok(shortest
        .checked_sub(2 * block_size)
        .filter(|&pad| pad < block_size)
        .map(|pad| Alignment { pad, start_block }))
}

fn blocks_equal(ciphertext: &[u8], block_size: usize, index: usize) -> bool {
    match (
        block_at(ciphertext, index, block_size),
        block_at(ciphertext, index + 1, block_size),
    ) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn first_adjacent_duplicate(ciphertext: &[u8], block_size: usize, from: usize) -> Option<usize> {
    let blocks: Vec<&[u8]> = ciphertext.chunks_exact(block_size).collect();
    blocks
        .windows(2)
        .skip(from)
        .position(|pair| pair[0] == pair[1])
        .map(|idx| idx + from)
}

// The output grows by a block once input plus secret overflow the padding.
// The input length that triggers it tells us exactly how many padding bytes
// there were, and so the secret's exact length.
fn secret_length<O: EncryptionOracle>(
    oracle: &O,
    block_size: usize,
    alignment: Alignment,
) -> Result<usize> {
    let base_len = oracle.encrypt(&vec![FILLER; alignment.pad])?.len();
    for i in 1..=block_size {
        let len = oracle.encrypt(&vec![FILLER; alignment.pad + i])?.len();
        if len > base_len {
            return Ok(base_len.saturating_sub(alignment.start_block * block_size + i));
        }
    }
    Err(Error::BlockSizeNotFound)
}

fn recover_secret<O: EncryptionOracle>(
    oracle: &O,
    block_size: usize,
    alignment: Alignment,
) -> Result<Vec<u8>> {
    let secret_len = secret_length(oracle, block_size, alignment)?;
    debug!(secret_len, "measured secret length");

    let mut recovered: Vec<u8> = Vec::with_capacity(secret_len);
    for position in 0..secret_len {
        let byte = crack_next_byte(oracle, block_size, alignment, &recovered)?;
        trace!(position, byte, "recovered byte");
        recovered.push(byte);
    }
    Ok(recovered)
}

fn crack_next_byte<O: EncryptionOracle>(
    oracle: &O,
    block_size: usize,
    alignment: Alignment,
    recovered: &[u8],
) -> Result<u8> {
    let position = recovered.len();
    let n_filler = block_size - 1 - position % block_size;
    let target_block = alignment.start_block + position / block_size;

    let ciphertext = oracle.encrypt(&vec![FILLER; alignment.pad + n_filler])?;
    let target = block_at(&ciphertext, target_block, block_size)
        .ok_or(Error::ByteRecoveryFailed { position })?
        .to_vec();

    // The 'block_size - 1' bytes in front of the unknown byte.
    let known: Vec<u8> = std::iter::repeat(FILLER)
        .take(block_size - 1)
        .chain(recovered.iter().copied())
        .collect();
    let window = &known[known.len() - (block_size - 1)..];

    let mut guess_input = [vec![FILLER; alignment.pad], window.to_vec(), vec![0]].concat();
    for guess in 0..=255u8 {
        if let Some(last) = guess_input.last_mut() {
            *last = guess;
        }
        let ciphertext = oracle.encrypt(&guess_input)?;
        if block_at(&ciphertext, alignment.start_block, block_size) == Some(target.as_slice()) {
            return Ok(guess);
        }
    }
    Err(Error::ByteRecoveryFailed { position })
}

fn block_at(bytes: &[u8], index: usize, block_size: usize) -> Option<&[u8]> {
    bytes.get(index * block_size..(index + 1) * block_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    use crate::attacks::test_support::init_tracing;
    use crate::{base64_decode, encrypt_aes_128_cbc};

    const UNKNOWN_STRING: &str = "Um9sbGluJyBpbiBteSA1LjAKV2l0aCBteSByYWctdG9wIGRvd24gc28gbXkg\
aGFpciBjYW4gYmxvdwpUaGUgZ2lybGllcyBvbiBzdGFuZGJ5IHdhdmluZyBq\
dXN0IHRvIHNheSBoaQpEaWQgeW91IHN0b3A/IE5vLCBJIGp1c3QgZHJvdmUg\
YnkK";

    fn secret() -> Vec<u8> {
        base64_decode(UNKNOWN_STRING).unwrap()
    }

    struct CbcSuffixOracle {
        key: Key,
        secret: Vec<u8>,
    }

    impl EncryptionOracle for CbcSuffixOracle {
        fn encrypt(&self, input: &[u8]) -> Result<Vec<u8>> {
            let plaintext = [input, &self.secret].concat();
            Ok(encrypt_aes_128_cbc(&plaintext, &self.key, &[0u8; 16]))
        }
    }

    struct FixedLengthOracle;

    impl EncryptionOracle for FixedLengthOracle {
        fn encrypt(&self, _input: &[u8]) -> Result<Vec<u8>> {
            Ok(vec![0u8; 32])
        }
    }

    #[test]
    fn byte_at_a_time_ecb_decrypt_decrypts_message_with_oracle() {
        init_tracing();
        let oracle = EcbSuffixOracle::new(random_bytes(), secret());

        let secret_bytes = byte_at_a_time_ecb_decrypt(&oracle).unwrap();

        // Exact match, trailing newline included.
        assert_eq!(secret_bytes, secret());
        assert_eq!(secret_bytes.last(), Some(&b'\n'));
    }

    #[test]
    fn detect_block_size_finds_aes_block_size() {
        let oracle = EcbSuffixOracle::new(random_bytes(), secret());

        assert_eq!(detect_block_size(&oracle).unwrap(), BLOCK_SIZE);
    }

    #[test]
    fn detect_block_size_gives_up_on_constant_output() {
        assert!(matches!(
            detect_block_size(&FixedLengthOracle),
            Err(Error::BlockSizeNotFound)
        ));
    }

    #[test]
    fn byte_at_a_time_ecb_decrypt_rejects_cbc_oracle() {
        let oracle = CbcSuffixOracle {
            key: random_bytes(),
            secret: secret(),
        };

        assert!(matches!(
            byte_at_a_time_ecb_decrypt(&oracle),
            Err(Error::NotEcb)
        ));
    }

    #[rstest]
    #[case(b"".to_vec())]
    #[case(b"Z".to_vec())]
    #[case(vec![7u8; 15])]
    #[case(vec![7u8; 16])]
    #[case(vec![7u8; 17])]
    #[case(vec![9u8; 40])]
    #[case(vec![b'A'; 33])]
    // Prefixes ending in the filler byte.
    #[case([vec![3u8; 4], b"A".to_vec()].concat())]
    #[case([vec![3u8; 20], b"AA".to_vec()].concat())]
    fn random_prefix_byte_at_a_time_recovers_secret(#[case] prefix: Vec<u8>) {
        init_tracing();
        let oracle = EcbSuffixOracle::with_prefix(random_bytes(), prefix, secret());

        let secret_bytes = random_prefix_byte_at_a_time_ecb_decrypt(&oracle).unwrap();

        assert_eq!(secret_bytes, secret());
    }

    #[test]
    fn random_prefix_byte_at_a_time_handles_secret_starting_with_filler() {
        let hidden = [b"AAAA".to_vec(), secret()].concat();
        let oracle = EcbSuffixOracle::with_prefix(random_bytes(), vec![1u8; 21], hidden.clone());

        let secret_bytes = random_prefix_byte_at_a_time_ecb_decrypt(&oracle).unwrap();

        assert_eq!(secret_bytes, hidden);
    }

    #[rstest]
    #[case([vec![b'Z'; 64], b"tail text\n".to_vec()].concat())]
    #[case([vec![b'A'; 48], b"tail text\n".to_vec()].concat())]
    #[case([b"head ".to_vec(), vec![0u8; 80], b" tail".to_vec()].concat())]
    fn random_prefix_byte_at_a_time_handles_repeated_blocks_in_secret(#[case] hidden: Vec<u8>) {
        let oracle = EcbSuffixOracle::with_prefix(random_bytes(), vec![1u8; 5], hidden.clone());

        let secret_bytes = random_prefix_byte_at_a_time_ecb_decrypt(&oracle).unwrap();

        assert_eq!(secret_bytes, hidden);
    }

    #[test]
    fn find_prefix_alignment_ignores_repeats_in_secret() {
        let hidden = [vec![b'Z'; 64], b"tail text\n".to_vec()].concat();
        let oracle = EcbSuffixOracle::with_prefix(random_bytes(), vec![1u8; 5], hidden);

        let alignment = find_prefix_alignment(&oracle, 16).unwrap();

        assert_eq!(
            alignment,
            Alignment {
                pad: 11,
                start_block: 1
            }
        );
    }

    #[test]
    fn random_prefix_byte_at_a_time_with_random_oracle() {
        for _ in 0..3 {
            let oracle = EcbSuffixOracle::with_random_prefix(secret());

            let secret_bytes = random_prefix_byte_at_a_time_ecb_decrypt(&oracle).unwrap();

            assert_eq!(secret_bytes, secret());
        }
    }

    #[test]
    fn find_prefix_alignment_completes_the_prefix_block() {
        let oracle = EcbSuffixOracle::with_prefix(random_bytes(), vec![0u8; 21], secret());

        let alignment = find_prefix_alignment(&oracle, 16).unwrap();

        assert_eq!(
            alignment,
            Alignment {
                pad: 11,
                start_block: 2
            }
        );
    }
}
