// Scoring how much a byte string looks like English text.
//
// We compare the character distribution of the candidate with a reference
// distribution of English using the Bhattacharyya coefficient: for each
// character, multiply its frequency in the candidate with its frequency in
// English and take the square root, then sum over all characters. Identical
// distributions score 1, disjoint ones score 0.
//
// Letters are counted case-insensitively and the space character is part of
// the table. Anything else (digits, punctuation, control bytes) has a
// reference frequency of zero, so it only dilutes the score. That matters
// when brute forcing XOR keys: flipping bit 5 of a key byte swaps the case of
// every letter, but it also turns spaces into NUL bytes, so the wrong-case key
// loses.

/// Approximate frequency of each character in English text, as
/// `(character, probability)`.
pub const FREQUENCY_TABLE: [(u8, f64); 27] = [
    (b' ', 0.12705),
    (b'a', 0.08167),
    (b'b', 0.01492),
    (b'c', 0.02782),
    (b'd', 0.04253),
    (b'e', 0.12702),
    (b'f', 0.02228),
    (b'g', 0.02015),
    (b'h', 0.06094),
    (b'i', 0.06966),
    (b'j', 0.00153),
    (b'k', 0.00772),
    (b'l', 0.04025),
    (b'm', 0.02406),
    (b'n', 0.06749),
    (b'o', 0.07507),
    (b'p', 0.01929),
    (b'q', 0.00095),
    (b'r', 0.05987),
    (b's', 0.06327),
    (b't', 0.09056),
    (b'u', 0.02758),
    (b'v', 0.00978),
    (b'w', 0.02360),
    (b'x', 0.00150),
    (b'y', 0.01974),
    (b'z', 0.00074),
];

fn reference_frequency(byte: u8) -> f64 {
    let idx = match byte {
        b' ' => 0,
        b'a'..=b'z' => (byte - b'a') as usize + 1,
        _ => return 0.0,
    };
    FREQUENCY_TABLE[idx].1
}

/// Score `bytes` by how closely its character distribution matches English.
///
/// Higher is more English-like. The value is only meaningful for ranking
/// candidates against each other.
pub fn score_english_by_frequency(bytes: &[u8]) -> f64 {
    if bytes.is_empty() {
        return 0.0;
    }

    let mut counts = [0u32; 256];
    for &b in bytes {
        counts[b.to_ascii_lowercase() as usize] += 1;
    }

    let total = bytes.len() as f64;
    counts
        .iter()
        .enumerate()
        .filter(|(_, &count)| count > 0)
        .map(|(byte, &count)| (reference_frequency(byte as u8) * count as f64 / total).sqrt())
        .sum()
}
