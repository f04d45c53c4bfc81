// Conversions between raw bytes, hex and base64.
use base64::{engine::general_purpose::STANDARD, Engine};

use crate::Result;

pub fn hex_to_b64(hex: &str) -> Result<String> {
    let bytes = hex_to_bytes(hex)?;
    Ok(base64_encode(&bytes))
}

pub fn hex_to_bytes(hex: &str) -> Result<Vec<u8>> {
    Ok(hex::decode(hex)?)
}

pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

pub fn base64_encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard, padded base64.
///
/// ASCII whitespace is skipped so line-wrapped files can be decoded directly.
/// Any other character outside the alphabet is an error.
pub fn base64_decode(s: &str) -> Result<Vec<u8>> {
    let compact: String = s.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    use crate::Error;

    #[test]
    fn convert_hex_to_base64() {
        let hex = "49276d206b696c6c696e6720796f757220627261696e206c696b65206120706f69736f6e6f7573206d757368726f6f6d";

        assert_eq!(
            hex_to_b64(hex).unwrap(),
            "SSdtIGtpbGxpbmcgeW91ciBicmFpbiBsaWtlIGEgcG9pc29ub3VzIG11c2hyb29t"
        );
    }

    #[test]
    fn hex_to_bytes_decodes_mixed_case() {
        assert_eq!(hex_to_bytes("0A3f").unwrap(), vec![0x0A, 0x3F]);
    }

    #[rstest]
    #[case("abc")]
    #[case("zz")]
    #[case("0g")]
    fn hex_to_bytes_rejects_invalid_input(#[case] hex: &str) {
        assert!(matches!(hex_to_bytes(hex), Err(Error::InvalidHexInput(_))));
    }

    #[rstest]
    #[case("QUJD", b"ABC")]
    #[case("QmFzZTY0", &[66, 97, 115, 101, 54, 52])]
    #[case("T2ggbXkgZ29zaA==", &[79, 104, 32, 109, 121, 32, 103, 111, 115, 104])]
    #[case("T2ggbXkg\nZ29zaA==\n", &[79, 104, 32, 109, 121, 32, 103, 111, 115, 104])]
    fn base64_decode_returns_expected_bytes(#[case] encoded: &str, #[case] expected: &[u8]) {
        let decoded = base64_decode(encoded).unwrap();

        assert_eq!(decoded, expected);
    }

    #[test]
    fn base64_decode_rejects_unknown_characters() {
        assert!(matches!(
            base64_decode("QU*D"),
            Err(Error::InvalidBase64Input(_))
        ));
    }

    #[test]
    fn bytes_to_hex_is_lowercase() {
        assert_eq!(bytes_to_hex(&[0xDE, 0xAD, 0x01]), "dead01");
    }
}
