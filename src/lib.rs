pub mod aes;
pub mod attacks;
mod codec;
mod english;
mod error;
mod modes;
pub mod oracle;
mod padding;
mod random;
mod xor;

pub use codec::{base64_decode, base64_encode, bytes_to_hex, hex_to_b64, hex_to_bytes};
pub use english::{score_english_by_frequency, FREQUENCY_TABLE};
pub use error::{Error, Result};
pub use modes::{
    aes_128_ctr, decrypt_aes_128_cbc, decrypt_aes_128_cbc_raw, decrypt_aes_128_ecb,
    encrypt_aes_128_cbc, encrypt_aes_128_ecb, NONCE_SIZE,
};
pub use oracle::{EncryptionOracle, PaddingOracle};
pub use padding::{is_pkcs7_padded, pkcs7_pad, pkcs7_unpad};
pub use random::{random_bytes, random_bytes_with_seed, random_range, random_vec};
pub use xor::{hamming_distance, repeating_xor_cipher, xor_bytes, xor_with_byte};

pub use attacks::cbc_bit_flip::{flip_bytes, forge_admin_cbc_ciphertext, CbcQueryOracle};
pub use attacks::cbc_padding_oracle::{cbc_padding_oracle_attack, CbcPaddingOracle};
pub use attacks::ecb_byte_at_a_time::{
    byte_at_a_time_ecb_decrypt, confirm_ecb, detect_block_size,
    random_prefix_byte_at_a_time_ecb_decrypt, EcbSuffixOracle,
};
pub use attacks::ecb_cut_and_paste::{forge_admin_profile, ProfileOracle, UserProfile};
pub use attacks::ecb_detection::{
    detect_block_mode, find_ecb_encrypted, has_repeated_block, score_ecb_likelihood, BlockMode,
    RandomModeOracle,
};
pub use attacks::fixed_nonce_ctr::{
    apply_keystream, break_fixed_nonce_ctr, encrypt_with_fixed_nonce, keystream_from_guess,
    score_guess, FixedNonceCrack,
};
pub use attacks::repeating_xor::{
    brute_force_repeating_xor, crack_with_key_size, transpose_blocks, RepeatingXorConfig,
    RepeatingXorCrack,
};
pub use attacks::single_byte_xor::{
    brute_force_byte_xor_cipher, find_byte_xor_encrypted, XorCrackResult,
};
