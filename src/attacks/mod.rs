pub mod cbc_bit_flip;
pub mod cbc_padding_oracle;
pub mod ecb_byte_at_a_time;
pub mod ecb_cut_and_paste;
pub mod ecb_detection;
pub mod fixed_nonce_ctr;
pub mod repeating_xor;
pub mod single_byte_xor;
