// Errors shared by the primitives and the attacks built on top of them.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid pkcs7 padding")]
    InvalidPadding,

    #[error("input of length {len} is not a multiple of the block size {block_size}")]
    MisalignedInput { len: usize, block_size: usize },

    #[error("invalid hex input: {0}")]
    InvalidHexInput(#[from] hex::FromHexError),

    #[error("invalid base64 input: {0}")]
    InvalidBase64Input(#[from] base64::DecodeError),

    #[error("buffers are not of equal length ({left} != {right})")]
    LengthMismatch { left: usize, right: usize },

    #[error("could not detect the oracle's block size")]
    BlockSizeNotFound,

    #[error("oracle is not encrypting with ECB")]
    NotEcb,

    #[error("could not locate the end of the oracle's random prefix")]
    PrefixAlignmentNotFound,

    #[error("no candidate matched the plaintext byte at position {position}")]
    ByteRecoveryFailed { position: usize },

    #[error("{candidates} padding guesses remain for byte {position} of block {block}")]
    AmbiguousPaddingGuess {
        block: usize,
        position: usize,
        candidates: usize,
    },

    #[error("ciphertext of length {len} is too short to analyse")]
    InsufficientCiphertext { len: usize },

    #[error("cannot flip plaintext at offset {offset}: no preceding ciphertext block")]
    FlipOutOfRange { offset: usize },

    #[error("malformed profile: {0}")]
    MalformedProfile(String),
}

pub type Result<T> = std::result::Result<T, Error>;
