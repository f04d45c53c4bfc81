// PKCS#7 padding.
use crate::{Error, Result};

/// Pad to a multiple of `block_size`.
///
/// Input that is already block-aligned gains a whole block of padding, so the
/// output is never the unpadded input.
pub fn pkcs7_pad(bytes: &[u8], block_size: u8) -> Vec<u8> {
    let remainder = (bytes.len() % block_size as usize) as u8;
    let n_pad = block_size - remainder;
    let mut out = Vec::with_capacity(bytes.len() + n_pad as usize);
    out.extend_from_slice(bytes);
    out.resize(bytes.len() + n_pad as usize, n_pad);
    out
}

/// Validate and strip PKCS#7 padding, returning the unpadded bytes.
pub fn pkcs7_unpad(bytes: &[u8], block_size: u8) -> Result<Vec<u8>> {
    let n_pad = is_pkcs7_padded(bytes, block_size).ok_or(Error::InvalidPadding)?;
    Ok(bytes[..bytes.len() - n_pad as usize].to_vec())
}

/// Return the padding length if `bytes` ends in valid PKCS#7 padding.
pub fn is_pkcs7_padded(bytes: &[u8], block_size: u8) -> Option<u8> {
    let n_pad = *bytes.last()?;
    if n_pad == 0 || n_pad > block_size || n_pad as usize > bytes.len() {
        return None;
    }
    let padded = &bytes[(bytes.len() - n_pad as usize)..];
    padded.iter().all(|&b| b == n_pad).then_some(n_pad)
}
