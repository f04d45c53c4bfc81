// ECB cut-and-paste
//
// The server hands out encrypted profiles `email=...&uid=10&role=user` for any
// email we like, stripping `&` and `=` so we can't inject a role directly.
// Under ECB every block decrypts on its own, so we can build a profile from
// blocks taken out of different ciphertexts.

use std::collections::HashMap;
use std::fmt::Display;

use tracing::{debug, instrument};

use crate::aes::{Key, BLOCK_SIZE};
use crate::oracle::EncryptionOracle;
use crate::{decrypt_aes_128_ecb, detect_block_size, encrypt_aes_128_ecb, pkcs7_pad, pkcs7_unpad};
use crate::{Error, Result};

const EMAIL_FIELD_PREFIX: &str = "email=";
const DEFAULT_UID: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub email: String,
    pub uid: u32,
    pub role: String,
}

impl UserProfile {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            email: email.to_string(),
            uid: DEFAULT_UID,
            role: role.to_string(),
        }
    }

    /// A plain user profile. Metacharacters are stripped from the email.
    pub fn profile_for(email: &str) -> Self {
        let email: String = email.chars().filter(|c| !matches!(c, '&' | '=')).collect();
        Self::new(&email, "user")
    }
}

impl Display for UserProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{EMAIL_FIELD_PREFIX}{}&uid={}&role={}",
            self.email, self.uid, self.role
        )
    }
}

impl TryFrom<&str> for UserProfile {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        let parsed = parse_query(value);
        let field = |name: &str| {
            parsed
                .get(name)
                .cloned()
                .ok_or_else(|| Error::MalformedProfile(format!("{name} not parsed from query")))
        };
        Ok(Self {
            email: field("email")?,
            uid: field("uid")?
                .parse::<u32>()
                .map_err(|e| Error::MalformedProfile(format!("cannot parse uid: {e}")))?,
            role: field("role")?,
        })
    }
}

/// Parse `k1=v1&k2=v2` into a map. Pairs without `=` are skipped.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// The server: encrypts profiles for given emails and reads them back.
pub struct ProfileOracle {
    key: Key,
}

impl ProfileOracle {
    pub fn new(key: Key) -> Self {
        Self { key }
    }

    pub fn encrypted_profile_for(&self, email: &str) -> Vec<u8> {
        let profile = UserProfile::profile_for(email);
        encrypt_aes_128_ecb(profile.to_string().as_bytes(), &self.key)
    }

    pub fn decrypt_profile(&self, ciphertext: &[u8]) -> Result<UserProfile> {
        let padded = decrypt_aes_128_ecb(ciphertext, &self.key)?;
        let encoded = pkcs7_unpad(&padded, BLOCK_SIZE as u8)?;
        UserProfile::try_from(String::from_utf8_lossy(&encoded).as_ref())
    }
}

impl EncryptionOracle for ProfileOracle {
    fn encrypt(&self, input: &[u8]) -> Result<Vec<u8>> {
        Ok(self.encrypted_profile_for(&String::from_utf8_lossy(input)))
    }
}

/// Forge a ciphertext that decrypts to a profile with `role=admin`.
#[instrument(skip_all)]
pub fn forge_admin_profile<O: EncryptionOracle>(oracle: &O) -> Result<Vec<u8>> {
    let block_size = detect_block_size(oracle)?;
    debug!(block_size, "detected block size");

    // Cut: fill the rest of the 'email=' block, then a block that is exactly
    // 'admin' and its padding. That block encrypts to what a final
    // 'admin' block would.
    let n_fill = (block_size - EMAIL_FIELD_PREFIX.len() % block_size) % block_size;
    let admin_block_idx = (EMAIL_FIELD_PREFIX.len() + n_fill) / block_size;
    let cut_email = [vec![b'A'; n_fill], pkcs7_pad(b"admin", block_size as u8)].concat();
    let cut_ciphertext = oracle.encrypt(&cut_email)?;
    let admin_block = cut_ciphertext
        .get(admin_block_idx * block_size..(admin_block_idx + 1) * block_size)
        .ok_or(Error::BlockSizeNotFound)?;

    // Paste: choose an email length that leaves 'user' alone in the final
    // block. The output grows by a block once the profile fills its last
    // block exactly, and four more bytes then push 'user' over the edge.
    let initial_len = oracle.encrypt(b"")?.len();
    let mut n_align = None;
    for n in 1..=block_size {
        if oracle.encrypt(&vec![b'A'; n])?.len() > initial_len {
            n_align = Some(n);
            break;
        }
    }
    let n_align = n_align.ok_or(Error::BlockSizeNotFound)?;
    let paste_email = vec![b'A'; n_align + "user".len()];
    let paste_ciphertext = oracle.encrypt(&paste_email)?;
    debug!(
        email_len = paste_email.len(),
        "aligned role value to final block"
    );

    let keep = paste_ciphertext.len() - block_size;
    Ok([&paste_ciphertext[..keep], admin_block].concat())
}
