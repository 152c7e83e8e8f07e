//! Optional password protection for a container.
//!
//! The key is a single SHA-256 of the UTF-8 password, with no salt and no
//! iteration. That is cheap to brute force offline, but links already in
//! circulation were sealed this way, so it must not change without a new
//! marker. The cipher is AES-256-GCM with a random 96-bit nonce:
//!
//! ```text
//! "ENC:" | nonce (12) | ciphertext | tag (16)
//! ```

use crate::error::CodecError;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use log::debug;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Prefix that marks a sealed payload.
pub const MARKER: &[u8; 4] = b"ENC:";
/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;
/// AES-GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

fn derive_key(password: &str) -> Zeroizing<[u8; 32]> {
    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&Sha256::digest(password.as_bytes()));
    key
}

fn cipher_for(password: &str) -> Aes256Gcm {
    let key = derive_key(password);
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]))
}

/// Encrypts `plaintext`, returning nonce, ciphertext and tag.
pub fn seal(plaintext: &[u8], password: &str) -> Result<Vec<u8>, CodecError> {
    use rand::RngCore;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    let ciphertext = cipher_for(password)
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|_| CodecError::EncryptionFailed)?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Decrypts the output of [`seal`].
///
/// A wrong password, a flipped bit and an input too short to hold a nonce
/// and tag all fail the same way, with [`CodecError::AuthenticationFailed`].
pub fn open(sealed: &[u8], password: &str) -> Result<Vec<u8>, CodecError> {
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(CodecError::AuthenticationFailed);
    }

    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
    cipher_for(password)
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CodecError::AuthenticationFailed)
}

/// Seals `container` behind [`MARKER`] when a non-empty password is given,
/// otherwise hands it back untouched.
pub fn maybe_seal(container: Vec<u8>, password: Option<&str>) -> Result<Vec<u8>, CodecError> {
    match password {
        Some(password) if !password.is_empty() => {
            let sealed = seal(&container, password)?;
            debug!(
                "sealed {} byte container into {} bytes",
                container.len(),
                MARKER.len() + sealed.len()
            );

            let mut out = Vec::with_capacity(MARKER.len() + sealed.len());
            out.extend_from_slice(MARKER);
            out.extend_from_slice(&sealed);
            Ok(out)
        }
        _ => Ok(container),
    }
}

pub fn is_sealed(data: &[u8]) -> bool {
    data.len() >= MARKER.len() && data[..MARKER.len()] == MARKER[..]
}

/// Returns the bytes after the marker, or `None` when `data` is not sealed.
pub fn strip_marker(data: &[u8]) -> Option<&[u8]> {
    if is_sealed(data) {
        Some(&data[MARKER.len()..])
    } else {
        None
    }
}
