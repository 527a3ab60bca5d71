//! secrets::crypto
//!
//! Authenticated encryption for data at rest.
//!
//! # Format
//!
//! [`encrypt`] produces `iv:authTag:ciphertext`, each segment lowercase hex:
//! - `iv`: 16 random bytes, fresh for every call
//! - `authTag`: the 16-byte GCM tag
//! - `ciphertext`: same length as the plaintext
//!
//! The cipher is AES-256-GCM with a 128-bit nonce.
//!
//! # Key file
//!
//! The 256-bit key lives hex-encoded in `~/.octocode/.key` with 0600
//! permissions and is generated on first use. Losing the key file makes an
//! existing encrypted document unreadable; there is no recovery path.

use std::fmt;
use std::fs;
use std::path::Path;

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{AeadInPlace, KeyInit, OsRng};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Key, Nonce, Tag};

use super::encrypted_file::write_private_file;
use super::traits::SecretError;

/// Size of the encryption key in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// Size of the IV in bytes (128 bits).
pub const IV_SIZE: usize = 16;

/// Size of the authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// AES-256-GCM with a 16-byte nonce.
type Cipher = AesGcm<Aes256, U16>;

/// A 256-bit symmetric key.
///
/// `Debug` never prints the key material.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; KEY_SIZE]);

impl EncryptionKey {
    /// Generate a new random key from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Build a key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse a hex-encoded key.
    pub fn from_hex(encoded: &str) -> Result<Self, SecretError> {
        let bytes = hex::decode(encoded.trim())
            .map_err(|e| SecretError::ReadError(format!("key file is not valid hex: {}", e)))?;
        let bytes: [u8; KEY_SIZE] = bytes.try_into().map_err(|v: Vec<u8>| {
            SecretError::ReadError(format!(
                "key must be {} bytes, got {} bytes",
                KEY_SIZE,
                v.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Hex encoding, as written to the key file.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Load an existing key from `path`. Never creates or rewrites the file.
    ///
    /// A missing or unparsable key file is a `Decryption` error: nothing
    /// encrypted under it can be read.
    pub fn load(path: &Path) -> Result<Self, SecretError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SecretError::Decryption("key file is missing".into()))
            }
            Err(e) => {
                return Err(SecretError::ReadError(format!(
                    "cannot read key file: {}",
                    e
                )))
            }
        };

        Self::from_hex(&content)
            .map_err(|e| SecretError::Decryption(format!("key file is unusable: {}", e)))
    }

    /// Load the key from `path`, generating and persisting one if absent.
    ///
    /// Only the write path calls this. A key file that exists but cannot be
    /// parsed is replaced with a fresh key.
    pub fn load_or_create(path: &Path) -> Result<Self, SecretError> {
        match fs::read_to_string(path) {
            Ok(content) => match Self::from_hex(&content) {
                Ok(key) => return Ok(key),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "replacing unreadable key file");
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "generating new encryption key");
            }
            Err(e) => {
                return Err(SecretError::ReadError(format!(
                    "cannot read key file: {}",
                    e
                )))
            }
        }

        let key = Self::generate();
        write_private_file(path, key.to_hex().as_bytes())?;
        Ok(key)
    }

    fn cipher(&self) -> Cipher {
        Cipher::new(Key::<Cipher>::from_slice(&self.0))
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EncryptionKey").field(&"[REDACTED]").finish()
    }
}

/// Encrypt `plaintext` into the `iv:authTag:ciphertext` hex format.
pub fn encrypt(plaintext: &str, key: &EncryptionKey) -> Result<String, SecretError> {
    let mut iv = [0u8; IV_SIZE];
    OsRng.fill_bytes(&mut iv);

    let mut buffer = plaintext.as_bytes().to_vec();
    let tag = key
        .cipher()
        .encrypt_in_place_detached(Nonce::<U16>::from_slice(&iv), b"", &mut buffer)
        .map_err(|_| SecretError::WriteError("encryption failed".into()))?;

    Ok(format!(
        "{}:{}:{}",
        hex::encode(iv),
        hex::encode(tag),
        hex::encode(buffer)
    ))
}

/// Decrypt a blob produced by [`encrypt`].
///
/// # Errors
///
/// [`SecretError::Decryption`] if the blob does not have exactly three
/// segments, a segment is not hex, the IV or tag has the wrong length, or the
/// tag does not verify under `key`.
pub fn decrypt(blob: &str, key: &EncryptionKey) -> Result<String, SecretError> {
    let segments: Vec<&str> = blob.trim().split(':').collect();
    let [iv, tag, ciphertext] = segments.as_slice() else {
        return Err(SecretError::Decryption(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    };

    let iv = decode_segment(iv, "iv")?;
    let tag = decode_segment(tag, "auth tag")?;
    let mut buffer = decode_segment(ciphertext, "ciphertext")?;

    if iv.len() != IV_SIZE {
        return Err(SecretError::Decryption(format!(
            "iv must be {} bytes, got {}",
            IV_SIZE,
            iv.len()
        )));
    }
    if tag.len() != TAG_SIZE {
        return Err(SecretError::Decryption(format!(
            "auth tag must be {} bytes, got {}",
            TAG_SIZE,
            tag.len()
        )));
    }

    key.cipher()
        .decrypt_in_place_detached(
            Nonce::<U16>::from_slice(&iv),
            b"",
            &mut buffer,
            Tag::from_slice(&tag),
        )
        .map_err(|_| SecretError::Decryption("authentication tag mismatch".into()))?;

    String::from_utf8(buffer)
        .map_err(|_| SecretError::Decryption("plaintext is not valid UTF-8".into()))
}

fn decode_segment(segment: &str, what: &str) -> Result<Vec<u8>, SecretError> {
    hex::decode(segment).map_err(|e| SecretError::Decryption(format!("{} is not hex: {}", what, e)))
}
