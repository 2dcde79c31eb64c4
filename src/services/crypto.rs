//! At-rest encryption for third-party API credentials.
//!
//! AES-256-GCM with a random 96-bit nonce per value. Stored form is
//! `base64(nonce || ciphertext)`.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;
use thiserror::Error;

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("ENCRYPTION_KEY is not configured")]
    MissingKey,
    #[error("encryption key must be 32 bytes of base64, got {0} bytes")]
    BadKeyLength(usize),
    #[error("invalid base64: {0}")]
    Encoding(String),
    #[error("ciphertext is truncated")]
    Truncated,
    #[error("decryption failed (wrong key or tampered data)")]
    Decrypt,
    #[error("encryption failed")]
    Encrypt,
    #[error("decrypted payload is not JSON: {0}")]
    Payload(String),
}

#[derive(Clone)]
pub struct CredentialCipher {
    cipher: Aes256Gcm,
}

impl CredentialCipher {
    pub fn from_base64_key(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::Encoding(e.to_string()))?;
        if bytes.len() != KEY_LEN {
            return Err(CryptoError::BadKeyLength(bytes.len()));
        }
        let key = Key::<Aes256Gcm>::from_slice(&bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Build from the optional configured key
    pub fn from_settings(key: Option<&str>) -> Result<Self, CryptoError> {
        Self::from_base64_key(key.ok_or(CryptoError::MissingKey)?)
    }

    /// Fresh random key, base64 encoded
    pub fn generate_key() -> String {
        STANDARD.encode(Aes256Gcm::generate_key(&mut OsRng))
    }

    pub fn encrypt(&self, data: &Value) -> Result<String, CryptoError> {
        let plaintext = data.to_string();
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(out))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<Value, CryptoError> {
        let raw = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::Encoding(e.to_string()))?;
        if raw.len() <= NONCE_LEN {
            return Err(CryptoError::Truncated);
        }

        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::Decrypt)?;

        serde_json::from_slice(&plaintext).map_err(|e| CryptoError::Payload(e.to_string()))
    }
}
