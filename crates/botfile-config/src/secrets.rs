//! Secret sealing using AES-256-GCM
//!
//! Sensitive service fields are stored as base64 of `nonce || ciphertext`.
//! A fresh nonce is drawn for every value, so sealing the same plaintext
//! twice yields different text.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;

use crate::BotFileError;

/// Nonce size for AES-256-GCM (96 bits)
const NONCE_SIZE: usize = 12;

/// Key size for AES-256 (256 bits)
const KEY_SIZE: usize = 32;

/// Key derived from the `--secret` argument
#[derive(Clone)]
pub struct SecretKey {
    key: [u8; KEY_SIZE],
}

impl SecretKey {
    /// Parse a key from a hex or base64 string
    pub fn parse(secret: &str) -> Result<Self, BotFileError> {
        let secret = secret.trim();

        if secret.len() == KEY_SIZE * 2 {
            if let Ok(bytes) = hex::decode(secret) {
                return Self::from_slice(&bytes);
            }
        }

        let bytes = BASE64
            .decode(secret)
            .map_err(|_| BotFileError::bad_secret("secret must be a base64 or hex encoded key"))?;
        Self::from_slice(&bytes)
    }

    fn from_slice(bytes: &[u8]) -> Result<Self, BotFileError> {
        if bytes.len() != KEY_SIZE {
            return Err(BotFileError::bad_secret(format!(
                "secret must decode to {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            )));
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(bytes);
        Ok(Self { key })
    }

    /// Generate a new random secret, base64 encoded
    pub fn generate() -> String {
        let mut key = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut key);
        BASE64.encode(key)
    }

    fn cipher(&self) -> Result<Aes256Gcm, BotFileError> {
        Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| BotFileError::bad_secret(format!("failed to create cipher: {e}")))
    }

    /// Seal a plaintext value
    pub fn seal(&self, plaintext: &str) -> Result<String, BotFileError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher()?
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| BotFileError::bad_secret(format!("failed to seal value: {e}")))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(sealed))
    }

    /// Unseal a value produced by [`SecretKey::seal`]
    pub fn unseal(&self, sealed: &str) -> Result<String, BotFileError> {
        let bytes = BASE64
            .decode(sealed)
            .map_err(|_| BotFileError::bad_secret("sealed value is not valid base64"))?;

        if bytes.len() <= NONCE_SIZE {
            return Err(BotFileError::bad_secret("sealed value is truncated"));
        }
        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_SIZE);

        let plaintext = self
            .cipher()?
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| BotFileError::bad_secret("you are using the wrong secret"))?;

        String::from_utf8(plaintext)
            .map_err(|e| BotFileError::bad_secret(format!("invalid UTF-8 in unsealed value: {e}")))
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey").field("key", &"<redacted>").finish()
    }
}
