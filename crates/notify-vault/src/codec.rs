// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text codec for encrypted credential columns.
//!
//! Wire form: unpadded base64url of `nonce || tag || ciphertext`. The alphabet
//! is safe to store in TEXT columns and to pass on a command line.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use notify_config::model::VaultConfig;
use notify_core::NotifyError;
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

use crate::{crypto, kdf};

/// Encrypts and decrypts credential strings with a key derived at startup.
///
/// Cheap to share behind an `Arc`; the key is zeroed when the codec drops.
pub struct SecretCodec {
    key: Zeroizing<[u8; 32]>,
}

impl SecretCodec {
    /// Derive the codec key from the configured secret salt.
    pub fn from_salt(secret: &SecretString, vault: &VaultConfig) -> Result<Self, NotifyError> {
        let key = kdf::derive_key(
            secret.expose_secret().as_bytes(),
            kdf::APP_SALT,
            vault.kdf_memory_cost,
            vault.kdf_iterations,
            vault.kdf_parallelism,
        )?;
        tracing::debug!("credential key derived");
        Ok(Self { key })
    }

    /// Build a codec around an existing 32-byte key.
    pub fn from_key(key: [u8; 32]) -> Self {
        Self {
            key: Zeroizing::new(key),
        }
    }

    /// Encrypt `plaintext` into its stored text form.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, NotifyError> {
        let sealed = crypto::seal(&self.key, plaintext.as_bytes())?;
        Ok(URL_SAFE_NO_PAD.encode(sealed))
    }

    /// Decrypt a value produced by [`SecretCodec::encrypt`].
    pub fn decrypt(&self, encoded: &str) -> Result<String, NotifyError> {
        let sealed = URL_SAFE_NO_PAD
            .decode(encoded.trim())
            .map_err(|e| NotifyError::Decryption(format!("invalid base64url: {e}")))?;
        let plaintext = crypto::open(&self.key, &sealed)?;
        String::from_utf8(plaintext)
            .map_err(|_| NotifyError::Decryption("plaintext is not UTF-8".to_string()))
    }
}

impl std::fmt::Debug for SecretCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCodec").finish_non_exhaustive()
    }
}

/// Mask a decrypted secret for log output, keeping four characters at each end.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() < 10 {
        return "****".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}...{suffix}")
}
