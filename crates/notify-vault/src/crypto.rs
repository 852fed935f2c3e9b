// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Low-level AES-256-GCM seal/open operations.
//!
//! Every call to [`seal`] generates a fresh random 96-bit nonce via the system
//! CSPRNG. Nonce reuse would be catastrophic for GCM security.
//!
//! Sealed layout: `nonce (12) || tag (16) || ciphertext`.

use notify_core::NotifyError;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};

/// Length of the GCM authentication tag.
pub const TAG_LEN: usize = 16;

/// Bytes added to every plaintext by [`seal`].
pub const OVERHEAD: usize = NONCE_LEN + TAG_LEN;

fn less_safe_key(key: &[u8; 32]) -> Result<LessSafeKey, NotifyError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| NotifyError::Vault("failed to create AES-256-GCM key".to_string()))?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt plaintext with AES-256-GCM using a random 96-bit nonce.
pub fn seal(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>, NotifyError> {
    let less_safe = less_safe_key(key)?;

    let rng = SystemRandom::new();
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill(&mut nonce_bytes)
        .map_err(|_| NotifyError::Vault("failed to generate random nonce".to_string()))?;

    let mut ciphertext = plaintext.to_vec();
    let tag = less_safe
        .seal_in_place_separate_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut ciphertext,
        )
        .map_err(|_| NotifyError::Vault("AES-256-GCM encryption failed".to_string()))?;

    let mut sealed = Vec::with_capacity(OVERHEAD + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(tag.as_ref());
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Decrypt a buffer produced by [`seal`].
///
/// Fails with [`NotifyError::Decryption`] when the input is shorter than the
/// nonce and tag, the key is wrong, or any byte was altered.
pub fn open(key: &[u8; 32], sealed: &[u8]) -> Result<Vec<u8>, NotifyError> {
    if sealed.len() < OVERHEAD {
        return Err(NotifyError::Decryption(format!(
            "input is {} bytes, shorter than the {OVERHEAD}-byte header",
            sealed.len()
        )));
    }
    let less_safe = less_safe_key(key)?;

    let (nonce_bytes, rest) = sealed.split_at(NONCE_LEN);
    let (tag, ciphertext) = rest.split_at(TAG_LEN);
    let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
        .map_err(|_| NotifyError::Decryption("malformed nonce".to_string()))?;

    // ring expects the tag appended to the ciphertext.
    let mut in_out = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    in_out.extend_from_slice(ciphertext);
    in_out.extend_from_slice(tag);

    let plaintext = less_safe
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| {
            NotifyError::Decryption("wrong key or corrupted data".to_string())
        })?;

    Ok(plaintext.to_vec())
}

/// Generate a random 32-byte key suitable for AES-256-GCM.
pub fn generate_random_key() -> Result<[u8; 32], NotifyError> {
    let rng = SystemRandom::new();
    let mut key = [0u8; 32];
    rng.fill(&mut key)
        .map_err(|_| NotifyError::Vault("failed to generate random key".to_string()))?;
    Ok(key)
}
