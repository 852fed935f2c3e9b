// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Argon2id key derivation from the configured secret salt.

use notify_core::NotifyError;
use zeroize::Zeroizing;

/// Fixed Argon2 salt for credential keys. The configured secret is the
/// passphrase; every instance sharing that secret must derive the same key.
pub const APP_SALT: &[u8; 16] = b"notify.creds.v1\0";

/// Derive a 32-byte key from `passphrase` using Argon2id v0x13.
///
/// The returned key is wrapped in [`Zeroizing`] for automatic memory zeroing
/// on drop.
pub fn derive_key(
    passphrase: &[u8],
    salt: &[u8; 16],
    memory_cost: u32,
    iterations: u32,
    parallelism: u32,
) -> Result<Zeroizing<[u8; 32]>, NotifyError> {
    let params = argon2::Params::new(memory_cost, iterations, parallelism, Some(32))
        .map_err(|e| NotifyError::Vault(format!("invalid Argon2id parameters: {e}")))?;

    let argon2 = argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut output = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(passphrase, salt, output.as_mut())
        .map_err(|e| NotifyError::Vault(format!("Argon2id key derivation failed: {e}")))?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Low cost for fast tests.
    const M: u32 = 1024;

    #[test]
    fn derive_key_is_deterministic() {
        let key1 = derive_key(b"pepper", APP_SALT, M, 2, 1).unwrap();
        let key2 = derive_key(b"pepper", APP_SALT, M, 2, 1).unwrap();
        assert_eq!(*key1, *key2);
    }

    #[test]
    fn different_passphrase_produces_different_key() {
        let key1 = derive_key(b"pepper one", APP_SALT, M, 2, 1).unwrap();
        let key2 = derive_key(b"pepper two", APP_SALT, M, 2, 1).unwrap();
        assert_ne!(*key1, *key2);
    }

    #[test]
    fn kdf_params_change_the_key() {
        let key1 = derive_key(b"pepper", APP_SALT, M, 2, 1).unwrap();
        let key2 = derive_key(b"pepper", APP_SALT, M, 3, 1).unwrap();
        assert_ne!(*key1, *key2);
    }

    #[test]
    fn invalid_params_are_a_vault_error() {
        let err = derive_key(b"pepper", APP_SALT, 1, 0, 1).unwrap_err();
        assert!(matches!(err, NotifyError::Vault(_)));
    }
}
