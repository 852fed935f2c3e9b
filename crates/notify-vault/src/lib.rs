// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential codec for the Notify fan-out service.
//!
//! Channel credentials (SMTP logins, Twilio tokens, Discord webhook URLs) are
//! stored encrypted with AES-256-GCM. The key is derived once at startup from
//! the configured secret salt via Argon2id; every value carries its own random
//! nonce, so two encryptions of the same plaintext never match.

pub mod codec;
pub mod crypto;
pub mod kdf;

pub use codec::{mask_secret, SecretCodec};
