// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email delivery for the Notify fan-out service.
//!
//! [`EmailSender`] delivers app notifications through each channel's own SMTP
//! account. [`SmtpNoticeSender`] is the system mailer for owner notices
//! (quota reached, monthly reset); [`LogNoticeSender`] stands in when no
//! system SMTP relay is configured.

pub mod notice;
pub mod sender;
pub mod template;

pub use notice::{LogNoticeSender, SmtpNoticeSender};
pub use sender::EmailSender;

use lettre::transport::smtp::Error as SmtpError;
use notify_core::SendError;

/// Classify an SMTP failure. 5xx replies and client-side errors will not
/// improve on retry; everything else (connection refused, DNS, timeouts,
/// 4xx replies) will.
pub(crate) fn classify_smtp_error(err: &SmtpError) -> SendError {
    if err.is_permanent() || err.is_client() {
        SendError::permanent(format!("smtp: {err}"))
    } else {
        SendError::retryable(format!("smtp: {err}"))
    }
}
