// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Security error taxonomy.
//!
//! The distinctions here are deliberate and caller-visible:
//!
//! - Rejected credentials and unknown/expired sessions on *query* paths are
//!   not errors at all (callers get `None`/`false`), so a remote caller
//!   cannot distinguish "wrong password" from "no such user".
//! - Password management throws on an invalid session instead of silently
//!   no-op-ing, because a password change that quietly does nothing is a
//!   security hazard.
//! - A dangling permission reference is a configuration fault and is loud.

use thiserror::Error;

/// Errors raised by the security engine.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// The supplied session token does not resolve to a live session.
    ///
    /// Only raised by operations where silently doing nothing would be
    /// dangerous (password management). Query operations return `None`.
    #[error("session token is invalid or has expired")]
    SessionInvalid,

    /// The session user lacks the permission required for the operation.
    #[error("user '{user}' is not permitted to perform this operation")]
    PermissionDenied {
        /// User the denial applies to.
        user: String,
    },

    /// The current password supplied to a self-service change did not verify.
    ///
    /// Kept generic on purpose: no hint about which part was wrong.
    #[error("security check failed")]
    InvalidPassword,

    /// A permission object refers to a registry id that does not exist.
    ///
    /// This is a configuration fault, never a runtime "no opinion": treating
    /// it as silence would default-allow or default-deny unpredictably.
    #[error("permission reference '{0}' does not resolve")]
    BadReference(String),

    /// The operation is not supported by the configured component
    /// (e.g. password management on a null security manager).
    #[error("operation not supported: {0}")]
    NotSupported(&'static str),

    /// Durable session storage failed.
    #[error("session storage failure")]
    Storage(#[from] std::io::Error),

    /// A persisted record could not be encoded or decoded.
    #[error("session record serialization failure")]
    Serialization(#[from] serde_json::Error),
}
