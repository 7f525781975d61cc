// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Security manager: the facade the hosting CI server talks to.
//!
//! Orchestrates the authentication strategies, the session store, the
//! permission registry and the audit trail behind one narrow surface.
//! Per-session state machine:
//!
//! `NoSession -> (login success) -> Active -> (logout | expiry) -> NoSession`
//!
//! Two implementations: [`CoreSecurityManager`] (the real thing) and
//! [`NullSecurityManager`] for deployments with security switched off.

mod core;
mod null;

pub use self::core::CoreSecurityManager;
pub use null::NullSecurityManager;

use serde::{Deserialize, Serialize};

use crate::audit::{AuditFilter, AuditRecord, SecurityEvent};
use crate::auth::CredentialRequest;
use crate::errors::SecurityError;
use crate::permission::{PermissionKind, PermissionRegistry, Right};

/// Session value key under which the resolved display name is cached.
pub const DISPLAY_NAME_KEY: &str = "display_name";

/// One row of [`SecurityManager::list_all_users`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    pub user_name: String,
    pub display_name: Option<String>,
}

/// The library-level API consumed by the hosting server.
///
/// Query operations never error on a bad token: they return `None`/`false`
/// so a remote caller learns nothing about why. Password management is the
/// deliberate exception, because silently no-op-ing a password change would
/// be a security hazard.
pub trait SecurityManager: PermissionRegistry {
    /// Authenticate a login request. The first registered strategy whose
    /// identifier matches the claimed username decides; on success a session
    /// is opened and its token returned. Rejections return `None`, never
    /// an error.
    fn login(&self, request: &CredentialRequest) -> Option<String>;

    /// Close a session. Logging out an unknown token is a silent no-op.
    fn logout(&self, token: &str);

    /// Whether the token currently resolves. An empty/absent token is
    /// always invalid.
    fn validate_session(&self, token: Option<&str>) -> bool;

    /// The username behind a token, or `None` for an invalid session.
    fn get_user_name(&self, token: &str) -> Option<String>;

    /// The cached display name behind a token, or `None`.
    fn get_display_name(&self, token: &str) -> Option<String>;

    /// Self-service password change. Requires a valid session and a
    /// verifying old password; the change is visible to the next login.
    fn change_password(
        &self,
        token: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), SecurityError>;

    /// Administrative password reset: requires a valid session whose user
    /// holds [`PermissionKind::ModifySecurity`]; the old password is not
    /// needed.
    fn reset_password(
        &self,
        token: &str,
        target_user: &str,
        new_password: &str,
    ) -> Result<(), SecurityError>;

    /// Enumerate the configured users.
    fn list_all_users(&self) -> Vec<UserDetails>;

    /// Server-level authorization check (used internally for
    /// `ModifySecurity`, and by the host for server-scoped actions).
    fn check_server_permission(
        &self,
        user_name: &str,
        kind: PermissionKind,
    ) -> Result<bool, SecurityError>;

    /// Append an event to the audit trail.
    fn log_event(
        &self,
        project_name: Option<&str>,
        user_name: Option<&str>,
        event_kind: SecurityEvent,
        right: Option<Right>,
        message: &str,
    );

    /// Page through the audit trail. Empty without a configured reader.
    fn read_audit_records(
        &self,
        start: usize,
        count: usize,
        filter: &AuditFilter,
    ) -> Vec<AuditRecord>;
}
