// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Permission objects: three-state right resolvers keyed by identity.
//!
//! A permission object answers two questions: does it speak for a given
//! username, and what right does it grant for a given operation. Rights are
//! three-valued — [`Right::Inherit`] means "no opinion here, defer to a
//! broader default" and is resolved by the authorization composer, never
//! leaked to external callers.
//!
//! Objects compose by reference: a [`PermissionReference`] names another
//! permission registered centrally and forwards every query to it. A name
//! that does not resolve is a configuration fault
//! ([`SecurityError::BadReference`]), never a silent "no opinion".

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::SecurityError;

// ============================================================================
// RIGHTS AND PERMISSION KINDS
// ============================================================================

/// Three-valued authorization outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Right {
    Allow,
    Deny,
    /// Defer to a broader-scoped default.
    Inherit,
}

impl Right {
    /// Final boolean conversion: only an explicit `Allow` permits.
    pub fn is_allowed(self) -> bool {
        matches!(self, Right::Allow)
    }
}

impl std::fmt::Display for Right {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Right::Allow => write!(f, "ALLOW"),
            Right::Deny => write!(f, "DENY"),
            Right::Inherit => write!(f, "INHERIT"),
        }
    }
}

/// Protected operations a caller can be granted or denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    ForceAbortBuild,
    SendMessage,
    StartStopProject,
    ChangeProjectConfiguration,
    ViewSecurity,
    ModifySecurity,
    ViewProject,
    ViewConfiguration,
}

// ============================================================================
// PERMISSION CONTRACT
// ============================================================================

/// Registry used to resolve named permission references.
///
/// The security manager implements this; unit tests use a plain map.
pub trait PermissionRegistry: Send + Sync {
    /// Look up a centrally-registered permission by name. `None` here is
    /// converted by the *caller* into [`SecurityError::BadReference`].
    fn retrieve_permission(&self, id: &str) -> Option<Arc<dyn Permission>>;
}

impl PermissionRegistry for HashMap<String, Arc<dyn Permission>> {
    fn retrieve_permission(&self, id: &str) -> Option<Arc<dyn Permission>> {
        self.get(id).cloned()
    }
}

/// A named, identity-scoped bundle of per-operation rights.
pub trait Permission: Send + Sync {
    /// Whether this object speaks for `user_name`.
    fn check_user(
        &self,
        registry: &dyn PermissionRegistry,
        user_name: &str,
    ) -> Result<bool, SecurityError>;

    /// The right this object grants for `kind`. May legitimately return
    /// [`Right::Inherit`]; resolution to a boolean happens in the composer.
    fn check_permission(
        &self,
        registry: &dyn PermissionRegistry,
        kind: PermissionKind,
    ) -> Result<Right, SecurityError>;
}

// ============================================================================
// RIGHTS TABLE
// ============================================================================

/// Per-kind rights shared by user and role permissions.
///
/// Constructed in the fixed order (default, send-message, force-build,
/// start-project). The force-build right governs [`PermissionKind::ForceAbortBuild`]
/// and the start-project right governs [`PermissionKind::StartStopProject`];
/// kinds with no entry resolve to the default right. An explicit
/// [`Right::Inherit`] entry is stored and returned as `Inherit`.
#[derive(Debug, Clone)]
struct RightsTable {
    default_right: Right,
    per_kind: HashMap<PermissionKind, Right>,
}

impl RightsTable {
    fn new(default_right: Right, send_message: Right, force_build: Right, start_project: Right) -> Self {
        let per_kind = HashMap::from([
            (PermissionKind::SendMessage, send_message),
            (PermissionKind::ForceAbortBuild, force_build),
            (PermissionKind::StartStopProject, start_project),
        ]);
        Self {
            default_right,
            per_kind,
        }
    }

    fn right_for(&self, kind: PermissionKind) -> Right {
        self.per_kind.get(&kind).copied().unwrap_or(self.default_right)
    }

    fn set(&mut self, kind: PermissionKind, right: Right) {
        self.per_kind.insert(kind, right);
    }
}

// ============================================================================
// CONCRETE PERMISSIONS
// ============================================================================

/// Rights scoped to one exact username.
#[derive(Debug, Clone)]
pub struct UserPermission {
    user_name: String,
    rights: RightsTable,
}

impl UserPermission {
    /// Rights are supplied in the fixed order
    /// (default, send-message, force-build, start-project).
    pub fn new(
        user_name: impl Into<String>,
        default_right: Right,
        send_message: Right,
        force_build: Right,
        start_project: Right,
    ) -> Self {
        Self {
            user_name: user_name.into(),
            rights: RightsTable::new(default_right, send_message, force_build, start_project),
        }
    }

    /// Override the right for an additional permission kind.
    pub fn with_right(mut self, kind: PermissionKind, right: Right) -> Self {
        self.rights.set(kind, right);
        self
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }
}

impl Permission for UserPermission {
    fn check_user(
        &self,
        _registry: &dyn PermissionRegistry,
        user_name: &str,
    ) -> Result<bool, SecurityError> {
        Ok(self.user_name == user_name)
    }

    fn check_permission(
        &self,
        _registry: &dyn PermissionRegistry,
        kind: PermissionKind,
    ) -> Result<Right, SecurityError> {
        Ok(self.rights.right_for(kind))
    }
}

/// Rights scoped to an explicit member list. No transitive nesting: a user
/// is in the role or not.
#[derive(Debug, Clone)]
pub struct RolePermission {
    role_name: String,
    members: Vec<String>,
    rights: RightsTable,
}

impl RolePermission {
    /// Rights are supplied in the fixed order
    /// (default, send-message, force-build, start-project).
    pub fn new(
        role_name: impl Into<String>,
        members: impl IntoIterator<Item = String>,
        default_right: Right,
        send_message: Right,
        force_build: Right,
        start_project: Right,
    ) -> Self {
        Self {
            role_name: role_name.into(),
            members: members.into_iter().collect(),
            rights: RightsTable::new(default_right, send_message, force_build, start_project),
        }
    }

    /// Override the right for an additional permission kind.
    pub fn with_right(mut self, kind: PermissionKind, right: Right) -> Self {
        self.rights.set(kind, right);
        self
    }

    pub fn role_name(&self) -> &str {
        &self.role_name
    }
}

impl Permission for RolePermission {
    fn check_user(
        &self,
        _registry: &dyn PermissionRegistry,
        user_name: &str,
    ) -> Result<bool, SecurityError> {
        Ok(self.members.iter().any(|member| member == user_name))
    }

    fn check_permission(
        &self,
        _registry: &dyn PermissionRegistry,
        kind: PermissionKind,
    ) -> Result<Right, SecurityError> {
        Ok(self.rights.right_for(kind))
    }
}

/// A permission that is only a name: every query forwards to the permission
/// registered under `ref_id`.
#[derive(Debug, Clone)]
pub struct PermissionReference {
    ref_id: String,
}

impl PermissionReference {
    pub fn new(ref_id: impl Into<String>) -> Self {
        Self {
            ref_id: ref_id.into(),
        }
    }

    pub fn ref_id(&self) -> &str {
        &self.ref_id
    }

    fn resolve(
        &self,
        registry: &dyn PermissionRegistry,
    ) -> Result<Arc<dyn Permission>, SecurityError> {
        registry
            .retrieve_permission(&self.ref_id)
            .ok_or_else(|| SecurityError::BadReference(self.ref_id.clone()))
    }
}

impl Permission for PermissionReference {
    fn check_user(
        &self,
        registry: &dyn PermissionRegistry,
        user_name: &str,
    ) -> Result<bool, SecurityError> {
        self.resolve(registry)?.check_user(registry, user_name)
    }

    fn check_permission(
        &self,
        registry: &dyn PermissionRegistry,
        kind: PermissionKind,
    ) -> Result<Right, SecurityError> {
        self.resolve(registry)?.check_permission(registry, kind)
    }
}
