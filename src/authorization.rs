// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Authorization composer.
//!
//! Resolves a final allow/deny decision for a (user, permission) pair from
//! an ordered list of permission objects plus a configured default right.
//! This is the only place [`Right::Inherit`] gets turned into a boolean:
//!
//! 1. Walk the configured objects in order; the first whose `check_user`
//!    matches wins (ordering is caller-supplied configuration order).
//! 2. That object's right applies, except `Inherit`, which falls through to
//!    the composer's default right.
//! 3. No matching object: the composer's default right applies.
//! 4. A composer default of `Inherit` falls through to the caller-supplied
//!    fallback; the fallback never overrides a concrete composer default.
//! 5. Only `Allow` becomes `true`.

use std::sync::Arc;

use crate::errors::SecurityError;
use crate::permission::{Permission, PermissionKind, PermissionRegistry, Right};

/// Ordered permission list with a fallback default right.
pub struct DefaultAuthorization {
    default_right: Right,
    permissions: Vec<Arc<dyn Permission>>,
}

impl DefaultAuthorization {
    pub fn new(default_right: Right, permissions: Vec<Arc<dyn Permission>>) -> Self {
        Self {
            default_right,
            permissions,
        }
    }

    /// Deny-by-default composer with no permission objects.
    pub fn deny_all() -> Self {
        Self::new(Right::Deny, Vec::new())
    }

    pub fn default_right(&self) -> Right {
        self.default_right
    }

    /// Resolve `user_name`'s right for `kind` to a concrete boolean.
    ///
    /// `fallback` only applies when the composer's own default right is
    /// `Inherit`; it exists for interface symmetry with the permission
    /// object contract.
    pub fn check_permission(
        &self,
        registry: &dyn PermissionRegistry,
        user_name: &str,
        kind: PermissionKind,
        fallback: Right,
    ) -> Result<bool, SecurityError> {
        let mut right = self.default_right;
        for permission in &self.permissions {
            if permission.check_user(registry, user_name)? {
                match permission.check_permission(registry, kind)? {
                    // Object has no opinion: the composer default stands
                    Right::Inherit => {}
                    concrete => right = concrete,
                }
                break;
            }
        }
        if right == Right::Inherit {
            right = fallback;
        }
        let allowed = right.is_allowed();
        tracing::debug!(
            target: "buildgate::authorization",
            user = user_name,
            kind = ?kind,
            right = %right,
            allowed,
            "authorization decision"
        );
        Ok(allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::{PermissionReference, RolePermission, UserPermission};
    use std::collections::HashMap;

    fn registry() -> HashMap<String, Arc<dyn Permission>> {
        HashMap::new()
    }

    fn johndoe_force_build() -> Arc<dyn Permission> {
        Arc::new(UserPermission::new(
            "johndoe",
            Right::Inherit,
            Right::Inherit,
            Right::Allow,
            Right::Inherit,
        ))
    }

    #[test]
    fn test_explicit_grant_allows() {
        let composer = DefaultAuthorization::new(Right::Deny, vec![johndoe_force_build()]);
        assert!(composer
            .check_permission(&registry(), "johndoe", PermissionKind::ForceAbortBuild, Right::Deny)
            .unwrap());
    }

    #[test]
    fn test_inherit_falls_through_to_composer_default() {
        // johndoe's send-message right is Inherit; the composer default
        // (Deny) is what resolves it, not the object's own default.
        let composer = DefaultAuthorization::new(Right::Deny, vec![johndoe_force_build()]);
        assert!(!composer
            .check_permission(&registry(), "johndoe", PermissionKind::SendMessage, Right::Allow)
            .unwrap());

        let permissive = DefaultAuthorization::new(Right::Allow, vec![johndoe_force_build()]);
        assert!(permissive
            .check_permission(&registry(), "johndoe", PermissionKind::SendMessage, Right::Deny)
            .unwrap());
    }

    #[test]
    fn test_unlisted_user_gets_composer_default() {
        let composer = DefaultAuthorization::new(Right::Deny, vec![johndoe_force_build()]);
        assert!(!composer
            .check_permission(&registry(), "janedoe", PermissionKind::ForceAbortBuild, Right::Allow)
            .unwrap());
    }

    #[test]
    fn test_explicit_deny_beats_permissive_default() {
        let deny_user: Arc<dyn Permission> = Arc::new(UserPermission::new(
            "johndoe",
            Right::Inherit,
            Right::Inherit,
            Right::Deny,
            Right::Inherit,
        ));
        let composer = DefaultAuthorization::new(Right::Allow, vec![deny_user]);
        assert!(!composer
            .check_permission(&registry(), "johndoe", PermissionKind::ForceAbortBuild, Right::Allow)
            .unwrap());
    }

    #[test]
    fn test_first_matching_object_wins() {
        let user_level: Arc<dyn Permission> = Arc::new(UserPermission::new(
            "johndoe",
            Right::Inherit,
            Right::Inherit,
            Right::Deny,
            Right::Inherit,
        ));
        let role_level: Arc<dyn Permission> = Arc::new(RolePermission::new(
            "builders",
            ["johndoe".to_string()],
            Right::Inherit,
            Right::Inherit,
            Right::Allow,
            Right::Inherit,
        ));
        // Configuration order decides: the user-level deny is listed first
        let composer = DefaultAuthorization::new(Right::Allow, vec![user_level, role_level]);
        assert!(!composer
            .check_permission(&registry(), "johndoe", PermissionKind::ForceAbortBuild, Right::Allow)
            .unwrap());
    }

    #[test]
    fn test_inherit_default_resolves_to_fallback() {
        let composer = DefaultAuthorization::new(Right::Inherit, Vec::new());
        assert!(composer
            .check_permission(&registry(), "johndoe", PermissionKind::SendMessage, Right::Allow)
            .unwrap());
        assert!(!composer
            .check_permission(&registry(), "johndoe", PermissionKind::SendMessage, Right::Deny)
            .unwrap());
        // An unresolved Inherit never allows
        assert!(!composer
            .check_permission(&registry(), "johndoe", PermissionKind::SendMessage, Right::Inherit)
            .unwrap());
    }

    #[test]
    fn test_dangling_reference_propagates() {
        let reference: Arc<dyn Permission> = Arc::new(PermissionReference::new("doesNotExist"));
        let composer = DefaultAuthorization::new(Right::Deny, vec![reference]);
        let err = composer
            .check_permission(&registry(), "johndoe", PermissionKind::SendMessage, Right::Deny)
            .unwrap_err();
        assert!(matches!(err, SecurityError::BadReference(_)));
    }
}
