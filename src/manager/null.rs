// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Null-object security manager for deployments with no security.
//!
//! Every login succeeds and the submitted username doubles as the session
//! token; every session validates. Password operations are the exception:
//! silently pretending to change a password would be worse than refusing,
//! so they fail loudly with [`SecurityError::NotSupported`].

use std::sync::Arc;

use crate::audit::{AuditFilter, AuditRecord, SecurityEvent};
use crate::auth::CredentialRequest;
use crate::errors::SecurityError;
use crate::permission::{Permission, PermissionKind, PermissionRegistry, Right};

use super::{SecurityManager, UserDetails};

/// Security manager that performs no checks at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSecurityManager;

impl NullSecurityManager {
    pub fn new() -> Self {
        Self
    }
}

impl PermissionRegistry for NullSecurityManager {
    fn retrieve_permission(&self, _id: &str) -> Option<Arc<dyn Permission>> {
        None
    }
}

impl SecurityManager for NullSecurityManager {
    fn login(&self, request: &CredentialRequest) -> Option<String> {
        request.user_name().map(str::to_string)
    }

    fn logout(&self, _token: &str) {}

    fn validate_session(&self, _token: Option<&str>) -> bool {
        true
    }

    fn get_user_name(&self, token: &str) -> Option<String> {
        // The token is the username
        Some(token.to_string())
    }

    fn get_display_name(&self, token: &str) -> Option<String> {
        Some(token.to_string())
    }

    fn change_password(
        &self,
        _token: &str,
        _old_password: &str,
        _new_password: &str,
    ) -> Result<(), SecurityError> {
        Err(SecurityError::NotSupported(
            "password management is unavailable without a security manager",
        ))
    }

    fn reset_password(
        &self,
        _token: &str,
        _target_user: &str,
        _new_password: &str,
    ) -> Result<(), SecurityError> {
        Err(SecurityError::NotSupported(
            "password management is unavailable without a security manager",
        ))
    }

    fn list_all_users(&self) -> Vec<UserDetails> {
        Vec::new()
    }

    fn check_server_permission(
        &self,
        _user_name: &str,
        _kind: PermissionKind,
    ) -> Result<bool, SecurityError> {
        Ok(true)
    }

    fn log_event(
        &self,
        _project_name: Option<&str>,
        _user_name: Option<&str>,
        _event_kind: SecurityEvent,
        _right: Option<Right>,
        _message: &str,
    ) {
    }

    fn read_audit_records(
        &self,
        _start: usize,
        _count: usize,
        _filter: &AuditFilter,
    ) -> Vec<AuditRecord> {
        Vec::new()
    }
}
