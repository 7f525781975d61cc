// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Name-plus-secret authentication.

use std::sync::RwLock;

use subtle::ConstantTimeEq;

use super::{AuthenticationStrategy, CredentialRequest};
use crate::errors::SecurityError;
use crate::locks::{resilient_read, resilient_write};

/// Authenticates a matching username against a stored password.
///
/// The comparison is constant-time so a remote caller cannot time their way
/// through the secret. The secret is interior-mutable: a password change
/// through the security manager is visible to the very next login.
pub struct UserPasswordAuthentication {
    identifier: String,
    display_name: Option<String>,
    password: RwLock<String>,
}

impl UserPasswordAuthentication {
    pub fn new(identifier: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            display_name: None,
            password: RwLock::new(password.into()),
        }
    }

    /// Attach a display name distinct from the login identifier.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

impl std::fmt::Debug for UserPasswordAuthentication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the secret
        f.debug_struct("UserPasswordAuthentication")
            .field("identifier", &self.identifier)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

impl AuthenticationStrategy for UserPasswordAuthentication {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn authenticate(&self, request: &CredentialRequest) -> bool {
        let Some(user_name) = request.user_name() else {
            return false;
        };
        let Some(supplied) = request.password() else {
            return false;
        };
        if !self.matches(user_name) {
            return false;
        }
        let stored = resilient_read(&self.password);
        stored.as_bytes().ct_eq(supplied.as_bytes()).into()
    }

    fn display_name(&self, request: &CredentialRequest) -> Option<String> {
        match &self.display_name {
            Some(name) => Some(name.clone()),
            None => self.user_name(request),
        }
    }

    fn change_password(&self, new_password: &str) -> Result<(), SecurityError> {
        *resilient_write(&self.password) = new_password.to_string();
        Ok(())
    }
}
