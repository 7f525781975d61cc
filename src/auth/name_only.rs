// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Name-only authentication: trusted identifiers without a secret.

use super::{AuthenticationStrategy, CredentialRequest};

/// Authenticates any request whose claimed username matches the configured
/// identifier. There is no secret; matching is the whole check.
///
/// Intended for trusted-network deployments and for wildcard identifiers
/// that admit a family of usernames (`"*doe"`).
#[derive(Debug, Clone)]
pub struct UserNameAuthentication {
    identifier: String,
}

impl UserNameAuthentication {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
        }
    }
}

impl AuthenticationStrategy for UserNameAuthentication {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn authenticate(&self, request: &CredentialRequest) -> bool {
        match request.user_name() {
            Some(user_name) => self.matches(user_name),
            None => false,
        }
    }
}
