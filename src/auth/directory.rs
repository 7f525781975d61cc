// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Directory-backed authentication.
//!
//! The actual directory wire protocol (LDAP/AD) lives behind the
//! [`DirectoryService`] trait and is supplied by the host. This strategy
//! only decides when to consult it and fails closed when it cannot.

use std::sync::Arc;

use super::{AuthenticationStrategy, CredentialRequest};

/// External identity directory, injected by the hosting server.
pub trait DirectoryService: Send + Sync {
    /// Verify `user_name`/`password` against the directory for `domain`.
    ///
    /// Transport or directory failures surface as `Err`; the strategy
    /// treats them as authentication failure.
    fn verify(&self, domain: &str, user_name: &str, password: &str) -> anyhow::Result<bool>;

    /// Resolve the directory's display name for a user, if it has one.
    fn display_name(&self, domain: &str, user_name: &str) -> anyhow::Result<Option<String>> {
        let _ = (domain, user_name);
        Ok(None)
    }
}

/// Delegates credential checks to an external [`DirectoryService`].
pub struct DirectoryAuthentication {
    identifier: String,
    domain: Option<String>,
    service: Arc<dyn DirectoryService>,
}

impl DirectoryAuthentication {
    pub fn new(
        identifier: impl Into<String>,
        domain: Option<String>,
        service: Arc<dyn DirectoryService>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            domain,
            service,
        }
    }
}

impl AuthenticationStrategy for DirectoryAuthentication {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn authenticate(&self, request: &CredentialRequest) -> bool {
        let Some(user_name) = request.user_name() else {
            return false;
        };
        let Some(password) = request.password() else {
            return false;
        };
        // No domain configured: misconfiguration, but fail closed rather
        // than abort the whole login pipeline.
        let Some(domain) = self.domain.as_deref() else {
            tracing::warn!(
                identifier = %self.identifier,
                "directory authentication has no domain configured; rejecting login"
            );
            return false;
        };
        match self.service.verify(domain, user_name, password) {
            Ok(verified) => verified,
            Err(error) => {
                tracing::warn!(
                    identifier = %self.identifier,
                    domain,
                    %error,
                    "directory verification failed; rejecting login"
                );
                false
            }
        }
    }

    fn display_name(&self, request: &CredentialRequest) -> Option<String> {
        let user_name = request.user_name()?;
        let domain = self.domain.as_deref()?;
        match self.service.display_name(domain, user_name) {
            Ok(Some(name)) => Some(name),
            Ok(None) => self.user_name(request),
            Err(_) => self.user_name(request),
        }
    }
}
