// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! The real security manager.

use std::collections::HashMap;
use std::sync::Arc;

use crate::audit::{AuditFilter, AuditLog, AuditRecord, SecurityEvent};
use crate::auth::{AuthenticationStrategy, CredentialRequest};
use crate::authorization::DefaultAuthorization;
use crate::errors::SecurityError;
use crate::permission::{Permission, PermissionKind, PermissionRegistry, Right};
use crate::session::SessionStore;

use super::{SecurityManager, UserDetails, DISPLAY_NAME_KEY};

/// Orchestrates strategies, sessions, permissions and audit.
pub struct CoreSecurityManager {
    strategies: Vec<Arc<dyn AuthenticationStrategy>>,
    permissions: HashMap<String, Arc<dyn Permission>>,
    authorization: DefaultAuthorization,
    sessions: Arc<dyn SessionStore>,
    audit: AuditLog,
}

impl CoreSecurityManager {
    /// Manager with the given strategies, session store and audit fan-out.
    /// Server-level authorization defaults to deny-all; attach permissions
    /// with [`CoreSecurityManager::with_permission`] and
    /// [`CoreSecurityManager::with_server_authorization`].
    pub fn new(
        strategies: Vec<Arc<dyn AuthenticationStrategy>>,
        sessions: Arc<dyn SessionStore>,
        audit: AuditLog,
    ) -> Self {
        Self {
            strategies,
            permissions: HashMap::new(),
            authorization: DefaultAuthorization::deny_all(),
            sessions,
            audit,
        }
    }

    /// Register a named permission for reference resolution.
    pub fn with_permission(mut self, id: impl Into<String>, permission: Arc<dyn Permission>) -> Self {
        self.permissions.insert(id.into(), permission);
        self
    }

    /// Replace the server-level authorization composer.
    pub fn with_server_authorization(mut self, authorization: DefaultAuthorization) -> Self {
        self.authorization = authorization;
        self
    }

    /// Prepare the session store (reload persisted sessions for the durable
    /// variant).
    pub fn initialise(&self) -> Result<(), SecurityError> {
        self.sessions.initialise()
    }

    pub fn session_store(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// First strategy whose identifier matches the claimed username.
    fn strategy_for(&self, user_name: &str) -> Option<&Arc<dyn AuthenticationStrategy>> {
        self.strategies
            .iter()
            .find(|strategy| strategy.matches(user_name))
    }
}

impl PermissionRegistry for CoreSecurityManager {
    fn retrieve_permission(&self, id: &str) -> Option<Arc<dyn Permission>> {
        self.permissions.get(id).cloned()
    }
}

impl SecurityManager for CoreSecurityManager {
    fn login(&self, request: &CredentialRequest) -> Option<String> {
        let Some(claimed) = request.user_name() else {
            self.audit.log_event(
                None,
                None,
                SecurityEvent::Login,
                Some(Right::Deny),
                "login rejected: no username credential",
            );
            return None;
        };

        let Some(strategy) = self.strategy_for(claimed) else {
            tracing::info!(target: "buildgate::manager", user = claimed, "no strategy matches");
            self.audit.log_event(
                None,
                Some(claimed),
                SecurityEvent::Login,
                Some(Right::Deny),
                "login rejected: unknown user",
            );
            return None;
        };

        if !strategy.authenticate(request) {
            tracing::info!(target: "buildgate::manager", user = claimed, "login rejected");
            self.audit.log_event(
                None,
                Some(claimed),
                SecurityEvent::Login,
                Some(Right::Deny),
                "login rejected: credentials did not verify",
            );
            return None;
        }

        let user_name = strategy
            .user_name(request)
            .unwrap_or_else(|| claimed.to_string());
        let token = self.sessions.add_to_cache(&user_name);
        if let Some(display_name) = strategy.display_name(request) {
            self.sessions
                .store_session_value(&token, DISPLAY_NAME_KEY, serde_json::json!(display_name));
        }
        tracing::info!(target: "buildgate::manager", user = %user_name, "login accepted");
        self.audit.log_event(
            None,
            Some(&user_name),
            SecurityEvent::Login,
            Some(Right::Allow),
            "login accepted",
        );
        Some(token)
    }

    fn logout(&self, token: &str) {
        // Resolve first so the audit record can name the user
        if let Some(user_name) = self.sessions.retrieve_from_cache(token) {
            self.sessions.remove_from_cache(token);
            self.audit.log_event(
                None,
                Some(&user_name),
                SecurityEvent::Logout,
                None,
                "logout",
            );
        }
    }

    fn validate_session(&self, token: Option<&str>) -> bool {
        match token {
            Some(token) if !token.is_empty() => self.sessions.retrieve_from_cache(token).is_some(),
            _ => false,
        }
    }

    fn get_user_name(&self, token: &str) -> Option<String> {
        self.sessions.retrieve_from_cache(token)
    }

    fn get_display_name(&self, token: &str) -> Option<String> {
        self.sessions
            .retrieve_session_value(token, DISPLAY_NAME_KEY)
            .and_then(|value| value.as_str().map(str::to_string))
    }

    fn change_password(
        &self,
        token: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), SecurityError> {
        let user_name = self
            .get_user_name(token)
            .ok_or(SecurityError::SessionInvalid)?;

        // Unknown user and wrong password are indistinguishable on purpose
        let strategy = self
            .strategy_for(&user_name)
            .ok_or(SecurityError::InvalidPassword)?;
        let verification = CredentialRequest::with_password(user_name.clone(), old_password);
        if !strategy.authenticate(&verification) {
            self.audit.log_event(
                None,
                Some(&user_name),
                SecurityEvent::ChangePassword,
                Some(Right::Deny),
                "password change rejected: current password did not verify",
            );
            return Err(SecurityError::InvalidPassword);
        }

        strategy.change_password(new_password)?;
        self.audit.log_event(
            None,
            Some(&user_name),
            SecurityEvent::ChangePassword,
            Some(Right::Allow),
            "password changed",
        );
        Ok(())
    }

    fn reset_password(
        &self,
        token: &str,
        target_user: &str,
        new_password: &str,
    ) -> Result<(), SecurityError> {
        let acting_user = self
            .get_user_name(token)
            .ok_or(SecurityError::SessionInvalid)?;

        if !self.check_server_permission(&acting_user, PermissionKind::ModifySecurity)? {
            self.audit.log_event(
                None,
                Some(&acting_user),
                SecurityEvent::ResetPassword,
                Some(Right::Deny),
                &format!("password reset for '{target_user}' denied"),
            );
            return Err(SecurityError::PermissionDenied { user: acting_user });
        }

        let strategy = self
            .strategy_for(target_user)
            .ok_or(SecurityError::InvalidPassword)?;
        strategy.change_password(new_password)?;
        self.audit.log_event(
            None,
            Some(&acting_user),
            SecurityEvent::ResetPassword,
            Some(Right::Allow),
            &format!("password reset for '{target_user}'"),
        );
        Ok(())
    }

    fn list_all_users(&self) -> Vec<UserDetails> {
        self.strategies
            .iter()
            .map(|strategy| {
                let request = CredentialRequest::for_user(strategy.identifier());
                UserDetails {
                    user_name: strategy.identifier().to_string(),
                    display_name: strategy.display_name(&request),
                }
            })
            .collect()
    }

    fn check_server_permission(
        &self,
        user_name: &str,
        kind: PermissionKind,
    ) -> Result<bool, SecurityError> {
        let allowed = self
            .authorization
            .check_permission(self, user_name, kind, Right::Deny)?;
        // Every resolved decision reaches the trail, denials included
        self.audit.log_event(
            None,
            Some(user_name),
            SecurityEvent::CheckPermission,
            Some(if allowed { Right::Allow } else { Right::Deny }),
            &format!("server permission check: {kind:?}"),
        );
        Ok(allowed)
    }

    fn log_event(
        &self,
        project_name: Option<&str>,
        user_name: Option<&str>,
        event_kind: SecurityEvent,
        right: Option<Right>,
        message: &str,
    ) {
        self.audit
            .log_event(project_name, user_name, event_kind, right, message);
    }

    fn read_audit_records(
        &self,
        start: usize,
        count: usize,
        filter: &AuditFilter,
    ) -> Vec<AuditRecord> {
        self.audit.read_records(start, count, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::InMemoryAuditLogger;
    use crate::auth::{UserNameAuthentication, UserPasswordAuthentication};
    use crate::clock::ManualClock;
    use crate::permission::{PermissionReference, UserPermission};
    use crate::session::{InMemorySessionStore, SessionConfig};

    fn manager_with(
        strategies: Vec<Arc<dyn AuthenticationStrategy>>,
    ) -> (CoreSecurityManager, Arc<InMemoryAuditLogger>) {
        let clock = Arc::new(ManualClock::default());
        let sessions = Arc::new(InMemorySessionStore::new(
            SessionConfig::default(),
            clock.clone(),
        ));
        let sink = Arc::new(InMemoryAuditLogger::new());
        let audit = AuditLog::new(clock, vec![sink.clone()], Some(sink.clone()));
        (CoreSecurityManager::new(strategies, sessions, audit), sink)
    }

    fn johndoe_manager() -> (CoreSecurityManager, Arc<InMemoryAuditLogger>) {
        manager_with(vec![Arc::new(UserPasswordAuthentication::new(
            "johndoe", "iknowyou",
        ))])
    }

    #[test]
    fn test_login_success_returns_token() {
        let (manager, sink) = johndoe_manager();
        let token = manager
            .login(&CredentialRequest::with_password("johndoe", "iknowyou"))
            .unwrap();
        assert!(manager.validate_session(Some(&token)));
        assert_eq!(manager.get_user_name(&token).as_deref(), Some("johndoe"));

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event_kind, SecurityEvent::Login);
        assert_eq!(records[0].right, Some(Right::Allow));
    }

    #[test]
    fn test_login_failure_is_rejection_not_error() {
        let (manager, sink) = johndoe_manager();
        assert!(manager
            .login(&CredentialRequest::with_password("johndoe", "wrong"))
            .is_none());
        assert!(manager
            .login(&CredentialRequest::with_password("stranger", "iknowyou"))
            .is_none());
        assert!(manager.login(&CredentialRequest::default()).is_none());

        // All three rejections were audited as denials
        let records = sink.records();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.right == Some(Right::Deny)));
    }

    #[test]
    fn test_first_matching_strategy_wins() {
        // The wildcard strategy is configured first and has no secret, so
        // a johndoe login never reaches the password strategy behind it.
        let (manager, _sink) = manager_with(vec![
            Arc::new(UserNameAuthentication::new("*doe")),
            Arc::new(UserPasswordAuthentication::new("johndoe", "iknowyou")),
        ]);
        let token = manager.login(&CredentialRequest::for_user("johndoe"));
        assert!(token.is_some());
    }

    #[test]
    fn test_login_stores_display_name() {
        let (manager, _sink) = manager_with(vec![Arc::new(
            UserPasswordAuthentication::new("johndoe", "iknowyou").with_display_name("John Doe"),
        )]);
        let token = manager
            .login(&CredentialRequest::with_password("johndoe", "iknowyou"))
            .unwrap();
        assert_eq!(manager.get_display_name(&token).as_deref(), Some("John Doe"));
    }

    #[test]
    fn test_logout_invalidates_token() {
        let (manager, sink) = johndoe_manager();
        let token = manager
            .login(&CredentialRequest::with_password("johndoe", "iknowyou"))
            .unwrap();
        manager.logout(&token);
        assert!(!manager.validate_session(Some(&token)));
        assert_eq!(manager.get_user_name(&token), None);

        let records = sink.records();
        assert_eq!(records.last().unwrap().event_kind, SecurityEvent::Logout);
    }

    #[test]
    fn test_logout_unknown_token_is_silent() {
        let (manager, sink) = johndoe_manager();
        manager.logout("nosuchtoken");
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_empty_token_is_always_invalid() {
        let (manager, _sink) = johndoe_manager();
        assert!(!manager.validate_session(None));
        assert!(!manager.validate_session(Some("")));
    }

    #[test]
    fn test_change_password_requires_valid_session() {
        let (manager, _sink) = johndoe_manager();
        let err = manager
            .change_password("nosuchtoken", "iknowyou", "newpass")
            .unwrap_err();
        assert!(matches!(err, SecurityError::SessionInvalid));
    }

    #[test]
    fn test_change_password_requires_verifying_old_password() {
        let (manager, sink) = johndoe_manager();
        let token = manager
            .login(&CredentialRequest::with_password("johndoe", "iknowyou"))
            .unwrap();
        let err = manager
            .change_password(&token, "wrong", "newpass")
            .unwrap_err();
        assert!(matches!(err, SecurityError::InvalidPassword));
        assert_eq!(
            sink.records().last().unwrap().event_kind,
            SecurityEvent::ChangePassword
        );
        assert_eq!(sink.records().last().unwrap().right, Some(Right::Deny));
    }

    #[test]
    fn test_change_password_visible_to_next_login() {
        let (manager, _sink) = johndoe_manager();
        let token = manager
            .login(&CredentialRequest::with_password("johndoe", "iknowyou"))
            .unwrap();
        manager
            .change_password(&token, "iknowyou", "newpass")
            .unwrap();

        assert!(manager
            .login(&CredentialRequest::with_password("johndoe", "iknowyou"))
            .is_none());
        let second = manager
            .login(&CredentialRequest::with_password("johndoe", "newpass"))
            .unwrap();
        assert_ne!(second, token);
    }

    #[test]
    fn test_reset_password_requires_modify_security() {
        let admin_rights: Arc<dyn Permission> = Arc::new(
            UserPermission::new("admin", Right::Deny, Right::Inherit, Right::Inherit, Right::Inherit)
                .with_right(PermissionKind::ModifySecurity, Right::Allow),
        );
        let (manager, _sink) = manager_with(vec![
            Arc::new(UserPasswordAuthentication::new("admin", "adminpw")),
            Arc::new(UserPasswordAuthentication::new("johndoe", "iknowyou")),
        ]);
        let manager = manager.with_server_authorization(DefaultAuthorization::new(
            Right::Deny,
            vec![admin_rights],
        ));

        // johndoe may not reset anyone's password
        let token = manager
            .login(&CredentialRequest::with_password("johndoe", "iknowyou"))
            .unwrap();
        let err = manager
            .reset_password(&token, "admin", "stolen")
            .unwrap_err();
        assert!(matches!(err, SecurityError::PermissionDenied { .. }));

        // admin may, and no old password is needed
        let admin_token = manager
            .login(&CredentialRequest::with_password("admin", "adminpw"))
            .unwrap();
        manager
            .reset_password(&admin_token, "johndoe", "issued")
            .unwrap();
        assert!(manager
            .login(&CredentialRequest::with_password("johndoe", "issued"))
            .is_some());
    }

    #[test]
    fn test_reset_password_requires_valid_session() {
        let (manager, _sink) = johndoe_manager();
        let err = manager
            .reset_password("nosuchtoken", "johndoe", "newpass")
            .unwrap_err();
        assert!(matches!(err, SecurityError::SessionInvalid));
    }

    #[test]
    fn test_server_permission_decisions_are_audited() {
        let builder_rights: Arc<dyn Permission> = Arc::new(UserPermission::new(
            "johndoe",
            Right::Inherit,
            Right::Inherit,
            Right::Allow,
            Right::Inherit,
        ));
        let (manager, sink) = johndoe_manager();
        let manager = manager.with_server_authorization(DefaultAuthorization::new(
            Right::Deny,
            vec![builder_rights],
        ));

        assert!(manager
            .check_server_permission("johndoe", PermissionKind::ForceAbortBuild)
            .unwrap());
        assert!(!manager
            .check_server_permission("janedoe", PermissionKind::ForceAbortBuild)
            .unwrap());

        // Both the grant and the denial landed in the trail
        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert!(records
            .iter()
            .all(|r| r.event_kind == SecurityEvent::CheckPermission));
        assert_eq!(records[0].user_name.as_deref(), Some("johndoe"));
        assert_eq!(records[0].right, Some(Right::Allow));
        assert_eq!(records[1].user_name.as_deref(), Some("janedoe"));
        assert_eq!(records[1].right, Some(Right::Deny));
    }

    #[test]
    fn test_retrieve_permission_not_found_is_none() {
        let (manager, _sink) = johndoe_manager();
        assert!(manager.retrieve_permission("doesNotExist").is_none());
    }

    #[test]
    fn test_reference_resolution_through_manager() {
        let target: Arc<dyn Permission> = Arc::new(UserPermission::new(
            "johndoe",
            Right::Deny,
            Right::Allow,
            Right::Inherit,
            Right::Inherit,
        ));
        let (manager, _sink) = johndoe_manager();
        let manager = manager.with_permission("messaging", target);

        let reference = PermissionReference::new("messaging");
        assert_eq!(
            reference
                .check_permission(&manager, PermissionKind::SendMessage)
                .unwrap(),
            Right::Allow
        );

        let dangling = PermissionReference::new("doesNotExist");
        assert!(matches!(
            dangling.check_user(&manager, "johndoe").unwrap_err(),
            SecurityError::BadReference(_)
        ));
    }

    #[test]
    fn test_list_all_users() {
        let (manager, _sink) = manager_with(vec![
            Arc::new(UserPasswordAuthentication::new("johndoe", "pw").with_display_name("John Doe")),
            Arc::new(UserNameAuthentication::new("*guest")),
        ]);
        let users = manager.list_all_users();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].user_name, "johndoe");
        assert_eq!(users[0].display_name.as_deref(), Some("John Doe"));
        assert_eq!(users[1].user_name, "*guest");
    }

    #[test]
    fn test_audit_read_back_through_manager() {
        let (manager, _sink) = johndoe_manager();
        manager.log_event(
            Some("ccnet"),
            Some("johndoe"),
            SecurityEvent::ForceBuild,
            Some(Right::Allow),
            "forced a build",
        );
        let records = manager.read_audit_records(
            0,
            10,
            &AuditFilter::new().by_project("ccnet"),
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event_kind, SecurityEvent::ForceBuild);
    }
}
