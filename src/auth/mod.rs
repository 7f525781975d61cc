// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Authentication strategies.
//!
//! Each configured identity source is one [`AuthenticationStrategy`]. The
//! security manager walks its ordered strategy list, hands the login request
//! to the first strategy whose identifier matches the claimed username, and
//! lets that strategy decide whether the credentials are genuine. Matching
//! is a pure string predicate and says nothing about whether authentication
//! will subsequently succeed.
//!
//! Identifiers may carry a single `*` wildcard: `*doe` matches any username
//! ending in `doe`, `john*` any starting with `john`, and `j*e` requires
//! both the prefix and the suffix.

mod directory;
mod name_only;
mod password;

pub use directory::{DirectoryAuthentication, DirectoryService};
pub use name_only::UserNameAuthentication;
pub use password::UserPasswordAuthentication;

use std::collections::HashMap;

use crate::errors::SecurityError;

/// Well-known credential field carrying the claimed username.
pub const USERNAME_CREDENTIAL: &str = "username";

/// Well-known credential field carrying the secret.
pub const PASSWORD_CREDENTIAL: &str = "password";

/// The named credential fields submitted with one login attempt.
///
/// Immutable once constructed; built per attempt and discarded after use.
#[derive(Debug, Clone, Default)]
pub struct CredentialRequest {
    fields: HashMap<String, String>,
}

impl CredentialRequest {
    /// Request carrying only a claimed username.
    pub fn for_user(user_name: impl Into<String>) -> Self {
        Self::from_fields([(USERNAME_CREDENTIAL.to_string(), user_name.into())])
    }

    /// Request carrying a username and a password.
    pub fn with_password(user_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self::from_fields([
            (USERNAME_CREDENTIAL.to_string(), user_name.into()),
            (PASSWORD_CREDENTIAL.to_string(), password.into()),
        ])
    }

    /// Request built from arbitrary named fields.
    pub fn from_fields(fields: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
        }
    }

    /// Look up a credential field by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// The claimed username, if one was submitted.
    pub fn user_name(&self) -> Option<&str> {
        self.get(USERNAME_CREDENTIAL)
    }

    /// The submitted password, if one was submitted.
    pub fn password(&self) -> Option<&str> {
        self.get(PASSWORD_CREDENTIAL)
    }
}

/// A pluggable identity verifier.
///
/// Implementations never panic or error on bad input: a missing or wrong
/// credential simply fails authentication (fail closed).
pub trait AuthenticationStrategy: Send + Sync {
    /// The configured identifier pattern this strategy answers for.
    fn identifier(&self) -> &str;

    /// Whether this strategy answers for the given claimed username.
    fn matches(&self, identifier: &str) -> bool {
        wildcard_matches(self.identifier(), identifier)
    }

    /// Check the submitted credentials. A request without a username
    /// credential always fails, regardless of variant.
    fn authenticate(&self, request: &CredentialRequest) -> bool;

    /// Canonical username for a successful request.
    fn user_name(&self, request: &CredentialRequest) -> Option<String> {
        request.user_name().map(str::to_string)
    }

    /// Display name for a successful request; falls back to the username.
    fn display_name(&self, request: &CredentialRequest) -> Option<String> {
        self.user_name(request)
    }

    /// Replace the stored secret. Variants without a stored secret return
    /// [`SecurityError::NotSupported`].
    fn change_password(&self, new_password: &str) -> Result<(), SecurityError> {
        let _ = new_password;
        Err(SecurityError::NotSupported(
            "this authentication strategy does not store a password",
        ))
    }
}

/// Match `candidate` against `pattern` containing at most one `*` token.
///
/// A bare `*` matches everything; `*x` is a suffix match, `x*` a prefix
/// match, and `a*b` requires both ends. Without a `*` the match is exact.
pub fn wildcard_matches(pattern: &str, candidate: &str) -> bool {
    match pattern.find('*') {
        None => pattern == candidate,
        Some(pos) => {
            let (prefix, rest) = pattern.split_at(pos);
            let suffix = &rest[1..];
            candidate.len() >= prefix.len() + suffix.len()
                && candidate.starts_with(prefix)
                && candidate.ends_with(suffix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_suffix() {
        assert!(wildcard_matches("*doe", "johndoe"));
        assert!(wildcard_matches("*doe", "janedoe"));
        assert!(wildcard_matches("*doe", "doe"));
        assert!(!wildcard_matches("*doe", "doethe"));
        assert!(!wildcard_matches("*doe", "johnd"));
    }

    #[test]
    fn test_wildcard_prefix() {
        assert!(wildcard_matches("john*", "johndoe"));
        assert!(wildcard_matches("john*", "john"));
        assert!(!wildcard_matches("john*", "jondoe"));
    }

    #[test]
    fn test_wildcard_both_ends() {
        assert!(wildcard_matches("j*e", "janedoe"));
        assert!(wildcard_matches("j*e", "je"));
        // Too short to satisfy both ends without overlap
        assert!(!wildcard_matches("jo*oe", "joe"));
        assert!(!wildcard_matches("j*e", "jane!"));
    }

    #[test]
    fn test_wildcard_bare_star_matches_all() {
        assert!(wildcard_matches("*", ""));
        assert!(wildcard_matches("*", "anyone"));
    }

    #[test]
    fn test_exact_match_without_star() {
        assert!(wildcard_matches("johndoe", "johndoe"));
        assert!(!wildcard_matches("johndoe", "JohnDoe"));
        assert!(!wildcard_matches("johndoe", "johndo"));
    }

    #[test]
    fn test_credential_request_fields() {
        let request = CredentialRequest::with_password("johndoe", "iknowyou");
        assert_eq!(request.user_name(), Some("johndoe"));
        assert_eq!(request.password(), Some("iknowyou"));
        assert_eq!(request.get("domain"), None);
    }

    #[test]
    fn test_credential_request_user_only() {
        let request = CredentialRequest::for_user("johndoe");
        assert_eq!(request.user_name(), Some("johndoe"));
        assert_eq!(request.password(), None);
    }
}
