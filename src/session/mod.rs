// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Session storage.
//!
//! A session maps an opaque, unguessable token to a username plus an
//! arbitrary key/value side-table for the lifetime of a login. Two stores
//! are provided: [`InMemorySessionStore`] (the default; process lifetime
//! only) and [`FileSessionStore`] (one JSON record per session on disk,
//! reloadable across process restarts).
//!
//! Expiry is lazy: every retrieval recomputes the session's age and the
//! access that discovers an expired session deletes it. Under
//! [`SessionExpiry::Sliding`] a successful access also resets the
//! last-accessed timestamp, so a session used more often than its duration
//! never expires. Both the expiry-check-plus-touch and the
//! expiry-check-plus-delete sequences run under a single write lock, so a
//! concurrent accessor can never see an expired-but-not-yet-removed record.

mod file;
mod memory;

pub use file::FileSessionStore;
pub use memory::InMemorySessionStore;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::SecurityError;

/// How a session's lifetime is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionExpiry {
    /// Lifetime measured from creation; access pattern is irrelevant.
    Fixed,
    /// Lifetime measured from last access; each access renews it.
    Sliding,
}

/// Session store configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session duration in minutes.
    pub duration_minutes: i64,
    /// Expiry mode.
    pub expiry: SessionExpiry,
}

impl Default for SessionConfig {
    /// 24-hour sliding sessions.
    fn default() -> Self {
        Self {
            duration_minutes: 24 * 60,
            expiry: SessionExpiry::Sliding,
        }
    }
}

impl SessionConfig {
    pub fn new(duration_minutes: i64, expiry: SessionExpiry) -> Self {
        Self {
            duration_minutes,
            expiry,
        }
    }
}

/// One live session. Owned exclusively by its store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub token: String,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    #[serde(default)]
    pub side_values: HashMap<String, serde_json::Value>,
}

impl SessionRecord {
    fn new(token: String, user_name: String, now: DateTime<Utc>) -> Self {
        Self {
            token,
            user_name,
            created_at: now,
            last_accessed_at: now,
            side_values: HashMap::new(),
        }
    }

    /// Whether this record has outlived its configured duration at `now`.
    pub fn is_expired(&self, config: &SessionConfig, now: DateTime<Utc>) -> bool {
        let anchor = match config.expiry {
            SessionExpiry::Fixed => self.created_at,
            SessionExpiry::Sliding => self.last_accessed_at,
        };
        now - anchor >= Duration::minutes(config.duration_minutes)
    }

    /// Record a successful access (meaningful under sliding expiry only).
    fn touch(&mut self, now: DateTime<Utc>) {
        self.last_accessed_at = now;
    }
}

/// Generate a fresh session token: 128 random bits rendered as hex.
pub(crate) fn generate_token() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

/// Token-to-username mapping with configurable expiry.
///
/// Lookups never error: an unknown or expired token is simply `None`.
/// Storing a value against a token that does not resolve is a no-op.
pub trait SessionStore: Send + Sync {
    /// Prepare the store for use (for the durable store: reload persisted,
    /// non-expired sessions into the live index).
    fn initialise(&self) -> Result<(), SecurityError>;

    /// Open a session for `user_name` and return its token.
    fn add_to_cache(&self, user_name: &str) -> String;

    /// Resolve a token to its username. Touches the session under sliding
    /// expiry; deletes it if the access discovers it expired.
    fn retrieve_from_cache(&self, token: &str) -> Option<String>;

    /// Close a session. Unknown tokens are a silent no-op.
    fn remove_from_cache(&self, token: &str);

    /// Attach an auxiliary value to a live session.
    fn store_session_value(&self, token: &str, key: &str, value: serde_json::Value);

    /// Read back an auxiliary value. Same expiry semantics as
    /// [`SessionStore::retrieve_from_cache`].
    fn retrieve_session_value(&self, token: &str, key: &str) -> Option<serde_json::Value>;

    /// Remove every currently-expired session; returns how many went.
    fn sweep_expired(&self) -> usize;

    /// Number of live (non-expired) sessions.
    fn active_session_count(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_opaque_and_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_fixed_expiry_ignores_access() {
        let config = SessionConfig::new(1, SessionExpiry::Fixed);
        let t0 = Utc::now();
        let mut record = SessionRecord::new("t".into(), "johndoe".into(), t0);
        record.touch(t0 + Duration::seconds(59));
        assert!(!record.is_expired(&config, t0 + Duration::seconds(59)));
        assert!(record.is_expired(&config, t0 + Duration::seconds(61)));
    }

    #[test]
    fn test_sliding_expiry_renews_on_touch() {
        let config = SessionConfig::new(1, SessionExpiry::Sliding);
        let t0 = Utc::now();
        let mut record = SessionRecord::new("t".into(), "johndoe".into(), t0);
        assert!(!record.is_expired(&config, t0 + Duration::seconds(31)));
        record.touch(t0 + Duration::seconds(31));
        assert!(!record.is_expired(&config, t0 + Duration::seconds(62)));
        assert!(record.is_expired(&config, t0 + Duration::seconds(92)));
    }

    #[test]
    fn test_record_round_trips_through_json() {
        let mut record = SessionRecord::new("abc123".into(), "johndoe".into(), Utc::now());
        record
            .side_values
            .insert("display_name".into(), serde_json::json!("John Doe"));
        let encoded = serde_json::to_string(&record).unwrap();
        let decoded: SessionRecord = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.token, record.token);
        assert_eq!(decoded.user_name, record.user_name);
        assert_eq!(decoded.created_at, record.created_at);
        assert_eq!(decoded.last_accessed_at, record.last_accessed_at);
        assert_eq!(decoded.side_values, record.side_values);
    }
}
