// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! In-memory session store. The default: fast, concurrency-safe, lost on
//! process restart.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::clock::Clock;
use crate::errors::SecurityError;
use crate::locks::{resilient_read, resilient_write};

use super::{generate_token, SessionConfig, SessionRecord, SessionStore};

/// Volatile session store backed by an `RwLock`'d map.
pub struct InMemorySessionStore {
    config: SessionConfig,
    clock: Arc<dyn Clock>,
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl InMemorySessionStore {
    pub fn new(config: SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Expiry check, lazy delete and sliding touch for one token, all under
    /// the write lock already held by the caller.
    fn access<'a>(
        &self,
        sessions: &'a mut HashMap<String, SessionRecord>,
        token: &str,
    ) -> Option<&'a mut SessionRecord> {
        let now = self.clock.now();
        let expired = match sessions.get(token) {
            Some(record) => record.is_expired(&self.config, now),
            None => return None,
        };
        if expired {
            sessions.remove(token);
            tracing::debug!(target: "buildgate::session", token, "session expired on access");
            return None;
        }
        let record = sessions.get_mut(token)?;
        record.touch(now);
        Some(record)
    }
}

impl SessionStore for InMemorySessionStore {
    fn initialise(&self) -> Result<(), SecurityError> {
        Ok(())
    }

    fn add_to_cache(&self, user_name: &str) -> String {
        let token = generate_token();
        let record = SessionRecord::new(token.clone(), user_name.to_string(), self.clock.now());
        resilient_write(&self.sessions).insert(token.clone(), record);
        tracing::debug!(target: "buildgate::session", user = user_name, "session opened");
        token
    }

    fn retrieve_from_cache(&self, token: &str) -> Option<String> {
        let mut sessions = resilient_write(&self.sessions);
        self.access(&mut sessions, token)
            .map(|record| record.user_name.clone())
    }

    fn remove_from_cache(&self, token: &str) {
        if resilient_write(&self.sessions).remove(token).is_some() {
            tracing::debug!(target: "buildgate::session", token, "session removed");
        }
    }

    fn store_session_value(&self, token: &str, key: &str, value: serde_json::Value) {
        let mut sessions = resilient_write(&self.sessions);
        if let Some(record) = self.access(&mut sessions, token) {
            record.side_values.insert(key.to_string(), value);
        }
    }

    fn retrieve_session_value(&self, token: &str, key: &str) -> Option<serde_json::Value> {
        let mut sessions = resilient_write(&self.sessions);
        self.access(&mut sessions, token)
            .and_then(|record| record.side_values.get(key).cloned())
    }

    fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = resilient_write(&self.sessions);
        let before = sessions.len();
        sessions.retain(|_, record| !record.is_expired(&self.config, now));
        before - sessions.len()
    }

    fn active_session_count(&self) -> usize {
        let now = self.clock.now();
        resilient_read(&self.sessions)
            .values()
            .filter(|record| !record.is_expired(&self.config, now))
            .count()
    }
}
