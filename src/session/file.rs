// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Durable file-backed session store.
//!
//! One JSON record per session under a configured directory, so sessions
//! survive a server restart: `initialise()` reloads everything that has not
//! expired in the meantime. The live index in memory is authoritative for
//! lookups; files exist to be reloaded.
//!
//! Writes to a given session's file take an exclusive `fs2` lock, so
//! concurrent writers cannot interleave partial records. Last writer wins;
//! cross-token operations are independent.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use fs2::FileExt;

use crate::clock::Clock;
use crate::errors::SecurityError;
use crate::locks::{resilient_read, resilient_write};

use super::{generate_token, SessionConfig, SessionRecord, SessionStore};

const SESSION_FILE_EXTENSION: &str = "json";

/// Durable session store: one persisted record per session.
pub struct FileSessionStore {
    config: SessionConfig,
    clock: Arc<dyn Clock>,
    directory: PathBuf,
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl FileSessionStore {
    pub fn new(directory: impl Into<PathBuf>, config: SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            directory: directory.into(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    fn record_path(&self, token: &str) -> PathBuf {
        self.directory
            .join(token)
            .with_extension(SESSION_FILE_EXTENSION)
    }

    fn persist(&self, record: &SessionRecord) -> Result<(), SecurityError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.record_path(&record.token))?;
        file.lock_exclusive()?;
        let result = write_record(&file, record);
        let _ = fs2::FileExt::unlock(&file);
        result
    }

    /// Persist, but never let a disk fault break an in-memory session that
    /// is already live.
    fn persist_logged(&self, record: &SessionRecord) {
        if let Err(error) = self.persist(record) {
            tracing::warn!(
                target: "buildgate::session",
                token = %record.token,
                %error,
                "failed to persist session record"
            );
        }
    }

    fn delete_file(&self, token: &str) {
        let path = self.record_path(token);
        if path.exists() {
            if let Err(error) = fs::remove_file(&path) {
                tracing::warn!(
                    target: "buildgate::session",
                    token,
                    %error,
                    "failed to delete session record"
                );
            }
        }
    }

    fn load_record(path: &Path) -> Result<SessionRecord, SecurityError> {
        let file = File::open(path)?;
        file.lock_shared()?;
        let record = serde_json::from_reader(BufReader::new(&file))?;
        let _ = fs2::FileExt::unlock(&file);
        Ok(record)
    }

    /// Expiry check, lazy delete and sliding touch under the caller's write
    /// lock. Touches are persisted only under sliding expiry, where the
    /// timestamp matters across a restart.
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
            self.delete_file(token);
            tracing::debug!(target: "buildgate::session", token, "session expired on access");
            return None;
        }
        let record = sessions.get_mut(token)?;
        record.touch(now);
        Some(record)
    }

    fn is_sliding(&self) -> bool {
        self.config.expiry == super::SessionExpiry::Sliding
    }
}

fn write_record(mut file: &File, record: &SessionRecord) -> Result<(), SecurityError> {
    serde_json::to_writer_pretty(file, record)?;
    file.flush()?;
    Ok(())
}

impl SessionStore for FileSessionStore {
    fn initialise(&self) -> Result<(), SecurityError> {
        fs::create_dir_all(&self.directory)?;
        let now = self.clock.now();
        let mut loaded = 0usize;
        let mut sessions = resilient_write(&self.sessions);
        sessions.clear();
        for entry in fs::read_dir(&self.directory)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SESSION_FILE_EXTENSION) {
                continue;
            }
            match Self::load_record(&path) {
                Ok(record) if record.is_expired(&self.config, now) => {
                    let _ = fs::remove_file(&path);
                }
                Ok(record) => {
                    sessions.insert(record.token.clone(), record);
                    loaded += 1;
                }
                Err(error) => {
                    // Unreadable record: drop it rather than refuse to start
                    tracing::warn!(
                        target: "buildgate::session",
                        path = %path.display(),
                        %error,
                        "discarding unreadable session record"
                    );
                    let _ = fs::remove_file(&path);
                }
            }
        }
        tracing::info!(
            target: "buildgate::session",
            directory = %self.directory.display(),
            loaded,
            "file session store initialised"
        );
        Ok(())
    }

    fn add_to_cache(&self, user_name: &str) -> String {
        let token = generate_token();
        let record = SessionRecord::new(token.clone(), user_name.to_string(), self.clock.now());
        self.persist_logged(&record);
        resilient_write(&self.sessions).insert(token.clone(), record);
        tracing::debug!(target: "buildgate::session", user = user_name, "session opened");
        token
    }

    fn retrieve_from_cache(&self, token: &str) -> Option<String> {
        let mut sessions = resilient_write(&self.sessions);
        let record = self.access(&mut sessions, token)?;
        let user_name = record.user_name.clone();
        if self.is_sliding() {
            let snapshot = record.clone();
            self.persist_logged(&snapshot);
        }
        Some(user_name)
    }

    fn remove_from_cache(&self, token: &str) {
        if resilient_write(&self.sessions).remove(token).is_some() {
            tracing::debug!(target: "buildgate::session", token, "session removed");
        }
        self.delete_file(token);
    }

    fn store_session_value(&self, token: &str, key: &str, value: serde_json::Value) {
        let mut sessions = resilient_write(&self.sessions);
        if let Some(record) = self.access(&mut sessions, token) {
            record.side_values.insert(key.to_string(), value);
            let snapshot = record.clone();
            self.persist_logged(&snapshot);
        }
    }

    fn retrieve_session_value(&self, token: &str, key: &str) -> Option<serde_json::Value> {
        let mut sessions = resilient_write(&self.sessions);
        let record = self.access(&mut sessions, token)?;
        let value = record.side_values.get(key).cloned();
        if self.is_sliding() {
            let snapshot = record.clone();
            self.persist_logged(&snapshot);
        }
        value
    }

    fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = resilient_write(&self.sessions);
        let expired: Vec<String> = sessions
            .values()
            .filter(|record| record.is_expired(&self.config, now))
            .map(|record| record.token.clone())
            .collect();
        for token in &expired {
            sessions.remove(token);
            self.delete_file(token);
        }
        expired.len()
    }

    fn active_session_count(&self) -> usize {
        let now = self.clock.now();
        resilient_read(&self.sessions)
            .values()
            .filter(|record| !record.is_expired(&self.config, now))
            .count()
    }
}
