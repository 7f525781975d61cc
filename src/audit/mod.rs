// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Audit trail for security decisions.
//!
//! Every authorization decision and security-relevant action (login, logout,
//! password change) is pushed through [`AuditLog`], which fans out
//! synchronously to every configured [`AuditLogger`]. A failing logger is
//! isolated: it is reported through `tracing` and never stops the other
//! loggers or the operation being audited.
//!
//! Reading back goes through an optional [`AuditReader`]; with none
//! configured, reads return an empty collection. Free-text messages pass a
//! secret-redaction filter before any logger sees them, so a careless caller
//! cannot leak a credential into the trail.

mod file;
mod memory;

pub use file::{FileAuditLogger, FileAuditReader};
pub use memory::InMemoryAuditLogger;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};

use crate::clock::Clock;
use crate::permission::Right;

/// Redaction patterns for sensitive data.
/// These are static, compile-time-validated regex patterns; a failure to
/// compile is a programmer error caught by the unit tests.
static REDACTION_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"(?i)password[=:]\s*\S+").expect("password regex is valid"),
            "password=[REDACTED]",
        ),
        (
            Regex::new(r"Bearer [a-zA-Z0-9\-._~+/]+=*").expect("bearer token regex is valid"),
            "Bearer [REDACTED]",
        ),
        (
            Regex::new(r"\b[a-fA-F0-9]{32,}\b").expect("token regex is valid"),
            "[REDACTED_TOKEN]",
        ),
    ]
});

/// Strip credentials and tokens from free text before it is logged.
pub fn redact_secrets(text: &str) -> String {
    let mut result = text.to_string();
    for (pattern, replacement) in REDACTION_PATTERNS.iter() {
        result = pattern.replace_all(&result, *replacement).to_string();
    }
    result
}

/// Security-relevant event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityEvent {
    Login,
    Logout,
    ChangePassword,
    ResetPassword,
    ForceBuild,
    AbortBuild,
    SendMessage,
    StartProject,
    StopProject,
    ViewAuditLog,
    /// An authorization decision resolved by a security manager.
    CheckPermission,
}

impl SecurityEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "LOGIN",
            Self::Logout => "LOGOUT",
            Self::ChangePassword => "CHANGE_PASSWORD",
            Self::ResetPassword => "RESET_PASSWORD",
            Self::ForceBuild => "FORCE_BUILD",
            Self::AbortBuild => "ABORT_BUILD",
            Self::SendMessage => "SEND_MESSAGE",
            Self::StartProject => "START_PROJECT",
            Self::StopProject => "STOP_PROJECT",
            Self::ViewAuditLog => "VIEW_AUDIT_LOG",
            Self::CheckPermission => "CHECK_PERMISSION",
        }
    }
}

impl std::fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One appended audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub time_of_event: DateTime<Utc>,
    pub project_name: Option<String>,
    pub user_name: Option<String>,
    pub event_kind: SecurityEvent,
    /// The decision, where one was made; `None` for pure actions.
    pub right: Option<Right>,
    pub message: String,
}

/// Sink for audit records. Implementations may fail; the fan-out isolates
/// them.
pub trait AuditLogger: Send + Sync {
    fn log(&self, record: &AuditRecord) -> anyhow::Result<()>;
}

/// Source for reading the trail back, paged and optionally filtered.
pub trait AuditReader: Send + Sync {
    /// Return at most `count` records starting at offset `start` of the
    /// filtered, chronologically-ordered trail.
    fn read(&self, start: usize, count: usize, filter: &AuditFilter) -> Vec<AuditRecord>;
}

/// Conjunction of optional audit predicates. An empty filter matches
/// everything.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    project: Option<String>,
    user: Option<String>,
    kinds: Option<Vec<SecurityEvent>>,
    rights: Option<Vec<Right>>,
    from: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
}

impl AuditFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn by_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn by_kinds(mut self, kinds: impl IntoIterator<Item = SecurityEvent>) -> Self {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    pub fn by_rights(mut self, rights: impl IntoIterator<Item = Right>) -> Self {
        self.rights = Some(rights.into_iter().collect());
        self
    }

    /// Records at or after `from` (inclusive).
    pub fn from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    /// Records at or before `until` (inclusive).
    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    /// Whether a record satisfies every supplied predicate.
    pub fn matches(&self, record: &AuditRecord) -> bool {
        if let Some(project) = &self.project {
            if record.project_name.as_deref() != Some(project.as_str()) {
                return false;
            }
        }
        if let Some(user) = &self.user {
            if record.user_name.as_deref() != Some(user.as_str()) {
                return false;
            }
        }
        if let Some(kinds) = &self.kinds {
            if !kinds.contains(&record.event_kind) {
                return false;
            }
        }
        if let Some(rights) = &self.rights {
            match record.right {
                Some(right) if rights.contains(&right) => {}
                _ => return false,
            }
        }
        if let Some(from) = self.from {
            if record.time_of_event < from {
                return false;
            }
        }
        if let Some(until) = self.until {
            if record.time_of_event > until {
                return false;
            }
        }
        true
    }
}

/// Fan-out logger plus optional filtered reader.
pub struct AuditLog {
    clock: Arc<dyn Clock>,
    loggers: Vec<Arc<dyn AuditLogger>>,
    reader: Option<Arc<dyn AuditReader>>,
}

impl AuditLog {
    pub fn new(
        clock: Arc<dyn Clock>,
        loggers: Vec<Arc<dyn AuditLogger>>,
        reader: Option<Arc<dyn AuditReader>>,
    ) -> Self {
        Self {
            clock,
            loggers,
            reader,
        }
    }

    /// Audit log that drops everything and reads nothing.
    pub fn disabled(clock: Arc<dyn Clock>) -> Self {
        Self::new(clock, Vec::new(), None)
    }

    /// Append one event, fanning out to every configured logger. A slow or
    /// broken logger cannot fail the operation being audited.
    pub fn log_event(
        &self,
        project_name: Option<&str>,
        user_name: Option<&str>,
        event_kind: SecurityEvent,
        right: Option<Right>,
        message: &str,
    ) {
        let record = AuditRecord {
            time_of_event: self.clock.now(),
            project_name: project_name.map(str::to_string),
            user_name: user_name.map(str::to_string),
            event_kind,
            right,
            message: redact_secrets(message),
        };
        for logger in &self.loggers {
            if let Err(error) = logger.log(&record) {
                tracing::error!(
                    target: "buildgate::audit",
                    %error,
                    event = %event_kind,
                    "audit logger failed; continuing with remaining loggers"
                );
            }
        }
    }

    /// Page through the trail. Never nil-panics: with no reader configured
    /// this returns an empty vector.
    pub fn read_records(&self, start: usize, count: usize, filter: &AuditFilter) -> Vec<AuditRecord> {
        match &self.reader {
            Some(reader) => reader.read(start, count, filter),
            None => Vec::new(),
        }
    }
}
