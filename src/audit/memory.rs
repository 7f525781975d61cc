// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! In-memory audit buffer. Doubles as a reader; mostly useful for tests and
//! for deployments that only want the most recent decisions queryable.

use std::sync::RwLock;

use crate::locks::{resilient_read, resilient_write};

use super::{AuditFilter, AuditLogger, AuditReader, AuditRecord};

/// Bounded in-memory audit buffer, oldest records evicted first.
pub struct InMemoryAuditLogger {
    capacity: usize,
    records: RwLock<Vec<AuditRecord>>,
}

impl InMemoryAuditLogger {
    /// Buffer holding the most recent 10,000 records.
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            records: RwLock::new(Vec::new()),
        }
    }

    /// Snapshot of the buffered records, oldest first.
    pub fn records(&self) -> Vec<AuditRecord> {
        resilient_read(&self.records).clone()
    }

    pub fn clear(&self) {
        resilient_write(&self.records).clear();
    }
}

impl Default for InMemoryAuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLogger for InMemoryAuditLogger {
    fn log(&self, record: &AuditRecord) -> anyhow::Result<()> {
        let mut records = resilient_write(&self.records);
        records.push(record.clone());
        if records.len() > self.capacity {
            records.remove(0);
        }
        Ok(())
    }
}

impl AuditReader for InMemoryAuditLogger {
    fn read(&self, start: usize, count: usize, filter: &AuditFilter) -> Vec<AuditRecord> {
        resilient_read(&self.records)
            .iter()
            .filter(|record| filter.matches(record))
            .skip(start)
            .take(count)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::SecurityEvent;
    use crate::permission::Right;
    use chrono::Utc;

    fn record(project: &str) -> AuditRecord {
        AuditRecord {
            time_of_event: Utc::now(),
            project_name: Some(project.to_string()),
            user_name: Some("johndoe".to_string()),
            event_kind: SecurityEvent::ForceBuild,
            right: Some(Right::Allow),
            message: String::new(),
        }
    }

    #[test]
    fn test_filtered_read_preserves_order() {
        let logger = InMemoryAuditLogger::new();
        for project in ["a", "b", "a", "c", "a"] {
            logger.log(&record(project)).unwrap();
        }

        let filter = AuditFilter::new().by_project("a");
        let matched = logger.read(0, 100, &filter);
        assert_eq!(matched.len(), 3);
        assert!(matched
            .iter()
            .all(|r| r.project_name.as_deref() == Some("a")));
    }

    #[test]
    fn test_paging_applies_after_filtering() {
        let logger = InMemoryAuditLogger::new();
        for _ in 0..5 {
            logger.log(&record("a")).unwrap();
            logger.log(&record("b")).unwrap();
        }

        let filter = AuditFilter::new().by_project("a");
        assert_eq!(logger.read(0, 2, &filter).len(), 2);
        assert_eq!(logger.read(4, 2, &filter).len(), 1);
        assert_eq!(logger.read(5, 2, &filter).len(), 0);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let logger = InMemoryAuditLogger::with_capacity(3);
        for project in ["a", "b", "c", "d"] {
            logger.log(&record(project)).unwrap();
        }
        let records = logger.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].project_name.as_deref(), Some("b"));
    }
}
