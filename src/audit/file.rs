// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! File-backed audit trail: one JSON record per line, append-only.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use super::{AuditFilter, AuditLogger, AuditReader, AuditRecord};

/// Appends audit records as JSON lines.
pub struct FileAuditLogger {
    path: PathBuf,
    // Serializes appends from concurrent request threads so lines cannot
    // interleave.
    write_guard: Mutex<()>,
}

impl FileAuditLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl AuditLogger for FileAuditLogger {
    fn log(&self, record: &AuditRecord) -> anyhow::Result<()> {
        let line = serde_json::to_string(record)?;
        let _guard = self.write_guard.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

/// Reads a [`FileAuditLogger`] trail back, filtered and paged.
///
/// Unparseable lines are skipped with a warning rather than failing the
/// whole read; the trail may span versions of the record format.
pub struct FileAuditReader {
    path: PathBuf,
}

impl FileAuditReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AuditReader for FileAuditReader {
    fn read(&self, start: usize, count: usize, filter: &AuditFilter) -> Vec<AuditRecord> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            // No trail yet is an empty trail
            Err(_) => return Vec::new(),
        };
        BufReader::new(file)
            .lines()
            .filter_map(|line| match line {
                Ok(line) if line.trim().is_empty() => None,
                Ok(line) => match serde_json::from_str::<AuditRecord>(&line) {
                    Ok(record) => Some(record),
                    Err(error) => {
                        tracing::warn!(
                            target: "buildgate::audit",
                            %error,
                            "skipping unparseable audit line"
                        );
                        None
                    }
                },
                Err(error) => {
                    tracing::warn!(target: "buildgate::audit", %error, "audit read failed");
                    None
                }
            })
            .filter(|record| filter.matches(record))
            .skip(start)
            .take(count)
            .collect()
    }
}
