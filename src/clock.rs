// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Injectable time source.
//!
//! Session expiry is entirely time-driven, so every component that computes
//! an age takes an `Arc<dyn Clock>` instead of calling `Utc::now()` inline.
//! Production code uses [`SystemClock`]; tests use [`ManualClock`] and
//! advance it deterministically.

use chrono::{DateTime, Duration, Utc};
use std::sync::RwLock;

use crate::locks::{resilient_read, resilient_write};

/// A source of "now".
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;
}

/// Real wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for deterministic expiry tests.
///
/// Starts at the time it was constructed with and only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a manual clock pinned at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut now = resilient_write(&self.now);
        *now = *now + delta;
    }

    /// Pin the clock at an absolute time.
    pub fn set(&self, at: DateTime<Utc>) {
        *resilient_write(&self.now) = at;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *resilient_read(&self.now)
    }
}
