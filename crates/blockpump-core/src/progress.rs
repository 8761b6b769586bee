// Blockpump - Block Migration for Content-Addressed Stores
// Copyright (C) 2026 Blockpump Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! Progress reporting.

use crate::block::TotalCount;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Receives one increment per processed key, successful or not
pub trait ProgressWriter: Send + Sync {
    /// Announce how many keys the run expects
    fn set_total(&self, total: TotalCount);

    /// One more key processed
    fn increment(&self);

    /// The run is over
    fn finish(&self) {}
}

/// Atomic counter; clones share the same counts
#[derive(Debug, Clone)]
pub struct CountingProgress {
    count: Arc<AtomicU64>,
    // u64::MAX marks an unknown total
    total: Arc<AtomicU64>,
}

impl CountingProgress {
    pub fn new() -> Self {
        CountingProgress {
            count: Arc::new(AtomicU64::new(0)),
            total: Arc::new(AtomicU64::new(u64::MAX)),
        }
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> TotalCount {
        match self.total.load(Ordering::Relaxed) {
            u64::MAX => TotalCount::Unknown,
            n => TotalCount::Known(n),
        }
    }
}

impl Default for CountingProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressWriter for CountingProgress {
    fn set_total(&self, total: TotalCount) {
        self.total
            .store(total.known().unwrap_or(u64::MAX), Ordering::Relaxed);
    }

    fn increment(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_progress() {
        let progress = CountingProgress::new();
        assert_eq!(progress.total(), TotalCount::Unknown);

        progress.set_total(TotalCount::Known(3));
        let shared = progress.clone();
        shared.increment();
        shared.increment();

        assert_eq!(progress.count(), 2);
        assert_eq!(progress.total(), TotalCount::Known(3));
    }
}
