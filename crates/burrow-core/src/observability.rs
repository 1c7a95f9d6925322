use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Snapshot of per-handle counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Rewrite transactions committed by this handle (pull, delete, refresh).
    pub transactions: u64,
    /// Malformed lines dropped by those rewrites.
    pub dropped_lines: u64,
    pub scheduler_active: bool,
}

/// Result of one read-rewrite-swap pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteReport {
    pub scanned: u64,
    pub written: u64,
    pub removed: u64,
    pub dropped: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    transactions: AtomicU64,
    dropped_lines: AtomicU64,
}

impl Counters {
    pub(crate) fn record(&self, report: &RewriteReport) {
        self.transactions.fetch_add(1, Ordering::Relaxed);
        self.dropped_lines
            .fetch_add(report.dropped, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, scheduler_active: bool) -> QueueStats {
        QueueStats {
            transactions: self.transactions.load(Ordering::Relaxed),
            dropped_lines: self.dropped_lines.load(Ordering::Relaxed),
            scheduler_active,
        }
    }
}
