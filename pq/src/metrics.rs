//! Coordinator observability
//!
//! The coordinator reports outcomes through the [`Observer`] hook. Nothing in
//! the pairing logic depends on it; [`CoordinatorMetrics`] is the in-memory
//! implementation the connection driver installs by default.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Outcome hook called from inside the coordinator's serialization domain
///
/// Every method has a no-op default, so implementors only pick what they need.
pub trait Observer: Send + Sync {
    /// A command was enqueued and handed to the transport
    fn on_submit(&self) {}

    /// A command was resolved with a normal reply
    fn on_success(&self) {}

    /// A command was resolved with a remote rejection
    fn on_application_error(&self) {}

    /// `count` pending commands were failed by a connection error
    fn on_drained(&self, _count: usize) {}

    /// A submission was refused because the coordinator is closed
    fn on_rejected(&self) {}

    /// A reply arrived with nothing pending
    fn on_desync(&self) {}

    /// A reply arrived after the connection was closed
    fn on_late_reply(&self) {}
}

/// Observer that records nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {}

/// Thread-safe counters for one connection
#[derive(Debug, Default)]
pub struct CoordinatorMetrics {
    submitted: AtomicU64,
    succeeded: AtomicU64,
    application_errors: AtomicU64,
    drained: AtomicU64,
    rejected: AtomicU64,
    desyncs: AtomicU64,
    late_replies: AtomicU64,
}

/// Point-in-time copy of [`CoordinatorMetrics`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub submitted: u64,
    pub succeeded: u64,
    #[serde(rename = "application-errors")]
    pub application_errors: u64,
    pub drained: u64,
    pub rejected: u64,
    pub desyncs: u64,
    #[serde(rename = "late-replies")]
    pub late_replies: u64,
    /// Commands still waiting for a reply when the snapshot was taken
    pub pending: usize,
}

impl MetricsSnapshot {
    /// Commands that reached a final outcome
    pub fn resolved(&self) -> u64 {
        self.succeeded + self.application_errors + self.drained
    }
}

impl CoordinatorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the counters, stamping in the current queue length
    pub fn snapshot(&self, pending: usize) -> MetricsSnapshot {
        debug!(pending, "CoordinatorMetrics::snapshot: called");
        MetricsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            application_errors: self.application_errors.load(Ordering::Relaxed),
            drained: self.drained.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            desyncs: self.desyncs.load(Ordering::Relaxed),
            late_replies: self.late_replies.load(Ordering::Relaxed),
            pending,
        }
    }
}

impl Observer for CoordinatorMetrics {
    fn on_submit(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    fn on_success(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    fn on_application_error(&self) {
        self.application_errors.fetch_add(1, Ordering::Relaxed);
    }

    fn on_drained(&self, count: usize) {
        self.drained.fetch_add(count as u64, Ordering::Relaxed);
    }

    fn on_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    fn on_desync(&self) {
        self.desyncs.fetch_add(1, Ordering::Relaxed);
    }

    fn on_late_reply(&self) {
        self.late_replies.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = CoordinatorMetrics::new();
        metrics.on_submit();
        metrics.on_submit();
        metrics.on_submit();
        metrics.on_success();
        metrics.on_application_error();
        metrics.on_drained(1);

        let snap = metrics.snapshot(0);
        assert_eq!(snap.submitted, 3);
        assert_eq!(snap.succeeded, 1);
        assert_eq!(snap.application_errors, 1);
        assert_eq!(snap.drained, 1);
        assert_eq!(snap.resolved(), 3);
    }

    #[test]
    fn test_snapshot_serialization() {
        let snap = CoordinatorMetrics::new().snapshot(4);
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("application-errors"));
        assert!(json.contains("\"late-replies\":0"));
        assert!(json.contains("\"pending\":4"));
    }

    #[test]
    fn test_noop_observer_is_silent() {
        let observer: &dyn Observer = &NoopObserver;
        observer.on_submit();
        observer.on_drained(10);
        observer.on_desync();
    }
}
