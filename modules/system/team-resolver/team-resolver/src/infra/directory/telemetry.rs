use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use team_resolver_sdk::DirectoryDiagnostics;

/// Lock-free counters plus the last success/error markers.
#[derive(Debug, Default)]
pub struct Telemetry {
    calls: AtomicU64,
    errors: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    replayed_failures: AtomicU64,
    last_success_at: Mutex<Option<DateTime<Utc>>>,
    last_error: Mutex<Option<String>>,
}

impl Telemetry {
    pub fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn replayed_failure(&self) {
        self.replayed_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn call_started(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn call_succeeded(&self) {
        *self.last_success_at.lock() = Some(Utc::now());
    }

    pub fn call_failed(&self, message: String) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        *self.last_error.lock() = Some(message);
    }

    #[must_use]
    pub fn snapshot(&self) -> DirectoryDiagnostics {
        DirectoryDiagnostics {
            calls: self.calls.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            replayed_failures: self.replayed_failures.load(Ordering::Relaxed),
            last_success_at: *self.last_success_at.lock(),
            last_error: self.last_error.lock().clone(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_events() {
        let t = Telemetry::default();
        t.cache_miss();
        t.call_started();
        t.call_failed("boom".to_owned());
        t.cache_hit();
        t.call_started();
        t.call_succeeded();

        let snap = t.snapshot();

        assert_eq!(snap.calls, 2);
        assert_eq!(snap.errors, 1);
        assert_eq!(snap.cache_hits, 1);
        assert_eq!(snap.cache_misses, 1);
        assert_eq!(snap.last_error.as_deref(), Some("boom"));
        assert!(snap.last_success_at.is_some());
    }
}
