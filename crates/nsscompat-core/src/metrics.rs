//! Atomic counters for lookup observability.
//!
//! All counters use relaxed ordering; they are diagnostic, not
//! synchronization primitives.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::LookupError;

/// Global lookup counters.
pub struct LookupMetrics {
    /// Lookups issued through any public entry point.
    pub lookups: AtomicU64,
    /// Lookups that returned a record.
    pub found: AtomicU64,
    /// Lookups that completed with no matching record.
    pub not_found: AtomicU64,
    /// Lookups whose record did not fit the scratch region.
    pub capacity_exceeded: AtomicU64,
    /// Lookups that failed for any other reason.
    pub failures: AtomicU64,
    /// Times the process-wide fallback lock was taken.
    pub fallback_lock_acquisitions: AtomicU64,
    /// Per-thread scratch regions created.
    pub scratch_inits: AtomicU64,
}

impl LookupMetrics {
    /// Create a new zeroed metrics instance.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lookups: AtomicU64::new(0),
            found: AtomicU64::new(0),
            not_found: AtomicU64::new(0),
            capacity_exceeded: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            fallback_lock_acquisitions: AtomicU64::new(0),
            scratch_inits: AtomicU64::new(0),
        }
    }

    /// Increment a counter by 1.
    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Read a counter value.
    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    /// Account for one finished lookup.
    pub fn record_outcome<T>(&self, outcome: &Result<Option<T>, LookupError>) {
        Self::inc(&self.lookups);
        match outcome {
            Ok(Some(_)) => Self::inc(&self.found),
            Ok(None) => Self::inc(&self.not_found),
            Err(err) if err.is_capacity() => Self::inc(&self.capacity_exceeded),
            Err(_) => Self::inc(&self.failures),
        }
    }

    /// Snapshot all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            lookups: Self::get(&self.lookups),
            found: Self::get(&self.found),
            not_found: Self::get(&self.not_found),
            capacity_exceeded: Self::get(&self.capacity_exceeded),
            failures: Self::get(&self.failures),
            fallback_lock_acquisitions: Self::get(&self.fallback_lock_acquisitions),
            scratch_inits: Self::get(&self.scratch_inits),
        }
    }
}

impl Default for LookupMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time snapshot of all lookup counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub lookups: u64,
    pub found: u64,
    pub not_found: u64,
    pub capacity_exceeded: u64,
    pub failures: u64,
    pub fallback_lock_acquisitions: u64,
    pub scratch_inits: u64,
}

impl MetricsSnapshot {
    /// Counter-wise difference `self - earlier`, saturating at zero.
    #[must_use]
    pub fn since(&self, earlier: &Self) -> Self {
        Self {
            lookups: self.lookups.saturating_sub(earlier.lookups),
            found: self.found.saturating_sub(earlier.found),
            not_found: self.not_found.saturating_sub(earlier.not_found),
            capacity_exceeded: self
                .capacity_exceeded
                .saturating_sub(earlier.capacity_exceeded),
            failures: self.failures.saturating_sub(earlier.failures),
            fallback_lock_acquisitions: self
                .fallback_lock_acquisitions
                .saturating_sub(earlier.fallback_lock_acquisitions),
            scratch_inits: self.scratch_inits.saturating_sub(earlier.scratch_inits),
        }
    }
}

/// Global metrics instance.
static GLOBAL_METRICS: LookupMetrics = LookupMetrics::new();

/// Access the global metrics singleton.
#[must_use]
pub fn global_metrics() -> &'static LookupMetrics {
    &GLOBAL_METRICS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let m = LookupMetrics::new();
        assert_eq!(m.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn outcomes_land_in_their_buckets() {
        let m = LookupMetrics::new();
        m.record_outcome::<()>(&Ok(Some(())));
        m.record_outcome::<()>(&Ok(None));
        m.record_outcome::<()>(&Err(LookupError::CapacityExceeded { capacity: 8 }));
        m.record_outcome::<()>(&Err(LookupError::Os(5)));
        LookupMetrics::inc(&m.fallback_lock_acquisitions);
        let snap = m.snapshot();
        assert_eq!(snap.lookups, 4);
        assert_eq!(snap.found, 1);
        assert_eq!(snap.not_found, 1);
        assert_eq!(snap.capacity_exceeded, 1);
        assert_eq!(snap.failures, 1);
        assert_eq!(snap.fallback_lock_acquisitions, 1);
    }

    #[test]
    fn since_subtracts_counterwise() {
        let m = LookupMetrics::new();
        let before = m.snapshot();
        LookupMetrics::inc(&m.lookups);
        LookupMetrics::inc(&m.scratch_inits);
        let delta = m.snapshot().since(&before);
        assert_eq!(delta.lookups, 1);
        assert_eq!(delta.scratch_inits, 1);
        assert_eq!(delta.found, 0);
    }
}
