//! The process-wide lock serializing classic (non-reentrant) directory calls.
//!
//! One lock covers all three record kinds: on several platforms the classic
//! user, group and host calls share static storage. It only excludes callers
//! that go through this crate.

use parking_lot::{Mutex, MutexGuard};

use nsscompat_core::{LookupMetrics, global_metrics};

static FALLBACK_LOCK: Mutex<()> = Mutex::new(());

/// Take the fallback lock, blocking until it is free.
pub fn acquire() -> MutexGuard<'static, ()> {
    let guard = FALLBACK_LOCK.lock();
    LookupMetrics::inc(&global_metrics().fallback_lock_acquisitions);
    guard
}

/// Whether some thread currently holds the fallback lock.
#[must_use]
pub fn is_held() -> bool {
    FALLBACK_LOCK.is_locked()
}
