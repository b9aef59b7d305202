//! Runtime configuration.
//!
//! Two knobs, each read from the environment on first use and cached:
//! - `NSSCOMPAT_STRATEGY`: `auto` (default), `reentrant`, `legacy` or
//!   `fallback`. See [`StrategyPreference::from_str_loose`] for aliases.
//! - `NSSCOMPAT_SCRATCH_BYTES`: capacity of each per-thread scratch region.
//!   Default 2048, rounded up to a multiple of 8 and clamped to
//!   [`MIN_SCRATCH_BYTES`]..=[`MAX_SCRATCH_BYTES`].
//!
//! Both caches use a non-blocking resolve-once state machine rather than
//! `OnceLock`, so a lookup arriving from inside `std::env::var` (for example
//! through an NSS module) sees the default instead of blocking.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use crate::strategy::StrategyPreference;

pub const STRATEGY_ENV: &str = "NSSCOMPAT_STRATEGY";
pub const SCRATCH_BYTES_ENV: &str = "NSSCOMPAT_SCRATCH_BYTES";

pub const DEFAULT_SCRATCH_BYTES: usize = 2048;
pub const MIN_SCRATCH_BYTES: usize = 256;
pub const MAX_SCRATCH_BYTES: usize = 1 << 20;

const SCRATCH_GRANULE: usize = 8;

// 0=unresolved, 1=Auto, 2=Reentrant, 3=Legacy, 4=Fallback, 255=resolving.
static CACHED_PREFERENCE: AtomicU8 = AtomicU8::new(PREF_UNRESOLVED);

const PREF_UNRESOLVED: u8 = 0;
const PREF_AUTO: u8 = 1;
const PREF_REENTRANT: u8 = 2;
const PREF_LEGACY: u8 = 3;
const PREF_FALLBACK: u8 = 4;
const PREF_RESOLVING: u8 = 255;

// 0=unresolved, usize::MAX=resolving, anything else is a normalized capacity.
static CACHED_SCRATCH: AtomicUsize = AtomicUsize::new(SCRATCH_UNRESOLVED);

const SCRATCH_UNRESOLVED: usize = 0;
const SCRATCH_RESOLVING: usize = usize::MAX;

fn preference_to_u8(pref: StrategyPreference) -> u8 {
    match pref {
        StrategyPreference::Auto => PREF_AUTO,
        StrategyPreference::Reentrant => PREF_REENTRANT,
        StrategyPreference::Legacy => PREF_LEGACY,
        StrategyPreference::Fallback => PREF_FALLBACK,
    }
}

fn u8_to_preference(v: u8) -> StrategyPreference {
    match v {
        PREF_REENTRANT => StrategyPreference::Reentrant,
        PREF_LEGACY => StrategyPreference::Legacy,
        PREF_FALLBACK => StrategyPreference::Fallback,
        _ => StrategyPreference::Auto,
    }
}

/// Round `requested` up to the scratch granule and clamp it to the
/// supported range.
#[must_use]
pub fn normalize_scratch_bytes(requested: usize) -> usize {
    let clamped = requested.clamp(MIN_SCRATCH_BYTES, MAX_SCRATCH_BYTES);
    clamped.div_ceil(SCRATCH_GRANULE) * SCRATCH_GRANULE
}

fn parse_scratch_env(raw: &str) -> usize {
    raw.trim()
        .parse::<usize>()
        .map(normalize_scratch_bytes)
        .unwrap_or(DEFAULT_SCRATCH_BYTES)
}

/// The configured strategy preference (reads the environment on first call).
#[must_use]
pub fn strategy_preference() -> StrategyPreference {
    let cached = CACHED_PREFERENCE.load(Ordering::Relaxed);
    if cached != PREF_UNRESOLVED && cached != PREF_RESOLVING {
        return u8_to_preference(cached);
    }
    if cached == PREF_RESOLVING {
        return StrategyPreference::Auto;
    }

    if CACHED_PREFERENCE
        .compare_exchange(
            PREF_UNRESOLVED,
            PREF_RESOLVING,
            Ordering::SeqCst,
            Ordering::Relaxed,
        )
        .is_err()
    {
        let v = CACHED_PREFERENCE.load(Ordering::Relaxed);
        return if v != PREF_UNRESOLVED && v != PREF_RESOLVING {
            u8_to_preference(v)
        } else {
            StrategyPreference::Auto
        };
    }

    let pref = std::env::var(STRATEGY_ENV)
        .map(|v| StrategyPreference::from_str_loose(&v))
        .unwrap_or_default();
    // A concurrent explicit override wins over the environment.
    match CACHED_PREFERENCE.compare_exchange(
        PREF_RESOLVING,
        preference_to_u8(pref),
        Ordering::Release,
        Ordering::Relaxed,
    ) {
        Ok(_) => pref,
        Err(current) => u8_to_preference(current),
    }
}

/// Override the strategy preference for the rest of the process.
///
/// Only lookups that build their dispatcher after this call observe it.
pub fn set_strategy_preference(pref: StrategyPreference) {
    CACHED_PREFERENCE.store(preference_to_u8(pref), Ordering::Release);
}

/// The configured per-thread scratch capacity in bytes.
#[must_use]
pub fn scratch_capacity() -> usize {
    let cached = CACHED_SCRATCH.load(Ordering::Relaxed);
    if cached != SCRATCH_UNRESOLVED && cached != SCRATCH_RESOLVING {
        return cached;
    }
    if cached == SCRATCH_RESOLVING {
        return DEFAULT_SCRATCH_BYTES;
    }

    if CACHED_SCRATCH
        .compare_exchange(
            SCRATCH_UNRESOLVED,
            SCRATCH_RESOLVING,
            Ordering::SeqCst,
            Ordering::Relaxed,
        )
        .is_err()
    {
        let v = CACHED_SCRATCH.load(Ordering::Relaxed);
        return if v != SCRATCH_UNRESOLVED && v != SCRATCH_RESOLVING {
            v
        } else {
            DEFAULT_SCRATCH_BYTES
        };
    }

    let bytes = std::env::var(SCRATCH_BYTES_ENV)
        .map(|v| parse_scratch_env(&v))
        .unwrap_or(DEFAULT_SCRATCH_BYTES);
    match CACHED_SCRATCH.compare_exchange(
        SCRATCH_RESOLVING,
        bytes,
        Ordering::Release,
        Ordering::Relaxed,
    ) {
        Ok(_) => bytes,
        Err(current) => current,
    }
}

/// Override the scratch capacity. Returns the normalized value.
///
/// Threads whose scratch region already exists keep their current size.
pub fn set_scratch_capacity(requested: usize) -> usize {
    let bytes = normalize_scratch_bytes(requested);
    CACHED_SCRATCH.store(bytes, Ordering::Release);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    static TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn scratch_bytes_are_rounded_and_clamped() {
        assert_eq!(normalize_scratch_bytes(0), MIN_SCRATCH_BYTES);
        assert_eq!(normalize_scratch_bytes(2048), 2048);
        assert_eq!(normalize_scratch_bytes(2049), 2056);
        assert_eq!(normalize_scratch_bytes(usize::MAX), MAX_SCRATCH_BYTES);
    }

    #[test]
    fn scratch_env_parser_defaults_on_garbage() {
        assert_eq!(parse_scratch_env("4096"), 4096);
        assert_eq!(parse_scratch_env(" 300 "), 304);
        assert_eq!(parse_scratch_env("lots"), DEFAULT_SCRATCH_BYTES);
        assert_eq!(parse_scratch_env("-1"), DEFAULT_SCRATCH_BYTES);
    }

    #[test]
    fn preference_encoding_is_lossless() {
        for pref in [
            StrategyPreference::Auto,
            StrategyPreference::Reentrant,
            StrategyPreference::Legacy,
            StrategyPreference::Fallback,
        ] {
            assert_eq!(u8_to_preference(preference_to_u8(pref)), pref);
        }
    }

    #[test]
    fn cached_preference_is_sticky_until_overridden() {
        let _guard = TEST_LOCK.lock().unwrap();
        let previous = CACHED_PREFERENCE.swap(PREF_LEGACY, Ordering::SeqCst);
        assert_eq!(strategy_preference(), StrategyPreference::Legacy);
        assert_eq!(strategy_preference(), StrategyPreference::Legacy);

        set_strategy_preference(StrategyPreference::Fallback);
        assert_eq!(strategy_preference(), StrategyPreference::Fallback);

        CACHED_PREFERENCE.store(previous, Ordering::SeqCst);
    }

    #[test]
    fn resolving_state_returns_defaults() {
        let _guard = TEST_LOCK.lock().unwrap();
        let previous_pref = CACHED_PREFERENCE.swap(PREF_RESOLVING, Ordering::SeqCst);
        let previous_scratch = CACHED_SCRATCH.swap(SCRATCH_RESOLVING, Ordering::SeqCst);
        assert_eq!(strategy_preference(), StrategyPreference::Auto);
        assert_eq!(scratch_capacity(), DEFAULT_SCRATCH_BYTES);
        CACHED_PREFERENCE.store(previous_pref, Ordering::SeqCst);
        CACHED_SCRATCH.store(previous_scratch, Ordering::SeqCst);
    }

    #[test]
    fn scratch_override_normalizes() {
        let _guard = TEST_LOCK.lock().unwrap();
        let previous = CACHED_SCRATCH.load(Ordering::SeqCst);
        assert_eq!(set_scratch_capacity(1000), 1000);
        assert_eq!(scratch_capacity(), 1000);
        assert_eq!(set_scratch_capacity(10), MIN_SCRATCH_BYTES);
        assert_eq!(scratch_capacity(), MIN_SCRATCH_BYTES);
        CACHED_SCRATCH.store(previous, Ordering::SeqCst);
    }
}
