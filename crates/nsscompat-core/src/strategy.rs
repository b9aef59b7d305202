//! Lookup strategy model.
//!
//! Every entry point resolves to one of three strategies:
//!
//! - [`Strategy::Reentrant`]: the POSIX-style `_r` call that takes a record,
//!   a buffer and an out-pointer and returns a status code.
//! - [`Strategy::LegacyReentrant`]: an older `_r` call that returns the record
//!   pointer directly (or, for hosts on some targets, fills an opaque
//!   reentrant-state object instead of a buffer).
//! - [`Strategy::LockedFallback`]: the classic non-reentrant call under a
//!   process-wide lock, followed by a deep copy into thread-owned scratch.
//!
//! Which of these exist is a property of the build target, captured by
//! [`Capabilities::native`]. The plan is computed once per process.

use std::fmt;

/// The three record families this crate serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    User,
    Group,
    Host,
}

impl RecordKind {
    pub const ALL: [Self; 3] = [Self::User, Self::Group, Self::Host];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
            Self::Host => "host",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a lookup reaches the OS directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Reentrant,
    LegacyReentrant,
    LockedFallback,
}

impl Strategy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reentrant => "reentrant",
            Self::LegacyReentrant => "legacy-reentrant",
            Self::LockedFallback => "locked-fallback",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested strategy, as configured by the operator.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyPreference {
    /// Best available: reentrant, then legacy, then fallback.
    #[default]
    Auto,
    /// Prefer the status-returning reentrant call where it exists.
    Reentrant,
    /// Prefer the pointer-returning reentrant call where it exists.
    Legacy,
    /// Always take the lock-and-copy path.
    Fallback,
}

impl StrategyPreference {
    /// Parse from string (case-insensitive). Unknown values mean `Auto`.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "reentrant" | "native" | "modern" | "posix" => Self::Reentrant,
            "legacy" | "legacy-reentrant" => Self::Legacy,
            "fallback" | "locked" | "lock" | "locked-fallback" => Self::Fallback,
            _ => Self::Auto,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Reentrant => "reentrant",
            Self::Legacy => "legacy",
            Self::Fallback => "fallback",
        }
    }
}

/// Which native conventions exist for one record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindSupport {
    pub reentrant: bool,
    pub legacy: bool,
}

/// Native conventions available on the build target, per record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub user: KindSupport,
    pub group: KindSupport,
    pub host: KindSupport,
}

const LEGACY_PWGR: bool = cfg!(any(target_os = "solaris", target_os = "illumos"));
const REENTRANT_HOST: bool = cfg!(target_os = "linux");
const LEGACY_HOST: bool = cfg!(any(
    target_os = "solaris",
    target_os = "illumos",
    target_os = "aix"
));

impl Capabilities {
    /// The capability table of the target this crate was compiled for.
    #[must_use]
    pub const fn native() -> Self {
        let pwgr = KindSupport {
            reentrant: true,
            legacy: LEGACY_PWGR,
        };
        Self {
            user: pwgr,
            group: pwgr,
            host: KindSupport {
                reentrant: REENTRANT_HOST,
                legacy: LEGACY_HOST,
            },
        }
    }

    /// A target with nothing but the classic calls.
    #[must_use]
    pub const fn fallback_only() -> Self {
        let none = KindSupport {
            reentrant: false,
            legacy: false,
        };
        Self {
            user: none,
            group: none,
            host: none,
        }
    }

    #[must_use]
    pub const fn for_kind(&self, kind: RecordKind) -> KindSupport {
        match kind {
            RecordKind::User => self.user,
            RecordKind::Group => self.group,
            RecordKind::Host => self.host,
        }
    }

    /// Whether `strategy` can serve `kind` on this target.
    #[must_use]
    pub const fn supports(&self, kind: RecordKind, strategy: Strategy) -> bool {
        let support = self.for_kind(kind);
        match strategy {
            Strategy::Reentrant => support.reentrant,
            Strategy::LegacyReentrant => support.legacy,
            Strategy::LockedFallback => true,
        }
    }

    /// Pick the strategy for one kind.
    #[must_use]
    pub const fn select(&self, kind: RecordKind, preference: StrategyPreference) -> Strategy {
        let preferred = match preference {
            StrategyPreference::Auto => None,
            StrategyPreference::Reentrant => Some(Strategy::Reentrant),
            StrategyPreference::Legacy => Some(Strategy::LegacyReentrant),
            StrategyPreference::Fallback => Some(Strategy::LockedFallback),
        };
        if let Some(strategy) = preferred
            && self.supports(kind, strategy)
        {
            return strategy;
        }
        let support = self.for_kind(kind);
        if support.reentrant {
            Strategy::Reentrant
        } else if support.legacy {
            Strategy::LegacyReentrant
        } else {
            Strategy::LockedFallback
        }
    }

    /// Pick strategies for every kind.
    #[must_use]
    pub const fn plan(&self, preference: StrategyPreference) -> StrategyPlan {
        StrategyPlan {
            user: self.select(RecordKind::User, preference),
            group: self.select(RecordKind::Group, preference),
            host: self.select(RecordKind::Host, preference),
        }
    }
}

/// The strategy chosen for each record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyPlan {
    pub user: Strategy,
    pub group: Strategy,
    pub host: Strategy,
}

impl StrategyPlan {
    /// Same strategy for every kind.
    #[must_use]
    pub const fn uniform(strategy: Strategy) -> Self {
        Self {
            user: strategy,
            group: strategy,
            host: strategy,
        }
    }

    #[must_use]
    pub const fn for_kind(&self, kind: RecordKind) -> Strategy {
        match kind {
            RecordKind::User => self.user,
            RecordKind::Group => self.group,
            RecordKind::Host => self.host,
        }
    }
}
