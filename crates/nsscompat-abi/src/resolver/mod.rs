//! Strategy dispatch for the six directory lookups.
//!
//! A [`DirectoryResolver`] fills a thread's slot for one query using one
//! native convention. The [`Dispatcher`] holds one resolver per record kind,
//! chosen once from the target's [`Capabilities`] and the configured
//! [`StrategyPreference`](nsscompat_core::StrategyPreference), and wraps each
//! lookup with slot access and outcome accounting.

pub mod fallback;
#[cfg(any(target_os = "solaris", target_os = "illumos", target_os = "aix"))]
pub mod legacy;
pub mod reentrant;

use std::ffi::{CStr, c_int};
use std::sync::OnceLock;

use nsscompat_core::{
    Capabilities, LookupError, RecordKind, Strategy, StrategyPlan, config, global_metrics,
};

use crate::scratch::{self, GroupSlot, HostSlot, UserSlot};

pub use fallback::{ClassicSource, LockedFallback, SYSTEM_FALLBACK, SystemDirectory};
pub use reentrant::{REENTRANT, ReentrantResolver};

/// One native convention for filling a thread's slots.
///
/// Each method returns `Ok(true)` when the slot's record now holds the
/// answer, `Ok(false)` when nothing matched. On `Ok(false)` and on error the
/// slot's record must be left zeroed. Methods a convention does not cover
/// fall through to the system locked fallback.
pub trait DirectoryResolver: Send + Sync {
    fn strategy(&self) -> Strategy;

    fn user_by_name(&self, name: &CStr, slot: &mut UserSlot) -> Result<bool, LookupError> {
        SYSTEM_FALLBACK.user_by_name(name, slot)
    }

    fn user_by_id(&self, uid: libc::uid_t, slot: &mut UserSlot) -> Result<bool, LookupError> {
        SYSTEM_FALLBACK.user_by_id(uid, slot)
    }

    fn group_by_name(&self, name: &CStr, slot: &mut GroupSlot) -> Result<bool, LookupError> {
        SYSTEM_FALLBACK.group_by_name(name, slot)
    }

    fn group_by_id(&self, gid: libc::gid_t, slot: &mut GroupSlot) -> Result<bool, LookupError> {
        SYSTEM_FALLBACK.group_by_id(gid, slot)
    }

    fn host_by_name(&self, name: &CStr, slot: &mut HostSlot) -> Result<bool, LookupError> {
        SYSTEM_FALLBACK.host_by_name(name, slot)
    }

    fn host_by_address(
        &self,
        addr: &[u8],
        family: c_int,
        slot: &mut HostSlot,
    ) -> Result<bool, LookupError> {
        SYSTEM_FALLBACK.host_by_address(addr, family, slot)
    }
}

/// The resolver that implements `strategy` on this target.
#[must_use]
pub fn resolver_for(strategy: Strategy) -> &'static dyn DirectoryResolver {
    match strategy {
        Strategy::Reentrant => &REENTRANT,
        #[cfg(any(target_os = "solaris", target_os = "illumos", target_os = "aix"))]
        Strategy::LegacyReentrant => &legacy::LEGACY,
        #[cfg(not(any(target_os = "solaris", target_os = "illumos", target_os = "aix")))]
        Strategy::LegacyReentrant => &SYSTEM_FALLBACK,
        Strategy::LockedFallback => &SYSTEM_FALLBACK,
    }
}

/// Validate an address query: non-empty and representable as a C length.
pub(crate) fn address_len(addr: &[u8]) -> Result<c_int, LookupError> {
    if addr.is_empty() {
        return Err(LookupError::InvalidArgument("empty address"));
    }
    c_int::try_from(addr.len()).map_err(|_| LookupError::InvalidArgument("address too long"))
}

/// Routes each lookup to the resolver chosen for its record kind.
pub struct Dispatcher {
    users: &'static dyn DirectoryResolver,
    groups: &'static dyn DirectoryResolver,
    hosts: &'static dyn DirectoryResolver,
}

impl Dispatcher {
    /// The built-in resolvers named by `plan`.
    #[must_use]
    pub fn from_plan(plan: StrategyPlan) -> Self {
        Self {
            users: resolver_for(plan.user),
            groups: resolver_for(plan.group),
            hosts: resolver_for(plan.host),
        }
    }

    /// One resolver for every kind.
    #[must_use]
    pub fn uniform(resolver: &'static dyn DirectoryResolver) -> Self {
        Self {
            users: resolver,
            groups: resolver,
            hosts: resolver,
        }
    }

    /// The strategy actually serving each kind.
    #[must_use]
    pub fn plan(&self) -> StrategyPlan {
        StrategyPlan {
            user: self.users.strategy(),
            group: self.groups.strategy(),
            host: self.hosts.strategy(),
        }
    }

    #[must_use]
    pub fn strategy_for(&self, kind: RecordKind) -> Strategy {
        self.plan().for_kind(kind)
    }

    /// Look up a user by login name and hand the filled record to `read`
    /// while the slot is still borrowed.
    pub fn user_by_name_with<R>(
        &self,
        name: &CStr,
        read: impl FnOnce(&mut libc::passwd) -> R,
    ) -> Result<Option<R>, LookupError> {
        let outcome = scratch::with_user_slot(|slot| {
            Ok(self.users.user_by_name(name, slot)?.then(|| read(&mut slot.record)))
        });
        global_metrics().record_outcome(&outcome);
        outcome
    }

    pub fn user_by_id_with<R>(
        &self,
        uid: libc::uid_t,
        read: impl FnOnce(&mut libc::passwd) -> R,
    ) -> Result<Option<R>, LookupError> {
        let outcome = scratch::with_user_slot(|slot| {
            Ok(self.users.user_by_id(uid, slot)?.then(|| read(&mut slot.record)))
        });
        global_metrics().record_outcome(&outcome);
        outcome
    }

    pub fn group_by_name_with<R>(
        &self,
        name: &CStr,
        read: impl FnOnce(&mut libc::group) -> R,
    ) -> Result<Option<R>, LookupError> {
        let outcome = scratch::with_group_slot(|slot| {
            Ok(self.groups.group_by_name(name, slot)?.then(|| read(&mut slot.record)))
        });
        global_metrics().record_outcome(&outcome);
        outcome
    }

    pub fn group_by_id_with<R>(
        &self,
        gid: libc::gid_t,
        read: impl FnOnce(&mut libc::group) -> R,
    ) -> Result<Option<R>, LookupError> {
        let outcome = scratch::with_group_slot(|slot| {
            Ok(self.groups.group_by_id(gid, slot)?.then(|| read(&mut slot.record)))
        });
        global_metrics().record_outcome(&outcome);
        outcome
    }

    pub fn host_by_name_with<R>(
        &self,
        name: &CStr,
        read: impl FnOnce(&mut libc::hostent) -> R,
    ) -> Result<Option<R>, LookupError> {
        let outcome = scratch::with_host_slot(|slot| {
            Ok(self.hosts.host_by_name(name, slot)?.then(|| read(&mut slot.record)))
        });
        global_metrics().record_outcome(&outcome);
        outcome
    }

    pub fn host_by_address_with<R>(
        &self,
        addr: &[u8],
        family: c_int,
        read: impl FnOnce(&mut libc::hostent) -> R,
    ) -> Result<Option<R>, LookupError> {
        let outcome = address_len(addr).and_then(|_| {
            scratch::with_host_slot(|slot| {
                Ok(self
                    .hosts
                    .host_by_address(addr, family, slot)?
                    .then(|| read(&mut slot.record)))
            })
        });
        global_metrics().record_outcome(&outcome);
        outcome
    }
}

static DISPATCHER: OnceLock<Dispatcher> = OnceLock::new();

/// The process-wide dispatcher, built on first use from the native
/// capability table and the configured preference.
pub fn dispatcher() -> &'static Dispatcher {
    DISPATCHER.get_or_init(|| {
        Dispatcher::from_plan(Capabilities::native().plan(config::strategy_preference()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_plan_uses_fallback_everywhere() {
        let d = Dispatcher::from_plan(StrategyPlan::uniform(Strategy::LockedFallback));
        assert_eq!(d.plan(), StrategyPlan::uniform(Strategy::LockedFallback));
    }

    #[test]
    fn native_plan_is_honored() {
        let plan = Capabilities::native().plan(nsscompat_core::StrategyPreference::Auto);
        let d = Dispatcher::from_plan(plan);
        assert_eq!(d.plan(), plan);
    }

    #[test]
    fn empty_address_is_rejected_before_any_lookup() {
        let d = Dispatcher::uniform(&SYSTEM_FALLBACK);
        let err = d.host_by_address_with(&[], libc::AF_INET, |_| ()).unwrap_err();
        assert_eq!(err, LookupError::InvalidArgument("empty address"));
    }
}
