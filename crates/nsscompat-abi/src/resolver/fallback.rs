//! Lock-and-copy fallback over the classic non-reentrant calls.
//!
//! The classic calls return pointers into storage the C library reuses on
//! the next call from any thread. [`LockedFallback`] takes the process-wide
//! lock, makes the call, copies the fixed part of the record into the
//! thread's slot, deep-copies the variable part into the slot's region and
//! only then releases the lock.

use std::ffi::{CStr, c_int};

use nsscompat_core::{LookupError, Strategy};

use super::DirectoryResolver;
use crate::copier;
use crate::lock;
use crate::scratch::{GroupSlot, HostSlot, UserSlot};

/// A directory answering the six classic queries with pointers into its own
/// storage.
///
/// # Safety
/// Every returned pointer must be null or point to a record that stays valid,
/// with all of its fields, until the next call on this source. Callers only
/// invoke these methods while holding the fallback lock.
pub unsafe trait ClassicSource: Send + Sync {
    fn getpwnam(&self, name: &CStr) -> *const libc::passwd;
    fn getpwuid(&self, uid: libc::uid_t) -> *const libc::passwd;
    fn getgrnam(&self, name: &CStr) -> *const libc::group;
    fn getgrgid(&self, gid: libc::gid_t) -> *const libc::group;
    fn gethostbyname(&self, name: &CStr) -> *const libc::hostent;
    fn gethostbyaddr(&self, addr: &[u8], family: c_int) -> *const libc::hostent;
}

/// The C library's own classic calls.
pub struct SystemDirectory;

// SAFETY: the C library keeps each result valid until the next call of the
// same family, and the fallback lock serializes calls made through us.
unsafe impl ClassicSource for SystemDirectory {
    fn getpwnam(&self, name: &CStr) -> *const libc::passwd {
        // SAFETY: name is NUL-terminated.
        unsafe { libc::getpwnam(name.as_ptr()) }
    }

    fn getpwuid(&self, uid: libc::uid_t) -> *const libc::passwd {
        // SAFETY: no pointer arguments.
        unsafe { libc::getpwuid(uid) }
    }

    fn getgrnam(&self, name: &CStr) -> *const libc::group {
        // SAFETY: name is NUL-terminated.
        unsafe { libc::getgrnam(name.as_ptr()) }
    }

    fn getgrgid(&self, gid: libc::gid_t) -> *const libc::group {
        // SAFETY: no pointer arguments.
        unsafe { libc::getgrgid(gid) }
    }

    fn gethostbyname(&self, name: &CStr) -> *const libc::hostent {
        // SAFETY: name is NUL-terminated.
        unsafe { crate::sys::gethostbyname(name.as_ptr()) }
    }

    fn gethostbyaddr(&self, addr: &[u8], family: c_int) -> *const libc::hostent {
        let Ok(len) = libc::socklen_t::try_from(addr.len()) else {
            return std::ptr::null();
        };
        // SAFETY: addr is `len` readable bytes.
        unsafe { crate::sys::gethostbyaddr(addr.as_ptr().cast(), len, family) }
    }
}

/// Resolver that serializes a [`ClassicSource`] behind the fallback lock.
pub struct LockedFallback<S> {
    source: S,
}

pub static SYSTEM_FALLBACK: LockedFallback<SystemDirectory> = LockedFallback::new(SystemDirectory);

impl<S: ClassicSource> LockedFallback<S> {
    pub const fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

/// Fetch and copy in one critical section.
macro_rules! locked_copy {
    ($slot:expr, $fetch:expr, $copy:path) => {{
        let slot = $slot;
        let _guard = lock::acquire();
        let src = $fetch;
        if src.is_null() {
            slot.invalidate();
            Ok(false)
        } else {
            // SAFETY: the source contract keeps `src` valid while we hold the
            // lock, and OS storage never aliases the slot.
            unsafe { $copy(src, slot) }.map(|()| true)
        }
    }};
}

impl<S: ClassicSource> DirectoryResolver for LockedFallback<S> {
    fn strategy(&self) -> Strategy {
        Strategy::LockedFallback
    }

    fn user_by_name(&self, name: &CStr, slot: &mut UserSlot) -> Result<bool, LookupError> {
        locked_copy!(slot, self.source.getpwnam(name), copier::copy_passwd)
    }

    fn user_by_id(&self, uid: libc::uid_t, slot: &mut UserSlot) -> Result<bool, LookupError> {
        locked_copy!(slot, self.source.getpwuid(uid), copier::copy_passwd)
    }

    fn group_by_name(&self, name: &CStr, slot: &mut GroupSlot) -> Result<bool, LookupError> {
        locked_copy!(slot, self.source.getgrnam(name), copier::copy_group)
    }

    fn group_by_id(&self, gid: libc::gid_t, slot: &mut GroupSlot) -> Result<bool, LookupError> {
        locked_copy!(slot, self.source.getgrgid(gid), copier::copy_group)
    }

    fn host_by_name(&self, name: &CStr, slot: &mut HostSlot) -> Result<bool, LookupError> {
        locked_copy!(slot, self.source.gethostbyname(name), copier::copy_hostent)
    }

    fn host_by_address(
        &self,
        addr: &[u8],
        family: c_int,
        slot: &mut HostSlot,
    ) -> Result<bool, LookupError> {
        super::address_len(addr)?;
        locked_copy!(slot, self.source.gethostbyaddr(addr, family), copier::copy_hostent)
    }
}
