//! Older reentrant conventions.
//!
//! Solaris and illumos: the default `_r` calls return the record pointer
//! (null on failure) and report a short buffer through `errno == ERANGE`.
//! AIX: the host calls fill an opaque per-thread state object instead of a
//! caller buffer; the slot carries that object.

use std::ffi::{CStr, c_int};

use nsscompat_core::{LookupError, Strategy};

use super::DirectoryResolver;
use crate::scratch::HostSlot;
#[cfg(any(target_os = "solaris", target_os = "illumos"))]
use crate::{
    errno,
    scratch::{GroupSlot, UserSlot},
};

/// Resolver for the pointer-returning (or state-object) `_r` calls.
pub struct LegacyResolver;

pub static LEGACY: LegacyResolver = LegacyResolver;

#[cfg(any(target_os = "solaris", target_os = "illumos"))]
fn pointer_outcome<T>(result: *const T, capacity: usize) -> Result<bool, LookupError> {
    if !result.is_null() {
        return Ok(true);
    }
    if errno::get() == libc::ERANGE {
        return Err(LookupError::CapacityExceeded { capacity });
    }
    Ok(false)
}

#[cfg(any(target_os = "solaris", target_os = "illumos"))]
fn buffer_len(capacity: usize) -> c_int {
    c_int::try_from(capacity).unwrap_or(c_int::MAX)
}

impl DirectoryResolver for LegacyResolver {
    fn strategy(&self) -> Strategy {
        Strategy::LegacyReentrant
    }

    #[cfg(any(target_os = "solaris", target_os = "illumos"))]
    fn user_by_name(&self, name: &CStr, slot: &mut UserSlot) -> Result<bool, LookupError> {
        let capacity = slot.region.capacity();
        let buf = slot.region.base_ptr().cast();
        errno::clear();
        // SAFETY: name is NUL-terminated, record and buffer are owned by the
        // slot and the buffer is `capacity` bytes long.
        let result = unsafe {
            crate::sys::legacy_getpwnam_r(
                name.as_ptr(),
                &mut slot.record,
                buf,
                buffer_len(capacity),
            )
        };
        let outcome = pointer_outcome(result, capacity);
        if !matches!(outcome, Ok(true)) {
            slot.invalidate();
        }
        outcome
    }

    #[cfg(any(target_os = "solaris", target_os = "illumos"))]
    fn user_by_id(&self, uid: libc::uid_t, slot: &mut UserSlot) -> Result<bool, LookupError> {
        let capacity = slot.region.capacity();
        let buf = slot.region.base_ptr().cast();
        errno::clear();
        // SAFETY: as in `user_by_name`.
        let result = unsafe {
            crate::sys::legacy_getpwuid_r(uid, &mut slot.record, buf, buffer_len(capacity))
        };
        let outcome = pointer_outcome(result, capacity);
        if !matches!(outcome, Ok(true)) {
            slot.invalidate();
        }
        outcome
    }

    #[cfg(any(target_os = "solaris", target_os = "illumos"))]
    fn group_by_name(&self, name: &CStr, slot: &mut GroupSlot) -> Result<bool, LookupError> {
        let capacity = slot.region.capacity();
        let buf = slot.region.base_ptr().cast();
        errno::clear();
        // SAFETY: as in `user_by_name`.
        let result = unsafe {
            crate::sys::legacy_getgrnam_r(
                name.as_ptr(),
                &mut slot.record,
                buf,
                buffer_len(capacity),
            )
        };
        let outcome = pointer_outcome(result, capacity);
        if !matches!(outcome, Ok(true)) {
            slot.invalidate();
        }
        outcome
    }

    #[cfg(any(target_os = "solaris", target_os = "illumos"))]
    fn group_by_id(&self, gid: libc::gid_t, slot: &mut GroupSlot) -> Result<bool, LookupError> {
        let capacity = slot.region.capacity();
        let buf = slot.region.base_ptr().cast();
        errno::clear();
        // SAFETY: as in `user_by_name`.
        let result = unsafe {
            crate::sys::legacy_getgrgid_r(gid, &mut slot.record, buf, buffer_len(capacity))
        };
        let outcome = pointer_outcome(result, capacity);
        if !matches!(outcome, Ok(true)) {
            slot.invalidate();
        }
        outcome
    }

    #[cfg(any(target_os = "solaris", target_os = "illumos"))]
    fn host_by_name(&self, name: &CStr, slot: &mut HostSlot) -> Result<bool, LookupError> {
        let capacity = slot.region.capacity();
        let buf = slot.region.base_ptr().cast();
        let mut h_errno: c_int = 0;
        errno::clear();
        // SAFETY: as in `user_by_name`; h_errno is a valid out-slot.
        let result = unsafe {
            crate::sys::legacy_gethostbyname_r(
                name.as_ptr(),
                &mut slot.record,
                buf,
                buffer_len(capacity),
                &mut h_errno,
            )
        };
        let outcome = pointer_outcome(result, capacity);
        if !matches!(outcome, Ok(true)) {
            slot.invalidate();
        }
        outcome
    }

    #[cfg(any(target_os = "solaris", target_os = "illumos"))]
    fn host_by_address(
        &self,
        addr: &[u8],
        family: c_int,
        slot: &mut HostSlot,
    ) -> Result<bool, LookupError> {
        let len = super::address_len(addr)?;
        let capacity = slot.region.capacity();
        let buf = slot.region.base_ptr().cast();
        let mut h_errno: c_int = 0;
        errno::clear();
        // SAFETY: addr is `len` readable bytes; the rest as in `user_by_name`.
        let result = unsafe {
            crate::sys::legacy_gethostbyaddr_r(
                addr.as_ptr().cast(),
                len,
                family,
                &mut slot.record,
                buf,
                buffer_len(capacity),
                &mut h_errno,
            )
        };
        let outcome = pointer_outcome(result, capacity);
        if !matches!(outcome, Ok(true)) {
            slot.invalidate();
        }
        outcome
    }

    #[cfg(target_os = "aix")]
    fn host_by_name(&self, name: &CStr, slot: &mut HostSlot) -> Result<bool, LookupError> {
        slot.state = crate::sys::hostent_data::zeroed();
        // SAFETY: name is NUL-terminated; record and state are owned by the
        // slot, and the state was zeroed as the call requires.
        let rc = unsafe {
            crate::sys::state_gethostbyname_r(name.as_ptr(), &mut slot.record, &mut slot.state)
        };
        if rc != 0 {
            slot.invalidate();
        }
        Ok(rc == 0)
    }

    #[cfg(target_os = "aix")]
    fn host_by_address(
        &self,
        addr: &[u8],
        family: c_int,
        slot: &mut HostSlot,
    ) -> Result<bool, LookupError> {
        let len = super::address_len(addr)?;
        slot.state = crate::sys::hostent_data::zeroed();
        // SAFETY: addr is `len` readable bytes; the rest as in `host_by_name`.
        let rc = unsafe {
            crate::sys::state_gethostbyaddr_r(
                addr.as_ptr().cast(),
                len,
                family,
                &mut slot.record,
                &mut slot.state,
            )
        };
        if rc != 0 {
            slot.invalidate();
        }
        Ok(rc == 0)
    }
}
