//! POSIX-style reentrant lookups: record, buffer and out-pointer in, status
//! code out. The OS writes the record's strings straight into the slot's
//! region, so no copy is needed.

use std::ffi::{CStr, c_char, c_int};
use std::ptr;

use nsscompat_core::{LookupError, Strategy};

use super::DirectoryResolver;
use crate::scratch::{GroupSlot, HostSlot, UserSlot};

/// Resolver for the status-returning `_r` calls.
pub struct ReentrantResolver;

pub static REENTRANT: ReentrantResolver = ReentrantResolver;

/// Map a `getpw*_r` / `getgr*_r` status to the lookup contract.
///
/// Zero with a null result is "not found"; so are the errno values some
/// implementations return for an unknown name or id.
pub(crate) fn interpret_status<T>(
    rc: c_int,
    result: *const T,
    capacity: usize,
) -> Result<bool, LookupError> {
    match rc {
        0 => Ok(!result.is_null()),
        libc::ERANGE => Err(LookupError::CapacityExceeded { capacity }),
        libc::ENOENT | libc::ESRCH | libc::EBADF | libc::EPERM => Ok(false),
        other => Err(LookupError::Os(other)),
    }
}

fn settle_user(
    outcome: Result<bool, LookupError>,
    slot: &mut UserSlot,
) -> Result<bool, LookupError> {
    if !matches!(outcome, Ok(true)) {
        slot.invalidate();
    }
    outcome
}

fn settle_group(
    outcome: Result<bool, LookupError>,
    slot: &mut GroupSlot,
) -> Result<bool, LookupError> {
    if !matches!(outcome, Ok(true)) {
        slot.invalidate();
    }
    outcome
}

impl DirectoryResolver for ReentrantResolver {
    fn strategy(&self) -> Strategy {
        Strategy::Reentrant
    }

    fn user_by_name(&self, name: &CStr, slot: &mut UserSlot) -> Result<bool, LookupError> {
        let capacity = slot.region.capacity();
        let buf = slot.region.base_ptr().cast::<c_char>();
        let mut result: *mut libc::passwd = ptr::null_mut();
        // SAFETY: name is NUL-terminated, record and buffer are owned by the
        // slot and the buffer is `capacity` bytes long.
        let rc = unsafe {
            libc::getpwnam_r(name.as_ptr(), &mut slot.record, buf, capacity, &mut result)
        };
        settle_user(interpret_status(rc, result, capacity), slot)
    }

    fn user_by_id(&self, uid: libc::uid_t, slot: &mut UserSlot) -> Result<bool, LookupError> {
        let capacity = slot.region.capacity();
        let buf = slot.region.base_ptr().cast::<c_char>();
        let mut result: *mut libc::passwd = ptr::null_mut();
        // SAFETY: as in `user_by_name`.
        let rc = unsafe { libc::getpwuid_r(uid, &mut slot.record, buf, capacity, &mut result) };
        settle_user(interpret_status(rc, result, capacity), slot)
    }

    fn group_by_name(&self, name: &CStr, slot: &mut GroupSlot) -> Result<bool, LookupError> {
        let capacity = slot.region.capacity();
        let buf = slot.region.base_ptr().cast::<c_char>();
        let mut result: *mut libc::group = ptr::null_mut();
        // SAFETY: as in `user_by_name`.
        let rc = unsafe {
            libc::getgrnam_r(name.as_ptr(), &mut slot.record, buf, capacity, &mut result)
        };
        settle_group(interpret_status(rc, result, capacity), slot)
    }

    fn group_by_id(&self, gid: libc::gid_t, slot: &mut GroupSlot) -> Result<bool, LookupError> {
        let capacity = slot.region.capacity();
        let buf = slot.region.base_ptr().cast::<c_char>();
        let mut result: *mut libc::group = ptr::null_mut();
        // SAFETY: as in `user_by_name`.
        let rc = unsafe { libc::getgrgid_r(gid, &mut slot.record, buf, capacity, &mut result) };
        settle_group(interpret_status(rc, result, capacity), slot)
    }

    #[cfg(target_os = "linux")]
    fn host_by_name(&self, name: &CStr, slot: &mut HostSlot) -> Result<bool, LookupError> {
        let capacity = slot.region.capacity();
        let buf = slot.region.base_ptr().cast::<c_char>();
        let mut result: *mut libc::hostent = ptr::null_mut();
        let mut h_errno: c_int = 0;
        // SAFETY: as in `user_by_name`; h_errno is a valid out-slot.
        let rc = unsafe {
            crate::sys::gethostbyname_r(
                name.as_ptr(),
                &mut slot.record,
                buf,
                capacity,
                &mut result,
                &mut h_errno,
            )
        };
        settle_host(rc, result, capacity, slot)
    }

    #[cfg(target_os = "linux")]
    fn host_by_address(
        &self,
        addr: &[u8],
        family: c_int,
        slot: &mut HostSlot,
    ) -> Result<bool, LookupError> {
        let len = super::address_len(addr)?;
        let capacity = slot.region.capacity();
        let buf = slot.region.base_ptr().cast::<c_char>();
        let mut result: *mut libc::hostent = ptr::null_mut();
        let mut h_errno: c_int = 0;
        // SAFETY: addr is `len` readable bytes; the rest as in `user_by_name`.
        let rc = unsafe {
            crate::sys::gethostbyaddr_r(
                addr.as_ptr().cast(),
                len.unsigned_abs(),
                family,
                &mut slot.record,
                buf,
                capacity,
                &mut result,
                &mut h_errno,
            )
        };
        settle_host(rc, result, capacity, slot)
    }
}

/// Host calls report "not found" through `h_errno`, so any failure other
/// than a short buffer means absent.
#[cfg(target_os = "linux")]
fn settle_host(
    rc: c_int,
    result: *const libc::hostent,
    capacity: usize,
    slot: &mut HostSlot,
) -> Result<bool, LookupError> {
    let outcome = match rc {
        0 => Ok(!result.is_null()),
        libc::ERANGE => Err(LookupError::CapacityExceeded { capacity }),
        _ => Ok(false),
    };
    if !matches!(outcome, Ok(true)) {
        slot.invalidate();
    }
    outcome
}
