//! Pointer API: each lookup returns a pointer into the calling thread's
//! scratch slot for that record kind.
//!
//! The pointer and everything reachable from it stay valid until the next
//! lookup of the same kind on the same thread, or until the thread exits.
//! Copy out anything you need to keep (see [`crate::snapshot`]).

use std::ffi::{CStr, c_int};
use std::ptr::NonNull;

use nsscompat_core::LookupError;

use crate::resolver::dispatcher;

pub fn lookup_user_by_name(name: &CStr) -> Result<Option<NonNull<libc::passwd>>, LookupError> {
    dispatcher().user_by_name_with(name, |rec| NonNull::from(rec))
}

pub fn lookup_user_by_id(uid: libc::uid_t) -> Result<Option<NonNull<libc::passwd>>, LookupError> {
    dispatcher().user_by_id_with(uid, |rec| NonNull::from(rec))
}

pub fn lookup_group_by_name(name: &CStr) -> Result<Option<NonNull<libc::group>>, LookupError> {
    dispatcher().group_by_name_with(name, |rec| NonNull::from(rec))
}

pub fn lookup_group_by_id(gid: libc::gid_t) -> Result<Option<NonNull<libc::group>>, LookupError> {
    dispatcher().group_by_id_with(gid, |rec| NonNull::from(rec))
}

pub fn lookup_host_by_name(name: &CStr) -> Result<Option<NonNull<libc::hostent>>, LookupError> {
    dispatcher().host_by_name_with(name, |rec| NonNull::from(rec))
}

/// `addr` is the raw network-order address; its length is the address
/// length handed to the OS.
pub fn lookup_host_by_address(
    addr: &[u8],
    family: c_int,
) -> Result<Option<NonNull<libc::hostent>>, LookupError> {
    dispatcher().host_by_address_with(addr, family, |rec| NonNull::from(rec))
}
