//! Raw bindings the `libc` crate does not carry.
//!
//! The POSIX `getpw*_r` / `getgr*_r` calls come from `libc` directly. What
//! lives here is the classic host lookup pair and the platform-specific
//! reentrant host and legacy user/group conventions.

#![allow(non_camel_case_types)]

use std::ffi::{c_char, c_int, c_void};

unsafe extern "C" {
    pub fn gethostbyname(name: *const c_char) -> *mut libc::hostent;
    pub fn gethostbyaddr(
        addr: *const c_void,
        len: libc::socklen_t,
        family: c_int,
    ) -> *mut libc::hostent;
}

/// glibc / musl: status return plus out-pointer.
#[cfg(target_os = "linux")]
unsafe extern "C" {
    pub fn gethostbyname_r(
        name: *const c_char,
        ret: *mut libc::hostent,
        buf: *mut c_char,
        buflen: libc::size_t,
        result: *mut *mut libc::hostent,
        h_errnop: *mut c_int,
    ) -> c_int;
    pub fn gethostbyaddr_r(
        addr: *const c_void,
        len: libc::socklen_t,
        family: c_int,
        ret: *mut libc::hostent,
        buf: *mut c_char,
        buflen: libc::size_t,
        result: *mut *mut libc::hostent,
        h_errnop: *mut c_int,
    ) -> c_int;
}

/// Solaris / illumos: the default (non-POSIX) `_r` calls return the record
/// pointer and take an `int` buffer length.
#[cfg(any(target_os = "solaris", target_os = "illumos"))]
#[link(name = "nsl")]
unsafe extern "C" {
    #[link_name = "getpwnam_r"]
    pub fn legacy_getpwnam_r(
        name: *const c_char,
        pwd: *mut libc::passwd,
        buf: *mut c_char,
        buflen: c_int,
    ) -> *mut libc::passwd;
    #[link_name = "getpwuid_r"]
    pub fn legacy_getpwuid_r(
        uid: libc::uid_t,
        pwd: *mut libc::passwd,
        buf: *mut c_char,
        buflen: c_int,
    ) -> *mut libc::passwd;
    #[link_name = "getgrnam_r"]
    pub fn legacy_getgrnam_r(
        name: *const c_char,
        grp: *mut libc::group,
        buf: *mut c_char,
        buflen: c_int,
    ) -> *mut libc::group;
    #[link_name = "getgrgid_r"]
    pub fn legacy_getgrgid_r(
        gid: libc::gid_t,
        grp: *mut libc::group,
        buf: *mut c_char,
        buflen: c_int,
    ) -> *mut libc::group;
    #[link_name = "gethostbyname_r"]
    pub fn legacy_gethostbyname_r(
        name: *const c_char,
        result: *mut libc::hostent,
        buf: *mut c_char,
        buflen: c_int,
        h_errnop: *mut c_int,
    ) -> *mut libc::hostent;
    #[link_name = "gethostbyaddr_r"]
    pub fn legacy_gethostbyaddr_r(
        addr: *const c_char,
        len: c_int,
        family: c_int,
        result: *mut libc::hostent,
        buf: *mut c_char,
        buflen: c_int,
        h_errnop: *mut c_int,
    ) -> *mut libc::hostent;
}

/// AIX reentrant host state. The system fills it instead of a caller
/// buffer; callers must zero it before each call.
#[cfg(target_os = "aix")]
#[repr(C, align(8))]
pub struct hostent_data {
    opaque: [u8; HOSTENT_DATA_BYTES],
}

#[cfg(target_os = "aix")]
pub const HOSTENT_DATA_BYTES: usize = 16 * 1024;

#[cfg(target_os = "aix")]
impl hostent_data {
    pub const fn zeroed() -> Self {
        Self {
            opaque: [0; HOSTENT_DATA_BYTES],
        }
    }
}

#[cfg(target_os = "aix")]
unsafe extern "C" {
    #[link_name = "gethostbyname_r"]
    pub fn state_gethostbyname_r(
        name: *const c_char,
        htent: *mut libc::hostent,
        ht_data: *mut hostent_data,
    ) -> c_int;
    #[link_name = "gethostbyaddr_r"]
    pub fn state_gethostbyaddr_r(
        addr: *const c_char,
        len: c_int,
        family: c_int,
        htent: *mut libc::hostent,
        ht_data: *mut hostent_data,
    ) -> c_int;
}
