//! C ABI for the host lookups.
//!
//! Unlike the classic calls these do not set `h_errno`: a host that does not
//! resolve is reported as null with errno untouched, and only a record too
//! large for the scratch region (`ERANGE`) or a bad argument (`EINVAL`) sets
//! errno.

use std::ffi::{CStr, c_char, c_int, c_void};
use std::ptr;

use crate::{errno, lookup};

#[unsafe(no_mangle)]
pub unsafe extern "C" fn nsscompat_gethostbyname(name: *const c_char) -> *mut libc::hostent {
    if name.is_null() {
        errno::set(libc::EINVAL);
        return ptr::null_mut();
    }
    // SAFETY: name is non-null and NUL-terminated per the C contract.
    let name = unsafe { CStr::from_ptr(name) };
    match lookup::lookup_host_by_name(name) {
        Ok(Some(record)) => record.as_ptr(),
        Ok(None) => ptr::null_mut(),
        Err(err) => {
            errno::set(errno::for_error(&err));
            ptr::null_mut()
        }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn nsscompat_gethostbyaddr(
    addr: *const c_void,
    len: libc::socklen_t,
    family: c_int,
) -> *mut libc::hostent {
    if addr.is_null() || len == 0 {
        errno::set(libc::EINVAL);
        return ptr::null_mut();
    }
    let Ok(len) = usize::try_from(len) else {
        errno::set(libc::EINVAL);
        return ptr::null_mut();
    };
    // SAFETY: addr is non-null and points to `len` readable bytes per the C
    // contract.
    let bytes = unsafe { std::slice::from_raw_parts(addr.cast::<u8>(), len) };
    match lookup::lookup_host_by_address(bytes, family) {
        Ok(Some(record)) => record.as_ptr(),
        Ok(None) => ptr::null_mut(),
        Err(err) => {
            errno::set(errno::for_error(&err));
            ptr::null_mut()
        }
    }
}
