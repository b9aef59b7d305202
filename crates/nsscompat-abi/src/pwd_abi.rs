//! C ABI for the user lookups.
//!
//! `nsscompat_getpwnam` / `nsscompat_getpwuid` behave like `getpwnam` /
//! `getpwuid`, except that the returned record lives in storage owned by the
//! calling thread and is safe to use while other threads look up users.
//! Null means "no such user" (errno untouched) or failure (errno set:
//! `ERANGE` when the record does not fit the scratch region, `EINVAL` for a
//! null name).

use std::ffi::{CStr, c_char};
use std::ptr;

use crate::{errno, lookup};

#[unsafe(no_mangle)]
pub unsafe extern "C" fn nsscompat_getpwnam(name: *const c_char) -> *mut libc::passwd {
    if name.is_null() {
        errno::set(libc::EINVAL);
        return ptr::null_mut();
    }
    // SAFETY: name is non-null and NUL-terminated per the C contract.
    let name = unsafe { CStr::from_ptr(name) };
    match lookup::lookup_user_by_name(name) {
        Ok(Some(record)) => record.as_ptr(),
        Ok(None) => ptr::null_mut(),
        Err(err) => {
            errno::set(errno::for_error(&err));
            ptr::null_mut()
        }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn nsscompat_getpwuid(uid: libc::uid_t) -> *mut libc::passwd {
    match lookup::lookup_user_by_id(uid) {
        Ok(Some(record)) => record.as_ptr(),
        Ok(None) => ptr::null_mut(),
        Err(err) => {
            errno::set(errno::for_error(&err));
            ptr::null_mut()
        }
    }
}
