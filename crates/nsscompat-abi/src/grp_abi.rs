//! C ABI for the group lookups. Same contract as [`crate::pwd_abi`].

use std::ffi::{CStr, c_char};
use std::ptr;

use crate::{errno, lookup};

#[unsafe(no_mangle)]
pub unsafe extern "C" fn nsscompat_getgrnam(name: *const c_char) -> *mut libc::group {
    if name.is_null() {
        errno::set(libc::EINVAL);
        return ptr::null_mut();
    }
    // SAFETY: name is non-null and NUL-terminated per the C contract.
    let name = unsafe { CStr::from_ptr(name) };
    match lookup::lookup_group_by_name(name) {
        Ok(Some(record)) => record.as_ptr(),
        Ok(None) => ptr::null_mut(),
        Err(err) => {
            errno::set(errno::for_error(&err));
            ptr::null_mut()
        }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn nsscompat_getgrgid(gid: libc::gid_t) -> *mut libc::group {
    match lookup::lookup_group_by_id(gid) {
        Ok(Some(record)) => record.as_ptr(),
        Ok(None) => ptr::null_mut(),
        Err(err) => {
            errno::set(errno::for_error(&err));
            ptr::null_mut()
        }
    }
}
