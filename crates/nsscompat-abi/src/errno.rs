//! Thread-local `errno` access and the error-to-errno mapping used at the
//! C boundary.

use std::ffi::c_int;

use nsscompat_core::LookupError;

#[cfg(target_os = "linux")]
unsafe fn errno_location() -> *mut c_int {
    // SAFETY: takes no arguments and returns the thread's errno slot.
    unsafe { libc::__errno_location() }
}

#[cfg(any(target_os = "android", target_os = "netbsd", target_os = "openbsd"))]
unsafe fn errno_location() -> *mut c_int {
    // SAFETY: as above.
    unsafe { libc::__errno() }
}

#[cfg(any(target_vendor = "apple", target_os = "freebsd"))]
unsafe fn errno_location() -> *mut c_int {
    // SAFETY: as above.
    unsafe { libc::__error() }
}

#[cfg(any(target_os = "solaris", target_os = "illumos"))]
unsafe fn errno_location() -> *mut c_int {
    // SAFETY: as above.
    unsafe { libc::___errno() }
}

#[cfg(target_os = "aix")]
unsafe fn errno_location() -> *mut c_int {
    // SAFETY: as above.
    unsafe { libc::_Errno() }
}

/// Store `value` into the calling thread's `errno`.
pub fn set(value: c_int) {
    // SAFETY: the errno location is a valid, thread-local int for the life of
    // the calling thread.
    unsafe { *errno_location() = value };
}

/// The calling thread's current `errno`.
#[must_use]
pub fn get() -> c_int {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

/// Clear `errno` ahead of a call that reports failure only through it.
pub fn clear() {
    set(0);
}

/// The `errno` a C caller sees for `err`.
#[must_use]
pub fn for_error(err: &LookupError) -> c_int {
    match err {
        LookupError::CapacityExceeded { .. } => libc::ERANGE,
        LookupError::InvalidArgument(_) => libc::EINVAL,
        LookupError::Os(code) => *code,
        LookupError::MalformedRecord(_) => libc::EIO,
        LookupError::Reentered(_) => libc::EDEADLK,
        LookupError::ThreadTeardown => libc::EAGAIN,
    }
}
