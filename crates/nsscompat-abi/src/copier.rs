//! Deep copy of OS-owned records into a thread's scratch slot.
//!
//! The fixed part of the record is copied by value, the variable-length
//! fields are flattened by `nsscompat_core::record`, and every pointer field
//! is then rewritten to its copy inside the slot's region. Fields the copy
//! does not carry (gecos and the platform extras) are nulled so the record
//! never points outside the region.
//!
//! On any failure the slot's record is zeroed before the error is returned.

use std::ffi::{CStr, c_char};
use std::ptr;

use nsscompat_core::LookupError;
use nsscompat_core::packer::POINTER_SIZE;
use nsscompat_core::record::{self, GroupFields, HostFields, UserFields};

use crate::scratch::{GroupSlot, HostSlot, UserSlot};

/// Bytes of a C string, without the terminator.
///
/// # Safety
/// `p` must be null or point to a NUL-terminated string that stays valid
/// for `'a`.
pub(crate) unsafe fn opt_bytes<'a>(p: *const c_char) -> Option<&'a [u8]> {
    if p.is_null() {
        return None;
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract.
    Some(unsafe { CStr::from_ptr(p) }.to_bytes())
}

/// Entries of a null-terminated array of C strings.
///
/// # Safety
/// `arr` must be null or a null-terminated array of valid C strings that
/// stay valid for `'a`.
pub(crate) unsafe fn string_array<'a>(arr: *const *mut c_char) -> Option<Vec<&'a [u8]>> {
    if arr.is_null() {
        return None;
    }
    let mut out = Vec::new();
    let mut i = 0;
    loop {
        // SAFETY: the array is null-terminated, so every index up to and
        // including the terminator is readable.
        let entry = unsafe { *arr.add(i) };
        if entry.is_null() {
            return Some(out);
        }
        // SAFETY: entry is a valid C string per the caller's contract.
        out.push(unsafe { CStr::from_ptr(entry) }.to_bytes());
        i += 1;
    }
}

/// Entries of a null-terminated array of fixed-size blobs.
///
/// # Safety
/// `arr` must be null or a null-terminated array whose entries each point to
/// at least `len` readable bytes that stay valid for `'a`.
pub(crate) unsafe fn blob_array<'a>(
    arr: *const *mut c_char,
    len: usize,
) -> Option<Vec<&'a [u8]>> {
    if arr.is_null() {
        return None;
    }
    let mut out = Vec::new();
    let mut i = 0;
    loop {
        // SAFETY: the array is null-terminated.
        let entry = unsafe { *arr.add(i) };
        if entry.is_null() {
            return Some(out);
        }
        // SAFETY: each entry holds `len` readable bytes per the caller's
        // contract.
        out.push(unsafe { std::slice::from_raw_parts(entry.cast::<u8>(), len) });
        i += 1;
    }
}

fn field_ptr(base: *mut u8, offset: Option<usize>) -> *mut c_char {
    match offset {
        Some(offset) => base.wrapping_add(offset).cast(),
        None => ptr::null_mut(),
    }
}

/// Rewrite a flattened pointer table so each slot carries a pointer derived
/// from `base` instead of a bare address, and return the table pointer.
///
/// # Safety
/// `base..base + capacity` must be the region the table was packed into and
/// `offset` must come from a successful pack into it.
unsafe fn rebase_table(
    base: *mut u8,
    capacity: usize,
    offset: Option<usize>,
) -> *mut *mut c_char {
    let Some(offset) = offset else {
        return ptr::null_mut();
    };
    let mut at = offset;
    while at + POINTER_SIZE <= capacity {
        // SAFETY: `at` is inside the region and pointer-aligned (tables are
        // placed on pointer boundaries and slots are pointer-sized).
        let slot = unsafe { base.add(at) }.cast::<usize>();
        // SAFETY: as above.
        let addr = unsafe { slot.read() };
        // SAFETY: the slot holds pointer-sized data; overwrite it with a
        // pointer carrying the region's provenance.
        unsafe { slot.cast::<*mut u8>().write(base.with_addr(addr)) };
        if addr == 0 {
            break;
        }
        at += POINTER_SIZE;
    }
    base.wrapping_add(offset).cast()
}

#[allow(unused_variables)]
fn clear_uncopied_passwd_fields(rec: &mut libc::passwd) {
    #[cfg(not(target_os = "android"))]
    {
        rec.pw_gecos = ptr::null_mut();
    }
    #[cfg(any(
        target_vendor = "apple",
        target_os = "freebsd",
        target_os = "dragonfly",
        target_os = "netbsd",
        target_os = "openbsd"
    ))]
    {
        rec.pw_class = ptr::null_mut();
    }
    #[cfg(any(target_os = "solaris", target_os = "illumos"))]
    {
        rec.pw_age = ptr::null_mut();
        rec.pw_comment = ptr::null_mut();
    }
}

/// Copy `*src` into `slot`.
///
/// # Safety
/// `src` must point to a valid `passwd` whose string fields are null or valid
/// C strings, none of which alias `slot`, for the duration of the call.
pub unsafe fn copy_passwd(
    src: *const libc::passwd,
    slot: &mut UserSlot,
) -> Result<(), LookupError> {
    // SAFETY: valid per the caller's contract.
    let source = unsafe { &*src };
    slot.record = *source;
    // SAFETY: the string fields are valid per the caller's contract.
    let fields = unsafe {
        UserFields {
            name: opt_bytes(source.pw_name),
            passwd: opt_bytes(source.pw_passwd),
            dir: opt_bytes(source.pw_dir),
            shell: opt_bytes(source.pw_shell),
        }
    };

    let capacity = slot.region.capacity();
    let layout = match record::copy_user(&fields, &mut slot.region.arena()) {
        Ok(layout) => layout,
        Err(err) => {
            slot.invalidate();
            return Err(LookupError::from_pack(err, capacity));
        }
    };

    let base = slot.region.base_ptr();
    let rec = &mut slot.record;
    rec.pw_name = field_ptr(base, layout.name);
    rec.pw_passwd = field_ptr(base, layout.passwd);
    rec.pw_dir = field_ptr(base, layout.dir);
    rec.pw_shell = field_ptr(base, layout.shell);
    clear_uncopied_passwd_fields(rec);
    Ok(())
}

/// Copy `*src` into `slot`.
///
/// # Safety
/// `src` must point to a valid `group` whose string fields and member array
/// are null or valid, none of which alias `slot`, for the duration of the
/// call.
pub unsafe fn copy_group(
    src: *const libc::group,
    slot: &mut GroupSlot,
) -> Result<(), LookupError> {
    // SAFETY: valid per the caller's contract.
    let source = unsafe { &*src };
    slot.record = *source;
    // SAFETY: fields are valid per the caller's contract.
    let (name, passwd, members) = unsafe {
        (
            opt_bytes(source.gr_name),
            opt_bytes(source.gr_passwd),
            string_array(source.gr_mem),
        )
    };
    let fields = GroupFields {
        name,
        passwd,
        members: members.as_deref(),
    };

    let capacity = slot.region.capacity();
    let layout = match record::copy_group(&fields, &mut slot.region.arena()) {
        Ok(layout) => layout,
        Err(err) => {
            slot.invalidate();
            return Err(LookupError::from_pack(err, capacity));
        }
    };

    let base = slot.region.base_ptr();
    let rec = &mut slot.record;
    rec.gr_name = field_ptr(base, layout.name);
    rec.gr_passwd = field_ptr(base, layout.passwd);
    // SAFETY: the table was just packed into this region.
    rec.gr_mem = unsafe { rebase_table(base, capacity, layout.members) };
    Ok(())
}

/// Copy `*src` into `slot`.
///
/// # Safety
/// `src` must point to a valid `hostent` whose name is null or a valid C
/// string, whose alias array is null or a null-terminated array of C strings
/// and whose address array is null or a null-terminated array of
/// `h_length`-byte blobs, none of which alias `slot`.
pub unsafe fn copy_hostent(
    src: *const libc::hostent,
    slot: &mut HostSlot,
) -> Result<(), LookupError> {
    // SAFETY: valid per the caller's contract.
    let source = unsafe { &*src };
    slot.record = *source;
    let Ok(addr_len) = usize::try_from(source.h_length) else {
        slot.invalidate();
        return Err(LookupError::MalformedRecord("negative address length"));
    };
    // SAFETY: fields are valid per the caller's contract.
    let (name, aliases, addresses) = unsafe {
        (
            opt_bytes(source.h_name),
            string_array(source.h_aliases),
            blob_array(source.h_addr_list, addr_len),
        )
    };
    let fields = HostFields {
        name,
        aliases: aliases.as_deref(),
        addr_len,
        addresses: addresses.as_deref(),
    };

    let capacity = slot.region.capacity();
    let layout = match record::copy_host(&fields, &mut slot.region.arena()) {
        Ok(layout) => layout,
        Err(err) => {
            slot.invalidate();
            return Err(LookupError::from_pack(err, capacity));
        }
    };

    let base = slot.region.base_ptr();
    let rec = &mut slot.record;
    rec.h_name = field_ptr(base, layout.name);
    // SAFETY: both tables were just packed into this region.
    unsafe {
        rec.h_aliases = rebase_table(base, capacity, layout.aliases);
        rec.h_addr_list = rebase_table(base, capacity, layout.addresses);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scratch::with_host_slot;
    use std::ffi::CString;

    #[test]
    fn hostent_copy_points_only_into_region() {
        let name = CString::new("db.internal").unwrap();
        let alias = CString::new("db").unwrap();
        let mut aliases = [alias.as_ptr().cast_mut(), ptr::null_mut()];
        let mut a1 = [10u8, 0, 0, 1];
        let mut a2 = [10u8, 0, 0, 2];
        let mut addrs = [
            a1.as_mut_ptr().cast::<c_char>(),
            a2.as_mut_ptr().cast::<c_char>(),
            ptr::null_mut(),
        ];
        // SAFETY: hostent is a plain C struct.
        let mut src: libc::hostent = unsafe { std::mem::zeroed() };
        src.h_name = name.as_ptr().cast_mut();
        src.h_aliases = aliases.as_mut_ptr();
        src.h_addrtype = libc::AF_INET;
        src.h_length = 4;
        src.h_addr_list = addrs.as_mut_ptr();

        with_host_slot(|slot| {
            // SAFETY: src and everything it points at outlive the call.
            unsafe { copy_hostent(&src, slot) }?;
            let rec = slot.record;
            assert!(slot.region.contains(rec.h_name));
            assert!(slot.region.contains(rec.h_addr_list.cast::<c_char>()));
            // SAFETY: the copy produced a valid record inside the region.
            unsafe {
                assert_eq!(CStr::from_ptr(rec.h_name).to_bytes(), b"db.internal");
                let alias0 = *rec.h_aliases;
                assert!(slot.region.contains(alias0));
                assert_eq!(CStr::from_ptr(alias0).to_bytes(), b"db");
                assert!((*rec.h_aliases.add(1)).is_null());
                for (i, expected) in [[10u8, 0, 0, 1], [10, 0, 0, 2]].iter().enumerate() {
                    let entry = *rec.h_addr_list.add(i);
                    assert!(slot.region.contains(entry));
                    assert_eq!(std::slice::from_raw_parts(entry.cast::<u8>(), 4), expected);
                }
                assert!((*rec.h_addr_list.add(2)).is_null());
            }
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn negative_address_length_is_malformed() {
        // SAFETY: hostent is a plain C struct.
        let mut src: libc::hostent = unsafe { std::mem::zeroed() };
        src.h_length = -1;
        // SAFETY: src is a valid record with no pointer fields set.
        let err = with_host_slot(|slot| unsafe { copy_hostent(&src, slot) }).unwrap_err();
        assert!(matches!(err, LookupError::MalformedRecord(_)));
    }
}
