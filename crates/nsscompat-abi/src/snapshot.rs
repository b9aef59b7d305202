//! Snapshot API: lookups that copy the answer out of the thread's scratch
//! slot into owned values before returning.

use std::ffi::{CStr, CString};
use std::net::IpAddr;

use nsscompat_core::{GroupEntry, HostEntry, LookupError, UserEntry};

use crate::copier::{blob_array, opt_bytes, string_array};
use crate::resolver::{Dispatcher, dispatcher};

fn c_name(name: &str) -> Result<CString, LookupError> {
    CString::new(name).map_err(|_| LookupError::InvalidArgument("name contains a NUL byte"))
}

fn owned(bytes: Option<&[u8]>) -> Vec<u8> {
    bytes.map(<[u8]>::to_vec).unwrap_or_default()
}

fn owned_all(items: Option<Vec<&[u8]>>) -> Vec<Vec<u8>> {
    items
        .unwrap_or_default()
        .into_iter()
        .map(<[u8]>::to_vec)
        .collect()
}

/// # Safety
/// `rec` must be a record filled by a successful lookup.
unsafe fn user_entry(rec: &libc::passwd) -> UserEntry {
    #[cfg(not(target_os = "android"))]
    // SAFETY: gecos is null or a valid C string.
    let gecos = unsafe { opt_bytes(rec.pw_gecos) }.map(<[u8]>::to_vec);
    #[cfg(target_os = "android")]
    let gecos = None;
    // SAFETY: string fields are null or valid C strings.
    unsafe {
        UserEntry {
            name: owned(opt_bytes(rec.pw_name)),
            passwd: owned(opt_bytes(rec.pw_passwd)),
            uid: rec.pw_uid,
            gid: rec.pw_gid,
            gecos,
            dir: owned(opt_bytes(rec.pw_dir)),
            shell: owned(opt_bytes(rec.pw_shell)),
        }
    }
}

/// # Safety
/// `rec` must be a record filled by a successful lookup.
unsafe fn group_entry(rec: &libc::group) -> GroupEntry {
    // SAFETY: fields are null or valid per the lookup contract.
    unsafe {
        GroupEntry {
            name: owned(opt_bytes(rec.gr_name)),
            passwd: owned(opt_bytes(rec.gr_passwd)),
            gid: rec.gr_gid,
            members: owned_all(string_array(rec.gr_mem)),
        }
    }
}

/// # Safety
/// `rec` must be a record filled by a successful lookup.
unsafe fn host_entry(rec: &libc::hostent) -> HostEntry {
    let addr_len = usize::try_from(rec.h_length).unwrap_or(0);
    // SAFETY: fields are null or valid per the lookup contract, and every
    // address holds `h_length` bytes.
    unsafe {
        HostEntry {
            name: owned(opt_bytes(rec.h_name)),
            aliases: owned_all(string_array(rec.h_aliases)),
            family: rec.h_addrtype,
            addr_len,
            addresses: owned_all(blob_array(rec.h_addr_list, addr_len)),
        }
    }
}

/// Split an IP address into raw octets and its address family.
#[must_use]
pub fn address_query(addr: IpAddr) -> (Vec<u8>, libc::c_int) {
    match addr {
        IpAddr::V4(v4) => (v4.octets().to_vec(), libc::AF_INET),
        IpAddr::V6(v6) => (v6.octets().to_vec(), libc::AF_INET6),
    }
}

impl Dispatcher {
    pub fn user_entry_by_name(&self, name: &CStr) -> Result<Option<UserEntry>, LookupError> {
        // SAFETY: the dispatcher only hands over records it just filled.
        self.user_by_name_with(name, |rec| unsafe { user_entry(rec) })
    }

    pub fn user_entry_by_id(&self, uid: libc::uid_t) -> Result<Option<UserEntry>, LookupError> {
        // SAFETY: as above.
        self.user_by_id_with(uid, |rec| unsafe { user_entry(rec) })
    }

    pub fn group_entry_by_name(&self, name: &CStr) -> Result<Option<GroupEntry>, LookupError> {
        // SAFETY: as above.
        self.group_by_name_with(name, |rec| unsafe { group_entry(rec) })
    }

    pub fn group_entry_by_id(&self, gid: libc::gid_t) -> Result<Option<GroupEntry>, LookupError> {
        // SAFETY: as above.
        self.group_by_id_with(gid, |rec| unsafe { group_entry(rec) })
    }

    pub fn host_entry_by_name(&self, name: &CStr) -> Result<Option<HostEntry>, LookupError> {
        // SAFETY: as above.
        self.host_by_name_with(name, |rec| unsafe { host_entry(rec) })
    }

    pub fn host_entry_by_address(&self, addr: IpAddr) -> Result<Option<HostEntry>, LookupError> {
        let (octets, family) = address_query(addr);
        // SAFETY: as above.
        self.host_by_address_with(&octets, family, |rec| unsafe { host_entry(rec) })
    }
}

pub fn user_by_name(name: &str) -> Result<Option<UserEntry>, LookupError> {
    dispatcher().user_entry_by_name(&c_name(name)?)
}

pub fn user_by_id(uid: u32) -> Result<Option<UserEntry>, LookupError> {
    dispatcher().user_entry_by_id(uid)
}

pub fn group_by_name(name: &str) -> Result<Option<GroupEntry>, LookupError> {
    dispatcher().group_entry_by_name(&c_name(name)?)
}

pub fn group_by_id(gid: u32) -> Result<Option<GroupEntry>, LookupError> {
    dispatcher().group_entry_by_id(gid)
}

pub fn host_by_name(name: &str) -> Result<Option<HostEntry>, LookupError> {
    dispatcher().host_entry_by_name(&c_name(name)?)
}

pub fn host_by_address(addr: IpAddr) -> Result<Option<HostEntry>, LookupError> {
    dispatcher().host_entry_by_address(addr)
}
