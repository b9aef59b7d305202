//! End-to-end lookups against the host's real directory services.
//!
//! Entries that a minimal container may lack (a resolvable `localhost`, a
//! group 0) are probed first; tests print `Skipping:` and return when the
//! environment cannot answer.

use std::ffi::{CStr, CString};
use std::net::{IpAddr, Ipv4Addr};
use std::ptr;

use nsscompat_abi::{grp_abi, lookup, netdb_abi, pwd_abi, scratch, snapshot};
use nsscompat_abi::Dispatcher;
use nsscompat_core::{RecordKind, Strategy, StrategyPlan};

fn c(s: &str) -> CString {
    CString::new(s).unwrap()
}

/// Read a C string field of a record returned by a lookup.
fn field(p: *const libc::c_char) -> Vec<u8> {
    assert!(!p.is_null());
    // SAFETY: non-null fields of a freshly returned record are valid C
    // strings inside the thread's scratch slot.
    unsafe { CStr::from_ptr(p) }.to_bytes().to_vec()
}

#[test]
fn root_by_name_and_id() {
    let rec = lookup::lookup_user_by_name(&c("root")).unwrap().unwrap();
    // SAFETY: the pointer is valid until the next user lookup on this thread.
    let (name, uid) = unsafe { (field(rec.as_ref().pw_name), rec.as_ref().pw_uid) };
    assert_eq!(name, b"root");
    assert_eq!(uid, 0);

    let rec = lookup::lookup_user_by_id(0).unwrap().unwrap();
    // SAFETY: as above.
    assert_eq!(field(unsafe { rec.as_ref() }.pw_name), b"root");
}

#[test]
fn definitely_absent_user_is_none() {
    assert!(lookup::lookup_user_by_name(&c("__definitely_absent__")).unwrap().is_none());
    assert_eq!(snapshot::user_by_name("__definitely_absent__").unwrap(), None);
}

#[test]
fn same_kind_lookups_reuse_the_thread_record() {
    let first = lookup::lookup_user_by_name(&c("root")).unwrap().unwrap();
    let second = lookup::lookup_user_by_id(0).unwrap().unwrap();
    assert_eq!(first, second);
}

#[test]
fn returned_strings_live_in_the_thread_region() {
    let rec = lookup::lookup_user_by_name(&c("root")).unwrap().unwrap();
    // SAFETY: valid until the next user lookup on this thread.
    let rec = unsafe { *rec.as_ptr() };
    scratch::with_user_slot(|slot| {
        for p in [rec.pw_name, rec.pw_dir, rec.pw_shell] {
            assert!(p.is_null() || slot.region.contains(p));
        }
        Ok(())
    })
    .unwrap();
    assert!(scratch::region_capacity(RecordKind::User).is_some());
}

#[test]
fn fallback_and_native_strategies_agree_on_root() {
    let native = snapshot::user_by_name("root").unwrap().unwrap();
    let fallback = Dispatcher::from_plan(StrategyPlan::uniform(Strategy::LockedFallback));
    let copied = fallback.user_entry_by_name(&c("root")).unwrap().unwrap();
    assert_eq!(copied.name, native.name);
    assert_eq!(copied.uid, native.uid);
    assert_eq!(copied.gid, native.gid);
    assert_eq!(copied.dir, native.dir);
    assert_eq!(copied.shell, native.shell);
    assert_eq!(copied.gecos, None);
}

#[test]
fn group_zero_round_trips_when_present() {
    let Some(by_id) = snapshot::group_by_id(0).unwrap() else {
        eprintln!("Skipping: no group with gid 0 on this host");
        return;
    };
    let name = String::from_utf8(by_id.name.clone()).unwrap();
    let by_name = snapshot::group_by_name(&name).unwrap().unwrap();
    assert_eq!(by_name.gid, 0);
    assert_eq!(by_name.members, by_id.members);
}

#[test]
fn concurrent_threads_see_only_their_own_results() {
    const THREADS: usize = 8;
    const ITERATIONS: usize = 100;

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            std::thread::spawn(move || {
                let mut mismatches = 0usize;
                for i in 0..ITERATIONS {
                    if (t + i) % 2 == 0 {
                        let rec = lookup::lookup_user_by_name(&c("root")).unwrap().unwrap();
                        // SAFETY: valid until this thread's next user lookup.
                        let name = field(unsafe { rec.as_ref() }.pw_name);
                        mismatches += usize::from(name != b"root");
                    } else {
                        let absent = lookup::lookup_user_by_name(&c("__definitely_absent__"));
                        mismatches += usize::from(!matches!(absent, Ok(None)));
                    }
                }
                mismatches
            })
        })
        .collect();
    let mismatches: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(mismatches, 0);
}

#[test]
fn localhost_resolves_when_available() {
    let Some(host) = snapshot::host_by_name("localhost").unwrap() else {
        eprintln!("Skipping: localhost does not resolve on this host");
        return;
    };
    assert!(!host.addresses.is_empty());
    assert!(host.addresses.iter().all(|a| a.len() == host.addr_len));
    assert!(host.ip_addrs().iter().all(IpAddr::is_loopback));
}

#[test]
fn loopback_reverse_lookup_when_available() {
    let Some(host) = snapshot::host_by_address(IpAddr::V4(Ipv4Addr::LOCALHOST)).unwrap() else {
        eprintln!("Skipping: 127.0.0.1 has no reverse entry on this host");
        return;
    };
    assert!(!host.name.is_empty());
}

#[test]
fn c_abi_reports_absent_and_bad_arguments() {
    // SAFETY: valid NUL-terminated input.
    let absent = unsafe { pwd_abi::nsscompat_getpwnam(c("__definitely_absent__").as_ptr()) };
    assert!(absent.is_null());

    // SAFETY: null is an accepted input that reports EINVAL.
    let null = unsafe { grp_abi::nsscompat_getgrnam(ptr::null()) };
    assert!(null.is_null());
    assert_eq!(nsscompat_abi::errno::get(), libc::EINVAL);

    // SAFETY: null address with zero length is rejected before any read.
    let host = unsafe { netdb_abi::nsscompat_gethostbyaddr(ptr::null(), 0, libc::AF_INET) };
    assert!(host.is_null());
    assert_eq!(nsscompat_abi::errno::get(), libc::EINVAL);
}

#[test]
fn c_abi_root_matches_rust_api() {
    // SAFETY: no pointer arguments.
    let rec = unsafe { pwd_abi::nsscompat_getpwuid(0) };
    assert!(!rec.is_null());
    // SAFETY: non-null record from a successful lookup.
    assert_eq!(field(unsafe { (*rec).pw_name }), b"root");

    // SAFETY: non-null, NUL-terminated.
    let again = unsafe { pwd_abi::nsscompat_getpwnam(c("root").as_ptr()) };
    assert_eq!(rec, again);
}
