//! Thread-owned scratch storage.
//!
//! Each thread lazily creates one slot per record kind. A slot holds the
//! C record handed back to callers and the fixed-capacity region its string
//! and array fields point into. Slots are boxed so the record and region keep
//! the same address for the life of the thread; a new lookup of the same kind
//! overwrites both in place.
//!
//! Access goes through `with_*_slot`, which fails with
//! [`LookupError::Reentered`] if the same kind is already borrowed on this
//! thread (an NSS module calling back into us) and with
//! [`LookupError::ThreadTeardown`] once thread-local destructors have run.

use std::cell::RefCell;
use std::ffi::c_char;
use std::thread::LocalKey;

use nsscompat_core::arena::ScratchArena;
use nsscompat_core::{LookupError, LookupMetrics, RecordKind, config, global_metrics};

/// Fixed-capacity byte region, 8-byte aligned.
pub struct ScratchRegion {
    words: Box<[u64]>,
}

impl ScratchRegion {
    /// Allocate a zeroed region of at least `capacity` bytes, rounded up to
    /// a whole number of 8-byte words.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0u64; capacity.div_ceil(8)].into_boxed_slice(),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.words.len() * 8
    }

    /// Address of the first byte, exposed so pointers rebuilt from stored
    /// addresses may use it.
    #[must_use]
    pub fn base_addr(&self) -> usize {
        self.words.as_ptr().expose_provenance()
    }

    /// Pointer to the first byte, for handing the region to the OS.
    pub fn base_ptr(&mut self) -> *mut u8 {
        self.words.as_mut_ptr().cast()
    }

    /// Whether `p` points inside this region.
    #[must_use]
    pub fn contains(&self, p: *const c_char) -> bool {
        let addr = p.addr();
        let base = self.words.as_ptr().addr();
        addr >= base && addr - base < self.capacity()
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        let len = self.capacity();
        // SAFETY: the words allocation is exactly `len` bytes, every bit
        // pattern is a valid u8, and the returned slice borrows `self`
        // mutably so nothing else aliases it.
        unsafe { std::slice::from_raw_parts_mut(self.words.as_mut_ptr().cast::<u8>(), len) }
    }

    /// A fresh bump arena over the whole region.
    pub fn arena(&mut self) -> ScratchArena<'_> {
        let base = self.base_addr();
        ScratchArena::new(self.as_bytes_mut(), base)
    }
}

pub struct UserSlot {
    pub record: libc::passwd,
    pub region: ScratchRegion,
}

pub struct GroupSlot {
    pub record: libc::group,
    pub region: ScratchRegion,
}

pub struct HostSlot {
    pub record: libc::hostent,
    pub region: ScratchRegion,
    #[cfg(target_os = "aix")]
    pub(crate) state: crate::sys::hostent_data,
}

impl UserSlot {
    fn new(capacity: usize) -> Self {
        Self {
            // SAFETY: passwd is a plain C struct; all-zero is a valid value
            // (null pointers, zero ids).
            record: unsafe { std::mem::zeroed() },
            region: ScratchRegion::new(capacity),
        }
    }

    /// Reset the record so no field points at stale data.
    pub fn invalidate(&mut self) {
        // SAFETY: see `new`.
        self.record = unsafe { std::mem::zeroed() };
    }
}

impl GroupSlot {
    fn new(capacity: usize) -> Self {
        Self {
            // SAFETY: group is a plain C struct; all-zero is a valid value.
            record: unsafe { std::mem::zeroed() },
            region: ScratchRegion::new(capacity),
        }
    }

    pub fn invalidate(&mut self) {
        // SAFETY: see `new`.
        self.record = unsafe { std::mem::zeroed() };
    }
}

impl HostSlot {
    fn new(capacity: usize) -> Self {
        Self {
            // SAFETY: hostent is a plain C struct; all-zero is a valid value.
            record: unsafe { std::mem::zeroed() },
            region: ScratchRegion::new(capacity),
            #[cfg(target_os = "aix")]
            state: crate::sys::hostent_data::zeroed(),
        }
    }

    pub fn invalidate(&mut self) {
        // SAFETY: see `new`.
        self.record = unsafe { std::mem::zeroed() };
    }
}

thread_local! {
    static USER_SLOT: RefCell<Option<Box<UserSlot>>> = const { RefCell::new(None) };
    static GROUP_SLOT: RefCell<Option<Box<GroupSlot>>> = const { RefCell::new(None) };
    static HOST_SLOT: RefCell<Option<Box<HostSlot>>> = const { RefCell::new(None) };
}

fn with_slot<T, R>(
    key: &'static LocalKey<RefCell<Option<Box<T>>>>,
    kind: RecordKind,
    init: fn(usize) -> T,
    f: impl FnOnce(&mut T) -> Result<R, LookupError>,
) -> Result<R, LookupError> {
    key.try_with(|cell| {
        let mut guard = cell
            .try_borrow_mut()
            .map_err(|_| LookupError::Reentered(kind))?;
        let slot = guard.get_or_insert_with(|| {
            LookupMetrics::inc(&global_metrics().scratch_inits);
            Box::new(init(config::scratch_capacity()))
        });
        f(slot)
    })
    .map_err(|_| LookupError::ThreadTeardown)?
}

/// Run `f` with this thread's user slot.
pub fn with_user_slot<R>(
    f: impl FnOnce(&mut UserSlot) -> Result<R, LookupError>,
) -> Result<R, LookupError> {
    with_slot(&USER_SLOT, RecordKind::User, UserSlot::new, f)
}

/// Run `f` with this thread's group slot.
pub fn with_group_slot<R>(
    f: impl FnOnce(&mut GroupSlot) -> Result<R, LookupError>,
) -> Result<R, LookupError> {
    with_slot(&GROUP_SLOT, RecordKind::Group, GroupSlot::new, f)
}

/// Run `f` with this thread's host slot.
pub fn with_host_slot<R>(
    f: impl FnOnce(&mut HostSlot) -> Result<R, LookupError>,
) -> Result<R, LookupError> {
    with_slot(&HOST_SLOT, RecordKind::Host, HostSlot::new, f)
}

/// Capacity of this thread's region for `kind`, if it has been created.
#[must_use]
pub fn region_capacity(kind: RecordKind) -> Option<usize> {
    fn peek<T>(
        key: &'static LocalKey<RefCell<Option<Box<T>>>>,
        region: fn(&T) -> &ScratchRegion,
    ) -> Option<usize> {
        key.try_with(|cell| {
            cell.try_borrow()
                .ok()
                .and_then(|slot| slot.as_deref().map(|s| region(s).capacity()))
        })
        .ok()
        .flatten()
    }
    match kind {
        RecordKind::User => peek(&USER_SLOT, |s| &s.region),
        RecordKind::Group => peek(&GROUP_SLOT, |s| &s.region),
        RecordKind::Host => peek(&HOST_SLOT, |s| &s.region),
    }
}
