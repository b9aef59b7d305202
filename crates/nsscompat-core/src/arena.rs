//! Bump arena over a fixed-size scratch region.
//!
//! A record copy places several fields one after another into the same
//! region. [`ScratchArena`] threads the write cursor and the remaining
//! capacity through those placements and hands back offsets; the caller
//! patches the record's fields with `base + offset`.
//!
//! [`FlatView`] is the read side: it walks strings and flattened arrays
//! inside a region, validating that every stored address stays within it.

use crate::error::PackError;
use crate::packer::{self, ElementSize, POINTER_ALIGN, POINTER_SIZE};

/// Write cursor over a scratch region that lives at `base_addr`.
#[derive(Debug)]
pub struct ScratchArena<'a> {
    region: &'a mut [u8],
    base_addr: usize,
    cursor: usize,
}

impl<'a> ScratchArena<'a> {
    /// Wrap `region`, whose first byte lives at address `base_addr`.
    #[must_use]
    pub fn new(region: &'a mut [u8], base_addr: usize) -> Self {
        Self {
            region,
            base_addr,
            cursor: 0,
        }
    }

    /// Total size of the region.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.region.len()
    }

    /// Bytes consumed so far, including alignment padding.
    #[must_use]
    pub fn used(&self) -> usize {
        self.cursor
    }

    /// Bytes still available.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.region.len() - self.cursor
    }

    /// Address of the region's first byte.
    #[must_use]
    pub fn base_addr(&self) -> usize {
        self.base_addr
    }

    /// Absolute address of `offset` inside the region.
    #[must_use]
    pub fn address_of(&self, offset: usize) -> usize {
        self.base_addr.wrapping_add(offset)
    }

    /// Pad the cursor so the next placement starts on an `align` boundary.
    pub fn align_to(&mut self, align: usize) -> Result<(), PackError> {
        debug_assert!(align.is_power_of_two());
        let addr = self.base_addr.wrapping_add(self.cursor);
        let padding = addr.wrapping_neg() & (align - 1);
        if padding > self.remaining() {
            return Err(PackError::CapacityExceeded {
                required: padding,
                available: self.remaining(),
            });
        }
        self.cursor += padding;
        Ok(())
    }

    /// Reserve `size` bytes on an `align` boundary and return their offset.
    pub fn allocate(&mut self, size: usize, align: usize) -> Result<usize, PackError> {
        self.align_to(align)?;
        if size > self.remaining() {
            return Err(PackError::CapacityExceeded {
                required: size,
                available: self.remaining(),
            });
        }
        let offset = self.cursor;
        self.cursor += size;
        Ok(offset)
    }

    /// Place a NUL-terminated copy of `src`.
    ///
    /// Returns the offset of the copy, or `None` when `src` is absent.
    pub fn place_string(&mut self, src: Option<&[u8]>) -> Result<Option<usize>, PackError> {
        let Some(src) = src else {
            return Ok(None);
        };
        let len = src.iter().position(|&b| b == 0).unwrap_or(src.len()) + 1;
        let offset = self.allocate(len, 1)?;
        packer::pack_string(Some(src), &mut self.region[offset..offset + len])?;
        Ok(Some(offset))
    }

    /// Place a flattened array (pointer table followed by payloads).
    ///
    /// The table is aligned for pointer reads. Returns the offset of the
    /// table, or `None` when `src` is absent.
    pub fn place_array<E: AsRef<[u8]>>(
        &mut self,
        src: Option<&[E]>,
        element: ElementSize,
    ) -> Result<Option<usize>, PackError> {
        if src.is_none() {
            return Ok(None);
        }
        self.align_to(POINTER_ALIGN)?;
        let offset = self.cursor;
        let dest_addr = self.address_of(offset);
        let copied = packer::pack_array(src, element, &mut self.region[offset..], dest_addr)?;
        self.cursor += copied;
        Ok((copied > 0).then_some(offset))
    }
}

/// Read-only view over a filled scratch region.
#[derive(Debug, Clone, Copy)]
pub struct FlatView<'a> {
    bytes: &'a [u8],
    base_addr: usize,
}

impl<'a> FlatView<'a> {
    /// View `bytes`, whose first byte lives at `base_addr`.
    #[must_use]
    pub fn new(bytes: &'a [u8], base_addr: usize) -> Self {
        Self { bytes, base_addr }
    }

    /// Whether `addr` falls strictly inside the region.
    #[must_use]
    pub fn contains_addr(&self, addr: usize) -> bool {
        addr >= self.base_addr && addr - self.base_addr < self.bytes.len()
    }

    fn offset_of(&self, addr: usize) -> Option<usize> {
        self.contains_addr(addr).then(|| addr - self.base_addr)
    }

    /// The NUL-terminated string at `offset`, without its terminator.
    #[must_use]
    pub fn string_at(&self, offset: usize) -> Option<&'a [u8]> {
        let tail = self.bytes.get(offset..)?;
        let len = tail.iter().position(|&b| b == 0)?;
        Some(&tail[..len])
    }

    /// The NUL-terminated string at absolute address `addr`.
    #[must_use]
    pub fn string_at_addr(&self, addr: usize) -> Option<&'a [u8]> {
        self.string_at(self.offset_of(addr)?)
    }

    /// Elements of the flattened array whose table starts at `offset`.
    ///
    /// Returns `None` if any slot or payload escapes the region.
    #[must_use]
    pub fn array_at(&self, offset: usize, element: ElementSize) -> Option<Vec<&'a [u8]>> {
        let table = self.bytes.get(offset..)?;
        let mut out = Vec::new();
        for index in 0..table.len() / POINTER_SIZE {
            let addr = packer::read_slot(table, index)?;
            if addr == 0 {
                return Some(out);
            }
            let start = self.offset_of(addr)?;
            let item = match element {
                ElementSize::Variable => self.string_at(start)?,
                ElementSize::Fixed(size) => self.bytes.get(start..start.checked_add(size)?)?,
            };
            out.push(item);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: usize = 0x7f00_0000_0000;

    #[test]
    fn strings_are_placed_back_to_back() {
        let mut region = [0u8; 32];
        let mut arena = ScratchArena::new(&mut region, BASE);
        assert_eq!(arena.place_string(Some(b"root")).unwrap(), Some(0));
        assert_eq!(arena.place_string(Some(b"x")).unwrap(), Some(5));
        assert_eq!(arena.used(), 7);
        assert_eq!(arena.remaining(), 25);
        assert_eq!(&region[..7], b"root\0x\0");
    }

    #[test]
    fn absent_string_yields_none_and_keeps_cursor() {
        let mut region = [0u8; 8];
        let mut arena = ScratchArena::new(&mut region, BASE);
        assert_eq!(arena.place_string(None).unwrap(), None);
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn array_table_is_pointer_aligned_after_strings() {
        let mut region = [0u8; 64];
        let mut arena = ScratchArena::new(&mut region, BASE);
        arena.place_string(Some(b"wheel")).unwrap();
        let members: [&[u8]; 1] = [b"root"];
        let offset = arena
            .place_array(Some(&members[..]), ElementSize::Variable)
            .unwrap()
            .unwrap();
        assert_eq!((BASE + offset) % POINTER_ALIGN, 0);
        assert_eq!(offset, 8);
        assert_eq!(arena.used(), 8 + 2 * POINTER_SIZE + 5);
    }

    #[test]
    fn absent_array_skips_alignment() {
        let mut region = [0u8; 16];
        let mut arena = ScratchArena::new(&mut region, BASE);
        arena.place_string(Some(b"a")).unwrap();
        assert_eq!(
            arena.place_array::<&[u8]>(None, ElementSize::Variable).unwrap(),
            None
        );
        assert_eq!(arena.used(), 2);
    }

    #[test]
    fn allocate_respects_alignment_and_capacity() {
        let mut region = [0u8; 16];
        let mut arena = ScratchArena::new(&mut region, BASE + 1);
        assert_eq!(arena.allocate(3, 1).unwrap(), 0);
        assert_eq!(arena.allocate(4, 4).unwrap(), 3);
        assert!(arena.allocate(16, 1).unwrap_err().is_capacity());
        assert_eq!(arena.used(), 7);
    }

    #[test]
    fn string_that_does_not_fit_leaves_cursor_alone() {
        let mut region = [0u8; 8];
        let mut arena = ScratchArena::new(&mut region, BASE);
        assert_eq!(arena.place_string(Some(b"abc")).unwrap(), Some(0));
        let err = arena.place_string(Some(b"toolong")).unwrap_err();
        assert_eq!(
            err,
            PackError::CapacityExceeded {
                required: 8,
                available: 4,
            }
        );
        assert_eq!(arena.used(), 4);
        assert_eq!(arena.place_string(Some(b"xyz\0tail")).unwrap(), Some(4));
        assert_eq!(arena.remaining(), 0);
    }

    #[test]
    fn padding_past_end_is_capacity_error() {
        let mut region = [0u8; 4];
        let mut arena = ScratchArena::new(&mut region, BASE);
        arena.place_string(Some(b"ab")).unwrap();
        let members: [&[u8]; 0] = [];
        let err = arena
            .place_array(Some(&members[..]), ElementSize::Variable)
            .unwrap_err();
        assert!(err.is_capacity());
    }

    #[test]
    fn view_reads_back_placed_array() {
        let mut region = [0u8; 128];
        let (names, addrs) = {
            let mut arena = ScratchArena::new(&mut region, BASE);
            let aliases: [&[u8]; 2] = [b"localhost.localdomain", b"lo"];
            let a = arena
                .place_array(Some(&aliases[..]), ElementSize::Variable)
                .unwrap()
                .unwrap();
            let list = [[127u8, 0, 0, 1], [127, 0, 1, 1]];
            let b = arena
                .place_array(Some(&list[..]), ElementSize::Fixed(4))
                .unwrap()
                .unwrap();
            (a, b)
        };
        let view = FlatView::new(&region, BASE);
        assert_eq!(
            view.array_at(names, ElementSize::Variable).unwrap(),
            vec![&b"localhost.localdomain"[..], &b"lo"[..]]
        );
        assert_eq!(
            view.array_at(addrs, ElementSize::Fixed(4)).unwrap(),
            vec![&[127u8, 0, 0, 1][..], &[127, 0, 1, 1][..]]
        );
    }

    #[test]
    fn view_rejects_addresses_outside_region() {
        let mut region = [0u8; 32];
        region[..POINTER_SIZE].copy_from_slice(&(BASE + 4096).to_ne_bytes());
        let view = FlatView::new(&region, BASE);
        assert!(view.array_at(0, ElementSize::Variable).is_none());
        assert!(!view.contains_addr(BASE + 32));
        assert!(view.contains_addr(BASE + 31));
        assert!(view.string_at_addr(BASE - 1).is_none());
    }
}
