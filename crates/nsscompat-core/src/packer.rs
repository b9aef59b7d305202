//! Flattening routines for strings and null-terminated arrays.
//!
//! Both routines write into a caller-supplied destination slice whose length
//! is the remaining capacity. Arrays use the flattened encoding:
//!
//! ```text
//! dest: [slot 0][slot 1] ... [slot N = 0][payload 0][payload 1] ... [payload N-1]
//!         |        |                      ^          ^
//!         +--------|----------------------+          |
//!                  +---------------------------------+
//! ```
//!
//! Each slot is a native-endian pointer-sized word holding the absolute
//! address of its payload. The caller supplies the address of `dest[0]`
//! (`dest_addr`) so this crate never forms a pointer itself.
//!
//! Failures never roll back bytes already written; the caller must treat the
//! whole record as invalid.

use crate::error::PackError;

/// Size of one pointer-table slot.
pub const POINTER_SIZE: usize = std::mem::size_of::<usize>();

/// Alignment the pointer table must start on.
pub const POINTER_ALIGN: usize = std::mem::align_of::<usize>();

/// How array elements are measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementSize {
    /// Elements are NUL-terminated strings of varying length.
    Variable,
    /// Elements are opaque blobs of exactly this many bytes.
    Fixed(usize),
}

impl ElementSize {
    /// Map the classic "negative means string" element-size convention.
    #[must_use]
    pub fn from_raw(elsize: isize) -> Self {
        if elsize < 0 {
            Self::Variable
        } else {
            Self::Fixed(elsize.unsigned_abs())
        }
    }
}

/// Length of `bytes` up to (not including) the first NUL.
#[inline]
fn c_len(bytes: &[u8]) -> usize {
    bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len())
}

/// Copy `source` plus a NUL terminator to the front of `dest`.
///
/// Returns the number of bytes written (`strlen + 1`), or 0 when `source` is
/// absent. `source` is read up to its first NUL, if any. Nothing is written
/// when the string does not fit.
pub fn pack_string(source: Option<&[u8]>, dest: &mut [u8]) -> Result<usize, PackError> {
    let Some(source) = source else {
        return Ok(0);
    };
    let len = c_len(source);
    let required = len + 1;
    if required > dest.len() {
        return Err(PackError::CapacityExceeded {
            required,
            available: dest.len(),
        });
    }
    dest[..len].copy_from_slice(&source[..len]);
    dest[len] = 0;
    Ok(required)
}

/// Flatten a null-terminated array into `dest`.
///
/// `source` holds the non-null entries in order (the terminator is implied).
/// `dest_addr` is the address of `dest[0]`; it is used to compute the values
/// stored in the pointer table. Returns the bytes consumed by header plus
/// payloads, or 0 when `source` is absent.
pub fn pack_array<E: AsRef<[u8]>>(
    source: Option<&[E]>,
    element: ElementSize,
    dest: &mut [u8],
    dest_addr: usize,
) -> Result<usize, PackError> {
    let Some(items) = source else {
        return Ok(0);
    };
    let capacity = dest.len();
    let header = items
        .len()
        .checked_add(1)
        .and_then(|slots| slots.checked_mul(POINTER_SIZE))
        .unwrap_or(usize::MAX);
    if header > capacity {
        return Err(PackError::CapacityExceeded {
            required: header,
            available: capacity,
        });
    }

    let mut len = header;
    for (index, item) in items.iter().enumerate() {
        let bytes = item.as_ref();
        let (payload, extent) = match element {
            ElementSize::Variable => {
                let n = c_len(bytes);
                (&bytes[..n], n + 1)
            }
            ElementSize::Fixed(size) => {
                if bytes.len() < size {
                    return Err(PackError::ElementSize {
                        index,
                        expected: size,
                        actual: bytes.len(),
                    });
                }
                (&bytes[..size], size)
            }
        };

        let start = len;
        len = len.saturating_add(extent);
        if len > capacity {
            return Err(PackError::CapacityExceeded {
                required: len,
                available: capacity,
            });
        }
        dest[start..start + payload.len()].copy_from_slice(payload);
        if element == ElementSize::Variable {
            dest[start + payload.len()] = 0;
        }
        write_slot(dest, index, dest_addr.wrapping_add(start));
    }
    write_slot(dest, items.len(), 0);

    Ok(len)
}

fn write_slot(dest: &mut [u8], index: usize, value: usize) {
    let at = index * POINTER_SIZE;
    dest[at..at + POINTER_SIZE].copy_from_slice(&value.to_ne_bytes());
}

/// Read pointer-table slot `index` from a flattened array starting at `src[0]`.
///
/// Returns `None` if the slot lies outside `src`.
#[must_use]
pub fn read_slot(src: &[u8], index: usize) -> Option<usize> {
    let at = index.checked_mul(POINTER_SIZE)?;
    let word = src.get(at..at.checked_add(POINTER_SIZE)?)?;
    let mut raw = [0u8; POINTER_SIZE];
    raw.copy_from_slice(word);
    Some(usize::from_ne_bytes(raw))
}
