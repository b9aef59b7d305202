//! Error types for packing and lookups.
//!
//! "Not found" is deliberately absent from both enums: a lookup that finds
//! nothing returns `Ok(None)`.

use thiserror::Error;

use crate::strategy::RecordKind;

/// Failure while flattening a field into a scratch region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PackError {
    /// The field would run past the end of the region.
    #[error("need {required} bytes but only {available} remain in the scratch region")]
    CapacityExceeded { required: usize, available: usize },
    /// A fixed-size element was shorter than the declared element size.
    #[error("array element {index} has {actual} bytes, expected {expected}")]
    ElementSize {
        index: usize,
        expected: usize,
        actual: usize,
    },
}

impl PackError {
    /// Returns true for the out-of-range condition.
    #[must_use]
    pub const fn is_capacity(&self) -> bool {
        matches!(self, Self::CapacityExceeded { .. })
    }
}

/// Failure of a single directory lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The serialized record does not fit in the per-thread scratch region.
    #[error("record does not fit in the {capacity}-byte scratch region")]
    CapacityExceeded { capacity: usize },
    /// The OS handed back a record that cannot be flattened as declared.
    #[error("malformed directory record: {0}")]
    MalformedRecord(&'static str),
    /// The reentrant primitive reported a status other than "not found".
    #[error("directory service failed with errno {0}")]
    Os(i32),
    /// The query itself was unusable (interior NUL, bad address length, ...).
    #[error("invalid lookup argument: {0}")]
    InvalidArgument(&'static str),
    /// A lookup of this kind is already in progress on the calling thread.
    #[error("{0} scratch storage is already borrowed on this thread")]
    Reentered(RecordKind),
    /// Thread-local storage was already torn down.
    #[error("thread-local scratch storage is unavailable during thread teardown")]
    ThreadTeardown,
}

impl LookupError {
    /// Convert a packer failure into a lookup failure for a region of
    /// `capacity` bytes.
    #[must_use]
    pub fn from_pack(err: PackError, capacity: usize) -> Self {
        match err {
            PackError::CapacityExceeded { .. } => Self::CapacityExceeded { capacity },
            PackError::ElementSize { .. } => {
                Self::MalformedRecord("array element shorter than declared length")
            }
        }
    }

    /// Returns true for the out-of-range condition.
    #[must_use]
    pub const fn is_capacity(&self) -> bool {
        matches!(self, Self::CapacityExceeded { .. })
    }
}
