use std::fmt;

use nm::Event;

use crate::metrics::{DETACH_COPIES, GROWTH_BYTES, PROMOTIONS};
use crate::{Error, Result};

/// Identifies where a [`GrowBuffer`][crate::GrowBuffer] currently keeps its bytes.
///
/// # Examples
///
/// ```
/// use grow_buffer::{GrowBuffer, StorageKind};
///
/// let mut local = [0_u8; 4];
/// let buf = GrowBuffer::borrowed(&mut local);
/// assert_eq!(buf.storage_kind(), StorageKind::Borrowed);
///
/// let buf = GrowBuffer::new();
/// assert_eq!(buf.storage_kind(), StorageKind::Owned);
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum StorageKind {
    /// The buffer owns a heap allocation and releases it when dropped.
    Owned,

    /// The buffer writes into storage supplied by the caller and never releases it.
    Borrowed,
}

/// The bytes behind a buffer.
///
/// Both variants expose their full capacity as an initialized byte slice. For the owned
/// variant, the `Vec` length always equals the capacity and any bytes past the logical
/// length of the buffer are zero-filled when the storage grows.
pub(crate) enum Storage<'a> {
    Owned(Vec<u8>),

    Borrowed(&'a mut [u8]),
}

impl Storage<'_> {
    #[must_use]
    pub(crate) const fn empty() -> Self {
        Self::Owned(Vec::new())
    }

    /// Allocates zero-filled owned storage of exactly `capacity` bytes.
    pub(crate) fn with_capacity(capacity: usize) -> Result<Self> {
        let mut bytes = Vec::new();
        try_reserve(&mut bytes, capacity)?;
        bytes.resize(capacity, 0);
        Ok(Self::Owned(bytes))
    }

    #[must_use]
    pub(crate) fn kind(&self) -> StorageKind {
        match self {
            Self::Owned(_) => StorageKind::Owned,
            Self::Borrowed(_) => StorageKind::Borrowed,
        }
    }

    #[must_use]
    pub(crate) fn capacity(&self) -> usize {
        match self {
            Self::Owned(bytes) => bytes.len(),
            Self::Borrowed(bytes) => bytes.len(),
        }
    }

    /// The full capacity of the storage, including bytes past the logical length.
    #[must_use]
    pub(crate) fn bytes(&self) -> &[u8] {
        match self {
            Self::Owned(bytes) => bytes,
            Self::Borrowed(bytes) => bytes,
        }
    }

    #[must_use]
    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        match self {
            Self::Owned(bytes) => bytes,
            Self::Borrowed(bytes) => bytes,
        }
    }

    /// Grows the storage to `new_capacity`, preserving the first `len` bytes.
    ///
    /// Borrowed storage is replaced by a fresh heap allocation; the caller storage
    /// itself is left as it was.
    pub(crate) fn grow(&mut self, len: usize, new_capacity: usize) -> Result<()> {
        debug_assert!(new_capacity >= self.capacity());
        debug_assert!(len <= self.capacity());

        match self {
            Self::Owned(bytes) => {
                let additional = new_capacity
                    .checked_sub(bytes.len())
                    .expect("storage never shrinks when growing");
                try_reserve(bytes, additional)?;
                bytes.resize(new_capacity, 0);
            }
            Self::Borrowed(borrowed) => {
                let mut bytes = Vec::new();
                try_reserve(&mut bytes, new_capacity)?;
                bytes.extend_from_slice(
                    borrowed
                        .get(..len)
                        .expect("logical length never exceeds storage capacity"),
                );
                bytes.resize(new_capacity, 0);

                *self = Self::Owned(bytes);
                PROMOTIONS.with(Event::observe_once);
            }
        }

        GROWTH_BYTES.with(|e| e.observe(new_capacity));
        Ok(())
    }

    /// Takes the storage out as a heap allocation, leaving empty owned storage behind.
    ///
    /// Owned storage is handed over as-is (capacity included). Borrowed storage cannot be
    /// handed over, so its first `len` bytes are copied into an exactly-sized allocation.
    #[must_use]
    pub(crate) fn take_owned(&mut self, len: usize) -> Vec<u8> {
        match std::mem::replace(self, Self::empty()) {
            Self::Owned(bytes) => bytes,
            Self::Borrowed(borrowed) => {
                let content = borrowed
                    .get(..len)
                    .expect("logical length never exceeds storage capacity");

                if !content.is_empty() {
                    DETACH_COPIES.with(|e| e.observe(content.len()));
                }

                content.to_vec()
            }
        }
    }
}

impl fmt::Debug for Storage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("kind", &self.kind())
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// Computes the capacity to grow to so that `additional` more bytes fit after `len`.
///
/// An empty storage grows to exactly `additional` bytes; anything else doubles until
/// the content fits.
pub(crate) fn grown_capacity(capacity: usize, len: usize, additional: usize) -> Result<usize> {
    let overflow = || Error::CapacityOverflow { len, additional };

    let required = len.checked_add(additional).ok_or_else(overflow)?;

    let mut new_capacity = if capacity == 0 {
        additional
    } else {
        capacity.checked_mul(2).ok_or_else(overflow)?
    };

    while new_capacity < required {
        new_capacity = new_capacity.checked_mul(2).ok_or_else(overflow)?;
    }

    // Allocations larger than isize::MAX bytes are never valid.
    if isize::try_from(new_capacity).is_err() {
        return Err(overflow());
    }

    Ok(new_capacity)
}

fn try_reserve(bytes: &mut Vec<u8>, additional: usize) -> Result<()> {
    bytes
        .try_reserve_exact(additional)
        .map_err(|source| Error::OutOfMemory {
            capacity: bytes.len().saturating_add(additional),
            source,
        })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn empty_capacity_grows_to_exact_request() {
        assert_eq!(grown_capacity(0, 0, 5).unwrap(), 5);
        assert_eq!(grown_capacity(0, 0, 1).unwrap(), 1);
    }

    #[test]
    fn non_empty_capacity_doubles() {
        assert_eq!(grown_capacity(8, 8, 1).unwrap(), 16);
        assert_eq!(grown_capacity(4, 3, 2).unwrap(), 8);
        assert_eq!(grown_capacity(5, 5, 1).unwrap(), 10);
    }

    #[test]
    fn doubles_repeatedly_until_content_fits() {
        assert_eq!(grown_capacity(4, 4, 100).unwrap(), 128);
        assert_eq!(grown_capacity(3, 0, 12).unwrap(), 12);
        assert_eq!(grown_capacity(3, 1, 12).unwrap(), 24);
    }

    #[test]
    fn overflow_in_required_size_is_error() {
        let result = grown_capacity(16, 16, usize::MAX);
        assert!(matches!(
            result,
            Err(Error::CapacityOverflow {
                len: 16,
                additional: usize::MAX
            })
        ));
    }

    #[test]
    fn overflow_in_doubling_is_error() {
        let huge = usize::MAX / 2 + 1;
        assert!(matches!(
            grown_capacity(huge, huge, 1),
            Err(Error::CapacityOverflow { .. })
        ));
    }

    #[test]
    fn capacity_beyond_isize_is_error() {
        let huge = usize::MAX / 4 + 1;
        assert!(matches!(
            grown_capacity(huge, huge, 1),
            Err(Error::CapacityOverflow { .. })
        ));
    }

    #[test]
    fn owned_growth_preserves_content_and_zero_fills() {
        let mut storage = Storage::with_capacity(2).unwrap();
        storage.bytes_mut().copy_from_slice(b"ab");

        storage.grow(2, 6).unwrap();

        assert_eq!(storage.kind(), StorageKind::Owned);
        assert_eq!(storage.bytes(), b"ab\0\0\0\0");
    }

    #[test]
    fn borrowed_growth_promotes_and_leaves_caller_storage_alone() {
        let mut local = *b"xyz-";

        {
            let mut storage = Storage::Borrowed(&mut local);
            storage.grow(3, 8).unwrap();

            assert_eq!(storage.kind(), StorageKind::Owned);
            assert_eq!(storage.capacity(), 8);
            assert_eq!(storage.bytes(), b"xyz\0\0\0\0\0");

            storage.bytes_mut().fill(b'!');
        }

        assert_eq!(&local, b"xyz-");
    }

    #[test]
    fn take_owned_hands_over_heap_storage() {
        let mut storage = Storage::with_capacity(4).unwrap();
        let original_ptr = storage.bytes().as_ptr();

        let taken = storage.take_owned(0);

        assert_eq!(taken.as_ptr(), original_ptr);
        assert_eq!(taken.len(), 4);
        assert_eq!(storage.capacity(), 0);
        assert_eq!(storage.kind(), StorageKind::Owned);
    }

    #[test]
    fn take_owned_copies_borrowed_content_exactly() {
        let mut local = *b"hello";
        let mut storage = Storage::Borrowed(&mut local);

        let taken = storage.take_owned(3);

        assert_eq!(taken, b"hel");
        assert_eq!(storage.capacity(), 0);
        assert_eq!(storage.kind(), StorageKind::Owned);
    }

    #[test]
    fn debug_output_reports_kind() {
        let storage = Storage::empty();
        let output = format!("{storage:?}");
        assert!(output.contains("Owned"));
    }
}
