use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::storage::grown_capacity;
use crate::{Result, Storage, StorageKind};

/// A growable contiguous byte buffer that can use caller-supplied storage before
/// moving to the heap.
///
/// The buffer keeps a logical length ([`len()`](Self::len)) and a capacity
/// ([`capacity()`](Self::capacity)). Appending beyond the capacity grows the buffer: an empty
/// buffer grows to exactly the requested size, anything else doubles its capacity until the
/// new content fits.
///
/// A buffer created with [`borrowed()`](Self::borrowed) writes into the caller's storage until
/// it has to grow, at which point it copies its content to a heap allocation and becomes
/// [`StorageKind::Owned`] for good. The caller storage is never written to after that point.
///
/// # Contract violations
///
/// Out-of-bounds offsets and empty appends are programming errors and panic. Only
/// conditions that depend on the environment (capacity overflow, allocation failure) are
/// reported as [`Error`][crate::Error].
///
/// # Examples
///
/// ```
/// use grow_buffer::GrowBuffer;
///
/// let mut buf = GrowBuffer::new();
/// let offset = buf.append_bytes(b"hello").unwrap();
/// assert_eq!(offset, 0);
///
/// let offset = buf.append_bytes(b" world").unwrap();
/// assert_eq!(offset, 5);
///
/// assert_eq!(buf.as_slice(), b"hello world");
/// ```
pub struct GrowBuffer<'a> {
    storage: Storage<'a>,

    /// Number of bytes in use. Never exceeds the storage capacity.
    len: usize,
}

impl<'a> GrowBuffer<'a> {
    /// Creates an empty owned buffer that has not allocated any memory yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            storage: Storage::empty(),
            len: 0,
        }
    }

    /// Creates an empty owned buffer with exactly `capacity` bytes of heap storage.
    ///
    /// A capacity of zero allocates nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the allocation fails or `capacity` exceeds `isize::MAX`.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if isize::try_from(capacity).is_err() {
            return Err(crate::Error::CapacityOverflow {
                len: 0,
                additional: capacity,
            });
        }

        Ok(Self {
            storage: Storage::with_capacity(capacity)?,
            len: 0,
        })
    }

    /// Creates an empty buffer that writes into `storage` until it needs more room.
    ///
    /// The previous content of `storage` is ignored. Once the buffer outgrows `storage`, it
    /// moves to the heap and leaves `storage` with whatever the buffer wrote into it up to
    /// that point.
    ///
    /// # Examples
    ///
    /// ```
    /// use grow_buffer::{GrowBuffer, StorageKind};
    ///
    /// let mut local = [0_u8; 8];
    /// let mut buf = GrowBuffer::borrowed(&mut local);
    ///
    /// buf.append_bytes(b"12345678").unwrap();
    /// assert_eq!(buf.storage_kind(), StorageKind::Borrowed);
    ///
    /// buf.append_bytes(b"9").unwrap();
    /// assert_eq!(buf.storage_kind(), StorageKind::Owned);
    /// ```
    #[must_use]
    pub fn borrowed(storage: &'a mut [u8]) -> Self {
        Self {
            storage: Storage::Borrowed(storage),
            len: 0,
        }
    }

    /// Creates a buffer by hollowing out `other`, which is left empty and owned.
    ///
    /// If `other` owns its storage, the heap allocation is transferred without copying.
    /// If `other` is borrowed, the new buffer cannot take over storage it does not own, so
    /// the content is copied into an exactly-sized heap allocation.
    ///
    /// # Examples
    ///
    /// ```
    /// use grow_buffer::{GrowBuffer, StorageKind};
    ///
    /// let mut local = [0_u8; 8];
    /// let mut source = GrowBuffer::borrowed(&mut local);
    /// source.append_bytes(b"abc").unwrap();
    ///
    /// let moved = GrowBuffer::move_from(&mut source);
    ///
    /// assert_eq!(moved.as_slice(), b"abc");
    /// assert_eq!(moved.storage_kind(), StorageKind::Owned);
    /// assert!(source.is_empty());
    /// ```
    #[must_use]
    pub fn move_from(other: &mut GrowBuffer<'_>) -> Self {
        let len = other.len;
        let bytes = other.storage.take_owned(len);
        other.len = 0;

        Self {
            storage: Storage::Owned(bytes),
            len,
        }
    }

    /// Number of bytes in use.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no bytes.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of bytes the buffer can hold before it has to grow.
    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Where the buffer currently keeps its bytes.
    #[must_use]
    #[inline]
    pub fn storage_kind(&self) -> StorageKind {
        self.storage.kind()
    }

    /// Whether the buffer still writes into caller-supplied storage.
    #[must_use]
    #[inline]
    pub fn is_borrowed(&self) -> bool {
        self.storage_kind() == StorageKind::Borrowed
    }

    /// The bytes in use.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        self.storage
            .bytes()
            .get(..self.len)
            .expect("logical length never exceeds storage capacity")
    }

    /// The bytes in use, mutably.
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        let len = self.len;

        self.storage
            .bytes_mut()
            .get_mut(..len)
            .expect("logical length never exceeds storage capacity")
    }

    /// The bytes from `offset` to the end of the content.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is not less than [`len()`](Self::len).
    #[must_use]
    pub fn offset(&self, offset: usize) -> &[u8] {
        self.assert_valid_offset(offset);

        self.as_slice()
            .get(offset..)
            .expect("guarded by offset assertion above")
    }

    /// The bytes from `offset` to the end of the content, mutably.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is not less than [`len()`](Self::len).
    #[must_use]
    pub fn offset_mut(&mut self, offset: usize) -> &mut [u8] {
        self.assert_valid_offset(offset);

        self.as_mut_slice()
            .get_mut(offset..)
            .expect("guarded by offset assertion above")
    }

    /// Forgets the content without releasing capacity. Borrowed buffers stay borrowed.
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Ensures that at least `additional` more bytes fit without further growth.
    ///
    /// Existing content is always preserved. A borrowed buffer that has to grow moves its
    /// content to the heap and becomes owned; the caller storage is not modified.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityOverflow`][crate::Error::CapacityOverflow] if the new capacity
    /// cannot be represented and [`Error::OutOfMemory`][crate::Error::OutOfMemory] if the
    /// allocation fails. The buffer is unchanged in both cases.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        let capacity = self.capacity();

        // Cannot overflow: len never exceeds capacity.
        if additional <= capacity.wrapping_sub(self.len) {
            return Ok(());
        }

        let new_capacity = grown_capacity(capacity, self.len, additional)?;
        self.storage.grow(self.len, new_capacity)
    }

    /// Appends `data` and returns the offset at which it was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer has to grow and growth fails.
    ///
    /// # Panics
    ///
    /// Panics if `data` is empty.
    pub fn append_bytes(&mut self, data: &[u8]) -> Result<usize> {
        assert!(!data.is_empty(), "cannot append an empty byte sequence");

        self.reserve(data.len())?;

        let offset = self.len;
        self.spare_capacity_mut()
            .get_mut(..data.len())
            .expect("guarded by reserve() above")
            .copy_from_slice(data);
        self.advance(data.len());

        Ok(offset)
    }

    /// Appends `count` zero bytes and returns the offset at which they were written.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer has to grow and growth fails.
    ///
    /// # Panics
    ///
    /// Panics if `count` is zero.
    pub fn append_zeros(&mut self, count: usize) -> Result<usize> {
        assert!(count > 0, "cannot append zero zero-bytes");

        self.reserve(count)?;

        let offset = self.len;
        self.spare_capacity_mut()
            .get_mut(..count)
            .expect("guarded by reserve() above")
            .fill(0);
        self.advance(count);

        Ok(offset)
    }

    /// Inserts `data` at `offset`, shifting the bytes after it towards the end.
    ///
    /// Inserting at `offset == len()` is the same as appending. Inserting nothing is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer has to grow and growth fails.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is greater than [`len()`](Self::len).
    ///
    /// # Examples
    ///
    /// ```
    /// use grow_buffer::GrowBuffer;
    ///
    /// let mut buf = GrowBuffer::new();
    /// buf.append_bytes(b"held").unwrap();
    /// buf.insert(2, b"llo wor").unwrap();
    /// assert_eq!(buf.as_slice(), b"hello world");
    /// ```
    pub fn insert(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        assert!(
            offset <= self.len,
            "insert offset {offset} is out of bounds for buffer of length {}",
            self.len
        );

        if data.is_empty() {
            return Ok(());
        }

        self.reserve(data.len())?;

        let len = self.len;
        // Cannot overflow: reserve() guarantees len + data.len() fits into the capacity.
        let gap_end = offset.wrapping_add(data.len());

        let bytes = self.storage.bytes_mut();
        bytes.copy_within(offset..len, gap_end);
        bytes
            .get_mut(offset..gap_end)
            .expect("guarded by reserve() above")
            .copy_from_slice(data);

        self.len = len.wrapping_add(data.len());

        Ok(())
    }

    /// Removes up to `count` bytes starting at `offset`.
    ///
    /// If the range reaches or passes the end of the content, the content is truncated at
    /// `offset`. Otherwise the bytes after the range move towards the front.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is not less than [`len()`](Self::len). This includes any removal
    /// from an empty buffer.
    ///
    /// # Examples
    ///
    /// ```
    /// use grow_buffer::GrowBuffer;
    ///
    /// let mut buf = GrowBuffer::new();
    /// buf.append_bytes(b"hello world").unwrap();
    ///
    /// buf.remove(4, 6);
    /// assert_eq!(buf.as_slice(), b"helld");
    ///
    /// buf.remove(2, 100);
    /// assert_eq!(buf.as_slice(), b"he");
    /// ```
    pub fn remove(&mut self, offset: usize, count: usize) {
        self.assert_valid_offset(offset);

        let len = self.len;
        let end = offset.saturating_add(count);

        if end >= len {
            self.len = offset;
            return;
        }

        self.storage.bytes_mut().copy_within(end..len, offset);

        // Cannot underflow: end < len so count < len - offset.
        self.len = len.wrapping_sub(count);
    }

    /// Takes the content out of the buffer, leaving it empty, owned and without capacity.
    ///
    /// An owned buffer hands over its heap allocation without copying. A borrowed buffer
    /// copies its content into a new allocation of exactly [`len()`](Self::len) bytes and
    /// leaves the caller storage untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use grow_buffer::GrowBuffer;
    ///
    /// let mut buf = GrowBuffer::new();
    /// buf.append_bytes(b"payload").unwrap();
    ///
    /// let bytes = buf.detach();
    /// assert_eq!(bytes, b"payload");
    /// assert!(buf.is_empty());
    /// assert_eq!(buf.capacity(), 0);
    /// ```
    #[must_use]
    pub fn detach(&mut self) -> Vec<u8> {
        let len = self.len;
        self.len = 0;

        if len == 0 {
            // Release whatever we had; there is nothing to hand over.
            self.storage = Storage::empty();
            return Vec::new();
        }

        let mut bytes = self.storage.take_owned(len);
        bytes.truncate(len);
        bytes
    }

    /// The writable bytes between the end of the content and the end of the capacity.
    ///
    /// Together with [`advance()`](Self::advance), this lets producers such as readers write
    /// directly into the buffer without an intermediate copy. Call [`reserve()`](Self::reserve)
    /// first to make room. The bytes are always initialized (newly grown heap storage is
    /// zero-filled) but their values are otherwise unspecified.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::Read;
    ///
    /// use grow_buffer::GrowBuffer;
    ///
    /// let mut source: &[u8] = b"streamed";
    /// let mut buf = GrowBuffer::new();
    ///
    /// buf.reserve(source.len()).unwrap();
    /// let read = source.read(buf.spare_capacity_mut()).unwrap();
    /// buf.advance(read);
    ///
    /// assert_eq!(buf.as_slice(), b"streamed");
    /// ```
    #[must_use]
    pub fn spare_capacity_mut(&mut self) -> &mut [u8] {
        let len = self.len;

        self.storage
            .bytes_mut()
            .get_mut(len..)
            .expect("logical length never exceeds storage capacity")
    }

    /// Marks `count` bytes after the current content as in use.
    ///
    /// This is the counterpart of [`spare_capacity_mut()`](Self::spare_capacity_mut). The buffer
    /// does not know what was written; whatever is in the spare capacity becomes content.
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds the spare capacity.
    pub fn advance(&mut self, count: usize) {
        // Cannot underflow: len never exceeds capacity.
        let spare = self.capacity().wrapping_sub(self.len);

        assert!(
            count <= spare,
            "cannot advance by {count} bytes with only {spare} bytes of spare capacity"
        );

        self.len = self.len.wrapping_add(count);
    }

    fn assert_valid_offset(&self, offset: usize) {
        assert!(
            offset < self.len,
            "offset {offset} is out of bounds for buffer of length {}",
            self.len
        );
    }

    pub(crate) fn storage_mut(&mut self) -> &mut Storage<'a> {
        &mut self.storage
    }

    pub(crate) fn set_len(&mut self, len: usize) {
        debug_assert!(len <= self.capacity());
        self.len = len;
    }
}

impl Default for GrowBuffer<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for GrowBuffer<'_> {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl DerefMut for GrowBuffer<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl AsRef<[u8]> for GrowBuffer<'_> {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsMut<[u8]> for GrowBuffer<'_> {
    #[inline]
    fn as_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

impl fmt::Debug for GrowBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrowBuffer")
            .field("kind", &self.storage_kind())
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}
