use std::fmt;
use std::mem::ManuallyDrop;
use std::ptr::{self, NonNull};
use std::slice;

/// Contiguous memory that a [`NodePool`][crate::NodePool] carves its slots out of.
///
/// The pool takes the region apart into a [`RawRegion`] when it is built and puts it back
/// together when it is finished with it. What happens to the memory after that is up to the
/// region type: a borrowed slice is simply handed back, a boxed slice is freed when dropped.
///
/// # Safety
///
/// Implementations must guarantee that the [`RawRegion`] returned by
/// [`into_raw()`](Self::into_raw) describes memory that is valid for reads and writes of
/// [`len()`](RawRegion::len) bytes and is not accessed through any other path until the
/// same raw region is passed to [`from_raw()`](Self::from_raw).
pub unsafe trait Region: Sized {
    /// Takes the region apart, transferring exclusive access to its memory to the caller.
    fn into_raw(self) -> RawRegion;

    /// Puts a region back together from its raw parts.
    ///
    /// # Safety
    ///
    /// `raw` must have been returned by [`into_raw()`](Self::into_raw) on the same type and
    /// must not have been passed to `from_raw()` before.
    unsafe fn from_raw(raw: RawRegion) -> Self;
}

/// A region described by a raw pointer and a length, with an optional function that
/// releases the memory once the region is dropped.
///
/// This is the form in which a [`NodePool`][crate::NodePool] holds any region. It can also
/// be used directly as a region when the memory comes from a source that has no Rust owner,
/// such as a foreign allocator or a memory-mapped file.
///
/// # Examples
///
/// ```
/// use std::alloc::{Layout, alloc, dealloc};
/// use std::ptr::NonNull;
///
/// use node_pool::{NodePool, RawRegion};
///
/// const BYTES: usize = 256;
///
/// unsafe fn release(ptr: NonNull<u8>, len: usize) {
///     // SAFETY: Allocated below with the same layout.
///     unsafe { dealloc(ptr.as_ptr(), Layout::from_size_align(len, 16).unwrap()) };
/// }
///
/// let layout = Layout::from_size_align(BYTES, 16).unwrap();
/// // SAFETY: The layout has a non-zero size.
/// let ptr = NonNull::new(unsafe { alloc(layout) }).unwrap();
///
/// // SAFETY: We just allocated the memory and nothing else refers to it.
/// let region = unsafe { RawRegion::with_release(ptr, BYTES, release) };
///
/// let pool = NodePool::new(region, 30);
/// assert_eq!(pool.slot_count(), 8);
///
/// // Dropping the pool drops the region, which calls `release`.
/// drop(pool);
/// ```
pub struct RawRegion {
    ptr: NonNull<u8>,
    len: usize,
    release: Option<unsafe fn(NonNull<u8>, usize)>,
}

impl RawRegion {
    /// Creates a region that is never released by the pool or by this type.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that `ptr` is valid for reads and writes of `len` bytes
    /// for as long as the region (or a pool built from it) exists, and that nothing else
    /// accesses that memory during this time. The memory may be accessed from any thread.
    #[must_use]
    pub unsafe fn new(ptr: NonNull<u8>, len: usize) -> Self {
        Self {
            ptr,
            len,
            release: None,
        }
    }

    /// Creates a region that calls `release` with its pointer and length when dropped.
    ///
    /// # Safety
    ///
    /// Same as [`new()`](Self::new). In addition, `release` must be safe to call exactly once
    /// with `ptr` and `len`.
    #[must_use]
    pub unsafe fn with_release(
        ptr: NonNull<u8>,
        len: usize,
        release: unsafe fn(NonNull<u8>, usize),
    ) -> Self {
        Self {
            ptr,
            len,
            release: Some(release),
        }
    }

    /// Pointer to the first byte of the region.
    #[must_use]
    #[inline]
    pub fn as_ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Size of the region in bytes.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the region has no bytes at all.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Takes the region apart without releasing it.
    ///
    /// The caller becomes responsible for the memory, including calling any release function
    /// the region was created with.
    #[must_use]
    pub fn into_parts(self) -> (NonNull<u8>, usize, Option<unsafe fn(NonNull<u8>, usize)>) {
        let this = ManuallyDrop::new(self);
        (this.ptr, this.len, this.release)
    }
}

impl Drop for RawRegion {
    fn drop(&mut self) {
        if let Some(release) = self.release {
            // SAFETY: The creator of the region guaranteed that `release` may be called once
            // with these arguments, and Drop runs at most once.
            unsafe {
                release(self.ptr, self.len);
            }
        }
    }
}

impl fmt::Debug for RawRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawRegion")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .field("has_release", &self.release.is_some())
            .finish()
    }
}

// SAFETY: The creator of the region guaranteed exclusive access to the memory from any thread.
unsafe impl Send for RawRegion {}

// SAFETY: A raw region is its own raw form.
unsafe impl Region for RawRegion {
    #[inline]
    fn into_raw(self) -> RawRegion {
        self
    }

    #[inline]
    unsafe fn from_raw(raw: RawRegion) -> Self {
        raw
    }
}

// SAFETY: The exclusive borrow guarantees that nothing else accesses the memory while it
// lasts, and the pool carries the lifetime of the borrow through the region type.
unsafe impl Region for &mut [u8] {
    fn into_raw(self) -> RawRegion {
        let len = self.len();
        let ptr = NonNull::from(self).cast::<u8>();

        // SAFETY: Forwarding the guarantees of the exclusive borrow.
        unsafe { RawRegion::new(ptr, len) }
    }

    unsafe fn from_raw(raw: RawRegion) -> Self {
        let (ptr, len, _) = raw.into_parts();

        // SAFETY: The caller guarantees that the raw region came from into_raw() above, so
        // this is the same memory that the exclusive borrow covers.
        unsafe { slice::from_raw_parts_mut(ptr.as_ptr(), len) }
    }
}

// SAFETY: The box owns its memory exclusively, so once it is leaked nothing else refers to it.
unsafe impl Region for Box<[u8]> {
    fn into_raw(self) -> RawRegion {
        let len = self.len();
        let ptr = NonNull::from(Box::leak(self)).cast::<u8>();

        // SAFETY: The memory was leaked from a box, so we have exclusive access to it.
        unsafe { RawRegion::new(ptr, len) }
    }

    unsafe fn from_raw(raw: RawRegion) -> Self {
        let (ptr, len, _) = raw.into_parts();

        // SAFETY: The caller guarantees that the raw region came from into_raw() above, so
        // this is the slice that Box::leak() gave us.
        unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(ptr.as_ptr(), len)) }
    }
}
