use std::alloc::{self, Layout};
use std::fmt;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::num::NonZero;
use std::ptr::{self, NonNull};

use new_zealand::nz;
use nm::Event;

use crate::metrics::{FALLBACK_ALLOCATIONS, FALLBACK_FREES};
use crate::{Error, FallbackPolicy, NodePoolBuilder, RawRegion, Region, Result};

/// Number of bytes each slot occupies in the free stack.
pub(crate) const INDEX_WIDTH: NonZero<usize> = nz!(2);

/// Alignment of slots served from the global allocator once the region is exhausted.
///
/// This matches the guarantee of a typical `malloc()`, so callers can treat fallback slots
/// the same as any other heap memory.
pub const FALLBACK_ALIGN: usize = 16;

/// Largest number of slots a region can be divided into, limited by the width of the
/// free-stack entries.
#[allow(clippy::cast_lossless, reason = "From is not usable in const context")]
const MAX_SLOT_COUNT: usize = u16::MAX as usize;

/// A fixed-capacity pool of uniform-size slots carved out of a caller-supplied [`Region`].
///
/// The region is divided into `slot_count` slots of [`slot_size()`](Self::slot_size) bytes,
/// followed by a stack of 16-bit indexes of the free slots:
///
/// ```text
/// | slot 0 | slot 1 | ... | slot N-1 | idx | idx | ... | idx | (unused tail) |
///                                     ^ free stack, N entries
/// ```
///
/// where `N = region_bytes / (slot_size + 2)`. Allocation pops an index from the stack and
/// freeing pushes it back, so both are O(1) and the most recently freed slot is the next one
/// to be handed out. Slots are handed out in address order from a fresh pool.
///
/// Once every slot is in use, further allocations are governed by the
/// [`FallbackPolicy`]. By default, they are served from the global allocator and returned
/// to it when freed, so callers never need to know which kind of slot they were given.
///
/// # Alignment
///
/// Slot addresses are `region_base + index * slot_size`. The pool does not align slots; a
/// caller that needs aligned slots must supply an aligned region and a slot size that is
/// a multiple of the required alignment. Fallback slots are aligned to [`FALLBACK_ALIGN`].
///
/// # Thread safety
///
/// The pool is thread-mobile ([`Send`]) if its region is, but not thread-safe ([`Sync`]).
/// It performs no synchronization of its own.
///
/// # Examples
///
/// ```
/// use node_pool::NodePool;
///
/// let mut region = [0_u8; 24];
/// let mut pool = NodePool::new(&mut region[..], 4);
///
/// assert_eq!(pool.slot_count(), 4);
///
/// let first = pool.allocate(true);
/// let second = pool.allocate(false);
/// assert_eq!(pool.available(), 2);
///
/// // SAFETY: Both slots came from this pool and are freed only once.
/// unsafe {
///     pool.free(second);
///     pool.free(first);
/// }
///
/// assert_eq!(pool.available(), 4);
/// ```
pub struct NodePool<R: Region> {
    /// The region, held in raw form so that slots can be accessed through pointers derived
    /// from it without any outstanding reference to the whole region.
    region: ManuallyDrop<RawRegion>,

    slot_size: NonZero<usize>,
    slot_count: NonZero<usize>,

    /// Start of the free stack, directly after the last slot.
    stack_base: NonNull<u8>,

    /// Height of the free stack, which is also the number of free slots in the region.
    available: usize,

    fallback_policy: FallbackPolicy,

    /// Layout of slots served from the global allocator.
    fallback_layout: Layout,

    /// Total number of allocations that this pool has served from the global allocator.
    fallback_allocations: usize,

    _region: PhantomData<R>,
}

impl NodePool<RawRegion> {
    /// Creates a builder for configuring and constructing a [`NodePool`].
    ///
    /// The region type is determined by the region passed to
    /// [`build()`](NodePoolBuilder::build), not by the type this method is called on.
    ///
    /// # Example
    ///
    /// ```
    /// use node_pool::NodePool;
    ///
    /// let pool = NodePool::builder()
    ///     .slot_size(32)
    ///     .build(vec![0_u8; 1024].into_boxed_slice());
    ///
    /// assert_eq!(pool.slot_count(), 30);
    /// ```
    #[inline]
    pub fn builder() -> NodePoolBuilder {
        NodePoolBuilder::new()
    }
}

impl<R: Region> NodePool<R> {
    /// Creates a pool over `region` with slots of `slot_size` bytes and the default
    /// [`FallbackPolicy`].
    ///
    /// # Panics
    ///
    /// Panics if the slot size is zero, if the region cannot hold a single slot with its
    /// free-stack entry, or if it would hold more slots than the free stack can index.
    #[must_use]
    pub fn new(region: R, slot_size: usize) -> Self {
        NodePoolBuilder::new().slot_size(slot_size).build(region)
    }

    pub(crate) fn new_inner(
        region: R,
        slot_size: usize,
        fallback_policy: FallbackPolicy,
    ) -> Result<Self> {
        let raw = region.into_raw();

        let geometry = match PoolGeometry::calculate(raw.len(), slot_size) {
            Ok(geometry) => geometry,
            Err(e) => {
                // SAFETY: The raw region came from into_raw() on R just above.
                drop(unsafe { R::from_raw(raw) });
                return Err(e);
            }
        };

        // SAFETY: The free stack starts within the region, as it follows the slot area in it.
        let stack_base = unsafe { raw.as_ptr().add(geometry.slots_bytes()) };

        let mut pool = Self {
            region: ManuallyDrop::new(raw),
            slot_size: geometry.slot_size,
            slot_count: geometry.slot_count,
            stack_base,
            available: 0,
            fallback_policy,
            fallback_layout: geometry.fallback_layout,
            fallback_allocations: 0,
            _region: PhantomData,
        };

        // The highest index goes on the bottom, so slot 0 is on top and is handed out first.
        for index in (0..geometry.slot_count.get()).rev() {
            pool.push_free(index);
        }

        #[cfg(debug_assertions)]
        pool.integrity_check();

        Ok(pool)
    }

    /// Number of slots in the region that are not in use.
    ///
    /// Slots served from the global allocator are not counted.
    #[must_use]
    #[inline]
    pub fn available(&self) -> usize {
        self.available
    }

    /// Size of each slot in bytes.
    #[must_use]
    #[inline]
    pub fn slot_size(&self) -> usize {
        self.slot_size.get()
    }

    /// Number of slots the region is divided into.
    #[must_use]
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slot_count.get()
    }

    /// Number of slots in the region that are in use.
    #[must_use]
    #[inline]
    pub fn in_use(&self) -> usize {
        // Cannot underflow: the free stack never holds more than slot_count entries.
        self.slot_count.get().wrapping_sub(self.available)
    }

    /// Whether every slot in the region is in use, meaning that the next allocation will be
    /// governed by the [`FallbackPolicy`].
    #[must_use]
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.available == 0
    }

    /// The policy for allocations beyond the capacity of the region.
    #[must_use]
    #[inline]
    pub fn fallback_policy(&self) -> FallbackPolicy {
        self.fallback_policy
    }

    /// Total number of allocations this pool has served from the global allocator.
    #[must_use]
    #[inline]
    pub fn fallback_allocations(&self) -> usize {
        self.fallback_allocations
    }

    /// Whether `ptr` points into the slot area of the region.
    ///
    /// Slots served from the global allocator are never contained in the region.
    #[must_use]
    pub fn contains(&self, ptr: NonNull<u8>) -> bool {
        let start = self.region.as_ptr().addr().get();
        // Cannot overflow: the slot area lies within the region.
        let end = start.wrapping_add(self.slots_bytes());

        (start..end).contains(&ptr.addr().get())
    }

    /// Allocates one slot of [`slot_size()`](Self::slot_size) bytes.
    ///
    /// The slot is zero-filled if `zero_fill` is set; otherwise its content is unspecified.
    /// Slots from the region come first. Once the region is exhausted, the
    /// [`FallbackPolicy`] decides what happens.
    ///
    /// The returned pointer stays valid until it is passed to [`free()`](Self::free) or, for
    /// slots from the region, until the pool is dropped or finished.
    ///
    /// # Panics
    ///
    /// Panics if the region is exhausted and the fallback policy is [`FallbackPolicy::Panic`].
    ///
    /// If the global allocator fails to provide a fallback slot, the process is terminated
    /// through [`std::alloc::handle_alloc_error`].
    #[must_use]
    pub fn allocate(&mut self, zero_fill: bool) -> NonNull<u8> {
        let Some(index) = self.pop_free() else {
            return self.allocate_fallback(zero_fill);
        };

        let ptr = self.slot_ptr(index);

        if zero_fill {
            // SAFETY: The slot lies within the region and we have exclusive access to it now
            // that it is off the free stack.
            unsafe {
                ptr.write_bytes(0, self.slot_size.get());
            }
        }

        #[cfg(debug_assertions)]
        self.integrity_check();

        ptr
    }

    #[cold]
    fn allocate_fallback(&mut self, zero_fill: bool) -> NonNull<u8> {
        match self.fallback_policy {
            FallbackPolicy::Heap => {}
            FallbackPolicy::Panic => panic!(
                "node pool with {} slots of {} bytes is exhausted",
                self.slot_count,
                self.slot_size
            ),
        }

        // SAFETY: The layout has a non-zero size because the slot size is non-zero.
        let ptr = unsafe {
            if zero_fill {
                alloc::alloc_zeroed(self.fallback_layout)
            } else {
                alloc::alloc(self.fallback_layout)
            }
        };

        let Some(ptr) = NonNull::new(ptr) else {
            alloc::handle_alloc_error(self.fallback_layout);
        };

        // Cannot overflow: every allocation occupies at least one byte of address space.
        self.fallback_allocations = self.fallback_allocations.wrapping_add(1);
        FALLBACK_ALLOCATIONS.with(|e| e.observe(self.slot_size.get()));

        ptr
    }

    /// Returns a slot to the pool.
    ///
    /// Slots from the region go back on the free stack and are the next to be handed out.
    /// Slots served from the global allocator are returned to it.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by [`allocate()`](Self::allocate) on this pool and must
    /// not have been freed since. The slot must not be accessed after this call.
    ///
    /// # Panics
    ///
    /// Panics if the free stack is already full, which can only happen if the safety
    /// requirements were violated.
    pub unsafe fn free(&mut self, ptr: NonNull<u8>) {
        if !self.contains(ptr) {
            // SAFETY: The caller guarantees that the pointer came from allocate(), and it is
            // not in the region, so it came from allocate_fallback() with this layout.
            unsafe {
                alloc::dealloc(ptr.as_ptr(), self.fallback_layout);
            }

            FALLBACK_FREES.with(Event::observe_once);
            return;
        }

        // Cannot underflow: contains() guarantees the pointer is not below the region start.
        let offset = ptr
            .addr()
            .get()
            .wrapping_sub(self.region.as_ptr().addr().get());

        debug_assert!(
            offset % self.slot_size == 0,
            "pointer at offset {offset} is not at the start of a slot of {} bytes",
            self.slot_size
        );

        #[allow(
            clippy::integer_division,
            reason = "offsets of slot starts divide evenly"
        )]
        let index = offset / self.slot_size;

        self.push_free(index);

        #[cfg(debug_assertions)]
        self.integrity_check();
    }

    /// Finishes using the pool and returns the region.
    ///
    /// Slots from the region must no longer be accessed after this call. Slots that are still
    /// outstanding from the global allocator remain valid and can be released with
    /// [`free_fallback()`](Self::free_fallback).
    ///
    /// # Examples
    ///
    /// ```
    /// use node_pool::NodePool;
    ///
    /// let region = vec![0_u8; 64].into_boxed_slice();
    /// let mut pool = NodePool::new(region, 6);
    ///
    /// let slot = pool.allocate(false);
    /// // SAFETY: The slot came from this pool and is freed only once.
    /// unsafe { pool.free(slot) };
    ///
    /// let region = pool.fini();
    /// assert_eq!(region.len(), 64);
    /// ```
    #[must_use]
    pub fn fini(self) -> R {
        let mut this = ManuallyDrop::new(self);

        // SAFETY: `this` is never dropped, so the region is taken out exactly once.
        let raw = unsafe { ManuallyDrop::take(&mut this.region) };

        // SAFETY: The raw region came from into_raw() on R when the pool was created.
        unsafe { R::from_raw(raw) }
    }

    /// Returns a slot that was served from the global allocator by a pool with slots of
    /// `slot_size` bytes, after that pool is gone.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by [`allocate()`](Self::allocate) on a pool with slots of
    /// `slot_size` bytes while that pool was exhausted, and must not have been freed since.
    pub unsafe fn free_fallback(ptr: NonNull<u8>, slot_size: usize) {
        let layout = Layout::from_size_align(slot_size, FALLBACK_ALIGN)
            .expect("the pool that allocated the slot validated this layout");

        // SAFETY: Forwarding the guarantees of the caller.
        unsafe {
            alloc::dealloc(ptr.as_ptr(), layout);
        }

        FALLBACK_FREES.with(Event::observe_once);
    }

    fn slots_bytes(&self) -> usize {
        // Cannot overflow: the slot area lies within the region.
        self.slot_count.get().wrapping_mul(self.slot_size.get())
    }

    fn slot_ptr(&self, index: usize) -> NonNull<u8> {
        debug_assert!(index < self.slot_count.get());

        // Cannot overflow: the slot area lies within the region.
        let offset = index.wrapping_mul(self.slot_size.get());

        // SAFETY: The offset is within the slot area because the index is below slot_count.
        unsafe { self.region.as_ptr().add(offset) }
    }

    fn stack_entry_ptr(&self, position: usize) -> NonNull<[u8; 2]> {
        assert!(
            position < self.slot_count.get(),
            "free stack position {position} is out of bounds for pool of {} slots",
            self.slot_count
        );

        // Cannot overflow: the free stack lies within the region.
        let offset = position.wrapping_mul(INDEX_WIDTH.get());

        // SAFETY: The bounds check above keeps the entry within the free stack, which is
        // within the region.
        unsafe { self.stack_base.add(offset).cast::<[u8; 2]>() }
    }

    fn read_stack_entry(&self, position: usize) -> usize {
        let entry_ptr = self.stack_entry_ptr(position);

        // SAFETY: The entry lies within the region, which we access exclusively. Byte arrays
        // have no alignment requirement.
        let bytes = unsafe { ptr::read(entry_ptr.as_ptr()) };

        usize::from(u16::from_ne_bytes(bytes))
    }

    fn pop_free(&mut self) -> Option<usize> {
        let top = self.available.checked_sub(1)?;
        self.available = top;

        Some(self.read_stack_entry(top))
    }

    fn push_free(&mut self, index: usize) {
        assert!(
            self.available < self.slot_count.get(),
            "free stack of pool with {} slots is already full; was a slot freed twice?",
            self.slot_count
        );

        let entry = u16::try_from(index).expect("slot count is limited to the u16 range");
        let entry_ptr = self.stack_entry_ptr(self.available);

        // SAFETY: The entry lies within the region, which we access exclusively. Byte arrays
        // have no alignment requirement.
        unsafe {
            ptr::write(entry_ptr.as_ptr(), entry.to_ne_bytes());
        }

        // Cannot overflow: guarded by the assertion above.
        self.available = self.available.wrapping_add(1);
    }

    /// Verifies that the free stack holds unique slot indexes within bounds.
    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(debug_assertions)]
    #[allow(
        clippy::indexing_slicing,
        reason = "integrity check needs array access"
    )]
    pub(crate) fn integrity_check(&self) {
        let slot_count = self.slot_count.get();

        assert!(
            self.available <= slot_count,
            "free stack height {} exceeds slot count {slot_count}",
            self.available
        );

        let mut seen = vec![false; slot_count];

        for position in 0..self.available {
            let index = self.read_stack_entry(position);

            assert!(
                index < slot_count,
                "free stack position {position} holds out-of-bounds slot {index} in pool of {slot_count} slots"
            );

            assert!(
                !seen[index],
                "free stack holds slot {index} more than once in pool of {slot_count} slots"
            );

            seen[index] = true;
        }
    }
}

/// How a region of a given size is divided between slots and the free stack.
#[derive(Clone, Debug, Eq, PartialEq)]
struct PoolGeometry {
    slot_size: NonZero<usize>,
    slot_count: NonZero<usize>,
    fallback_layout: Layout,
}

impl PoolGeometry {
    fn calculate(region_bytes: usize, slot_size: usize) -> Result<Self> {
        let config_error = |problem: &'static str| Error::PoolConfig {
            region_bytes,
            slot_size,
            problem,
        };

        let slot_size = NonZero::new(slot_size).ok_or_else(|| config_error("slot size is zero"))?;

        let stride = slot_size
            .checked_add(INDEX_WIDTH.get())
            .ok_or_else(|| config_error("slot size is too large"))?;

        #[allow(
            clippy::integer_division,
            reason = "we want to know how many whole slots fit"
        )]
        let slot_count = NonZero::new(region_bytes / stride)
            .ok_or_else(|| config_error("region cannot hold a single slot"))?;

        if slot_count.get() > MAX_SLOT_COUNT {
            return Err(config_error(
                "region holds more slots than a 16-bit free stack can index",
            ));
        }

        let fallback_layout = Layout::from_size_align(slot_size.get(), FALLBACK_ALIGN)
            .ok()
            .ok_or_else(|| config_error("slot size is too large for the global allocator"))?;

        Ok(Self {
            slot_size,
            slot_count,
            fallback_layout,
        })
    }

    fn slots_bytes(&self) -> usize {
        // Cannot overflow: slot_count * (slot_size + INDEX_WIDTH) fits into the region.
        self.slot_count.get().wrapping_mul(self.slot_size.get())
    }
}

impl<R: Region> Drop for NodePool<R> {
    fn drop(&mut self) {
        // SAFETY: Drop runs at most once and fini() does not run Drop, so the region is taken
        // out exactly once.
        let raw = unsafe { ManuallyDrop::take(&mut self.region) };

        // SAFETY: The raw region came from into_raw() on R when the pool was created.
        drop(unsafe { R::from_raw(raw) });
    }
}

impl<R: Region> fmt::Debug for NodePool<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodePool")
            .field("region", &*self.region)
            .field("slot_size", &self.slot_size)
            .field("slot_count", &self.slot_count)
            .field("available", &self.available)
            .field("fallback_policy", &self.fallback_policy)
            .field("fallback_allocations", &self.fallback_allocations)
            .finish_non_exhaustive()
    }
}

// SAFETY: The pool accesses the region only through its own methods, which require exclusive
// access, so moving it to another thread is as safe as moving the region itself.
unsafe impl<R: Region + Send> Send for NodePool<R> {}
