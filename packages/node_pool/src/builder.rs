use std::cell::Cell;
use std::marker::PhantomData;

use crate::{FallbackPolicy, NodePool, Region, Result};

/// Builder for creating an instance of [`NodePool`].
///
/// The slot size is mandatory, whereas other settings are optional. The region is supplied
/// when building, so the same builder configuration can be applied to regions of any type.
///
/// # Examples
///
/// ```
/// use node_pool::{FallbackPolicy, NodePool};
///
/// let mut region = [0_u8; 60];
///
/// let pool = NodePool::builder()
///     .slot_size(8)
///     .fallback_policy(FallbackPolicy::Heap)
///     .build(&mut region[..]);
///
/// assert_eq!(pool.slot_count(), 6);
/// ```
///
/// # Thread safety
///
/// The builder is thread-mobile ([`Send`]) and can be safely transferred between threads,
/// allowing pool configuration to happen on different threads than where the pool is used.
/// However, it is not thread-safe ([`Sync`]) as it contains mutable configuration state.
#[derive(Debug)]
#[must_use]
pub struct NodePoolBuilder {
    slot_size: Option<usize>,
    fallback_policy: FallbackPolicy,

    // Prevents Sync while allowing Send - builders are thread-mobile but not thread-safe
    _not_sync: PhantomData<Cell<()>>,
}

impl NodePoolBuilder {
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            slot_size: None,
            fallback_policy: FallbackPolicy::default(),
            _not_sync: PhantomData,
        }
    }

    /// Sets the size of each slot in bytes.
    ///
    /// A slot size of zero is rejected when the pool is built.
    #[inline]
    pub fn slot_size(mut self, slot_size: usize) -> Self {
        self.slot_size = Some(slot_size);
        self
    }

    /// Sets the [fallback policy][FallbackPolicy] for the pool. This governs what happens
    /// when an allocation is requested while all slots of the region are in use.
    #[inline]
    pub fn fallback_policy(mut self, policy: FallbackPolicy) -> Self {
        self.fallback_policy = policy;
        self
    }

    /// Builds the pool over `region` with the specified configuration.
    ///
    /// # Panics
    ///
    /// Panics if no slot size has been set using [`slot_size()`](Self::slot_size) or if the
    /// configuration is invalid for the region. Use [`try_build()`](Self::try_build) to
    /// handle an invalid configuration as an error.
    #[must_use]
    pub fn build<R: Region>(self, region: R) -> NodePool<R> {
        match self.try_build(region) {
            Ok(pool) => pool,
            Err(e) => panic!("{e}"),
        }
    }

    /// Builds the pool over `region` with the specified configuration, reporting an invalid
    /// configuration as an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolConfig`][crate::Error::PoolConfig] if the slot size is zero, if
    /// the region cannot hold a single slot with its free-stack entry, or if the region would
    /// hold more slots than the free stack can index. The region is dropped in that case.
    ///
    /// # Panics
    ///
    /// Panics if no slot size has been set using [`slot_size()`](Self::slot_size).
    ///
    /// # Examples
    ///
    /// ```
    /// use node_pool::NodePool;
    ///
    /// let mut region = [0_u8; 5];
    ///
    /// let result = NodePool::builder().slot_size(4).try_build(&mut region[..]);
    /// assert!(result.is_err());
    /// ```
    pub fn try_build<R: Region>(self, region: R) -> Result<NodePool<R>> {
        let slot_size = self
            .slot_size
            .expect("slot size must be set using .slot_size() before building the pool");

        NodePool::new_inner(region, slot_size, self.fallback_policy)
    }
}
