/// Determines what a [`NodePool`][crate::NodePool] does when an allocation is requested
/// while every slot in the region is in use.
///
/// By default, the pool serves such allocations from the global allocator.
///
/// # Examples
///
/// ```
/// use node_pool::{FallbackPolicy, NodePool};
///
/// let region = vec![0_u8; 64].into_boxed_slice();
///
/// let pool = NodePool::builder()
///     .slot_size(8)
///     .fallback_policy(FallbackPolicy::Panic)
///     .build(region);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum FallbackPolicy {
    /// Allocations beyond the capacity of the region are served from the global allocator
    /// and returned to it when freed. This is the default.
    #[default]
    Heap,

    /// Allocating from an exhausted pool panics.
    ///
    /// This may be valuable if the region was sized for a known upper bound and exceeding
    /// that bound indicates a defect.
    Panic,
}
