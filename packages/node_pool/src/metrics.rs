//! Metrics for pool exhaustion.
//!
//! The fast path never touches the allocator, so only the fallback path is observed.

use nm::Event;

thread_local! {
    /// An exhausted pool served an allocation from the global allocator.
    /// The magnitude is the slot size in bytes.
    pub(crate) static FALLBACK_ALLOCATIONS: Event = Event::builder()
        .name("node_pool_fallback_allocations")
        .build();

    /// A slot served by the global allocator was returned to it.
    pub(crate) static FALLBACK_FREES: Event = Event::builder()
        .name("node_pool_fallback_frees")
        .build();
}
