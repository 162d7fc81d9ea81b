//! Metrics for buffer growth.
//!
//! Growth is the only point where a buffer touches the allocator, so that is where we observe.

use nm::{Event, Magnitude};

/// Histogram buckets for the capacity a buffer grows to, in bytes.
const GROWTH_BYTES_BUCKETS: &[Magnitude] = &[
    16, 64, 256, 1024, 4096, 16384, 65536, 262_144, 1_048_576, 16_777_216,
];

thread_local! {
    /// A buffer over borrowed storage had to move its content to the heap.
    pub(crate) static PROMOTIONS: Event = Event::builder()
        .name("grow_buffer_promotions")
        .build();

    /// A buffer grew its capacity. The magnitude is the new capacity in bytes.
    pub(crate) static GROWTH_BYTES: Event = Event::builder()
        .name("grow_buffer_growth_bytes")
        .histogram(GROWTH_BYTES_BUCKETS)
        .build();

    /// Content had to be copied out of borrowed storage because ownership could not be
    /// transferred. The magnitude is the number of bytes copied.
    pub(crate) static DETACH_COPIES: Event = Event::builder()
        .name("grow_buffer_detach_copies")
        .build();
}
