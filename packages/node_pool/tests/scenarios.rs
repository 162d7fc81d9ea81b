//! End-to-end usage scenarios for `NodePool`, exercised through the public API only.

#![allow(clippy::indexing_slicing, reason = "panic is fine in tests")]

use std::collections::HashSet;
use std::ptr::NonNull;

use node_pool::{FallbackPolicy, NodePool};

#[test]
fn four_small_nodes_then_fallback() {
    let mut region = [0_u8; 24];
    let region_start = region.as_ptr().addr();
    let region_end = region_start + region.len();

    let mut pool = NodePool::new(&mut region[..], 4);
    assert_eq!(pool.available(), 4);

    let slots = (0..4).map(|_| pool.allocate(false)).collect::<Vec<_>>();

    let distinct = slots.iter().copied().collect::<HashSet<_>>();
    assert_eq!(distinct.len(), 4);

    for slot in &slots {
        let addr = slot.addr().get();
        assert!((region_start..region_end).contains(&addr));
    }

    assert_eq!(pool.available(), 0);

    let fallback = pool.allocate(false);
    let addr = fallback.addr().get();
    assert!(!(region_start..region_end).contains(&addr));
    assert_eq!(pool.fallback_allocations(), 1);

    // SAFETY: The slot came from this pool and is freed only once.
    unsafe { pool.free(slots[0]) };
    assert_eq!(pool.available(), 1);

    assert_eq!(pool.allocate(false), slots[0]);

    // SAFETY: Every slot came from this pool and is freed only once.
    unsafe {
        pool.free(fallback);
        for slot in &slots {
            pool.free(*slot);
        }
    }

    assert_eq!(pool.available(), 4);
}

/// A singly linked list whose nodes live in the pool.
#[repr(C)]
struct Node {
    value: u64,
    next: Option<NonNull<Node>>,
}

#[test]
fn linked_list_nodes_from_pool() {
    let mut pool = NodePool::builder()
        .slot_size(size_of::<Node>())
        .fallback_policy(FallbackPolicy::Heap)
        .build(vec![0_u8; 10 * (size_of::<Node>() + 2)].into_boxed_slice());

    assert_eq!(pool.slot_count(), 10);

    // Push more nodes than fit, so the tail of the list comes from the heap. Nodes are
    // written unaligned because the pool does not align its slots.
    let mut head: Option<NonNull<Node>> = None;

    for value in 0..15_u64 {
        let node = pool.allocate(false).cast::<Node>();

        // SAFETY: The slot is large enough for a Node and exclusively ours.
        unsafe { node.write_unaligned(Node { value, next: head }) };

        head = Some(node);
    }

    assert!(pool.is_exhausted());
    assert_eq!(pool.fallback_allocations(), 5);

    let mut sum = 0;
    let mut cursor = head;

    while let Some(node) = cursor {
        // SAFETY: Every node in the list was initialized above and is still allocated.
        let Node { value, next } = unsafe { node.read_unaligned() };
        sum += value;
        cursor = next;

        // SAFETY: The slot came from this pool and is freed only once.
        unsafe { pool.free(node.cast::<u8>()) };
    }

    assert_eq!(sum, (0..15).sum::<u64>());
    assert_eq!(pool.available(), 10);
}

#[test]
fn pool_moves_between_threads() {
    let mut pool = NodePool::new(vec![0_u8; 64].into_boxed_slice(), 6);
    let slot = pool.allocate(true);

    let pool = std::thread::spawn(move || {
        let mut pool = pool;
        let slot = pool.allocate(false);
        // SAFETY: The slot came from this pool and is freed only once.
        unsafe { pool.free(slot) };
        pool
    })
    .join()
    .unwrap();

    assert_eq!(pool.in_use(), 1);
    assert!(pool.contains(slot));
}
