#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A fixed-capacity pool of uniform-size nodes carved out of a caller-supplied memory region.
//!
//! [`NodePool`] divides a [`Region`] into slots of the same size and keeps a stack of the free
//! slots in the tail of that same region. Allocating and freeing are O(1) and never touch the
//! global allocator as long as the region has room. Once it runs out, the pool can fall back
//! to the global allocator (see [`FallbackPolicy`]), so callers can treat the pool as a plain
//! allocator for nodes of a known size, such as the nodes of a linked list or a tree.
//!
//! # Regions
//!
//! Any type that implements [`Region`] can back a pool:
//!
//! * `&mut [u8]` - storage borrowed from the caller, for example a stack array.
//! * `Box<[u8]>` - heap storage owned by the pool and freed with it.
//! * [`RawRegion`] - a raw pointer and length, with an optional release function.
//!
//! # Examples
//!
//! ```
//! use node_pool::NodePool;
//!
//! // Room for four slots of 4 bytes, with their 2-byte free-stack entries.
//! let mut region = [0_u8; 24];
//! let mut pool = NodePool::new(&mut region[..], 4);
//! assert_eq!(pool.available(), 4);
//!
//! let slots: Vec<_> = (0..4).map(|_| pool.allocate(false)).collect();
//! assert!(slots.iter().all(|slot| pool.contains(*slot)));
//!
//! // The region is exhausted, so this slot comes from the global allocator.
//! let extra = pool.allocate(false);
//! assert!(!pool.contains(extra));
//!
//! // SAFETY: Every slot came from this pool and is freed only once.
//! unsafe {
//!     pool.free(extra);
//!     pool.free(slots[0]);
//! }
//!
//! // The most recently freed slot is handed out next.
//! assert_eq!(pool.allocate(false), slots[0]);
//! ```
//!
//! # Thread safety
//!
//! The pool is thread-mobile ([`Send`]) but not thread-safe ([`Sync`]).

mod builder;
mod error;
mod fallback_policy;
mod metrics;
mod pool;
mod region;

pub use builder::NodePoolBuilder;
pub use error::*;
pub use fallback_policy::FallbackPolicy;
pub use pool::{FALLBACK_ALIGN, NodePool};
pub use region::{RawRegion, Region};
