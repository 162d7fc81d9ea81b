#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A growable contiguous byte buffer that can start out in caller-supplied storage.
//!
//! [`GrowBuffer`] behaves much like a `Vec<u8>` that only ever grows by doubling, with one twist:
//! it can be created over memory that the caller already owns (typically a stack array) via
//! [`GrowBuffer::borrowed()`]. As long as the content fits, no heap allocation takes place.
//! Once the content outgrows the borrowed storage, the buffer copies itself to the heap and
//! stays there for the rest of its life.
//!
//! # Storage kinds
//!
//! * [`StorageKind::Owned`] - the buffer owns a heap allocation and releases it on drop.
//! * [`StorageKind::Borrowed`] - the buffer writes into caller storage and never releases it.
//!   The borrow is tracked by the `'a` lifetime of [`GrowBuffer<'a>`], so the storage is
//!   guaranteed to outlive the buffer.
//!
//! A borrowed buffer becomes owned when it has to grow. The transition is one-way.
//!
//! # Examples
//!
//! ```
//! use grow_buffer::{GrowBuffer, StorageKind};
//!
//! let mut stack = [0_u8; 16];
//! let mut buf = GrowBuffer::borrowed(&mut stack);
//!
//! buf.append_str("0123456789").unwrap();
//! buf.append_str("ABCDEF").unwrap();
//! assert_eq!(buf.storage_kind(), StorageKind::Borrowed);
//!
//! // The 17th byte no longer fits into the stack array.
//! buf.append_zeros(1).unwrap();
//! assert_eq!(buf.storage_kind(), StorageKind::Owned);
//! assert_eq!(&buf[..16], b"0123456789ABCDEF");
//! ```
//!
//! Buffers can swap contents regardless of where each one keeps its bytes:
//!
//! ```
//! use grow_buffer::GrowBuffer;
//!
//! let mut a = GrowBuffer::new();
//! a.append_str_nul("123").unwrap();
//!
//! let mut b = GrowBuffer::with_capacity(8).unwrap();
//! b.append_str_nul("abcde").unwrap();
//!
//! a.exchange(&mut b);
//! assert_eq!(a.as_slice(), b"abcde\0");
//! assert_eq!(b.as_slice(), b"123\0");
//! ```
//!
//! # Thread safety
//!
//! The buffer has no internal synchronization. It can be moved between threads and shared
//! immutably like any other plain collection.

mod append;
mod buffer;
mod error;
mod exchange;
mod file;
mod metrics;
mod storage;

pub use buffer::GrowBuffer;
pub use error::*;
pub(crate) use storage::Storage;
pub use storage::StorageKind;
