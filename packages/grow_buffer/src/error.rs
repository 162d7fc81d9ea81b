use std::collections::TryReserveError;
use std::io;

use thiserror::Error;

/// Errors that can occur when a [`GrowBuffer`][crate::GrowBuffer] needs more capacity.
///
/// Contract violations such as out-of-bounds offsets are not reported through this type.
/// They are programming errors and result in a panic.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The capacity required to hold `len + additional` bytes cannot be represented.
    #[error("capacity overflow: cannot grow a buffer of {len} bytes by another {additional} bytes")]
    CapacityOverflow {
        /// Number of bytes in use when the growth was requested.
        len: usize,

        /// Number of extra bytes that were requested.
        additional: usize,
    },

    /// The global allocator could not provide the requested capacity.
    #[error("out of memory: failed to allocate a buffer with capacity of {capacity} bytes")]
    OutOfMemory {
        /// The capacity that the buffer attempted to grow to.
        capacity: usize,

        /// The allocator error reported by the standard library.
        #[source]
        source: TryReserveError,
    },
}

/// A specialized `Result` type for buffer operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for io::Error {
    fn from(error: Error) -> Self {
        Self::new(io::ErrorKind::OutOfMemory, error)
    }
}
