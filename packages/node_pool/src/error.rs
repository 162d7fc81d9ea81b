use thiserror::Error;

/// Errors that can occur when configuring a [`NodePool`][crate::NodePool].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The region and slot size do not describe a usable pool.
    #[error(
        "invalid pool configuration: region of {region_bytes} bytes with slots of {slot_size} bytes: {problem}"
    )]
    PoolConfig {
        /// Size of the region that was supplied, in bytes.
        region_bytes: usize,

        /// The requested size of each slot, in bytes.
        slot_size: usize,

        /// A human-readable description of the problem.
        problem: &'static str,
    },
}

/// A specialized `Result` type for node pool operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
