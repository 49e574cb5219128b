use thiserror::Error;

/// Recoverable errors returned by [`ScratchPool`][crate::ScratchPool] operations.
///
/// Contract violations by the caller (oversized writes, stale handles and the like) are not
/// represented here - they panic instead.
#[derive(Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Every slot in the pool is either referenced or reserved as the scratch target, so there
    /// is no slot to hand out.
    ///
    /// This only happens if the caller holds more handles than the pool's object limit. Releasing
    /// a handle makes the operation possible again.
    #[error("no free slot available: all {capacity} slots are in use")]
    NoCapacity {
        /// Total number of slots in the pool.
        capacity: usize,
    },
}

/// A specialized `Result` type for scratch pool operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
