/// Determines how the pool treats outstanding slot references when it is dropped or reset.
///
/// By default, the pool may be dropped while handles are still outstanding. Those handles simply
/// become stale and will panic if ever presented to a pool.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use scratch_pool::{DropPolicy, ScratchPool};
///
/// let pool = ScratchPool::builder()
///     .object_limit(NonZero::new(4).unwrap())
///     .block_size(NonZero::new(64).unwrap())
///     .drop_policy(DropPolicy::MustNotDropReferences)
///     .build();
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// The pool may be dropped or reset while slots are still referenced. This is the default.
    #[default]
    MayDropReferences,

    /// The pool will panic if any slot is still referenced when it is dropped or reset.
    ///
    /// This may be valuable to catch handle leaks, where a tracked object went away without
    /// returning its handle via [`release()`][crate::ScratchPool::release].
    MustNotDropReferences,
}
