use std::num::NonZero;

use crate::{DropPolicy, ScratchPool};

/// Builder for creating an instance of [`ScratchPool`].
///
/// [`ScratchPool`] requires the object limit and the block size to be specified at construction
/// time. Other settings are optional. If you do not need to customize anything beyond the two
/// mandatory parameters, [`ScratchPool::new()`][1] is a shorthand for the same.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use scratch_pool::ScratchPool;
///
/// let pool = ScratchPool::builder()
///     .object_limit(NonZero::new(16).unwrap())
///     .block_size(NonZero::new(1024).unwrap())
///     .build();
///
/// assert_eq!(pool.capacity(), 17);
/// ```
///
/// [1]: ScratchPool::new
#[derive(Debug)]
#[must_use]
pub struct ScratchPoolBuilder {
    object_limit: Option<NonZero<usize>>,
    block_size: Option<NonZero<usize>>,
    drop_policy: DropPolicy,
}

impl ScratchPoolBuilder {
    pub(crate) fn new() -> Self {
        Self {
            object_limit: None,
            block_size: None,
            drop_policy: DropPolicy::default(),
        }
    }

    /// Sets the maximum number of tracked objects that may hold a slot at the same time.
    ///
    /// The pool allocates one slot more than this, to always have room for a scratch write.
    pub fn object_limit(mut self, object_limit: NonZero<usize>) -> Self {
        self.object_limit = Some(object_limit);
        self
    }

    /// Sets the size in bytes of every block in the pool.
    pub fn block_size(mut self, block_size: NonZero<usize>) -> Self {
        self.block_size = Some(block_size);
        self
    }

    /// Sets the [drop policy][DropPolicy] for the pool. This governs how to treat slots that are
    /// still referenced when the pool is dropped or reset.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::num::NonZero;
    ///
    /// use scratch_pool::{DropPolicy, ScratchPool};
    ///
    /// let pool = ScratchPool::builder()
    ///     .object_limit(NonZero::new(2).unwrap())
    ///     .block_size(NonZero::new(8).unwrap())
    ///     .drop_policy(DropPolicy::MustNotDropReferences)
    ///     .build();
    /// ```
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Builds the pool, eagerly allocating all of its blocks.
    ///
    /// # Panics
    ///
    /// Panics if the object limit or the block size has not been set.
    #[must_use]
    pub fn build(self) -> ScratchPool {
        let object_limit = self
            .object_limit
            .expect("object limit must be set before building a ScratchPool");
        let block_size = self
            .block_size
            .expect("block size must be set before building a ScratchPool");

        ScratchPool::new_inner(object_limit, block_size, self.drop_policy)
    }
}
