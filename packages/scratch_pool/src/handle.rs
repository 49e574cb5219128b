use std::fmt;

/// The position of a slot in a [`ScratchPool`][crate::ScratchPool].
///
/// Slot indexes are plain values that can be freely copied and compared. They carry no
/// reference to the slot; use them to inspect pool state via
/// [`ScratchPool::ref_count()`][crate::ScratchPool::ref_count] and friends.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SlotIndex(usize);

impl SlotIndex {
    #[must_use]
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The numeric position of the slot in the pool, starting from zero.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SlotIndex> for usize {
    fn from(value: SlotIndex) -> Self {
        value.0
    }
}

/// One counted reference to a slot in a [`ScratchPool`][crate::ScratchPool].
///
/// A handle is a lookup key, not an owning pointer: the pool owns all the memory and performs
/// all bookkeeping. Each handle stands for exactly one unit of the slot's reference count,
/// which is why handles can be neither cloned nor copied. Several handles may refer to the
/// same slot at once - this is how multiple objects share an adopted buffer.
///
/// Operations that move a reference elsewhere consume the handle and give you a new one:
///
/// ```
/// use std::num::NonZero;
///
/// use scratch_pool::ScratchPool;
///
/// let mut pool = ScratchPool::new(NonZero::new(2).unwrap(), NonZero::new(1).unwrap());
///
/// let handle = pool.acquire().unwrap();
/// pool.write_scratch(b"x").unwrap();
///
/// // The old handle is moved into the call and cannot be used any more.
/// let handle = pool.adopt_primary(handle);
/// assert_eq!(pool.read(&handle), b"x");
/// ```
///
/// Dropping a handle without returning it to the pool leaks its reference: the slot will
/// never again be considered free until the pool is reset.
#[derive(Debug, Eq, PartialEq)]
#[must_use = "dropping a handle without releasing it leaks a slot reference"]
pub struct SlotHandle {
    index: SlotIndex,

    /// Identity of the pool (and pool generation) that issued this handle.
    pool_id: u64,
}

impl SlotHandle {
    #[must_use = "dropping a handle without releasing it leaks a slot reference"]
    pub(crate) const fn new(index: SlotIndex, pool_id: u64) -> Self {
        Self { index, pool_id }
    }

    /// The index of the slot this handle refers to.
    ///
    /// Two handles with the same index share the same buffer.
    #[must_use]
    pub const fn index(&self) -> SlotIndex {
        self.index
    }

    #[must_use]
    pub(crate) const fn pool_id(&self) -> u64 {
        self.pool_id
    }
}
