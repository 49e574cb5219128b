/// One fixed-size block of a [`ScratchPool`][crate::ScratchPool] together with the bookkeeping
/// the pool uses to decide who may overwrite it.
///
/// The block itself is allocated once, when the pool is built (or reset), and is never
/// reallocated or moved for the lifetime of the slot.
#[derive(Debug)]
pub(crate) struct Slot {
    block: Box<[u8]>,

    /// Number of outstanding [`SlotHandle`][crate::SlotHandle]s that refer to this slot.
    ref_count: usize,

    /// Whether this slot is the target of the next scratch write. Exactly one slot in a pool
    /// has this set at any point in time.
    is_primary: bool,
}

impl Slot {
    /// Creates a zero-initialized slot of `block_size` bytes.
    #[must_use]
    pub(crate) fn new(block_size: usize, is_primary: bool) -> Self {
        Self {
            block: vec![0; block_size].into_boxed_slice(),
            ref_count: 0,
            is_primary,
        }
    }

    #[must_use]
    pub(crate) fn ref_count(&self) -> usize {
        self.ref_count
    }

    #[must_use]
    pub(crate) fn is_referenced(&self) -> bool {
        self.ref_count != 0
    }

    #[must_use]
    pub(crate) fn is_primary(&self) -> bool {
        self.is_primary
    }

    pub(crate) fn set_primary(&mut self, is_primary: bool) {
        self.is_primary = is_primary;
    }

    /// A slot is vacant if nobody references it and it is not reserved as the scratch target.
    #[must_use]
    pub(crate) fn is_vacant(&self) -> bool {
        !self.is_referenced() && !self.is_primary
    }

    pub(crate) fn add_ref(&mut self) {
        self.ref_count = self
            .ref_count
            .checked_add(1)
            .expect("reference count cannot realistically exceed usize::MAX");
    }

    /// # Panics
    ///
    /// Panics if the slot is not referenced, as that means the caller released a reference
    /// it never held.
    pub(crate) fn remove_ref(&mut self) {
        self.ref_count = self
            .ref_count
            .checked_sub(1)
            .expect("released a reference to a slot that had no outstanding references");
    }

    #[must_use]
    pub(crate) fn block(&self) -> &[u8] {
        &self.block
    }

    #[must_use]
    pub(crate) fn block_mut(&mut self) -> &mut [u8] {
        &mut self.block
    }

    /// Copies `bytes` to the start of the block, leaving any remaining bytes untouched.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is longer than the block.
    pub(crate) fn fill_from(&mut self, bytes: &[u8]) {
        let block_size = self.block.len();

        let Some(target) = self.block.get_mut(..bytes.len()) else {
            panic!(
                "cannot write {} bytes into a slot with a block size of {block_size} bytes",
                bytes.len()
            );
        };

        target.copy_from_slice(bytes);
    }
}
