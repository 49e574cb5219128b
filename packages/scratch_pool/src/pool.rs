use std::num::NonZero;
use std::ops::Index;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crate::{DropPolicy, Error, Result, ScratchPoolBuilder, Slot, SlotHandle, SlotIndex};

/// Source of pool identities. Every construction and every reset takes a fresh value, so handles
/// issued before a reset (or by another pool) can be recognized as stale.
static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(0);

/// A fixed-capacity pool of equally sized byte blocks that lets many tracked objects each keep
/// their best-so-far buffer across a sequence of steps, without copying buffers around.
///
/// The pool holds `object_limit + 1` blocks. At any moment exactly one of them is the *primary*
/// slot: the scratch target that receives the buffer produced in the current step. After the
/// buffer is written, any number of objects may [adopt][Self::adopt_primary] it, which moves
/// their reference from their previous slot to the primary slot. Nothing is copied - only
/// reference counts change.
///
/// On the next scratch access, the pool checks whether anybody adopted the previous scratch
/// buffer. If not, the same slot is overwritten. Otherwise the primary designation rotates to the
/// first unreferenced slot in index order. Because there is one slot more than there are
/// objects, such a slot always exists as long as every object holds at most one handle.
///
/// # Writing the scratch buffer
///
/// There are two mutually exclusive ways to fill the scratch buffer in a step:
///
/// * [`write_scratch()`][Self::write_scratch] copies bytes that originate outside the pool.
/// * [`scratch_mut()`][Self::scratch_mut] gives you the primary block to fill in place, for
///   example as the output buffer of a processing function.
///
/// Each performs the primary rotation check, so use exactly one of them per step.
///
/// # Example
///
/// ```
/// use std::num::NonZero;
///
/// use scratch_pool::ScratchPool;
///
/// let mut pool = ScratchPool::new(NonZero::new(2).unwrap(), NonZero::new(1).unwrap());
///
/// let mut alice = pool.acquire().unwrap();
/// let mut bob = pool.acquire().unwrap();
///
/// // Step 1 - both objects start out with the same buffer.
/// pool.write_scratch(b"1").unwrap();
/// pool.write(&alice, b"1");
/// pool.write(&bob, b"1");
///
/// // Step 2 - only Bob considers the new buffer better than the one already held.
/// pool.write_scratch(b"2").unwrap();
/// bob = pool.adopt_primary(bob);
///
/// assert_eq!(pool.read(&alice), b"1");
/// assert_eq!(pool.read(&bob), b"2");
///
/// // Step 3 - the previous scratch slot is held by Bob, so the pool rotates to a free one.
/// pool.scratch_mut().unwrap().copy_from_slice(b"3");
/// alice = pool.adopt_primary(alice);
///
/// assert_eq!(pool.read(&alice), b"3");
/// assert_eq!(pool.read(&bob), b"2");
/// # pool.release(alice);
/// # pool.release(bob);
/// ```
///
/// # Thread safety
///
/// The pool is a plain single-threaded data structure. All mutation requires `&mut self`, so
/// sharing it between threads requires external synchronization around the whole
/// acquire/write/adopt sequence of a step.
#[derive(Debug)]
pub struct ScratchPool {
    slots: Vec<Slot>,

    /// Index of the slot that currently has the primary flag set. This must always agree with
    /// the flags stored in the slots themselves.
    primary_index: usize,

    object_limit: NonZero<usize>,
    block_size: NonZero<usize>,

    drop_policy: DropPolicy,

    /// Identity stamped into every handle we issue.
    pool_id: u64,
}

impl ScratchPool {
    /// Creates a pool for up to `object_limit` tracked objects, with blocks of `block_size`
    /// bytes each, using the default configuration.
    ///
    /// All `object_limit + 1` blocks are allocated and zeroed immediately. Slot 0 starts out as
    /// the primary slot.
    ///
    /// # Panics
    ///
    /// Panics if `object_limit + 1` overflows `usize`.
    #[must_use]
    pub fn new(object_limit: NonZero<usize>, block_size: NonZero<usize>) -> Self {
        Self::builder()
            .object_limit(object_limit)
            .block_size(block_size)
            .build()
    }

    /// Starts building a new [`ScratchPool`].
    ///
    /// Use this when you want to customize the pool configuration beyond the defaults.
    pub fn builder() -> ScratchPoolBuilder {
        ScratchPoolBuilder::new()
    }

    #[must_use]
    pub(crate) fn new_inner(
        object_limit: NonZero<usize>,
        block_size: NonZero<usize>,
        drop_policy: DropPolicy,
    ) -> Self {
        Self {
            slots: allocate_slots(object_limit, block_size),
            primary_index: 0,
            object_limit,
            block_size,
            drop_policy,
            pool_id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// The maximum number of tracked objects the pool was sized for.
    #[must_use]
    pub fn object_limit(&self) -> usize {
        self.object_limit.get()
    }

    /// The total number of slots in the pool, always one more than the object limit.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// The size in bytes of every block in the pool.
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size.get()
    }

    /// The index of the slot currently designated as the scratch target.
    ///
    /// Note that this may change on the next call to [`write_scratch()`][Self::write_scratch] or
    /// [`scratch_mut()`][Self::scratch_mut] if the current primary slot has been adopted.
    #[must_use]
    pub fn primary_index(&self) -> SlotIndex {
        SlotIndex::new(self.primary_index)
    }

    /// The number of outstanding handles referring to the slot at `index`.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    #[must_use]
    pub fn ref_count(&self, index: SlotIndex) -> usize {
        self.slot(index.get()).ref_count()
    }

    /// Whether the slot at `index` is the current scratch target.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    #[must_use]
    pub fn is_primary(&self, index: SlotIndex) -> bool {
        self.slot(index.get()).is_primary()
    }

    /// The number of distinct slots referenced by at least one handle.
    #[must_use]
    pub fn referenced_slots(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_referenced()).count()
    }

    /// The total number of outstanding handles across all slots.
    #[must_use]
    pub fn outstanding_references(&self) -> usize {
        self.slots.iter().map(Slot::ref_count).sum()
    }

    /// Whether no handles issued by this pool are outstanding.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        !self.slots.iter().any(Slot::is_referenced)
    }

    /// Hands out a reference to the first slot that is neither referenced nor the scratch
    /// target.
    ///
    /// The contents of the slot are whatever was last written to it. Use
    /// [`write()`][Self::write] to initialize it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCapacity`] if every slot is referenced or reserved. This cannot happen
    /// while the caller holds no more than [`object_limit()`][Self::object_limit] handles.
    pub fn acquire(&mut self) -> Result<SlotHandle> {
        let Some(index) = self.slots.iter().position(Slot::is_vacant) else {
            tracing::debug!(capacity = self.capacity(), "no vacant slot to acquire");
            return Err(Error::NoCapacity {
                capacity: self.capacity(),
            });
        };

        self.slot_mut(index).add_ref();
        tracing::trace!(slot = index, "acquired slot");

        #[cfg(debug_assertions)]
        self.integrity_check();

        Ok(SlotHandle::new(SlotIndex::new(index), self.pool_id))
    }

    /// Returns a handle to the pool without acquiring a new one.
    ///
    /// Use this when the tracked object goes away for good.
    ///
    /// # Panics
    ///
    /// Panics if the handle was not issued by this pool since its last reset.
    pub fn release(&mut self, handle: SlotHandle) {
        let index = self.resolve(&handle);

        self.slot_mut(index).remove_ref();
        tracing::trace!(slot = index, "released slot");

        #[cfg(debug_assertions)]
        self.integrity_check();
    }

    /// Releases a handle and immediately acquires a fresh one, as if the tracked object had been
    /// replaced by a new one.
    ///
    /// The old handle is consumed, so it cannot be accidentally used after this call. If the
    /// released slot became vacant, it may well be the one handed out again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCapacity`] if no slot is vacant after the release. The released
    /// reference is not restored in that case.
    ///
    /// # Panics
    ///
    /// Panics if the handle was not issued by this pool since its last reset.
    pub fn release_and_reacquire(&mut self, handle: SlotHandle) -> Result<SlotHandle> {
        self.release(handle);
        self.acquire()
    }

    /// Moves a reference from whatever slot `handle` refers to over to the primary slot,
    /// returning a handle to the primary slot.
    ///
    /// After this, reading the returned handle yields the most recent scratch buffer without any
    /// copy having taken place. If the handle already refers to the primary slot, this is a no-op
    /// that returns an equivalent handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle was not issued by this pool since its last reset, or if the pool
    /// has somehow lost its primary slot.
    pub fn adopt_primary(&mut self, handle: SlotHandle) -> SlotHandle {
        let index = self.resolve(&handle);
        let primary_index = self.query_primary();

        self.slot_mut(index).remove_ref();
        self.slot_mut(primary_index).add_ref();

        tracing::trace!(from = index, to = primary_index, "adopted primary slot");

        #[cfg(debug_assertions)]
        self.integrity_check();

        SlotHandle::new(SlotIndex::new(primary_index), self.pool_id)
    }

    /// Copies `bytes` into the scratch slot, rotating the primary designation first if the
    /// previous scratch buffer was adopted. Returns the index of the slot that was written.
    ///
    /// Fewer bytes than the block size may be written, in which case the rest of the block
    /// keeps its previous contents.
    ///
    /// Do not combine this with [`scratch_mut()`][Self::scratch_mut] for the same step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCapacity`] if every slot is referenced, which means the caller holds
    /// more handles than the object limit.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is longer than the block size.
    pub fn write_scratch(&mut self, bytes: &[u8]) -> Result<SlotIndex> {
        self.assert_fits(bytes);

        let index = self.rotate_primary()?;
        self.slot_mut(index).fill_from(bytes);

        Ok(SlotIndex::new(index))
    }

    /// Returns the scratch block for the caller to fill in place, rotating the primary
    /// designation first if the previous scratch buffer was adopted.
    ///
    /// Do not combine this with [`write_scratch()`][Self::write_scratch] for the same step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCapacity`] if every slot is referenced, which means the caller holds
    /// more handles than the object limit.
    ///
    /// # Example
    ///
    /// ```
    /// use std::num::NonZero;
    ///
    /// use scratch_pool::ScratchPool;
    ///
    /// fn produce(output: &mut [u8]) {
    ///     output.fill(0xAB);
    /// }
    ///
    /// let mut pool = ScratchPool::new(NonZero::new(1).unwrap(), NonZero::new(4).unwrap());
    /// let handle = pool.acquire().unwrap();
    ///
    /// produce(pool.scratch_mut().unwrap());
    ///
    /// let handle = pool.adopt_primary(handle);
    /// assert_eq!(pool.read(&handle), &[0xAB; 4]);
    /// # pool.release(handle);
    /// ```
    pub fn scratch_mut(&mut self) -> Result<&mut [u8]> {
        let index = self.rotate_primary()?;

        Ok(self.slot_mut(index).block_mut())
    }

    /// The block of the slot that `handle` refers to.
    ///
    /// # Panics
    ///
    /// Panics if the handle was not issued by this pool since its last reset.
    #[must_use]
    pub fn read(&self, handle: &SlotHandle) -> &[u8] {
        let index = self.resolve(handle);
        self.slot(index).block()
    }

    /// Copies `bytes` directly into the slot that `handle` refers to, bypassing the primary
    /// slot protocol.
    ///
    /// This is intended for initializing the buffer of a freshly acquired handle. Any other
    /// handles referring to the same slot observe the new contents as well.
    ///
    /// # Panics
    ///
    /// Panics if the handle was not issued by this pool since its last reset, or if `bytes` is
    /// longer than the block size.
    pub fn write(&mut self, handle: &SlotHandle, bytes: &[u8]) {
        self.assert_fits(bytes);

        let index = self.resolve(handle);
        self.slot_mut(index).fill_from(bytes);
    }

    /// Discards all slots and allocates them anew with the current configuration.
    ///
    /// All previously issued handles become stale and will panic if presented to the pool.
    ///
    /// # Panics
    ///
    /// Panics if the drop policy is [`DropPolicy::MustNotDropReferences`] and any handles are
    /// still outstanding.
    pub fn reset(&mut self) {
        self.reset_with(self.object_limit, self.block_size);
    }

    /// Discards all slots and allocates them anew with a different object limit and block size.
    ///
    /// All previously issued handles become stale and will panic if presented to the pool.
    ///
    /// # Panics
    ///
    /// Panics if the drop policy is [`DropPolicy::MustNotDropReferences`] and any handles are
    /// still outstanding.
    pub fn reset_with(&mut self, object_limit: NonZero<usize>, block_size: NonZero<usize>) {
        if self.drop_policy == DropPolicy::MustNotDropReferences {
            assert!(
                self.is_idle(),
                "reset a ScratchPool with {} outstanding references under a policy that forbids it",
                self.outstanding_references()
            );
        }

        tracing::debug!(
            object_limit = object_limit.get(),
            block_size = block_size.get(),
            "resetting scratch pool"
        );

        *self = Self::new_inner(object_limit, block_size, self.drop_policy);
    }

    /// Makes sure the primary slot is free to be overwritten, rotating the primary designation
    /// to the first unreferenced slot if needed, and returns its index.
    fn rotate_primary(&mut self) -> Result<usize> {
        if !self.slot(self.primary_index).is_referenced() {
            return Ok(self.primary_index);
        }

        let Some(index) = self.slots.iter().position(|slot| !slot.is_referenced()) else {
            tracing::debug!(
                capacity = self.capacity(),
                "no unreferenced slot to rotate the primary slot to"
            );
            return Err(Error::NoCapacity {
                capacity: self.capacity(),
            });
        };

        let previous_index = self.primary_index;
        self.slot_mut(previous_index).set_primary(false);
        self.slot_mut(index).set_primary(true);
        self.primary_index = index;

        tracing::trace!(from = previous_index, to = index, "rotated primary slot");

        #[cfg(debug_assertions)]
        self.integrity_check();

        Ok(index)
    }

    /// # Panics
    ///
    /// Panics if the cached primary slot is not flagged as primary.
    fn query_primary(&self) -> usize {
        assert!(
            self.slot(self.primary_index).is_primary(),
            "ScratchPool has no primary slot at index {}",
            self.primary_index
        );

        self.primary_index
    }

    /// Validates that the handle belongs to this pool and returns the slot index it refers to.
    fn resolve(&self, handle: &SlotHandle) -> usize {
        assert_eq!(
            handle.pool_id(),
            self.pool_id,
            "handle to slot {} was issued by a different pool or before the pool was reset",
            handle.index()
        );

        let index = handle.index().get();

        assert!(
            index < self.slots.len(),
            "handle to slot {index} is out of bounds in a pool of {} slots",
            self.slots.len()
        );

        index
    }

    fn assert_fits(&self, bytes: &[u8]) {
        assert!(
            bytes.len() <= self.block_size.get(),
            "cannot write {} bytes into a ScratchPool with a block size of {} bytes",
            bytes.len(),
            self.block_size
        );
    }

    fn slot(&self, index: usize) -> &Slot {
        let len = self.slots.len();

        self.slots
            .get(index)
            .unwrap_or_else(|| panic!("slot index {index} out of bounds in a pool of {len} slots"))
    }

    fn slot_mut(&mut self, index: usize) -> &mut Slot {
        let len = self.slots.len();

        self.slots
            .get_mut(index)
            .unwrap_or_else(|| panic!("slot index {index} out of bounds in a pool of {len} slots"))
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(debug_assertions)]
    pub(crate) fn integrity_check(&self) {
        let primary_count = self.slots.iter().filter(|slot| slot.is_primary()).count();

        assert_eq!(
            primary_count, 1,
            "ScratchPool must have exactly one primary slot"
        );

        assert!(
            self.slot(self.primary_index).is_primary(),
            "cached primary index {} does not point to the primary slot",
            self.primary_index
        );

        assert_eq!(
            self.slots.len(),
            self.object_limit
                .get()
                .checked_add(1)
                .expect("capacity was calculated without overflow at construction"),
            "ScratchPool slot count must not change outside of a reset"
        );
    }
}

impl Index<&SlotHandle> for ScratchPool {
    type Output = [u8];

    fn index(&self, handle: &SlotHandle) -> &Self::Output {
        self.read(handle)
    }
}

impl Drop for ScratchPool {
    fn drop(&mut self) {
        // If we are already panicking, we do not want to panic again because that will
        // simply obscure whatever the original panic was, leading to debug difficulties.
        if self.drop_policy == DropPolicy::MustNotDropReferences && !thread::panicking() {
            assert!(
                self.is_idle(),
                "dropped a ScratchPool with {} outstanding references under a policy that forbids it",
                self.outstanding_references()
            );
        }
    }
}

/// Allocates `object_limit + 1` zeroed slots, with slot 0 as the initial primary slot.
fn allocate_slots(object_limit: NonZero<usize>, block_size: NonZero<usize>) -> Vec<Slot> {
    let capacity = object_limit
        .get()
        .checked_add(1)
        .expect("object limit is too large to fit the extra scratch slot");

    (0..capacity)
        .map(|index| Slot::new(block_size.get(), index == 0))
        .collect()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(ScratchPool: Send, std::fmt::Debug);
    assert_not_impl_any!(ScratchPool: Clone);

    const ONE: NonZero<usize> = NonZero::new(1).unwrap();
    const TWO: NonZero<usize> = NonZero::new(2).unwrap();
    const THREE: NonZero<usize> = NonZero::new(3).unwrap();
    const FOUR: NonZero<usize> = NonZero::new(4).unwrap();

    fn primary_count(pool: &ScratchPool) -> usize {
        (0..pool.capacity())
            .filter(|&index| pool.is_primary(SlotIndex::new(index)))
            .count()
    }

    #[test]
    fn smoke_test() {
        let mut pool = ScratchPool::new(TWO, FOUR);

        assert_eq!(pool.object_limit(), 2);
        assert_eq!(pool.capacity(), 3);
        assert_eq!(pool.block_size(), 4);
        assert_eq!(pool.primary_index(), SlotIndex::new(0));
        assert!(pool.is_idle());

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();

        // Slot 0 is the primary slot, so it is never handed out by acquire().
        assert_eq!(a.index(), SlotIndex::new(1));
        assert_eq!(b.index(), SlotIndex::new(2));
        assert_eq!(pool.referenced_slots(), 2);
        assert_eq!(pool.outstanding_references(), 2);

        pool.write(&a, b"aaaa");
        pool.write(&b, b"bbbb");
        pool.write_scratch(b"ssss").unwrap();

        assert_eq!(pool.read(&a), b"aaaa");
        assert_eq!(&pool[&b], b"bbbb");

        let b = pool.adopt_primary(b);
        assert_eq!(pool.read(&b), b"ssss");

        pool.release(a);
        pool.release(b);
        assert!(pool.is_idle());
    }

    #[test]
    fn new_pool_is_zeroed() {
        let mut pool = ScratchPool::new(ONE, THREE);

        let handle = pool.acquire().unwrap();
        assert_eq!(pool.read(&handle), &[0_u8, 0, 0]);
        assert_eq!(pool.scratch_mut().unwrap(), &[0_u8, 0, 0]);

        pool.release(handle);
    }

    #[test]
    fn acquire_fails_when_only_primary_is_free() {
        let mut pool = ScratchPool::new(ONE, ONE);

        let handle = pool.acquire().unwrap();

        assert_eq!(
            pool.acquire().unwrap_err(),
            Error::NoCapacity { capacity: 2 }
        );

        pool.release(handle);
    }

    #[test]
    fn release_and_reacquire_reuses_freed_slot() {
        let mut pool = ScratchPool::new(TWO, ONE);

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert_eq!(a.index(), SlotIndex::new(1));

        let a = pool.release_and_reacquire(a).unwrap();

        assert_eq!(a.index(), SlotIndex::new(1));
        assert_eq!(pool.ref_count(SlotIndex::new(1)), 1);

        pool.release(a);
        pool.release(b);
    }

    #[test]
    fn release_and_reacquire_moves_off_shared_slot() {
        let mut pool = ScratchPool::new(TWO, ONE);

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();

        pool.write_scratch(b"x").unwrap();
        let a = pool.adopt_primary(a);
        let b = pool.adopt_primary(b);
        assert_eq!(pool.ref_count(SlotIndex::new(0)), 2);

        // The shared slot is still held by `b` (and is primary), so `a` gets a different one.
        let a = pool.release_and_reacquire(a).unwrap();

        assert_eq!(a.index(), SlotIndex::new(1));
        assert_eq!(pool.ref_count(SlotIndex::new(0)), 1);

        pool.release(a);
        pool.release(b);
    }

    #[test]
    fn unadopted_scratch_slot_is_reused() {
        let mut pool = ScratchPool::new(TWO, ONE);
        let a = pool.acquire().unwrap();

        let first = pool.write_scratch(b"1").unwrap();
        let second = pool.write_scratch(b"2").unwrap();
        let third = pool.scratch_mut().unwrap().as_ptr();
        let fourth = pool.scratch_mut().unwrap().as_ptr();

        assert_eq!(first, second);
        assert_eq!(third, fourth);
        assert_eq!(pool.primary_index(), first);

        pool.release(a);
    }

    #[test]
    fn adopted_scratch_slot_rotates_to_first_unreferenced() {
        let mut pool = ScratchPool::new(THREE, ONE);

        let a = pool.acquire().unwrap(); // 1
        let b = pool.acquire().unwrap(); // 2
        let c = pool.acquire().unwrap(); // 3

        assert_eq!(pool.write_scratch(b"1").unwrap(), SlotIndex::new(0));
        let b = pool.adopt_primary(b);

        // Slot 0 is held by `b`, slot 2 was freed by `b`.
        assert_eq!(pool.write_scratch(b"2").unwrap(), SlotIndex::new(2));
        assert!(pool.is_primary(SlotIndex::new(2)));
        assert!(!pool.is_primary(SlotIndex::new(0)));
        assert_eq!(primary_count(&pool), 1);

        let a = pool.adopt_primary(a);

        // Now slots 0 and 2 are held, slot 1 was freed by `a`.
        assert_eq!(pool.write_scratch(b"3").unwrap(), SlotIndex::new(1));

        assert_eq!(pool.read(&a), b"2");
        assert_eq!(pool.read(&b), b"1");

        pool.release(a);
        pool.release(b);
        pool.release(c);
    }

    #[test]
    fn rotation_is_lazy() {
        let mut pool = ScratchPool::new(TWO, ONE);

        let a = pool.acquire().unwrap();
        pool.write_scratch(b"1").unwrap();
        let a = pool.adopt_primary(a);

        // Adoption alone does not move the primary designation.
        assert_eq!(pool.primary_index(), SlotIndex::new(0));
        assert_eq!(primary_count(&pool), 1);

        pool.write_scratch(b"2").unwrap();
        assert_ne!(pool.primary_index(), SlotIndex::new(0));

        pool.release(a);
    }

    #[test]
    fn adopt_when_already_on_primary_is_noop() {
        let mut pool = ScratchPool::new(ONE, ONE);

        let a = pool.acquire().unwrap();
        pool.write_scratch(b"1").unwrap();

        let a = pool.adopt_primary(a);
        let a = pool.adopt_primary(a);

        assert_eq!(a.index(), SlotIndex::new(0));
        assert_eq!(pool.ref_count(SlotIndex::new(0)), 1);
        assert_eq!(pool.outstanding_references(), 1);

        pool.release(a);
    }

    #[test]
    fn adoption_shares_without_copying() {
        let mut pool = ScratchPool::new(TWO, FOUR);

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();

        pool.write_scratch(b"best").unwrap();
        let a = pool.adopt_primary(a);
        let b = pool.adopt_primary(b);

        assert_eq!(a.index(), b.index());
        assert_eq!(pool.read(&a).as_ptr(), pool.read(&b).as_ptr());
        assert_eq!(pool.read(&b), b"best");

        pool.release(a);
        pool.release(b);
    }

    #[test]
    fn capacity_headroom_allows_exactly_one_scratch_write() {
        let mut pool = ScratchPool::new(THREE, ONE);

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        let c = pool.acquire().unwrap();

        // Every object holds a distinct slot, yet the scratch write still succeeds.
        pool.write_scratch(b"1").unwrap();

        // Adopting frees `a`'s slot, which an over-limit handle then grabs.
        let a = pool.adopt_primary(a);
        let extra = pool.acquire().unwrap();
        assert_eq!(pool.referenced_slots(), 4);

        assert_eq!(
            pool.write_scratch(b"2").unwrap_err(),
            Error::NoCapacity { capacity: 4 }
        );
        assert!(pool.scratch_mut().is_err());

        // Failure leaves the pool consistent and recoverable.
        assert_eq!(primary_count(&pool), 1);
        pool.release(extra);
        assert_eq!(pool.write_scratch(b"2").unwrap(), SlotIndex::new(1));

        pool.release(a);
        pool.release(b);
        pool.release(c);
    }

    #[test]
    fn partial_scratch_write() {
        let mut pool = ScratchPool::new(ONE, FOUR);

        pool.write_scratch(b"abcd").unwrap();
        pool.write_scratch(b"xy").unwrap();

        assert_eq!(pool.scratch_mut().unwrap(), b"xycd");
    }

    #[test]
    #[should_panic]
    fn oversized_scratch_write_panics() {
        let mut pool = ScratchPool::new(ONE, TWO);
        _ = pool.write_scratch(b"abc");
    }

    #[test]
    #[should_panic]
    fn oversized_slot_write_panics() {
        let mut pool = ScratchPool::new(ONE, TWO);
        let handle = pool.acquire().unwrap();
        pool.write(&handle, b"abc");
    }

    #[test]
    fn oversized_scratch_write_does_not_rotate() {
        let mut pool = ScratchPool::new(ONE, ONE);

        let a = pool.acquire().unwrap();
        pool.write_scratch(b"1").unwrap();
        let a = pool.adopt_primary(a);

        let result = catch_unwind(AssertUnwindSafe(|| pool.write_scratch(b"22")));
        assert!(result.is_err());

        assert_eq!(pool.primary_index(), SlotIndex::new(0));

        pool.release(a);
    }

    #[test]
    #[should_panic]
    fn foreign_handle_panics() {
        let mut first = ScratchPool::new(ONE, ONE);
        let second = ScratchPool::new(ONE, ONE);

        let handle = first.acquire().unwrap();
        _ = second.read(&handle);
    }

    #[test]
    #[should_panic]
    fn out_of_bounds_index_panics() {
        let pool = ScratchPool::new(ONE, ONE);
        _ = pool.ref_count(SlotIndex::new(2));
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut pool = ScratchPool::new(TWO, ONE);

        let a = pool.acquire().unwrap();
        pool.write_scratch(b"9").unwrap();
        let a = pool.adopt_primary(a);
        pool.write_scratch(b"8").unwrap();

        pool.reset();

        assert!(pool.is_idle());
        assert_eq!(pool.capacity(), 3);
        assert_eq!(pool.primary_index(), SlotIndex::new(0));
        assert_eq!(pool.scratch_mut().unwrap(), &[0_u8]);

        // Handles from before the reset are stale.
        let result = catch_unwind(AssertUnwindSafe(|| pool.release(a)));
        assert!(result.is_err());
    }

    #[test]
    fn reset_with_changes_dimensions() {
        let mut pool = ScratchPool::new(ONE, ONE);

        pool.reset_with(FOUR, THREE);

        assert_eq!(pool.object_limit(), 4);
        assert_eq!(pool.capacity(), 5);
        assert_eq!(pool.block_size(), 3);

        let handles: Vec<_> = (0..4).map(|_| pool.acquire().unwrap()).collect();
        assert!(pool.acquire().is_err());

        for handle in handles {
            pool.release(handle);
        }
    }

    #[test]
    #[should_panic]
    fn reset_with_outstanding_references_panics_under_strict_policy() {
        let mut pool = ScratchPool::builder()
            .object_limit(ONE)
            .block_size(ONE)
            .drop_policy(DropPolicy::MustNotDropReferences)
            .build();

        let _handle = pool.acquire().unwrap();
        pool.reset();
    }

    #[test]
    #[should_panic]
    fn drop_with_outstanding_references_panics_under_strict_policy() {
        let mut pool = ScratchPool::builder()
            .object_limit(ONE)
            .block_size(ONE)
            .drop_policy(DropPolicy::MustNotDropReferences)
            .build();

        let _handle = pool.acquire().unwrap();
        drop(pool);
    }

    #[test]
    fn drop_when_idle_is_fine_under_strict_policy() {
        let mut pool = ScratchPool::builder()
            .object_limit(ONE)
            .block_size(ONE)
            .drop_policy(DropPolicy::MustNotDropReferences)
            .build();

        let handle = pool.acquire().unwrap();
        pool.release(handle);
        drop(pool);
    }

    #[test]
    fn drop_with_outstanding_references_is_fine_by_default() {
        let mut pool = ScratchPool::new(ONE, ONE);

        let _handle = pool.acquire().unwrap();
        drop(pool);
    }

    #[test]
    fn integrity_holds_after_mixed_operations() {
        let mut pool = ScratchPool::new(THREE, TWO);

        let mut handles: Vec<_> = (0..3).map(|_| pool.acquire().unwrap()).collect();

        for step in 0_u8..10 {
            pool.write_scratch(&[step, step]).unwrap();

            let adopt_index = usize::from(step) % handles.len();
            let handle = handles.swap_remove(adopt_index);
            handles.push(pool.adopt_primary(handle));

            #[cfg(debug_assertions)]
            pool.integrity_check();

            assert_eq!(primary_count(&pool), 1);
            assert_eq!(pool.outstanding_references(), 3);
        }

        for handle in handles {
            pool.release(handle);
        }
    }
}
