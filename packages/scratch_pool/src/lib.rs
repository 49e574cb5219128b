#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A fixed-capacity pool of equally sized byte blocks for tracking the best-so-far buffer of
//! many objects across a sequence of steps, without per-step allocation or buffer copying.
//!
//! This crate provides [`ScratchPool`]. Picture a tracker following several objects through a
//! video: every frame yields a fresh buffer (a crop, a feature map, ...) and each object wants to
//! remember the best buffer it has seen so far. Copying the buffer into every object that
//! considers it an improvement is wasteful. Instead, the pool writes each step's buffer into a
//! *primary* (scratch) slot and lets objects *adopt* that slot by reference.
//!
//! # Key features
//!
//! - **Fixed capacity**: `object_limit + 1` blocks are allocated up front; nothing is allocated
//!   while stepping.
//! - **Zero-copy adoption**: [`ScratchPool::adopt_primary()`] only moves a reference count.
//! - **Lazy rotation**: the scratch slot moves to a free slot only when the previous scratch
//!   buffer has been adopted, and only on the next scratch access.
//! - **Counted handles**: every [`SlotHandle`] represents exactly one reference and cannot be
//!   cloned. Operations that move a reference consume the old handle.
//! - **Loud contract violations**: oversized writes, stale or foreign handles and unbalanced
//!   releases panic; only capacity exhaustion is a recoverable [`Error`].
//!
//! # Example
//!
//! ```
//! use std::num::NonZero;
//!
//! use scratch_pool::ScratchPool;
//!
//! const OBJECTS: usize = 3;
//!
//! let mut pool = ScratchPool::new(NonZero::new(OBJECTS).unwrap(), NonZero::new(1).unwrap());
//!
//! let mut handles: Vec<_> = (0..OBJECTS).map(|_| pool.acquire().unwrap()).collect();
//!
//! for step in b'1'..=b'3' {
//!     pool.write_scratch(&[step]).unwrap();
//!
//!     // The caller decides which objects improved in this step. Here only the first one does.
//!     let first = handles.remove(0);
//!     handles.insert(0, pool.adopt_primary(first));
//! }
//!
//! assert_eq!(pool.read(&handles[0]), b"3");
//! assert_eq!(pool.read(&handles[1]), &[0_u8]);
//! # for handle in handles {
//! #     pool.release(handle);
//! # }
//! ```

mod builder;
mod drop_policy;
mod error;
mod handle;
mod pool;
mod slot;

pub use builder::*;
pub use drop_policy::*;
pub use error::*;
pub use handle::*;
pub use pool::*;
pub(crate) use slot::*;
