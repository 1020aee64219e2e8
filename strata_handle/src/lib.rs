// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Strata Handle: generational handles and the pool that hands them out.
//!
//! Every entity in a Strata UI (nodes, layers, layer data, animators) is
//! addressed by a [`Handle`]: a slot index and a generation counter packed into
//! a single `u64`. A handle is valid only while its slot is allocated *and*
//! the slot's stored generation equals the handle's generation, so a handle
//! kept around after its entity was removed is detected as stale instead of
//! silently aliasing whatever reuses the slot.
//!
//! - [`HandleKind`] fixes the index and generation widths per entity kind.
//!   The provided kinds are [`NodeKind`], [`LayerKind`], [`LayerDataKind`] and
//!   [`AnimatorKind`].
//! - [`HandlePool`] allocates handles. Freed slots are recycled
//!   oldest-freed-first; a slot whose generation would wrap around is retired
//!   for good.
//! - [`DataHandle`] addresses layer data globally, as a pair of the owning
//!   [`LayerHandle`] and the layer-relative [`LayerDataHandle`].
//!
//! ```rust
//! use strata_handle::{HandleError, HandlePool, NodeKind};
//!
//! let mut pool = HandlePool::<NodeKind>::new();
//! let a = pool.create().unwrap();
//! assert!(pool.is_valid(a));
//!
//! pool.remove(a).unwrap();
//! assert!(!pool.is_valid(a));
//! assert_eq!(pool.remove(a), Err(HandleError::InvalidHandle));
//!
//! // The slot is reused, but the stale handle stays invalid.
//! let b = pool.create().unwrap();
//! assert_eq!(a.index(), b.index());
//! assert!(!pool.is_valid(a));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod error;
mod handle;
mod pool;

pub use error::HandleError;
pub use handle::{
    AnimatorHandle, AnimatorKind, DataHandle, Handle, HandleKind, LayerDataHandle, LayerDataKind,
    LayerHandle, LayerKind, NodeHandle, NodeKind,
};
pub use pool::{HandlePool, Iter};
