// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Strata Tree: the node hierarchy of a retained-mode UI and the passes that
//! decide what of it is visible.
//!
//! - [`Tree`] stores nodes as parallel arrays (parent, offset, size, flags)
//!   addressed by generational [`NodeHandle`]s, plus a cyclic doubly-linked
//!   *order list* of root nodes that decides back-to-front paint and event
//!   order between root subtrees.
//! - Removing a node is O(1): its descendants become *dangling* and are swept
//!   by the next [`Tree::clean`], which walks the node array once.
//! - [`Composition`] flattens the tree into a depth-first *visible sequence*
//!   (each entry annotated with its descendant count), derives inherited
//!   enabled/event/blur masks, culls against the viewport and produces a
//!   compact list of [`ClipRect`]s covering the sequence. The individual
//!   passes are also available as free functions in [`compositor`].
//!
//! None of the passes recurse; hierarchy depth is bounded only by memory.
//!
//! ```rust
//! use kurbo::{Point, Size};
//! use strata_tree::{Composition, NodeFlags, Tree};
//!
//! let mut tree = Tree::new();
//! let root = tree
//!     .create_node(None, Point::ZERO, Size::new(100.0, 100.0), NodeFlags::CLIP)
//!     .unwrap();
//! let child = tree
//!     .create_node(Some(root), Point::new(80.0, 80.0), Size::new(50.0, 50.0), NodeFlags::empty())
//!     .unwrap();
//!
//! let mut composition = Composition::new();
//! composition.rebuild_sequence(&tree);
//! composition.cull(&tree, Size::new(200.0, 200.0));
//!
//! assert_eq!(composition.visible_node_ids(), &[root.index(), child.index()]);
//! // The root is unclipped, the child is clipped to the root's rectangle.
//! assert_eq!(composition.clip_rects().len(), 2);
//! assert!(composition.is_node_visible(child));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod compositor;
mod error;
mod tree;
mod types;
mod util;

pub use compositor::Composition;
pub use error::TreeError;
pub use strata_handle::NodeHandle;
pub use tree::Tree;
pub use types::{ClipRect, NodeFlags};
