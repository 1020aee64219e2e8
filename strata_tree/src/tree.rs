// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core tree implementation: node storage, top-level order list, sweeping.

use alloc::vec::Vec;
use kurbo::{Point, Size};
use strata_handle::{HandlePool, NodeHandle, NodeKind};

use crate::error::TreeError;
use crate::types::NodeFlags;

/// Sentinel for "no node" in index-valued arrays.
pub(crate) const NO_NODE: u32 = u32::MAX;

/// Node hierarchy stored as parallel arrays.
///
/// Each node has an optional parent, an offset relative to that parent, a
/// size and [`NodeFlags`]. Nodes without a parent are *roots*; a root
/// participates in drawing and event handling only while it's in the
/// top-level order list, which [`create_node`](Self::create_node) appends it
/// to (frontmost). The list is cyclic internally and exposed as a
/// back-to-front sequence through [`node_order_first`](Self::node_order_first)
/// and [`node_order_next`](Self::node_order_next).
///
/// Children are not stored: the hierarchy is reconstructed from parent links
/// when a [`Composition`](crate::Composition) is rebuilt.
///
/// ## Example
///
/// ```rust
/// use kurbo::{Point, Size};
/// use strata_tree::{NodeFlags, Tree};
///
/// let mut tree = Tree::new();
/// let a = tree.create_node(None, Point::ZERO, Size::new(10.0, 10.0), NodeFlags::empty()).unwrap();
/// let b = tree.create_node(None, Point::ZERO, Size::new(10.0, 10.0), NodeFlags::empty()).unwrap();
/// assert_eq!(tree.node_order_first(), Some(a));
/// assert_eq!(tree.node_order_last(), Some(b));
///
/// // Bring `b` to the back.
/// tree.set_node_order(b, Some(a)).unwrap();
/// assert_eq!(tree.node_order_first(), Some(b));
/// ```
pub struct Tree {
    pub(crate) nodes: HandlePool<NodeKind>,
    pub(crate) parent: Vec<Option<NodeHandle>>,
    pub(crate) offset: Vec<Point>,
    pub(crate) size: Vec<Size>,
    pub(crate) flags: Vec<NodeFlags>,
    pub(crate) order_prev: Vec<u32>,
    pub(crate) order_next: Vec<u32>,
    pub(crate) first_order: u32,
}

impl core::fmt::Debug for Tree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let ordered = self.order_next.iter().filter(|n| **n != NO_NODE).count();
        f.debug_struct("Tree")
            .field("nodes_total", &self.nodes.slot_count())
            .field("nodes_alive", &self.nodes.used_count())
            .field("ordered", &ordered)
            .finish_non_exhaustive()
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            nodes: HandlePool::new(),
            parent: Vec::new(),
            offset: Vec::new(),
            size: Vec::new(),
            flags: Vec::new(),
            order_prev: Vec::new(),
            order_next: Vec::new(),
            first_order: NO_NODE,
        }
    }

    /// Create a node under `parent`, or a new frontmost root if `parent` is `None`.
    ///
    /// Fails with [`TreeError::InvalidHandle`] if `parent` is given but not
    /// alive, and with [`TreeError::CapacityExceeded`] once the node index
    /// space is exhausted.
    pub fn create_node(
        &mut self,
        parent: Option<NodeHandle>,
        offset: Point,
        size: Size,
        flags: NodeFlags,
    ) -> Result<NodeHandle, TreeError> {
        if let Some(p) = parent {
            self.check(p)?;
        }
        let handle = self.nodes.create()?;
        let idx = handle.index() as usize;
        if idx == self.parent.len() {
            self.parent.push(parent);
            self.offset.push(offset);
            self.size.push(size);
            self.flags.push(flags);
            self.order_prev.push(NO_NODE);
            self.order_next.push(NO_NODE);
        } else {
            self.parent[idx] = parent;
            self.offset[idx] = offset;
            self.size[idx] = size;
            self.flags[idx] = flags;
            self.order_prev[idx] = NO_NODE;
            self.order_next[idx] = NO_NODE;
        }
        if parent.is_none() {
            self.link_order(handle.index(), NO_NODE);
        }
        Ok(handle)
    }

    /// Remove a node.
    ///
    /// The node leaves the order list and its handle becomes stale
    /// immediately. Its descendants stay alive but *dangling* until the next
    /// [`Tree::clean`], which removes them.
    pub fn remove_node(&mut self, node: NodeHandle) -> Result<(), TreeError> {
        self.check(node)?;
        let idx = node.index();
        if self.order_next[idx as usize] != NO_NODE {
            self.unlink_order(idx);
        }
        self.nodes.remove(node)?;
        Ok(())
    }

    /// Returns true if `node` refers to a live node.
    ///
    /// Dangling nodes are still alive until [`Tree::clean`] sweeps them.
    pub fn is_alive(&self, node: NodeHandle) -> bool {
        self.nodes.is_valid(node)
    }

    /// Number of live nodes, dangling ones included.
    pub fn node_used_count(&self) -> usize {
        self.nodes.used_count()
    }

    /// Number of node slots, i.e. the required length of per-node arrays.
    pub fn node_capacity(&self) -> usize {
        self.nodes.slot_count()
    }

    /// Live handle in slot `index`, if any.
    pub fn node_handle(&self, index: u32) -> Option<NodeHandle> {
        self.nodes.handle_at(index)
    }

    /// Iterate live nodes in slot order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeHandle> + '_ {
        self.nodes.iter()
    }

    /// The parent of a node, `None` for roots.
    pub fn node_parent(&self, node: NodeHandle) -> Result<Option<NodeHandle>, TreeError> {
        self.check(node)?;
        Ok(self.parent[node.index() as usize])
    }

    /// Offset of a node relative to its parent.
    pub fn node_offset(&self, node: NodeHandle) -> Result<Point, TreeError> {
        self.check(node)?;
        Ok(self.offset[node.index() as usize])
    }

    /// Update a node's offset relative to its parent.
    pub fn set_node_offset(&mut self, node: NodeHandle, offset: Point) -> Result<(), TreeError> {
        self.check(node)?;
        self.offset[node.index() as usize] = offset;
        Ok(())
    }

    /// Size of a node.
    pub fn node_size(&self, node: NodeHandle) -> Result<Size, TreeError> {
        self.check(node)?;
        Ok(self.size[node.index() as usize])
    }

    /// Update a node's size.
    pub fn set_node_size(&mut self, node: NodeHandle, size: Size) -> Result<(), TreeError> {
        self.check(node)?;
        self.size[node.index() as usize] = size;
        Ok(())
    }

    /// Flags of a node.
    pub fn node_flags(&self, node: NodeHandle) -> Result<NodeFlags, TreeError> {
        self.check(node)?;
        Ok(self.flags[node.index() as usize])
    }

    /// Replace a node's flags.
    pub fn set_node_flags(&mut self, node: NodeHandle, flags: NodeFlags) -> Result<(), TreeError> {
        self.check(node)?;
        self.flags[node.index() as usize] = flags;
        Ok(())
    }

    /// Set additional flags on a node.
    pub fn add_node_flags(&mut self, node: NodeHandle, flags: NodeFlags) -> Result<(), TreeError> {
        self.check(node)?;
        self.flags[node.index() as usize] |= flags;
        Ok(())
    }

    /// Clear flags on a node.
    pub fn clear_node_flags(&mut self, node: NodeHandle, flags: NodeFlags) -> Result<(), TreeError> {
        self.check(node)?;
        self.flags[node.index() as usize] &= !flags;
        Ok(())
    }

    /// Per-slot offsets relative to each node's parent. Entries of free slots are unspecified.
    pub fn node_offsets(&self) -> &[Point] {
        &self.offset
    }

    /// Per-slot sizes. Entries of free slots are unspecified.
    pub fn node_sizes(&self) -> &[Size] {
        &self.size
    }

    /// Per-slot flags. Entries of free slots are unspecified.
    pub fn node_flags_slice(&self) -> &[NodeFlags] {
        &self.flags
    }

    // --- top-level order ---

    /// Whether a node is in the top-level order list.
    pub fn is_node_ordered(&self, node: NodeHandle) -> Result<bool, TreeError> {
        self.check(node)?;
        Ok(self.order_next[node.index() as usize] != NO_NODE)
    }

    /// Backmost ordered root.
    pub fn node_order_first(&self) -> Option<NodeHandle> {
        self.order_handle(self.first_order)
    }

    /// Frontmost ordered root.
    pub fn node_order_last(&self) -> Option<NodeHandle> {
        if self.first_order == NO_NODE {
            return None;
        }
        self.order_handle(self.order_prev[self.first_order as usize])
    }

    /// The root drawn right before `node`, `None` if `node` is first or not ordered.
    pub fn node_order_previous(&self, node: NodeHandle) -> Result<Option<NodeHandle>, TreeError> {
        self.check(node)?;
        let idx = node.index();
        if idx == self.first_order {
            return Ok(None);
        }
        Ok(self.order_handle(self.order_prev[idx as usize]))
    }

    /// The root drawn right after `node`, `None` if `node` is last or not ordered.
    pub fn node_order_next(&self, node: NodeHandle) -> Result<Option<NodeHandle>, TreeError> {
        self.check(node)?;
        let next = self.order_next[node.index() as usize];
        if next == self.first_order {
            return Ok(None);
        }
        Ok(self.order_handle(next))
    }

    /// Move a root node in the order list so it's drawn right before `before`,
    /// or frontmost if `before` is `None`.
    ///
    /// The node is inserted into the list if it isn't ordered yet.
    ///
    /// - [`TreeError::NotARootNode`] if `node` has a parent.
    /// - [`TreeError::SelfOrdering`] if `before` is `node`.
    /// - [`TreeError::NotOrdered`] if `before` isn't in the order list.
    pub fn set_node_order(
        &mut self,
        node: NodeHandle,
        before: Option<NodeHandle>,
    ) -> Result<(), TreeError> {
        self.check(node)?;
        if self.parent[node.index() as usize].is_some() {
            return Err(TreeError::NotARootNode);
        }
        let before_idx = match before {
            Some(b) => {
                self.check(b)?;
                if b == node {
                    return Err(TreeError::SelfOrdering);
                }
                if self.order_next[b.index() as usize] == NO_NODE {
                    return Err(TreeError::NotOrdered);
                }
                b.index()
            }
            None => NO_NODE,
        };

        let idx = node.index();
        if self.order_next[idx as usize] != NO_NODE {
            self.unlink_order(idx);
        }
        self.link_order(idx, before_idx);
        Ok(())
    }

    /// Take a root node out of the order list, hiding its subtree without removing it.
    ///
    /// Fails with [`TreeError::NotOrdered`] if the node isn't in the list.
    pub fn clear_node_order(&mut self, node: NodeHandle) -> Result<(), TreeError> {
        self.check(node)?;
        let idx = node.index();
        if self.order_next[idx as usize] == NO_NODE {
            return Err(TreeError::NotOrdered);
        }
        self.unlink_order(idx);
        Ok(())
    }

    // --- maintenance ---

    /// Returns true if some live node hangs below a removed ancestor.
    pub fn has_dangling_nodes(&self) -> bool {
        self.nodes.iter().any(|n| {
            self.parent[n.index() as usize].is_some_and(|p| !self.nodes.is_valid(p))
        })
    }

    /// Remove every dangling node and return their (now stale) handles.
    ///
    /// A node is dangling if walking its parent chain reaches a removed node
    /// before reaching a root. Each node's status is resolved once and cached,
    /// so the sweep is linear in the number of slots regardless of depth.
    pub fn clean(&mut self) -> Vec<NodeHandle> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Reach {
            Unknown,
            Rooted,
            Dangling,
        }

        let mut reach = alloc::vec![Reach::Unknown; self.nodes.slot_count()];
        let mut chain: Vec<u32> = Vec::new();
        for start in self.nodes.iter() {
            let mut cur = start.index();
            let status = loop {
                match reach[cur as usize] {
                    Reach::Unknown => {}
                    known => break known,
                }
                chain.push(cur);
                match self.parent[cur as usize] {
                    None => break Reach::Rooted,
                    Some(p) if self.nodes.is_valid(p) => cur = p.index(),
                    Some(_) => break Reach::Dangling,
                }
            };
            for idx in chain.drain(..) {
                reach[idx as usize] = status;
            }
        }

        let mut removed = Vec::new();
        for (idx, status) in reach.iter().enumerate() {
            if *status != Reach::Dangling {
                continue;
            }
            #[allow(
                clippy::cast_possible_truncation,
                reason = "Slot count is bounded by the 20-bit node index space."
            )]
            let handle = self.nodes.handle_at(idx as u32);
            if let Some(handle) = handle {
                // Dangling nodes always have a parent, so they're never ordered.
                let freed = self.nodes.remove(handle);
                debug_assert!(freed.is_ok(), "handle_at returns live handles");
                removed.push(handle);
            }
        }
        removed
    }
}

impl Tree {
    // --- internals ---

    fn check(&self, node: NodeHandle) -> Result<(), TreeError> {
        if self.nodes.is_valid(node) {
            Ok(())
        } else {
            Err(TreeError::InvalidHandle)
        }
    }

    fn order_handle(&self, idx: u32) -> Option<NodeHandle> {
        if idx == NO_NODE {
            return None;
        }
        self.nodes.handle_at(idx)
    }

    /// Insert `idx` before `before`, or at the back of the cycle if `before` is [`NO_NODE`].
    fn link_order(&mut self, idx: u32, before: u32) {
        let i = idx as usize;
        if self.first_order == NO_NODE {
            self.order_prev[i] = idx;
            self.order_next[i] = idx;
            self.first_order = idx;
            return;
        }
        let next = if before == NO_NODE {
            self.first_order
        } else {
            before
        };
        let prev = self.order_prev[next as usize];
        self.order_prev[i] = prev;
        self.order_next[i] = next;
        self.order_next[prev as usize] = idx;
        self.order_prev[next as usize] = idx;
        if before == self.first_order {
            self.first_order = idx;
        }
    }

    fn unlink_order(&mut self, idx: u32) {
        let i = idx as usize;
        let prev = self.order_prev[i];
        let next = self.order_next[i];
        if next == idx {
            self.first_order = NO_NODE;
        } else {
            self.order_next[prev as usize] = next;
            self.order_prev[next as usize] = prev;
            if self.first_order == idx {
                self.first_order = next;
            }
        }
        self.order_prev[i] = NO_NODE;
        self.order_next[i] = NO_NODE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn root(tree: &mut Tree) -> NodeHandle {
        tree.create_node(None, Point::ZERO, Size::new(10.0, 10.0), NodeFlags::empty())
            .unwrap()
    }

    fn child(tree: &mut Tree, parent: NodeHandle) -> NodeHandle {
        tree.create_node(
            Some(parent),
            Point::ZERO,
            Size::new(5.0, 5.0),
            NodeFlags::empty(),
        )
        .unwrap()
    }

    fn order(tree: &Tree) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        let mut cur = tree.node_order_first();
        while let Some(n) = cur {
            out.push(n);
            cur = tree.node_order_next(n).unwrap();
        }
        out
    }

    #[test]
    fn roots_are_appended_to_order() {
        let mut tree = Tree::new();
        let a = root(&mut tree);
        let b = root(&mut tree);
        let c = child(&mut tree, a);
        assert_eq!(order(&tree), vec![a, b]);
        assert_eq!(tree.node_order_last(), Some(b));
        assert!(!tree.is_node_ordered(c).unwrap());
        assert_eq!(tree.node_order_previous(a).unwrap(), None);
        assert_eq!(tree.node_order_previous(b).unwrap(), Some(a));
    }

    #[test]
    fn create_with_stale_parent_fails_without_allocating() {
        let mut tree = Tree::new();
        let a = root(&mut tree);
        tree.remove_node(a).unwrap();
        let err = tree.create_node(Some(a), Point::ZERO, Size::ZERO, NodeFlags::empty());
        assert_eq!(err, Err(TreeError::InvalidHandle));
        assert_eq!(tree.node_used_count(), 0);
    }

    #[test]
    fn reorder_round_trip_restores_links() {
        let mut tree = Tree::new();
        let a = root(&mut tree);
        let b = root(&mut tree);
        let c = root(&mut tree);
        let before = (tree.order_prev.clone(), tree.order_next.clone(), tree.first_order);

        tree.set_node_order(a, None).unwrap();
        assert_eq!(order(&tree), vec![b, c, a]);
        tree.set_node_order(a, Some(b)).unwrap();
        assert_eq!(order(&tree), vec![a, b, c]);

        let after = (tree.order_prev.clone(), tree.order_next.clone(), tree.first_order);
        assert_eq!(before, after);
    }

    #[test]
    fn order_errors_leave_list_untouched() {
        let mut tree = Tree::new();
        let a = root(&mut tree);
        let b = root(&mut tree);
        let c = child(&mut tree, a);

        assert_eq!(tree.set_node_order(c, None), Err(TreeError::NotARootNode));
        assert_eq!(tree.set_node_order(a, Some(a)), Err(TreeError::SelfOrdering));
        tree.clear_node_order(b).unwrap();
        assert_eq!(tree.clear_node_order(b), Err(TreeError::NotOrdered));
        assert_eq!(tree.set_node_order(a, Some(b)), Err(TreeError::NotOrdered));
        assert_eq!(order(&tree), vec![a]);

        // Re-inserting an unordered root puts it back.
        tree.set_node_order(b, Some(a)).unwrap();
        assert_eq!(order(&tree), vec![b, a]);
    }

    #[test]
    fn clearing_last_ordered_node_empties_list() {
        let mut tree = Tree::new();
        let a = root(&mut tree);
        tree.clear_node_order(a).unwrap();
        assert_eq!(tree.node_order_first(), None);
        assert_eq!(tree.node_order_last(), None);
        assert_eq!(tree.node_order_next(a).unwrap(), None);
    }

    #[test]
    fn removing_ordered_root_unlinks_it() {
        let mut tree = Tree::new();
        let a = root(&mut tree);
        let b = root(&mut tree);
        let c = root(&mut tree);
        tree.remove_node(b).unwrap();
        assert_eq!(order(&tree), vec![a, c]);
        assert_eq!(tree.remove_node(b), Err(TreeError::InvalidHandle));
        assert_eq!(tree.node_order_previous(b), Err(TreeError::InvalidHandle));
    }

    #[test]
    fn remove_defers_descendants_until_clean() {
        let mut tree = Tree::new();
        let keep = root(&mut tree);
        let a = root(&mut tree);
        let b = child(&mut tree, a);
        let c = child(&mut tree, b);
        let sibling = child(&mut tree, keep);
        assert_eq!(tree.node_used_count(), 5);

        tree.remove_node(a).unwrap();
        assert!(tree.is_alive(b) && tree.is_alive(c));
        assert!(tree.has_dangling_nodes());
        assert_eq!(tree.node_used_count(), 4);

        let mut removed = tree.clean();
        removed.sort();
        assert_eq!(removed, vec![b, c]);
        assert!(!tree.is_alive(b) && !tree.is_alive(c));
        assert!(tree.is_alive(keep) && tree.is_alive(sibling));
        assert!(!tree.has_dangling_nodes());
        assert_eq!(tree.node_used_count(), 2);
        assert!(tree.clean().is_empty(), "second clean has nothing to do");
    }

    #[test]
    fn reused_parent_slot_does_not_adopt_dangling_children() {
        let mut tree = Tree::new();
        let a = root(&mut tree);
        let b = child(&mut tree, a);
        tree.remove_node(a).unwrap();
        // Reuses the slot of `a` with a bumped generation.
        let fresh = root(&mut tree);
        assert_eq!(fresh.index(), a.index());
        assert_eq!(tree.clean(), vec![b]);
        assert!(tree.is_alive(fresh));
    }

    #[test]
    fn deep_chain_cleans_without_recursion() {
        let mut tree = Tree::new();
        let top = root(&mut tree);
        let mut last = top;
        for _ in 0..10_000 {
            last = child(&mut tree, last);
        }
        tree.remove_node(top).unwrap();
        assert_eq!(tree.clean().len(), 10_000);
        assert!(!tree.is_alive(last));
        assert_eq!(tree.node_used_count(), 0);
    }

    #[test]
    fn flag_and_geometry_setters() {
        let mut tree = Tree::new();
        let a = root(&mut tree);
        tree.set_node_offset(a, Point::new(3.0, 4.0)).unwrap();
        tree.set_node_size(a, Size::new(7.0, 8.0)).unwrap();
        tree.add_node_flags(a, NodeFlags::CLIP | NodeFlags::HIDDEN).unwrap();
        tree.clear_node_flags(a, NodeFlags::HIDDEN).unwrap();
        assert_eq!(tree.node_offset(a).unwrap(), Point::new(3.0, 4.0));
        assert_eq!(tree.node_size(a).unwrap(), Size::new(7.0, 8.0));
        assert_eq!(tree.node_flags(a).unwrap(), NodeFlags::CLIP);
        tree.set_node_flags(a, NodeFlags::FOCUSABLE).unwrap();
        assert_eq!(tree.node_flags(a).unwrap(), NodeFlags::FOCUSABLE);
        assert_eq!(tree.node_parent(a).unwrap(), None);
    }
}
