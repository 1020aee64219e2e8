// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flattening, flag inheritance and clipping passes over a [`Tree`].
//!
//! The free functions operate on plain slices so they can be driven by any
//! structure-of-arrays node store; [`Composition`] wires them up for a
//! [`Tree`] and keeps the intermediate arrays alive between frames.
//!
//! All per-node arrays are indexed by [`NodeHandle::index`]; all
//! per-*position* arrays are indexed by position in the visible sequence.

use alloc::vec::Vec;
use kurbo::{Point, Rect, Size};
use smallvec::SmallVec;
use strata_handle::NodeHandle;

use crate::tree::{NO_NODE, Tree};
use crate::types::{ClipRect, NodeFlags};
use crate::util::rects_overlap;

/// Build a children-of-parent index from a parent array.
///
/// `parents[i]` is the slot index of the parent of node `i`, or `u32::MAX`
/// for roots and unused slots. `children_offsets` must hold
/// `parents.len() + 2` entries and `children` at least as many entries as
/// there are non-root nodes. Afterwards the children of node `p` are
/// `children[children_offsets[p]..children_offsets[p + 1]]`, in increasing
/// slot order. Only the first `parents.len() + 1` offsets are meaningful.
pub fn children_index(parents: &[u32], children_offsets: &mut [u32], children: &mut [u32]) {
    debug_assert_eq!(
        children_offsets.len(),
        parents.len() + 2,
        "children_offsets needs two extra entries"
    );
    children_offsets.fill(0);

    // Count into the slot shifted by two so the running prefix sum leaves
    // each parent's write cursor at `offsets[p + 1]`.
    for &p in parents {
        if p != NO_NODE {
            children_offsets[p as usize + 2] += 1;
        }
    }
    for i in 1..children_offsets.len() {
        children_offsets[i] += children_offsets[i - 1];
    }
    for (i, &p) in parents.iter().enumerate() {
        if p != NO_NODE {
            #[allow(
                clippy::cast_possible_truncation,
                reason = "Node slots are bounded by the 20-bit node index space."
            )]
            let child = i as u32;
            let cursor = &mut children_offsets[p as usize + 1];
            children[*cursor as usize] = child;
            *cursor += 1;
        }
    }
}

/// Flatten the tree into the depth-first visible sequence.
///
/// Starts at `first` and follows the cyclic `order_next` list until it comes
/// back around. Every non-[`HIDDEN`](NodeFlags::HIDDEN) root and every
/// non-hidden descendant without a hidden ancestor is pushed to `ids` in
/// pre-order; `counts` receives, at the same position, the number of entries
/// that follow belonging to the node's subtree.
///
/// Uses an explicit stack, so hierarchy depth is bounded only by memory.
pub fn order_visible_nodes(
    first: u32,
    order_next: &[u32],
    flags: &[NodeFlags],
    children_offsets: &[u32],
    children: &[u32],
    ids: &mut Vec<u32>,
    counts: &mut Vec<u32>,
) {
    ids.clear();
    counts.clear();
    if first == NO_NODE {
        return;
    }

    struct Frame {
        id: u32,
        out_index: usize,
        next_child: u32,
    }
    let mut stack: SmallVec<[Frame; 32]> = SmallVec::new();

    let mut root = first;
    loop {
        if !flags[root as usize].contains(NodeFlags::HIDDEN) {
            stack.push(Frame {
                id: root,
                out_index: ids.len(),
                next_child: children_offsets[root as usize],
            });
            ids.push(root);
            counts.push(0);

            while let Some(top) = stack.last_mut() {
                let end = children_offsets[top.id as usize + 1];
                // Skip hidden children along with their whole subtree.
                while top.next_child < end
                    && flags[children[top.next_child as usize] as usize]
                        .contains(NodeFlags::HIDDEN)
                {
                    top.next_child += 1;
                }
                if top.next_child == end {
                    let out_index = top.out_index;
                    #[allow(
                        clippy::cast_possible_truncation,
                        reason = "Sequence length is bounded by the 20-bit node index space."
                    )]
                    let count = (ids.len() - out_index - 1) as u32;
                    counts[out_index] = count;
                    stack.pop();
                    continue;
                }
                let child = children[top.next_child as usize];
                top.next_child += 1;
                stack.push(Frame {
                    id: child,
                    out_index: ids.len(),
                    next_child: children_offsets[child as usize],
                });
                ids.push(child);
                counts.push(0);
            }
        }

        root = order_next[root as usize];
        if root == first || root == NO_NODE {
            break;
        }
    }
}

/// Clear `mask` for every node of the sequence that carries `flag` or has an
/// ancestor carrying it.
///
/// `mask` is indexed by node slot. Entries of nodes outside the sequence are
/// left untouched.
pub fn propagate_flag_to_children(
    flag: NodeFlags,
    flags: &[NodeFlags],
    ids: &[u32],
    counts: &[u32],
    mask: &mut [bool],
) {
    let mut i = 0;
    while i < ids.len() {
        if flags[ids[i] as usize].intersects(flag) {
            let end = i + counts[i] as usize + 1;
            for &id in &ids[i..end] {
                mask[id as usize] = false;
            }
            i = end;
        } else {
            i += 1;
        }
    }
}

/// Resolve parent-relative offsets into UI coordinates for every node of the sequence.
///
/// Relies on parents preceding their children in `ids`.
pub fn absolute_offsets(parents: &[u32], offsets: &[Point], ids: &[u32], out: &mut [Point]) {
    for &id in ids {
        let id = id as usize;
        let parent = parents[id];
        out[id] = if parent == NO_NODE {
            offsets[id]
        } else {
            out[parent as usize] + offsets[id].to_vec2()
        };
    }
}

/// Decide which nodes of the sequence are visible and compute the clip list.
///
/// A node is visible iff its rectangle overlaps the innermost active clip,
/// starting with the viewport. A visible [`CLIP`](NodeFlags::CLIP) node with
/// descendants opens a new clip, the intersection of its rectangle with the
/// enclosing one, until its descendant range ends. A `CLIP` node that isn't
/// visible hides its entire subtree.
///
/// `clip_rects` receives runs covering the whole sequence without gaps: their
/// `node_count`s sum to `ids.len()` and no run is empty. An empty sequence
/// produces no runs. Runs clipped only by the viewport have a zero size.
pub fn cull_visible_nodes(
    absolute_offsets: &[Point],
    sizes: &[Size],
    flags: &[NodeFlags],
    ids: &[u32],
    counts: &[u32],
    viewport: Size,
    visible_mask: &mut [bool],
    clip_rects: &mut Vec<ClipRect>,
) {
    clip_rects.clear();
    if ids.is_empty() {
        return;
    }

    struct ClipFrame {
        rect: Rect,
        output: ClipRect,
        end: usize,
    }

    fn begin(clip_rects: &mut Vec<ClipRect>, offset: Point, size: Size) {
        match clip_rects.last_mut() {
            Some(last) if last.node_count == 0 => {
                last.offset = offset;
                last.size = size;
            }
            _ => clip_rects.push(ClipRect {
                offset,
                size,
                node_count: 0,
            }),
        }
    }

    let mut stack: SmallVec<[ClipFrame; 16]> = SmallVec::new();
    stack.push(ClipFrame {
        rect: Rect::from_origin_size(Point::ZERO, viewport),
        output: ClipRect::default(),
        end: ids.len(),
    });
    begin(clip_rects, Point::ZERO, Size::ZERO);

    let mut i = 0;
    while i < ids.len() {
        while stack.len() > 1 && stack.last().is_some_and(|top| top.end <= i) {
            stack.pop();
            if let Some(top) = stack.last() {
                begin(clip_rects, top.output.offset, top.output.size);
            }
        }
        let Some(top) = stack.last() else {
            break;
        };
        let clip = top.rect;

        let id = ids[i] as usize;
        let rect = Rect::from_origin_size(absolute_offsets[id], sizes[id]);
        let visible = rects_overlap(rect, clip);
        let subtree = counts[i] as usize;

        if flags[id].contains(NodeFlags::CLIP) && !visible {
            for &hidden in &ids[i..=i + subtree] {
                visible_mask[hidden as usize] = false;
            }
            #[allow(
                clippy::cast_possible_truncation,
                reason = "Sequence length is bounded by the 20-bit node index space."
            )]
            let skipped = subtree as u32 + 1;
            if let Some(last) = clip_rects.last_mut() {
                last.node_count += skipped;
            }
            i += subtree + 1;
            continue;
        }

        visible_mask[id] = visible;
        if let Some(last) = clip_rects.last_mut() {
            last.node_count += 1;
        }
        if visible && subtree > 0 && flags[id].contains(NodeFlags::CLIP) {
            let inner = rect.intersect(clip);
            let output = ClipRect {
                offset: inner.origin(),
                size: inner.size(),
                node_count: 0,
            };
            begin(clip_rects, output.offset, output.size);
            stack.push(ClipFrame {
                rect: inner,
                output,
                end: i + 1 + subtree,
            });
        }
        i += 1;
    }
}

/// Derived visibility state of a [`Tree`].
///
/// Recomputed in two stages so layout-only changes stay cheap:
///
/// - [`rebuild_sequence`](Self::rebuild_sequence) after structural, flag or
///   order changes: rebuilds the children index, the visible sequence and
///   the inherited enabled/event/blur masks.
/// - [`cull`](Self::cull) after offset, size or viewport changes: resolves
///   absolute offsets, the visible mask and the clip list.
///
/// `cull` must follow every `rebuild_sequence`.
#[derive(Clone, Default)]
pub struct Composition {
    parents: Vec<u32>,
    children_offsets: Vec<u32>,
    children: Vec<u32>,
    visible_ids: Vec<u32>,
    visible_counts: Vec<u32>,
    visible_handles: Vec<NodeHandle>,
    positions: Vec<u32>,
    absolute_offsets: Vec<Point>,
    visible_mask: Vec<bool>,
    enabled_mask: Vec<bool>,
    event_flag_mask: Vec<bool>,
    event_mask: Vec<bool>,
    blur_mask: Vec<bool>,
    clip_rects: Vec<ClipRect>,
    clip_rect_ids: Vec<u32>,
    viewport: Size,
}

impl core::fmt::Debug for Composition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Composition")
            .field("sequence_len", &self.visible_ids.len())
            .field("clip_rects", &self.clip_rects.len())
            .field("viewport", &self.viewport)
            .finish_non_exhaustive()
    }
}

impl Composition {
    /// Create an empty composition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the visible sequence and the flag-derived masks from `tree`.
    pub fn rebuild_sequence(&mut self, tree: &Tree) {
        let n = tree.node_capacity();

        self.parents.clear();
        self.parents.extend((0..n).map(|i| {
            #[allow(
                clippy::cast_possible_truncation,
                reason = "Node slots are bounded by the 20-bit node index space."
            )]
            let live = tree.nodes.handle_at(i as u32);
            match live.and(tree.parent[i]) {
                Some(p) if tree.nodes.is_valid(p) => p.index(),
                _ => NO_NODE,
            }
        }));

        self.children_offsets.clear();
        self.children_offsets.resize(n + 2, 0);
        self.children.clear();
        self.children.resize(n, 0);
        children_index(&self.parents, &mut self.children_offsets, &mut self.children);
        self.children_offsets.truncate(n + 1);

        order_visible_nodes(
            tree.first_order,
            &tree.order_next,
            &tree.flags,
            &self.children_offsets,
            &self.children,
            &mut self.visible_ids,
            &mut self.visible_counts,
        );

        self.positions.clear();
        self.positions.resize(n, NO_NODE);
        self.visible_handles.clear();
        for (position, &id) in self.visible_ids.iter().enumerate() {
            #[allow(
                clippy::cast_possible_truncation,
                reason = "Sequence length is bounded by the 20-bit node index space."
            )]
            let position = position as u32;
            self.positions[id as usize] = position;
            self.visible_handles
                .push(tree.nodes.handle_at(id).unwrap_or(NodeHandle::NULL));
        }

        for mask in [
            &mut self.enabled_mask,
            &mut self.event_flag_mask,
            &mut self.blur_mask,
        ] {
            mask.clear();
            mask.resize(n, false);
            for &id in &self.visible_ids {
                mask[id as usize] = true;
            }
        }
        let flags = &tree.flags;
        propagate_flag_to_children(
            NodeFlags::DISABLED,
            flags,
            &self.visible_ids,
            &self.visible_counts,
            &mut self.enabled_mask,
        );
        propagate_flag_to_children(
            NodeFlags::DISABLED | NodeFlags::NO_EVENTS,
            flags,
            &self.visible_ids,
            &self.visible_counts,
            &mut self.event_flag_mask,
        );
        propagate_flag_to_children(
            NodeFlags::NO_BLUR,
            flags,
            &self.visible_ids,
            &self.visible_counts,
            &mut self.blur_mask,
        );
    }

    /// Recompute absolute offsets, visibility and clip rectangles for `viewport`.
    pub fn cull(&mut self, tree: &Tree, viewport: Size) {
        let n = self.parents.len();
        self.viewport = viewport;

        self.absolute_offsets.clear();
        self.absolute_offsets.resize(n, Point::ZERO);
        absolute_offsets(
            &self.parents,
            &tree.offset,
            &self.visible_ids,
            &mut self.absolute_offsets,
        );

        self.visible_mask.clear();
        self.visible_mask.resize(n, false);
        cull_visible_nodes(
            &self.absolute_offsets,
            &tree.size,
            &tree.flags,
            &self.visible_ids,
            &self.visible_counts,
            viewport,
            &mut self.visible_mask,
            &mut self.clip_rects,
        );

        self.event_mask.clear();
        self.event_mask.extend(
            self.visible_mask
                .iter()
                .zip(&self.event_flag_mask)
                .map(|(visible, events)| *visible && *events),
        );

        self.clip_rect_ids.clear();
        for (index, clip) in self.clip_rects.iter().enumerate() {
            #[allow(
                clippy::cast_possible_truncation,
                reason = "Clip rect count never exceeds the sequence length."
            )]
            let index = index as u32;
            self.clip_rect_ids
                .extend(core::iter::repeat_n(index, clip.node_count as usize));
        }
    }

    /// Node slots of the visible sequence, depth-first pre-order.
    pub fn visible_node_ids(&self) -> &[u32] {
        &self.visible_ids
    }

    /// Handles of the visible sequence, parallel to [`visible_node_ids`](Self::visible_node_ids).
    pub fn visible_node_handles(&self) -> &[NodeHandle] {
        &self.visible_handles
    }

    /// For each sequence position, how many following entries belong to that node's subtree.
    pub fn visible_children_counts(&self) -> &[u32] {
        &self.visible_counts
    }

    /// Absolute offsets per node slot; only entries of sequence nodes are meaningful.
    pub fn absolute_offsets(&self) -> &[Point] {
        &self.absolute_offsets
    }

    /// Per node slot: in the sequence and overlapping its clip.
    pub fn visible_mask(&self) -> &[bool] {
        &self.visible_mask
    }

    /// Per node slot: in the sequence and without a `DISABLED` node on its ancestor chain.
    pub fn enabled_mask(&self) -> &[bool] {
        &self.enabled_mask
    }

    /// Per node slot: visible and without a `DISABLED` or `NO_EVENTS` node on its ancestor chain.
    pub fn event_mask(&self) -> &[bool] {
        &self.event_mask
    }

    /// Per node slot: in the sequence and without a `NO_BLUR` node on its ancestor chain.
    pub fn blur_mask(&self) -> &[bool] {
        &self.blur_mask
    }

    /// Clip runs covering the visible sequence.
    pub fn clip_rects(&self) -> &[ClipRect] {
        &self.clip_rects
    }

    /// For each sequence position, the index of the clip run covering it.
    pub fn clip_rect_ids(&self) -> &[u32] {
        &self.clip_rect_ids
    }

    /// Viewport passed to the last [`cull`](Self::cull).
    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Position of `node` in the visible sequence, if it's there.
    pub fn position(&self, node: NodeHandle) -> Option<usize> {
        let position = *self.positions.get(node.index() as usize)?;
        if position == NO_NODE || self.visible_handles[position as usize] != node {
            return None;
        }
        Some(position as usize)
    }

    /// Whether `node` is in the visible sequence and overlaps its clip.
    pub fn is_node_visible(&self, node: NodeHandle) -> bool {
        self.position(node)
            .is_some_and(|_| self.visible_mask[node.index() as usize])
    }

    /// Whether `node` is visible and can receive pointer events.
    pub fn is_node_event_enabled(&self, node: NodeHandle) -> bool {
        self.position(node)
            .is_some_and(|_| self.event_mask[node.index() as usize])
    }

    /// Absolute rectangle of a node of the sequence.
    pub fn node_rect(&self, tree: &Tree, node: NodeHandle) -> Option<Rect> {
        self.position(node)?;
        let id = node.index() as usize;
        Some(Rect::from_origin_size(
            self.absolute_offsets[id],
            tree.size[id],
        ))
    }

    /// Clip in effect at sequence `position`, resolved against the viewport.
    pub fn clip_at(&self, position: usize) -> Option<Rect> {
        let clip = *self.clip_rect_ids.get(position)?;
        Some(self.clip_rects[clip as usize].resolve(self.viewport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn node(
        tree: &mut Tree,
        parent: Option<NodeHandle>,
        offset: (f64, f64),
        size: (f64, f64),
        flags: NodeFlags,
    ) -> NodeHandle {
        tree.create_node(
            parent,
            Point::new(offset.0, offset.1),
            Size::new(size.0, size.1),
            flags,
        )
        .unwrap()
    }

    fn compose(tree: &Tree, viewport: Size) -> Composition {
        let mut c = Composition::new();
        c.rebuild_sequence(tree);
        c.cull(tree, viewport);
        c
    }

    fn covered(c: &Composition) -> usize {
        c.clip_rects().iter().map(|r| r.node_count as usize).sum()
    }

    #[test]
    fn children_index_is_stable() {
        //   0      3
        //  / \     |
        // 1   2    4
        let parents = [NO_NODE, 0, 0, NO_NODE, 3, NO_NODE];
        let mut offsets = vec![0; parents.len() + 2];
        let mut children = vec![0; parents.len()];
        children_index(&parents, &mut offsets, &mut children);
        assert_eq!(&offsets[..parents.len() + 1], &[0, 2, 2, 2, 3, 3, 3]);
        assert_eq!(&children[..3], &[1, 2, 4]);
    }

    #[test]
    fn empty_order_yields_empty_sequence() {
        let mut tree = Tree::new();
        let a = node(&mut tree, None, (0., 0.), (10., 10.), NodeFlags::empty());
        tree.clear_node_order(a).unwrap();
        let c = compose(&tree, Size::new(100., 100.));
        assert!(c.visible_node_ids().is_empty());
        assert!(c.clip_rects().is_empty());
        assert!(!c.is_node_visible(a));
    }

    #[test]
    fn sequence_follows_order_list_and_skips_hidden_subtrees() {
        let mut tree = Tree::new();
        let a = node(&mut tree, None, (0., 0.), (10., 10.), NodeFlags::empty());
        let b = node(&mut tree, None, (0., 0.), (10., 10.), NodeFlags::empty());
        let a1 = node(&mut tree, Some(a), (0., 0.), (1., 1.), NodeFlags::empty());
        let a2 = node(&mut tree, Some(a), (0., 0.), (1., 1.), NodeFlags::HIDDEN);
        let _a2x = node(&mut tree, Some(a2), (0., 0.), (1., 1.), NodeFlags::empty());
        let a11 = node(&mut tree, Some(a1), (0., 0.), (1., 1.), NodeFlags::empty());
        let hidden_root = node(&mut tree, None, (0., 0.), (10., 10.), NodeFlags::HIDDEN);
        let _ = node(&mut tree, Some(hidden_root), (0., 0.), (1., 1.), NodeFlags::empty());
        tree.set_node_order(b, Some(a)).unwrap();

        let c = compose(&tree, Size::new(100., 100.));
        let ids: Vec<u32> = [b, a, a1, a11].iter().map(|n| n.index()).collect();
        assert_eq!(c.visible_node_ids(), ids.as_slice());
        assert_eq!(c.visible_children_counts(), &[0, 2, 1, 0]);
        assert_eq!(c.visible_node_handles(), &[b, a, a1, a11]);
        assert_eq!(c.position(a11), Some(3));
        assert_eq!(c.position(a2), None);
    }

    #[test]
    fn dangling_nodes_are_never_visible() {
        let mut tree = Tree::new();
        let a = node(&mut tree, None, (0., 0.), (10., 10.), NodeFlags::empty());
        let child = node(&mut tree, Some(a), (0., 0.), (5., 5.), NodeFlags::empty());
        tree.remove_node(a).unwrap();
        // Reuse the parent's slot for a fresh root.
        let fresh = node(&mut tree, None, (0., 0.), (10., 10.), NodeFlags::empty());
        let c = compose(&tree, Size::new(100., 100.));
        assert_eq!(c.visible_node_handles(), &[fresh]);
        assert!(!c.is_node_visible(child));
    }

    #[test]
    fn inherited_masks() {
        let mut tree = Tree::new();
        let root = node(&mut tree, None, (0., 0.), (50., 50.), NodeFlags::NO_EVENTS);
        let inner = node(&mut tree, Some(root), (0., 0.), (10., 10.), NodeFlags::empty());
        let other = node(&mut tree, None, (0., 0.), (50., 50.), NodeFlags::DISABLED);
        let other_child = node(&mut tree, Some(other), (0., 0.), (10., 10.), NodeFlags::NO_BLUR);
        let c = compose(&tree, Size::new(100., 100.));

        let at = |mask: &[bool], n: NodeHandle| mask[n.index() as usize];
        assert!(!at(c.event_mask(), root) && !at(c.event_mask(), inner));
        assert!(at(c.enabled_mask(), inner));
        assert!(!at(c.enabled_mask(), other_child) && !at(c.event_mask(), other_child));
        assert!(at(c.blur_mask(), other) && !at(c.blur_mask(), other_child));
        assert!(c.is_node_visible(inner) && !c.is_node_event_enabled(inner));
    }

    #[test]
    fn absolute_offsets_accumulate() {
        let mut tree = Tree::new();
        let a = node(&mut tree, None, (10., 20.), (50., 50.), NodeFlags::empty());
        let b = node(&mut tree, Some(a), (1., 2.), (5., 5.), NodeFlags::empty());
        let c = node(&mut tree, Some(b), (3., 3.), (1., 1.), NodeFlags::empty());
        let comp = compose(&tree, Size::new(100., 100.));
        assert_eq!(comp.absolute_offsets()[c.index() as usize], Point::new(14., 25.));
        assert_eq!(
            comp.node_rect(&tree, b),
            Some(Rect::new(11., 22., 16., 27.))
        );
    }

    #[test]
    fn zero_size_clip_parent_hides_all_descendants() {
        let mut tree = Tree::new();
        let clip = node(&mut tree, None, (0., 0.), (0., 0.), NodeFlags::CLIP);
        let a = node(&mut tree, Some(clip), (0., 0.), (50., 50.), NodeFlags::empty());
        let b = node(&mut tree, Some(a), (5., 5.), (10., 10.), NodeFlags::empty());
        let c = compose(&tree, Size::new(100., 100.));
        assert_eq!(c.visible_node_ids().len(), 3);
        assert!(!c.is_node_visible(clip));
        assert!(!c.is_node_visible(a));
        assert!(!c.is_node_visible(b));
        assert_eq!(covered(&c), 3);
    }

    #[test]
    fn non_clipping_invisible_parent_keeps_visible_children() {
        let mut tree = Tree::new();
        let outside = node(&mut tree, None, (-100., 0.), (10., 10.), NodeFlags::empty());
        let child = node(&mut tree, Some(outside), (110., 0.), (10., 10.), NodeFlags::empty());
        let c = compose(&tree, Size::new(100., 100.));
        assert!(!c.is_node_visible(outside));
        assert!(c.is_node_visible(child));
        assert_eq!(c.clip_rects().len(), 1);
        assert!(c.clip_rects()[0].is_unclipped());
    }

    #[test]
    fn nested_clips_resume_parent_clip() {
        // root (clip 0..100)
        // ├─ panel (clip 50..150 -> 50..100)
        // │  └─ item (60..70) visible
        // │  └─ far  (100..120) culled by panel clip
        // └─ after (0..10) back under root clip
        let mut tree = Tree::new();
        let root = node(&mut tree, None, (0., 0.), (100., 100.), NodeFlags::CLIP);
        let panel = node(&mut tree, Some(root), (50., 50.), (100., 100.), NodeFlags::CLIP);
        let item = node(&mut tree, Some(panel), (10., 10.), (10., 10.), NodeFlags::empty());
        let far = node(&mut tree, Some(panel), (50., 50.), (20., 20.), NodeFlags::empty());
        let after = node(&mut tree, Some(root), (0., 0.), (10., 10.), NodeFlags::empty());
        let c = compose(&tree, Size::new(200., 200.));

        assert!(c.is_node_visible(item));
        assert!(!c.is_node_visible(far));
        assert!(c.is_node_visible(after));
        assert_eq!(
            c.clip_rects(),
            &[
                ClipRect {
                    offset: Point::ZERO,
                    size: Size::ZERO,
                    node_count: 1
                },
                ClipRect {
                    offset: Point::ZERO,
                    size: Size::new(100., 100.),
                    node_count: 1
                },
                ClipRect {
                    offset: Point::new(50., 50.),
                    size: Size::new(50., 50.),
                    node_count: 2
                },
                ClipRect {
                    offset: Point::ZERO,
                    size: Size::new(100., 100.),
                    node_count: 1
                },
            ]
        );
        assert_eq!(c.clip_rect_ids(), &[0, 1, 2, 2, 3]);
        assert_eq!(c.clip_at(3), Some(Rect::new(50., 50., 100., 100.)));
        assert_eq!(c.clip_at(0), Some(Rect::new(0., 0., 200., 200.)));
    }

    #[test]
    fn culled_clip_subtree_extends_current_run() {
        let mut tree = Tree::new();
        let a = node(&mut tree, None, (0., 0.), (10., 10.), NodeFlags::empty());
        let gone = node(&mut tree, None, (500., 0.), (10., 10.), NodeFlags::CLIP);
        let _ = node(&mut tree, Some(gone), (0., 0.), (5., 5.), NodeFlags::empty());
        let b = node(&mut tree, None, (0., 0.), (10., 10.), NodeFlags::empty());
        let c = compose(&tree, Size::new(100., 100.));
        assert!(c.is_node_visible(a) && c.is_node_visible(b));
        assert_eq!(c.clip_rects().len(), 1);
        assert_eq!(c.clip_rects()[0].node_count, 4);
    }

    #[test]
    fn clip_coverage_sums_to_sequence_length() {
        let mut tree = Tree::new();
        for r in 0..5 {
            let f = if r % 2 == 0 { NodeFlags::CLIP } else { NodeFlags::empty() };
            let root = node(&mut tree, None, (f64::from(r) * 30., 0.), (40., 40.), f);
            let mut parent = root;
            for d in 0..4 {
                let flags = if d % 2 == 1 { NodeFlags::CLIP } else { NodeFlags::empty() };
                parent = node(&mut tree, Some(parent), (5., 5.), (30., 30.), flags);
                let _ = node(&mut tree, Some(parent), (-10., 0.), (8., 8.), NodeFlags::empty());
            }
        }
        for viewport in [Size::new(60., 60.), Size::new(500., 500.), Size::ZERO] {
            let c = compose(&tree, viewport);
            assert_eq!(covered(&c), c.visible_node_ids().len());
            assert!(c.clip_rects().iter().all(|r| r.node_count > 0));
            assert_eq!(c.clip_rect_ids().len(), c.visible_node_ids().len());
        }
    }

    #[test]
    fn deep_hierarchy_does_not_overflow() {
        let mut tree = Tree::new();
        let root = node(&mut tree, None, (0., 0.), (10., 10.), NodeFlags::CLIP);
        let mut last = root;
        for _ in 0..100_000 {
            last = node(&mut tree, Some(last), (0., 0.), (10., 10.), NodeFlags::CLIP);
        }
        let c = compose(&tree, Size::new(100., 100.));
        assert_eq!(c.visible_node_ids().len(), 100_001);
        assert_eq!(c.visible_children_counts()[0], 100_000);
        assert!(c.is_node_visible(last));
        assert_eq!(covered(&c), 100_001);
    }
}
