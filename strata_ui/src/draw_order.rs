// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-layer update lists and back-to-front draw ranges.
//!
//! Given a culled [`Composition`] and the node attachments of each layer,
//! [`DrawOrder::build`] produces for every layer:
//!
//! - the list of its visible data, in visible-sequence order and, for data
//!   sharing a node, in attachment order,
//! - [`ClipRectRef`]s splitting that list into runs sharing one clip
//!   rectangle, never spanning two top-level nodes,
//!
//! and one [`Draw`] per top-level node and drawing layer, in order-list order
//! and layer registration order. Empty draws are dropped by
//! [`compact_draws_in_place`].

use alloc::vec::Vec;

use strata_handle::{LayerHandle, NodeHandle};
use strata_tree::{Composition, Tree};

/// A run of a layer's data list sharing one clip rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClipRectRef {
    /// Index into [`Composition::clip_rects`].
    pub clip_rect: u32,
    /// Number of consecutive data entries the clip applies to.
    pub data_count: u32,
}

/// One draw call: a contiguous range of a layer's data list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Draw {
    /// Layer to call.
    pub layer: LayerHandle,
    /// First entry of the layer's data list.
    pub offset: u32,
    /// Number of entries.
    pub count: u32,
    /// First entry of the layer's clip run list.
    pub clip_rect_offset: u32,
    /// Number of clip runs, whose data counts sum to `count`.
    pub clip_rect_count: u32,
}

/// Attachment input for one layer, see [`DrawOrder::build`].
#[derive(Clone, Copy, Debug)]
pub struct LayerAttachments<'a> {
    /// The layer.
    pub layer: LayerHandle,
    /// Whether the layer draws. Non-drawing layers get lists but no [`Draw`]s.
    pub draws: bool,
    /// Node of each data slot of the layer, `None` if detached or free.
    pub data_nodes: &'a [Option<NodeHandle>],
}

/// Lists produced for one layer.
#[derive(Clone, Debug, Default)]
pub struct LayerOrder {
    data_ids: Vec<u32>,
    node_ids: Vec<u32>,
    clip_rect_refs: Vec<ClipRectRef>,
    node_data_offsets: Vec<u32>,
    node_data: Vec<u32>,
}

impl LayerOrder {
    /// Visible data, back to front.
    pub fn data_ids(&self) -> &[u32] {
        &self.data_ids
    }

    /// Node slot of each entry of [`data_ids`](Self::data_ids).
    pub fn node_ids(&self) -> &[u32] {
        &self.node_ids
    }

    /// Clip runs over [`data_ids`](Self::data_ids).
    pub fn clip_rect_refs(&self) -> &[ClipRectRef] {
        &self.clip_rect_refs
    }

    /// Every data attached to the live node in slot `node`, visible or not,
    /// in increasing data id order.
    pub fn node_data(&self, node: u32) -> &[u32] {
        let node = node as usize;
        match (
            self.node_data_offsets.get(node),
            self.node_data_offsets.get(node + 1),
        ) {
            (Some(&start), Some(&end)) => &self.node_data[start as usize..end as usize],
            _ => &[],
        }
    }

    fn clear(&mut self) {
        self.data_ids.clear();
        self.node_ids.clear();
        self.clip_rect_refs.clear();
        self.node_data_offsets.clear();
        self.node_data.clear();
    }

    /// Group the layer's data by node slot: counting pass, prefix sum, fill.
    fn index_node_data(&mut self, tree: &Tree, data_nodes: &[Option<NodeHandle>]) {
        let n = tree.node_capacity();
        let offsets = &mut self.node_data_offsets;
        offsets.resize(n + 2, 0);
        for (_, node) in attached(tree, data_nodes) {
            offsets[node.index() as usize + 2] += 1;
        }
        for i in 1..offsets.len() {
            offsets[i] += offsets[i - 1];
        }
        self.node_data.resize(offsets[n + 1] as usize, 0);
        for (data, node) in attached(tree, data_nodes) {
            let cursor = &mut offsets[node.index() as usize + 1];
            #[allow(
                clippy::cast_possible_truncation,
                reason = "Data slots are bounded by the 20-bit data index space."
            )]
            let data = data as u32;
            self.node_data[*cursor as usize] = data;
            *cursor += 1;
        }
        offsets.truncate(n + 1);
    }
}

/// Data slots attached to a live node.
fn attached<'a>(
    tree: &'a Tree,
    data_nodes: &'a [Option<NodeHandle>],
) -> impl Iterator<Item = (usize, NodeHandle)> + 'a {
    data_nodes
        .iter()
        .enumerate()
        .filter_map(move |(data, node)| node.filter(|n| tree.is_alive(*n)).map(|n| (data, n)))
}

/// Drop draws with a zero count, keeping the others in order.
///
/// Returns the number of draws kept; they occupy the front of `draws`.
pub fn compact_draws_in_place(draws: &mut [Draw]) -> usize {
    let mut kept = 0;
    for i in 0..draws.len() {
        if draws[i].count != 0 {
            draws[kept] = draws[i];
            kept += 1;
        }
    }
    kept
}

/// Update lists and draw ranges for all layers.
#[derive(Clone, Debug, Default)]
pub struct DrawOrder {
    layers: Vec<LayerOrder>,
    draws: Vec<Draw>,
}

impl DrawOrder {
    /// Create an empty draw order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild everything from a culled composition.
    ///
    /// `layers` must be in registration order. Only nodes that are in the
    /// visible sequence *and* not culled contribute data.
    pub fn build(
        &mut self,
        tree: &Tree,
        composition: &Composition,
        layers: &[LayerAttachments<'_>],
    ) {
        for order in &mut self.layers {
            order.clear();
        }
        self.draws.clear();
        let slots = layers
            .iter()
            .map(|l| l.layer.index() as usize + 1)
            .max()
            .unwrap_or(0);
        if self.layers.len() < slots {
            self.layers.resize_with(slots, LayerOrder::default);
        }
        for input in layers {
            self.layers[input.layer.index() as usize].index_node_data(tree, input.data_nodes);
        }

        let ids = composition.visible_node_ids();
        let counts = composition.visible_children_counts();
        let visible = composition.visible_mask();
        let clip_ids = composition.clip_rect_ids();

        let mut top = 0;
        while top < ids.len() {
            let end = top + counts[top] as usize + 1;
            for input in layers {
                let order = &mut self.layers[input.layer.index() as usize];
                let offset = order.data_ids.len();
                let clip_offset = order.clip_rect_refs.len();
                for position in top..end {
                    let id = ids[position];
                    if !visible[id as usize] {
                        continue;
                    }
                    let start = order.node_data_offsets[id as usize] as usize;
                    let stop = order.node_data_offsets[id as usize + 1] as usize;
                    if start == stop {
                        continue;
                    }
                    order
                        .data_ids
                        .extend_from_slice(&order.node_data[start..stop]);
                    order
                        .node_ids
                        .extend(core::iter::repeat_n(id, stop - start));

                    #[allow(
                        clippy::cast_possible_truncation,
                        reason = "Data slots are bounded by the 20-bit data index space."
                    )]
                    let added = (stop - start) as u32;
                    let clip = clip_ids[position];
                    let continues_run = order.clip_rect_refs.len() > clip_offset;
                    match order.clip_rect_refs.last_mut() {
                        Some(last) if continues_run && last.clip_rect == clip => {
                            last.data_count += added;
                        }
                        _ => order.clip_rect_refs.push(ClipRectRef {
                            clip_rect: clip,
                            data_count: added,
                        }),
                    }
                }
                if input.draws {
                    #[allow(
                        clippy::cast_possible_truncation,
                        reason = "List lengths are bounded by the 20-bit data index space."
                    )]
                    let draw = Draw {
                        layer: input.layer,
                        offset: offset as u32,
                        count: (order.data_ids.len() - offset) as u32,
                        clip_rect_offset: clip_offset as u32,
                        clip_rect_count: (order.clip_rect_refs.len() - clip_offset) as u32,
                    };
                    self.draws.push(draw);
                }
            }
            top = end;
        }

        let kept = compact_draws_in_place(&mut self.draws);
        self.draws.truncate(kept);
    }

    /// Lists of `layer`, if it took part in the last build.
    pub fn layer(&self, layer: LayerHandle) -> Option<&LayerOrder> {
        self.layers.get(layer.index() as usize)
    }

    /// Non-empty draws, back to front.
    pub fn draws(&self) -> &[Draw] {
        &self.draws
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use kurbo::{Point, Size};
    use strata_handle::{HandlePool, LayerKind};
    use strata_tree::NodeFlags;

    fn draw(layer: LayerHandle, offset: u32, count: u32) -> Draw {
        Draw {
            layer,
            offset,
            count,
            clip_rect_offset: 0,
            clip_rect_count: 0,
        }
    }

    #[test]
    fn compaction_keeps_non_empty_in_order() {
        let mut pool = HandlePool::<LayerKind>::new();
        let a = pool.create().unwrap();
        let b = pool.create().unwrap();
        let mut draws = vec![
            draw(a, 0, 3),
            draw(b, 0, 0),
            draw(a, 3, 1),
            draw(b, 0, 0),
            draw(b, 0, 2),
        ];
        let kept = compact_draws_in_place(&mut draws);
        assert_eq!(kept, 3);
        assert_eq!(&draws[..kept], &[draw(a, 0, 3), draw(a, 3, 1), draw(b, 0, 2)]);
    }

    struct Scene {
        tree: Tree,
        composition: Composition,
        layers: HandlePool<LayerKind>,
    }

    impl Scene {
        fn new() -> Self {
            Self {
                tree: Tree::new(),
                composition: Composition::new(),
                layers: HandlePool::new(),
            }
        }

        fn node(&mut self, parent: Option<NodeHandle>, x: f64, flags: NodeFlags) -> NodeHandle {
            self.tree
                .create_node(parent, Point::new(x, 0.), Size::new(10., 10.), flags)
                .unwrap()
        }

        fn compose(&mut self) {
            self.composition.rebuild_sequence(&self.tree);
            self.composition.cull(&self.tree, Size::new(100., 100.));
        }
    }

    #[test]
    fn lists_follow_visible_sequence_then_attachment_order() {
        let mut s = Scene::new();
        let a = s.node(None, 0., NodeFlags::empty());
        let b = s.node(None, 20., NodeFlags::empty());
        let a1 = s.node(Some(a), 0., NodeFlags::empty());
        let culled = s.node(None, 500., NodeFlags::empty());
        s.tree.set_node_order(b, Some(a)).unwrap();
        s.compose();

        let layer = s.layers.create().unwrap();
        // data 0 -> a1, 1 -> a, 2 -> b, 3 -> a, 4 -> culled, 5 -> detached
        let data_nodes = [Some(a1), Some(a), Some(b), Some(a), Some(culled), None];
        let mut order = DrawOrder::new();
        order.build(
            &s.tree,
            &s.composition,
            &[LayerAttachments {
                layer,
                draws: true,
                data_nodes: &data_nodes,
            }],
        );

        let lists = order.layer(layer).unwrap();
        assert_eq!(lists.data_ids(), &[2, 1, 3, 0]);
        assert_eq!(
            lists.node_ids(),
            &[b.index(), a.index(), a.index(), a1.index()]
        );
        assert_eq!(lists.node_data(culled.index()), &[4]);
        assert_eq!(order.draws(), &[
            Draw {
                layer,
                offset: 0,
                count: 1,
                clip_rect_offset: 0,
                clip_rect_count: 1
            },
            Draw {
                layer,
                offset: 1,
                count: 3,
                clip_rect_offset: 1,
                clip_rect_count: 1
            },
        ]);
        // Same clip rect, but split at the top-level boundary.
        assert_eq!(lists.clip_rect_refs(), &[
            ClipRectRef {
                clip_rect: 0,
                data_count: 1
            },
            ClipRectRef {
                clip_rect: 0,
                data_count: 3
            },
        ]);
    }

    #[test]
    fn draws_interleave_layers_per_top_level_node() {
        let mut s = Scene::new();
        let a = s.node(None, 0., NodeFlags::empty());
        let b = s.node(None, 20., NodeFlags::empty());
        s.compose();

        let back = s.layers.create().unwrap();
        let events_only = s.layers.create().unwrap();
        let front = s.layers.create().unwrap();
        let back_nodes = [Some(a), Some(b)];
        let events_nodes = [Some(a), Some(b)];
        let front_nodes = [Some(b)];
        let mut order = DrawOrder::new();
        order.build(
            &s.tree,
            &s.composition,
            &[
                LayerAttachments {
                    layer: back,
                    draws: true,
                    data_nodes: &back_nodes,
                },
                LayerAttachments {
                    layer: events_only,
                    draws: false,
                    data_nodes: &events_nodes,
                },
                LayerAttachments {
                    layer: front,
                    draws: true,
                    data_nodes: &front_nodes,
                },
            ],
        );

        let layers: Vec<_> = order.draws().iter().map(|d| d.layer).collect();
        // `a` has nothing on `front`, so that draw is compacted away.
        assert_eq!(layers, vec![back, back, front]);
        assert_eq!(order.layer(events_only).unwrap().data_ids(), &[0, 1]);
    }

    #[test]
    fn clip_runs_split_on_clip_change() {
        let mut s = Scene::new();
        let root = s
            .tree
            .create_node(None, Point::ZERO, Size::new(50., 50.), NodeFlags::CLIP)
            .unwrap();
        let inner = s.node(Some(root), 0., NodeFlags::empty());
        s.compose();

        let layer = s.layers.create().unwrap();
        let data_nodes = [Some(root), Some(inner), Some(inner)];
        let mut order = DrawOrder::new();
        order.build(
            &s.tree,
            &s.composition,
            &[LayerAttachments {
                layer,
                draws: true,
                data_nodes: &data_nodes,
            }],
        );
        let lists = order.layer(layer).unwrap();
        assert_eq!(lists.clip_rect_refs(), &[
            ClipRectRef {
                clip_rect: 0,
                data_count: 1
            },
            ClipRectRef {
                clip_rect: 1,
                data_count: 2
            },
        ]);
        assert_eq!(order.draws()[0].clip_rect_count, 2);
        assert_eq!(order.draws()[0].count, 3);
    }

    #[test]
    fn data_of_removed_nodes_is_ignored() {
        let mut s = Scene::new();
        let a = s.node(None, 0., NodeFlags::empty());
        let b = s.node(None, 0., NodeFlags::empty());
        s.tree.remove_node(b).unwrap();
        s.compose();
        let layer = s.layers.create().unwrap();
        let data_nodes = [Some(b), Some(a)];
        let mut order = DrawOrder::new();
        order.build(
            &s.tree,
            &s.composition,
            &[LayerAttachments {
                layer,
                draws: true,
                data_nodes: &data_nodes,
            }],
        );
        assert_eq!(order.layer(layer).unwrap().data_ids(), &[1]);
        assert!(order.layer(layer).unwrap().node_data(b.index()).is_empty());
    }
}
