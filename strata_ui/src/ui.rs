// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The owning [`Ui`]: node, layer, data and animator bookkeeping plus the
//! dirty-state machine that schedules recomputation.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::Any;
use core::time::Duration;

use hashbrown::HashMap;
use kurbo::{Point, Size};
use log::{debug, trace};
use smallvec::SmallVec;
use strata_handle::{AnimatorHandle, DataHandle, LayerHandle, NodeHandle};
use strata_tree::{Composition, NodeFlags, Tree};

use crate::animator::{Animator, AnimatorContext, AnimatorRegistry};
use crate::draw_order::{DrawOrder, LayerAttachments};
use crate::error::UiError;
use crate::event::PointerId;
use crate::layer::{Layer, LayerDraw, LayerFeatures, LayerUpdate};
use crate::registry::LayerRegistry;
use crate::router::PointerState;

bitflags::bitflags! {
    /// Work pending before the next draw or event dispatch.
    ///
    /// The flags nest: each coarser state includes every finer one, so
    /// handling a coarse state also covers the work the finer ones stand for.
    ///
    /// ```text
    /// NEEDS_NODE_CLEAN ⊃ NEEDS_NODE_UPDATE ⊃ NEEDS_LAYOUT_UPDATE
    ///     ⊃ NEEDS_DATA_ATTACHMENT_UPDATE ⊃ NEEDS_DATA_UPDATE
    /// NEEDS_NODE_CLEAN ⊃ NEEDS_DATA_CLEAN
    /// ```
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct UiState: u8 {
        /// Some layers need an update call, with unchanged data lists.
        const NEEDS_DATA_UPDATE = 1 << 0;
        /// Data were created, removed or re-attached; draw order is stale.
        const NEEDS_DATA_ATTACHMENT_UPDATE = Self::NEEDS_DATA_UPDATE.bits() | 1 << 1;
        /// Node offsets, sizes or the UI size changed; culling is stale.
        const NEEDS_LAYOUT_UPDATE = Self::NEEDS_DATA_ATTACHMENT_UPDATE.bits() | 1 << 2;
        /// Nodes were added, reordered or had flags changed; the visible
        /// sequence is stale.
        const NEEDS_NODE_UPDATE = Self::NEEDS_LAYOUT_UPDATE.bits() | 1 << 3;
        /// Data attached to removed nodes need pruning.
        const NEEDS_DATA_CLEAN = 1 << 4;
        /// Nodes were removed; their descendants need sweeping.
        const NEEDS_NODE_CLEAN = Self::NEEDS_NODE_UPDATE.bits() | Self::NEEDS_DATA_CLEAN.bits() | 1 << 5;
    }
}

/// A retained-mode user interface.
///
/// Owns the node [`Tree`], the registered [`Layer`]s and their data, the
/// [`Animator`]s, and the per-pointer event state. Mutations only mark
/// [`UiState`]; the work happens in [`update`](Self::update), which drawing
/// and every event dispatch run first. Calling it when nothing changed is a
/// no-op.
///
/// ```rust
/// use kurbo::{Point, Size};
/// use strata_ui::{Layer, LayerFeatures, LayerUpdate, NodeFlags, Ui, UiState};
///
/// struct Boxes { visible: Vec<u32> }
///
/// impl Layer for Boxes {
///     fn features(&self) -> LayerFeatures {
///         LayerFeatures::DRAW
///     }
///     fn update(&mut self, update: &LayerUpdate<'_>) {
///         self.visible = update.data_ids.to_vec();
///     }
/// }
///
/// let mut ui = Ui::new(Size::new(200.0, 100.0));
/// let layer = ui.create_layer(Boxes { visible: Vec::new() }).unwrap();
/// let node = ui
///     .create_node(None, Point::ZERO, Size::new(50.0, 50.0), NodeFlags::empty())
///     .unwrap();
/// ui.create_data(layer, Some(node)).unwrap();
///
/// ui.update();
/// assert_eq!(ui.state(), UiState::empty());
/// assert_eq!(ui.layer::<Boxes>(layer).unwrap().visible, [0]);
/// ```
pub struct Ui {
    pub(crate) size: Size,
    pub(crate) tree: Tree,
    pub(crate) composition: Composition,
    pub(crate) layers: LayerRegistry,
    pub(crate) draw_order: DrawOrder,
    pub(crate) animators: AnimatorRegistry,
    pub(crate) pointers: HashMap<PointerId, PointerState>,
    pub(crate) focused: Option<NodeHandle>,
    pub(crate) state: UiState,
    removed_nodes: Vec<NodeHandle>,
    removed_data: Vec<DataHandle>,
}

impl core::fmt::Debug for Ui {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Ui")
            .field("size", &self.size)
            .field("state", &self.state)
            .field("tree", &self.tree)
            .field("layers", &self.layers)
            .field("animators", &self.animators)
            .field("focused", &self.focused)
            .finish_non_exhaustive()
    }
}

impl Ui {
    /// Create an empty UI of the given size, in logical units.
    pub fn new(size: Size) -> Self {
        Self {
            size,
            tree: Tree::new(),
            composition: Composition::new(),
            layers: LayerRegistry::default(),
            draw_order: DrawOrder::new(),
            animators: AnimatorRegistry::default(),
            pointers: HashMap::new(),
            focused: None,
            state: UiState::NEEDS_NODE_UPDATE,
            removed_nodes: Vec::new(),
            removed_data: Vec::new(),
        }
    }

    /// UI size; the viewport everything is culled against.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Resize the UI.
    pub fn set_size(&mut self, size: Size) {
        if self.size != size {
            self.size = size;
            self.state |= UiState::NEEDS_LAYOUT_UPDATE;
        }
    }

    /// Pending work.
    pub fn state(&self) -> UiState {
        self.state
    }

    /// The node tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Visibility state as of the last [`update`](Self::update).
    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    /// Update lists and draws as of the last [`update`](Self::update).
    pub fn draw_order(&self) -> &DrawOrder {
        &self.draw_order
    }

    // --- nodes ---

    /// Create a node, see [`Tree::create_node`].
    pub fn create_node(
        &mut self,
        parent: Option<NodeHandle>,
        offset: Point,
        size: Size,
        flags: NodeFlags,
    ) -> Result<NodeHandle, UiError> {
        let node = self.tree.create_node(parent, offset, size, flags)?;
        self.state |= UiState::NEEDS_NODE_UPDATE;
        Ok(node)
    }

    /// Remove a node.
    ///
    /// Its descendants and every data attached to the removed subtree are
    /// removed by the next [`clean`](Self::clean), which [`update`](Self::update) runs.
    pub fn remove_node(&mut self, node: NodeHandle) -> Result<(), UiError> {
        self.tree.remove_node(node)?;
        self.removed_nodes.push(node);
        self.state |= UiState::NEEDS_NODE_CLEAN;
        Ok(())
    }

    /// Whether `node` is alive. Descendants of removed nodes stay alive until cleaned.
    pub fn is_node_valid(&self, node: NodeHandle) -> bool {
        self.tree.is_alive(node)
    }

    /// Number of live nodes.
    pub fn node_used_count(&self) -> usize {
        self.tree.node_used_count()
    }

    /// Parent of `node`.
    pub fn node_parent(&self, node: NodeHandle) -> Result<Option<NodeHandle>, UiError> {
        Ok(self.tree.node_parent(node)?)
    }

    /// Offset of `node` relative to its parent.
    pub fn node_offset(&self, node: NodeHandle) -> Result<Point, UiError> {
        Ok(self.tree.node_offset(node)?)
    }

    /// Move `node` relative to its parent.
    pub fn set_node_offset(&mut self, node: NodeHandle, offset: Point) -> Result<(), UiError> {
        self.tree.set_node_offset(node, offset)?;
        self.state |= UiState::NEEDS_LAYOUT_UPDATE;
        Ok(())
    }

    /// Size of `node`.
    pub fn node_size(&self, node: NodeHandle) -> Result<Size, UiError> {
        Ok(self.tree.node_size(node)?)
    }

    /// Resize `node`.
    pub fn set_node_size(&mut self, node: NodeHandle, size: Size) -> Result<(), UiError> {
        self.tree.set_node_size(node, size)?;
        self.state |= UiState::NEEDS_LAYOUT_UPDATE;
        Ok(())
    }

    /// Flags of `node`.
    pub fn node_flags(&self, node: NodeHandle) -> Result<NodeFlags, UiError> {
        Ok(self.tree.node_flags(node)?)
    }

    /// Replace the flags of `node`.
    pub fn set_node_flags(&mut self, node: NodeHandle, flags: NodeFlags) -> Result<(), UiError> {
        self.tree.set_node_flags(node, flags)?;
        self.state |= UiState::NEEDS_NODE_UPDATE;
        Ok(())
    }

    /// Set additional flags on `node`.
    pub fn add_node_flags(&mut self, node: NodeHandle, flags: NodeFlags) -> Result<(), UiError> {
        self.tree.add_node_flags(node, flags)?;
        self.state |= UiState::NEEDS_NODE_UPDATE;
        Ok(())
    }

    /// Clear flags on `node`.
    pub fn clear_node_flags(&mut self, node: NodeHandle, flags: NodeFlags) -> Result<(), UiError> {
        self.tree.clear_node_flags(node, flags)?;
        self.state |= UiState::NEEDS_NODE_UPDATE;
        Ok(())
    }

    /// Whether a root node is in the top-level order list.
    pub fn is_node_ordered(&self, node: NodeHandle) -> Result<bool, UiError> {
        Ok(self.tree.is_node_ordered(node)?)
    }

    /// Backmost top-level node.
    pub fn node_order_first(&self) -> Option<NodeHandle> {
        self.tree.node_order_first()
    }

    /// Frontmost top-level node.
    pub fn node_order_last(&self) -> Option<NodeHandle> {
        self.tree.node_order_last()
    }

    /// Top-level node drawn right before `node`.
    pub fn node_order_previous(&self, node: NodeHandle) -> Result<Option<NodeHandle>, UiError> {
        Ok(self.tree.node_order_previous(node)?)
    }

    /// Top-level node drawn right after `node`.
    pub fn node_order_next(&self, node: NodeHandle) -> Result<Option<NodeHandle>, UiError> {
        Ok(self.tree.node_order_next(node)?)
    }

    /// Order a root node before `before`, or frontmost; see [`Tree::set_node_order`].
    pub fn set_node_order(
        &mut self,
        node: NodeHandle,
        before: Option<NodeHandle>,
    ) -> Result<(), UiError> {
        self.tree.set_node_order(node, before)?;
        self.state |= UiState::NEEDS_NODE_UPDATE;
        Ok(())
    }

    /// Take a root node out of the order list, hiding its subtree.
    pub fn clear_node_order(&mut self, node: NodeHandle) -> Result<(), UiError> {
        self.tree.clear_node_order(node)?;
        self.state |= UiState::NEEDS_NODE_UPDATE;
        Ok(())
    }

    /// Whether `node` was visible and not culled at the last update.
    pub fn is_node_visible(&self, node: NodeHandle) -> bool {
        self.composition.is_node_visible(node)
    }

    // --- layers ---

    /// Register a layer. It draws above and gets events before every layer
    /// registered earlier, within each top-level node.
    pub fn create_layer<L: Layer>(&mut self, layer: L) -> Result<LayerHandle, UiError> {
        let handle = self.layers.create_layer(Box::new(layer))?;
        self.state |= UiState::NEEDS_DATA_ATTACHMENT_UPDATE;
        Ok(handle)
    }

    /// Remove a layer along with all its data and return it.
    pub fn remove_layer(&mut self, layer: LayerHandle) -> Result<Box<dyn Layer>, UiError> {
        let entry = self.layers.remove_layer(layer)?;
        self.removed_data
            .extend(entry.data.iter().map(|data| DataHandle::new(layer, data)));
        self.state |= UiState::NEEDS_DATA_ATTACHMENT_UPDATE;
        Ok(entry.layer)
    }

    /// Whether `layer` is registered.
    pub fn is_layer_valid(&self, layer: LayerHandle) -> bool {
        self.layers.is_layer_valid(layer)
    }

    /// Number of registered layers.
    pub fn layer_used_count(&self) -> usize {
        self.layers.layer_count()
    }

    /// Layers in registration order.
    pub fn layer_order(&self) -> &[LayerHandle] {
        &self.layers.order
    }

    /// Features the layer reported when it was registered.
    pub fn layer_features(&self, layer: LayerHandle) -> Result<LayerFeatures, UiError> {
        Ok(self.layers.entry(layer)?.features)
    }

    /// Typed access to a layer.
    ///
    /// Fails with [`UiError::InvalidUsage`] if the layer isn't an `L`.
    pub fn layer<L: Layer>(&self, layer: LayerHandle) -> Result<&L, UiError> {
        let layer: &dyn Layer = &*self.layers.entry(layer)?.layer;
        let any: &dyn Any = layer;
        any.downcast_ref::<L>().ok_or(UiError::InvalidUsage)
    }

    /// Typed mutable access to a layer.
    ///
    /// Changes to the layer's own data don't reach the UI; call
    /// [`set_layer_needs_update`](Self::set_layer_needs_update) if they
    /// should be reflected by an update call.
    pub fn layer_mut<L: Layer>(&mut self, layer: LayerHandle) -> Result<&mut L, UiError> {
        let layer: &mut dyn Layer = &mut *self.layers.entry_mut(layer)?.layer;
        let any: &mut dyn Any = layer;
        any.downcast_mut::<L>().ok_or(UiError::InvalidUsage)
    }

    /// Schedule an update call for `layer` even if its data lists didn't change.
    pub fn set_layer_needs_update(&mut self, layer: LayerHandle) -> Result<(), UiError> {
        self.layers.entry_mut(layer)?.needs_update = true;
        self.state |= UiState::NEEDS_DATA_UPDATE;
        Ok(())
    }

    // --- data ---

    /// Create data on `layer`, optionally attached to `node`.
    pub fn create_data(
        &mut self,
        layer: LayerHandle,
        node: Option<NodeHandle>,
    ) -> Result<DataHandle, UiError> {
        self.check_node(node)?;
        let data = self.layers.create_data(layer, node)?;
        self.state |= UiState::NEEDS_DATA_ATTACHMENT_UPDATE;
        Ok(data)
    }

    /// Remove data. Its layer is told through [`Layer::clean`] right away.
    pub fn remove_data(&mut self, data: DataHandle) -> Result<(), UiError> {
        self.layers.remove_data(data)?;
        self.removed_data.push(data);
        self.state |= UiState::NEEDS_DATA_ATTACHMENT_UPDATE;
        Ok(())
    }

    /// Attach data to `node`, or detach it with `None`.
    pub fn attach_data(&mut self, data: DataHandle, node: Option<NodeHandle>) -> Result<(), UiError> {
        self.check_node(node)?;
        self.layers.attach_data(data, node)?;
        self.state |= UiState::NEEDS_DATA_ATTACHMENT_UPDATE;
        Ok(())
    }

    /// Node the data is attached to.
    pub fn data_node(&self, data: DataHandle) -> Result<Option<NodeHandle>, UiError> {
        self.layers.data_node(data)
    }

    /// Whether `data` is alive.
    pub fn is_data_valid(&self, data: DataHandle) -> bool {
        self.layers.is_data_valid(data)
    }

    /// Number of live data on `layer`.
    pub fn layer_data_used_count(&self, layer: LayerHandle) -> Result<usize, UiError> {
        Ok(self.layers.entry(layer)?.data.used_count())
    }

    // --- animators ---

    /// Register an animator.
    pub fn create_animator<A: Animator>(&mut self, animator: A) -> Result<AnimatorHandle, UiError> {
        self.animators.create(Box::new(animator))
    }

    /// Remove an animator and return it.
    pub fn remove_animator(&mut self, animator: AnimatorHandle) -> Result<Box<dyn Animator>, UiError> {
        self.animators.remove(animator)
    }

    /// Number of registered animators.
    pub fn animator_used_count(&self) -> usize {
        self.animators.count()
    }

    /// Typed access to an animator.
    pub fn animator<A: Animator>(&self, animator: AnimatorHandle) -> Result<&A, UiError> {
        let animator: &dyn Animator = &*self.animators.get(animator)?.animator;
        let any: &dyn Any = animator;
        any.downcast_ref::<A>().ok_or(UiError::InvalidUsage)
    }

    /// Typed mutable access to an animator.
    pub fn animator_mut<A: Animator>(&mut self, animator: AnimatorHandle) -> Result<&mut A, UiError> {
        let animator: &mut dyn Animator = &mut *self.animators.get_mut(animator)?.animator;
        let any: &mut dyn Any = animator;
        any.downcast_mut::<A>().ok_or(UiError::InvalidUsage)
    }

    /// Advance every animator to `time`.
    ///
    /// Changes they make are applied like the equivalent setters and picked
    /// up by the next [`update`](Self::update).
    pub fn advance_animations(&mut self, time: Duration) {
        let mut layer_updates = Vec::new();
        for entry in self.animators.entries.iter_mut().flatten() {
            let mut context = AnimatorContext {
                tree: &mut self.tree,
                state: &mut self.state,
                layer_updates: &mut layer_updates,
            };
            entry.animator.advance(time, &mut context);
        }
        for layer in layer_updates {
            if let Ok(entry) = self.layers.entry_mut(layer) {
                entry.needs_update = true;
                self.state |= UiState::NEEDS_DATA_UPDATE;
            }
        }
    }

    // --- maintenance ---

    /// Sweep nodes below removed ones and prune data attached to removed nodes.
    ///
    /// Runs as part of [`update`](Self::update); call it directly to release
    /// removed subtrees without recomputing anything else.
    pub fn clean(&mut self) {
        if self.state.contains(UiState::NEEDS_NODE_CLEAN) {
            let removed = self.tree.clean();
            if !removed.is_empty() {
                debug!("swept {} dangling nodes", removed.len());
            }
            self.removed_nodes.extend(removed);
        }
        if self.state.contains(UiState::NEEDS_DATA_CLEAN) {
            let tree = &self.tree;
            let pruned = self.layers.prune(|node| tree.is_alive(node));
            if !pruned.is_empty() {
                debug!("pruned {} data attached to removed nodes", pruned.len());
                self.state |= UiState::NEEDS_DATA_ATTACHMENT_UPDATE;
            }
            self.removed_data.extend(pruned);
        }
        if !self.removed_nodes.is_empty() || !self.removed_data.is_empty() {
            self.animators.clean(&self.removed_nodes, &self.removed_data);
            self.removed_nodes.clear();
            self.removed_data.clear();
        }
        self.state
            .remove(UiState::NEEDS_NODE_CLEAN.difference(UiState::NEEDS_NODE_UPDATE));
    }

    /// Bring everything derived up to date.
    ///
    /// In order: [`clean`](Self::clean), rebuild the visible sequence, cull,
    /// rebuild the draw order, update layers, then drop capture, hover and
    /// focus from nodes that can no longer receive events. Each step only
    /// runs if [`state`](Self::state) asks for it; afterwards the state is empty.
    pub fn update(&mut self) {
        if self.state.is_empty() {
            return;
        }
        self.clean();
        let state = self.state;

        if state.contains(UiState::NEEDS_NODE_UPDATE) {
            self.composition.rebuild_sequence(&self.tree);
            trace!(
                "rebuilt visible sequence of {} nodes",
                self.composition.visible_node_ids().len()
            );
        }
        if state.contains(UiState::NEEDS_LAYOUT_UPDATE) {
            self.composition.cull(&self.tree, self.size);
            trace!("culled to {} clip rects", self.composition.clip_rects().len());
        }
        if state.contains(UiState::NEEDS_DATA_ATTACHMENT_UPDATE) {
            let inputs: SmallVec<[LayerAttachments<'_>; 8]> = self
                .layers
                .ordered()
                .map(|entry| LayerAttachments {
                    layer: entry.handle,
                    draws: entry.features.contains(LayerFeatures::DRAW),
                    data_nodes: &entry.data_nodes,
                })
                .collect();
            self.draw_order
                .build(&self.tree, &self.composition, &inputs);
            trace!("rebuilt draw order, {} draws", self.draw_order.draws().len());
        }
        if state.contains(UiState::NEEDS_DATA_UPDATE) {
            let all = state.contains(UiState::NEEDS_DATA_ATTACHMENT_UPDATE);
            for entry in self.layers.entries.iter_mut().flatten() {
                if !all && !entry.needs_update {
                    continue;
                }
                entry.needs_update = false;
                let (data_ids, node_ids, clip_rect_refs) = match self.draw_order.layer(entry.handle) {
                    Some(order) => (order.data_ids(), order.node_ids(), order.clip_rect_refs()),
                    None => (&[][..], &[][..], &[][..]),
                };
                entry.layer.update(&LayerUpdate {
                    data_ids,
                    node_ids,
                    clip_rect_refs,
                    clip_rects: self.composition.clip_rects(),
                    node_offsets: self.composition.absolute_offsets(),
                    node_sizes: self.tree.node_sizes(),
                    nodes_enabled: self.composition.enabled_mask(),
                });
            }
        }

        self.validate_event_state();
        self.state = UiState::empty();
    }

    /// Update, then draw every non-empty range back to front.
    pub fn draw(&mut self) {
        self.update();
        for draw in self.draw_order.draws() {
            let Some(entry) = self
                .layers
                .entries
                .get_mut(draw.layer.index() as usize)
                .and_then(Option::as_mut)
            else {
                continue;
            };
            let Some(order) = self.draw_order.layer(draw.layer) else {
                continue;
            };
            entry.layer.draw(&LayerDraw {
                data_ids: order.data_ids(),
                node_ids: order.node_ids(),
                offset: draw.offset as usize,
                count: draw.count as usize,
                clip_rect_refs: order.clip_rect_refs(),
                clip_rect_offset: draw.clip_rect_offset as usize,
                clip_rect_count: draw.clip_rect_count as usize,
                clip_rects: self.composition.clip_rects(),
                node_offsets: self.composition.absolute_offsets(),
                node_sizes: self.tree.node_sizes(),
                nodes_enabled: self.composition.enabled_mask(),
                viewport: self.size,
            });
        }
    }

    fn check_node(&self, node: Option<NodeHandle>) -> Result<(), UiError> {
        match node {
            Some(node) if !self.tree.is_alive(node) => Err(UiError::InvalidHandle),
            _ => Ok(()),
        }
    }
}
