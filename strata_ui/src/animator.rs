// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Time-driven producers of node and data changes.
//!
//! An [`Animator`] is advanced by [`Ui::advance_animations`](crate::Ui::advance_animations)
//! and writes its results through an [`AnimatorContext`], which marks the UI
//! dirty exactly like the equivalent `Ui` setters would. Animators that
//! declare [`AnimatorFeatures::NODE_ATTACHMENT`] or
//! [`AnimatorFeatures::DATA_ATTACHMENT`] are told when nodes or data they may
//! be tracking are removed, so they can drop their animations.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::Any;
use core::time::Duration;

use kurbo::{Point, Size};
use strata_handle::{AnimatorHandle, AnimatorKind, DataHandle, HandlePool, LayerHandle, NodeHandle};
use strata_tree::{NodeFlags, Tree};

use crate::error::UiError;
use crate::ui::UiState;

bitflags::bitflags! {
    /// What an animator wants to be notified about.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct AnimatorFeatures: u8 {
        /// Animations are tied to nodes; get [`Animator::clean_nodes`].
        const NODE_ATTACHMENT = 1 << 0;
        /// Animations are tied to data; get [`Animator::clean_data`].
        const DATA_ATTACHMENT = 1 << 1;
    }
}

/// A source of time-driven node and data changes.
pub trait Animator: Any {
    /// Notifications the animator wants. Queried once, when it's added.
    fn features(&self) -> AnimatorFeatures;

    /// Advance all animations to `time` and apply their current values.
    fn advance(&mut self, time: Duration, context: &mut AnimatorContext<'_>);

    /// These nodes were removed, either directly or as dangling descendants.
    fn clean_nodes(&mut self, removed: &[NodeHandle]) {
        let _ = removed;
    }

    /// These data were removed, either directly or with their node.
    fn clean_data(&mut self, removed: &[DataHandle]) {
        let _ = removed;
    }
}

/// Write access to node properties during [`Animator::advance`].
pub struct AnimatorContext<'a> {
    pub(crate) tree: &'a mut Tree,
    pub(crate) state: &'a mut UiState,
    pub(crate) layer_updates: &'a mut Vec<LayerHandle>,
}

impl core::fmt::Debug for AnimatorContext<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AnimatorContext")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl AnimatorContext<'_> {
    /// Whether `node` is still alive.
    pub fn is_node_alive(&self, node: NodeHandle) -> bool {
        self.tree.is_alive(node)
    }

    /// Offset of `node` relative to its parent.
    pub fn node_offset(&self, node: NodeHandle) -> Result<Point, UiError> {
        Ok(self.tree.node_offset(node)?)
    }

    /// Move `node`.
    pub fn set_node_offset(&mut self, node: NodeHandle, offset: Point) -> Result<(), UiError> {
        self.tree.set_node_offset(node, offset)?;
        *self.state |= UiState::NEEDS_LAYOUT_UPDATE;
        Ok(())
    }

    /// Size of `node`.
    pub fn node_size(&self, node: NodeHandle) -> Result<Size, UiError> {
        Ok(self.tree.node_size(node)?)
    }

    /// Resize `node`.
    pub fn set_node_size(&mut self, node: NodeHandle, size: Size) -> Result<(), UiError> {
        self.tree.set_node_size(node, size)?;
        *self.state |= UiState::NEEDS_LAYOUT_UPDATE;
        Ok(())
    }

    /// Flags of `node`.
    pub fn node_flags(&self, node: NodeHandle) -> Result<NodeFlags, UiError> {
        Ok(self.tree.node_flags(node)?)
    }

    /// Set additional flags on `node`.
    pub fn add_node_flags(&mut self, node: NodeHandle, flags: NodeFlags) -> Result<(), UiError> {
        self.tree.add_node_flags(node, flags)?;
        *self.state |= UiState::NEEDS_NODE_UPDATE;
        Ok(())
    }

    /// Clear flags on `node`.
    pub fn clear_node_flags(&mut self, node: NodeHandle, flags: NodeFlags) -> Result<(), UiError> {
        self.tree.clear_node_flags(node, flags)?;
        *self.state |= UiState::NEEDS_NODE_UPDATE;
        Ok(())
    }

    /// Ask for `layer` to get an update call with its data at the next update.
    ///
    /// Used by animators that change layer-owned data (colors, text) rather
    /// than node properties. Stale layer handles are ignored.
    pub fn request_layer_update(&mut self, layer: LayerHandle) {
        self.layer_updates.push(layer);
    }
}

pub(crate) struct AnimatorEntry {
    pub(crate) animator: Box<dyn Animator>,
    pub(crate) features: AnimatorFeatures,
}

/// Animator storage addressed by [`AnimatorHandle`].
#[derive(Default)]
pub(crate) struct AnimatorRegistry {
    handles: HandlePool<AnimatorKind>,
    pub(crate) entries: Vec<Option<AnimatorEntry>>,
}

impl core::fmt::Debug for AnimatorRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AnimatorRegistry")
            .field("animators", &self.handles.used_count())
            .finish_non_exhaustive()
    }
}

impl AnimatorRegistry {
    pub(crate) fn create(&mut self, animator: Box<dyn Animator>) -> Result<AnimatorHandle, UiError> {
        let handle = self.handles.create()?;
        let features = animator.features();
        let idx = handle.index() as usize;
        if idx >= self.entries.len() {
            self.entries.resize_with(idx + 1, || None);
        }
        self.entries[idx] = Some(AnimatorEntry { animator, features });
        Ok(handle)
    }

    pub(crate) fn remove(&mut self, handle: AnimatorHandle) -> Result<Box<dyn Animator>, UiError> {
        self.handles.remove(handle)?;
        self.entries[handle.index() as usize]
            .take()
            .map(|entry| entry.animator)
            .ok_or(UiError::InvalidHandle)
    }

    pub(crate) fn get(&self, handle: AnimatorHandle) -> Result<&AnimatorEntry, UiError> {
        if !self.handles.is_valid(handle) {
            return Err(UiError::InvalidHandle);
        }
        self.entries[handle.index() as usize]
            .as_ref()
            .ok_or(UiError::InvalidHandle)
    }

    pub(crate) fn get_mut(&mut self, handle: AnimatorHandle) -> Result<&mut AnimatorEntry, UiError> {
        if !self.handles.is_valid(handle) {
            return Err(UiError::InvalidHandle);
        }
        self.entries[handle.index() as usize]
            .as_mut()
            .ok_or(UiError::InvalidHandle)
    }

    pub(crate) fn count(&self) -> usize {
        self.handles.used_count()
    }

    /// Forward removed nodes and data to the animators that asked for them.
    pub(crate) fn clean(&mut self, nodes: &[NodeHandle], data: &[DataHandle]) {
        for entry in self.entries.iter_mut().flatten() {
            if !nodes.is_empty() && entry.features.contains(AnimatorFeatures::NODE_ATTACHMENT) {
                entry.animator.clean_nodes(nodes);
            }
            if !data.is_empty() && entry.features.contains(AnimatorFeatures::DATA_ATTACHMENT) {
                entry.animator.clean_data(data);
            }
        }
    }
}
