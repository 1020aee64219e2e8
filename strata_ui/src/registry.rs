// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layers and the node attachments of their data.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use strata_handle::{
    DataHandle, HandlePool, LayerDataHandle, LayerDataKind, LayerHandle, LayerKind, NodeHandle,
};

use crate::error::UiError;
use crate::layer::{Layer, LayerFeatures};

/// One registered layer together with its data pool.
pub(crate) struct LayerEntry {
    pub(crate) handle: LayerHandle,
    pub(crate) layer: Box<dyn Layer>,
    pub(crate) features: LayerFeatures,
    pub(crate) data: HandlePool<LayerDataKind>,
    /// Node each data slot is attached to. `None` for detached and free slots.
    pub(crate) data_nodes: Vec<Option<NodeHandle>>,
    pub(crate) needs_update: bool,
}

impl LayerEntry {
    fn data_index(&self, data: LayerDataHandle) -> Result<usize, UiError> {
        if self.data.is_valid(data) {
            Ok(data.index() as usize)
        } else {
            Err(UiError::InvalidHandle)
        }
    }
}

/// Layer storage plus the data-to-node attachment table.
///
/// Layers live in slots addressed by [`LayerHandle`]; `order` keeps them in
/// registration order, which is the order they draw and (reversed) receive
/// events in for each top-level node.
#[derive(Default)]
pub(crate) struct LayerRegistry {
    layers: HandlePool<LayerKind>,
    pub(crate) entries: Vec<Option<LayerEntry>>,
    pub(crate) order: Vec<LayerHandle>,
}

impl core::fmt::Debug for LayerRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LayerRegistry")
            .field("layers", &self.layers.used_count())
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

impl LayerRegistry {
    pub(crate) fn create_layer(&mut self, layer: Box<dyn Layer>) -> Result<LayerHandle, UiError> {
        let handle = self.layers.create()?;
        let features = layer.features();
        let entry = LayerEntry {
            handle,
            layer,
            features,
            data: HandlePool::new(),
            data_nodes: Vec::new(),
            needs_update: false,
        };
        let idx = handle.index() as usize;
        if idx >= self.entries.len() {
            self.entries.resize_with(idx + 1, || None);
        }
        self.entries[idx] = Some(entry);
        self.order.push(handle);
        Ok(handle)
    }

    pub(crate) fn remove_layer(&mut self, handle: LayerHandle) -> Result<LayerEntry, UiError> {
        self.layers.remove(handle)?;
        self.order.retain(|h| *h != handle);
        self.entries[handle.index() as usize]
            .take()
            .ok_or(UiError::InvalidHandle)
    }

    pub(crate) fn is_layer_valid(&self, handle: LayerHandle) -> bool {
        self.layers.is_valid(handle)
    }

    pub(crate) fn layer_count(&self) -> usize {
        self.layers.used_count()
    }

    pub(crate) fn entry(&self, handle: LayerHandle) -> Result<&LayerEntry, UiError> {
        if !self.layers.is_valid(handle) {
            return Err(UiError::InvalidHandle);
        }
        self.entries[handle.index() as usize]
            .as_ref()
            .ok_or(UiError::InvalidHandle)
    }

    pub(crate) fn entry_mut(&mut self, handle: LayerHandle) -> Result<&mut LayerEntry, UiError> {
        if !self.layers.is_valid(handle) {
            return Err(UiError::InvalidHandle);
        }
        self.entries[handle.index() as usize]
            .as_mut()
            .ok_or(UiError::InvalidHandle)
    }

    /// Entries in registration order.
    pub(crate) fn ordered(&self) -> impl DoubleEndedIterator<Item = &LayerEntry> + '_ {
        self.order
            .iter()
            .filter_map(|h| self.entries[h.index() as usize].as_ref())
    }

    pub(crate) fn create_data(
        &mut self,
        layer: LayerHandle,
        node: Option<NodeHandle>,
    ) -> Result<DataHandle, UiError> {
        let entry = self.entry_mut(layer)?;
        let data = entry.data.create()?;
        let idx = data.index() as usize;
        if idx >= entry.data_nodes.len() {
            entry.data_nodes.resize(idx + 1, None);
        }
        entry.data_nodes[idx] = node;
        Ok(DataHandle::new(layer, data))
    }

    /// Remove one data and tell its layer right away.
    pub(crate) fn remove_data(&mut self, data: DataHandle) -> Result<(), UiError> {
        let entry = self.entry_mut(data.layer)?;
        let idx = entry.data_index(data.data)?;
        entry.data.remove(data.data)?;
        entry.data_nodes[idx] = None;
        let mut removed = vec![false; entry.data_nodes.len()];
        removed[idx] = true;
        entry.layer.clean(&removed);
        Ok(())
    }

    pub(crate) fn is_data_valid(&self, data: DataHandle) -> bool {
        self.entry(data.layer)
            .is_ok_and(|entry| entry.data.is_valid(data.data))
    }

    pub(crate) fn data_node(&self, data: DataHandle) -> Result<Option<NodeHandle>, UiError> {
        let entry = self.entry(data.layer)?;
        let idx = entry.data_index(data.data)?;
        Ok(entry.data_nodes[idx])
    }

    pub(crate) fn attach_data(
        &mut self,
        data: DataHandle,
        node: Option<NodeHandle>,
    ) -> Result<(), UiError> {
        let entry = self.entry_mut(data.layer)?;
        let idx = entry.data_index(data.data)?;
        entry.data_nodes[idx] = node;
        Ok(())
    }

    /// Remove every data attached to a node for which `is_alive` is false.
    ///
    /// Each affected layer gets one [`Layer::clean`] call with all its
    /// removed data marked. Returns the removed handles.
    pub(crate) fn prune(&mut self, is_alive: impl Fn(NodeHandle) -> bool) -> Vec<DataHandle> {
        let mut removed_handles = Vec::new();
        let mut removed = Vec::new();
        for entry in self.entries.iter_mut().flatten() {
            removed.clear();
            removed.resize(entry.data_nodes.len(), false);
            let mut any = false;
            for (idx, node) in entry.data_nodes.iter_mut().enumerate() {
                let Some(n) = *node else {
                    continue;
                };
                if is_alive(n) {
                    continue;
                }
                #[allow(
                    clippy::cast_possible_truncation,
                    reason = "Data slots are bounded by the 20-bit data index space."
                )]
                let Some(handle) = entry.data.handle_at(idx as u32) else {
                    continue;
                };
                let freed = entry.data.remove(handle);
                debug_assert!(freed.is_ok(), "handle_at returns live handles");
                *node = None;
                removed[idx] = true;
                removed_handles.push(DataHandle::new(entry.handle, handle));
                any = true;
            }
            if any {
                entry.layer.clean(&removed);
            }
        }
        removed_handles
    }
}
