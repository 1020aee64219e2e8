// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The interface between the UI core and the layers that own drawable content.
//!
//! A layer owns per-data state (a button background, a text run, an icon)
//! indexed by the layer-relative data id, `LayerDataHandle::index()`. The UI
//! decides which data are visible and in what order, and hands the layer
//! read-only views of the per-node arrays to work with:
//!
//! - [`Layer::clean`] when data go away because their node was removed.
//! - [`Layer::update`] when the set or order of visible data, or their
//!   node rectangles, changed. It must be idempotent for identical input.
//! - [`Layer::draw`] once per non-empty draw range, back to front.
//! - Event callbacks for layers with [`LayerFeatures::EVENT`].
//!
//! Views passed to the callbacks are only valid for the duration of the call.

use core::any::Any;

use kurbo::{Point, Size};
use strata_tree::ClipRect;

use crate::draw_order::ClipRectRef;
use crate::event::{FocusEvent, KeyEvent, PointerEvent, PointerMoveEvent, TextInputEvent};

bitflags::bitflags! {
    /// What a layer participates in.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct LayerFeatures: u8 {
        /// The layer draws; it gets [`Layer::draw`] calls.
        const DRAW  = 1 << 0;
        /// The layer handles events; its data are hit-test candidates.
        const EVENT = 1 << 1;
    }
}

/// Input of [`Layer::update`].
///
/// `data_ids` and `node_ids` are parallel and list every visible data of the
/// layer, back to front. The per-node arrays are indexed by node slot and
/// cover every node, not just the listed ones.
#[derive(Clone, Copy, Debug)]
pub struct LayerUpdate<'a> {
    /// Visible data of the layer in draw order.
    pub data_ids: &'a [u32],
    /// Node slot each entry of `data_ids` is attached to.
    pub node_ids: &'a [u32],
    /// Clip runs of the layer's data list, see [`ClipRectRef`].
    pub clip_rect_refs: &'a [ClipRectRef],
    /// All clip rectangles of the UI.
    pub clip_rects: &'a [ClipRect],
    /// Absolute node offsets, in UI coordinates.
    pub node_offsets: &'a [Point],
    /// Node sizes.
    pub node_sizes: &'a [Size],
    /// Whether a node is drawn enabled (no `DISABLED` on its ancestor chain).
    pub nodes_enabled: &'a [bool],
}

/// Input of [`Layer::draw`]: one contiguous range of the layer's data list.
#[derive(Clone, Copy, Debug)]
pub struct LayerDraw<'a> {
    /// The full data list of the layer, as passed to the last update.
    pub data_ids: &'a [u32],
    /// Node slots parallel to `data_ids`.
    pub node_ids: &'a [u32],
    /// First entry of `data_ids` to draw.
    pub offset: usize,
    /// Number of entries to draw.
    pub count: usize,
    /// The layer's clip runs.
    pub clip_rect_refs: &'a [ClipRectRef],
    /// First clip run covering the range.
    pub clip_rect_offset: usize,
    /// Number of clip runs covering the range; their data counts sum to `count`.
    pub clip_rect_count: usize,
    /// All clip rectangles of the UI.
    pub clip_rects: &'a [ClipRect],
    /// Absolute node offsets, in UI coordinates.
    pub node_offsets: &'a [Point],
    /// Node sizes.
    pub node_sizes: &'a [Size],
    /// Whether a node is drawn enabled.
    pub nodes_enabled: &'a [bool],
    /// UI size, which zero-sized clip rectangles resolve to.
    pub viewport: Size,
}

impl LayerDraw<'_> {
    /// Data ids of the range.
    pub fn data(&self) -> &[u32] {
        &self.data_ids[self.offset..self.offset + self.count]
    }

    /// Node slots of the range.
    pub fn nodes(&self) -> &[u32] {
        &self.node_ids[self.offset..self.offset + self.count]
    }

    /// Clip runs of the range.
    pub fn clips(&self) -> &[ClipRectRef] {
        &self.clip_rect_refs[self.clip_rect_offset..self.clip_rect_offset + self.clip_rect_count]
    }
}

/// A renderer and event handler for data attached to nodes.
///
/// All methods but [`features`](Self::features) have no-op defaults. Event
/// callbacks receive the layer-relative data id and accept the event to stop
/// propagation.
pub trait Layer: Any {
    /// Capabilities of the layer. Queried once, when the layer is added.
    fn features(&self) -> LayerFeatures;

    /// Forget the data whose bit in `removed` (indexed by data id) is set.
    fn clean(&mut self, removed: &[bool]) {
        let _ = removed;
    }

    /// Refresh state for the visible data.
    fn update(&mut self, update: &LayerUpdate<'_>) {
        let _ = update;
    }

    /// Draw one range of the visible data.
    fn draw(&mut self, draw: &LayerDraw<'_>) {
        let _ = draw;
    }

    /// A pointer was pressed on the data's node.
    fn pointer_press_event(&mut self, data_id: u32, event: &mut PointerEvent) {
        let _ = (data_id, event);
    }

    /// A pointer was released on, or while captured by, the data's node.
    fn pointer_release_event(&mut self, data_id: u32, event: &mut PointerEvent) {
        let _ = (data_id, event);
    }

    /// A pointer moved over, or while captured by, the data's node.
    fn pointer_move_event(&mut self, data_id: u32, event: &mut PointerMoveEvent) {
        let _ = (data_id, event);
    }

    /// A pointer started hovering the data's node.
    fn pointer_enter_event(&mut self, data_id: u32, event: &mut PointerMoveEvent) {
        let _ = (data_id, event);
    }

    /// A pointer stopped hovering the data's node.
    fn pointer_leave_event(&mut self, data_id: u32, event: &mut PointerMoveEvent) {
        let _ = (data_id, event);
    }

    /// The data's node is about to be focused. Accept to take focus.
    fn focus_event(&mut self, data_id: u32, event: &mut FocusEvent) {
        let _ = (data_id, event);
    }

    /// The data's node lost focus.
    fn blur_event(&mut self, data_id: u32, event: &mut FocusEvent) {
        let _ = (data_id, event);
    }

    /// A key was pressed while the data's node was focused or hovered.
    fn key_press_event(&mut self, data_id: u32, event: &mut KeyEvent) {
        let _ = (data_id, event);
    }

    /// A key was released while the data's node was focused or hovered.
    fn key_release_event(&mut self, data_id: u32, event: &mut KeyEvent) {
        let _ = (data_id, event);
    }

    /// Text was entered while the data's node was focused.
    fn text_input_event(&mut self, data_id: u32, event: &mut TextInputEvent) {
        let _ = (data_id, event);
    }
}
