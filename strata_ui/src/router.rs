// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event routing for [`Ui`].
//!
//! ## Overview
//!
//! Pointer events are hit-tested against the visible sequence front to back.
//! For every node under the pointer, the data attached to it are offered the
//! event: layers in reverse registration order, and within a layer data in
//! decreasing id order. The first data to accept the event ends the search;
//! if nobody on a node accepts, the search falls through to the nodes below.
//!
//! ## Capture
//!
//! A press accepted by a layer captures the pointer for the node it was
//! accepted on, unless the layer cleared [`PointerEvent::set_captured`]. While
//! captured, moves and the release go to that node alone, wherever the
//! pointer is. A captured move may release the capture; the release always
//! does.
//!
//! ## Hover and focus
//!
//! The node that accepted the last move of a pointer is its hovered node.
//! Changes produce leave and enter notifications, which are delivered to
//! every data on the node regardless of acceptance. A press accepted on a
//! [`FOCUSABLE`](strata_tree::NodeFlags::FOCUSABLE) node offers it focus; any
//! other press blurs the focused node.
//!
//! Key events go to the focused node, or without one to the node hovered by
//! the [primary pointer](crate::PRIMARY_POINTER). Text input goes to the
//! focused node only.
//!
//! ## Validity
//!
//! Each [`Ui::update`] drops captures, hovers and focus whose node can no
//! longer receive events (removed, hidden, culled, disabled, or under
//! [`NO_EVENTS`](strata_tree::NodeFlags::NO_EVENTS)), and captures whose
//! data was removed or moved to another node. No leave or blur is sent then.

use alloc::boxed::Box;

use kurbo::{Point, Rect};
use log::{debug, trace};
use smallvec::SmallVec;
use strata_handle::{DataHandle, NodeHandle};
use strata_tree::NodeFlags;

use crate::error::UiError;
use crate::event::{
    Accept, FocusEvent, KeyEvent, PRIMARY_POINTER, PointerEvent, PointerId, PointerMoveEvent,
    TextInputEvent,
};
use crate::layer::{Layer, LayerFeatures};
use crate::ui::Ui;

/// A pointer captured by one data on one node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Capture {
    pub(crate) node: NodeHandle,
    pub(crate) data: DataHandle,
}

/// Per-pointer routing state.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct PointerState {
    pub(crate) captured: Option<Capture>,
    pub(crate) hovered: Option<NodeHandle>,
    pub(crate) position: Option<Point>,
}

type Candidates = SmallVec<[DataHandle; 8]>;
type Hits = SmallVec<[NodeHandle; 16]>;

impl Ui {
    /// Dispatch a pointer press at `position`, in UI coordinates.
    ///
    /// Returns whether a layer accepted it. Fails with
    /// [`UiError::InvalidUsage`] if the event is already accepted.
    pub fn pointer_press_event(
        &mut self,
        position: Point,
        event: &mut PointerEvent,
    ) -> Result<bool, UiError> {
        if event.is_accepted() {
            return Err(UiError::InvalidUsage);
        }
        self.update();
        let pointer = event.pointer_id();

        let mut accepted = None;
        for node in self.hit_nodes(position) {
            let Some(rect) = self.composition.node_rect(&self.tree, node) else {
                continue;
            };
            event.prepare(local(position, rect), rect.size(), true);
            let candidates = self.event_data(node);
            if let Some(data) = self.deliver(&candidates, event, |layer, id, e| {
                layer.pointer_press_event(id, e);
            }) {
                accepted = Some(Capture { node, data });
                break;
            }
        }
        if accepted.is_none() {
            event.set_captured(false);
        }

        let captured = accepted.filter(|_| event.is_captured());
        let state = self.pointers.entry(pointer).or_default();
        state.position = Some(position);
        state.captured = captured;
        if let Some(capture) = captured {
            trace!("pointer {pointer} captured by {:?}", capture.node);
        }

        let focus_target = accepted.map(|capture| capture.node).filter(|node| {
            self.tree
                .node_flags(*node)
                .is_ok_and(|flags| flags.contains(NodeFlags::FOCUSABLE))
        });
        self.change_focus(focus_target, &mut FocusEvent::new());

        Ok(accepted.is_some())
    }

    /// Dispatch a pointer release at `position`, in UI coordinates.
    ///
    /// Goes to the capturing node if there is one, otherwise it's
    /// hit-tested. Ends the capture either way.
    pub fn pointer_release_event(
        &mut self,
        position: Point,
        event: &mut PointerEvent,
    ) -> Result<bool, UiError> {
        if event.is_accepted() {
            return Err(UiError::InvalidUsage);
        }
        self.update();
        let pointer = event.pointer_id();
        let state = self.pointers.entry(pointer).or_default();
        state.position = Some(position);
        let captured = state.captured.take();

        if let Some(capture) = captured {
            if let Some(rect) = self.composition.node_rect(&self.tree, capture.node) {
                event.prepare(local(position, rect), rect.size(), true);
                let candidates = self.event_data(capture.node);
                let handled = self
                    .deliver(&candidates, event, |layer, id, e| {
                        layer.pointer_release_event(id, e);
                    })
                    .is_some();
                return Ok(handled);
            }
        }

        for node in self.hit_nodes(position) {
            let Some(rect) = self.composition.node_rect(&self.tree, node) else {
                continue;
            };
            event.prepare(local(position, rect), rect.size(), false);
            let candidates = self.event_data(node);
            if self
                .deliver(&candidates, event, |layer, id, e| {
                    layer.pointer_release_event(id, e);
                })
                .is_some()
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Dispatch a pointer move to `position`, in UI coordinates.
    ///
    /// Updates the hovered node and sends leave and enter notifications when
    /// it changes.
    pub fn pointer_move_event(
        &mut self,
        position: Point,
        event: &mut PointerMoveEvent,
    ) -> Result<bool, UiError> {
        if event.is_accepted() {
            return Err(UiError::InvalidUsage);
        }
        self.update();
        let pointer = event.pointer_id();
        let state = self.pointers.entry(pointer).or_default();
        let relative = state.position.map_or(kurbo::Vec2::ZERO, |last| position - last);
        state.position = Some(position);
        let captured = state.captured;
        let previous = state.hovered;
        event.set_relative_position(relative);

        let mut handled = false;
        let mut hovered = None;
        let mut released = false;
        let target = captured.and_then(|capture| {
            self.composition
                .node_rect(&self.tree, capture.node)
                .map(|rect| (capture.node, rect))
        });
        if let Some((node, rect)) = target {
            let inside = rect.contains(position)
                && self
                    .composition
                    .position(node)
                    .and_then(|p| self.composition.clip_at(p))
                    .is_some_and(|clip| clip.contains(position));
            event.prepare(local(position, rect), rect.size(), true, inside);
            let candidates = self.event_data(node);
            handled = self
                .deliver(&candidates, event, |layer, id, e| {
                    layer.pointer_move_event(id, e);
                })
                .is_some();
            released = !event.is_captured();
            if handled && inside {
                hovered = Some(node);
            }
        } else {
            for node in self.hit_nodes(position) {
                let Some(rect) = self.composition.node_rect(&self.tree, node) else {
                    continue;
                };
                event.prepare(local(position, rect), rect.size(), false, true);
                let candidates = self.event_data(node);
                if self
                    .deliver(&candidates, event, |layer, id, e| {
                        layer.pointer_move_event(id, e);
                    })
                    .is_some()
                {
                    handled = true;
                    hovered = Some(node);
                    break;
                }
            }
        }

        if let Some(state) = self.pointers.get_mut(&pointer) {
            if released {
                debug!("pointer {pointer} capture released by move handler");
                state.captured = None;
            }
            state.hovered = hovered;
        }
        if previous != hovered {
            if let Some(node) = previous {
                self.notify_hover(node, pointer, position, relative, false);
            }
            if let Some(node) = hovered {
                self.notify_hover(node, pointer, position, relative, true);
            }
        }
        Ok(handled)
    }

    /// Move focus to `node`, or just blur the focused node with `None`.
    ///
    /// Only a [`FOCUSABLE`](NodeFlags::FOCUSABLE) node that can receive
    /// events, and whose layers accept the event, gets focus. Returns whether
    /// `node` is focused afterwards. Focusing the already focused node does
    /// nothing and returns `true`.
    pub fn focus_event(
        &mut self,
        node: Option<NodeHandle>,
        event: &mut FocusEvent,
    ) -> Result<bool, UiError> {
        if event.is_accepted() {
            return Err(UiError::InvalidUsage);
        }
        if let Some(node) = node {
            if !self.tree.is_alive(node) {
                return Err(UiError::InvalidHandle);
            }
        }
        self.update();
        let target = node.filter(|node| {
            self.tree
                .node_flags(*node)
                .is_ok_and(|flags| flags.contains(NodeFlags::FOCUSABLE))
        });
        Ok(self.change_focus(target, event))
    }

    /// Dispatch a key press to the focused node, or without one to the node
    /// hovered by the [primary pointer](PRIMARY_POINTER).
    pub fn key_press_event(&mut self, event: &mut KeyEvent) -> Result<bool, UiError> {
        if event.is_accepted() {
            return Err(UiError::InvalidUsage);
        }
        self.update();
        let Some(node) = self.key_target() else {
            return Ok(false);
        };
        let candidates = self.event_data(node);
        Ok(self
            .deliver(&candidates, event, |layer, id, e| layer.key_press_event(id, e))
            .is_some())
    }

    /// Dispatch a key release. Targeted like [`key_press_event`](Self::key_press_event).
    pub fn key_release_event(&mut self, event: &mut KeyEvent) -> Result<bool, UiError> {
        if event.is_accepted() {
            return Err(UiError::InvalidUsage);
        }
        self.update();
        let Some(node) = self.key_target() else {
            return Ok(false);
        };
        let candidates = self.event_data(node);
        Ok(self
            .deliver(&candidates, event, |layer, id, e| layer.key_release_event(id, e))
            .is_some())
    }

    /// Dispatch text input to the focused node.
    pub fn text_input_event(&mut self, event: &mut TextInputEvent) -> Result<bool, UiError> {
        if event.is_accepted() {
            return Err(UiError::InvalidUsage);
        }
        self.update();
        let Some(node) = self.focused else {
            return Ok(false);
        };
        let candidates = self.event_data(node);
        Ok(self
            .deliver(&candidates, event, |layer, id, e| layer.text_input_event(id, e))
            .is_some())
    }

    /// Topmost node under `position` that can receive pointer events.
    ///
    /// Only considers event flags and geometry, not whether any layer would
    /// accept an event there.
    pub fn node_at(&mut self, position: Point) -> Option<NodeHandle> {
        self.update();
        self.hit_nodes(position).first().copied()
    }

    /// Node capturing the [primary pointer](PRIMARY_POINTER).
    pub fn current_captured_node(&self) -> Option<NodeHandle> {
        self.pointer_captured_node(PRIMARY_POINTER)
    }

    /// Node hovered by the [primary pointer](PRIMARY_POINTER).
    pub fn current_hovered_node(&self) -> Option<NodeHandle> {
        self.pointer_hovered_node(PRIMARY_POINTER)
    }

    /// Focused node.
    pub fn current_focused_node(&self) -> Option<NodeHandle> {
        self.focused
    }

    /// Node capturing `pointer`.
    pub fn pointer_captured_node(&self, pointer: PointerId) -> Option<NodeHandle> {
        self.pointers
            .get(&pointer)
            .and_then(|state| state.captured)
            .map(|capture| capture.node)
    }

    /// Data capturing `pointer`.
    pub fn pointer_captured_data(&self, pointer: PointerId) -> Option<DataHandle> {
        self.pointers
            .get(&pointer)
            .and_then(|state| state.captured)
            .map(|capture| capture.data)
    }

    /// Node hovered by `pointer`.
    pub fn pointer_hovered_node(&self, pointer: PointerId) -> Option<NodeHandle> {
        self.pointers.get(&pointer).and_then(|state| state.hovered)
    }

    /// Last position of `pointer`, in UI coordinates.
    pub fn pointer_position(&self, pointer: PointerId) -> Option<Point> {
        self.pointers.get(&pointer).and_then(|state| state.position)
    }

    /// Drop capture, hover and focus that can't receive events anymore.
    pub(crate) fn validate_event_state(&mut self) {
        let composition = &self.composition;
        let layers = &self.layers;
        for (pointer, state) in &mut self.pointers {
            if let Some(capture) = state.captured {
                let valid = composition.is_node_event_enabled(capture.node)
                    && layers.data_node(capture.data) == Ok(Some(capture.node));
                if !valid {
                    debug!("pointer {pointer} lost capture of {:?}", capture.node);
                    state.captured = None;
                }
            }
            if state
                .hovered
                .is_some_and(|node| !composition.is_node_event_enabled(node))
            {
                state.hovered = None;
            }
        }
        if let Some(node) = self.focused {
            let focusable = self
                .tree
                .node_flags(node)
                .is_ok_and(|flags| flags.contains(NodeFlags::FOCUSABLE));
            if !focusable || !composition.is_node_event_enabled(node) {
                debug!("dropping focus of {node:?}");
                self.focused = None;
            }
        }
    }

    /// Nodes under `position` that can receive events, topmost first.
    fn hit_nodes(&self, position: Point) -> Hits {
        let composition = &self.composition;
        let ids = composition.visible_node_ids();
        let handles = composition.visible_node_handles();
        let event_mask = composition.event_mask();
        let offsets = composition.absolute_offsets();
        let sizes = self.tree.node_sizes();
        let mut hits = Hits::new();
        for index in (0..ids.len()).rev() {
            let id = ids[index] as usize;
            if !event_mask[id] {
                continue;
            }
            if !Rect::from_origin_size(offsets[id], sizes[id]).contains(position) {
                continue;
            }
            if composition
                .clip_at(index)
                .is_some_and(|clip| clip.contains(position))
            {
                hits.push(handles[index]);
            }
        }
        hits
    }

    /// Data of event layers on `node`, in the order they're offered events.
    fn event_data(&self, node: NodeHandle) -> Candidates {
        let mut candidates = Candidates::new();
        for entry in self.layers.ordered().rev() {
            if !entry.features.contains(LayerFeatures::EVENT) {
                continue;
            }
            let Some(order) = self.draw_order.layer(entry.handle) else {
                continue;
            };
            for &id in order.node_data(node.index()).iter().rev() {
                if let Some(data) = entry.data.handle_at(id) {
                    candidates.push(DataHandle::new(entry.handle, data));
                }
            }
        }
        candidates
    }

    /// Offer `event` to `candidates` until one accepts it.
    fn deliver<E: Accept>(
        &mut self,
        candidates: &[DataHandle],
        event: &mut E,
        mut call: impl FnMut(&mut Box<dyn Layer>, u32, &mut E),
    ) -> Option<DataHandle> {
        for &data in candidates {
            let Ok(entry) = self.layers.entry_mut(data.layer) else {
                continue;
            };
            call(&mut entry.layer, data.data.index(), event);
            if event.is_accepted() {
                return Some(data);
            }
        }
        None
    }

    /// Send an enter or leave notification to every data on `node`.
    fn notify_hover(
        &mut self,
        node: NodeHandle,
        pointer: PointerId,
        position: Point,
        relative: kurbo::Vec2,
        enter: bool,
    ) {
        let Some(rect) = self.composition.node_rect(&self.tree, node) else {
            return;
        };
        let captured = self.pointer_captured_node(pointer) == Some(node);
        let candidates = self.event_data(node);
        for data in candidates {
            let Ok(entry) = self.layers.entry_mut(data.layer) else {
                continue;
            };
            let mut event = PointerMoveEvent::with_pointer(pointer);
            event.set_relative_position(relative);
            event.prepare(local(position, rect), rect.size(), captured, enter);
            let id = data.data.index();
            if enter {
                entry.layer.pointer_enter_event(id, &mut event);
            } else {
                entry.layer.pointer_leave_event(id, &mut event);
            }
        }
    }

    /// Blur the focused node and offer focus to `target`.
    ///
    /// Returns whether `target` ends up focused.
    fn change_focus(&mut self, target: Option<NodeHandle>, event: &mut FocusEvent) -> bool {
        if target.is_some() && self.focused == target {
            return true;
        }
        if let Some(old) = self.focused.take() {
            trace!("blurring {old:?}");
            for data in self.event_data(old) {
                if let Ok(entry) = self.layers.entry_mut(data.layer) {
                    entry
                        .layer
                        .blur_event(data.data.index(), &mut FocusEvent::new());
                }
            }
        }
        let Some(node) = target.filter(|node| self.composition.is_node_event_enabled(*node)) else {
            return false;
        };
        let candidates = self.event_data(node);
        if self
            .deliver(&candidates, event, |layer, id, e| layer.focus_event(id, e))
            .is_some()
        {
            trace!("focused {node:?}");
            self.focused = Some(node);
            true
        } else {
            false
        }
    }

    fn key_target(&self) -> Option<NodeHandle> {
        self.focused.or_else(|| self.current_hovered_node())
    }
}

fn local(position: Point, rect: Rect) -> Point {
    (position - rect.origin()).to_point()
}
