// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event objects handed to [`Layer`](crate::Layer) callbacks.
//!
//! Every event carries an *accepted* bit. A layer marks an event as handled by
//! calling `set_accepted(true)`; the router stops looking for further
//! receivers as soon as that happens. Positions are local to the node the
//! event is delivered to.
//!
//! Events are reused across receivers of one dispatch, so a layer must not
//! assume any state it didn't set itself survives to the next callback.

use alloc::string::String;
use core::num::NonZeroU64;
use kurbo::{Point, Size, Vec2};

/// Stable identifier of a pointer (mouse, finger, pen) across events.
pub type PointerId = NonZeroU64;

/// Pointer id of the mouse or the first touch.
///
/// Key events without a focused node go to the node this pointer hovers.
pub const PRIMARY_POINTER: PointerId = NonZeroU64::MIN;

/// Pointer button index; `0` for contacts without buttons.
pub type Button = u8;

/// Toolkit-defined key code.
pub type Key = u32;

bitflags::bitflags! {
    /// Keyboard modifiers held while a key event happened.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// Shift.
        const SHIFT = 1 << 0;
        /// Control.
        const CTRL  = 1 << 1;
        /// Alt / Option.
        const ALT   = 1 << 2;
        /// Super / Command / Windows.
        const SUPER = 1 << 3;
    }
}

/// Access to the accepted bit shared by all event types.
pub(crate) trait Accept {
    fn is_accepted(&self) -> bool;
}

macro_rules! impl_accept {
    ($($ty:ty),*) => {
        $(impl Accept for $ty {
            fn is_accepted(&self) -> bool {
                self.accepted
            }
        })*
    };
}

impl_accept!(PointerEvent, PointerMoveEvent, FocusEvent, KeyEvent, TextInputEvent);

/// Pointer press or release.
#[derive(Clone, Debug, PartialEq)]
pub struct PointerEvent {
    pointer_id: PointerId,
    button: Button,
    position: Point,
    node_size: Size,
    accepted: bool,
    captured: bool,
}

impl PointerEvent {
    /// A press or release of `button` on the [primary pointer](PRIMARY_POINTER).
    pub fn new(button: Button) -> Self {
        Self::with_pointer(PRIMARY_POINTER, button)
    }

    /// A press or release of `button` on `pointer_id`.
    pub fn with_pointer(pointer_id: PointerId, button: Button) -> Self {
        Self {
            pointer_id,
            button,
            position: Point::ZERO,
            node_size: Size::ZERO,
            accepted: false,
            captured: false,
        }
    }

    /// Pointer the event comes from.
    pub fn pointer_id(&self) -> PointerId {
        self.pointer_id
    }

    /// Button pressed or released.
    pub fn button(&self) -> Button {
        self.button
    }

    /// Position relative to the receiving node's origin.
    pub fn position(&self) -> Point {
        self.position
    }

    /// Size of the receiving node.
    pub fn node_size(&self) -> Size {
        self.node_size
    }

    /// Whether a layer accepted the event.
    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    /// Mark the event as handled, or unmark it.
    pub fn set_accepted(&mut self, accepted: bool) {
        self.accepted = accepted;
    }

    /// Whether the receiving node has (for a press: will get) the pointer captured.
    pub fn is_captured(&self) -> bool {
        self.captured
    }

    /// On press, ask for (the default) or opt out of capturing the pointer.
    ///
    /// Ignored on release, which always ends capture.
    pub fn set_captured(&mut self, captured: bool) {
        self.captured = captured;
    }

    pub(crate) fn prepare(&mut self, position: Point, node_size: Size, captured: bool) {
        self.position = position;
        self.node_size = node_size;
        self.captured = captured;
        self.accepted = false;
    }
}

/// Pointer motion, also used for enter and leave notifications.
#[derive(Clone, Debug, PartialEq)]
pub struct PointerMoveEvent {
    pointer_id: PointerId,
    position: Point,
    relative_position: Vec2,
    node_size: Size,
    accepted: bool,
    captured: bool,
    hovering: bool,
}

impl PointerMoveEvent {
    /// A move of the [primary pointer](PRIMARY_POINTER).
    pub fn new() -> Self {
        Self::with_pointer(PRIMARY_POINTER)
    }

    /// A move of `pointer_id`.
    pub fn with_pointer(pointer_id: PointerId) -> Self {
        Self {
            pointer_id,
            position: Point::ZERO,
            relative_position: Vec2::ZERO,
            node_size: Size::ZERO,
            accepted: false,
            captured: false,
            hovering: false,
        }
    }

    /// Pointer the event comes from.
    pub fn pointer_id(&self) -> PointerId {
        self.pointer_id
    }

    /// Position relative to the receiving node's origin.
    pub fn position(&self) -> Point {
        self.position
    }

    /// Motion since the previous event of this pointer, zero for its first event.
    pub fn relative_position(&self) -> Vec2 {
        self.relative_position
    }

    /// Size of the receiving node.
    pub fn node_size(&self) -> Size {
        self.node_size
    }

    /// Whether a layer accepted the event.
    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    /// Mark the event as handled, or unmark it.
    pub fn set_accepted(&mut self, accepted: bool) {
        self.accepted = accepted;
    }

    /// Whether the event reached the node because it holds the pointer capture.
    pub fn is_captured(&self) -> bool {
        self.captured
    }

    /// Release the capture (`false`) while handling a captured move.
    ///
    /// Setting it on an uncaptured move has no effect; moves never start a capture.
    pub fn set_captured(&mut self, captured: bool) {
        self.captured = captured;
    }

    /// Whether the pointer is inside the receiving node.
    ///
    /// Always true for hit-tested deliveries; for captured moves it tells
    /// whether the pointer left the node.
    pub fn is_hovering(&self) -> bool {
        self.hovering
    }

    pub(crate) fn set_relative_position(&mut self, relative: Vec2) {
        self.relative_position = relative;
    }

    pub(crate) fn prepare(&mut self, position: Point, node_size: Size, captured: bool, hovering: bool) {
        self.position = position;
        self.node_size = node_size;
        self.captured = captured;
        self.hovering = hovering;
        self.accepted = false;
    }
}

impl Default for PointerMoveEvent {
    fn default() -> Self {
        Self::new()
    }
}

/// Focus gained or lost.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FocusEvent {
    accepted: bool,
}

impl FocusEvent {
    /// A fresh focus event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a layer accepted the event.
    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    /// Accept focus. A node only becomes focused if one of its data accepts.
    pub fn set_accepted(&mut self, accepted: bool) {
        self.accepted = accepted;
    }
}

/// Key press or release.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    key: Key,
    modifiers: Modifiers,
    accepted: bool,
}

impl KeyEvent {
    /// A key event for `key` with `modifiers` held.
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self {
            key,
            modifiers,
            accepted: false,
        }
    }

    /// Key code.
    pub fn key(&self) -> Key {
        self.key
    }

    /// Modifiers held.
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Whether a layer accepted the event.
    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    /// Mark the event as handled, or unmark it.
    pub fn set_accepted(&mut self, accepted: bool) {
        self.accepted = accepted;
    }
}

/// Composed text input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextInputEvent {
    text: String,
    accepted: bool,
}

impl TextInputEvent {
    /// A text input event carrying `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            accepted: false,
        }
    }

    /// The input text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether a layer accepted the event.
    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    /// Mark the event as handled, or unmark it.
    pub fn set_accepted(&mut self, accepted: bool) {
        self.accepted = accepted;
    }
}
