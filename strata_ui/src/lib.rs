// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Strata UI: the retained-mode core of a user interface.
//!
//! ## Overview
//!
//! A [`Ui`] owns a node hierarchy (see [`strata_tree`]) and a set of
//! [`Layer`]s. Nodes only carry geometry and behavior flags; everything that
//! is drawn or reacts to input lives in layers, as *data* attached to nodes.
//! The UI decides which data are visible, in which order they draw, and which
//! of them receive an event.
//!
//! ## Update cycle
//!
//! Mutations only mark a [`UiState`]. [`Ui::update`], which drawing and every
//! event dispatch run first, performs exactly the work the state asks for:
//!
//! 1) sweep nodes below removed ones and prune data attached to them;
//! 2) rebuild the visible sequence;
//! 3) cull it against the UI size and compute clip rectangles;
//! 4) rebuild the per-layer data lists and the [`DrawOrder`];
//! 5) call [`Layer::update`] on layers whose lists changed or that asked for it.
//!
//! ## Draw order
//!
//! Top-level nodes draw in their order list, back to front. Within each
//! top-level subtree, layers draw in registration order, each drawing the data
//! of the whole subtree in depth-first node order. Adjacent empty ranges are
//! dropped, so a layer with nothing in a subtree costs no draw call.
//!
//! ## Events
//!
//! Pointer events are hit-tested front to back and delivered to data until one
//! accepts. Presses capture the pointer for their node. Key and text events go
//! to the focused node. See [`Ui::pointer_press_event`] and the `router`
//! methods next to it for the precise rules.
//!
//! ## Animation
//!
//! [`Animator`]s advance with [`Ui::advance_animations`] and write through an
//! [`AnimatorContext`], which marks the UI dirty like the regular setters.
//!
//! ```rust
//! use kurbo::{Point, Size};
//! use strata_ui::{Layer, LayerFeatures, NodeFlags, PointerEvent, Ui};
//!
//! #[derive(Default)]
//! struct Clicks(u32);
//!
//! impl Layer for Clicks {
//!     fn features(&self) -> LayerFeatures {
//!         LayerFeatures::EVENT
//!     }
//!     fn pointer_press_event(&mut self, _data: u32, event: &mut PointerEvent) {
//!         self.0 += 1;
//!         event.set_accepted(true);
//!     }
//! }
//!
//! let mut ui = Ui::new(Size::new(100.0, 100.0));
//! let layer = ui.create_layer(Clicks::default()).unwrap();
//! let a = ui
//!     .create_node(None, Point::ZERO, Size::new(20.0, 20.0), NodeFlags::empty())
//!     .unwrap();
//! let b = ui
//!     .create_node(None, Point::new(40.0, 0.0), Size::new(20.0, 20.0), NodeFlags::empty())
//!     .unwrap();
//! ui.create_data(layer, Some(a)).unwrap();
//! ui.create_data(layer, Some(b)).unwrap();
//!
//! let mut press = PointerEvent::new(0);
//! assert!(ui.pointer_press_event(Point::new(50.0, 10.0), &mut press).unwrap());
//! assert_eq!(press.position(), Point::new(10.0, 10.0));
//! assert_eq!(ui.current_captured_node(), Some(b));
//! assert_eq!(ui.layer::<Clicks>(layer).unwrap().0, 1);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod animator;
mod draw_order;
mod error;
mod event;
mod layer;
mod registry;
mod router;
mod ui;

pub use animator::{Animator, AnimatorContext, AnimatorFeatures};
pub use draw_order::{
    ClipRectRef, Draw, DrawOrder, LayerAttachments, LayerOrder, compact_draws_in_place,
};
pub use error::UiError;
pub use event::{
    Button, FocusEvent, Key, KeyEvent, Modifiers, PRIMARY_POINTER, PointerEvent, PointerId,
    PointerMoveEvent, TextInputEvent,
};
pub use layer::{Layer, LayerDraw, LayerFeatures, LayerUpdate};
pub use strata_handle::{AnimatorHandle, DataHandle, LayerDataHandle, LayerHandle, NodeHandle};
pub use strata_tree::{ClipRect, NodeFlags};
pub use ui::{Ui, UiState};
