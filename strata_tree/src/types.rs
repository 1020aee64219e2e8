// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the tree: node flags and clip rectangles.

use kurbo::{Point, Rect, Size};

bitflags::bitflags! {
    /// Per-node behavior flags.
    ///
    /// Except for [`FOCUSABLE`](Self::FOCUSABLE), every flag applies to the
    /// whole subtree of the node carrying it.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// The node and its descendants are left out of the visible sequence.
        const HIDDEN    = 0b0000_0001;
        /// Descendants are clipped to the node's rectangle.
        const CLIP      = 0b0000_0010;
        /// The node and its descendants don't receive pointer events.
        const NO_EVENTS = 0b0000_0100;
        /// The node and its descendants are drawn disabled and don't receive events.
        const DISABLED  = 0b0000_1000;
        /// The node and its descendants are excluded from background blur.
        const NO_BLUR   = 0b0001_0000;
        /// The node can receive focus when pressed.
        const FOCUSABLE = 0b0010_0000;
    }
}

/// An axis-aligned clip applied to a run of consecutive visible-sequence entries.
///
/// A zero [`size`](Self::size) means the run is clipped only by the viewport.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClipRect {
    /// Top-left corner, in UI coordinates.
    pub offset: Point,
    /// Extent of the clip.
    pub size: Size,
    /// Number of consecutive visible-sequence entries this clip covers.
    pub node_count: u32,
}

impl ClipRect {
    /// Whether this entry is the "viewport only" sentinel.
    #[must_use]
    pub fn is_unclipped(&self) -> bool {
        self.size == Size::ZERO
    }

    /// The clip as a rectangle, resolving the sentinel to `viewport`.
    #[must_use]
    pub fn resolve(&self, viewport: Size) -> Rect {
        if self.is_unclipped() {
            Rect::from_origin_size(Point::ZERO, viewport)
        } else {
            Rect::from_origin_size(self.offset, self.size)
        }
    }
}
