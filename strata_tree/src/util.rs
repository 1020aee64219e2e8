// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use kurbo::Rect;

/// Half-open overlap test. Rectangles with zero area never overlap anything.
///
/// Two rectangles sharing only an edge do not overlap, consistent with
/// [`Rect::contains`] treating the far edges as outside.
pub(crate) fn rects_overlap(a: Rect, b: Rect) -> bool {
    a.width() > 0.0
        && a.height() > 0.0
        && b.width() > 0.0
        && b.height() > 0.0
        && a.x0 < b.x1
        && b.x0 < a.x1
        && a.y0 < b.y1
        && b.y0 < a.y1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_edge_is_not_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(!rects_overlap(a, Rect::new(10.0, 0.0, 20.0, 10.0)));
        assert!(rects_overlap(a, Rect::new(9.5, 0.0, 20.0, 10.0)));
    }

    #[test]
    fn zero_area_never_overlaps() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(!rects_overlap(a, Rect::new(5.0, 5.0, 5.0, 8.0)));
        assert!(!rects_overlap(Rect::new(5.0, 5.0, 5.0, 5.0), a));
    }
}
