// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dragging a window around with pointer capture, drawn by a separate layer.
//!
//! This example shows how to:
//! - register a drawing layer and an event layer on the same nodes,
//! - keep dragging a node after the pointer leaves it, through capture,
//! - bring a pressed window to the front with the top-level order list,
//! - animate a node with an [`Animator`].
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p strata_demos --example drag_capture`

use std::collections::HashMap;
use std::time::Duration;

use kurbo::{Point, Size};
use strata_ui::{
    Animator, AnimatorContext, AnimatorFeatures, LayerDraw, LayerFeatures, LayerUpdate, NodeFlags,
    NodeHandle, PointerEvent, PointerMoveEvent, Ui,
};

/// Draws a labelled rectangle per data by printing it.
struct Boxes {
    labels: HashMap<u32, &'static str>,
}

impl strata_ui::Layer for Boxes {
    fn features(&self) -> LayerFeatures {
        LayerFeatures::DRAW
    }

    fn clean(&mut self, removed: &[bool]) {
        for (id, removed) in (0..).zip(removed) {
            if *removed {
                self.labels.remove(&id);
            }
        }
    }

    fn update(&mut self, update: &LayerUpdate<'_>) {
        log::debug!("boxes: {} visible", update.data_ids.len());
    }

    fn draw(&mut self, draw: &LayerDraw<'_>) {
        for (&data, &node) in draw.data().iter().zip(draw.nodes()) {
            let origin = draw.node_offsets[node as usize];
            let size = draw.node_sizes[node as usize];
            let label = self.labels.get(&data).copied().unwrap_or("?");
            println!(
                "  {label:<8} at ({:>5.1}, {:>5.1}) size {}x{}",
                origin.x, origin.y, size.width, size.height
            );
        }
    }
}

/// Moves the node it's attached to by the pointer motion while captured.
#[derive(Default)]
struct Drag {
    moves: Vec<(u32, kurbo::Vec2)>,
}

impl strata_ui::Layer for Drag {
    fn features(&self) -> LayerFeatures {
        LayerFeatures::EVENT
    }

    fn pointer_press_event(&mut self, _data: u32, event: &mut PointerEvent) {
        event.set_accepted(true);
    }

    fn pointer_move_event(&mut self, data: u32, event: &mut PointerMoveEvent) {
        if event.is_captured() {
            self.moves.push((data, event.relative_position()));
            event.set_accepted(true);
        }
    }

    fn pointer_release_event(&mut self, _data: u32, event: &mut PointerEvent) {
        event.set_accepted(true);
    }
}

/// Slides a node horizontally over one second.
struct SlideIn {
    node: Option<NodeHandle>,
    from: f64,
    to: f64,
}

impl Animator for SlideIn {
    fn features(&self) -> AnimatorFeatures {
        AnimatorFeatures::NODE_ATTACHMENT
    }

    fn advance(&mut self, time: Duration, context: &mut AnimatorContext<'_>) {
        let Some(node) = self.node else {
            return;
        };
        let t = time.as_secs_f64().min(1.0);
        let y = context.node_offset(node).map_or(0.0, |p| p.y);
        if context
            .set_node_offset(node, Point::new(self.from + (self.to - self.from) * t, y))
            .is_err()
        {
            self.node = None;
        }
    }

    fn clean_nodes(&mut self, removed: &[NodeHandle]) {
        if self.node.is_some_and(|node| removed.contains(&node)) {
            self.node = None;
        }
    }
}

fn main() {
    env_logger::init();

    let mut ui = Ui::new(Size::new(320.0, 240.0));
    let boxes = ui
        .create_layer(Boxes {
            labels: HashMap::new(),
        })
        .unwrap();
    let drag = ui.create_layer(Drag::default()).unwrap();

    let window = |ui: &mut Ui, x: f64, label: &'static str| {
        let node = ui
            .create_node(None, Point::new(x, 20.0), Size::new(100.0, 80.0), NodeFlags::CLIP)
            .unwrap();
        let title = ui
            .create_node(Some(node), Point::ZERO, Size::new(100.0, 16.0), NodeFlags::empty())
            .unwrap();
        let data = ui.create_data(boxes, Some(node)).unwrap();
        ui.layer_mut::<Boxes>(boxes)
            .unwrap()
            .labels
            .insert(data.data.index(), label);
        ui.create_data(drag, Some(title)).unwrap();
        node
    };
    let left = window(&mut ui, 20.0, "left");
    let right = window(&mut ui, 90.0, "right");

    println!("initial:");
    ui.draw();

    // Press the left window's title bar and drag it far to the right; the
    // pointer leaves the title bar but capture keeps the moves coming.
    let mut press = PointerEvent::new(0);
    ui.pointer_press_event(Point::new(30.0, 25.0), &mut press)
        .unwrap();
    ui.set_node_order(left, None).unwrap();
    let mut position = Point::new(30.0, 25.0);
    for _ in 0..5 {
        position.x += 30.0;
        ui.pointer_move_event(position, &mut PointerMoveEvent::new())
            .unwrap();
        let delta: kurbo::Vec2 = ui
            .layer_mut::<Drag>(drag)
            .unwrap()
            .moves
            .drain(..)
            .fold(kurbo::Vec2::ZERO, |sum, (_, delta)| sum + delta);
        let offset = ui.node_offset(left).unwrap();
        ui.set_node_offset(left, offset + delta).unwrap();
    }
    ui.pointer_release_event(position, &mut PointerEvent::new(0))
        .unwrap();

    println!("after dragging left to the front:");
    ui.draw();

    let slide = ui
        .create_animator(SlideIn {
            node: Some(right),
            from: -100.0,
            to: 90.0,
        })
        .unwrap();
    for ms in [0, 500, 1000] {
        ui.advance_animations(Duration::from_millis(ms));
        println!("slide at {ms} ms:");
        ui.draw();
    }
    ui.remove_animator(slide).unwrap();

    ui.remove_node(right).unwrap();
    ui.update();
    println!("after removing right:");
    ui.draw();
}
