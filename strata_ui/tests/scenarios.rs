// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end behavior of a [`Ui`] with recording layers.

use std::cell::RefCell;
use std::rc::Rc;

use kurbo::{Point, Size};
use strata_ui::{
    ClipRectRef, DataHandle, Layer, LayerDraw, LayerFeatures, LayerUpdate, NodeFlags,
    NodeHandle, PointerEvent, PointerMoveEvent, Ui, UiState,
};

#[derive(Clone, Debug, PartialEq)]
enum Call {
    Clean(Vec<u32>),
    Update(Vec<u32>, Vec<ClipRectRef>),
    Draw(Vec<u32>),
    Press(u32),
    Release(u32),
    Move(u32),
}

type Calls = Rc<RefCell<Vec<Call>>>;

struct Recording {
    features: LayerFeatures,
    calls: Calls,
}

fn recording(features: LayerFeatures) -> (Recording, Calls) {
    let calls = Calls::default();
    (
        Recording {
            features,
            calls: calls.clone(),
        },
        calls,
    )
}

impl Layer for Recording {
    fn features(&self) -> LayerFeatures {
        self.features
    }

    fn clean(&mut self, removed: &[bool]) {
        let ids = (0..)
            .zip(removed)
            .filter(|(_, removed)| **removed)
            .map(|(id, _)| id)
            .collect();
        self.calls.borrow_mut().push(Call::Clean(ids));
    }

    fn update(&mut self, update: &LayerUpdate<'_>) {
        self.calls.borrow_mut().push(Call::Update(
            update.data_ids.to_vec(),
            update.clip_rect_refs.to_vec(),
        ));
    }

    fn draw(&mut self, draw: &LayerDraw<'_>) {
        self.calls.borrow_mut().push(Call::Draw(draw.data().to_vec()));
    }

    fn pointer_press_event(&mut self, data_id: u32, event: &mut PointerEvent) {
        self.calls.borrow_mut().push(Call::Press(data_id));
        event.set_accepted(true);
    }

    fn pointer_release_event(&mut self, data_id: u32, event: &mut PointerEvent) {
        self.calls.borrow_mut().push(Call::Release(data_id));
        event.set_accepted(true);
    }

    fn pointer_move_event(&mut self, data_id: u32, event: &mut PointerMoveEvent) {
        self.calls.borrow_mut().push(Call::Move(data_id));
        event.set_accepted(true);
    }
}

fn node(ui: &mut Ui, parent: Option<NodeHandle>, offset: (f64, f64), size: (f64, f64)) -> NodeHandle {
    ui.create_node(
        parent,
        Point::new(offset.0, offset.1),
        Size::new(size.0, size.1),
        NodeFlags::empty(),
    )
    .unwrap()
}

#[test]
fn press_between_siblings_hits_only_the_one_under_the_pointer() {
    let (layer, calls) = recording(LayerFeatures::EVENT);
    let mut ui = Ui::new(Size::new(100.0, 100.0));
    let layer = ui.create_layer(layer).unwrap();
    let a = node(&mut ui, None, (0.0, 0.0), (20.0, 20.0));
    let b = node(&mut ui, None, (40.0, 0.0), (20.0, 20.0));
    ui.create_data(layer, Some(a)).unwrap();
    let b_data = ui.create_data(layer, Some(b)).unwrap();
    ui.update();
    calls.borrow_mut().clear();

    let mut event = PointerEvent::new(0);
    assert!(ui.pointer_press_event(Point::new(50.0, 10.0), &mut event).unwrap());
    assert_eq!(calls.borrow().as_slice(), &[Call::Press(b_data.data.index())]);
    assert_eq!(event.position(), Point::new(10.0, 10.0));
    assert_eq!(event.node_size(), Size::new(20.0, 20.0));
}

#[test]
fn zero_sized_clip_parent_shows_nothing_below_it() {
    let (layer, calls) = recording(LayerFeatures::DRAW);
    let mut ui = Ui::new(Size::new(100.0, 100.0));
    let layer = ui.create_layer(layer).unwrap();
    let parent = ui
        .create_node(None, Point::ZERO, Size::ZERO, NodeFlags::CLIP)
        .unwrap();
    let child = node(&mut ui, Some(parent), (0.0, 0.0), (50.0, 50.0));
    ui.create_data(layer, Some(child)).unwrap();

    ui.draw();
    assert!(!ui.is_node_visible(child));
    assert_eq!(ui.composition().visible_children_counts()[0], 1);
    assert_eq!(calls.borrow().as_slice(), &[Call::Update(vec![], vec![])]);
    assert!(ui.draw_order().draws().is_empty());
}

#[test]
fn removed_subtree_is_released_by_clean() {
    let (layer, calls) = recording(LayerFeatures::DRAW);
    let mut ui = Ui::new(Size::new(100.0, 100.0));
    let layer = ui.create_layer(layer).unwrap();
    let root = node(&mut ui, None, (0.0, 0.0), (50.0, 50.0));
    let child = node(&mut ui, Some(root), (0.0, 0.0), (20.0, 20.0));
    let grandchild = node(&mut ui, Some(child), (0.0, 0.0), (10.0, 10.0));
    let unrelated = node(&mut ui, None, (60.0, 0.0), (10.0, 10.0));
    let child_data = ui.create_data(layer, Some(child)).unwrap();
    let grandchild_data = ui.create_data(layer, Some(grandchild)).unwrap();
    let kept = ui.create_data(layer, Some(unrelated)).unwrap();
    ui.update();
    calls.borrow_mut().clear();

    ui.remove_node(root).unwrap();
    assert_eq!(ui.node_used_count(), 3, "only the root itself is freed");
    assert!(ui.is_node_valid(child) && ui.is_node_valid(grandchild));
    assert!(ui.is_data_valid(child_data));

    ui.clean();
    assert_eq!(ui.node_used_count(), 1);
    for node in [root, child, grandchild] {
        assert!(!ui.is_node_valid(node));
    }
    assert!(!ui.is_data_valid(child_data));
    assert!(!ui.is_data_valid(grandchild_data));
    assert!(ui.is_data_valid(kept));
    assert_eq!(calls.borrow().as_slice(), &[Call::Clean(vec![0, 1])]);

    ui.update();
    assert_eq!(calls.borrow().last(), Some(&Call::Update(vec![2], vec![ClipRectRef {
        clip_rect: 0,
        data_count: 1,
    }])));
}

#[test]
fn updates_without_changes_call_no_layers() {
    let (layer, calls) = recording(LayerFeatures::DRAW | LayerFeatures::EVENT);
    let mut ui = Ui::new(Size::new(100.0, 100.0));
    let layer = ui.create_layer(layer).unwrap();
    let a = node(&mut ui, None, (0.0, 0.0), (20.0, 20.0));
    ui.create_data(layer, Some(a)).unwrap();

    ui.update();
    assert_eq!(ui.state(), UiState::empty());
    let after_first = calls.borrow().len();
    ui.update();
    ui.update();
    assert_eq!(calls.borrow().len(), after_first);

    // Events update first, but there's nothing to do either.
    ui.pointer_move_event(Point::new(5.0, 5.0), &mut PointerMoveEvent::new())
        .unwrap();
    assert_eq!(calls.borrow().last(), Some(&Call::Move(0)));
    assert_eq!(calls.borrow().len(), after_first + 1);
}

#[test]
fn capture_survives_leaving_the_node_and_ends_on_release() {
    let (layer, calls) = recording(LayerFeatures::EVENT);
    let mut ui = Ui::new(Size::new(100.0, 100.0));
    let layer = ui.create_layer(layer).unwrap();
    let a = node(&mut ui, None, (0.0, 0.0), (20.0, 20.0));
    let b = node(&mut ui, None, (40.0, 0.0), (20.0, 20.0));
    let a_data = ui.create_data(layer, Some(a)).unwrap();
    ui.create_data(layer, Some(b)).unwrap();

    ui.pointer_press_event(Point::new(10.0, 10.0), &mut PointerEvent::new(0))
        .unwrap();
    assert_eq!(ui.current_captured_node(), Some(a));
    assert_eq!(
        ui.pointer_captured_data(strata_ui::PRIMARY_POINTER),
        Some(a_data)
    );

    let mut event = PointerMoveEvent::new();
    ui.pointer_move_event(Point::new(50.0, 10.0), &mut event)
        .unwrap();
    assert!(event.is_captured());
    assert!(!event.is_hovering());
    assert_eq!(event.position(), Point::new(50.0, 10.0));

    ui.pointer_release_event(Point::new(50.0, 10.0), &mut PointerEvent::new(0))
        .unwrap();
    assert_eq!(ui.current_captured_node(), None);
    assert_eq!(calls.borrow().as_slice(), &[
        Call::Press(0),
        Call::Move(0),
        Call::Release(0),
    ]);
}

#[test]
fn hiding_a_captured_node_drops_the_capture_at_next_update() {
    let (layer, _) = recording(LayerFeatures::EVENT);
    let mut ui = Ui::new(Size::new(100.0, 100.0));
    let layer = ui.create_layer(layer).unwrap();
    let a = node(&mut ui, None, (0.0, 0.0), (20.0, 20.0));
    ui.create_data(layer, Some(a)).unwrap();
    ui.pointer_press_event(Point::new(10.0, 10.0), &mut PointerEvent::new(0))
        .unwrap();

    ui.add_node_flags(a, NodeFlags::HIDDEN).unwrap();
    assert_eq!(ui.current_captured_node(), Some(a), "checked lazily");
    ui.update();
    assert_eq!(ui.current_captured_node(), None);
}

#[test]
fn layers_interleave_per_top_level_node() {
    let (background, background_calls) = recording(LayerFeatures::DRAW);
    let (text, text_calls) = recording(LayerFeatures::DRAW);
    let mut ui = Ui::new(Size::new(100.0, 100.0));
    let background = ui.create_layer(background).unwrap();
    let text = ui.create_layer(text).unwrap();
    let window = node(&mut ui, None, (0.0, 0.0), (50.0, 50.0));
    let popup = node(&mut ui, None, (10.0, 10.0), (30.0, 30.0));
    ui.create_data(background, Some(window)).unwrap();
    ui.create_data(text, Some(window)).unwrap();
    ui.create_data(background, Some(popup)).unwrap();
    ui.create_data(text, Some(popup)).unwrap();

    ui.draw();
    let draws: Vec<_> = ui.draw_order().draws().iter().map(|d| d.layer).collect();
    assert_eq!(draws, vec![background, text, background, text]);
    assert_eq!(background_calls.borrow()[1..], [Call::Draw(vec![0]), Call::Draw(vec![1])]);
    assert_eq!(text_calls.borrow()[1..], [Call::Draw(vec![0]), Call::Draw(vec![1])]);

    // Bringing the window to the front swaps the pairs.
    ui.set_node_order(window, None).unwrap();
    ui.update();
    assert_eq!(ui.draw_order().layer(background).unwrap().data_ids(), &[1, 0]);
}

#[test]
fn data_moved_between_nodes_follows_its_node() {
    let (layer, _) = recording(LayerFeatures::DRAW);
    let mut ui = Ui::new(Size::new(100.0, 100.0));
    let layer = ui.create_layer(layer).unwrap();
    let a = node(&mut ui, None, (0.0, 0.0), (20.0, 20.0));
    let b = node(&mut ui, None, (40.0, 0.0), (20.0, 20.0));
    let data: DataHandle = ui.create_data(layer, Some(a)).unwrap();
    ui.update();
    assert_eq!(ui.draw_order().layer(layer).unwrap().node_ids(), &[a.index()]);

    ui.attach_data(data, Some(b)).unwrap();
    assert_eq!(ui.state(), UiState::NEEDS_DATA_ATTACHMENT_UPDATE);
    ui.update();
    assert_eq!(ui.draw_order().layer(layer).unwrap().node_ids(), &[b.index()]);

    ui.attach_data(data, None).unwrap();
    ui.update();
    assert!(ui.draw_order().layer(layer).unwrap().data_ids().is_empty());
}
