//! End-to-end gesture tests: drive the app through pointer calls and ticks
//! the same way the canvas widget does, with deterministic ids and jitter.

use crate::interaction::Gesture;
use crate::types::{IdGen, MindMap, Node, NodeId, Shape};
use crate::ui::state::MindMapApp;
use eframe::egui::{pos2, Modifiers, PointerButton};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::collections::HashSet;

/// App with nodes "A" at (0,0) and "B" at (200,0), identity view transform.
fn app_with_pair() -> (MindMapApp, NodeId, NodeId) {
    let mut app = MindMapApp::default();
    app.map = MindMap::new();
    app.id_gen = IdGen::sequential();
    app.rng = SmallRng::seed_from_u64(42);
    let a = app
        .map
        .add_node(Node::new(app.id_gen.next(), "A", (0.0, 0.0), Shape::Circle));
    let b = app
        .map
        .add_node(Node::new(app.id_gen.next(), "B", (200.0, 0.0), Shape::Circle));
    app.sim.restore(&app.map);
    (app, a, b)
}

fn link(app: &mut MindMapApp, a: NodeId, b: NodeId) {
    let mut ids = std::mem::take(&mut app.id_gen);
    app.map.apply_link(&mut ids, &[a], b);
    app.id_gen = ids;
}

#[test]
fn click_selects_without_mutating() {
    let (mut app, a, _) = app_with_pair();
    app.pointer_down(pos2(0.0, 0.0), PointerButton::Primary, Modifiers::NONE, 0.0);
    app.pointer_move(pos2(2.0, 1.0), 0.01);
    app.pointer_up(pos2(2.0, 1.0), PointerButton::Primary, 0.02);

    assert_eq!(app.interaction.selected, HashSet::from([a]));
    // Below the drag threshold nothing moves and nothing reaches undo.
    assert_eq!(app.map.node(a).unwrap().position, (0.0, 0.0));
    assert!(!app.undo_history.can_undo());
}

#[test]
fn click_on_empty_clears_selection() {
    let (mut app, a, _) = app_with_pair();
    app.interaction.selected.insert(a);
    app.pointer_down(pos2(500.0, 500.0), PointerButton::Primary, Modifiers::NONE, 0.0);
    app.pointer_up(pos2(500.0, 500.0), PointerButton::Primary, 0.01);
    assert!(app.interaction.selected.is_empty());
}

#[test]
fn drag_moves_node_and_is_undoable() {
    let (mut app, a, _) = app_with_pair();
    app.pointer_down(pos2(0.0, 0.0), PointerButton::Primary, Modifiers::NONE, 0.0);
    app.pointer_move(pos2(150.0, 80.0), 0.05);
    app.tick(0.05);
    app.pointer_up(pos2(150.0, 80.0), PointerButton::Primary, 0.1);

    assert_eq!(app.map.node(a).unwrap().position, (150.0, 80.0));
    assert!(app.undo_history.can_undo());

    app.perform_undo();
    assert_eq!(app.map.node(a).unwrap().position, (0.0, 0.0));
    assert_eq!(app.sim.pos(a).unwrap(), pos2(0.0, 0.0));
}

#[test]
fn dragged_node_ignores_forces_until_release() {
    let (mut app, a, b) = app_with_pair();
    link(&mut app, a, b);
    app.pointer_down(pos2(0.0, 0.0), PointerButton::Primary, Modifiers::NONE, 0.0);
    app.pointer_move(pos2(-50.0, 0.0), 0.05);
    // Many ticks of spring pull toward B change nothing while held.
    for i in 0..60 {
        app.tick(0.05 + i as f64 / 60.0);
    }
    assert_eq!(app.sim.pos(a).unwrap(), pos2(-50.0, 0.0));
}

#[test]
fn box_select_sweeps_both_nodes() {
    let (mut app, a, b) = app_with_pair();
    app.pointer_down(
        pos2(-100.0, -100.0),
        PointerButton::Primary,
        Modifiers::NONE,
        0.0,
    );
    app.pointer_move(pos2(300.0, 100.0), 0.05);
    app.pointer_up(pos2(300.0, 100.0), PointerButton::Primary, 0.1);

    assert_eq!(app.interaction.selected, HashSet::from([a, b]));
    assert!(!app.undo_history.can_undo());
}

#[test]
fn link_drag_between_nodes_creates_edge() {
    let (mut app, a, b) = app_with_pair();
    app.pointer_down(pos2(0.0, 0.0), PointerButton::Secondary, Modifiers::NONE, 0.0);
    app.pointer_move(pos2(200.0, 0.0), 0.05);
    app.pointer_up(pos2(200.0, 0.0), PointerButton::Secondary, 0.1);

    assert!(app.map.connected(a, b));
    assert!(app.undo_history.can_undo());

    // Repeating the same drag unlinks.
    app.pointer_down(pos2(0.0, 0.0), PointerButton::Secondary, Modifiers::NONE, 0.2);
    app.pointer_move(pos2(200.0, 0.0), 0.25);
    app.pointer_up(pos2(200.0, 0.0), PointerButton::Secondary, 0.3);
    assert!(!app.map.connected(a, b));
}

#[test]
fn link_drag_to_empty_grows_a_connected_bubble_in_edit_mode() {
    let (mut app, a, _) = app_with_pair();
    app.pointer_down(pos2(0.0, 0.0), PointerButton::Secondary, Modifiers::NONE, 0.0);
    app.pointer_move(pos2(500.0, 500.0), 0.05);
    app.pointer_up(pos2(500.0, 500.0), PointerButton::Secondary, 0.1);

    assert_eq!(app.map.nodes.len(), 3);
    let new = app
        .map
        .nodes
        .iter()
        .find(|n| n.position == (500.0, 500.0))
        .unwrap();
    assert!(app.map.connected(a, new.id));
    assert_eq!(app.interaction.selected, HashSet::from([new.id]));
    assert_eq!(app.interaction.editing_node, Some(new.id));
    assert!(app.undo_history.can_undo());
}

#[test]
fn link_drag_onto_an_edge_splits_it_into_edit_mode() {
    let (mut app, a, b) = app_with_pair();
    link(&mut app, a, b);
    let c = {
        let mut ids = std::mem::take(&mut app.id_gen);
        let c = app
            .map
            .add_node(Node::new(ids.next(), "C", (0.0, 300.0), Shape::Circle));
        app.id_gen = ids;
        c
    };
    app.sim.sync(&app.map);

    // Drag from C onto the middle of the A-B edge; (100, 5) is on the
    // segment but outside both bubbles.
    app.pointer_down(pos2(0.0, 300.0), PointerButton::Secondary, Modifiers::NONE, 0.0);
    app.pointer_move(pos2(100.0, 5.0), 0.05);
    app.pointer_up(pos2(100.0, 5.0), PointerButton::Secondary, 0.1);

    assert_eq!(app.map.nodes.len(), 4);
    let new = app
        .interaction
        .editing_node
        .expect("split node starts in edit mode");
    assert_eq!(app.interaction.selected, HashSet::from([new]));
    assert!(app.map.connected(a, new) && app.map.connected(new, b));
    assert!(app.map.connected(c, new));
    assert!(!app.map.connected(a, b));
}

#[test]
fn plain_click_collapses_a_multi_selection() {
    let (mut app, a, b) = app_with_pair();
    app.interaction.selected = HashSet::from([a, b]);

    app.pointer_down(pos2(0.0, 0.0), PointerButton::Primary, Modifiers::NONE, 0.0);
    app.pointer_up(pos2(0.0, 0.0), PointerButton::Primary, 0.01);

    assert_eq!(app.interaction.selected, HashSet::from([a]));
    assert!(!app.undo_history.can_undo());
}

#[test]
fn right_click_without_drag_opens_the_context_menu() {
    let (mut app, a, _) = app_with_pair();
    app.pointer_down(pos2(0.0, 0.0), PointerButton::Secondary, Modifiers::NONE, 0.0);
    app.pointer_up(pos2(1.0, 0.0), PointerButton::Secondary, 0.05);

    assert_eq!(app.context_menu.target.map(|(id, _)| id), Some(a));
    assert_eq!(app.map.edges.len(), 0);
    assert!(!app.undo_history.can_undo());
}

#[test]
fn held_edge_charges_and_merges_toward_the_anchor() {
    let (mut app, _, b) = app_with_pair();
    {
        let mut ids = std::mem::take(&mut app.id_gen);
        app.map.apply_link(&mut ids, &[app.map.nodes[0].id], b);
        app.id_gen = ids;
    }

    // Press on the edge near B; (130, 5) is on neither bubble.
    app.pointer_down(pos2(130.0, 5.0), PointerButton::Primary, Modifiers::NONE, 0.0);
    assert!(matches!(
        app.interaction.session.as_ref().map(|s| &s.gesture),
        Some(Gesture::EdgeTighten { .. })
    ));

    let mut merged_at = None;
    for i in 1..=900 {
        let now = i as f64 / 60.0;
        app.tick(now);
        if app.map.nodes.len() == 1 {
            merged_at = Some(now);
            break;
        }
    }
    let merged_at = merged_at.expect("held edge should merge");
    // No merge can fire before the charge threshold.
    assert!(merged_at > 0.75);

    let survivor = &app.map.nodes[0];
    assert_eq!(survivor.id, b, "endpoint nearer the anchor survives");
    assert_eq!(survivor.text, "B\nA");
    assert!(survivor.dimensions.circle_radius > 50.0);
    assert!(app.map.edges.is_empty());
    assert!(app.interaction.session.is_none());

    app.perform_undo();
    assert_eq!(app.map.nodes.len(), 2);
}

#[test]
fn releasing_a_tighten_early_commits_nothing() {
    let (mut app, a, b) = app_with_pair();
    {
        let mut ids = std::mem::take(&mut app.id_gen);
        app.map.apply_link(&mut ids, &[a], b);
        app.id_gen = ids;
    }

    app.pointer_down(pos2(130.0, 5.0), PointerButton::Primary, Modifiers::NONE, 0.0);
    for i in 1..=20 {
        app.tick(i as f64 / 60.0);
    }
    app.pointer_up(pos2(130.0, 5.0), PointerButton::Primary, 0.35);

    assert_eq!(app.map.nodes.len(), 2);
    assert_eq!(app.map.edges.len(), 1);
    assert!(!app.undo_history.can_undo());
}

#[test]
fn magnet_releases_nodes_that_gain_real_links() {
    let (mut app, a, b) = app_with_pair();
    app.spawn_magnet(0.0);
    let m = app.map.magnet().unwrap();
    assert!(app.map.connected(m, a));
    assert!(app.map.connected(m, b));

    // Link A to B by gesture; both leave the magnet's pull.
    app.pointer_down(pos2(0.0, 0.0), PointerButton::Secondary, Modifiers::NONE, 0.1);
    app.pointer_move(pos2(200.0, 0.0), 0.15);
    app.pointer_up(pos2(200.0, 0.0), PointerButton::Secondary, 0.2);

    assert!(app.map.connected(a, b));
    assert!(!app.map.connected(m, a));
    assert!(!app.map.connected(m, b));

    // Unlinking them makes both isolated again; the magnet re-collects.
    app.pointer_down(pos2(0.0, 0.0), PointerButton::Secondary, Modifiers::NONE, 0.3);
    app.pointer_move(pos2(200.0, 0.0), 0.35);
    app.pointer_up(pos2(200.0, 0.0), PointerButton::Secondary, 0.4);

    assert!(!app.map.connected(a, b));
    assert!(app.map.connected(m, a));
    assert!(app.map.connected(m, b));
}

#[test]
fn resize_drag_scales_live_and_commits_one_undo_entry() {
    let (mut app, a, _) = app_with_pair();
    app.interaction.selected.insert(a);

    // The circle handle sits at about (35.4, 35.4) for radius 50.
    app.pointer_down(pos2(35.0, 35.0), PointerButton::Primary, Modifiers::NONE, 0.0);
    assert!(matches!(
        app.interaction.session.as_ref().map(|s| &s.gesture),
        Some(Gesture::ResizeNode { .. })
    ));
    app.pointer_move(pos2(120.0, 0.0), 0.05);
    assert_eq!(app.map.node(a).unwrap().dimensions.circle_radius, 120.0);
    app.pointer_up(pos2(120.0, 0.0), PointerButton::Primary, 0.1);

    assert!(app.undo_history.can_undo());
    app.perform_undo();
    assert_eq!(app.map.node(a).unwrap().dimensions.circle_radius, 50.0);
}

#[test]
fn resize_clamps_at_the_minimum() {
    let (mut app, a, _) = app_with_pair();
    app.interaction.selected.insert(a);
    app.pointer_down(pos2(35.0, 35.0), PointerButton::Primary, Modifiers::NONE, 0.0);
    app.pointer_move(pos2(1.0, 1.0), 0.05);
    assert_eq!(
        app.map.node(a).unwrap().dimensions.circle_radius,
        crate::constants::MIN_CIRCLE_RADIUS
    );
}

#[test]
fn drop_on_trash_deletes_the_dragged_nodes() {
    let (mut app, a, b) = app_with_pair();
    let corner = app.viewport.right_bottom();
    app.pointer_down(pos2(0.0, 0.0), PointerButton::Primary, Modifiers::NONE, 0.0);
    app.pointer_move(corner - eframe::egui::vec2(50.0, 50.0), 0.05);
    app.pointer_up(corner - eframe::egui::vec2(50.0, 50.0), PointerButton::Primary, 0.1);

    assert!(app.map.node(a).is_none());
    assert!(app.map.node(b).is_some());
    assert!(app.undo_history.can_undo());
}

#[test]
fn double_click_on_empty_creates_and_edits() {
    let (mut app, _, _) = app_with_pair();
    app.double_click(pos2(400.0, 300.0), 0.0);
    assert_eq!(app.map.nodes.len(), 3);
    let new = app.interaction.editing_node.expect("edit mode");
    assert_eq!(app.map.node(new).unwrap().text, "Idea");
    assert!(app.undo_history.can_undo());
}

#[test]
fn escape_rolls_back_a_live_resize() {
    let (mut app, a, _) = app_with_pair();
    app.interaction.selected.insert(a);
    app.pointer_down(pos2(35.0, 35.0), PointerButton::Primary, Modifiers::NONE, 0.0);
    app.pointer_move(pos2(150.0, 0.0), 0.05);
    assert_eq!(app.map.node(a).unwrap().dimensions.circle_radius, 150.0);

    app.cancel_gesture();
    assert_eq!(app.map.node(a).unwrap().dimensions.circle_radius, 50.0);
    assert!(!app.undo_history.can_undo());
}

#[test]
fn ctrl_click_toggles_selection_membership() {
    let (mut app, a, b) = app_with_pair();
    let ctrl = Modifiers::CTRL;
    app.pointer_down(pos2(0.0, 0.0), PointerButton::Primary, ctrl, 0.0);
    app.pointer_up(pos2(0.0, 0.0), PointerButton::Primary, 0.01);
    app.pointer_down(pos2(200.0, 0.0), PointerButton::Primary, ctrl, 0.1);
    app.pointer_up(pos2(200.0, 0.0), PointerButton::Primary, 0.11);
    assert_eq!(app.interaction.selected, HashSet::from([a, b]));

    app.pointer_down(pos2(0.0, 0.0), PointerButton::Primary, ctrl, 0.2);
    app.pointer_up(pos2(0.0, 0.0), PointerButton::Primary, 0.21);
    assert_eq!(app.interaction.selected, HashSet::from([b]));
}

#[test]
fn canvas_runs_a_headless_frame() {
    let (mut app, _, _) = app_with_pair();
    let ctx = eframe::egui::Context::default();
    let _ = ctx.run(Default::default(), |ctx| {
        eframe::egui::CentralPanel::default().show(ctx, |ui| app.draw_canvas(ui));
    });
    // One tick ran; the simulation has live bodies for both nodes.
    assert_eq!(app.map.nodes.len(), 2);
}

#[test]
fn frozen_layout_still_allows_dragging() {
    let (mut app, a, _) = app_with_pair();
    app.floating = false;
    app.pointer_down(pos2(0.0, 0.0), PointerButton::Primary, Modifiers::NONE, 0.0);
    app.pointer_move(pos2(90.0, -40.0), 0.05);
    app.tick(0.05);
    assert_eq!(app.sim.pos(a).unwrap(), pos2(90.0, -40.0));
}
