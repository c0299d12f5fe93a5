//! Direct-manipulation gesture state machine.
//!
//! Every pointer interaction is a press-drag-release session with a single
//! active gesture. Handlers here take plain positions and times rather than
//! `egui` input structs, so the whole machine is exercisable from tests; the
//! canvas widget translates raw events into these calls.

use crate::constants;
use crate::geometry;
use crate::types::{EdgeId, LinkAction, MindMap, Node, NodeId};
use crate::ui::state::{FeedbackKind, MindMapApp};
use eframe::egui::{pos2, PointerButton, Pos2, Rect, Vec2};
use std::collections::{HashMap, HashSet};

/// The active gesture of a drag session.
#[derive(Debug, Clone)]
pub enum Gesture {
    /// Middle-drag moves the whole canvas.
    Pan {
        /// Canvas offset when the pan started.
        start_offset: Vec2,
    },
    /// Primary-drag on a node moves the selection with the pointer.
    MoveNodes {
        /// Canvas positions of the dragged nodes at press time.
        origins: HashMap<NodeId, Pos2>,
        /// Pointer-authoritative targets, re-derived every move.
        targets: HashMap<NodeId, Pos2>,
        /// Whether the pointer is currently inside the trash zone.
        over_trash: bool,
        /// Node the unmodified press landed on; a release without a drag
        /// collapses the selection to it. `None` when a modifier was held.
        click_target: Option<NodeId>,
    },
    /// Primary-drag on empty canvas sweeps a selection marquee.
    BoxSelect {
        /// Selection to extend when the drag is additive.
        initial: HashSet<NodeId>,
        /// Shift held at press time: extend instead of replace.
        additive: bool,
    },
    /// Secondary-drag from a node draws provisional links.
    LinkCreate {
        /// The node the drag started on.
        origin: NodeId,
        /// All drag sources; the whole selection when the origin was selected.
        sources: Vec<NodeId>,
        /// Node currently under the pointer.
        hover_node: Option<NodeId>,
        /// Edge under the pointer, when no node is.
        hover_edge: Option<EdgeId>,
    },
    /// Primary-drag on a resize handle scales a node live.
    ResizeNode {
        /// The node being resized.
        node: NodeId,
    },
    /// Primary-hold on an edge charges it toward a merge.
    EdgeTighten {
        /// The held edge.
        edge: EdgeId,
        /// Time the hold began.
        started_at: f64,
        /// Canvas point where the hold began; decides the merge survivor.
        anchor: Pos2,
    },
}

/// One press-drag-release interaction.
#[derive(Debug, Clone)]
pub struct DragSession {
    /// The gesture decided at press time.
    pub gesture: Gesture,
    /// Button that started the session; only its release ends it.
    pub button: PointerButton,
    /// Screen position of the press.
    pub start_screen: Pos2,
    /// Whether the pointer ever crossed the drag threshold.
    pub moved: bool,
    /// Pre-gesture state, pushed to undo only if the gesture commits a
    /// mutation.
    pub snapshot: Option<MindMap>,
}

impl MindMapApp {
    /// Topmost node containing a canvas point. Later nodes draw on top, so
    /// the scan runs back to front.
    pub fn node_at(&self, canvas_pos: Pos2) -> Option<NodeId> {
        self.map
            .nodes
            .iter()
            .rev()
            .find(|n| {
                let center = self
                    .sim
                    .pos(n.id)
                    .unwrap_or(pos2(n.position.0, n.position.1));
                geometry::point_in_shape(canvas_pos, center, n.shape, &n.dimensions)
            })
            .map(|n| n.id)
    }

    /// First edge within the hit threshold of a canvas point. The threshold
    /// is defined in screen pixels, so it widens in canvas units as the view
    /// zooms out.
    pub fn edge_at(&self, canvas_pos: Pos2) -> Option<EdgeId> {
        let threshold = constants::EDGE_HIT_THRESHOLD / self.canvas.zoom;
        self.map
            .edges
            .iter()
            .find(|e| {
                let (Some(a), Some(b)) = (self.sim.pos(e.source), self.sim.pos(e.target)) else {
                    return false;
                };
                geometry::distance_to_segment(canvas_pos, a, b) <= threshold
            })
            .map(|e| e.id)
    }

    /// Selected node whose resize handle is within reach of a canvas point.
    pub fn handle_at(&self, canvas_pos: Pos2) -> Option<NodeId> {
        let threshold = constants::RESIZE_HANDLE_RADIUS / self.canvas.zoom;
        self.interaction
            .selected
            .iter()
            .copied()
            .find(|&id| {
                let Some(node) = self.map.node(id) else {
                    return false;
                };
                let Some(center) = self.sim.pos(id) else {
                    return false;
                };
                let handle = geometry::resize_handle_pos(center, node.shape, &node.dimensions);
                (canvas_pos - handle).length() <= threshold
            })
    }

    fn edge_touches_magnet(&self, edge: EdgeId) -> bool {
        let Some(magnet) = self.map.magnet() else {
            return false;
        };
        self.map.edge(edge).map(|e| e.touches(magnet)).unwrap_or(false)
    }

    /// Handles a button press on the canvas and decides the gesture.
    ///
    /// Precedence for the primary button: resize handle, node, edge, empty
    /// canvas. The secondary button starts a link drag from a node. Any press
    /// first commits a pending inline edit.
    pub fn pointer_down(
        &mut self,
        pos: Pos2,
        button: PointerButton,
        modifiers: eframe::egui::Modifiers,
        now: f64,
    ) {
        self.context_menu.target = None;
        if self.interaction.editing_node.is_some() || self.interaction.editing_edge.is_some() {
            self.end_text_edit();
        }
        if self.interaction.session.is_some() {
            return;
        }

        let canvas_pos = self.canvas.screen_to_canvas(pos);
        let gesture = match button {
            PointerButton::Middle => Some(Gesture::Pan {
                start_offset: self.canvas.offset,
            }),
            PointerButton::Primary => {
                if let Some(node) = self.handle_at(canvas_pos) {
                    Some(Gesture::ResizeNode { node })
                } else if let Some(node) = self.node_at(canvas_pos) {
                    if modifiers.command || modifiers.ctrl {
                        if !self.interaction.selected.remove(&node) {
                            self.interaction.selected.insert(node);
                        }
                    } else if !self.interaction.selected.contains(&node) {
                        self.interaction.selected = HashSet::from([node]);
                    }
                    if self.interaction.selected.contains(&node) {
                        let origins: HashMap<NodeId, Pos2> = self
                            .interaction
                            .selected
                            .iter()
                            .filter_map(|&id| self.sim.pos(id).map(|p| (id, p)))
                            .collect();
                        let plain = !(modifiers.command || modifiers.ctrl);
                        Some(Gesture::MoveNodes {
                            targets: origins.clone(),
                            origins,
                            over_trash: false,
                            click_target: plain.then_some(node),
                        })
                    } else {
                        None
                    }
                } else if let Some(edge) = self
                    .edge_at(canvas_pos)
                    .filter(|&e| !self.edge_touches_magnet(e))
                {
                    Some(Gesture::EdgeTighten {
                        edge,
                        started_at: now,
                        anchor: canvas_pos,
                    })
                } else {
                    let additive = modifiers.shift || modifiers.ctrl || modifiers.command;
                    Some(Gesture::BoxSelect {
                        initial: if additive {
                            self.interaction.selected.clone()
                        } else {
                            HashSet::new()
                        },
                        additive,
                    })
                }
            }
            PointerButton::Secondary => match self.node_at(canvas_pos) {
                Some(node) => {
                    let sources = if self.interaction.selected.contains(&node) {
                        self.interaction.selected.iter().copied().collect()
                    } else {
                        vec![node]
                    };
                    Some(Gesture::LinkCreate {
                        origin: node,
                        sources,
                        hover_node: None,
                        hover_edge: None,
                    })
                }
                None => {
                    // Right-click on empty canvas grows a bubble in place;
                    // the magnet picks it up if one exists.
                    self.create_node_at(canvas_pos, now);
                    self.map.refresh_magnet_links(&mut self.id_gen);
                    None
                }
            },
            _ => None,
        };

        let Some(gesture) = gesture else { return };
        let snapshot = match gesture {
            Gesture::Pan { .. } | Gesture::BoxSelect { .. } => None,
            _ => Some(self.snapshot()),
        };
        self.interaction.session = Some(DragSession {
            gesture,
            button,
            start_screen: pos,
            moved: false,
            snapshot,
        });
    }

    /// Handles pointer motion: hover feedback when idle, gesture updates when
    /// a session is live. Motion below the drag threshold is ignored so a
    /// twitchy click never mutates anything.
    pub fn pointer_move(&mut self, pos: Pos2, now: f64) {
        self.interaction.prev_cursor = self.interaction.cursor;
        self.interaction.cursor = Some((pos, now));
        let canvas_pos = self.canvas.screen_to_canvas(pos);

        if self.interaction.session.is_none() {
            self.interaction.hovered_node = self.node_at(canvas_pos);
            self.interaction.hovered_edge = if self.interaction.hovered_node.is_none() {
                self.edge_at(canvas_pos)
            } else {
                None
            };
            self.interaction.near_handle = self.handle_at(canvas_pos);
            return;
        }

        let hit_node = self.node_at(canvas_pos);
        let hit_edge = self.edge_at(canvas_pos);
        let zoom = self.canvas.zoom;
        let trash_corner = self.viewport.right_bottom();
        let Some(mut session) = self.interaction.session.take() else {
            return;
        };

        if !session.moved {
            if (pos - session.start_screen).length() < constants::DRAG_THRESHOLD {
                self.interaction.session = Some(session);
                return;
            }
            session.moved = true;
        }

        match &mut session.gesture {
            Gesture::Pan { start_offset } => {
                self.canvas.offset = *start_offset + (pos - session.start_screen);
            }
            Gesture::MoveNodes {
                origins,
                targets,
                over_trash,
                ..
            } => {
                let delta = (pos - session.start_screen) / zoom;
                for (id, origin) in origins.iter() {
                    targets.insert(*id, *origin + delta);
                }
                *over_trash = (pos - trash_corner).length() < constants::TRASH_ZONE_RADIUS;
            }
            Gesture::BoxSelect { initial, .. } => {
                let start_canvas = self.canvas.screen_to_canvas(session.start_screen);
                let rect = Rect::from_two_pos(start_canvas, canvas_pos);
                let mut selected = initial.clone();
                for node in &self.map.nodes {
                    let Some(center) = self.sim.pos(node.id) else {
                        continue;
                    };
                    let bounds = geometry::shape_bounds(center, node.shape, &node.dimensions);
                    if rect.intersects(bounds) {
                        selected.insert(node.id);
                    }
                }
                self.interaction.selected = selected;
            }
            Gesture::LinkCreate {
                hover_node,
                hover_edge,
                ..
            } => {
                *hover_node = hit_node;
                *hover_edge = if hit_node.is_none() { hit_edge } else { None };
            }
            Gesture::ResizeNode { node } => {
                let id = *node;
                if let Some(center) = self.sim.pos(id) {
                    if let Some(node) = self.map.node_mut(id) {
                        let delta = canvas_pos - center;
                        match node.shape {
                            crate::types::Shape::Circle => {
                                node.dimensions.circle_radius = delta.length();
                            }
                            crate::types::Shape::Rectangle => {
                                node.dimensions.rect_width = delta.x.abs() * 2.0;
                                node.dimensions.rect_height = delta.y.abs() * 2.0;
                            }
                        }
                        node.dimensions = node.dimensions.clamped();
                    }
                }
            }
            Gesture::EdgeTighten { .. } => {
                // Charge progress is a function of time, handled in the tick.
                let _ = now;
            }
        }

        self.interaction.session = Some(session);
    }

    /// Handles a button release and commits the gesture.
    ///
    /// A release that never crossed the drag threshold is a click: selection
    /// or context-menu only, never a graph mutation and never an undo entry.
    pub fn pointer_up(&mut self, pos: Pos2, button: PointerButton, now: f64) {
        let Some(session) = self.interaction.session.take() else {
            return;
        };
        if session.button != button {
            self.interaction.session = Some(session);
            return;
        }
        let canvas_pos = self.canvas.screen_to_canvas(pos);

        if !session.moved {
            match session.gesture {
                Gesture::BoxSelect { additive, .. } if !additive => {
                    self.interaction.selected.clear();
                }
                Gesture::LinkCreate { origin, .. } => {
                    self.context_menu.target = Some((origin, pos));
                }
                // A plain click inside a multi-selection narrows it to the
                // clicked node.
                Gesture::MoveNodes {
                    click_target: Some(node),
                    ..
                } => {
                    self.interaction.selected = HashSet::from([node]);
                }
                Gesture::EdgeTighten { .. }
                | Gesture::Pan { .. }
                | Gesture::MoveNodes { .. }
                | Gesture::BoxSelect { .. }
                | Gesture::ResizeNode { .. } => {}
            }
            return;
        }

        match session.gesture {
            Gesture::Pan { .. } | Gesture::BoxSelect { .. } => {}
            Gesture::EdgeTighten { .. } => {
                // Released before the merge fired; nothing was committed.
            }
            Gesture::ResizeNode { .. } => {
                if let Some(snapshot) = session.snapshot {
                    self.undo_history.push(snapshot);
                }
            }
            Gesture::MoveNodes {
                targets,
                over_trash,
                ..
            } => {
                if let Some(snapshot) = session.snapshot {
                    self.undo_history.push(snapshot);
                }
                if over_trash {
                    let ids: HashSet<NodeId> = targets.keys().copied().collect();
                    let positions: Vec<Pos2> =
                        ids.iter().filter_map(|&id| self.sim.pos(id)).collect();
                    self.map.remove_nodes(&ids);
                    self.map.refresh_magnet_links(&mut self.id_gen);
                    self.sim.sync(&self.map);
                    for id in &ids {
                        self.interaction.selected.remove(id);
                    }
                    for position in positions {
                        self.push_effect(FeedbackKind::Delete, position, now);
                    }
                } else {
                    let vel = self.release_velocity();
                    for id in targets.keys() {
                        if let Some(body) = self.sim.body_mut(*id) {
                            body.vel = vel;
                        }
                    }
                    self.sim.reconcile(&mut self.map);
                }
            }
            Gesture::LinkCreate { sources, .. } => {
                self.commit_link_drag(&sources, canvas_pos, session.snapshot, now);
            }
        }
    }

    /// Velocity imparted to released nodes, from the last two pointer
    /// samples, scaled and capped.
    fn release_velocity(&self) -> Vec2 {
        let (Some((cur, _)), Some((prev, _))) =
            (self.interaction.cursor, self.interaction.prev_cursor)
        else {
            return Vec2::ZERO;
        };
        let delta = (cur - prev) / self.canvas.zoom;
        let vel = delta * constants::THROW_SCALE;
        let speed = vel.length();
        if speed > constants::MAX_THROW_SPEED {
            vel * (constants::MAX_THROW_SPEED / speed)
        } else {
            vel
        }
    }

    /// Resolves a released link drag, in priority order: a node links or
    /// unlinks, an ordinary edge splits, empty canvas grows a new bubble.
    fn commit_link_drag(
        &mut self,
        sources: &[NodeId],
        canvas_pos: Pos2,
        snapshot: Option<MindMap>,
        now: f64,
    ) {
        if let Some(target) = self.node_at(canvas_pos) {
            if sources.len() == 1 && sources[0] == target {
                return;
            }
            if let Some(snapshot) = snapshot {
                self.undo_history.push(snapshot);
            }
            let action = self.map.apply_link(&mut self.id_gen, sources, target);
            let position = self.sim.pos(target).unwrap_or(canvas_pos);
            match action {
                LinkAction::Link => self.push_effect(FeedbackKind::Link, position, now),
                LinkAction::Unlink => {
                    self.map.refresh_magnet_links(&mut self.id_gen);
                    self.push_effect(FeedbackKind::Unlink, position, now);
                }
            }
            return;
        }

        if let Some(edge) = self
            .edge_at(canvas_pos)
            .filter(|&e| !self.edge_touches_magnet(e))
        {
            if let Some(snapshot) = snapshot {
                self.undo_history.push(snapshot);
            }
            let new_node = self.map.split_edge(
                &mut self.id_gen,
                edge,
                (canvas_pos.x, canvas_pos.y),
                sources,
                constants::DEFAULT_NODE_LABEL,
                self.default_shape,
            );
            if let Some(id) = new_node {
                self.map.release_magnet_links();
                self.sim.sync(&self.map);
                self.interaction.selected = HashSet::from([id]);
                self.begin_node_edit(id);
                self.push_effect(FeedbackKind::Create, canvas_pos, now);
            }
            return;
        }

        if let Some(snapshot) = snapshot {
            self.undo_history.push(snapshot);
        }
        let id = self.map.add_node(Node::new(
            self.id_gen.next(),
            constants::DEFAULT_NODE_LABEL,
            (canvas_pos.x, canvas_pos.y),
            self.default_shape,
        ));
        for &src in sources {
            self.map.apply_link(&mut self.id_gen, &[src], id);
        }
        self.map.release_magnet_links();
        self.sim.sync(&self.map);
        self.interaction.selected = HashSet::from([id]);
        self.begin_node_edit(id);
        self.push_effect(FeedbackKind::Create, canvas_pos, now);
    }

    /// Handles a double click: edits the node or edge under the pointer, or
    /// grows a new bubble on empty canvas.
    pub fn double_click(&mut self, pos: Pos2, now: f64) {
        self.interaction.session = None;
        let canvas_pos = self.canvas.screen_to_canvas(pos);
        if let Some(node) = self.node_at(canvas_pos) {
            self.interaction.selected = HashSet::from([node]);
            self.begin_node_edit(node);
        } else if let Some(edge) = self.edge_at(canvas_pos) {
            self.begin_edge_edit(edge);
        } else {
            self.create_node_at(canvas_pos, now);
        }
    }

    /// Aborts the in-flight gesture. Live mutations (a resize in progress)
    /// roll back to the pre-gesture snapshot; nothing reaches the undo stack.
    pub fn cancel_gesture(&mut self) {
        if let Some(session) = self.interaction.session.take() {
            if session.moved {
                if let Some(snapshot) = session.snapshot {
                    self.map = snapshot;
                    self.sim.restore(&self.map);
                }
            }
        }
    }
}
