//! Application state for the mind-map editor.
//!
//! [`MindMapApp`] owns the committed graph, the live simulation store, the
//! interaction state and the undo history. Only the committed graph and a few
//! settings persist; everything transient is rebuilt on load.

use crate::constants;
use crate::interaction::{DragSession, Gesture};
use crate::physics::{self, PhysicsParams, SimulationStore, TickInputs, Tightening};
use crate::types::{EdgeId, IdGen, MergeOutcome, MindMap, Node, NodeId, Shape};
use crate::ui::undo::UndoHistory;
use eframe::egui::{pos2, vec2, Pos2, Rect, Vec2};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// How long a feedback ripple stays on screen, in seconds.
pub const EFFECT_LIFETIME: f64 = 0.6;

/// Pan/zoom state of the canvas viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasState {
    /// Screen-space translation of the canvas origin.
    pub offset: Vec2,
    /// Zoom factor, clamped to the documented range.
    pub zoom: f32,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl CanvasState {
    /// Converts a screen point into canvas coordinates.
    pub fn screen_to_canvas(&self, p: Pos2) -> Pos2 {
        ((p.to_vec2() - self.offset) / self.zoom).to_pos2()
    }

    /// Converts a canvas point into screen coordinates.
    pub fn canvas_to_screen(&self, p: Pos2) -> Pos2 {
        (p.to_vec2() * self.zoom + self.offset).to_pos2()
    }

    /// Applies a zoom step centered on `pivot` (screen coordinates), so the
    /// canvas point under the cursor stays put.
    pub fn zoom_about(&mut self, pivot: Pos2, factor: f32) {
        let old_zoom = self.zoom;
        self.zoom = (self.zoom * factor).clamp(constants::MIN_ZOOM, constants::MAX_ZOOM);
        let applied = self.zoom / old_zoom;
        self.offset = pivot.to_vec2() - (pivot.to_vec2() - self.offset) * applied;
    }
}

/// Kind of transient feedback ripple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    /// A node was created.
    Create,
    /// Nodes were deleted.
    Delete,
    /// An edge was created.
    Link,
    /// Edges were removed.
    Unlink,
    /// Two nodes fused.
    Merge,
}

/// A short-lived visual ripple anchored to a canvas point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedbackEvent {
    /// What happened.
    pub kind: FeedbackKind,
    /// Canvas position of the ripple.
    pub position: Pos2,
    /// Time the event fired, from `egui`'s clock.
    pub started_at: f64,
}

/// Everything about the current pointer interaction that does not persist.
#[derive(Debug, Default)]
pub struct InteractionState {
    /// Currently selected nodes.
    pub selected: HashSet<NodeId>,
    /// Node whose text is being edited inline, if any.
    pub editing_node: Option<NodeId>,
    /// Edge whose label is being edited inline, if any.
    pub editing_edge: Option<EdgeId>,
    /// Shared text buffer for the inline editor.
    pub editing_text: String,
    /// Node under the cursor this frame.
    pub hovered_node: Option<NodeId>,
    /// Edge under the cursor this frame, when no node is.
    pub hovered_edge: Option<EdgeId>,
    /// Node whose resize handle is under the cursor.
    pub near_handle: Option<NodeId>,
    /// The in-flight press-drag-release gesture.
    pub session: Option<DragSession>,
    /// Latest pointer sample (screen position, time).
    pub cursor: Option<(Pos2, f64)>,
    /// Previous pointer sample, for throw velocity.
    pub prev_cursor: Option<(Pos2, f64)>,
}

/// Context menu opened by a right-click that never became a link drag.
#[derive(Debug, Default)]
pub struct ContextMenuState {
    /// Target node and the screen position to anchor the menu at.
    pub target: Option<(NodeId, Pos2)>,
}

/// The mind-map editor application.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct MindMapApp {
    /// The committed graph.
    pub map: MindMap,
    /// Physics sliders.
    pub physics: PhysicsParams,
    /// Whether the force layout is running.
    pub floating: bool,
    /// Shape given to newly created nodes.
    pub default_shape: Shape,
    /// Pan/zoom state.
    pub canvas: CanvasState,
    /// Dark or light theme.
    pub dark_mode: bool,
    /// Whether the physics tuning window is open.
    pub show_physics_panel: bool,
    /// Whether the import/export window is open.
    pub show_io_panel: bool,

    /// Live per-frame positions and velocities.
    #[serde(skip)]
    pub sim: SimulationStore,
    /// Pointer interaction state.
    #[serde(skip)]
    pub interaction: InteractionState,
    /// Right-click context menu.
    #[serde(skip)]
    pub context_menu: ContextMenuState,
    /// Active feedback ripples.
    #[serde(skip)]
    pub effects: Vec<FeedbackEvent>,
    /// Undo/redo snapshot stacks.
    #[serde(skip)]
    pub undo_history: UndoHistory,
    /// Id source for nodes and edges.
    #[serde(skip)]
    pub id_gen: IdGen,
    /// Jitter source for the idle breathing motion.
    #[serde(skip, default = "default_rng")]
    pub rng: SmallRng,
    /// Screen rect of the canvas this frame; anchors the trash zone.
    #[serde(skip, default = "default_viewport")]
    pub viewport: Rect,
    /// Text buffer of the import/export window.
    #[serde(skip)]
    pub io_text: String,
    /// Last import error, shown in the import/export window.
    #[serde(skip)]
    pub io_error: Option<String>,
}

fn default_rng() -> SmallRng {
    SmallRng::from_entropy()
}

fn default_viewport() -> Rect {
    Rect::from_min_size(Pos2::ZERO, vec2(1280.0, 720.0))
}

impl Default for MindMapApp {
    fn default() -> Self {
        let mut id_gen = IdGen::default();
        let mut map = MindMap::new();
        map.add_node(Node::new(
            id_gen.next(),
            constants::DEFAULT_NODE_LABEL,
            (0.0, 0.0),
            Shape::Circle,
        ));
        let mut sim = SimulationStore::default();
        sim.sync(&map);
        Self {
            map,
            physics: PhysicsParams::default(),
            floating: true,
            default_shape: Shape::Circle,
            canvas: CanvasState::default(),
            dark_mode: true,
            show_physics_panel: false,
            show_io_panel: false,
            sim,
            interaction: InteractionState::default(),
            context_menu: ContextMenuState::default(),
            effects: Vec::new(),
            undo_history: UndoHistory::default(),
            id_gen,
            rng: default_rng(),
            viewport: default_viewport(),
            io_text: String::new(),
            io_error: None,
        }
    }
}

impl MindMapApp {
    /// Key used for `eframe` persistence.
    pub const STORAGE_KEY: &'static str = eframe::APP_KEY;

    /// Restores the persisted app, or starts with a single seed bubble.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let mut app: MindMapApp = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, Self::STORAGE_KEY))
            .unwrap_or_default();
        app.sim.restore(&app.map);
        log::info!(
            "loaded mind map: {} nodes, {} edges",
            app.map.nodes.len(),
            app.map.edges.len()
        );
        app
    }

    /// Advances the simulation by one frame and applies at most one merge.
    pub fn tick(&mut self, now: f64) {
        let mut excluded: HashSet<NodeId> = self
            .map
            .nodes
            .iter()
            .filter(|n| n.pinned)
            .map(|n| n.id)
            .collect();
        // A node holding the inline editor must not drift away from it.
        if let Some(id) = self.interaction.editing_node {
            excluded.insert(id);
        }

        let mut dragged: HashMap<NodeId, Pos2> = HashMap::new();
        let mut tighten = None;
        let mut anchor = None;
        if let Some(session) = &self.interaction.session {
            match &session.gesture {
                Gesture::MoveNodes { targets, .. } if session.moved => {
                    for (&id, &target) in targets {
                        dragged.insert(id, target);
                        excluded.insert(id);
                    }
                }
                Gesture::ResizeNode { node } => {
                    excluded.insert(*node);
                }
                Gesture::EdgeTighten {
                    edge,
                    started_at,
                    anchor: a,
                } => {
                    let progress =
                        ((now - started_at) / constants::TIGHTEN_CHARGE_SECS).clamp(0.0, 1.0);
                    tighten = Some(Tightening {
                        edge: *edge,
                        progress: progress as f32,
                    });
                    anchor = Some(*a);
                }
                _ => {}
            }
        }

        let config = self.physics.mapped();
        let gesture_active = !dragged.is_empty() || tighten.is_some();
        let inputs = TickInputs {
            floating: self.floating,
            excluded: &excluded,
            dragged: &dragged,
            tighten,
            gesture_active,
        };
        let request = physics::step(&mut self.sim, &self.map, &config, &inputs, &mut self.rng);

        if let Some(request) = request {
            let anchor = anchor.unwrap_or(Pos2::ZERO);
            self.apply_merge(request.a, request.b, anchor, now);
        }

        self.effects
            .retain(|e| now - e.started_at < EFFECT_LIFETIME);
    }

    /// Fuses two nodes after the integrator reported contact.
    ///
    /// The pre-gesture snapshot becomes the undo entry and the tighten
    /// session ends; its edge no longer exists.
    fn apply_merge(&mut self, a: NodeId, b: NodeId, anchor: Pos2, now: f64) {
        self.sim.reconcile(&mut self.map);
        let snapshot = self
            .interaction
            .session
            .as_mut()
            .and_then(|s| s.snapshot.take());

        let outcome = self.map.merge_nodes(a, b, (anchor.x, anchor.y));
        if let Some(MergeOutcome {
            survivor,
            absorbed,
            position,
        }) = outcome
        {
            if let Some(snapshot) = snapshot {
                self.undo_history.push(snapshot);
            }
            self.interaction.selected.remove(&absorbed);
            self.interaction.hovered_node = None;
            self.interaction.hovered_edge = None;
            self.interaction.near_handle = None;
            self.sim.sync(&self.map);
            if let Some(body) = self.sim.body_mut(survivor) {
                body.vel = Vec2::ZERO;
            }
            self.push_effect(FeedbackKind::Merge, pos2(position.0, position.1), now);
            log::debug!("merged {absorbed} into {survivor}");
        }
        self.interaction.session = None;
    }

    /// Records a feedback ripple.
    pub fn push_effect(&mut self, kind: FeedbackKind, position: Pos2, now: f64) {
        self.effects.push(FeedbackEvent {
            kind,
            position,
            started_at: now,
        });
    }

    /// Clones the committed graph with live positions folded in; the unit of
    /// undo.
    pub fn snapshot(&mut self) -> MindMap {
        self.sim.reconcile(&mut self.map);
        self.map.clone()
    }

    /// Creates a node at a canvas position and opens its inline editor.
    pub fn create_node_at(&mut self, position: Pos2, now: f64) -> NodeId {
        let snapshot = self.snapshot();
        self.undo_history.push(snapshot);
        let id = self.map.add_node(Node::new(
            self.id_gen.next(),
            constants::DEFAULT_NODE_LABEL,
            (position.x, position.y),
            self.default_shape,
        ));
        self.sim.sync(&self.map);
        self.interaction.selected = HashSet::from([id]);
        self.begin_node_edit(id);
        self.push_effect(FeedbackKind::Create, position, now);
        id
    }

    /// Deletes the given nodes with their edges, then lets the magnet pick up
    /// anything that became isolated.
    pub fn delete_nodes(&mut self, ids: &HashSet<NodeId>, now: f64) {
        if ids.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        self.undo_history.push(snapshot);
        let positions: Vec<Pos2> = ids
            .iter()
            .filter_map(|&id| self.sim.pos(id))
            .collect();
        self.map.remove_nodes(ids);
        self.map.refresh_magnet_links(&mut self.id_gen);
        self.sim.sync(&self.map);
        for id in ids {
            self.interaction.selected.remove(id);
        }
        for position in positions {
            self.push_effect(FeedbackKind::Delete, position, now);
        }
    }

    /// Toggles the shape of every selected node.
    pub fn toggle_selected_shape(&mut self) {
        let snapshot = self.snapshot();
        self.undo_history.push(snapshot);
        let selected = self.interaction.selected.clone();
        for id in selected {
            if let Some(node) = self.map.node_mut(id) {
                node.shape = node.shape.toggled();
            }
        }
    }

    /// Recolors every selected node.
    pub fn set_selected_color(&mut self, color: &str) {
        let snapshot = self.snapshot();
        self.undo_history.push(snapshot);
        let selected = self.interaction.selected.clone();
        for id in selected {
            if let Some(node) = self.map.node_mut(id) {
                node.color = color.to_string();
            }
        }
    }

    /// Toggles the pin on every selected node. Pinning freezes a node in
    /// place without freezing the rest of the layout.
    pub fn toggle_selected_pin(&mut self) {
        let snapshot = self.snapshot();
        self.undo_history.push(snapshot);
        let selected = self.interaction.selected.clone();
        for id in selected {
            if let Some(node) = self.map.node_mut(id) {
                node.pinned = !node.pinned;
                if node.pinned {
                    node.velocity = (0.0, 0.0);
                }
            }
        }
    }

    /// Removes every edge touching `id`, then refreshes magnet collection.
    pub fn unlink_node(&mut self, id: NodeId, now: f64) {
        let snapshot = self.snapshot();
        self.undo_history.push(snapshot);
        self.map.edges.retain(|e| !e.touches(id));
        self.map.refresh_magnet_links(&mut self.id_gen);
        if let Some(position) = self.sim.pos(id) {
            self.push_effect(FeedbackKind::Unlink, position, now);
        }
    }

    /// Spawns the magnet node at the center of the current view, unless one
    /// already exists.
    pub fn spawn_magnet(&mut self, now: f64) {
        if self.map.magnet().is_some() {
            return;
        }
        let snapshot = self.snapshot();
        self.undo_history.push(snapshot);
        let center = self.canvas.screen_to_canvas(self.viewport.center());
        let id = self
            .map
            .spawn_magnet(&mut self.id_gen, (center.x, center.y));
        self.sim.sync(&self.map);
        self.push_effect(FeedbackKind::Create, pos2(center.x, center.y), now);
        log::debug!("spawned magnet {id}");
    }

    /// Opens the inline text editor on a node.
    pub fn begin_node_edit(&mut self, id: NodeId) {
        if let Some(node) = self.map.node(id) {
            self.interaction.editing_text = node.text.clone();
            self.interaction.editing_node = Some(id);
            self.interaction.editing_edge = None;
        }
    }

    /// Opens the inline label editor on an edge.
    pub fn begin_edge_edit(&mut self, id: EdgeId) {
        if let Some(edge) = self.map.edge(id) {
            self.interaction.editing_text = edge.label.clone().unwrap_or_default();
            self.interaction.editing_edge = Some(id);
            self.interaction.editing_node = None;
        }
    }

    /// Commits the inline editor's buffer into the edited node or edge.
    pub fn end_text_edit(&mut self) {
        if let Some(id) = self.interaction.editing_node.take() {
            let text = self.interaction.editing_text.trim().to_string();
            let changed = self.map.node(id).map(|n| n.text != text).unwrap_or(false);
            if changed {
                let snapshot = self.snapshot();
                self.undo_history.push(snapshot);
                if let Some(node) = self.map.node_mut(id) {
                    node.text = text;
                }
            }
        }
        if let Some(id) = self.interaction.editing_edge.take() {
            let text = self.interaction.editing_text.trim().to_string();
            let label = (!text.is_empty()).then_some(text);
            let changed = self.map.edge(id).map(|e| e.label != label).unwrap_or(false);
            if changed {
                let snapshot = self.snapshot();
                self.undo_history.push(snapshot);
                if let Some(edge) = self.map.edges.iter_mut().find(|e| e.id == id) {
                    edge.label = label;
                }
            }
        }
        self.interaction.editing_text.clear();
    }

    /// Abandons the inline editor without committing.
    pub fn cancel_text_edit(&mut self) {
        self.interaction.editing_node = None;
        self.interaction.editing_edge = None;
        self.interaction.editing_text.clear();
    }

    /// Pans and zooms so the whole graph fits the viewport with a margin.
    pub fn fit_view(&mut self) {
        let mut bounds: Option<Rect> = None;
        for node in &self.map.nodes {
            let Some(center) = self.sim.pos(node.id) else {
                continue;
            };
            let rect =
                crate::geometry::shape_bounds(center, node.shape, &node.dimensions);
            bounds = Some(bounds.map_or(rect, |b| b.union(rect)));
        }
        let Some(bounds) = bounds else { return };
        let margin = 80.0;
        let fit_x = self.viewport.width() / (bounds.width() + margin * 2.0);
        let fit_y = self.viewport.height() / (bounds.height() + margin * 2.0);
        self.canvas.zoom = fit_x
            .min(fit_y)
            .clamp(constants::MIN_ZOOM, constants::MAX_ZOOM);
        self.canvas.offset =
            self.viewport.center().to_vec2() - bounds.center().to_vec2() * self.canvas.zoom;
    }

    /// Replaces the whole document. Used by import; resets transient state.
    pub fn replace_map(&mut self, map: MindMap) {
        let snapshot = self.snapshot();
        self.undo_history.push(snapshot);
        self.map = map;
        self.sim.restore(&self.map);
        self.interaction.selected.clear();
        self.cancel_text_edit();
        self.interaction.session = None;
    }
}

impl std::fmt::Debug for MindMapApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MindMapApp")
            .field("nodes", &self.map.nodes.len())
            .field("edges", &self.map.edges.len())
            .field("floating", &self.floating)
            .finish()
    }
}
