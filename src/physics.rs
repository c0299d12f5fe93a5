//! Force-directed layout engine.
//!
//! Runs once per frame over a [`SimulationStore`] that mirrors the committed
//! graph. Committed node positions are only touched by explicit
//! [`SimulationStore::reconcile`] calls, so the hot loop never mutates
//! undo-visible state.

use crate::constants;
use crate::geometry::map_range;
use crate::types::{EdgeId, MindMap, NodeId};
use eframe::egui::{pos2, vec2, Pos2, Vec2};
use rand::rngs::SmallRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// User-facing physics sliders, each normalized to `0..=100`.
///
/// Persisted with the app so a tuned feel survives restarts. The raw values
/// are mapped into physical units by [`PhysicsParams::mapped`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsParams {
    /// Pairwise node repulsion.
    pub repulsion: f32,
    /// Spring rest length.
    pub length: f32,
    /// Spring stiffness.
    pub stiffness: f32,
    /// Pull toward the canvas origin.
    pub gravity: f32,
    /// Motion resistance; higher means the layout settles faster.
    pub friction: f32,
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self {
            repulsion: 50.0,
            length: 30.0,
            stiffness: 20.0,
            gravity: 10.0,
            friction: 50.0,
        }
    }
}

impl PhysicsParams {
    /// Maps the normalized sliders into physical units.
    ///
    /// Friction is inverted: a high-friction slider yields a low damping
    /// retention factor.
    pub fn mapped(&self) -> PhysicsConfig {
        PhysicsConfig {
            repulsion: map_range(
                self.repulsion,
                constants::REPULSION_RANGE.0,
                constants::REPULSION_RANGE.1,
            ),
            rest_length: map_range(
                self.length,
                constants::REST_LENGTH_RANGE.0,
                constants::REST_LENGTH_RANGE.1,
            ),
            stiffness: map_range(
                self.stiffness,
                constants::STIFFNESS_RANGE.0,
                constants::STIFFNESS_RANGE.1,
            ),
            gravity: map_range(
                self.gravity,
                constants::GRAVITY_RANGE.0,
                constants::GRAVITY_RANGE.1,
            ),
            damping: map_range(
                100.0 - self.friction,
                constants::DAMPING_RANGE.0,
                constants::DAMPING_RANGE.1,
            ),
        }
    }
}

/// Physics parameters in physical units, ready for the integrator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsConfig {
    /// Pairwise repulsion strength.
    pub repulsion: f32,
    /// Spring rest length in world units.
    pub rest_length: f32,
    /// Hookean spring constant.
    pub stiffness: f32,
    /// Center gravity strength.
    pub gravity: f32,
    /// Per-tick velocity retention factor.
    pub damping: f32,
}

/// Live kinematic state of one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    /// Current simulated position.
    pub pos: Pos2,
    /// Current simulated velocity.
    pub vel: Vec2,
}

/// Per-frame positions and velocities, decoupled from the committed graph.
///
/// The store is rebuilt from committed state on load and after undo/redo, and
/// written back into committed state just before structural edits and
/// snapshots.
#[derive(Debug, Default)]
pub struct SimulationStore {
    bodies: HashMap<NodeId, Body>,
}

impl SimulationStore {
    /// Adds bodies for committed nodes the store does not know yet and drops
    /// bodies whose nodes are gone. Existing bodies keep their live state.
    pub fn sync(&mut self, map: &MindMap) {
        for node in &map.nodes {
            self.bodies.entry(node.id).or_insert(Body {
                pos: pos2(node.position.0, node.position.1),
                vel: vec2(node.velocity.0, node.velocity.1),
            });
        }
        self.bodies.retain(|id, _| map.node(*id).is_some());
    }

    /// Replaces the whole store with the committed state. Used after undo,
    /// redo and import so stale motion cannot leak across a restore.
    pub fn restore(&mut self, map: &MindMap) {
        self.bodies.clear();
        self.sync(map);
    }

    /// Writes live positions and velocities back into the committed graph.
    pub fn reconcile(&self, map: &mut MindMap) {
        for node in &mut map.nodes {
            if let Some(body) = self.bodies.get(&node.id) {
                node.position = (body.pos.x, body.pos.y);
                node.velocity = (body.vel.x, body.vel.y);
            }
        }
    }

    /// Live body for a node.
    pub fn body(&self, id: NodeId) -> Option<&Body> {
        self.bodies.get(&id)
    }

    /// Live body for a node, mutably.
    pub fn body_mut(&mut self, id: NodeId) -> Option<&mut Body> {
        self.bodies.get_mut(&id)
    }

    /// Live position for a node.
    pub fn pos(&self, id: NodeId) -> Option<Pos2> {
        self.bodies.get(&id).map(|b| b.pos)
    }
}

/// An edge being actively tightened by a held gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tightening {
    /// The held edge.
    pub edge: EdgeId,
    /// Charge progress in `0..=1`; shortens the rest length and stiffens the
    /// spring as it grows.
    pub progress: f32,
}

/// A merge detected during a tick.
///
/// The integrator never mutates the graph itself; it reports at most one of
/// these per tick and the caller applies it after integration. That keeps a
/// single merge per frame and keeps the tick loop free of reentrant edits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeRequest {
    /// The tightened edge whose endpoints touched.
    pub edge: EdgeId,
    /// One endpoint.
    pub a: NodeId,
    /// The other endpoint.
    pub b: NodeId,
}

/// Per-tick inputs from the interaction layer.
#[derive(Debug)]
pub struct TickInputs<'a> {
    /// Whether the layout is floating (forces active) or frozen.
    pub floating: bool,
    /// Nodes exempt from forces and integration: pinned nodes plus everything
    /// in `dragged`. They still repel and pull their neighbors.
    pub excluded: &'a HashSet<NodeId>,
    /// Pointer-authoritative positions, applied after integration.
    pub dragged: &'a HashMap<NodeId, Pos2>,
    /// Edge currently being tightened, if any.
    pub tighten: Option<Tightening>,
    /// Whether a move or tighten gesture is live. The idle jitter pauses so
    /// it cannot perturb drag targets or the merge proximity check.
    pub gesture_active: bool,
}

/// Advances the simulation by one tick.
///
/// Order matters: repulsion, springs (with tighten override), center gravity,
/// idle jitter, damped integration, then the pointer override. The override
/// runs last so no force ever displaces a node out from under the cursor, and
/// it runs even when the layout is frozen.
pub fn step(
    store: &mut SimulationStore,
    map: &MindMap,
    config: &PhysicsConfig,
    inputs: &TickInputs<'_>,
    rng: &mut SmallRng,
) -> Option<MergeRequest> {
    store.sync(map);

    let mut merge = None;
    if inputs.floating {
        let ids: Vec<NodeId> = map.nodes.iter().map(|n| n.id).collect();
        let radii: HashMap<NodeId, f32> =
            map.nodes.iter().map(|n| (n.id, n.physics_radius())).collect();
        let mut forces: HashMap<NodeId, Vec2> =
            ids.iter().map(|&id| (id, Vec2::ZERO)).collect();

        // Pairwise repulsion, scaled by combined size so big bubbles claim
        // more room.
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let (a, b) = (ids[i], ids[j]);
                let (Some(pa), Some(pb)) = (store.pos(a), store.pos(b)) else {
                    continue;
                };
                let delta = pa - pb;
                let dist_sq = delta.length_sq().max(constants::DIST_SQ_FLOOR);
                let dist = dist_sq.sqrt();
                let combined = radii.get(&a).unwrap_or(&0.0) + radii.get(&b).unwrap_or(&0.0);
                let magnitude = config.repulsion * combined / dist_sq;
                let dir = delta / dist;
                if let Some(f) = forces.get_mut(&a) {
                    *f += dir * magnitude;
                }
                if let Some(f) = forces.get_mut(&b) {
                    *f -= dir * magnitude;
                }
            }
        }

        // Hookean springs along edges. A tightened edge gets a progressively
        // shorter rest length and stiffer constant as its charge grows.
        for edge in &map.edges {
            let (Some(ps), Some(pt)) = (store.pos(edge.source), store.pos(edge.target)) else {
                continue;
            };
            let (mut rest, mut k) = (config.rest_length, config.stiffness);
            if let Some(t) = inputs.tighten.filter(|t| t.edge == edge.id) {
                let power = t.progress * t.progress;
                rest = config.rest_length * (1.0 - power);
                k = constants::TIGHTEN_BASE_STIFFNESS
                    + power * constants::TIGHTEN_EXTRA_STIFFNESS;

                let dist = (pt - ps).length();
                let combined =
                    radii.get(&edge.source).unwrap_or(&0.0) + radii.get(&edge.target).unwrap_or(&0.0);
                let chargeable = map
                    .node(edge.source)
                    .zip(map.node(edge.target))
                    .map(|(a, b)| !a.is_magnet() && !b.is_magnet())
                    .unwrap_or(false);
                if merge.is_none()
                    && chargeable
                    && t.progress > constants::MERGE_CHARGE_THRESHOLD
                    && dist < combined * constants::MERGE_PROXIMITY_FACTOR
                {
                    merge = Some(MergeRequest {
                        edge: edge.id,
                        a: edge.source,
                        b: edge.target,
                    });
                }
            }

            let delta = pt - ps;
            let dist = delta.length().max(1e-4);
            let magnitude = k * (dist - rest);
            let dir = delta / dist;
            if let Some(f) = forces.get_mut(&edge.source) {
                *f += dir * magnitude;
            }
            if let Some(f) = forces.get_mut(&edge.target) {
                *f -= dir * magnitude;
            }
        }

        // Gravity, jitter, integration. Excluded nodes accumulate nothing so
        // a pinned node holds its exact position.
        for &id in &ids {
            if inputs.excluded.contains(&id) {
                continue;
            }
            let force = forces.get(&id).copied().unwrap_or(Vec2::ZERO);
            let Some(body) = store.body_mut(id) else {
                continue;
            };
            body.vel += force * constants::FORCE_SCALE;
            body.vel += (Pos2::ZERO - body.pos) * config.gravity * constants::GRAVITY_SCALE;
            if !inputs.gesture_active {
                body.vel += vec2(
                    rng.gen_range(-0.5..0.5) * constants::JITTER_AMPLITUDE,
                    rng.gen_range(-0.5..0.5) * constants::JITTER_AMPLITUDE,
                );
            }
            body.vel *= config.damping;
            body.pos += body.vel;
        }
    }

    // Pointer authority: dragged nodes land exactly where the gesture says,
    // with no residual velocity, whether or not the layout is floating.
    for (&id, &target) in inputs.dragged {
        if let Some(body) = store.body_mut(id) {
            body.pos = target;
            body.vel = Vec2::ZERO;
        }
    }

    merge
}
