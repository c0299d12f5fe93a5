//! Core data types and structures for the mind-map editor.
//!
//! This module defines the committed graph state: nodes, edges, and the
//! `MindMap` container together with all structural operations (link, unlink,
//! split, merge, magnet maintenance). The committed state is what undo
//! snapshots, persistence and export read; per-frame positions live in the
//! [`crate::physics::SimulationStore`].

use crate::constants;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Unique identifier for nodes.
pub type NodeId = Uuid;

/// Unique identifier for edges.
pub type EdgeId = Uuid;

/// Source of fresh ids for nodes and edges.
///
/// Production uses random v4 UUIDs; tests use the sequential variant so that
/// merge/link scenarios are reproducible.
#[derive(Debug, Clone)]
pub enum IdGen {
    /// Random v4 UUIDs.
    Random,
    /// Counter-derived UUIDs, deterministic across runs.
    Sequential(u64),
}

impl Default for IdGen {
    fn default() -> Self {
        IdGen::Random
    }
}

impl IdGen {
    /// Creates a deterministic generator starting at zero.
    pub fn sequential() -> Self {
        IdGen::Sequential(0)
    }

    /// Returns the next id.
    pub fn next(&mut self) -> Uuid {
        match self {
            IdGen::Random => Uuid::new_v4(),
            IdGen::Sequential(counter) => {
                *counter += 1;
                Uuid::from_u64_pair(0xD1CE, *counter)
            }
        }
    }
}

/// Visual shape of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    /// Round bubble sized by a radius.
    Circle,
    /// Rectangular bubble sized by width and height.
    Rectangle,
}

impl Shape {
    /// The other shape.
    pub fn toggled(self) -> Self {
        match self {
            Shape::Circle => Shape::Rectangle,
            Shape::Rectangle => Shape::Circle,
        }
    }
}

/// Per-shape size parameters.
///
/// Both shapes keep independent dimensions so toggling a node's shape
/// preserves the size it had the last time it used each shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Radius when the node is a circle.
    pub circle_radius: f32,
    /// Width when the node is a rectangle.
    pub rect_width: f32,
    /// Height when the node is a rectangle.
    pub rect_height: f32,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            circle_radius: constants::DEFAULT_CIRCLE_RADIUS,
            rect_width: constants::DEFAULT_RECT_WIDTH,
            rect_height: constants::DEFAULT_RECT_HEIGHT,
        }
    }
}

impl Dimensions {
    /// Returns dimensions clamped to the minimum sizes.
    ///
    /// Every write path goes through this; no node ever carries a degenerate
    /// size.
    pub fn clamped(self) -> Self {
        Self {
            circle_radius: self.circle_radius.max(constants::MIN_CIRCLE_RADIUS),
            rect_width: self.rect_width.max(constants::MIN_RECT_WIDTH),
            rect_height: self.rect_height.max(constants::MIN_RECT_HEIGHT),
        }
    }
}

/// Semantic node discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Ordinary idea bubble.
    Default,
    /// Magnet node: collects currently-unconnected bubbles via auto-generated
    /// edges and is exempt from edge tightening.
    Magnet,
}

/// A single bubble in the mind map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier for this node.
    pub id: NodeId,
    /// Text label; may be empty for image bubbles.
    pub text: String,
    /// Committed canvas position as (x, y).
    pub position: (f32, f32),
    /// Committed velocity as (vx, vy); kept so restores resume motion.
    #[serde(default)]
    pub velocity: (f32, f32),
    /// Display color as a `#rrggbb` hex string.
    pub color: String,
    /// Current visual shape.
    pub shape: Shape,
    /// Per-shape size parameters.
    pub dimensions: Dimensions,
    /// Semantic discriminator.
    #[serde(default = "default_kind")]
    pub kind: NodeKind,
    /// Pinned nodes are excluded from force integration and gesture-driven
    /// displacement.
    #[serde(default)]
    pub pinned: bool,
    /// Optional image reference (data URL or path). Surfaced as a badge on
    /// the bubble and preserved through save/load and merges.
    #[serde(default)]
    pub image: Option<String>,
}

fn default_kind() -> NodeKind {
    NodeKind::Default
}

impl Node {
    /// Creates a new default-kind node with the standard color and clamped
    /// default dimensions.
    pub fn new(id: NodeId, text: impl Into<String>, position: (f32, f32), shape: Shape) -> Self {
        Self {
            id,
            text: text.into(),
            position,
            velocity: (0.0, 0.0),
            color: constants::PALETTE[0].to_string(),
            shape,
            dimensions: Dimensions::default().clamped(),
            kind: NodeKind::Default,
            pinned: false,
            image: None,
        }
    }

    /// Effective physical radius used by the force integrator.
    ///
    /// Circles use their radius; rectangles the average of half-width and
    /// half-height, so large bubbles repel from further away than small ones.
    pub fn physics_radius(&self) -> f32 {
        match self.shape {
            Shape::Circle => self.dimensions.circle_radius,
            Shape::Rectangle => (self.dimensions.rect_width + self.dimensions.rect_height) / 4.0,
        }
    }

    /// Whether this node is a magnet.
    pub fn is_magnet(&self) -> bool {
        self.kind == NodeKind::Magnet
    }
}

/// An undirected link between two bubbles.
///
/// `source`/`target` record creation direction for export, but all graph
/// queries treat the pair as unordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier for this edge.
    pub id: EdgeId,
    /// One endpoint.
    pub source: NodeId,
    /// The other endpoint.
    pub target: NodeId,
    /// Optional relation label rendered along the line.
    #[serde(default)]
    pub label: Option<String>,
}

impl Edge {
    /// Creates a new unlabeled edge.
    pub fn new(id: EdgeId, source: NodeId, target: NodeId) -> Self {
        Self {
            id,
            source,
            target,
            label: None,
        }
    }

    /// Whether this edge has `node` as an endpoint.
    pub fn touches(&self, node: NodeId) -> bool {
        self.source == node || self.target == node
    }

    /// The endpoint opposite `node`, or `None` if `node` is not an endpoint.
    pub fn other_end(&self, node: NodeId) -> Option<NodeId> {
        if self.source == node {
            Some(self.target)
        } else if self.target == node {
            Some(self.source)
        } else {
            None
        }
    }

    /// Sorted endpoint pair; the dedup key for the no-duplicate-edge invariant.
    pub fn pair_key(&self) -> (NodeId, NodeId) {
        if self.source <= self.target {
            (self.source, self.target)
        } else {
            (self.target, self.source)
        }
    }
}

/// What releasing a link-drag over a node will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    /// At least one source is not yet connected to the target: connect them.
    Link,
    /// Every source is already connected to the target: disconnect them all.
    Unlink,
}

/// Result of a successful merge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeOutcome {
    /// The endpoint that remains.
    pub survivor: NodeId,
    /// The endpoint that was absorbed and removed.
    pub absorbed: NodeId,
    /// Committed position of the survivor, for feedback effects.
    pub position: (f32, f32),
}

/// The committed node/edge graph.
///
/// Nodes are kept in a `Vec` so later nodes render (and hit-test) on top of
/// earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MindMap {
    /// All bubbles, in z-order (last on top).
    pub nodes: Vec<Node>,
    /// All links between bubbles.
    pub edges: Vec<Edge>,
}

impl MindMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes the map to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserializes a map from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Looks up a node by id.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Looks up a node by id, mutably.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Looks up an edge by id.
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Adds a node and returns its id.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id;
        self.nodes.push(node);
        id
    }

    /// Removes the given nodes and every edge touching any of them.
    pub fn remove_nodes(&mut self, ids: &HashSet<NodeId>) {
        self.nodes.retain(|n| !ids.contains(&n.id));
        self.edges
            .retain(|e| !ids.contains(&e.source) && !ids.contains(&e.target));
    }

    /// Whether an edge exists between `a` and `b` in either direction.
    pub fn connected(&self, a: NodeId, b: NodeId) -> bool {
        self.edges
            .iter()
            .any(|e| (e.source == a && e.target == b) || (e.source == b && e.target == a))
    }

    /// The magnet node, if one exists.
    pub fn magnet(&self) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.is_magnet()).map(|n| n.id)
    }

    /// Number of edges connecting `id` to non-magnet partners.
    ///
    /// A node with zero such edges counts as isolated for magnet collection.
    pub fn non_magnet_degree(&self, id: NodeId) -> usize {
        self.edges
            .iter()
            .filter(|e| e.touches(id))
            .filter(|e| {
                e.other_end(id)
                    .and_then(|other| self.node(other))
                    .map(|n| !n.is_magnet())
                    .unwrap_or(false)
            })
            .count()
    }

    /// Drops self-loops and duplicate unordered pairs, keeping the first
    /// occurrence of each pair.
    ///
    /// Runs after every link and merge operation; rapid gesture sequences can
    /// otherwise briefly introduce duplicates.
    pub fn dedup_edges(&mut self) {
        let mut seen: HashSet<(NodeId, NodeId)> = HashSet::new();
        self.edges
            .retain(|e| e.source != e.target && seen.insert(e.pair_key()));
    }

    /// Decides what releasing a link-drag from `sources` over `target` does.
    ///
    /// `Unlink` if and only if *every* source already has an edge to the
    /// target; otherwise `Link`.
    pub fn link_action(&self, sources: &[NodeId], target: NodeId) -> LinkAction {
        let all_connected = !sources.is_empty()
            && sources.iter().all(|&src| self.connected(src, target));
        if all_connected {
            LinkAction::Unlink
        } else {
            LinkAction::Link
        }
    }

    /// Applies the link/unlink decision for `sources` against `target`.
    ///
    /// `Link` adds one edge per source lacking a connection, skipping
    /// self-loops and existing pairs, then releases magnet edges to nodes
    /// that just became non-isolated. `Unlink` removes every edge between any
    /// source and the target.
    pub fn apply_link(
        &mut self,
        ids: &mut IdGen,
        sources: &[NodeId],
        target: NodeId,
    ) -> LinkAction {
        let action = self.link_action(sources, target);
        match action {
            LinkAction::Unlink => {
                self.edges.retain(|e| {
                    !((sources.contains(&e.source) && e.target == target)
                        || (sources.contains(&e.target) && e.source == target))
                });
            }
            LinkAction::Link => {
                for &src in sources {
                    if src != target && !self.connected(src, target) {
                        self.edges.push(Edge::new(ids.next(), src, target));
                    }
                }
                self.release_magnet_links();
                self.dedup_edges();
            }
        }
        action
    }

    /// Splits `edge_id` by inserting a new node at `position`.
    ///
    /// The edge is removed and replaced by two segments through the new node;
    /// the original label stays on the first segment. Any `sources` from the
    /// in-flight link gesture are also connected to the new node.
    pub fn split_edge(
        &mut self,
        ids: &mut IdGen,
        edge_id: EdgeId,
        position: (f32, f32),
        sources: &[NodeId],
        text: impl Into<String>,
        shape: Shape,
    ) -> Option<NodeId> {
        let old = self.edge(edge_id)?.clone();
        self.edges.retain(|e| e.id != edge_id);

        let new_id = self.add_node(Node::new(ids.next(), text, position, shape));

        let mut first = Edge::new(ids.next(), old.source, new_id);
        first.label = old.label;
        self.edges.push(first);
        self.edges.push(Edge::new(ids.next(), new_id, old.target));
        for &src in sources {
            if src != new_id {
                self.edges.push(Edge::new(ids.next(), src, new_id));
            }
        }
        self.dedup_edges();
        Some(new_id)
    }

    /// Fuses the endpoints of a tightened edge into one node.
    ///
    /// The endpoint closer to `anchor` (the canvas point where the tighten
    /// gesture began) survives; the other is absorbed. Magnet endpoints never
    /// merge. Committed positions are compared, so callers reconcile the
    /// simulation first.
    pub fn merge_nodes(
        &mut self,
        a: NodeId,
        b: NodeId,
        anchor: (f32, f32),
    ) -> Option<MergeOutcome> {
        let node_a = self.node(a)?;
        let node_b = self.node(b)?;
        if node_a.is_magnet() || node_b.is_magnet() {
            return None;
        }

        let dist_sq = |p: (f32, f32)| {
            let dx = p.0 - anchor.0;
            let dy = p.1 - anchor.1;
            dx * dx + dy * dy
        };
        let (survivor, absorbed) = if dist_sq(node_b.position) < dist_sq(node_a.position) {
            (b, a)
        } else {
            (a, b)
        };

        let absorbed_text = self.node(absorbed)?.text.clone();
        let absorbed_image = self.node(absorbed)?.image.clone();
        let position;
        {
            let node = self.node_mut(survivor)?;
            node.velocity = (0.0, 0.0);
            match node.shape {
                Shape::Circle => {
                    node.dimensions.circle_radius *= constants::MERGE_GROWTH_FACTOR;
                }
                Shape::Rectangle => {
                    node.dimensions.rect_width *= constants::MERGE_GROWTH_FACTOR;
                    node.dimensions.rect_height *= constants::MERGE_GROWTH_FACTOR;
                }
            }
            node.dimensions = node.dimensions.clamped();
            // Placeholder labels carry no content; they never survive a merge.
            let survivor_blank = constants::PLACEHOLDER_LABELS.contains(&node.text.as_str());
            let absorbed_blank =
                constants::PLACEHOLDER_LABELS.contains(&absorbed_text.as_str());
            if survivor_blank && !absorbed_blank {
                node.text = absorbed_text.clone();
            } else if !absorbed_blank {
                node.text.push('\n');
                node.text.push_str(&absorbed_text);
            }
            if node.image.is_none() {
                node.image = absorbed_image;
            }
            position = node.position;
        }

        self.nodes.retain(|n| n.id != absorbed);
        for edge in &mut self.edges {
            if edge.source == absorbed {
                edge.source = survivor;
            }
            if edge.target == absorbed {
                edge.target = survivor;
            }
        }
        self.dedup_edges();

        Some(MergeOutcome {
            survivor,
            absorbed,
            position,
        })
    }

    /// Creates a magnet node at `position` and links every currently
    /// edge-less node to it.
    pub fn spawn_magnet(&mut self, ids: &mut IdGen, position: (f32, f32)) -> NodeId {
        let mut magnet = Node::new(
            ids.next(),
            constants::MAGNET_NODE_LABEL,
            position,
            Shape::Circle,
        );
        magnet.kind = NodeKind::Magnet;
        magnet.color = constants::MAGNET_COLOR.to_string();
        magnet.dimensions.circle_radius = 60.0;
        let magnet_id = self.add_node(magnet);

        let connected: HashSet<NodeId> = self
            .edges
            .iter()
            .flat_map(|e| [e.source, e.target])
            .collect();
        let isolated: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|n| n.id != magnet_id && !connected.contains(&n.id))
            .map(|n| n.id)
            .collect();
        for id in isolated {
            self.edges.push(Edge::new(ids.next(), magnet_id, id));
        }
        magnet_id
    }

    /// Re-evaluates the magnet's collection: drops magnet edges whose other
    /// endpoint gained a real connection, links nodes that became isolated.
    ///
    /// Returns whether anything changed.
    pub fn refresh_magnet_links(&mut self, ids: &mut IdGen) -> bool {
        let Some(magnet_id) = self.magnet() else {
            return false;
        };
        let before = self.edges.len();
        self.release_magnet_links();

        let candidates: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|n| n.id != magnet_id && !n.is_magnet())
            .map(|n| n.id)
            .collect();
        let mut added = false;
        for id in candidates {
            if self.non_magnet_degree(id) == 0 && !self.connected(magnet_id, id) {
                self.edges.push(Edge::new(ids.next(), magnet_id, id));
                added = true;
            }
        }
        added || self.edges.len() != before
    }

    /// Drops magnet edges to nodes that now have at least one non-magnet
    /// connection. A node leaves the magnet's pull exactly when it stops
    /// being isolated.
    pub fn release_magnet_links(&mut self) {
        let Some(magnet_id) = self.magnet() else {
            return;
        };
        let released: Vec<EdgeId> = self
            .edges
            .iter()
            .filter(|e| e.touches(magnet_id))
            .filter_map(|e| {
                let other = e.other_end(magnet_id)?;
                (self.non_magnet_degree(other) > 0).then_some(e.id)
            })
            .collect();
        self.edges.retain(|e| !released.contains(&e.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_nodes() -> (MindMap, IdGen, NodeId, NodeId) {
        let mut ids = IdGen::sequential();
        let mut map = MindMap::new();
        let a = map.add_node(Node::new(ids.next(), "A", (0.0, 0.0), Shape::Circle));
        let b = map.add_node(Node::new(ids.next(), "B", (200.0, 0.0), Shape::Circle));
        (map, ids, a, b)
    }

    #[test]
    fn sequential_ids_are_reproducible() {
        let mut first = IdGen::sequential();
        let mut second = IdGen::sequential();
        assert_eq!(first.next(), second.next());
        assert_eq!(first.next(), second.next());
        // Consecutive ids from one generator still differ.
        let a = first.next();
        let b = first.next();
        assert_ne!(a, b);
    }

    #[test]
    fn dimensions_clamp_to_minimums() {
        let dims = Dimensions {
            circle_radius: 1.0,
            rect_width: 5.0,
            rect_height: 5.0,
        }
        .clamped();
        assert_eq!(dims.circle_radius, crate::constants::MIN_CIRCLE_RADIUS);
        assert_eq!(dims.rect_width, crate::constants::MIN_RECT_WIDTH);
        assert_eq!(dims.rect_height, crate::constants::MIN_RECT_HEIGHT);
    }

    #[test]
    fn toggling_shape_preserves_both_sizes() {
        let (mut map, _, a, _) = two_nodes();
        let node = map.node_mut(a).unwrap();
        node.dimensions.circle_radius = 75.0;
        node.shape = node.shape.toggled();
        assert_eq!(node.shape, Shape::Rectangle);
        node.shape = node.shape.toggled();
        assert_eq!(node.dimensions.circle_radius, 75.0);
    }

    #[test]
    fn link_action_requires_all_sources_connected_for_unlink() {
        let (mut map, mut ids, a, b) = two_nodes();
        let c = map.add_node(Node::new(ids.next(), "C", (0.0, 200.0), Shape::Circle));

        assert_eq!(map.link_action(&[a, c], b), LinkAction::Link);
        map.edges.push(Edge::new(ids.next(), a, b));
        // One of two sources connected: still Link.
        assert_eq!(map.link_action(&[a, c], b), LinkAction::Link);
        map.edges.push(Edge::new(ids.next(), b, c));
        // Direction of the edge record does not matter.
        assert_eq!(map.link_action(&[a, c], b), LinkAction::Unlink);
    }

    #[test]
    fn apply_link_skips_self_loops_and_existing_pairs() {
        let (mut map, mut ids, a, b) = two_nodes();
        map.edges.push(Edge::new(ids.next(), a, b));

        map.apply_link(&mut ids, &[a, b], b);
        // a-b already existed, b-b is a self-loop: link is a no-op... except
        // the action for [a, b] over b is Link because b itself is not
        // connected to b.
        assert_eq!(map.edges.len(), 1);
        assert!(map.connected(a, b));
    }

    #[test]
    fn apply_unlink_removes_all_edges_to_target() {
        let (mut map, mut ids, a, b) = two_nodes();
        let c = map.add_node(Node::new(ids.next(), "C", (0.0, 200.0), Shape::Circle));
        map.edges.push(Edge::new(ids.next(), a, b));
        map.edges.push(Edge::new(ids.next(), b, c));

        let action = map.apply_link(&mut ids, &[a, c], b);
        assert_eq!(action, LinkAction::Unlink);
        assert!(map.edges.is_empty());
    }

    #[test]
    fn dedup_drops_duplicates_and_self_loops() {
        let (mut map, mut ids, a, b) = two_nodes();
        map.edges.push(Edge::new(ids.next(), a, b));
        map.edges.push(Edge::new(ids.next(), b, a));
        map.edges.push(Edge::new(ids.next(), a, a));

        map.dedup_edges();
        assert_eq!(map.edges.len(), 1);
        assert_eq!(map.edges[0].pair_key(), Edge::new(Uuid::nil(), a, b).pair_key());
    }

    #[test]
    fn split_preserves_label_and_connects_sources() {
        let (mut map, mut ids, a, b) = two_nodes();
        let c = map.add_node(Node::new(ids.next(), "C", (0.0, 200.0), Shape::Circle));
        let mut edge = Edge::new(ids.next(), a, b);
        edge.label = Some("relates".into());
        let edge_id = edge.id;
        map.edges.push(edge);

        let new_id = map
            .split_edge(&mut ids, edge_id, (100.0, 0.0), &[c], "Idea", Shape::Circle)
            .unwrap();

        assert_eq!(map.nodes.len(), 4);
        assert_eq!(map.edges.len(), 3);
        assert!(map.connected(a, new_id));
        assert!(map.connected(new_id, b));
        assert!(map.connected(c, new_id));
        assert!(!map.connected(a, b));
        // Label stays on the first segment.
        let first = map
            .edges
            .iter()
            .find(|e| e.touches(a) && e.touches(new_id))
            .unwrap();
        assert_eq!(first.label.as_deref(), Some("relates"));
    }

    #[test]
    fn merge_survivor_chosen_by_anchor_proximity() {
        let (mut map, mut ids, a, b) = two_nodes();
        map.edges.push(Edge::new(ids.next(), a, b));

        // Anchor at (190, 0) is closer to B at (200, 0).
        let outcome = map.merge_nodes(a, b, (190.0, 0.0)).unwrap();
        assert_eq!(outcome.survivor, b);
        assert_eq!(outcome.absorbed, a);
        assert_eq!(map.nodes.len(), 1);
        assert_eq!(map.nodes[0].position, (200.0, 0.0));
        // Velocity frozen, size grown.
        assert_eq!(map.nodes[0].velocity, (0.0, 0.0));
        assert!(map.nodes[0].dimensions.circle_radius > 50.0);
        // The tightened edge became a self-loop and was dropped.
        assert!(map.edges.is_empty());
    }

    #[test]
    fn merge_is_symmetric_in_edge_direction() {
        for swap in [false, true] {
            let (mut map, mut ids, a, b) = two_nodes();
            let (src, dst) = if swap { (b, a) } else { (a, b) };
            map.edges.push(Edge::new(ids.next(), src, dst));
            let outcome = map.merge_nodes(src, dst, (190.0, 0.0)).unwrap();
            assert_eq!(outcome.survivor, b, "survivor must not depend on edge direction");
        }
    }

    #[test]
    fn merge_concatenates_text_but_drops_placeholder() {
        let (mut map, mut ids, a, b) = two_nodes();
        map.edges.push(Edge::new(ids.next(), a, b));
        map.node_mut(a).unwrap().text = "left".into();
        map.node_mut(b).unwrap().text = "right".into();
        let outcome = map.merge_nodes(a, b, (0.0, 0.0)).unwrap();
        assert_eq!(map.node(outcome.survivor).unwrap().text, "left\nright");

        // Placeholder text is dropped rather than appended.
        let (mut map, mut ids, a, b) = two_nodes();
        map.edges.push(Edge::new(ids.next(), a, b));
        map.node_mut(a).unwrap().text = "keep".into();
        map.node_mut(b).unwrap().text = "Idea".into();
        let outcome = map.merge_nodes(a, b, (0.0, 0.0)).unwrap();
        assert_eq!(map.node(outcome.survivor).unwrap().text, "keep");

        // A placeholder survivor takes over the absorbed node's text.
        let (mut map, mut ids, a, b) = two_nodes();
        map.edges.push(Edge::new(ids.next(), a, b));
        map.node_mut(a).unwrap().text = "Idea".into();
        map.node_mut(b).unwrap().text = "real".into();
        let outcome = map.merge_nodes(a, b, (0.0, 0.0)).unwrap();
        assert_eq!(map.node(outcome.survivor).unwrap().text, "real");
    }

    #[test]
    fn merge_keeps_an_image_reference_alive() {
        let (mut map, mut ids, a, b) = two_nodes();
        map.edges.push(Edge::new(ids.next(), a, b));
        map.node_mut(b).unwrap().image = Some("photo.png".into());
        let outcome = map.merge_nodes(a, b, (0.0, 0.0)).unwrap();
        assert_eq!(
            map.node(outcome.survivor).unwrap().image.as_deref(),
            Some("photo.png")
        );
    }

    #[test]
    fn merge_rewires_edges_without_duplicates_or_self_loops() {
        let (mut map, mut ids, a, b) = two_nodes();
        let c = map.add_node(Node::new(ids.next(), "C", (0.0, 200.0), Shape::Circle));
        map.edges.push(Edge::new(ids.next(), a, b));
        map.edges.push(Edge::new(ids.next(), a, c));
        map.edges.push(Edge::new(ids.next(), b, c));

        let outcome = map.merge_nodes(a, b, (0.0, 0.0)).unwrap();
        assert_eq!(outcome.survivor, a);
        // a-b collapses, a-c and rewired b-c dedup into a single a-c edge.
        assert_eq!(map.edges.len(), 1);
        assert!(map.connected(a, c));
        for e in &map.edges {
            assert_ne!(e.source, e.target);
        }
    }

    #[test]
    fn merge_refuses_magnet_endpoints() {
        let (mut map, mut ids, a, _) = two_nodes();
        let m = map.spawn_magnet(&mut ids, (0.0, 0.0));
        assert!(map.merge_nodes(a, m, (0.0, 0.0)).is_none());
    }

    #[test]
    fn magnet_collects_isolated_and_releases_on_link() {
        // Scenario: A and B disconnected; magnet at origin links both; then
        // linking A to a new node C releases exactly the M-A edge.
        let (mut map, mut ids, a, b) = two_nodes();
        let m = map.spawn_magnet(&mut ids, (0.0, 0.0));
        assert!(map.connected(m, a));
        assert!(map.connected(m, b));

        let c = map.add_node(Node::new(ids.next(), "C", (400.0, 0.0), Shape::Circle));
        map.apply_link(&mut ids, &[a], c);

        assert!(map.connected(a, c));
        assert!(!map.connected(m, a), "magnet releases newly connected node");
        assert!(map.connected(m, b), "isolated node keeps its magnet edge");
        // C gained a real connection before the magnet ever linked it.
        assert!(!map.connected(m, c));
    }

    #[test]
    fn refresh_magnet_links_picks_up_new_isolated_nodes() {
        let (mut map, mut ids, _, _) = two_nodes();
        let m = map.spawn_magnet(&mut ids, (0.0, 0.0));
        let d = map.add_node(Node::new(ids.next(), "D", (300.0, 300.0), Shape::Circle));
        assert!(!map.connected(m, d));
        assert!(map.refresh_magnet_links(&mut ids));
        assert!(map.connected(m, d));
    }

    #[test]
    fn remove_nodes_drops_touching_edges() {
        let (mut map, mut ids, a, b) = two_nodes();
        let c = map.add_node(Node::new(ids.next(), "C", (0.0, 200.0), Shape::Circle));
        map.edges.push(Edge::new(ids.next(), a, b));
        map.edges.push(Edge::new(ids.next(), b, c));

        map.remove_nodes(&HashSet::from([b]));
        assert_eq!(map.nodes.len(), 2);
        assert!(map.edges.is_empty());
    }

    #[test]
    fn map_roundtrips_through_json() {
        let (mut map, mut ids, a, b) = two_nodes();
        map.edges.push(Edge::new(ids.next(), a, b));
        let json = map.to_json().unwrap();
        let restored = MindMap::from_json(&json).unwrap();
        assert_eq!(restored, map);
    }
}
