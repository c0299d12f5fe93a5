//! Frame construction and painting.
//!
//! Each frame the app flattens its live state into plain sprite lists and
//! hands them to a [`PaintSink`]. Everything upstream of the sink is
//! backend-agnostic and testable without a window; the egui painter is one
//! sink implementation.

use crate::constants;
use crate::interaction::Gesture;
use crate::types::{Dimensions, EdgeId, NodeId, Shape};
use crate::ui::state::MindMapApp;
use eframe::egui::{self, pos2, Color32, FontId, Pos2, Stroke};

/// How an edge should stand out this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EdgeEmphasis {
    /// Plain connection.
    Normal,
    /// Under the cursor.
    Hovered,
    /// Being tightened; carries charge progress in `0..=1`.
    Tightening(f32),
}

/// One node, flattened to screen space.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSprite {
    /// Source node.
    pub id: NodeId,
    /// Screen-space center.
    pub center: Pos2,
    /// Shape to draw.
    pub shape: Shape,
    /// Canvas-space dimensions; the sink scales by `zoom`.
    pub dimensions: Dimensions,
    /// Current zoom factor.
    pub zoom: f32,
    /// Fill color.
    pub color: Color32,
    /// Label text.
    pub text: String,
    /// Whether the node is selected.
    pub selected: bool,
    /// Whether the node is hovered.
    pub hovered: bool,
    /// Whether the node is pinned in place.
    pub pinned: bool,
    /// Whether this is the magnet node.
    pub magnet: bool,
    /// Whether to draw the resize handle.
    pub show_handle: bool,
    /// Whether the node carries an image reference; drawn as a badge.
    pub has_image: bool,
}

/// One edge, flattened to screen space.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSprite {
    /// Source edge.
    pub id: EdgeId,
    /// Screen-space endpoints.
    pub from: Pos2,
    /// Screen-space endpoints.
    pub to: Pos2,
    /// Relation label, drawn at the midpoint.
    pub label: Option<String>,
    /// Visual treatment this frame.
    pub emphasis: EdgeEmphasis,
    /// Whether either endpoint is the magnet.
    pub magnet: bool,
}

/// Render boundary: anything that can turn sprite lists into pixels.
pub trait PaintSink {
    /// Draws one frame. Edges come first so nodes paint over them.
    fn paint(&mut self, nodes: &[NodeSprite], edges: &[EdgeSprite]);
}

/// Parses a `#rrggbb` hex color; anything else falls back to gray.
pub fn parse_hex(color: &str) -> Color32 {
    let hex = color.strip_prefix('#').unwrap_or(color);
    if hex.len() != 6 {
        return Color32::GRAY;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match (channel(0), channel(2), channel(4)) {
        (Some(r), Some(g), Some(b)) => Color32::from_rgb(r, g, b),
        _ => Color32::GRAY,
    }
}

impl MindMapApp {
    /// Flattens the committed graph plus live positions and interaction
    /// state into this frame's sprite lists.
    pub fn build_frame(&self, now: f64) -> (Vec<NodeSprite>, Vec<EdgeSprite>) {
        let magnet = self.map.magnet();
        let tighten = self.interaction.session.as_ref().and_then(|s| {
            if let Gesture::EdgeTighten {
                edge, started_at, ..
            } = s.gesture
            {
                let progress =
                    ((now - started_at) / constants::TIGHTEN_CHARGE_SECS).clamp(0.0, 1.0);
                Some((edge, progress as f32))
            } else {
                None
            }
        });

        let edges = self
            .map
            .edges
            .iter()
            .filter_map(|edge| {
                let from = self.sim.pos(edge.source)?;
                let to = self.sim.pos(edge.target)?;
                let emphasis = match tighten {
                    Some((id, progress)) if id == edge.id => EdgeEmphasis::Tightening(progress),
                    _ if self.interaction.hovered_edge == Some(edge.id) => EdgeEmphasis::Hovered,
                    _ => EdgeEmphasis::Normal,
                };
                Some(EdgeSprite {
                    id: edge.id,
                    from: self.canvas.canvas_to_screen(from),
                    to: self.canvas.canvas_to_screen(to),
                    label: edge.label.clone(),
                    emphasis,
                    magnet: magnet.map(|m| edge.touches(m)).unwrap_or(false),
                })
            })
            .collect();

        let nodes = self
            .map
            .nodes
            .iter()
            .filter_map(|node| {
                let center = self.sim.pos(node.id)?;
                let selected = self.interaction.selected.contains(&node.id);
                Some(NodeSprite {
                    id: node.id,
                    center: self.canvas.canvas_to_screen(center),
                    shape: node.shape,
                    dimensions: node.dimensions,
                    zoom: self.canvas.zoom,
                    color: parse_hex(&node.color),
                    text: node.text.clone(),
                    selected,
                    hovered: self.interaction.hovered_node == Some(node.id),
                    pinned: node.pinned,
                    magnet: node.is_magnet(),
                    show_handle: selected
                        && (self.interaction.near_handle == Some(node.id)
                            || self.interaction.selected.len() == 1),
                    has_image: node.image.is_some(),
                })
            })
            .collect();

        (nodes, edges)
    }
}

/// [`PaintSink`] backed by an egui painter.
pub struct EguiPaint<'a> {
    painter: &'a egui::Painter,
    dark_mode: bool,
}

impl<'a> EguiPaint<'a> {
    /// Wraps a painter for one frame.
    pub fn new(painter: &'a egui::Painter, dark_mode: bool) -> Self {
        Self { painter, dark_mode }
    }

    fn line_color(&self) -> Color32 {
        if self.dark_mode {
            Color32::from_gray(140)
        } else {
            Color32::from_gray(100)
        }
    }

    fn text_color(&self) -> Color32 {
        if self.dark_mode {
            Color32::from_gray(235)
        } else {
            Color32::from_gray(25)
        }
    }
}

impl PaintSink for EguiPaint<'_> {
    fn paint(&mut self, nodes: &[NodeSprite], edges: &[EdgeSprite]) {
        for edge in edges {
            let (width, color) = match edge.emphasis {
                EdgeEmphasis::Normal => (2.0, self.line_color()),
                EdgeEmphasis::Hovered => (3.5, Color32::from_rgb(96, 165, 250)),
                EdgeEmphasis::Tightening(progress) => (
                    2.0 + progress * 4.0,
                    Color32::from_rgb(
                        (140.0 + progress * 115.0) as u8,
                        (140.0 - progress * 80.0) as u8,
                        60,
                    ),
                ),
            };
            let color = if edge.magnet {
                color.gamma_multiply(0.5)
            } else {
                color
            };
            self.painter
                .line_segment([edge.from, edge.to], Stroke::new(width, color));

            if let Some(label) = &edge.label {
                let mid = pos2(
                    (edge.from.x + edge.to.x) / 2.0,
                    (edge.from.y + edge.to.y) / 2.0,
                );
                self.painter.text(
                    mid,
                    egui::Align2::CENTER_CENTER,
                    label,
                    FontId::proportional(13.0),
                    self.text_color(),
                );
            }
        }

        for node in nodes {
            let zoom = node.zoom;
            let fill = if node.hovered {
                node.color.gamma_multiply(1.2)
            } else {
                node.color
            };
            let stroke = if node.selected {
                Stroke::new(3.0, Color32::from_rgb(96, 165, 250))
            } else {
                Stroke::new(1.5, fill.gamma_multiply(0.6))
            };

            match node.shape {
                Shape::Circle => {
                    let radius = node.dimensions.circle_radius * zoom;
                    self.painter.circle(node.center, radius, fill, stroke);
                }
                Shape::Rectangle => {
                    let size = egui::vec2(
                        node.dimensions.rect_width * zoom,
                        node.dimensions.rect_height * zoom,
                    );
                    let rect = egui::Rect::from_center_size(node.center, size);
                    self.painter
                        .rect(rect, 8.0 * zoom, fill, stroke, egui::StrokeKind::Middle);
                }
            }

            if node.pinned {
                self.painter.circle_filled(
                    node.center - egui::vec2(0.0, node.dimensions.circle_radius * zoom * 0.6),
                    3.0,
                    Color32::WHITE,
                );
            }

            self.painter.text(
                node.center,
                egui::Align2::CENTER_CENTER,
                &node.text,
                FontId::proportional((if node.magnet { 14.0 } else { 15.0 }) * zoom),
                Color32::WHITE,
            );

            if node.has_image {
                self.painter.text(
                    node.center + egui::vec2(0.0, -14.0 * zoom),
                    egui::Align2::CENTER_CENTER,
                    "🖼",
                    FontId::proportional(12.0 * zoom),
                    Color32::WHITE,
                );
            }

            if node.show_handle {
                let handle = crate::geometry::resize_handle_pos(
                    node.center,
                    node.shape,
                    &Dimensions {
                        circle_radius: node.dimensions.circle_radius * zoom,
                        rect_width: node.dimensions.rect_width * zoom,
                        rect_height: node.dimensions.rect_height * zoom,
                    },
                );
                self.painter
                    .circle_filled(handle, 5.0, Color32::from_rgb(96, 165, 250));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parsing_handles_good_and_bad_input() {
        assert_eq!(parse_hex("#0d9488"), Color32::from_rgb(0x0d, 0x94, 0x88));
        assert_eq!(parse_hex("0d9488"), Color32::from_rgb(0x0d, 0x94, 0x88));
        assert_eq!(parse_hex("#nothex"), Color32::GRAY);
        assert_eq!(parse_hex(""), Color32::GRAY);
    }

    #[test]
    fn build_frame_maps_canvas_to_screen() {
        let mut app = MindMapApp::default();
        app.canvas.offset = egui::vec2(100.0, 50.0);
        app.canvas.zoom = 2.0;
        // The seed node sits at the canvas origin.
        let (nodes, edges) = app.build_frame(0.0);
        assert_eq!(nodes.len(), 1);
        assert!(edges.is_empty());
        assert_eq!(nodes[0].center, pos2(100.0, 50.0));
        assert_eq!(nodes[0].zoom, 2.0);
    }

    #[test]
    fn image_bearing_nodes_are_flagged_for_the_badge() {
        let mut app = MindMapApp::default();
        let (nodes, _) = app.build_frame(0.0);
        assert!(!nodes[0].has_image);

        app.map.nodes[0].image = Some("data:image/png;base64,AAAA".into());
        let (nodes, _) = app.build_frame(0.0);
        assert!(nodes[0].has_image);
    }

    struct RecordingSink {
        frames: Vec<(usize, usize)>,
    }

    impl PaintSink for RecordingSink {
        fn paint(&mut self, nodes: &[NodeSprite], edges: &[EdgeSprite]) {
            self.frames.push((nodes.len(), edges.len()));
        }
    }

    #[test]
    fn sink_receives_one_push_per_frame() {
        let app = MindMapApp::default();
        let mut sink = RecordingSink { frames: Vec::new() };
        for _ in 0..3 {
            let (nodes, edges) = app.build_frame(0.0);
            sink.paint(&nodes, &edges);
        }
        assert_eq!(sink.frames, vec![(1, 0); 3]);
    }

    #[test]
    fn selection_and_magnet_flags_flow_into_sprites() {
        let mut app = MindMapApp::default();
        let seed = app.map.nodes[0].id;
        app.interaction.selected.insert(seed);
        app.spawn_magnet(0.0);
        app.sim.sync(&app.map);

        let (nodes, edges) = app.build_frame(0.0);
        assert_eq!(nodes.len(), 2);
        let sprite = nodes.iter().find(|n| n.id == seed).unwrap();
        assert!(sprite.selected && sprite.show_handle);
        assert_eq!(nodes.iter().filter(|n| n.magnet).count(), 1);
        // The seed node was isolated, so the magnet linked it.
        assert_eq!(edges.len(), 1);
        assert!(edges[0].magnet);
    }
}
