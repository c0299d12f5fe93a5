//! The canvas widget: translates raw egui input into gesture calls, runs the
//! per-frame tick, and paints the frame with overlays.

use crate::constants;
use crate::interaction::Gesture;
use crate::ui::rendering::{EguiPaint, PaintSink};
use crate::ui::state::{FeedbackKind, MindMapApp, EFFECT_LIFETIME};
use eframe::egui::{self, Color32, PointerButton, Pos2, Stroke};

const BUTTONS: [PointerButton; 3] = [
    PointerButton::Primary,
    PointerButton::Secondary,
    PointerButton::Middle,
];

impl MindMapApp {
    /// Lays out and runs the canvas for one frame.
    pub fn draw_canvas(&mut self, ui: &mut egui::Ui) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        self.viewport = response.rect;
        let ctx = ui.ctx().clone();

        let (now, hover, modifiers, pressed, released, scroll, pinch, escape) =
            ctx.input(|i| {
                (
                    i.time,
                    i.pointer.hover_pos(),
                    i.modifiers,
                    BUTTONS.map(|b| i.pointer.button_pressed(b)),
                    BUTTONS.map(|b| i.pointer.button_released(b)),
                    i.raw_scroll_delta.y,
                    i.zoom_delta(),
                    i.key_pressed(egui::Key::Escape),
                )
            });

        if let Some(pos) = hover {
            self.pointer_move(pos, now);

            if response.hovered() {
                for (i, &button) in BUTTONS.iter().enumerate() {
                    if pressed[i] {
                        self.pointer_down(pos, button, modifiers, now);
                    }
                }
                if scroll.abs() > 0.0 {
                    self.canvas
                        .zoom_about(pos, 1.0 + scroll * constants::ZOOM_SENSITIVITY);
                }
                if (pinch - 1.0).abs() > f32::EPSILON {
                    self.canvas.zoom_about(pos, pinch);
                }
            }
            for (i, &button) in BUTTONS.iter().enumerate() {
                if released[i] {
                    self.pointer_up(pos, button, now);
                }
            }
            if response.double_clicked() {
                self.double_click(pos, now);
            }
        }
        if escape {
            self.cancel_gesture();
            self.cancel_text_edit();
        }

        self.tick(now);

        let (nodes, edges) = self.build_frame(now);
        EguiPaint::new(&painter, self.dark_mode).paint(&nodes, &edges);
        self.draw_overlays(&painter, hover, now);
        self.draw_text_editor(&ctx);
        self.draw_context_menu(&ctx, now);

        // The simulation never sleeps while floating.
        if self.floating || self.interaction.session.is_some() {
            ctx.request_repaint();
        }
    }

    /// Gesture overlays: marquee, provisional links, trash zone, ripples.
    fn draw_overlays(&self, painter: &egui::Painter, hover: Option<Pos2>, now: f64) {
        if let Some(session) = self.interaction.session.as_ref().filter(|s| s.moved) {
            match &session.gesture {
                Gesture::BoxSelect { .. } => {
                    if let Some(pos) = hover {
                        let rect = egui::Rect::from_two_pos(session.start_screen, pos);
                        painter.rect(
                            rect,
                            0.0,
                            Color32::from_rgba_unmultiplied(96, 165, 250, 24),
                            Stroke::new(1.0, Color32::from_rgb(96, 165, 250)),
                            egui::StrokeKind::Middle,
                        );
                    }
                }
                Gesture::LinkCreate { sources, .. } => {
                    if let Some(pos) = hover {
                        for &src in sources {
                            if let Some(from) = self.sim.pos(src) {
                                painter.line_segment(
                                    [self.canvas.canvas_to_screen(from), pos],
                                    Stroke::new(2.0, Color32::from_rgb(250, 204, 21)),
                                );
                            }
                        }
                    }
                }
                Gesture::MoveNodes { over_trash, .. } => {
                    let color = if *over_trash {
                        Color32::from_rgb(239, 68, 68)
                    } else {
                        Color32::from_gray(110)
                    };
                    painter.circle_stroke(
                        self.viewport.right_bottom(),
                        constants::TRASH_ZONE_RADIUS,
                        Stroke::new(2.0, color),
                    );
                    painter.text(
                        self.viewport.right_bottom() - egui::vec2(60.0, 60.0),
                        egui::Align2::CENTER_CENTER,
                        "🗑",
                        egui::FontId::proportional(28.0),
                        color,
                    );
                }
                _ => {}
            }
        }

        for effect in &self.effects {
            let t = ((now - effect.started_at) / EFFECT_LIFETIME).clamp(0.0, 1.0) as f32;
            let color = match effect.kind {
                FeedbackKind::Create => Color32::from_rgb(52, 211, 153),
                FeedbackKind::Delete => Color32::from_rgb(239, 68, 68),
                FeedbackKind::Link => Color32::from_rgb(96, 165, 250),
                FeedbackKind::Unlink => Color32::from_rgb(250, 204, 21),
                FeedbackKind::Merge => Color32::from_rgb(217, 119, 6),
            };
            let center = self.canvas.canvas_to_screen(effect.position);
            let radius = (10.0 + t * 40.0) * self.canvas.zoom;
            let alpha = ((1.0 - t) * 180.0) as u8;
            painter.circle_stroke(
                center,
                radius,
                Stroke::new(2.5, Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), alpha)),
            );
        }
    }

    /// Inline text editor anchored to the edited node or edge.
    fn draw_text_editor(&mut self, ctx: &egui::Context) {
        let anchor = if let Some(id) = self.interaction.editing_node {
            self.sim.pos(id).map(|p| self.canvas.canvas_to_screen(p))
        } else if let Some(id) = self.interaction.editing_edge {
            self.map.edge(id).and_then(|e| {
                let a = self.sim.pos(e.source)?;
                let b = self.sim.pos(e.target)?;
                Some(self.canvas.canvas_to_screen(a.lerp(b, 0.5)))
            })
        } else {
            return;
        };
        let Some(anchor) = anchor else {
            self.cancel_text_edit();
            return;
        };

        let editing_node = self.interaction.editing_node.is_some();
        egui::Area::new(egui::Id::new("inline-editor"))
            .fixed_pos(anchor - egui::vec2(75.0, 12.0))
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                let output = if editing_node {
                    ui.add(
                        egui::TextEdit::multiline(&mut self.interaction.editing_text)
                            .desired_width(150.0)
                            .desired_rows(2),
                    )
                } else {
                    ui.add(
                        egui::TextEdit::singleline(&mut self.interaction.editing_text)
                            .desired_width(150.0),
                    )
                };
                output.request_focus();
                let commit = output.lost_focus()
                    || (editing_node
                        && ui.input(|i| i.key_pressed(egui::Key::Enter) && i.modifiers.command));
                if commit {
                    self.end_text_edit();
                }
            });
    }

    /// Node context menu from a right-click that never became a link drag.
    fn draw_context_menu(&mut self, ctx: &egui::Context, now: f64) {
        let Some((node, pos)) = self.context_menu.target else {
            return;
        };
        if self.map.node(node).is_none() {
            self.context_menu.target = None;
            return;
        }

        let mut close = false;
        egui::Area::new(egui::Id::new("node-menu"))
            .fixed_pos(pos)
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.set_width(160.0);
                    ui.horizontal_wrapped(|ui| {
                        for color in constants::PALETTE {
                            let (rect, response) = ui
                                .allocate_exact_size(egui::vec2(16.0, 16.0), egui::Sense::click());
                            ui.painter().rect_filled(
                                rect,
                                3.0,
                                crate::ui::rendering::parse_hex(color),
                            );
                            if response.clicked() {
                                self.interaction.selected.insert(node);
                                self.set_selected_color(color);
                                close = true;
                            }
                        }
                    });
                    ui.separator();
                    if ui.button("Toggle shape").clicked() {
                        self.interaction.selected.insert(node);
                        self.toggle_selected_shape();
                        close = true;
                    }
                    let pinned = self.map.node(node).map(|n| n.pinned).unwrap_or(false);
                    if ui.button(if pinned { "Unpin" } else { "Pin" }).clicked() {
                        self.interaction.selected.insert(node);
                        self.toggle_selected_pin();
                        close = true;
                    }
                    if ui.button("Edit text").clicked() {
                        self.begin_node_edit(node);
                        close = true;
                    }
                    if ui.button("Disconnect all").clicked() {
                        self.unlink_node(node, now);
                        close = true;
                    }
                    if ui.button("Delete").clicked() {
                        self.delete_nodes(&std::collections::HashSet::from([node]), now);
                        close = true;
                    }
                });
            });
        if close {
            self.context_menu.target = None;
        }
    }
}
