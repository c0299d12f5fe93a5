//! The egui user interface: application shell, canvas widget, rendering and
//! undo plumbing.

pub mod canvas;
pub mod rendering;
pub mod state;
pub mod undo;

#[cfg(test)]
mod tests;

pub use state::MindMapApp;

use crate::mermaid;
use eframe::egui;

impl eframe::App for MindMapApp {
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        self.sim.reconcile(&mut self.map);
        eframe::set_value(storage, Self::STORAGE_KEY, self);
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.dark_mode {
            ctx.set_visuals(egui::Visuals::dark());
        } else {
            ctx.set_visuals(egui::Visuals::light());
        }

        self.handle_shortcuts(ctx);
        self.toolbar(ctx);
        self.physics_panel(ctx);
        self.io_panel(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                self.draw_canvas(ui);
            });
    }
}

impl MindMapApp {
    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        // Keyboard is off limits while an inline editor owns it.
        if self.interaction.editing_node.is_some() || self.interaction.editing_edge.is_some() {
            return;
        }
        let now = ctx.input(|i| i.time);
        let undo = egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, egui::Key::Z);
        let redo = egui::KeyboardShortcut::new(
            egui::Modifiers::COMMAND | egui::Modifiers::SHIFT,
            egui::Key::Z,
        );
        if ctx.input_mut(|i| i.consume_shortcut(&redo)) {
            self.perform_redo();
        } else if ctx.input_mut(|i| i.consume_shortcut(&undo)) {
            self.perform_undo();
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace)) {
            let selected = self.interaction.selected.clone();
            self.delete_nodes(&selected, now);
        }
    }

    fn toolbar(&mut self, ctx: &egui::Context) {
        let now = ctx.input(|i| i.time);
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.add_enabled_ui(self.undo_history.can_undo(), |ui| {
                    if ui.button("⟲ Undo").clicked() {
                        self.perform_undo();
                    }
                });
                ui.add_enabled_ui(self.undo_history.can_redo(), |ui| {
                    if ui.button("⟳ Redo").clicked() {
                        self.perform_redo();
                    }
                });
                ui.separator();

                let shape_label = match self.default_shape {
                    crate::types::Shape::Circle => "◯ Circle",
                    crate::types::Shape::Rectangle => "▭ Rectangle",
                };
                if ui.button(shape_label).clicked() {
                    self.default_shape = self.default_shape.toggled();
                }
                ui.add_enabled_ui(self.map.magnet().is_none(), |ui| {
                    if ui.button("🧲 Magnet").clicked() {
                        self.spawn_magnet(now);
                    }
                });
                if ui
                    .button(if self.floating { "❄ Freeze" } else { "▶ Float" })
                    .clicked()
                {
                    self.floating = !self.floating;
                }
                if ui.button("⛶ Fit").clicked() {
                    self.fit_view();
                }
                ui.separator();

                ui.toggle_value(&mut self.show_physics_panel, "Physics");
                ui.toggle_value(&mut self.show_io_panel, "Import / Export");
                ui.toggle_value(&mut self.dark_mode, "🌙");

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(format!(
                        "{} nodes · {} edges",
                        self.map.nodes.len(),
                        self.map.edges.len()
                    ));
                });
            });
        });
    }

    fn physics_panel(&mut self, ctx: &egui::Context) {
        let mut open = self.show_physics_panel;
        egui::Window::new("Physics")
            .open(&mut open)
            .resizable(false)
            .show(ctx, |ui| {
                let p = &mut self.physics;
                ui.add(egui::Slider::new(&mut p.repulsion, 0.0..=100.0).text("Repulsion"));
                ui.add(egui::Slider::new(&mut p.length, 0.0..=100.0).text("Link length"));
                ui.add(egui::Slider::new(&mut p.stiffness, 0.0..=100.0).text("Stiffness"));
                ui.add(egui::Slider::new(&mut p.gravity, 0.0..=100.0).text("Gravity"));
                ui.add(egui::Slider::new(&mut p.friction, 0.0..=100.0).text("Friction"));
                if ui.button("Reset").clicked() {
                    *p = crate::physics::PhysicsParams::default();
                }
            });
        self.show_physics_panel = open;
    }

    fn io_panel(&mut self, ctx: &egui::Context) {
        let mut open = self.show_io_panel;
        egui::Window::new("Import / Export")
            .open(&mut open)
            .default_width(360.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if ui.button("Export mermaid").clicked() {
                        self.sim.reconcile(&mut self.map);
                        self.io_text = mermaid::export(&self.map);
                        self.io_error = None;
                    }
                    if ui.button("Export JSON").clicked() {
                        self.sim.reconcile(&mut self.map);
                        match self.map.to_json() {
                            Ok(json) => {
                                self.io_text = json;
                                self.io_error = None;
                            }
                            Err(err) => self.io_error = Some(err.to_string()),
                        }
                    }
                });
                ui.horizontal(|ui| {
                    if ui.button("Import mermaid").clicked() {
                        match mermaid::import(&self.io_text, &mut self.id_gen) {
                            Ok(map) => {
                                self.replace_map(map);
                                self.io_error = None;
                            }
                            Err(err) => {
                                log::warn!("mermaid import failed: {err}");
                                self.io_error = Some(err.to_string());
                            }
                        }
                    }
                    if ui.button("Import JSON").clicked() {
                        match crate::types::MindMap::from_json(&self.io_text) {
                            Ok(map) => {
                                self.replace_map(map);
                                self.io_error = None;
                            }
                            Err(err) => {
                                log::warn!("json import failed: {err}");
                                self.io_error = Some(err.to_string());
                            }
                        }
                    }
                });
                if let Some(err) = &self.io_error {
                    ui.colored_label(egui::Color32::from_rgb(239, 68, 68), err);
                }
                egui::ScrollArea::vertical().max_height(260.0).show(ui, |ui| {
                    ui.add(
                        egui::TextEdit::multiline(&mut self.io_text)
                            .code_editor()
                            .desired_width(f32::INFINITY)
                            .desired_rows(12),
                    );
                });
            });
        self.show_io_panel = open;
    }
}
