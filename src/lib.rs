//! An interactive mind-map editor built on a live force-directed layout.
//!
//! Bubbles repel each other while their links pull like springs, so the map
//! continuously relaxes into a readable arrangement. Direct manipulation is
//! layered on top: drag to move or throw, right-drag to link, hold an edge to
//! fuse its endpoints, and a magnet node that gathers loose ideas.
//!
//! The crate is split along the same seams the runtime uses:
//! - [`types`] holds the committed graph and its structural operations
//! - [`physics`] owns the per-frame simulation over that graph
//! - [`interaction`] is the press-drag-release gesture machine
//! - [`mermaid`] imports and exports mermaid flowcharts
//! - [`ui`] binds everything into an [`eframe`] application

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod geometry;
pub mod interaction;
pub mod mermaid;
pub mod physics;
pub mod types;
pub mod ui;

pub use types::{Edge, MindMap, Node, Shape};
pub use ui::MindMapApp;

/// Runs the editor as a native window.
pub fn run_app() -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([640.0, 480.0])
            .with_title("Mind Map"),
        ..Default::default()
    };
    eframe::run_native(
        "mindmap_tool",
        options,
        Box::new(|cc| Ok(Box::new(MindMapApp::new(cc)))),
    )
}
