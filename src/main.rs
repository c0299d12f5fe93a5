#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

fn main() -> Result<(), eframe::Error> {
    env_logger::init();
    mindmap_tool::run_app()
}
