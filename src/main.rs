mod app;
mod state;
mod ui;

use app::ScratchViewApp;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    // Files given on the command line open like dropped files.
    let initial_files: Vec<std::path::PathBuf> =
        std::env::args_os().skip(1).map(Into::into).collect();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Scratch View",
        options,
        Box::new(|_cc| Ok(Box::new(ScratchViewApp::new(initial_files)))),
    )
}
