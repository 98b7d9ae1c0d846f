use std::path::PathBuf;

use eframe::egui;

use scratch_view::settings::Settings;

use crate::state::{AppState, Tool};
use crate::ui::viewer::ViewerState;
use crate::ui::{panels, plot, viewer};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct ScratchViewApp {
    pub state: AppState,
    pub viewer: ViewerState,
}

impl ScratchViewApp {
    pub fn new(initial_files: Vec<PathBuf>) -> Self {
        let settings_path = Settings::default_path();
        let settings = Settings::load_or_default(&settings_path);
        let mut state = AppState::new(settings, settings_path);
        if !initial_files.is_empty() {
            state.open_paths(&initial_files);
        }
        Self {
            state,
            viewer: ViewerState::default(),
        }
    }

    /// Files dropped onto the window.
    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });
        if !dropped.is_empty() {
            self.state.open_paths(&dropped);
        }
    }
}

impl eframe::App for ScratchViewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_dropped_files(ctx);
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.state.set_tool(Tool::Inspect);
        }

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state, &mut self.viewer);
        });

        // ---- Left side panel: tools and marks ----
        egui::SidePanel::left("tool_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Bottom panel: force plot ----
        egui::TopBottomPanel::bottom("plot_panel")
            .default_height(280.0)
            .resizable(true)
            .show(ctx, |ui| {
                plot::force_plot(ui, &mut self.state);
            });

        // ---- Central panel: panorama ----
        egui::CentralPanel::default().show(ctx, |ui| {
            viewer::image_view(ui, &mut self.state, &mut self.viewer);
        });
    }
}
