use eframe::egui::{Color32, Ui};
use egui_plot::{Legend, Line, LineStyle, Plot, PlotPoints, VLine};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Force plot (bottom panel)
// ---------------------------------------------------------------------------

/// Render force vs. position with the cursor and marked lines. A click near
/// a marked line removes it.
pub fn force_plot(ui: &mut Ui, state: &mut AppState) {
    let dataset = match state.session.dataset() {
        Some(ds) => ds,
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Open a CSV to plot the force trace");
            });
            return;
        }
    };

    ui.vertical_centered(|ui: &mut Ui| {
        ui.strong(&dataset.name);
    });

    let force: PlotPoints = dataset
        .forces
        .samples()
        .iter()
        .map(|s| [s.position, s.force])
        .collect();
    let setpoint: Option<PlotPoints> = dataset
        .setpoint
        .as_ref()
        .map(|sp| sp.iter().map(|s| [s.position, s.force]).collect());

    let cursor = state.reading.map(|r| r.position);
    let marks: Vec<(f64, bool)> = state
        .session
        .marks()
        .iter()
        .map(|m| (m.position, state.session.is_stale(m)))
        .collect();

    let response = Plot::new("force_plot")
        .legend(Legend::default())
        .x_axis_label("Length (µm)")
        .y_axis_label("Force (N)")
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            plot_ui.line(
                Line::new(force)
                    .name("fIn")
                    .color(Color32::LIGHT_BLUE)
                    .width(1.5),
            );
            if let Some(points) = setpoint {
                plot_ui.line(
                    Line::new(points)
                        .name("fSet")
                        .color(Color32::GRAY)
                        .style(LineStyle::dashed_loose()),
                );
            }

            for (x, stale) in &marks {
                let color = if *stale {
                    Color32::DARK_GRAY
                } else {
                    Color32::GRAY
                };
                plot_ui.vline(
                    VLine::new(*x)
                        .color(color)
                        .style(LineStyle::dotted_dense()),
                );
            }
            if let Some(x) = cursor {
                plot_ui.vline(VLine::new(x).color(Color32::GRAY).style(LineStyle::dashed_dense()));
            }

            plot_ui.pointer_coordinate()
        });

    if response.response.clicked() {
        if let Some(p) = response.inner {
            state.remove_mark_near(p.x);
        }
    }
}
