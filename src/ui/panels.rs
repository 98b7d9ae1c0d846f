use std::path::PathBuf;

use eframe::egui::{self, Color32, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use scratch_view::data::loader::DATA_EXTENSIONS;
use scratch_view::export::IMAGE_EXTENSIONS;
use scratch_view::marks::MarkId;

use crate::state::{AppState, Tool};
use crate::ui::viewer::ViewerState;

// ---------------------------------------------------------------------------
// Left side panel – tools, scales, marks
// ---------------------------------------------------------------------------

/// Render the left tool panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Tools");
    ui.separator();

    ui.horizontal(|ui: &mut Ui| {
        if ui
            .selectable_label(state.tool == Tool::SetOrigin, "Set origin")
            .on_hover_text("Click on the image to define the origin.")
            .clicked()
        {
            let next = if state.tool == Tool::SetOrigin {
                Tool::Inspect
            } else {
                Tool::SetOrigin
            };
            state.set_tool(next);
        }
        let can_mark = state.session.origin().is_some();
        let mark_button = ui.add_enabled(
            can_mark,
            egui::SelectableLabel::new(state.tool == Tool::Mark, "Mark line"),
        );
        if mark_button
            .on_hover_text("Click on the image to mark a line on the plot.")
            .clicked()
        {
            let next = if state.tool == Tool::Mark {
                Tool::Inspect
            } else {
                Tool::Mark
            };
            state.set_tool(next);
        }
    });

    ui.add_space(8.0);
    scale_section(ui, state);
    ui.add_space(8.0);
    marks_section(ui, state);
}

fn scale_section(ui: &mut Ui, state: &mut AppState) {
    egui::CollapsingHeader::new(RichText::new("Microscope scale").strong())
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            let names: Vec<(String, f64)> = state
                .settings
                .scales
                .iter()
                .map(|(n, v)| (n.clone(), *v))
                .collect();
            let only_one = names.len() == 1;

            for (name, value) in &names {
                ui.horizontal(|ui: &mut Ui| {
                    let selected = state.settings.current_scale == *name;
                    if ui
                        .radio(selected, format!("{name}  ({value} µm/px)"))
                        .clicked()
                    {
                        state.select_scale(name);
                    }
                    if ui
                        .add_enabled(!only_one, egui::Button::new("🗑").small())
                        .on_hover_text("Remove this scale")
                        .clicked()
                    {
                        state.remove_scale(name);
                    }
                });
            }

            ui.separator();
            ui.label("New scale");
            egui::Grid::new("new_scale").num_columns(2).show(ui, |ui: &mut Ui| {
                ui.label("Name");
                ui.text_edit_singleline(&mut state.new_scale_name);
                ui.end_row();
                ui.label("µm/pixel");
                ui.text_edit_singleline(&mut state.new_scale_value);
                ui.end_row();
            });
            let ready = !state.new_scale_name.trim().is_empty()
                && !state.new_scale_value.trim().is_empty();
            if ui.add_enabled(ready, egui::Button::new("Add")).clicked() {
                state.add_scale_from_form();
            }
        });
}

fn marks_section(ui: &mut Ui, state: &mut AppState) {
    ui.strong(format!("Marks ({})", state.session.marks().len()));
    ui.separator();

    let n_stale = state.session.stale_marks().len();
    if n_stale > 0 {
        ui.label(
            RichText::new(format!(
                "{n_stale} marks were taken with a previous origin or data file"
            ))
            .color(Color32::YELLOW),
        );
        if ui.small_button("Remove stale marks").clicked() {
            state.session.remove_stale_marks();
        }
    }

    let mut to_remove: Option<MarkId> = None;
    let table_height = ui.available_height() - 32.0;
    TableBuilder::new(ui)
        .striped(true)
        .max_scroll_height(table_height)
        .column(Column::auto().at_least(24.0))
        .column(Column::auto().at_least(70.0))
        .column(Column::auto().at_least(60.0))
        .column(Column::remainder())
        .header(20.0, |mut header| {
            header.col(|ui| {
                ui.strong("#");
            });
            header.col(|ui| {
                ui.strong("x (µm)");
            });
            header.col(|ui| {
                ui.strong("F (N)");
            });
            header.col(|_| {});
        })
        .body(|mut body| {
            for mark in state.session.marks() {
                let stale = state.session.is_stale(mark);
                let text = |s: String| {
                    if stale {
                        RichText::new(s).color(Color32::GRAY)
                    } else {
                        RichText::new(s)
                    }
                };
                body.row(18.0, |mut row| {
                    row.col(|ui| {
                        ui.label(text(mark.label.clone()));
                    });
                    row.col(|ui| {
                        ui.label(text(format!("{:.1}", mark.position)));
                    });
                    row.col(|ui| {
                        ui.label(text(format!("{:.3}", mark.force)));
                    });
                    row.col(|ui| {
                        if ui.small_button("🗑").clicked() {
                            to_remove = Some(mark.id);
                        }
                    });
                });
            }
        });

    if let Some(id) = to_remove {
        state.remove_mark(id);
    }

    if !state.session.marks().is_empty() && ui.button("Clear all marks").clicked() {
        state.session.clear_marks();
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState, viewer: &mut ViewerState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Stitch tile folder…").clicked() {
                stitch_folder_dialog(state);
                ui.close_menu();
            }
            let mut stitch_changed = ui
                .checkbox(&mut state.settings.stitch.right_to_left, "Tiles right to left")
                .changed();
            ui.horizontal(|ui: &mut Ui| {
                ui.label("Tile overlap");
                stitch_changed |= ui
                    .add(
                        egui::DragValue::new(&mut state.settings.stitch.overlap_px)
                            .range(0..=4096)
                            .suffix(" px"),
                    )
                    .changed();
            });
            if stitch_changed {
                state.persist_settings();
            }
            ui.separator();
            if ui
                .add_enabled(state.session.image().is_some(), egui::Button::new("Save image…"))
                .clicked()
            {
                save_image_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(!state.session.marks().is_empty(), egui::Button::new("Save marks…"))
                .clicked()
            {
                save_marks_dialog(state);
                ui.close_menu();
            }
        });

        ui.menu_button("View", |ui: &mut Ui| {
            if ui.button("Fit image").clicked() {
                viewer.fit = true;
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(r) = &state.reading {
            ui.monospace(format!(
                "x={:.0} µm, y={:.0} µm   F={:.2} N",
                r.position, r.offset, r.force
            ));
            ui.separator();
        }

        if let Some(msg) = &state.status_message {
            let color = if state.status_is_error {
                Color32::RED
            } else {
                ui.visuals().text_color()
            };
            ui.label(RichText::new(msg).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

fn start_dir(state: &AppState) -> PathBuf {
    state
        .settings
        .last_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn open_file_dialog(state: &mut AppState) {
    let supported: Vec<&str> = IMAGE_EXTENSIONS
        .iter()
        .chain(DATA_EXTENSIONS)
        .copied()
        .collect();
    let files = rfd::FileDialog::new()
        .set_title("Open image and CSV")
        .set_directory(start_dir(state))
        .add_filter("Supported files", supported.as_slice())
        .add_filter("Images", IMAGE_EXTENSIONS)
        .add_filter("Force data", DATA_EXTENSIONS)
        .pick_files();

    if let Some(paths) = files {
        state.open_paths(&paths);
    }
}

fn stitch_folder_dialog(state: &mut AppState) {
    let folder = rfd::FileDialog::new()
        .set_title("Open tile folder")
        .set_directory(start_dir(state))
        .pick_folder();
    if let Some(dir) = folder {
        state.open_folder(&dir);
    }
}

fn save_image_dialog(state: &mut AppState) {
    let (suggested, _) = state.session.default_export_paths();
    let mut dialog = rfd::FileDialog::new()
        .set_title("Save annotated image")
        .add_filter("Images", IMAGE_EXTENSIONS);
    if let Some(p) = &suggested {
        if let Some(dir) = p.parent() {
            dialog = dialog.set_directory(dir);
        }
        if let Some(name) = p.file_name() {
            dialog = dialog.set_file_name(name.to_string_lossy());
        }
    }
    if let Some(path) = dialog.save_file() {
        state.save_image_to(&path);
    }
}

fn save_marks_dialog(state: &mut AppState) {
    let (_, suggested) = state.session.default_export_paths();
    let mut dialog = rfd::FileDialog::new()
        .set_title("Save marks")
        .add_filter("CSV", &["csv"]);
    if let Some(p) = &suggested {
        if let Some(dir) = p.parent() {
            dialog = dialog.set_directory(dir);
        }
        if let Some(name) = p.file_name() {
            dialog = dialog.set_file_name(name.to_string_lossy());
        }
    }
    if let Some(path) = dialog.save_file() {
        state.save_marks_to(&path);
    }
}
