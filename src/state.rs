use std::path::{Path, PathBuf};

use scratch_view::Session;
use scratch_view::mapper::Reading;
use scratch_view::marks::MarkId;
use scratch_view::settings::Settings;

/// Marks on the force plot within this distance (µm) of a click are removed.
pub const PLOT_PICK_TOLERANCE: f64 = 20.0;

// ---------------------------------------------------------------------------
// Pointer tools
// ---------------------------------------------------------------------------

/// What a click on the image does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// Clicks do nothing; drag scrolls.
    Inspect,
    /// The next click defines the origin.
    SetOrigin,
    /// Every click marks a fracture point.
    Mark,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// The open analysis.
    pub session: Session,

    /// Persisted preferences.
    pub settings: Settings,
    pub settings_path: PathBuf,

    /// Active pointer tool.
    pub tool: Tool,

    /// Readout under the pointer, when it is over the image.
    pub reading: Option<Reading>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
    pub status_is_error: bool,

    /// Bumped whenever a new image is opened so the viewer re-uploads it.
    pub image_revision: u64,

    /// Scratch fields of the "new scale" form.
    pub new_scale_name: String,
    pub new_scale_value: String,
}

impl AppState {
    pub fn new(settings: Settings, settings_path: PathBuf) -> Self {
        Self {
            session: Session::new(),
            settings,
            settings_path,
            tool: Tool::Inspect,
            reading: None,
            status_message: None,
            status_is_error: false,
            image_revision: 0,
            new_scale_name: String::new(),
            new_scale_value: String::new(),
        }
    }

    pub fn info(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_is_error = false;
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        log::error!("{msg}");
        self.status_message = Some(msg);
        self.status_is_error = true;
    }

    // -- files --

    /// Open any mix of images and data files (file dialog or drag-and-drop).
    pub fn open_paths(&mut self, paths: &[PathBuf]) {
        for path in paths {
            match self.session.open(path, &self.settings.loader) {
                Ok(kind) => {
                    if kind == scratch_view::session::Opened::Image {
                        self.image_revision += 1;
                    }
                    self.info(format!("Opened {}", display_name(path)));
                    self.settings.last_dir = path.parent().map(Path::to_path_buf);
                }
                Err(e) => self.error(format!("Error opening {}: {e}", display_name(path))),
            }
        }
        self.persist_settings();
    }

    /// Stitch a tile folder and open the panorama with its data file.
    pub fn open_folder(&mut self, dir: &Path) {
        let stitch = self.settings.stitch;
        match self.session.open_folder(dir, &stitch, &self.settings.loader) {
            Ok(saved) => {
                self.image_revision += 1;
                self.info(format!("Panorama saved to {}", saved.display()));
                self.settings.last_dir = dir.parent().map(Path::to_path_buf);
                self.persist_settings();
            }
            Err(e) => self.error(format!("Stitching {} failed: {e}", display_name(dir))),
        }
    }

    pub fn save_image_to(&mut self, path: &Path) {
        let style = self.settings.markers.style();
        match self.session.save_image(path, &style) {
            Ok(()) => self.info(format!("Image saved to {}", path.display())),
            Err(e) => self.error(format!("Saving image failed: {e}")),
        }
    }

    pub fn save_marks_to(&mut self, path: &Path) {
        match self.session.save_marks(path) {
            Ok(()) => self.info(format!(
                "{} marks saved to {}",
                self.session.marks().len(),
                path.display()
            )),
            Err(e) => self.error(format!("Saving marks failed: {e}")),
        }
    }

    // -- tools --

    pub fn set_tool(&mut self, tool: Tool) {
        if tool == Tool::Mark && self.session.origin().is_none() {
            self.error("Define the origin first");
            return;
        }
        self.tool = tool;
    }

    /// Pointer moved over image pixel `(x, y)`; `None` when it left the image.
    pub fn hover(&mut self, pixel: Option<(f64, f64)>) {
        self.reading = pixel.and_then(|(x, y)| self.session.query(x, y).ok());
    }

    /// Image clicked at pixel `(x, y)` with the active tool.
    pub fn click(&mut self, x: f64, y: f64) {
        match self.tool {
            Tool::Inspect => {}
            Tool::SetOrigin => {
                let scale = self.settings.scale();
                self.session.define_origin(x, y, scale);
                self.info(format!(
                    "Origin set at ({x:.0}, {y:.0}) px, scale {} = {scale} µm/px",
                    self.settings.current_scale
                ));
                self.tool = Tool::Mark;
            }
            Tool::Mark => match self.session.mark(x, y) {
                Ok(mark) => {
                    let msg = format!(
                        "Mark {} at {:.0} µm, F={:.2} N",
                        mark.label, mark.position, mark.force
                    );
                    self.info(msg);
                }
                Err(e) => self.error(e.to_string()),
            },
        }
    }

    // -- marks --

    pub fn remove_mark(&mut self, id: MarkId) {
        if let Err(e) = self.session.remove_mark(id) {
            // A stale id is not worth more than a notice.
            self.info(e.to_string());
        }
    }

    /// Force plot clicked at track position `x`.
    pub fn remove_mark_near(&mut self, position: f64) {
        if let Some(id) = self.session.mark_near(position, PLOT_PICK_TOLERANCE) {
            self.remove_mark(id);
        }
    }

    // -- scales --

    pub fn select_scale(&mut self, name: &str) {
        match self.settings.select_scale(name) {
            Ok(()) => self.persist_settings(),
            Err(e) => self.error(format!("{e:#}")),
        }
    }

    pub fn add_scale_from_form(&mut self) {
        let value = match self.new_scale_value.trim().parse::<f64>() {
            Ok(v) => v,
            Err(_) => {
                self.error(format!("'{}' is not a number", self.new_scale_value));
                return;
            }
        };
        let name = self.new_scale_name.clone();
        match self.settings.add_scale(&name, value) {
            Ok(()) => {
                self.new_scale_name.clear();
                self.new_scale_value.clear();
                self.persist_settings();
            }
            Err(e) => self.error(format!("{e:#}")),
        }
    }

    pub fn remove_scale(&mut self, name: &str) {
        match self.settings.remove_scale(name) {
            Ok(()) => self.persist_settings(),
            Err(e) => self.error(format!("{e:#}")),
        }
    }

    pub fn persist_settings(&mut self) {
        if let Err(e) = self.settings.save(&self.settings_path) {
            log::warn!("Could not save settings: {e:#}");
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
