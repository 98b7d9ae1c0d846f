use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::color::parse_hex_or;
use crate::data::loader::LoadOptions;
use crate::export::{MarkerStyle, write_atomic};
use crate::panorama::StitchOptions;

/// Environment variable overriding the settings file location.
pub const SETTINGS_ENV: &str = "SCRATCH_VIEW_SETTINGS";
const DEFAULT_FILE: &str = "scratch-view.json";

const DEFAULT_SCALE_NAME: &str = "olympus";
const DEFAULT_SCALE: f64 = 0.44;

// ---------------------------------------------------------------------------
// Marker appearance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerSettings {
    /// `#RRGGBB`
    pub mark_color: String,
    /// `#RRGGBB`
    pub origin_color: String,
    pub mark_radius: u32,
    pub origin_radius: u32,
    pub line_width: u32,
}

impl Default for MarkerSettings {
    fn default() -> Self {
        Self {
            mark_color: "#FFD141".to_string(),
            origin_color: "#FFD141".to_string(),
            mark_radius: 8,
            origin_radius: 25,
            line_width: 2,
        }
    }
}

impl MarkerSettings {
    pub fn style(&self) -> MarkerStyle {
        let defaults = MarkerStyle::default();
        MarkerStyle {
            mark_color: parse_hex_or(&self.mark_color, defaults.mark_color),
            origin_color: parse_hex_or(&self.origin_color, defaults.origin_color),
            mark_radius: self.mark_radius,
            origin_radius: self.origin_radius,
            line_width: self.line_width,
            ..defaults
        }
    }
}

// ---------------------------------------------------------------------------
// Settings – persisted between runs
// ---------------------------------------------------------------------------

/// User preferences persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Named microscope scales, in µm per pixel.
    pub scales: BTreeMap<String, f64>,
    /// Key into `scales`.
    pub current_scale: String,
    /// Directory of the last opened file, for the file dialog.
    pub last_dir: Option<PathBuf>,
    pub loader: LoadOptions,
    pub markers: MarkerSettings,
    /// Tile overlap and order for "Stitch tile folder".
    pub stitch: StitchOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scales: BTreeMap::from([(DEFAULT_SCALE_NAME.to_string(), DEFAULT_SCALE)]),
            current_scale: DEFAULT_SCALE_NAME.to_string(),
            last_dir: None,
            loader: LoadOptions::default(),
            markers: MarkerSettings::default(),
            stitch: StitchOptions::default(),
        }
    }
}

impl Settings {
    /// `$SCRATCH_VIEW_SETTINGS`, else `scratch-view.json` in the working directory.
    pub fn default_path() -> PathBuf {
        std::env::var_os(SETTINGS_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FILE))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        let mut settings: Settings = serde_json::from_str(&text).context("parsing settings")?;
        settings.repair();
        Ok(settings)
    }

    /// Load `path`, falling back to defaults when it is missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("no settings at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("Ignoring settings: {e:#}");
                Self::default()
            }
        }
    }

    /// Write the settings through a temp file, so an interrupted save keeps
    /// the previous file intact.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self).context("serializing settings")?;
        write_atomic(path, |file| {
            file.write_all(text.as_bytes())
                .map_err(|e| crate::Error::io(path, e))
        })
        .with_context(|| format!("writing settings to {}", path.display()))?;
        log::debug!("settings saved to {}", path.display());
        Ok(())
    }

    /// Current scale in µm per pixel.
    pub fn scale(&self) -> f64 {
        self.scales
            .get(&self.current_scale)
            .copied()
            .unwrap_or(DEFAULT_SCALE)
    }

    pub fn select_scale(&mut self, name: &str) -> Result<()> {
        if !self.scales.contains_key(name) {
            bail!("unknown scale '{name}'");
        }
        self.current_scale = name.to_string();
        Ok(())
    }

    /// Add (or overwrite) a named scale and select it.
    pub fn add_scale(&mut self, name: &str, um_per_px: f64) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            bail!("scale name is empty");
        }
        if !(um_per_px.is_finite() && um_per_px > 0.0) {
            bail!("scale must be a positive number, got {um_per_px}");
        }
        self.scales.insert(name.to_string(), um_per_px);
        self.current_scale = name.to_string();
        Ok(())
    }

    /// Remove a named scale. The last one cannot be removed; removing the
    /// current one selects the first remaining.
    pub fn remove_scale(&mut self, name: &str) -> Result<()> {
        if !self.scales.contains_key(name) {
            bail!("unknown scale '{name}'");
        }
        if self.scales.len() == 1 {
            bail!("cannot remove the only scale");
        }
        self.scales.remove(name);
        if self.current_scale == name {
            self.repair();
        }
        Ok(())
    }

    /// Keep at least one scale and point `current_scale` at an existing one.
    fn repair(&mut self) {
        self.scales.retain(|_, v| v.is_finite() && *v > 0.0);
        if self.scales.is_empty() {
            log::warn!("no valid scales in settings, restoring '{DEFAULT_SCALE_NAME}'");
            self.scales
                .insert(DEFAULT_SCALE_NAME.to_string(), DEFAULT_SCALE);
        }
        if !self.scales.contains_key(&self.current_scale) {
            if let Some(first) = self.scales.keys().next() {
                self.current_scale = first.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_olympus_scope() {
        let s = Settings::default();
        assert_eq!(s.current_scale, "olympus");
        assert_eq!(s.scale(), 0.44);
        assert_eq!(s.loader.columns.force, "fIn");
    }

    #[test]
    fn scale_presets() {
        let mut s = Settings::default();
        s.add_scale("nikon", 0.8).unwrap();
        assert_eq!(s.scale(), 0.8);

        s.select_scale("olympus").unwrap();
        assert_eq!(s.scale(), 0.44);
        assert!(s.select_scale("zeiss").is_err());
        assert!(s.add_scale("bad", -1.0).is_err());
        assert!(s.add_scale("  ", 1.0).is_err());

        s.remove_scale("olympus").unwrap();
        assert_eq!(s.current_scale, "nikon");
        assert!(s.remove_scale("nikon").is_err());
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut s = Settings::default();
        s.add_scale("nikon", 0.8).unwrap();
        s.last_dir = Some(dir.path().to_path_buf());
        s.save(&path).unwrap();

        assert_eq!(Settings::load(&path).unwrap(), s);
    }

    #[test]
    fn save_replaces_file_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ \"scales\": {\"old\": 1.0}, \"current_scale\": \"old\" }").unwrap();

        let mut s = Settings::default();
        s.add_scale("nikon", 0.8).unwrap();
        s.save(&path).unwrap();

        assert_eq!(Settings::load(&path).unwrap(), s);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn failed_save_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone").join("settings.json");
        assert!(Settings::default().save(&missing).is_err());
        assert!(!missing.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "current_scale": "gone", "scales": {} }"#).unwrap();

        let s = Settings::load(&path).unwrap();
        assert_eq!(s.current_scale, "olympus");
        assert_eq!(s.markers, MarkerSettings::default());
    }

    #[test]
    fn unreadable_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(Settings::load_or_default(&path), Settings::default());
        assert_eq!(
            Settings::load_or_default(&dir.path().join("missing.json")),
            Settings::default()
        );
    }

    #[test]
    fn marker_style_from_hex() {
        let m = MarkerSettings {
            mark_color: "#00FF00".into(),
            ..MarkerSettings::default()
        };
        assert_eq!(m.style().mark_color, image::Rgba([0, 255, 0, 255]));
    }
}
