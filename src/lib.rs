//! Scratch-test analysis core.
//!
//! Synchronises a panorama of a scratch track with the force trace logged
//! while it was scratched: pick the origin on the image, read the force under
//! any pixel, mark fracture points and export them.
//!
//! ```no_run
//! use std::path::Path;
//! use scratch_view::{Session, data::loader::LoadOptions, export::MarkerStyle};
//!
//! # fn main() -> scratch_view::Result<()> {
//! let mut session = Session::new();
//! session.open(Path::new("5-60.jpg"), &LoadOptions::default())?;
//! session.open(Path::new("M1402_5-60_1.csv"), &LoadOptions::default())?;
//! session.define_origin(412.0, 180.0, 0.44);
//! session.mark(1630.0, 182.0)?;
//! session.save_image(Path::new("5-60_marks.jpg"), &MarkerStyle::default())?;
//! session.save_marks(Path::new("M1402_5-60_1_marks.csv"))?;
//! # Ok(())
//! # }
//! ```

pub mod calibration;
pub mod color;
pub mod data;
pub mod error;
pub mod export;
pub mod mapper;
pub mod marks;
pub mod panorama;
pub mod session;
pub mod settings;

pub use error::{Error, Result};
pub use session::Session;
