use std::path::PathBuf;

use thiserror::Error;

use crate::marks::MarkId;

// ---------------------------------------------------------------------------
// Core error type
// ---------------------------------------------------------------------------

/// Everything a [`Session`](crate::session::Session) command can fail with.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad or insufficient force samples. Fatal to the load that produced it.
    #[error("malformed data: {0}")]
    MalformedData(String),

    /// Mapping or marking was attempted before an origin was defined.
    #[error("origin not set: define the origin before reading forces or marking")]
    CalibrationNotSet,

    #[error("mark {0} not found")]
    MarkNotFound(MarkId),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("unsupported file extension: .{0}")]
    UnsupportedFile(String),

    /// A tile folder that cannot be joined into one panorama.
    #[error("cannot stitch {}: {reason}", .dir.display())]
    Stitch { dir: PathBuf, reason: String },

    #[error("no image loaded")]
    NoImage,

    #[error("no force data loaded")]
    NoData,
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn stitch(dir: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::Stitch {
            dir: dir.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
