use std::path::PathBuf;

/// Errors produced while discovering, reading or converting captures.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Hdf5(#[from] hdf5_metno::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Pattern(#[from] glob::PatternError),

    #[error("No capture files matching '{pattern}' found under {dir:?}")]
    NoCaptures { dir: PathBuf, pattern: String },

    #[error("Captures {first:?} and {second:?} would both be exported as '{stem}'")]
    DuplicateCapture {
        stem: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Malformed capture {path:?}: {reason}")]
    MalformedCapture { path: PathBuf, reason: String },

    #[error("Invalid class map: {0}")]
    InvalidClassMap(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
