use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("no remote match for '{0}'")]
    NoMatch(String),

    #[error("remote index unavailable")]
    IndexUnavailable,

    #[error("corrupt cache file '{}'", .0.display())]
    Corrupt(PathBuf),
}

impl From<ureq::Error> for ArtError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::StatusCode(code) => Self::Status(code),
            other => Self::Http(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ArtError>;
