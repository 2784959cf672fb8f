use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Could not fetch page")]
    PageFetch { url: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Other error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, SnapshotError>;
