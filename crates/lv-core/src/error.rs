use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Generation canceled")]
    Canceled,

    #[error("Unsupported base model: {0}")]
    UnsupportedArchitecture(String),

    #[error("Invalid latent sample: {0}")]
    InvalidSample(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// True for the cooperative cancellation abort, which callers stop on
    /// quietly instead of reporting as a failure.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled)
    }
}
