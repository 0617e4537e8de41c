use thiserror::Error;

/// Library error type for bloom operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The source image has no pixels, so no grid can be laid over it.
    #[error("source image is empty ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    /// A rebuild was requested before any source image was loaded.
    #[error("no source image loaded")]
    NoImage,

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),

    /// The photo could not be decoded.
    #[error(transparent)]
    Decode(#[from] image::ImageError),

    /// Offscreen rendering failed.
    #[error("render error: {0}")]
    Render(anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
