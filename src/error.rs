use thiserror::Error;

/// Errors from configuring, embedding or extracting a watermark.
#[derive(Error, Debug)]
pub enum WatermarkError {
    #[error("block size must be positive and fit in 32 bits")]
    InvalidBlockSize,

    #[error("bit depth must be between 1 and 8, got {0}")]
    InvalidBitDepth(u8),

    #[error("target position {position} is outside a block of size {block_size}")]
    InvalidTargetPosition { position: usize, block_size: usize },

    #[error("strength must be a finite positive number, got {0}")]
    InvalidStrength(f64),

    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("could not decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("could not encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("watermark text is empty")]
    EmptyText,

    #[error("requested watermark length must be positive")]
    InvalidLength,

    #[error("image of {width}x{height} is smaller than a single {block_size}x{block_size} block")]
    ImageTooSmall {
        width: u32,
        height: u32,
        block_size: usize,
    },

    #[error("watermark needs {required} bits but the image only holds {capacity}")]
    ExceedsCapacity { required: usize, capacity: usize },
}

pub type Result<T> = std::result::Result<T, WatermarkError>;
