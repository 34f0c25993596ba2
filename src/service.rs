//! Boundary between encoded image files and the [`Watermarker`].
//!
//! This is where input is validated: the watermark must fit the capacity of the image and the
//! image must hold at least one block. The watermarker itself performs none of these checks.

use crate::algorithm::{encode, Config, Watermarker};
use crate::error::{Result, WatermarkError};
use crate::util::BITS_PER_BYTE;
use image::GenericImageView;
use log::info;
use std::path::Path;

/// Encoded watermarked image.
#[derive(Debug, Clone)]
pub struct Embedded {
    pub bytes: Vec<u8>,
    pub format: image::ImageFormat,
}

impl Embedded {
    /// Preferred file extension of the encoded image.
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("img")
    }
}

/// Validates requests and runs them against a [`Watermarker`].
#[derive(Debug)]
pub struct WatermarkService {
    watermarker: Watermarker,
}

impl WatermarkService {
    pub fn new(config: Config) -> Result<Self> {
        Ok(WatermarkService {
            watermarker: Watermarker::new(config)?,
        })
    }

    pub fn watermarker(&self) -> &Watermarker {
        &self.watermarker
    }

    /// Embed `text` into the encoded image in `bytes`.
    ///
    /// The output keeps the format of the input, determined from the extension of `filename` and
    /// otherwise from the content. Only PNG and JPEG are accepted.
    pub fn embed(&self, bytes: &[u8], filename: Option<&str>, text: &str) -> Result<Embedded> {
        info!(
            "embed called - file: {}, watermark: {text}",
            filename.unwrap_or("<unnamed>")
        );
        if text.trim().is_empty() {
            return Err(WatermarkError::EmptyText);
        }

        let image = decode(bytes)?;
        self.check_size(&image)?;
        self.check_capacity(&image, text.len())?;

        let format = detect_format(bytes, filename)?;
        let marked = self.watermarker.embed_image(&image, text);
        let bytes = encode(marked, format)?;

        info!(
            "watermark embedded - result size: {} bytes, format: {format:?}",
            bytes.len()
        );
        Ok(Embedded { bytes, format })
    }

    /// Extract `length` bytes of text from the encoded image in `bytes`.
    pub fn extract(&self, bytes: &[u8], length: usize) -> Result<String> {
        info!("extract called - length: {length}");
        if length == 0 {
            return Err(WatermarkError::InvalidLength);
        }

        let image = decode(bytes)?;
        self.check_size(&image)?;
        self.check_capacity(&image, length)?;

        let text = self.watermarker.extract(&image, length);
        info!("watermark extracted: {text}");
        Ok(text)
    }

    fn check_size(&self, image: &image::DynamicImage) -> Result<()> {
        let block_size = self.watermarker.config().block_size;
        let (width, height) = (image.width(), image.height());
        if (width as usize) < block_size || (height as usize) < block_size {
            return Err(WatermarkError::ImageTooSmall {
                width,
                height,
                block_size,
            });
        }
        Ok(())
    }

    fn check_capacity(&self, image: &image::DynamicImage, length: usize) -> Result<()> {
        let capacity = self
            .watermarker
            .capacity_bits(image.width(), image.height());
        let required = length.checked_mul(BITS_PER_BYTE).unwrap_or(usize::MAX);
        if required > capacity {
            return Err(WatermarkError::ExceedsCapacity { required, capacity });
        }
        Ok(())
    }
}

/// Decode an image of any format the image crate reads.
pub fn decode(bytes: &[u8]) -> Result<image::DynamicImage> {
    image::load_from_memory(bytes).map_err(WatermarkError::Decode)
}

/// Determine the output format from the file name, falling back to the content.
pub fn detect_format(bytes: &[u8], filename: Option<&str>) -> Result<image::ImageFormat> {
    use image::ImageFormat;
    let from_name = filename
        .and_then(|name| Path::new(name).extension())
        .and_then(ImageFormat::from_extension);
    let format = match from_name {
        Some(format) => Some(format),
        None => image::guess_format(bytes).ok(),
    };
    match format {
        Some(format @ (ImageFormat::Png | ImageFormat::Jpeg)) => Ok(format),
        _ => Err(WatermarkError::UnsupportedFormat(
            filename.unwrap_or("<unnamed>").to_owned(),
        )),
    }
}
