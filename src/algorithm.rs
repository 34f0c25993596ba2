//! Contains the actual logic that ties everything together.
//!
//! The main steps in embedding are:
//! - Convert the text into bits, most significant bit first within each UTF-8 byte.
//! - Truncate the image to a whole number of blocks and allocate the destination image.
//! - For every block, in a fixed order, convert it to YCbCr and transform its luma.
//! - Embed one bit into the target coefficient, blocks beyond the payload get a zero bit.
//! - Perform the inverse transform and write the block back as RGB.
//!
//! Extraction visits the blocks in the same order, performs only the forward transform and reads
//! the bit from the target coefficient, until enough bits for the requested length are collected.
//!
//! Neither direction checks the payload against the capacity, see [`crate::service`] for that.
//! Embedding a payload longer than the capacity silently drops the tail, extracting more than the
//! capacity silently returns a shorter string.

use crate::block::{Block, BlockGrid, Raster};
use crate::engine::TransformEngine;
use crate::error::{Result, WatermarkError};
use crate::strategy::{Additive, Strategy};
use crate::util::{bits_to_bytes, text_to_bits, BITS_PER_BYTE};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Parameters shared by embedding and extraction, both sides must use the same values.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Width and height of a block in pixels.
    pub block_size: usize,
    /// The bit is carried by the coefficient at (target_position, target_position).
    pub target_position: usize,
    /// Magnitude added to or subtracted from the target coefficient.
    pub strength: f64,
}

impl Default for Config {
    /// 8x8 blocks, the mid frequency coefficient (4, 4) and a strength of 20.
    fn default() -> Self {
        Config {
            block_size: 8,
            target_position: 4,
            strength: 20.0,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 || u32::try_from(self.block_size).is_err() {
            return Err(WatermarkError::InvalidBlockSize);
        }
        if self.target_position >= self.block_size {
            return Err(WatermarkError::InvalidTargetPosition {
                position: self.target_position,
                block_size: self.block_size,
            });
        }
        validate_strength(self.strength)
    }
}

fn validate_strength(strength: f64) -> Result<()> {
    if !(strength.is_finite() && strength > 0.0) {
        return Err(WatermarkError::InvalidStrength(strength));
    }
    Ok(())
}

/// Map a format token like `"png"` or `"jpg"` to the image format to encode with.
pub fn format_from_token(token: &str) -> Result<image::ImageFormat> {
    image::ImageFormat::from_extension(token.trim().to_ascii_lowercase())
        .ok_or_else(|| WatermarkError::UnsupportedFormat(token.to_owned()))
}

/// Encode an image into the bytes of the requested format.
pub fn encode(image: image::RgbImage, format: image::ImageFormat) -> Result<Vec<u8>> {
    let mut bytes = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut bytes, format)
        .map_err(WatermarkError::Encode)?;
    Ok(bytes.into_inner())
}

/// Embeds text into images and extracts it again.
#[derive(Debug)]
pub struct Watermarker {
    config: Config,
    engine: TransformEngine,
}

impl Watermarker {
    /// Create a watermarker with the additive strategy.
    pub fn new(config: Config) -> Result<Self> {
        Watermarker::with_strategy(config, Box::new(Additive))
    }

    /// Create a watermarker that places bits with the provided strategy.
    pub fn with_strategy(config: Config, strategy: Box<dyn Strategy>) -> Result<Self> {
        config.validate()?;
        Ok(Watermarker {
            engine: TransformEngine::new(config.block_size, strategy),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The grid of blocks used for this raster.
    pub fn grid<R: Raster + ?Sized>(&self, image: &R) -> BlockGrid {
        BlockGrid::for_raster(image, self.config.block_size)
    }

    /// Number of bits that can be carried by an image of this size.
    pub fn capacity_bits(&self, width: u32, height: u32) -> usize {
        BlockGrid::new(width, height, self.config.block_size).capacity()
    }

    /// Embed the text and return the watermarked image, truncated to whole blocks.
    pub fn embed_image<R: Raster + ?Sized>(&self, image: &R, text: &str) -> image::RgbImage {
        self.embed_bits(image, &text_to_bits(text))
    }

    /// Like [`Watermarker::embed_image`], with a different strength for this call.
    pub fn embed_image_with_strength<R: Raster + ?Sized>(
        &self,
        image: &R,
        text: &str,
        strength: f64,
    ) -> Result<image::RgbImage> {
        validate_strength(strength)?;
        Ok(self.embed_bits_with_strength(image, &text_to_bits(text), strength))
    }

    /// Embed the text and encode the result in the format named by the token.
    pub fn embed<R: Raster + ?Sized>(&self, image: &R, text: &str, format: &str) -> Result<Vec<u8>> {
        self.embed_with_strength(image, text, format, self.config.strength)
    }

    /// Like [`Watermarker::embed`], with a different strength for this call.
    pub fn embed_with_strength<R: Raster + ?Sized>(
        &self,
        image: &R,
        text: &str,
        format: &str,
        strength: f64,
    ) -> Result<Vec<u8>> {
        let format = format_from_token(format)?;
        let marked = self.embed_image_with_strength(image, text, strength)?;
        encode(marked, format)
    }

    /// Embed a bit sequence, every block of the image receives a bit.
    pub fn embed_bits<R: Raster + ?Sized>(&self, image: &R, bits: &[bool]) -> image::RgbImage {
        self.embed_bits_with_strength(image, bits, self.config.strength)
    }

    fn embed_bits_with_strength<R: Raster + ?Sized>(
        &self,
        image: &R,
        bits: &[bool],
        strength: f64,
    ) -> image::RgbImage {
        let grid = self.grid(image);
        let (width, height) = grid.truncated_size();
        let capacity = grid.capacity();
        debug!(
            "embedding {} bits into {width}x{height}, capacity {capacity} bits",
            bits.len()
        );
        if bits.len() > capacity {
            warn!(
                "payload of {} bits exceeds capacity of {capacity} bits, the tail is dropped",
                bits.len()
            );
        }

        let mut result = image::RgbImage::new(width, height);
        for (i, (x, y)) in grid.offsets().enumerate() {
            // Blocks past the payload carry a zero.
            let bit = bits.get(i).copied().unwrap_or(false);
            let mut block = Block::from_raster(image, x, y, self.config.block_size);
            self.engine.embed(
                block.luma_mut(),
                bit,
                strength,
                self.config.target_position,
            );
            block.write_to(&mut result, x, y);
        }
        result
    }

    /// Extract `length` bytes of text.
    ///
    /// If the image holds fewer bits than requested, the text is shorter, ending at the last whole
    /// byte. Invalid UTF-8 is replaced by U+FFFD.
    pub fn extract<R: Raster + ?Sized>(&self, image: &R, length: usize) -> String {
        String::from_utf8_lossy(&self.extract_bytes(image, length)).into_owned()
    }

    /// Extract `length` bytes, or fewer if the image does not hold that many.
    pub fn extract_bytes<R: Raster + ?Sized>(&self, image: &R, length: usize) -> Vec<u8> {
        bits_to_bytes(&self.extract_bits(image, length.saturating_mul(BITS_PER_BYTE)))
    }

    /// Extract up to `count` bits, visiting only as many blocks as needed.
    pub fn extract_bits<R: Raster + ?Sized>(&self, image: &R, count: usize) -> Vec<bool> {
        let grid = self.grid(image);
        let bits = grid
            .offsets()
            .take(count)
            .map(|(x, y)| {
                let luma = Block::luma_from_raster(image, x, y, self.config.block_size);
                self.engine.extract(&luma, self.config.target_position)
            })
            .collect::<Vec<bool>>();
        debug!("extracted {} of {count} requested bits", bits.len());
        if bits.len() < count {
            warn!(
                "requested {count} bits but the image only holds {}, result is truncated",
                bits.len()
            );
        }
        bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(size: u32) -> image::RgbImage {
        image::RgbImage::from_pixel(size, size, image::Rgb([128, 128, 128]))
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::default().validate().is_ok());
        let bad = Config {
            block_size: 0,
            ..Default::default()
        };
        assert!(matches!(bad.validate(), Err(WatermarkError::InvalidBlockSize)));
        let bad = Config {
            target_position: 8,
            ..Default::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(WatermarkError::InvalidTargetPosition {
                position: 8,
                block_size: 8
            })
        ));
        for strength in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let bad = Config {
                strength,
                ..Default::default()
            };
            assert!(matches!(bad.validate(), Err(WatermarkError::InvalidStrength(_))));
            assert!(Watermarker::new(bad).is_err());
        }
    }

    #[test]
    fn test_block_size_must_fit_u32() {
        if let Some(block_size) = (u32::MAX as usize).checked_add(1) {
            let bad = Config {
                block_size,
                ..Default::default()
            };
            assert!(matches!(bad.validate(), Err(WatermarkError::InvalidBlockSize)));
            assert!(Watermarker::new(bad).is_err());
        }
    }

    #[test]
    fn test_extract_huge_length_saturates() {
        let wm = Watermarker::new(Config::default()).unwrap();
        let marked = wm.embed_image(&gray(64), "Hi");
        let bytes = wm.extract_bytes(&marked, 1usize << (usize::BITS - 3));
        // Every block is read, the result is limited by capacity.
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[..2], b"Hi");
    }

    #[test]
    fn test_strength_override_validated() {
        let wm = Watermarker::new(Config::default()).unwrap();
        let img = gray(16);
        assert!(matches!(
            wm.embed_image_with_strength(&img, "a", -2.0),
            Err(WatermarkError::InvalidStrength(_))
        ));
        assert!(wm.embed_with_strength(&img, "a", "png", 0.0).is_err());
    }

    #[test]
    fn test_format_tokens() {
        assert_eq!(format_from_token("png").unwrap(), image::ImageFormat::Png);
        assert_eq!(format_from_token("jpg").unwrap(), image::ImageFormat::Jpeg);
        assert_eq!(format_from_token("JPEG").unwrap(), image::ImageFormat::Jpeg);
        assert!(matches!(
            format_from_token("docx"),
            Err(WatermarkError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_capacity() {
        let wm = Watermarker::new(Config::default()).unwrap();
        assert_eq!(wm.capacity_bits(64, 64), 64);
        assert_eq!(wm.capacity_bits(71, 64), 64);
        assert_eq!(wm.capacity_bits(7, 64), 0);
    }

    #[test]
    fn test_output_is_truncated() {
        let wm = Watermarker::new(Config::default()).unwrap();
        let img = image::RgbImage::from_pixel(21, 19, image::Rgb([100, 120, 140]));
        let marked = wm.embed_image(&img, "x");
        assert_eq!(marked.dimensions(), (16, 16));
    }

    #[test]
    fn test_padding_is_zero() {
        let wm = Watermarker::new(Config::default()).unwrap();
        let marked = wm.embed_image(&gray(64), "Hi");
        assert_eq!(wm.extract_bytes(&marked, 8), b"Hi\0\0\0\0\0\0");
    }

    #[test]
    fn test_extract_stops_at_capacity() {
        let wm = Watermarker::new(Config::default()).unwrap();
        let marked = wm.embed_image(&gray(16), "?");
        assert_eq!(wm.extract_bits(&marked, 100).len(), 4);
        assert_eq!(wm.extract(&marked, 1), "");
    }

    #[test]
    fn test_custom_strategy() {
        /// Carries the bit inverted.
        struct Inverted;
        impl Strategy for Inverted {
            fn embed_bit(&self, c: &mut [f64], bit: bool, s: f64, t: usize, bs: usize) {
                Additive.embed_bit(c, !bit, s, t, bs);
            }
            fn extract_bit(&self, c: &[f64], t: usize, bs: usize) -> bool {
                !Additive.extract_bit(c, t, bs)
            }
        }

        let inverted = Watermarker::with_strategy(Config::default(), Box::new(Inverted)).unwrap();
        let plain = Watermarker::new(Config::default()).unwrap();
        let marked = inverted.embed_image(&gray(64), "ok");
        assert_eq!(inverted.extract(&marked, 2), "ok");
        let flipped = plain
            .extract_bytes(&marked, 2)
            .iter()
            .map(|b| !b)
            .collect::<Vec<u8>>();
        assert_eq!(flipped, b"ok");
    }
}
