//! Least significant bit watermarking, the lossless counterpart of the block DCT codec.
//!
//! The payload is framed by a 4 byte big-endian length header, so extraction does not need to
//! know the length up front. Pixels are visited row by row, and every pixel carries `depth` bits
//! in each of its red, green and blue channels. Bits are written most significant bit first, both
//! within a payload byte and within the low bits of a channel.
//!
//! Unlike the block codec this survives no lossy re-encoding at all, it is meant for PNG.

use crate::block::{Raster, RasterMut};
use crate::error::{Result, WatermarkError};
use crate::util::{bits_to_bytes, bytes_to_bits, BITS_PER_BYTE};
use crate::ycbcr;
use log::{debug, warn};

/// Size of the big-endian length header in front of the payload.
pub const HEADER_BYTES: usize = 4;

const CHANNELS: usize = 3;
const HEADER_BITS: usize = HEADER_BYTES * BITS_PER_BYTE;

/// Least significant bit codec that replaces the low `depth` bits of every color channel.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Lsb {
    depth: u8,
}

impl Default for Lsb {
    fn default() -> Self {
        Lsb { depth: 1 }
    }
}

impl Lsb {
    /// Create a codec writing `depth` bits per channel, between 1 and 8.
    pub fn new(depth: u8) -> Result<Self> {
        if !(1..=8).contains(&depth) {
            return Err(WatermarkError::InvalidBitDepth(depth));
        }
        Ok(Lsb { depth })
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Number of bits an image of this size holds, the header included.
    pub fn capacity_bits(&self, width: u32, height: u32) -> usize {
        (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(CHANNELS * self.depth as usize)
    }

    /// Write the framed text into the image in place.
    ///
    /// The image is left untouched if the framed payload does not fit.
    pub fn embed<R: RasterMut + ?Sized>(&self, image: &mut R, text: &str) -> Result<()> {
        let (width, height) = image.size();
        let capacity = self.capacity_bits(width, height);
        let length = u32::try_from(text.len()).map_err(|_| WatermarkError::ExceedsCapacity {
            required: usize::MAX,
            capacity,
        })?;

        let mut payload = length.to_be_bytes().to_vec();
        payload.extend_from_slice(text.as_bytes());
        let bits = bytes_to_bits(&payload);
        if bits.len() > capacity {
            return Err(WatermarkError::ExceedsCapacity {
                required: bits.len(),
                capacity,
            });
        }
        debug!(
            "writing {} bits at depth {} into {width}x{height}, capacity {capacity}",
            bits.len(),
            self.depth
        );

        let mut groups = bits.chunks(self.depth as usize).peekable();
        'rows: for y in 0..height {
            for x in 0..width {
                if groups.peek().is_none() {
                    break 'rows;
                }
                let rgb = image.rgb_at(x, y);
                let mut channels = [ycbcr::red(rgb), ycbcr::green(rgb), ycbcr::blue(rgb)];
                for channel in channels.iter_mut() {
                    if let Some(group) = groups.next() {
                        *channel = self.store(*channel, group);
                    }
                }
                let [r, g, b] = channels;
                image.put_rgb(x, y, ycbcr::pack(r, g, b));
            }
        }
        Ok(())
    }

    /// Copy the image and embed the text into the copy.
    pub fn embed_image<R: Raster + ?Sized>(&self, image: &R, text: &str) -> Result<image::RgbImage> {
        let (width, height) = image.size();
        let mut output = image::RgbImage::from_fn(width, height, |x, y| {
            let rgb = image.rgb_at(x, y);
            image::Rgb([ycbcr::red(rgb), ycbcr::green(rgb), ycbcr::blue(rgb)])
        });
        self.embed(&mut output, text)?;
        Ok(output)
    }

    /// Read the header and the payload bytes it announces.
    ///
    /// A header announcing more bytes than the image can hold means there is no watermark at
    /// this depth, or it was damaged, and is reported as exceeding capacity.
    pub fn extract_bytes<R: Raster + ?Sized>(&self, image: &R) -> Result<Vec<u8>> {
        let (width, height) = image.size();
        let capacity = self.capacity_bits(width, height);
        if capacity < HEADER_BITS {
            return Err(WatermarkError::ExceedsCapacity {
                required: HEADER_BITS,
                capacity,
            });
        }

        let mut bits = self.bits(image);
        let header = bits_to_bytes(&bits.by_ref().take(HEADER_BITS).collect::<Vec<_>>());
        let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let required = length
            .checked_mul(BITS_PER_BYTE)
            .and_then(|b| b.checked_add(HEADER_BITS))
            .unwrap_or(usize::MAX);
        if required > capacity {
            warn!("header announces {length} bytes, the image only holds {capacity} bits");
            return Err(WatermarkError::ExceedsCapacity { required, capacity });
        }

        debug!("reading {length} bytes at depth {}", self.depth);
        Ok(bits_to_bytes(
            &bits.take(length * BITS_PER_BYTE).collect::<Vec<_>>(),
        ))
    }

    /// Like [`Lsb::extract_bytes`], decoding the bytes as UTF-8 with invalid sequences replaced.
    pub fn extract<R: Raster + ?Sized>(&self, image: &R) -> Result<String> {
        Ok(String::from_utf8_lossy(&self.extract_bytes(image)?).into_owned())
    }

    /// The low bits of every channel in visiting order.
    fn bits<'a, R: Raster + ?Sized>(&self, image: &'a R) -> impl Iterator<Item = bool> + 'a {
        let (width, height) = image.size();
        let depth = self.depth;
        (0..height)
            .flat_map(move |y| (0..width).map(move |x| (x, y)))
            .flat_map(move |(x, y)| {
                let rgb = image.rgb_at(x, y);
                [ycbcr::red(rgb), ycbcr::green(rgb), ycbcr::blue(rgb)]
            })
            .flat_map(move |channel| (0..depth).rev().map(move |shift| (channel >> shift) & 1 == 1))
    }

    /// Replace the low bits of a channel, a short final group is padded with zeros.
    fn store(&self, channel: u8, group: &[bool]) -> u8 {
        let depth = self.depth as u32;
        let value = group.iter().fold(0u16, |acc, bit| (acc << 1) | *bit as u16);
        let value = value << (depth as usize - group.len());
        let low = (1u16 << depth) - 1;
        ((channel as u16 & !low) | value) as u8
    }
}
