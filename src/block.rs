//! Square blocks of pixels, the unit that carries a single bit.
//!
//! A [`Block`] holds the level shifted luma of its pixels for the transform, and the chroma so the
//! block can be written back into a destination image. The [`BlockGrid`] determines which blocks
//! exist for an image and in what order they are visited.

use crate::ycbcr;

/// Read access to a raster of packed RGB pixels.
pub trait Raster {
    /// Width and height in pixels.
    fn size(&self) -> (u32, u32);

    /// Pixel at `(x, y)` packed as 0xRRGGBB.
    fn rgb_at(&self, x: u32, y: u32) -> u32;
}

/// Write access to a raster of packed RGB pixels.
pub trait RasterMut: Raster {
    fn put_rgb(&mut self, x: u32, y: u32, rgb: u32);
}

impl Raster for image::RgbImage {
    fn size(&self) -> (u32, u32) {
        self.dimensions()
    }

    fn rgb_at(&self, x: u32, y: u32) -> u32 {
        let [r, g, b] = self.get_pixel(x, y).0;
        ycbcr::pack(r, g, b)
    }
}

impl RasterMut for image::RgbImage {
    fn put_rgb(&mut self, x: u32, y: u32, rgb: u32) {
        *self.get_pixel_mut(x, y) = image::Rgb([ycbcr::red(rgb), ycbcr::green(rgb), ycbcr::blue(rgb)]);
    }
}

impl Raster for image::RgbaImage {
    fn size(&self) -> (u32, u32) {
        self.dimensions()
    }

    fn rgb_at(&self, x: u32, y: u32) -> u32 {
        // Alpha is discarded.
        let [r, g, b, _] = self.get_pixel(x, y).0;
        ycbcr::pack(r, g, b)
    }
}

impl RasterMut for image::RgbaImage {
    fn put_rgb(&mut self, x: u32, y: u32, rgb: u32) {
        // Alpha is kept as it is.
        let pixel = self.get_pixel_mut(x, y);
        pixel.0[..3].copy_from_slice(&[ycbcr::red(rgb), ycbcr::green(rgb), ycbcr::blue(rgb)]);
    }
}

impl Raster for image::DynamicImage {
    fn size(&self) -> (u32, u32) {
        image::GenericImageView::dimensions(self)
    }

    fn rgb_at(&self, x: u32, y: u32) -> u32 {
        let [r, g, b, _] = image::GenericImageView::get_pixel(self, x, y).0;
        ycbcr::pack(r, g, b)
    }
}

/// The grid of whole blocks that fits in an image.
///
/// Remainder rows and columns that do not fill a whole block are never part of the grid.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BlockGrid {
    width: u32,
    height: u32,
    block_size: u32,
}

impl BlockGrid {
    /// Grid for an image of `width` x `height`, the block size must be non zero.
    pub fn new(width: u32, height: u32, block_size: usize) -> Self {
        let block_size = block_size as u32;
        BlockGrid {
            width: (width / block_size) * block_size,
            height: (height / block_size) * block_size,
            block_size,
        }
    }

    /// Grid for the dimensions of this raster.
    pub fn for_raster<R: Raster + ?Sized>(image: &R, block_size: usize) -> Self {
        let (width, height) = image.size();
        BlockGrid::new(width, height, block_size)
    }

    /// Image dimensions truncated to a multiple of the block size.
    pub fn truncated_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of blocks, which is the number of bits the image can carry.
    pub fn capacity(&self) -> usize {
        ((self.width / self.block_size) * (self.height / self.block_size)) as usize
    }

    /// Top left corner of every block, rows of blocks top to bottom and left to right within a row.
    pub fn offsets(&self) -> impl Iterator<Item = (u32, u32)> {
        let BlockGrid {
            width,
            height,
            block_size,
        } = *self;
        (0..height)
            .step_by(block_size as usize)
            .flat_map(move |y| (0..width).step_by(block_size as usize).map(move |x| (x, y)))
    }
}

/// A block of pixels in YCbCr form.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    size: usize,
    /// Row-major luma, level shifted by -128.
    luma: Vec<f64>,
    chroma_blue: Vec<i32>,
    chroma_red: Vec<i32>,
}

impl Block {
    /// Read the `size` x `size` block with its top left corner at `(x, y)`.
    pub fn from_raster<R: Raster + ?Sized>(image: &R, x: u32, y: u32, size: usize) -> Self {
        let count = size * size;
        let mut block = Block {
            size,
            luma: Vec::with_capacity(count),
            chroma_blue: Vec::with_capacity(count),
            chroma_red: Vec::with_capacity(count),
        };
        for (px, py) in pixel_coordinates(x, y, size) {
            let rgb = image.rgb_at(px, py);
            let (r, g, b) = (ycbcr::red(rgb), ycbcr::green(rgb), ycbcr::blue(rgb));
            block.luma.push(ycbcr::luma(r, g, b) - ycbcr::OFFSET);
            block.chroma_blue.push(ycbcr::chroma_blue(r, g, b));
            block.chroma_red.push(ycbcr::chroma_red(r, g, b));
        }
        block
    }

    /// Read only the level shifted luma of a block, for when it will not be written back.
    pub fn luma_from_raster<R: Raster + ?Sized>(image: &R, x: u32, y: u32, size: usize) -> Vec<f64> {
        pixel_coordinates(x, y, size)
            .map(|(px, py)| {
                let rgb = image.rgb_at(px, py);
                ycbcr::luma(ycbcr::red(rgb), ycbcr::green(rgb), ycbcr::blue(rgb)) - ycbcr::OFFSET
            })
            .collect()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn luma(&self) -> &[f64] {
        &self.luma
    }

    pub fn luma_mut(&mut self) -> &mut [f64] {
        &mut self.luma
    }

    /// Convert back to RGB and write the pixels into `dest` with the top left corner at `(x, y)`.
    pub fn write_to<W: RasterMut + ?Sized>(&self, dest: &mut W, x: u32, y: u32) {
        for (i, (px, py)) in pixel_coordinates(x, y, self.size).enumerate() {
            let (r, g, b) = ycbcr::to_rgb(
                self.luma[i] + ycbcr::OFFSET,
                self.chroma_blue[i],
                self.chroma_red[i],
            );
            dest.put_rgb(px, py, ycbcr::pack(r, g, b));
        }
    }
}

/// Pixel coordinates of a block in row-major order.
fn pixel_coordinates(x: u32, y: u32, size: usize) -> impl Iterator<Item = (u32, u32)> {
    let size = size as u32;
    (y..y + size).flat_map(move |py| (x..x + size).map(move |px| (px, py)))
}
