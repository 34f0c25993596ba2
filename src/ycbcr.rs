//! Conversion between packed RGB pixels and the YCbCr color space.
//!
//! Luma is kept as a real value, it is the channel that goes through the transform. The two
//! chroma channels are integers offset by 128 and are carried through a block unmodified.

const RED_SHIFT: u32 = 16;
const GREEN_SHIFT: u32 = 8;
const CHANNEL_MASK: u32 = 0xFF;

/// Offset applied to the chroma channels and used to level shift luma.
pub const OFFSET: f64 = 128.0;

/// Red channel of a packed 0xRRGGBB pixel, any alpha in the top byte is ignored.
pub fn red(rgb: u32) -> u8 {
    ((rgb >> RED_SHIFT) & CHANNEL_MASK) as u8
}

/// Green channel of a packed pixel.
pub fn green(rgb: u32) -> u8 {
    ((rgb >> GREEN_SHIFT) & CHANNEL_MASK) as u8
}

/// Blue channel of a packed pixel.
pub fn blue(rgb: u32) -> u8 {
    (rgb & CHANNEL_MASK) as u8
}

/// Pack three channels into 0xRRGGBB.
pub fn pack(r: u8, g: u8, b: u8) -> u32 {
    ((r as u32) << RED_SHIFT) | ((g as u32) << GREEN_SHIFT) | b as u32
}

pub fn luma(r: u8, g: u8, b: u8) -> f64 {
    0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
}

/// Blue difference, offset by 128 and rounded to the nearest integer.
///
/// Rounding rather than truncating keeps the RGB round trip through [`to_rgb`] within one per
/// channel, truncation can be off by two.
pub fn chroma_blue(r: u8, g: u8, b: u8) -> i32 {
    (-0.169 * r as f64 - 0.331 * g as f64 + 0.500 * b as f64 + OFFSET).round() as i32
}

/// Red difference, offset by 128 and rounded to the nearest integer like [`chroma_blue`].
pub fn chroma_red(r: u8, g: u8, b: u8) -> i32 {
    (0.500 * r as f64 - 0.419 * g as f64 - 0.081 * b as f64 + OFFSET).round() as i32
}

/// Convert a luma value (without level shift) and two chroma values back to RGB.
///
/// Every channel is rounded to the nearest integer and clamped to [0, 255].
pub fn to_rgb(y: f64, cb: i32, cr: i32) -> (u8, u8, u8) {
    let cb = cb as f64 - OFFSET;
    let cr = cr as f64 - OFFSET;
    (
        clamp(y + 1.402 * cr),
        clamp(y - 0.34414 * cb - 0.71414 * cr),
        clamp(y + 1.772 * cb),
    )
}

fn clamp(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
