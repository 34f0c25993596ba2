#![allow(dead_code)]
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_distr::Normal;

pub fn solid_gray(width: u32, height: u32) -> image::RgbImage {
    image::RgbImage::from_pixel(width, height, image::Rgb([128, 128, 128]))
}

/// Smooth color gradient that stays clear of the clamping range.
pub fn gradient(width: u32, height: u32) -> image::RgbImage {
    image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            (40 + x * 120 / width) as u8,
            (60 + y * 120 / height) as u8,
            (200 - (x + y) * 100 / (width + height)) as u8,
        ])
    })
}

/// Mid gray with independent gaussian noise on every channel.
pub fn noisy_gray(seed: u64, width: u32, height: u32, sigma: f64) -> image::RgbImage {
    let mut generator = ChaCha8Rng::seed_from_u64(seed);
    let noise = Normal::new(0.0, sigma).unwrap();
    image::RgbImage::from_fn(width, height, |_, _| {
        let mut channel = || (128.0 + noise.sample(&mut generator)).round().clamp(0.0, 255.0) as u8;
        image::Rgb([channel(), channel(), channel()])
    })
}

/// Fixed pseudo random printable text of `length` bytes.
pub fn fixed_text(seed: u64, length: usize) -> String {
    let mut generator = ChaCha8Rng::seed_from_u64(seed);
    (0..length)
        .map(|_| generator.gen_range(b' '..=b'~') as char)
        .collect()
}

/// Largest per channel difference between two images of equal size.
pub fn max_difference(a: &image::RgbImage, b: &image::RgbImage) -> u8 {
    assert_eq!(a.dimensions(), b.dimensions());
    a.pixels()
        .zip(b.pixels())
        .flat_map(|(pa, pb)| (0..3).map(move |c| pa.0[c].abs_diff(pb.0[c])))
        .max()
        .unwrap_or(0)
}
