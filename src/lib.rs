#![allow(clippy::excessive_precision)]

pub mod algorithm;
pub mod block;
pub mod dct2d;
pub mod engine;
pub mod error;
pub mod lsb;
pub mod service;
pub mod strategy;
pub mod util;
pub mod ycbcr;

// expose the traits in the prelude.
pub mod prelude {
    pub use crate::block::{Raster, RasterMut};
    pub use crate::strategy::Strategy;
}
// Export the public components from the algorithm here.
pub use algorithm::{format_from_token, Config, Watermarker};
pub use block::{Block, BlockGrid};
pub use error::{Result, WatermarkError};
pub use lsb::Lsb;
pub use service::{Embedded, WatermarkService};
pub use strategy::Additive;
