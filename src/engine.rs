//! Runs the block transform and hands the coefficients to the [`Strategy`].

use crate::dct2d::Dct2d;
use crate::strategy::Strategy;

/// Forward and inverse transform of luma blocks, with a strategy to place the bit.
///
/// No scratch state is kept between calls, a single engine can be shared between threads.
pub struct TransformEngine {
    dct: Dct2d,
    strategy: Box<dyn Strategy>,
}

impl TransformEngine {
    /// Create an engine for `block_size` x `block_size` blocks.
    pub fn new(block_size: usize, strategy: Box<dyn Strategy>) -> Self {
        TransformEngine {
            dct: Dct2d::new(block_size),
            strategy,
        }
    }

    pub fn block_size(&self) -> usize {
        self.dct.size()
    }

    /// Embed a bit into the row-major luma samples of a block, updating them in place.
    ///
    /// Only the target coefficient is changed, all other frequency content survives the round
    /// trip through the transform.
    pub fn embed(&self, luma: &mut [f64], bit: bool, strength: f64, target: usize) {
        let block_size = self.block_size();
        assert_eq!(luma.len(), block_size * block_size);
        self.dct.forward(luma);
        self.strategy
            .embed_bit(luma, bit, strength, target, block_size);
        self.dct.inverse(luma);
    }

    /// Extract the bit from the row-major luma samples of a block.
    pub fn extract(&self, luma: &[f64], target: usize) -> bool {
        let block_size = self.block_size();
        assert_eq!(luma.len(), block_size * block_size);
        let mut coefficients = luma.to_vec();
        self.dct.forward(&mut coefficients);
        self.strategy
            .extract_bit(&coefficients, target, block_size)
    }
}

impl std::fmt::Debug for TransformEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformEngine")
            .field("block_size", &self.block_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dct2d::{dct2_2d, Type};
    use crate::strategy::Additive;
    use crate::util::approx_equal;

    fn textured_block() -> Vec<f64> {
        (0..64)
            .map(|i| ((i % 8) as f64 * 3.0) - ((i / 8) as f64 * 2.0))
            .collect()
    }

    #[test]
    fn test_embed_moves_single_coefficient() {
        let engine = TransformEngine::new(8, Box::new(Additive));
        let original = textured_block();
        let mut luma = original.clone();
        engine.embed(&mut luma, true, 20.0, 4);

        let mut planner = rustdct::DctPlanner::new();
        let mut before = original.clone();
        dct2_2d(&mut planner, Type::DCT2, 8, 8, &mut before);
        let mut after = luma.clone();
        dct2_2d(&mut planner, Type::DCT2, 8, 8, &mut after);

        for (i, (b, a)) in before.iter().zip(after.iter()).enumerate() {
            let expected = if i == 4 * 8 + 4 { b + 20.0 } else { *b };
            assert!((a - expected).abs() < 1e-9, "coefficient {i}: {a} vs {expected}");
        }
    }

    #[test]
    fn test_extract_reads_embedded_bit() {
        let engine = TransformEngine::new(8, Box::new(Additive));
        for bit in [true, false] {
            let mut luma = textured_block();
            engine.embed(&mut luma, bit, 20.0, 4);
            assert_eq!(engine.extract(&luma, 4), bit);
        }
    }

    #[test]
    fn test_extract_does_not_mutate() {
        let engine = TransformEngine::new(8, Box::new(Additive));
        let luma = textured_block();
        let copy = luma.clone();
        let _ = engine.extract(&luma, 4);
        approx_equal(&luma, &copy, 0.0);
    }

    #[test]
    fn test_other_block_sizes() {
        let engine = TransformEngine::new(4, Box::new(Additive));
        let mut luma = vec![10.0f64; 16];
        engine.embed(&mut luma, false, 8.0, 2);
        assert!(!engine.extract(&luma, 2));
        engine.embed(&mut luma, true, 16.0, 2);
        assert!(engine.extract(&luma, 2));
    }
}
