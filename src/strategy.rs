//! Policies that map a single bit onto a block of transform coefficients.

/// Embeds a bit into, and recovers a bit from, the coefficients of one block.
///
/// Coefficients are the row-major output of the forward transform of a `block_size` x
/// `block_size` block. The bit is carried by the coefficient at `(target, target)`.
pub trait Strategy: Send + Sync {
    /// Modify the coefficients such that `extract_bit` on them returns `bit`.
    fn embed_bit(
        &self,
        coefficients: &mut [f64],
        bit: bool,
        strength: f64,
        target: usize,
        block_size: usize,
    );

    /// Read the bit carried by the coefficients.
    fn extract_bit(&self, coefficients: &[f64], target: usize, block_size: usize) -> bool;
}

/// Adds the strength to the target coefficient for a one, subtracts it for a zero. The bit is read
/// back from the sign of that coefficient.
///
/// The natural value of the coefficient is not removed, so a bit is only recovered if the strength
/// dominates it. Anything that flips the sign afterwards, like heavy lossy recompression, corrupts
/// the bit.
#[derive(Debug, Default, Copy, Clone)]
pub struct Additive;

impl Additive {
    fn index(target: usize, block_size: usize) -> usize {
        target * block_size + target
    }
}

impl Strategy for Additive {
    fn embed_bit(
        &self,
        coefficients: &mut [f64],
        bit: bool,
        strength: f64,
        target: usize,
        block_size: usize,
    ) {
        let index = Additive::index(target, block_size);
        coefficients[index] += if bit { strength } else { -strength };
    }

    fn extract_bit(&self, coefficients: &[f64], target: usize, block_size: usize) -> bool {
        coefficients[Additive::index(target, block_size)] > 0.0
    }
}
