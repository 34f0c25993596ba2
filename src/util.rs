//! Conversion between text and the bit sequence carried by the blocks.
//!
//! Bits are ordered most significant bit first within each byte.

/// Number of bits carried per payload byte.
pub const BITS_PER_BYTE: usize = 8;

/// Convert a string into its UTF-8 bit sequence.
pub fn text_to_bits(text: &str) -> Vec<bool> {
    bytes_to_bits(text.as_bytes())
}

/// Convert bytes into bits, most significant bit first.
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<bool> {
    bytes
        .iter()
        .flat_map(|byte| (0..BITS_PER_BYTE).rev().map(move |shift| (byte >> shift) & 1 == 1))
        .collect()
}

/// Pack bits back into bytes, a trailing partial byte is dropped.
pub fn bits_to_bytes(bits: &[bool]) -> Vec<u8> {
    bits.chunks_exact(BITS_PER_BYTE)
        .map(|chunk| chunk.iter().fold(0u8, |acc, bit| (acc << 1) | (*bit as u8)))
        .collect()
}

/// Pack bits into bytes and decode those as UTF-8, invalid sequences become U+FFFD.
pub fn bits_to_text(bits: &[bool]) -> String {
    String::from_utf8_lossy(&bits_to_bytes(bits)).into_owned()
}

/// Assert that two slices are equal within `max_error` per element.
#[cfg(test)]
pub(crate) fn approx_equal(a: &[f64], b: &[f64], max_error: f64) {
    if a.len() != b.len() {
        panic!("a and b are not equal length");
    }
    for delta in a.iter().zip(b.iter()).map(|(av, bv)| (*av - *bv).abs()) {
        if delta > max_error {
            panic!("a: {a:?}, b: {b:?}, delta was {delta}, this exceeded allowed {max_error}.");
        }
    }
}
