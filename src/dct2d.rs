use rustdct::{Dct2, Dct3, DctPlanner, RequiredScratch, TransformType2And3};
use std::sync::Arc;

// https://github.com/mpizenberg/fft2d exists, but it doesn't handle the orthonormal scaling we need,
// the inverse must reconstruct the samples exactly when no coefficient was touched.

/*
The 2D transform is separable, it is the 1D transform applied to every row and then to every
column. In python this is:

dct = lambda x: scipy.fftpack.dct(x, norm='ortho')
out = dct(dct(block).transpose(1, 0)).transpose(1, 0)

idct = lambda x: scipy.fftpack.idct(x, norm='ortho')
back = idct(idct(out).transpose(1, 0)).transpose(1, 0)
*/

/// The direction of the transform.
#[derive(PartialEq, Debug, Copy, Clone)]
pub enum Type {
    /// Forward transform, orthonormal DCT-II.
    DCT2,
    /// Inverse transform, orthonormal DCT-III.
    DCT3,
}

#[derive(PartialEq, Debug, Copy, Clone)]
enum Direction {
    Row,
    Column,
}

/// Perform an orthonormal discrete cosine transform of the requested type over a 2D buffer.
/// Data is assumed to be ordered row first and will be overwritten with the result.
pub fn dct2_2d(
    planner: &mut DctPlanner<f64>,
    kind: Type,
    width: usize,
    height: usize,
    data: &mut [f64],
) {
    assert_eq!(data.len(), (width * height));
    let row_dct = planner.plan_dct2(width);
    let column_dct = planner.plan_dct2(height);
    transform(&row_dct, &column_dct, kind, width, height, data);
}

/// Square 2D transform of a fixed size, planned once and reused for every block.
#[derive(Clone)]
pub struct Dct2d {
    size: usize,
    dct: Arc<dyn TransformType2And3<f64>>,
}

impl Dct2d {
    /// Plan the transform for `size` x `size` blocks.
    pub fn new(size: usize) -> Self {
        let mut planner = DctPlanner::<f64>::new();
        Dct2d {
            size,
            dct: planner.plan_dct2(size),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Forward transform of a row-major `size * size` buffer, in place.
    pub fn forward(&self, data: &mut [f64]) {
        transform(&self.dct, &self.dct, Type::DCT2, self.size, self.size, data);
    }

    /// Inverse transform of a row-major `size * size` buffer, in place.
    pub fn inverse(&self, data: &mut [f64]) {
        transform(&self.dct, &self.dct, Type::DCT3, self.size, self.size, data);
    }
}

impl std::fmt::Debug for Dct2d {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dct2d").field("size", &self.size).finish()
    }
}

fn transform(
    row_dct: &Arc<dyn TransformType2And3<f64>>,
    column_dct: &Arc<dyn TransformType2And3<f64>>,
    kind: Type,
    width: usize,
    height: usize,
    data: &mut [f64],
) {
    assert_eq!(data.len(), (width * height));

    // Allocate the vector we'll use for the intermediate row / column storage.
    let mut tmp: Vec<f64> = Vec::new();

    // Allocate the scratch buffer.
    let mut scratch: Vec<f64> = Vec::new();

    // The order of rows / columns does not matter for a separable transform.
    for current in [Direction::Row, Direction::Column] {
        let iter_max;
        let step;
        let take;
        let skip_mult;
        let dct;
        match current {
            Direction::Row => {
                iter_max = height;
                step = 1;
                skip_mult = width;
                take = width;
                dct = row_dct;
            }

            Direction::Column => {
                iter_max = width;
                step = width;
                skip_mult = 1;
                take = height;
                dct = column_dct;
            }
        }
        let length = take;
        tmp.resize(length, 0.0);
        scratch.resize(dct.get_scratch_len(), 0.0);

        // Scaling that makes the pair orthonormal.
        let dc_scale = (1.0 / length as f64).sqrt();
        let ac_scale = (2.0 / length as f64).sqrt();

        // Generalised iteration.
        for i in 0..iter_max {
            // Copy the line into tmp.
            data.iter()
                .skip(i * skip_mult)
                .step_by(step)
                .take(take)
                .zip(tmp.iter_mut())
                .for_each(|(orig, out)| *out = *orig);

            match kind {
                Type::DCT2 => {
                    dct.process_dct2_with_scratch(&mut tmp, &mut scratch);
                    tmp[0] *= dc_scale;
                    tmp.iter_mut().skip(1).for_each(|v| *v *= ac_scale);
                }
                Type::DCT3 => {
                    // rustdct halves the first input of the DCT-III.
                    tmp[0] *= 2.0 * dc_scale;
                    tmp.iter_mut().skip(1).for_each(|v| *v *= ac_scale);
                    dct.process_dct3_with_scratch(&mut tmp, &mut scratch);
                }
            }

            // Copy tmp back into the data, overwriting the original input.
            data.iter_mut()
                .skip(i * skip_mult)
                .step_by(step)
                .take(take)
                .zip(tmp.iter())
                .for_each(|(data_dct, result)| *data_dct = *result);
        }
    }
}
