use std::{f64::consts::PI, sync::OnceLock};

use crate::jpeg::{entropy::Coefficients, header::QuantizationTable};

/// Natural-order `(row, column)` of each zig-zag index.
#[rustfmt::skip]
pub const ZIGZAG_MAP: [(u8, u8); 64] =
    [(0, 0), (0, 1), (1, 0), (2, 0), (1, 1), (0, 2), (0, 3), (1, 2),
     (2, 1), (3, 0), (4, 0), (3, 1), (2, 2), (1, 3), (0, 4), (0, 5),
     (1, 4), (2, 3), (3, 2), (4, 1), (5, 0), (6, 0), (5, 1), (4, 2),
     (3, 3), (2, 4), (1, 5), (0, 6), (0, 7), (1, 6), (2, 5), (3, 4),
     (4, 3), (5, 2), (6, 1), (7, 0), (7, 1), (6, 2), (5, 3), (4, 4),
     (3, 5), (2, 6), (1, 7), (2, 7), (3, 6), (4, 5), (5, 4), (6, 3),
     (7, 2), (7, 3), (6, 4), (5, 5), (4, 6), (3, 7), (4, 7), (5, 6),
     (6, 5), (7, 4), (7, 5), (6, 6), (5, 7), (6, 7), (7, 6), (7, 7)];

/// Level shift for 8-bit samples, 2^(P-1).
const LEVEL_SHIFT: f64 = 128.0;

/// `basis[k][n] = c(k) * cos((2n + 1) k pi / 16)` with `c(0) = sqrt(1/8)` and
/// `c(k) = sqrt(2/8)` otherwise. Orthonormal, so its transpose is its inverse.
fn basis() -> &'static [[f64; 8]; 8] {
    static BASIS: OnceLock<[[f64; 8]; 8]> = OnceLock::new();
    BASIS.get_or_init(|| {
        let mut basis = [[0f64; 8]; 8];
        for (k, row) in basis.iter_mut().enumerate() {
            let scale = if k == 0 {
                (1.0f64 / 8.0).sqrt()
            } else {
                (2.0f64 / 8.0).sqrt()
            };
            for (n, value) in row.iter_mut().enumerate() {
                *value = scale * (((2 * n + 1) * k) as f64 * PI / 16.0).cos();
            }
        }
        basis
    })
}

/// Multiplies each coefficient by its quantizer. Both stay in zig-zag order.
pub fn dequantize(coefficients: &Coefficients, table: &QuantizationTable) -> [f64; 64] {
    let mut dequantized = [0f64; 64];
    for i in 0..64 {
        dequantized[i] = coefficients[i] as f64 * table.table[i] as f64;
    }
    dequantized
}

/// Reorders a zig-zag block into natural row-major order.
pub fn unzigzag(zigzagged: &[f64; 64]) -> [f64; 64] {
    let mut natural = [0f64; 64];
    for (i, &(row, col)) in ZIGZAG_MAP.iter().enumerate() {
        natural[row as usize * 8 + col as usize] = zigzagged[i];
    }
    natural
}

fn idct_1d(input: &[f64; 8]) -> [f64; 8] {
    let basis = basis();
    let mut output = [0f64; 8];
    for (n, value) in output.iter_mut().enumerate() {
        *value = (0..8).map(|k| basis[k][n] * input[k]).sum();
    }
    output
}

fn fdct_1d(input: &[f64; 8]) -> [f64; 8] {
    let basis = basis();
    let mut output = [0f64; 8];
    for (k, value) in output.iter_mut().enumerate() {
        *value = (0..8).map(|n| basis[k][n] * input[n]).sum();
    }
    output
}

/// Applies `transform` to every row, then to every column of a row-major 8x8 block.
fn separable(block: &[f64; 64], transform: fn(&[f64; 8]) -> [f64; 8]) -> [f64; 64] {
    let mut rows = [0f64; 64];
    for y in 0..8 {
        let mut row = [0f64; 8];
        row.copy_from_slice(&block[y * 8..y * 8 + 8]);
        rows[y * 8..y * 8 + 8].copy_from_slice(&transform(&row));
    }

    let mut output = [0f64; 64];
    for x in 0..8 {
        let mut column = [0f64; 8];
        for y in 0..8 {
            column[y] = rows[y * 8 + x];
        }
        for (y, value) in transform(&column).into_iter().enumerate() {
            output[y * 8 + x] = value;
        }
    }
    output
}

/// 2-D inverse DCT (T.81 A.3.3) of a natural-order coefficient block.
pub fn idct_2d(coefficients: &[f64; 64]) -> [f64; 64] {
    separable(coefficients, idct_1d)
}

/// 2-D forward DCT (T.81 A.3.3), the exact inverse of [`idct_2d`].
pub fn fdct_2d(samples: &[f64; 64]) -> [f64; 64] {
    separable(samples, fdct_1d)
}

/// Turns one block of quantized zig-zag coefficients into level-shifted samples.
///
/// Dequantization happens before the zig-zag permutation since the quantization table is stored
/// in zig-zag order too. Samples are rounded but not clamped.
pub fn transform_block(coefficients: &Coefficients, table: &QuantizationTable) -> [i16; 64] {
    let spatial = idct_2d(&unzigzag(&dequantize(coefficients, table)));

    let mut samples = [0i16; 64];
    for (sample, value) in samples.iter_mut().zip(spatial) {
        // Float to int casts saturate, which only matters for corrupt coefficients.
        *sample = (value.round() + LEVEL_SHIFT) as i16;
    }
    samples
}
