//! 2D FFT helpers over ndarray grids.
//!
//! rustfft only provides 1D transforms, so the 2D transforms here are
//! composed from a pass over every row followed by a pass over every column.
//! rustfft's transforms are unnormalized in both directions; `ifft2` applies
//! the `1/(rows*cols)` factor so that `ifft2(fft2(x)) == x`.

use ndarray::Array2;
use rustfft::{num_complex::Complex64, FftPlanner};

/// Lift a real grid into the complex plane (zero imaginary part).
pub fn to_complex(grid: &Array2<f64>) -> Array2<Complex64> {
    grid.mapv(|v| Complex64::new(v, 0.0))
}

/// Forward 2D FFT (unnormalized, matching the usual DFT convention).
pub fn fft2(grid: &Array2<Complex64>) -> Array2<Complex64> {
    transform(grid, false)
}

/// Inverse 2D FFT, normalized by `1/(rows*cols)`.
pub fn ifft2(grid: &Array2<Complex64>) -> Array2<Complex64> {
    let (rows, cols) = grid.dim();
    let mut out = transform(grid, true);
    let scale = 1.0 / (rows as f64 * cols as f64);
    out.mapv_inplace(|v| v * scale);
    out
}

fn transform(grid: &Array2<Complex64>, inverse: bool) -> Array2<Complex64> {
    let (rows, cols) = grid.dim();
    let mut data = grid.clone();
    let mut planner = FftPlanner::new();

    let row_fft = if inverse {
        planner.plan_fft_inverse(cols)
    } else {
        planner.plan_fft_forward(cols)
    };
    let mut scratch = vec![Complex64::new(0.0, 0.0); cols];
    for mut row in data.rows_mut() {
        for (s, v) in scratch.iter_mut().zip(row.iter()) {
            *s = *v;
        }
        row_fft.process(&mut scratch);
        for (v, s) in row.iter_mut().zip(scratch.iter()) {
            *v = *s;
        }
    }

    let col_fft = if inverse {
        planner.plan_fft_inverse(rows)
    } else {
        planner.plan_fft_forward(rows)
    };
    let mut scratch = vec![Complex64::new(0.0, 0.0); rows];
    for mut col in data.columns_mut() {
        for (s, v) in scratch.iter_mut().zip(col.iter()) {
            *s = *v;
        }
        col_fft.process(&mut scratch);
        for (v, s) in col.iter_mut().zip(scratch.iter()) {
            *v = *s;
        }
    }

    data
}
