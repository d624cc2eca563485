//! End-to-end synthesis tests: file-backed pipelines and statistical
//! properties that span several modules.

use std::io::Write as _;

use approx::assert_relative_eq;
use ndarray::Array2;
use tempfile::NamedTempFile;

use atmosphere::clouds::fft;
use atmosphere::{
    read_grid, write_quadrant, CloudFieldSynthesizer, FileSpectrum, KolmogorovModel,
    SpectrumProvider,
};

fn rms(grid: &Array2<f64>) -> f64 {
    let sum_sq: f64 = grid.iter().map(|&v| v * v).sum();
    (sum_sq / grid.len() as f64).sqrt()
}

fn write_grid_file(grid: &Array2<f64>) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for row in grid.rows() {
        let line: Vec<String> = row.iter().map(|v| format!("{v}")).collect();
        writeln!(file, "{}", line.join(" ")).unwrap();
    }
    file.flush().unwrap();
    file
}

#[test]
fn image_mode_pipeline_from_files() {
    let sampling = 16;

    // An image-derived power spectrum falling off with frequency index.
    let power = Array2::from_shape_fn((sampling, sampling), |(i, j)| {
        1.0 / (1.0 + (i * i + j * j) as f64)
    });
    let spectrum_file = write_grid_file(&power);

    // A reference dataset whose rms the field must match.
    let reference_grid = Array2::from_shape_fn((6, 6), |(i, j)| 0.1 + 0.05 * (i + j) as f64);
    let reference_file = write_grid_file(&reference_grid);

    let mut synth = CloudFieldSynthesizer::new(2.0, sampling).unwrap();
    synth
        .setup_from_image(&FileSpectrum::power_spectrum(spectrum_file.path()))
        .unwrap();

    let reference = read_grid(reference_file.path()).unwrap();
    let field = synth
        .synthesize_from_image_spectrum(Some(7), Some(&reference))
        .unwrap();

    assert_eq!(field.dim(), (sampling, sampling));
    assert!(field.iter().all(|&v| v >= 0.0));
    assert_relative_eq!(rms(&field), rms(&reference), epsilon = 1e-9);

    // Export the first quadrant and read it back.
    let out = NamedTempFile::new().unwrap();
    let lines = write_quadrant(out.path(), synth.quadrant(&field).unwrap()).unwrap();
    assert_eq!(lines, (sampling / 2) * (sampling / 2));

    let contents = std::fs::read_to_string(out.path()).unwrap();
    let step = synth.step_size();
    for (idx, line) in contents.lines().enumerate() {
        let parts: Vec<f64> = line.split('\t').map(|t| t.parse().unwrap()).collect();
        assert_eq!(parts.len(), 3);
        let (i, j) = (idx / (sampling / 2), idx % (sampling / 2));
        assert_relative_eq!(parts[0], i as f64 * step, epsilon = 1e-12);
        assert_relative_eq!(parts[1], j as f64 * step, epsilon = 1e-12);
        assert_relative_eq!(parts[2], field[[i, j]], epsilon = 1e-9);
    }
}

#[test]
fn stored_spectrum_synthesis_is_reproducible() {
    let model = KolmogorovModel::new(1.5, 0.4).unwrap();

    let mut a = CloudFieldSynthesizer::new(2.0, 12).unwrap();
    a.setup_from_structure_function(&model).unwrap();
    let mut b = CloudFieldSynthesizer::new(2.0, 12).unwrap();
    b.setup_from_structure_function(&model).unwrap();

    let field_a = a.synthesize_direct(Some(42)).unwrap();
    let field_b = b.synthesize_direct(Some(42)).unwrap();
    for (va, vb) in field_a.iter().zip(field_b.iter()) {
        assert_eq!(va.to_bits(), vb.to_bits());
    }
}

/// The ensemble-averaged power spectrum of synthesized fields tracks the
/// target spectrum.
///
/// For a symmetric correlation surface the shaped Fourier field is Hermitian,
/// so the field is exactly real and `E[|FFT2(field)|^2] = n * P` cell by
/// cell, where n is the number of grid cells. Averaging over many seeds, the
/// per-cell ratio against the target should sit near one up to realization
/// noise.
#[test]
fn ensemble_spectrum_matches_target_shape() {
    let sampling = 8;
    let n_cells = (sampling * sampling) as f64;
    let seeds = 0..100_u64;
    let n_seeds = 100.0;

    let model = KolmogorovModel::new(1.0, 0.6).unwrap();
    let mut synth = CloudFieldSynthesizer::new(2.0, sampling).unwrap();
    synth.setup_from_structure_function(&model).unwrap();

    // Target power spectrum, recomputed the way the synthesizer derives it.
    let surface = match model
        .spectrum(synth.window_size(), sampling)
        .map(|s| s.grid().clone())
    {
        Ok(grid) => grid,
        Err(e) => panic!("provider failed: {e}"),
    };
    let target = fft::fft2(&fft::to_complex(&surface)).mapv(|c| c.norm());
    let target_max = target.iter().cloned().fold(0.0_f64, f64::max);

    let mut accum = Array2::<f64>::zeros((sampling, sampling));
    for seed in seeds {
        let field = synth.synthesize_direct(Some(seed)).unwrap();
        let spectrum = fft::fft2(&fft::to_complex(&field));
        accum.zip_mut_with(&spectrum, |a, s| *a += s.norm_sqr());
    }
    accum.mapv_inplace(|v| v / n_seeds);

    // Only bins carrying meaningful power; tiny bins are all realization
    // noise relative to their expectation.
    for (idx, &p) in target.indexed_iter() {
        if p < 1e-2 * target_max {
            continue;
        }
        let ratio = accum[idx] / (n_cells * p);
        assert!(
            (0.5..=1.6).contains(&ratio),
            "bin {idx:?}: ensemble/target power ratio {ratio} outside tolerance"
        );
    }
}
