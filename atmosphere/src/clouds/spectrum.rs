//! Target spectrum representations and providers.
//!
//! The synthesizer consumes a [`SpectrumSource`] keyed by the field's
//! Fourier-space window size and sampling. Providers are opaque: a
//! closed-form model, an empirical estimate, or a file on disk are all
//! acceptable as long as the returned grid has the agreed shape and carries
//! the right representation tag.

use std::path::{Path, PathBuf};

use ndarray::Array2;

use super::CloudsError;
use crate::io;

/// A target spectrum in one of its two representations.
///
/// The two variants must not be conflated: a correlation surface still needs
/// a forward Fourier transform to become a power spectrum, while an
/// image-derived power spectrum is already in frequency space. Each
/// synthesis operation requires the matching variant and fails with
/// [`CloudsError::SpectrumVariantMismatch`] otherwise.
#[derive(Debug, Clone)]
pub enum SpectrumSource {
    /// A symmetric spatial correlation surface (structure-function derived).
    CorrelationSurface(Array2<f64>),
    /// A power spectrum already in frequency space (image derived).
    PowerSpectrum(Array2<f64>),
}

impl SpectrumSource {
    /// Human-readable name of the representation, used in error messages.
    pub fn representation(&self) -> &'static str {
        match self {
            SpectrumSource::CorrelationSurface(_) => "spatial-correlation",
            SpectrumSource::PowerSpectrum(_) => "frequency-domain",
        }
    }

    /// The underlying grid, regardless of representation.
    pub fn grid(&self) -> &Array2<f64> {
        match self {
            SpectrumSource::CorrelationSurface(g) | SpectrumSource::PowerSpectrum(g) => g,
        }
    }
}

/// Supplies a target spectrum for a given Fourier-space window and sampling.
pub trait SpectrumProvider {
    /// Produce a sampling × sampling spectrum grid, tagged with its
    /// representation. The caller is responsible for checking the shape.
    fn spectrum(&self, window_size: f64, sampling: usize) -> Result<SpectrumSource, CloudsError>;
}

/// Closed-form correlation surface from a saturating Kolmogorov-style
/// structure function.
///
/// The correlation at separation `r` is `variance * exp(-(r/outer_scale)^(5/3))`,
/// the standard 5/3 turbulence exponent with an outer-scale rolloff.
/// Separations are measured from the grid center so the surface is symmetric,
/// with grid spacing `window_size / sampling`.
#[derive(Debug, Clone)]
pub struct KolmogorovModel {
    variance: f64,
    outer_scale: f64,
}

impl KolmogorovModel {
    /// Create a model with the given variance (correlation at zero
    /// separation) and outer scale (separation, in window units, over which
    /// the correlation decays).
    pub fn new(variance: f64, outer_scale: f64) -> Result<Self, CloudsError> {
        if !(variance.is_finite() && variance > 0.0) {
            return Err(CloudsError::Configuration(format!(
                "variance must be finite and positive, got {variance}"
            )));
        }
        if !(outer_scale.is_finite() && outer_scale > 0.0) {
            return Err(CloudsError::Configuration(format!(
                "outer scale must be finite and positive, got {outer_scale}"
            )));
        }
        Ok(Self {
            variance,
            outer_scale,
        })
    }

    /// Correlation value at separation `r`.
    fn correlation(&self, r: f64) -> f64 {
        self.variance * (-(r / self.outer_scale).powf(5.0 / 3.0)).exp()
    }
}

impl SpectrumProvider for KolmogorovModel {
    fn spectrum(&self, window_size: f64, sampling: usize) -> Result<SpectrumSource, CloudsError> {
        if sampling == 0 {
            return Err(CloudsError::Configuration(
                "sampling must be positive".to_string(),
            ));
        }
        let step = window_size / sampling as f64;
        let center = sampling as f64 / 2.0;

        let surface = Array2::from_shape_fn((sampling, sampling), |(i, j)| {
            let dx = (i as f64 - center) * step;
            let dy = (j as f64 - center) * step;
            self.correlation(dx.hypot(dy))
        });

        Ok(SpectrumSource::CorrelationSurface(surface))
    }
}

/// A spectrum loaded from a whitespace-delimited text grid.
///
/// The same file format serves both representations; the constructor decides
/// which tag the loaded grid carries.
#[derive(Debug, Clone)]
pub struct FileSpectrum {
    path: PathBuf,
    as_power: bool,
}

impl FileSpectrum {
    /// A file holding an image-derived power spectrum (frequency space).
    pub fn power_spectrum<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            as_power: true,
        }
    }

    /// A file holding a spatial correlation surface.
    pub fn correlation_surface<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            as_power: false,
        }
    }
}

impl SpectrumProvider for FileSpectrum {
    fn spectrum(&self, _window_size: f64, _sampling: usize) -> Result<SpectrumSource, CloudsError> {
        let grid = io::read_grid(&self.path).map_err(|source| CloudsError::GridLoad {
            path: self.path.clone(),
            source,
        })?;
        Ok(if self.as_power {
            SpectrumSource::PowerSpectrum(grid)
        } else {
            SpectrumSource::CorrelationSurface(grid)
        })
    }
}
