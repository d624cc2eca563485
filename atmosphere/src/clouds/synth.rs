//! The cloud field synthesizer.

use log::debug;
use ndarray::{Array2, Zip};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

use super::fft;
use super::spectrum::{SpectrumProvider, SpectrumSource};
use super::CloudsError;

/// Synthesizes spatially-correlated cloud extinction fields by
/// frequency-domain noise shaping.
///
/// The synthesizer owns the field geometry and the current target spectrum.
/// The half-diagonal extent of the 2D Fourier-space window is set from the
/// maximum frequency of the driving 1D spectrum, `window_size =
/// max_frequency / sqrt(2)`, and the real-space grid spacing follows as
/// `step_size = window_size / sampling`.
///
/// Every synthesis call draws from its own random generator, resolved from
/// the optional seed at the top of the call: the same seed against the same
/// stored spectrum produces a bit-identical field, and repeated calls never
/// interfere through hidden shared state.
pub struct CloudFieldSynthesizer {
    window_size: f64,
    sampling: usize,
    step_size: f64,
    spectrum: Option<SpectrumSource>,
    reference: Option<Array2<f64>>,
}

impl CloudFieldSynthesizer {
    /// Create a synthesizer for a sampling × sampling field.
    ///
    /// # Errors
    ///
    /// `CloudsError::Configuration` if `sampling` is zero or
    /// `max_frequency` is not finite and positive.
    pub fn new(max_frequency: f64, sampling: usize) -> Result<Self, CloudsError> {
        if sampling == 0 {
            return Err(CloudsError::Configuration(
                "sampling must be positive".to_string(),
            ));
        }
        if !(max_frequency.is_finite() && max_frequency > 0.0) {
            return Err(CloudsError::Configuration(format!(
                "max frequency must be finite and positive, got {max_frequency}"
            )));
        }

        let window_size = max_frequency / 2.0_f64.sqrt();
        let step_size = window_size / sampling as f64;
        Ok(Self {
            window_size,
            sampling,
            step_size,
            spectrum: None,
            reference: None,
        })
    }

    /// Half-diagonal extent of the Fourier-space window.
    pub fn window_size(&self) -> f64 {
        self.window_size
    }

    /// Linear grid resolution; fields are sampling × sampling.
    pub fn sampling(&self) -> usize {
        self.sampling
    }

    /// Real-space grid spacing, `window_size / sampling`.
    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    /// Store a structure-function-derived correlation surface as the target
    /// spectrum, requested from `provider` for this field's geometry.
    ///
    /// # Errors
    ///
    /// Propagates provider failures; `CloudsError::SpectrumVariantMismatch`
    /// if the provider returned a frequency-domain spectrum;
    /// `CloudsError::ShapeMismatch` if the grid is not sampling × sampling.
    pub fn setup_from_structure_function(
        &mut self,
        provider: &dyn SpectrumProvider,
    ) -> Result<(), CloudsError> {
        let source = provider.spectrum(self.window_size, self.sampling)?;
        match source {
            SpectrumSource::CorrelationSurface(ref grid) => self.check_shape(grid)?,
            other => {
                return Err(CloudsError::SpectrumVariantMismatch {
                    expected: "spatial-correlation",
                    found: other.representation(),
                })
            }
        }
        self.spectrum = Some(source);
        Ok(())
    }

    /// Store an image-derived power spectrum as the target spectrum,
    /// requested from `provider` for this field's geometry.
    ///
    /// # Errors
    ///
    /// Propagates provider failures; `CloudsError::SpectrumVariantMismatch`
    /// if the provider returned a correlation surface;
    /// `CloudsError::ShapeMismatch` on the wrong grid shape;
    /// `CloudsError::Configuration` if the spectrum holds negative power.
    pub fn setup_from_image(&mut self, provider: &dyn SpectrumProvider) -> Result<(), CloudsError> {
        let source = provider.spectrum(self.window_size, self.sampling)?;
        match source {
            SpectrumSource::PowerSpectrum(ref grid) => {
                self.check_shape(grid)?;
                if grid.iter().any(|&p| !p.is_finite() || p < 0.0) {
                    return Err(CloudsError::Configuration(
                        "power spectrum values must be finite and non-negative".to_string(),
                    ));
                }
            }
            other => {
                return Err(CloudsError::SpectrumVariantMismatch {
                    expected: "frequency-domain",
                    found: other.representation(),
                })
            }
        }
        self.spectrum = Some(source);
        Ok(())
    }

    /// Configure a reference dataset used to normalize image-mode fields.
    ///
    /// Only the dataset's root-mean-square is ever used, so its shape is not
    /// tied to the field geometry.
    pub fn set_reference_dataset(&mut self, reference: Array2<f64>) {
        self.reference = Some(reference);
    }

    /// Synthesize a field from the stored correlation surface.
    ///
    /// The surface is forward-transformed into a power spectrum
    /// (Wiener–Khinchin: the transform of a correlation function is, up to
    /// normalization, the power spectral density), white Gaussian noise is
    /// shaped by its square root in frequency space, and the inverse
    /// transform's real part is the field. The imaginary residue is
    /// numerical noise and is discarded.
    ///
    /// # Errors
    ///
    /// `CloudsError::SpectrumNotConfigured` if no setup call stored a
    /// spectrum; `CloudsError::SpectrumVariantMismatch` if the stored
    /// spectrum is frequency-domain.
    pub fn synthesize_direct(&self, seed: Option<u64>) -> Result<Array2<f64>, CloudsError> {
        let surface = match &self.spectrum {
            Some(SpectrumSource::CorrelationSurface(grid)) => grid,
            Some(other) => {
                return Err(CloudsError::SpectrumVariantMismatch {
                    expected: "spatial-correlation",
                    found: other.representation(),
                })
            }
            None => return Err(CloudsError::SpectrumNotConfigured),
        };
        self.synthesize_direct_with(surface, seed)
    }

    /// [`synthesize_direct`](Self::synthesize_direct) against an explicitly
    /// supplied correlation surface, bypassing the stored spectrum.
    pub fn synthesize_direct_with(
        &self,
        correlation_surface: &Array2<f64>,
        seed: Option<u64>,
    ) -> Result<Array2<f64>, CloudsError> {
        self.check_shape(correlation_surface)?;

        let power = fft::fft2(&fft::to_complex(correlation_surface)).mapv(|c| c.norm());
        let field = self.shape_noise(&power, seed);
        debug!(
            "synthesized {s}x{s} field from correlation surface (seed: {seed:?})",
            s = self.sampling
        );
        Ok(field)
    }

    /// Synthesize a field from the stored image-derived power spectrum.
    ///
    /// The spectrum is already in frequency space, so noise shaping uses it
    /// directly with no forward transform. The raw field is then shifted so
    /// its global minimum becomes zero (extinction cannot be negative) and
    /// rescaled so its root-mean-square matches the reference dataset's:
    /// the per-call `reference` takes precedence over one configured with
    /// [`set_reference_dataset`](Self::set_reference_dataset).
    ///
    /// # Errors
    ///
    /// `CloudsError::MissingReferenceData` if neither a per-call nor a
    /// configured reference exists; `CloudsError::DegenerateField` if the
    /// shifted field has zero rms; plus the variant/configuration errors of
    /// [`synthesize_direct`](Self::synthesize_direct).
    pub fn synthesize_from_image_spectrum(
        &self,
        seed: Option<u64>,
        reference: Option<&Array2<f64>>,
    ) -> Result<Array2<f64>, CloudsError> {
        let power = match &self.spectrum {
            Some(SpectrumSource::PowerSpectrum(grid)) => grid,
            Some(other) => {
                return Err(CloudsError::SpectrumVariantMismatch {
                    expected: "frequency-domain",
                    found: other.representation(),
                })
            }
            None => return Err(CloudsError::SpectrumNotConfigured),
        };
        let reference = reference
            .or(self.reference.as_ref())
            .ok_or(CloudsError::MissingReferenceData)?;

        let mut field = self.shape_noise(power, seed);

        // Shift the global minimum to zero so extinction is non-negative;
        // tracked per row, then the minimum across rows.
        let mut global_min = f64::INFINITY;
        for row in field.rows() {
            let row_min = row.iter().fold(f64::INFINITY, |m, &v| m.min(v));
            global_min = global_min.min(row_min);
        }
        field.mapv_inplace(|v| v - global_min);

        // Match the reference dataset's rms.
        let field_rms = rms(&field);
        if field_rms == 0.0 {
            return Err(CloudsError::DegenerateField);
        }
        let scale = rms(reference) / field_rms;
        field.mapv_inplace(|v| v * scale);

        debug!(
            "synthesized {s}x{s} field from image spectrum (seed: {seed:?}, rms scale: {scale:.6})",
            s = self.sampling
        );
        Ok(field)
    }

    /// Enumerate the first quadrant of a synthesized field as lazy
    /// `(x, y, z)` triples, rows outer and columns inner.
    ///
    /// Only the first quadrant is exported — the FFT's circular symmetry
    /// makes the other three quadrants statistically dependent reflections
    /// of it, and exporting the whole grid would duplicate correlated
    /// structure as if it were independent. Bounds are floor-divided: an odd
    /// sampling of `s` yields a `(s/2) × (s/2)` quadrant.
    ///
    /// # Errors
    ///
    /// `CloudsError::ShapeMismatch` if `field` is not sampling × sampling.
    pub fn quadrant<'a>(
        &self,
        field: &'a Array2<f64>,
    ) -> Result<impl Iterator<Item = (f64, f64, f64)> + 'a, CloudsError> {
        self.check_shape(field)?;
        let half = self.sampling / 2;
        let step = self.step_size;
        Ok((0..half).flat_map(move |i| {
            (0..half).map(move |j| (i as f64 * step, j as f64 * step, field[[i, j]]))
        }))
    }

    /// White Gaussian noise shaped by the square root of `power`.
    fn shape_noise(&self, power: &Array2<f64>, seed: Option<u64>) -> Array2<f64> {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let noise = Array2::from_shape_fn((self.sampling, self.sampling), |_| {
            StandardNormal.sample(&mut rng)
        });

        let mut fourier = fft::fft2(&fft::to_complex(&noise));
        Zip::from(&mut fourier)
            .and(power)
            .for_each(|f, &p| *f *= p.sqrt());

        fft::ifft2(&fourier).mapv(|c| c.re)
    }

    fn check_shape(&self, grid: &Array2<f64>) -> Result<(), CloudsError> {
        let expected = (self.sampling, self.sampling);
        if grid.dim() != expected {
            return Err(CloudsError::ShapeMismatch {
                expected,
                found: grid.dim(),
            });
        }
        Ok(())
    }
}

/// Root-mean-square over every cell of a grid.
fn rms(grid: &Array2<f64>) -> f64 {
    let sum_sq: f64 = grid.iter().map(|&v| v * v).sum();
    (sum_sq / grid.len() as f64).sqrt()
}
