//! Cloud extinction field synthesis.
//!
//! This module generates 2D spatially-correlated random extinction fields
//! for simulating cloudy atmospheres over a telescope field of view. The
//! synthesis is frequency-domain noise shaping: Gaussian white noise is
//! Fourier-transformed, multiplied by the square root of a target power
//! spectrum, and inverse-transformed back to real space. By construction the
//! resulting field carries the spatial correlation structure implied by the
//! target spectrum.
//!
//! Two spectrum representations are supported, and they are deliberately
//! kept distinct (see [`SpectrumSource`]):
//!
//! - a **spatial correlation surface**, typically derived from an analytic
//!   structure function, which must still be Fourier-transformed into a
//!   power spectrum (Wiener–Khinchin), and
//! - a **frequency-domain power spectrum**, typically estimated from a
//!   reference image, which is used as-is.

pub mod fft;
pub mod spectrum;
pub mod synth;

use std::path::PathBuf;

use thiserror::Error;

use crate::io::GridIoError;

/// Errors raised while configuring or running cloud field synthesis.
#[derive(Debug, Error)]
pub enum CloudsError {
    /// Invalid field or model parameters.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A synthesis operation was invoked against the wrong spectrum
    /// representation (correlation surface vs frequency-domain power).
    #[error("spectrum representation mismatch: expected {expected}, found {found}")]
    SpectrumVariantMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// Synthesis requested before any setup call stored a spectrum.
    #[error("no spectrum configured: call a setup method first")]
    SpectrumNotConfigured,

    /// A grid does not match the sampling × sampling shape of the field.
    #[error("grid shape {found:?} does not match expected {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// Image-mode normalization requested with no resolvable dataset.
    #[error("no reference dataset for rms normalization: supply one or configure a normalization file")]
    MissingReferenceData,

    /// The synthesized field has zero rms and cannot be rescaled.
    #[error("synthesized field has zero rms; cannot normalize against a reference")]
    DegenerateField,

    /// A spectrum or reference grid file could not be read.
    #[error("failed to load grid from {path}")]
    GridLoad {
        path: PathBuf,
        #[source]
        source: GridIoError,
    },
}

pub use spectrum::{FileSpectrum, KolmogorovModel, SpectrumProvider, SpectrumSource};
pub use synth::CloudFieldSynthesizer;
