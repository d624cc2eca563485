//! Synthetic atmosphere components for astronomical observation simulation.
//!
//! This crate provides the pieces of an observation simulator that describe
//! the atmosphere and focal plane environment between a telescope and the
//! sky:
//!
//! - cloud extinction field synthesis via frequency-domain noise shaping
//!   ([`clouds`]), driven either by an analytic structure function or by the
//!   empirical power spectrum of a reference image;
//! - delimited-text grid I/O for spectra, reference datasets, and exported
//!   cloud quadrants ([`io`]);
//! - focal plane thermal models interpolating coarse detector temperature
//!   maps ([`thermal`]).
//!
//! Atmospheric radiative transfer itself is delegated to an external
//! program; this crate only produces the fields such a program consumes.

pub mod clouds;
pub mod io;
pub mod thermal;

// Re-exports for easier access
pub use clouds::{
    CloudFieldSynthesizer, CloudsError, FileSpectrum, KolmogorovModel, SpectrumProvider,
    SpectrumSource,
};
pub use io::{read_grid, write_quadrant, GridIoError};
pub use thermal::{
    DetectorThermalModel, FocalplaneThermalModel, RaftThermalModel, ThermalModelError,
};
