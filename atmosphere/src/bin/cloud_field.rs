//! Cloud extinction field generator.
//!
//! Synthesizes a spatially-correlated cloud extinction field and writes its
//! first quadrant as tab-separated `x y z` triples, one line per cell.
//!
//! Usage:
//! ```
//! cargo run --bin cloud-field -- [OPTIONS] --output <FILE>
//! ```
//!
//! See --help for detailed options.

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::info;

use atmosphere::{read_grid, write_quadrant, CloudFieldSynthesizer, FileSpectrum, KolmogorovModel};

/// Which spectrum representation drives the synthesis.
#[derive(Debug, Clone, ValueEnum)]
enum Mode {
    /// Correlation surface from the closed-form structure function model.
    StructureFunction,
    /// Power spectrum estimated from a reference image, loaded from a file.
    Image,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::StructureFunction => write!(f, "structure-function"),
            Mode::Image => write!(f, "image"),
        }
    }
}

/// Command line arguments for cloud field generation
#[derive(Parser, Debug)]
#[command(
    name = "Cloud Field Generator",
    about = "Synthesizes cloud extinction fields by frequency-domain noise shaping",
    long_about = None
)]
struct Args {
    /// Maximum frequency of the driving 1D power spectrum
    #[arg(long, default_value_t = 2.0)]
    max_frequency: f64,

    /// Linear grid resolution; the field is sampling x sampling
    #[arg(long, default_value_t = 240)]
    sampling: usize,

    /// Spectrum representation to synthesize from
    #[arg(long, value_enum, default_value_t = Mode::StructureFunction)]
    mode: Mode,

    /// Random seed for a reproducible realization
    #[arg(long)]
    seed: Option<u64>,

    /// Output path for the quadrant file
    #[arg(long)]
    output: PathBuf,

    /// Structure-function mode: field variance at zero separation
    #[arg(long, default_value_t = 1.0)]
    variance: f64,

    /// Structure-function mode: outer scale of the correlation decay
    #[arg(long, default_value_t = 0.5)]
    outer_scale: f64,

    /// Image mode: file holding the image-derived power spectrum
    #[arg(long)]
    spectrum_file: Option<PathBuf>,

    /// Image mode: reference dataset for rms normalization. Defaults to
    /// data/1104-batch1_im.txt under $ATMOSPHERE_CLOUDS_DIR when unset.
    #[arg(long)]
    normalization_file: Option<PathBuf>,
}

/// Resolve the normalization dataset path: explicit flag first, then the
/// documented environment fallback.
fn normalization_path(args: &Args) -> Result<PathBuf, Box<dyn Error>> {
    if let Some(path) = &args.normalization_file {
        return Ok(path.clone());
    }
    let base = std::env::var("ATMOSPHERE_CLOUDS_DIR").map_err(|_| {
        "no --normalization-file given and ATMOSPHERE_CLOUDS_DIR is not set".to_string()
    })?;
    Ok(PathBuf::from(base).join("data").join("1104-batch1_im.txt"))
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut synth = CloudFieldSynthesizer::new(args.max_frequency, args.sampling)?;
    info!(
        "field geometry: window size {:.6}, step size {:.6}, sampling {}",
        synth.window_size(),
        synth.step_size(),
        synth.sampling()
    );

    let field = match args.mode {
        Mode::StructureFunction => {
            let model = KolmogorovModel::new(args.variance, args.outer_scale)?;
            synth.setup_from_structure_function(&model)?;
            synth.synthesize_direct(args.seed)?
        }
        Mode::Image => {
            let spectrum_file = args
                .spectrum_file
                .as_ref()
                .ok_or("--spectrum-file is required in image mode")?;
            synth.setup_from_image(&FileSpectrum::power_spectrum(spectrum_file))?;

            let norm_path = normalization_path(&args)?;
            info!("normalizing against {}", norm_path.display());
            let reference = read_grid(&norm_path)?;
            synth.synthesize_from_image_spectrum(args.seed, Some(&reference))?
        }
    };

    let lines = write_quadrant(&args.output, synth.quadrant(&field)?)?;
    info!(
        "wrote {lines} quadrant cells to {}",
        args.output.display()
    );
    Ok(())
}
