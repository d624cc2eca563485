//! Focal plane thermal models.
//!
//! A focal plane is a set of named rafts, each a set of named detectors,
//! each with a coarse temperature map measured on a regularly spaced grid.
//! Detector temperatures at fractional pixel coordinates are answered by
//! bilinear interpolation over the coarse map stretched across the detector
//! extent, with per-raft and per-detector offsets added to every sample.
//!
//! Index files are plain text, one entry per line:
//!
//! - focal plane index: `<raft-name> <raft-index-file> <offset>`
//! - raft index: `<detector-name> <temperature-grid-file> <offset>`
//!
//! File paths are used as written (relative paths resolve against the
//! process working directory).

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::debug;
use ndarray::Array2;
use thiserror::Error;

use crate::io::{self, GridIoError};

/// Detector extent in pixels when none is specified, (rows, columns).
pub const DEFAULT_DETECTOR_SHAPE: (usize, usize) = (4000, 4072);

/// Errors raised while building or querying thermal models.
#[derive(Debug, Error)]
pub enum ThermalModelError {
    #[error("i/o failure")]
    Io(#[from] std::io::Error),

    #[error("failed to load temperature grid from {path}")]
    GridLoad {
        path: PathBuf,
        #[source]
        source: GridIoError,
    },

    #[error("malformed line {line} in index file {path}: expected `<name> <file> <offset>`")]
    MalformedIndexLine { path: PathBuf, line: usize },

    #[error("temperature grid must be at least 2x2, got {rows}x{cols}")]
    GridTooSmall { rows: usize, cols: usize },

    #[error("coordinate ({x}, {y}) is outside the detector extent {extent:?}")]
    OutOfBounds {
        x: f64,
        y: f64,
        extent: (usize, usize),
    },

    #[error("unknown raft {0:?}")]
    UnknownRaft(String),

    #[error("unknown detector {0:?}")]
    UnknownDetector(String),
}

/// Temperature model of one detector: a coarse regularly-spaced grid plus a
/// scalar offset, queried by bilinear interpolation.
#[derive(Debug, Clone)]
pub struct DetectorThermalModel {
    temps: Array2<f64>,
    shape: (usize, usize),
}

impl DetectorThermalModel {
    /// Build from a coarse temperature grid. The grid nodes are spread
    /// evenly over `[0, shape.0] × [0, shape.1]`, and `offset` is added to
    /// every sample.
    pub fn from_grid(
        grid: Array2<f64>,
        offset: f64,
        shape: (usize, usize),
    ) -> Result<Self, ThermalModelError> {
        let (rows, cols) = grid.dim();
        if rows < 2 || cols < 2 {
            return Err(ThermalModelError::GridTooSmall { rows, cols });
        }
        Ok(Self {
            temps: grid + offset,
            shape,
        })
    }

    /// Build from a whitespace-delimited temperature grid file.
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        offset: f64,
        shape: (usize, usize),
    ) -> Result<Self, ThermalModelError> {
        let grid = io::read_grid(&path).map_err(|source| ThermalModelError::GridLoad {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        Self::from_grid(grid, offset, shape)
    }

    /// Temperature at pixel coordinate `(x, y)` by bilinear interpolation.
    ///
    /// # Errors
    ///
    /// `ThermalModelError::OutOfBounds` if `(x, y)` lies outside
    /// `[0, shape.0] × [0, shape.1]` or is not finite.
    pub fn temperature(&self, x: f64, y: f64) -> Result<f64, ThermalModelError> {
        let (nx, ny) = self.temps.dim();
        let (extent_x, extent_y) = (self.shape.0 as f64, self.shape.1 as f64);

        if !x.is_finite() || !y.is_finite() || x < 0.0 || x > extent_x || y < 0.0 || y > extent_y {
            return Err(ThermalModelError::OutOfBounds {
                x,
                y,
                extent: self.shape,
            });
        }

        // Fractional node coordinates; the last cell absorbs the upper edge.
        let u = (x / extent_x * (nx - 1) as f64).min((nx - 1) as f64);
        let v = (y / extent_y * (ny - 1) as f64).min((ny - 1) as f64);
        let i = (u.floor() as usize).min(nx - 2);
        let j = (v.floor() as usize).min(ny - 2);
        let tu = u - i as f64;
        let tv = v - j as f64;

        let t00 = self.temps[[i, j]];
        let t10 = self.temps[[i + 1, j]];
        let t01 = self.temps[[i, j + 1]];
        let t11 = self.temps[[i + 1, j + 1]];

        let low = t00 * (1.0 - tu) + t10 * tu;
        let high = t01 * (1.0 - tu) + t11 * tu;
        Ok(low * (1.0 - tv) + high * tv)
    }
}

/// A raft: named detectors built from an index file.
#[derive(Debug, Clone)]
pub struct RaftThermalModel {
    name: String,
    detectors: HashMap<String, DetectorThermalModel>,
}

impl RaftThermalModel {
    /// Build a raft from its index file. Each detector offset is added to
    /// the raft offset.
    pub fn from_file<P: AsRef<Path>>(
        name: &str,
        index_path: P,
        raft_offset: f64,
        detector_shape: (usize, usize),
    ) -> Result<Self, ThermalModelError> {
        let mut detectors = HashMap::new();
        for entry in read_index(index_path.as_ref())? {
            let (detector_name, data_file, offset) = entry?;
            debug!("raft {name}: adding detector {detector_name} from {data_file}");
            let model =
                DetectorThermalModel::from_file(&data_file, raft_offset + offset, detector_shape)?;
            detectors.insert(detector_name, model);
        }
        Ok(Self {
            name: name.to_string(),
            detectors,
        })
    }

    /// Raft name as given in the focal plane index.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a detector model; `None` for unknown names.
    pub fn detector(&self, name: &str) -> Option<&DetectorThermalModel> {
        self.detectors.get(name)
    }

    /// Temperature of a named detector at `(x, y)`.
    pub fn temperature(&self, detector: &str, x: f64, y: f64) -> Result<f64, ThermalModelError> {
        self.detector(detector)
            .ok_or_else(|| ThermalModelError::UnknownDetector(detector.to_string()))?
            .temperature(x, y)
    }
}

/// The full focal plane: named rafts built from an index file.
#[derive(Debug, Clone)]
pub struct FocalplaneThermalModel {
    rafts: HashMap<String, RaftThermalModel>,
}

impl FocalplaneThermalModel {
    /// Build a focal plane from its index file, using
    /// [`DEFAULT_DETECTOR_SHAPE`] for every detector.
    pub fn from_file<P: AsRef<Path>>(index_path: P) -> Result<Self, ThermalModelError> {
        Self::with_detector_shape(index_path, DEFAULT_DETECTOR_SHAPE)
    }

    /// Build a focal plane with an explicit detector extent.
    pub fn with_detector_shape<P: AsRef<Path>>(
        index_path: P,
        detector_shape: (usize, usize),
    ) -> Result<Self, ThermalModelError> {
        let mut rafts = HashMap::new();
        for entry in read_index(index_path.as_ref())? {
            let (raft_name, raft_index, offset) = entry?;
            debug!("adding raft {raft_name} from {raft_index} (offset {offset})");
            let raft = RaftThermalModel::from_file(&raft_name, &raft_index, offset, detector_shape)?;
            rafts.insert(raft_name, raft);
        }
        Ok(Self { rafts })
    }

    /// Look up a raft model; `None` for unknown names.
    pub fn raft(&self, name: &str) -> Option<&RaftThermalModel> {
        self.rafts.get(name)
    }

    /// Temperature of a named detector on a named raft at `(x, y)`.
    pub fn temperature(
        &self,
        raft: &str,
        detector: &str,
        x: f64,
        y: f64,
    ) -> Result<f64, ThermalModelError> {
        self.raft(raft)
            .ok_or_else(|| ThermalModelError::UnknownRaft(raft.to_string()))?
            .temperature(detector, x, y)
    }
}

/// Parse a `<name> <file> <offset>` index file, skipping blank lines.
fn read_index(
    path: &Path,
) -> Result<impl Iterator<Item = Result<(String, String, f64), ThermalModelError>>, ThermalModelError>
{
    let reader = BufReader::new(File::open(path)?);
    let path = path.to_path_buf();
    Ok(reader
        .lines()
        .enumerate()
        .filter_map(move |(line_idx, line)| {
            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(ThermalModelError::Io(e))),
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                return None;
            }

            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            let parsed = match fields.as_slice() {
                [name, file, offset] => offset
                    .parse::<f64>()
                    .ok()
                    .map(|offset| (name.to_string(), file.to_string(), offset)),
                _ => None,
            };
            Some(parsed.ok_or_else(|| ThermalModelError::MalformedIndexLine {
                path: path.clone(),
                line: line_idx + 1,
            }))
        }))
}
