//! Delimited-text grid I/O.
//!
//! The formats here are deliberately plain: whitespace-separated floats for
//! 2D grids (image-derived spectra, reference normalization datasets,
//! detector temperature maps), and tab-separated `x y z` triples for
//! exported cloud quadrants.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use ndarray::Array2;
use thiserror::Error;

/// Errors raised while reading or writing grid files.
#[derive(Debug, Error)]
pub enum GridIoError {
    #[error("i/o failure")]
    Io(#[from] std::io::Error),

    #[error("unparsable value {value:?} at line {line}, column {column}")]
    BadValue {
        value: String,
        line: usize,
        column: usize,
    },

    #[error("ragged grid: line {line} has {found} values, expected {expected}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("grid file holds no data rows")]
    Empty,
}

/// Read a 2D grid of whitespace-separated floats, one grid row per line.
///
/// Blank lines are skipped. Every data row must hold the same number of
/// values as the first; a ragged or empty file is an error, as is any token
/// that does not parse as a float (reported with its line and column).
pub fn read_grid<P: AsRef<Path>>(path: P) -> Result<Array2<f64>, GridIoError> {
    let reader = BufReader::new(File::open(path)?);

    let mut values = Vec::new();
    let mut rows = 0usize;
    let mut cols = 0usize;

    for (line_idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let mut row_len = 0usize;
        for (col_idx, token) in trimmed.split_whitespace().enumerate() {
            let value = token.parse::<f64>().map_err(|_| GridIoError::BadValue {
                value: token.to_string(),
                line: line_idx + 1,
                column: col_idx + 1,
            })?;
            values.push(value);
            row_len += 1;
        }

        if rows == 0 {
            cols = row_len;
        } else if row_len != cols {
            return Err(GridIoError::RaggedRow {
                line: line_idx + 1,
                expected: cols,
                found: row_len,
            });
        }
        rows += 1;
    }

    if rows == 0 {
        return Err(GridIoError::Empty);
    }

    // Shape is consistent by construction above.
    Ok(Array2::from_shape_vec((rows, cols), values)
        .unwrap_or_else(|_| unreachable!("row length validated per line")))
}

/// Write `(x, y, z)` triples as tab-separated text, one line per cell, in
/// iterator order. Returns the number of lines written.
pub fn write_quadrant<P, I>(path: P, triples: I) -> Result<usize, GridIoError>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = (f64, f64, f64)>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    let mut lines = 0usize;
    for (x, y, z) in triples {
        writeln!(writer, "{x}\t{y}\t{z}")?;
        lines += 1;
    }
    writer.flush()?;
    Ok(lines)
}
