//! Pixel sinks for colorized grid output.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Receives one colored pixel per owned point.
pub trait PixelSink {
    fn set(&mut self, column: usize, row: usize, r: f64, g: f64, b: f64);
}

/// In-memory RGB image, one row per recorded step.
///
/// Grows on demand; unset pixels are black.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Canvas {
    rows: Vec<Vec<[f64; 3]>>,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Widest row so far.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, column: usize, row: usize) -> Option<[f64; 3]> {
        self.rows.get(row)?.get(column).copied()
    }

    /// Write as JSON.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, self).map_err(io::Error::other)?;
        writer.flush()
    }

    /// Load from JSON.
    pub fn read_json<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl PixelSink for Canvas {
    fn set(&mut self, column: usize, row: usize, r: f64, g: f64, b: f64) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= column {
            cells.resize(column + 1, [0.0; 3]);
        }
        cells[column] = [r, g, b];
    }
}

/// Per-rank output path: the rank number is appended to the file stem.
pub fn rank_path(prefix: &Path, rank: usize) -> PathBuf {
    let mut name = prefix.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!("{rank}.json"));
    prefix.with_file_name(name)
}
