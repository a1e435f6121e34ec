//! Spatial-transcriptomics benchmarking utilities.
//!
//! - [`downsample`]: seeded 50% row subsampling of per-tile transcript Parquet tables.
//! - [`silhouette`] / [`silhouette_plot`]: silhouette coefficients for a clustering and
//!   the two-panel diagnostic figure.

use std::fs::File;
use std::io::{BufWriter, Write};

pub mod analyze;
pub mod colormap;
pub mod downsample;
pub mod error;
pub mod progress;
pub mod silhouette;
pub mod silhouette_plot;
pub mod table;

pub use error::{Error, Result};
pub use silhouette::{SilhouetteAnalyzer, SilhouetteScores, SilhouetteState};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run log: timestamped lines in a file, plus a single overwritable status line on stdout.
pub struct Logger {
    writer: BufWriter<File>,
    last_progress: String,
}

impl Logger {
    pub fn new(file: File) -> Self {
        Self {
            writer: BufWriter::new(file),
            last_progress: String::new(),
        }
    }

    pub fn log(&mut self, message: &str) -> std::io::Result<()> {
        let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(self.writer, "[{}] {}", timestamp, message)?;
        self.writer.flush()
    }

    /// Replace the current status line.
    pub fn progress(&mut self, message: &str) -> std::io::Result<()> {
        if !self.last_progress.is_empty() {
            print!("\r{}", " ".repeat(self.last_progress.len()));
        }
        print!("\r{}", message);
        std::io::stdout().flush()?;
        self.last_progress = message.to_string();
        Ok(())
    }

    pub fn finish_progress(&mut self) -> std::io::Result<()> {
        if !self.last_progress.is_empty() {
            println!();
            self.last_progress.clear();
        }
        Ok(())
    }

    pub fn log_and_progress(&mut self, message: &str) -> std::io::Result<()> {
        self.log(message)?;
        self.progress(message)
    }
}
