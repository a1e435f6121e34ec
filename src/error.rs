use std::path::PathBuf;

use plotters::drawing::DrawingAreaErrorKind;
use thiserror::Error;

/// Errors returned by the downsampling and silhouette routines.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read or write Parquet data: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow compute error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Matrix shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Failed to list input files: {0}")]
    Glob(#[from] glob::GlobError),

    /// File name does not carry an `x<i>_y<j>` tile identifier.
    #[error("Not a transcript tile file name: {}", .0.display())]
    InvalidTileName(PathBuf),

    #[error("Dimension mismatch: {n_samples} feature rows but {n_labels} labels")]
    DimensionMismatch { n_samples: usize, n_labels: usize },

    /// Silhouette is only defined for 2..=n_samples-1 distinct labels.
    #[error("Number of labels is {n_labels}. Valid values are 2 to n_samples - 1 ({n_samples} samples)")]
    InvalidLabelCount { n_labels: usize, n_samples: usize },

    /// NaN or infinite cell in the feature matrix.
    #[error("Feature matrix contains a non-finite value at row {row}, column {column}")]
    NonFiniteFeature { row: usize, column: usize },

    #[error("Empty input: {0}")]
    EmptyInput(&'static str),

    #[error("Silhouette scores have not been computed. Call compute_silhouette_score first")]
    NotScored,

    #[error("Plotting needs at least 2 feature columns, found {0}")]
    InsufficientFeatures(usize),

    #[error("{}: row {row}, column '{column}': {message}", path.display())]
    TableParse {
        path: PathBuf,
        row: usize,
        column: String,
        message: String,
    },

    #[error("Column '{column}' not found in {}", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("Unsupported table format (expected .csv or .parquet): {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Plotting failed: {0}")]
    Plot(String),
}

impl<E> From<DrawingAreaErrorKind<E>> for Error
where
    E: std::error::Error + Send + Sync,
{
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        Error::Plot(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
