//! Centralized error handling for my-code-base
//!
//! Every routine in the crate reports invalid input through [`CodeBaseError`]
//! instead of panicking, so callers can propagate failures with `?`.

use thiserror::Error;

/// Main error type for my-code-base operations
#[derive(Debug, Error)]
pub enum CodeBaseError {
    /// NetCDF file operation errors
    #[error("NetCDF error: {0}")]
    NetCDFError(#[from] netcdf::Error),

    /// I/O operation errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Array shape or dimension error
    #[error("Array error: {0}")]
    ArrayError(#[from] ndarray::ShapeError),

    /// JSON serialisation errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Malformed colormap XML
    #[error("XML error: {0}")]
    XmlError(#[from] roxmltree::Error),

    /// Variable not found in NetCDF file
    #[error("Variable '{var}' not found in file")]
    VariableNotFound { var: String },

    /// Dimension not found in variable
    #[error("Dimension '{dim}' not found in variable '{var}'")]
    DimensionNotFound { var: String, dim: String },

    /// Values whose magnitude does not match any supported unit
    #[error("Unit error: {0}")]
    UnitError(String),

    /// Inputs of a formula that do not fit together
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Matrix that cannot be inverted because it is not square
    #[error("Cannot invert non-quadratic object of shape {rows}x{cols}")]
    NonSquareMatrix { rows: usize, cols: usize },

    /// Matrix without an inverse
    #[error("Matrix is singular")]
    SingularMatrix,

    /// Malformed colormap definition
    #[error("Invalid colormap: {0}")]
    InvalidColormap(String),

    /// Ensemble key template or member key errors
    #[error("Ensemble error: {0}")]
    EnsembleError(String),

    /// Calendar and CF time decoding errors
    #[error("Time decoding error: {0}")]
    TimeError(String),

    /// Statistics computation errors
    #[error("Statistics computation error: {0}")]
    StatisticsError(String),

    /// Thread pool configuration error
    #[error("Thread pool error: {0}")]
    ThreadPoolError(String),
}

/// Result type alias for my-code-base operations
pub type Result<T> = std::result::Result<T, CodeBaseError>;
