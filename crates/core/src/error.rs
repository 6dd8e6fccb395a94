//! Error types for priocomp

use thiserror::Error;

/// Main error type for priocomp operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// Feature rasters of one stack differ in shape or CRS
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Rasters to be compared or reconciled do not share shape, cell size or CRS
    #[error("Geometry mismatch: {0}")]
    GeometryMismatch(String),

    /// A normalization denominator (range, sum, sd, IQR) is zero or the input has no valid cells
    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An artifact name could not be mapped to a method and feature set
    #[error("Cannot classify '{name}': {reason}")]
    Classification { name: String, reason: String },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    /// Failure of a unit of work (file, method pair) with that unit named
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap this error with the name of the unit of work it belongs to.
    pub fn context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping any context layers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Attach unit-of-work context to a `Result`.
pub trait ResultExt<T> {
    fn in_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for Result<T> {
    fn in_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| e.context(f()))
    }
}

/// Result type alias for priocomp operations
pub type Result<T> = std::result::Result<T, Error>;
