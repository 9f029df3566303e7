//! Error types shared by the geometry, raster and grid layers.
//!
//! Every fallible operation in the crate returns [`Result`]. Errors are raised
//! at the point of construction or parsing; no partially built value is ever
//! handed back to the caller.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or converting geometry and raster values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The input did not decode to a usable shape (bad WKB, bad WKT, bad SRID prefix).
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// No pixel type can hold the value range.
    #[error("Data range ({min}, {max}) out of bounds")]
    ValueOutOfRange { min: f64, max: f64 },

    /// The ASCII grid text is malformed.
    #[error("ArcGrid parse error: {0}")]
    GridParse(#[from] GridParseError),

    /// The raster is structurally unusable (no bands, wrong sample count, oversized).
    #[error("Invalid raster: {0}")]
    InvalidRaster(String),

    /// A CRS string or SRID could not be resolved.
    #[error("Bad CRS value of {0}")]
    InvalidCrs(String),

    /// Coordinate transformation failed.
    #[error("Projection error: {0}")]
    Projection(String),

    /// A request body could not be written.
    #[error("XML write error: {0}")]
    Xml(String),
}

/// Failure modes of the ESRI ASCII grid parser.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridParseError {
    /// A required header key never appeared.
    #[error("missing header key '{0}'")]
    MissingHeader(&'static str),

    /// A header value did not parse as the expected number type.
    #[error("invalid value '{value}' for header key '{key}'")]
    InvalidHeader { key: String, value: String },

    /// A header line named a key the format does not define.
    #[error("unknown header key '{0}'")]
    UnknownHeaderKey(String),

    /// A data row held the wrong number of values.
    #[error("row {row}: expected {expected} columns, found {found}")]
    ColumnCount {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// The number of data rows did not match `nrows`.
    #[error("expected {expected} rows, found {found}")]
    RowCount { expected: usize, found: usize },

    /// A data token was not a number.
    #[error("row {row}: invalid value '{token}'")]
    InvalidValue { row: usize, token: String },
}
