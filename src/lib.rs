#![doc = include_str!("../README.md")]
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`geometry`]: [`Geometry`] values with an optional SRID, WKB/EWKB/WKT/EWKT codecs
//! - [`geometry::projection`]: CRS parsing and reprojection
//! - [`raster`]: [`Raster`], [`Band`] and [`PixelType`], serialized to the database raster format
//! - [`arcgrid`]: ESRI ASCII grid parsing via [`ArcGrid`]
//! - [`wcs`]: WCS `GetCoverage` request bodies and response decoding
//! - [`error`]: the crate-wide [`Error`] type

// ============================================================================
// Public modules
// ============================================================================

pub mod arcgrid;
pub mod casting;
pub mod error;
pub mod geometry;
pub mod raster;
pub mod wcs;

mod hex;

// ============================================================================
// Geometry
// ============================================================================

pub use geometry::{
    BoundingBox,
    Geometry,
    Shape,
};

// ============================================================================
// Projections
// ============================================================================

pub use geometry::projection::{
    crs_to_srid,
    is_geographic,
    project_bounds,
    project_point,
    proj_string,
};

// ============================================================================
// Rasters
// ============================================================================
// Primary API: Raster::new(bbox, width, height, bands)?.with_srid(...).to_bytes()

pub use raster::{
    Band,
    PixelType,
    Raster,
};

// ============================================================================
// Grid Sources
// ============================================================================

pub use arcgrid::ArcGrid;
pub use wcs::GetCoverage;

// ============================================================================
// Errors
// ============================================================================

pub use error::{
    Error,
    GridParseError,
    Result,
};
