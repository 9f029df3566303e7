//! Checked numeric conversions for the raster wire format.
//!
//! This module documents our assumptions about numeric ranges when grid data
//! is packed into the fixed-width fields of the binary raster format.
//!
//! # Assumptions
//!
//! ## Dimensions and band counts (`usize` → `u16`)
//! The wire header stores width, height and band count as `u16`. Anything
//! larger cannot be represented and is rejected when the raster is built.
//!
//! ## Samples (`f64` → pixel kind)
//! Samples are parsed as `f64`. Narrowing to an integer kind happens only after
//! the resolver has proven every value is integral and inside the kind's range,
//! so the `as` casts in [`crate::raster::PixelType::write_sample`] never truncate.
//!
//! ## Element counts (`usize` → `u32`)
//! WKB stores coordinate, ring and member counts as `u32`. Geometries with more
//! than 2^32 members do not occur in practice and are written with a plain cast.

use std::convert::TryFrom;

use crate::error::{Error, Result};

/// Convert a `usize` to a `u16` header field, failing on overflow.
///
/// # Errors
/// Returns [`Error::InvalidRaster`] naming `field` if the value exceeds `u16::MAX`.
#[inline]
pub fn usize_to_u16(value: usize, field: &str) -> Result<u16> {
    u16::try_from(value)
        .map_err(|_| Error::InvalidRaster(format!("{field} {value} exceeds u16 maximum (65535)")))
}

/// Convert a collection length to a WKB count.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn len_to_u32(len: usize) -> u32 {
    len as u32
}

/// Whether a finite value has no fractional part.
#[inline]
#[must_use]
pub fn is_integral(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0
}
