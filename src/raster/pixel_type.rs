//! Pixel storage kinds and the smallest-kind resolver.
//!
//! The kinds are the eight fixed-width sample representations of the database
//! raster type. The order in which they are tried for a sample set lives in the
//! `*_CANDIDATES` tables below, so narrower kinds always win over wider ones.

use std::fmt;

use tracing::debug;

use crate::casting::is_integral;
use crate::error::{Error, Result};

/// Binary representation of one raster sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
    Float64,
}

const FLOAT_CANDIDATES: [PixelType; 2] = [PixelType::Float32, PixelType::Float64];

const SIGNED_CANDIDATES: [PixelType; 5] = [
    PixelType::Int8,
    PixelType::Int16,
    PixelType::Int32,
    PixelType::Float32,
    PixelType::Float64,
];

const UNSIGNED_CANDIDATES: [PixelType; 5] = [
    PixelType::UInt8,
    PixelType::UInt16,
    PixelType::UInt32,
    PixelType::Float32,
    PixelType::Float64,
];

// The database clamps float32 to the C FLT_MAX literal rather than f32::MAX.
const FLOAT32_LIMIT: f64 = 3.402_823_466e38;

impl PixelType {
    /// Pick the smallest kind that holds every value and the nodata sentinel.
    ///
    /// Integer kinds are only considered when every value is integral. The
    /// 32-bit integer kinds are skipped when the span needs both the unsigned
    /// upper range and negative values, or lies beyond either of them.
    ///
    /// # Errors
    /// Returns [`Error::ValueOutOfRange`] if a value is not finite or no kind covers the span.
    pub fn resolve(values: &[f64], nodata: Option<f64>) -> Result<Self> {
        let mut needs_float = false;
        let mut span: Option<(f64, f64)> = None;

        for &value in values.iter().chain(nodata.iter()) {
            if !value.is_finite() {
                return Err(Error::ValueOutOfRange { min: value, max: value });
            }
            if !is_integral(value) {
                needs_float = true;
            }
            span = Some(match span {
                Some((lo, hi)) => (lo.min(value), hi.max(value)),
                None => (value, value),
            });
        }

        let (val_min, val_max) = span.unwrap_or((0.0, 0.0));

        let (i32_min, i32_max) = PixelType::Int32.range();
        let (_, u32_max) = PixelType::UInt32.range();
        if val_max > u32_max
            || (val_min < 0.0 && val_max > i32_max)
            || val_min < i32_min
        {
            needs_float = true;
        }

        let candidates: &[PixelType] = if needs_float {
            &FLOAT_CANDIDATES
        } else if val_min < 0.0 {
            &SIGNED_CANDIDATES
        } else {
            &UNSIGNED_CANDIDATES
        };

        let resolved = candidates
            .iter()
            .copied()
            .find(|kind| kind.contains(val_min) && kind.contains(val_max))
            .ok_or(Error::ValueOutOfRange { min: val_min, max: val_max })?;

        debug!(
            pixel_type = %resolved,
            min = val_min,
            max = val_max,
            samples = values.len(),
            "resolved pixel type"
        );
        Ok(resolved)
    }

    /// Inclusive value range of the kind
    #[must_use]
    pub fn range(self) -> (f64, f64) {
        match self {
            PixelType::Int8 => (f64::from(i8::MIN), f64::from(i8::MAX)),
            PixelType::UInt8 => (0.0, f64::from(u8::MAX)),
            PixelType::Int16 => (f64::from(i16::MIN), f64::from(i16::MAX)),
            PixelType::UInt16 => (0.0, f64::from(u16::MAX)),
            PixelType::Int32 => (f64::from(i32::MIN), f64::from(i32::MAX)),
            PixelType::UInt32 => (0.0, f64::from(u32::MAX)),
            PixelType::Float32 => (-FLOAT32_LIMIT, FLOAT32_LIMIT),
            PixelType::Float64 => (f64::MIN, f64::MAX),
        }
    }

    /// Database pixel type code, stored in the low four bits of the band header
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            PixelType::Int8 => 3,
            PixelType::UInt8 => 4,
            PixelType::Int16 => 5,
            PixelType::UInt16 => 6,
            PixelType::Int32 => 7,
            PixelType::UInt32 => 8,
            PixelType::Float32 => 10,
            PixelType::Float64 => 11,
        }
    }

    /// Size of one sample in bytes
    #[must_use]
    pub fn size_bytes(self) -> usize {
        match self {
            PixelType::Int8 | PixelType::UInt8 => 1,
            PixelType::Int16 | PixelType::UInt16 => 2,
            PixelType::Int32 | PixelType::UInt32 | PixelType::Float32 => 4,
            PixelType::Float64 => 8,
        }
    }

    #[must_use]
    pub fn is_float(self) -> bool {
        matches!(self, PixelType::Float32 | PixelType::Float64)
    }

    /// Whether `value` lies inside the kind's inclusive range.
    #[must_use]
    pub fn contains(self, value: f64) -> bool {
        let (lo, hi) = self.range();
        value >= lo && value <= hi
    }

    /// Whether the kind stores `value` without loss of range or integrality.
    #[must_use]
    pub fn covers(self, value: f64) -> bool {
        value.is_finite() && self.contains(value) && (self.is_float() || is_integral(value))
    }

    /// Append `value` in this kind, little-endian.
    ///
    /// `value` must satisfy [`Self::covers`]; resolution guarantees this for every band sample.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn write_sample(self, value: f64, buf: &mut Vec<u8>) {
        match self {
            PixelType::Int8 => buf.extend_from_slice(&(value as i8).to_le_bytes()),
            PixelType::UInt8 => buf.push(value as u8),
            PixelType::Int16 => buf.extend_from_slice(&(value as i16).to_le_bytes()),
            PixelType::UInt16 => buf.extend_from_slice(&(value as u16).to_le_bytes()),
            PixelType::Int32 => buf.extend_from_slice(&(value as i32).to_le_bytes()),
            PixelType::UInt32 => buf.extend_from_slice(&(value as u32).to_le_bytes()),
            PixelType::Float32 => buf.extend_from_slice(&(value as f32).to_le_bytes()),
            PixelType::Float64 => buf.extend_from_slice(&value.to_le_bytes()),
        }
    }
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PixelType::Int8 => "8BSI",
            PixelType::UInt8 => "8BUI",
            PixelType::Int16 => "16BSI",
            PixelType::UInt16 => "16BUI",
            PixelType::Int32 => "32BSI",
            PixelType::UInt32 => "32BUI",
            PixelType::Float32 => "32BF",
            PixelType::Float64 => "64BF",
        };
        f.write_str(name)
    }
}
