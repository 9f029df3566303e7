//! In-memory rasters and the binary raster wire format.
//!
//! A [`Raster`] is a georeferenced stack of [`Band`]s. It serializes to the
//! database's binary raster layout, every field little-endian:
//!
//! | offset | field | type |
//! |---|---|---|
//! | 0 | endianness flag (1) | `u8` |
//! | 1 | version (0) | `u16` |
//! | 3 | band count | `u16` |
//! | 5 | scale x, scale y | 2 × `f64` |
//! | 21 | upper-left x, y | 2 × `f64` |
//! | 37 | skew x, y | 2 × `f64` |
//! | 53 | SRID (0 = none) | `i32` |
//! | 57 | width, height | 2 × `u16` |
//! | 61 | bands | header byte, nodata, samples |
//!
//! # Example
//!
//! ```rust
//! use geofdw::{Band, BoundingBox, Raster};
//!
//! # fn main() -> geofdw::Result<()> {
//! let band = Band::new(vec![0.0, 1.0, 2.0, 3.0], Some(0.0))?;
//! let raster = Raster::new(BoundingBox::new(0.0, 0.0, 2.0, 2.0), 2, 2, vec![band])?
//!     .with_srid(4326);
//!
//! let bytes = raster.to_bytes();
//! assert_eq!(bytes.len(), raster.encoded_len());
//! # Ok(())
//! # }
//! ```

pub mod band;
pub mod pixel_type;

pub use band::Band;
pub use pixel_type::PixelType;

use tracing::debug;

use crate::casting::usize_to_u16;
use crate::error::{Error, Result};
use crate::geometry::BoundingBox;
use crate::hex;

const WIRE_LITTLE_ENDIAN: u8 = 1;
const WIRE_VERSION: u16 = 0;

/// Size of the fixed raster header in bytes
pub const HEADER_LEN: usize = 61;

/// A georeferenced raster with one or more bands.
///
/// The pixel scale is derived from the bounding box and the dimensions on
/// every read, so the two can never disagree.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    bbox: BoundingBox,
    width: u16,
    height: u16,
    skew_x: f64,
    skew_y: f64,
    srid: Option<i32>,
    bands: Vec<Band>,
}

impl Raster {
    /// Create a raster covering `bbox` with `width` × `height` pixels.
    ///
    /// # Errors
    /// Returns [`Error::InvalidRaster`] if there are no bands, a dimension is
    /// zero or larger than 65535, there are more than 65535 bands, or a band's
    /// sample count differs from `width * height`.
    pub fn new(bbox: BoundingBox, width: usize, height: usize, bands: Vec<Band>) -> Result<Self> {
        if bands.is_empty() {
            return Err(Error::InvalidRaster("raster needs at least one band".to_string()));
        }
        if width == 0 || height == 0 {
            return Err(Error::InvalidRaster(format!(
                "raster dimensions must be positive, got {width}x{height}"
            )));
        }
        let wire_width = usize_to_u16(width, "width")?;
        let wire_height = usize_to_u16(height, "height")?;
        usize_to_u16(bands.len(), "band count")?;

        let expected = width * height;
        if let Some((index, band)) = bands.iter().enumerate().find(|(_, b)| b.len() != expected) {
            return Err(Error::InvalidRaster(format!(
                "band {index} has {} samples, expected {expected} ({width}x{height})",
                band.len()
            )));
        }

        Ok(Self {
            bbox,
            width: wire_width,
            height: wire_height,
            skew_x: 0.0,
            skew_y: 0.0,
            srid: None,
            bands,
        })
    }

    /// Set the SRID; 0 clears it.
    #[must_use]
    pub fn with_srid(mut self, srid: i32) -> Self {
        self.srid = Some(srid).filter(|&s| s != 0);
        self
    }

    /// Set the rotation terms of the geotransform
    #[must_use]
    pub fn with_skew(mut self, skew_x: f64, skew_y: f64) -> Self {
        self.skew_x = skew_x;
        self.skew_y = skew_y;
        self
    }

    #[must_use]
    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    #[must_use]
    pub fn width(&self) -> usize {
        usize::from(self.width)
    }

    #[must_use]
    pub fn height(&self) -> usize {
        usize::from(self.height)
    }

    #[must_use]
    pub fn srid(&self) -> Option<i32> {
        self.srid
    }

    #[must_use]
    pub fn skew(&self) -> (f64, f64) {
        (self.skew_x, self.skew_y)
    }

    #[must_use]
    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    /// Pixel width in CRS units: `(maxx - minx) / width`
    #[must_use]
    pub fn scale_x(&self) -> f64 {
        (self.bbox.maxx - self.bbox.minx) / f64::from(self.width)
    }

    /// Pixel height in CRS units: `(maxy - miny) / height`
    #[must_use]
    pub fn scale_y(&self) -> f64 {
        (self.bbox.maxy - self.bbox.miny) / f64::from(self.height)
    }

    /// Upper-left corner (minx, maxy)
    #[must_use]
    pub fn upper_left(&self) -> (f64, f64) {
        (self.bbox.minx, self.bbox.maxy)
    }

    /// Total serialized size in bytes
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.bands.iter().map(Band::encoded_len).sum::<usize>()
    }

    /// Serialize to the binary raster wire format.
    ///
    /// Output is deterministic: the same raster always yields the same bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        let (ul_x, ul_y) = self.upper_left();

        buf.push(WIRE_LITTLE_ENDIAN);
        buf.extend_from_slice(&WIRE_VERSION.to_le_bytes());
        // band count was range-checked in new()
        #[allow(clippy::cast_possible_truncation)]
        let band_count = self.bands.len() as u16;
        buf.extend_from_slice(&band_count.to_le_bytes());
        for value in [self.scale_x(), self.scale_y(), ul_x, ul_y, self.skew_x, self.skew_y] {
            buf.extend_from_slice(&value.to_le_bytes());
        }
        buf.extend_from_slice(&self.srid.unwrap_or(0).to_le_bytes());
        buf.extend_from_slice(&self.width.to_le_bytes());
        buf.extend_from_slice(&self.height.to_le_bytes());

        for band in &self.bands {
            band.write(&mut buf);
        }

        debug!(
            width = self.width,
            height = self.height,
            bands = self.bands.len(),
            srid = self.srid.unwrap_or(0),
            bytes = buf.len(),
            "serialized raster"
        );
        buf
    }

    /// [`Self::to_bytes`] as upper-case hex text, the input form the database accepts.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode_upper(&self.to_bytes())
    }
}
