//! A single raster band: samples, nodata sentinel and resolved pixel type.

use crate::error::{Error, Result};
use crate::raster::PixelType;

const BAND_FLAG_HAS_NODATA: u8 = 1 << 6;

/// One band of samples in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    data: Vec<f64>,
    nodata: Option<f64>,
    pixel_type: PixelType,
}

impl Band {
    /// Create a band, resolving the smallest pixel type for `data` and `nodata`.
    ///
    /// # Errors
    /// Returns [`Error::ValueOutOfRange`] if no pixel type can hold the values.
    pub fn new(data: Vec<f64>, nodata: Option<f64>) -> Result<Self> {
        let pixel_type = PixelType::resolve(&data, nodata)?;
        Ok(Self {
            data,
            nodata,
            pixel_type,
        })
    }

    /// Create a band with a caller-chosen pixel type.
    ///
    /// # Errors
    /// Returns [`Error::ValueOutOfRange`] if any value or the nodata sentinel
    /// is not representable in `pixel_type`.
    pub fn with_pixel_type(data: Vec<f64>, nodata: Option<f64>, pixel_type: PixelType) -> Result<Self> {
        if let Some(bad) = data
            .iter()
            .chain(nodata.iter())
            .copied()
            .find(|&v| !pixel_type.covers(v))
        {
            return Err(Error::ValueOutOfRange { min: bad, max: bad });
        }
        Ok(Self {
            data,
            nodata,
            pixel_type,
        })
    }

    #[must_use]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    #[must_use]
    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    #[must_use]
    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    /// Number of samples
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Band header byte.
    ///
    /// Bits 0-3 hold the pixel type code and bit 6 the has-nodata flag. The
    /// reserved bit 4, the all-nodata bit 5 and the out-of-db bit 7 are always clear.
    #[must_use]
    pub fn flags(&self) -> u8 {
        let mut flags = self.pixel_type.code() & 0x0f;
        if self.nodata.is_some() {
            flags |= BAND_FLAG_HAS_NODATA;
        }
        flags
    }

    /// Bytes this band occupies on the wire.
    pub(crate) fn encoded_len(&self) -> usize {
        1 + self.pixel_type.size_bytes() * (1 + self.data.len())
    }

    /// Append the header byte, nodata value (0 when unset) and every sample.
    pub(crate) fn write(&self, buf: &mut Vec<u8>) {
        buf.push(self.flags());
        self.pixel_type.write_sample(self.nodata.unwrap_or(0.0), buf);
        for &value in &self.data {
            self.pixel_type.write_sample(value, buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_resolves_pixel_type() {
        let band = Band::new(vec![0.0, 1.0, 2.0, 3.0], Some(0.0)).unwrap();
        assert_eq!(band.pixel_type(), PixelType::UInt8);
        assert_eq!(band.len(), 4);
    }

    #[test]
    fn test_new_out_of_range() {
        let result = Band::new(vec![0.0, f64::INFINITY], None);
        assert!(matches!(result, Err(Error::ValueOutOfRange { .. })));
    }

    #[test]
    fn test_with_pixel_type_widens() {
        let band = Band::with_pixel_type(vec![1.0, 2.0], None, PixelType::Float64).unwrap();
        assert_eq!(band.pixel_type(), PixelType::Float64);
    }

    #[test]
    fn test_with_pixel_type_rejects_uncovered_nodata() {
        let result = Band::with_pixel_type(vec![1.0, 2.0], Some(-9999.0), PixelType::UInt8);
        assert_eq!(result, Err(Error::ValueOutOfRange { min: -9999.0, max: -9999.0 }));
    }

    #[test]
    fn test_flags() {
        let plain = Band::new(vec![0.0; 4], None).unwrap();
        assert_eq!(plain.flags(), 4);

        let with_nodata = Band::new(vec![0.0; 4], Some(255.0)).unwrap();
        assert_eq!(with_nodata.flags(), 4 | 0x40);

        let float = Band::new(vec![0.5], Some(-1.0)).unwrap();
        assert_eq!(float.flags(), 10 | 0x40);
    }

    #[test]
    fn test_write_without_nodata_writes_zero() {
        let band = Band::new(vec![7.0, 8.0], None).unwrap();
        let mut buf = Vec::new();
        band.write(&mut buf);
        assert_eq!(buf, vec![4, 0, 7, 8]);
        assert_eq!(buf.len(), band.encoded_len());
    }

    #[test]
    fn test_write_int16_nodata() {
        let band = Band::new(vec![1.0, 2.0], Some(-9999.0)).unwrap();
        let mut buf = Vec::new();
        band.write(&mut buf);

        let mut expected = vec![5 | 0x40];
        expected.extend_from_slice(&(-9999i16).to_le_bytes());
        expected.extend_from_slice(&1i16.to_le_bytes());
        expected.extend_from_slice(&2i16.to_le_bytes());
        assert_eq!(buf, expected);
    }
}
