//! ESRI ASCII grid (ArcGrid) parsing.
//!
//! An ArcGrid is a keyed header followed by `nrows` lines of `ncols`
//! whitespace-separated numbers:
//!
//! ```text
//! ncols        4
//! nrows        2
//! xllcorner    0.0
//! yllcorner    0.0
//! cellsize     0.5
//! NODATA_value -9999
//! 1 2 3 4
//! 5 6 7 -9999
//! ```
//!
//! Header keys are case-insensitive and `NODATA_value` is optional. The text
//! carries no CRS, so the SRID is supplied by the caller.
//!
//! # Example
//!
//! ```rust
//! use geofdw::{ArcGrid, BoundingBox};
//!
//! # fn main() -> geofdw::Result<()> {
//! let text = "ncols 2\nnrows 1\nxllcorner 0\nyllcorner 0\ncellsize 1\n3 4\n";
//! let grid = ArcGrid::parse(text)?.with_srid(4326);
//! let raster = grid.to_raster(grid.extent(), None)?;
//!
//! assert_eq!((raster.width(), raster.height()), (2, 1));
//! assert_eq!(raster.srid(), Some(4326));
//! # Ok(())
//! # }
//! ```

use std::str::FromStr;

use tracing::{debug, trace, warn};

use crate::error::{GridParseError, Result};
use crate::geometry::BoundingBox;
use crate::raster::{Band, Raster};

/// A parsed ASCII grid: header values plus the row-major sample matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct ArcGrid {
    /// Number of columns
    pub ncols: usize,
    /// Number of rows
    pub nrows: usize,
    /// X of the lower-left corner of the lower-left cell
    pub xllcorner: f64,
    /// Y of the lower-left corner of the lower-left cell
    pub yllcorner: f64,
    /// Cell edge length in CRS units
    pub cellsize: f64,
    /// Nodata sentinel, if the header declared one
    pub nodata: Option<f64>,
    /// `ncols * nrows` samples, row-major from the top row
    pub data: Vec<f64>,
    /// SRID supplied by the caller
    pub srid: Option<i32>,
}

/// Where the header anchors the lower-left cell.
#[derive(Debug, Clone, Copy)]
enum Registration {
    Corner(f64),
    Center(f64),
}

#[derive(Debug, Default)]
struct Header {
    ncols: Option<usize>,
    nrows: Option<usize>,
    x: Option<Registration>,
    y: Option<Registration>,
    cellsize: Option<f64>,
    nodata: Option<f64>,
}

impl Header {
    fn set(&mut self, key: &str, value: &str) -> std::result::Result<(), GridParseError> {
        match key.to_ascii_lowercase().as_str() {
            "ncols" => self.ncols = Some(parse_header(key, value)?),
            "nrows" => self.nrows = Some(parse_header(key, value)?),
            "xllcorner" => self.x = Some(Registration::Corner(parse_header(key, value)?)),
            "yllcorner" => self.y = Some(Registration::Corner(parse_header(key, value)?)),
            "xllcenter" => self.x = Some(Registration::Center(parse_header(key, value)?)),
            "yllcenter" => self.y = Some(Registration::Center(parse_header(key, value)?)),
            "cellsize" => self.cellsize = Some(parse_header(key, value)?),
            "nodata_value" => self.nodata = Some(parse_header(key, value)?),
            _ => return Err(GridParseError::UnknownHeaderKey(key.to_string())),
        }
        Ok(())
    }
}

fn parse_header<T: FromStr>(key: &str, value: &str) -> std::result::Result<T, GridParseError> {
    value.parse().map_err(|_| GridParseError::InvalidHeader {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Convert a cell-center coordinate to the matching corner coordinate.
fn to_corner(registration: Registration, cellsize: f64) -> f64 {
    match registration {
        Registration::Corner(v) => v,
        Registration::Center(v) => v - cellsize / 2.0,
    }
}

impl ArcGrid {
    /// Parse ArcGrid text.
    ///
    /// Blank lines are ignored. A line whose first token is a number ends the
    /// header; from there exactly `nrows` rows of `ncols` numbers must follow.
    ///
    /// # Errors
    /// Returns [`crate::Error::GridParse`] on a missing or malformed header
    /// value, an unknown header key, a row with the wrong number of columns
    /// (reported immediately, later rows are not read), a non-numeric
    /// sample, or a row count different from `nrows`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().filter(|line| !line.trim().is_empty()).peekable();

        let mut header = Header::default();
        while let Some(line) = lines.peek() {
            let mut tokens = line.split_whitespace();
            let Some(key) = tokens.next() else { break };
            if key.parse::<f64>().is_ok() {
                break;
            }
            let value = tokens.next().unwrap_or_default();
            header.set(key, value)?;
            lines.next();
        }

        let ncols = header.ncols.ok_or(GridParseError::MissingHeader("ncols"))?;
        let nrows = header.nrows.ok_or(GridParseError::MissingHeader("nrows"))?;
        let cellsize = header.cellsize.ok_or(GridParseError::MissingHeader("cellsize"))?;
        let x = header.x.ok_or(GridParseError::MissingHeader("xllcorner"))?;
        let y = header.y.ok_or(GridParseError::MissingHeader("yllcorner"))?;
        if matches!(x, Registration::Center(_)) || matches!(y, Registration::Center(_)) {
            warn!("ArcGrid header uses cell-center registration, converting to corners");
        }

        debug!(ncols, nrows, cellsize, nodata = ?header.nodata, "parsed ArcGrid header");

        let mut data = Vec::with_capacity(ncols.saturating_mul(nrows));
        let mut rows_read = 0;
        while let Some(line) = lines.next() {
            if rows_read == nrows {
                return Err(GridParseError::RowCount {
                    expected: nrows,
                    found: nrows + 1 + lines.count(),
                }
                .into());
            }

            let row_start = data.len();
            for token in line.split_whitespace() {
                let value = token.parse::<f64>().map_err(|_| GridParseError::InvalidValue {
                    row: rows_read,
                    token: token.to_string(),
                })?;
                data.push(value);
            }

            let found = data.len() - row_start;
            if found != ncols {
                return Err(GridParseError::ColumnCount {
                    row: rows_read,
                    expected: ncols,
                    found,
                }
                .into());
            }

            trace!(row = rows_read, "read ArcGrid row");
            rows_read += 1;
        }

        if rows_read != nrows {
            return Err(GridParseError::RowCount {
                expected: nrows,
                found: rows_read,
            }
            .into());
        }

        Ok(Self {
            ncols,
            nrows,
            xllcorner: to_corner(x, cellsize),
            yllcorner: to_corner(y, cellsize),
            cellsize,
            nodata: header.nodata,
            data,
            srid: None,
        })
    }

    /// Attach the SRID the grid's coordinates are expressed in; 0 clears it.
    #[must_use]
    pub fn with_srid(mut self, srid: i32) -> Self {
        self.srid = Some(srid).filter(|&s| s != 0);
        self
    }

    /// Extent implied by the header: lower-left corner plus `ncols`/`nrows` cells.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn extent(&self) -> BoundingBox {
        BoundingBox::new(
            self.xllcorner,
            self.yllcorner,
            self.xllcorner + self.cellsize * self.ncols as f64,
            self.yllcorner + self.cellsize * self.nrows as f64,
        )
    }

    /// Build a single-band raster covering `bbox`.
    ///
    /// `srid` overrides the grid's own SRID when given. Skew is always zero;
    /// the format has no rotation terms.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueOutOfRange`] if no pixel type holds the
    /// samples and [`crate::Error::InvalidRaster`] if the grid is too large for
    /// the wire format or its sample count does not match the header.
    pub fn to_raster(&self, bbox: BoundingBox, srid: Option<i32>) -> Result<Raster> {
        let band = Band::new(self.data.clone(), self.nodata)?;
        let raster = Raster::new(bbox, self.ncols, self.nrows, vec![band])?;
        Ok(match srid.or(self.srid) {
            Some(srid) => raster.with_srid(srid),
            None => raster,
        })
    }
}
