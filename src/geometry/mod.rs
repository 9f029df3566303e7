//! Geometry values carrying their own SRID.
//!
//! A [`Geometry`] wraps a `geo-types` shape together with an optional SRID and
//! converts between the interchange formats the database speaks: WKB/EWKB
//! (binary or hex), WKT and EWKT (`SRID=<n>;<WKT>`).
//!
//! The SRID is a plain field on each value. Whether written WKB carries the
//! EWKB SRID marker is decided per value from that field, so two values with
//! different SRIDs can be serialized side by side from different threads.
//!
//! # Example
//!
//! ```rust
//! use geofdw::Geometry;
//!
//! # fn main() -> geofdw::Result<()> {
//! let a = Geometry::from_ewkt("SRID=4326;LINESTRING (0 0, 1 1)")?;
//! let b = Geometry::from_wkb("0102000020E61000000200000000000000000000000000000000000000000000000000F03F000000000000F03F", None)?;
//!
//! assert!(a.equals(&b, true));
//! assert_eq!(b.srid(), Some(4326));
//! assert!(a.as_ewkt().starts_with("SRID=4326;LINESTRING"));
//! # Ok(())
//! # }
//! ```

pub mod ewkb;
pub mod projection;

use std::fmt;
use std::str::FromStr;

use geo::BoundingRect;
use geo_traits::to_geo::ToGeoGeometry;
use tracing::trace;
use wkt::{ToWkt, Wkt};

use crate::error::{Error, Result};
use crate::hex;

/// The in-memory vector shape wrapped by a [`Geometry`].
pub type Shape = geo_types::Geometry<f64>;

/// Axis-aligned bounding box (minx, miny, maxx, maxy).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

impl BoundingBox {
    /// Create a new bounding box
    #[must_use]
    pub fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Self {
        Self { minx, miny, maxx, maxy }
    }

    /// Corners as (minx, miny, maxx, maxy)
    #[must_use]
    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (self.minx, self.miny, self.maxx, self.maxy)
    }
}

impl From<geo_types::Rect<f64>> for BoundingBox {
    fn from(rect: geo_types::Rect<f64>) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

/// A vector shape with an optional spatial reference identifier.
///
/// SRID 0 and "no SRID" are the same state; both are stored as `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    shape: Shape,
    srid: Option<i32>,
}

impl Geometry {
    /// Wrap an existing shape.
    ///
    /// `geo-types` shapes carry no SRID of their own, so an omitted `srid`
    /// leaves the value without one.
    ///
    /// # Errors
    /// Returns [`Error::InvalidGeometry`] if the shape is structurally broken
    /// (a one-point line string, or a polygon ring with fewer than four points).
    pub fn from_shape(shape: impl Into<Shape>, srid: Option<i32>) -> Result<Self> {
        let shape = shape.into();
        check_structure(&shape)?;
        Ok(Self {
            shape,
            srid: normalize_srid(srid),
        })
    }

    /// Parse WKB or EWKB, given either as raw bytes or as hex text.
    ///
    /// An explicit `srid` wins over one embedded in the EWKB header.
    ///
    /// # Errors
    /// Returns [`Error::InvalidGeometry`] if the input is not valid hex, does not
    /// decode to a shape, or decodes to an empty point.
    pub fn from_wkb(bytes: impl AsRef<[u8]>, srid: Option<i32>) -> Result<Self> {
        let raw = bytes.as_ref();
        let text = raw.trim_ascii();
        let decoded;
        // raw WKB is never trimmed; trailing coordinate bytes may look like whitespace
        let wkb_bytes = if hex::is_hex_text(text) {
            decoded = hex::decode(text)
                .ok_or_else(|| Error::InvalidGeometry("malformed hex WKB".to_string()))?;
            decoded.as_slice()
        } else {
            raw
        };

        let parsed = wkb::reader::read_wkb(wkb_bytes)
            .map_err(|e| Error::InvalidGeometry(format!("WKB parse error: {e}")))?;
        let shape = parsed
            .try_to_geometry()
            .ok_or_else(|| Error::InvalidGeometry("WKB decodes to an empty point".to_string()))?;

        let srid = normalize_srid(srid).or_else(|| ewkb::embedded_srid(wkb_bytes));
        trace!(bytes = wkb_bytes.len(), ?srid, "decoded WKB geometry");
        Self::from_shape(shape, srid)
    }

    /// Parse WKT.
    ///
    /// # Errors
    /// Returns [`Error::InvalidGeometry`] on malformed text or an empty point,
    /// which `geo-types` cannot represent.
    pub fn from_wkt(text: &str, srid: Option<i32>) -> Result<Self> {
        let parsed: Wkt<f64> = text
            .trim()
            .parse()
            .map_err(|e| Error::InvalidGeometry(format!("WKT parse error: {e}")))?;
        let shape = parsed
            .try_to_geometry()
            .ok_or_else(|| Error::InvalidGeometry("WKT decodes to an empty point".to_string()))?;
        Self::from_shape(shape, srid)
    }

    /// Parse EWKT: WKT with an optional case-insensitive `SRID=<n>;` prefix.
    ///
    /// # Errors
    /// Returns [`Error::InvalidGeometry`] if the prefix holds a non-integer SRID
    /// or the WKT part is malformed.
    pub fn from_ewkt(text: &str) -> Result<Self> {
        let text = text.trim_start();
        let has_prefix = text
            .get(..5)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("SRID="));
        if !has_prefix {
            return Self::from_wkt(text, None);
        }

        let (prefix, wkt_text) = text
            .split_once(';')
            .ok_or_else(|| Error::InvalidGeometry("EWKT SRID prefix without ';'".to_string()))?;
        let srid = prefix[5..]
            .trim()
            .parse::<i32>()
            .map_err(|_| Error::InvalidGeometry(format!("invalid EWKT SRID '{}'", &prefix[5..])))?;
        Self::from_wkt(wkt_text, Some(srid))
    }

    /// The SRID, or `None` when the value has no CRS.
    #[must_use]
    pub fn srid(&self) -> Option<i32> {
        self.srid
    }

    /// Whether WKB output carries the EWKB SRID marker.
    #[must_use]
    pub fn includes_srid(&self) -> bool {
        self.srid.is_some()
    }

    /// The wrapped shape
    #[must_use]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Unwrap into the shape, dropping the SRID
    #[must_use]
    pub fn into_shape(self) -> Shape {
        self.shape
    }

    /// Little-endian WKB; EWKB with an SRID marker when the value has an SRID.
    #[must_use]
    pub fn as_wkb(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        ewkb::write_ewkb(&self.shape, self.srid, &mut buf);
        buf
    }

    /// [`Self::as_wkb`] as upper-case hex text.
    #[must_use]
    pub fn as_hex_wkb(&self) -> String {
        hex::encode_upper(&self.as_wkb())
    }

    /// WKT of the shape, without any SRID.
    #[must_use]
    pub fn as_wkt(&self) -> String {
        self.shape.wkt_string()
    }

    /// EWKT: `SRID=<n>;<WKT>` when an SRID is set, otherwise the same as [`Self::as_wkt`].
    #[must_use]
    pub fn as_ewkt(&self) -> String {
        match self.srid {
            Some(srid) => format!("SRID={srid};{}", self.as_wkt()),
            None => self.as_wkt(),
        }
    }

    /// Bounds of the shape, or `None` for an empty shape.
    #[must_use]
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.shape.bounding_rect().map(BoundingBox::from)
    }

    /// Bounds of the shape reprojected into `target_srid`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidCrs`] if this value has no SRID,
    /// [`Error::InvalidGeometry`] for an empty shape, and any error from
    /// [`projection::project_bounds`].
    pub fn bounds_in(&self, target_srid: i32) -> Result<BoundingBox> {
        let source_srid = self
            .srid
            .ok_or_else(|| Error::InvalidCrs("geometry without SRID".to_string()))?;
        let bounds = self
            .bounds()
            .ok_or_else(|| Error::InvalidGeometry("empty geometry has no bounds".to_string()))?;
        projection::project_bounds(source_srid, target_srid, &bounds)
    }

    /// Exact coordinate-by-coordinate equality.
    ///
    /// With `compare_srid` set, values with different SRIDs are never equal.
    /// This is not topological equality: the same line with reversed
    /// vertex order compares unequal.
    #[must_use]
    pub fn equals(&self, other: &Geometry, compare_srid: bool) -> bool {
        if compare_srid && self.srid != other.srid {
            return false;
        }
        self.shape == other.shape
    }
}

impl FromStr for Geometry {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_ewkt(s)
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_ewkt())
    }
}

fn normalize_srid(srid: Option<i32>) -> Option<i32> {
    srid.filter(|&s| s != 0)
}

/// Reject shapes the database's geometry engine would refuse to build.
fn check_structure(shape: &Shape) -> Result<()> {
    match shape {
        Shape::LineString(ls) => check_line_string(ls),
        Shape::Polygon(poly) => check_polygon(poly),
        Shape::MultiLineString(mls) => mls.0.iter().try_for_each(check_line_string),
        Shape::MultiPolygon(mpoly) => mpoly.0.iter().try_for_each(check_polygon),
        Shape::GeometryCollection(gc) => gc.0.iter().try_for_each(check_structure),
        Shape::Point(_)
        | Shape::Line(_)
        | Shape::MultiPoint(_)
        | Shape::Rect(_)
        | Shape::Triangle(_) => Ok(()),
    }
}

fn check_line_string(ls: &geo_types::LineString<f64>) -> Result<()> {
    if ls.0.len() == 1 {
        return Err(Error::InvalidGeometry(
            "line string must have zero or at least two points".to_string(),
        ));
    }
    Ok(())
}

fn check_polygon(poly: &geo_types::Polygon<f64>) -> Result<()> {
    for ring in std::iter::once(poly.exterior()).chain(poly.interiors()) {
        if (1..4).contains(&ring.0.len()) {
            return Err(Error::InvalidGeometry(
                "polygon ring needs at least three distinct points plus the closing point".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use geo_types::{line_string, point, polygon};

    use super::*;

    const LINE_WKB: &str =
        "01020000000200000000000000000000000000000000000000000000000000F03F000000000000F03F";
    const LINE_EWKB_4326: &str =
        "0102000020E61000000200000000000000000000000000000000000000000000000000F03F000000000000F03F";
    const POINT_EWKB_4326: &str = "0101000020E610000000000000008066C00000000000000000";

    #[test]
    fn test_from_shape() {
        let point = point!(x: 0.0, y: 0.0);
        let geom = Geometry::from_shape(point, Some(4326)).unwrap();
        assert_eq!(geom.srid(), Some(4326));
        assert_eq!(geom.shape(), &Shape::Point(point));
    }

    #[test]
    fn test_from_shape_nosrid() {
        let geom = Geometry::from_shape(point!(x: 0.0, y: 0.0), None).unwrap();
        assert_eq!(geom.srid(), None);
        assert!(!geom.includes_srid());
    }

    #[test]
    fn test_from_shape_zero_srid_is_none() {
        let geom = Geometry::from_shape(point!(x: 0.0, y: 0.0), Some(0)).unwrap();
        assert_eq!(geom.srid(), None);
    }

    #[test]
    fn test_from_wkb_invalid() {
        let result = Geometry::from_wkb("11110008066C00000000000000000", None);
        assert!(matches!(result, Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn test_from_wkb_garbage_bytes() {
        let result = Geometry::from_wkb([0x01u8, 0x02, 0x00], None);
        assert!(matches!(result, Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn test_from_wkb_hex() {
        let geom = Geometry::from_wkb(POINT_EWKB_4326, None).unwrap();
        assert_eq!(geom.srid(), Some(4326));
        assert_eq!(geom.shape(), &Shape::Point(point!(x: -180.0, y: 0.0)));
    }

    #[test]
    fn test_from_wkb_binary() {
        let bytes = hex::decode(POINT_EWKB_4326.as_bytes()).unwrap();
        let geom = Geometry::from_wkb(&bytes, None).unwrap();
        assert_eq!(geom.srid(), Some(4326));
        assert_eq!(geom.shape(), &Shape::Point(point!(x: -180.0, y: 0.0)));
    }

    #[test]
    fn test_from_wkb_explicit_srid_overrides_embedded() {
        let geom = Geometry::from_wkb(POINT_EWKB_4326, Some(3857)).unwrap();
        assert_eq!(geom.srid(), Some(3857));
    }

    #[test]
    fn test_from_wkt_invalid() {
        let result = Geometry::from_wkt("LINESTRING(-180 0)", None);
        assert!(matches!(result, Err(Error::InvalidGeometry(_))));

        let result = Geometry::from_wkt("POINT (-180", None);
        assert!(matches!(result, Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn test_from_wkt() {
        let geom = Geometry::from_wkt("POINT (-180 0)", Some(4326)).unwrap();
        assert_eq!(geom.srid(), Some(4326));
        assert_eq!(geom.shape(), &Shape::Point(point!(x: -180.0, y: 0.0)));
    }

    #[test]
    fn test_from_wkt_empty_point() {
        let result = Geometry::from_wkt("POINT EMPTY", None);
        assert!(matches!(result, Err(Error::InvalidGeometry(_))));

        let result = Geometry::from_ewkt("SRID=4326;POINT EMPTY");
        assert!(matches!(result, Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn test_from_wkt_empty_line_string_keeps_type() {
        let geom = Geometry::from_wkt("LINESTRING EMPTY", None).unwrap();
        assert!(matches!(geom.shape(), Shape::LineString(ls) if ls.0.is_empty()));
        assert!(geom.bounds().is_none());
    }

    #[test]
    fn test_from_wkt_short_ring_message() {
        let err = Geometry::from_wkt("POLYGON ((0 0, 1 1))", None).unwrap_err();
        let Error::InvalidGeometry(message) = &err else {
            panic!("expected InvalidGeometry, got {err:?}");
        };
        assert!(!message.contains("3 points"), "{message}");
        assert!(message.contains("polygon ring"), "{message}");
    }

    #[test]
    fn test_from_wkb_hex_with_whitespace() {
        let geom = Geometry::from_wkb(format!(" {POINT_EWKB_4326}\n"), None).unwrap();
        assert_eq!(geom.srid(), Some(4326));
        assert_eq!(geom.shape(), &Shape::Point(point!(x: -180.0, y: 0.0)));
    }

    #[test]
    fn test_from_ewkt() {
        let geom = Geometry::from_ewkt("SRID=4326;POINT (-180 0)").unwrap();
        assert_eq!(geom.srid(), Some(4326));
        assert_eq!(geom.shape(), &Shape::Point(point!(x: -180.0, y: 0.0)));
    }

    #[test]
    fn test_from_ewkt_lowercase_prefix() {
        let geom = Geometry::from_ewkt("srid=3857;POINT (1 2)").unwrap();
        assert_eq!(geom.srid(), Some(3857));
    }

    #[test]
    fn test_from_ewkt_nosrid() {
        let geom = Geometry::from_ewkt("POINT (-180 0)").unwrap();
        assert_eq!(geom.srid(), None);
    }

    #[test]
    fn test_from_ewkt_bad_srid() {
        let result = Geometry::from_ewkt("SRID=abc;POINT (0 0)");
        assert!(matches!(result, Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn test_as_ewkt_nosrid() {
        let geom = Geometry::from_ewkt("POINT (-180 0)").unwrap();
        assert_eq!(geom.as_ewkt(), geom.as_wkt());
    }

    #[test]
    fn test_as_ewkt_roundtrip() {
        let wkt = Geometry::from_wkt("POINT (-180 0)", None).unwrap().as_wkt();
        let ewkt = format!("SRID=4326;{wkt}");
        let geom = Geometry::from_ewkt(&ewkt).unwrap();
        assert_eq!(geom.as_ewkt(), ewkt);
        assert_eq!(geom.to_string(), ewkt);
    }

    #[test]
    fn test_as_wkt_is_stable() {
        let first = Geometry::from_wkt("LINESTRING (0 0, 1 1)", None).unwrap().as_wkt();
        let second = Geometry::from_wkt(&first, None).unwrap().as_wkt();
        assert_eq!(first, second);
    }

    #[test]
    fn test_as_wkb_includes_srid_only_when_set() {
        let tagged = Geometry::from_ewkt("SRID=4326;LINESTRING (0 0, 1 1)").unwrap();
        assert_eq!(tagged.as_hex_wkb(), LINE_EWKB_4326);

        let plain = Geometry::from_wkt("LINESTRING (0 0, 1 1)", None).unwrap();
        assert_eq!(plain.as_hex_wkb(), LINE_WKB);
    }

    #[test]
    fn test_wkb_roundtrip() {
        let geom = Geometry::from_ewkt("SRID=2154;POLYGON ((0 0, 4 0, 4 4, 0 4, 0 0), (1 1, 2 1, 2 2, 1 1))")
            .unwrap();
        let back = Geometry::from_wkb(geom.as_wkb(), None).unwrap();
        assert!(geom.equals(&back, true));
    }

    #[test]
    fn test_bounds() {
        let geom = Geometry::from_wkb(LINE_WKB, None).unwrap();
        assert_eq!(geom.bounds().unwrap().as_tuple(), (0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn test_equals() {
        let geom_1 = Geometry::from_wkb(LINE_EWKB_4326, None).unwrap();
        let geom_2 = Geometry::from_ewkt("SRID=4326;LINESTRING(0 0,1 1)").unwrap();
        assert!(geom_1.equals(&geom_2, true));
    }

    #[test]
    fn test_equals_plain_wkb_with_explicit_srid() {
        let geom_1 = Geometry::from_wkb(LINE_WKB, Some(4326)).unwrap();
        let geom_2 = Geometry::from_ewkt("SRID=4326;LINESTRING(0 0,1 1)").unwrap();
        assert_eq!(geom_1.srid(), Some(4326));
        assert!(geom_1.equals(&geom_2, true));
    }

    #[test]
    fn test_equals_nosrid() {
        let geom_1 = Geometry::from_wkb(LINE_EWKB_4326, None).unwrap();
        let geom_2 = Geometry::from_ewkt("LINESTRING(0 0,1 1)").unwrap();
        assert!(!geom_1.equals(&geom_2, true));
        assert!(geom_1.equals(&geom_2, false));
    }

    #[test]
    fn test_equals_different_srid() {
        let geom_1 = Geometry::from_wkb(LINE_EWKB_4326, None).unwrap();
        let geom_2 = Geometry::from_ewkt("SRID=3587;LINESTRING(0 0,1 1)").unwrap();
        assert!(!geom_1.equals(&geom_2, true));
    }

    #[test]
    fn test_equals_is_exact_not_topological() {
        let forward = Geometry::from_shape(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)], None).unwrap();
        let reversed = Geometry::from_shape(line_string![(x: 1.0, y: 1.0), (x: 0.0, y: 0.0)], None).unwrap();
        assert!(!forward.equals(&reversed, false));
    }

    #[test]
    fn test_short_polygon_ring_rejected() {
        let result = Geometry::from_shape(
            polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 0.0)],
            None,
        );
        assert!(matches!(result, Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn test_bounds_in_requires_srid() {
        let geom = Geometry::from_wkt("POINT (0 0)", None).unwrap();
        assert!(matches!(geom.bounds_in(3857), Err(Error::InvalidCrs(_))));
    }

    #[test]
    fn test_bounds_in_same_crs() {
        let geom = Geometry::from_ewkt("SRID=4326;LINESTRING (0 0, 1 1)").unwrap();
        let bounds = geom.bounds_in(4326).unwrap();
        assert_eq!(bounds.as_tuple(), (0.0, 0.0, 1.0, 1.0));
    }
}
