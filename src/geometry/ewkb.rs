//! Extended WKB (EWKB) support.
//!
//! Reading is delegated to the `wkb` crate, which accepts both ISO WKB and the
//! PostGIS EWKB flag bits. This module adds the pieces it does not cover:
//! pulling the embedded SRID out of an EWKB header, and writing little-endian
//! EWKB with the SRID marker set only when the value carries an SRID.

use geo_types::{Coord, Geometry, LineString, Point, Polygon};

use crate::casting::len_to_u32;

const WKB_BIG_ENDIAN: u8 = 0x00;
const WKB_LITTLE_ENDIAN: u8 = 0x01;

const EWKB_SRID_BIT: u32 = 0x2000_0000;

const WKB_POINT: u32 = 1;
const WKB_LINESTRING: u32 = 2;
const WKB_POLYGON: u32 = 3;
const WKB_MULTIPOINT: u32 = 4;
const WKB_MULTILINESTRING: u32 = 5;
const WKB_MULTIPOLYGON: u32 = 6;
const WKB_GEOMETRYCOLLECTION: u32 = 7;

/// Read the SRID from an EWKB header, if the SRID flag is set.
///
/// Returns `None` for ISO WKB, truncated input, or an SRID of 0.
#[must_use]
pub fn embedded_srid(bytes: &[u8]) -> Option<i32> {
    let header = bytes.get(..9)?;
    let big_endian = match header[0] {
        WKB_BIG_ENDIAN => true,
        WKB_LITTLE_ENDIAN => false,
        _ => return None,
    };
    let read_u32 = |raw: [u8; 4]| {
        if big_endian {
            u32::from_be_bytes(raw)
        } else {
            u32::from_le_bytes(raw)
        }
    };

    let type_code = read_u32([header[1], header[2], header[3], header[4]]);
    if type_code & EWKB_SRID_BIT == 0 {
        return None;
    }
    let raw_srid = [header[5], header[6], header[7], header[8]];
    let srid = if big_endian {
        i32::from_be_bytes(raw_srid)
    } else {
        i32::from_le_bytes(raw_srid)
    };
    Some(srid).filter(|&s| s != 0)
}

/// Append `shape` to `buf` as little-endian EWKB.
///
/// The SRID marker is written on the outermost geometry only, and only when
/// `srid` is set; nested members of collections never carry one.
pub fn write_ewkb(shape: &Geometry<f64>, srid: Option<i32>, buf: &mut Vec<u8>) {
    match shape {
        Geometry::Point(p) => write_point(p, srid, buf),
        Geometry::Line(line) => {
            write_header(WKB_LINESTRING, srid, buf);
            write_coords([line.start, line.end].iter().copied(), 2, buf);
        }
        Geometry::LineString(ls) => write_line_string(ls, srid, buf),
        Geometry::Polygon(poly) => write_polygon(poly, srid, buf),
        Geometry::MultiPoint(mp) => {
            write_header(WKB_MULTIPOINT, srid, buf);
            write_count(mp.0.len(), buf);
            for p in &mp.0 {
                write_point(p, None, buf);
            }
        }
        Geometry::MultiLineString(mls) => {
            write_header(WKB_MULTILINESTRING, srid, buf);
            write_count(mls.0.len(), buf);
            for ls in &mls.0 {
                write_line_string(ls, None, buf);
            }
        }
        Geometry::MultiPolygon(mpoly) => {
            write_header(WKB_MULTIPOLYGON, srid, buf);
            write_count(mpoly.0.len(), buf);
            for poly in &mpoly.0 {
                write_polygon(poly, None, buf);
            }
        }
        Geometry::GeometryCollection(gc) => {
            write_header(WKB_GEOMETRYCOLLECTION, srid, buf);
            write_count(gc.0.len(), buf);
            for child in &gc.0 {
                write_ewkb(child, None, buf);
            }
        }
        Geometry::Rect(rect) => write_polygon(&rect.to_polygon(), srid, buf),
        Geometry::Triangle(tri) => write_polygon(&tri.to_polygon(), srid, buf),
    }
}

fn write_point(p: &Point<f64>, srid: Option<i32>, buf: &mut Vec<u8>) {
    write_header(WKB_POINT, srid, buf);
    write_coord(p.0, buf);
}

fn write_line_string(ls: &LineString<f64>, srid: Option<i32>, buf: &mut Vec<u8>) {
    write_header(WKB_LINESTRING, srid, buf);
    write_coords(ls.0.iter().copied(), ls.0.len(), buf);
}

fn write_polygon(poly: &Polygon<f64>, srid: Option<i32>, buf: &mut Vec<u8>) {
    write_header(WKB_POLYGON, srid, buf);

    // POLYGON EMPTY has no rings at all
    let exterior = poly.exterior();
    if exterior.0.is_empty() && poly.interiors().is_empty() {
        write_count(0, buf);
        return;
    }

    write_count(1 + poly.interiors().len(), buf);
    for ring in std::iter::once(exterior).chain(poly.interiors()) {
        write_coords(ring.0.iter().copied(), ring.0.len(), buf);
    }
}

fn write_header(base_type: u32, srid: Option<i32>, buf: &mut Vec<u8>) {
    buf.push(WKB_LITTLE_ENDIAN);
    if let Some(srid) = srid {
        buf.extend_from_slice(&(base_type | EWKB_SRID_BIT).to_le_bytes());
        buf.extend_from_slice(&srid.to_le_bytes());
    } else {
        buf.extend_from_slice(&base_type.to_le_bytes());
    }
}

fn write_count(count: usize, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&len_to_u32(count).to_le_bytes());
}

fn write_coords(coords: impl Iterator<Item = Coord<f64>>, count: usize, buf: &mut Vec<u8>) {
    write_count(count, buf);
    for c in coords {
        write_coord(c, buf);
    }
}

fn write_coord(c: Coord<f64>, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&c.x.to_le_bytes());
    buf.extend_from_slice(&c.y.to_le_bytes());
}
