//! CRS identifiers and reprojection.
//!
//! Remote sources describe their CRS as text (`EPSG:4326`); the database wants
//! an integer SRID. Reprojection uses pure Rust (proj4rs + crs-definitions) so
//! a request bounding box can be expressed in the CRS a coverage service expects.

use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use crate::error::{Error, Result};
use crate::geometry::BoundingBox;

/// Convert a CRS string such as `EPSG:4326` (any case) or a bare `4326` into an SRID.
///
/// # Errors
/// Returns [`Error::InvalidCrs`] if the text is neither form.
pub fn crs_to_srid(crs: &str) -> Result<i32> {
    let trimmed = crs.trim();
    let code = match trimmed.get(..5) {
        Some(prefix) if prefix.eq_ignore_ascii_case("epsg:") => &trimmed[5..],
        _ => trimmed,
    };
    code.parse::<i32>()
        .map_err(|_| Error::InvalidCrs(crs.to_string()))
}

/// PROJ4 string for an SRID from the crs-definitions database
#[inline]
#[must_use]
pub fn proj_string(srid: i32) -> Option<&'static str> {
    u16::try_from(srid).ok()
        .and_then(crs_definitions::from_code)
        .map(|def| def.proj4)
}

/// Check if an SRID represents a geographic (lon/lat) CRS
#[inline]
#[must_use]
pub fn is_geographic(srid: i32) -> bool {
    if let Some(proj_str) = proj_string(srid) {
        proj_str.contains("+proj=longlat")
    } else {
        // Fallback: assume 4326 and similar are geographic
        srid == 4326 || (4000..5000).contains(&srid)
    }
}

/// Project a point from one SRID to another.
///
/// # Errors
/// Returns [`Error::InvalidCrs`] if either SRID is not in the crs-definitions
/// database, and [`Error::Projection`] if the transformation fails.
pub fn project_point(source_srid: i32, target_srid: i32, x: f64, y: f64) -> Result<(f64, f64)> {
    if source_srid == target_srid {
        return Ok((x, y));
    }

    let source_proj = load_proj(source_srid)?;
    let target_proj = load_proj(target_srid)?;

    // proj4rs uses radians for geographic coordinates
    let (x_in, y_in) = if is_geographic(source_srid) {
        (x.to_radians(), y.to_radians())
    } else {
        (x, y)
    };

    let mut point = (x_in, y_in, 0.0);
    transform(&source_proj, &target_proj, &mut point).map_err(|e| {
        Error::Projection(format!(
            "transform from EPSG:{source_srid} to EPSG:{target_srid} failed: {e:?}"
        ))
    })?;

    if is_geographic(target_srid) {
        Ok((point.0.to_degrees(), point.1.to_degrees()))
    } else {
        Ok((point.0, point.1))
    }
}

/// Project a bounding box, returning the envelope of its four projected corners.
///
/// # Errors
/// Propagates any error from [`project_point`].
pub fn project_bounds(source_srid: i32, target_srid: i32, bounds: &BoundingBox) -> Result<BoundingBox> {
    if source_srid == target_srid {
        return Ok(*bounds);
    }

    let corners = [
        (bounds.minx, bounds.miny),
        (bounds.minx, bounds.maxy),
        (bounds.maxx, bounds.miny),
        (bounds.maxx, bounds.maxy),
    ];

    let mut out = BoundingBox::new(f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
    for (x, y) in corners {
        let (px, py) = project_point(source_srid, target_srid, x, y)?;
        out.minx = out.minx.min(px);
        out.miny = out.miny.min(py);
        out.maxx = out.maxx.max(px);
        out.maxy = out.maxy.max(py);
    }
    Ok(out)
}

fn load_proj(srid: i32) -> Result<Proj> {
    let definition = proj_string(srid)
        .ok_or_else(|| Error::InvalidCrs(format!("EPSG:{srid} is not in the crs-definitions database")))?;
    Proj::from_proj_string(definition)
        .map_err(|e| Error::Projection(format!("invalid projection EPSG:{srid}: {e:?}")))
}
