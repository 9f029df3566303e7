//! Web Coverage Service `GetCoverage` requests.
//!
//! [`GetCoverage`] holds the per-layer request configuration, renders the
//! WCS 1.0.0 XML body for a bounding box and turns the ArcGrid response body
//! into a [`Raster`]. Sending the request is left to the caller's HTTP client.
//!
//! # Example
//!
//! ```rust
//! use geofdw::{BoundingBox, GetCoverage};
//!
//! # fn main() -> geofdw::Result<()> {
//! let request = GetCoverage::new("dem", "EPSG:4326")?.width(2).height(1);
//! let bbox = BoundingBox::new(0.0, 0.0, 2.0, 1.0);
//! let body = request.to_xml(&bbox)?;
//! assert!(body.contains("<sourceCoverage>dem</sourceCoverage>"));
//!
//! let response = "ncols 2\nnrows 1\nxllcorner 0\nyllcorner 0\ncellsize 1\n10 20\n";
//! let raster = request.decode(response, bbox)?;
//! assert_eq!(raster.srid(), Some(4326));
//! # Ok(())
//! # }
//! ```

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use tracing::debug;

use crate::arcgrid::ArcGrid;
use crate::error::{Error, Result};
use crate::geometry::projection::crs_to_srid;
use crate::geometry::{BoundingBox, Geometry};
use crate::raster::Raster;

/// Default grid width and height requested from the service
pub const DEFAULT_SIZE: usize = 256;

/// MIME type of the request body
pub const CONTENT_TYPE: &str = "text/xml";

const WCS_NAMESPACE: &str = "http://www.opengis.net/wcs";

/// Configuration for one coverage layer on a WCS endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct GetCoverage {
    layer: String,
    crs: String,
    srid: i32,
    version: String,
    width: usize,
    height: usize,
    band: u32,
}

impl GetCoverage {
    /// Create a request for `layer` in `crs` (`EPSG:<code>` or a bare code).
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidCrs`] if `crs` is not a recognisable EPSG code.
    pub fn new(layer: impl Into<String>, crs: impl Into<String>) -> Result<Self> {
        let crs = crs.into();
        let srid = crs_to_srid(&crs)?;
        Ok(Self {
            layer: layer.into(),
            crs,
            srid,
            version: "1.0.0".to_string(),
            width: DEFAULT_SIZE,
            height: DEFAULT_SIZE,
            band: 1,
        })
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    #[must_use]
    pub fn width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    #[must_use]
    pub fn height(mut self, height: usize) -> Self {
        self.height = height;
        self
    }

    /// Band to request, 1-based
    #[must_use]
    pub fn band(mut self, band: u32) -> Self {
        self.band = band;
        self
    }

    #[must_use]
    pub fn layer(&self) -> &str {
        &self.layer
    }

    #[must_use]
    pub fn crs(&self) -> &str {
        &self.crs
    }

    /// SRID parsed from the CRS
    #[must_use]
    pub fn srid(&self) -> i32 {
        self.srid
    }

    #[must_use]
    pub fn grid_size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn selected_band(&self) -> u32 {
        self.band
    }

    /// Bounding box of `geometry` in the request CRS.
    ///
    /// A geometry without an SRID is taken to already be in the request CRS.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidGeometry`] for an empty geometry and
    /// projection errors when the geometry's SRID differs from the request's.
    pub fn bbox_for(&self, geometry: &Geometry) -> Result<BoundingBox> {
        match geometry.srid() {
            Some(srid) if srid != self.srid => geometry.bounds_in(self.srid),
            _ => geometry.bounds().ok_or_else(|| {
                Error::InvalidGeometry("empty geometry has no bounds".to_string())
            }),
        }
    }

    /// Render the XML request body for `bbox`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Xml`] if the XML writer fails.
    pub fn to_xml(&self, bbox: &BoundingBox) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_error)?;

        let schema_location = format!(
            "{WCS_NAMESPACE} http://schemas.opengis.net/wcs/{}/getCoverage.xsd",
            self.version
        );
        start(
            &mut writer,
            BytesStart::new("GetCoverage").with_attributes([
                ("version", self.version.as_str()),
                ("service", "WCS"),
                ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
                ("xmlns", WCS_NAMESPACE),
                ("xmlns:ows", "http://www.opengis.net/ows/1.1"),
                ("xmlns:gml", "http://www.opengis.net/gml"),
                ("xmlns:ogc", "http://www.opengis.net/ogc"),
                ("xsi:schemaLocation", schema_location.as_str()),
            ]),
        )?;
        text_element(&mut writer, "sourceCoverage", &self.layer)?;

        // <domainSubset><spatialSubset>{envelope}{grid}</spatialSubset></domainSubset>
        start(&mut writer, BytesStart::new("domainSubset"))?;
        start(&mut writer, BytesStart::new("spatialSubset"))?;
        start(
            &mut writer,
            BytesStart::new("gml:Envelope").with_attributes([("srsName", self.crs.as_str())]),
        )?;
        text_element(&mut writer, "gml:pos", &format!("{} {}", bbox.minx, bbox.miny))?;
        text_element(&mut writer, "gml:pos", &format!("{} {}", bbox.maxx, bbox.maxy))?;
        end(&mut writer, "gml:Envelope")?;

        start(
            &mut writer,
            BytesStart::new("gml:Grid").with_attributes([("dimension", "2")]),
        )?;
        start(&mut writer, BytesStart::new("gml:limits"))?;
        start(&mut writer, BytesStart::new("gml:GridEnvelope"))?;
        text_element(&mut writer, "gml:low", "0 0")?;
        text_element(&mut writer, "gml:high", &format!("{} {}", self.width, self.height))?;
        end(&mut writer, "gml:GridEnvelope")?;
        end(&mut writer, "gml:limits")?;
        text_element(&mut writer, "gml:axisName", "x")?;
        text_element(&mut writer, "gml:axisName", "y")?;
        end(&mut writer, "gml:Grid")?;
        end(&mut writer, "spatialSubset")?;
        end(&mut writer, "domainSubset")?;

        start(&mut writer, BytesStart::new("rangeSubset"))?;
        start(
            &mut writer,
            BytesStart::new("axisSubset").with_attributes([("name", "Band")]),
        )?;
        text_element(&mut writer, "singleValue", &self.band.to_string())?;
        end(&mut writer, "axisSubset")?;
        end(&mut writer, "rangeSubset")?;

        start(&mut writer, BytesStart::new("output"))?;
        text_element(&mut writer, "crs", &self.crs)?;
        text_element(&mut writer, "format", "ArcGrid")?;
        end(&mut writer, "output")?;

        end(&mut writer, "GetCoverage")?;

        let body = String::from_utf8(writer.into_inner()).map_err(xml_error)?;
        debug!(layer = %self.layer, bytes = body.len(), "rendered GetCoverage request");
        Ok(body)
    }

    /// Decode an ArcGrid response body into a raster covering `bbox`.
    ///
    /// The raster carries the request CRS's SRID regardless of the grid text.
    ///
    /// # Errors
    /// Propagates grid parse errors and raster construction errors.
    pub fn decode(&self, body: &str, bbox: BoundingBox) -> Result<Raster> {
        let grid = ArcGrid::parse(body)?;
        debug!(
            layer = %self.layer,
            ncols = grid.ncols,
            nrows = grid.nrows,
            "decoding coverage response"
        );
        grid.to_raster(bbox, Some(self.srid))
    }
}

fn start(writer: &mut Writer<Vec<u8>>, element: BytesStart<'_>) -> Result<()> {
    writer.write_event(Event::Start(element)).map_err(xml_error)
}

fn end(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<()> {
    writer.write_event(Event::End(BytesEnd::new(name))).map_err(xml_error)
}

/// Write `<name>text</name>`; the text is escaped by the writer.
fn text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    start(writer, BytesStart::new(name))?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(xml_error)?;
    end(writer, name)
}

fn xml_error(err: impl std::fmt::Display) -> Error {
    Error::Xml(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GridParseError;

    fn request() -> GetCoverage {
        GetCoverage::new("elevation", "EPSG:4326").unwrap()
    }

    #[test]
    fn test_defaults() {
        let req = request();
        assert_eq!(req.srid(), 4326);
        assert_eq!(req.grid_size(), (256, 256));
        assert_eq!(req.selected_band(), 1);
        assert!(req.to_xml(&BoundingBox::new(0.0, 0.0, 1.0, 1.0)).unwrap().contains(r#"version="1.0.0""#));
    }

    #[test]
    fn test_lowercase_crs() {
        let req = GetCoverage::new("elevation", "epsg:4326").unwrap();
        assert_eq!(req.srid(), 4326);
    }

    #[test]
    fn test_bad_crs() {
        let result = GetCoverage::new("elevation", "espg:4326");
        assert_eq!(result, Err(Error::InvalidCrs("espg:4326".to_string())));
    }

    #[test]
    fn test_custom_width() {
        let xml = request().width(1024).to_xml(&BoundingBox::new(0.0, 0.0, 1.0, 1.0)).unwrap();
        assert!(xml.contains("<gml:high>1024 256</gml:high>"));
    }

    #[test]
    fn test_custom_band() {
        let xml = request().band(2).to_xml(&BoundingBox::new(0.0, 0.0, 1.0, 1.0)).unwrap();
        assert!(xml.contains("<singleValue>2</singleValue>"));
    }

    #[test]
    fn test_xml_envelope() {
        let xml = request().to_xml(&BoundingBox::new(-180.0, -90.0, 180.0, 90.5)).unwrap();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(r#"<GetCoverage version="1.0.0" service="WCS""#));
        assert!(xml.contains(r#"xmlns="http://www.opengis.net/wcs""#));
        assert!(xml.contains("http://schemas.opengis.net/wcs/1.0.0/getCoverage.xsd"));
        assert!(xml.contains(r#"<gml:Envelope srsName="EPSG:4326">"#));
        assert!(xml.contains("<gml:pos>-180 -90</gml:pos>"));
        assert!(xml.contains("<gml:pos>180 90.5</gml:pos>"));
        assert!(xml.contains(r#"<axisSubset name="Band">"#));
        assert!(xml.contains("<crs>EPSG:4326</crs>"));
        assert!(xml.contains("<format>ArcGrid</format>"));
    }

    #[test]
    fn test_xml_escapes_layer() {
        let req = GetCoverage::new("a<b>&c", "4326").unwrap();
        let xml = req.to_xml(&BoundingBox::new(0.0, 0.0, 1.0, 1.0)).unwrap();
        assert!(xml.contains("<sourceCoverage>a&lt;b&gt;&amp;c</sourceCoverage>"));
    }

    #[test]
    fn test_bbox_for_same_crs() {
        let geom = Geometry::from_ewkt("SRID=4326;LINESTRING (1 2, 3 4)").unwrap();
        let bbox = request().bbox_for(&geom).unwrap();
        assert_eq!(bbox.as_tuple(), (1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn test_bbox_for_without_srid() {
        let geom = Geometry::from_wkt("POINT (5 6)", None).unwrap();
        let bbox = request().bbox_for(&geom).unwrap();
        assert_eq!(bbox.as_tuple(), (5.0, 6.0, 5.0, 6.0));
    }

    #[test]
    fn test_bbox_for_reprojects() {
        let geom = Geometry::from_ewkt("SRID=4326;POINT (0 0)").unwrap();
        let req = GetCoverage::new("elevation", "EPSG:3857").unwrap();
        let bbox = req.bbox_for(&geom).unwrap();
        assert!(bbox.minx.abs() < 1e-6 && bbox.maxy.abs() < 1e-6);
    }

    #[test]
    fn test_decode() {
        let body = "ncols 2\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 1\nNODATA_value -1\n1 2\n3 -1\n";
        let raster = request().decode(body, BoundingBox::new(0.0, 0.0, 2.0, 2.0)).unwrap();
        assert_eq!(raster.srid(), Some(4326));
        assert_eq!((raster.width(), raster.height()), (2, 2));
        assert_eq!(raster.bands()[0].nodata(), Some(-1.0));
    }

    #[test]
    fn test_decode_bad_body() {
        let result = request().decode("<ServiceException/>", BoundingBox::new(0.0, 0.0, 1.0, 1.0));
        assert!(matches!(
            result,
            Err(Error::GridParse(GridParseError::UnknownHeaderKey(_)))
        ));
    }
}
