use crate::core::projection::Crs;
use crate::types::{GroundFootprint, OrthoError, OrthoRaster, OrthoResult, PlanarEo};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Closed WKT polygon from an open ring; the first vertex is repeated at the end
pub fn polygon_wkt(ring: &[[f64; 2]]) -> String {
    let mut wkt = String::from("POLYGON ((");
    for p in ring.iter().chain(ring.first()) {
        if !wkt.ends_with('(') {
            wkt.push_str(", ");
        }
        let _ = write!(wkt, "{} {}", p[0], p[1]);
    }
    wkt.push_str("))");
    wkt
}

/// Reproject a planar ring to WGS84 (lon, lat)
pub fn ring_to_geographic(ring: &[[f64; 2]], crs: &Crs) -> OrthoResult<Vec<[f64; 2]>> {
    ring.iter()
        .map(|p| crs.inverse(p[0], p[1]).map(|(lon, lat)| [lon, lat]))
        .collect()
}

/// Rectified image together with its ground footprint
#[derive(Debug, Clone, PartialEq)]
pub struct OrthoProduct {
    pub raster: OrthoRaster,
    pub footprint: GroundFootprint,
    /// Footprint polygon in planar coordinates of the raster CRS
    pub footprint_wkt: String,
}

impl OrthoProduct {
    pub fn new(raster: OrthoRaster, footprint: GroundFootprint) -> Self {
        let footprint_wkt = polygon_wkt(&footprint.corners);
        Self {
            raster,
            footprint,
            footprint_wkt,
        }
    }

    pub fn epsg(&self) -> u32 {
        self.raster.epsg
    }

    /// Footprint polygon reprojected to WGS84 lon/lat
    pub fn footprint_wkt_geographic(&self) -> OrthoResult<String> {
        let crs = Crs::from_epsg(self.raster.epsg)?;
        Ok(polygon_wkt(&ring_to_geographic(&self.footprint.corners, &crs)?))
    }

    /// Geotransform, GSD and footprint must describe the same grid
    pub fn check_consistency(&self) -> OrthoResult<()> {
        let t = &self.raster.transform;
        let envelope = &self.footprint.envelope;
        let tolerance = 1e-9 * (1.0 + envelope.max_y.abs().max(envelope.min_x.abs()));
        let consistent = (t.pixel_width - self.raster.gsd).abs() <= tolerance
            && (t.pixel_height + self.raster.gsd).abs() <= tolerance
            && (t.top_left_x - envelope.min_x).abs() <= tolerance
            && (t.top_left_y - envelope.max_y).abs() <= tolerance
            && self.raster.cols() as f64 * self.raster.gsd >= envelope.width() - tolerance
            && self.raster.rows() as f64 * self.raster.gsd >= envelope.height() - tolerance;
        if consistent {
            Ok(())
        } else {
            Err(OrthoError::DegenerateGeometry(
                "geotransform, GSD and footprint disagree".to_string(),
            ))
        }
    }
}

/// Metadata of one detected object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub obj_id: String,
    pub obj_type: u32,
    /// Ground boundary as WKT
    pub obj_boundary: String,
}

/// Metadata describing one orthophoto and the objects found on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub img_id: String,
    pub epsg: u32,
    /// Planar camera position (easting, northing)
    pub position: [f64; 2],
    pub geotransform: [f64; 6],
    pub img_boundary: String,
    pub objects: Vec<ObjectMetadata>,
}

impl ImageMetadata {
    pub fn new(img_id: &str, product: &OrthoProduct, eo: &PlanarEo, objects: Vec<ObjectMetadata>) -> Self {
        Self {
            img_id: img_id.to_string(),
            epsg: product.epsg(),
            position: [eo.easting, eo.northing],
            geotransform: product.raster.transform.to_array(),
            img_boundary: product.footprint_wkt.clone(),
            objects,
        }
    }

    pub fn to_json(&self) -> OrthoResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polygon_is_closed() {
        let wkt = polygon_wkt(&[[0.0, 0.0], [10.5, 0.0], [10.5, 4.25], [0.0, 4.25]]);
        assert_eq!(wkt, "POLYGON ((0 0, 10.5 0, 10.5 4.25, 0 4.25, 0 0))");
    }

    #[test]
    fn test_polygon_keeps_full_precision() {
        let wkt = polygon_wkt(&[[200123.456789, 551234.5], [1.0, 2.0], [3.0, 4.0]]);
        assert!(wkt.starts_with("POLYGON ((200123.456789 551234.5, "));
        assert!(wkt.ends_with(", 200123.456789 551234.5))"));
    }

    #[test]
    fn test_ring_to_geographic() {
        let crs = Crs::from_epsg(5186).unwrap();
        let ring = ring_to_geographic(&[[200_000.0, 600_000.0]], &crs).unwrap();
        assert!((ring[0][0] - 127.0).abs() < 1e-9);
        assert!((ring[0][1] - 38.0).abs() < 1e-9);
    }

    #[test]
    fn test_metadata_json_fields() {
        let object = ObjectMetadata {
            obj_id: "0".to_string(),
            obj_type: 3,
            obj_boundary: polygon_wkt(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]),
        };
        let json = serde_json::to_value(&object).unwrap();
        assert_eq!(json["obj_type"], 3);
        assert_eq!(json["obj_boundary"], "POLYGON ((0 0, 1 0, 1 1, 0 0))");
    }
}
