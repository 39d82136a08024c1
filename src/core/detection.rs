use crate::core::boundary::{polygon_wkt, ring_to_geographic, ObjectMetadata};
use crate::core::footprint::FootprintEstimator;
use crate::core::projection::Crs;
use crate::types::{DetectionBox, OrthoError, OrthoResult};

use super::orthophoto::ImageGeometry;

/// Ground-plane quadrilateral of a detected object
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionFootprint {
    pub class_id: u32,
    /// Ground corners clockwise from the box's top-left
    pub corners: [[f64; 2]; 4],
    pub epsg: u32,
    pub wkt: String,
}

impl DetectionFootprint {
    /// Footprint polygon reprojected to WGS84 lon/lat
    pub fn wkt_geographic(&self) -> OrthoResult<String> {
        let crs = Crs::from_epsg(self.epsg)?;
        Ok(polygon_wkt(&ring_to_geographic(&self.corners, &crs)?))
    }

    pub fn to_metadata(&self, obj_id: &str) -> ObjectMetadata {
        ObjectMetadata {
            obj_id: obj_id.to_string(),
            obj_type: self.class_id,
            obj_boundary: self.wkt.clone(),
        }
    }
}

/// Map a pixel-space detection box onto the ground plane using the same
/// rotation, EO and ground height that rectified the source image
pub fn transform_box(detection: &DetectionBox, geometry: &ImageGeometry) -> OrthoResult<DetectionFootprint> {
    let values = [detection.x1, detection.y1, detection.x2, detection.y2];
    if values.iter().any(|v| !v.is_finite()) || detection.x2 <= detection.x1 || detection.y2 <= detection.y1 {
        return Err(OrthoError::InvalidInput(format!(
            "detection box ({}, {}, {}, {}) is empty or inverted",
            detection.x1, detection.y1, detection.x2, detection.y2
        )));
    }

    let estimator = FootprintEstimator::new(
        &geometry.intrinsics,
        &geometry.r_cg,
        &geometry.eo,
        geometry.ground_height,
    );
    let hits = estimator.pixels_to_ground(&detection.corners())?;
    let corners = [hits[0], hits[1], hits[2], hits[3]];

    log::debug!(
        "Detection class {} at pixels ({:.0}, {:.0})-({:.0}, {:.0}) georeferenced",
        detection.class_id,
        detection.x1,
        detection.y1,
        detection.x2,
        detection.y2
    );

    Ok(DetectionFootprint {
        class_id: detection.class_id,
        corners,
        epsg: geometry.eo.epsg,
        wkt: polygon_wkt(&corners),
    })
}
