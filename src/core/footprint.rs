use crate::core::rotation::CameraToGround;
use crate::types::{CameraIntrinsics, Envelope, GroundFootprint, OrthoError, OrthoResult, PlanarEo};

/// Ground rays flatter than this (|gz| of a unit-length ray) are treated as
/// parallel to the ground plane
const MIN_RAY_DESCENT: f64 = 1e-9;

/// Casts image rays onto the horizontal ground plane
pub struct FootprintEstimator<'a> {
    intrinsics: &'a CameraIntrinsics,
    r_cg: &'a CameraToGround,
    eo: &'a PlanarEo,
    ground_height: f64,
}

impl<'a> FootprintEstimator<'a> {
    pub fn new(
        intrinsics: &'a CameraIntrinsics,
        r_cg: &'a CameraToGround,
        eo: &'a PlanarEo,
        ground_height: f64,
    ) -> Self {
        Self {
            intrinsics,
            r_cg,
            eo,
            ground_height,
        }
    }

    /// Height of the camera above the assumed ground plane
    pub fn flying_height(&self) -> f64 {
        self.eo.height - self.ground_height
    }

    /// Camera-frame ray through pixel (col, row), in meters on the image plane
    fn camera_ray(&self, col: f64, row: f64) -> [f64; 3] {
        let pixel_size = self.intrinsics.pixel_size();
        let (cx, cy) = self.intrinsics.principal_point();
        [
            (col - cx) * pixel_size,
            (cy - row) * pixel_size,
            -self.intrinsics.focal_length,
        ]
    }

    /// Intersect the ray through pixel (col, row) with the ground plane
    pub fn pixel_to_ground(&self, col: f64, row: f64) -> OrthoResult<[f64; 2]> {
        let flying_height = self.flying_height();
        if !(flying_height > 0.0) {
            return Err(OrthoError::DegenerateGeometry(format!(
                "camera height {:.3} m is not above ground height {:.3} m",
                self.eo.height, self.ground_height
            )));
        }

        let ray = self.r_cg.apply(self.camera_ray(col, row));
        let norm = (ray[0] * ray[0] + ray[1] * ray[1] + ray[2] * ray[2]).sqrt();
        if !(norm > 0.0) || ray[2] / norm > -MIN_RAY_DESCENT {
            return Err(OrthoError::DegenerateGeometry(format!(
                "ray through pixel ({:.1}, {:.1}) does not reach the ground plane",
                col, row
            )));
        }

        let scale = (self.ground_height - self.eo.height) / ray[2];
        Ok([
            self.eo.easting + scale * ray[0],
            self.eo.northing + scale * ray[1],
        ])
    }

    /// Ground hits of several pixel coordinates, in order
    pub fn pixels_to_ground(&self, pixels: &[[f64; 2]]) -> OrthoResult<Vec<[f64; 2]>> {
        pixels
            .iter()
            .map(|p| self.pixel_to_ground(p[0], p[1]))
            .collect()
    }

    /// Four-corner footprint, image center hit and bounding envelope
    pub fn estimate(&self) -> OrthoResult<GroundFootprint> {
        let w = self.intrinsics.image_width as f64;
        let h = self.intrinsics.image_height as f64;

        let hits = self.pixels_to_ground(&[[0.0, 0.0], [w, 0.0], [w, h], [0.0, h]])?;
        let corners = [hits[0], hits[1], hits[2], hits[3]];
        let center = self.pixel_to_ground(w / 2.0, h / 2.0)?;

        let envelope = Envelope::from_points(&corners);
        if !envelope.is_valid() {
            return Err(OrthoError::DegenerateGeometry(format!(
                "empty or inverted footprint envelope: {:?}",
                envelope
            )));
        }

        log::debug!(
            "Footprint envelope: x [{:.3}, {:.3}], y [{:.3}, {:.3}] ({:.1} m x {:.1} m)",
            envelope.min_x,
            envelope.max_x,
            envelope.min_y,
            envelope.max_y,
            envelope.width(),
            envelope.height()
        );

        Ok(GroundFootprint {
            corners,
            center,
            envelope,
        })
    }

    /// Nadir GSD: pixel_size * flying_height / focal_length
    pub fn auto_gsd(&self) -> OrthoResult<f64> {
        let flying_height = self.flying_height();
        if !(flying_height > 0.0) {
            return Err(OrthoError::DegenerateGeometry(format!(
                "cannot derive GSD at flying height {:.3} m",
                flying_height
            )));
        }
        Ok(self.intrinsics.pixel_size() * flying_height / self.intrinsics.focal_length)
    }
}
