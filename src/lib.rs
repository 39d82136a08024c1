//! droneortho: flat-ground orthorectification of single drone images
//!
//! Takes one image plus the exterior orientation (position and attitude) the
//! drone recorded for it and produces a north-up RGBA orthophoto on a planar
//! CRS, its ground footprint as WKT, and ground polygons for pixel-space
//! detection boxes. Every image is treated as looking at a horizontal plane at
//! a known ground height; no DEM, lens distortion or mosaicking is involved.
//!
//! ```no_run
//! use droneortho::{rectify, AxisConvention, CameraRegistry, RawAttitude, RawEo};
//! # fn main() -> droneortho::OrthoResult<()> {
//! let camera = CameraRegistry::builtin().get("dji-mavic")?.clone();
//! let image = ndarray::Array3::<u8>::zeros((3000, 4000, 3));
//! let eo = RawEo {
//!     lon: 127.0,
//!     lat: 37.5,
//!     altitude: 100.0,
//!     attitude: RawAttitude { roll: 0.0, pitch: 0.0, yaw: 0.0 },
//! };
//! let product = rectify(
//!     image.view(),
//!     camera.intrinsics(4000, 3000)?,
//!     &eo,
//!     AxisConvention::Opk,
//!     camera.ground_height,
//!     5186,
//!     None,
//! )?;
//! println!("{}", product.footprint_wkt);
//! # Ok(())
//! # }
//! ```

use ndarray::ArrayView3;

pub mod types;
pub mod io;
pub mod core;

#[cfg(feature = "python")]
mod python;

// Re-export main types
pub use types::{
    Attitude, CameraIntrinsics, DetectionBox, Envelope, GeoTransform, GeographicEo, GroundFootprint,
    OrthoError, OrthoRaster, OrthoResult, PlanarEo, RawAttitude, RawEo, RgbaRaster,
};
pub use crate::core::{
    AxisConvention, CameraProfile, CameraRegistry, Crs, DetectionFootprint, EoColumnOrder, HeadingSource,
    ImageGeometry, InterpolationMethod, OrthoConfig, OrthoProduct, Orthorectifier,
};
pub use io::{EoFileReader, EoRecord};

/// Rectify one image with the default configuration.
///
/// `gsd` defaults to the nadir ground sampling distance.
pub fn rectify(
    image: ArrayView3<'_, u8>,
    intrinsics: CameraIntrinsics,
    raw_eo: &RawEo,
    convention: AxisConvention,
    ground_height: f64,
    epsg: u32,
    gsd: Option<f64>,
) -> OrthoResult<OrthoProduct> {
    let rectifier = Orthorectifier::standard();
    let geometry = rectifier.prepare(intrinsics, raw_eo, convention, ground_height, epsg)?;
    rectifier.rectify(image, &geometry, gsd)
}

/// Ground polygon of a detection box, using the same geometry [`rectify`]
/// would use for the source image
pub fn transform_detection(
    detection: &DetectionBox,
    intrinsics: CameraIntrinsics,
    raw_eo: &RawEo,
    convention: AxisConvention,
    ground_height: f64,
    epsg: u32,
) -> OrthoResult<DetectionFootprint> {
    let rectifier = Orthorectifier::standard();
    let geometry = rectifier.prepare(intrinsics, raw_eo, convention, ground_height, epsg)?;
    rectifier.transform_detection(detection, &geometry)
}
