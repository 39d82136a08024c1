//! Core orthorectification modules

pub mod attitude;
pub mod rotation;
pub mod projection;
pub mod footprint;
pub mod backprojection;
pub mod boundary;
pub mod detection;
pub mod camera;
pub mod orthophoto;

// Re-export main types
pub use attitude::{AxisConvention, normalize_attitude, normalize_attitude_tagged, kappa_from_track};
pub use rotation::{GroundToCamera, CameraToGround};
pub use projection::{Crs, Projection, Ellipsoid, geographic_to_plane, plane_to_geographic, geographic_eo_to_plane, plane_eo_to_geographic};
pub use footprint::FootprintEstimator;
pub use backprojection::{BackProjector, InterpolationMethod, raster_dimensions};
pub use boundary::{OrthoProduct, ImageMetadata, ObjectMetadata, polygon_wkt};
pub use detection::{DetectionFootprint, transform_box};
pub use camera::{CameraProfile, CameraRegistry, EoColumnOrder, HeadingSource};
pub use orthophoto::{OrthoConfig, ImageGeometry, Orthorectifier};
