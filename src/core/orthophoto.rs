use crate::core::attitude::{kappa_from_track, normalize_attitude, AxisConvention};
use crate::core::backprojection::{BackProjector, InterpolationMethod, DEFAULT_MAX_OUTPUT_DIMENSION};
use crate::core::boundary::OrthoProduct;
use crate::core::camera::{CameraProfile, HeadingSource};
use crate::core::detection::{transform_box, DetectionFootprint};
use crate::core::footprint::FootprintEstimator;
use crate::core::projection::{geographic_eo_to_plane, Crs};
use crate::core::rotation::{CameraToGround, GroundToCamera};
use crate::types::{
    Attitude, CameraIntrinsics, DetectionBox, GeoTransform, GeographicEo, OrthoError, OrthoRaster,
    OrthoResult, PlanarEo, RawEo,
};
use ndarray::ArrayView3;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tolerance for the rotation matrix orthonormality check
const ORTHONORMAL_TOLERANCE: f64 = 1e-9;

/// Orthorectification configuration, resolved once per call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrthoConfig {
    /// Resampling kernel for the source image
    pub interpolation: InterpolationMethod,
    /// Minimum camera height above the ground plane for a stable GSD (meters)
    pub min_flying_height: f64,
    /// Largest accepted |omega| or |phi| (degrees); `None` disables the check
    pub max_tilt_deg: Option<f64>,
    /// Largest output raster side in cells
    pub max_output_dimension: usize,
    /// Worker threads for resampling; `None` uses the global rayon pool
    pub num_threads: Option<usize>,
}

impl Default for OrthoConfig {
    fn default() -> Self {
        Self {
            interpolation: InterpolationMethod::Bilinear,
            min_flying_height: 50.0,
            max_tilt_deg: Some(50.0),
            max_output_dimension: DEFAULT_MAX_OUTPUT_DIMENSION,
            num_threads: None,
        }
    }
}

impl OrthoConfig {
    pub fn from_json_str(json: &str) -> OrthoResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> OrthoResult<Self> {
        log::info!("Loading orthophoto configuration: {}", path.as_ref().display());
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }
}

/// Everything needed to map between image pixels and the ground plane for
/// one image. Rectification and detection transforms of the same image must
/// share one `ImageGeometry`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageGeometry {
    pub intrinsics: CameraIntrinsics,
    pub eo: PlanarEo,
    pub r_gc: GroundToCamera,
    pub r_cg: CameraToGround,
    pub ground_height: f64,
    pub crs: Crs,
}

impl ImageGeometry {
    /// Build the geometry from an EO vector that is already planar and normalized
    pub fn from_planar(intrinsics: CameraIntrinsics, eo: PlanarEo, ground_height: f64) -> OrthoResult<Self> {
        if !(eo.easting.is_finite() && eo.northing.is_finite() && eo.height.is_finite()) {
            return Err(OrthoError::InvalidInput(format!("non-finite EO position: {:?}", eo)));
        }
        if !ground_height.is_finite() {
            return Err(OrthoError::InvalidInput(format!("non-finite ground height: {}", ground_height)));
        }

        let crs = Crs::from_epsg(eo.epsg)?;
        let r_gc = GroundToCamera::from_attitude(&eo.attitude)?;
        r_gc.check_orthonormal(ORTHONORMAL_TOLERANCE)?;
        let r_cg = r_gc.transpose();

        Ok(Self {
            intrinsics,
            eo,
            r_gc,
            r_cg,
            ground_height,
            crs,
        })
    }

    pub fn flying_height(&self) -> f64 {
        self.eo.height - self.ground_height
    }

    pub fn footprint_estimator(&self) -> FootprintEstimator<'_> {
        FootprintEstimator::new(&self.intrinsics, &self.r_cg, &self.eo, self.ground_height)
    }
}

/// Single-image orthophoto generator
pub struct Orthorectifier {
    config: OrthoConfig,
}

impl Orthorectifier {
    pub fn new(config: OrthoConfig) -> Self {
        Self { config }
    }

    /// Create a rectifier with default configuration
    pub fn standard() -> Self {
        Self::new(OrthoConfig::default())
    }

    pub fn config(&self) -> &OrthoConfig {
        &self.config
    }

    /// Normalize the raw attitude, project the position and build the rotation
    pub fn prepare(
        &self,
        intrinsics: CameraIntrinsics,
        raw_eo: &RawEo,
        convention: AxisConvention,
        ground_height: f64,
        epsg: u32,
    ) -> OrthoResult<ImageGeometry> {
        let attitude = normalize_attitude(raw_eo.attitude, convention);
        log::debug!(
            "Attitude ({}) roll/pitch/yaw {:?} -> omega/phi/kappa {:?}",
            convention,
            raw_eo.attitude,
            attitude
        );
        self.prepare_with_attitude(intrinsics, raw_eo, attitude, ground_height, epsg)
    }

    /// Like [`prepare`](Self::prepare), but with omega = phi = 0 and kappa
    /// derived from the track between the previous and current positions
    pub fn prepare_with_track(
        &self,
        intrinsics: CameraIntrinsics,
        raw_eo: &RawEo,
        previous_lon_lat: (f64, f64),
        ground_height: f64,
        epsg: u32,
    ) -> OrthoResult<ImageGeometry> {
        let crs = Crs::from_epsg(epsg)?;
        let current = crs.forward(raw_eo.lon, raw_eo.lat)?;
        let previous = crs.forward(previous_lon_lat.0, previous_lon_lat.1)?;
        let kappa = kappa_from_track([current.0, current.1], [previous.0, previous.1])?;
        log::debug!("Track heading kappa: {:.3} deg", kappa.to_degrees());
        self.prepare_with_attitude(intrinsics, raw_eo, Attitude::new(0.0, 0.0, kappa), ground_height, epsg)
    }

    /// Prepare an image taken by `camera`, honoring its heading source and
    /// default ground height. Track-headed cameras need `previous_lon_lat`.
    pub fn prepare_for_camera(
        &self,
        camera: &CameraProfile,
        image_size: (usize, usize),
        raw_eo: &RawEo,
        previous_lon_lat: Option<(f64, f64)>,
        epsg: u32,
    ) -> OrthoResult<ImageGeometry> {
        let intrinsics = camera.intrinsics(image_size.0, image_size.1)?;
        match (camera.heading, previous_lon_lat) {
            (HeadingSource::Attitude, _) => {
                self.prepare(intrinsics, raw_eo, camera.convention, camera.ground_height, epsg)
            }
            (HeadingSource::Track, Some(previous)) => {
                self.prepare_with_track(intrinsics, raw_eo, previous, camera.ground_height, epsg)
            }
            (HeadingSource::Track, None) => Err(OrthoError::InvalidInput(format!(
                "camera '{}' takes its heading from the track and needs the previous position",
                camera.id
            ))),
        }
    }

    fn prepare_with_attitude(
        &self,
        intrinsics: CameraIntrinsics,
        raw_eo: &RawEo,
        attitude: Attitude,
        ground_height: f64,
        epsg: u32,
    ) -> OrthoResult<ImageGeometry> {
        let crs = Crs::from_epsg(epsg)?;
        let geographic = GeographicEo {
            lon: raw_eo.lon,
            lat: raw_eo.lat,
            altitude: raw_eo.altitude,
            attitude,
        };
        let planar = geographic_eo_to_plane(&geographic, &crs)?;
        let geometry = ImageGeometry::from_planar(intrinsics, planar, ground_height)?;
        self.validate_geometry(&geometry)?;
        Ok(geometry)
    }

    /// Flying height and tilt preconditions of the flat-ground model
    pub fn validate_geometry(&self, geometry: &ImageGeometry) -> OrthoResult<()> {
        let flying_height = geometry.flying_height();
        if !(flying_height > 0.0) {
            return Err(OrthoError::DegenerateGeometry(format!(
                "altitude {:.3} m is not above ground height {:.3} m",
                geometry.eo.height, geometry.ground_height
            )));
        }
        if flying_height < self.config.min_flying_height {
            return Err(OrthoError::InsufficientAltitude {
                flying_height,
                minimum: self.config.min_flying_height,
            });
        }
        if let Some(max_tilt) = self.config.max_tilt_deg {
            let omega = geometry.eo.attitude.omega.to_degrees();
            let phi = geometry.eo.attitude.phi.to_degrees();
            if omega.abs() > max_tilt || phi.abs() > max_tilt {
                return Err(OrthoError::DegenerateGeometry(format!(
                    "camera tilt omega {:.1} / phi {:.1} deg exceeds {:.1} deg",
                    omega, phi, max_tilt
                )));
            }
        }
        Ok(())
    }

    /// Rectify `image` (rows x cols x channels) onto the ground plane.
    ///
    /// `gsd` defaults to the nadir GSD at the image's flying height.
    pub fn rectify(
        &self,
        image: ArrayView3<'_, u8>,
        geometry: &ImageGeometry,
        gsd: Option<f64>,
    ) -> OrthoResult<OrthoProduct> {
        log::info!(
            "🗺️  Rectifying {}x{} image at EPSG:{} ({:.3}, {:.3}, {:.2} m)",
            image.dim().1,
            image.dim().0,
            geometry.crs.epsg(),
            geometry.eo.easting,
            geometry.eo.northing,
            geometry.eo.height
        );
        let start_time = std::time::Instant::now();

        self.validate_geometry(geometry)?;

        let estimator = geometry.footprint_estimator();
        let footprint = estimator.estimate()?;

        let gsd = match gsd {
            Some(gsd) if gsd.is_finite() && gsd > 0.0 => gsd,
            Some(gsd) => return Err(OrthoError::InvalidInput(format!("invalid GSD: {}", gsd))),
            None => estimator.auto_gsd()?,
        };

        let projector = BackProjector::new(
            &geometry.intrinsics,
            &geometry.r_gc,
            &geometry.eo,
            geometry.ground_height,
            self.config.interpolation,
        )
        .with_max_dimension(self.config.max_output_dimension);

        let (pixels, _) = match self.config.num_threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| OrthoError::InvalidInput(format!("failed to build thread pool: {}", e)))?;
                pool.install(|| projector.resample(image, &footprint.envelope, gsd))?
            }
            None => projector.resample(image, &footprint.envelope, gsd)?,
        };

        let raster = OrthoRaster {
            pixels,
            gsd,
            transform: GeoTransform::north_up(&footprint.envelope, gsd),
            epsg: geometry.crs.epsg(),
        };
        let product = OrthoProduct::new(raster, footprint);
        product.check_consistency()?;

        log::info!(
            "✅ Orthophoto {}x{} at {:.4} m GSD generated in {:.2}s",
            product.raster.cols(),
            product.raster.rows(),
            gsd,
            start_time.elapsed().as_secs_f64()
        );
        Ok(product)
    }

    /// Georeference a detection box found on the image described by `geometry`
    pub fn transform_detection(
        &self,
        detection: &DetectionBox,
        geometry: &ImageGeometry,
    ) -> OrthoResult<DetectionFootprint> {
        transform_box(detection, geometry)
    }
}
