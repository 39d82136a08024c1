use ndarray::Array3;
use serde::{Deserialize, Serialize};

/// 8-bit RGBA orthophoto raster (rows x cols x 4)
pub type RgbaRaster = Array3<u8>;

/// Attitude reading as delivered by the drone, in degrees and in the
/// manufacturer's own axis convention
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawAttitude {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

/// Canonical omega/phi/kappa attitude in radians
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Attitude {
    pub omega: f64,
    pub phi: f64,
    pub kappa: f64,
}

impl Attitude {
    pub fn new(omega: f64, phi: f64, kappa: f64) -> Self {
        Self { omega, phi, kappa }
    }

    pub fn is_finite(&self) -> bool {
        self.omega.is_finite() && self.phi.is_finite() && self.kappa.is_finite()
    }
}

/// Raw EO reading: geographic position plus un-normalized attitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawEo {
    pub lon: f64,       // degrees
    pub lat: f64,       // degrees
    pub altitude: f64,  // meters
    pub attitude: RawAttitude,
}

/// EO vector with a geographic position (WGS84 lon/lat in degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeographicEo {
    pub lon: f64,
    pub lat: f64,
    pub altitude: f64,
    pub attitude: Attitude,
}

impl GeographicEo {
    /// Ordered `(X, Y, Z, omega, phi, kappa)`
    pub fn to_array(&self) -> [f64; 6] {
        [
            self.lon,
            self.lat,
            self.altitude,
            self.attitude.omega,
            self.attitude.phi,
            self.attitude.kappa,
        ]
    }
}

/// EO vector with a planar position in a projected CRS
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanarEo {
    pub easting: f64,
    pub northing: f64,
    pub height: f64,
    pub attitude: Attitude,
    pub epsg: u32,
}

impl PlanarEo {
    /// Ordered `(X, Y, Z, omega, phi, kappa)`
    pub fn to_array(&self) -> [f64; 6] {
        [
            self.easting,
            self.northing,
            self.height,
            self.attitude.omega,
            self.attitude.phi,
            self.attitude.kappa,
        ]
    }

    pub fn position(&self) -> [f64; 3] {
        [self.easting, self.northing, self.height]
    }
}

/// Pinhole camera intrinsics; principal point at the image center, no distortion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Focal length in meters
    pub focal_length: f64,
    /// Sensor width in millimeters
    pub sensor_width: f64,
    /// Image width in pixels
    pub image_width: usize,
    /// Image height in pixels
    pub image_height: usize,
}

impl CameraIntrinsics {
    pub fn new(
        focal_length: f64,
        sensor_width: f64,
        image_width: usize,
        image_height: usize,
    ) -> OrthoResult<Self> {
        if !(focal_length.is_finite() && focal_length > 0.0) {
            return Err(OrthoError::InvalidIntrinsics(format!(
                "focal length must be positive, got {}",
                focal_length
            )));
        }
        if !(sensor_width.is_finite() && sensor_width > 0.0) {
            return Err(OrthoError::InvalidIntrinsics(format!(
                "sensor width must be positive, got {}",
                sensor_width
            )));
        }
        if image_width == 0 || image_height == 0 {
            return Err(OrthoError::InvalidIntrinsics(format!(
                "image size must be non-zero, got {}x{}",
                image_width, image_height
            )));
        }
        Ok(Self {
            focal_length,
            sensor_width,
            image_width,
            image_height,
        })
    }

    /// Pixel size in meters per pixel
    pub fn pixel_size(&self) -> f64 {
        self.sensor_width / self.image_width as f64 / 1000.0
    }

    /// Principal point (cx, cy) in pixels
    pub fn principal_point(&self) -> (f64, f64) {
        (self.image_width as f64 / 2.0, self.image_height as f64 / 2.0)
    }
}

/// Axis-aligned planar bounding envelope
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Envelope {
    pub fn from_points(points: &[[f64; 2]]) -> Self {
        let mut envelope = Envelope {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        for p in points {
            envelope.min_x = envelope.min_x.min(p[0]);
            envelope.max_x = envelope.max_x.max(p[0]);
            envelope.min_y = envelope.min_y.min(p[1]);
            envelope.max_y = envelope.max_y.max(p[1]);
        }
        envelope
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> [f64; 2] {
        [
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        ]
    }

    /// False for empty, inverted or non-finite envelopes
    pub fn is_valid(&self) -> bool {
        self.width().is_finite() && self.height().is_finite() && self.width() > 0.0 && self.height() > 0.0
    }
}

/// Ground-plane footprint of an image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundFootprint {
    /// Corner hits, clockwise from the image top-left (TL, TR, BR, BL)
    pub corners: [[f64; 2]; 4],
    /// Ground hit of the image center ray
    pub center: [f64; 2],
    pub envelope: Envelope,
}

/// Geospatial transformation parameters (GDAL ordering)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// North-up transform anchoring the top-left corner of cell (0, 0)
    pub fn north_up(envelope: &Envelope, gsd: f64) -> Self {
        Self {
            top_left_x: envelope.min_x,
            pixel_width: gsd,
            rotation_x: 0.0,
            top_left_y: envelope.max_y,
            rotation_y: 0.0,
            pixel_height: -gsd, // Negative for north-up images
        }
    }

    pub fn to_array(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    /// Planar coordinate of the center of cell (row, col)
    pub fn cell_center(&self, row: usize, col: usize) -> [f64; 2] {
        let c = col as f64 + 0.5;
        let r = row as f64 + 0.5;
        [
            self.top_left_x + c * self.pixel_width + r * self.rotation_x,
            self.top_left_y + c * self.rotation_y + r * self.pixel_height,
        ]
    }
}

/// Georeferenced RGBA orthophoto
#[derive(Debug, Clone, PartialEq)]
pub struct OrthoRaster {
    pub pixels: RgbaRaster,
    /// Ground sampling distance in meters per cell
    pub gsd: f64,
    pub transform: GeoTransform,
    pub epsg: u32,
}

impl OrthoRaster {
    pub fn rows(&self) -> usize {
        self.pixels.dim().0
    }

    pub fn cols(&self) -> usize {
        self.pixels.dim().1
    }

    /// Number of cells carrying image data (alpha > 0)
    pub fn opaque_cells(&self) -> usize {
        self.pixels
            .outer_iter()
            .map(|row| row.outer_iter().filter(|px| px[3] > 0).count())
            .sum()
    }
}

/// Pixel-space detection box from an external detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub class_id: u32,
}

impl DetectionBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64, class_id: u32) -> Self {
        Self { x1, y1, x2, y2, class_id }
    }

    /// Pixel corners clockwise from top-left, as (col, row)
    pub fn corners(&self) -> [[f64; 2]; 4] {
        [
            [self.x1, self.y1],
            [self.x2, self.y1],
            [self.x2, self.y2],
            [self.x1, self.y2],
        ]
    }
}

/// Error types for orthophoto processing
#[derive(Debug, thiserror::Error)]
pub enum OrthoError {
    #[error("Unsupported attitude convention: {0}")]
    UnsupportedConvention(String),

    #[error("Unsupported CRS: EPSG:{0}")]
    UnsupportedCrs(u32),

    #[error("Coordinate ({x}, {y}) outside the valid domain of EPSG:{epsg}")]
    OutOfDomain { x: f64, y: f64, epsg: u32 },

    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Invalid camera intrinsics: {0}")]
    InvalidIntrinsics(String),

    #[error("Flying height {flying_height:.2} m is below the minimum of {minimum:.2} m")]
    InsufficientAltitude { flying_height: f64, minimum: f64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported camera: {0}")]
    UnsupportedCamera(String),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "gdal")]
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
}

/// Result type for orthophoto operations
pub type OrthoResult<T> = Result<T, OrthoError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(focal: f64, sensor: f64, width: usize, height: usize) -> bool {
        matches!(
            CameraIntrinsics::new(focal, sensor, width, height),
            Err(OrthoError::InvalidIntrinsics(_))
        )
    }

    #[test]
    fn test_intrinsics_accepts_positive_values() {
        let intrinsics = CameraIntrinsics::new(0.0047, 6.3, 4000, 3000).unwrap();
        assert_eq!(intrinsics.image_width, 4000);
        assert_eq!(intrinsics.image_height, 3000);
    }

    #[test]
    fn test_intrinsics_rejects_bad_focal_length() {
        assert!(rejected(0.0, 6.3, 4000, 3000));
        assert!(rejected(-0.01, 6.3, 4000, 3000));
        assert!(rejected(f64::NAN, 6.3, 4000, 3000));
        assert!(rejected(f64::INFINITY, 6.3, 4000, 3000));
    }

    #[test]
    fn test_intrinsics_rejects_bad_sensor_width() {
        assert!(rejected(0.0047, 0.0, 4000, 3000));
        assert!(rejected(0.0047, -1.0, 4000, 3000));
        assert!(rejected(0.0047, f64::NAN, 4000, 3000));
    }

    #[test]
    fn test_intrinsics_rejects_empty_image() {
        assert!(rejected(0.0047, 6.3, 0, 3000));
        assert!(rejected(0.0047, 6.3, 4000, 0));
    }
}
