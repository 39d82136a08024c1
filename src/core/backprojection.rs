use crate::core::rotation::GroundToCamera;
use crate::types::{CameraIntrinsics, Envelope, OrthoError, OrthoResult, PlanarEo, RgbaRaster};
use ndarray::{Array3, ArrayView3, ArrayViewMut2, Axis};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[cfg(feature = "parallel")]
use ndarray::parallel::prelude::*;

/// Interpolation methods for resampling the source image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMethod {
    Nearest,
    Bilinear,
}

impl Default for InterpolationMethod {
    fn default() -> Self {
        InterpolationMethod::Bilinear
    }
}

impl FromStr for InterpolationMethod {
    type Err = OrthoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nearest" => Ok(InterpolationMethod::Nearest),
            "bilinear" => Ok(InterpolationMethod::Bilinear),
            _ => Err(OrthoError::InvalidInput(format!(
                "unknown interpolation method: {}",
                s
            ))),
        }
    }
}

/// Default cap on either side of a resampled raster, in cells
pub const DEFAULT_MAX_OUTPUT_DIMENSION: usize = 20_000;

/// Output raster size `(rows, cols)` covering `envelope` at `gsd`
pub fn raster_dimensions(envelope: &Envelope, gsd: f64) -> (usize, usize) {
    let rows = (envelope.height() / gsd).ceil() as usize;
    let cols = (envelope.width() / gsd).ceil() as usize;
    (rows, cols)
}

/// Inverse camera projection from ground cells to source pixels.
///
/// All geometry is evaluated in f64; only the sampled colors are rounded to u8.
pub struct BackProjector<'a> {
    intrinsics: &'a CameraIntrinsics,
    r_gc: &'a GroundToCamera,
    eo: &'a PlanarEo,
    ground_height: f64,
    interpolation: InterpolationMethod,
    max_dimension: usize,
}

impl<'a> BackProjector<'a> {
    pub fn new(
        intrinsics: &'a CameraIntrinsics,
        r_gc: &'a GroundToCamera,
        eo: &'a PlanarEo,
        ground_height: f64,
        interpolation: InterpolationMethod,
    ) -> Self {
        Self {
            intrinsics,
            r_gc,
            eo,
            ground_height,
            interpolation,
            max_dimension: DEFAULT_MAX_OUTPUT_DIMENSION,
        }
    }

    /// Largest accepted output side in cells
    pub fn with_max_dimension(mut self, max_dimension: usize) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    /// Continuous source pixel coordinate `(col, row)` seen at ground point (x, y),
    /// or `None` when the point lies behind the camera
    pub fn ground_to_pixel(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let v = self.r_gc.apply([
            x - self.eo.easting,
            y - self.eo.northing,
            self.ground_height - self.eo.height,
        ]);
        if !(v[2] < 0.0) {
            return None;
        }

        let f = self.intrinsics.focal_length;
        let pixel_size = self.intrinsics.pixel_size();
        let (cx, cy) = self.intrinsics.principal_point();

        let image_x = -f * v[0] / v[2];
        let image_y = -f * v[1] / v[2];
        Some((image_x / pixel_size + cx, cy - image_y / pixel_size))
    }

    /// Resample `source` (rows x cols x channels) onto the ground grid.
    ///
    /// Returns the RGBA raster and the number of cells that received image data.
    pub fn resample(
        &self,
        source: ArrayView3<'_, u8>,
        envelope: &Envelope,
        gsd: f64,
    ) -> OrthoResult<(RgbaRaster, usize)> {
        let (src_rows, src_cols, channels) = source.dim();
        if src_rows != self.intrinsics.image_height || src_cols != self.intrinsics.image_width {
            return Err(OrthoError::InvalidInput(format!(
                "source image is {}x{} but intrinsics describe {}x{}",
                src_cols, src_rows, self.intrinsics.image_width, self.intrinsics.image_height
            )));
        }
        if !matches!(channels, 1 | 3 | 4) {
            return Err(OrthoError::InvalidInput(format!(
                "unsupported channel count: {}",
                channels
            )));
        }
        if !(gsd.is_finite() && gsd > 0.0) {
            return Err(OrthoError::InvalidInput(format!("invalid GSD: {}", gsd)));
        }

        if !envelope.is_valid() {
            return Err(OrthoError::DegenerateGeometry(format!(
                "empty or inverted output envelope: {:?}",
                envelope
            )));
        }

        let (rows, cols) = raster_dimensions(envelope, gsd);
        if rows > self.max_dimension || cols > self.max_dimension {
            return Err(OrthoError::DegenerateGeometry(format!(
                "output raster {}x{} exceeds the maximum dimension of {}",
                cols, rows, self.max_dimension
            )));
        }
        log::info!(
            "Backprojecting {}x{} cells at {:.4} m GSD ({:?})",
            cols,
            rows,
            gsd,
            self.interpolation
        );

        let mut raster = Array3::<u8>::zeros((rows, cols, 4));

        #[cfg(feature = "parallel")]
        let opaque: usize = raster
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .map(|(row, line)| self.fill_row(&source, envelope, gsd, row, line))
            .sum();

        #[cfg(not(feature = "parallel"))]
        let opaque: usize = raster
            .axis_iter_mut(Axis(0))
            .enumerate()
            .map(|(row, line)| self.fill_row(&source, envelope, gsd, row, line))
            .sum();

        let total = rows * cols;
        let coverage = if total > 0 {
            opaque as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        log::info!("✅ Resampling completed: {:.1}% of the envelope covered", coverage);

        Ok((raster, opaque))
    }

    /// Fill one output row; returns the number of opaque cells written
    fn fill_row(
        &self,
        source: &ArrayView3<'_, u8>,
        envelope: &Envelope,
        gsd: f64,
        row: usize,
        mut line: ArrayViewMut2<'_, u8>,
    ) -> usize {
        let (src_rows, src_cols, _) = source.dim();
        let y = envelope.max_y - (row as f64 + 0.5) * gsd;
        let mut opaque = 0;

        for (col, mut cell) in line.axis_iter_mut(Axis(0)).enumerate() {
            let x = envelope.min_x + (col as f64 + 0.5) * gsd;

            let rgb = self.ground_to_pixel(x, y).and_then(|(px, py)| {
                let inside = px >= 0.0 && py >= 0.0 && px < src_cols as f64 && py < src_rows as f64;
                if !inside {
                    return None;
                }
                Some(match self.interpolation {
                    InterpolationMethod::Nearest => sample_nearest(source, px, py),
                    InterpolationMethod::Bilinear => sample_bilinear(source, px, py),
                })
            });

            match rgb {
                Some([r, g, b]) => {
                    cell[0] = r;
                    cell[1] = g;
                    cell[2] = b;
                    cell[3] = u8::MAX;
                    opaque += 1;
                }
                None => cell.fill(0),
            }
        }

        opaque
    }
}

/// RGB of one source pixel; gray images are replicated, alpha is dropped
fn pixel_rgb(source: &ArrayView3<'_, u8>, row: usize, col: usize) -> [f64; 3] {
    if source.dim().2 == 1 {
        let v = source[[row, col, 0]] as f64;
        [v, v, v]
    } else {
        [
            source[[row, col, 0]] as f64,
            source[[row, col, 1]] as f64,
            source[[row, col, 2]] as f64,
        ]
    }
}

fn to_u8(rgb: [f64; 3]) -> [u8; 3] {
    rgb.map(|v| v.round().clamp(0.0, 255.0) as u8)
}

/// Nearest-neighbor sample at continuous pixel coordinate (px, py)
fn sample_nearest(source: &ArrayView3<'_, u8>, px: f64, py: f64) -> [u8; 3] {
    let (rows, cols, _) = source.dim();
    let col = (px.floor() as usize).min(cols - 1);
    let row = (py.floor() as usize).min(rows - 1);
    to_u8(pixel_rgb(source, row, col))
}

/// Bilinear sample at continuous pixel coordinate (px, py); pixel centers sit at +0.5
fn sample_bilinear(source: &ArrayView3<'_, u8>, px: f64, py: f64) -> [u8; 3] {
    let (rows, cols, _) = source.dim();
    let x = (px - 0.5).clamp(0.0, (cols - 1) as f64);
    let y = (py - 0.5).clamp(0.0, (rows - 1) as f64);

    let x1 = x.floor() as usize;
    let y1 = y.floor() as usize;
    let x2 = (x1 + 1).min(cols - 1);
    let y2 = (y1 + 1).min(rows - 1);

    let dx = x - x1 as f64;
    let dy = y - y1 as f64;

    let v11 = pixel_rgb(source, y1, x1);
    let v12 = pixel_rgb(source, y2, x1);
    let v21 = pixel_rgb(source, y1, x2);
    let v22 = pixel_rgb(source, y2, x2);

    let mut out = [0.0; 3];
    for c in 0..3 {
        out[c] = v11[c] * (1.0 - dx) * (1.0 - dy)
            + v21[c] * dx * (1.0 - dy)
            + v12[c] * (1.0 - dx) * dy
            + v22[c] * dx * dy;
    }
    to_u8(out)
}
