//! Python bindings

use crate::core::{AxisConvention, InterpolationMethod, OrthoConfig, Orthorectifier};
use crate::types::{CameraIntrinsics, DetectionBox, OrthoError, RawAttitude, RawEo};
use numpy::{PyReadonlyArray3, ToPyArray};
use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

impl From<OrthoError> for PyErr {
    fn from(err: OrthoError) -> PyErr {
        match err {
            OrthoError::Io(e) => PyIOError::new_err(e.to_string()),
            other => PyValueError::new_err(other.to_string()),
        }
    }
}

/// (lon, lat, altitude, roll, pitch, yaw) with angles in degrees
type EoTuple = (f64, f64, f64, f64, f64, f64);

fn raw_eo(eo: EoTuple) -> RawEo {
    RawEo {
        lon: eo.0,
        lat: eo.1,
        altitude: eo.2,
        attitude: RawAttitude {
            roll: eo.3,
            pitch: eo.4,
            yaw: eo.5,
        },
    }
}

/// Rectify an (rows, cols, channels) uint8 image
#[pyfunction]
#[pyo3(signature = (image, focal_length, sensor_width, eo, convention, ground_height, epsg, gsd=None, interpolation="bilinear"))]
#[allow(clippy::too_many_arguments)]
fn rectify(
    py: Python,
    image: PyReadonlyArray3<u8>,
    focal_length: f64,
    sensor_width: f64,
    eo: EoTuple,
    convention: &str,
    ground_height: f64,
    epsg: u32,
    gsd: Option<f64>,
    interpolation: &str,
) -> PyResult<PyObject> {
    let view = image.as_array();
    let (rows, cols, _) = view.dim();
    let intrinsics = CameraIntrinsics::new(focal_length, sensor_width, cols, rows)?;
    let convention: AxisConvention = convention.parse()?;
    let interpolation: InterpolationMethod = interpolation.parse()?;

    let rectifier = Orthorectifier::new(OrthoConfig {
        interpolation,
        ..OrthoConfig::default()
    });
    let geometry = rectifier.prepare(intrinsics, &raw_eo(eo), convention, ground_height, epsg)?;
    let product = py.allow_threads(|| rectifier.rectify(view, &geometry, gsd))?;

    let result = PyDict::new(py);
    result.set_item("data", product.raster.pixels.to_pyarray(py))?;
    result.set_item("geotransform", product.raster.transform.to_array().to_vec())?;
    result.set_item("gsd", product.raster.gsd)?;
    result.set_item("epsg", product.raster.epsg)?;
    result.set_item("footprint_wkt", product.footprint_wkt.clone())?;
    result.set_item("footprint_wkt_4326", product.footprint_wkt_geographic()?)?;
    Ok(result.into())
}

/// Ground polygon of a (x1, y1, x2, y2, class_id) detection box
#[pyfunction]
#[allow(clippy::too_many_arguments)]
fn transform_detection(
    py: Python,
    bbox: (f64, f64, f64, f64, u32),
    image_width: usize,
    image_height: usize,
    focal_length: f64,
    sensor_width: f64,
    eo: EoTuple,
    convention: &str,
    ground_height: f64,
    epsg: u32,
) -> PyResult<PyObject> {
    let intrinsics = CameraIntrinsics::new(focal_length, sensor_width, image_width, image_height)?;
    let convention: AxisConvention = convention.parse()?;
    let detection = DetectionBox::new(bbox.0, bbox.1, bbox.2, bbox.3, bbox.4);

    let rectifier = Orthorectifier::standard();
    let geometry = rectifier.prepare(intrinsics, &raw_eo(eo), convention, ground_height, epsg)?;
    let footprint = rectifier.transform_detection(&detection, &geometry)?;

    let result = PyDict::new(py);
    result.set_item("class_id", footprint.class_id)?;
    result.set_item("wkt", footprint.wkt.clone())?;
    result.set_item("wkt_4326", footprint.wkt_geographic()?)?;
    Ok(result.into())
}

#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(rectify, m)?)?;
    m.add_function(wrap_pyfunction!(transform_detection, m)?)?;
    Ok(())
}
