//! Input/output for EO files and orthophoto products

pub mod eo_file;
pub mod writer;
#[cfg(feature = "gdal")]
pub mod geotiff;

pub use eo_file::{EoFileReader, EoRecord};
pub use writer::{write_boundary_wkt, write_metadata_json, write_sidecars, write_world_file};
#[cfg(feature = "gdal")]
pub use geotiff::GeoTiffWriter;
