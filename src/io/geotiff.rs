use crate::core::boundary::OrthoProduct;
use crate::types::OrthoResult;
use gdal::raster::{Buffer, ColorInterpretation, RasterCreationOption};
use gdal::spatial_ref::SpatialRef;
use gdal::DriverManager;
use ndarray::Axis;
use std::path::Path;

/// Four-band (RGBA, u8) GeoTIFF output
pub struct GeoTiffWriter {
    compression: Option<String>,
}

impl Default for GeoTiffWriter {
    fn default() -> Self {
        Self {
            compression: Some("LZW".to_string()),
        }
    }
}

impl GeoTiffWriter {
    pub fn new(compression: Option<&str>) -> Self {
        Self {
            compression: compression.map(str::to_string),
        }
    }

    pub fn write<P: AsRef<Path>>(&self, product: &OrthoProduct, output_path: P) -> OrthoResult<()> {
        log::info!("Saving orthophoto as GeoTIFF: {}", output_path.as_ref().display());

        let raster = &product.raster;
        let (height, width) = (raster.rows(), raster.cols());

        let driver = DriverManager::get_driver_by_name("GTiff")?;
        // GTiff only reads compression as a creation option
        let options: Vec<RasterCreationOption> = self
            .compression
            .as_deref()
            .map(|value| RasterCreationOption { key: "COMPRESS", value })
            .into_iter()
            .collect();
        let mut dataset = driver.create_with_band_type_with_options::<u8, _>(
            output_path.as_ref(),
            width as isize,
            height as isize,
            4,
            &options,
        )?;

        dataset.set_geo_transform(&raster.transform.to_array())?;
        dataset.set_spatial_ref(&SpatialRef::from_epsg(raster.epsg)?)?;

        let interpretations = [
            ColorInterpretation::RedBand,
            ColorInterpretation::GreenBand,
            ColorInterpretation::BlueBand,
            ColorInterpretation::AlphaBand,
        ];
        for (index, interpretation) in interpretations.into_iter().enumerate() {
            let mut band = dataset.rasterband(index as isize + 1)?;
            let plane: Vec<u8> = raster.pixels.index_axis(Axis(2), index).iter().copied().collect();
            let buffer = Buffer::new((width, height), plane);
            band.write((0, 0), (width, height), &buffer)?;
            band.set_color_interpretation(interpretation)?;
        }

        log::info!("✅ GeoTIFF saved successfully");
        Ok(())
    }
}
