use crate::core::boundary::{ImageMetadata, OrthoProduct};
use crate::types::{GeoTransform, OrthoResult};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write an ESRI world file: A, D, B, E, C, F, one value per line, with
/// (C, F) at the center of the top-left cell
pub fn write_world_file<P: AsRef<Path>>(path: P, transform: &GeoTransform) -> OrthoResult<()> {
    let [c, f] = transform.cell_center(0, 0);
    let mut out = BufWriter::new(File::create(path.as_ref())?);
    for value in [
        transform.pixel_width,
        transform.rotation_y,
        transform.rotation_x,
        transform.pixel_height,
        c,
        f,
    ] {
        writeln!(out, "{}", value)?;
    }
    out.flush()?;
    log::debug!("World file written: {}", path.as_ref().display());
    Ok(())
}

pub fn write_boundary_wkt<P: AsRef<Path>>(path: P, wkt: &str) -> OrthoResult<()> {
    std::fs::write(path.as_ref(), format!("{}\n", wkt))?;
    log::debug!("Boundary WKT written: {}", path.as_ref().display());
    Ok(())
}

pub fn write_metadata_json<P: AsRef<Path>>(path: P, metadata: &ImageMetadata) -> OrthoResult<()> {
    let file = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer_pretty(file, metadata)?;
    Ok(())
}

/// Sidecar files next to a raster at `raster_path`: `<stem>.wld` and `<stem>.wkt`
pub fn write_sidecars<P: AsRef<Path>>(raster_path: P, product: &OrthoProduct) -> OrthoResult<()> {
    let raster_path = raster_path.as_ref();
    write_world_file(raster_path.with_extension("wld"), &product.raster.transform)?;
    write_boundary_wkt(raster_path.with_extension("wkt"), &product.footprint_wkt)?;
    log::info!("Sidecar files written for {}", raster_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Envelope;

    #[test]
    fn test_world_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ortho.wld");
        let envelope = Envelope {
            min_x: 1000.0,
            max_x: 1010.0,
            min_y: 2000.0,
            max_y: 2008.0,
        };
        write_world_file(&path, &GeoTransform::north_up(&envelope, 0.5)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["0.5", "0", "0", "-0.5", "1000.25", "2007.75"]);
    }

    #[test]
    fn test_boundary_wkt_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ortho.wkt");
        write_boundary_wkt(&path, "POLYGON ((0 0, 1 0, 1 1, 0 0))").unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim_end(), "POLYGON ((0 0, 1 0, 1 1, 0 0))");
    }
}
