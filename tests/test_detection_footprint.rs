use approx::assert_abs_diff_eq;
use droneortho::core::backprojection::BackProjector;
use droneortho::core::boundary::ImageMetadata;
use droneortho::{
    transform_detection, AxisConvention, CameraIntrinsics, DetectionBox, ImageGeometry, InterpolationMethod,
    OrthoError, Orthorectifier, RawAttitude, RawEo,
};
use ndarray::Array3;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn tilted_eo() -> RawEo {
    RawEo {
        lon: 127.02,
        lat: 37.55,
        altitude: 150.0,
        attitude: RawAttitude { roll: 4.0, pitch: -6.0, yaw: 120.0 },
    }
}

fn geometry(intrinsics: CameraIntrinsics) -> (Orthorectifier, ImageGeometry) {
    let rectifier = Orthorectifier::standard();
    let geometry = rectifier
        .prepare(intrinsics, &tilted_eo(), AxisConvention::Opk, 12.0, 5186)
        .unwrap();
    (rectifier, geometry)
}

#[test]
fn test_full_image_box_matches_image_footprint() {
    init_logging();

    let intrinsics = CameraIntrinsics::new(0.0088, 13.2, 5472, 3648).unwrap();
    let (rectifier, geometry) = geometry(intrinsics);
    let footprint = geometry.footprint_estimator().estimate().unwrap();

    let detection = DetectionBox::new(0.0, 0.0, 5472.0, 3648.0, 7);
    let object = rectifier.transform_detection(&detection, &geometry).unwrap();

    assert_eq!(object.class_id, 7);
    assert_eq!(object.epsg, 5186);
    for (a, b) in object.corners.iter().zip(footprint.corners.iter()) {
        assert_abs_diff_eq!(a[0], b[0], epsilon = 1e-9);
        assert_abs_diff_eq!(a[1], b[1], epsilon = 1e-9);
    }
}

#[test]
fn test_detection_corners_backproject_onto_box() {
    let intrinsics = CameraIntrinsics::new(0.0088, 13.2, 5472, 3648).unwrap();
    let (rectifier, geometry) = geometry(intrinsics);

    let detection = DetectionBox::new(1200.0, 800.0, 1350.5, 910.25, 2);
    let object = rectifier.transform_detection(&detection, &geometry).unwrap();

    let projector = BackProjector::new(
        &geometry.intrinsics,
        &geometry.r_gc,
        &geometry.eo,
        geometry.ground_height,
        InterpolationMethod::Bilinear,
    );
    for (ground, pixel) in object.corners.iter().zip(detection.corners().iter()) {
        let (px, py) = projector.ground_to_pixel(ground[0], ground[1]).unwrap();
        assert_abs_diff_eq!(px, pixel[0], epsilon = 1e-6);
        assert_abs_diff_eq!(py, pixel[1], epsilon = 1e-6);
    }
}

#[test]
fn test_detection_lies_inside_orthophoto() {
    let image = Array3::<u8>::from_elem((90, 120, 3), 200);
    let intrinsics = CameraIntrinsics::new(0.0047, 6.3, 120, 90).unwrap();
    let (rectifier, geometry) = geometry(intrinsics);

    let product = rectifier.rectify(image.view(), &geometry, None).unwrap();
    let detection = DetectionBox::new(40.0, 30.0, 80.0, 60.0, 1);
    let object = rectifier.transform_detection(&detection, &geometry).unwrap();

    let envelope = product.footprint.envelope;
    for corner in &object.corners {
        assert!(corner[0] > envelope.min_x && corner[0] < envelope.max_x);
        assert!(corner[1] > envelope.min_y && corner[1] < envelope.max_y);

        // The raster cell under each corner carries image data
        let col = ((corner[0] - envelope.min_x) / product.raster.gsd) as usize;
        let row = ((envelope.max_y - corner[1]) / product.raster.gsd) as usize;
        assert_eq!(product.raster.pixels[[row, col, 3]], 255);
    }

    let metadata = ImageMetadata::new("img_0001", &product, &geometry.eo, vec![object.to_metadata("0")]);
    let json: serde_json::Value = serde_json::from_str(&metadata.to_json().unwrap()).unwrap();
    assert_eq!(json["epsg"], 5186);
    assert_eq!(json["objects"][0]["obj_type"], 1);
    assert_eq!(json["objects"][0]["obj_boundary"], object.wkt.as_str());
}

#[test]
fn test_free_function_matches_rectifier() {
    let intrinsics = CameraIntrinsics::new(0.0047, 6.3, 4000, 3000).unwrap();
    let detection = DetectionBox::new(100.0, 200.0, 300.0, 400.0, 5);

    let object = transform_detection(&detection, intrinsics, &tilted_eo(), AxisConvention::Opk, 12.0, 5186).unwrap();
    let (rectifier, geometry) = geometry(intrinsics);
    assert_eq!(object, rectifier.transform_detection(&detection, &geometry).unwrap());

    let geographic = object.wkt_geographic().unwrap();
    assert!(geographic.starts_with("POLYGON ((127.0"));
}

#[test]
fn test_invalid_boxes() {
    let intrinsics = CameraIntrinsics::new(0.0047, 6.3, 4000, 3000).unwrap();
    let (rectifier, geometry) = geometry(intrinsics);

    let inverted = DetectionBox::new(300.0, 200.0, 100.0, 400.0, 0);
    assert!(matches!(
        rectifier.transform_detection(&inverted, &geometry),
        Err(OrthoError::InvalidInput(_))
    ));

    let nan = DetectionBox::new(f64::NAN, 0.0, 10.0, 10.0, 0);
    assert!(matches!(
        rectifier.transform_detection(&nan, &geometry),
        Err(OrthoError::InvalidInput(_))
    ));
}
