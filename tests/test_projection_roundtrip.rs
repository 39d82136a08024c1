use approx::assert_abs_diff_eq;
use droneortho::core::projection::{geographic_eo_to_plane, plane_eo_to_geographic};
use droneortho::{Attitude, Crs, GeographicEo, OrthoError};

/// (epsg, lon, lat) samples inside each supported CRS
const SAMPLES: &[(u32, f64, f64)] = &[
    (5185, 125.3, 37.1),
    (5186, 126.98, 37.57),
    (5187, 129.07, 35.18),
    (5188, 130.9, 37.48),
    (5179, 127.5, 36.2),
    (32652, 127.8, 36.4),
    (32652, 133.5, 70.0),
    (32752, 131.0, -25.3),
    (3857, -73.98, 40.75),
    (3857, 151.2, -33.86),
];

#[test]
fn test_geographic_roundtrip() {
    let _ = env_logger::builder().is_test(true).try_init();

    for &(epsg, lon, lat) in SAMPLES {
        let crs = Crs::from_epsg(epsg).unwrap();
        let (e, n) = crs.forward(lon, lat).unwrap();
        let (lon2, lat2) = crs.inverse(e, n).unwrap();
        assert_abs_diff_eq!(lon, lon2, epsilon = 1e-9);
        assert_abs_diff_eq!(lat, lat2, epsilon = 1e-9);
    }
}

/// Points sitting exactly on a domain boundary
const EDGE_SAMPLES: &[(u32, f64, f64)] = &[
    (3857, 180.0, 10.0),
    (3857, -180.0, 10.0),
    (3857, 0.0, 85.051_128_779_806_6),
    (32652, 129.0, -1.0),
    (32752, 129.0, 1.0),
    (5186, 135.0, 37.0),
    (5186, 119.0, 37.0),
    (32652, 137.0, 45.0),
];

#[test]
fn test_domain_edges_roundtrip() {
    for &(epsg, lon, lat) in EDGE_SAMPLES {
        let crs = Crs::from_epsg(epsg).unwrap();
        let (e, n) = crs.forward(lon, lat).unwrap();
        let (lon2, lat2) = crs
            .inverse(e, n)
            .unwrap_or_else(|err| panic!("EPSG:{} ({}, {}): {}", epsg, lon, lat, err));
        assert_abs_diff_eq!(lon, lon2, epsilon = 1e-9);
        assert_abs_diff_eq!(lat, lat2, epsilon = 1e-9);

        // The recovered point is accepted by the forward projection again
        assert!(crs.forward(lon2, lat2).is_ok());
    }
}

#[test]
fn test_eo_roundtrip_keeps_attitude() {
    let attitude = Attitude::new(0.01, -0.02, 1.3);
    let eo = GeographicEo {
        lon: 126.9,
        lat: 37.4,
        altitude: 215.5,
        attitude,
    };
    let crs = Crs::from_epsg(5186).unwrap();

    let planar = geographic_eo_to_plane(&eo, &crs).unwrap();
    assert_eq!(planar.epsg, 5186);
    assert_eq!(planar.height, 215.5);
    assert_eq!(planar.attitude, attitude);

    let back = plane_eo_to_geographic(&planar, &crs).unwrap();
    assert_abs_diff_eq!(back.lon, eo.lon, epsilon = 1e-9);
    assert_abs_diff_eq!(back.lat, eo.lat, epsilon = 1e-9);
    assert_eq!(back.altitude, eo.altitude);
}

#[test]
fn test_korean_belts_share_false_origin() {
    for (epsg, lon0) in [(5185u32, 125.0), (5186, 127.0), (5187, 129.0), (5188, 131.0)] {
        let crs = Crs::from_epsg(epsg).unwrap();
        let (e, n) = crs.forward(lon0, 38.0).unwrap();
        assert_abs_diff_eq!(e, 200_000.0, epsilon = 1e-6);
        assert_abs_diff_eq!(n, 600_000.0, epsilon = 1e-6);
    }
}

#[test]
fn test_out_of_domain_points() {
    let utm_north = Crs::from_epsg(32652).unwrap();
    assert!(matches!(utm_north.forward(129.0, -10.0), Err(OrthoError::OutOfDomain { .. })));

    let mercator = Crs::from_epsg(3857).unwrap();
    assert!(matches!(mercator.forward(0.0, 89.0), Err(OrthoError::OutOfDomain { .. })));

    let belt = Crs::from_epsg(5186).unwrap();
    assert!(matches!(belt.forward(f64::NAN, 37.0), Err(OrthoError::OutOfDomain { .. })));
    assert!(matches!(belt.inverse(f64::INFINITY, 0.0), Err(OrthoError::OutOfDomain { .. })));

    assert!(matches!(Crs::from_epsg(2097), Err(OrthoError::UnsupportedCrs(2097))));
}
