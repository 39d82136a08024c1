//! Geographic <-> planar coordinate conversion for the projected CRSs used to
//! rectify imagery.
//!
//! Transverse Mercator uses the 6th-order Krüger series (Karney 2011), which
//! keeps forward/inverse round trips well below a millimeter across a zone.
//! Web Mercator is the spherical EPSG:3857 formulation.

use crate::types::{GeographicEo, OrthoError, OrthoResult, PlanarEo};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

/// WGS84 semi-major axis
const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// GRS80 shares the semi-major axis with WGS84
const GRS80_F: f64 = 1.0 / 298.257_222_101;

/// Web Mercator latitude limit (square world)
pub const WEB_MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_6;
/// Largest longitude offset from the central meridian accepted by TM
const TM_MAX_LON_OFFSET_DEG: f64 = 8.0;
const TM_MAX_ABS_LAT_DEG: f64 = 84.0;
/// Rounding slack allowed on coordinates recovered by `Crs::inverse`
const INVERSE_DOMAIN_TOLERANCE_DEG: f64 = 1e-9;

/// Reference ellipsoid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipsoid {
    pub a: f64,
    pub f: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid { a: WGS84_A, f: WGS84_F };
    pub const GRS80: Ellipsoid = Ellipsoid { a: WGS84_A, f: GRS80_F };

    /// First eccentricity
    pub fn eccentricity(&self) -> f64 {
        (self.f * (2.0 - self.f)).sqrt()
    }
}

/// Transverse Mercator definition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TmParams {
    pub ellipsoid: Ellipsoid,
    pub lat0: f64, // degrees
    pub lon0: f64, // degrees
    pub k0: f64,
    pub false_easting: f64,
    pub false_northing: f64,
    /// Latitude range (degrees) accepted by this CRS
    pub lat_range: (f64, f64),
}

/// Supported projection families
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    TransverseMercator(TmParams),
    WebMercator,
}

/// A projected coordinate reference system identified by EPSG code
#[derive(Debug, Clone, PartialEq)]
pub struct Crs {
    epsg: u32,
    projection: Projection,
    tm: Option<KruegerSeries>,
}

impl Crs {
    /// Resolve an EPSG code into a projection definition
    pub fn from_epsg(epsg: u32) -> OrthoResult<Self> {
        let korea_belt = |lon0: f64| TmParams {
            ellipsoid: Ellipsoid::GRS80,
            lat0: 38.0,
            lon0,
            k0: 1.0,
            false_easting: 200_000.0,
            false_northing: 600_000.0,
            lat_range: (-TM_MAX_ABS_LAT_DEG, TM_MAX_ABS_LAT_DEG),
        };

        let projection = match epsg {
            // Korea 2000 / West, Central, East, East Sea belt 2010
            5185 => Projection::TransverseMercator(korea_belt(125.0)),
            5186 => Projection::TransverseMercator(korea_belt(127.0)),
            5187 => Projection::TransverseMercator(korea_belt(129.0)),
            5188 => Projection::TransverseMercator(korea_belt(131.0)),
            // Korea 2000 / Unified CS
            5179 => Projection::TransverseMercator(TmParams {
                ellipsoid: Ellipsoid::GRS80,
                lat0: 38.0,
                lon0: 127.5,
                k0: 0.9996,
                false_easting: 1_000_000.0,
                false_northing: 2_000_000.0,
                lat_range: (-TM_MAX_ABS_LAT_DEG, TM_MAX_ABS_LAT_DEG),
            }),
            // WGS 84 / UTM north
            32601..=32660 => Projection::TransverseMercator(utm_params(epsg - 32600, true)),
            // WGS 84 / UTM south
            32701..=32760 => Projection::TransverseMercator(utm_params(epsg - 32700, false)),
            3857 => Projection::WebMercator,
            _ => return Err(OrthoError::UnsupportedCrs(epsg)),
        };

        let tm = match &projection {
            Projection::TransverseMercator(params) => Some(KruegerSeries::new(params)),
            Projection::WebMercator => None,
        };

        Ok(Self { epsg, projection, tm })
    }

    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    fn check_geographic(&self, lon: f64, lat: f64) -> OrthoResult<()> {
        self.check_geographic_within(lon, lat, 0.0)
    }

    /// Domain check with `tolerance` degrees of slack on every bound
    fn check_geographic_within(&self, lon: f64, lat: f64, tolerance: f64) -> OrthoResult<()> {
        let out_of_domain = OrthoError::OutOfDomain { x: lon, y: lat, epsg: self.epsg };
        if !(lon.is_finite() && lat.is_finite()) {
            return Err(out_of_domain);
        }
        let inside = match &self.projection {
            Projection::TransverseMercator(p) => {
                lat >= p.lat_range.0 - tolerance
                    && lat <= p.lat_range.1 + tolerance
                    && normalize_lon(lon - p.lon0).abs() <= TM_MAX_LON_OFFSET_DEG + tolerance
            }
            Projection::WebMercator => {
                lat.abs() <= WEB_MERCATOR_MAX_LAT + tolerance && lon.abs() <= 180.0 + tolerance
            }
        };
        if inside {
            Ok(())
        } else {
            Err(out_of_domain)
        }
    }

    /// (lon, lat) degrees -> (easting, northing) meters
    pub fn forward(&self, lon: f64, lat: f64) -> OrthoResult<(f64, f64)> {
        self.check_geographic(lon, lat)?;
        match (&self.projection, &self.tm) {
            (Projection::TransverseMercator(p), Some(series)) => {
                let (x, y) = series.forward(lat.to_radians(), normalize_lon(lon - p.lon0).to_radians());
                Ok((p.false_easting + x, p.false_northing + y - series.y0))
            }
            _ => {
                let x = WGS84_A * lon.to_radians();
                let y = WGS84_A * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
                Ok((x, y))
            }
        }
    }

    /// (easting, northing) meters -> (lon, lat) degrees
    pub fn inverse(&self, easting: f64, northing: f64) -> OrthoResult<(f64, f64)> {
        if !(easting.is_finite() && northing.is_finite()) {
            return Err(OrthoError::OutOfDomain { x: easting, y: northing, epsg: self.epsg });
        }
        let (lon, lat) = match (&self.projection, &self.tm) {
            (Projection::TransverseMercator(p), Some(series)) => {
                let x = easting - p.false_easting;
                let y = northing - p.false_northing + series.y0;
                let (lat, dlon) = series.inverse(x, y);
                (normalize_lon(p.lon0 + dlon.to_degrees()), lat.to_degrees())
            }
            _ => {
                let lon = (easting / WGS84_A).to_degrees();
                let lat = (2.0 * (northing / WGS84_A).exp().atan() - FRAC_PI_2).to_degrees();
                (lon, lat)
            }
        };
        self.check_geographic_within(lon, lat, INVERSE_DOMAIN_TOLERANCE_DEG)
            .map_err(|_| OrthoError::OutOfDomain { x: easting, y: northing, epsg: self.epsg })?;
        Ok(self.clamp_to_domain(lon, lat))
    }

    /// Snap a coordinate that overshoots the domain by rounding back onto its edge
    fn clamp_to_domain(&self, lon: f64, lat: f64) -> (f64, f64) {
        match &self.projection {
            Projection::TransverseMercator(p) => {
                let offset = normalize_lon(lon - p.lon0);
                let lon = if offset.abs() > TM_MAX_LON_OFFSET_DEG {
                    normalize_lon(p.lon0 + TM_MAX_LON_OFFSET_DEG.copysign(offset))
                } else {
                    lon
                };
                (lon, lat.clamp(p.lat_range.0, p.lat_range.1))
            }
            Projection::WebMercator => (
                lon.clamp(-180.0, 180.0),
                lat.clamp(-WEB_MERCATOR_MAX_LAT, WEB_MERCATOR_MAX_LAT),
            ),
        }
    }
}

fn utm_params(zone: u32, north: bool) -> TmParams {
    TmParams {
        ellipsoid: Ellipsoid::WGS84,
        lat0: 0.0,
        lon0: -183.0 + 6.0 * zone as f64,
        k0: 0.9996,
        false_easting: 500_000.0,
        false_northing: if north { 0.0 } else { 10_000_000.0 },
        // Allow a degree of overlap across the equator
        lat_range: if north { (-1.0, TM_MAX_ABS_LAT_DEG) } else { (-TM_MAX_ABS_LAT_DEG, 1.0) },
    }
}

/// Wrap a longitude difference into [-180, 180)
fn normalize_lon(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && lon > 0.0 {
        180.0
    } else {
        wrapped
    }
}

/// Precomputed Krüger series coefficients for one TM definition
#[derive(Debug, Clone, PartialEq)]
struct KruegerSeries {
    e: f64,
    /// k0 * rectifying radius
    k0_a: f64,
    alpha: [f64; 6],
    beta: [f64; 6],
    /// Northing of the latitude of origin on the central meridian
    y0: f64,
}

impl KruegerSeries {
    fn new(params: &TmParams) -> Self {
        let Ellipsoid { a, f } = params.ellipsoid;
        let e = params.ellipsoid.eccentricity();
        let n = f / (2.0 - f);
        let n2 = n * n;
        let n3 = n2 * n;
        let n4 = n3 * n;
        let n5 = n4 * n;
        let n6 = n5 * n;

        let big_a = a / (1.0 + n) * (1.0 + n2 / 4.0 + n4 / 64.0 + n6 / 256.0);

        let alpha = [
            n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0 + 41.0 * n4 / 180.0 - 127.0 * n5 / 288.0
                + 7891.0 * n6 / 37800.0,
            13.0 * n2 / 48.0 - 3.0 * n3 / 5.0 + 557.0 * n4 / 1440.0 + 281.0 * n5 / 630.0
                - 1983433.0 * n6 / 1935360.0,
            61.0 * n3 / 240.0 - 103.0 * n4 / 140.0 + 15061.0 * n5 / 26880.0
                + 167603.0 * n6 / 181440.0,
            49561.0 * n4 / 161280.0 - 179.0 * n5 / 168.0 + 6601661.0 * n6 / 7257600.0,
            34729.0 * n5 / 80640.0 - 3418889.0 * n6 / 1995840.0,
            212378941.0 * n6 / 319334400.0,
        ];

        let beta = [
            n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0 - n4 / 360.0 - 81.0 * n5 / 512.0
                + 96199.0 * n6 / 604800.0,
            n2 / 48.0 + n3 / 15.0 - 437.0 * n4 / 1440.0 + 46.0 * n5 / 105.0
                - 1118711.0 * n6 / 3870720.0,
            17.0 * n3 / 480.0 - 37.0 * n4 / 840.0 - 209.0 * n5 / 4480.0 + 5569.0 * n6 / 90720.0,
            4397.0 * n4 / 161280.0 - 11.0 * n5 / 504.0 - 830251.0 * n6 / 7257600.0,
            4583.0 * n5 / 161280.0 - 108847.0 * n6 / 3991680.0,
            20648693.0 * n6 / 638668800.0,
        ];

        let mut series = Self {
            e,
            k0_a: params.k0 * big_a,
            alpha,
            beta,
            y0: 0.0,
        };
        series.y0 = series.forward(params.lat0.to_radians(), 0.0).1;
        series
    }

    /// Conformal latitude tangent for geodetic latitude tangent `tau`
    fn conformal_tan(&self, tau: f64) -> f64 {
        let e = self.e;
        let sigma = (e * (e * tau / (1.0 + tau * tau).sqrt()).atanh()).sinh();
        tau * (1.0 + sigma * sigma).sqrt() - sigma * (1.0 + tau * tau).sqrt()
    }

    /// Latitude/longitude offset (radians) -> unshifted (x, y) meters
    fn forward(&self, lat: f64, dlon: f64) -> (f64, f64) {
        let tau_p = self.conformal_tan(lat.tan());
        let (sin_l, cos_l) = dlon.sin_cos();

        let xi_p = tau_p.atan2(cos_l);
        let eta_p = (sin_l / (tau_p * tau_p + cos_l * cos_l).sqrt()).asinh();

        let mut xi = xi_p;
        let mut eta = eta_p;
        for (j, alpha) in self.alpha.iter().enumerate() {
            let k = 2.0 * (j + 1) as f64;
            xi += alpha * (k * xi_p).sin() * (k * eta_p).cosh();
            eta += alpha * (k * xi_p).cos() * (k * eta_p).sinh();
        }

        (self.k0_a * eta, self.k0_a * xi)
    }

    /// Unshifted (x, y) meters -> (lat, dlon) radians
    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let xi = y / self.k0_a;
        let eta = x / self.k0_a;

        let mut xi_p = xi;
        let mut eta_p = eta;
        for (j, beta) in self.beta.iter().enumerate() {
            let k = 2.0 * (j + 1) as f64;
            xi_p -= beta * (k * xi).sin() * (k * eta).cosh();
            eta_p -= beta * (k * xi).cos() * (k * eta).sinh();
        }

        let sinh_eta_p = eta_p.sinh();
        let (sin_xi_p, cos_xi_p) = xi_p.sin_cos();
        let tau_p = sin_xi_p / (sinh_eta_p * sinh_eta_p + cos_xi_p * cos_xi_p).sqrt();

        // Newton iteration from conformal to geodetic latitude
        let e2 = self.e * self.e;
        let mut tau = tau_p;
        for _ in 0..10 {
            let tau_i_p = self.conformal_tan(tau);
            let delta = (tau_p - tau_i_p) / (1.0 + tau_i_p * tau_i_p).sqrt()
                * (1.0 + (1.0 - e2) * tau * tau)
                / ((1.0 - e2) * (1.0 + tau * tau).sqrt());
            tau += delta;
            if delta.abs() < 1e-14 {
                break;
            }
        }

        (tau.atan(), sinh_eta_p.atan2(cos_xi_p))
    }
}

/// Project a geographic coordinate onto the plane of `epsg`
pub fn geographic_to_plane(lon: f64, lat: f64, epsg: u32) -> OrthoResult<(f64, f64)> {
    Crs::from_epsg(epsg)?.forward(lon, lat)
}

/// Unproject a planar coordinate of `epsg` back to (lon, lat)
pub fn plane_to_geographic(easting: f64, northing: f64, epsg: u32) -> OrthoResult<(f64, f64)> {
    Crs::from_epsg(epsg)?.inverse(easting, northing)
}

/// Convert a whole EO vector; the attitude is carried over unchanged
pub fn geographic_eo_to_plane(eo: &GeographicEo, crs: &Crs) -> OrthoResult<PlanarEo> {
    let (easting, northing) = crs.forward(eo.lon, eo.lat)?;
    log::debug!(
        "EO ({:.7}, {:.7}) -> EPSG:{} ({:.3}, {:.3})",
        eo.lon,
        eo.lat,
        crs.epsg(),
        easting,
        northing
    );
    Ok(PlanarEo {
        easting,
        northing,
        height: eo.altitude,
        attitude: eo.attitude,
        epsg: crs.epsg(),
    })
}

/// Convert a planar EO vector back to geographic coordinates
pub fn plane_eo_to_geographic(eo: &PlanarEo, crs: &Crs) -> OrthoResult<GeographicEo> {
    if eo.epsg != crs.epsg() {
        return Err(OrthoError::InvalidInput(format!(
            "EO is in EPSG:{} but CRS is EPSG:{}",
            eo.epsg,
            crs.epsg()
        )));
    }
    let (lon, lat) = crs.inverse(eo.easting, eo.northing)?;
    Ok(GeographicEo {
        lon,
        lat,
        altitude: eo.height,
        attitude: eo.attitude,
    })
}
