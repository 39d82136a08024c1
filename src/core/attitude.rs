use crate::types::{Attitude, OrthoError, OrthoResult, RawAttitude};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Gimbal roll readings this close to +/-180 degrees are a flipped gimbal, not a tilt
const GIMBAL_FLIP_TOLERANCE_DEG: f64 = 0.1;

/// Axis convention of a raw roll/pitch/yaw reading.
///
/// Each variant is a fixed rule mapping the raw reading onto omega/phi/kappa:
///
/// | convention    | omega                  | phi                    | kappa        |
/// |---------------|------------------------|------------------------|--------------|
/// | `Opk`         | roll                   | pitch                  | yaw          |
/// | `OpkKappa90`  | roll                   | pitch                  | yaw + 90     |
/// | `DjiGimbal`   | rot2d(yaw)(90+pitch, roll)[0] | ...[1]          | -yaw         |
/// | `Smartphone`  | rot2d(yaw)(-pitch, -roll)[0]  | ...[1]          | -yaw - 90    |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AxisConvention {
    Opk,
    #[serde(rename = "opk-kappa90")]
    OpkKappa90,
    DjiGimbal,
    Smartphone,
}

impl AxisConvention {
    pub fn all() -> [AxisConvention; 4] {
        [
            AxisConvention::Opk,
            AxisConvention::OpkKappa90,
            AxisConvention::DjiGimbal,
            AxisConvention::Smartphone,
        ]
    }

    pub fn tag(&self) -> &'static str {
        match self {
            AxisConvention::Opk => "opk",
            AxisConvention::OpkKappa90 => "opk-kappa90",
            AxisConvention::DjiGimbal => "dji-gimbal",
            AxisConvention::Smartphone => "smartphone",
        }
    }
}

impl fmt::Display for AxisConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for AxisConvention {
    type Err = OrthoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_lowercase();
        AxisConvention::all()
            .into_iter()
            .find(|c| c.tag() == tag)
            .ok_or_else(|| OrthoError::UnsupportedConvention(s.to_string()))
    }
}

/// Rotate a 2-vector by `theta` (radians) with `[[c, s], [-s, c]]`
fn rot2d(theta: f64, v: [f64; 2]) -> [f64; 2] {
    let (s, c) = theta.sin_cos();
    [c * v[0] + s * v[1], -s * v[0] + c * v[1]]
}

/// Map a raw attitude reading (degrees) onto omega/phi/kappa (radians)
pub fn normalize_attitude(raw: RawAttitude, convention: AxisConvention) -> Attitude {
    let RawAttitude { roll, pitch, yaw } = raw;

    let (omega, phi, kappa) = match convention {
        AxisConvention::Opk => (roll, pitch, yaw),
        AxisConvention::OpkKappa90 => (roll, pitch, yaw + 90.0),
        AxisConvention::DjiGimbal => {
            let roll = if 180.0 - roll.abs() <= GIMBAL_FLIP_TOLERANCE_DEG {
                0.0
            } else {
                roll
            };
            let [omega, phi] = rot2d(yaw.to_radians(), [90.0 + pitch, roll]);
            (omega, phi, -yaw)
        }
        AxisConvention::Smartphone => {
            let [omega, phi] = rot2d(yaw.to_radians(), [-pitch, -roll]);
            (omega, phi, -yaw - 90.0)
        }
    };

    Attitude::new(omega.to_radians(), phi.to_radians(), kappa.to_radians())
}

/// Parse a convention tag and normalize in one step
pub fn normalize_attitude_tagged(raw: RawAttitude, tag: &str) -> OrthoResult<Attitude> {
    let convention: AxisConvention = tag.parse()?;
    Ok(normalize_attitude(raw, convention))
}

/// Kappa (radians) for a camera whose image top faces the direction of travel
/// from `previous` to `current` (planar coordinates)
pub fn kappa_from_track(current: [f64; 2], previous: [f64; 2]) -> OrthoResult<f64> {
    let dx = current[0] - previous[0];
    let dy = current[1] - previous[1];
    if !(dx.is_finite() && dy.is_finite()) || (dx == 0.0 && dy == 0.0) {
        return Err(OrthoError::DegenerateGeometry(
            "cannot derive heading from identical positions".to_string(),
        ));
    }
    Ok(dy.atan2(dx) - std::f64::consts::FRAC_PI_2)
}
