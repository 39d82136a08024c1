//! Camera capability table
//!
//! Each supported camera is one [`CameraProfile`] row: sensor geometry, the
//! attitude convention its EO readings use, the attitude column order of its
//! EO files, the default ground height of its survey site and whether its
//! heading comes from the attitude sensor or from the flight track. New
//! cameras are added as data (JSON), not as code.

use crate::core::attitude::AxisConvention;
use crate::types::{CameraIntrinsics, OrthoError, OrthoResult, RawAttitude};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Order of the three attitude columns that follow `image lon lat alt` in an EO file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EoColumnOrder {
    RollPitchYaw,
    YawPitchRoll,
}

impl EoColumnOrder {
    /// Assign three attitude columns (degrees) to roll/pitch/yaw
    pub fn attitude(&self, columns: [f64; 3]) -> RawAttitude {
        match self {
            EoColumnOrder::RollPitchYaw => RawAttitude {
                roll: columns[0],
                pitch: columns[1],
                yaw: columns[2],
            },
            EoColumnOrder::YawPitchRoll => RawAttitude {
                roll: columns[2],
                pitch: columns[1],
                yaw: columns[0],
            },
        }
    }
}

/// Where a camera's omega/phi/kappa come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeadingSource {
    /// The recorded attitude, normalized with the profile's convention
    #[default]
    Attitude,
    /// Level camera; kappa from the track between consecutive positions.
    /// Used when the attitude sensor is not trusted.
    Track,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraProfile {
    pub id: String,
    pub maker: String,
    /// Sensor width in millimeters
    pub sensor_width_mm: f64,
    /// Focal length in meters
    pub focal_length_m: f64,
    pub convention: AxisConvention,
    pub eo_columns: EoColumnOrder,
    /// Default ground height of the survey site (meters)
    #[serde(default)]
    pub ground_height: f64,
    #[serde(default)]
    pub heading: HeadingSource,
}

impl CameraProfile {
    /// Intrinsics for an image of `width` x `height` pixels taken by this camera
    pub fn intrinsics(&self, width: usize, height: usize) -> OrthoResult<CameraIntrinsics> {
        CameraIntrinsics::new(self.focal_length_m, self.sensor_width_mm, width, height)
    }
}

/// Camera profiles keyed by lower-case id
#[derive(Debug, Clone)]
pub struct CameraRegistry {
    profiles: BTreeMap<String, CameraProfile>,
}

impl Default for CameraRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CameraRegistry {
    pub fn empty() -> Self {
        Self {
            profiles: BTreeMap::new(),
        }
    }

    /// Registry preloaded with the cameras this crate ships with
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.insert(CameraProfile {
            id: "dji-mavic".to_string(),
            maker: "DJI".to_string(),
            sensor_width_mm: 6.3,
            focal_length_m: 0.0047,
            convention: AxisConvention::Opk,
            eo_columns: EoColumnOrder::RollPitchYaw,
            ground_height: 0.0,
            heading: HeadingSource::Attitude,
        });
        registry.insert(CameraProfile {
            id: "dji-phantom4-rtk".to_string(),
            maker: "DJI".to_string(),
            sensor_width_mm: 13.2,
            focal_length_m: 0.0088,
            convention: AxisConvention::Opk,
            eo_columns: EoColumnOrder::YawPitchRoll,
            ground_height: 27.0,
            heading: HeadingSource::Attitude,
        });
        registry.insert(CameraProfile {
            id: "galaxy-s10".to_string(),
            maker: "Samsung".to_string(),
            sensor_width_mm: 6.27,
            focal_length_m: 0.00432,
            convention: AxisConvention::Smartphone,
            eo_columns: EoColumnOrder::YawPitchRoll,
            ground_height: 33.5,
            heading: HeadingSource::Track,
        });
        registry
    }

    /// Add or replace a profile; returns the one it replaced
    pub fn insert(&mut self, profile: CameraProfile) -> Option<CameraProfile> {
        self.profiles.insert(profile.id.to_lowercase(), profile)
    }

    pub fn get(&self, id: &str) -> OrthoResult<&CameraProfile> {
        self.profiles
            .get(&id.to_lowercase())
            .ok_or_else(|| OrthoError::UnsupportedCamera(id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.profiles.values().map(|p| p.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Merge a JSON array of profiles into the registry. Profiles are
    /// validated before anything is inserted.
    pub fn merge_json_str(&mut self, json: &str) -> OrthoResult<usize> {
        let profiles: Vec<CameraProfile> = serde_json::from_str(json)?;
        for profile in &profiles {
            profile.intrinsics(1, 1).map_err(|e| {
                OrthoError::InvalidInput(format!("camera profile '{}': {}", profile.id, e))
            })?;
            if !profile.ground_height.is_finite() {
                return Err(OrthoError::InvalidInput(format!(
                    "camera profile '{}': non-finite ground height",
                    profile.id
                )));
            }
        }

        let count = profiles.len();
        for profile in profiles {
            if let Some(old) = self.insert(profile) {
                log::debug!("Camera profile '{}' overridden", old.id);
            }
        }
        log::info!("📷 Loaded {} camera profile(s)", count);
        Ok(count)
    }

    pub fn merge_json_file<P: AsRef<Path>>(&mut self, path: P) -> OrthoResult<usize> {
        let text = std::fs::read_to_string(path.as_ref())?;
        self.merge_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup_is_case_insensitive() {
        let registry = CameraRegistry::builtin();
        assert_eq!(registry.len(), 3);

        let phantom = registry.get("DJI-Phantom4-RTK").unwrap();
        assert_eq!(phantom.sensor_width_mm, 13.2);
        assert_eq!(phantom.eo_columns, EoColumnOrder::YawPitchRoll);
        assert_eq!(phantom.ground_height, 27.0);

        let galaxy = registry.get("galaxy-s10").unwrap();
        assert_eq!(galaxy.convention, AxisConvention::Smartphone);
        assert_eq!(galaxy.heading, HeadingSource::Track);
        assert_eq!(registry.get("dji-mavic").unwrap().heading, HeadingSource::Attitude);
    }

    #[test]
    fn test_unknown_camera() {
        let registry = CameraRegistry::builtin();
        assert!(matches!(registry.get("hasselblad"), Err(OrthoError::UnsupportedCamera(_))));
    }

    #[test]
    fn test_profile_intrinsics() {
        let registry = CameraRegistry::builtin();
        let intrinsics = registry.get("dji-mavic").unwrap().intrinsics(4000, 3000).unwrap();
        assert!((intrinsics.pixel_size() - 0.0063 / 4000.0).abs() < 1e-15);
        assert!(matches!(
            registry.get("dji-mavic").unwrap().intrinsics(0, 3000),
            Err(OrthoError::InvalidIntrinsics(_))
        ));
    }

    #[test]
    fn test_column_order() {
        let a = EoColumnOrder::YawPitchRoll.attitude([90.0, -45.0, 1.5]);
        assert_eq!((a.roll, a.pitch, a.yaw), (1.5, -45.0, 90.0));
        let b = EoColumnOrder::RollPitchYaw.attitude([90.0, -45.0, 1.5]);
        assert_eq!((b.roll, b.pitch, b.yaw), (90.0, -45.0, 1.5));
    }

    #[test]
    fn test_merge_json() {
        let mut registry = CameraRegistry::builtin();
        let json = r#"[
            {"id": "custom-cam", "maker": "Acme", "sensor_width_mm": 23.5,
             "focal_length_m": 0.024, "convention": "opk-kappa90", "eo_columns": "roll-pitch-yaw"},
            {"id": "dji-mavic", "maker": "DJI", "sensor_width_mm": 6.3,
             "focal_length_m": 0.0047, "convention": "dji-gimbal", "eo_columns": "roll-pitch-yaw",
             "ground_height": 12.0}
        ]"#;
        assert_eq!(registry.merge_json_str(json).unwrap(), 2);
        assert_eq!(registry.len(), 4);

        let custom = registry.get("custom-cam").unwrap();
        assert_eq!(custom.convention, AxisConvention::OpkKappa90);
        assert_eq!(custom.heading, HeadingSource::Attitude);
        assert_eq!(custom.ground_height, 0.0);
        assert_eq!(registry.get("dji-mavic").unwrap().convention, AxisConvention::DjiGimbal);
    }

    #[test]
    fn test_merge_rejects_invalid_profile() {
        let mut registry = CameraRegistry::empty();
        let json = r#"[{"id": "bad", "maker": "x", "sensor_width_mm": -1.0,
            "focal_length_m": 0.01, "convention": "opk", "eo_columns": "roll-pitch-yaw"}]"#;
        assert!(matches!(registry.merge_json_str(json), Err(OrthoError::InvalidInput(_))));
        assert!(registry.is_empty());
    }
}
