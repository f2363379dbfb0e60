//! Tunable parameters for the rotation engine and cube assembly.
//!
//! Loaded from TOML. Every field has a default, so an empty file is a valid
//! configuration.

use std::path::Path;
use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::scene::LayerMask;
use crate::tween::Easing;

/// Longest accepted snap duration for a 45 degree remainder, in seconds.
pub const MAX_SNAP_BASE_SECS: f32 = 60.0;

/// Errors from loading or validating a configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("error reading config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("error parsing config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Physical layout of the cube.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CubeConfig {
    /// Distance between the centers of neighboring pieces.
    pub spacing: f32,
    /// Edge length of each piece's collider (slightly less than `spacing`
    /// for visible gaps).
    pub piece_size: f32,
}

impl Default for CubeConfig {
    fn default() -> Self {
        Self {
            spacing: 1.0,
            piece_size: 0.9,
        }
    }
}

/// Parameters of the gesture rotation engine.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RotatorConfig {
    /// Collision layers that hold puzzle pieces.
    pub piece_layers: u32,
    /// Duration of the snap correction for a 45 degree remainder, in seconds.
    pub snap_base_duration_secs: f32,
    /// Easing curve of the snap correction.
    pub easing: Easing,
    /// Angle applied on every drag-update frame, in degrees.
    pub rotation_step_degrees: f32,
    /// Half-extents of the query box selecting a horizontal layer.
    pub horizontal_half_extents: [f32; 3],
    /// Half-extents of the query box selecting a vertical layer.
    pub vertical_half_extents: [f32; 3],
    pub cube: CubeConfig,
}

impl Default for RotatorConfig {
    fn default() -> Self {
        Self {
            piece_layers: LayerMask::layer(6).0,
            snap_base_duration_secs: 0.15,
            easing: Easing::default(),
            rotation_step_degrees: 1.0,
            horizontal_half_extents: [2.0, 0.25, 2.0],
            vertical_half_extents: [0.25, 2.0, 2.0],
            cube: CubeConfig::default(),
        }
    }
}

impl RotatorConfig {
    /// Reads and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parses and validates a configuration.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as TOML.
    pub fn to_toml_string(&self) -> String {
        // plain structs of numbers and enums always serialize
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::Invalid {
                field,
                reason: reason.into(),
            }
        }

        if self.piece_layers == 0 {
            return Err(invalid("piece_layers", "mask selects no layer"));
        }
        if !(0.0..=MAX_SNAP_BASE_SECS).contains(&self.snap_base_duration_secs) {
            return Err(invalid(
                "snap_base_duration_secs",
                format!(
                    "expected a number in [0, {MAX_SNAP_BASE_SECS}], got {}",
                    self.snap_base_duration_secs
                ),
            ));
        }
        if !self.rotation_step_degrees.is_finite() || self.rotation_step_degrees <= 0.0 {
            return Err(invalid(
                "rotation_step_degrees",
                format!("expected a positive number, got {}", self.rotation_step_degrees),
            ));
        }
        if !self.cube.spacing.is_finite() || self.cube.spacing <= 0.0 {
            return Err(invalid("cube.spacing", format!("got {}", self.cube.spacing)));
        }
        if !self.cube.piece_size.is_finite()
            || self.cube.piece_size <= 0.0
            || self.cube.piece_size > self.cube.spacing
        {
            return Err(invalid(
                "cube.piece_size",
                format!("expected a number in (0, spacing], got {}", self.cube.piece_size),
            ));
        }

        // From a face anchor the box must reach the far layer along both long
        // axes and stay clear of the neighboring layers along the thin one.
        let reach = 2.0 * self.cube.spacing - self.cube.piece_size / 2.0;
        let clearance = self.cube.spacing - self.cube.piece_size / 2.0;
        for (field, extents, thin_axis) in [
            ("horizontal_half_extents", self.horizontal_half_extents, 1),
            ("vertical_half_extents", self.vertical_half_extents, 0),
        ] {
            for (axis, &extent) in extents.iter().enumerate() {
                let usable = if axis == thin_axis {
                    extent > 0.0 && extent < clearance
                } else {
                    extent > reach && extent.is_finite()
                };
                if !usable {
                    return Err(invalid(
                        field,
                        format!(
                            "got {extents:?}; the thin axis must be in (0, {clearance}) \
                             and the others above {reach} for spacing {}",
                            self.cube.spacing
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn piece_mask(&self) -> LayerMask {
        LayerMask(self.piece_layers)
    }

    /// Snap duration for a 45 degree remainder. Values outside the accepted
    /// range are clamped into it.
    pub fn snap_base_duration(&self) -> Duration {
        let secs = self.snap_base_duration_secs.clamp(0.0, MAX_SNAP_BASE_SECS);
        Duration::try_from_secs_f32(secs).unwrap_or_default()
    }

    pub fn horizontal_half_extents(&self) -> Vec3 {
        Vec3::from_array(self.horizontal_half_extents)
    }

    pub fn vertical_half_extents(&self) -> Vec3 {
        Vec3::from_array(self.vertical_half_extents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = RotatorConfig::from_toml_str("").unwrap();
        assert_eq!(config, RotatorConfig::default());
    }

    #[test]
    fn test_defaults_roundtrip_through_toml() {
        let config = RotatorConfig {
            easing: Easing::Overshoot,
            rotation_step_degrees: 2.5,
            ..Default::default()
        };
        let text = config.to_toml_string();
        assert!(text.contains("easing = \"overshoot\""), "{text}");
        assert_eq!(RotatorConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_partial_file() {
        let config = RotatorConfig::from_toml_str(
            r#"
            snap_base_duration_secs = 0.3
            easing = "critically_damped"

            horizontal_half_extents = [4.0, 0.5, 4.0]
            vertical_half_extents = [0.5, 4.0, 4.0]

            [cube]
            spacing = 2.0
            "#,
        )
        .unwrap();

        assert_eq!(config.snap_base_duration(), Duration::from_secs_f32(0.3));
        assert_eq!(config.easing, Easing::CriticallyDamped);
        assert_eq!(config.cube.spacing, 2.0);
        assert_eq!(config.cube.piece_size, CubeConfig::default().piece_size);
        assert_eq!(config.horizontal_half_extents(), Vec3::new(4.0, 0.5, 4.0));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for (text, field) in [
            ("rotation_step_degrees = 0.0", "rotation_step_degrees"),
            ("snap_base_duration_secs = -1.0", "snap_base_duration_secs"),
            ("snap_base_duration_secs = 1e20", "snap_base_duration_secs"),
            ("snap_base_duration_secs = 61.0", "snap_base_duration_secs"),
            ("snap_base_duration_secs = nan", "snap_base_duration_secs"),
            ("piece_layers = 0", "piece_layers"),
            ("vertical_half_extents = [0.25, 0.0, 2.0]", "vertical_half_extents"),
            ("[cube]\npiece_size = 1.5", "cube.piece_size"),
            // default extents no longer reach the far layer
            ("[cube]\nspacing = 2.0", "horizontal_half_extents"),
            ("horizontal_half_extents = [2.0, 0.6, 2.0]", "horizontal_half_extents"),
            ("horizontal_half_extents = [1.5, 0.25, 2.0]", "horizontal_half_extents"),
            ("vertical_half_extents = [0.25, 1.5, 2.0]", "vertical_half_extents"),
            ("vertical_half_extents = [0.25, 2.0, inf]", "vertical_half_extents"),
        ] {
            match RotatorConfig::from_toml_str(text) {
                Err(ConfigError::Invalid { field: f, .. }) => assert_eq!(f, field, "{text}"),
                other => panic!("expected {field} to be rejected, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_snap_base_duration_is_clamped() {
        let mut config = RotatorConfig {
            snap_base_duration_secs: 1e20,
            ..Default::default()
        };
        assert_eq!(config.snap_base_duration(), Duration::from_secs(60));

        config.snap_base_duration_secs = f32::NAN;
        assert_eq!(config.snap_base_duration(), Duration::ZERO);
        config.snap_base_duration_secs = -2.0;
        assert_eq!(config.snap_base_duration(), Duration::ZERO);
    }

    #[test]
    fn test_unknown_easing_is_a_parse_error() {
        assert!(matches!(
            RotatorConfig::from_toml_str("easing = \"wobbly\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
