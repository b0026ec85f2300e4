use std::{fs, io, path::Path};

use glam::Vec3;
use serde::Deserialize;
use thiserror::Error;

use crate::lighting::FogSettings;

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("reading preset {path}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("parsing preset {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("preset field {field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f32 },
    #[error("preset fog start {start} is beyond fog end {end}")]
    FogRange { start: f32, end: f32 },
}

/// Upper limit on directional blur passes a preset may request.
pub const MAX_BLUR_PASSES: u32 = 64;

/// Optional tuning overrides applied on top of the authored scene.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScenePreset {
    #[serde(default)]
    pub fog: Option<FogPreset>,
    #[serde(default)]
    pub road_speed: Option<f32>,
    #[serde(default)]
    pub skyline_speed: Option<f32>,
    #[serde(default)]
    pub exposure: Option<f32>,
    #[serde(default)]
    pub blur_passes: Option<u32>,
    #[serde(default)]
    pub clear_color: Option<[f32; 3]>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FogPreset {
    #[serde(default)]
    pub density: Option<f32>,
    #[serde(default)]
    pub start: Option<f32>,
    #[serde(default)]
    pub end: Option<f32>,
    #[serde(default)]
    pub color: Option<[f32; 3]>,
}

impl FogPreset {
    pub fn apply(&self, fog: &mut FogSettings) {
        if let Some(density) = self.density {
            fog.density = density;
        }
        if let Some(start) = self.start {
            fog.start = start;
        }
        if let Some(end) = self.end {
            fog.end = end;
        }
        if let Some(color) = self.color {
            fog.color = Vec3::from_array(color);
        }
    }
}

impl ScenePreset {
    pub fn load(path: &Path) -> Result<Self, PresetError> {
        let data = fs::read_to_string(path).map_err(|source| PresetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let preset = Self::from_json(&data).map_err(|source| PresetError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        preset.validate()?;
        Ok(preset)
    }

    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }

    /// Every numeric field must be finite and non-negative, blur passes stay
    /// within [`MAX_BLUR_PASSES`] and fog start may not exceed fog end.
    pub fn validate(&self) -> Result<(), PresetError> {
        let fog = self.fog.as_ref();
        let mut checks = vec![
            ("road_speed", self.road_speed),
            ("skyline_speed", self.skyline_speed),
            ("exposure", self.exposure),
            ("fog.density", fog.and_then(|fog| fog.density)),
            ("fog.start", fog.and_then(|fog| fog.start)),
            ("fog.end", fog.and_then(|fog| fog.end)),
        ];
        let colors = [
            ("clear_color", self.clear_color),
            ("fog.color", fog.and_then(|fog| fog.color)),
        ];
        for (field, color) in colors {
            if let Some(color) = color {
                checks.extend(color.into_iter().map(|channel| (field, Some(channel))));
            }
        }
        for (field, value) in checks {
            if let Some(value) = value {
                if !value.is_finite() || value < 0.0 {
                    return Err(PresetError::OutOfRange { field, value });
                }
            }
        }

        if let Some(passes) = self.blur_passes {
            if passes > MAX_BLUR_PASSES {
                return Err(PresetError::OutOfRange {
                    field: "blur_passes",
                    value: passes as f32,
                });
            }
        }
        if let Some((start, end)) = fog.and_then(|fog| fog.start.zip(fog.end)) {
            if start > end {
                return Err(PresetError::FogRange { start, end });
            }
        }
        Ok(())
    }
}
