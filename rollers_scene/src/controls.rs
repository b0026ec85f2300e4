//! Input model consumed by the scheduler once per frame.
//!
//! The host maps its own key/mouse events onto a [`FrameInput`]; toggles are
//! edge triggered (one flip per press) while camera movement and throttle are
//! level triggered (applied every frame the key is held).

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::camera::CameraMovement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Toggle {
    Motion,
    HighBeam,
    LeftSignal,
    RightSignal,
    Skybox,
    Bloom,
    Overlay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Throttle {
    #[default]
    Hold,
    Accelerate,
    Decelerate,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameInput {
    pub toggles: Vec<Toggle>,
    pub movement: Vec<CameraMovement>,
    pub mouse_delta: Vec2,
    pub scroll: f32,
    pub throttle: Throttle,
}

impl FrameInput {
    pub fn toggle(toggle: Toggle) -> Self {
        Self {
            toggles: vec![toggle],
            ..Self::default()
        }
    }
}

/// Boolean switches flipped by [`Toggle`] events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Controls {
    pub moving: bool,
    pub high_beam: bool,
    pub left_signal: bool,
    pub right_signal: bool,
    pub alternate_sky: bool,
    pub bloom: bool,
    pub overlay: bool,
}

impl Controls {
    pub fn apply(&mut self, toggle: Toggle) {
        let flag = match toggle {
            Toggle::Motion => &mut self.moving,
            Toggle::HighBeam => &mut self.high_beam,
            Toggle::LeftSignal => &mut self.left_signal,
            Toggle::RightSignal => &mut self.right_signal,
            Toggle::Skybox => &mut self.alternate_sky,
            Toggle::Bloom => &mut self.bloom,
            Toggle::Overlay => &mut self.overlay,
        };
        *flag = !*flag;
        log::debug!("toggle {toggle:?} -> {}", *flag);
    }
}

/// Which track speed a conveyor follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedLane {
    Road,
    Skyline,
}

pub const THROTTLE_STEP: f32 = 0.5;
pub const ROAD_SPEED_DEFAULT: f32 = 7.0;
pub const ROAD_SPEED_RANGE: (f32, f32) = (2.0, 197.0);
pub const SKYLINE_SPEED_DEFAULT: f32 = 4.5;
pub const SKYLINE_SPEED_RANGE: (f32, f32) = (2.5, 194.5);

/// Shared conveyor speeds adjusted by the throttle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackSpeed {
    road: f32,
    skyline: f32,
}

impl Default for TrackSpeed {
    fn default() -> Self {
        Self::new(ROAD_SPEED_DEFAULT, SKYLINE_SPEED_DEFAULT)
    }
}

impl TrackSpeed {
    pub fn new(road: f32, skyline: f32) -> Self {
        Self {
            road: road.clamp(ROAD_SPEED_RANGE.0, ROAD_SPEED_RANGE.1),
            skyline: skyline.clamp(SKYLINE_SPEED_RANGE.0, SKYLINE_SPEED_RANGE.1),
        }
    }

    pub fn road(&self) -> f32 {
        self.road
    }

    pub fn skyline(&self) -> f32 {
        self.skyline
    }

    pub fn for_lane(&self, lane: SpeedLane) -> f32 {
        match lane {
            SpeedLane::Road => self.road,
            SpeedLane::Skyline => self.skyline,
        }
    }

    /// Applies one frame of throttle. Returns true when either speed changed.
    pub fn apply(&mut self, throttle: Throttle) -> bool {
        let step = match throttle {
            Throttle::Hold => return false,
            Throttle::Accelerate => THROTTLE_STEP,
            Throttle::Decelerate => -THROTTLE_STEP,
        };
        let before = *self;
        *self = Self::new(self.road + step, self.skyline + step);
        *self != before
    }
}
