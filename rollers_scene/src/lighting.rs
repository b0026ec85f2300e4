//! Light state recomputed every frame: the sun, the two headlights on the
//! lead vehicle (with high beam and turn-signal blink) and one spot light
//! hanging under each street lamp.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::controls::Controls;

pub const HEADLIGHT_OFFSETS: [Vec3; 2] = [Vec3::new(-0.9, 0.06, 0.48), Vec3::new(-0.9, 0.06, -0.48)];
pub const HEADLIGHT_DIRECTION: Vec3 = Vec3::new(-1.0, -0.01, 0.0);
pub const LAMP_LIGHT_OFFSET: Vec3 = Vec3::new(0.0, 6.8, -3.4);

const HEADLIGHT_AMBIENT: f32 = 1.0;
const HIGH_BEAM_AMBIENT: f32 = 5.0;
const HEADLIGHT_DIFFUSE: Vec3 = Vec3::new(0.3, 0.3, 0.9);
const HEADLIGHT_SPECULAR: Vec3 = Vec3::ONE;
const SIGNAL_COLOR: Vec3 = Vec3::new(15.0, 10.0, 0.0);
const LAMP_COLOR: Vec3 = Vec3::new(1.0, 0.7, 0.0);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirLight {
    pub direction: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
}

impl Default for DirLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.2, -1.0, -0.3),
            ambient: Vec3::splat(0.5),
            diffuse: Vec3::splat(0.4),
            specular: Vec3::splat(0.5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpotLight {
    pub position: Vec3,
    pub direction: Vec3,
    /// Cosine of the inner cone angle.
    pub cut_off: f32,
    /// Cosine of the outer cone angle.
    pub outer_cut_off: f32,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
}

impl SpotLight {
    fn cone(position: Vec3, direction: Vec3, inner_degrees: f32, outer_degrees: f32) -> Self {
        Self {
            position,
            direction,
            cut_off: inner_degrees.to_radians().cos(),
            outer_cut_off: outer_degrees.to_radians().cos(),
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
            ambient: Vec3::ONE,
            diffuse: Vec3::ONE,
            specular: Vec3::ONE,
        }
    }

    pub fn headlight(position: Vec3) -> Self {
        Self {
            ambient: Vec3::splat(HEADLIGHT_AMBIENT),
            diffuse: HEADLIGHT_DIFFUSE,
            specular: HEADLIGHT_SPECULAR,
            ..Self::cone(position, HEADLIGHT_DIRECTION, 5.0, 10.0)
        }
    }

    pub fn street_lamp(position: Vec3) -> Self {
        Self {
            diffuse: LAMP_COLOR,
            specular: LAMP_COLOR,
            ..Self::cone(position, Vec3::NEG_Y, 10.0, 25.0)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FogSettings {
    pub density: f32,
    pub start: f32,
    pub end: f32,
    pub color: Vec3,
}

impl Default for FogSettings {
    fn default() -> Self {
        Self {
            density: 5.0,
            start: 30.0,
            end: 100.0,
            color: Vec3::splat(0.7),
        }
    }
}

/// One-second strobe used by the turn signals: on during odd whole seconds.
pub fn blink_on(time: f32) -> bool {
    (time.floor() as i64).rem_euclid(2) == 1
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LightRig {
    pub sun: DirLight,
    pub headlights: [SpotLight; 2],
    pub lamps: Vec<SpotLight>,
    pub fog: FogSettings,
}

impl Default for LightRig {
    fn default() -> Self {
        Self {
            sun: DirLight::default(),
            headlights: [
                SpotLight::headlight(HEADLIGHT_OFFSETS[0]),
                SpotLight::headlight(HEADLIGHT_OFFSETS[1]),
            ],
            lamps: Vec::new(),
            fog: FogSettings::default(),
        }
    }
}

impl LightRig {
    /// Refreshes headlight colour from the switches and the blink phase.
    pub fn update_headlights(&mut self, controls: &Controls, time: f32, vehicle: Vec3) {
        let ambient = if controls.high_beam {
            HIGH_BEAM_AMBIENT
        } else {
            HEADLIGHT_AMBIENT
        };
        let blink = blink_on(time);
        let signals = [controls.left_signal, controls.right_signal];

        for ((light, offset), signal) in self
            .headlights
            .iter_mut()
            .zip(HEADLIGHT_OFFSETS)
            .zip(signals)
        {
            light.position = vehicle + offset;
            light.ambient = Vec3::splat(ambient);
            if signal && blink {
                light.diffuse = SIGNAL_COLOR;
                light.specular = SIGNAL_COLOR;
            } else {
                light.diffuse = HEADLIGHT_DIFFUSE;
                light.specular = HEADLIGHT_SPECULAR;
            }
        }
    }

    /// Places one lamp light under each lamp instance of a conveyor group.
    pub fn update_lamps(&mut self, anchor: Vec3, stride: Vec3, count: u32) {
        self.lamps.clear();
        self.lamps.extend(
            (0..count).map(|i| SpotLight::street_lamp(anchor + stride * i as f32 + LAMP_LIGHT_OFFSET)),
        );
    }

    pub fn spot_lights(&self) -> impl Iterator<Item = &SpotLight> {
        self.headlights.iter().chain(self.lamps.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blink_follows_whole_seconds() {
        assert!(blink_on(1.9));
        assert!(!blink_on(2.1));
        assert!(!blink_on(0.0));
        assert!(blink_on(1.0));
        assert!(blink_on(3.999));
    }

    #[test]
    fn high_beam_boosts_ambient_on_both_headlights() {
        let mut rig = LightRig::default();
        let controls = Controls {
            high_beam: true,
            ..Controls::default()
        };
        rig.update_headlights(&controls, 0.0, Vec3::ZERO);
        for light in &rig.headlights {
            assert_eq!(light.ambient, Vec3::splat(5.0));
        }

        rig.update_headlights(&Controls::default(), 0.0, Vec3::ZERO);
        for light in &rig.headlights {
            assert_eq!(light.ambient, Vec3::ONE);
        }
    }

    #[test]
    fn left_signal_only_blinks_first_headlight_during_on_phase() {
        let mut rig = LightRig::default();
        let controls = Controls {
            left_signal: true,
            ..Controls::default()
        };

        rig.update_headlights(&controls, 1.9, Vec3::ZERO);
        assert_eq!(rig.headlights[0].diffuse, SIGNAL_COLOR);
        assert_eq!(rig.headlights[0].specular, SIGNAL_COLOR);
        assert_eq!(rig.headlights[1].diffuse, HEADLIGHT_DIFFUSE);

        rig.update_headlights(&controls, 2.1, Vec3::ZERO);
        assert_eq!(rig.headlights[0].diffuse, HEADLIGHT_DIFFUSE);
        assert_eq!(rig.headlights[0].specular, HEADLIGHT_SPECULAR);
    }

    #[test]
    fn headlights_follow_vehicle() {
        let mut rig = LightRig::default();
        let vehicle = Vec3::new(-11.0, 1.57, -1.65);
        rig.update_headlights(&Controls::default(), 0.0, vehicle);
        assert_eq!(rig.headlights[0].position, vehicle + HEADLIGHT_OFFSETS[0]);
        assert_eq!(rig.headlights[1].position, vehicle + HEADLIGHT_OFFSETS[1]);
        assert_eq!(rig.headlights[0].direction, HEADLIGHT_DIRECTION);
    }

    #[test]
    fn one_lamp_light_per_instance() {
        let mut rig = LightRig::default();
        let anchor = Vec3::new(-90.0, 0.8, 3.0);
        rig.update_lamps(anchor, Vec3::new(30.0, 0.0, 0.0), 7);
        assert_eq!(rig.lamps.len(), 7);
        assert_eq!(rig.lamps[0].position, anchor + LAMP_LIGHT_OFFSET);
        assert_eq!(rig.lamps[6].position, anchor + Vec3::new(180.0, 6.8, -3.4));
        assert_eq!(rig.lamps[3].direction, Vec3::NEG_Y);
        assert_eq!(rig.spot_lights().count(), 9);

        rig.update_lamps(anchor, Vec3::new(30.0, 0.0, 0.0), 7);
        assert_eq!(rig.lamps.len(), 7);
    }

    #[test]
    fn cone_angles_are_stored_as_cosines() {
        let lamp = SpotLight::street_lamp(Vec3::ZERO);
        assert!((lamp.cut_off - 10.0_f32.to_radians().cos()).abs() < 1e-6);
        assert!(lamp.cut_off > lamp.outer_cut_off);
    }
}
