//! The authored road scene.
//!
//! Every actor, every motion generator and the per-frame draw order are
//! declared once in [`SceneState::road_scene`]. The scheduler never names an
//! actor; it walks the registries and the draw list built here.

use glam::Vec3;
use serde::Serialize;

use crate::{
    actor::{ActorId, ActorTransform},
    camera::FlyCamera,
    controls::{Controls, SpeedLane, TrackSpeed},
    lighting::LightRig,
    motion::{Conveyor, ConveyorConfig, Direction, Oscillator, OscillatorConfig},
    persist::PersistedView,
    preset::ScenePreset,
    render::{Culling, MeshKind},
};

pub const VEHICLE_FORWARD_SPEED: f32 = 5.0;
pub const VEHICLE_BACKWARD_SPEED: f32 = 3.0;
pub const SWAY_FREQUENCY: f32 = 1.2;
pub const SWAY_AMPLITUDE: f32 = 0.5;
pub const DEFAULT_EXPOSURE: f32 = 0.5;
pub const DEFAULT_BLUR_PASSES: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Actor {
    pub name: &'static str,
    pub transform: ActorTransform,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OscillatorBinding {
    pub actor: ActorId,
    pub oscillator: Oscillator,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConveyorBinding {
    pub actor: ActorId,
    pub conveyor: Conveyor,
    pub lane: SpeedLane,
}

/// Lateral sine sway on one actor's z coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sway {
    pub actor: ActorId,
    pub frequency: f32,
    pub amplitude: f32,
}

impl Sway {
    pub fn offset(&self, time: f32) -> f32 {
        (time * self.frequency).sin() * self.amplitude
    }
}

/// One entry of the fixed draw order: `repeat` instances of `mesh` placed
/// `stride` apart starting at the actor's transform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawItem {
    pub label: &'static str,
    pub mesh: MeshKind,
    pub actor: ActorId,
    pub repeat: u32,
    pub stride: Vec3,
    pub culling: Culling,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PostSettings {
    pub exposure: f32,
    pub blur_passes: u32,
}

impl Default for PostSettings {
    fn default() -> Self {
        Self {
            exposure: DEFAULT_EXPOSURE,
            blur_passes: DEFAULT_BLUR_PASSES,
        }
    }
}

/// Everything the frame scheduler mutates, owned in one place.
#[derive(Debug, Clone, Serialize)]
pub struct SceneState {
    pub actors: Vec<Actor>,
    pub oscillators: Vec<OscillatorBinding>,
    pub conveyors: Vec<ConveyorBinding>,
    pub draw_list: Vec<DrawItem>,
    pub sway: Option<Sway>,
    /// Actor whose position anchors the headlights.
    pub headlight_actor: Option<ActorId>,
    /// Draw item whose instances each carry a lamp light.
    pub lamp_item: Option<usize>,
    pub lights: LightRig,
    pub controls: Controls,
    pub speed: TrackSpeed,
    pub camera: FlyCamera,
    pub clear_color: Vec3,
    pub post: PostSettings,
}

impl Default for SceneState {
    fn default() -> Self {
        Self {
            actors: Vec::new(),
            oscillators: Vec::new(),
            conveyors: Vec::new(),
            draw_list: Vec::new(),
            sway: None,
            headlight_actor: None,
            lamp_item: None,
            lights: LightRig::default(),
            controls: Controls::default(),
            speed: TrackSpeed::default(),
            camera: FlyCamera::default(),
            clear_color: Vec3::ZERO,
            post: PostSettings::default(),
        }
    }
}

struct GroupSpec {
    name: &'static str,
    mesh: MeshKind,
    transform: ActorTransform,
    threshold: f32,
    reset: f32,
    stride: f32,
    count: u32,
    lane: SpeedLane,
    culling: Culling,
}

struct VehicleSpec {
    name: &'static str,
    mesh: MeshKind,
    transform: ActorTransform,
    bounds: (f32, f32),
    initial: Direction,
}

impl SceneState {
    pub fn spawn(&mut self, name: &'static str, transform: ActorTransform) -> ActorId {
        let id = ActorId(self.actors.len());
        self.actors.push(Actor { name, transform });
        id
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(id.0)
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.get_mut(id.0)
    }

    pub fn find(&self, name: &str) -> Option<ActorId> {
        self.actors
            .iter()
            .position(|actor| actor.name == name)
            .map(ActorId)
    }

    pub fn position_of(&self, name: &str) -> Option<Vec3> {
        self.find(name)
            .and_then(|id| self.actor(id))
            .map(|actor| actor.transform.position)
    }

    pub fn add_oscillator(&mut self, actor: ActorId, config: OscillatorConfig, initial: Direction) {
        self.oscillators.push(OscillatorBinding {
            actor,
            oscillator: Oscillator::new(config, initial),
        });
    }

    pub fn add_conveyor(&mut self, actor: ActorId, config: ConveyorConfig, lane: SpeedLane) {
        let speed = self.speed.for_lane(lane);
        self.conveyors.push(ConveyorBinding {
            actor,
            conveyor: Conveyor::new(config, speed),
            lane,
        });
    }

    pub fn add_draw(&mut self, item: DrawItem) -> usize {
        self.draw_list.push(item);
        self.draw_list.len() - 1
    }

    /// Pushes the current track speeds into every conveyor.
    pub fn sync_conveyor_speeds(&mut self) {
        for binding in &mut self.conveyors {
            binding.conveyor.set_speed(self.speed.for_lane(binding.lane));
        }
    }

    /// Builds the road scene with its authored placements and tuning.
    pub fn road_scene() -> Self {
        let mut scene = Self::default();

        scene.spawn_group(GroupSpec {
            name: "road",
            mesh: MeshKind::Road,
            transform: ActorTransform::new(Vec3::new(-80.0, 0.0, 0.0), 1.0),
            threshold: -49.0,
            reset: -80.0,
            stride: 31.0,
            count: 6,
            lane: SpeedLane::Road,
            culling: Culling::Back,
        });

        let vehicles = [
            VehicleSpec {
                name: "nissan_sx180",
                mesh: MeshKind::NissanSx180,
                transform: ActorTransform::new(Vec3::new(11.0, 1.57, -1.1), 0.7).rotated(Vec3::Y, 90.0),
                bounds: (6.0, 17.0),
                initial: Direction::MovingUpper,
            },
            VehicleSpec {
                name: "nissan_s15",
                mesh: MeshKind::NissanS15,
                transform: ActorTransform::new(Vec3::new(0.0, 1.65, 0.7), 1.5).rotated(Vec3::Y, 180.0),
                bounds: (-5.0, 5.0),
                initial: Direction::MovingLower,
            },
            VehicleSpec {
                name: "porsche_911",
                mesh: MeshKind::Porsche911,
                transform: ActorTransform::new(Vec3::new(-11.0, 1.57, -1.65), 0.7).rotated(Vec3::Y, 90.0),
                bounds: (-17.0, -6.0),
                initial: Direction::MovingLower,
            },
            VehicleSpec {
                name: "nissan_240sx",
                mesh: MeshKind::Nissan240sx,
                transform: ActorTransform::new(Vec3::new(-25.0, 1.65, 0.72), 1.5).rotated(Vec3::Y, 180.0),
                bounds: (-33.0, -18.0),
                initial: Direction::MovingUpper,
            },
        ];
        for vehicle in vehicles {
            let id = scene.spawn(vehicle.name, vehicle.transform);
            scene.add_oscillator(
                id,
                OscillatorConfig {
                    lower_bound: vehicle.bounds.0,
                    upper_bound: vehicle.bounds.1,
                    forward_speed: VEHICLE_FORWARD_SPEED,
                    backward_speed: VEHICLE_BACKWARD_SPEED,
                },
                vehicle.initial,
            );
            scene.add_draw(DrawItem {
                label: vehicle.name,
                mesh: vehicle.mesh,
                actor: id,
                repeat: 1,
                stride: Vec3::ZERO,
                culling: Culling::Back,
            });
        }
        scene.headlight_actor = scene.find("porsche_911");
        scene.sway = scene.find("nissan_240sx").map(|actor| Sway {
            actor,
            frequency: SWAY_FREQUENCY,
            amplitude: SWAY_AMPLITUDE,
        });

        scene.spawn_group(GroupSpec {
            name: "trees",
            mesh: MeshKind::Tree,
            transform: ActorTransform::new(Vec3::new(-80.0, 0.4, 5.0), 0.4).rotated(Vec3::Y, 90.0),
            threshold: -40.0,
            reset: -80.0,
            stride: 40.0,
            count: 5,
            lane: SpeedLane::Road,
            culling: Culling::Back,
        });
        scene.spawn_group(GroupSpec {
            name: "buildings",
            mesh: MeshKind::Building,
            transform: ActorTransform::new(Vec3::new(-140.0, 17.0, 63.0), 2.0)
                .rotated(Vec3::X, -90.0)
                .rotated(Vec3::Z, 90.0),
            threshold: -70.0,
            reset: -140.0,
            stride: 70.0,
            count: 4,
            lane: SpeedLane::Skyline,
            culling: Culling::Back,
        });
        scene.spawn_group(GroupSpec {
            name: "power_poles",
            mesh: MeshKind::PowerPole,
            transform: ActorTransform::new(Vec3::new(-64.8, 0.8, -5.0), 0.6)
                .rotated(Vec3::X, -90.0)
                .rotated(Vec3::Z, 90.0),
            threshold: -48.6,
            reset: -64.8,
            stride: 16.2,
            count: 10,
            lane: SpeedLane::Road,
            culling: Culling::Back,
        });
        scene.spawn_group(GroupSpec {
            name: "street_lamps",
            mesh: MeshKind::StreetLamp,
            transform: ActorTransform::new(Vec3::new(-90.0, 0.8, 3.0), 0.1).rotated(Vec3::X, -90.0),
            threshold: -60.0,
            reset: -90.0,
            stride: 30.0,
            count: 7,
            lane: SpeedLane::Road,
            culling: Culling::Back,
        });
        scene.lamp_item = Some(scene.draw_list.len() - 1);

        for (name, z) in [("grass_right", 10.0), ("grass_left", -10.5)] {
            scene.spawn_group(GroupSpec {
                name,
                mesh: MeshKind::Grass,
                transform: ActorTransform::new(Vec3::new(-100.0, 0.35, z), 1.0),
                threshold: -40.0,
                reset: -100.0,
                stride: 60.0,
                count: 3,
                lane: SpeedLane::Road,
                culling: Culling::Disabled,
            });
        }

        let mountain = scene.spawn(
            "mountain",
            ActorTransform::new(Vec3::new(80.0, 0.0, 0.0), 30.0)
                .rotated(Vec3::X, 180.0)
                .rotated(Vec3::Y, 90.0)
                .rotated(Vec3::X, 5.0),
        );
        scene.add_draw(DrawItem {
            label: "mountain",
            mesh: MeshKind::Mountain,
            actor: mountain,
            repeat: 1,
            stride: Vec3::ZERO,
            culling: Culling::Disabled,
        });

        for (name, x) in [("terrain_a", 0.0), ("terrain_b", -214.0)] {
            scene.spawn_group(GroupSpec {
                name,
                mesh: MeshKind::Terrain,
                transform: ActorTransform::new(Vec3::new(x, 4.05, 0.0), 30.0).rotated(Vec3::X, -90.0),
                threshold: 214.0,
                reset: -214.0,
                stride: 0.0,
                count: 1,
                lane: SpeedLane::Road,
                culling: Culling::Disabled,
            });
        }

        log::info!(
            "road scene ready: {} actors, {} oscillators, {} conveyors, {} draw items",
            scene.actors.len(),
            scene.oscillators.len(),
            scene.conveyors.len(),
            scene.draw_list.len()
        );
        scene
    }

    fn spawn_group(&mut self, spec: GroupSpec) -> ActorId {
        let id = self.spawn(spec.name, spec.transform);
        self.add_conveyor(
            id,
            ConveyorConfig {
                wrap_threshold: spec.threshold,
                reset_value: spec.reset,
            },
            spec.lane,
        );
        self.add_draw(DrawItem {
            label: spec.name,
            mesh: spec.mesh,
            actor: id,
            repeat: spec.count,
            stride: Vec3::new(spec.stride, 0.0, 0.0),
            culling: spec.culling,
        });
        id
    }

    pub fn apply_preset(&mut self, preset: &ScenePreset) {
        if let Some(fog) = &preset.fog {
            fog.apply(&mut self.lights.fog);
        }
        if preset.road_speed.is_some() || preset.skyline_speed.is_some() {
            self.speed = TrackSpeed::new(
                preset.road_speed.unwrap_or(self.speed.road()),
                preset.skyline_speed.unwrap_or(self.speed.skyline()),
            );
            self.sync_conveyor_speeds();
        }
        if let Some(exposure) = preset.exposure {
            self.post.exposure = exposure;
        }
        if let Some(passes) = preset.blur_passes {
            self.post.blur_passes = passes;
        }
        if let Some(color) = preset.clear_color {
            self.clear_color = Vec3::from_array(color);
        }
        log::info!("applied scene preset: {preset:?}");
    }

    pub fn restore_view(&mut self, view: &PersistedView) {
        self.clear_color = view.clear_color;
        self.controls.overlay = view.overlay;
        self.camera.position = view.camera_position;
        self.camera.set_front(view.camera_front);
    }

    pub fn view_state(&self) -> PersistedView {
        PersistedView {
            clear_color: self.clear_color,
            overlay: self.controls.overlay,
            camera_position: self.camera.position,
            camera_front: self.camera.front(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn road_scene_registers_every_generator() {
        let scene = SceneState::road_scene();
        assert_eq!(scene.oscillators.len(), 4);
        assert_eq!(scene.conveyors.len(), 9);
        assert_eq!(scene.actors.len(), 14);
        assert_eq!(scene.draw_list.len(), 14);
    }

    #[test]
    fn vehicles_start_at_authored_positions() {
        let scene = SceneState::road_scene();
        assert_eq!(scene.position_of("nissan_sx180"), Some(Vec3::new(11.0, 1.57, -1.1)));
        assert_eq!(scene.position_of("porsche_911"), Some(Vec3::new(-11.0, 1.57, -1.65)));
        let directions: Vec<_> = scene
            .oscillators
            .iter()
            .map(|binding| binding.oscillator.direction())
            .collect();
        assert_eq!(
            directions,
            [
                Direction::MovingUpper,
                Direction::MovingLower,
                Direction::MovingLower,
                Direction::MovingUpper
            ]
        );
    }

    #[test]
    fn draw_list_follows_authored_order() {
        let scene = SceneState::road_scene();
        let labels: Vec<_> = scene.draw_list.iter().map(|item| item.label).collect();
        assert_eq!(
            labels,
            [
                "road",
                "nissan_sx180",
                "nissan_s15",
                "porsche_911",
                "nissan_240sx",
                "trees",
                "buildings",
                "power_poles",
                "street_lamps",
                "grass_right",
                "grass_left",
                "mountain",
                "terrain_a",
                "terrain_b",
            ]
        );
        let first_unculled = scene
            .draw_list
            .iter()
            .position(|item| item.culling == Culling::Disabled);
        assert_eq!(first_unculled, Some(9));
        assert!(scene.draw_list[9..]
            .iter()
            .all(|item| item.culling == Culling::Disabled));
    }

    #[test]
    fn buildings_follow_skyline_speed() {
        let scene = SceneState::road_scene();
        let buildings = scene.find("buildings").expect("buildings");
        let binding = scene
            .conveyors
            .iter()
            .find(|binding| binding.actor == buildings)
            .expect("building conveyor");
        assert_eq!(binding.lane, SpeedLane::Skyline);
        assert_eq!(binding.conveyor.speed(), 4.5);
    }

    #[test]
    fn preset_speeds_reach_conveyors() {
        let mut scene = SceneState::road_scene();
        scene.apply_preset(&ScenePreset {
            road_speed: Some(10.0),
            blur_passes: Some(3),
            ..ScenePreset::default()
        });
        assert_eq!(scene.speed.road(), 10.0);
        assert_eq!(scene.speed.skyline(), 4.5);
        assert_eq!(scene.post.blur_passes, 3);
        let road = scene.find("road").expect("road");
        let binding = scene
            .conveyors
            .iter()
            .find(|binding| binding.actor == road)
            .expect("road conveyor");
        assert_eq!(binding.conveyor.speed(), 10.0);
    }

    #[test]
    fn view_state_round_trips_through_scene() {
        let mut scene = SceneState::road_scene();
        let view = PersistedView {
            clear_color: Vec3::new(0.2, 0.3, 0.4),
            overlay: true,
            camera_position: Vec3::new(5.0, 2.0, -1.0),
            camera_front: Vec3::X,
        };
        scene.restore_view(&view);
        let captured = scene.view_state();
        assert_eq!(captured.camera_position, view.camera_position);
        assert!((captured.camera_front - Vec3::X).length() < 1e-5);
        assert!(captured.overlay);
    }

    #[test]
    fn sway_is_half_unit_sine() {
        let sway = Sway {
            actor: ActorId(0),
            frequency: SWAY_FREQUENCY,
            amplitude: SWAY_AMPLITUDE,
        };
        assert_eq!(sway.offset(0.0), 0.0);
        let peak = std::f32::consts::FRAC_PI_2 / SWAY_FREQUENCY;
        assert!((sway.offset(peak) - 0.5).abs() < 1e-6);
    }
}
