use std::collections::VecDeque;

use serde::Serialize;

use crate::{
    camera::MIN_HEIGHT,
    clock::SceneClock,
    controls::FrameInput,
    render::{
        Culling, DrawCommand, FpsTier, FrameUniforms, OverlayStats, PostProcess, RenderStep,
        Renderer, SkyboxKind,
    },
    scene::SceneState,
};

const FPS_WINDOW: usize = 120;

/// Summary of one scheduler iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameReport {
    pub frame_index: u64,
    pub time: f32,
    pub delta_time: f32,
    pub draw_count: usize,
    /// Conveyors that snapped back to their reset value this frame.
    pub wraps: usize,
    pub moving: bool,
}

/// Rolling frame rate over the last [`FPS_WINDOW`] deltas.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FpsMeter {
    deltas: VecDeque<f32>,
    total: f32,
}

impl FpsMeter {
    pub fn record(&mut self, delta_time: f32) {
        if delta_time <= 0.0 {
            return;
        }
        if self.deltas.len() == FPS_WINDOW {
            if let Some(oldest) = self.deltas.pop_front() {
                self.total -= oldest;
            }
        }
        self.deltas.push_back(delta_time);
        self.total += delta_time;
    }

    pub fn fps(&self) -> f32 {
        if self.total <= 0.0 {
            return 0.0;
        }
        self.deltas.len() as f32 / self.total
    }
}

/// Drives one simulate + submit pass per host frame.
///
/// The order inside [`FrameScheduler::run_frame`] is fixed: clock, input,
/// generators, time-dependent lighting, then draw submission ending with the
/// post-process pass, the overlay and present.
#[derive(Debug, Clone, Serialize)]
pub struct FrameScheduler {
    clock: SceneClock,
    frame_index: u64,
    aspect: f32,
    fps: FpsMeter,
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(16.0 / 9.0)
    }
}

impl FrameScheduler {
    pub fn new(aspect: f32) -> Self {
        Self {
            clock: SceneClock::new(),
            frame_index: 0,
            aspect,
            fps: FpsMeter::default(),
        }
    }

    pub fn clock(&self) -> &SceneClock {
        &self.clock
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn run_frame<R>(
        &mut self,
        scene: &mut SceneState,
        now_seconds: f32,
        input: &FrameInput,
        renderer: &mut R,
    ) -> FrameReport
    where
        R: Renderer + ?Sized,
    {
        let delta_time = self.clock.tick(now_seconds);
        let time = self.clock.current_time();
        self.fps.record(delta_time);

        apply_input(scene, input, delta_time);

        let wraps = if scene.controls.moving {
            advance_generators(scene, delta_time, time)
        } else {
            0
        };

        update_lights(scene, time);

        let draw_count = self.submit(scene, time, renderer);
        let report = FrameReport {
            frame_index: self.frame_index,
            time,
            delta_time,
            draw_count,
            wraps,
            moving: scene.controls.moving,
        };
        self.frame_index += 1;
        report
    }

    fn submit<R>(&self, scene: &SceneState, time: f32, renderer: &mut R) -> usize
    where
        R: Renderer + ?Sized,
    {
        renderer.submit(RenderStep::BeginFrame(FrameUniforms {
            view: scene.camera.view_matrix(),
            projection: scene.camera.projection_matrix(self.aspect),
            camera_position: scene.camera.position,
            clear_color: scene.clear_color,
            time,
            sun: scene.lights.sun,
            spot_lights: scene.lights.spot_lights().copied().collect(),
            fog: scene.lights.fog,
        }));

        let mut culling = Culling::Back;
        let mut draw_count = 0;
        for item in &scene.draw_list {
            if item.culling != culling {
                culling = item.culling;
                renderer.submit(RenderStep::SetCulling(culling));
            }
            let Some(actor) = scene.actor(item.actor) else {
                log::warn!("draw item {} points at missing actor {:?}", item.label, item.actor);
                continue;
            };
            for index in 0..item.repeat {
                renderer.submit(RenderStep::Mesh(DrawCommand {
                    label: item.label,
                    mesh: item.mesh,
                    model: actor
                        .transform
                        .model_matrix_offset(item.stride * index as f32),
                    culling,
                }));
                draw_count += 1;
            }
        }
        if culling != Culling::Back {
            renderer.submit(RenderStep::SetCulling(Culling::Back));
        }

        renderer.submit(RenderStep::Skybox(if scene.controls.alternate_sky {
            SkyboxKind::Dusk
        } else {
            SkyboxKind::Day
        }));
        renderer.submit(RenderStep::PostProcess(PostProcess {
            bloom: scene.controls.bloom,
            exposure: scene.post.exposure,
            blur_passes: scene.post.blur_passes,
        }));
        let fps = self.fps.fps();
        renderer.submit(RenderStep::Overlay(OverlayStats {
            fps,
            tier: FpsTier::classify(fps),
            interactive: scene.controls.overlay,
        }));
        renderer.submit(RenderStep::Present);
        draw_count
    }
}

fn apply_input(scene: &mut SceneState, input: &FrameInput, delta_time: f32) {
    for &toggle in &input.toggles {
        scene.controls.apply(toggle);
    }

    for &movement in &input.movement {
        scene.camera.process_keyboard(movement, delta_time);
    }
    if input.mouse_delta != glam::Vec2::ZERO {
        scene
            .camera
            .process_mouse_movement(input.mouse_delta.x, input.mouse_delta.y);
    }
    if input.scroll != 0.0 {
        scene.camera.process_mouse_scroll(input.scroll);
    }
    scene.camera.clamp_height(MIN_HEIGHT);

    if scene.speed.apply(input.throttle) {
        scene.sync_conveyor_speeds();
        log::debug!(
            "track speed road={} skyline={}",
            scene.speed.road(),
            scene.speed.skyline()
        );
    }
}

fn advance_generators(scene: &mut SceneState, delta_time: f32, time: f32) -> usize {
    let SceneState {
        actors,
        oscillators,
        conveyors,
        sway,
        ..
    } = scene;

    for binding in oscillators.iter_mut() {
        if let Some(actor) = actors.get_mut(binding.actor.0) {
            binding
                .oscillator
                .advance(&mut actor.transform.position.x, delta_time);
        }
    }

    let mut wraps = 0;
    for binding in conveyors.iter_mut() {
        if let Some(actor) = actors.get_mut(binding.actor.0) {
            if binding
                .conveyor
                .advance(&mut actor.transform.position.x, delta_time)
            {
                wraps += 1;
            }
        }
    }

    if let Some(sway) = sway {
        if let Some(actor) = actors.get_mut(sway.actor.0) {
            actor.transform.position.z = sway.offset(time);
        }
    }
    wraps
}

fn update_lights(scene: &mut SceneState, time: f32) {
    if let Some(anchor) = scene
        .headlight_actor
        .and_then(|id| scene.actors.get(id.0))
        .map(|actor| actor.transform.position)
    {
        scene.lights.update_headlights(&scene.controls, time, anchor);
    }

    if let Some((anchor, stride, count)) = scene.lamp_item.and_then(|index| {
        let item = scene.draw_list.get(index)?;
        let actor = scene.actors.get(item.actor.0)?;
        Some((actor.transform.position, item.stride, item.repeat))
    }) {
        scene.lights.update_lamps(anchor, stride, count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{controls::Toggle, render::RecordingRenderer};

    #[test]
    fn fps_meter_averages_window() {
        let mut meter = FpsMeter::default();
        assert_eq!(meter.fps(), 0.0);
        for _ in 0..200 {
            meter.record(1.0 / 50.0);
        }
        assert!((meter.fps() - 50.0).abs() < 0.5);
        meter.record(0.0);
        assert!((meter.fps() - 50.0).abs() < 0.5);
    }

    #[test]
    fn frame_index_and_delta_advance() {
        let mut scene = SceneState::road_scene();
        let mut scheduler = FrameScheduler::default();
        let mut renderer = RecordingRenderer::new();

        let first = scheduler.run_frame(&mut scene, 0.5, &FrameInput::default(), &mut renderer);
        let second = scheduler.run_frame(&mut scene, 0.75, &FrameInput::default(), &mut renderer);
        assert_eq!(first.frame_index, 0);
        assert_eq!(second.frame_index, 1);
        assert_eq!(first.delta_time, 0.5);
        assert_eq!(second.delta_time, 0.25);
        assert_eq!(scheduler.frame_index(), 2);
    }

    #[test]
    fn draw_count_covers_every_instance() {
        let mut scene = SceneState::road_scene();
        let mut scheduler = FrameScheduler::default();
        let mut renderer = RecordingRenderer::new();
        let report = scheduler.run_frame(&mut scene, 0.1, &FrameInput::default(), &mut renderer);
        // 6 road + 4 vehicles + 5 trees + 4 buildings + 10 poles + 7 lamps
        // + 3 + 3 grass + mountain + 2 terrain
        assert_eq!(report.draw_count, 45);
        assert_eq!(renderer.meshes().count(), 45);
    }

    #[test]
    fn lamp_lights_track_lamp_instances() {
        let mut scene = SceneState::road_scene();
        let mut scheduler = FrameScheduler::default();
        let mut renderer = RecordingRenderer::new();
        scheduler.run_frame(&mut scene, 0.1, &FrameInput::default(), &mut renderer);
        assert_eq!(scene.lights.lamps.len(), 7);

        let Some(RenderStep::BeginFrame(uniforms)) = renderer.steps().first() else {
            panic!("frame must open with BeginFrame");
        };
        assert_eq!(uniforms.spot_lights.len(), 9);
    }

    #[test]
    fn toggles_apply_before_motion() {
        let mut scene = SceneState::road_scene();
        let mut scheduler = FrameScheduler::default();
        let mut renderer = RecordingRenderer::new();
        let start = scene.position_of("road").expect("road");

        let report = scheduler.run_frame(
            &mut scene,
            0.5,
            &FrameInput::toggle(Toggle::Motion),
            &mut renderer,
        );
        assert!(report.moving);
        let moved = scene.position_of("road").expect("road");
        assert!((moved.x - (start.x + 3.5)).abs() < 1e-4);
    }
}
