use anyhow::{Context, Result};
use glam::Vec3;
use rollers_scene::{
    CameraMovement, Culling, FrameInput, FrameScheduler, PersistedView, RecordingRenderer,
    RenderStep, SceneState, SkyboxKind, Throttle, Toggle,
};
use tempfile::tempdir;

const FRAME_DT: f32 = 1.0 / 60.0;

fn positions(scene: &SceneState) -> Vec<(&'static str, Vec3)> {
    scene
        .actors
        .iter()
        .map(|actor| (actor.name, actor.transform.position))
        .collect()
}

fn step_index(renderer: &RecordingRenderer, predicate: impl Fn(&RenderStep) -> bool) -> usize {
    renderer
        .steps()
        .iter()
        .position(predicate)
        .expect("step should be present")
}

#[test]
fn frozen_scene_keeps_every_actor_in_place() {
    let mut scene = SceneState::road_scene();
    let mut scheduler = FrameScheduler::default();
    let mut renderer = RecordingRenderer::new();
    let before = positions(&scene);

    for frame in 1..=240 {
        let input = FrameInput {
            throttle: Throttle::Accelerate,
            ..FrameInput::default()
        };
        let report = scheduler.run_frame(&mut scene, frame as f32 * FRAME_DT, &input, &mut renderer);
        assert!(!report.moving);
        assert_eq!(report.wraps, 0);
    }

    assert_eq!(positions(&scene), before);
    assert!(scene.speed.road() > 7.0, "throttle still applies while frozen");
}

#[test]
fn signals_keep_blinking_while_frozen() {
    let mut scene = SceneState::road_scene();
    let mut scheduler = FrameScheduler::default();
    let mut renderer = RecordingRenderer::new();

    scheduler.run_frame(
        &mut scene,
        1.9,
        &FrameInput::toggle(Toggle::LeftSignal),
        &mut renderer,
    );
    assert!(!scene.controls.moving);
    assert_eq!(scene.lights.headlights[0].diffuse, Vec3::new(15.0, 10.0, 0.0));
    assert_eq!(scene.lights.headlights[1].diffuse, Vec3::new(0.3, 0.3, 0.9));

    let Some(RenderStep::BeginFrame(uniforms)) = renderer.steps().first() else {
        panic!("frame should open with BeginFrame");
    };
    assert_eq!(uniforms.spot_lights[0].diffuse, Vec3::new(15.0, 10.0, 0.0));

    scheduler.run_frame(&mut scene, 2.1, &FrameInput::default(), &mut renderer);
    assert_eq!(scene.lights.headlights[0].diffuse, Vec3::new(0.3, 0.3, 0.9));
}

#[test]
fn submission_order_is_fixed() {
    let mut scene = SceneState::road_scene();
    let mut scheduler = FrameScheduler::default();
    let mut renderer = RecordingRenderer::new();
    scheduler.run_frame(
        &mut scene,
        0.5,
        &FrameInput {
            toggles: vec![Toggle::Bloom, Toggle::Skybox],
            ..FrameInput::default()
        },
        &mut renderer,
    );

    let steps = renderer.steps();
    assert!(matches!(steps.first(), Some(RenderStep::BeginFrame(_))));
    assert!(matches!(steps.last(), Some(RenderStep::Present)));

    let labels: Vec<&str> = renderer.meshes().map(|mesh| mesh.label).collect();
    let first_of = |label: &str| labels.iter().position(|l| *l == label).expect(label);
    let order = [
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
    ];
    for pair in order.windows(2) {
        assert!(first_of(pair[0]) < first_of(pair[1]), "{} before {}", pair[0], pair[1]);
    }

    let culling_off = step_index(&renderer, |s| *s == RenderStep::SetCulling(Culling::Disabled));
    let culling_on = step_index(&renderer, |s| *s == RenderStep::SetCulling(Culling::Back));
    let first_grass = step_index(&renderer, |s| matches!(s, RenderStep::Mesh(m) if m.label == "grass_right"));
    let last_lamp = steps
        .iter()
        .rposition(|s| matches!(s, RenderStep::Mesh(m) if m.label == "street_lamps"))
        .expect("lamps drawn");
    let last_mesh = steps
        .iter()
        .rposition(|s| matches!(s, RenderStep::Mesh(_)))
        .expect("meshes drawn");
    let skybox = step_index(&renderer, |s| matches!(s, RenderStep::Skybox(_)));
    let post = step_index(&renderer, |s| matches!(s, RenderStep::PostProcess(_)));
    let overlay = step_index(&renderer, |s| matches!(s, RenderStep::Overlay(_)));

    assert!(last_lamp < culling_off && culling_off < first_grass);
    assert!(last_mesh < culling_on && culling_on < skybox);
    assert!(skybox < post && post < overlay);
    assert_eq!(overlay + 1, steps.len() - 1);

    assert_eq!(steps[skybox], RenderStep::Skybox(SkyboxKind::Dusk));
    let RenderStep::PostProcess(settings) = &steps[post] else {
        unreachable!();
    };
    assert!(settings.bloom);
    assert_eq!(settings.exposure, 0.5);
    assert_eq!(settings.blur_passes, 5);

    for step in &steps[first_grass..culling_on] {
        if let RenderStep::Mesh(mesh) = step {
            assert_eq!(mesh.culling, Culling::Disabled, "{}", mesh.label);
        }
    }
}

#[test]
fn road_tiles_wrap_after_one_stride() {
    let mut scene = SceneState::road_scene();
    let mut scheduler = FrameScheduler::default();
    let mut renderer = RecordingRenderer::new();

    let mut previous = scene.position_of("road").expect("road").x;
    assert_eq!(previous, -80.0);

    let mut wrap = None;
    for frame in 1..=400 {
        let now = frame as f32 * FRAME_DT;
        let input = if frame == 1 {
            FrameInput::toggle(Toggle::Motion)
        } else {
            FrameInput::default()
        };
        scheduler.run_frame(&mut scene, now, &input, &mut renderer);
        let x = scene.position_of("road").expect("road").x;
        if x < previous {
            wrap = Some((now, previous, x));
            break;
        }
        previous = x;
    }

    let (time, before, after) = wrap.expect("road should wrap within 400 frames");
    assert!((4.42..=4.44).contains(&time), "wrapped at {time}");
    assert!(before < -49.0 && before > -49.0 - 7.0 * FRAME_DT, "last position {before}");
    assert_eq!(after, -80.0);
}

#[test]
fn vehicles_stay_near_their_bounds() {
    let mut scene = SceneState::road_scene();
    scene.controls.moving = true;
    let mut scheduler = FrameScheduler::default();
    let mut renderer = RecordingRenderer::new();

    for frame in 1..=3_000 {
        scheduler.run_frame(&mut scene, frame as f32 * FRAME_DT, &FrameInput::default(), &mut renderer);
        for binding in &scene.oscillators {
            let config = binding.oscillator.config();
            let x = scene.actors[binding.actor.0].transform.position.x;
            assert!(
                x >= config.lower_bound - config.forward_speed * FRAME_DT - 1e-4
                    && x <= config.upper_bound + config.backward_speed * FRAME_DT + 1e-4,
                "{} left its range at x={x}",
                scene.actors[binding.actor.0].name
            );
        }
    }
}

#[test]
fn sway_only_moves_the_240sx_while_moving() {
    let mut scene = SceneState::road_scene();
    let mut scheduler = FrameScheduler::default();
    let mut renderer = RecordingRenderer::new();

    scheduler.run_frame(&mut scene, 1.0, &FrameInput::default(), &mut renderer);
    assert_eq!(scene.position_of("nissan_240sx").expect("240sx").z, 0.72);

    scheduler.run_frame(&mut scene, 1.3, &FrameInput::toggle(Toggle::Motion), &mut renderer);
    let z = scene.position_of("nissan_240sx").expect("240sx").z;
    assert!((z - (1.3_f32 * 1.2).sin() * 0.5).abs() < 1e-6);
    assert_eq!(scene.position_of("nissan_s15").expect("s15").z, 0.7);
}

#[test]
fn throttle_retunes_running_conveyors() {
    let mut scene = SceneState::road_scene();
    let mut scheduler = FrameScheduler::default();
    let mut renderer = RecordingRenderer::new();
    let input = FrameInput {
        throttle: Throttle::Accelerate,
        ..FrameInput::default()
    };
    for frame in 1..=4 {
        scheduler.run_frame(&mut scene, frame as f32 * FRAME_DT, &input, &mut renderer);
    }
    assert_eq!(scene.speed.road(), 9.0);
    assert_eq!(scene.speed.skyline(), 6.5);
    for binding in &scene.conveyors {
        assert_eq!(binding.conveyor.speed(), scene.speed.for_lane(binding.lane));
    }
}

#[test]
fn camera_never_drops_below_the_road() {
    let mut scene = SceneState::road_scene();
    let mut scheduler = FrameScheduler::default();
    let mut renderer = RecordingRenderer::new();
    let input = FrameInput {
        movement: vec![CameraMovement::Down],
        ..FrameInput::default()
    };
    for frame in 1..=120 {
        scheduler.run_frame(&mut scene, frame as f32 * FRAME_DT, &input, &mut renderer);
        assert!(scene.camera.position.y >= 1.5);
    }
    assert_eq!(scene.camera.position.y, 1.5);
}

#[test]
fn view_state_survives_save_and_load() -> Result<()> {
    let dir = tempdir().context("creating temporary state directory")?;
    let path = dir.path().join("program_state.txt");

    let mut scene = SceneState::road_scene();
    let mut scheduler = FrameScheduler::default();
    let mut renderer = RecordingRenderer::new();
    let input = FrameInput {
        toggles: vec![Toggle::Overlay],
        movement: vec![CameraMovement::Forward, CameraMovement::Up],
        mouse_delta: glam::Vec2::new(35.0, -12.5),
        ..FrameInput::default()
    };
    scheduler.run_frame(&mut scene, 0.4, &input, &mut renderer);
    scene.view_state().save(&path)?;

    let loaded = PersistedView::load(&path)?;
    assert_eq!(loaded.camera_position, scene.camera.position);
    assert_eq!(loaded.camera_front, scene.camera.front());
    assert!(loaded.overlay);

    let mut restored = SceneState::road_scene();
    restored.restore_view(&loaded);
    assert_eq!(restored.camera.position, scene.camera.position);
    assert!((restored.camera.front() - scene.camera.front()).length() < 1e-5);
    assert!((restored.camera.yaw() - scene.camera.yaw()).abs() < 1e-3);
    Ok(())
}
