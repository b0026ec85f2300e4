mod cli;
mod headless;
mod input;
mod viewer;

use std::{path::Path, process::ExitCode, sync::Arc, time::Instant};

use anyhow::{Context, Result};
use clap::Parser;
use pollster::FutureExt;
use rollers_scene::{FrameScheduler, PersistedView, SceneState};
use wgpu::SurfaceError;
use winit::{
    dpi::PhysicalSize,
    event::{DeviceEvent, ElementState, Event, KeyEvent, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::WindowBuilder,
};

use crate::cli::Args;
use crate::headless::HeadlessRun;
use crate::input::InputCollector;
use crate::viewer::ViewerState;

/// Reported when the window or GPU cannot be brought up.
const INIT_FAILURE: u8 = 255;

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(args) {
        Ok(code) => code,
        Err(err) => {
            log::error!("{err:#}");
            eprintln!("[rollers_viewer] {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    args.validate()?;

    let mut scene = build_scene(&args)?;

    if args.headless {
        headless::run(
            HeadlessRun {
                frames: args.frames,
                frame_dt: args.frame_dt,
                viewport: (args.width, args.height),
            },
            &mut scene,
            args.dump_steps.as_deref(),
        )?;
        save_view(&scene, &args.state_file)?;
        return Ok(ExitCode::SUCCESS);
    }

    let event_loop = match EventLoop::new().context("creating winit event loop") {
        Ok(event_loop) => event_loop,
        Err(err) => return Ok(init_failure(err)),
    };
    let window = match WindowBuilder::new()
        .with_title("Rollers")
        .with_inner_size(PhysicalSize::new(args.width, args.height))
        .build(&event_loop)
        .context("creating viewer window")
    {
        Ok(window) => Arc::new(window),
        Err(err) => return Ok(init_failure(err)),
    };
    let mut viewer = match ViewerState::new(window).block_on() {
        Ok(viewer) => viewer,
        Err(err) => return Ok(init_failure(err)),
    };

    let size = viewer.size();
    let mut scheduler = FrameScheduler::default();
    scheduler.set_viewport(size.width, size.height);
    let mut input = InputCollector::new();
    let state_file = args.state_file;
    let started = Instant::now();

    println!("Controls: WASD/Space/LCtrl fly, mouse looks, scroll zooms, M toggles traffic,");
    println!("  Up/Down throttle, B high beam, Left/Right signals, Q sky, H bloom, F1 cursor, Esc quits.");

    event_loop
        .run(move |event, target| {
            target.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { window_id, event } if window_id == viewer.window().id() => {
                    match event {
                        WindowEvent::CloseRequested => target.exit(),
                        WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    logical_key: Key::Named(NamedKey::Escape),
                                    state: ElementState::Pressed,
                                    ..
                                },
                            ..
                        } => target.exit(),
                        WindowEvent::KeyboardInput { event, .. } => input.handle_key_event(&event),
                        WindowEvent::MouseWheel { delta, .. } => input.handle_scroll(delta),
                        WindowEvent::Focused(false) => input.clear_held(),
                        WindowEvent::Resized(new_size) => {
                            viewer.resize(new_size);
                            scheduler.set_viewport(new_size.width, new_size.height);
                        }
                        WindowEvent::RedrawRequested => {
                            let frame_input = input.take_frame();
                            let now = started.elapsed().as_secs_f32();
                            scheduler.run_frame(&mut scene, now, &frame_input, &mut viewer);
                            match viewer.take_surface_error() {
                                None => {}
                                Some(SurfaceError::Lost | SurfaceError::Outdated) => {
                                    viewer.resize(viewer.size())
                                }
                                Some(SurfaceError::OutOfMemory) => target.exit(),
                                Some(err) => log::warn!("render error: {err:?}"),
                            }
                        }
                        _ => {}
                    }
                }
                Event::DeviceEvent {
                    event: DeviceEvent::MouseMotion { delta },
                    ..
                } => {
                    // A released cursor belongs to the desktop, not the camera.
                    if !scene.controls.overlay {
                        input.handle_mouse_motion(delta.0, delta.1);
                    }
                }
                Event::AboutToWait => viewer.window().request_redraw(),
                Event::LoopExiting => {
                    if let Err(err) = save_view(&scene, &state_file) {
                        log::error!("{err:#}");
                    }
                }
                _ => {}
            }
        })
        .context("running viewer application")?;
    Ok(ExitCode::SUCCESS)
}

fn build_scene(args: &Args) -> Result<SceneState> {
    let mut scene = SceneState::road_scene();
    if let Some(path) = args.preset.as_deref() {
        let preset = cli::load_preset(path)?;
        scene.apply_preset(&preset);
        log::info!("applied scene preset {}", path.display());
    }
    let view = PersistedView::load(&args.state_file)
        .with_context(|| format!("reading view state {}", args.state_file.display()))?;
    scene.restore_view(&view);
    scene.controls.moving = args.start_moving;
    Ok(scene)
}

fn save_view(scene: &SceneState, path: &Path) -> Result<()> {
    scene
        .view_state()
        .save(path)
        .with_context(|| format!("saving view state {}", path.display()))
}

fn init_failure(err: anyhow::Error) -> ExitCode {
    log::error!("viewer initialisation failed: {err:#}");
    eprintln!("[rollers_viewer] viewer initialisation failed: {err:#}");
    ExitCode::from(INIT_FAILURE)
}
