//! Translates winit keyboard and mouse events into the once-per-frame
//! `FrameInput` the scheduler consumes.

use std::collections::HashSet;

use glam::Vec2;
use rollers_scene::{CameraMovement, FrameInput, Throttle, Toggle};
use winit::{
    event::{ElementState, KeyEvent, MouseScrollDelta},
    keyboard::{KeyCode, PhysicalKey},
};

/// Lines per notch reported by pixel-based touchpads.
const PIXELS_PER_LINE: f32 = 40.0;

pub fn toggle_for(code: KeyCode) -> Option<Toggle> {
    match code {
        KeyCode::KeyM => Some(Toggle::Motion),
        KeyCode::KeyB => Some(Toggle::HighBeam),
        KeyCode::ArrowLeft => Some(Toggle::LeftSignal),
        KeyCode::ArrowRight => Some(Toggle::RightSignal),
        KeyCode::KeyQ => Some(Toggle::Skybox),
        KeyCode::KeyH => Some(Toggle::Bloom),
        KeyCode::F1 => Some(Toggle::Overlay),
        _ => None,
    }
}

pub fn movement_for(code: KeyCode) -> Option<CameraMovement> {
    match code {
        KeyCode::KeyW => Some(CameraMovement::Forward),
        KeyCode::KeyS => Some(CameraMovement::Backward),
        KeyCode::KeyA => Some(CameraMovement::Left),
        KeyCode::KeyD => Some(CameraMovement::Right),
        KeyCode::Space => Some(CameraMovement::Up),
        KeyCode::ControlLeft => Some(CameraMovement::Down),
        _ => None,
    }
}

#[derive(Debug, Default)]
pub struct InputCollector {
    held: HashSet<KeyCode>,
    toggles: Vec<Toggle>,
    mouse_delta: Vec2,
    scroll: f32,
}

impl InputCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_key_event(&mut self, event: &KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        self.handle_key(code, event.state, event.repeat);
    }

    pub fn handle_key(&mut self, code: KeyCode, state: ElementState, repeat: bool) {
        match state {
            ElementState::Pressed => {
                self.held.insert(code);
                if !repeat {
                    if let Some(toggle) = toggle_for(code) {
                        self.toggles.push(toggle);
                    }
                }
            }
            ElementState::Released => {
                self.held.remove(&code);
            }
        }
    }

    /// Raw device motion; screen y grows downward so it is flipped for pitch.
    pub fn handle_mouse_motion(&mut self, dx: f64, dy: f64) {
        self.mouse_delta += Vec2::new(dx as f32, -(dy as f32));
    }

    pub fn handle_scroll(&mut self, delta: MouseScrollDelta) {
        self.scroll += match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_LINE,
        };
    }

    /// Drops held keys, e.g. when the window loses focus.
    pub fn clear_held(&mut self) {
        self.held.clear();
    }

    /// Drains edge-triggered events and snapshots held keys for this frame.
    pub fn take_frame(&mut self) -> FrameInput {
        let mut movement: Vec<CameraMovement> =
            self.held.iter().copied().filter_map(movement_for).collect();
        movement.sort_by_key(|m| *m as u8);

        let accelerate = self.held.contains(&KeyCode::ArrowUp);
        let decelerate = self.held.contains(&KeyCode::ArrowDown);
        let throttle = match (accelerate, decelerate) {
            (true, false) => Throttle::Accelerate,
            (false, true) => Throttle::Decelerate,
            _ => Throttle::Hold,
        };

        FrameInput {
            toggles: std::mem::take(&mut self.toggles),
            movement,
            mouse_delta: std::mem::take(&mut self.mouse_delta),
            scroll: std::mem::take(&mut self.scroll),
            throttle,
        }
    }
}
