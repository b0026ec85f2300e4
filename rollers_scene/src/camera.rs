//! Free-flying first person camera.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

pub const DEFAULT_YAW: f32 = -90.0;
pub const DEFAULT_PITCH: f32 = 0.0;
pub const DEFAULT_SPEED: f32 = 2.5;
pub const DEFAULT_SENSITIVITY: f32 = 0.1;
pub const DEFAULT_ZOOM: f32 = 45.0;
pub const PITCH_LIMIT: f32 = 89.0;
pub const ZOOM_RANGE: (f32, f32) = (1.0, 45.0);
pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 169.0;
/// The camera never dips below the road surface.
pub const MIN_HEIGHT: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlyCamera {
    pub position: Vec3,
    front: Vec3,
    up: Vec3,
    right: Vec3,
    world_up: Vec3,
    yaw: f32,
    pitch: f32,
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
    zoom: f32,
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.0, 3.0))
    }
}

impl FlyCamera {
    pub fn new(position: Vec3) -> Self {
        let mut camera = Self {
            position,
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            right: Vec3::X,
            world_up: Vec3::Y,
            yaw: DEFAULT_YAW,
            pitch: DEFAULT_PITCH,
            movement_speed: DEFAULT_SPEED,
            mouse_sensitivity: DEFAULT_SENSITIVITY,
            zoom: DEFAULT_ZOOM,
        };
        camera.update_vectors();
        camera
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Points the camera along `front`, keeping yaw/pitch in sync so later
    /// mouse look continues from the restored direction.
    pub fn set_front(&mut self, front: Vec3) {
        let Some(direction) = front.try_normalize() else {
            return;
        };
        self.pitch = direction
            .y
            .clamp(-1.0, 1.0)
            .asin()
            .to_degrees()
            .clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.yaw = direction.z.atan2(direction.x).to_degrees();
        self.update_vectors();
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.zoom.to_radians(), aspect.max(1e-3), NEAR_PLANE, FAR_PLANE)
    }

    pub fn process_keyboard(&mut self, movement: CameraMovement, delta_time: f32) {
        let velocity = self.movement_speed * delta_time;
        match movement {
            CameraMovement::Forward => self.position += self.front * velocity,
            CameraMovement::Backward => self.position -= self.front * velocity,
            CameraMovement::Left => self.position -= self.right * velocity,
            CameraMovement::Right => self.position += self.right * velocity,
            CameraMovement::Up => self.position += self.up * velocity,
            CameraMovement::Down => self.position -= self.up * velocity,
        }
    }

    pub fn process_mouse_movement(&mut self, x_offset: f32, y_offset: f32) {
        self.yaw += x_offset * self.mouse_sensitivity;
        self.pitch = (self.pitch + y_offset * self.mouse_sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_vectors();
    }

    pub fn process_mouse_scroll(&mut self, y_offset: f32) {
        self.zoom = (self.zoom - y_offset).clamp(ZOOM_RANGE.0, ZOOM_RANGE.1);
    }

    pub fn clamp_height(&mut self, min_height: f32) {
        if self.position.y < min_height {
            self.position.y = min_height;
        }
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos())
            .normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn approx(a: Vec3, b: Vec3) {
        assert!((a - b).length() <= EPSILON, "{a:?} != {b:?}");
    }

    #[test]
    fn default_camera_looks_down_negative_z() {
        let camera = FlyCamera::default();
        approx(camera.front(), Vec3::NEG_Z);
        approx(camera.right(), Vec3::X);
        assert_eq!(camera.position, Vec3::new(0.0, 0.0, 3.0));
    }

    #[test]
    fn keyboard_motion_scales_with_delta() {
        let mut camera = FlyCamera::default();
        camera.process_keyboard(CameraMovement::Forward, 2.0);
        approx(camera.position, Vec3::new(0.0, 0.0, -2.0));
        camera.process_keyboard(CameraMovement::Right, 0.4);
        approx(camera.position, Vec3::new(1.0, 0.0, -2.0));
        camera.process_keyboard(CameraMovement::Up, 0.0);
        approx(camera.position, Vec3::new(1.0, 0.0, -2.0));
    }

    #[test]
    fn pitch_is_limited() {
        let mut camera = FlyCamera::default();
        camera.process_mouse_movement(0.0, 10_000.0);
        assert_eq!(camera.pitch(), PITCH_LIMIT);
        assert!(camera.front().y > 0.99);
    }

    #[test]
    fn scroll_zoom_stays_in_range() {
        let mut camera = FlyCamera::default();
        camera.process_mouse_scroll(100.0);
        assert_eq!(camera.zoom(), ZOOM_RANGE.0);
        camera.process_mouse_scroll(-100.0);
        assert_eq!(camera.zoom(), ZOOM_RANGE.1);
    }

    #[test]
    fn restored_front_survives_mouse_look() {
        let mut camera = FlyCamera::default();
        let restored = Vec3::new(1.0, -0.5, 0.25).normalize();
        camera.set_front(restored);
        approx(camera.front(), restored);

        camera.process_mouse_movement(0.0, 0.0);
        approx(camera.front(), restored);
    }

    #[test]
    fn zero_front_is_ignored() {
        let mut camera = FlyCamera::default();
        camera.set_front(Vec3::ZERO);
        approx(camera.front(), Vec3::NEG_Z);
    }

    #[test]
    fn height_clamp_only_raises() {
        let mut camera = FlyCamera::new(Vec3::new(0.0, 0.2, 0.0));
        camera.clamp_height(MIN_HEIGHT);
        assert_eq!(camera.position.y, MIN_HEIGHT);
        camera.position.y = 4.0;
        camera.clamp_height(MIN_HEIGHT);
        assert_eq!(camera.position.y, 4.0);
    }
}
