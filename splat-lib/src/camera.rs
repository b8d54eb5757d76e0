//! Orbit camera and pointer interaction handling.
//!
//! The camera orbits a target point at a given radius; pitch and yaw select
//! the position on that sphere. Pan and the view matrix derive their basis
//! vectors from the same `basis` routine so the two cannot desynchronize.

use glam::{Mat4, Vec3, Vec4};
use std::f32::consts::FRAC_PI_2;

/// Radians of rotation per pixel of pointer travel.
pub const ROTATE_SENSITIVITY: f32 = 0.005;
/// Pan speed per pixel, scaled by the current radius.
pub const PAN_FACTOR: f32 = 0.0015;
/// Zoom rate per wheel unit, scaled by the current radius.
pub const ZOOM_FACTOR: f32 = 0.01;
pub const ZOOM_SCALE: f32 = 0.1;
/// The radius never drops below this, which also keeps `basis` well defined.
pub const MIN_RADIUS: f32 = 0.1;
/// Pitch stays this far away from the poles to avoid gimbal flip.
pub const PITCH_MARGIN: f32 = 0.01;

pub const FOV_Y: f32 = std::f32::consts::FRAC_PI_4;
pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 1000.0;

const WORLD_UP: Vec3 = Vec3::Y;

#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub radius: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            radius: 5.0,
            pitch: 0.0,
            yaw: 0.0,
        }
    }
}

#[inline]
fn normalize_guarded(v: Vec3) -> Vec3 {
    let len = v.length();
    // Unreachable while the radius floor holds, but division by zero would
    // poison every matrix downstream.
    let len = if len == 0.0 { 1.0 } else { len };
    v / len
}

impl OrbitCamera {
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw -= dx * ROTATE_SENSITIVITY;
        self.pitch -= dy * ROTATE_SENSITIVITY;
        let limit = FRAC_PI_2 - PITCH_MARGIN;
        self.pitch = self.pitch.clamp(-limit, limit);
    }

    pub fn zoom(&mut self, wheel_delta: f32) {
        self.radius += wheel_delta * ZOOM_FACTOR * self.radius * ZOOM_SCALE;
        self.radius = self.radius.max(MIN_RADIUS);
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        let (_, right, up) = self.basis();
        self.target -= (right * dx - up * dy) * (self.radius * PAN_FACTOR);
    }

    pub fn eye(&self) -> Vec3 {
        let dir = Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        );
        self.target + self.radius * dir
    }

    /// Orthonormal camera frame: forward toward the target, right and up
    /// spanning the view plane. Shared by `pan` and `view_matrix`.
    fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let forward = normalize_guarded(self.target - self.eye());
        let right = normalize_guarded(WORLD_UP.cross(forward));
        let up = forward.cross(right);
        (forward, right, up)
    }

    pub fn view_matrix(&self) -> Mat4 {
        let eye = self.eye();
        let (forward, right, up) = self.basis();
        Mat4::from_cols(
            Vec4::new(right.x, up.x, -forward.x, 0.0),
            Vec4::new(right.y, up.y, -forward.y, 0.0),
            Vec4::new(right.z, up.z, -forward.z, 0.0),
            Vec4::new(-right.dot(eye), -up.dot(eye), forward.dot(eye), 1.0),
        )
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(FOV_Y, aspect, NEAR_PLANE, FAR_PLANE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Rotates the camera while dragged.
    Primary,
    /// Pans the target while dragged.
    Secondary,
}

/// Toolkit-neutral pointer input, fed by whatever windowing layer hosts the
/// viewer. Coordinates are in pixels; wheel deltas are pixel-like units with
/// positive values zooming out.
#[derive(Debug, Clone, Copy)]
pub enum PointerEvent {
    Pressed { button: PointerButton, x: f32, y: f32 },
    Moved { x: f32, y: f32 },
    Released { button: PointerButton },
    Wheel { delta: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragMode {
    Rotate,
    Pan,
}

/// Translates raw pointer events into orbit camera mutations.
#[derive(Debug, Default)]
pub struct CameraController {
    drag: Option<DragMode>,
    last_x: f32,
    last_y: f32,
}

impl CameraController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, event: PointerEvent, camera: &mut OrbitCamera) {
        match event {
            PointerEvent::Pressed { button, x, y } => {
                self.drag = Some(match button {
                    PointerButton::Primary => DragMode::Rotate,
                    PointerButton::Secondary => DragMode::Pan,
                });
                self.last_x = x;
                self.last_y = y;
            }
            PointerEvent::Moved { x, y } => {
                let dx = x - self.last_x;
                let dy = y - self.last_y;
                self.last_x = x;
                self.last_y = y;
                match self.drag {
                    Some(DragMode::Rotate) => camera.rotate(dx, dy),
                    Some(DragMode::Pan) => camera.pan(dx, dy),
                    None => {}
                }
            }
            PointerEvent::Released { button } => {
                let released = match button {
                    PointerButton::Primary => DragMode::Rotate,
                    PointerButton::Secondary => DragMode::Pan,
                };
                if self.drag == Some(released) {
                    self.drag = None;
                }
            }
            PointerEvent::Wheel { delta } => camera.zoom(delta),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eye_lies_on_the_orbit_sphere() {
        let camera = OrbitCamera::default();
        assert!((camera.eye() - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-6);

        let tilted = OrbitCamera {
            pitch: FRAC_PI_2 - PITCH_MARGIN,
            ..OrbitCamera::default()
        };
        assert!(((tilted.eye() - tilted.target).length() - tilted.radius).abs() < 1e-5);
    }

    #[test]
    fn pitch_saturates_at_the_clamp_limit() {
        let mut camera = OrbitCamera::default();
        camera.rotate(0.0, 1000.0);
        let limit = FRAC_PI_2 - PITCH_MARGIN;
        assert!((camera.pitch.abs() - limit).abs() < 1e-6);

        let saturated = camera.pitch;
        camera.rotate(0.0, 1000.0);
        assert_eq!(camera.pitch, saturated);
    }

    #[test]
    fn yaw_is_unclamped() {
        let mut camera = OrbitCamera::default();
        camera.rotate(10_000.0, 0.0);
        assert!(camera.yaw < -std::f32::consts::TAU);
    }

    #[test]
    fn zoom_floors_the_radius() {
        let mut camera = OrbitCamera::default();
        camera.zoom(-1.0e9);
        assert_eq!(camera.radius, MIN_RADIUS);
        assert!(camera.radius > 0.0);
    }

    #[test]
    fn zoom_rate_scales_with_radius() {
        let mut near = OrbitCamera {
            radius: 1.0,
            ..OrbitCamera::default()
        };
        let mut far = OrbitCamera {
            radius: 100.0,
            ..OrbitCamera::default()
        };
        near.zoom(100.0);
        far.zoom(100.0);
        assert!((far.radius - 100.0) > (near.radius - 1.0) * 50.0);
    }

    #[test]
    fn pan_round_trips() {
        let mut camera = OrbitCamera {
            pitch: 0.4,
            yaw: 1.3,
            ..OrbitCamera::default()
        };
        let original = camera.target;
        camera.pan(37.0, -12.0);
        assert!((camera.target - original).length() > 0.0);
        camera.pan(-37.0, 12.0);
        assert!((camera.target - original).length() < 1e-4);
    }

    #[test]
    fn view_matrix_sends_eye_to_origin_and_target_down_the_axis() {
        let camera = OrbitCamera {
            target: Vec3::new(1.0, 2.0, 3.0),
            radius: 7.0,
            pitch: 0.5,
            yaw: -1.1,
        };
        let view = camera.view_matrix();

        let eye = view * camera.eye().extend(1.0);
        assert!(eye.truncate().length() < 1e-4);

        let target = view * camera.target.extend(1.0);
        assert!((target.x.abs()) < 1e-4);
        assert!((target.y.abs()) < 1e-4);
        assert!((target.z + camera.radius).abs() < 1e-4);
    }

    #[test]
    fn primary_drag_rotates() {
        let mut camera = OrbitCamera::default();
        let mut controller = CameraController::new();
        controller.handle(
            PointerEvent::Pressed {
                button: PointerButton::Primary,
                x: 10.0,
                y: 10.0,
            },
            &mut camera,
        );
        controller.handle(PointerEvent::Moved { x: 30.0, y: 10.0 }, &mut camera);
        assert!((camera.yaw + 20.0 * ROTATE_SENSITIVITY).abs() < 1e-6);
        assert_eq!(camera.target, Vec3::ZERO);
    }

    #[test]
    fn secondary_drag_pans() {
        let mut camera = OrbitCamera::default();
        let mut controller = CameraController::new();
        controller.handle(
            PointerEvent::Pressed {
                button: PointerButton::Secondary,
                x: 0.0,
                y: 0.0,
            },
            &mut camera,
        );
        controller.handle(PointerEvent::Moved { x: 15.0, y: -5.0 }, &mut camera);
        assert!(camera.target.length() > 0.0);
        assert_eq!(camera.yaw, 0.0);
        assert_eq!(camera.pitch, 0.0);
    }

    #[test]
    fn movement_without_a_drag_is_ignored() {
        let mut camera = OrbitCamera::default();
        let mut controller = CameraController::new();
        controller.handle(PointerEvent::Moved { x: 100.0, y: 100.0 }, &mut camera);
        controller.handle(
            PointerEvent::Released {
                button: PointerButton::Primary,
            },
            &mut camera,
        );
        assert_eq!(camera.yaw, 0.0);
        assert_eq!(camera.target, Vec3::ZERO);
    }
}
