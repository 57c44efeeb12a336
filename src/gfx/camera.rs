use glam::{Mat4, Quat, Vec2, Vec3};
use std::f32::consts::FRAC_PI_2;

const ORBIT_TARGET: Vec3 = Vec3::new(0.0, 1.0, 0.0);
const ORBIT_INITIAL_RADIUS: f32 = 3.0;
const ORBIT_INITIAL_HEIGHT: f32 = 1.0;
const ORBIT_INITIAL_AZIMUTH: f32 = FRAC_PI_2;
const ORBIT_MIN_DISTANCE: f32 = 2.0;
const ORBIT_MAX_DISTANCE: f32 = 8.0;
const ORBIT_MIN_POLAR: f32 = 0.0;
const ORBIT_MAX_POLAR: f32 = FRAC_PI_2;
const DAMPING_FACTOR: f32 = 0.05;

const FOV_Y_DEG: f32 = 75.0;
const NEAR: f32 = 0.1;
const FAR: f32 = 100.0;
/// Keeps the polar angle off the pole so `look_at_rh` has a usable up axis.
const POLE_EPSILON: f32 = 1e-4;

/// Radians of orbit per pixel of pointer drag.
const ROTATE_SPEED: f32 = 0.008;
const ZOOM_STEP: f32 = 0.95;

/// A point projected into the viewport. `depth` is the distance along the
/// view direction, so larger means further away.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projected {
    pub pos: Vec2,
    pub depth: f32,
}

/// Damped orbit camera around a fixed target.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    target: Vec3,
    radius: f32,
    polar: f32,
    azimuth: f32,
    delta_polar: f32,
    delta_azimuth: f32,
    zoom: f32,
    viewport: [f32; 2],
}

impl OrbitCamera {
    pub fn new() -> Self {
        let offset = Vec3::new(
            ORBIT_INITIAL_AZIMUTH.sin() * ORBIT_INITIAL_RADIUS,
            ORBIT_INITIAL_HEIGHT,
            ORBIT_INITIAL_AZIMUTH.cos() * ORBIT_INITIAL_RADIUS,
        );
        let radius = offset.length();
        Self {
            target: ORBIT_TARGET,
            radius: radius.clamp(ORBIT_MIN_DISTANCE, ORBIT_MAX_DISTANCE),
            polar: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            azimuth: offset.x.atan2(offset.z),
            delta_polar: 0.0,
            delta_azimuth: 0.0,
            zoom: 1.0,
            viewport: [800.0, 600.0],
        }
    }

    pub fn set_viewport(&mut self, size: [f32; 2]) {
        self.viewport = size;
    }

    pub fn viewport(&self) -> [f32; 2] {
        self.viewport
    }

    pub fn position(&self) -> Vec3 {
        let sin_polar = self.polar.sin();
        self.target
            + Vec3::new(
                self.radius * sin_polar * self.azimuth.sin(),
                self.radius * self.polar.cos(),
                self.radius * sin_polar * self.azimuth.cos(),
            )
    }

    pub fn distance(&self) -> f32 {
        self.radius
    }

    pub fn polar(&self) -> f32 {
        self.polar
    }

    /// Unit vector the camera looks along.
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position()).normalize()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    fn aspect(&self) -> f32 {
        self.viewport[0] / self.viewport[1].max(1.0)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(FOV_Y_DEG.to_radians(), self.aspect(), NEAR, FAR)
    }

    /// Camera orientation with the camera looking down its local -Z axis.
    pub fn quaternion(&self) -> Quat {
        Quat::from_mat4(&self.view_matrix().inverse())
    }

    pub fn project(&self, p: Vec3) -> Option<Projected> {
        let eye = self.view_matrix().transform_point3(p);
        let depth = -eye.z;
        if depth < NEAR {
            return None;
        }
        let ndc = self.projection_matrix().project_point3(eye);
        Some(Projected {
            pos: Vec2::new(
                (ndc.x + 1.0) * 0.5 * self.viewport[0],
                (1.0 - ndc.y) * 0.5 * self.viewport[1],
            ),
            depth,
        })
    }

    /// World-space direction through a viewport pixel.
    pub fn ray_direction(&self, pixel: Vec2) -> Vec3 {
        let ndc_x = pixel.x / self.viewport[0] * 2.0 - 1.0;
        let ndc_y = 1.0 - pixel.y / self.viewport[1] * 2.0;
        let tan = (FOV_Y_DEG.to_radians() * 0.5).tan();
        let eye_dir = Vec3::new(ndc_x * tan * self.aspect(), ndc_y * tan, -1.0);
        self.view_matrix().inverse().transform_vector3(eye_dir).normalize()
    }

    pub fn rotate_by_pixels(&mut self, dx: f32, dy: f32) {
        self.delta_azimuth -= dx * ROTATE_SPEED;
        self.delta_polar -= dy * ROTATE_SPEED;
    }

    /// Positive steps zoom in.
    pub fn zoom_by(&mut self, steps: f32) {
        self.zoom *= ZOOM_STEP.powf(steps);
    }

    /// Applies pending input with damping, the way a per-frame controls
    /// update does.
    pub fn update(&mut self) {
        self.azimuth += self.delta_azimuth * DAMPING_FACTOR;
        self.polar = (self.polar + self.delta_polar * DAMPING_FACTOR)
            .clamp(ORBIT_MIN_POLAR.max(POLE_EPSILON), ORBIT_MAX_POLAR);
        self.radius = (self.radius * self.zoom).clamp(ORBIT_MIN_DISTANCE, ORBIT_MAX_DISTANCE);

        self.delta_azimuth *= 1.0 - DAMPING_FACTOR;
        self.delta_polar *= 1.0 - DAMPING_FACTOR;
        self.zoom = 1.0;
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_pose_looks_at_target() {
        let cam = OrbitCamera::new();
        let pos = cam.position();
        assert!((pos - Vec3::new(3.0, 2.0, 0.0)).length() < 1e-4);

        let centre = cam.project(ORBIT_TARGET).unwrap();
        assert!((centre.pos.x - 400.0).abs() < 1e-2);
        assert!((centre.pos.y - 300.0).abs() < 1e-2);
    }

    #[test]
    fn points_behind_camera_are_culled() {
        let cam = OrbitCamera::new();
        assert!(cam.project(Vec3::new(10.0, 2.0, 0.0)).is_none());
    }

    #[test]
    fn quaternion_points_negative_z_along_forward() {
        let cam = OrbitCamera::new();
        let looking = cam.quaternion() * Vec3::NEG_Z;
        assert!((looking - cam.forward()).length() < 1e-4);
    }

    #[test]
    fn ray_through_projected_point_hits_it() {
        let cam = OrbitCamera::new();
        let p = Vec3::new(0.5, 0.8, -0.7);
        let px = cam.project(p).unwrap();
        let dir = cam.ray_direction(px.pos);
        let expected = (p - cam.position()).normalize();
        assert!((dir - expected).length() < 1e-3);
    }

    #[test]
    fn zoom_and_polar_respect_limits() {
        let mut cam = OrbitCamera::new();
        for _ in 0..200 {
            cam.zoom_by(5.0);
            cam.rotate_by_pixels(0.0, 500.0);
            cam.update();
        }
        assert!((cam.distance() - ORBIT_MIN_DISTANCE).abs() < 1e-4);
        assert!(cam.polar() >= ORBIT_MIN_POLAR);

        for _ in 0..200 {
            cam.zoom_by(-5.0);
            cam.rotate_by_pixels(0.0, -500.0);
            cam.update();
        }
        assert!((cam.distance() - ORBIT_MAX_DISTANCE).abs() < 1e-4);
        assert!(cam.polar() <= ORBIT_MAX_POLAR + 1e-6);
    }
}
