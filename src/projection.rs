//! World-space to screen-space projection against the game camera.

use crate::world::types::{CameraPose, Vec3};

/// Points this far past the screen edge still project, so labels can slide
/// off smoothly instead of popping.
const EDGE_MARGIN: f64 = 200.0;
/// Forward distances below this are behind or inside the camera.
const MIN_FORWARD: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPos {
    pub x: f64,
    pub y: f64,
}

/// Direct vector projection. Coordinate system is X forward, Y right, Z up;
/// yaw rotates around Z, pitch around Y; the camera field of view is
/// horizontal, in degrees.
#[derive(Debug, Clone)]
pub struct Projector {
    screen_w: f64,
    screen_h: f64,
    camera: CameraPose,
}

impl Projector {
    pub fn new(screen_w: u32, screen_h: u32) -> Self {
        Self { screen_w: screen_w as f64, screen_h: screen_h as f64, camera: CameraPose::default() }
    }

    /// Adopts a new camera pose; insane poses are rejected so a torn read
    /// never produces one frame of garbage markers.
    pub fn set_camera(&mut self, pose: CameraPose) -> bool {
        if !pose.fov_is_sane() {
            return false;
        }
        self.camera = pose;
        true
    }

    pub fn set_screen_size(&mut self, width: u32, height: u32) {
        self.screen_w = width as f64;
        self.screen_h = height as f64;
    }

    pub fn camera_position(&self) -> Vec3 {
        self.camera.location
    }

    /// Screen position for a world point, or `None` when it is behind the
    /// camera or far outside the screen margin.
    pub fn project(&self, world: &Vec3) -> Option<ScreenPos> {
        let pitch = self.camera.rotation.pitch.to_radians();
        let yaw = self.camera.rotation.yaw.to_radians();

        let (sp, cp) = pitch.sin_cos();
        let (sy, cy) = yaw.sin_cos();

        let fwd = Vec3::new(cp * cy, cp * sy, sp);
        let right = Vec3::new(-sy, cy, 0.0);
        let up = Vec3::new(-(sp * cy), -(sp * sy), cp);

        let delta = *world - self.camera.location;
        let dot_fwd = delta.dot(&fwd);
        if dot_fwd < MIN_FORWARD {
            return None;
        }
        let dot_right = delta.dot(&right);
        let dot_up = delta.dot(&up);

        // Horizontal field of view scales both axes; the differing screen
        // center values carry the aspect ratio.
        let tan_half_fov = ((self.camera.fov as f64).to_radians() / 2.0).tan();
        let center_x = self.screen_w / 2.0;
        let center_y = self.screen_h / 2.0;
        let scale = center_x / tan_half_fov;

        let x = center_x + (dot_right / dot_fwd) * scale;
        let y = center_y - (dot_up / dot_fwd) * scale;

        let on_screen = x >= -EDGE_MARGIN
            && x <= self.screen_w + EDGE_MARGIN
            && y >= -EDGE_MARGIN
            && y <= self.screen_h + EDGE_MARGIN;
        on_screen.then_some(ScreenPos { x, y })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::types::Rotator;

    fn camera_at_origin(fov: f32) -> CameraPose {
        CameraPose {
            location: Vec3::default(),
            rotation: Rotator::default(),
            fov,
        }
    }

    #[test]
    fn point_on_the_view_axis_lands_at_screen_center() {
        let mut p = Projector::new(1920, 1080);
        assert!(p.set_camera(camera_at_origin(90.0)));

        let pos = p.project(&Vec3::new(1000.0, 0.0, 0.0)).unwrap();
        assert!((pos.x - 960.0).abs() < 0.01);
        assert!((pos.y - 540.0).abs() < 0.01);
    }

    #[test]
    fn points_behind_the_camera_do_not_project() {
        let mut p = Projector::new(1920, 1080);
        assert!(p.set_camera(camera_at_origin(90.0)));
        assert!(p.project(&Vec3::new(-1000.0, 0.0, 0.0)).is_none());
        assert!(p.project(&Vec3::default()).is_none());
    }

    #[test]
    fn right_of_camera_lands_right_of_center() {
        let mut p = Projector::new(1920, 1080);
        assert!(p.set_camera(camera_at_origin(90.0)));

        // With a 90 degree horizontal fov, 45 degrees right is the screen edge
        let pos = p.project(&Vec3::new(1000.0, 1000.0, 0.0)).unwrap();
        assert!((pos.x - 1920.0).abs() < 0.01);
        assert!((pos.y - 540.0).abs() < 0.01);

        let above = p.project(&Vec3::new(1000.0, 0.0, 200.0)).unwrap();
        assert!(above.y < 540.0);
    }

    #[test]
    fn far_off_screen_points_are_culled() {
        let mut p = Projector::new(1920, 1080);
        assert!(p.set_camera(camera_at_origin(90.0)));
        // Nearly perpendicular to the view axis: forward stays positive but
        // the projected point is thousands of pixels off screen
        assert!(p.project(&Vec3::new(10.0, 10_000.0, 0.0)).is_none());
    }

    #[test]
    fn insane_fov_is_rejected() {
        let mut p = Projector::new(1920, 1080);
        assert!(!p.set_camera(camera_at_origin(0.0)));
        assert!(!p.set_camera(camera_at_origin(-5.0)));
        assert!(!p.set_camera(camera_at_origin(200.0)));
    }

    #[test]
    fn yawed_camera_still_centers_its_view_axis() {
        let mut p = Projector::new(1920, 1080);
        let pose = CameraPose {
            location: Vec3::new(100.0, 100.0, 0.0),
            rotation: Rotator { pitch: 0.0, yaw: 90.0, roll: 0.0 },
            fov: 100.0,
        };
        assert!(p.set_camera(pose));

        // Looking down +Y now
        let pos = p.project(&Vec3::new(100.0, 2000.0, 0.0)).unwrap();
        assert!((pos.x - 960.0).abs() < 0.01);
        assert!((pos.y - 540.0).abs() < 0.01);
    }
}
