//! Perspective camera, orbit controller and the camera uniform.
//!
//! The [`Camera`] is a position looking at an orbit target. [`Projection`]
//! keeps the lens parameters and must be resized together with the surface.
//! [`OrbitController`] turns pointer drags and scroll input into spherical
//! moves of the camera around its target, optionally smoothed by exponential
//! damping.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Keeps the polar angle away from the poles where `look_at` degenerates.
const POLAR_EPSILON: f32 = 0.000_001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>, T: Into<Point3<f32>>>(position: P, target: T) -> Self {
        Self {
            position: position.into(),
            target: target.into(),
        }
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, Vector3::unit_y())
    }

    pub fn distance(&self) -> f32 {
        (self.position - self.target).magnitude()
    }
}

/// Lens parameters. The aspect ratio follows the viewport, everything else is fixed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    /// Recompute the aspect ratio. Zero-sized viewports (minimized windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn fovy(&self) -> Rad<f32> {
        self.fovy
    }

    pub fn znear(&self) -> f32 {
        self.znear
    }

    pub fn zfar(&self) -> f32 {
        self.zfar
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Spherical coordinates of a camera offset, Y up.
///
/// `theta` is the azimuth around Y measured from +Z, `phi` the polar angle from +Y.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Spherical {
    pub radius: f32,
    pub theta: f32,
    pub phi: f32,
}

impl Spherical {
    pub fn from_offset(offset: Vector3<f32>) -> Self {
        let radius = offset.magnitude();
        if radius == 0.0 {
            return Self::default();
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    pub fn to_offset(&self) -> Vector3<f32> {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vector3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

/// Drag-to-rotate, scroll-to-zoom camera controller.
///
/// Input handlers only accumulate a pending rotation and a dolly scale. The
/// camera moves in [`update`](Self::update), which with damping enabled applies
/// `damping_factor` of the pending rotation and decays the rest, so the camera
/// keeps gliding for a while after the pointer stops.
#[derive(Debug, Clone)]
pub struct OrbitController {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pending: Spherical,
    scale: f32,
    viewport_height: f32,
    dragging: bool,
    cursor: Option<PhysicalPosition<f64>>,
}

impl Default for OrbitController {
    fn default() -> Self {
        Self {
            enable_damping: false,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            pending: Spherical::default(),
            scale: 1.0,
            viewport_height: 1.0,
            dragging: false,
            cursor: None,
        }
    }
}

impl OrbitController {
    pub fn new(enable_damping: bool, damping_factor: f32) -> Self {
        Self {
            enable_damping,
            damping_factor,
            ..Default::default()
        }
    }

    /// Drag distances are measured relative to the viewport height.
    pub fn set_viewport_height(&mut self, height: u32) {
        self.viewport_height = height.max(1) as f32;
    }

    /// Rotation that has been requested but not yet applied, as `(theta, phi)`.
    pub fn pending_rotation(&self) -> (f32, f32) {
        (self.pending.theta, self.pending.phi)
    }

    /// Feed a pointer drag in physical pixels.
    pub fn handle_drag(&mut self, dx: f64, dy: f64) {
        let turn = 2.0 * PI * self.rotate_speed / self.viewport_height;
        self.pending.theta -= turn * dx as f32;
        self.pending.phi -= turn * dy as f32;
    }

    /// Feed a scroll step. Positive values move the camera toward the target.
    pub fn handle_scroll(&mut self, delta: f32) {
        let zoom_scale = 0.95_f32.powf(self.zoom_speed);
        if delta > 0.0 {
            self.scale *= zoom_scale;
        } else if delta < 0.0 {
            self.scale /= zoom_scale;
        }
    }

    /// Left button state. Pressing arms a drag, releasing ends it.
    pub fn on_button(&mut self, pressed: bool) {
        self.dragging = pressed;
    }

    /// Pointer position in physical pixels. Rotates only while a drag is armed.
    pub fn on_cursor(&mut self, position: PhysicalPosition<f64>) {
        if let (true, Some(last)) = (self.dragging, self.cursor) {
            self.handle_drag(position.x - last.x, position.y - last.y);
        }
        self.cursor = Some(position);
    }

    /// The pointer left the window: the drag ends and the next position starts fresh.
    pub fn on_cursor_left(&mut self) {
        self.dragging = false;
        self.cursor = None;
    }

    pub fn on_wheel(&mut self, delta: MouseScrollDelta) {
        let amount = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(pos) => pos.y as f32,
        };
        self.handle_scroll(amount);
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn handle_window_events(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => self.on_button(*state == ElementState::Pressed),
            WindowEvent::CursorMoved { position, .. } => self.on_cursor(*position),
            WindowEvent::CursorLeft { .. } => self.on_cursor_left(),
            WindowEvent::MouseWheel { delta, .. } => self.on_wheel(*delta),
            _ => (),
        }
    }

    /// Move the camera one step toward the requested orientation and distance.
    pub fn update(&mut self, camera: &mut Camera) {
        let mut spherical = Spherical::from_offset(camera.position - camera.target);
        if spherical.radius == 0.0 {
            return;
        }

        let step = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };
        spherical.theta += self.pending.theta * step;
        spherical.phi += self.pending.phi * step;
        spherical.phi = spherical.phi.clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        spherical.radius = (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        camera.position = camera.target + spherical.to_offset();

        if self.enable_damping {
            self.pending.theta *= 1.0 - self.damping_factor;
            self.pending.phi *= 1.0 - self.damping_factor;
        } else {
            self.pending = Spherical::default();
        }
        self.scale = 1.0;
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Camera state together with the GPU objects that expose it to shaders (group 1).
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: OrbitController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    /// Upload the current view-projection.
    pub fn write_to_buffer(&mut self, queue: &wgpu::Queue, projection: &Projection) {
        self.uniform.update_view_proj(&self.camera, projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Deg;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn aspect_follows_resize() {
        let mut projection = Projection::new(800, 600, Deg(65.0), 0.1, 100.0);
        projection.resize(1920, 1080);
        assert_eq!(projection.aspect(), 1920.0 / 1080.0);
        assert_eq!(format!("{:.4}", projection.aspect()), "1.7778");
        projection.resize(1920, 1080);
        assert_eq!(projection.aspect(), 1920.0 / 1080.0);
    }

    #[test]
    fn zero_sized_resize_keeps_aspect() {
        let mut projection = Projection::new(400, 200, Deg(65.0), 0.1, 100.0);
        projection.resize(0, 300);
        assert_eq!(projection.aspect(), 2.0);
    }

    #[test]
    fn spherical_round_trips_offsets() {
        let offset = Vector3::new(1.0, 2.0, -3.0);
        let back = Spherical::from_offset(offset).to_offset();
        assert!(approx(back.x, offset.x) && approx(back.y, offset.y) && approx(back.z, offset.z));
    }

    #[test]
    fn damped_drag_moves_a_fraction_then_converges() {
        let mut camera = Camera::new((0.0, 0.0, 5.0), (0.0, 0.0, 0.0));
        let mut controller = OrbitController::new(true, 0.05);
        controller.set_viewport_height(1000);
        controller.handle_drag(100.0, 0.0);

        let (requested, _) = controller.pending_rotation();
        let azimuth = |c: &Camera| Spherical::from_offset(c.position - c.target).theta;

        controller.update(&mut camera);
        assert!(approx(azimuth(&camera), requested * 0.05));

        let mut remaining = (requested - azimuth(&camera)).abs();
        for _ in 0..100 {
            controller.update(&mut camera);
            let now = (requested - azimuth(&camera)).abs();
            assert!(now < remaining);
            remaining = now;
        }
        assert!(remaining < requested.abs() * 0.01);
        assert!(approx(camera.distance(), 5.0));
    }

    #[test]
    fn undamped_drag_snaps() {
        let mut camera = Camera::new((0.0, 0.0, 5.0), (0.0, 0.0, 0.0));
        let mut controller = OrbitController::new(false, 0.05);
        controller.set_viewport_height(1000);
        controller.handle_drag(0.0, -50.0);
        let (_, requested) = controller.pending_rotation();
        controller.update(&mut camera);
        let phi = Spherical::from_offset(camera.position - camera.target).phi;
        assert!(approx(phi, PI / 2.0 + requested));
        assert_eq!(controller.pending_rotation(), (0.0, 0.0));
    }

    #[test]
    fn scroll_dollies_within_limits() {
        let mut camera = Camera::new((0.0, 0.0, 4.0), (0.0, 0.0, 0.0));
        let mut controller = OrbitController::default();
        controller.min_distance = 3.9;
        controller.handle_scroll(1.0);
        controller.update(&mut camera);
        assert!(approx(camera.distance(), 3.9));

        controller.handle_scroll(-1.0);
        controller.update(&mut camera);
        assert!(approx(camera.distance(), 3.9 / 0.95));
    }

    #[test]
    fn polar_angle_never_flips_over_the_pole() {
        let mut camera = Camera::new((0.0, 0.0, 5.0), (0.0, 0.0, 0.0));
        let mut controller = OrbitController::default();
        controller.set_viewport_height(100);
        controller.handle_drag(0.0, 10_000.0);
        controller.update(&mut camera);
        assert!(camera.position.y > 0.0);
        assert!(camera.position.z.abs() < 1e-3);
    }

    fn pressed(pressed: bool) -> WindowEvent {
        WindowEvent::MouseInput {
            device_id: winit::event::DeviceId::dummy(),
            state: if pressed {
                ElementState::Pressed
            } else {
                ElementState::Released
            },
            button: MouseButton::Left,
        }
    }

    fn moved(x: f64, y: f64) -> WindowEvent {
        WindowEvent::CursorMoved {
            device_id: winit::event::DeviceId::dummy(),
            position: PhysicalPosition::new(x, y),
        }
    }

    #[test]
    fn cursor_moves_rotate_only_between_press_and_release() {
        let mut controller = OrbitController::default();
        controller.set_viewport_height(1000);

        controller.handle_window_events(&moved(10.0, 10.0));
        controller.handle_window_events(&moved(60.0, 10.0));
        assert_eq!(controller.pending_rotation(), (0.0, 0.0));

        controller.handle_window_events(&pressed(true));
        assert!(controller.is_dragging());
        controller.handle_window_events(&moved(110.0, 10.0));
        let (theta, phi) = controller.pending_rotation();
        assert!(approx(theta, -2.0 * PI * 50.0 / 1000.0));
        assert_eq!(phi, 0.0);

        controller.handle_window_events(&pressed(false));
        controller.handle_window_events(&moved(500.0, 300.0));
        assert_eq!(controller.pending_rotation(), (theta, phi));
    }

    #[test]
    fn leaving_the_window_ends_the_drag() {
        let mut controller = OrbitController::default();
        controller.set_viewport_height(1000);
        controller.on_button(true);
        controller.on_cursor(PhysicalPosition::new(0.0, 0.0));
        controller.handle_window_events(&WindowEvent::CursorLeft {
            device_id: winit::event::DeviceId::dummy(),
        });
        assert!(!controller.is_dragging());

        // re-entering does not jump by the distance travelled outside
        controller.on_cursor(PhysicalPosition::new(400.0, 400.0));
        controller.on_cursor(PhysicalPosition::new(420.0, 400.0));
        assert_eq!(controller.pending_rotation(), (0.0, 0.0));

        // a new press starts from the last seen position
        controller.on_button(true);
        controller.on_cursor(PhysicalPosition::new(430.0, 400.0));
        assert!(approx(controller.pending_rotation().0, -2.0 * PI * 10.0 / 1000.0));
    }

    #[test]
    fn line_and_pixel_wheel_steps_dolly_the_same_way() {
        for delta in [
            MouseScrollDelta::LineDelta(0.0, 1.0),
            MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, 40.0)),
        ] {
            let mut camera = Camera::new((0.0, 0.0, 4.0), (0.0, 0.0, 0.0));
            let mut controller = OrbitController::default();
            controller.handle_window_events(&WindowEvent::MouseWheel {
                device_id: winit::event::DeviceId::dummy(),
                delta,
                phase: winit::event::TouchPhase::Moved,
            });
            controller.update(&mut camera);
            assert!(approx(camera.distance(), 4.0 * 0.95));
        }

        let mut camera = Camera::new((0.0, 0.0, 4.0), (0.0, 0.0, 0.0));
        let mut controller = OrbitController::default();
        controller.on_wheel(MouseScrollDelta::LineDelta(0.0, -2.0));
        controller.update(&mut camera);
        assert!(approx(camera.distance(), 4.0 / 0.95));
    }

    #[test]
    fn other_buttons_do_not_arm_a_drag() {
        let mut controller = OrbitController::default();
        controller.handle_window_events(&WindowEvent::MouseInput {
            device_id: winit::event::DeviceId::dummy(),
            state: ElementState::Pressed,
            button: MouseButton::Right,
        });
        assert!(!controller.is_dragging());
    }
}
