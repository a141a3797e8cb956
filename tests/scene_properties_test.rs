use std::time::Duration;

use cgmath::{Deg, EuclideanSpace, InnerSpace};
use snowscape::{
    camera::{Camera, OrbitController, Projection},
    context::Viewport,
    data_structures::light::Light,
    scene::{SceneDescriptor, SceneVariant, Spin, light_panel},
};

#[test]
fn aspect_is_width_over_height_for_every_resize() {
    let mut projection = Projection::new(800, 600, Deg(65.0), 0.1, 100.0);
    for (w, h) in [(1, 1), (1920, 1080), (1080, 1920), (3840, 1600), (7, 3), (640, 480)] {
        let viewport = Viewport::fit(w, h, 1.25);
        projection.resize(viewport.width, viewport.height);
        let expected = w as f32 / h as f32;
        assert!((projection.aspect() - expected).abs() < 1e-6);
        assert!((viewport.aspect - expected).abs() < 1e-6);
    }
}

#[test]
fn full_hd_window_has_a_sixteen_by_nine_camera() {
    let mut projection = Projection::new(1, 1, Deg(65.0), 0.1, 100.0);
    let viewport = Viewport::fit(1920, 1080, 1.0);
    projection.resize(viewport.width, viewport.height);
    assert_eq!(format!("{:.4}", projection.aspect()), "1.7778");
}

#[test]
fn resizing_twice_to_the_same_size_changes_nothing() {
    let mut projection = Projection::new(1, 1, Deg(65.0), 0.1, 100.0);
    let first = Viewport::fit(1366, 768, 2.5);
    projection.resize(first.width, first.height);
    let aspect = projection.aspect();

    let second = Viewport::fit(1366, 768, 2.5);
    projection.resize(second.width, second.height);
    assert_eq!(first, second);
    assert_eq!(projection.aspect(), aspect);
}

#[test]
fn planet_turns_half_a_radian_per_second() {
    assert_eq!(Spin::PLANET.angle(Duration::from_secs(2)), 1.0);
    for millis in [0u64, 16, 1_000, 12_566, 60_000, 3_600_000] {
        let t = Duration::from_millis(millis);
        let expected = (0.5 * t.as_secs_f64()).rem_euclid(std::f64::consts::TAU) as f32;
        assert!((Spin::PLANET.angle(t) - expected).abs() < 1e-5);
    }
}

#[test]
fn light_panel_clamps_into_slider_ranges() {
    let descriptor = SceneDescriptor::for_variant(SceneVariant::Tiled);
    let mut lights: Vec<Light> = descriptor.lights.clone();
    let panel = light_panel(0, 1);

    for idx in 0..panel.len() {
        let slider = panel.slider(idx).unwrap();
        for v in [-10.0, -5.0, -0.5, 0.0, 0.123, 1.0, 4.999, 10.0] {
            panel.set(idx, &mut lights, v);
            assert_eq!(panel.get(idx, &lights), Some(v.clamp(slider.min, slider.max)));
        }
    }
    assert!(matches!(lights[0], Light::Ambient { .. }));
    assert!(matches!(lights[1], Light::Directional { .. }));
}

#[test]
fn damped_orbit_settles_monotonically() {
    let mut camera = Camera::new((0.0, 0.2, 3.5), (0.0, 0.0, 0.0));
    let start = camera.position;
    let mut controller = OrbitController::new(true, 0.05);
    controller.set_viewport_height(1080);
    controller.handle_drag(-120.0, 0.0);

    let (requested, _) = controller.pending_rotation();
    controller.update(&mut camera);
    let (remaining, _) = controller.pending_rotation();
    assert!((remaining - requested * 0.95).abs() < 1e-6);
    assert_ne!(camera.position, start);

    let mut previous = remaining.abs();
    for _ in 0..200 {
        controller.update(&mut camera);
        let (remaining, _) = controller.pending_rotation();
        assert!(remaining.abs() < previous);
        previous = remaining.abs();
    }
    assert!(previous < 1e-4);
    assert!((camera.distance() - start.to_vec().magnitude()).abs() < 1e-4);
}
