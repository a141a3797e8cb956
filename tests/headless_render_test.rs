#[cfg(feature = "integration-tests")]
mod common;

#[cfg(feature = "integration-tests")]
mod headless {
    use std::path::PathBuf;

    use instant::Duration;
    use snowscape::{
        config::AppConfig,
        context::InitContext,
        data_structures::{material::MaterialChannel, texture::WrapMode},
        flow::GraphicsFlow,
        render::Render,
        scene::{FLOOR, SceneDescriptor, SceneVariant, SnowScene},
    };

    use crate::common::test_utils::{headless, render_to_image, rgba8};

    #[tokio::test]
    async fn should_render_clear_colour() {
        let mut ctx = headless(64, 64).await;
        ctx.clear_colour = wgpu::Color::WHITE;

        let img = render_to_image(&ctx, Render::None).await;

        let desired_pixel = rgba8(wgpu::Color::WHITE);
        for pixel in img.pixels() {
            assert_eq!(*pixel, desired_pixel);
        }
    }

    #[tokio::test]
    async fn should_render_the_scene_without_assets() {
        let mut ctx = headless(256, 256).await;
        // No textures at this path: every channel falls back to its placeholder.
        let config = AppConfig::default().with_assets_dir(PathBuf::from("./no-such-assets"));
        let descriptor = SceneDescriptor::for_variant(SceneVariant::Overlook);
        let mut scene = SnowScene::new(InitContext::new(&ctx, &config), descriptor).await;
        assert!(scene.textures().iter().all(|(_, t)| t.is_placeholder()));
        assert!(scene.helper_visible());
        assert_eq!(scene.panel().len(), 5);

        scene.on_init(&mut ctx);
        scene.on_update(&mut ctx, Duration::from_secs(2), Duration::from_millis(16));
        ctx.camera.write_to_buffer(&ctx.queue, &ctx.projection);
        assert_eq!(format!("{:.4}", ctx.projection.aspect()), "1.0000");

        let img = render_to_image(&ctx, scene.on_render()).await;

        let clear = rgba8(ctx.clear_colour);
        // The sky above and left of the planet stays clear.
        assert_eq!(*img.get_pixel(0, 0), clear);
        // The floor fills the bottom of the view.
        assert_ne!(*img.get_pixel(128, 250), clear);
    }

    #[tokio::test]
    async fn light_panel_draws_over_the_scene_lights() {
        let ctx = headless(64, 64).await;
        let config = AppConfig::default().with_assets_dir(PathBuf::from("./no-such-assets"));
        let descriptor = SceneDescriptor::for_variant(SceneVariant::Overlook);
        let mut scene = SnowScene::new(InitContext::new(&ctx, &config), descriptor).await;
        let before = scene.scene().lights().to_vec();

        let gui = egui::Context::default();
        for _ in 0..2 {
            let _ = gui.run(egui::RawInput::default(), |gui| scene.on_gui(gui));
        }
        assert_eq!(scene.scene().lights(), &before[..]);

        let panel = scene.panel();
        assert_eq!(panel.get(0, scene.scene().lights()), Some(0.5));
        assert_eq!(panel.get(4, scene.scene().lights()), Some(3.648));
    }

    #[tokio::test]
    async fn tiled_variant_repeats_the_snow_maps() {
        let mut ctx = headless(64, 64).await;
        let config = AppConfig::default().with_assets_dir(PathBuf::from("./no-such-assets"));
        let descriptor = SceneDescriptor::for_variant(SceneVariant::Tiled);
        let mut scene = SnowScene::new(InitContext::new(&ctx, &config), descriptor).await;

        let snow = scene.textures().get("snowColor").unwrap();
        assert_eq!(snow.repeat(), cgmath::Vector2::new(4.0, 4.0));
        assert_eq!(snow.wrap(), WrapMode::Repeat);
        let planet = scene.textures().get("planetColor").unwrap();
        assert_eq!(planet.wrap(), WrapMode::Clamp);

        // Sampling changes made after upload reach the material on the next update.
        snow.set_repeat(2.0, 8.0);
        snow.set_wrap(WrapMode::Clamp);
        scene.on_init(&mut ctx);
        scene.on_update(&mut ctx, Duration::ZERO, Duration::ZERO);
        let floor = scene.scene().meshes().iter().find(|m| m.name == FLOOR).unwrap();
        assert_eq!(floor.material.to_uniform().uv_repeat[..2], [2.0, 8.0]);
        assert_eq!(floor.material.wraps()[MaterialChannel::Color.index()], WrapMode::Clamp);
    }
}
