//! The snow scene: a textured planet above a displaced, transparent snow floor,
//! lit by a soft ambient light and a directional moon light.
//!
//! [`SceneDescriptor::for_variant`] describes everything without touching the
//! GPU. [`SnowScene`] uploads a descriptor once and is then driven as a
//! [`GraphicsFlow`]: it spins the planet, keeps the light uniform and gizmo in
//! sync and draws the light [`DebugPanel`].

use std::f64::consts::TAU;
use std::time::Duration;

use cgmath::{Deg, Point3, Vector3};
use winit::{
    event::{ElementState, KeyEvent, WindowEvent},
    keyboard::Key,
};

use crate::{
    camera::{Camera, Projection},
    context::{Context, InitContext},
    data_structures::{
        geometry::GeometryDescriptor,
        light::{Light, parse_hex_color},
        material::{DefaultTextures, MaterialChannel, SurfaceMaterial},
        scene_graph::{MeshNode, Scene},
        texture::{Sampling, WrapMode},
        transform::Transform,
    },
    debug_panel::DebugPanel,
    flow::{FlowConstructor, GraphicsFlow},
    pipelines::helper::LightHelper,
    render::{Lines, Render},
    resources::texture::{TextureRequest, TextureSet},
};

pub const PLANET: &str = "planet";
pub const FLOOR: &str = "floor";
pub const MOONLIGHT: &str = "#d1ebfe";
pub const HELPER_SIZE: f32 = 5.0;
pub const PANEL_TITLE: &str = "Lights";

/// The two scene layouts. They differ in snow tiling, planet placement and far plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SceneVariant {
    /// Untiled snow, planet close behind the floor.
    #[default]
    Overlook,
    /// Snow tiled 4x4, planet twice as far away.
    Tiled,
}

/// Constant angular velocity around the Y axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spin {
    /// Radians per second.
    pub speed: f32,
}

impl Spin {
    pub const PLANET: Spin = Spin { speed: 0.5 };

    /// Rotation after `elapsed`, wrapped into `[0, 2PI)`.
    pub fn angle(&self, elapsed: Duration) -> f32 {
        (self.speed as f64 * elapsed.as_secs_f64()).rem_euclid(TAU) as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSetup {
    pub fovy: Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
    pub position: Point3<f32>,
    pub target: Point3<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshDescriptor {
    pub name: String,
    pub geometry: GeometryDescriptor,
    /// Material channel to texture name.
    pub channels: Vec<(MaterialChannel, String)>,
    pub displacement_scale: f32,
    pub transparent: bool,
    pub transform: Transform,
}

/// GPU-free description of a whole scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneDescriptor {
    pub variant: SceneVariant,
    pub textures: Vec<TextureRequest>,
    /// Sampling overrides applied right after loading, by texture name.
    pub sampling: Vec<(String, Sampling)>,
    pub meshes: Vec<MeshDescriptor>,
    pub lights: Vec<Light>,
    pub camera: CameraSetup,
}

const SNOW_TEXTURES: [(&str, &str, MaterialChannel); 6] = [
    ("snowColor", "textures/snow/color.jpg", MaterialChannel::Color),
    ("snowAlpha", "textures/snow/alpha.jpg", MaterialChannel::Alpha),
    ("snowHeight", "textures/snow/height.jpg", MaterialChannel::Displacement),
    ("snowNormal", "textures/snow/normal.jpg", MaterialChannel::Normal),
    (
        "snowAmbientOcclusion",
        "textures/snow/ambientOcclusion.jpg",
        MaterialChannel::AmbientOcclusion,
    ),
    ("snowRoughness", "textures/snow/roughness.jpg", MaterialChannel::Roughness),
];

impl SceneDescriptor {
    pub fn for_variant(variant: SceneVariant) -> Self {
        let (planet_position, zfar) = match variant {
            SceneVariant::Overlook => (Vector3::new(0.0, 15.0, -90.0), 100.0),
            SceneVariant::Tiled => (Vector3::new(0.0, 30.0, -180.0), 400.0),
        };

        let mut textures = vec![TextureRequest::new(
            "planetColor",
            "textures/snow/neptune.jpg",
            MaterialChannel::Color,
        )];
        textures.extend(
            SNOW_TEXTURES
                .iter()
                .map(|(name, path, channel)| TextureRequest::new(name, path, *channel)),
        );

        let sampling = match variant {
            SceneVariant::Overlook => Vec::new(),
            SceneVariant::Tiled => SNOW_TEXTURES
                .iter()
                .map(|(name, _, _)| {
                    (
                        name.to_string(),
                        Sampling {
                            repeat: (4.0, 4.0).into(),
                            wrap: WrapMode::Repeat,
                        },
                    )
                })
                .collect(),
        };

        let planet = MeshDescriptor {
            name: PLANET.to_string(),
            geometry: GeometryDescriptor::sphere(40.0, 80, 80),
            channels: vec![(MaterialChannel::Color, "planetColor".to_string())],
            displacement_scale: 1.0,
            transparent: false,
            transform: Transform::at(planet_position.x, planet_position.y, planet_position.z),
        };
        let floor = MeshDescriptor {
            name: FLOOR.to_string(),
            geometry: GeometryDescriptor::plane(10.0, 10.0, 80, 80).with_duplicated_uv(),
            channels: SNOW_TEXTURES
                .iter()
                .map(|(name, _, channel)| (*channel, name.to_string()))
                .collect(),
            displacement_scale: 0.05,
            transparent: true,
            transform: Transform::new().rotated(-std::f32::consts::FRAC_PI_2, 0.0, 0.0),
        };

        let moonlight = parse_hex_color(MOONLIGHT).unwrap_or([1.0; 3]);
        let lights = vec![
            Light::ambient(moonlight, 0.5),
            Light::directional(moonlight, 1.0, Vector3::new(0.0, 5.0, 3.648)).with_shadow(true),
        ];

        Self {
            variant,
            textures,
            sampling,
            meshes: vec![planet, floor],
            lights,
            camera: CameraSetup {
                fovy: Deg(65.0),
                znear: 0.1,
                zfar,
                position: Point3::new(0.0, 0.2, 3.5),
                target: Point3::new(0.0, 0.0, 0.0),
            },
        }
    }

    pub fn mesh(&self, name: &str) -> Option<&MeshDescriptor> {
        self.meshes.iter().find(|m| m.name == name)
    }
}

/// Sliders for the ambient intensity and the moon's intensity and position.
///
/// `ambient` and `moon` are indices into the light list the panel is applied to.
pub fn light_panel(ambient: usize, moon: usize) -> DebugPanel<[Light]> {
    let mut panel: DebugPanel<[Light]> = DebugPanel::new();
    panel.add(
        "ambient intensity",
        0.0,
        1.0,
        0.001,
        move |lights: &[Light]| lights.get(ambient).map_or(0.0, Light::intensity),
        move |lights: &mut [Light], v| {
            if let Some(light) = lights.get_mut(ambient) {
                light.set_intensity(v);
            }
        },
    );
    panel.add(
        "moon intensity",
        0.0,
        1.0,
        0.001,
        move |lights: &[Light]| lights.get(moon).map_or(0.0, Light::intensity),
        move |lights: &mut [Light], v| {
            if let Some(light) = lights.get_mut(moon) {
                light.set_intensity(v);
            }
        },
    );
    for (axis, label) in ["moon x", "moon y", "moon z"].into_iter().enumerate() {
        panel.add(
            label,
            -5.0,
            5.0,
            0.001,
            move |lights: &[Light]| {
                lights
                    .get(moon)
                    .and_then(Light::position)
                    .map_or(0.0, |p| p[axis])
            },
            move |lights: &mut [Light], v| {
                if let Some(position) = lights.get_mut(moon).and_then(Light::position_mut) {
                    position[axis] = v;
                }
            },
        );
    }
    panel
}

/// The uploaded scene plus its per-frame behaviour.
#[derive(Debug)]
pub struct SnowScene {
    scene: Scene,
    textures: TextureSet,
    defaults: DefaultTextures,
    material_layout: wgpu::BindGroupLayout,
    camera: CameraSetup,
    panel: DebugPanel<[Light]>,
    helper: LightHelper,
    planet: Option<usize>,
    spin: Spin,
}

impl SnowScene {
    pub async fn new(init: InitContext, descriptor: SceneDescriptor) -> Self {
        log::info!("building the {:?} scene", descriptor.variant);
        let textures =
            TextureSet::load(&init.device, &init.queue, &init.assets_dir, &descriptor.textures).await;
        for (name, sampling) in &descriptor.sampling {
            match textures.get(name) {
                Some(texture) => {
                    texture.set_repeat(sampling.repeat.x, sampling.repeat.y);
                    texture.set_wrap(sampling.wrap);
                }
                None => log::warn!("no texture '{}' to change sampling of", name),
            }
        }

        let defaults = DefaultTextures::new(&init.device, &init.queue);
        let mut scene = Scene::new();
        let mut planet = None;
        for mesh in &descriptor.meshes {
            let mut material = SurfaceMaterial {
                displacement_scale: mesh.displacement_scale,
                transparent: mesh.transparent,
                ..Default::default()
            };
            for (channel, texture_name) in &mesh.channels {
                match textures.get(texture_name) {
                    Some(texture) => material = material.with(*channel, texture),
                    None => log::warn!("{}: unknown texture '{}'", mesh.name, texture_name),
                }
            }
            let node = MeshNode::new(
                &init.device,
                &init.material_layout,
                &defaults,
                &mesh.name,
                mesh.geometry,
                material,
                mesh.transform,
            );
            let idx = scene.add_mesh(node);
            if mesh.name == PLANET {
                planet = Some(idx);
            }
        }

        let mut ambient = None;
        let mut moon = None;
        for light in &descriptor.lights {
            let idx = scene.add_light(*light);
            match light {
                Light::Ambient { .. } => ambient = ambient.or(Some(idx)),
                Light::Directional { .. } => moon = moon.or(Some(idx)),
            }
        }
        let panel = match (ambient, moon) {
            (Some(ambient), Some(moon)) => light_panel(ambient, moon),
            _ => {
                log::warn!("scene lacks an ambient or directional light, debug panel disabled");
                DebugPanel::new()
            }
        };

        Self {
            scene,
            textures,
            defaults,
            material_layout: init.material_layout,
            camera: descriptor.camera,
            panel,
            helper: LightHelper::new(&init.device, HELPER_SIZE),
            planet,
            spin: Spin::PLANET,
        }
    }

    /// Constructor for [`crate::flow::run`] that builds the given variant.
    pub fn constructor(variant: SceneVariant) -> FlowConstructor {
        Box::new(move |init| {
            Box::pin(async move {
                let scene = SnowScene::new(init, SceneDescriptor::for_variant(variant)).await;
                Box::new(scene) as Box<dyn GraphicsFlow>
            })
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn textures(&self) -> &TextureSet {
        &self.textures
    }

    pub fn panel(&self) -> &DebugPanel<[Light]> {
        &self.panel
    }

    pub fn helper_visible(&self) -> bool {
        self.helper.visible
    }

    fn handle_key(&mut self, event: &KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        if let Key::Character(c) = &event.logical_key {
            if c.eq_ignore_ascii_case("h") {
                self.toggle_helper();
            }
        }
    }

    fn toggle_helper(&mut self) {
        self.helper.visible = !self.helper.visible;
        log::info!("light helper {}", if self.helper.visible { "shown" } else { "hidden" });
    }
}

impl GraphicsFlow for SnowScene {
    fn on_init(&mut self, ctx: &mut Context) {
        ctx.camera.camera = Camera::new(self.camera.position, self.camera.target);
        ctx.projection = Projection::new(
            ctx.viewport.width,
            ctx.viewport.height,
            self.camera.fovy,
            self.camera.znear,
            self.camera.zfar,
        );
        ctx.light.write_to_buffer(&ctx.queue, self.scene.lights());
        self.helper.update(&ctx.queue, self.scene.lights());
    }

    fn on_update(&mut self, ctx: &mut Context, elapsed: Duration, _dt: Duration) {
        if let Some(planet) = self.planet.and_then(|idx| self.scene.mesh_mut(idx)) {
            planet.transform.rotation.y = self.spin.angle(elapsed);
        }
        self.scene
            .write_to_buffers(&ctx.device, &ctx.queue, &self.material_layout, &self.defaults);
        ctx.light.write_to_buffer(&ctx.queue, self.scene.lights());
        self.helper.update(&ctx.queue, self.scene.lights());
    }

    fn on_window_events(&mut self, _ctx: &Context, event: &WindowEvent) {
        if let WindowEvent::KeyboardInput { event, .. } = event {
            self.handle_key(event);
        }
    }

    fn on_render(&self) -> Render<'_> {
        let mut renders = vec![self.scene.get_render()];
        if self.helper.visible {
            renders.push(Render::Lines(Lines {
                vertex: &self.helper.buffer,
                amount: self.helper.num_vertices(),
            }));
        }
        Render::Composed(renders)
    }

    fn on_gui(&mut self, gui: &egui::Context) {
        self.panel.show(gui, PANEL_TITLE, self.scene.lights_mut());
    }
}
