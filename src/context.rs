//! GPU context: device, surface, depth buffer, camera, light and pipelines.
//!
//! A [`Context`] is created once per window (or once offscreen with
//! [`Context::headless`]) and handed to every flow. [`Viewport`] maps window
//! sizes to the surface size and the camera aspect ratio.

use std::{path::PathBuf, sync::Arc};

use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::{Camera, CameraResources, CameraUniform, OrbitController, Projection},
    config::AppConfig,
    data_structures::{material::material_layout, texture::Texture},
    pipelines::{
        basic::mk_basic_pipeline,
        helper::mk_helper_pipeline,
        light::LightResources,
        transparent::mk_transparent_pipeline,
    },
};

/// Device pixel ratios above this are rendered at this ratio in the browser.
pub const MAX_PIXEL_RATIO: f64 = 2.0;

/// The canvas backing store is sized independently of the page, so the web
/// build can render below the device resolution. A native swapchain has to
/// match the window.
#[cfg(target_arch = "wasm32")]
const PIXEL_RATIO_CAP: Option<f64> = Some(MAX_PIXEL_RATIO);
#[cfg(not(target_arch = "wasm32"))]
const PIXEL_RATIO_CAP: Option<f64> = None;

/// Surface size and aspect ratio for one window size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Physical window size.
    pub width: u32,
    pub height: u32,
    /// Width over height of the window.
    pub aspect: f32,
    pub pixel_ratio: f64,
    pub surface_width: u32,
    pub surface_height: u32,
}

impl Viewport {
    /// Fit a window of `width` x `height` physical pixels at `scale_factor`.
    ///
    /// In the browser the surface gets the logical size times
    /// `min(scale_factor, 2)`, so very dense displays are not rendered at full
    /// resolution. Natively the surface is the physical window size.
    pub fn fit(width: u32, height: u32, scale_factor: f64) -> Self {
        Self::fit_with_cap(width, height, scale_factor, PIXEL_RATIO_CAP)
    }

    /// [`Viewport::fit`] with an explicit pixel ratio cap.
    pub fn fit_with_cap(width: u32, height: u32, scale_factor: f64, cap: Option<f64>) -> Self {
        let scale_factor = if scale_factor > 0.0 { scale_factor } else { 1.0 };
        let pixel_ratio = cap.map_or(scale_factor, |cap| scale_factor.min(cap));
        let to_surface = |physical: u32| {
            let logical = physical as f64 / scale_factor;
            ((logical * pixel_ratio).round() as u32).max(1)
        };
        Self {
            width,
            height,
            aspect: width as f32 / height.max(1) as f32,
            pixel_ratio,
            surface_width: to_surface(width),
            surface_height: to_surface(height),
        }
    }
}

/// The render pipelines and the material layout they share.
#[derive(Debug)]
pub struct Pipelines {
    pub basic: wgpu::RenderPipeline,
    pub transparent: wgpu::RenderPipeline,
    pub helper: wgpu::RenderPipeline,
    pub material_layout: wgpu::BindGroupLayout,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
        light_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let material_layout = material_layout(device);
        Self {
            basic: mk_basic_pipeline(
                device,
                color_format,
                &material_layout,
                camera_bind_group_layout,
                light_bind_group_layout,
            ),
            transparent: mk_transparent_pipeline(
                device,
                color_format,
                &material_layout,
                camera_bind_group_layout,
                light_bind_group_layout,
            ),
            helper: mk_helper_pipeline(device, color_format, camera_bind_group_layout),
            material_layout,
        }
    }
}

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Option<Arc<Window>>,
    pub(crate) surface: Option<wgpu::Surface<'static>>,
    pub(crate) depth_texture: Texture,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub projection: Projection,
    pub light: LightResources,
    pub pipelines: Pipelines,
    pub clear_colour: wgpu::Color,
    pub viewport: Viewport,
}

impl Context {
    pub async fn new(window: Arc<Window>, app: &AppConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let viewport = Viewport::fit(size.width, size.height, window.scale_factor());

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        log::info!("adapter: {}", adapter.get_info().name);
        let (device, queue) = request_device(&adapter).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shaders write linear colour and rely on an sRGB surface for the encoding.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("the surface supports no texture format"))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: viewport.surface_width,
            height: viewport.surface_height,
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let mut ctx = Self::from_parts(device, queue, config, viewport, app);
        ctx.window = Some(window);
        ctx.surface = Some(surface);
        Ok(ctx)
    }

    /// A context without window or surface that renders into textures of `width` x `height`.
    pub async fn headless(width: u32, height: u32, app: &AppConfig) -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::new_without_display_handle());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;
        let (device, queue) = request_device(&adapter).await?;
        let viewport = Viewport::fit(width, height, 1.0);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            width: viewport.surface_width,
            height: viewport.surface_height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        Ok(Self::from_parts(device, queue, config, viewport, app))
    }

    fn from_parts(
        device: wgpu::Device,
        queue: wgpu::Queue,
        config: wgpu::SurfaceConfiguration,
        viewport: Viewport,
        app: &AppConfig,
    ) -> Self {
        let camera = Camera::new((0.0, 0.0, 5.0), (0.0, 0.0, 0.0));
        let projection =
            Projection::new(viewport.width, viewport.height, cgmath::Deg(45.0), 0.1, 100.0);
        let mut controller = OrbitController::new(app.damping, app.damping_factor);
        controller.set_viewport_height(config.height);

        let mut camera_uniform = CameraUniform::new();
        camera_uniform.update_view_proj(&camera, &projection);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("camera_bind_group_layout"),
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let light = LightResources::new(&device, &[]);
        let pipelines = Pipelines::new(
            &device,
            config.format,
            &camera_bind_group_layout,
            &light.bind_group_layout,
        );

        let camera = CameraResources {
            camera,
            controller,
            uniform: camera_uniform,
            buffer: camera_buffer,
            bind_group: camera_bind_group,
            bind_group_layout: camera_bind_group_layout,
        };

        let depth_texture =
            Texture::create_depth_texture(&device, [config.width, config.height], "depth_texture");

        Self {
            window: None,
            surface: None,
            depth_texture,
            device,
            queue,
            config,
            camera,
            projection,
            light,
            pipelines,
            clear_colour: wgpu::Color::BLACK,
            viewport,
        }
    }

    /// Apply a new viewport: projection, controller, surface and depth buffer.
    ///
    /// Zero-sized windows are ignored. Returns whether anything was applied.
    pub fn resize(&mut self, viewport: Viewport) -> bool {
        if viewport.width == 0 || viewport.height == 0 {
            return false;
        }
        self.viewport = viewport;
        self.config.width = viewport.surface_width;
        self.config.height = viewport.surface_height;
        self.projection.resize(viewport.width, viewport.height);
        self.camera
            .controller
            .set_viewport_height(viewport.surface_height);
        if let Some(surface) = &self.surface {
            surface.configure(&self.device, &self.config);
        }
        self.depth_texture = Texture::create_depth_texture(
            &self.device,
            [self.config.width, self.config.height],
            "depth_texture",
        );
        true
    }

    pub fn window(&self) -> Option<&Arc<Window>> {
        self.window.as_ref()
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_texture.view
    }
}

async fn request_device(adapter: &wgpu::Adapter) -> anyhow::Result<(wgpu::Device, wgpu::Queue)> {
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: None,
            required_features: wgpu::Features::empty(),
            // WebGL doesn't support all of wgpu's features, so if
            // we're building for the web we'll have to disable some.
            required_limits: if cfg!(target_arch = "wasm32") {
                wgpu::Limits::downlevel_webgl2_defaults()
            } else {
                wgpu::Limits::default()
            },
            ..Default::default()
        })
        .await?;
    Ok((device, queue))
}

/// What a flow constructor gets to build its GPU resources with.
///
/// `wgpu` handles are reference counted, cloning them is cheap.
#[derive(Debug, Clone)]
pub struct InitContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub material_layout: wgpu::BindGroupLayout,
    pub assets_dir: PathBuf,
}

impl InitContext {
    pub fn new(ctx: &Context, app: &AppConfig) -> Self {
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            material_layout: ctx.pipelines.material_layout.clone(),
            assets_dir: app.assets_dir.clone(),
        }
    }
}
