//! Flow control and application event loop.
//!
//! A "flow" is a self-contained piece of the application that reacts to
//! window input, updates itself once per frame and describes what to draw.
//! The [`App`] owns the window, the GPU [`Context`] and the flows, and drives
//! them from the winit event loop.
//!
//! # Lifecycle
//!
//! 1. The window is created on `resumed`, the context and all flows are built asynchronously
//! 2. `on_init` is called once per flow after the surface has been configured
//! 3. Window events go to the [`Gui`] first; what it leaves goes to the orbit
//!    controller and then to every flow
//! 4. Each redraw reads the [`FrameClock`], calls `on_update`, advances the camera,
//!    collects `on_render` from every flow and draws one frame with [`draw_frame`]
//! 5. `on_gui` of every flow is painted over the frame, the frame is presented
//!    and the next redraw is requested

use std::{fmt::Debug, iter, pin::Pin, sync::Arc};

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    config::AppConfig,
    context::{Context, InitContext, Viewport},
    data_structures::model::DrawModel,
    gui::{Gui, reaches_scene},
    render::{Batches, Render},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// A renderable, updatable part of the application.
///
/// # Lifecycle
///
/// 1. `on_init()` is called once when the surface is ready; configure the camera and context here
/// 2. `on_window_events()` is called for each winit window event
/// 3. `on_update()` is called every frame before drawing
/// 4. `on_render()` is called every frame and specifies how to render `self`
/// 5. `on_gui()` is called every frame after drawing to add egui widgets
pub trait GraphicsFlow {
    /// Initialize the flow and configure the context.
    fn on_init(&mut self, ctx: &mut Context);

    /// Advance the flow. `elapsed` is the time since start, `dt` the time since the last frame.
    fn on_update(&mut self, ctx: &mut Context, elapsed: Duration, dt: Duration);

    /// Handle window events (keyboard, mouse, resizing, etc.).
    fn on_window_events(&mut self, ctx: &Context, event: &WindowEvent);

    /// Return renderable objects for this flow.
    fn on_render(&self) -> Render<'_>;

    /// Add widgets to the overlay. Changes made here are drawn from the next frame on.
    fn on_gui(&mut self, _gui: &egui::Context) {}
}

impl Debug for dyn GraphicsFlow + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GraphicsFlow")
    }
}

/// Builds a flow once the GPU context exists.
///
/// Constructors run concurrently, so asset loading of several flows overlaps.
pub type FlowConstructor =
    Box<dyn FnOnce(InitContext) -> Pin<Box<dyn Future<Output = Box<dyn GraphicsFlow>>>>>;

/// Time since start and time since the previous frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
}

impl Default for FrameClock {
    fn default() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
        }
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed(&self) -> Duration {
        self.last.duration_since(self.start)
    }

    /// Start a new frame. Returns `(elapsed, dt)` measured at the same instant.
    pub fn tick(&mut self) -> (Duration, Duration) {
        let now = Instant::now();
        let dt = now.duration_since(self.last);
        self.last = now;
        (self.elapsed(), dt)
    }
}

/// Record one frame of `render` into `target` and submit it.
///
/// Opaque meshes are drawn first, transparent meshes second and lines last,
/// all in a single pass that clears colour and depth.
pub fn draw_frame(
    ctx: &Context,
    render: Render<'_>,
    target: &wgpu::TextureView,
) -> wgpu::SubmissionIndex {
    let mut batches = Batches::default();
    render.set_pipelines(&mut batches);

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });
    {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(ctx.clear_colour),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: ctx.depth_view(),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
            multiview_mask: None,
        });

        for (pipeline, batch) in [
            (&ctx.pipelines.basic, &batches.basics),
            (&ctx.pipelines.transparent, &batches.transparents),
        ] {
            render_pass.set_pipeline(pipeline);
            for instanced in batch {
                if instanced.amount == 0 || instanced.instance.size() == 0 {
                    log::warn!("skipping a mesh with zero instances");
                    continue;
                }
                render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
                render_pass.draw_mesh_instanced(
                    instanced.mesh,
                    instanced.material,
                    0..instanced.amount as u32,
                    &ctx.camera.bind_group,
                    &ctx.light.bind_group,
                );
            }
        }

        render_pass.set_pipeline(&ctx.pipelines.helper);
        render_pass.set_bind_group(0, &ctx.camera.bind_group, &[]);
        for lines in &batches.lines {
            render_pass.set_vertex_buffer(0, lines.vertex.slice(..));
            render_pass.draw(0..lines.amount, 0..1);
        }
    }
    ctx.queue.submit(iter::once(encoder.finish()))
}

/// What became of one redraw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Presented,
    /// No texture this time (timeout, occluded window, unconfigured surface).
    Skipped,
    /// The surface no longer matches the window and has to be configured again.
    Reconfigure,
    Invalid,
}

/// Everything a running window needs: GPU context, overlay and frame clock.
#[derive(Debug)]
pub struct AppState {
    pub(crate) ctx: Context,
    gui: Option<Gui>,
    clock: FrameClock,
    is_surface_configured: bool,
}

impl AppState {
    fn new(ctx: Context) -> Self {
        let gui = ctx.window().map(|window| Gui::new(&ctx, window));
        Self {
            ctx,
            gui,
            clock: FrameClock::new(),
            is_surface_configured: false,
        }
    }

    fn resize(&mut self, viewport: Viewport) {
        if self.ctx.resize(viewport) {
            self.is_surface_configured = true;
            log::debug!(
                "resized to {}x{} (surface {}x{})",
                viewport.width,
                viewport.height,
                viewport.surface_width,
                viewport.surface_height
            );
        }
    }

    /// Fit the surface to the window's current size and scale factor.
    fn fit_to_window(&mut self) {
        let viewport = self.ctx.window().map(|window| {
            let size = window.inner_size();
            Viewport::fit(size.width, size.height, window.scale_factor())
        });
        if let Some(viewport) = viewport {
            self.resize(viewport);
        }
    }

    fn render(&mut self, flows: &mut [Box<dyn GraphicsFlow>]) -> Frame {
        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Frame::Skipped;
        }

        let (elapsed, dt) = self.clock.tick();
        flows
            .iter_mut()
            .for_each(|flow| flow.on_update(&mut self.ctx, elapsed, dt));

        let camera = &mut self.ctx.camera;
        camera.controller.update(&mut camera.camera);
        camera.write_to_buffer(&self.ctx.queue, &self.ctx.projection);

        let Some(surface) = &self.ctx.surface else {
            return Frame::Skipped;
        };
        let (output, suboptimal) = match surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(output) => (output, false),
            wgpu::CurrentSurfaceTexture::Suboptimal(output) => (output, true),
            wgpu::CurrentSurfaceTexture::Timeout | wgpu::CurrentSurfaceTexture::Occluded => {
                return Frame::Skipped;
            }
            wgpu::CurrentSurfaceTexture::Outdated | wgpu::CurrentSurfaceTexture::Lost => {
                return Frame::Reconfigure;
            }
            wgpu::CurrentSurfaceTexture::Validation => return Frame::Invalid,
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let render = Render::Composed(flows.iter().map(|flow| flow.on_render()).collect());
        draw_frame(&self.ctx, render, &view);
        if let (Some(gui), Some(window)) = (&mut self.gui, &self.ctx.window) {
            gui.draw(&self.ctx, window, &view, flows);
        }
        output.present();

        if suboptimal {
            Frame::Reconfigure
        } else {
            Frame::Presented
        }
    }
}

pub(crate) enum FlowEvent {
    /// The asynchronously built state of a wasm startup.
    #[allow(dead_code)]
    Initialized {
        state: AppState,
        flows: Vec<Box<dyn GraphicsFlow>>,
    },
    #[allow(dead_code)]
    Failed(anyhow::Error),
}

impl Debug for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized { state: _, flows } => {
                f.debug_struct("Initialized").field("flows", flows).finish()
            }
            Self::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
        }
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    proxy: winit::event_loop::EventLoopProxy<FlowEvent>,
    config: AppConfig,
    state: Option<AppState>,
    // This will hold the fully initialized flows once they are ready.
    graphics_flows: Vec<Box<dyn GraphicsFlow>>,
    // Taken on the first `resumed`.
    constructors: Option<Vec<FlowConstructor>>,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(
        event_loop: &EventLoop<FlowEvent>,
        config: AppConfig,
        constructors: Vec<FlowConstructor>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime: tokio::runtime::Runtime::new()?,
            proxy: event_loop.create_proxy(),
            config,
            state: None,
            graphics_flows: Vec::new(),
            constructors: Some(constructors),
            error: None,
        })
    }

    fn start(&mut self, mut state: AppState, flows: Vec<Box<dyn GraphicsFlow>>) {
        log::info!("{} flow(s) ready", flows.len());
        state.fit_to_window();
        self.graphics_flows = flows;
        self.graphics_flows
            .iter_mut()
            .for_each(|flow| flow.on_init(&mut state.ctx));
        if let Some(window) = state.ctx.window() {
            window.request_redraw();
        }
        self.state = Some(state);
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("startup failed: {error:#}");
        self.error = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(constructors) = self.constructors.take() else {
            return;
        };

        #[allow(unused_mut)]
        let mut window_attributes =
            Window::default_attributes().with_title(self.config.window_title.as_str());

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        let config = self.config.clone();
        let init_future = async move {
            let ctx = Context::new(window, &config).await?;
            let init = InitContext::new(&ctx, &config);
            let flows = futures::future::join_all(
                constructors
                    .into_iter()
                    .map(|constructor| constructor(init.clone())),
            )
            .await;
            Ok::<_, anyhow::Error>((AppState::new(ctx), flows))
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok((state, flows)) => self.start(state, flows),
                Err(e) => self.fail(event_loop, e),
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match init_future.await {
                    Ok((state, flows)) => FlowEvent::Initialized { state, flows },
                    Err(e) => FlowEvent::Failed(e),
                };
                if proxy.send_event(event).is_err() {
                    log::error!("the event loop closed before startup finished");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            FlowEvent::Initialized { state, flows } => self.start(state, flows),
            FlowEvent::Failed(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        let consumed = match (&mut state.gui, &state.ctx.window) {
            (Some(gui), Some(window)) => gui.on_window_event(window, &event),
            _ => false,
        };
        if reaches_scene(&event, consumed) {
            state.ctx.camera.controller.handle_window_events(&event);
            self.graphics_flows
                .iter_mut()
                .for_each(|flow| flow.on_window_events(&state.ctx, &event));
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                let scale_factor = state.ctx.window().map_or(1.0, |w| w.scale_factor());
                state.resize(Viewport::fit(size.width, size.height, scale_factor));
            }
            WindowEvent::ScaleFactorChanged { .. } => state.fit_to_window(),
            WindowEvent::RedrawRequested => {
                match state.render(&mut self.graphics_flows) {
                    Frame::Presented | Frame::Skipped => (),
                    // Reconfigure the surface if it's lost or outdated
                    Frame::Reconfigure => state.fit_to_window(),
                    Frame::Invalid => log::error!("Unable to render: the surface texture is invalid"),
                }
                if let Some(window) = state.ctx.window() {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

/// Open a window and run `constructors` until it is closed.
///
/// Errors while creating the window, the GPU device or the surface end the
/// event loop and are returned here.
pub fn run(config: AppConfig, constructors: Vec<FlowConstructor>) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            eprintln!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info)?;
    }

    log::info!("starting {:?} with {:?}", config.window_title, config.variant);
    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config, constructors)?;

    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_starts_at_zero() {
        let clock = FrameClock::new();
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn elapsed_is_the_sum_of_frame_times() {
        let mut clock = FrameClock::new();
        let mut total = Duration::ZERO;
        let mut previous = Duration::ZERO;
        for _ in 0..5 {
            std::thread::sleep(Duration::from_millis(2));
            let (elapsed, dt) = clock.tick();
            total += dt;
            assert!(elapsed >= previous);
            assert_eq!(elapsed, total);
            previous = elapsed;
        }
        assert!(clock.elapsed() >= Duration::from_millis(10));
    }
}
