//! egui overlay drawn on top of the finished frame.
//!
//! Window events reach [`Gui::on_window_event`] before anything else. Events
//! egui consumes (a drag on a slider, a click into the panel) do not reach the
//! orbit controller or the flows.

use std::{fmt, iter};

use winit::{
    event::{ElementState, WindowEvent},
    window::Window,
};

use crate::{context::Context, flow::GraphicsFlow};

pub struct Gui {
    ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
}

impl fmt::Debug for Gui {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gui").finish_non_exhaustive()
    }
}

impl Gui {
    pub fn new(ctx: &Context, window: &Window) -> Self {
        let egui_ctx = egui::Context::default();
        let state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            Some(ctx.device.limits().max_texture_dimension_2d as usize),
        );
        let renderer = egui_wgpu::Renderer::new(
            &ctx.device,
            ctx.config.format,
            egui_wgpu::RendererOptions {
                msaa_samples: 1,
                depth_stencil_format: None,
                dithering: false,
                ..Default::default()
            },
        );
        Self {
            ctx: egui_ctx,
            state,
            renderer,
        }
    }

    /// Feed one event to egui. Returns true when egui used it.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Run every flow's UI and paint it over `target`.
    pub fn draw(
        &mut self,
        ctx: &Context,
        window: &Window,
        target: &wgpu::TextureView,
        flows: &mut [Box<dyn GraphicsFlow>],
    ) {
        let raw_input = self.state.take_egui_input(window);
        let full_output = self.ctx.run(raw_input, |gui| {
            flows.iter_mut().for_each(|flow| flow.on_gui(gui));
        });
        self.state
            .handle_platform_output(window, full_output.platform_output);

        let paint_jobs = self
            .ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [ctx.config.width, ctx.config.height],
            pixels_per_point: full_output.pixels_per_point * surface_scale(ctx),
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            self.renderer
                .update_texture(&ctx.device, &ctx.queue, *id, image_delta);
        }
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("GUI Encoder"),
            });
        let callbacks = self.renderer.update_buffers(
            &ctx.device,
            &ctx.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );
        {
            let mut render_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("GUI Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: target,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: None,
                    occlusion_query_set: None,
                    timestamp_writes: None,
                    multiview_mask: None,
                })
                .forget_lifetime();
            self.renderer
                .render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }
        ctx.queue
            .submit(callbacks.into_iter().chain(iter::once(encoder.finish())));

        for id in &full_output.textures_delta.free {
            self.renderer.free_texture(id);
        }
    }
}

/// Surface pixels per window pixel. Below one when the pixel ratio is capped.
fn surface_scale(ctx: &Context) -> f32 {
    ctx.viewport.surface_width as f32 / ctx.viewport.width.max(1) as f32
}

/// Whether the orbit controller and the flows get to see `event`.
///
/// Releasing the mouse button and leaving the window always pass, so a camera
/// drag that ends over the panel does not keep rotating.
pub fn reaches_scene(event: &WindowEvent, consumed_by_gui: bool) -> bool {
    if !consumed_by_gui {
        return true;
    }
    matches!(
        event,
        WindowEvent::MouseInput {
            state: ElementState::Released,
            ..
        } | WindowEvent::CursorLeft { .. }
            | WindowEvent::Focused(false)
    )
}

#[cfg(test)]
mod tests {
    use winit::event::{DeviceId, MouseButton};

    use super::*;

    fn button(state: ElementState) -> WindowEvent {
        WindowEvent::MouseInput {
            device_id: DeviceId::dummy(),
            state,
            button: MouseButton::Left,
        }
    }

    #[test]
    fn unconsumed_events_reach_the_scene() {
        assert!(reaches_scene(&button(ElementState::Pressed), false));
        assert!(reaches_scene(&WindowEvent::Focused(true), false));
    }

    #[test]
    fn presses_on_the_panel_do_not_start_a_camera_drag() {
        assert!(!reaches_scene(&button(ElementState::Pressed), true));
        let moved = WindowEvent::CursorMoved {
            device_id: DeviceId::dummy(),
            position: winit::dpi::PhysicalPosition::new(10.0, 10.0),
        };
        assert!(!reaches_scene(&moved, true));
    }

    #[test]
    fn releases_always_reach_the_scene() {
        assert!(reaches_scene(&button(ElementState::Released), true));
        let left = WindowEvent::CursorLeft {
            device_id: DeviceId::dummy(),
        };
        assert!(reaches_scene(&left, true));
    }
}
