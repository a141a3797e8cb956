//! Line gizmo marking the directional light.
//!
//! Draws a square of half-size `size` at the light position, facing the
//! light target, plus a line from the light to its target. Vertices are
//! rebuilt on the CPU whenever the light moves.

use cgmath::{InnerSpace, Vector3};
use wgpu::util::DeviceExt;

use crate::{
    data_structures::{light::Light, model::Vertex, texture::Texture},
    pipelines::basic::mk_render_pipeline,
};

/// Four square edges plus the target line, two vertices each.
pub const HELPER_VERTEX_COUNT: usize = 10;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct HelperVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex for HelperVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<HelperVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Line list for a light at `position` aimed at `target`.
pub fn helper_lines(
    position: Vector3<f32>,
    target: Vector3<f32>,
    size: f32,
    color: [f32; 3],
) -> Vec<HelperVertex> {
    let forward = target - position;
    let forward = if forward.magnitude2() > 0.0 {
        forward.normalize()
    } else {
        -Vector3::unit_z()
    };
    let mut right = forward.cross(Vector3::unit_y());
    if right.magnitude2() < 1e-8 {
        // looking straight up or down
        right = Vector3::unit_x();
    }
    let right = right.normalize() * size;
    let up = right.cross(forward).normalize() * size;

    let corners = [
        position - right + up,
        position + right + up,
        position + right - up,
        position - right - up,
    ];
    let vertex = |p: Vector3<f32>| HelperVertex {
        position: p.into(),
        color,
    };

    let mut vertices = Vec::with_capacity(HELPER_VERTEX_COUNT);
    for i in 0..corners.len() {
        vertices.push(vertex(corners[i]));
        vertices.push(vertex(corners[(i + 1) % corners.len()]));
    }
    vertices.push(vertex(position));
    vertices.push(vertex(target));
    vertices
}

/// GPU side of the light gizmo.
#[derive(Debug)]
pub struct LightHelper {
    pub visible: bool,
    pub size: f32,
    vertices: Vec<HelperVertex>,
    pub buffer: wgpu::Buffer,
}

impl LightHelper {
    pub fn new(device: &wgpu::Device, size: f32) -> Self {
        let vertices = vec![
            HelperVertex {
                position: [0.0; 3],
                color: [0.0; 3],
            };
            HELPER_VERTEX_COUNT
        ];
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Helper Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            visible: true,
            size,
            vertices,
            buffer,
        }
    }

    pub fn num_vertices(&self) -> u32 {
        self.vertices.len() as u32
    }

    /// Follow the first directional light. Uploads only when the lines moved.
    pub fn update(&mut self, queue: &wgpu::Queue, lights: &[Light]) {
        let Some((position, color)) = lights
            .iter()
            .find_map(|light| light.position().map(|p| (p, light.color())))
        else {
            return;
        };
        let vertices = helper_lines(position, Vector3::new(0.0, 0.0, 0.0), self.size, color);
        if vertices != self.vertices {
            self.vertices = vertices;
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&self.vertices));
        }
    }
}

/// Unlit line pipeline. Only the camera is bound (group 0).
pub fn mk_helper_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Light Helper Pipeline Layout"),
        bind_group_layouts: &[Some(camera_bind_group_layout)],
        immediate_size: 0,
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Light Helper Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("helper.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        &layout,
        color_format,
        Some(wgpu::BlendState::REPLACE),
        Some(Texture::DEPTH_FORMAT),
        &[HelperVertex::desc()],
        wgpu::PrimitiveTopology::LineList,
        shader,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gizmo_has_square_and_target_line() {
        let position = Vector3::new(0.0, 5.0, 3.648);
        let lines = helper_lines(position, Vector3::new(0.0, 0.0, 0.0), 5.0, [1.0; 3]);
        assert_eq!(lines.len(), HELPER_VERTEX_COUNT);
        assert_eq!(lines[8].position, [0.0, 5.0, 3.648]);
        assert_eq!(lines[9].position, [0.0, 0.0, 0.0]);

        // corners sit on a square around the light, perpendicular to the target line
        let to_target = (-position).normalize();
        for v in &lines[..8] {
            let offset = Vector3::from(v.position) - position;
            assert!((offset.magnitude() - 5.0 * 2f32.sqrt()).abs() < 1e-4);
            assert!(offset.dot(to_target).abs() < 1e-4);
        }
    }

    #[test]
    fn straight_down_light_still_builds_a_square() {
        let lines = helper_lines(Vector3::new(0.0, 10.0, 0.0), Vector3::new(0.0, 0.0, 0.0), 1.0, [1.0; 3]);
        assert!(lines.iter().all(|v| v.position.iter().all(|c| c.is_finite())));
        assert!((lines[0].position[1] - 10.0).abs() < 1e-6);
    }
}
