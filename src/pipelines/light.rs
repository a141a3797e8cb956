use wgpu::util::DeviceExt;

use crate::data_structures::light::Light;

/// GPU copy of the scene lights (bind group 2).
#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

/// Ambient term plus one directional light.
///
/// Every field is a vec4 so the struct needs no explicit padding.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    /// rgb colour premultiplied by intensity, w unused
    ambient: [f32; 4],
    /// xyz position, w intensity
    directional_position: [f32; 4],
    /// rgb colour, w shadow flag
    directional_color: [f32; 4],
}

impl LightUniform {
    /// Collapse a light list: ambient lights add up, the first directional light is used.
    pub fn from_lights(lights: &[Light]) -> Self {
        let mut uniform = LightUniform {
            ambient: [0.0; 4],
            directional_position: [0.0; 4],
            directional_color: [0.0; 4],
        };
        let mut directional_seen = false;
        for light in lights {
            match *light {
                Light::Ambient { color, intensity } => {
                    for i in 0..3 {
                        uniform.ambient[i] += color[i] * intensity;
                    }
                }
                Light::Directional {
                    color,
                    intensity,
                    position,
                    cast_shadow,
                } if !directional_seen => {
                    directional_seen = true;
                    uniform.directional_position = [position.x, position.y, position.z, intensity];
                    uniform.directional_color =
                        [color[0], color[1], color[2], if cast_shadow { 1.0 } else { 0.0 }];
                }
                Light::Directional { .. } => {
                    log::debug!("only the first directional light is shaded, ignoring the rest");
                }
            }
        }
        uniform
    }

    pub fn ambient(&self) -> [f32; 3] {
        [self.ambient[0], self.ambient[1], self.ambient[2]]
    }

    pub fn directional_intensity(&self) -> f32 {
        self.directional_position[3]
    }
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
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
        label: Some("light_bind_group_layout"),
    })
}

impl LightResources {
    pub fn new(device: &wgpu::Device, lights: &[Light]) -> Self {
        let uniform = LightUniform::from_lights(lights);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("light_bind_group"),
        });
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Upload the lights if anything changed since the last write.
    pub fn write_to_buffer(&mut self, queue: &wgpu::Queue, lights: &[Light]) {
        let uniform = LightUniform::from_lights(lights);
        if uniform != self.uniform {
            self.uniform = uniform;
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
        }
    }
}
