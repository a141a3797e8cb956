//! Surface materials: texture channels plus scalar parameters.
//!
//! A [`SurfaceMaterial`] maps each [`MaterialChannel`] to a shared
//! [`TextureHandle`]. On the GPU it becomes a [`MaterialBinding`]: one uniform
//! buffer and one bind group with a texture/sampler pair per channel. Unbound
//! channels fall back to neutral [`DefaultTextures`].

use std::{collections::HashMap, fmt, rc::Rc};

use wgpu::util::DeviceExt;

use crate::data_structures::texture::{Sampling, Texture, TextureHandle, WrapMode, create_sampler};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MaterialChannel {
    Color,
    Displacement,
    Normal,
    AmbientOcclusion,
    Roughness,
    Alpha,
}

impl MaterialChannel {
    pub const ALL: [MaterialChannel; 6] = [
        MaterialChannel::Color,
        MaterialChannel::Displacement,
        MaterialChannel::Normal,
        MaterialChannel::AmbientOcclusion,
        MaterialChannel::Roughness,
        MaterialChannel::Alpha,
    ];

    /// Slot of the channel in the bind group (texture at `1 + 2i`, sampler at `2 + 2i`).
    pub fn index(self) -> usize {
        match self {
            MaterialChannel::Color => 0,
            MaterialChannel::Displacement => 1,
            MaterialChannel::Normal => 2,
            MaterialChannel::AmbientOcclusion => 3,
            MaterialChannel::Roughness => 4,
            MaterialChannel::Alpha => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MaterialChannel::Color => "color",
            MaterialChannel::Displacement => "displacement",
            MaterialChannel::Normal => "normal",
            MaterialChannel::AmbientOcclusion => "ambient-occlusion",
            MaterialChannel::Roughness => "roughness",
            MaterialChannel::Alpha => "alpha",
        }
    }

    /// Only colour data is stored in sRGB, everything else is linear.
    pub fn is_srgb(self) -> bool {
        matches!(self, MaterialChannel::Color)
    }

    /// Pixel value that leaves the shading unchanged when the channel is unbound.
    pub fn neutral_rgba(self) -> [u8; 4] {
        match self {
            MaterialChannel::Displacement => [0, 0, 0, 255],
            MaterialChannel::Normal => [127, 127, 255, 255],
            _ => [255, 255, 255, 255],
        }
    }
}

impl fmt::Display for MaterialChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One neutral 1x1 texture per channel.
#[derive(Debug)]
pub struct DefaultTextures {
    textures: Vec<Texture>,
    sampler: wgpu::Sampler,
}

impl DefaultTextures {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let textures = MaterialChannel::ALL
            .iter()
            .map(|channel| {
                Texture::solid(
                    device,
                    queue,
                    channel.neutral_rgba(),
                    &format!("default {} map", channel),
                    channel.is_srgb(),
                )
            })
            .collect();
        Self {
            textures,
            sampler: create_sampler(device, WrapMode::Clamp),
        }
    }

    pub fn get(&self, channel: MaterialChannel) -> &Texture {
        &self.textures[channel.index()]
    }
}

/// Texture channels and scalar parameters of one mesh.
#[derive(Debug, Clone)]
pub struct SurfaceMaterial {
    pub channels: HashMap<MaterialChannel, Rc<TextureHandle>>,
    pub displacement_scale: f32,
    pub transparent: bool,
    pub roughness: f32,
    pub opacity: f32,
}

impl Default for SurfaceMaterial {
    fn default() -> Self {
        Self {
            channels: HashMap::new(),
            displacement_scale: 1.0,
            transparent: false,
            roughness: 1.0,
            opacity: 1.0,
        }
    }
}

impl SurfaceMaterial {
    pub fn with(mut self, channel: MaterialChannel, texture: Rc<TextureHandle>) -> Self {
        self.channels.insert(channel, texture);
        self
    }

    pub fn get(&self, channel: MaterialChannel) -> Option<&Rc<TextureHandle>> {
        self.channels.get(&channel)
    }

    /// Primary UV transform. Taken from the colour map, otherwise from any bound channel.
    fn uv_sampling(&self) -> Sampling {
        self.get(MaterialChannel::Color)
            .or_else(|| {
                MaterialChannel::ALL
                    .iter()
                    .filter(|c| **c != MaterialChannel::AmbientOcclusion)
                    .find_map(|c| self.get(*c))
            })
            .map(|t| t.sampling())
            .unwrap_or_default()
    }

    /// Secondary UV transform used by the ambient occlusion channel.
    fn uv2_sampling(&self) -> Sampling {
        self.get(MaterialChannel::AmbientOcclusion)
            .map(|t| t.sampling())
            .unwrap_or_default()
    }

    pub fn to_uniform(&self) -> MaterialUniform {
        let uv = self.uv_sampling().repeat;
        let uv2 = self.uv2_sampling().repeat;
        MaterialUniform {
            uv_repeat: [uv.x, uv.y, uv2.x, uv2.y],
            displacement_scale: self.displacement_scale,
            roughness: self.roughness,
            opacity: self.opacity,
            _padding: 0.0,
        }
    }

    /// Wrap mode for each channel slot, defaults clamp.
    pub fn wraps(&self) -> [WrapMode; 6] {
        let mut wraps = [WrapMode::Clamp; 6];
        for (channel, texture) in &self.channels {
            wraps[channel.index()] = texture.wrap();
        }
        wraps
    }

    pub fn upload(
        &self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        defaults: &DefaultTextures,
        label: &str,
    ) -> MaterialBinding {
        let uniform = self.to_uniform();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Material Buffer")),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let wraps = self.wraps();
        let bind_group = self.bind_group(device, layout, defaults, &buffer, wraps, label);
        MaterialBinding {
            label: label.to_string(),
            uniform,
            buffer,
            bind_group,
            wraps,
        }
    }

    fn bind_group(
        &self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        defaults: &DefaultTextures,
        buffer: &wgpu::Buffer,
        wraps: [WrapMode; 6],
        label: &str,
    ) -> wgpu::BindGroup {
        let samplers: Vec<Option<wgpu::Sampler>> = MaterialChannel::ALL
            .iter()
            .map(|c| {
                self.get(*c)
                    .map(|_| create_sampler(device, wraps[c.index()]))
            })
            .collect();

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }];
        for channel in MaterialChannel::ALL {
            let i = channel.index() as u32;
            let view = match self.get(channel) {
                Some(handle) => &handle.texture.view,
                None => &defaults.get(channel).view,
            };
            let sampler = samplers[channel.index()]
                .as_ref()
                .unwrap_or(&defaults.sampler);
            entries.push(wgpu::BindGroupEntry {
                binding: 1 + 2 * i,
                resource: wgpu::BindingResource::TextureView(view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: 2 + 2 * i,
                resource: wgpu::BindingResource::Sampler(sampler),
            });
        }

        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &entries,
            label: Some(&format!("{label} material_bind_group")),
        })
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    /// xy: primary UV repeat, zw: secondary UV repeat.
    pub uv_repeat: [f32; 4],
    pub displacement_scale: f32,
    pub roughness: f32,
    pub opacity: f32,
    _padding: f32,
}

/// GPU side of a [`SurfaceMaterial`].
#[derive(Debug)]
pub struct MaterialBinding {
    label: String,
    pub uniform: MaterialUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    wraps: [WrapMode; 6],
}

impl MaterialBinding {
    /// Pick up changed texture sampling settings before a draw.
    ///
    /// Repeat factors only need a uniform write, a changed wrap mode needs new
    /// samplers and therefore a new bind group.
    pub fn sync(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        defaults: &DefaultTextures,
        material: &SurfaceMaterial,
    ) {
        let uniform = material.to_uniform();
        if uniform != self.uniform {
            self.uniform = uniform;
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
        }
        let wraps = material.wraps();
        if wraps != self.wraps {
            log::debug!("{}: wrap modes changed, rebinding", self.label);
            self.wraps = wraps;
            self.bind_group =
                material.bind_group(device, layout, defaults, &self.buffer, wraps, &self.label);
        }
    }
}

pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let visibility = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
    let mut entries = vec![wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }];
    for channel in MaterialChannel::ALL {
        let i = channel.index() as u32;
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 1 + 2 * i,
            visibility,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
            },
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 2 + 2 * i,
            visibility,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &entries,
        label: Some("Material bind_group_layout"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_slots_are_unique_and_ordered() {
        for (i, channel) in MaterialChannel::ALL.iter().enumerate() {
            assert_eq!(channel.index(), i);
        }
    }

    #[test]
    fn only_colour_is_srgb() {
        let srgb: Vec<_> = MaterialChannel::ALL
            .iter()
            .filter(|c| c.is_srgb())
            .collect();
        assert_eq!(srgb, vec![&MaterialChannel::Color]);
    }

    #[test]
    fn empty_material_uniform_is_neutral() {
        let material = SurfaceMaterial::default();
        let uniform = material.to_uniform();
        assert_eq!(uniform.uv_repeat, [1.0; 4]);
        assert_eq!(uniform.opacity, 1.0);
        assert_eq!(material.wraps(), [WrapMode::Clamp; 6]);
    }
}
