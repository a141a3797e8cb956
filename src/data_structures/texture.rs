//! GPU textures and their sampling settings.
//!
//! [`Texture`] wraps the WGPU texture and view. [`TextureHandle`] is the shared,
//! loaded image that materials point at: pixel data is fixed after upload, but
//! the repeat factor and wrap mode can be changed at any time and are picked up
//! by every material on its next draw.

use std::cell::Cell;

use cgmath::Vector2;
use image::GenericImageView;

/// How texture coordinates outside `[0, 1]` are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    #[default]
    Clamp,
    Repeat,
}

impl From<WrapMode> for wgpu::AddressMode {
    fn from(mode: WrapMode) -> Self {
        match mode {
            WrapMode::Clamp => wgpu::AddressMode::ClampToEdge,
            WrapMode::Repeat => wgpu::AddressMode::Repeat,
        }
    }
}

/// Mutable sampling state of a texture: tiling factor and wrap mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub repeat: Vector2<f32>,
    pub wrap: WrapMode,
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            repeat: Vector2::new(1.0, 1.0),
            wrap: WrapMode::Clamp,
        }
    }
}

/// A GPU texture with its default view.
#[derive(Clone, Debug)]
pub struct Texture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create a depth texture for depth-testing during rendering.
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `label` is used as a debug label for the GPU resource
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// Create a tiny single-colour texture.
    ///
    /// Used for material channels without an image and for images that failed
    /// to load, so the shader never has to branch on a missing binding.
    pub fn solid(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: [u8; 4],
        label: &str,
        srgb: bool,
    ) -> Texture {
        let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            1,
            1,
            image::Rgba(rgba),
        ));
        Self::from_image(device, queue, &img, Some(label), srgb)
    }

    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        label: Option<&str>,
        srgb: bool,
    ) -> Self {
        let dimensions = img.dimensions();
        let rgba = img.to_rgba8();

        let size = wgpu::Extent3d {
            width: dimensions.0,
            height: dimensions.1,
            depth_or_array_layers: 1,
        };
        let format = if srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * dimensions.0),
                rows_per_image: Some(dimensions.1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// A sampler for the given wrap mode. Filtering is always linear.
pub fn create_sampler(device: &wgpu::Device, wrap: WrapMode) -> wgpu::Sampler {
    let address_mode = wrap.into();
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Linear,
        ..Default::default()
    })
}

/// A loaded image shared between materials.
///
/// The pixel data never changes. Repeat and wrap live in a [`Cell`] so every
/// material holding the handle sees updates without any re-binding by the caller.
#[derive(Debug)]
pub struct TextureHandle {
    pub label: String,
    pub texture: Texture,
    placeholder: bool,
    sampling: Cell<Sampling>,
}

impl TextureHandle {
    pub fn new(label: &str, texture: Texture, placeholder: bool) -> Self {
        Self {
            label: label.to_string(),
            texture,
            placeholder,
            sampling: Cell::new(Sampling::default()),
        }
    }

    /// True when the image could not be loaded and a blank texture stands in.
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn sampling(&self) -> Sampling {
        self.sampling.get()
    }

    pub fn repeat(&self) -> Vector2<f32> {
        self.sampling.get().repeat
    }

    pub fn wrap(&self) -> WrapMode {
        self.sampling.get().wrap
    }

    pub fn set_repeat(&self, x: f32, y: f32) {
        let mut sampling = self.sampling.get();
        sampling.repeat = Vector2::new(x, y);
        self.sampling.set(sampling);
    }

    pub fn set_wrap(&self, wrap: WrapMode) {
        let mut sampling = self.sampling.get();
        sampling.wrap = wrap;
        self.sampling.set(sampling);
    }
}
