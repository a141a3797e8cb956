use crate::{
    data_structures::{
        model::{ModelVertex, Vertex},
        texture::Texture,
        transform::InstanceRaw,
    },
    pipelines::basic::{mk_render_pipeline, mk_standard_layout, standard_shader},
};

/// Alpha-blended variant of the standard material pipeline.
///
/// Same shader and bind groups as [`mk_basic_pipeline`](crate::pipelines::basic::mk_basic_pipeline).
/// Meshes drawn with it are drawn after every opaque mesh.
pub fn mk_transparent_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    material_layout: &wgpu::BindGroupLayout,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    light_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let render_pipeline_layout = mk_standard_layout(
        device,
        material_layout,
        camera_bind_group_layout,
        light_bind_group_layout,
    );
    mk_render_pipeline(
        device,
        &render_pipeline_layout,
        color_format,
        Some(wgpu::BlendState::ALPHA_BLENDING),
        Some(Texture::DEPTH_FORMAT),
        &[ModelVertex::desc(), InstanceRaw::desc()],
        wgpu::PrimitiveTopology::TriangleList,
        standard_shader(),
    )
}
