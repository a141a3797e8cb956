use instant::Duration;
use snowscape::{config::AppConfig, context::Context, flow::draw_frame, render::Render};

/// Offscreen context of `width` x `height`. Rows of the readback are padded
/// to 256 bytes, so sizes that are multiples of 64 avoid stripping.
pub(crate) async fn headless(width: u32, height: u32) -> Context {
    Context::headless(width, height, &AppConfig::default())
        .await
        .expect("No GPU adapter available for the headless render tests")
}

pub(crate) fn rgba8(colour: wgpu::Color) -> image::Rgba<u8> {
    let f_to_u8 = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    image::Rgba([
        f_to_u8(colour.r),
        f_to_u8(colour.g),
        f_to_u8(colour.b),
        f_to_u8(colour.a),
    ])
}

/// Draw `render` into a fresh texture of the context's size and read it back.
pub(crate) async fn render_to_image(ctx: &Context, render: Render<'_>) -> image::RgbaImage {
    let (width, height) = (ctx.config.width, ctx.config.height);
    let extent3d = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Headless Test Output Texture"),
        size: extent3d,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: ctx.config.format,
        usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    draw_frame(
        ctx,
        render,
        &texture.create_view(&wgpu::TextureViewDescriptor::default()),
    );

    let u32_size = std::mem::size_of::<u32>() as u32;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let bytes_per_row = (u32_size * width).div_ceil(align) * align;
    let output_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        size: (bytes_per_row * height) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        label: None,
        mapped_at_creation: false,
    });
    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &output_buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        extent3d,
    );
    ctx.queue.submit(std::iter::once(encoder.finish()));

    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    let buffer_slice = output_buffer.slice(..);
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        tx.send(result).unwrap();
    });
    ctx.device
        .poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: Some(Duration::from_secs(3)),
        })
        .unwrap();
    rx.receive().await.unwrap().unwrap();

    let data = buffer_slice.get_mapped_range();
    let row_len = (u32_size * width) as usize;
    let pixels: Vec<u8> = data
        .chunks(bytes_per_row as usize)
        .flat_map(|row| &row[..row_len])
        .copied()
        .collect();
    drop(data);
    output_buffer.unmap();
    image::RgbaImage::from_raw(width, height, pixels).unwrap()
}
