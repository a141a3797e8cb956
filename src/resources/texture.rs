//! Startup texture loading.
//!
//! A [`TextureSet`] is built once from a list of [`TextureRequest`]s. Files are
//! fetched concurrently and uploaded as shared [`TextureHandle`]s. A file that
//! is missing or cannot be decoded is replaced by a 1x1 placeholder in the
//! neutral colour of its channel, so loading itself never fails. Images
//! larger than the device allows are scaled down before upload.

use std::{collections::BTreeMap, path::Path, rc::Rc};

use image::{DynamicImage, imageops::FilterType};

use crate::data_structures::{
    material::MaterialChannel,
    texture::{Texture, TextureHandle},
};

/// One named image resource and the material channel it is meant for.
///
/// The channel decides the colour space of the upload and the placeholder colour.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureRequest {
    pub name: String,
    pub path: String,
    pub channel: MaterialChannel,
}

impl TextureRequest {
    pub fn new(name: &str, path: &str, channel: MaterialChannel) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            channel,
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("no browser window"))?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| anyhow::anyhow!("page origin is not readable"))?;
    let base = reqwest::Url::parse(&format!("{}/assets/", origin))?;
    Ok(base.join(file_name)?)
}

/// Read a file below the assets directory (native) or fetch it from `<origin>/assets/` (web).
#[allow(unused_variables)]
pub async fn load_binary(assets_dir: &Path, file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        let response = reqwest::get(url).await?.error_for_status()?;
        response.bytes().await?.to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = assets_dir.join(file_name);
        tokio::fs::read(&path)
            .await
            .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?
    };

    Ok(data)
}

/// Turn fetched bytes into an image, or into the channel's placeholder.
///
/// The `bool` is true when the placeholder was used.
pub fn decode_or_placeholder(
    request: &TextureRequest,
    bytes: anyhow::Result<Vec<u8>>,
) -> (DynamicImage, bool) {
    let decoded = bytes.and_then(|bytes| Ok(image::load_from_memory(&bytes)?));
    match decoded {
        Ok(img) => (img, false),
        Err(e) => {
            log::warn!(
                "texture '{}' ({}) unavailable, using a placeholder: {}",
                request.name,
                request.path,
                e
            );
            let placeholder = image::RgbaImage::from_pixel(1, 1, image::Rgba(request.channel.neutral_rgba()));
            (DynamicImage::ImageRgba8(placeholder), true)
        }
    }
}

/// Scale `img` down so neither side exceeds `max`, keeping the aspect ratio.
///
/// Images that already fit are returned untouched.
pub fn fit_to_limit(img: DynamicImage, max: u32) -> DynamicImage {
    if img.width() <= max && img.height() <= max {
        return img;
    }
    img.resize(max, max, FilterType::Triangle)
}

/// Loaded textures by name.
#[derive(Debug, Default)]
pub struct TextureSet {
    textures: BTreeMap<String, Rc<TextureHandle>>,
}

impl TextureSet {
    pub async fn load(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        assets_dir: &Path,
        requests: &[TextureRequest],
    ) -> Self {
        let fetches = requests
            .iter()
            .map(|request| load_binary(assets_dir, &request.path));
        let fetched = futures::future::join_all(fetches).await;

        let max_side = device.limits().max_texture_dimension_2d;
        let mut textures = BTreeMap::new();
        for (request, bytes) in requests.iter().zip(fetched) {
            let (img, placeholder) = decode_or_placeholder(request, bytes);
            let (width, height) = (img.width(), img.height());
            let img = fit_to_limit(img, max_side);
            if (img.width(), img.height()) != (width, height) {
                log::warn!(
                    "texture '{}' ({}) is {}x{}, scaled to {}x{} to fit the device limit of {}",
                    request.name,
                    request.path,
                    width,
                    height,
                    img.width(),
                    img.height(),
                    max_side
                );
            }
            let texture = Texture::from_image(
                device,
                queue,
                &img,
                Some(request.name.as_str()),
                request.channel.is_srgb(),
            );
            if textures
                .insert(
                    request.name.clone(),
                    Rc::new(TextureHandle::new(&request.name, texture, placeholder)),
                )
                .is_some()
            {
                log::warn!("texture '{}' requested twice, keeping the last one", request.name);
            }
        }
        log::info!(
            "loaded {} textures ({} placeholders)",
            textures.len(),
            textures.values().filter(|t| t.is_placeholder()).count()
        );
        Self { textures }
    }

    pub fn get(&self, name: &str) -> Option<Rc<TextureHandle>> {
        self.textures.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rc<TextureHandle>)> {
        self.textures.iter().map(|(name, handle)| (name.as_str(), handle))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn decodes_valid_images() {
        let request = TextureRequest::new("snowColor", "textures/snow/color.png", MaterialChannel::Color);
        let (img, placeholder) = decode_or_placeholder(&request, Ok(png_bytes(4, 2)));
        assert!(!placeholder);
        assert_eq!((img.width(), img.height()), (4, 2));
    }

    #[test]
    fn missing_file_becomes_neutral_placeholder() {
        let request = TextureRequest::new("snowNormal", "textures/snow/normal.jpg", MaterialChannel::Normal);
        let (img, placeholder) =
            decode_or_placeholder(&request, Err(anyhow::anyhow!("file not found")));
        assert!(placeholder);
        assert_eq!((img.width(), img.height()), (1, 1));
        assert_eq!(img.to_rgba8().get_pixel(0, 0).0, [127, 127, 255, 255]);
    }

    #[test]
    fn garbage_bytes_become_placeholder() {
        let request = TextureRequest::new("snowHeight", "textures/snow/height.jpg", MaterialChannel::Displacement);
        let (img, placeholder) = decode_or_placeholder(&request, Ok(b"not an image".to_vec()));
        assert!(placeholder);
        assert_eq!(img.to_rgba8().get_pixel(0, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn oversized_images_shrink_to_the_limit() {
        let img = DynamicImage::ImageRgba8(image::RgbaImage::new(4096, 1024));
        let fitted = fit_to_limit(img, 2048);
        assert_eq!((fitted.width(), fitted.height()), (2048, 512));

        let tall = DynamicImage::ImageRgba8(image::RgbaImage::new(300, 5000));
        let fitted = fit_to_limit(tall, 2048);
        assert_eq!(fitted.height(), 2048);
        assert!(fitted.width() <= 2048 && fitted.width() >= 122);
    }

    #[test]
    fn images_within_the_limit_are_untouched() {
        let img = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(2048, 16, image::Rgba([1, 2, 3, 4])));
        let fitted = fit_to_limit(img.clone(), 2048);
        assert_eq!(fitted, img);
    }

    #[test]
    #[cfg(not(target_arch = "wasm32"))]
    fn native_loader_reports_the_missing_path() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let err = runtime
            .block_on(load_binary(Path::new("/definitely/not/here"), "textures/snow/color.jpg"))
            .unwrap_err();
        assert!(err.to_string().contains("textures/snow/color.jpg"));
    }
}
