//! Image transcoding service
//!
//! The independent `/image_proxy` path: classify the requested resource,
//! fetch or inline-decode it, resize it into the vintage viewport box, and
//! re-encode it as either PNG (transparency-capable sources) or a
//! non-progressive JPEG. Non-image payloads pass through untouched. All
//! outputs are long-cacheable; a proxied image is immutable for the life of
//! the page that referenced it.

use crate::config::{IMAGE_CACHE_CONTROL, JPEG_QUALITY, VIEWPORT_HEIGHT, VIEWPORT_WIDTH};
use crate::error::{Error, ImageError, Result};
use crate::resource::{data_url, FetchedResource, ResourceFetcher};
use crate::svg::rasterize_svg;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use std::io::Cursor;

/// A transcoded (or passed-through) image response.
#[derive(Debug, Clone)]
pub struct TranscodeOutput {
  pub bytes: Vec<u8>,
  pub content_type: String,
  pub cache_control: &'static str,
}

/// Formats that may carry an alpha channel and therefore re-encode as PNG.
const TRANSPARENCY_CAPABLE: &[&str] = &["svg", "png", "gif", "webp"];

/// Fetch (or inline-decode) a URL and transcode it for a vintage client.
pub fn transcode_url(url: &str, fetcher: &dyn ResourceFetcher) -> Result<TranscodeOutput> {
  let resource = if url.starts_with("data:") {
    data_url::decode_data_url(url)?
  } else {
    fetcher.fetch(url)?
  };
  transcode_resource(url, &resource)
}

/// Transcode already-fetched bytes.
pub fn transcode_resource(url: &str, resource: &FetchedResource) -> Result<TranscodeOutput> {
  if !looks_like_image(url, resource) {
    // Not an image: hand the payload through with its own content type.
    return Ok(TranscodeOutput {
      bytes: resource.bytes.clone(),
      content_type: resource
        .content_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".to_string()),
      cache_control: IMAGE_CACHE_CONTROL,
    });
  }

  if is_svg(url, resource) {
    let content = String::from_utf8_lossy(&resource.bytes);
    let pixmap = rasterize_svg(&content, VIEWPORT_WIDTH, VIEWPORT_HEIGHT)?;
    let image = DynamicImage::ImageRgba8(pixmap_to_rgba(&pixmap));
    return encode_png(url, &image);
  }

  let decoded = image::load_from_memory(&resource.bytes).map_err(|e| {
    Error::Image(ImageError::DecodeFailed {
      url: url.to_string(),
      reason: e.to_string(),
    })
  })?;
  let resized = fit_viewport(decoded);

  if transparency_capable(url, resource) {
    encode_png(url, &resized)
  } else {
    encode_jpeg(url, &resized)
  }
}

fn looks_like_image(url: &str, resource: &FetchedResource) -> bool {
  if resource.is_image() {
    return true;
  }
  if resource.content_type.is_some() {
    return false;
  }
  // No declared type: go by extension.
  classify_extension(url).is_some()
}

fn classify_extension(url: &str) -> Option<&'static str> {
  let path = url
    .split(['?', '#'])
    .next()
    .unwrap_or(url)
    .to_ascii_lowercase();
  for ext in ["svg", "png", "gif", "webp", "jpg", "jpeg", "bmp", "ico", "tiff"] {
    if path.ends_with(&format!(".{ext}")) {
      return Some(match ext {
        "jpeg" => "jpg",
        other => other,
      });
    }
  }
  None
}

fn is_svg(url: &str, resource: &FetchedResource) -> bool {
  resource
    .media_type()
    .is_some_and(|mt| mt.contains("image/svg"))
    || (resource.content_type.is_none() && classify_extension(url) == Some("svg"))
}

fn transparency_capable(url: &str, resource: &FetchedResource) -> bool {
  if let Some(media_type) = resource.media_type() {
    if let Some(subtype) = media_type.strip_prefix("image/") {
      return TRANSPARENCY_CAPABLE
        .iter()
        .any(|fmt| subtype.contains(fmt));
    }
  }
  classify_extension(url).is_some_and(|ext| TRANSPARENCY_CAPABLE.contains(&ext))
}

/// Resize to fit within the viewport box, preserving aspect ratio and never
/// upscaling.
fn fit_viewport(image: DynamicImage) -> DynamicImage {
  if image.width() <= VIEWPORT_WIDTH && image.height() <= VIEWPORT_HEIGHT {
    return image;
  }
  image.resize(VIEWPORT_WIDTH, VIEWPORT_HEIGHT, FilterType::Triangle)
}

fn pixmap_to_rgba(pixmap: &tiny_skia::Pixmap) -> RgbaImage {
  let mut data = Vec::with_capacity((pixmap.width() * pixmap.height() * 4) as usize);
  for pixel in pixmap.pixels() {
    let color = pixel.demultiply();
    data.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
  }
  RgbaImage::from_raw(pixmap.width(), pixmap.height(), data)
    .unwrap_or_else(|| RgbaImage::new(1, 1))
}

/// PNG with fast (bounded-effort) compression, alpha preserved.
fn encode_png(url: &str, image: &DynamicImage) -> Result<TranscodeOutput> {
  let mut buffer = Vec::new();
  let encoder = PngEncoder::new_with_quality(
    Cursor::new(&mut buffer),
    CompressionType::Fast,
    PngFilterType::Adaptive,
  );
  image
    .to_rgba8()
    .write_with_encoder(encoder)
    .map_err(|e| {
      Error::Image(ImageError::EncodeFailed {
        format: "PNG".to_string(),
        reason: format!("{e} ({url})"),
      })
    })?;
  Ok(TranscodeOutput {
    bytes: buffer,
    content_type: "image/png".to_string(),
    cache_control: IMAGE_CACHE_CONTROL,
  })
}

/// Moderate-quality baseline JPEG (progressive scans confuse period
/// decoders).
fn encode_jpeg(url: &str, image: &DynamicImage) -> Result<TranscodeOutput> {
  let mut buffer = Vec::new();
  let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut buffer), JPEG_QUALITY);
  image
    .to_rgb8()
    .write_with_encoder(encoder)
    .map_err(|e| {
      Error::Image(ImageError::EncodeFailed {
        format: "JPEG".to_string(),
        reason: format!("{e} ({url})"),
      })
    })?;
  Ok(TranscodeOutput {
    bytes: buffer,
    content_type: "image/jpeg".to_string(),
    cache_control: IMAGE_CACHE_CONTROL,
  })
}
