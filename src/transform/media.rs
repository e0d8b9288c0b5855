//! Media substitution
//!
//! Vintage browsers have no `<video>`, `<audio>` or inline SVG. Video
//! becomes a fixed-dimension placeholder block with a centered label, audio
//! becomes a download link (or disappears when sourceless), and SVG is
//! serialized into a `data:` URI routed through the image transcoder so the
//! client receives an honest raster image.

use crate::config::TARGET_WIDTH;
use crate::dom::{Document, NodeId};
use crate::proxy_url::{image_proxy_url, resolve_url};
use crate::transform::images::constrain_dimensions;
use crate::transform::TransformContext;
use base64::Engine;

/// Fallback payload used when an SVG subtree cannot be serialized sensibly.
const PLACEHOLDER_SVG: &str =
  "<svg width=\"100\" height=\"100\" xmlns=\"http://www.w3.org/2000/svg\">\
   <rect width=\"100%\" height=\"100%\" fill=\"#ddd\"/></svg>";

/// Replace video, audio and SVG elements with vintage-safe substitutes.
pub fn substitute_media(doc: &mut Document, ctx: &TransformContext) {
  replace_videos(doc);
  replace_audio(doc, ctx);
  replace_svgs(doc, ctx);
}

fn parse_dimension(value: &str) -> Option<u32> {
  let trimmed = value.trim().trim_end_matches("px");
  trimmed.parse::<f32>().ok().map(|v| v.round().max(0.0) as u32)
}

fn element_dimension(doc: &Document, id: NodeId, name: &str, fallback: u32) -> u32 {
  doc
    .attr(id, name)
    .and_then(parse_dimension)
    .unwrap_or(fallback)
}

fn replace_videos(doc: &mut Document) {
  for video in doc.elements_by_tag(doc.root(), "video") {
    let width = element_dimension(doc, video, "width", 320);
    let height = element_dimension(doc, video, "height", 240);

    let placeholder = doc.create_element("div");
    doc.set_attr(placeholder, "bgcolor", "black");
    doc.set_attr(placeholder, "width", &width.to_string());
    doc.set_attr(placeholder, "height", &height.to_string());

    let table = doc.create_element("table");
    doc.set_attr(table, "width", "100%");
    doc.set_attr(table, "height", "100%");
    doc.set_attr(table, "bgcolor", "black");
    let tr = doc.create_element("tr");
    let td = doc.create_element("td");
    doc.set_attr(td, "align", "center");
    doc.set_attr(td, "valign", "middle");
    let font = doc.create_element("font");
    doc.set_attr(font, "color", "white");
    let label = doc.create_text("Video is not supported");

    doc.append_child(font, label);
    doc.append_child(td, font);
    doc.append_child(tr, td);
    doc.append_child(table, tr);
    doc.append_child(placeholder, table);
    doc.replace_with(video, placeholder);
  }
}

fn replace_audio(doc: &mut Document, ctx: &TransformContext) {
  for audio in doc.elements_by_tag(doc.root(), "audio") {
    let source_url = doc
      .descendants(audio)
      .into_iter()
      .find(|&id| doc.is_tag(id, "source"))
      .and_then(|source| doc.attr(source, "src").map(str::to_string))
      .or_else(|| doc.attr(audio, "src").map(str::to_string));

    let Some(source_url) = source_url.filter(|src| !src.trim().is_empty()) else {
      doc.remove(audio);
      continue;
    };

    match resolve_url(&source_url, &ctx.target_url) {
      Some(absolute) => {
        let link = doc.create_element("a");
        doc.set_attr(link, "href", &absolute);
        let label = doc.create_text("Download Audio");
        doc.append_child(link, label);
        doc.replace_with(audio, link);
      }
      None => {
        log::warn!("audio source does not resolve: {source_url}");
        let text = doc.create_text("Audio not available");
        doc.replace_with(audio, text);
      }
    }
  }
}

fn replace_svgs(doc: &mut Document, ctx: &TransformContext) {
  for svg in doc.elements_by_tag(doc.root(), "svg") {
    let width = element_dimension(doc, svg, "width", 100);
    let height = element_dimension(doc, svg, "height", 100);

    let serialized = doc.serialize_subtree(svg);
    let payload = if serialized.trim_start().starts_with("<svg") {
      serialized
    } else {
      PLACEHOLDER_SVG.to_string()
    };
    let data_uri = format!(
      "data:image/svg+xml;base64,{}",
      base64::engine::general_purpose::STANDARD.encode(payload.as_bytes())
    );

    let img = doc.create_element("img");
    doc.set_attr(img, "src", &image_proxy_url(&ctx.proxy_base, &data_uri));
    doc.set_attr(img, "alt", "SVG Image");
    doc.set_attr(img, "width", &width.to_string());
    doc.set_attr(img, "height", &height.to_string());
    constrain_dimensions(doc, img, TARGET_WIDTH);

    doc.replace_with(svg, img);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dom::Document;
  use crate::transform::{Mode, TransformContext};

  fn ctx() -> TransformContext {
    TransformContext::new("https://example.com/page", "", Mode::Web).unwrap()
  }

  fn substituted(html: &str) -> Document {
    let mut doc = Document::parse_html(html).unwrap();
    substitute_media(&mut doc, &ctx());
    doc
  }

  #[test]
  fn video_becomes_labeled_placeholder_at_source_dimensions() {
    let doc = substituted("<body><video width=\"480\" height=\"360\"></video></body>");
    assert!(doc.elements_by_tag(doc.root(), "video").is_empty());
    let body = doc.body().unwrap();
    let placeholder = doc.children(body)[0];
    assert_eq!(doc.attr(placeholder, "bgcolor"), Some("black"));
    assert_eq!(doc.attr(placeholder, "width"), Some("480"));
    assert_eq!(doc.attr(placeholder, "height"), Some("360"));
    assert!(doc.text_content(placeholder).contains("Video is not supported"));
  }

  #[test]
  fn video_without_dimensions_gets_defaults() {
    let doc = substituted("<body><video></video></body>");
    let body = doc.body().unwrap();
    let placeholder = doc.children(body)[0];
    assert_eq!(doc.attr(placeholder, "width"), Some("320"));
    assert_eq!(doc.attr(placeholder, "height"), Some("240"));
  }

  #[test]
  fn audio_with_source_becomes_download_link() {
    let doc = substituted(
      "<body><audio><source src=\"/sounds/clip.mp3\" type=\"audio/mpeg\"></audio></body>",
    );
    assert!(doc.elements_by_tag(doc.root(), "audio").is_empty());
    let link = doc.elements_by_tag(doc.root(), "a")[0];
    assert_eq!(
      doc.attr(link, "href"),
      Some("https://example.com/sounds/clip.mp3")
    );
    assert_eq!(doc.text_content(link), "Download Audio");
  }

  #[test]
  fn sourceless_audio_is_removed() {
    let doc = substituted("<body><p>before</p><audio></audio><p>after</p></body>");
    assert!(doc.elements_by_tag(doc.root(), "audio").is_empty());
    assert!(doc.elements_by_tag(doc.root(), "a").is_empty());
  }

  #[test]
  fn svg_becomes_proxied_data_uri_image() {
    let doc = substituted(
      "<body><svg width=\"40\" height=\"20\"><rect width=\"40\" height=\"20\"/></svg></body>",
    );
    assert!(doc.elements_by_tag(doc.root(), "svg").is_empty());
    let img = doc.elements_by_tag(doc.root(), "img")[0];
    let src = doc.attr(img, "src").unwrap();
    assert!(src.starts_with("/image_proxy?url=data%3Aimage%2Fsvg%2Bxml%3Bbase64%2C"));
    assert_eq!(doc.attr(img, "width"), Some("40"));
    assert_eq!(doc.attr(img, "height"), Some("20"));
    assert_eq!(doc.attr(img, "alt"), Some("SVG Image"));
  }

  #[test]
  fn oversized_svg_is_constrained_like_any_image() {
    let doc = substituted("<body><svg width=\"1280\" height=\"960\"></svg></body>");
    let img = doc.elements_by_tag(doc.root(), "img")[0];
    assert_eq!(doc.attr(img, "width"), Some("640"));
    assert_eq!(doc.attr(img, "height"), Some("480"));
  }
}
