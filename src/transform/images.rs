//! Image rewriting and dimension constraints
//!
//! Routes every `<img>` through the image transcoder and bounds its declared
//! dimensions to the target width. In web mode the element is rebuilt with
//! only the handful of attributes a vintage browser understands; read mode
//! keeps the original set for reading fidelity (the policy pass still strips
//! denied prefixes later).
//!
//! Runs after `<picture>`/srcset resolution (which it relies on for images
//! without a plain `src`) and after SVG substitution (whose output it must
//! not re-proxy).

use crate::config::{TARGET_WIDTH, VIEWPORT_WIDTH};
use crate::dom::{Document, NodeId};
use crate::proxy_url::{image_proxy_url, resolve_url};
use crate::transform::srcset::select_from_srcset;
use crate::transform::TransformContext;

/// Attributes kept on images in web mode, in output order.
const WEB_MODE_IMG_ATTRS: &[&str] = &["src", "alt", "width", "height", "border"];

/// Rewrite all images in the document.
pub fn rewrite_images(doc: &mut Document, ctx: &TransformContext) {
  for img in doc.elements_by_tag(doc.root(), "img") {
    rewrite_one(doc, img, ctx);
  }
}

fn rewrite_one(doc: &mut Document, img: NodeId, ctx: &TransformContext) {
  let mut src = doc
    .attr(img, "src")
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_string);

  if src.is_none() {
    if let Some(srcset) = doc.attr(img, "srcset").map(str::to_string) {
      src = select_from_srcset(&srcset, VIEWPORT_WIDTH);
      if let Some(selected) = &src {
        doc.set_attr(img, "src", selected);
      }
    }
  }

  let Some(src) = src else {
    return;
  };

  // SVG substitution already produced a proxied source.
  let already_proxied = src.starts_with("/image_proxy")
    || (!ctx.proxy_base.is_empty() && src.starts_with(&format!("{}/image_proxy", ctx.proxy_base)));

  if !already_proxied {
    match resolve_url(&src, &ctx.target_url) {
      Some(absolute) => {
        doc.set_attr(img, "src", &image_proxy_url(&ctx.proxy_base, &absolute));
      }
      None => {
        // Best effort: the element keeps its original src.
        log::warn!("image src does not resolve: {src}");
      }
    }
  }

  constrain_dimensions(doc, img, TARGET_WIDTH);

  if !ctx.is_read() {
    rebuild_with_essential_attrs(doc, img);
  }
}

/// Bound the declared width to `max_width`, scaling the declared height
/// proportionally. Images without a declared width are given the maximum
/// outright (no height is forced).
pub fn constrain_dimensions(doc: &mut Document, img: NodeId, max_width: u32) {
  let width = doc.attr(img, "width").and_then(parse_dimension);
  let height = doc.attr(img, "height").and_then(parse_dimension);

  match width {
    Some(original_width) if original_width > max_width => {
      doc.set_attr(img, "width", &max_width.to_string());
      if let Some(original_height) = height {
        if original_height > 0 && original_width > 0 {
          let scaled =
            (original_height as f64 * max_width as f64 / original_width as f64).round() as u32;
          doc.set_attr(img, "height", &scaled.to_string());
        }
      }
    }
    Some(_) => {}
    None => {
      doc.set_attr(img, "width", &max_width.to_string());
    }
  }
}

fn parse_dimension(value: &str) -> Option<u32> {
  let trimmed = value.trim().trim_end_matches("px").trim();
  trimmed.parse::<f32>().ok().and_then(|v| {
    if v.is_finite() && v >= 0.0 {
      Some(v.round() as u32)
    } else {
      None
    }
  })
}

fn rebuild_with_essential_attrs(doc: &mut Document, img: NodeId) {
  let kept: Vec<(String, String)> = WEB_MODE_IMG_ATTRS
    .iter()
    .filter_map(|name| {
      doc
        .attr(img, name)
        .map(|value| (name.to_string(), value.to_string()))
    })
    .collect();
  doc.clear_attrs(img);
  for (name, value) in kept {
    doc.set_attr(img, &name, &value);
  }
}
