//! Minimal SVG rasterization
//!
//! The image transcoder has to turn inline SVG (icons, logos, the media
//! substituter's data URIs) into honest raster bytes. This rasterizer covers
//! plain-filled paths, rects, circles, ellipses and polygons with a viewBox
//! mapping; anything fancier (strokes, gradients, transforms, arcs) is
//! rejected so the caller can fail the transcode instead of emitting wrong
//! pixels.

use crate::error::{Error, ImageError, Result};
use roxmltree::{Document, Node};
use svgtypes::{PathParser, PathSegment};
use tiny_skia::{FillRule, Paint, Path, PathBuilder, Pixmap, Rect, Transform};

#[derive(Clone, Copy, Debug)]
struct ViewBox {
  min_x: f32,
  min_y: f32,
  width: f32,
  height: f32,
}

/// Parse an SVG length attribute into px. Percentages are unresolvable here.
fn parse_svg_length_px(value: &str) -> Option<f32> {
  let trimmed = value.trim();
  if trimmed.is_empty() || trimmed.ends_with('%') {
    return None;
  }

  let mut end = 0;
  for (idx, ch) in trimmed.char_indices() {
    if matches!(ch, '0'..='9' | '+' | '-' | '.' | 'e' | 'E') {
      end = idx + ch.len_utf8();
    } else {
      break;
    }
  }
  if end == 0 {
    return None;
  }

  let number = trimmed[..end].parse::<f32>().ok()?;
  let unit = trimmed[end..].trim_start();
  let px = if unit.is_empty() || unit.eq_ignore_ascii_case("px") {
    number
  } else if unit.eq_ignore_ascii_case("pt") {
    number * (96.0 / 72.0)
  } else if unit.eq_ignore_ascii_case("in") {
    number * 96.0
  } else if unit.eq_ignore_ascii_case("cm") {
    number * (96.0 / 2.54)
  } else if unit.eq_ignore_ascii_case("mm") {
    number * (96.0 / 25.4)
  } else {
    return None;
  };

  px.is_finite().then_some(px)
}

fn parse_view_box(value: &str) -> Option<ViewBox> {
  let mut nums = value
    .split(|c: char| c == ',' || c.is_whitespace())
    .filter(|s| !s.is_empty())
    .filter_map(|s| s.parse::<f32>().ok());
  let min_x = nums.next()?;
  let min_y = nums.next()?;
  let width = nums.next()?;
  let height = nums.next()?;
  (width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()).then_some(ViewBox {
    min_x,
    min_y,
    width,
    height,
  })
}

/// Case-insensitive attribute lookup; the HTML parser lowercases attribute
/// names it does not recognize as SVG-adjusted.
fn svg_attr<'a>(node: &Node<'a, '_>, name: &str) -> Option<&'a str> {
  node
    .attributes()
    .find(|attr| attr.name().eq_ignore_ascii_case(name))
    .map(|attr| attr.value())
}

fn unsupported(reason: &str) -> Error {
  Error::Image(ImageError::UnsupportedSvg {
    reason: reason.to_string(),
  })
}

struct FillColor {
  r: u8,
  g: u8,
  b: u8,
  a: f32,
}

fn parse_fill(node: &Node<'_, '_>) -> Option<FillColor> {
  let mut color = match svg_attr(node, "fill") {
    None => FillColor {
      r: 0,
      g: 0,
      b: 0,
      a: 1.0,
    },
    Some(value) => {
      let trimmed = value.trim();
      if trimmed.eq_ignore_ascii_case("none") {
        return None;
      }
      let parsed = trimmed.parse::<csscolorparser::Color>().ok()?;
      FillColor {
        r: (parsed.r * 255.0).round() as u8,
        g: (parsed.g * 255.0).round() as u8,
        b: (parsed.b * 255.0).round() as u8,
        a: parsed.a,
      }
    }
  };

  for opacity_attr in ["opacity", "fill-opacity"] {
    if let Some(raw) = svg_attr(node, opacity_attr) {
      if let Ok(alpha) = raw.trim().parse::<f32>() {
        if alpha.is_finite() {
          color.a = (color.a * alpha).clamp(0.0, 1.0);
        }
      }
    }
  }

  (color.a > 0.0).then_some(color)
}

fn build_path(data: &str) -> Result<Path> {
  let mut pb = PathBuilder::new();
  let mut current = (0.0f32, 0.0f32);
  let mut start = (0.0f32, 0.0f32);
  let mut last_cubic: Option<(f32, f32)> = None;
  let mut last_quad: Option<(f32, f32)> = None;

  for segment in PathParser::from(data) {
    let segment = segment.map_err(|e| unsupported(&format!("bad path data: {e}")))?;
    match segment {
      PathSegment::MoveTo { abs, x, y } => {
        let (nx, ny) = resolve(abs, current, x, y);
        pb.move_to(nx, ny);
        current = (nx, ny);
        start = current;
        last_cubic = None;
        last_quad = None;
      }
      PathSegment::LineTo { abs, x, y } => {
        let (nx, ny) = resolve(abs, current, x, y);
        pb.line_to(nx, ny);
        current = (nx, ny);
        last_cubic = None;
        last_quad = None;
      }
      PathSegment::HorizontalLineTo { abs, x } => {
        let nx = if abs { x as f32 } else { current.0 + x as f32 };
        pb.line_to(nx, current.1);
        current.0 = nx;
        last_cubic = None;
        last_quad = None;
      }
      PathSegment::VerticalLineTo { abs, y } => {
        let ny = if abs { y as f32 } else { current.1 + y as f32 };
        pb.line_to(current.0, ny);
        current.1 = ny;
        last_cubic = None;
        last_quad = None;
      }
      PathSegment::CurveTo {
        abs,
        x1,
        y1,
        x2,
        y2,
        x,
        y,
      } => {
        let (c1x, c1y) = resolve(abs, current, x1, y1);
        let (c2x, c2y) = resolve(abs, current, x2, y2);
        let (nx, ny) = resolve(abs, current, x, y);
        pb.cubic_to(c1x, c1y, c2x, c2y, nx, ny);
        last_cubic = Some((c2x, c2y));
        last_quad = None;
        current = (nx, ny);
      }
      PathSegment::SmoothCurveTo { abs, x2, y2, x, y } => {
        let (c1x, c1y) = match last_cubic {
          Some((px, py)) => (2.0 * current.0 - px, 2.0 * current.1 - py),
          None => current,
        };
        let (c2x, c2y) = resolve(abs, current, x2, y2);
        let (nx, ny) = resolve(abs, current, x, y);
        pb.cubic_to(c1x, c1y, c2x, c2y, nx, ny);
        last_cubic = Some((c2x, c2y));
        last_quad = None;
        current = (nx, ny);
      }
      PathSegment::Quadratic { abs, x1, y1, x, y } => {
        let (cx, cy) = resolve(abs, current, x1, y1);
        let (nx, ny) = resolve(abs, current, x, y);
        pb.quad_to(cx, cy, nx, ny);
        last_quad = Some((cx, cy));
        last_cubic = None;
        current = (nx, ny);
      }
      PathSegment::SmoothQuadratic { abs, x, y } => {
        let (cx, cy) = match last_quad {
          Some((px, py)) => (2.0 * current.0 - px, 2.0 * current.1 - py),
          None => current,
        };
        let (nx, ny) = resolve(abs, current, x, y);
        pb.quad_to(cx, cy, nx, ny);
        last_quad = Some((cx, cy));
        last_cubic = None;
        current = (nx, ny);
      }
      PathSegment::ClosePath { .. } => {
        pb.close();
        current = start;
        last_cubic = None;
        last_quad = None;
      }
      PathSegment::EllipticalArc { .. } => {
        return Err(unsupported("elliptical arc path segments"));
      }
    }
  }

  pb.finish().ok_or_else(|| unsupported("empty path"))
}

fn resolve(abs: bool, current: (f32, f32), x: f64, y: f64) -> (f32, f32) {
  if abs {
    (x as f32, y as f32)
  } else {
    (current.0 + x as f32, current.1 + y as f32)
  }
}

fn shape_path(node: &Node<'_, '_>) -> Result<Option<Path>> {
  let name = node.tag_name().name();
  let get = |attr: &str| -> f32 {
    svg_attr(node, attr)
      .and_then(parse_svg_length_px)
      .unwrap_or(0.0)
  };

  let path = if name.eq_ignore_ascii_case("path") {
    match svg_attr(node, "d") {
      Some(data) => Some(build_path(data)?),
      None => None,
    }
  } else if name.eq_ignore_ascii_case("rect") {
    let (w, h) = (get("width"), get("height"));
    if w > 0.0 && h > 0.0 {
      Rect::from_xywh(get("x"), get("y"), w, h).map(PathBuilder::from_rect)
    } else {
      None
    }
  } else if name.eq_ignore_ascii_case("circle") {
    let r = get("r");
    (r > 0.0)
      .then(|| PathBuilder::from_circle(get("cx"), get("cy"), r))
      .flatten()
  } else if name.eq_ignore_ascii_case("ellipse") {
    let (rx, ry) = (get("rx"), get("ry"));
    if rx > 0.0 && ry > 0.0 {
      let (cx, cy) = (get("cx"), get("cy"));
      Rect::from_xywh(cx - rx, cy - ry, rx * 2.0, ry * 2.0).and_then(PathBuilder::from_oval)
    } else {
      None
    }
  } else if name.eq_ignore_ascii_case("polygon") {
    polygon_path(svg_attr(node, "points").unwrap_or(""))
  } else {
    None
  };

  Ok(path)
}

fn polygon_path(points: &str) -> Option<Path> {
  let mut nums = points
    .split(|c: char| c == ',' || c.is_whitespace())
    .filter(|s| !s.is_empty())
    .filter_map(|s| s.parse::<f32>().ok());
  let mut pb = PathBuilder::new();
  let first = (nums.next()?, nums.next()?);
  pb.move_to(first.0, first.1);
  while let (Some(x), Some(y)) = (nums.next(), nums.next()) {
    pb.line_to(x, y);
  }
  pb.close();
  pb.finish()
}

/// Rasterize SVG content into a pixmap fitting within `max_width` ×
/// `max_height` (never upscaling past the intrinsic size).
pub fn rasterize_svg(content: &str, max_width: u32, max_height: u32) -> Result<Pixmap> {
  let doc =
    Document::parse(content).map_err(|e| unsupported(&format!("unparseable XML: {e}")))?;
  let root = doc.root_element();
  if !root.tag_name().name().eq_ignore_ascii_case("svg") {
    return Err(unsupported("root element is not <svg>"));
  }

  let view_box = svg_attr(&root, "viewBox").and_then(parse_view_box);
  let intrinsic = {
    let w = svg_attr(&root, "width").and_then(parse_svg_length_px);
    let h = svg_attr(&root, "height").and_then(parse_svg_length_px);
    match (w, h, view_box) {
      (Some(w), Some(h), _) if w > 0.0 && h > 0.0 => (w, h),
      (_, _, Some(vb)) => (vb.width, vb.height),
      _ => (300.0, 150.0),
    }
  };

  let scale = (max_width as f32 / intrinsic.0)
    .min(max_height as f32 / intrinsic.1)
    .min(1.0);
  let render_w = (intrinsic.0 * scale).round().max(1.0) as u32;
  let render_h = (intrinsic.1 * scale).round().max(1.0) as u32;

  let view_box = view_box.unwrap_or(ViewBox {
    min_x: 0.0,
    min_y: 0.0,
    width: intrinsic.0,
    height: intrinsic.1,
  });

  // Uniform xMidYMid-meet mapping from user units onto the render box.
  let fit = (render_w as f32 / view_box.width).min(render_h as f32 / view_box.height);
  let offset_x = (render_w as f32 - view_box.width * fit) * 0.5;
  let offset_y = (render_h as f32 - view_box.height * fit) * 0.5;
  let transform = Transform::from_row(
    fit,
    0.0,
    0.0,
    fit,
    offset_x - view_box.min_x * fit,
    offset_y - view_box.min_y * fit,
  );

  let mut pixmap =
    Pixmap::new(render_w, render_h).ok_or_else(|| unsupported("zero-sized render box"))?;

  for node in root.descendants().filter(|n| n.is_element()) {
    let name = node.tag_name().name();
    if name.eq_ignore_ascii_case("defs") || in_defs(&node) {
      continue;
    }
    if svg_attr(&node, "transform").is_some() {
      return Err(unsupported("element transforms"));
    }

    let Some(path) = shape_path(&node)? else {
      continue;
    };
    let Some(color) = parse_fill(&node) else {
      continue;
    };

    let fill_rule = match svg_attr(&node, "fill-rule").map(str::trim) {
      Some(v) if v.eq_ignore_ascii_case("evenodd") => FillRule::EvenOdd,
      _ => FillRule::Winding,
    };

    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, (color.a * 255.0).round() as u8);
    paint.anti_alias = true;
    pixmap.fill_path(&path, &paint, fill_rule, transform, None);
  }

  Ok(pixmap)
}

fn in_defs(node: &Node<'_, '_>) -> bool {
  node
    .ancestors()
    .any(|a| a.is_element() && a.tag_name().name().eq_ignore_ascii_case("defs"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fills_a_rect_with_its_color() {
    let pixmap = rasterize_svg(
      "<svg width=\"10\" height=\"10\"><rect width=\"10\" height=\"10\" fill=\"#ff0000\"/></svg>",
      640,
      480,
    )
    .unwrap();
    assert_eq!(pixmap.width(), 10);
    assert_eq!(pixmap.height(), 10);
    let px = pixmap.pixel(5, 5).unwrap().demultiply();
    assert_eq!((px.red(), px.green(), px.blue()), (255, 0, 0));
  }

  #[test]
  fn default_fill_is_black() {
    let pixmap = rasterize_svg(
      "<svg width=\"4\" height=\"4\"><rect width=\"4\" height=\"4\"/></svg>",
      640,
      480,
    )
    .unwrap();
    let px = pixmap.pixel(2, 2).unwrap().demultiply();
    assert_eq!((px.red(), px.green(), px.blue(), px.alpha()), (0, 0, 0, 255));
  }

  #[test]
  fn view_box_scales_into_the_render_box() {
    // 100-unit viewBox rendered at declared 50px size.
    let pixmap = rasterize_svg(
      "<svg width=\"50\" height=\"50\" viewBox=\"0 0 100 100\">\
       <circle cx=\"50\" cy=\"50\" r=\"50\" fill=\"blue\"/></svg>",
      640,
      480,
    )
    .unwrap();
    assert_eq!(pixmap.width(), 50);
    let center = pixmap.pixel(25, 25).unwrap().demultiply();
    assert_eq!(center.blue(), 255);
    // Corners are outside the circle.
    assert_eq!(pixmap.pixel(1, 1).unwrap().alpha(), 0);
  }

  #[test]
  fn oversized_svgs_are_scaled_down_never_up() {
    let big = rasterize_svg("<svg width=\"1280\" height=\"960\"></svg>", 640, 480).unwrap();
    assert_eq!((big.width(), big.height()), (640, 480));
    let small = rasterize_svg("<svg width=\"20\" height=\"10\"></svg>", 640, 480).unwrap();
    assert_eq!((small.width(), small.height()), (20, 10));
  }

  #[test]
  fn fill_none_draws_nothing() {
    let pixmap = rasterize_svg(
      "<svg width=\"4\" height=\"4\"><rect width=\"4\" height=\"4\" fill=\"none\"/></svg>",
      640,
      480,
    )
    .unwrap();
    assert_eq!(pixmap.pixel(2, 2).unwrap().alpha(), 0);
  }

  #[test]
  fn paths_with_lines_and_close_render() {
    let pixmap = rasterize_svg(
      "<svg width=\"10\" height=\"10\"><path d=\"M0 0 L10 0 L10 10 L0 10 Z\" fill=\"#00ff00\"/></svg>",
      640,
      480,
    )
    .unwrap();
    let px = pixmap.pixel(5, 5).unwrap().demultiply();
    assert_eq!(px.green(), 255);
  }

  #[test]
  fn arcs_are_rejected_not_mangled() {
    let error = rasterize_svg(
      "<svg width=\"10\" height=\"10\"><path d=\"M0 0 A5 5 0 0 1 10 10\"/></svg>",
      640,
      480,
    )
    .unwrap_err();
    assert!(format!("{error}").contains("arc"));
  }

  #[test]
  fn non_svg_roots_are_rejected() {
    assert!(rasterize_svg("<div>nope</div>", 640, 480).is_err());
    assert!(rasterize_svg("not xml at all", 640, 480).is_err());
  }

  #[test]
  fn polygons_render_as_closed_shapes() {
    let pixmap = rasterize_svg(
      "<svg width=\"10\" height=\"10\"><polygon points=\"0,0 10,0 5,10\" fill=\"black\"/></svg>",
      640,
      480,
    )
    .unwrap();
    assert_eq!(pixmap.pixel(5, 2).unwrap().demultiply().alpha(), 255);
  }
}
