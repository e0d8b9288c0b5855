//! Computed-style snapshots
//!
//! The page host produces one read-only [`ComputedStyle`] per element before
//! any mutation runs. The snapshot is an approximation good enough for
//! attribute downgrading: user-agent defaults per tag, inheritance of the
//! text properties, and the element's inline `style` declarations layered on
//! top. It is keyed by `NodeId` and consulted long after the element's
//! attributes have been rewritten; it is never read back from the tree.

use crate::dom::{Document, NodeId};
use std::collections::HashMap;

/// Snapshot of computed style per element, keyed by stable node id.
pub type StyleMap = HashMap<NodeId, ComputedStyle>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
  Inline,
  Block,
  InlineBlock,
  Flex,
  InlineFlex,
  None,
  Other,
}

impl Display {
  /// Displays that render inline for the purposes of div→span substitution.
  pub fn is_inline_like(self) -> bool {
    matches!(
      self,
      Display::Inline | Display::InlineBlock | Display::Flex | Display::InlineFlex
    )
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
  /// Text color as `#rrggbb` or a named color; `None` when never set.
  pub color: Option<String>,
  /// Background color; `None` means transparent.
  pub background_color: Option<String>,
  /// First listed font family, lowercased and unquoted.
  pub font_family: Option<String>,
  pub font_size_px: f32,
  pub font_weight: u16,
  pub italic: bool,
  pub underline: bool,
  pub display: Display,
  /// display:none, visibility:hidden, or the `hidden` attribute.
  pub hidden: bool,
  /// Border widths in px: top, right, bottom, left.
  pub border_widths: [f32; 4],
  pub border_color: Option<String>,
  /// border-collapse: separate (the initial value).
  pub border_separate: bool,
  pub border_spacing_px: u32,
  pub padding_px: u32,
}

impl Default for ComputedStyle {
  fn default() -> Self {
    ComputedStyle {
      color: None,
      background_color: None,
      font_family: None,
      font_size_px: 16.0,
      font_weight: 400,
      italic: false,
      underline: false,
      display: Display::Inline,
      hidden: false,
      border_widths: [0.0; 4],
      border_color: None,
      border_separate: true,
      border_spacing_px: 0,
      padding_px: 0,
    }
  }
}

impl ComputedStyle {
  pub fn max_border_width(&self) -> f32 {
    self.border_widths.iter().copied().fold(0.0, f32::max)
  }

  pub fn has_border(&self) -> bool {
    self.border_widths.iter().any(|&w| w > 0.0)
  }
}

const BLOCK_TAGS: &[&str] = &[
  "address",
  "article",
  "aside",
  "blockquote",
  "body",
  "center",
  "dd",
  "div",
  "dl",
  "dt",
  "fieldset",
  "figure",
  "figcaption",
  "footer",
  "form",
  "h1",
  "h2",
  "h3",
  "h4",
  "h5",
  "h6",
  "header",
  "hr",
  "html",
  "li",
  "main",
  "nav",
  "ol",
  "p",
  "pre",
  "section",
  "table",
  "td",
  "th",
  "tr",
  "ul",
];

const MONOSPACE_TAGS: &[&str] = &["code", "kbd", "pre", "samp", "tt"];

/// Heading font sizes in px, h1 through h6.
const HEADING_SIZES: [f32; 6] = [32.0, 24.0, 18.72, 16.0, 13.28, 10.72];

/// Compute the style snapshot for every element in the document.
///
/// Must run before any pipeline stage mutates the tree: the snapshot is the
/// style downgrader's only view of the page's pre-strip presentation.
pub fn compute_styles(doc: &Document) -> StyleMap {
  let mut styles = StyleMap::new();
  let root_style = ComputedStyle::default();
  let start = doc.html_element().unwrap_or(doc.root());
  compute_subtree(doc, start, &root_style, &mut styles);
  styles
}

fn compute_subtree(doc: &Document, id: NodeId, parent: &ComputedStyle, styles: &mut StyleMap) {
  if !doc.is_element(id) {
    return;
  }
  let style = element_style(doc, id, parent);
  styles.insert(id, style.clone());
  for &child in doc.children(id) {
    compute_subtree(doc, child, &style, styles);
  }
}

fn element_style(doc: &Document, id: NodeId, parent: &ComputedStyle) -> ComputedStyle {
  let tag = doc.tag_name(id).unwrap_or("");

  // Inherit the text properties; boxes and borders start fresh.
  let mut style = ComputedStyle {
    color: parent.color.clone(),
    font_family: parent.font_family.clone(),
    font_size_px: parent.font_size_px,
    font_weight: parent.font_weight,
    italic: parent.italic,
    underline: parent.underline,
    ..ComputedStyle::default()
  };

  apply_tag_defaults(tag, &mut style);

  if doc.has_attr(id, "hidden") {
    style.hidden = true;
  }
  if let Some(bgcolor) = doc.attr(id, "bgcolor") {
    if let Some(color) = normalize_color(bgcolor) {
      style.background_color = Some(color);
    }
  }
  if let Some(border) = doc.attr(id, "border") {
    if let Ok(width) = border.trim().parse::<f32>() {
      style.border_widths = [width; 4];
    }
  }
  if let Some(inline) = doc.attr(id, "style") {
    apply_inline_declarations(inline, &mut style);
  }

  if style.display == Display::None {
    style.hidden = true;
  }
  style
}

fn apply_tag_defaults(tag: &str, style: &mut ComputedStyle) {
  if BLOCK_TAGS.contains(&tag) {
    style.display = Display::Block;
  }
  match tag {
    "b" | "strong" | "th" => style.font_weight = 700,
    "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
      style.font_weight = 700;
      let index = (tag.as_bytes()[1] - b'1') as usize;
      style.font_size_px = HEADING_SIZES[index];
    }
    "i" | "em" | "cite" | "var" => style.italic = true,
    // Anchors are left alone: vintage browsers underline links natively.
    "u" | "ins" => style.underline = true,
    "small" => style.font_size_px *= 0.83,
    "big" => style.font_size_px *= 1.2,
    "script" | "style" | "head" | "template" | "noscript" => style.display = Display::None,
    _ => {}
  }
  if MONOSPACE_TAGS.contains(&tag) {
    style.font_family = Some("monospace".to_string());
    style.font_size_px = 13.0;
  }
}

/// Apply the declarations of one inline `style` attribute.
fn apply_inline_declarations(inline: &str, style: &mut ComputedStyle) {
  for declaration in inline.split(';') {
    let Some((property, value)) = declaration.split_once(':') else {
      continue;
    };
    let property = property.trim().to_ascii_lowercase();
    let value = value.trim();
    if value.is_empty() {
      continue;
    }
    match property.as_str() {
      "color" => style.color = normalize_color(value),
      "background-color" | "background" => {
        if let Some(color) = normalize_color(value) {
          style.background_color = Some(color);
        }
      }
      "font-family" => style.font_family = Some(first_family(value)),
      "font-size" => {
        if let Some(px) = parse_length_px(value) {
          style.font_size_px = px;
        }
      }
      "font-weight" => {
        if let Some(weight) = parse_font_weight(value) {
          style.font_weight = weight;
        }
      }
      "font-style" => {
        style.italic = value.eq_ignore_ascii_case("italic") || value.eq_ignore_ascii_case("oblique");
      }
      "text-decoration" | "text-decoration-line" => {
        style.underline = value.to_ascii_lowercase().contains("underline");
      }
      "display" => style.display = parse_display(value),
      "visibility" => {
        if value.eq_ignore_ascii_case("hidden") || value.eq_ignore_ascii_case("collapse") {
          style.hidden = true;
        }
      }
      "border" | "border-top" | "border-right" | "border-bottom" | "border-left" => {
        apply_border_shorthand(&property, value, style);
      }
      "border-width" => {
        if let Some(px) = first_length_px(value) {
          style.border_widths = [px; 4];
        }
      }
      "border-top-width" => set_border_side(style, 0, value),
      "border-right-width" => set_border_side(style, 1, value),
      "border-bottom-width" => set_border_side(style, 2, value),
      "border-left-width" => set_border_side(style, 3, value),
      "border-color" => style.border_color = normalize_color(value),
      "border-collapse" => style.border_separate = !value.eq_ignore_ascii_case("collapse"),
      "border-spacing" => {
        if let Some(px) = first_length_px(value) {
          style.border_spacing_px = px.round() as u32;
        }
      }
      "padding" => {
        if let Some(px) = first_length_px(value) {
          style.padding_px = px.round() as u32;
        }
      }
      _ => {}
    }
  }
}

fn set_border_side(style: &mut ComputedStyle, side: usize, value: &str) {
  if let Some(px) = parse_length_px(value) {
    style.border_widths[side] = px;
  }
}

/// `border: 1px solid red` and the per-side variants: first length token is
/// the width, first color-parseable token the color.
fn apply_border_shorthand(property: &str, value: &str, style: &mut ComputedStyle) {
  if value.eq_ignore_ascii_case("none") {
    if property == "border" {
      style.border_widths = [0.0; 4];
    }
    return;
  }
  let mut width: Option<f32> = None;
  let mut color: Option<String> = None;
  for token in value.split_whitespace() {
    if width.is_none() {
      if let Some(px) = parse_length_px(token) {
        width = Some(px);
        continue;
      }
    }
    if color.is_none() && !is_border_style_keyword(token) {
      color = normalize_color(token);
    }
  }
  let width = width.unwrap_or(0.0);
  match property {
    "border" => style.border_widths = [width; 4],
    "border-top" => style.border_widths[0] = width,
    "border-right" => style.border_widths[1] = width,
    "border-bottom" => style.border_widths[2] = width,
    "border-left" => style.border_widths[3] = width,
    _ => {}
  }
  if color.is_some() {
    style.border_color = color;
  }
}

fn is_border_style_keyword(token: &str) -> bool {
  matches!(
    token.to_ascii_lowercase().as_str(),
    "solid" | "dashed" | "dotted" | "double" | "groove" | "ridge" | "inset" | "outset" | "hidden"
  )
}

fn parse_display(value: &str) -> Display {
  match value.to_ascii_lowercase().as_str() {
    "inline" => Display::Inline,
    "block" => Display::Block,
    "inline-block" => Display::InlineBlock,
    "flex" => Display::Flex,
    "inline-flex" => Display::InlineFlex,
    "none" => Display::None,
    _ => Display::Other,
  }
}

fn parse_font_weight(value: &str) -> Option<u16> {
  match value.to_ascii_lowercase().as_str() {
    "normal" => Some(400),
    "bold" | "bolder" => Some(700),
    "lighter" => Some(300),
    other => other.parse::<f32>().ok().map(|w| w as u16),
  }
}

fn first_family(value: &str) -> String {
  value
    .split(',')
    .next()
    .unwrap_or("")
    .trim()
    .trim_matches(|c| c == '"' || c == '\'')
    .to_ascii_lowercase()
}

/// Parse a CSS length into px. Percentages and viewport units have no
/// resolvable base here and yield `None`.
pub fn parse_length_px(value: &str) -> Option<f32> {
  let trimmed = value.trim();
  if trimmed.is_empty() || trimmed.ends_with('%') {
    return None;
  }

  let mut end = 0;
  for (idx, ch) in trimmed.char_indices() {
    if matches!(ch, '0'..='9' | '+' | '-' | '.') {
      end = idx + ch.len_utf8();
    } else {
      break;
    }
  }
  if end == 0 {
    return None;
  }

  let number = trimmed[..end].parse::<f32>().ok()?;
  if !number.is_finite() {
    return None;
  }

  let unit = trimmed[end..].trim();
  let px = if unit.is_empty() || unit.eq_ignore_ascii_case("px") {
    number
  } else if unit.eq_ignore_ascii_case("pt") {
    number * (96.0 / 72.0)
  } else if unit.eq_ignore_ascii_case("pc") {
    number * (96.0 / 6.0)
  } else if unit.eq_ignore_ascii_case("in") {
    number * 96.0
  } else if unit.eq_ignore_ascii_case("cm") {
    number * (96.0 / 2.54)
  } else if unit.eq_ignore_ascii_case("mm") {
    number * (96.0 / 25.4)
  } else if unit.eq_ignore_ascii_case("em") || unit.eq_ignore_ascii_case("rem") {
    number * 16.0
  } else {
    return None;
  };

  px.is_finite().then_some(px)
}

fn first_length_px(value: &str) -> Option<f32> {
  value.split_whitespace().find_map(parse_length_px)
}

/// Normalize a CSS color to `#rrggbb` for legacy attributes. Named colors
/// pass through unchanged; fully transparent values yield `None`.
pub fn normalize_color(value: &str) -> Option<String> {
  let trimmed = value.trim();
  if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("transparent") {
    return None;
  }
  if trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
    return Some(trimmed.to_string());
  }
  let color = trimmed.parse::<csscolorparser::Color>().ok()?;
  if color.a <= 0.0 {
    return None;
  }
  Some(format!(
    "#{:02x}{:02x}{:02x}",
    (color.r * 255.0).round() as u8,
    (color.g * 255.0).round() as u8,
    (color.b * 255.0).round() as u8
  ))
}

/// Convert a CSS pixel font size to the legacy HTML `size` attribute (1-7).
pub fn font_size_to_legacy(px: f32) -> u8 {
  if px <= 9.0 {
    1
  } else if px <= 11.0 {
    2
  } else if px <= 13.0 {
    3
  } else if px <= 16.0 {
    4
  } else if px <= 19.0 {
    5
  } else if px <= 24.0 {
    6
  } else {
    7
  }
}

const SANS_FAMILIES: &[&str] = &[
  "arial",
  "helvetica",
  "sans-serif",
  "system-ui",
  "roboto",
  "verdana",
  "tahoma",
  "trebuchet",
  "calibri",
  "segoe ui",
  "open sans",
  "noto sans",
];

const MONO_FAMILIES: &[&str] = &[
  "monospace",
  "courier",
  "consolas",
  "menlo",
  "monaco",
  "source code",
  "fira code",
  "ubuntu mono",
  "andale",
  "lucida console",
];

const DISPLAY_FAMILIES: &[&str] = &[
  "impact",
  "comic sans",
  "futura",
  "gill sans",
  "optima",
  "lucida grande",
  "avenir",
  "copperplate",
  "palatino",
];

/// Map a modern font family to a vintage Mac face.
pub fn map_font_family(family: &str) -> &'static str {
  let family = family.to_ascii_lowercase();
  let matches_any = |list: &[&str]| list.iter().any(|needle| family.contains(needle));
  if matches_any(SANS_FAMILIES) {
    "Geneva"
  } else if matches_any(MONO_FAMILIES) {
    "Monaco"
  } else if matches_any(DISPLAY_FAMILIES) {
    "Chicago"
  } else {
    "Times"
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn font_size_breakpoints_match_legacy_scale() {
    assert_eq!(font_size_to_legacy(8.0), 1);
    assert_eq!(font_size_to_legacy(10.0), 2);
    assert_eq!(font_size_to_legacy(13.0), 3);
    assert_eq!(font_size_to_legacy(16.0), 4);
    assert_eq!(font_size_to_legacy(18.0), 5);
    assert_eq!(font_size_to_legacy(24.0), 6);
    assert_eq!(font_size_to_legacy(40.0), 7);
  }

  #[test]
  fn rgb_colors_become_hex() {
    assert_eq!(
      normalize_color("rgb(255, 0, 128)"),
      Some("#ff0080".to_string())
    );
    assert_eq!(normalize_color("#abc"), Some("#aabbcc".to_string()));
  }

  #[test]
  fn named_colors_pass_through() {
    assert_eq!(normalize_color("RebeccaPurple"), Some("RebeccaPurple".to_string()));
    assert_eq!(normalize_color("black"), Some("black".to_string()));
  }

  #[test]
  fn transparent_colors_are_dropped() {
    assert_eq!(normalize_color("transparent"), None);
    assert_eq!(normalize_color("rgba(0, 0, 0, 0)"), None);
  }

  #[test]
  fn family_classes_map_to_mac_faces() {
    assert_eq!(map_font_family("Helvetica Neue"), "Geneva");
    assert_eq!(map_font_family("Fira Code"), "Monaco");
    assert_eq!(map_font_family("Comic Sans MS"), "Chicago");
    assert_eq!(map_font_family("Georgia"), "Times");
  }

  #[test]
  fn lengths_convert_to_px() {
    assert_eq!(parse_length_px("12px"), Some(12.0));
    assert_eq!(parse_length_px("12pt"), Some(16.0));
    assert_eq!(parse_length_px("1in"), Some(96.0));
    assert_eq!(parse_length_px("2em"), Some(32.0));
    assert_eq!(parse_length_px("50%"), None);
    assert_eq!(parse_length_px("auto"), None);
  }

  #[test]
  fn inline_declarations_override_defaults() {
    let doc = crate::dom::Document::parse_html(
      "<div style=\"color: rgb(200,0,0); font-weight: bold; display: inline-block\">x</div>",
    )
    .unwrap();
    let styles = compute_styles(&doc);
    let div = doc.elements_by_tag(doc.root(), "div")[0];
    let style = &styles[&div];
    assert_eq!(style.color.as_deref(), Some("#c80000"));
    assert_eq!(style.font_weight, 700);
    assert_eq!(style.display, Display::InlineBlock);
  }

  #[test]
  fn text_properties_inherit_from_ancestors() {
    let doc = crate::dom::Document::parse_html(
      "<div style=\"color: #112233; font-size: 28px\"><p><span>deep</span></p></div>",
    )
    .unwrap();
    let styles = compute_styles(&doc);
    let span = doc.elements_by_tag(doc.root(), "span")[0];
    let style = &styles[&span];
    assert_eq!(style.color.as_deref(), Some("#112233"));
    assert_eq!(style.font_size_px, 28.0);
    // Backgrounds do not inherit.
    assert_eq!(style.background_color, None);
  }

  #[test]
  fn headings_and_emphasis_have_ua_defaults() {
    let doc =
      crate::dom::Document::parse_html("<h1>title</h1><em>it</em><code>mono</code>").unwrap();
    let styles = compute_styles(&doc);
    let h1 = doc.elements_by_tag(doc.root(), "h1")[0];
    assert_eq!(styles[&h1].font_weight, 700);
    assert_eq!(styles[&h1].font_size_px, 32.0);
    let em = doc.elements_by_tag(doc.root(), "em")[0];
    assert!(styles[&em].italic);
    let code = doc.elements_by_tag(doc.root(), "code")[0];
    assert_eq!(styles[&code].font_family.as_deref(), Some("monospace"));
  }

  #[test]
  fn border_shorthand_sets_width_and_color() {
    let doc = crate::dom::Document::parse_html(
      "<table style=\"border: 2px solid red; border-collapse: collapse\"></table>",
    )
    .unwrap();
    let styles = compute_styles(&doc);
    let table = doc.elements_by_tag(doc.root(), "table")[0];
    let style = &styles[&table];
    assert_eq!(style.max_border_width(), 2.0);
    assert_eq!(style.border_color.as_deref(), Some("red"));
    assert!(!style.border_separate);
  }

  #[test]
  fn hidden_elements_are_flagged() {
    let doc = crate::dom::Document::parse_html(
      "<div style=\"display:none\">a</div><p style=\"visibility: hidden\">b</p><span hidden>c</span>",
    )
    .unwrap();
    let styles = compute_styles(&doc);
    for tag in ["div", "p", "span"] {
      let id = doc.elements_by_tag(doc.root(), tag)[0];
      assert!(styles[&id].hidden, "{tag} should be hidden");
    }
  }
}
