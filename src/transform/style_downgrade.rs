//! Computed-style → legacy-attribute downgrading
//!
//! Two passes over the pre-mutation style snapshot. The first pass records
//! per-element decisions (font wrapper attributes, bold/italic/underline
//! wraps, div→span substitution) and attaches the attribute-only downgrades
//! (`bgcolor`, `border`, table cell metrics) directly. The second pass
//! materializes wrappers in nesting order: `<font>` innermost, then
//! `<b>`/`<i>`/`<u>`. Wrapping is guarded so a second run over the same
//! element changes nothing.

use crate::dom::{Document, NodeId};
use crate::style::{font_size_to_legacy, map_font_family, ComputedStyle, StyleMap};
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
struct FontAttrs {
  color: Option<String>,
  face: Option<String>,
  size: Option<String>,
}

#[derive(Debug, Default, Clone)]
struct Marks {
  font: Option<FontAttrs>,
  bold: bool,
  italic: bool,
  underline: bool,
  to_span: bool,
}

/// Downgrade every element's computed style into legacy markup.
pub fn downgrade_styles(doc: &mut Document, styles: &StyleMap) {
  let mut marked: Vec<(NodeId, Marks)> = Vec::new();

  for id in doc.all_elements() {
    let Some(style) = styles.get(&id) else {
      continue;
    };
    let tag = doc.tag_name(id).unwrap_or("").to_string();
    let mut marks = Marks::default();

    // Font wrapper only makes sense where text actually sits.
    if doc.has_direct_text(id) {
      marks.font = font_attrs_for(style);
    }

    if style.font_weight >= 600 && tag != "b" && tag != "strong" {
      marks.bold = true;
    }
    if style.italic && tag != "i" && tag != "em" {
      marks.italic = true;
    }
    if style.underline && tag != "u" && tag != "a" {
      marks.underline = true;
    }
    if tag == "div" && style.display.is_inline_like() {
      marks.to_span = true;
    }

    if let Some(bg) = &style.background_color {
      doc.set_attr(id, "bgcolor", bg);
    }

    if style.has_border() {
      let width = style.max_border_width().round() as u32;
      doc.set_attr(id, "border", &width.to_string());

      if tag == "table" {
        if let Some(border_color) = &style.border_color {
          doc.set_attr(id, "bordercolor", border_color);
        }
        let cellspacing = if style.border_separate {
          style.border_spacing_px.max(2)
        } else {
          0
        };
        doc.set_attr(id, "cellspacing", &cellspacing.to_string());
        let cellpadding = style.padding_px.max(1);
        doc.set_attr(id, "cellpadding", &cellpadding.to_string());
      }
    }

    if marks.font.is_some() || marks.bold || marks.italic || marks.underline || marks.to_span {
      marked.push((id, marks));
    }
  }

  // Second pass: materialize. Font wrappers first so they end up innermost.
  for (id, marks) in &marked {
    if let Some(font) = &marks.font {
      wrap_in_font(doc, *id, font);
    }
  }

  // div→span substitution; wrap marks carry over to the replacement node.
  let mut replaced: HashMap<NodeId, NodeId> = HashMap::new();
  for (id, marks) in &marked {
    if marks.to_span {
      let span = doc.create_element("span");
      for (name, value) in doc.attrs(*id) {
        doc.set_attr(span, &name, &value);
      }
      doc.reparent_children(*id, span);
      doc.replace_with(*id, span);
      replaced.insert(*id, span);
    }
  }

  for (id, marks) in &marked {
    let target = replaced.get(id).copied().unwrap_or(*id);
    if marks.bold {
      wrap_contents(doc, target, "b");
    }
    if marks.italic {
      wrap_contents(doc, target, "i");
    }
    if marks.underline {
      wrap_contents(doc, target, "u");
    }
  }
}

fn font_attrs_for(style: &ComputedStyle) -> Option<FontAttrs> {
  let color = style.color.clone();
  let face = style.font_family.as_deref().map(map_font_family);
  let size = font_size_to_legacy(style.font_size_px);

  let default_color = match color.as_deref() {
    None => true,
    Some(c) => c.eq_ignore_ascii_case("#000000") || c.eq_ignore_ascii_case("black"),
  };
  let default_face = match face {
    None => true,
    Some(f) => f == "Times",
  };
  let default_size = size == 4;

  if default_color && default_face && default_size {
    return None;
  }

  Some(FontAttrs {
    color,
    face: face.map(str::to_string),
    size: Some(size.to_string()),
  })
}

fn wrap_in_font(doc: &mut Document, id: NodeId, attrs: &FontAttrs) {
  // Re-running the downgrade must not stack font tags.
  if doc.contains_tag(id, "font") {
    return;
  }
  let font = doc.create_element("font");
  if let Some(color) = &attrs.color {
    doc.set_attr(font, "color", color);
  }
  if let Some(face) = &attrs.face {
    doc.set_attr(font, "face", face);
  }
  if let Some(size) = &attrs.size {
    doc.set_attr(font, "size", size);
  }
  doc.reparent_children(id, font);
  doc.append_child(id, font);
}

/// Move the element's children into a fresh wrapper, guarded for idempotence
/// (no wrap when the element has no text or already contains the tag).
fn wrap_contents(doc: &mut Document, id: NodeId, tag: &str) {
  if doc.text_content(id).trim().is_empty() || doc.contains_tag(id, tag) {
    return;
  }
  let wrapper = doc.create_element(tag);
  doc.reparent_children(id, wrapper);
  doc.append_child(id, wrapper);
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dom::Document;
  use crate::style::compute_styles;

  fn downgraded(html: &str) -> (Document, Vec<NodeId>) {
    let mut doc = Document::parse_html(html).unwrap();
    let styles = compute_styles(&doc);
    downgrade_styles(&mut doc, &styles);
    let body = doc.body().unwrap();
    let children = doc.children(body).to_vec();
    (doc, children)
  }

  #[test]
  fn colored_text_gets_a_font_wrapper() {
    let (doc, _) = downgraded("<body><p style=\"color: rgb(200, 0, 0)\">hot</p></body>");
    let font = doc.elements_by_tag(doc.root(), "font");
    assert_eq!(font.len(), 1);
    assert_eq!(doc.attr(font[0], "color"), Some("#c80000"));
    assert_eq!(doc.text_content(font[0]), "hot");
  }

  #[test]
  fn default_styles_emit_no_wrapper() {
    let (doc, _) = downgraded("<body><p>plain text</p></body>");
    assert!(doc.elements_by_tag(doc.root(), "font").is_empty());
    assert!(doc.elements_by_tag(doc.root(), "b").is_empty());
  }

  #[test]
  fn empty_containers_get_no_font_wrapper() {
    let (doc, _) = downgraded("<body><div style=\"color: red\"><p>inside</p></div></body>");
    // The div has no direct text; only the p (which inherits red) qualifies.
    let fonts = doc.elements_by_tag(doc.root(), "font");
    assert_eq!(fonts.len(), 1);
    let parent = doc.parent(fonts[0]).unwrap();
    assert!(doc.is_tag(parent, "p"));
  }

  #[test]
  fn heavy_weight_wraps_in_b_but_not_on_b_itself() {
    let (doc, _) = downgraded(
      "<body><span style=\"font-weight: 700\">heavy</span><b>already</b></body>",
    );
    let spans = doc.elements_by_tag(doc.root(), "span");
    assert!(doc.contains_tag(spans[0], "b"));
    let bolds = doc.elements_by_tag(doc.root(), "b");
    // One wrapper inside the span, plus the original b untouched.
    assert_eq!(bolds.len(), 2);
    for b in bolds {
      assert!(!doc.contains_tag(doc.children(b)[0], "b"));
    }
  }

  #[test]
  fn italic_and_underline_wrap_in_order() {
    let (doc, _) = downgraded(
      "<body><span style=\"font-style: italic; text-decoration: underline\">both</span></body>",
    );
    let span = doc.elements_by_tag(doc.root(), "span")[0];
    // Underline wraps last, so it is the outermost: span > u > i.
    let u = doc.elements_by_tag(span, "u");
    let i = doc.elements_by_tag(span, "i");
    assert_eq!(u.len(), 1);
    assert_eq!(i.len(), 1);
    assert!(doc.descendants(u[0]).contains(&i[0]));
  }

  #[test]
  fn downgrade_is_idempotent_for_wrappers() {
    let mut doc =
      Document::parse_html("<body><p style=\"color: #aa0000\">text</p></body>").unwrap();
    let styles = compute_styles(&doc);
    downgrade_styles(&mut doc, &styles);
    let once = doc.serialize();
    downgrade_styles(&mut doc, &styles);
    assert_eq!(doc.serialize(), once);
  }

  #[test]
  fn inline_displayed_div_becomes_span() {
    let (doc, _) = downgraded(
      "<body><div style=\"display: inline-block\" id=\"badge\">x</div></body>",
    );
    assert!(doc.elements_by_tag(doc.root(), "div").is_empty());
    let span = doc.elements_by_tag(doc.root(), "span")[0];
    assert_eq!(doc.attr(span, "id"), Some("badge"));
    assert_eq!(doc.text_content(span), "x");
  }

  #[test]
  fn background_color_becomes_bgcolor_attribute() {
    let (doc, _) = downgraded("<body><div style=\"background-color: #123456\">x</div></body>");
    let div = doc.elements_by_tag(doc.root(), "div")[0];
    assert_eq!(doc.attr(div, "bgcolor"), Some("#123456"));
  }

  #[test]
  fn bordered_table_gets_cell_metrics() {
    let (doc, _) = downgraded(
      "<body><table style=\"border: 3px solid #00ff00; border-collapse: collapse\">\
       <tr><td>x</td></tr></table></body>",
    );
    let table = doc.elements_by_tag(doc.root(), "table")[0];
    assert_eq!(doc.attr(table, "border"), Some("3"));
    assert_eq!(doc.attr(table, "bordercolor"), Some("#00ff00"));
    assert_eq!(doc.attr(table, "cellspacing"), Some("0"));
    assert_eq!(doc.attr(table, "cellpadding"), Some("1"));
  }

  #[test]
  fn monospace_text_maps_to_monaco_face() {
    let (doc, _) = downgraded("<body><code>let x = 1;</code></body>");
    let font = doc.elements_by_tag(doc.root(), "font");
    assert_eq!(font.len(), 1);
    assert_eq!(doc.attr(font[0], "face"), Some("Monaco"));
    assert_eq!(doc.attr(font[0], "size"), Some("3"));
  }
}
