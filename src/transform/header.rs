//! Navigation header injection and body presentation attributes
//!
//! Every proxied page gets a header as the first child of `<body>`: a link
//! back home, a URL form resubmitting through `/proxy`, and a toggle between
//! web and reader mode. Runs last in the pipeline so the link rewriter and
//! attribute policy never touch the header's own markup.

use crate::dom::{Document, NodeId};
use crate::proxy_url::{encode_component, proxy_page_url};
use crate::transform::TransformContext;

const NBSP3: &str = "\u{a0}\u{a0}\u{a0}";

/// Basic presentation attributes a CSS-less browser falls back on.
pub fn set_body_attributes(doc: &mut Document) {
  let Some(body) = doc.body() else {
    return;
  };
  doc.set_attr(body, "bgcolor", "white");
  doc.set_attr(body, "text", "black");
  doc.set_attr(body, "link", "blue");
  doc.set_attr(body, "vlink", "purple");
}

/// Inject the navigation header as the first child of `<body>`.
pub fn inject_header(doc: &mut Document, ctx: &TransformContext) {
  let Some(body) = doc.body() else {
    return;
  };
  let header = build_header(doc, ctx);
  doc.prepend_child(body, header);
}

fn build_header(doc: &mut Document, ctx: &TransformContext) -> NodeId {
  let target = ctx.target_url.as_str().to_string();
  let base = ctx.proxy_base.clone();
  let reading = ctx.is_read();

  let center = doc.create_element("center");
  let form = doc.create_element("form");
  doc.set_attr(form, "action", &format!("{base}/proxy"));
  doc.set_attr(form, "method", "get");

  // "Back to Retronet" home link.
  let home = doc.create_element("a");
  doc.set_attr(home, "href", &format!("{base}/"));
  let back_text = doc.create_text("Back to ");
  let brand = doc.create_element("font");
  doc.set_attr(brand, "face", "Courier");
  let brand_text = doc.create_text("Retronet");
  doc.append_child(brand, brand_text);
  doc.append_child(home, back_text);
  doc.append_child(home, brand);
  doc.append_child(form, home);
  let pad = doc.create_text(NBSP3);
  doc.append_child(form, pad);

  // URL entry and submit.
  let url_input = doc.create_element("input");
  doc.set_attr(url_input, "type", "text");
  doc.set_attr(url_input, "name", "url");
  doc.set_attr(url_input, "value", &target);
  doc.set_attr(url_input, "size", "30");
  doc.append_child(form, url_input);

  let submit = doc.create_element("input");
  doc.set_attr(submit, "type", "submit");
  doc.set_attr(submit, "value", "Go");
  doc.append_child(form, submit);
  let pad = doc.create_text(NBSP3);
  doc.append_child(form, pad);

  // Mode toggle: the reader view links back to the web view and vice versa.
  let toggle = doc.create_element("a");
  let toggle_href = if reading {
    format!("{base}/proxy?url={}", encode_component(&target))
  } else {
    proxy_page_url(&base, &target, true)
  };
  doc.set_attr(toggle, "href", &toggle_href);
  let toggle_text = doc.create_text(if reading { "Use Web" } else { "Use Reader" });
  doc.append_child(toggle, toggle_text);
  doc.append_child(form, toggle);

  doc.append_child(center, form);
  let rule = doc.create_element("hr");
  doc.append_child(center, rule);
  center
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dom::Document;
  use crate::transform::{Mode, TransformContext};

  fn ctx(mode: Mode) -> TransformContext {
    TransformContext::new("https://example.com/page", "", mode).unwrap()
  }

  #[test]
  fn body_attributes_are_set() {
    let mut doc = Document::parse_html("<body><p>x</p></body>").unwrap();
    set_body_attributes(&mut doc);
    let body = doc.body().unwrap();
    assert_eq!(doc.attr(body, "bgcolor"), Some("white"));
    assert_eq!(doc.attr(body, "text"), Some("black"));
    assert_eq!(doc.attr(body, "link"), Some("blue"));
    assert_eq!(doc.attr(body, "vlink"), Some("purple"));
  }

  #[test]
  fn header_is_first_child_of_body() {
    let mut doc = Document::parse_html("<body><p>content</p></body>").unwrap();
    inject_header(&mut doc, &ctx(Mode::Web));
    let body = doc.body().unwrap();
    let first = doc.children(body)[0];
    assert!(doc.is_tag(first, "center"));
    let form = doc.elements_by_tag(first, "form")[0];
    assert_eq!(doc.attr(form, "action"), Some("/proxy"));
    assert_eq!(doc.attr(form, "method"), Some("get"));
  }

  #[test]
  fn web_mode_offers_reader_toggle() {
    let mut doc = Document::parse_html("<body></body>").unwrap();
    inject_header(&mut doc, &ctx(Mode::Web));
    let html = doc.serialize();
    assert!(html.contains("Use Reader"));
    assert!(html.contains("read=true&amp;url="));
  }

  #[test]
  fn read_mode_offers_web_toggle_without_read_flag() {
    let mut doc = Document::parse_html("<body></body>").unwrap();
    inject_header(&mut doc, &ctx(Mode::Read));
    let html = doc.serialize();
    assert!(html.contains("Use Web"));
    let toggle = doc
      .all_elements()
      .into_iter()
      .filter(|&id| doc.is_tag(id, "a"))
      .find(|&id| doc.text_content(id) == "Use Web")
      .unwrap();
    assert!(!doc.attr(toggle, "href").unwrap().contains("read=true"));
  }

  #[test]
  fn url_input_carries_the_target() {
    let mut doc = Document::parse_html("<body></body>").unwrap();
    inject_header(&mut doc, &ctx(Mode::Web));
    let input = doc
      .all_elements()
      .into_iter()
      .find(|&id| doc.is_tag(id, "input") && doc.attr(id, "type") == Some("text"))
      .unwrap();
    assert_eq!(doc.attr(input, "value"), Some("https://example.com/page"));
  }
}
