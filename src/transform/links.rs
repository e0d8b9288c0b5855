//! Anchor and form rewriting
//!
//! Every outward link is routed back through the proxy so navigation stays
//! inside the rewritten web. `javascript:` anchors are removed outright and
//! fragment links left alone. Forms keep their original method: a POST form
//! carries the reserved parameters in its action's query string (the body
//! travels untouched), while a GET form gets hidden `url`/`read` inputs
//! because the browser would overwrite the action's own query with the form
//! fields.

use crate::dom::{Document, NodeId};
use crate::proxy_url::{is_proxy_action, proxy_page_url, resolve_url, PARAM_READ, PARAM_URL};
use crate::transform::TransformContext;

/// Rewrite all anchors and forms in the document.
pub fn rewrite_links(doc: &mut Document, ctx: &TransformContext) {
  for anchor in doc.elements_by_tag(doc.root(), "a") {
    rewrite_anchor(doc, anchor, ctx);
  }
  for form in doc.elements_by_tag(doc.root(), "form") {
    rewrite_form(doc, form, ctx);
  }
}

fn rewrite_anchor(doc: &mut Document, anchor: NodeId, ctx: &TransformContext) {
  let Some(href) = doc.attr(anchor, "href").map(str::to_string) else {
    return;
  };
  let href = href.trim();

  if href.starts_with("javascript:") {
    doc.remove(anchor);
    return;
  }
  if href.is_empty() || href.starts_with('#') {
    return;
  }

  match resolve_url(href, &ctx.target_url) {
    Some(absolute) => {
      let proxied = proxy_page_url(&ctx.proxy_base, &absolute, ctx.is_read());
      doc.set_attr(anchor, "href", &proxied);
    }
    None => {
      log::warn!("leaving unresolvable href untouched: {href}");
    }
  }
}

fn rewrite_form(doc: &mut Document, form: NodeId, ctx: &TransformContext) {
  let Some(action) = doc.attr(form, "action").map(str::to_string) else {
    return;
  };
  if is_proxy_action(&action, &ctx.proxy_base) {
    return;
  }

  let Some(absolute) = resolve_url(&action, &ctx.target_url) else {
    log::warn!("leaving form with unresolvable action untouched: {action}");
    return;
  };

  let is_post = doc
    .attr(form, "method")
    .is_some_and(|m| m.eq_ignore_ascii_case("post"));

  if is_post {
    let proxied = proxy_page_url(&ctx.proxy_base, &absolute, ctx.is_read());
    doc.set_attr(form, "action", &proxied);
  } else {
    doc.set_attr(form, "action", &format!("{}/proxy", ctx.proxy_base));
    append_hidden_input(doc, form, PARAM_URL, &absolute);
    if ctx.is_read() {
      append_hidden_input(doc, form, PARAM_READ, "true");
    }
  }
}

fn append_hidden_input(doc: &mut Document, form: NodeId, name: &str, value: &str) {
  let input = doc.create_element("input");
  doc.set_attr(input, "type", "hidden");
  doc.set_attr(input, "name", name);
  doc.set_attr(input, "value", value);
  doc.append_child(form, input);
}
