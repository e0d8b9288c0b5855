//! Tag replacement, pruning, and attribute policy application
//!
//! The blunt-instrument stages: swap post-1995 inline tags for their vintage
//! spellings, drop subtrees a vintage browser cannot use, remove elements the
//! style snapshot says are invisible, and strip every denied attribute. All
//! decisions come from the data tables in [`crate::policy`]; running any of
//! these twice is a no-op.

use crate::dom::{Document, NodeId};
use crate::policy::{is_denied_attribute, is_removed_tag};
use crate::style::StyleMap;

/// Replace `<strong>`/`<em>` with `<b>`/`<i>` and form `<button>`s with
/// submit inputs.
pub fn replace_legacy_tags(doc: &mut Document) {
  swap_tag(doc, "strong", "b");
  swap_tag(doc, "em", "i");
  convert_form_buttons(doc);
}

fn swap_tag(doc: &mut Document, from: &str, to: &str) {
  for old in doc.elements_by_tag(doc.root(), from) {
    let new = doc.create_element(to);
    doc.reparent_children(old, new);
    doc.replace_with(old, new);
  }
}

fn convert_form_buttons(doc: &mut Document) {
  for button in doc.elements_by_tag(doc.root(), "button") {
    if !has_ancestor(doc, button, "form") {
      continue;
    }
    let label = doc.text_content(button).trim().to_string();
    let input = doc.create_element("input");
    doc.set_attr(input, "type", "submit");
    let value = if label.is_empty() { "Submit" } else { label.as_str() };
    doc.set_attr(input, "value", value);
    if let Some(name) = doc.attr(button, "name").map(str::to_string) {
      doc.set_attr(input, "name", &name);
    }
    if doc.has_attr(button, "disabled") {
      doc.set_attr(input, "disabled", "");
    }
    doc.replace_with(button, input);
  }
}

fn has_ancestor(doc: &Document, id: NodeId, tag: &str) -> bool {
  let mut current = doc.parent(id);
  while let Some(node) = current {
    if doc.is_tag(node, tag) {
      return true;
    }
    current = doc.parent(node);
  }
  false
}

/// Remove every subtree whose tag is on the removal list (scripts, styles,
/// iframes, metadata, ...). Runs after table conversion and media
/// substitution so it only ever deletes leftovers.
pub fn prune_unwanted(doc: &mut Document) {
  for id in doc.all_elements() {
    if doc.tag_name(id).is_some_and(is_removed_tag) {
      doc.remove(id);
    }
  }
}

/// Remove body elements the snapshot reports as invisible (display:none,
/// visibility:hidden, the `hidden` attribute). Scoped to the body so implied
/// head machinery survives.
pub fn remove_hidden(doc: &mut Document, styles: &StyleMap) {
  let Some(body) = doc.body() else {
    return;
  };
  for id in doc.descendants(body) {
    if !doc.is_element(id) {
      continue;
    }
    if styles.get(&id).is_some_and(|style| style.hidden) {
      doc.remove(id);
    }
  }
}

/// Strip every attribute matching the denylist from every element. This pass
/// is idempotent: stripping a stripped element changes nothing.
pub fn strip_denied_attributes(doc: &mut Document) {
  for id in doc.all_elements() {
    for (name, _) in doc.attrs(id) {
      if is_denied_attribute(&name) {
        doc.remove_attr(id, &name);
      }
    }
  }
}
