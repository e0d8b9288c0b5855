//! Arena-based mutable document tree
//!
//! The document owns every node in a flat arena addressed by stable
//! [`NodeId`]s, with explicit parent/children index fields instead of shared
//! mutable references. Detaching a subtree and reattaching it elsewhere moves
//! ownership by re-linking indices; nothing is cloned implicitly, and a node
//! never belongs to two documents (cross-document moves go through
//! [`Document::import`]). Ids are never reused, so side tables keyed by
//! `NodeId` (e.g. computed-style snapshots) stay valid across later
//! mutation.
//!
//! Parsing is delegated to html5ever; the resulting rcdom tree is converted
//! into the arena, dropping comments, doctypes and processing instructions.

use crate::error::{ParseError, Result};
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use html5ever::ParseOpts;
use markup5ever_rcdom::Handle;
use markup5ever_rcdom::NodeData as RcNodeData;
use markup5ever_rcdom::RcDom;

/// Stable identifier of a node within one [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Elements that must not be given a closing tag when serialized.
const VOID_ELEMENTS: &[&str] = &[
  "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
  "track", "wbr",
];

#[derive(Debug, Clone)]
pub enum NodeKind {
  /// The document root; never has a parent.
  Document,
  Element(ElementData),
  Text(String),
}

#[derive(Debug, Clone)]
pub struct ElementData {
  tag: String,
  /// Ordered attribute list. Names are unique under ASCII-case-insensitive
  /// comparison; HTML attributes arrive lowercased from the parser while
  /// SVG-adjusted attributes (viewBox, preserveAspectRatio) keep their case.
  attrs: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct Node {
  pub parent: Option<NodeId>,
  pub children: Vec<NodeId>,
  pub kind: NodeKind,
}

/// A mutable, ordered tree of element and text nodes.
#[derive(Debug, Clone)]
pub struct Document {
  nodes: Vec<Node>,
  root: NodeId,
}

impl Default for Document {
  fn default() -> Self {
    Self::new()
  }
}

impl Document {
  /// Create an empty document containing only the root node.
  pub fn new() -> Self {
    Document {
      nodes: vec![Node {
        parent: None,
        children: Vec::new(),
        kind: NodeKind::Document,
      }],
      root: NodeId(0),
    }
  }

  /// Parse an HTML string into a document.
  ///
  /// html5ever performs standards-compliant tree construction (implied html/head/
  /// body, foster parenting, foreign content); comments and doctypes are
  /// dropped during conversion into the arena.
  pub fn parse_html(html: &str) -> Result<Document> {
    let rcdom = parse_document(RcDom::default(), ParseOpts::default())
      .from_utf8()
      .read_from(&mut html.as_bytes())
      .map_err(|e| ParseError::InvalidHtml {
        reason: e.to_string(),
      })?;

    let mut doc = Document::new();
    let root = doc.root;
    convert_children(&rcdom.document, &mut doc, root);
    Ok(doc)
  }

  pub fn root(&self) -> NodeId {
    self.root
  }

  fn node(&self, id: NodeId) -> &Node {
    &self.nodes[id.0]
  }

  fn node_mut(&mut self, id: NodeId) -> &mut Node {
    &mut self.nodes[id.0]
  }

  pub fn kind(&self, id: NodeId) -> &NodeKind {
    &self.node(id).kind
  }

  pub fn parent(&self, id: NodeId) -> Option<NodeId> {
    self.node(id).parent
  }

  pub fn children(&self, id: NodeId) -> &[NodeId] {
    &self.node(id).children
  }

  pub fn is_element(&self, id: NodeId) -> bool {
    matches!(self.node(id).kind, NodeKind::Element(_))
  }

  /// Tag name of an element node, `None` for text and root nodes.
  pub fn tag_name(&self, id: NodeId) -> Option<&str> {
    match &self.node(id).kind {
      NodeKind::Element(el) => Some(el.tag.as_str()),
      _ => None,
    }
  }

  pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
    self
      .tag_name(id)
      .is_some_and(|t| t.eq_ignore_ascii_case(tag))
  }

  pub fn text(&self, id: NodeId) -> Option<&str> {
    match &self.node(id).kind {
      NodeKind::Text(content) => Some(content.as_str()),
      _ => None,
    }
  }

  // -------------------------------------------------------------------------
  // Construction and tree surgery
  // -------------------------------------------------------------------------

  fn push_node(&mut self, kind: NodeKind) -> NodeId {
    let id = NodeId(self.nodes.len());
    self.nodes.push(Node {
      parent: None,
      children: Vec::new(),
      kind,
    });
    id
  }

  pub fn create_element(&mut self, tag: &str) -> NodeId {
    self.push_node(NodeKind::Element(ElementData {
      tag: tag.to_ascii_lowercase(),
      attrs: Vec::new(),
    }))
  }

  pub fn create_text(&mut self, content: &str) -> NodeId {
    self.push_node(NodeKind::Text(content.to_string()))
  }

  /// Detach `id` from its parent. The subtree stays intact and can be
  /// reattached elsewhere; ownership never leaves the document.
  pub fn detach(&mut self, id: NodeId) {
    if let Some(parent) = self.node(id).parent {
      self.node_mut(parent).children.retain(|&child| child != id);
      self.node_mut(id).parent = None;
    }
  }

  /// Append `child` as the last child of `parent`, detaching it first.
  pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
    debug_assert_ne!(parent, child);
    self.detach(child);
    self.node_mut(parent).children.push(child);
    self.node_mut(child).parent = Some(parent);
  }

  /// Insert `new_child` immediately before `reference` among the children of
  /// `parent`. Falls back to append when `reference` is not found.
  pub fn insert_before(&mut self, parent: NodeId, new_child: NodeId, reference: NodeId) {
    self.detach(new_child);
    let position = self
      .node(parent)
      .children
      .iter()
      .position(|&child| child == reference);
    match position {
      Some(index) => self.node_mut(parent).children.insert(index, new_child),
      None => self.node_mut(parent).children.push(new_child),
    }
    self.node_mut(new_child).parent = Some(parent);
  }

  /// Insert `child` as the first child of `parent`.
  pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
    self.detach(child);
    self.node_mut(parent).children.insert(0, child);
    self.node_mut(child).parent = Some(parent);
  }

  /// Replace `old` with `new` at the same position, detaching `old`.
  pub fn replace_with(&mut self, old: NodeId, new: NodeId) {
    let Some(parent) = self.node(old).parent else {
      return;
    };
    self.detach(new);
    let position = self
      .node(parent)
      .children
      .iter()
      .position(|&child| child == old);
    if let Some(index) = position {
      self.node_mut(parent).children[index] = new;
      self.node_mut(new).parent = Some(parent);
      self.node_mut(old).parent = None;
    }
  }

  /// Remove a node (and implicitly its subtree) from the tree. Arena slots
  /// are not reclaimed; the document is per-request and short-lived.
  pub fn remove(&mut self, id: NodeId) {
    self.detach(id);
  }

  /// Move every child of `from` onto the end of `to`, preserving order.
  pub fn reparent_children(&mut self, from: NodeId, to: NodeId) {
    let children = std::mem::take(&mut self.node_mut(from).children);
    for child in &children {
      self.node_mut(*child).parent = Some(to);
    }
    self.node_mut(to).children.extend(children);
  }

  /// Deep-copy a subtree from another document into this one, returning the
  /// new root id. This is the only way nodes cross document boundaries.
  pub fn import(&mut self, source: &Document, source_id: NodeId) -> NodeId {
    let new_id = match source.kind(source_id) {
      NodeKind::Document => self.push_node(NodeKind::Document),
      NodeKind::Element(el) => self.push_node(NodeKind::Element(el.clone())),
      NodeKind::Text(content) => self.create_text(content),
    };
    for &child in source.children(source_id) {
      let imported = self.import(source, child);
      self.append_child(new_id, imported);
    }
    new_id
  }

  // -------------------------------------------------------------------------
  // Attributes
  // -------------------------------------------------------------------------

  pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
    match &self.node(id).kind {
      NodeKind::Element(el) => el
        .attrs
        .iter()
        .find(|(attr_name, _)| attr_name.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str()),
      _ => None,
    }
  }

  pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
    self.attr(id, name).is_some()
  }

  /// Set an attribute, replacing any existing value in place. New attributes
  /// are stored lowercase and appended in order.
  pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
    if let NodeKind::Element(el) = &mut self.node_mut(id).kind {
      for (attr_name, attr_value) in &mut el.attrs {
        if attr_name.eq_ignore_ascii_case(name) {
          *attr_value = value.to_string();
          return;
        }
      }
      el.attrs.push((name.to_ascii_lowercase(), value.to_string()));
    }
  }

  pub fn remove_attr(&mut self, id: NodeId, name: &str) {
    if let NodeKind::Element(el) = &mut self.node_mut(id).kind {
      el.attrs
        .retain(|(attr_name, _)| !attr_name.eq_ignore_ascii_case(name));
    }
  }

  pub fn clear_attrs(&mut self, id: NodeId) {
    if let NodeKind::Element(el) = &mut self.node_mut(id).kind {
      el.attrs.clear();
    }
  }

  /// Snapshot of the attribute list (name, value) in document order.
  pub fn attrs(&self, id: NodeId) -> Vec<(String, String)> {
    match &self.node(id).kind {
      NodeKind::Element(el) => el.attrs.clone(),
      _ => Vec::new(),
    }
  }

  fn push_raw_attr(&mut self, id: NodeId, name: &str, value: &str) {
    if let NodeKind::Element(el) = &mut self.node_mut(id).kind {
      let duplicate = el
        .attrs
        .iter()
        .any(|(attr_name, _)| attr_name.eq_ignore_ascii_case(name));
      if !duplicate {
        el.attrs.push((name.to_string(), value.to_string()));
      }
    }
  }

  // -------------------------------------------------------------------------
  // Traversal
  // -------------------------------------------------------------------------

  /// Pre-order list of all descendants of `id`, excluding `id` itself.
  ///
  /// Returns an owned list so callers can mutate the tree while walking;
  /// detached nodes simply become unreachable garbage in the arena.
  pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = self.node(id).children.iter().rev().copied().collect();
    while let Some(current) = stack.pop() {
      out.push(current);
      stack.extend(self.node(current).children.iter().rev());
    }
    out
  }

  /// All element descendants of the root, in document order.
  pub fn all_elements(&self) -> Vec<NodeId> {
    self
      .descendants(self.root)
      .into_iter()
      .filter(|&id| self.is_element(id))
      .collect()
  }

  /// Element descendants of `scope` with the given tag name, document order.
  pub fn elements_by_tag(&self, scope: NodeId, tag: &str) -> Vec<NodeId> {
    self
      .descendants(scope)
      .into_iter()
      .filter(|&id| self.is_tag(id, tag))
      .collect()
  }

  /// Concatenated text content of a subtree.
  pub fn text_content(&self, id: NodeId) -> String {
    let mut out = String::new();
    if let NodeKind::Text(content) = self.kind(id) {
      out.push_str(content);
    }
    for descendant in self.descendants(id) {
      if let NodeKind::Text(content) = self.kind(descendant) {
        out.push_str(content);
      }
    }
    out
  }

  /// True when the element has at least one direct, non-whitespace text child.
  pub fn has_direct_text(&self, id: NodeId) -> bool {
    self.node(id).children.iter().any(|&child| {
      matches!(self.kind(child), NodeKind::Text(content) if !content.trim().is_empty())
    })
  }

  /// True when any descendant (or the node itself) is the given tag.
  pub fn contains_tag(&self, id: NodeId, tag: &str) -> bool {
    self.is_tag(id, tag)
      || self
        .descendants(id)
        .into_iter()
        .any(|descendant| self.is_tag(descendant, tag))
  }

  pub fn html_element(&self) -> Option<NodeId> {
    self
      .children(self.root)
      .iter()
      .copied()
      .find(|&id| self.is_tag(id, "html"))
  }

  pub fn head(&self) -> Option<NodeId> {
    let html = self.html_element()?;
    self
      .children(html)
      .iter()
      .copied()
      .find(|&id| self.is_tag(id, "head"))
  }

  pub fn body(&self) -> Option<NodeId> {
    let html = self.html_element()?;
    self
      .children(html)
      .iter()
      .copied()
      .find(|&id| self.is_tag(id, "body"))
  }

  pub fn title(&self) -> Option<String> {
    let head = self.head()?;
    let title = self
      .elements_by_tag(head, "title")
      .into_iter()
      .next()?;
    let text = self.text_content(title).trim().to_string();
    if text.is_empty() {
      None
    } else {
      Some(text)
    }
  }

  // -------------------------------------------------------------------------
  // Serialization
  // -------------------------------------------------------------------------

  /// Serialize the whole document, including a short doctype.
  pub fn serialize(&self) -> String {
    let mut out = String::from("<!DOCTYPE html>");
    for &child in self.children(self.root) {
      self.serialize_node(child, &mut out);
    }
    out
  }

  /// Serialize one subtree (used for SVG data-URI payloads).
  pub fn serialize_subtree(&self, id: NodeId) -> String {
    let mut out = String::new();
    self.serialize_node(id, &mut out);
    out
  }

  fn serialize_node(&self, id: NodeId, out: &mut String) {
    match self.kind(id) {
      NodeKind::Document => {
        for &child in self.children(id) {
          self.serialize_node(child, out);
        }
      }
      NodeKind::Text(content) => out.push_str(&escape_text(content)),
      NodeKind::Element(el) => {
        out.push('<');
        out.push_str(&el.tag);
        for (name, value) in &el.attrs {
          out.push(' ');
          out.push_str(name);
          if !value.is_empty() {
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
          }
        }
        out.push('>');
        if VOID_ELEMENTS.contains(&el.tag.as_str()) {
          return;
        }
        for &child in self.children(id) {
          self.serialize_node(child, out);
        }
        out.push_str("</");
        out.push_str(&el.tag);
        out.push('>');
      }
    }
  }
}

fn escape_text(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for ch in text.chars() {
    match ch {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      _ => out.push(ch),
    }
  }
  out
}

fn escape_attr(value: &str) -> String {
  let mut out = String::with_capacity(value.len());
  for ch in value.chars() {
    match ch {
      '&' => out.push_str("&amp;"),
      '"' => out.push_str("&quot;"),
      '<' => out.push_str("&lt;"),
      _ => out.push(ch),
    }
  }
  out
}

fn convert_children(handle: &Handle, doc: &mut Document, parent: NodeId) {
  for child in handle.children.borrow().iter() {
    match &child.data {
      RcNodeData::Element { name, attrs, .. } => {
        let tag = name.local.to_string().to_ascii_lowercase();
        let element = doc.create_element(&tag);
        for attr in attrs.borrow().iter() {
          doc.push_raw_attr(element, &attr.name.local, &attr.value);
        }
        doc.append_child(parent, element);
        convert_children(child, doc, element);
      }
      RcNodeData::Text { contents } => {
        let content = contents.borrow().to_string();
        if !content.is_empty() {
          let text = doc.create_text(&content);
          doc.append_child(parent, text);
        }
      }
      // Comments, doctypes and processing instructions carry nothing a
      // vintage rendition needs.
      _ => {}
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_implied_structure() {
    let doc = Document::parse_html("<p>hello</p>").unwrap();
    assert!(doc.html_element().is_some());
    assert!(doc.head().is_some());
    let body = doc.body().unwrap();
    let paragraphs = doc.elements_by_tag(body, "p");
    assert_eq!(paragraphs.len(), 1);
    assert_eq!(doc.text_content(paragraphs[0]), "hello");
  }

  #[test]
  fn attribute_names_are_case_insensitive_and_unique() {
    let doc = Document::parse_html("<div ID=\"a\" id=\"b\">x</div>").unwrap();
    let div = doc.elements_by_tag(doc.root(), "div")[0];
    // The parser keeps the first occurrence; lookups ignore case.
    assert_eq!(doc.attr(div, "Id"), Some("a"));
  }

  #[test]
  fn set_attr_replaces_in_place() {
    let mut doc = Document::new();
    let el = doc.create_element("img");
    doc.set_attr(el, "src", "a.png");
    doc.set_attr(el, "alt", "pic");
    doc.set_attr(el, "SRC", "b.png");
    assert_eq!(doc.attr(el, "src"), Some("b.png"));
    assert_eq!(doc.attrs(el)[0].0, "src");
  }

  #[test]
  fn detach_and_reattach_moves_ownership() {
    let mut doc = Document::parse_html("<div id=\"a\"><span>x</span></div><div id=\"b\"></div>")
      .unwrap();
    let divs = doc.elements_by_tag(doc.root(), "div");
    let span = doc.elements_by_tag(divs[0], "span")[0];
    doc.append_child(divs[1], span);
    assert!(doc.elements_by_tag(divs[0], "span").is_empty());
    assert_eq!(doc.elements_by_tag(divs[1], "span"), vec![span]);
    assert_eq!(doc.parent(span), Some(divs[1]));
  }

  #[test]
  fn replace_with_preserves_position() {
    let mut doc = Document::parse_html("<p>a</p><table></table><p>b</p>").unwrap();
    let body = doc.body().unwrap();
    let table = doc.elements_by_tag(body, "table")[0];
    let div = doc.create_element("div");
    doc.replace_with(table, div);
    let children: Vec<_> = doc
      .children(body)
      .iter()
      .filter_map(|&id| doc.tag_name(id).map(str::to_string))
      .collect();
    assert_eq!(children, vec!["p", "div", "p"]);
  }

  #[test]
  fn import_deep_copies_across_documents() {
    let source = Document::parse_html("<div><b>bold</b> text</div>").unwrap();
    let div = source.elements_by_tag(source.root(), "div")[0];
    let mut target = Document::new();
    let imported = target.import(&source, div);
    assert!(target.is_tag(imported, "div"));
    assert_eq!(target.text_content(imported), "bold text");
    // Source is untouched.
    assert_eq!(source.text_content(div), "bold text");
  }

  #[test]
  fn serializes_void_elements_without_closing_tags() {
    let mut doc = Document::new();
    let img = doc.create_element("img");
    doc.set_attr(img, "src", "/image_proxy?url=a");
    let out = doc.serialize_subtree(img);
    assert_eq!(out, "<img src=\"/image_proxy?url=a\">");
  }

  #[test]
  fn serializes_escaped_text_and_attributes() {
    let mut doc = Document::new();
    let a = doc.create_element("a");
    doc.set_attr(a, "href", "/proxy?url=x&read=true");
    let text = doc.create_text("a < b & c");
    doc.append_child(a, text);
    let out = doc.serialize_subtree(a);
    assert_eq!(
      out,
      "<a href=\"/proxy?url=x&amp;read=true\">a &lt; b &amp; c</a>"
    );
  }

  #[test]
  fn comments_are_dropped_at_parse_time() {
    let doc = Document::parse_html("<body><!-- secret --><p>x</p></body>").unwrap();
    assert!(!doc.serialize().contains("secret"));
  }

  #[test]
  fn has_direct_text_ignores_whitespace_runs() {
    let doc = Document::parse_html("<div>  \n  <span>deep</span></div>").unwrap();
    let div = doc.elements_by_tag(doc.root(), "div")[0];
    let span = doc.elements_by_tag(div, "span")[0];
    assert!(!doc.has_direct_text(div));
    assert!(doc.has_direct_text(span));
  }

  #[test]
  fn svg_attribute_case_is_preserved() {
    let doc =
      Document::parse_html("<body><svg viewBox=\"0 0 10 10\"><path d=\"M0 0\"/></svg></body>")
        .unwrap();
    let svg = doc.elements_by_tag(doc.root(), "svg")[0];
    assert_eq!(doc.attr(svg, "viewbox"), Some("0 0 10 10"));
    assert!(doc.serialize_subtree(svg).contains("viewBox="));
  }

  #[test]
  fn title_is_read_from_head() {
    let doc = Document::parse_html("<head><title> Hi there </title></head><body></body>").unwrap();
    assert_eq!(doc.title(), Some("Hi there".to_string()));
  }
}
