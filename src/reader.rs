//! Reader mode: main-content extraction
//!
//! An alternate pipeline path that distills a page down to its article
//! content instead of simplifying the whole layout. Extraction is consumed
//! as a black box behind [`ContentExtractor`]; the bundled
//! [`HeuristicExtractor`] scores block containers by text mass against link
//! density, the classic reader-mode tradeoff.

use crate::dom::{Document, NodeId};
use crate::error::{ParseError, Result};
use crate::host::HostedPage;
use crate::minify::minify;
use crate::policy::{is_reader_allowed_tag, is_removed_tag};
use crate::style::StyleMap;
use crate::transform::{Pipeline, TransformContext};

/// An extracted article: a title and the content subtree within the source
/// document.
#[derive(Debug)]
pub struct Article {
  pub title: Option<String>,
  pub content: NodeId,
}

/// Capability to find the main article of a document.
pub trait ContentExtractor: Send + Sync {
  fn extract(&self, doc: &Document) -> Result<Article>;
}

/// Minimum text mass (in characters) for a container to count as an article.
const MIN_ARTICLE_LEN: usize = 120;

/// Tags considered as article containers, roughly most-specific first.
const CANDIDATE_TAGS: &[&str] = &["article", "main", "section", "div", "td", "body"];

/// Score-based extractor: prefers containers with a lot of paragraph text
/// and few links.
#[derive(Debug, Default, Clone)]
pub struct HeuristicExtractor;

impl HeuristicExtractor {
  pub fn new() -> Self {
    HeuristicExtractor
  }

  fn score(doc: &Document, id: NodeId) -> i64 {
    let text_len = doc.text_content(id).split_whitespace().count() as i64;
    let link_len: i64 = doc
      .descendants(id)
      .into_iter()
      .filter(|&node| doc.is_tag(node, "a"))
      .map(|node| doc.text_content(node).split_whitespace().count() as i64)
      .sum();
    let paragraphs = doc
      .descendants(id)
      .into_iter()
      .filter(|&node| doc.is_tag(node, "p") || doc.is_tag(node, "pre") || doc.is_tag(node, "blockquote"))
      .count() as i64;
    // Link text counts against the container twice: once as ordinary text,
    // once as a penalty.
    text_len - 3 * link_len + 10 * paragraphs
  }
}

impl ContentExtractor for HeuristicExtractor {
  fn extract(&self, doc: &Document) -> Result<Article> {
    let Some(body) = doc.body() else {
      return Err(ParseError::NoArticle.into());
    };

    let mut best: Option<(i64, NodeId)> = None;
    for tag in CANDIDATE_TAGS {
      let candidates = if *tag == "body" {
        vec![body]
      } else {
        doc.elements_by_tag(body, tag)
      };
      for candidate in candidates {
        if doc.text_content(candidate).trim().len() < MIN_ARTICLE_LEN {
          continue;
        }
        let score = Self::score(doc, candidate);
        match best {
          Some((best_score, _)) if best_score >= score => {}
          _ => best = Some((score, candidate)),
        }
      }
    }

    let Some((_, content)) = best else {
      return Err(ParseError::NoArticle.into());
    };

    let title = doc.title().or_else(|| {
      doc
        .elements_by_tag(body, "h1")
        .into_iter()
        .next()
        .map(|h1| doc.text_content(h1).trim().to_string())
        .filter(|t| !t.is_empty())
    });

    Ok(Article { title, content })
  }
}

/// Build the reader-mode rendition of a page.
///
/// The article subtree is deep-copied into a fresh document, reduced to the
/// reader tag allowlist, then run through the reader pipeline (images, SVG,
/// links, sanitization, header) and minified.
pub fn readify(
  page: &HostedPage,
  ctx: &TransformContext,
  extractor: &dyn ContentExtractor,
) -> Result<String> {
  let article = extractor.extract(&page.document)?;
  let title = article
    .title
    .clone()
    .unwrap_or_else(|| ctx.target_url.to_string());

  let mut doc = Document::new();
  let html = doc.create_element("html");
  doc.append_child(doc.root(), html);
  let head = doc.create_element("head");
  doc.append_child(html, head);
  let title_el = doc.create_element("title");
  let title_text = doc.create_text(&title);
  doc.append_child(title_el, title_text);
  doc.append_child(head, title_el);
  let body = doc.create_element("body");
  doc.append_child(html, body);

  let content = doc.import(&page.document, article.content);
  let wrapper = doc.create_element("div");
  doc.append_child(wrapper, content);
  // Reduce from the wrapper down so an extracted <body>/<main> root is
  // unwrapped like any other disallowed element.
  reduce_to_allowlist(&mut doc, wrapper);
  doc.append_child(body, wrapper);

  // The article document was rebuilt from scratch; there is no computed
  // style left to consult.
  let styles = StyleMap::new();
  Pipeline::reader().run(&mut doc, &styles, ctx);
  Ok(minify(&doc.serialize()))
}

/// Remove denied subtrees and unwrap disallowed elements, keeping their
/// children in place.
fn reduce_to_allowlist(doc: &mut Document, scope: NodeId) {
  // Bottom-up so unwrapping parents never orphans pending work.
  let mut nodes = doc.descendants(scope);
  nodes.reverse();
  for id in nodes {
    let Some(tag) = doc.tag_name(id).map(str::to_string) else {
      continue;
    };
    if is_removed_tag(&tag) {
      doc.remove(id);
    } else if !is_reader_allowed_tag(&tag) && !doc.is_tag(id, "picture") && !doc.is_tag(id, "source") {
      unwrap_node(doc, id);
    }
  }
}

/// Replace an element with its children at the same position.
fn unwrap_node(doc: &mut Document, id: NodeId) {
  let Some(parent) = doc.parent(id) else {
    return;
  };
  for child in doc.children(id).to_vec() {
    doc.insert_before(parent, child, id);
  }
  doc.remove(id);
}
