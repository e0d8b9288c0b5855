//! Responsive image resolution
//!
//! Picks a single URL out of a `srcset` candidate list or a `<picture>`
//! element. Selection is deterministic width-descriptor arithmetic against
//! the fixed reference viewport width; no rendered viewport is involved.

use crate::config::VIEWPORT_WIDTH;
use crate::dom::{Document, NodeId};
use regex::Regex;
use std::sync::OnceLock;

/// One parsed srcset entry with its effective width in px.
#[derive(Debug, Clone, PartialEq)]
pub struct SrcsetCandidate {
  pub url: String,
  pub effective_width: f32,
}

/// Parse a `srcset` attribute into candidates.
///
/// Width descriptors (`800w`) map to their width; density descriptors
/// (`2x`) map to `density * reference`; a missing descriptor maps to the
/// reference width itself. Candidates without a URL are skipped.
pub fn parse_srcset(attr: &str, reference_width: u32) -> Vec<SrcsetCandidate> {
  let reference = reference_width as f32;
  let mut candidates = Vec::new();

  for entry in attr.split(',') {
    let mut tokens = entry.split_whitespace();
    let Some(url) = tokens.next() else {
      continue;
    };
    if url.is_empty() {
      continue;
    }

    let effective_width = match tokens.next() {
      Some(descriptor) if descriptor.ends_with('w') => {
        match descriptor[..descriptor.len() - 1].parse::<f32>() {
          Ok(width) if width.is_finite() && width > 0.0 => width,
          _ => continue,
        }
      }
      Some(descriptor) if descriptor.ends_with('x') => {
        match descriptor[..descriptor.len() - 1].parse::<f32>() {
          Ok(density) if density.is_finite() && density > 0.0 => density * reference,
          _ => continue,
        }
      }
      _ => reference,
    };

    candidates.push(SrcsetCandidate {
      url: url.to_string(),
      effective_width,
    });
  }

  candidates
}

fn url_shaped_token() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"(?i)https?://[^\s,]+|data:[^\s,]+").expect("valid regex"))
}

/// Select one URL from a `srcset` string.
///
/// The candidate minimizing `|effective_width - reference|` wins; ties go to
/// the earliest occurrence. When nothing parses, fall back to the first
/// URL-shaped token; if that also fails, return `None` and callers leave the
/// original `src` untouched. This never fails loudly.
pub fn select_from_srcset(attr: &str, reference_width: u32) -> Option<String> {
  let reference = reference_width as f32;
  let candidates = parse_srcset(attr, reference_width);

  let mut best: Option<&SrcsetCandidate> = None;
  for candidate in &candidates {
    let distance = (candidate.effective_width - reference).abs();
    match best {
      Some(current) if (current.effective_width - reference).abs() <= distance => {}
      _ => best = Some(candidate),
    }
  }
  if let Some(winner) = best {
    return Some(winner.url.clone());
  }

  // Total parse failure: scavenge the first thing that looks like a URL.
  url_shaped_token()
    .find(attr)
    .map(|token| token.as_str().to_string())
}

/// A `media` attribute that textually signals a narrow-viewport constraint.
fn media_targets_narrow(media: &str) -> bool {
  media.contains("max-width")
    || media.contains("(width <")
    || media.contains("(width<=")
    || media.contains("(width <=")
}

/// Resolve every `<picture>` element down to a plain `<img>`.
///
/// `<source>` children are scanned in document order: the first whose
/// `media` signals a max-width constraint wins, otherwise the first source.
/// The winning source's `srcset` is resolved via [`select_from_srcset`] and
/// the `<picture>` is replaced in place by an `<img>` carrying the resolved
/// URL plus the inner img's `alt`/`width`/`height`. Must run before generic
/// image rewriting and attribute stripping, which would destroy the
/// `srcset`/`media` inputs.
pub fn resolve_picture_elements(doc: &mut Document) {
  for picture in doc.elements_by_tag(doc.root(), "picture") {
    let inner_img = doc
      .descendants(picture)
      .into_iter()
      .find(|&id| doc.is_tag(id, "img"));
    let sources: Vec<NodeId> = doc
      .descendants(picture)
      .into_iter()
      .filter(|&id| doc.is_tag(id, "source"))
      .collect();

    if sources.is_empty() {
      // Nothing to resolve; promote the inner img if there is one.
      if let Some(img) = inner_img {
        doc.detach(img);
        doc.replace_with(picture, img);
      }
      continue;
    }

    let chosen = sources
      .iter()
      .copied()
      .find(|&source| {
        doc
          .attr(source, "media")
          .is_some_and(media_targets_narrow)
      })
      .unwrap_or(sources[0]);

    let resolved = doc
      .attr(chosen, "srcset")
      .and_then(|srcset| select_from_srcset(srcset, VIEWPORT_WIDTH))
      .or_else(|| doc.attr(chosen, "src").map(str::to_string));

    let Some(resolved) = resolved else {
      // Resolution failed entirely; keep the inner img as-is.
      if let Some(img) = inner_img {
        doc.detach(img);
        doc.replace_with(picture, img);
      }
      continue;
    };

    let img = doc.create_element("img");
    doc.set_attr(img, "src", &resolved);
    if let Some(inner) = inner_img {
      for name in ["alt", "width", "height"] {
        if let Some(value) = doc.attr(inner, name).map(str::to_string) {
          doc.set_attr(img, name, &value);
        }
      }
    }
    doc.replace_with(picture, img);
  }
}
