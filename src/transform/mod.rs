//! Transformation pipeline
//!
//! The pipeline is an explicit ordered stage list over one mutable document
//! plus its immutable pre-mutation style snapshot and per-request context.
//! Per-element failures inside a stage are logged and leave the element in
//! its best-effort state; a stage never aborts the run.

pub mod header;
pub mod images;
pub mod links;
pub mod media;
pub mod sanitize;
pub mod srcset;
pub mod style_downgrade;
pub mod tables;

use crate::dom::Document;
use crate::error::{InputError, Result};
use crate::host::HostedPage;
use crate::minify::minify;
use crate::style::StyleMap;
use url::Url;

/// Which rendition of the page the client asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  /// Simplify the full page.
  Web,
  /// Extract and simplify the main article content.
  Read,
}

/// Immutable per-request context handed to every stage.
#[derive(Debug, Clone)]
pub struct TransformContext {
  /// Absolute URL of the page being rewritten; base for relative URLs.
  pub target_url: Url,
  /// Origin (scheme + host) of the target, for diagnostics.
  pub origin: String,
  /// Base URL of this proxy as seen by the client; empty means same-origin
  /// relative links.
  pub proxy_base: String,
  pub mode: Mode,
}

impl TransformContext {
  pub fn new(target: &str, proxy_base: &str, mode: Mode) -> Result<Self> {
    let target_url = Url::parse(target).map_err(|_| InputError::InvalidUrl {
      url: target.to_string(),
    })?;
    let origin = match (target_url.host_str(), target_url.port()) {
      (Some(host), Some(port)) => format!("{}://{host}:{port}", target_url.scheme()),
      (Some(host), None) => format!("{}://{host}", target_url.scheme()),
      _ => target_url.scheme().to_string(),
    };
    Ok(TransformContext {
      target_url,
      origin,
      proxy_base: proxy_base.trim_end_matches('/').to_string(),
      mode,
    })
  }

  pub fn is_read(&self) -> bool {
    self.mode == Mode::Read
  }
}

type StageFn = fn(&mut Document, &StyleMap, &TransformContext);

/// One named pipeline stage.
pub struct Stage {
  pub name: &'static str,
  run: StageFn,
}

/// Ordered sequence of stages over one document.
pub struct Pipeline {
  stages: Vec<Stage>,
}

impl Pipeline {
  /// The full web-mode pipeline.
  ///
  /// Ordering contracts:
  /// - the style snapshot is taken by the host before this runs, so the
  ///   downgrade stages may mutate freely;
  /// - `pictures` must precede `images` and `strip-attributes`, which destroy
  ///   the `srcset`/`media` inputs it reads;
  /// - `tables` must precede `prune`, which would delete orphaned originals;
  /// - `links` precedes `media` so substituted download anchors stay direct;
  /// - `media` precedes `images` so substituted SVG images are not
  ///   re-proxied;
  /// - `header` runs last so its own links and inputs are never rewritten.
  pub fn vintage() -> Self {
    Pipeline {
      stages: vec![
        Stage { name: "remove-hidden", run: stage_remove_hidden },
        Stage { name: "downgrade-styles", run: stage_downgrade_styles },
        Stage { name: "pictures", run: stage_pictures },
        Stage { name: "legacy-tags", run: stage_legacy_tags },
        Stage { name: "tables", run: stage_tables },
        Stage { name: "links", run: stage_links },
        Stage { name: "media", run: stage_media },
        Stage { name: "images", run: stage_images },
        Stage { name: "prune", run: stage_prune },
        Stage { name: "strip-attributes", run: stage_strip_attributes },
        Stage { name: "header", run: stage_header },
      ],
    }
  }

  /// The reader-mode pipeline run over the extracted article document. The
  /// article was rebuilt from the allowlist, so layout-oriented stages are
  /// unnecessary; the same ordering contracts apply to what remains.
  pub fn reader() -> Self {
    Pipeline {
      stages: vec![
        Stage { name: "pictures", run: stage_pictures },
        Stage { name: "legacy-tags", run: stage_legacy_tags },
        Stage { name: "links", run: stage_links },
        Stage { name: "media", run: stage_media },
        Stage { name: "images", run: stage_images },
        Stage { name: "prune", run: stage_prune },
        Stage { name: "strip-attributes", run: stage_strip_attributes },
        Stage { name: "header", run: stage_header },
      ],
    }
  }

  pub fn stage_names(&self) -> Vec<&'static str> {
    self.stages.iter().map(|stage| stage.name).collect()
  }

  /// Run every stage in order.
  pub fn run(&self, doc: &mut Document, styles: &StyleMap, ctx: &TransformContext) {
    for stage in &self.stages {
      log::debug!("pipeline stage: {}", stage.name);
      (stage.run)(doc, styles, ctx);
    }
  }
}

fn stage_remove_hidden(doc: &mut Document, styles: &StyleMap, _ctx: &TransformContext) {
  sanitize::remove_hidden(doc, styles);
}

fn stage_downgrade_styles(doc: &mut Document, styles: &StyleMap, _ctx: &TransformContext) {
  style_downgrade::downgrade_styles(doc, styles);
}

fn stage_pictures(doc: &mut Document, _styles: &StyleMap, _ctx: &TransformContext) {
  srcset::resolve_picture_elements(doc);
}

fn stage_legacy_tags(doc: &mut Document, _styles: &StyleMap, _ctx: &TransformContext) {
  sanitize::replace_legacy_tags(doc);
}

fn stage_tables(doc: &mut Document, _styles: &StyleMap, _ctx: &TransformContext) {
  tables::convert_tables(doc);
}

fn stage_media(doc: &mut Document, _styles: &StyleMap, ctx: &TransformContext) {
  media::substitute_media(doc, ctx);
}

fn stage_images(doc: &mut Document, _styles: &StyleMap, ctx: &TransformContext) {
  images::rewrite_images(doc, ctx);
}

fn stage_links(doc: &mut Document, _styles: &StyleMap, ctx: &TransformContext) {
  links::rewrite_links(doc, ctx);
}

fn stage_prune(doc: &mut Document, _styles: &StyleMap, _ctx: &TransformContext) {
  sanitize::prune_unwanted(doc);
}

fn stage_strip_attributes(doc: &mut Document, _styles: &StyleMap, _ctx: &TransformContext) {
  sanitize::strip_denied_attributes(doc);
}

fn stage_header(doc: &mut Document, _styles: &StyleMap, ctx: &TransformContext) {
  header::set_body_attributes(doc);
  header::inject_header(doc, ctx);
}

/// Run the full web-mode pipeline over a hosted page and produce the final
/// minified HTML.
pub fn simplify(mut page: HostedPage, ctx: &TransformContext) -> String {
  Pipeline::vintage().run(&mut page.document, &page.styles, ctx);
  minify(&page.document.serialize())
}
