//! Page-host capability
//!
//! The transformation pipeline needs a collaborator that can parse HTML into
//! a mutable document and report computed style per element before anything
//! is mutated. The [`PageHost`] trait captures exactly that capability; how
//! it is provided (a real browser, a layout engine, or the bundled static
//! approximation) is not the pipeline's concern.

use crate::dom::Document;
use crate::error::Result;
use crate::style::{compute_styles, StyleMap};
use std::sync::{Arc, OnceLock};

/// A parsed page plus its pre-mutation style snapshot.
pub struct HostedPage {
  pub document: Document,
  pub styles: StyleMap,
}

/// Capability to parse HTML and report computed style per element.
///
/// Implementations must be `Send + Sync`: one host instance is shared across
/// concurrent requests, and each `load` call produces an independent
/// document/snapshot pair (per-request isolation lives here, not in the
/// caller).
pub trait PageHost: Send + Sync {
  fn load(&self, html: &str) -> Result<HostedPage>;
}

impl<T: PageHost + ?Sized> PageHost for Arc<T> {
  fn load(&self, html: &str) -> Result<HostedPage> {
    (**self).load(html)
  }
}

/// Default page host: html5ever parsing plus the minimal user-agent-defaults
/// and inline-style cascade from [`crate::style`].
#[derive(Debug, Default, Clone)]
pub struct StaticPageHost;

impl StaticPageHost {
  pub fn new() -> Self {
    StaticPageHost
  }
}

impl PageHost for StaticPageHost {
  fn load(&self, html: &str) -> Result<HostedPage> {
    let document = Document::parse_html(html)?;
    let styles = compute_styles(&document);
    Ok(HostedPage { document, styles })
  }
}

/// Pooled page-host resource.
///
/// The host is created on first use and reused for the life of the process;
/// the pool object is passed into the server explicitly rather than living in
/// global state. Custom hosts can be injected up front with
/// [`PageHostPool::with_host`].
pub struct PageHostPool {
  host: OnceLock<Arc<dyn PageHost>>,
}

impl Default for PageHostPool {
  fn default() -> Self {
    Self::new()
  }
}

impl PageHostPool {
  pub fn new() -> Self {
    PageHostPool {
      host: OnceLock::new(),
    }
  }

  /// Build a pool around an existing host instance.
  pub fn with_host(host: Arc<dyn PageHost>) -> Self {
    let pool = PageHostPool::new();
    let _ = pool.host.set(host);
    pool
  }

  /// Borrow the shared host, creating the default one on first use.
  pub fn get(&self) -> Arc<dyn PageHost> {
    self
      .host
      .get_or_init(|| Arc::new(StaticPageHost::new()))
      .clone()
  }
}
