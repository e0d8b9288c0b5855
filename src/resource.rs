//! Resource fetching abstraction
//!
//! A trait-based abstraction for fetching the target page and its
//! subresources. The core library stays agnostic about how bytes are
//! retrieved, which keeps the pipeline testable with in-memory fetchers and
//! lets the server own timeouts and header policy in one place.
//!
//! Supported URL schemes: `http://`, `https://`, and `data:`. Anything else
//! is rejected; this process fetches on behalf of untrusted clients, so
//! filesystem and exotic schemes stay closed.

pub mod data_url;

use crate::config;
use crate::error::{Error, FetchError, InputError, Result};
use std::sync::Arc;
use std::time::Duration;

/// Result of fetching an external resource
#[derive(Debug, Clone)]
pub struct FetchedResource {
  /// Raw bytes of the resource
  pub bytes: Vec<u8>,
  /// Content-Type header value, if available (e.g., "image/png")
  pub content_type: Option<String>,
}

impl FetchedResource {
  pub fn new(bytes: Vec<u8>, content_type: Option<String>) -> Self {
    Self {
      bytes,
      content_type,
    }
  }

  /// The media type without parameters (`text/html; charset=x` → `text/html`).
  pub fn media_type(&self) -> Option<&str> {
    self
      .content_type
      .as_deref()
      .map(|ct| ct.split(';').next().unwrap_or(ct).trim())
  }

  /// Check if this resource appears to be an image based on content-type
  pub fn is_image(&self) -> bool {
    self
      .media_type()
      .map(|mt| mt.starts_with("image/"))
      .unwrap_or(false)
  }

  /// Check if this resource appears to be an HTML document
  pub fn is_html(&self) -> bool {
    self
      .media_type()
      .map(|mt| mt.contains("text/html") || mt.contains("application/xhtml+xml"))
      .unwrap_or(true)
  }

  /// Decode the bytes as text using the content-type charset (default UTF-8).
  pub fn decode_text(&self) -> String {
    let charset = self
      .content_type
      .as_deref()
      .and_then(charset_from_content_type);
    let encoding = charset
      .and_then(|label| encoding_rs::Encoding::for_label(label.as_bytes()))
      .unwrap_or(encoding_rs::UTF_8);
    let (text, _, _) = encoding.decode(&self.bytes);
    text.into_owned()
  }
}

fn charset_from_content_type(content_type: &str) -> Option<String> {
  for param in content_type.split(';').skip(1) {
    let (name, value) = param.split_once('=')?;
    if name.trim().eq_ignore_ascii_case("charset") {
      return Some(value.trim().trim_matches('"').to_string());
    }
  }
  None
}

/// Trait for fetching external resources
///
/// Implementations must be `Send + Sync` so a single instance can be shared
/// across concurrent request handlers.
pub trait ResourceFetcher: Send + Sync {
  /// Fetch a resource with a GET request (or inline decode for `data:`).
  fn fetch(&self, url: &str) -> Result<FetchedResource>;

  /// POST a form-encoded body and return the response.
  ///
  /// The default implementation ignores the body and degrades to a plain
  /// fetch, which is what in-memory test fetchers want.
  fn fetch_form(&self, url: &str, fields: &[(String, String)]) -> Result<FetchedResource> {
    let _ = fields;
    self.fetch(url)
  }
}

// Allow Arc<dyn ResourceFetcher> to be used as ResourceFetcher
impl<T: ResourceFetcher + ?Sized> ResourceFetcher for Arc<T> {
  fn fetch(&self, url: &str) -> Result<FetchedResource> {
    (**self).fetch(url)
  }

  fn fetch_form(&self, url: &str, fields: &[(String, String)]) -> Result<FetchedResource> {
    (**self).fetch_form(url, fields)
  }
}

/// Default HTTP resource fetcher
///
/// Fetches over HTTP/HTTPS with a bounded global timeout, a response size
/// cap, and browser-ish headers. Redirects are followed by the agent. There
/// are no retries: a timeout or transport failure surfaces as a
/// [`FetchError`] immediately.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
  timeout: Duration,
  user_agent: String,
  accept: Option<String>,
  accept_language: String,
  max_size: usize,
}

impl HttpFetcher {
  /// Create a fetcher configured for HTML page loads.
  pub fn new() -> Self {
    Self::default()
  }

  /// Create a fetcher configured for image loads (vintage UA, image accept).
  pub fn for_images() -> Self {
    Self::default()
      .with_user_agent(config::IMAGE_USER_AGENT)
      .with_accept("image/jpeg,image/gif,image/png,*/*")
  }

  /// Set the request timeout
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// Set the User-Agent header
  pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
    self.user_agent = user_agent.into();
    self
  }

  /// Set the Accept header
  pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
    self.accept = Some(accept.into());
    self
  }

  /// Set the maximum response size in bytes
  pub fn with_max_size(mut self, max_size: usize) -> Self {
    self.max_size = max_size;
    self
  }

  fn agent(&self) -> ureq::Agent {
    ureq::Agent::config_builder()
      .timeout_global(Some(self.timeout))
      .build()
      .into()
  }

  fn map_call_error(url: &str, error: ureq::Error) -> Error {
    match error {
      ureq::Error::StatusCode(status) => Error::Fetch(FetchError::HttpStatus {
        url: url.to_string(),
        status,
      }),
      other => Error::Fetch(FetchError::Transport {
        url: url.to_string(),
        reason: other.to_string(),
      }),
    }
  }

  fn read_response(
    &self,
    url: &str,
    mut response: ureq::http::Response<ureq::Body>,
  ) -> Result<FetchedResource> {
    let content_type = response
      .headers()
      .get("content-type")
      .and_then(|h| h.to_str().ok())
      .map(|s| s.to_string());

    let bytes = response
      .body_mut()
      .with_config()
      .limit(self.max_size as u64)
      .read_to_vec()
      .map_err(|e| {
        Error::Fetch(FetchError::Transport {
          url: url.to_string(),
          reason: e.to_string(),
        })
      })?;

    if bytes.is_empty() {
      return Err(Error::Fetch(FetchError::EmptyBody {
        url: url.to_string(),
      }));
    }

    Ok(FetchedResource::new(bytes, content_type))
  }

  fn fetch_http(&self, url: &str) -> Result<FetchedResource> {
    let agent = self.agent();
    let mut request = agent
      .get(url)
      .header("User-Agent", &self.user_agent)
      .header("Accept-Language", &self.accept_language);
    if let Some(accept) = &self.accept {
      request = request.header("Accept", accept);
    }

    let response = request.call().map_err(|e| Self::map_call_error(url, e))?;
    self.read_response(url, response)
  }

  fn post_http(&self, url: &str, fields: &[(String, String)]) -> Result<FetchedResource> {
    let agent = self.agent();
    let pairs: Vec<(&str, &str)> = fields
      .iter()
      .map(|(name, value)| (name.as_str(), value.as_str()))
      .collect();
    let response = agent
      .post(url)
      .header("User-Agent", &self.user_agent)
      .header("Accept-Language", &self.accept_language)
      .send_form(pairs)
      .map_err(|e| Self::map_call_error(url, e))?;
    self.read_response(url, response)
  }
}

impl Default for HttpFetcher {
  fn default() -> Self {
    Self {
      timeout: config::FETCH_TIMEOUT,
      user_agent: config::PAGE_USER_AGENT.to_string(),
      accept: None,
      accept_language: config::DEFAULT_ACCEPT_LANGUAGE.to_string(),
      max_size: config::MAX_FETCH_SIZE,
    }
  }
}

impl ResourceFetcher for HttpFetcher {
  fn fetch(&self, url: &str) -> Result<FetchedResource> {
    if url.starts_with("data:") {
      data_url::decode_data_url(url)
    } else if url.starts_with("http://") || url.starts_with("https://") {
      self.fetch_http(url)
    } else {
      Err(Error::Input(InputError::InvalidUrl {
        url: url.to_string(),
      }))
    }
  }

  fn fetch_form(&self, url: &str, fields: &[(String, String)]) -> Result<FetchedResource> {
    if url.starts_with("http://") || url.starts_with("https://") {
      self.post_http(url, fields)
    } else {
      Err(Error::Input(InputError::InvalidUrl {
        url: url.to_string(),
      }))
    }
  }
}
