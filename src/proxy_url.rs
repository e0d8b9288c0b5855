//! Proxy-link codec
//!
//! Builds and parses the same-origin URLs that route a vintage client's
//! requests back through this service (`/proxy?url=...`,
//! `/image_proxy?url=...`), and resolves relative URLs against the target
//! page's base. The `url` and `read` query parameters are reserved; anything
//! else on an inbound `/proxy` request is forwarded to the target.

use url::form_urlencoded;
use url::Url;

/// Reserved query parameter carrying the target URL.
pub const PARAM_URL: &str = "url";
/// Reserved query parameter toggling reader mode.
pub const PARAM_READ: &str = "read";

/// Percent-encode a string for use as a query parameter value.
pub fn encode_component(value: &str) -> String {
  form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Build a `/proxy` URL for a page link. Reader mode rides along as
/// `read=true` ahead of the `url` parameter.
pub fn proxy_page_url(proxy_base: &str, absolute_url: &str, read_mode: bool) -> String {
  let read_param = if read_mode { "read=true&" } else { "" };
  format!(
    "{proxy_base}/proxy?{read_param}url={}",
    encode_component(absolute_url)
  )
}

/// Build an `/image_proxy` URL for an image resource or data: URI.
pub fn image_proxy_url(proxy_base: &str, absolute_url: &str) -> String {
  format!(
    "{proxy_base}/image_proxy?url={}",
    encode_component(absolute_url)
  )
}

/// Resolve a possibly-relative URL against the target page's base URL.
///
/// Scheme-relative URLs (`//host/path`) adopt the base's scheme. Returns
/// `None` when the input cannot be made absolute.
pub fn resolve_url(raw: &str, base: &Url) -> Option<String> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }
  if let Some(rest) = trimmed.strip_prefix("//") {
    let resolved = format!("{}://{}", base.scheme(), rest);
    return Url::parse(&resolved).ok().map(String::from);
  }
  base.join(trimmed).ok().map(String::from)
}

/// Normalize user input into a fetchable target URL: bare hostnames get an
/// `http://` scheme prepended.
pub fn normalize_target(input: &str) -> String {
  let trimmed = input.trim();
  if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
    trimmed.to_string()
  } else {
    format!("http://{trimmed}")
  }
}

/// True when a form action already points at this proxy and must be left
/// alone.
pub fn is_proxy_action(action: &str, proxy_base: &str) -> bool {
  action == "/"
    || action.starts_with("/proxy")
    || (!proxy_base.is_empty() && action.starts_with(&format!("{proxy_base}/proxy")))
}

/// Parsed `/proxy` request query.
#[derive(Debug, Default, Clone)]
pub struct ProxyQuery {
  /// The reserved target-URL parameter, percent-decoded.
  pub url: Option<String>,
  /// Reader mode flag (`read=true`).
  pub read: bool,
  /// All remaining parameters, forwarded to the target for GET requests.
  pub extra: Vec<(String, String)>,
}

/// Parse a raw query string, separating reserved parameters from
/// pass-through ones.
pub fn parse_proxy_query(query: &str) -> ProxyQuery {
  let mut parsed = ProxyQuery::default();
  for (name, value) in form_urlencoded::parse(query.as_bytes()) {
    match name.as_ref() {
      PARAM_URL => parsed.url = Some(value.into_owned()),
      PARAM_READ => parsed.read = value == "true",
      _ => parsed.extra.push((name.into_owned(), value.into_owned())),
    }
  }
  parsed
}

/// Append forwarded query parameters to a target URL.
pub fn append_query_params(target: &str, extra: &[(String, String)]) -> String {
  if extra.is_empty() {
    return target.to_string();
  }
  let Ok(mut url) = Url::parse(target) else {
    return target.to_string();
  };
  for (name, value) in extra {
    url.query_pairs_mut().append_pair(name, value);
  }
  url.into()
}
