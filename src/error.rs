//! Error types for Retronet
//!
//! This module provides error types for all subsystems:
//! - Input errors (bad request parameters, malformed data URLs)
//! - Fetch errors (upstream HTTP failures, timeouts)
//! - Parse errors (HTML parsing, article extraction)
//! - Image errors (decoding, rasterization, re-encoding)
//!
//! All errors use the `thiserror` crate for minimal boilerplate and
//! proper error trait implementations.

use thiserror::Error;

/// Result type alias for Retronet operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for Retronet
///
/// Each variant wraps a more specific error type for that subsystem. The
/// server layer maps `Input` errors to 400-class responses and everything
/// else to 500-class responses.
#[derive(Error, Debug)]
pub enum Error {
  /// Bad request input (missing or malformed parameters)
  #[error("Input error: {0}")]
  Input(#[from] InputError),

  /// Upstream fetch error
  #[error("Fetch error: {0}")]
  Fetch(#[from] FetchError),

  /// HTML parsing or content extraction error
  #[error("Parse error: {0}")]
  Parse(#[from] ParseError),

  /// Image decoding, rasterization, or encoding error
  #[error("Image error: {0}")]
  Image(#[from] ImageError),

  /// I/O error (file reading, network, etc.)
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  /// Generic error for miscellaneous issues
  #[error("{0}")]
  Other(String),
}

/// Errors caused by the inbound request itself
///
/// These are user-correctable and map to 400-class responses.
#[derive(Error, Debug, Clone)]
pub enum InputError {
  /// The `url` query parameter was not provided
  #[error("Missing 'url' parameter")]
  MissingUrl,

  /// The `url` query parameter could not be parsed as a URL
  #[error("Invalid URL: {url}")]
  InvalidUrl { url: String },

  /// A `data:` URL is structurally broken (no comma, bad base64, ...)
  #[error("Malformed data URL: {reason}")]
  MalformedDataUrl { reason: String },
}

/// Errors that occur while fetching the target page or a subresource
#[derive(Error, Debug, Clone)]
pub enum FetchError {
  /// The upstream server answered with a non-success status
  #[error("Upstream returned status {status} for '{url}'")]
  HttpStatus { url: String, status: u16 },

  /// Transport-level failure (DNS, TLS, timeout, connection reset)
  #[error("Failed to fetch '{url}': {reason}")]
  Transport { url: String, reason: String },

  /// The upstream response carried no body
  #[error("Empty response body from '{url}'")]
  EmptyBody { url: String },
}

/// Errors that occur while parsing HTML or extracting article content
#[derive(Error, Debug, Clone)]
pub enum ParseError {
  /// The fetched bytes could not be parsed into a document
  #[error("Invalid HTML: {reason}")]
  InvalidHtml { reason: String },

  /// Reader mode found no extractable article
  #[error("Could not parse article content")]
  NoArticle,
}

/// Errors that occur while decoding, rasterizing, or re-encoding images
#[derive(Error, Debug, Clone)]
pub enum ImageError {
  /// Image decoding failed
  #[error("Failed to decode image from '{url}': {reason}")]
  DecodeFailed { url: String, reason: String },

  /// Image encoding failed
  #[error("Failed to encode image as {format}: {reason}")]
  EncodeFailed { format: String, reason: String },

  /// SVG content the minimal rasterizer cannot handle
  #[error("Unsupported SVG content: {reason}")]
  UnsupportedSvg { reason: String },
}

impl Error {
  /// True when the error should surface as a 400-class response.
  pub fn is_input_error(&self) -> bool {
    matches!(self, Error::Input(_))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn input_error_missing_url_display() {
    let error = Error::Input(InputError::MissingUrl);
    assert!(format!("{}", error).contains("Missing 'url' parameter"));
    assert!(error.is_input_error());
  }

  #[test]
  fn fetch_error_surfaces_status_and_url() {
    let error = Error::Fetch(FetchError::HttpStatus {
      url: "https://example.com/page".to_string(),
      status: 503,
    });
    let display = format!("{}", error);
    assert!(display.contains("503"));
    assert!(display.contains("example.com"));
    assert!(!error.is_input_error());
  }

  #[test]
  fn malformed_data_url_is_input_error() {
    let error: Error = InputError::MalformedDataUrl {
      reason: "missing comma".to_string(),
    }
    .into();
    assert!(error.is_input_error());
    assert!(format!("{}", error).contains("missing comma"));
  }

  #[test]
  fn parse_error_no_article_message() {
    let error = Error::Parse(ParseError::NoArticle);
    assert!(format!("{}", error).contains("Could not parse article content"));
  }

  #[test]
  fn error_from_io_error() {
    let io_error = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
    let error: Error = io_error.into();
    assert!(matches!(error, Error::Io(_)));
  }
}
