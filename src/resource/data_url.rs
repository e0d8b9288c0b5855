//! RFC 2397 `data:` URL decoding
//!
//! The image proxy accepts `data:` URLs directly (the media substituter
//! serializes inline SVG into them). Malformed data URLs are input errors
//! with a dedicated reason rather than generic failures.

use super::FetchedResource;
use crate::error::{Error, InputError, Result};
use base64::Engine;

const DATA_URL_PREFIX: &str = "data:";
const DEFAULT_MEDIA_TYPE: &str = "text/plain";

/// Decode a `data:` URL into bytes and content type.
pub fn decode_data_url(url: &str) -> Result<FetchedResource> {
  if !url.starts_with(DATA_URL_PREFIX) {
    return Err(malformed("URL does not start with 'data:'"));
  }

  let rest = &url[DATA_URL_PREFIX.len()..];
  let (metadata, payload) = rest
    .split_once(',')
    .ok_or_else(|| malformed("missing comma separator"))?;
  if payload.is_empty() {
    return Err(malformed("empty payload"));
  }

  let (media_type, is_base64) = parse_metadata(metadata);
  let bytes = if is_base64 {
    decode_base64_payload(payload)?
  } else {
    percent_decode(payload)?
  };

  Ok(FetchedResource::new(bytes, Some(media_type)))
}

fn malformed(reason: &str) -> Error {
  Error::Input(InputError::MalformedDataUrl {
    reason: reason.to_string(),
  })
}

fn parse_metadata(metadata: &str) -> (String, bool) {
  let mut parts = metadata.split(';');
  let media_type = parts.next().unwrap_or("").trim();
  let is_base64 = parts.any(|param| param.trim().eq_ignore_ascii_case("base64"));

  let media_type = if media_type.is_empty() {
    DEFAULT_MEDIA_TYPE.to_string()
  } else {
    media_type.to_ascii_lowercase()
  };

  (media_type, is_base64)
}

/// Decode base64 payloads, tolerating ASCII whitespace for robustness.
fn decode_base64_payload(payload: &str) -> Result<Vec<u8>> {
  let cleaned: Vec<u8> = payload
    .bytes()
    .filter(|b| !b.is_ascii_whitespace())
    .collect();

  base64::engine::general_purpose::STANDARD
    .decode(&cleaned)
    .map_err(|e| malformed(&format!("invalid base64: {e}")))
}

/// Percent-decode a URL payload without treating '+' specially.
fn percent_decode(input: &str) -> Result<Vec<u8>> {
  let mut out = Vec::with_capacity(input.len());
  let bytes = input.as_bytes();
  let mut i = 0;

  while i < bytes.len() {
    match bytes[i] {
      b'%' => {
        if i + 2 >= bytes.len() {
          return Err(malformed("incomplete percent-escape"));
        }
        let hi = (bytes[i + 1] as char).to_digit(16);
        let lo = (bytes[i + 2] as char).to_digit(16);
        match (hi, lo) {
          (Some(hi), Some(lo)) => {
            out.push(((hi << 4) | lo) as u8);
            i += 3;
          }
          _ => return Err(malformed("invalid percent-escape")),
        }
      }
      byte => {
        out.push(byte);
        i += 1;
      }
    }
  }

  Ok(out)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decodes_base64_payload() {
    let resource = decode_data_url("data:image/png;base64,aGVsbG8=").unwrap();
    assert_eq!(resource.bytes, b"hello");
    assert_eq!(resource.content_type.as_deref(), Some("image/png"));
  }

  #[test]
  fn decodes_base64_with_embedded_whitespace() {
    let resource = decode_data_url("data:image/png;base64,aGVs\nbG8=").unwrap();
    assert_eq!(resource.bytes, b"hello");
  }

  #[test]
  fn decodes_percent_encoded_payload() {
    let resource = decode_data_url("data:text/plain,hello%20world").unwrap();
    assert_eq!(resource.bytes, b"hello world");
  }

  #[test]
  fn missing_comma_is_a_dedicated_input_error() {
    let error = decode_data_url("data:image/png;nodata").unwrap_err();
    assert!(error.is_input_error());
    assert!(format!("{error}").contains("missing comma"));
  }

  #[test]
  fn empty_payload_is_rejected() {
    let error = decode_data_url("data:image/png;base64,").unwrap_err();
    assert!(error.is_input_error());
  }

  #[test]
  fn invalid_base64_is_rejected() {
    let error = decode_data_url("data:image/png;base64,!!!").unwrap_err();
    assert!(error.is_input_error());
  }

  #[test]
  fn empty_media_type_defaults_to_text_plain() {
    let resource = decode_data_url("data:,abc").unwrap();
    assert_eq!(resource.content_type.as_deref(), Some("text/plain"));
  }
}
