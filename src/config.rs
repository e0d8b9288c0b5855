//! Central configuration for the proxy
//!
//! Target device class: compact monochrome-to-8-bit machines with 512x342 to
//! 640x480 screens and browsers that predate CSS.

use std::time::Duration;

/// Maximum width in pixels for images and layout containers in rewritten pages
pub const TARGET_WIDTH: u32 = 640;

/// Reference viewport width used for responsive-image selection
pub const VIEWPORT_WIDTH: u32 = 640;

/// Reference viewport height (4:3 aspect ratio)
pub const VIEWPORT_HEIGHT: u32 = 480;

/// JPEG quality for transcoded images (moderate, non-progressive)
pub const JPEG_QUALITY: u8 = 40;

/// User-Agent sent when fetching target pages
pub const PAGE_USER_AGENT: &str =
  "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:137.0) Gecko/20100101 Firefox/137.0";

/// User-Agent sent when fetching images; a vintage UA nudges some CDNs into
/// serving simpler variants
pub const IMAGE_USER_AGENT: &str = "Mozilla/4.0 (compatible; MSIE 5.0; Mac_PowerPC)";

/// Accept-Language header for upstream fetches
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";

/// Default timeout for upstream fetches
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum upstream response size in bytes (50 MB)
pub const MAX_FETCH_SIZE: usize = 50 * 1024 * 1024;

/// Cache-Control header value for transcoded images (24 hours)
pub const IMAGE_CACHE_CONTROL: &str = "public, max-age=86400";
