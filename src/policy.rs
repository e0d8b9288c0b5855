//! Attribute and tag policy tables
//!
//! Pure data consulted by the sanitization stages: no per-attribute special
//! cases anywhere else in the pipeline. An attribute is denied when its name
//! starts with any entry here (matched case-insensitively), so one `on`
//! entry covers the whole event-handler family and `aria-`/`data-` cover
//! their namespaces.

/// Attribute-name prefixes introduced after 1995 (or otherwise meaningless
/// to a vintage browser) that are stripped from every element.
pub const DENIED_ATTRIBUTE_PREFIXES: &[&str] = &[
  // Style and class plumbing
  "style",
  "class",
  // Accessibility and microdata
  "aria-",
  "data-",
  "role",
  "itemscope",
  "itemtype",
  "itemprop",
  // Resource loading hints
  "integrity",
  "crossorigin",
  "loading",
  "fetchpriority",
  "decoding",
  "rel",
  "async",
  "defer",
  "nomodule",
  "referrerpolicy",
  // Modern input/editing behavior
  "contenteditable",
  "spellcheck",
  "autocomplete",
  "autocapitalize",
  "autofocus",
  "enterkeyhint",
  "inputmode",
  "tabindex",
  // Web components and i18n
  "is",
  "nonce",
  "part",
  "slot",
  "translate",
  // Every JavaScript event handler
  "on",
  // Modern media and presentation
  "playsinline",
  "autoplay",
  "controls",
  "loop",
  "muted",
  "poster",
  "preload",
  "srcset",
  "sizes",
  "importance",
  "intrinsicsize",
  // SVG leftovers
  "viewbox",
  "preserveaspectratio",
  "xmlns",
  "xlink:href",
  // Obsolete but still modern
  "allowfullscreen",
  "allowpaymentrequest",
  "ping",
  "sandbox",
];

/// Tags whose subtrees are removed outright.
pub const REMOVED_TAGS: &[&str] = &[
  "script", "noscript", "style", "link", "meta", "iframe", "template", "object", "embed", "applet",
  "canvas", "source", "track",
];

/// Tags a reader-mode article may contain; everything else is unwrapped
/// (children kept) during extraction.
pub const READER_ALLOWED_TAGS: &[&str] = &[
  "a",
  "article",
  "b",
  "blockquote",
  "br",
  "caption",
  "center",
  "code",
  "dd",
  "div",
  "dl",
  "dt",
  "em",
  "figcaption",
  "figure",
  "font",
  "h1",
  "h2",
  "h3",
  "h4",
  "h5",
  "h6",
  "hr",
  "i",
  "img",
  "li",
  "ol",
  "p",
  "pre",
  "section",
  "small",
  "span",
  "strong",
  "table",
  "tbody",
  "td",
  "tfoot",
  "th",
  "thead",
  "tr",
  "u",
  "ul",
];

/// True when the attribute name matches the denylist.
pub fn is_denied_attribute(name: &str) -> bool {
  let name = name.to_ascii_lowercase();
  DENIED_ATTRIBUTE_PREFIXES
    .iter()
    .any(|prefix| name.starts_with(prefix))
}

/// True when the tag's whole subtree should be removed.
pub fn is_removed_tag(tag: &str) -> bool {
  REMOVED_TAGS.iter().any(|t| tag.eq_ignore_ascii_case(t))
}

/// True when reader mode keeps this tag.
pub fn is_reader_allowed_tag(tag: &str) -> bool {
  READER_ALLOWED_TAGS
    .iter()
    .any(|t| tag.eq_ignore_ascii_case(t))
}
