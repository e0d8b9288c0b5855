//! HTML minification
//!
//! A pure string→string pass applied after serialization. Bytes matter on a
//! 14.4k modem: comments go, runs of whitespace collapse, and closing tags
//! that were optional in HTML 2.0 are dropped (period parsers never expected
//! them). Whitespace inside `<pre>` is not special-cased, matching the
//! aggressive output profile of the rest of the pipeline.

use regex::Regex;
use std::sync::OnceLock;

const OPTIONAL_CLOSERS: &[&str] = &[
  "</option>", "</li>", "</dt>", "</dd>", "</p>", "</td>", "</th>", "</tr>",
];

fn comment_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"<!--[\s\S]*?-->").expect("valid regex"))
}

fn between_tags_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r">\s+<").expect("valid regex"))
}

fn whitespace_run_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"\s{2,}").expect("valid regex"))
}

/// Minify serialized HTML.
pub fn minify(html: &str) -> String {
  let out = comment_re().replace_all(html, "");
  let out = between_tags_re().replace_all(&out, "><");
  let mut out = whitespace_run_re().replace_all(&out, " ").into_owned();
  for closer in OPTIONAL_CLOSERS {
    if out.contains(closer) {
      out = out.replace(closer, "");
    }
  }
  out.trim().to_string()
}
