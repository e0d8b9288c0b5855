//! HTTP server: routing and request handling
//!
//! Three routes: `/` serves the static entry page, `/proxy` runs the
//! transformation pipeline against a target page, `/image_proxy` runs the
//! transcoding service. The pipeline and fetchers are synchronous; handlers
//! bridge onto `spawn_blocking` so the runtime stays responsive. Shared
//! state is read-only (`Arc`s of the host pool and fetchers); every request
//! builds its own document and context.

use crate::error::{Error, Result};
use crate::host::PageHostPool;
use crate::proxy_url::{append_query_params, normalize_target, parse_proxy_query, ProxyQuery};
use crate::reader::{readify, HeuristicExtractor};
use crate::resource::{HttpFetcher, ResourceFetcher};
use crate::transcode::transcode_url;
use crate::transform::{simplify, Mode, TransformContext};
use axum::extract::{RawForm, RawQuery, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use url::form_urlencoded;

/// Shared, read-only application state.
#[derive(Clone)]
pub struct AppState {
  pub hosts: Arc<PageHostPool>,
  pub page_fetcher: Arc<dyn ResourceFetcher>,
  pub image_fetcher: Arc<dyn ResourceFetcher>,
  /// Public base URL of this proxy; empty for same-origin relative links.
  pub proxy_base: String,
}

impl AppState {
  pub fn new(proxy_base: String) -> Self {
    AppState {
      hosts: Arc::new(PageHostPool::new()),
      page_fetcher: Arc::new(HttpFetcher::new()),
      image_fetcher: Arc::new(HttpFetcher::for_images()),
      proxy_base,
    }
  }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/", get(homepage))
    .route("/proxy", get(proxy_get).post(proxy_post))
    .route("/image_proxy", get(image_proxy))
    .fallback(not_found)
    .with_state(state)
}

async fn not_found() -> Response {
  error_response(
    StatusCode::NOT_FOUND,
    "Page Not Found",
    "The page you requested could not be found.",
  )
}

async fn homepage() -> Html<&'static str> {
  Html(HOMEPAGE)
}

async fn proxy_get(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
  let query = parse_proxy_query(query.as_deref().unwrap_or(""));
  run_proxy(state, query, None).await
}

async fn proxy_post(
  State(state): State<AppState>,
  RawQuery(query): RawQuery,
  RawForm(body): RawForm,
) -> Response {
  let query = parse_proxy_query(query.as_deref().unwrap_or(""));
  let fields: Vec<(String, String)> = form_urlencoded::parse(&body)
    .map(|(name, value)| (name.into_owned(), value.into_owned()))
    .collect();
  run_proxy(state, query, Some(fields)).await
}

async fn run_proxy(
  state: AppState,
  query: ProxyQuery,
  form: Option<Vec<(String, String)>>,
) -> Response {
  let Some(target) = query.url.clone() else {
    log::info!("proxy request without url parameter");
    return error_response(
      StatusCode::BAD_REQUEST,
      "Error: Missing URL",
      "Please provide a URL to proxy.",
    );
  };

  let result = tokio::task::spawn_blocking(move || process_page(&state, &target, &query, form))
    .await
    .unwrap_or_else(|e| Err(Error::Other(format!("worker failed: {e}"))));

  match result {
    Ok(html) => Html(html).into_response(),
    Err(error) => {
      log::warn!("proxy error: {error}");
      let status = if error.is_input_error() {
        StatusCode::BAD_REQUEST
      } else {
        StatusCode::INTERNAL_SERVER_ERROR
      };
      error_response(status, "Error Fetching URL", &error.to_string())
    }
  }
}

/// Fetch, parse and transform one page. Runs on a blocking worker.
fn process_page(
  state: &AppState,
  target: &str,
  query: &ProxyQuery,
  form: Option<Vec<(String, String)>>,
) -> Result<String> {
  let normalized = normalize_target(target);
  let mode = if query.read { Mode::Read } else { Mode::Web };
  let ctx = TransformContext::new(&normalized, &state.proxy_base, mode)?;

  let resource = match form {
    // POST bodies are the target form's own fields; forward them untouched.
    Some(fields) => state.page_fetcher.fetch_form(&normalized, &fields)?,
    // Extra inbound GET parameters belong to the target, not the proxy.
    None => {
      let fetch_url = append_query_params(&normalized, &query.extra);
      state.page_fetcher.fetch(&fetch_url)?
    }
  };

  let html = resource.decode_text();
  log::info!(
    "proxying {normalized} ({} bytes, {:?} mode)",
    html.len(),
    mode
  );

  let page = state.hosts.get().load(&html)?;
  match mode {
    Mode::Web => Ok(simplify(page, &ctx)),
    Mode::Read => readify(&page, &ctx, &HeuristicExtractor::new()),
  }
}

async fn image_proxy(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
  let query = parse_proxy_query(query.as_deref().unwrap_or(""));
  let Some(url) = query.url else {
    return (
      StatusCode::BAD_REQUEST,
      [(header::CONTENT_TYPE, "text/plain")],
      "Missing URL parameter",
    )
      .into_response();
  };

  let fetcher = state.image_fetcher.clone();
  let result = tokio::task::spawn_blocking(move || transcode_url(&url, &fetcher))
    .await
    .unwrap_or_else(|e| Err(Error::Other(format!("worker failed: {e}"))));

  match result {
    Ok(output) => (
      StatusCode::OK,
      [
        (header::CONTENT_TYPE, output.content_type),
        (header::CACHE_CONTROL, output.cache_control.to_string()),
      ],
      output.bytes,
    )
      .into_response(),
    Err(error) => {
      log::warn!("image proxy error: {error}");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, "text/plain")],
        "Image Error",
      )
        .into_response()
    }
  }
}

fn error_response(status: StatusCode, heading: &str, message: &str) -> Response {
  (status, Html(error_page(heading, message))).into_response()
}

/// Minimal vintage-styled error page with a link back home.
pub fn error_page(heading: &str, message: &str) -> String {
  format!(
    "<!DOCTYPE html><html><head><title>Retronet - Error</title></head>\
     <body bgcolor=\"white\" text=\"black\"><center>\
     <h1>{}</h1><p>{}</p><p><a href=\"/\">Return to Homepage</a></p>\
     </center></body></html>",
    escape_html(heading),
    escape_html(message)
  )
}

fn escape_html(text: &str) -> String {
  text
    .replace('&', "&amp;")
    .replace('<', "&lt;")
    .replace('>', "&gt;")
}

const HOMEPAGE: &str = "<!DOCTYPE html><html><head><title>Retronet - Browse</title></head>\
<body bgcolor=\"white\" text=\"black\"><center>\
<h1>RETRONET</h1>\
<p>Web Proxy for Vintage Computers</p><br>\
<form action=\"/proxy\" method=\"get\">\
<input type=\"text\" name=\"url\" size=\"40\">\
<input type=\"submit\" value=\"Go\">\
</form><br><hr width=\"320\"><br>\
<p>Retronet strips modern web elements to make sites readable on vintage machines.<br>\
No SSL, CSS, or JavaScript - just plain HTML.</p>\
</center></body></html>";
