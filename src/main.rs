use clap::Parser;
use retronet::server::{router, AppState};

/// Web proxy that rewrites modern pages for pre-1996 browsers.
#[derive(Parser, Debug)]
#[command(name = "retronet", version, about)]
struct Options {
  /// Address to listen on
  #[arg(long, default_value = "0.0.0.0:8080")]
  bind: String,

  /// Public base URL of this proxy (e.g. http://proxy.local:8080); defaults
  /// to same-origin relative links
  #[arg(long, default_value = "")]
  public_url: String,
}

#[tokio::main]
async fn main() {
  env_logger::init();
  let options = Options::parse();

  let state = AppState::new(options.public_url.trim_end_matches('/').to_string());
  let app = router(state);

  let listener = match tokio::net::TcpListener::bind(&options.bind).await {
    Ok(listener) => listener,
    Err(error) => {
      eprintln!("failed to bind {}: {error}", options.bind);
      std::process::exit(1);
    }
  };
  log::info!("listening on http://{}", options.bind);

  if let Err(error) = axum::serve(listener, app).await {
    eprintln!("server error: {error}");
    std::process::exit(1);
  }
}
