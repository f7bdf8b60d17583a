//! Haiku News binary entrypoint.
//! Boots the Axum HTTP server: config, collaborators, shared state, metrics and tracing.

use haiku_news::{bootstrap::AppRuntime, metrics::Metrics};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default, JSON lines with `LOG_FORMAT=json`.
/// `try_init` because the Shuttle runtime may already own the global subscriber.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("haiku_news=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    // Missing credentials or a broken config path stop the process here.
    let runtime = AppRuntime::from_env()?;
    let metrics = Metrics::init()?;

    let router = runtime.router().merge(metrics.router());
    tracing::info!("haiku news service ready");

    Ok(router.into())
}
