//! Web server setup and routing

use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use crate::api;
use crate::config::TlsConfig;
use crate::state::AppState;

/// Recording endpoints, reachable with and without a trailing slash
fn recording_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/blockdata", get(api::block_data))
        .route("/blockdata/", get(api::block_data))
        .route("/segmentdata", get(api::segment_data))
        .route("/segmentdata/", get(api::segment_data))
        .route("/analogsignaldata", get(api::analog_signal_data))
        .route("/analogsignaldata/", get(api::analog_signal_data))
        .route("/spiketraindata", get(api::spike_train_data))
        .route("/spiketraindata/", get(api::spike_train_data))
}

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .merge(recording_routes())
        .nest("/api", recording_routes())
        .route("/health", get(api::health));

    // Front-end files for everything else
    if let Some(static_dir) = &state.config.daemon.static_dir {
        app = app.fallback_service(ServeDir::new(static_dir));
    }

    app.layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
    .with_state(state)
}

/// Run the web server (HTTP or HTTPS depending on config)
pub async fn run(state: Arc<AppState>, bind: &str, tls: Option<&TlsConfig>) -> Result<()> {
    let app = build_router(state);

    if let Some(tls_config) = tls {
        run_https(app, bind, tls_config).await
    } else {
        run_http(app, bind).await
    }
}

/// Run plain HTTP server
async fn run_http(app: Router, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(address = %bind, protocol = "HTTP", "Starting web server");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Run HTTPS server with TLS
async fn run_https(app: Router, bind: &str, tls: &TlsConfig) -> Result<()> {
    use axum_server::tls_rustls::RustlsConfig;
    use std::path::Path;

    let cert_path = Path::new(&tls.cert);
    let key_path = Path::new(&tls.key);
    if !cert_path.exists() {
        anyhow::bail!("TLS certificate file not found: {}", tls.cert);
    }
    if !key_path.exists() {
        anyhow::bail!("TLS key file not found: {}", tls.key);
    }

    let rustls_config = RustlsConfig::from_pem_file(cert_path, key_path).await?;
    let addr: std::net::SocketAddr = bind.parse()?;
    info!(address = %bind, protocol = "HTTPS", cert = %tls.cert, "Starting web server");

    axum_server::bind_rustls(addr, rustls_config)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
