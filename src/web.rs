use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use axum::{Router, extract::DefaultBodyLimit, http::StatusCode};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{self, AppState};
use crate::config::ServerConfig;

/// The API router wrapped in the server-wide middleware
pub fn app(state: AppState, config: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_body = config.max_upload_bytes();

    api::router(state)
        .layer(DefaultBodyLimit::max(max_body))
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout(),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn run(app: Router, config: &ServerConfig) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;

    match (&config.tls_cert_path, &config.tls_key_path) {
        (Some(cert), Some(key)) => serve_tls(app, addr, cert, key).await,
        _ => serve_plain(app, addr).await,
    }
}

async fn serve_plain(app: Router, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Web server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Web server stopped");
    Ok(())
}

#[cfg(feature = "tls")]
async fn serve_tls(app: Router, addr: SocketAddr, cert: &Path, key: &Path) -> Result<()> {
    use axum_server::tls_rustls::RustlsConfig;
    use std::time::Duration;

    // Already installed is fine
    let _ = rustls::crypto::ring::default_provider().install_default();

    let tls = RustlsConfig::from_pem_file(cert, key)
        .await
        .with_context(|| {
            format!(
                "Failed to load TLS certificate {} / key {}",
                cert.display(),
                key.display()
            )
        })?;

    let handle = axum_server::Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.graceful_shutdown(Some(Duration::from_secs(10)));
    });

    info!("Web server running at https://{}", addr);
    axum_server::bind_rustls(addr, tls)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .context("Server error")?;

    info!("Web server stopped");
    Ok(())
}

#[cfg(not(feature = "tls"))]
async fn serve_tls(_app: Router, _addr: SocketAddr, _cert: &Path, _key: &Path) -> Result<()> {
    anyhow::bail!("TLS paths are configured but the binary was built without the `tls` feature")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
