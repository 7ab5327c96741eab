//! HTTP surface of the intake log: `/addItem`, `/getTime`, `/health` and
//! static assets.

pub mod intake;
pub mod routes;
pub mod state;
pub mod static_files;

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header::CONTENT_TYPE, Method};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::errors::IntakeResult;

pub use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/", get(routes::root_handler))
        .route("/health", get(routes::health_handler))
        .route("/getTime", get(routes::time_handler))
        .route("/addItem", get(routes::add_item_handler))
        .fallback(routes::static_handler)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the configured address and serves until `shutdown` resolves.
pub async fn serve<F>(config: &AppConfig, shutdown: F) -> IntakeResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = AppState::new(config);
    let app = build_router(state.clone());

    let address = format!("{}:{}", config.server.bind, config.server.port);
    tracing::info!(address = %address, "binding");
    let listener = TcpListener::bind(&address).await?;
    let local = listener.local_addr()?;

    tracing::info!(
        address = %local,
        store = %state.store.path().display(),
        public = %state.public_dir.display(),
        "server listening"
    );
    for url in listen_urls(local, &interface_addresses()) {
        tracing::info!(url = %url, "reachable at");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// URLs a scanner on the network can use to reach a server bound to `bound`.
/// A wildcard bind lists every non-loopback interface address, then
/// loopback and the wildcard itself; a specific bind lists only itself.
pub fn listen_urls(bound: SocketAddr, interfaces: &[IpAddr]) -> Vec<String> {
    let port = bound.port();
    if !bound.ip().is_unspecified() {
        return vec![format!("http://{bound}")];
    }

    let mut urls = Vec::new();
    let candidates = interfaces
        .iter()
        .copied()
        .filter(|ip| !ip.is_loopback())
        .chain([IpAddr::V4(Ipv4Addr::LOCALHOST), IpAddr::V4(Ipv4Addr::UNSPECIFIED)]);
    for ip in candidates {
        let url = format!("http://{}", SocketAddr::new(ip, port));
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls
}

fn interface_addresses() -> Vec<IpAddr> {
    match if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces.iter().map(|iface| iface.ip()).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "could not enumerate network interfaces");
            Vec::new()
        }
    }
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        tracing::info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                tracing::info!("received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
