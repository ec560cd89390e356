use crate::config::ServerConfig;
use crate::hub::{HUB_CHANNEL_CAPACITY, Hub, HubCommand};
use crate::proxy::{ProxyClient, detect_handler, translate_handler};
use crate::signaling::{SignalingService, ws_handler};
use anyhow::{Context, Result};
use axum::Router;
use axum::extract::FromRef;
use axum::routing::{get, post};
use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub signaling: SignalingService,
    pub proxy: ProxyClient,
}

impl FromRef<AppState> for SignalingService {
    fn from_ref(state: &AppState) -> Self {
        state.signaling.clone()
    }
}

impl FromRef<AppState> for ProxyClient {
    fn from_ref(state: &AppState) -> Self {
        state.proxy.clone()
    }
}

pub fn build_router(state: AppState, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/ws", get(ws_handler))
        .route("/detect", post(detect_handler))
        .route("/translate", post(translate_handler))
        .route("/health", get(health_check));

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

/// A bound, not yet running signaling server.
pub struct SignalingServer {
    listener: TcpListener,
    router: Router,
    signaling: SignalingService,
    hub: Hub,
}

impl SignalingServer {
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let (hub_tx, hub_rx) = mpsc::channel(HUB_CHANNEL_CAPACITY);
        let signaling = SignalingService::new(hub_tx, config.ice_servers.clone());
        let hub = Hub::new(hub_rx, Arc::new(signaling.clone()));

        let proxy = ProxyClient::new(&config).context("Failed to create proxy client")?;
        let state = AppState {
            signaling: signaling.clone(),
            proxy,
        };
        let router = build_router(state, config.static_dir.as_deref());

        let listener = TcpListener::bind(config.bind)
            .await
            .with_context(|| format!("Failed to bind {}", config.bind))?;

        Ok(Self {
            listener,
            router,
            signaling,
            hub,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Listener has no local address")
    }

    /// Serve until `shutdown` resolves, then close every socket and stop the hub.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.local_addr()?;
        info!("Signaling server listening on http://{}", addr);

        let hub_task = tokio::spawn(self.hub.run());

        let signaling = self.signaling.clone();
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                info!("Shutdown requested, closing {} sockets", signaling.connection_count());
                signaling.close_all();
            })
            .await
            .context("Server error")?;

        self.signaling.submit(HubCommand::Shutdown).await;
        let _ = hub_task.await;

        info!("Signaling server stopped");
        Ok(())
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
