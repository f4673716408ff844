use std::future::Future;
use std::sync::Arc;

use cidgate_core::ContentService;
use cidgate_store::KuboClient;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::auth::CredentialTable;
use crate::config::{GatekeeperConfig, ServerConfig};
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// cidgate HTTP server.
pub struct GatekeeperServer {
    config: ServerConfig,
    state: AppState,
}

impl GatekeeperServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Wire a Kubo-backed service from validated gatekeeper settings.
    pub fn from_config(config: ServerConfig, gatekeeper: &GatekeeperConfig) -> ServerResult<Self> {
        gatekeeper.validate()?;
        let store = KuboClient::new(&gatekeeper.kubo_client)
            .map_err(|e| ServerError::Config(e.to_string()))?;
        let service = ContentService::with_store(Arc::new(store), gatekeeper.ipfs_mfs_root.clone());
        let credentials = CredentialTable::new(&gatekeeper.basic_auth_users);
        Ok(Self::new(config, AppState::new(service, credentials)))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone(), self.config.max_upload_size)
    }

    /// Serve until SIGINT or SIGTERM.
    pub async fn serve(self) -> ServerResult<()> {
        self.serve_with_shutdown(shutdown_signal()).await
    }

    /// Serve until `signal` resolves, then finish in-flight requests.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!("Listening on {}", listener.local_addr()?);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                signal.await;
                info!("Stopping...");
            })
            .await?;
        info!("Stopped");
        Ok(())
    }
}

/// Resolves on the first SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {}
        _ = terminate => {}
    }
}
