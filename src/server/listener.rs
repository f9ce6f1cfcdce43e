//! Gateway server
//!
//! Binds the listener, serves the HTTP/WebSocket router, and runs the
//! shutdown sequence:
//!
//! ```text
//!   shutdown signal
//!        │
//!        ├─► coordinator.begin_shutdown()   new upgrades get 503,
//!        │                                  open connections send Close
//!        ├─► axum stops accepting, drains HTTP requests
//!        ├─► coordinator.shutdown()         wait for connection tasks
//!        │                                  (bounded by shutdown_timeout)
//!        └─► media server stopped
//! ```

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::coordinator::Coordinator;
use crate::error::Result;
use crate::media::MediaServer;
use crate::server::config::GatewayConfig;

/// Signaling gateway server
pub struct GatewayServer {
    coordinator: Arc<Coordinator>,
    media: Option<MediaServer>,
}

impl GatewayServer {
    /// Create a new server from configuration
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let media = config
            .media_command
            .clone()
            .map(|command| MediaServer::new(command, config.media_args.clone()));

        Ok(Self {
            coordinator: Arc::new(Coordinator::new(config)?),
            media,
        })
    }

    /// Get a reference to the coordinator
    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    /// Build the HTTP router
    pub fn router(&self) -> Router {
        super::router(Arc::clone(&self.coordinator))
    }

    /// Run the server
    ///
    /// This method blocks until the process is killed.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.coordinator.config().bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let config = self.coordinator.config();
        tracing::info!(
            addr = %listener.local_addr()?,
            ws_path = %config.ws_path,
            auth_required = config.auth_required,
            bind_sessions = config.bind_sessions_to_connections,
            "Gateway listening"
        );

        self.start_media().await;

        let coordinator = Arc::clone(&self.coordinator);
        let signal = async move {
            shutdown.await;
            tracing::info!("Shutdown signal received");
            coordinator.begin_shutdown();
        };

        let served = axum::serve(listener, self.router())
            .with_graceful_shutdown(signal)
            .await;

        // Connections may still be draining even if serve failed
        self.coordinator.shutdown().await;
        self.stop_media().await;

        served?;
        tracing::info!("Gateway stopped");
        Ok(())
    }

    async fn start_media(&self) {
        let Some(ref media) = self.media else {
            return;
        };

        if let Err(e) = media.start().await {
            tracing::error!(
                command = %media.command().display(),
                error = %e,
                "Failed to launch media server"
            );
        }
    }

    async fn stop_media(&self) {
        if let Some(ref media) = self.media {
            media.stop().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = GatewayConfig::default();
        config.auth_required = true;

        assert!(GatewayServer::new(config).is_err());
    }

    #[tokio::test]
    async fn test_serve_stops_on_signal() {
        let server = GatewayServer::new(
            GatewayConfig::default().shutdown_timeout(Duration::from_millis(200)),
        )
        .unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        tx.send(()).unwrap();

        tokio::time::timeout(
            Duration::from_secs(5),
            server.serve(listener, async {
                let _ = rx.await;
            }),
        )
        .await
        .unwrap()
        .unwrap();

        assert!(server.coordinator().is_shutting_down());
    }

    #[tokio::test]
    async fn test_media_launch_failure_is_not_fatal() {
        let config = GatewayConfig::default()
            .media_server("/nonexistent/streamnet-media-server", Vec::new());
        let server = GatewayServer::new(config).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            server.serve(listener, async {}),
        )
        .await
        .unwrap();

        assert!(result.is_ok());
    }
}
