//! HTTP server listener
//!
//! Binds the listener, serves the router and coordinates graceful shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::error::Result;
use crate::relay::Relay;
use crate::server::config::ServerConfig;
use crate::server::handler::{self, AppState};

/// Relay HTTP server
pub struct RelayServer {
    state: AppState,
}

impl RelayServer {
    /// Create a new server for a started relay
    pub fn new(config: ServerConfig, relay: Arc<Relay>) -> Self {
        Self {
            state: AppState::new(relay, config),
        }
    }

    /// Get a reference to the relay
    pub fn relay(&self) -> &Arc<Relay> {
        &self.state.relay
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Build the HTTP router
    pub fn router(&self) -> Router {
        handler::router(self.state.clone())
    }

    /// Run the server
    ///
    /// This method runs until the listener fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.state.config.validate()?;
        let listener = TcpListener::bind(self.state.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` completes
    ///
    /// On shutdown every open SSE stream is ended so in-flight connections
    /// can drain. Fails with [`Error::Config`](crate::error::Error::Config)
    /// before serving if the configuration is invalid.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.state.config.validate()?;
        let addr = listener.local_addr()?;
        tracing::info!(addr = %addr, "Relay server listening");

        // Spawn reaper task for the subscriber registry
        let reaper_handle = self
            .state
            .relay
            .registry()
            .spawn_reaper(self.state.config.reap_interval);

        let closing = self.state.closing.clone();
        let signal = async move {
            shutdown.await;
            tracing::info!("Shutdown signal received");
            closing.disconnect();
        };

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(signal)
            .await;

        // Stop reaper task on shutdown
        reaper_handle.abort();

        result?;
        tracing::info!(addr = %addr, "Relay server stopped");
        Ok(())
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.state.config.bind_addr
    }
}
