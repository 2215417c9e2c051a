//! HTTP request handlers
//!
//! Each SSE stream is ended by the server's closing flag or by hyper
//! dropping the body when a write fails. A silent peer is only noticed
//! when a keep-alive comment is written, so `keep_alive_interval` bounds
//! how long a dead subscriber stays registered.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures::StreamExt;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::relay::Relay;
use crate::sink::DisconnectFlag;
use crate::stats::StatsSnapshot;

use super::config::ServerConfig;

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
    pub config: Arc<ServerConfig>,
    /// Flipped when the server starts shutting down; ends every SSE stream
    pub closing: DisconnectFlag,
}

impl AppState {
    pub fn new(relay: Arc<Relay>, config: ServerConfig) -> Self {
        Self {
            relay,
            config: Arc::new(config),
            closing: DisconnectFlag::new(),
        }
    }
}

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/subscribe", get(subscribe))
        .route("/stats", get(stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Service liveness
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Service is running" }))
}

/// Relay counters
pub async fn stats(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.relay.stats())
}

/// Open a Server-Sent Events stream of inbound messages
pub async fn subscribe(State(state): State<AppState>) -> Response {
    let subscription = match state.relay.subscribe() {
        Ok(sub) => sub,
        Err(e) => {
            tracing::warn!(error = %e, "Subscribe rejected");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "message": e.to_string() })),
            )
                .into_response();
        }
    };

    tracing::info!(subscriber = %subscription.id(), "SSE stream opened");

    let event_name = state.config.event_name.clone();
    let stream = subscription
        .with_liveness(state.closing.clone(), state.config.liveness_interval)
        .map(move |frame| Ok::<_, Infallible>(Event::default().event(&event_name).data(frame.json())));

    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(state.config.keep_alive_interval))
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LoopbackClient;
    use crate::registry::RegistryConfig;
    use crate::relay::RelayConfig;

    fn state(max_subscribers: usize) -> AppState {
        let (client, _feeder) = LoopbackClient::with_wxid("wxid_self");
        let config = RelayConfig::default()
            .no_notify()
            .registry(RegistryConfig::default().max_subscribers(max_subscribers));
        let relay = Relay::start(Arc::new(client), config).unwrap();
        AppState::new(Arc::new(relay), ServerConfig::default())
    }

    #[tokio::test]
    async fn test_root() {
        let Json(body) = root().await;
        assert_eq!(body["message"], "Service is running");
    }

    #[tokio::test]
    async fn test_subscribe_registers() {
        let state = state(0);

        let response = subscribe(State(state.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/event-stream"
        );
        assert_eq!(state.relay.registry().len(), 1);

        // Dropping the body is what a disconnect looks like to the handler
        drop(response);
        assert!(state.relay.registry().is_empty());

        state.relay.shutdown().await;
    }

    #[tokio::test]
    async fn test_subscribe_over_limit() {
        let state = state(1);

        let first = subscribe(State(state.clone())).await;
        let second = subscribe(State(state.clone())).await;

        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);

        drop(first);
        state.relay.shutdown().await;
    }

    #[tokio::test]
    async fn test_stats() {
        let state = state(0);
        let _held = state.relay.subscribe().unwrap();

        let Json(snapshot) = stats(State(state.clone())).await;
        assert_eq!(snapshot.active_subscribers, 1);
        assert_eq!(snapshot.subscribers_added, 1);

        state.relay.shutdown().await;
    }
}
