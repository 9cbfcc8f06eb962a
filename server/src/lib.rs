//! HTTP API for the tracking service.
//!
//! Consoles post form-encoded requests to `/`; the reply is the wire text
//! unless the query carries `json=true`.

use axum::{
    extract::{ConnectInfo, Query, State},
    http::{Extensions, HeaderMap},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Form, Router,
};
use chrono::{SecondsFormat, Utc};
use danceparty_store::TrackingStore;
use danceparty_tracking::{TrackingRequest, TrackingService};
use danceparty_wire::{ReturnCode, WireResponse};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::error;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

/// Query parameters accepted alongside the form body.
#[derive(Deserialize, Debug, Default)]
pub struct ResponseFormat {
    pub json: Option<String>,
}

impl ResponseFormat {
    fn is_json(&self) -> bool {
        self.json.as_deref() == Some("true")
    }
}

/// Picks the address recorded for a session: the first `X-Forwarded-For`
/// entry when present, otherwise the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match forwarded {
        Some(raw) => raw
            .parse::<IpAddr>()
            .map(|ip| ip.to_canonical().to_string())
            .unwrap_or_else(|_| raw.to_string()),
        None => peer
            .map(|addr| addr.ip().to_canonical().to_string())
            .unwrap_or_default(),
    }
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

async fn protocol_handler<S>(
    State(service): State<Arc<TrackingService<S>>>,
    Query(format): Query<ResponseFormat>,
    headers: HeaderMap,
    extensions: Extensions,
    Form(request): Form<TrackingRequest>,
) -> Response
where
    S: TrackingStore + 'static,
{
    let peer = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(&headers, peer);

    // Store calls block; keep them off the async workers.
    let response = tokio::task::spawn_blocking(move || service.handle(&request, &ip))
        .await
        .unwrap_or_else(|e| {
            error!("request handler failed: {}", e);
            WireResponse::status(ReturnCode::InternalError)
        });

    if format.is_json() {
        Json(response.to_json()).into_response()
    } else {
        response.encode().into_response()
    }
}

/// Build the HTTP API router over the given service.
pub fn build_router<S>(service: Arc<TrackingService<S>>) -> Router
where
    S: TrackingStore + 'static,
{
    Router::new()
        .route("/", post(protocol_handler::<S>))
        .route("/health", get(health_handler))
        .with_state(service)
}
