// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the relay.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::Utf8Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use marquee::protocol::DisplayMessage;

use crate::error::RelayError;
use crate::state::RelayState;

// -- Response types -----------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub clients: usize,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub ok: bool,
    pub clients: usize,
}

// -- Handlers -----------------------------------------------------------------

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "running" })
}

/// `GET /status`
pub async fn status(State(s): State<Arc<RelayState>>) -> impl IntoResponse {
    Json(StatusResponse {
        clients: s.registry.len(),
        uptime_seconds: s.started_at.elapsed().as_secs(),
    })
}

/// `POST /send`: validate one display message and broadcast the body as
/// sent to every ready display.
pub async fn send(State(s): State<Arc<RelayState>>, body: Bytes) -> impl IntoResponse {
    let message: DisplayMessage = match serde_json::from_slice(&body) {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!(err = %e, "rejecting malformed send body");
            return RelayError::BadRequest.to_http_response(e.to_string()).into_response();
        }
    };
    let frame = match String::from_utf8(body.to_vec()) {
        Ok(text) => Utf8Bytes::from(text),
        Err(e) => return RelayError::BadRequest.to_http_response(e.to_string()).into_response(),
    };

    let clients = s.registry.broadcast(frame, None);
    tracing::info!(kind = %message.kind, clients, "message broadcast");
    Json(SendResponse { ok: true, clients }).into_response()
}
