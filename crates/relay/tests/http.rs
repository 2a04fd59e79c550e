// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Relay HTTP API over `axum_test::TestServer`; no real TCP needed.

use std::sync::Arc;

use axum::http::{header, HeaderValue, StatusCode};
use axum_test::TestServer;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use marquee_relay::config::RelayConfig;
use marquee_relay::registry::SessionGuard;
use marquee_relay::state::RelayState;
use marquee_relay::transport::build_router;

fn test_state() -> Arc<RelayState> {
    let config = RelayConfig { host: "127.0.0.1".into(), port: 0, ..Default::default() };
    Arc::new(RelayState::new(config, CancellationToken::new()))
}

fn test_server(state: Arc<RelayState>) -> anyhow::Result<TestServer> {
    Ok(TestServer::new(build_router(state))?)
}

/// Register a ready session directly, bypassing the WebSocket upgrade.
fn fake_display(
    state: &RelayState,
) -> (mpsc::Receiver<axum::extract::ws::Utf8Bytes>, SessionGuard) {
    let (tx, rx) = mpsc::channel(8);
    let (session, guard) = state.registry.register(tx);
    session.mark_ready();
    (rx, guard)
}

#[tokio::test]
async fn health_reports_running() -> anyhow::Result<()> {
    let server = test_server(test_state())?;
    let resp = server.get("/health").await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "running");
    Ok(())
}

#[tokio::test]
async fn status_counts_clients() -> anyhow::Result<()> {
    let state = test_state();
    let (_rx1, _g1) = fake_display(&state);
    let (_rx2, _g2) = fake_display(&state);

    let server = test_server(Arc::clone(&state))?;
    let resp = server.get("/status").await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["clients"], 2);
    assert!(body["uptimeSeconds"].is_u64());
    Ok(())
}

#[tokio::test]
async fn send_broadcasts_to_every_ready_display() -> anyhow::Result<()> {
    let state = test_state();
    let (mut rx1, _g1) = fake_display(&state);
    let (mut rx2, _g2) = fake_display(&state);
    // Registered but never marked ready: skipped.
    let (tx, mut rx3) = mpsc::channel(8);
    let (_pending, _g3) = state.registry.register(tx);

    let server = test_server(Arc::clone(&state))?;
    let resp = server
        .post("/send")
        .json(&serde_json::json!({"type": "text", "content": "Dinner!", "durationMs": 5000}))
        .await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body, serde_json::json!({"ok": true, "clients": 2}));

    let expected = serde_json::json!({"type": "text", "content": "Dinner!", "durationMs": 5000});
    for rx in [&mut rx1, &mut rx2] {
        let frame: serde_json::Value = serde_json::from_str(rx.try_recv()?.as_str())?;
        assert_eq!(frame, expected);
    }
    assert!(rx3.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn send_forwards_the_body_unchanged() -> anyhow::Result<()> {
    let state = test_state();
    let (mut rx, _g) = fake_display(&state);
    let server = test_server(Arc::clone(&state))?;

    let raw = r#"{"type":"alert","title":"Door","body":"Open","zone":"garage"}"#;
    let resp = server.post("/send").text(raw).await;
    resp.assert_status_ok();
    assert_eq!(rx.try_recv()?.as_str(), raw);
    Ok(())
}

#[tokio::test]
async fn send_with_no_displays_reports_zero() -> anyhow::Result<()> {
    let server = test_server(test_state())?;
    let resp = server.post("/send").json(&serde_json::json!({"type": "clear"})).await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["clients"], 0);
    Ok(())
}

#[tokio::test]
async fn send_rejects_malformed_json() -> anyhow::Result<()> {
    let state = test_state();
    let (mut rx, _g) = fake_display(&state);
    let server = test_server(Arc::clone(&state))?;

    let resp = server.post("/send").text("{not json").await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(body["error"]["message"].as_str().is_some_and(|m| !m.is_empty()));
    assert!(rx.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn send_rejects_unknown_message_type() -> anyhow::Result<()> {
    let server = test_server(test_state())?;
    let resp = server.post("/send").json(&serde_json::json!({"type": "video"})).await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn cors_is_permissive() -> anyhow::Result<()> {
    let server = test_server(test_state())?;
    let resp = server
        .get("/status")
        .add_header(header::ORIGIN, HeaderValue::from_static("http://operator.local"))
        .await;
    resp.assert_status_ok();
    assert_eq!(resp.header(header::ACCESS_CONTROL_ALLOW_ORIGIN).to_str()?, "*");
    Ok(())
}
