// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end tests: a real relay process, real displays and the CLI.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::response::sse::{Event, Sse};
use axum::routing::get;
use axum::Router;
use futures_util::stream::{self, StreamExt};
use serde_json::json;
use tokio::sync::watch;

use marquee::config::ClientConfig;
use marquee::connection::ConnectionState;
use marquee::dispatch::{DisplayContent, DisplayState};
use marquee::run::{start_display, Display, Ports};
use marquee::sound::ALERT_SOUND;
use marquee::test_support::{FakeConnector, RecordingSound};
use marquee::transport::{SseConnector, WsConnector};
use marquee_specs::{ensure_crypto, free_port, marquee_cli, RelayProcess};

const WAIT: Duration = Duration::from_secs(15);

async fn wait_for_display(
    state: &mut watch::Receiver<DisplayState>,
    what: &str,
    pred: impl FnMut(&DisplayState) -> bool,
) -> anyhow::Result<DisplayState> {
    let seen = tokio::time::timeout(WAIT, state.wait_for(pred))
        .await
        .map_err(|_| anyhow::anyhow!("timed out waiting for {what}"))??;
    Ok((*seen).clone())
}

/// A display pushed to by `ws_url` with its stream port left idle.
async fn push_display(ws_url: String) -> anyhow::Result<(Display, Arc<RecordingSound>)> {
    let sound = Arc::new(RecordingSound::default());
    let (stream, _requests) = FakeConnector::new();
    let config = ClientConfig { ws_url, ..Default::default() };
    let ports = Ports { push: Arc::new(WsConnector), stream, sound: sound.clone() };
    let display = start_display(&config, "smoke", ports).await?;
    Ok((display, sound))
}

#[tokio::test]
async fn relay_reports_health_and_status() -> anyhow::Result<()> {
    let relay = RelayProcess::start()?;
    relay.wait_healthy(WAIT).await?;

    let health: serde_json::Value =
        reqwest::get(format!("{}/health", relay.base_url())).await?.json().await?;
    assert_eq!(health["status"], "running");

    let status: serde_json::Value =
        reqwest::get(format!("{}/status", relay.base_url())).await?.json().await?;
    assert_eq!(status["clients"], 0);
    assert!(status["uptimeSeconds"].is_u64());
    Ok(())
}

#[tokio::test]
async fn relay_rejects_malformed_send() -> anyhow::Result<()> {
    let relay = RelayProcess::start()?;
    relay.wait_healthy(WAIT).await?;

    let resp = reqwest::Client::new()
        .post(format!("{}/send", relay.base_url()))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 400);
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    Ok(())
}

#[tokio::test]
async fn pushed_message_reaches_display_and_expires() -> anyhow::Result<()> {
    let relay = RelayProcess::start()?;
    relay.wait_healthy(WAIT).await?;

    let (display, sound) = push_display(relay.ws_url()).await?;
    let mut state = display.state.clone();
    wait_for_display(&mut state, "push connected", |s| s.push == ConnectionState::Connected)
        .await?;
    relay.wait_for_clients(1, WAIT).await?;

    let sent = relay
        .send(&json!({"type": "text", "content": "Laundry done", "sound": "chime", "durationMs": 400}))
        .await?;
    assert_eq!(sent, 1);

    let shown = wait_for_display(&mut state, "message", |s| {
        matches!(s.content, DisplayContent::Message(_))
    })
    .await?;
    match shown.content {
        DisplayContent::Message(m) => assert_eq!(m.content.as_deref(), Some("Laundry done")),
        other => anyhow::bail!("unexpected content {other:?}"),
    }
    assert_eq!(sound.played(), vec!["chime".to_owned()]);

    wait_for_display(&mut state, "expiry", |s| s.content == DisplayContent::Idle).await?;

    display.shutdown().await?;
    relay.wait_for_clients(0, WAIT).await?;
    Ok(())
}

#[tokio::test]
async fn displays_do_not_receive_their_own_frames() -> anyhow::Result<()> {
    let relay = RelayProcess::start()?;
    relay.wait_healthy(WAIT).await?;

    let (first, _) = push_display(relay.ws_url()).await?;
    let (second, _) = push_display(relay.ws_url()).await?;
    relay.wait_for_clients(2, WAIT).await?;

    // Each display's hello is consumed by the relay, so both stay idle.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(first.state.borrow().content, DisplayContent::Idle);
    assert_eq!(second.state.borrow().content, DisplayContent::Idle);

    assert_eq!(relay.send(&json!({"type": "clear"})).await?, 2);

    first.shutdown().await?;
    second.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn display_reconnects_after_relay_restart() -> anyhow::Result<()> {
    let port = free_port()?;
    let mut relay = RelayProcess::start_on(port, 30_000)?;
    relay.wait_healthy(WAIT).await?;

    let (display, _) = push_display(relay.ws_url()).await?;
    let mut state = display.state.clone();
    wait_for_display(&mut state, "push connected", |s| s.push == ConnectionState::Connected)
        .await?;

    relay.kill()?;
    wait_for_display(&mut state, "push dropped", |s| s.push != ConnectionState::Connected)
        .await?;

    let relay = RelayProcess::start_on(port, 30_000)?;
    relay.wait_healthy(WAIT).await?;
    wait_for_display(&mut state, "push reconnected", |s| s.push == ConnectionState::Connected)
        .await?;
    relay.wait_for_clients(1, WAIT).await?;

    relay.send(&json!({"type": "alert", "title": "Back", "body": "Relay restarted"})).await?;
    wait_for_display(&mut state, "message after restart", |s| {
        matches!(&s.content, DisplayContent::Message(m) if m.title.as_deref() == Some("Back"))
    })
    .await?;

    display.shutdown().await?;
    Ok(())
}

fn reading(watts: f64) -> String {
    json!({
        "type": "power.reading",
        "timestamp": "2026-01-01T00:00:00Z",
        "watts": watts,
        "applianceId": "dryer",
        "nickname": "Dryer",
    })
    .to_string()
}

#[tokio::test]
async fn stream_readings_drive_power_content_and_alert() -> anyhow::Result<()> {
    ensure_crypto();
    let app = Router::new().route(
        "/events",
        get(|| async {
            let events = [reading(1500.0), reading(2500.0), reading(2600.0)]
                .into_iter()
                .map(|data| Ok::<_, Infallible>(Event::default().data(data)));
            Sse::new(stream::iter(events).chain(stream::pending()))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let sound = Arc::new(RecordingSound::default());
    let (push, _requests) = FakeConnector::new();
    let config = ClientConfig { sse_url: format!("http://{addr}/events"), ..Default::default() };
    let ports = Ports { push, stream: Arc::new(SseConnector::new()?), sound: sound.clone() };
    let display = start_display(&config, "smoke", ports).await?;
    let mut state = display.state.clone();

    let last = wait_for_display(&mut state, "final reading", |s| {
        matches!(&s.content, DisplayContent::Power(r) if r.watts == 2600.0)
    })
    .await?;
    assert_eq!(last.stream, ConnectionState::Connected);
    assert_eq!(sound.played(), vec![ALERT_SOUND.to_owned()]);

    display.shutdown().await?;
    Ok(())
}

#[test]
fn config_cli_persists_settings() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;

    let set = marquee_cli(
        dir.path(),
        &["config", "set", "--ws-url", "ws://relay.local/ws", "--brightness", "dark", "--threshold", "1500"],
    )?;
    assert!(set.status.success(), "config set failed: {}", String::from_utf8_lossy(&set.stderr));

    let show = marquee_cli(dir.path(), &["config", "show"])?;
    assert!(show.status.success());
    let config: serde_json::Value = serde_json::from_slice(&show.stdout)?;
    assert_eq!(config["wsUrl"], "ws://relay.local/ws");
    assert_eq!(config["sseUrl"], "");
    assert_eq!(config["brightnessMode"], "dark");
    assert_eq!(config["alertThresholdWatts"], 1500.0);
    assert!(dir.path().join("display-config.json").exists());
    Ok(())
}
