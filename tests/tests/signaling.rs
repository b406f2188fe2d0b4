mod utils;
#[allow(unused)]
use utils::*;

use flock::prelude::*;
use flock_core::Operation;
use mock_signaling::{MockConfig, MockServer};
use std::sync::Arc;
use std::time::Duration;

fn stay_connected() -> ScenarioProgram {
    ScenarioProgram::new(vec![Operation::Reconnect, Operation::sleep(10_000)], 1).unwrap()
}

#[tokio::test]
async fn handshake_and_graceful_shutdown() -> anyhow::Result<()> {
    init();
    let server = MockServer::spawn(MockConfig::default()).await?;

    let mut timeline = Timeline::with_media(Arc::new(NullMediaEngine));
    let mut events = timeline.event_tap();
    let config = SessionConfig::new("e2e", &[server.url().as_str()]);
    let client = timeline.add_client(config)?;
    timeline.play(client, stay_connected());
    let handle = timeline.handle();
    let run = tokio::spawn(timeline.run());

    wait_for(&mut events, |e| {
        matches!(e, SessionEvent::AnswerSent { kind: "answer" })
    })
    .await?;
    let connect = &server.received_of("connect")[0];
    assert_eq!(connect["channel_id"], "e2e");
    assert_eq!(connect["role"], "sendonly");
    eventually(|| server.received_of("answer").len() == 1).await?;

    let stats = handle.snapshot().await.unwrap();
    assert_eq!(stats[0].session_id.as_deref(), Some("session-0"));
    assert!(stats[0].websocket_connected);

    handle.shutdown();
    tokio::time::timeout(Duration::from_secs(10), run).await??;
    eventually(|| server.received_of("disconnect").len() == 1).await?;
    Ok(())
}

#[tokio::test]
async fn follows_redirects() -> anyhow::Result<()> {
    init();
    let target = MockServer::spawn(MockConfig::default()).await?;
    let front = MockServer::spawn(MockConfig {
        redirect_to: Some(target.url()),
        ..Default::default()
    })
    .await?;

    let mut timeline = Timeline::with_media(Arc::new(NullMediaEngine));
    let mut events = timeline.event_tap();
    let config = SessionConfig::new("e2e", &[front.url().as_str()]);
    let client = timeline.add_client(config)?;
    timeline.play(client, stay_connected());
    let handle = timeline.handle();
    tokio::spawn(timeline.run());

    let connected = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::Connected { redirect: true, .. })
    })
    .await?;
    assert_eq!(
        connected.event,
        SessionEvent::Connected {
            url: target.url(),
            redirect: true
        }
    );
    wait_for(&mut events, |e| matches!(e, SessionEvent::AnswerSent { .. })).await?;

    assert_eq!(front.connections(), 1);
    assert_eq!(target.received_of("connect")[0]["redirect"], true);
    assert_eq!(handle.snapshot().await.unwrap()[0].retry, 0);
    handle.shutdown();
    Ok(())
}

#[tokio::test]
async fn answers_pings_with_stats() -> anyhow::Result<()> {
    init();
    let server = MockServer::spawn(MockConfig {
        ping_interval: Some(Duration::from_millis(100)),
        ping_stats: true,
        ..Default::default()
    })
    .await?;

    let mut timeline = Timeline::with_media(Arc::new(NullMediaEngine));
    let mut events = timeline.event_tap();
    let config = SessionConfig::new("e2e", &[server.url().as_str()]);
    let client = timeline.add_client(config)?;
    timeline.play(client, stay_connected());
    let handle = timeline.handle();
    tokio::spawn(timeline.run());

    wait_for(&mut events, |e| {
        matches!(e, SessionEvent::PongSent { with_stats: true })
    })
    .await?;
    eventually(|| !server.received_of("pong").is_empty()).await?;
    assert_eq!(server.received_of("pong")[0]["stats"], serde_json::json!([]));
    handle.shutdown();
    Ok(())
}

#[tokio::test]
async fn skips_unreachable_candidates() -> anyhow::Result<()> {
    init();
    let server = MockServer::spawn(MockConfig::default()).await?;
    let config = SessionConfig::new(
        "e2e",
        &["ws://127.0.0.1:1/signaling", server.url().as_str()],
    );

    let mut timeline = Timeline::with_media(Arc::new(NullMediaEngine));
    let mut events = timeline.event_tap();
    let client = timeline.add_client(config)?;
    timeline.play(client, stay_connected());
    let handle = timeline.handle();
    tokio::spawn(timeline.run());

    let connected = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::Connected { .. })
    })
    .await?;
    assert_eq!(
        connected.event,
        SessionEvent::Connected {
            url: server.url(),
            redirect: false
        }
    );
    handle.shutdown();
    Ok(())
}
