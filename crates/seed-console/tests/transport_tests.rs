use futures_util::{SinkExt, StreamExt};
use seed_console::transport::{TransportClient, TransportEvent};
use seed_core::console_ipc::{InboundMsg, LogPayload};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};

const WAIT: Duration = Duration::from_secs(5);

async fn next_event(rx: &mut mpsc::Receiver<TransportEvent>) -> TransportEvent {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("event before timeout")
        .expect("transport still running")
}

async fn loopback() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    (listener, format!("ws://{addr}"))
}

fn frame_text(msg: Message) -> String {
    match msg {
        Message::Text(text) => text,
        other => panic!("expected text frame, got {other:?}"),
    }
}

#[tokio::test]
async fn requests_strategy_status_and_survives_bad_frames() {
    let (listener, url) = loopback().await;
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut ws = accept_async(stream).await.expect("handshake");
        let first = ws.next().await.expect("frame").expect("frame ok");
        ws.send(Message::Text("{not json".to_string()))
            .await
            .expect("send bad");
        ws.send(Message::Text(
            r#"{"type":"log","payload":{"level":"warning","message":"low power"}}"#.to_string(),
        ))
        .await
        .expect("send log");
        let reply = ws.next().await.expect("reply").expect("reply ok");
        (frame_text(first), frame_text(reply))
    });

    let (events_tx, mut events_rx) = mpsc::channel(32);
    let handle = TransportClient::new(url.clone()).spawn(events_tx);

    assert_eq!(next_event(&mut events_rx).await, TransportEvent::Connecting { url });
    assert_eq!(next_event(&mut events_rx).await, TransportEvent::Connected);
    assert!(matches!(
        next_event(&mut events_rx).await,
        TransportEvent::DecodeFailed(_)
    ));
    assert_eq!(
        next_event(&mut events_rx).await,
        TransportEvent::Message(InboundMsg::Log(Some(LogPayload {
            level: Some("warning".to_string()),
            message: Some("low power".to_string()),
            timestamp: None,
        })))
    );

    handle
        .try_send(seed_core::console_ipc::OutboundMsg::Command(
            seed_core::console_ipc::CommandPayload {
                command: "scout".to_string(),
            },
        ))
        .expect("queued");

    let (first, reply) = tokio::time::timeout(WAIT, server)
        .await
        .expect("server done")
        .expect("server task");
    let first: Value = serde_json::from_str(&first).expect("json");
    assert_eq!(first["type"], "enemy_control");
    assert_eq!(first["payload"]["action"], "strategy_status");
    let reply: Value = serde_json::from_str(&reply).expect("json");
    assert_eq!(reply["type"], "command");
    assert_eq!(reply["payload"]["command"], "scout");

    handle.stop().await;
}

#[tokio::test]
async fn reconnects_once_after_server_close() {
    let (listener, url) = loopback().await;
    tokio::spawn(async move {
        for _ in 0..2 {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("handshake");
            let _ = ws.next().await;
            let _ = ws.close(None).await;
            while let Some(Ok(_)) = ws.next().await {}
        }
    });

    let delay = Duration::from_millis(100);
    let (events_tx, mut events_rx) = mpsc::channel(32);
    let handle = TransportClient::new(url.clone())
        .with_reconnect_delay(delay)
        .spawn(events_tx);

    assert_eq!(
        next_event(&mut events_rx).await,
        TransportEvent::Connecting { url: url.clone() }
    );
    assert_eq!(next_event(&mut events_rx).await, TransportEvent::Connected);
    assert!(matches!(
        next_event(&mut events_rx).await,
        TransportEvent::Disconnected { .. }
    ));
    assert_eq!(
        next_event(&mut events_rx).await,
        TransportEvent::ReconnectScheduled { delay }
    );
    assert_eq!(
        next_event(&mut events_rx).await,
        TransportEvent::Connecting { url }
    );
    assert_eq!(next_event(&mut events_rx).await, TransportEvent::Connected);

    handle.stop().await;
}

#[tokio::test]
async fn unreachable_server_keeps_retrying_on_schedule() {
    let (listener, url) = loopback().await;
    drop(listener);

    let delay = Duration::from_millis(50);
    let (events_tx, mut events_rx) = mpsc::channel(32);
    let handle = TransportClient::new(url.clone())
        .with_reconnect_delay(delay)
        .spawn(events_tx);

    for _ in 0..2 {
        assert!(matches!(
            next_event(&mut events_rx).await,
            TransportEvent::Connecting { .. }
        ));
        assert!(matches!(
            next_event(&mut events_rx).await,
            TransportEvent::Disconnected { .. }
        ));
        assert_eq!(
            next_event(&mut events_rx).await,
            TransportEvent::ReconnectScheduled { delay }
        );
    }

    handle.stop().await;
}
