use seed_console::service::{
    spawn_action, ServiceAction, ServiceClient, ServiceError, ServiceEvent, ServiceReply,
};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

const WAIT: Duration = Duration::from_secs(5);

struct Canned {
    status: &'static str,
    body: &'static str,
}

/// Answers each connection with the next canned response and reports the
/// request line it saw.
async fn responder(responses: Vec<Canned>) -> (String, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        for canned in responses {
            let (mut stream, _) = listener.accept().await.expect("accept");
            let mut buf = vec![0u8; 8192];
            let mut read = 0;
            loop {
                let n = stream.read(&mut buf[read..]).await.expect("read");
                read += n;
                if n == 0 || buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            let request = String::from_utf8_lossy(&buf[..read]);
            let request_line = request.lines().next().unwrap_or_default().to_string();
            let _ = seen_tx.send(request_line);
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                canned.status,
                canned.body.len(),
                canned.body
            );
            stream
                .write_all(response.as_bytes())
                .await
                .expect("write");
            let _ = stream.shutdown().await;
        }
    });
    (format!("http://{addr}/api/"), seen_rx)
}

#[tokio::test]
async fn action_posts_to_named_endpoint() {
    let (base, mut seen) = responder(vec![Canned {
        status: "200 OK",
        body: r#"{"success":true,"message":"Game started"}"#,
    }])
    .await;
    let client = ServiceClient::new(&base).expect("client");

    let reply = client.action(ServiceAction::Start).await.expect("reply");
    assert_eq!(
        reply,
        ServiceReply {
            success: true,
            message: "Game started".to_string()
        }
    );
    assert_eq!(
        seen.recv().await.expect("request"),
        "POST /api/start HTTP/1.1"
    );
}

#[tokio::test]
async fn json_error_body_is_still_a_reply() {
    let (base, _seen) = responder(vec![Canned {
        status: "500 Internal Server Error",
        body: r#"{"success":false,"message":"build failed"}"#,
    }])
    .await;
    let client = ServiceClient::new(&base).expect("client");

    let reply = client.action(ServiceAction::Build).await.expect("reply");
    assert!(!reply.success);
    assert_eq!(reply.message, "build failed");
}

#[tokio::test]
async fn non_json_error_maps_to_api_error() {
    let (base, _seen) = responder(vec![Canned {
        status: "502 Bad Gateway",
        body: "upstream down",
    }])
    .await;
    let client = ServiceClient::new(&base).expect("client");

    let err = client.status().await.expect_err("api error");
    assert_eq!(
        err,
        ServiceError::Api {
            status: 502,
            message: "upstream down".to_string()
        }
    );
}

#[tokio::test]
async fn spawned_action_reports_result_then_status() {
    let (base, mut seen) = responder(vec![
        Canned {
            status: "200 OK",
            body: r#"{"success":true,"message":"AI started"}"#,
        },
        Canned {
            status: "200 OK",
            body: r#"{"game":"running","ai":"running","vnc":"running"}"#,
        },
    ])
    .await;
    let client = ServiceClient::new(&base).expect("client");
    let (events_tx, mut events_rx) = mpsc::channel(4);

    spawn_action(client, ServiceAction::StartAi, events_tx);

    let first = tokio::time::timeout(WAIT, events_rx.recv())
        .await
        .expect("first event")
        .expect("open");
    match first {
        ServiceEvent::ActionDone { action, result } => {
            assert_eq!(action, ServiceAction::StartAi);
            assert_eq!(result.expect("reply").message, "AI started");
        }
        other => panic!("expected action result, got {other:?}"),
    }

    let second = tokio::time::timeout(WAIT, events_rx.recv())
        .await
        .expect("second event")
        .expect("open");
    match second {
        ServiceEvent::Status(status) => {
            assert!(status.game_running());
            assert!(status.ai_running());
            assert_eq!(status.vnc.as_deref(), Some("running"));
        }
        other => panic!("expected status, got {other:?}"),
    }

    assert_eq!(seen.recv().await.expect("req"), "POST /api/start_ai HTTP/1.1");
    assert_eq!(seen.recv().await.expect("req"), "GET /api/status HTTP/1.1");
}
