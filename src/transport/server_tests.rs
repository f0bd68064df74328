use crate::broker::HubHandle;
use crate::config::Settings;
use crate::transport::server::{ServerHandle, start};
use crate::utils::error::RelayError;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

const T1: &str = "0f6f2a6e-5c1d-4b0e-9a59-1f6d3c1a2b01";
const T2: &str = "0f6f2a6e-5c1d-4b0e-9a59-1f6d3c1a2b02";
const T3: &str = "0f6f2a6e-5c1d-4b0e-9a59-1f6d3c1a2b03";

async fn start_relay() -> ServerHandle {
    start(&Settings::default(), "127.0.0.1:0")
        .await
        .expect("relay should start")
}

async fn subscribe(addr: SocketAddr, topic: &str) -> Ws {
    let (ws, _) = connect_async(format!("ws://{addr}/{topic}"))
        .await
        .expect("WebSocket handshake failed");
    ws
}

async fn wait_for_subscribers(hub: &HubHandle, topic: &str, expected: usize) {
    for _ in 0..200 {
        if hub.subscriber_count(topic).await.unwrap() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("topic {topic} never reached {expected} subscribers");
}

/// Next data frame, skipping keepalive traffic.
async fn next_frame(ws: &mut Ws) -> Option<Message> {
    loop {
        let next = tokio::time::timeout(Duration::from_millis(500), ws.next())
            .await
            .ok()??;
        match next {
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(msg) => return Some(msg),
            Err(_) => return None,
        }
    }
}

async fn post(addr: SocketAddr, topic: &str, body: &str) -> reqwest::StatusCode {
    reqwest::Client::new()
        .post(format!("http://{addr}/{topic}"))
        .body(body.to_string())
        .send()
        .await
        .expect("POST failed")
        .status()
}

#[tokio::test]
async fn publish_reaches_every_subscriber_of_the_topic() {
    let relay = start_relay().await;
    let mut a = subscribe(relay.addr, T1).await;
    let mut b = subscribe(relay.addr, T1).await;
    let mut c = subscribe(relay.addr, T3).await;
    wait_for_subscribers(&relay.hub, T1, 2).await;
    wait_for_subscribers(&relay.hub, T3, 1).await;

    let status = post(
        relay.addr,
        T1,
        r#"{ "tx": "y", "t": null, "sig": "s", "bn": 1, "a": "x" }"#,
    )
    .await;
    assert_eq!(status, reqwest::StatusCode::OK);

    let expected = r#"{"a":"x","bn":1,"sig":"s","t":null,"tx":"y"}"#;
    for ws in [&mut a, &mut b] {
        let frame = next_frame(ws).await.expect("subscriber should receive");
        assert!(frame.is_text());
        assert_eq!(frame.to_text().unwrap(), expected);
    }
    assert!(next_frame(&mut c).await.is_none());
}

#[tokio::test]
async fn publish_without_subscribers_is_not_an_error() {
    let relay = start_relay().await;
    let status = post(relay.addr, T2, r#"{"a":"x"}"#).await;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(relay.hub.subscriber_count(T2).await.unwrap(), 0);
}

#[tokio::test]
async fn publish_rejects_bad_topic_and_body_as_client_errors() {
    let relay = start_relay().await;
    let mut a = subscribe(relay.addr, T1).await;
    wait_for_subscribers(&relay.hub, T1, 1).await;

    let status = post(relay.addr, "not-a-valid-id", r#"{"a":"x"}"#).await;
    assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);

    let status = post(relay.addr, T1, "{not json").await;
    assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);

    assert!(next_frame(&mut a).await.is_none());
}

#[tokio::test]
async fn socket_frames_are_rebroadcast_on_the_same_topic() {
    let relay = start_relay().await;
    let mut a = subscribe(relay.addr, T1).await;
    let mut b = subscribe(relay.addr, T1).await;
    let mut c = subscribe(relay.addr, T3).await;
    wait_for_subscribers(&relay.hub, T1, 2).await;
    wait_for_subscribers(&relay.hub, T3, 1).await;

    a.send(Message::text("ping-from-client")).await.unwrap();

    let frame = next_frame(&mut b).await.expect("sibling should receive");
    assert_eq!(frame.to_text().unwrap(), "ping-from-client");
    // the sender is a subscriber too, so it hears its own frame
    let echo = next_frame(&mut a).await.expect("sender should receive echo");
    assert_eq!(echo.to_text().unwrap(), "ping-from-client");
    assert!(next_frame(&mut c).await.is_none());

    a.send(Message::binary(vec![1u8, 2, 3])).await.unwrap();
    let frame = next_frame(&mut b).await.expect("binary should be relayed");
    assert!(frame.is_binary());
    assert_eq!(&frame.into_data()[..], &[1u8, 2, 3]);
}

#[tokio::test]
async fn invalid_topic_subscription_is_closed_without_registration() {
    let relay = start_relay().await;
    let _existing = subscribe(relay.addr, T1).await;
    wait_for_subscribers(&relay.hub, T1, 1).await;

    let mut rejected = subscribe(relay.addr, "not-a-valid-id").await;
    let next = tokio::time::timeout(Duration::from_secs(2), rejected.next())
        .await
        .expect("socket should be closed promptly");
    assert!(!matches!(
        next,
        Some(Ok(Message::Text(_))) | Some(Ok(Message::Binary(_)))
    ));

    assert_eq!(relay.hub.subscriber_count("not-a-valid-id").await.unwrap(), 0);
    assert_eq!(relay.hub.subscriber_count(T1).await.unwrap(), 1);
}

#[tokio::test]
async fn closing_a_socket_unregisters_only_that_session() {
    let relay = start_relay().await;
    let mut a = subscribe(relay.addr, T1).await;
    let mut b = subscribe(relay.addr, T1).await;
    wait_for_subscribers(&relay.hub, T1, 2).await;

    a.close(None).await.unwrap();
    wait_for_subscribers(&relay.hub, T1, 1).await;

    post(relay.addr, T1, r#"{"a":"after"}"#).await;
    let frame = next_frame(&mut b).await.expect("remaining session still served");
    assert!(frame.to_text().unwrap().contains(r#""a":"after""#));
}

#[tokio::test]
async fn oversized_frame_tears_down_the_session() {
    let relay = start_relay().await;
    let mut a = subscribe(relay.addr, T1).await;
    let mut b = subscribe(relay.addr, T1).await;
    wait_for_subscribers(&relay.hub, T1, 2).await;

    let _ = a.send(Message::text("x".repeat(600))).await;
    wait_for_subscribers(&relay.hub, T1, 1).await;

    assert!(next_frame(&mut b).await.is_none());
}

#[tokio::test]
async fn start_refuses_a_zero_keepalive_window() {
    let mut settings = Settings::default();
    settings.relay.pong_wait_secs = 0;

    let err = start(&settings, "127.0.0.1:0").await.unwrap_err();
    assert!(matches!(err, RelayError::Config(_)));
}
