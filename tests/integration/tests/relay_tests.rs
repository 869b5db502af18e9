//! Relay Integration Tests
//!
//! Two gateway nodes share an in-memory broadcast medium and a store, the
//! way two processes share Redis and a database.
//!
//! Run with: cargo test -p relay-integration-tests --test relay_tests

use relay_broadcast::Topic;
use relay_integration_tests::TestCluster;
use relay_gateway::MessageEnvelope;
use reqwest::StatusCode;
use serde_json::json;

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let cluster = TestCluster::new();
    let node = cluster.start_node("node-a").await.unwrap();

    let response = node.http_get("/health").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_websocket_route_rejects_plain_http() {
    let cluster = TestCluster::new();
    let node = cluster.start_node("node-a").await.unwrap();

    let response = node.http_get("/ws").await.unwrap();
    assert!(response.status().is_client_error(), "{}", response.status());
    assert_eq!(node.state.registry().connection_count(), 0);
}

// ============================================================================
// Join Tests
// ============================================================================

#[tokio::test]
async fn test_join_returns_room() {
    let cluster = TestCluster::new();
    let node = cluster.start_node("node-a").await.unwrap();
    let mut client = node.connect().await.unwrap();

    let data = client.join_and_wait(5).await.unwrap();
    assert_eq!(data["room"]["id"], 5);
    assert_eq!(data["room"]["name"], "Rust");

    client.expect_silence().await.unwrap();
    assert_eq!(node.state.registry().member_count("room:5"), 1);
}

#[tokio::test]
async fn test_root_path_accepts_websocket() {
    let cluster = TestCluster::new();
    let node = cluster.start_node("node-a").await.unwrap();
    let mut client = node.connect_path("/").await.unwrap();

    let data = client.join_and_wait(1).await.unwrap();
    assert_eq!(data["room"]["name"], "General");
}

#[tokio::test]
async fn test_join_missing_room_is_silent() {
    let cluster = TestCluster::new();
    let node = cluster.start_node("node-a").await.unwrap();
    let mut client = node.connect().await.unwrap();

    client.join(999).await.unwrap();
    client.expect_silence().await.unwrap();
    assert_eq!(node.state.registry().member_count("room:999"), 0);

    // The connection is still usable
    client.join_and_wait(5).await.unwrap();
}

#[tokio::test]
async fn test_join_missing_room_with_emit_policy() {
    let cluster = TestCluster::new();
    let node = cluster
        .start_node_with("node-a", &[("GATEWAY_ERROR_POLICY", "emit")])
        .await
        .unwrap();
    let mut client = node.connect().await.unwrap();

    client.join(999).await.unwrap();
    let data = client.expect_event("error").await.unwrap();
    assert_eq!(data["event"], "join");
    assert_eq!(data["code"], "UNKNOWN_ROOM");
}

#[tokio::test]
async fn test_join_twice_delivers_once() {
    let cluster = TestCluster::new();
    let node = cluster.start_node("node-a").await.unwrap();
    let mut client = node.connect().await.unwrap();

    client.join_and_wait(5).await.unwrap();
    client.join_and_wait(5).await.unwrap();
    assert_eq!(node.state.registry().member_count("room:5"), 1);

    client.say(1, 5, "once").await.unwrap();
    let data = client.expect_event("message").await.unwrap();
    assert_eq!(data["chat"]["content"], "once");
    client.expect_silence().await.unwrap();
}

// ============================================================================
// Relay Tests
// ============================================================================

#[tokio::test]
async fn test_message_reaches_both_nodes() {
    let cluster = TestCluster::new();
    let node_a = cluster.start_node("node-a").await.unwrap();
    let node_b = cluster.start_node("node-b").await.unwrap();

    let mut client_a = node_a.connect().await.unwrap();
    let mut client_b = node_b.connect().await.unwrap();
    client_a.join_and_wait(5).await.unwrap();
    client_b.join_and_wait(5).await.unwrap();

    client_a.say(1, 5, "hi").await.unwrap();

    let on_a = client_a.expect_event("message").await.unwrap();
    let on_b = client_b.expect_event("message").await.unwrap();
    assert_eq!(on_a["chat"]["content"], "hi");
    assert_eq!(on_b["chat"]["content"], "hi");
    assert_eq!(on_a["chat"]["roomId"], 5);
    assert_eq!(on_a, on_b);

    // Exactly one delivery each
    client_a.expect_silence().await.unwrap();
    client_b.expect_silence().await.unwrap();

    // Exactly one envelope, stamped with the sender's origin
    let published = cluster.bus().published_on(&Topic::ChatMessages);
    assert_eq!(published.len(), 1);
    let envelope = MessageEnvelope::from_json(&published[0]).unwrap();
    assert_eq!(envelope.source_origin, "node-a");
    assert_eq!(envelope.chat_model.content, "hi");
}

#[tokio::test]
async fn test_message_stays_in_its_room() {
    let cluster = TestCluster::new();
    let node_a = cluster.start_node("node-a").await.unwrap();
    let node_b = cluster.start_node("node-b").await.unwrap();

    let mut sender = node_a.connect().await.unwrap();
    let mut same_room = node_b.connect().await.unwrap();
    let mut other_room = node_b.connect().await.unwrap();
    let mut no_room = node_a.connect().await.unwrap();

    sender.join_and_wait(5).await.unwrap();
    same_room.join_and_wait(5).await.unwrap();
    other_room.join_and_wait(2).await.unwrap();

    sender.say(2, 5, "rust only").await.unwrap();

    assert_eq!(
        same_room.expect_event("message").await.unwrap()["chat"]["sender"]["name"],
        "bob"
    );
    sender.expect_event("message").await.unwrap();
    other_room.expect_silence().await.unwrap();
    no_room.expect_silence().await.unwrap();
}

#[tokio::test]
async fn test_invalid_message_is_not_published() {
    let cluster = TestCluster::new();
    let node = cluster.start_node("node-a").await.unwrap();
    let mut client = node.connect().await.unwrap();
    client.join_and_wait(5).await.unwrap();

    client.say(1, 5, "   ").await.unwrap();
    client.say(42, 5, "unknown user").await.unwrap();
    client.say(1, 999, "unknown room").await.unwrap();
    client.expect_silence().await.unwrap();

    assert!(cluster.bus().published_on(&Topic::ChatMessages).is_empty());

    // A valid message still goes through afterwards
    client.say(1, 5, "ok").await.unwrap();
    assert_eq!(client.expect_event("message").await.unwrap()["chat"]["content"], "ok");
}

#[tokio::test]
async fn test_disconnect_leaves_rooms() {
    let cluster = TestCluster::new();
    let node_a = cluster.start_node("node-a").await.unwrap();
    let node_b = cluster.start_node("node-b").await.unwrap();

    let mut leaving = node_b.connect().await.unwrap();
    leaving.join_and_wait(5).await.unwrap();
    assert_eq!(node_b.state.registry().member_count("room:5"), 1);
    drop(leaving);

    let mut sender = node_a.connect().await.unwrap();
    sender.join_and_wait(5).await.unwrap();

    // Give the server time to notice the dropped socket
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert_eq!(node_b.state.registry().member_count("room:5"), 0);
    assert_eq!(node_b.state.registry().connection_count(), 0);

    sender.say(1, 5, "anyone?").await.unwrap();
    sender.expect_event("message").await.unwrap();
}

// ============================================================================
// Protocol Tests
// ============================================================================

#[tokio::test]
async fn test_undecodable_frame_closes_with_4002() {
    let cluster = TestCluster::new();
    let node = cluster.start_node("node-a").await.unwrap();
    let mut client = node.connect().await.unwrap();

    client.send_text("not json").await.unwrap();
    assert_eq!(client.recv_close_code().await.unwrap(), Some(4002));
}

#[tokio::test]
async fn test_binary_frame_closes_with_4003() {
    let cluster = TestCluster::new();
    let node = cluster.start_node("node-a").await.unwrap();
    let mut client = node.connect().await.unwrap();

    client.send_binary(vec![1, 2, 3]).await.unwrap();
    assert_eq!(client.recv_close_code().await.unwrap(), Some(4003));
}

#[tokio::test]
async fn test_unknown_event_and_bad_payload_are_ignored() {
    let cluster = TestCluster::new();
    let node = cluster.start_node("node-a").await.unwrap();
    let mut client = node.connect().await.unwrap();

    client.send_event("typing", json!({ "roomId": 5 })).await.unwrap();
    client.send_event("join", json!({ "roomId": "five" })).await.unwrap();
    client.expect_silence().await.unwrap();

    client.join_and_wait(5).await.unwrap();
}

// ============================================================================
// Adapter Tests
// ============================================================================

#[tokio::test]
async fn test_adapter_broadcast_reaches_remote_room() {
    let cluster = TestCluster::new();
    let node_a = cluster.start_node("node-a").await.unwrap();
    let node_b = cluster.start_node("node-b").await.unwrap();

    let mut client_a = node_a.connect().await.unwrap();
    let mut client_b = node_b.connect().await.unwrap();
    client_a.join_and_wait(5).await.unwrap();
    client_b.join_and_wait(5).await.unwrap();

    let adapter = node_a.state.adapter().unwrap();
    let frame = relay_gateway::protocol::EventFrame::new("notice", json!({ "text": "hello" }));
    adapter
        .broadcast(&["room:5".to_string()], frame, &[])
        .await
        .unwrap();

    assert_eq!(client_a.expect_event("notice").await.unwrap()["text"], "hello");
    assert_eq!(client_b.expect_event("notice").await.unwrap()["text"], "hello");
    client_a.expect_silence().await.unwrap();

    // Adapter traffic never lands on chat_messages
    assert!(cluster.bus().published_on(&Topic::ChatMessages).is_empty());
}

#[tokio::test]
async fn test_adapter_can_be_disabled() {
    let cluster = TestCluster::new();
    let node = cluster
        .start_node_with("node-a", &[("RELAY_ADAPTER_ENABLED", "false")])
        .await
        .unwrap();

    assert!(node.state.adapter().is_none());
}

// ============================================================================
// Shutdown Tests
// ============================================================================

#[tokio::test]
async fn test_graceful_shutdown() {
    let cluster = TestCluster::new();
    let node = cluster.start_node("node-a").await.unwrap();
    let addr = node.addr;
    let state = node.state.clone();

    node.shutdown().await.unwrap();

    assert_eq!(state.registry().connection_count(), 0);
    assert!(cluster.bus().is_closed());
    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}
