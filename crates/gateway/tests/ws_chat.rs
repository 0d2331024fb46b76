mod common;

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use common::{harness, Harness, ALICE, BOB};
use sb_gateway::api;
use sb_gateway::runtime::sessions::DISPLACED;
use sb_protocol::StreamFragment;
use sb_providers::scripted::{Script, ScriptedProvider};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve(h: &Harness) -> SocketAddr {
    let app = api::router(h.state.clone()).with_state(h.state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr, conversation_id: &str, token: &str) -> Client {
    let url = format!("ws://{addr}/v1/chat/ws/{conversation_id}?token={token}");
    let (ws, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    ws
}

/// Next protocol frame, or `None` once the server closed the socket.
async fn next_frame(ws: &mut Client) -> Option<StreamFragment> {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a frame")?;
        match msg {
            Ok(Message::Text(text)) => return Some(serde_json::from_str(&text).unwrap()),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
}

/// Read frames up to and including the next terminal frame.
async fn read_exchange(ws: &mut Client) -> Vec<StreamFragment> {
    let mut frames = Vec::new();
    while let Some(frame) = next_frame(ws).await {
        let done = frame.done;
        frames.push(frame);
        if done {
            break;
        }
    }
    frames
}

async fn say(ws: &mut Client, content: &str) {
    let body = serde_json::json!({ "content": content, "attachment_ids": [] });
    ws.send(Message::Text(body.to_string())).await.unwrap();
}

#[tokio::test]
async fn rejected_connections_get_one_identical_terminal_frame() {
    let h = harness(ScriptedProvider::new("scripted"));
    let conv = h.alice_conversation().await;
    let addr = serve(&h).await;

    let mut rejections = Vec::new();
    for (conversation_id, token) in [(conv.as_str(), "bad-token"), (conv.as_str(), BOB), ("missing", ALICE)] {
        let mut ws = connect(addr, conversation_id, token).await;
        let frame = next_frame(&mut ws).await.unwrap();
        assert!(frame.done);
        assert!(frame.metadata.message_id.is_none());
        assert!(next_frame(&mut ws).await.is_none());
        rejections.push(frame);
    }
    assert!(rejections.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(rejections[0].error.as_deref(), Some(api::ACCESS_DENIED));
}

#[tokio::test]
async fn streams_fragments_then_one_terminal_frame() {
    let h = harness(
        ScriptedProvider::new("scripted")
            .with_stream(Script::Fragments(vec!["Hel".into(), "lo".into()]))
            .with_stream(Script::FailAfter(vec!["oops".into()], "backend died".into())),
    );
    let conv = h.alice_conversation().await;
    let addr = serve(&h).await;
    let mut ws = connect(addr, &conv, ALICE).await;

    say(&mut ws, "hi").await;
    let frames = read_exchange(&mut ws).await;
    let contents: Vec<_> = frames.iter().map(|f| f.content.as_str()).collect();
    assert_eq!(contents, ["Hel", "lo", ""]);
    assert!(frames[2].done && frames[2].error.is_none());
    let message_id = frames[0].metadata.message_id.clone().unwrap();
    assert!(frames.iter().all(|f| f.metadata.message_id.as_ref() == Some(&message_id)));

    // A failing exchange ends with an error frame; the socket stays usable.
    say(&mut ws, "again").await;
    let frames = read_exchange(&mut ws).await;
    assert_eq!(frames.len(), 2);
    assert!(frames[1].error.as_deref().unwrap().contains("backend died"));

    let stored = h.state.conversations.get_for_owner(&conv, "alice").await.unwrap();
    assert_eq!(stored.messages.len(), 4);
    assert_eq!(stored.messages[1].id, message_id);
    assert_eq!(stored.messages[3].content, "oops");
}

#[tokio::test]
async fn invalid_frames_are_answered_without_closing() {
    let h = harness(ScriptedProvider::new("scripted").with_stream(Script::Text("fine".into())));
    let conv = h.alice_conversation().await;
    let addr = serve(&h).await;
    let mut ws = connect(addr, &conv, ALICE).await;

    ws.send(Message::Text("{not json".into())).await.unwrap();
    let frame = next_frame(&mut ws).await.unwrap();
    assert!(frame.done);
    assert!(frame.error.unwrap().starts_with("invalid message"));

    say(&mut ws, "hello").await;
    let frames = read_exchange(&mut ws).await;
    assert_eq!(frames[0].content, "fine");
}

#[tokio::test]
async fn reconnect_displaces_the_old_socket() {
    let h = harness(ScriptedProvider::new("scripted").with_stream(Script::Text("new".into())));
    let conv = h.alice_conversation().await;
    let addr = serve(&h).await;

    let mut first = connect(addr, &conv, ALICE).await;
    // Let the first session bind before the second connects.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let mut second = connect(addr, &conv, ALICE).await;

    let frame = next_frame(&mut first).await.unwrap();
    assert!(frame.done);
    assert_eq!(frame.error.as_deref(), Some(DISPLACED));
    assert!(next_frame(&mut first).await.is_none());

    say(&mut second, "still there?").await;
    let frames = read_exchange(&mut second).await;
    assert_eq!(frames[0].content, "new");
    assert_eq!(h.state.sessions.len(), 1);
}

#[tokio::test]
async fn disconnect_mid_stream_cancels_and_keeps_partial_text() {
    let h = harness(
        ScriptedProvider::new("scripted").with_stream(Script::Stall(vec!["partial".into()])),
    );
    let conv = h.alice_conversation().await;
    let addr = serve(&h).await;
    let mut ws = connect(addr, &conv, ALICE).await;

    say(&mut ws, "tell me everything").await;
    let first = next_frame(&mut ws).await.unwrap();
    assert_eq!(first.content, "partial");
    ws.close(None).await.unwrap();
    drop(ws);

    // Wait for the server to cancel the stream and persist the reply.
    let mut stored = Vec::new();
    for _ in 0..50 {
        stored = h
            .state
            .conversations
            .get_for_owner(&conv, "alice")
            .await
            .unwrap()
            .messages;
        if stored.len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[1].content, "partial");
    assert_eq!(h.provider.live_streams(), 0);
}
