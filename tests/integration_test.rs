use roomlink_client::transport::memory::{MemoryPeer, MemoryTransport};
use roomlink_client::{Client, ClientConfig, ClientEvent, ClientHandle, RoomEvent};
use roomlink_protocol::{opcode, Value};
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

const WAIT: Duration = Duration::from_secs(2);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("roomlink_client=debug")
        .with_test_writer()
        .try_init();
}

async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("channel closed")
}

async fn next_frame(peer: &mut MemoryPeer) -> Vec<Value> {
    timeout(WAIT, peer.recv_frame())
        .await
        .expect("timed out waiting for frame")
        .expect("client closed the transport")
        .expect("client sent an undecodable frame")
}

fn code(value: u8) -> Value {
    Value::from(value)
}

fn connect() -> (ClientHandle, mpsc::UnboundedReceiver<ClientEvent>, MemoryPeer) {
    init_tracing();
    let (transport, peer) = MemoryTransport::create_pair(100);
    let (client, events) = Client::connect(transport, &ClientConfig::default());
    (client, events, peer)
}

#[tokio::test]
async fn test_full_room_session() {
    let (client, mut events, mut peer) = connect();

    peer.send_frame(&[code(opcode::USER_ID), Value::from("abc")])
        .await
        .unwrap();
    assert!(matches!(next(&mut events).await, ClientEvent::Open { client_id } if client_id == "abc"));

    let room = client.join("lobby").await.unwrap();
    let mut room_events = room.events().unwrap();

    assert_eq!(
        next_frame(&mut peer).await,
        vec![code(opcode::JOIN_ROOM), Value::from("lobby")]
    );

    peer.send_frame(&[code(opcode::JOIN_ROOM), Value::from(5), Value::from("lobby")])
        .await
        .unwrap();
    assert_eq!(next(&mut room_events).await, RoomEvent::Joined { id: 5 });
    assert_eq!(room.id(), Some(5));

    room.send("hi").unwrap();
    assert_eq!(
        next_frame(&mut peer).await,
        vec![code(opcode::ROOM_DATA), Value::from(5), Value::from("hi")]
    );

    peer.send_frame(&[code(opcode::ROOM_DATA), Value::from(5), Value::from("back")])
        .await
        .unwrap();
    assert_eq!(
        next(&mut room_events).await,
        RoomEvent::Data(Value::from("back"))
    );
    match next(&mut events).await {
        ClientEvent::Message { room: target, payload } => {
            assert_eq!(target.name(), "lobby");
            assert_eq!(payload, Value::from("back"));
        }
        other => panic!("unexpected event: {:?}", other),
    }

    let snapshot = Value::Map(vec![(Value::from("players"), Value::from(2))]);
    peer.send_frame(&[
        code(opcode::ROOM_STATE),
        Value::from(5),
        snapshot.clone(),
        Value::from(1500.0),
        Value::from(250.0),
    ])
    .await
    .unwrap();
    assert!(matches!(
        next(&mut room_events).await,
        RoomEvent::StateChanged { state, clock } if state == snapshot && clock.time == 1500.0
    ));
    assert_eq!(room.state(), Some(snapshot));

    room.leave().unwrap();
    assert_eq!(
        next_frame(&mut peer).await,
        vec![code(opcode::LEAVE_ROOM), Value::from(5)]
    );
    assert_eq!(next(&mut room_events).await, RoomEvent::Left);

    client.close().unwrap();
    assert!(matches!(next(&mut events).await, ClientEvent::Close));
    assert!(timeout(WAIT, peer.recv_bytes()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_join_with_options_sends_map() {
    let (client, _events, mut peer) = connect();

    let options = serde_json::json!({ "team": "red" });
    client.join_with_options("arena", &options).await.unwrap();

    let frame = next_frame(&mut peer).await;
    assert_eq!(frame.len(), 3);
    assert_eq!(frame[1], Value::from("arena"));

    let map = frame[2].as_map().unwrap();
    assert_eq!(map[0].0.as_str(), Some("team"));
    assert_eq!(map[0].1.as_str(), Some("red"));
}

#[tokio::test]
async fn test_join_twice_returns_same_room() {
    let (client, _events, mut peer) = connect();

    let first = client.join("lobby").await.unwrap();
    let second = client.join("lobby").await.unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));

    next_frame(&mut peer).await;

    // Only one join request went out
    client.send(vec![Value::from(99)]).unwrap();
    assert_eq!(next_frame(&mut peer).await, vec![Value::from(99)]);
}

#[tokio::test]
async fn test_join_rejected() {
    let (client, mut events, mut peer) = connect();

    let room = client.join("vip").await.unwrap();
    let mut room_events = room.events().unwrap();
    next_frame(&mut peer).await;

    peer.send_frame(&[code(opcode::JOIN_ERROR), Value::from("vip"), Value::from("room is full")])
        .await
        .unwrap();

    assert_eq!(
        next(&mut room_events).await,
        RoomEvent::Error("room is full".to_string())
    );
    assert!(matches!(
        next(&mut events).await,
        ClientEvent::Error(roomlink_client::ClientError::JoinRejected { reason, .. }) if reason == "room is full"
    ));
    assert!(!room.has_joined());
    assert_eq!(next(&mut room_events).await, RoomEvent::Left);
    assert!(room.has_left());

    client.close().unwrap();
    assert!(matches!(next(&mut events).await, ClientEvent::Close));
}

#[tokio::test]
async fn test_leave_before_confirmation_leaves_on_server() {
    let (client, mut events, mut peer) = connect();

    let room = client.join("lobby").await.unwrap();
    next_frame(&mut peer).await;

    room.leave().unwrap();
    // Round trip through the loop so the leave has been processed
    client.join("other").await.unwrap();
    next_frame(&mut peer).await;

    peer.send_frame(&[code(opcode::JOIN_ROOM), Value::from(5), Value::from("lobby")])
        .await
        .unwrap();

    assert_eq!(
        next_frame(&mut peer).await,
        vec![code(opcode::LEAVE_ROOM), Value::from(5)]
    );
    assert!(room.has_left());
    assert_eq!(room.id(), None);

    client.close().unwrap();
    assert!(matches!(next(&mut events).await, ClientEvent::Close));
}

#[tokio::test]
async fn test_calls_before_open_are_flushed_in_order() {
    init_tracing();
    let (transport_tx, transport_rx) = mpsc::channel(10);
    let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel();

    let (client, handle, _events) = Client::new(transport_rx, outgoing_tx);
    tokio::spawn(client.run());

    handle.join("lobby").await.unwrap();
    handle.send(vec![Value::from(99), Value::from("after join")]).unwrap();
    // Round trip through the loop so the send has been processed
    handle.join("lobby").await.unwrap();

    assert!(outgoing_rx.try_recv().is_err());

    transport_tx
        .send(roomlink_protocol::TransportEvent::Opened)
        .await
        .unwrap();

    let first = timeout(WAIT, outgoing_rx.recv()).await.unwrap().unwrap();
    let second = timeout(WAIT, outgoing_rx.recv()).await.unwrap().unwrap();

    assert_eq!(
        roomlink_protocol::codec::decode(&first).unwrap(),
        vec![code(opcode::JOIN_ROOM), Value::from("lobby")]
    );
    assert_eq!(
        roomlink_protocol::codec::decode(&second).unwrap(),
        vec![Value::from(99), Value::from("after join")]
    );
}

#[tokio::test]
async fn test_close_leaves_all_rooms() {
    let (client, mut events, mut peer) = connect();

    let lobby = client.join("lobby").await.unwrap();
    let arena = client.join("arena").await.unwrap();
    let mut lobby_events = lobby.events().unwrap();
    next_frame(&mut peer).await;
    next_frame(&mut peer).await;

    peer.send_frame(&[code(opcode::JOIN_ROOM), Value::from(1), Value::from("lobby")])
        .await
        .unwrap();
    assert_eq!(next(&mut lobby_events).await, RoomEvent::Joined { id: 1 });

    client.close().unwrap();

    assert!(matches!(next(&mut events).await, ClientEvent::Close));
    assert_eq!(next(&mut lobby_events).await, RoomEvent::Left);
    assert!(lobby.has_left());
    assert!(arena.has_left());

    assert!(matches!(
        client.join("late").await,
        Err(roomlink_client::ClientError::ConnectionClosed)
    ));
}

#[tokio::test]
async fn test_server_disconnect_closes_client() {
    let (client, mut events, peer) = connect();

    let room = client.join("lobby").await.unwrap();
    drop(peer);

    assert!(matches!(next(&mut events).await, ClientEvent::Close));
    assert!(room.has_left());
}
