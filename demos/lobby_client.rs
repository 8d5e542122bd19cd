//! Joins a room on a local server and prints everything it receives.
//!
//! ```text
//! cargo run --example lobby_client -- ws://127.0.0.1:2657 lobby
//! ```

use roomlink::client::{Client, ClientConfig, ClientEvent, RoomEvent};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Serialize)]
struct JoinOptions<'a> {
    nickname: &'a str,
}

#[derive(Serialize)]
struct Chat<'a> {
    text: &'a str,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let url = args.next().unwrap_or_else(|| roomlink::client::config::DEFAULT_URL.to_string());
    let room_name = args.next().unwrap_or_else(|| "lobby".to_string());

    let (client, mut events) = Client::connect_websocket(&ClientConfig::new(url));

    let room = match client
        .join_with_options(room_name.as_str(), &JoinOptions { nickname: "demo" })
        .await
    {
        Ok(room) => room,
        Err(e) => {
            tracing::error!(error = %e, "Join failed");
            return;
        }
    };

    let Some(mut room_events) = room.events() else {
        return;
    };

    let room_task = {
        let room = room.clone();
        tokio::spawn(async move {
            while let Some(event) = room_events.recv().await {
                match event {
                    RoomEvent::Joined { id } => {
                        tracing::info!(id, "Joined {}", room.name());
                        if let Err(e) = room.send_message(&Chat { text: "hello" }) {
                            tracing::warn!(error = %e, "Send failed");
                        }
                    }
                    RoomEvent::StateChanged { state, clock } => {
                        tracing::info!(?state, time = clock.time, "State");
                    }
                    RoomEvent::Patch(patch) => tracing::info!(len = patch.len(), "Patch"),
                    RoomEvent::Data(data) => tracing::info!(?data, "Data"),
                    RoomEvent::Error(reason) => tracing::warn!(%reason, "Room error"),
                    RoomEvent::Left => break,
                }
            }
        })
    };

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(ClientEvent::Open { client_id }) => tracing::info!(%client_id, "Connected"),
                Some(ClientEvent::Message { room, payload }) => {
                    tracing::debug!(room = %room.name(), ?payload, "Message");
                }
                Some(ClientEvent::Error(e)) => tracing::warn!(error = %e, "Client error"),
                Some(ClientEvent::Close) | None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                let _ = client.close();
            }
        }
    }

    let _ = room_task.await;
}
