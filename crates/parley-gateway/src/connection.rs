use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use parley_types::events::ClientEvent;

use crate::router::RoomRouter;

/// Handle a single WebSocket connection.
///
/// There is no handshake: clients self-assert a username on every event they
/// send, and nothing is delivered to a connection until it joins a room.
pub async fn handle_connection(socket: WebSocket, router: RoomRouter) {
    let (mut sender, mut receiver) = socket.split();

    let (conn_id, mut events_rx) = router.connect().await;
    info!("conn {} connected", conn_id);

    // Forward room broadcasts to this client
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!("dropping unserializable event: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Read events from the client
    let recv_router = router.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => handle_event(&recv_router, conn_id, event).await,
                    // No error signal goes back to the client; the frame is dropped
                    Err(e) => warn!("conn {} sent an undecodable event: {}", conn_id, e),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Whichever side finishes first tears the other down
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    router.disconnect(conn_id).await;
    info!("conn {} disconnected", conn_id);
}

async fn handle_event(router: &RoomRouter, conn_id: Uuid, event: ClientEvent) {
    match event {
        ClientEvent::JoinRoom { username, room } => {
            router.join(conn_id, username, room).await;
        }
        ClientEvent::ChatMessage {
            username,
            room,
            message,
        } => {
            router.chat(conn_id, username, room, message).await;
        }
        ClientEvent::Typing { username, room } => {
            router.typing(conn_id, username, room).await;
        }
        ClientEvent::StopTyping { room } => {
            router.stop_typing(conn_id, room).await;
        }
    }
}
