use std::collections::HashMap;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use tokio::sync::{RwLock, mpsc};
use tracing::{info, warn};
use uuid::Uuid;

use parley_db::Database;
use parley_types::events::ServerEvent;

/// One live connection's place in the world: who they claim to be and the
/// single room they are in. Joining another room overwrites this entry and
/// the previous room gets no "left" notification.
#[derive(Debug, Clone)]
struct Membership {
    username: String,
    room: String,
}

/// Tracks which connection belongs to which room/user and fans chat, typing
/// and presence events out to every socket in a room.
#[derive(Clone)]
pub struct RoomRouter {
    inner: Arc<RouterInner>,
}

struct RouterInner {
    db: Arc<Database>,

    /// connection_id -> (username, room). The router exclusively owns this
    /// table; entries are removed only on explicit disconnect.
    memberships: RwLock<HashMap<Uuid, Membership>>,

    /// Per-connection send handles, registered at connect time.
    peers: RwLock<HashMap<Uuid, mpsc::UnboundedSender<ServerEvent>>>,
}

impl RoomRouter {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                db,
                memberships: RwLock::new(HashMap::new()),
                peers: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Register a connection before any of its events are handled.
    /// Returns the assigned connection id and the event receiver the
    /// transport adapter drains into the socket.
    pub async fn connect(&self) -> (Uuid, mpsc::UnboundedReceiver<ServerEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.peers.write().await.insert(conn_id, tx);
        (conn_id, rx)
    }

    /// Register membership and announce the arrival to the whole room,
    /// joining connection included. Usernames are not checked for
    /// uniqueness within a room.
    pub async fn join(&self, conn_id: Uuid, username: String, room: String) {
        info!("conn {} ({}) joined room {}", conn_id, username, room);

        self.inner.memberships.write().await.insert(
            conn_id,
            Membership {
                username: username.clone(),
                room: room.clone(),
            },
        );

        let message = format!("{username} has joined the room");
        self.broadcast(&room, ServerEvent::UserJoined { username, message }, None)
            .await;
    }

    /// Persist the message, then broadcast it to the room.
    ///
    /// The broadcast is NOT gated on the append outcome: a message that
    /// fails to persist still reaches every live member of the room, and the
    /// failure is only logged. Clients may therefore see a message that was
    /// never durably stored.
    pub async fn chat(&self, conn_id: Uuid, username: String, room: String, message: String) {
        let timestamp = Utc::now();

        let db = self.inner.db.clone();
        let id = Uuid::new_v4().to_string();
        let record_room = room.clone();
        let record_user = username.clone();
        let record_message = message.clone();
        let date_sent = timestamp.to_rfc3339_opts(SecondsFormat::Micros, true);

        let appended = tokio::task::spawn_blocking(move || {
            db.insert_group_message(&id, &record_room, &record_user, &record_message, &date_sent)
        })
        .await;

        match appended {
            Ok(Err(e)) => warn!("conn {} failed to persist message in {}: {}", conn_id, room, e),
            Err(e) => warn!("conn {} persistence task panicked: {}", conn_id, e),
            Ok(Ok(())) => {}
        }

        self.broadcast(
            &room,
            ServerEvent::ChatMessage {
                username,
                message,
                timestamp,
            },
            None,
        )
        .await;
    }

    /// Everyone in the room except the sender sees the typing indicator.
    pub async fn typing(&self, conn_id: Uuid, username: String, room: String) {
        self.broadcast(&room, ServerEvent::UserTyping { username }, Some(conn_id))
            .await;
    }

    pub async fn stop_typing(&self, conn_id: Uuid, room: String) {
        self.broadcast(&room, ServerEvent::UserStopTyping, Some(conn_id))
            .await;
    }

    /// Drop the connection's send handle and membership, announcing the
    /// departure to the room it was in. A connection that never joined, or
    /// that was already removed, is a silent no-op.
    pub async fn disconnect(&self, conn_id: Uuid) {
        self.inner.peers.write().await.remove(&conn_id);

        let membership = self.inner.memberships.write().await.remove(&conn_id);
        if let Some(Membership { username, room }) = membership {
            info!("conn {} ({}) left room {}", conn_id, username, room);
            let message = format!("{username} has left the room");
            self.broadcast(&room, ServerEvent::UserLeft { username, message }, None)
                .await;
        }
    }

    /// Deliver an event to every member of `room`, optionally excluding one
    /// connection. Members whose receiver is gone are skipped.
    async fn broadcast(&self, room: &str, event: ServerEvent, exclude: Option<Uuid>) {
        let memberships = self.inner.memberships.read().await;
        let peers = self.inner.peers.read().await;

        for (conn_id, membership) in memberships.iter() {
            if membership.room != room {
                continue;
            }
            if exclude == Some(*conn_id) {
                continue;
            }
            if let Some(tx) = peers.get(conn_id) {
                let _ = tx.send(event.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_router() -> (RoomRouter, Arc<Database>) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        (RoomRouter::new(db.clone()), db)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn join_announces_to_room_including_joiner() {
        let (router, _db) = test_router();

        let (alice, mut alice_rx) = router.connect().await;
        router.join(alice, "alice".into(), "general".into()).await;

        let events = drain(&mut alice_rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], ServerEvent::UserJoined { username, message }
            if username == "alice" && message == "alice has joined the room"));

        let (bob, mut bob_rx) = router.connect().await;
        router.join(bob, "bob".into(), "general".into()).await;

        // Both the existing member and the joiner see the announcement
        assert_eq!(drain(&mut alice_rx).len(), 1);
        assert_eq!(drain(&mut bob_rx).len(), 1);
    }

    #[tokio::test]
    async fn chat_persists_and_reaches_every_member() {
        let (router, db) = test_router();

        let (alice, mut alice_rx) = router.connect().await;
        let (bob, mut bob_rx) = router.connect().await;
        router.join(alice, "alice".into(), "general".into()).await;
        router.join(bob, "bob".into(), "general".into()).await;
        drain(&mut alice_rx);
        drain(&mut bob_rx);

        router
            .chat(alice, "alice".into(), "general".into(), "hi".into())
            .await;

        let rows = db.list_group_messages("general", 50).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].from_user, "alice");
        assert_eq!(rows[0].message, "hi");

        for rx in [&mut alice_rx, &mut bob_rx] {
            let events = drain(rx);
            assert_eq!(events.len(), 1);
            assert!(matches!(&events[0], ServerEvent::ChatMessage { username, message, .. }
                if username == "alice" && message == "hi"));
        }
    }

    #[tokio::test]
    async fn chat_stays_inside_the_room() {
        let (router, _db) = test_router();

        let (alice, mut alice_rx) = router.connect().await;
        let (carol, mut carol_rx) = router.connect().await;
        router.join(alice, "alice".into(), "general".into()).await;
        router.join(carol, "carol".into(), "random".into()).await;
        drain(&mut alice_rx);
        drain(&mut carol_rx);

        router
            .chat(alice, "alice".into(), "general".into(), "hi".into())
            .await;

        assert_eq!(drain(&mut alice_rx).len(), 1);
        assert!(drain(&mut carol_rx).is_empty());
    }

    #[tokio::test]
    async fn typing_excludes_the_sender() {
        let (router, _db) = test_router();

        let (alice, mut alice_rx) = router.connect().await;
        let (bob, mut bob_rx) = router.connect().await;
        router.join(alice, "alice".into(), "general".into()).await;
        router.join(bob, "bob".into(), "general".into()).await;
        drain(&mut alice_rx);
        drain(&mut bob_rx);

        router.typing(alice, "alice".into(), "general".into()).await;

        assert!(drain(&mut alice_rx).is_empty());
        let events = drain(&mut bob_rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], ServerEvent::UserTyping { username } if username == "alice"));

        router.stop_typing(alice, "general".into()).await;
        assert!(drain(&mut alice_rx).is_empty());
        assert!(matches!(drain(&mut bob_rx).as_slice(), [ServerEvent::UserStopTyping]));
    }

    #[tokio::test]
    async fn disconnect_removes_membership_and_repeats_are_noops() {
        let (router, _db) = test_router();

        let (alice, _alice_rx) = router.connect().await;
        let (bob, mut bob_rx) = router.connect().await;
        router.join(alice, "alice".into(), "general".into()).await;
        router.join(bob, "bob".into(), "general".into()).await;
        drain(&mut bob_rx);

        router.disconnect(alice).await;
        assert!(!router.inner.memberships.read().await.contains_key(&alice));

        let events = drain(&mut bob_rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], ServerEvent::UserLeft { username, message }
            if username == "alice" && message == "alice has left the room"));

        // Second disconnect: no error, no duplicate announcement
        router.disconnect(alice).await;
        assert!(drain(&mut bob_rx).is_empty());
    }

    #[tokio::test]
    async fn disconnect_without_join_is_silent() {
        let (router, _db) = test_router();

        let (alice, _alice_rx) = router.connect().await;
        let (bob, mut bob_rx) = router.connect().await;
        router.join(bob, "bob".into(), "general".into()).await;
        drain(&mut bob_rx);

        router.disconnect(alice).await;
        assert!(drain(&mut bob_rx).is_empty());
    }

    #[tokio::test]
    async fn joining_a_second_room_overwrites_the_first() {
        let (router, _db) = test_router();

        let (alice, mut alice_rx) = router.connect().await;
        let (bob, mut bob_rx) = router.connect().await;
        router.join(alice, "alice".into(), "general".into()).await;
        router.join(bob, "bob".into(), "general".into()).await;
        drain(&mut alice_rx);
        drain(&mut bob_rx);

        router.join(alice, "alice".into(), "random".into()).await;

        // The old room hears nothing about it
        assert!(drain(&mut bob_rx).is_empty());
        let room = router
            .inner
            .memberships
            .read()
            .await
            .get(&alice)
            .map(|m| m.room.clone());
        assert_eq!(room.as_deref(), Some("random"));

        // ...and general's traffic no longer reaches alice
        router.chat(bob, "bob".into(), "general".into(), "hi".into()).await;
        assert!(drain(&mut alice_rx).is_empty());
    }

    #[tokio::test]
    async fn connection_that_never_joined_receives_nothing() {
        let (router, _db) = test_router();

        let (alice, mut alice_rx) = router.connect().await;
        let (_lurker, mut lurker_rx) = router.connect().await;
        router.join(alice, "alice".into(), "general".into()).await;
        drain(&mut alice_rx);

        router
            .chat(alice, "alice".into(), "general".into(), "hi".into())
            .await;

        assert!(drain(&mut lurker_rx).is_empty());
    }
}
