//! The session manager: every live session on the server.
//!
//! Sessions themselves live on their connection tasks. The manager keeps
//! only what other threads may touch: each session's [`SendQueueHandle`]
//! and its snapshot receiver. That is enough to:
//!
//! - hand out entity ids,
//! - answer "who is connected, and in what state?",
//! - deliver packets to one player, to everyone, or to a player's viewers.
//!
//! ```text
//! connection task ──register──→ SessionManager ←──queue_for_viewers── other sessions
//!       │                           │
//!       └──────────remove───────────┘
//! ```
//!
//! # Concurrency note
//!
//! Unlike a session, the manager is shared by every connection task and
//! called from synchronous hooks ([`ViewerSink`]), so it locks internally
//! with a `std::sync::RwLock`. Lookups take the read lock; only register
//! and remove write. No lock is ever held across an `.await`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use pocketgate_protocol::Packet;
use pocketgate_transport::ConnectionId;
use tokio::sync::watch;

use crate::SessionError;
use crate::collaborators::ViewerSink;
use crate::queue::SendQueueHandle;
use crate::session::{Session, SessionPhase, SessionSnapshot};

struct Entry {
    outbound: SendQueueHandle,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl Entry {
    fn is_playing(&self) -> bool {
        self.snapshot.borrow().phase == SessionPhase::Play
    }

    fn entity_id(&self) -> u64 {
        self.snapshot.borrow().entity_id
    }
}

/// Registry of live sessions, keyed by connection.
pub struct SessionManager {
    entries: RwLock<HashMap<ConnectionId, Entry>>,
    next_entity_id: AtomicU64,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next_entity_id: AtomicU64::new(1),
        }
    }

    /// Allocates a runtime entity id. Ids start at 1 and are never reused;
    /// `0` is how a client refers to itself.
    pub fn next_entity_id(&self) -> u64 {
        self.next_entity_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Starts tracking `session`.
    ///
    /// # Errors
    /// [`SessionError::AlreadyConnected`] if its connection already has a
    /// registered session.
    pub fn register(&self, session: &Session) -> Result<(), SessionError> {
        self.insert(session.conn_id(), session.outbound(), session.subscribe())
    }

    fn insert(
        &self,
        conn_id: ConnectionId,
        outbound: SendQueueHandle,
        snapshot: watch::Receiver<SessionSnapshot>,
    ) -> Result<(), SessionError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(&conn_id) {
            return Err(SessionError::AlreadyConnected(conn_id));
        }
        entries.insert(conn_id, Entry { outbound, snapshot });
        tracing::debug!(conn = %conn_id, sessions = entries.len(), "session registered");
        Ok(())
    }

    /// Stops tracking the session on `conn_id`.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if nothing is registered there.
    pub fn remove(&self, conn_id: ConnectionId) -> Result<(), SessionError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries
            .remove(&conn_id)
            .ok_or(SessionError::NotFound(conn_id))?;
        tracing::debug!(conn = %conn_id, sessions = entries.len(), "session removed");
        Ok(())
    }

    /// The latest snapshot of the session on `conn_id`.
    pub fn snapshot(&self, conn_id: ConnectionId) -> Option<SessionSnapshot> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(&conn_id).map(|e| e.snapshot.borrow().clone())
    }

    /// A handle for sending packets to the player on `conn_id`.
    pub fn outbound(&self, conn_id: ConnectionId) -> Option<SendQueueHandle> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(&conn_id).map(|e| e.outbound.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queues `packet` to every player in play. Returns how many got it.
    pub fn broadcast(&self, packet: &Packet) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .values()
            .filter(|e| e.is_playing())
            .filter(|e| e.outbound.queue(packet.clone()))
            .count()
    }
}

impl ViewerSink for SessionManager {
    /// Everyone in play except the source sees everything it does. Level
    /// and distance culling belong to the game, which can wrap this.
    fn queue_for_viewers(&self, source_entity: u64, packet: Packet) {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        for entry in entries.values() {
            if entry.is_playing() && entry.entity_id() != source_entity {
                entry.outbound.queue(packet.clone());
            }
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("sessions", &self.len())
            .field("next_entity_id", &self.next_entity_id.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TrustRoot;
    use crate::queue::{Outbound, SendQueue};
    use crate::session::SessionServices;
    use pocketgate_protocol::packets::{MobEquipment, RequestChunkRadius};
    use std::sync::Arc;

    // =====================================================================
    // Helpers
    // =====================================================================

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn services() -> Arc<SessionServices> {
        let key = p384::SecretKey::random(&mut rand_core::OsRng).public_key();
        Arc::new(SessionServices::new(Arc::new(TrustRoot::new(key))))
    }

    fn session(id: u64, entity_id: u64) -> Session {
        Session::new(cid(id), "127.0.0.1:19132".parse().unwrap(), entity_id, services())
    }

    /// Registers a fake session that is already in play. Returns its queue
    /// and the sender side of its snapshot.
    fn playing(
        mgr: &SessionManager,
        id: u64,
        entity_id: u64,
    ) -> (SendQueue, watch::Sender<SessionSnapshot>) {
        let (queue, handle) = SendQueue::new();
        let (tx, rx) = watch::channel(SessionSnapshot {
            phase: SessionPhase::Play,
            entity_id,
            profile: None,
            encrypted: true,
            level: None,
        });
        mgr.insert(cid(id), handle, rx).unwrap();
        (queue, tx)
    }

    // =====================================================================
    // register() / remove()
    // =====================================================================

    #[test]
    fn test_register_new_session_is_tracked() {
        let mgr = SessionManager::new();
        let s = session(1, 10);

        mgr.register(&s).expect("should succeed");

        assert_eq!(mgr.len(), 1);
        let snap = mgr.snapshot(cid(1)).expect("snapshot");
        assert_eq!(snap.phase, SessionPhase::Initial);
        assert_eq!(snap.entity_id, 10);
    }

    #[test]
    fn test_register_same_connection_twice_returns_already_connected() {
        let mgr = SessionManager::new();
        let s = session(1, 10);
        mgr.register(&s).unwrap();

        let result = mgr.register(&s);

        assert!(matches!(result, Err(SessionError::AlreadyConnected(c)) if c == cid(1)));
    }

    #[test]
    fn test_remove_unknown_connection_returns_not_found() {
        let mgr = SessionManager::new();
        assert!(matches!(mgr.remove(cid(9)), Err(SessionError::NotFound(c)) if c == cid(9)));
    }

    #[test]
    fn test_remove_registered_session_empties_manager() {
        let mgr = SessionManager::new();
        let s = session(1, 10);
        mgr.register(&s).unwrap();

        mgr.remove(cid(1)).unwrap();

        assert!(mgr.is_empty());
        assert!(mgr.snapshot(cid(1)).is_none());
    }

    #[test]
    fn test_snapshot_follows_session_state() {
        let mgr = SessionManager::new();
        let mut s = session(1, 10);
        mgr.register(&s).unwrap();

        s.disconnect("kicked");

        assert_eq!(mgr.snapshot(cid(1)).unwrap().phase, SessionPhase::Disconnected);
    }

    // =====================================================================
    // Entity ids
    // =====================================================================

    #[test]
    fn test_next_entity_id_starts_at_one_and_increments() {
        let mgr = SessionManager::new();
        assert_eq!(mgr.next_entity_id(), 1);
        assert_eq!(mgr.next_entity_id(), 2);
    }

    // =====================================================================
    // Delivery
    // =====================================================================

    #[test]
    fn test_broadcast_reaches_only_playing_sessions() {
        let mgr = SessionManager::new();
        let (mut a, _a_tx) = playing(&mgr, 1, 10);
        let (mut b, _b_tx) = playing(&mgr, 2, 11);
        let waiting = session(3, 12);
        mgr.register(&waiting).unwrap();

        let sent = mgr.broadcast(&RequestChunkRadius { radius: 8 }.into());

        assert_eq!(sent, 2);
        assert_eq!(a.drain().len(), 1);
        assert_eq!(b.drain().len(), 1);
    }

    #[test]
    fn test_queue_for_viewers_skips_source() {
        let mgr = SessionManager::new();
        let (mut source, _s_tx) = playing(&mgr, 1, 10);
        let (mut viewer, _v_tx) = playing(&mgr, 2, 11);
        let packet = Packet::from(MobEquipment {
            entity_id: 10,
            hotbar_slot: 0,
            inventory_slot: 255,
            stack: None,
        });

        mgr.queue_for_viewers(10, packet.clone());

        assert!(source.drain().is_empty());
        assert_eq!(viewer.drain(), vec![Outbound::Packet(packet)]);
    }

    #[test]
    fn test_queue_for_viewers_ignores_sessions_that_left_play() {
        let mgr = SessionManager::new();
        let (mut viewer, viewer_tx) = playing(&mgr, 2, 11);
        viewer_tx.send_modify(|snap| snap.phase = SessionPhase::Disconnected);

        mgr.queue_for_viewers(10, RequestChunkRadius { radius: 1 }.into());

        assert!(viewer.drain().is_empty());
    }
}
