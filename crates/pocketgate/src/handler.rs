//! Per-connection handler: datagrams in, session, frames out.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Create a session and register it with the manager
//!   2. Loop: wait for a datagram or for packets queued by other threads
//!   3. Feed datagrams to the session, write whatever it flushed
//!   4. Stop when the session ends, the peer leaves, or it goes idle

use std::sync::Arc;

use pocketgate_session::{Session, SessionManager};
use pocketgate_transport::{Connection, ConnectionId};
use tokio::time::Instant;

use crate::PocketgateError;
use crate::server::ServerState;

/// Sent to a client that stayed silent past the idle timeout.
pub const TIMED_OUT_MESSAGE: &str = "Timed out";

/// Deregisters the session from the manager on every exit path, unwinding
/// included. `remove` takes a std lock, so it is safe to call from `drop`.
struct SessionGuard {
    conn_id: ConnectionId,
    sessions: Arc<SessionManager>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let _ = self.sessions.remove(self.conn_id);
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Connection>(
    conn: C,
    state: Arc<ServerState>,
) -> Result<(), PocketgateError> {
    let conn_id = conn.id();
    let address = conn.remote_addr();
    let entity_id = state.sessions.next_entity_id();
    tracing::debug!(%conn_id, %address, entity_id, "handling new connection");

    let mut session = Session::new(conn_id, address, entity_id, Arc::clone(&state.services));
    state.sessions.register(&session)?;
    let _guard = SessionGuard {
        conn_id,
        sessions: Arc::clone(&state.sessions),
    };

    let result = drive(&conn, &mut session, &state).await;
    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close failed");
    }
    tracing::info!(%conn_id, phase = %session.phase(), "connection closed");

    result
}

async fn drive<C: Connection>(
    conn: &C,
    session: &mut Session,
    state: &ServerState,
) -> Result<(), PocketgateError> {
    let conn_id = conn.id();
    let mut deadline = Instant::now() + state.idle_timeout;

    loop {
        tokio::select! {
            received = tokio::time::timeout_at(deadline, conn.recv()) => {
                let datagram = match received {
                    Ok(Ok(Some(data))) => data,
                    Ok(Ok(None)) => {
                        tracing::info!(%conn_id, "peer closed connection");
                        return Ok(());
                    }
                    Ok(Err(e)) => {
                        tracing::debug!(%conn_id, error = %e, "recv error");
                        return Err(e.into());
                    }
                    Err(_) => {
                        tracing::info!(%conn_id, "connection timed out");
                        session.disconnect(TIMED_OUT_MESSAGE);
                        send_pending(conn, session).await?;
                        return Ok(());
                    }
                };
                deadline = Instant::now() + state.idle_timeout;

                if let Err(e) = session.handle_datagram(&datagram).await {
                    if e.is_fatal() {
                        // No goodbye: the peer is off-protocol or out of sync.
                        tracing::warn!(%conn_id, error = %e, "closing connection");
                        return Err(e.into());
                    }
                    tracing::debug!(%conn_id, error = %e, "dropping datagram");
                }
            }
            _ = session.wait_outbound() => {}
        }

        send_pending(conn, session).await?;
        if session.is_disconnected() {
            return Ok(());
        }
    }
}

/// Writes every frame the session has ready, in order.
async fn send_pending<C: Connection>(
    conn: &C,
    session: &mut Session,
) -> Result<(), PocketgateError> {
    for frame in session.flush()? {
        conn.send(&frame).await?;
    }
    Ok(())
}
