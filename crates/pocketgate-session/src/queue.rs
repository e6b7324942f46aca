//! Per-session outbound packet queue.
//!
//! Any thread can push packets for a player through a cloned
//! [`SendQueueHandle`]: the game loop, another player's session
//! broadcasting to viewers, an admin command. Only the session's own
//! connection task drains the [`SendQueue`], so frames leave in exactly
//! the order they were queued.
//!
//! The channel is unbounded because the producers are server code, not
//! clients; a misbehaving client cannot grow another player's queue.

use std::collections::VecDeque;

use pocketgate_protocol::Packet;
use tokio::sync::mpsc;

/// One queued item.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Batched with its neighbours and encrypted if the session is.
    Packet(Packet),
    /// Sent on its own, never encrypted.
    Immediate(Packet),
}

/// Cloneable, thread-safe producer side of a session's queue.
#[derive(Debug, Clone)]
pub struct SendQueueHandle {
    sender: mpsc::UnboundedSender<Outbound>,
}

impl SendQueueHandle {
    /// Queues a packet for the next batch. Returns `false` if the session
    /// is gone.
    pub fn queue(&self, packet: impl Into<Packet>) -> bool {
        self.sender.send(Outbound::Packet(packet.into())).is_ok()
    }

    /// Queues a packet to be sent alone and unencrypted. Only the session
    /// itself does this, for the server handshake.
    pub(crate) fn queue_immediate(&self, packet: impl Into<Packet>) -> bool {
        self.sender.send(Outbound::Immediate(packet.into())).is_ok()
    }

    /// Returns `true` once the owning session has been dropped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Consumer side, owned by the session.
#[derive(Debug)]
pub struct SendQueue {
    receiver: mpsc::UnboundedReceiver<Outbound>,
    pending: VecDeque<Outbound>,
}

impl SendQueue {
    pub fn new() -> (Self, SendQueueHandle) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let queue = Self {
            receiver,
            pending: VecDeque::new(),
        };
        (queue, SendQueueHandle { sender })
    }

    /// Waits until at least one item is queued.
    ///
    /// Cancel-safe, so it can sit in a `select!` next to the receive path.
    /// Returns `false` if every handle is gone and nothing is pending.
    pub async fn wait(&mut self) -> bool {
        if !self.pending.is_empty() {
            return true;
        }
        match self.receiver.recv().await {
            Some(item) => {
                self.pending.push_back(item);
                true
            }
            None => false,
        }
    }

    /// Takes everything queued so far, oldest first.
    pub fn drain(&mut self) -> Vec<Outbound> {
        while let Ok(item) = self.receiver.try_recv() {
            self.pending.push_back(item);
        }
        self.pending.drain(..).collect()
    }
}
