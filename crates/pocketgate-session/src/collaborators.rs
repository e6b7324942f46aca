//! Hooks the session calls into the rest of the server.
//!
//! The session layer knows how to log a player in and nothing about the
//! game itself. Everything game-specific comes in through these traits:
//!
//! - [`LoginListener`]: may refuse a verified player (bans, whitelists).
//! - [`LevelProvider`]: says which level a new player spawns in.
//! - [`PlayHandler`]: receives gameplay packets once the player is in.
//! - [`ViewerSink`]: delivers packets to players who can see this one.
//!
//! Each has a do-nothing default so a bare server runs out of the box.

use std::fmt;
use std::net::SocketAddr;

use pocketgate_protocol::Packet;

use crate::SessionError;
use crate::auth::{AuthProfile, ClientData};
use crate::inventory::PlayerInventory;
use crate::queue::SendQueueHandle;

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

/// Fired once per verified login, before the player enters play.
#[derive(Debug)]
pub struct LoginEvent<'a> {
    pub profile: &'a AuthProfile,
    pub client_data: &'a ClientData,
    pub address: SocketAddr,
    disconnect_reason: Option<String>,
}

impl<'a> LoginEvent<'a> {
    pub fn new(profile: &'a AuthProfile, client_data: &'a ClientData, address: SocketAddr) -> Self {
        Self {
            profile,
            client_data,
            address,
            disconnect_reason: None,
        }
    }

    /// Refuses the login. The player is disconnected with `reason`.
    pub fn disallow(&mut self, reason: impl Into<String>) {
        self.disconnect_reason = Some(reason.into());
    }

    pub fn is_allowed(&self) -> bool {
        self.disconnect_reason.is_none()
    }

    pub fn disconnect_reason(&self) -> Option<&str> {
        self.disconnect_reason.as_deref()
    }
}

pub trait LoginListener: Send + Sync {
    fn on_login(&self, event: &mut LoginEvent<'_>);
}

/// Lets everyone in.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl LoginListener for AllowAll {
    fn on_login(&self, _event: &mut LoginEvent<'_>) {}
}

// ---------------------------------------------------------------------------
// Levels
// ---------------------------------------------------------------------------

/// Names a level. The session only passes it along.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LevelId(pub String);

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait LevelProvider: Send + Sync {
    fn default_level(&self) -> LevelId;
}

/// Always returns the same level.
#[derive(Debug, Clone)]
pub struct StaticLevel(pub LevelId);

impl Default for StaticLevel {
    fn default() -> Self {
        Self(LevelId("world".into()))
    }
}

impl LevelProvider for StaticLevel {
    fn default_level(&self) -> LevelId {
        self.0.clone()
    }
}

// ---------------------------------------------------------------------------
// Play
// ---------------------------------------------------------------------------

/// Delivers a packet to every player who can see `source_entity`.
pub trait ViewerSink: Send + Sync {
    fn queue_for_viewers(&self, source_entity: u64, packet: Packet);
}

/// Nobody is watching.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoViewers;

impl ViewerSink for NoViewers {
    fn queue_for_viewers(&self, _source_entity: u64, _packet: Packet) {}
}

/// What a [`PlayHandler`] may see and touch while handling one packet.
pub struct PlayContext<'a> {
    pub entity_id: u64,
    pub profile: &'a AuthProfile,
    pub level: &'a LevelId,
    pub inventory: &'a mut PlayerInventory,
    pub outbound: &'a SendQueueHandle,
    pub viewers: &'a dyn ViewerSink,
}

impl PlayContext<'_> {
    /// Changes the held hotbar slot and sends the equipment packets: one
    /// to the player if `notify_self`, one to everyone watching.
    pub fn set_held_slot(&mut self, slot: u8, notify_self: bool) -> Result<(), SessionError> {
        let update = self.inventory.set_held_slot(slot, notify_self, self.entity_id)?;
        if let Some(mine) = update.for_self {
            self.outbound.queue(mine);
        }
        self.viewers
            .queue_for_viewers(self.entity_id, update.for_viewers.into());
        Ok(())
    }

    /// Queues a packet to this player.
    pub fn send(&self, packet: impl Into<Packet>) {
        self.outbound.queue(packet);
    }
}

impl fmt::Debug for PlayContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayContext")
            .field("entity_id", &self.entity_id)
            .field("player", &self.profile.display_name)
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

/// Receives gameplay packets from players in the world.
///
/// Returning an error is logged; it does not end the session.
pub trait PlayHandler: Send + Sync {
    fn handle(&self, ctx: &mut PlayContext<'_>, packet: Packet) -> Result<(), SessionError>;
}

/// Drops every gameplay packet.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnorePlay;

impl PlayHandler for IgnorePlay {
    fn handle(&self, ctx: &mut PlayContext<'_>, packet: Packet) -> Result<(), SessionError> {
        tracing::trace!(
            entity_id = ctx.entity_id,
            packet = packet.name(),
            "gameplay packet ignored"
        );
        Ok(())
    }
}
