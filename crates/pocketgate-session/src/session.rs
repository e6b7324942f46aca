//! One player's session: the login state machine and its outbound path.
//!
//! A session moves through four states, and each state accepts a fixed
//! set of packets. Anything else is a [`SessionError::ProtocolViolation`]
//! and the connection is dropped.
//!
//! ```text
//!            Login ok              C2S handshake
//!  Initial ───────────→ Authenticating ───────────→ Play
//!     │    (encryption:                  (or at once
//!     │     S2C handshake)                if unencrypted)
//!     │                                      │
//!     └──── failure / veto / Disconnect ─────┴──→ Disconnected
//! ```
//!
//! The session is owned by its connection task and never shared. Other
//! threads reach it through a [`SendQueueHandle`] (to send packets) or a
//! [`watch::Receiver<SessionSnapshot>`] (to look at it).

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use pocketgate_protocol::Packet;
use pocketgate_protocol::batch::BatchLimits;
use pocketgate_protocol::compression::DEFAULT_LEVEL;
use pocketgate_protocol::packets::{
    Disconnect, Login, PlayStatus, PlayStatusKind, ResourcePacksInfo,
};
use pocketgate_protocol::version::unsupported_version_message;
use pocketgate_transport::ConnectionId;
use tokio::sync::watch;

use crate::SessionError;
use crate::auth::{AuthProfile, LoginVerifier, TrustRoot, VerifiedLogin};
use crate::collaborators::{
    AllowAll, IgnorePlay, LevelId, LevelProvider, LoginEvent, LoginListener, NoViewers,
    PlayContext, PlayHandler, StaticLevel, ViewerSink,
};
use crate::encryption::{EncryptionSupport, PacketCipher, ServerHandshake};
use crate::framing::FrameCodec;
use crate::inventory::PlayerInventory;
use crate::pool::LoginPool;
use crate::queue::{Outbound, SendQueue, SendQueueHandle};

/// Sent when the chain is not rooted in the trusted key.
pub const DEFAULT_UNTRUSTED_IDENTITY_MESSAGE: &str =
    "This server requires that you sign in with Xbox Live.";

/// Sent when every login worker is busy.
pub const DEFAULT_BUSY_MESSAGE: &str = "The server is busy, please try again.";

/// Sent for any other login failure. Details stay in the server log.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub encryption: EncryptionSupport,
    /// zlib level for outbound batches.
    pub compression_level: u32,
    /// Ceilings applied to inbound batches.
    pub batch_limits: BatchLimits,
    pub untrusted_identity_message: String,
    pub busy_message: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            encryption: EncryptionSupport::Enabled,
            compression_level: DEFAULT_LEVEL,
            batch_limits: BatchLimits::default(),
            untrusted_identity_message: DEFAULT_UNTRUSTED_IDENTITY_MESSAGE.into(),
            busy_message: DEFAULT_BUSY_MESSAGE.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionServices
// ---------------------------------------------------------------------------

/// Everything sessions share: configuration, the login verifier and
/// pool, and the game's collaborators.
///
/// Built once at startup and handed to every session behind an `Arc`.
pub struct SessionServices {
    pub config: SessionConfig,
    pub verifier: LoginVerifier,
    pub pool: LoginPool,
    pub listener: Arc<dyn LoginListener>,
    pub levels: Arc<dyn LevelProvider>,
    pub play: Arc<dyn PlayHandler>,
    pub viewers: Arc<dyn ViewerSink>,
}

impl SessionServices {
    /// Default collaborators and config, trusting `root`.
    pub fn new(root: Arc<TrustRoot>) -> Self {
        Self {
            config: SessionConfig::default(),
            verifier: LoginVerifier::new(root),
            pool: LoginPool::default(),
            listener: Arc::new(AllowAll),
            levels: Arc::new(StaticLevel::default()),
            play: Arc::new(IgnorePlay),
            viewers: Arc::new(NoViewers),
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_pool(mut self, pool: LoginPool) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn LoginListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn with_levels(mut self, levels: Arc<dyn LevelProvider>) -> Self {
        self.levels = levels;
        self
    }

    pub fn with_play_handler(mut self, play: Arc<dyn PlayHandler>) -> Self {
        self.play = play;
        self
    }

    pub fn with_viewers(mut self, viewers: Arc<dyn ViewerSink>) -> Self {
        self.viewers = viewers;
        self
    }
}

impl fmt::Debug for SessionServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionServices")
            .field("config", &self.config)
            .field("verifier", &self.verifier)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Which state a session is in, without the state's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Initial,
    Authenticating,
    Play,
    Disconnected,
}

impl SessionPhase {
    pub fn name(self) -> &'static str {
        match self {
            Self::Initial => "Initial",
            Self::Authenticating => "Authenticating",
            Self::Play => "Play",
            Self::Disconnected => "Disconnected",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A player in the world.
#[derive(Debug)]
pub struct PlayState {
    pub login: VerifiedLogin,
    pub level: LevelId,
    pub inventory: PlayerInventory,
}

/// The state machine. Each variant owns exactly the data valid in it, so
/// a session in `Initial` has no profile to misuse.
#[derive(Debug)]
pub enum SessionState {
    /// Waiting for Login.
    Initial,
    /// Login verified; waiting for the client's handshake reply.
    Authenticating(VerifiedLogin),
    Play(PlayState),
    /// The session is over. Nothing more is accepted.
    Disconnected { reason: String },
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        match self {
            Self::Initial => SessionPhase::Initial,
            Self::Authenticating(_) => SessionPhase::Authenticating,
            Self::Play(_) => SessionPhase::Play,
            Self::Disconnected { .. } => SessionPhase::Disconnected,
        }
    }

    pub fn profile(&self) -> Option<&AuthProfile> {
        match self {
            Self::Authenticating(login) => Some(&login.profile),
            Self::Play(play) => Some(&play.login.profile),
            Self::Initial | Self::Disconnected { .. } => None,
        }
    }
}

/// A consistent view of a session for other threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub entity_id: u64,
    pub profile: Option<AuthProfile>,
    pub encrypted: bool,
    pub level: Option<LevelId>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct Session {
    conn_id: ConnectionId,
    address: SocketAddr,
    entity_id: u64,
    state: SessionState,
    codec: FrameCodec,
    queue: SendQueue,
    outbound: SendQueueHandle,
    /// Encoded frames waiting to be written, oldest first.
    ready: Vec<Vec<u8>>,
    /// Installed on the codec once the handshake it belongs to is framed.
    pending_cipher: Option<PacketCipher>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    services: Arc<SessionServices>,
}

impl Session {
    pub fn new(
        conn_id: ConnectionId,
        address: SocketAddr,
        entity_id: u64,
        services: Arc<SessionServices>,
    ) -> Self {
        let (queue, outbound) = SendQueue::new();
        let (snapshot_tx, _) = watch::channel(SessionSnapshot {
            phase: SessionPhase::Initial,
            entity_id,
            profile: None,
            encrypted: false,
            level: None,
        });
        let codec = FrameCodec::new(
            services.config.batch_limits,
            services.config.compression_level,
        );
        Self {
            conn_id,
            address,
            entity_id,
            state: SessionState::Initial,
            codec,
            queue,
            outbound,
            ready: Vec::new(),
            pending_cipher: None,
            snapshot_tx,
            services,
        }
    }

    pub fn conn_id(&self) -> ConnectionId {
        self.conn_id
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn entity_id(&self) -> u64 {
        self.entity_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self.state, SessionState::Disconnected { .. })
    }

    pub fn is_encrypted(&self) -> bool {
        self.codec.is_encrypted()
    }

    /// A handle any thread can use to send packets to this player.
    pub fn outbound(&self) -> SendQueueHandle {
        self.outbound.clone()
    }

    /// Follows the session's state from another thread.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase(),
            entity_id: self.entity_id,
            profile: self.state.profile().cloned(),
            encrypted: self.codec.is_encrypted(),
            level: match &self.state {
                SessionState::Play(play) => Some(play.level.clone()),
                _ => None,
            },
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }

    // -----------------------------------------------------------------------
    // Inbound
    // -----------------------------------------------------------------------

    /// Decodes one datagram and handles every packet in it.
    ///
    /// Stops at the first packet that ends the session.
    pub async fn handle_datagram(&mut self, datagram: &[u8]) -> Result<(), SessionError> {
        let packets = self.codec.decode(datagram)?;
        for packet in packets {
            self.handle(packet).await?;
            if self.is_disconnected() {
                break;
            }
        }
        Ok(())
    }

    /// Handles one decoded packet according to the current state.
    ///
    /// # Errors
    /// [`SessionError::ProtocolViolation`] if the state does not accept
    /// the packet. Login failures are not errors: the client is sent a
    /// disconnect reason instead.
    pub async fn handle(&mut self, packet: Packet) -> Result<(), SessionError> {
        let phase = self.phase();
        match (phase, packet) {
            (SessionPhase::Disconnected, packet) => {
                tracing::trace!(
                    conn = %self.conn_id,
                    packet = packet.name(),
                    "dropping packet after disconnect"
                );
                Ok(())
            }
            (_, Packet::Disconnect(packet)) => {
                tracing::info!(
                    conn = %self.conn_id,
                    message = %packet.message,
                    "client disconnected"
                );
                self.close(packet.message);
                Ok(())
            }
            (SessionPhase::Initial, Packet::Login(login)) => self.handle_login(login).await,
            (SessionPhase::Authenticating, Packet::ClientToServerHandshake(_)) => {
                tracing::debug!(conn = %self.conn_id, "client confirmed encryption");
                self.finalize()
            }
            (SessionPhase::Play, packet) if packet.is_gameplay() => {
                self.handle_play(packet);
                Ok(())
            }
            (phase, packet) => {
                tracing::warn!(
                    conn = %self.conn_id,
                    packet = packet.name(),
                    state = phase.name(),
                    "packet not allowed in current state"
                );
                Err(SessionError::ProtocolViolation {
                    packet: packet.name(),
                    state: phase.name(),
                })
            }
        }
    }

    async fn handle_login(&mut self, login: Login) -> Result<(), SessionError> {
        tracing::debug!(conn = %self.conn_id, protocol = login.protocol_version, "login received");

        match authenticate(Arc::clone(&self.services), login).await {
            Ok((verified, handshake)) => {
                tracing::info!(
                    conn = %self.conn_id,
                    player = %verified.profile.display_name,
                    "login verified"
                );
                self.state = SessionState::Authenticating(verified);
                self.publish();
                match handshake {
                    Some(handshake) => self.begin_encryption(handshake),
                    None => self.finalize(),
                }
            }
            Err(err) => {
                let reason = self.login_failure_reason(&err);
                self.disconnect(reason);
                Ok(())
            }
        }
    }

    fn login_failure_reason(&self, err: &SessionError) -> String {
        let config = &self.services.config;
        match err {
            SessionError::UnsupportedProtocolVersion(version) => {
                tracing::info!(conn = %self.conn_id, version, "client protocol not supported");
                unsupported_version_message()
            }
            SessionError::UntrustedChain => {
                tracing::info!(conn = %self.conn_id, "login chain not rooted in trusted key");
                config.untrusted_identity_message.clone()
            }
            SessionError::LoginBusy => {
                tracing::warn!(conn = %self.conn_id, "login refused, all workers busy");
                config.busy_message.clone()
            }
            other if other.is_auth_failure() => {
                tracing::info!(conn = %self.conn_id, error = %other, "login credentials rejected");
                INTERNAL_ERROR_MESSAGE.into()
            }
            other => {
                tracing::error!(conn = %self.conn_id, error = %other, "login failed");
                INTERNAL_ERROR_MESSAGE.into()
            }
        }
    }

    /// Switches the session to encrypted frames.
    ///
    /// The handshake goes into the send queue as an immediate packet and
    /// the cipher waits beside it. When [`flush`](Self::flush) reaches the
    /// handshake, everything queued before it has gone out in plaintext;
    /// the cipher is installed right after the handshake frame, so every
    /// later packet is encrypted no matter which thread queued it.
    fn begin_encryption(&mut self, handshake: ServerHandshake) -> Result<(), SessionError> {
        self.pending_cipher = Some(handshake.cipher);
        self.outbound.queue_immediate(handshake.packet);
        Ok(())
    }

    /// Lets the login listener decide, then puts the player in the world.
    fn finalize(&mut self) -> Result<(), SessionError> {
        let login = match std::mem::replace(&mut self.state, SessionState::Initial) {
            SessionState::Authenticating(login) => login,
            other => {
                let phase = other.phase();
                self.state = other;
                return Err(SessionError::Internal(format!("cannot finalize login in {phase}")));
            }
        };

        let mut event = LoginEvent::new(&login.profile, &login.client_data, self.address);
        self.services.listener.on_login(&mut event);
        if let Some(reason) = event.disconnect_reason().map(str::to_owned) {
            tracing::info!(
                conn = %self.conn_id,
                player = %login.profile.display_name,
                %reason,
                "login vetoed"
            );
            self.disconnect(reason);
            return Ok(());
        }

        self.outbound.queue(PlayStatus::new(PlayStatusKind::LoginSuccess));
        let level = self.services.levels.default_level();
        tracing::info!(
            conn = %self.conn_id,
            entity_id = self.entity_id,
            player = %login.profile.display_name,
            %level,
            "player entered play"
        );
        self.state = SessionState::Play(PlayState {
            login,
            level,
            inventory: PlayerInventory::new(),
        });
        self.outbound.queue(ResourcePacksInfo::default());
        self.publish();
        Ok(())
    }

    fn handle_play(&mut self, packet: Packet) {
        let SessionState::Play(play) = &mut self.state else {
            return;
        };
        let mut ctx = PlayContext {
            entity_id: self.entity_id,
            profile: &play.login.profile,
            level: &play.level,
            inventory: &mut play.inventory,
            outbound: &self.outbound,
            viewers: self.services.viewers.as_ref(),
        };

        if let Packet::MobEquipment(equipment) = &packet {
            if let Err(e) = ctx.set_held_slot(equipment.hotbar_slot, false) {
                tracing::debug!(conn = %self.conn_id, error = %e, "ignoring held slot change");
            }
        }

        let name = packet.name();
        if let Err(e) = self.services.play.handle(&mut ctx, packet) {
            tracing::warn!(conn = %self.conn_id, packet = name, error = %e, "play handler failed");
        }
    }

    // -----------------------------------------------------------------------
    // Leaving
    // -----------------------------------------------------------------------

    /// Sends the client a Disconnect with `reason` and ends the session.
    ///
    /// Does nothing if the session is already over.
    pub fn disconnect(&mut self, reason: impl Into<String>) {
        if self.is_disconnected() {
            return;
        }
        let reason = reason.into();
        tracing::info!(conn = %self.conn_id, %reason, "disconnecting player");
        self.outbound.queue(Disconnect::new(reason.clone()));
        self.close(reason);
    }

    /// Ends the session without telling the client.
    fn close(&mut self, reason: String) {
        self.state = SessionState::Disconnected { reason };
        self.publish();
    }

    // -----------------------------------------------------------------------
    // Outbound
    // -----------------------------------------------------------------------

    /// Waits until another thread queues something for this player.
    pub async fn wait_outbound(&mut self) -> bool {
        self.queue.wait().await
    }

    /// Encodes everything queued and returns the frames to write, in order.
    ///
    /// Runs of normal packets share a batch frame; immediate packets go out
    /// alone and unencrypted. An immediate packet that carries the server
    /// handshake switches on encryption for everything after it.
    pub fn flush(&mut self) -> Result<Vec<Vec<u8>>, SessionError> {
        self.encode_pending()?;
        Ok(std::mem::take(&mut self.ready))
    }

    fn encode_pending(&mut self) -> Result<(), SessionError> {
        let mut batch = Vec::new();
        for item in self.queue.drain() {
            match item {
                Outbound::Packet(packet) => batch.push(packet),
                Outbound::Immediate(packet) => {
                    self.encode_batch(&mut batch)?;
                    let is_handshake = matches!(packet, Packet::ServerToClientHandshake(_));
                    let frame = self.codec.encode_plain(&[packet])?;
                    self.ready.push(frame);
                    if is_handshake {
                        if let Some(cipher) = self.pending_cipher.take() {
                            self.codec.enable_encryption(cipher);
                            tracing::debug!(conn = %self.conn_id, "encryption enabled");
                            self.publish();
                        }
                    }
                }
            }
        }
        self.encode_batch(&mut batch)
    }

    fn encode_batch(&mut self, batch: &mut Vec<Packet>) -> Result<(), SessionError> {
        let max = self.services.config.batch_limits.max_packets.max(1);
        for chunk in batch.chunks(max) {
            let frame = self.codec.encode(chunk)?;
            self.ready.push(frame);
        }
        batch.clear();
        Ok(())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("conn_id", &self.conn_id)
            .field("entity_id", &self.entity_id)
            .field("phase", &self.phase())
            .field("encrypted", &self.codec.is_encrypted())
            .finish_non_exhaustive()
    }
}

/// Verifies a login on the worker pool and, if the deployment encrypts,
/// prepares the server's half of the handshake in the same job.
async fn authenticate(
    services: Arc<SessionServices>,
    login: Login,
) -> Result<(VerifiedLogin, Option<ServerHandshake>), SessionError> {
    if !login.is_supported_version() {
        return Err(SessionError::UnsupportedProtocolVersion(login.protocol_version));
    }

    let verifier = services.verifier.clone();
    let encrypt = services.config.encryption.is_enabled();
    services
        .pool
        .run(move || {
            let verified = verifier.verify(&login.chain_data, &login.skin_data)?;
            let handshake = if encrypt {
                Some(ServerHandshake::start(&verified.identity_key)?)
            } else {
                None
            };
            Ok::<_, SessionError>((verified, handshake))
        })
        .await?
}
