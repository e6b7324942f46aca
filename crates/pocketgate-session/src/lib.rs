//! Player sessions for Pocketgate.
//!
//! This crate takes a client from its first packet to standing in the
//! world:
//!
//! 1. **Authentication**: checking the Login certificate chain against a
//!    trust root ([`auth`]), on a bounded worker pool ([`LoginPool`]).
//! 2. **Encryption**: ECDH key agreement and the AES-CFB8 frame cipher
//!    ([`encryption`]).
//! 3. **The state machine**: which packets each state accepts
//!    ([`Session`]).
//! 4. **Outbound**: the per-session send queue any thread can write to
//!    ([`SendQueueHandle`]).
//! 5. **Tracking**: who is connected, and who can see whom
//!    ([`SessionManager`]).
//!
//! # How it fits in the stack
//!
//! ```text
//! Server (above)    ← owns a connection task per session
//!     ↕
//! Session Layer (this crate)  ← login, encryption, packet routing
//!     ↕
//! Protocol Layer (below)      ← Packet, batch frames
//! ```

pub mod auth;
pub mod collaborators;
pub mod encryption;
mod error;
pub mod framing;
pub mod inventory;
mod manager;
pub mod pool;
pub mod queue;
mod session;

pub use auth::{AuthProfile, ClientData, LoginVerifier, TrustRoot, VerifiedLogin};
pub use collaborators::{
    LevelId, LevelProvider, LoginEvent, LoginListener, PlayContext, PlayHandler, ViewerSink,
};
pub use encryption::{EncryptionSupport, PacketCipher};
pub use error::SessionError;
pub use framing::FrameCodec;
pub use inventory::PlayerInventory;
pub use manager::SessionManager;
pub use pool::LoginPool;
pub use queue::{SendQueue, SendQueueHandle};
pub use session::{
    DEFAULT_BUSY_MESSAGE, DEFAULT_UNTRUSTED_IDENTITY_MESSAGE, INTERNAL_ERROR_MESSAGE, PlayState,
    Session, SessionConfig, SessionPhase, SessionServices, SessionSnapshot, SessionState,
};
