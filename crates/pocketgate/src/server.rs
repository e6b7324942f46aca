//! `PocketgateServer` builder and accept loop.
//!
//! This is the entry point for running a Pocketgate server. It ties the
//! layers together: transport → protocol → session.

use std::sync::Arc;
use std::time::Duration;

use pocketgate_session::collaborators::StaticLevel;
use pocketgate_session::{
    LevelId, LevelProvider, LoginListener, LoginPool, PlayHandler, SessionManager,
    SessionServices,
};
use pocketgate_transport::Transport;

use crate::PocketgateError;
use crate::config::ServerConfig;
use crate::handler::handle_connection;

/// Shared server state passed to each connection task.
pub(crate) struct ServerState {
    pub(crate) sessions: Arc<SessionManager>,
    pub(crate) services: Arc<SessionServices>,
    pub(crate) idle_timeout: Duration,
}

/// Builder for configuring and starting a Pocketgate server.
///
/// # Example
///
/// ```rust,ignore
/// use pocketgate::prelude::*;
///
/// let (transport, _connector) = MemoryTransport::pair();
/// let server = PocketgateServer::builder()
///     .config(ServerConfig::from_file("pocketgate.json")?)
///     .login_listener(MyBanlist::load()?)
///     .build(transport)?;
/// server.run().await
/// ```
#[derive(Default)]
pub struct PocketgateServerBuilder {
    config: ServerConfig,
    listener: Option<Arc<dyn LoginListener>>,
    levels: Option<Arc<dyn LevelProvider>>,
    play: Option<Arc<dyn PlayHandler>>,
}

impl PocketgateServerBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Decides whether verified players may join.
    pub fn login_listener(mut self, listener: impl LoginListener + 'static) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    /// Picks the spawn level. Defaults to `config.default_level`.
    pub fn level_provider(mut self, levels: impl LevelProvider + 'static) -> Self {
        self.levels = Some(Arc::new(levels));
        self
    }

    /// Receives gameplay packets.
    pub fn play_handler(mut self, play: impl PlayHandler + 'static) -> Self {
        self.play = Some(Arc::new(play));
        self
    }

    /// Validates the config and builds a server on `transport`.
    ///
    /// # Errors
    /// [`PocketgateError::Config`] if the config fails validation or the
    /// trust root key does not parse.
    pub fn build<T: Transport>(self, transport: T) -> Result<PocketgateServer<T>, PocketgateError> {
        self.config.validate_strict()?;
        let root = Arc::new(self.config.trust_root()?);
        let sessions = Arc::new(SessionManager::new());

        let levels = self.levels.unwrap_or_else(|| {
            Arc::new(StaticLevel(LevelId(self.config.default_level.clone())))
        });
        let mut services = SessionServices::new(root)
            .with_config(self.config.session_config())
            .with_pool(LoginPool::new(self.config.max_concurrent_logins))
            .with_levels(levels)
            .with_viewers(sessions.clone());
        if let Some(listener) = self.listener {
            services = services.with_listener(listener);
        }
        if let Some(play) = self.play {
            services = services.with_play_handler(play);
        }

        let state = Arc::new(ServerState {
            sessions,
            services: Arc::new(services),
            idle_timeout: self.config.idle_timeout(),
        });
        Ok(PocketgateServer { transport, state })
    }
}

/// A Pocketgate server bound to a transport.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct PocketgateServer<T: Transport> {
    transport: T,
    state: Arc<ServerState>,
}

impl<T: Transport> PocketgateServer<T> {
    /// Creates a new builder.
    pub fn builder() -> PocketgateServerBuilder {
        PocketgateServerBuilder::new()
    }

    /// Every live session. Game code uses this to broadcast or look up
    /// players.
    pub fn sessions(&self) -> Arc<SessionManager> {
        Arc::clone(&self.state.sessions)
    }

    /// Runs the accept loop.
    ///
    /// Each accepted connection gets its own task. Returns once the
    /// transport shuts down.
    pub async fn run(mut self) -> Result<(), PocketgateError> {
        tracing::info!("Pocketgate server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) if e.is_closed() => {
                    tracing::info!("transport shut down, server stopping");
                    return Ok(());
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
