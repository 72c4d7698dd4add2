//! `CardroomServer` builder and accept loop.
//!
//! This is the entry point for running a Cardroom game server. It ties
//! together all the layers: transport → protocol → registry → game.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cardroom_game::{Deck, GameError, GameSettings, GameState};
use cardroom_protocol::{Codec, JsonCodec};
use cardroom_registry::ConnectionRegistry;
use cardroom_transport::{Transport, WebSocketTransport};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;

use crate::CardroomError;
use crate::handler::handle_connection;

/// Default listen address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Network settings for the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on. Port 0 picks a free port.
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

/// Shared server state passed to each connection handler task.
///
/// Lock order is always `game` then `registry`. Both locks are held while
/// a broadcast is queued, so every client sees updates in the order the
/// state changed.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) game: Mutex<GameState>,
    pub(crate) registry: Mutex<ConnectionRegistry>,
    pub(crate) codec: C,
    /// Handlers report invariant violations here; the accept loop stops.
    pub(crate) fatal: mpsc::UnboundedSender<GameError>,
    /// Set once the accept loop has stopped; the game must not be touched.
    pub(crate) stopped: AtomicBool,
}

impl<C: Codec> ServerState<C> {
    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

/// Builder for configuring and starting a Cardroom server.
///
/// # Example
///
/// ```rust,ignore
/// use cardroom::prelude::*;
///
/// let server = CardroomServer::builder()
///     .bind("0.0.0.0:8080")
///     .deck(deck)
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct CardroomServerBuilder {
    config: ServerConfig,
    settings: GameSettings,
    deck: Option<Deck>,
    seed: Option<u64>,
}

impl CardroomServerBuilder {
    /// Creates a new builder with default settings and no deck.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            settings: GameSettings::default(),
            deck: None,
            seed: None,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Replaces the whole network configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the game settings. Validated in [`build`](Self::build).
    pub fn settings(mut self, settings: GameSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the deck the game draws from. Required.
    pub fn deck(mut self, deck: Deck) -> Self {
        self.deck = Some(deck);
        self
    }

    /// Seeds the card pool so draws are reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the settings, builds the game and binds the listener.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    ///
    /// The game is created exactly once per server. `build` consumes the
    /// builder and [`CardroomServer`] offers no way to replace its
    /// `GameState`, so a running game can never be re-initialized.
    ///
    /// # Errors
    /// - [`GameError::InvalidSettings`] or [`GameError::InvalidDeck`]
    ///   (wrapped) if the game can't be built; nothing is bound
    /// - [`TransportError`](cardroom_transport::TransportError) if binding
    ///   fails
    pub async fn build(self) -> Result<CardroomServer<JsonCodec>, CardroomError> {
        let deck = self
            .deck
            .ok_or_else(|| GameError::InvalidDeck("no deck configured".into()))?;
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let game = GameState::with_rng(self.settings, deck, rng)?;

        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;
        let (fatal_tx, fatal_rx) = mpsc::unbounded_channel();

        let state = Arc::new(ServerState {
            game: Mutex::new(game),
            registry: Mutex::new(ConnectionRegistry::new()),
            codec: JsonCodec,
            fatal: fatal_tx,
            stopped: AtomicBool::new(false),
        });

        Ok(CardroomServer {
            transport,
            state,
            fatal: fatal_rx,
        })
    }
}

impl Default for CardroomServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Cardroom game server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct CardroomServer<C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
    fatal: mpsc::UnboundedReceiver<GameError>,
}

impl CardroomServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> CardroomServerBuilder {
        CardroomServerBuilder::new()
    }
}

impl<C: Codec> CardroomServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop.
    ///
    /// Spawns a handler task for each accepted connection. Per-connection
    /// failures are logged and never stop the loop. Runs until a handler
    /// reports a broken game invariant, which is returned as the error.
    /// Every connection is closed before `run` returns.
    pub async fn run(mut self) -> Result<(), CardroomError> {
        tracing::info!(addr = ?self.local_addr().ok(), "cardroom server running");
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tasks.spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
                Some(finished) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = finished {
                        if e.is_panic() {
                            tracing::error!(error = %e, "connection handler panicked");
                        }
                    }
                }
                Some(err) = self.fatal.recv() => {
                    tracing::error!(error = %err, "stopping server");
                    self.stop(&mut tasks).await;
                    return Err(err.into());
                }
            }
        }
    }

    /// Stops serving the game: drops every outbound queue, cancels the
    /// connection handlers and closes the listener.
    async fn stop(&self, tasks: &mut JoinSet<()>) {
        self.state.stopped.store(true, Ordering::Release);
        let dropped = self.state.registry.lock().await.clear();
        tasks.shutdown().await;
        tracing::info!(connections = dropped, "connections closed");
        if let Err(e) = self.transport.shutdown().await {
            tracing::debug!(error = %e, "transport shutdown failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use cardroom_protocol::{Message, PromptCard, ResponseCard};
    use futures_util::StreamExt;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    use super::*;

    fn deck() -> Deck {
        Deck::new(
            "test",
            vec![PromptCard::new("Q? ___.", 1)],
            (0..20).map(|i| ResponseCard::new(format!("A{i}"))).collect(),
        )
        .expect("valid deck")
    }

    #[tokio::test]
    async fn test_fatal_error_stops_server_and_closes_connections() {
        let server = CardroomServer::builder()
            .bind("127.0.0.1:0")
            .deck(deck())
            .seed(1)
            .build()
            .await
            .expect("server should build");
        let addr = server.local_addr().expect("local addr");
        let state = Arc::clone(&server.state);
        let running = tokio::spawn(server.run());

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("should connect");
        let welcome = ws
            .next()
            .await
            .expect("stream open")
            .expect("websocket ok");
        let msg = JsonCodec.decode_message(&welcome.into_data()).expect("valid message");
        assert!(matches!(msg, Message::Welcome { .. }));

        state
            .fatal
            .send(GameError::InvariantViolation("two judges".into()))
            .expect("accept loop listening");

        let result = tokio::time::timeout(Duration::from_secs(2), running)
            .await
            .expect("run should return")
            .expect("run should not panic");
        assert!(matches!(
            result,
            Err(CardroomError::Game(GameError::InvariantViolation(_)))
        ));
        assert!(state.is_stopped());
        assert!(state.registry.lock().await.is_empty());

        let closed = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match ws.next().await {
                    None | Some(Err(_)) | Some(Ok(WsMessage::Close(_))) => return,
                    Some(Ok(_)) => continue,
                }
            }
        })
        .await;
        assert!(closed.is_ok(), "client connection should be closed");
    }
}
