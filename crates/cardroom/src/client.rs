//! Client session: one outbound connection and a cached game state.
//!
//! A background reader task owns the receiving half of the connection.
//! Every `UpdateGameState` it sees replaces the cached snapshot, whether
//! or not anyone asked for it. Requests that expect a reply register a
//! pending slot first; the reader hands the first matching message (or an
//! `Error`) to whoever is waiting.
//!
//! ```text
//! GameClient ──send──► server
//!     ▲                  │
//!     │ oneshot / watch   │
//!     └──── reader task ◄─┘
//! ```
//!
//! There is no correlation id on the wire, so only one request is in
//! flight at a time.

use std::sync::Arc;
use std::time::Duration;

use cardroom_protocol::{
    Codec, GameSnapshot, JsonCodec, Message, MessageType, PlayerId, ResponseCard,
};
use cardroom_transport::{ClientConnection, Connection};
use tokio::sync::{Mutex, oneshot, watch};
use tokio::task::JoinHandle;

use crate::ClientError;

/// How long a request waits for its reply by default.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Upper bound on waiting for a reply, `Welcome` or a
    /// [`wait_for`](GameClient::wait_for) condition.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// A request waiting for its reply.
struct Pending {
    expect: MessageType,
    reply: oneshot::Sender<Message>,
}

type PendingSlot = Arc<Mutex<Option<Pending>>>;

/// State that only exists while connected.
struct Live {
    conn: Arc<ClientConnection>,
    player_id: PlayerId,
    pending: PendingSlot,
    reader: JoinHandle<()>,
}

/// A player's connection to a Cardroom server.
///
/// ```rust,ignore
/// let mut client = GameClient::new(ClientConfig::default());
/// client.connect("ws://127.0.0.1:8080").await?;
/// client.set_player_info("Ana", Some("teal")).await?;
/// let state = client.wait_for(|s| s.players.len() >= 3).await?;
/// ```
pub struct GameClient<C: Codec + Clone = JsonCodec> {
    config: ClientConfig,
    codec: C,
    live: Option<Live>,
    state: Arc<watch::Sender<Option<GameSnapshot>>>,
    requests: Mutex<()>,
}

impl GameClient<JsonCodec> {
    /// Creates a disconnected client that speaks JSON.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_codec(config, JsonCodec)
    }
}

impl<C: Codec + Clone> GameClient<C> {
    pub fn with_codec(config: ClientConfig, codec: C) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            config,
            codec,
            live: None,
            state: Arc::new(state),
            requests: Mutex::new(()),
        }
    }

    /// Opens the connection and waits for the server's `Welcome`.
    ///
    /// Returns the player id the server assigned. Connecting again while
    /// connected first drops the old connection.
    pub async fn connect(&mut self, url: &str) -> Result<PlayerId, ClientError> {
        self.shutdown().await;

        let conn = Arc::new(cardroom_transport::connect(url).await?);
        let first = tokio::time::timeout(self.config.request_timeout, conn.recv())
            .await
            .map_err(|_| ClientError::Timeout(self.config.request_timeout))??
            .ok_or(ClientError::ConnectionClosed)?;
        let player_id = match self.codec.decode_message(&first)? {
            Message::Welcome { player_id } => player_id,
            other => return Err(ClientError::Unexpected(other.kind().to_string())),
        };

        let pending: PendingSlot = Arc::new(Mutex::new(None));
        let reader = tokio::spawn(read_loop(
            Arc::clone(&conn),
            self.codec.clone(),
            Arc::clone(&self.state),
            Arc::clone(&pending),
        ));
        self.live = Some(Live {
            conn,
            player_id,
            pending,
            reader,
        });

        tracing::info!(%player_id, url, "connected");
        Ok(player_id)
    }

    pub fn is_connected(&self) -> bool {
        self.live.as_ref().is_some_and(|live| !live.reader.is_finished())
    }

    /// The id from `Welcome`, while connected.
    pub fn player_id(&self) -> Option<PlayerId> {
        self.live.as_ref().map(|live| live.player_id)
    }

    /// The last snapshot received, if any.
    pub fn state(&self) -> Option<GameSnapshot> {
        self.state.borrow().clone()
    }

    /// A receiver that sees every cached snapshot from now on.
    pub fn subscribe(&self) -> watch::Receiver<Option<GameSnapshot>> {
        self.state.subscribe()
    }

    /// Waits until the cached snapshot satisfies `predicate`.
    ///
    /// Checks the current snapshot first. Bounded by the request timeout.
    pub async fn wait_for<F>(&self, predicate: F) -> Result<GameSnapshot, ClientError>
    where
        F: Fn(&GameSnapshot) -> bool,
    {
        let mut rx = self.subscribe();
        let wait = rx.wait_for(|state| state.as_ref().is_some_and(&predicate));
        match tokio::time::timeout(self.config.request_timeout, wait).await {
            Ok(Ok(state)) => (*state).clone().ok_or(ClientError::ConnectionClosed),
            Ok(Err(_)) => Err(ClientError::ConnectionClosed),
            Err(_) => Err(ClientError::Timeout(self.config.request_timeout)),
        }
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    /// Sends `msg` and waits for the first reply of type `expect`.
    ///
    /// # Errors
    /// - [`ClientError::NotConnected`] before `connect` or after
    ///   `disconnect`; nothing is sent
    /// - [`ClientError::Rejected`] if the server answered with `Error`
    /// - [`ClientError::Timeout`] if nothing matching arrived in time
    pub async fn send_and_wait(
        &self,
        msg: Message,
        expect: MessageType,
    ) -> Result<Message, ClientError> {
        let live = self.live.as_ref().ok_or(ClientError::NotConnected)?;
        if live.reader.is_finished() {
            return Err(ClientError::ConnectionClosed);
        }
        msg.validate()?;
        let bytes = self.codec.encode_message(&msg)?;

        let _one_at_a_time = self.requests.lock().await;
        let (tx, rx) = oneshot::channel();
        *live.pending.lock().await = Some(Pending { expect, reply: tx });
        live.conn.send(&bytes).await?;
        tracing::debug!(kind = %msg.kind(), %expect, "request sent");

        match tokio::time::timeout(self.config.request_timeout, rx).await {
            Ok(Ok(Message::Error { message })) => Err(ClientError::Rejected(message)),
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(ClientError::ConnectionClosed),
            Err(_) => {
                live.pending.lock().await.take();
                Err(ClientError::Timeout(self.config.request_timeout))
            }
        }
    }

    /// Sends a message that has no reply.
    pub async fn send(&self, msg: Message) -> Result<(), ClientError> {
        let live = self.live.as_ref().ok_or(ClientError::NotConnected)?;
        msg.validate()?;
        let bytes = self.codec.encode_message(&msg)?;
        live.conn.send(&bytes).await?;
        Ok(())
    }

    /// Joins the table, or renames this player.
    pub async fn set_player_info(
        &self,
        name: &str,
        color: Option<&str>,
    ) -> Result<(), ClientError> {
        let msg = Message::SetPlayerInfo {
            name: name.to_string(),
            color: color.map(str::to_string),
        };
        self.send_and_wait(msg, MessageType::Ack).await?;
        Ok(())
    }

    /// Asks for a fresh snapshot. The reply also updates the cache.
    pub async fn request_state(&self) -> Result<GameSnapshot, ClientError> {
        match self
            .send_and_wait(Message::GetGameState, MessageType::UpdateGameState)
            .await?
        {
            Message::UpdateGameState(snapshot) => Ok(snapshot),
            other => Err(ClientError::Unexpected(other.kind().to_string())),
        }
    }

    pub async fn start_game(&self) -> Result<(), ClientError> {
        self.send_and_wait(Message::StartGame, MessageType::Ack)
            .await?;
        Ok(())
    }

    pub async fn select_cards(&self, cards: Vec<ResponseCard>) -> Result<(), ClientError> {
        self.send_and_wait(Message::SelectCards { cards }, MessageType::Ack)
            .await?;
        Ok(())
    }

    pub async fn choose_winner(&self, player_id: PlayerId) -> Result<(), ClientError> {
        self.send_and_wait(Message::ChooseWinner { player_id }, MessageType::Ack)
            .await?;
        Ok(())
    }

    /// Tells the server this player is leaving and closes the connection.
    ///
    /// The cached snapshot is kept.
    pub async fn disconnect(&mut self) -> Result<(), ClientError> {
        let live = self.live.as_ref().ok_or(ClientError::NotConnected)?;
        let sent = match self.codec.encode_message(&Message::Disconnect) {
            Ok(bytes) => live.conn.send(&bytes).await.map_err(ClientError::from),
            Err(e) => Err(e.into()),
        };
        self.shutdown().await;
        sent
    }

    async fn shutdown(&mut self) {
        if let Some(live) = self.live.take() {
            if let Err(e) = live.conn.close().await {
                tracing::debug!(error = %e, "close failed");
            }
            live.reader.abort();
            live.pending.lock().await.take();
            tracing::info!(player_id = %live.player_id, "disconnected");
        }
    }
}

impl<C: Codec + Clone> Drop for GameClient<C> {
    fn drop(&mut self) {
        if let Some(live) = self.live.take() {
            live.reader.abort();
        }
    }
}

/// Feeds incoming messages to the cache and the pending request.
async fn read_loop<C: Codec>(
    conn: Arc<ClientConnection>,
    codec: C,
    state: Arc<watch::Sender<Option<GameSnapshot>>>,
    pending: PendingSlot,
) {
    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!("server closed the connection");
                break;
            }
            Err(e) => {
                tracing::debug!(error = %e, "recv error");
                break;
            }
        };

        let msg = match codec.decode_message(&data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(error = %e, "dropping undecodable server message");
                continue;
            }
        };

        if let Message::UpdateGameState(snapshot) = &msg {
            tracing::debug!(revision = snapshot.revision, phase = %snapshot.phase, "state updated");
            state.send_replace(Some(snapshot.clone()));
        }

        let mut slot = pending.lock().await;
        let kind = msg.kind();
        let wanted = slot
            .as_ref()
            .is_some_and(|p| p.expect == kind || kind == MessageType::Error);
        if wanted {
            if let Some(p) = slot.take() {
                let _ = p.reply.send(msg);
            }
        } else if let Message::Error { message } = &msg {
            tracing::warn!(%message, "unsolicited error from server");
        }
    }

    // Wakes any waiter with `ConnectionClosed`.
    pending.lock().await.take();
}
