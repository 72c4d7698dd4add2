//! Per-connection session loop: welcome, message dispatch, cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! plus a writer task that drains the connection's outbound queue. The
//! flow is:
//!   1. Queue `Welcome` with the player id, then register the queue
//!   2. Loop: receive bytes → decode → dispatch on the message type
//!   3. On close: unregister, remove the player, broadcast the new state,
//!      flush the outbound queue, then close the socket
//!
//! All replies and broadcasts go through the registry queue, never
//! straight to the socket, so they reach the client in the order they
//! were produced.

use std::sync::Arc;

use cardroom_game::{GameError, GameState};
use cardroom_protocol::{Codec, Message, PlayerId, ProtocolError, ResponseCard};
use cardroom_registry::{ConnectionRegistry, Frame};
use cardroom_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::CardroomError;
use crate::server::ServerState;

/// Drop guard that removes the player if the handler exits early.
///
/// The normal close path calls [`leave`] itself and disarms the guard, so
/// the player is gone before the socket closes. The guard only fires when
/// the handler panics or its task is cancelled. Since `Drop` is
/// synchronous, that cleanup is spawned as a fire-and-forget task.
struct SeatGuard<C: Codec> {
    conn_id: ConnectionId,
    state: Option<Arc<ServerState<C>>>,
}

impl<C: Codec> SeatGuard<C> {
    fn disarm(&mut self) {
        self.state = None;
    }
}

impl<C: Codec> Drop for SeatGuard<C> {
    fn drop(&mut self) {
        let Some(state) = self.state.take() else {
            return;
        };
        let conn_id = self.conn_id;
        tokio::spawn(async move {
            leave(&state, conn_id).await;
        });
    }
}

/// Whether the session loop keeps reading after a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Close,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), CardroomError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    let player_id = PlayerId::from(conn_id);
    tracing::debug!(%conn_id, "handling new connection");

    // --- Step 1: Welcome + register ---
    let (tx, rx) = mpsc::unbounded_channel();
    let welcome = encode(&state.codec, &Message::Welcome { player_id })?;
    // Queued before registering so no broadcast can overtake it.
    let _ = tx.send(welcome);
    state.registry.lock().await.register(conn_id, tx)?;
    let writer = tokio::spawn(write_loop(Arc::clone(&conn), rx));
    let mut guard = SeatGuard {
        conn_id,
        state: Some(Arc::clone(&state)),
    };
    tracing::info!(%conn_id, %player_id, "connection accepted");

    // --- Step 2: Message loop ---
    let session = Session {
        conn_id,
        player_id,
        state: &*state,
    };
    let result = session.run(&conn).await;

    // --- Step 3: Close ---
    // Remove the player first, so the peer never sees its socket close
    // while it is still seated.
    leave(&state, conn_id).await;
    guard.disarm();
    // Unregistering dropped the queue's sender; let the writer flush it.
    if let Err(e) = writer.await {
        tracing::debug!(%conn_id, error = %e, "writer task failed");
    }
    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close failed");
    }
    result
}

/// Drains a connection's outbound queue into its socket.
///
/// Ends when the registry drops the sender or a send fails. Either way the
/// receiver is dropped, so the registry prunes the member on its next send.
async fn write_loop(conn: Arc<WebSocketConnection>, mut rx: mpsc::UnboundedReceiver<Frame>) {
    while let Some(frame) = rx.recv().await {
        if let Err(e) = conn.send(&frame).await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "write failed");
            break;
        }
    }
}

/// Removes a connection and its player, then tells everyone else.
async fn leave<C: Codec>(state: &ServerState<C>, conn_id: ConnectionId) {
    let player_id = PlayerId::from(conn_id);
    let mut game = state.game.lock().await;
    let mut registry = state.registry.lock().await;
    // Already pruned if its writer died first.
    let _ = registry.unregister(conn_id);
    if state.is_stopped() {
        return;
    }

    let Some(player) = game.remove_player(player_id) else {
        tracing::debug!(%conn_id, "connection closed without a seat");
        return;
    };
    tracing::info!(%player_id, name = %player.name, "player removed");

    if let Err(e) = game.verify() {
        report_fatal(state, e);
        return;
    }
    if let Err(e) = broadcast_state(&state.codec, &game, &mut registry) {
        tracing::warn!(%player_id, error = %e, "failed to broadcast departure");
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

struct Session<'a, C: Codec> {
    conn_id: ConnectionId,
    player_id: PlayerId,
    state: &'a ServerState<C>,
}

impl<C: Codec> Session<'_, C> {
    async fn run(&self, conn: &WebSocketConnection) -> Result<(), CardroomError> {
        let conn_id = self.conn_id;
        loop {
            let data = match conn.recv().await {
                Ok(Some(data)) => data,
                Ok(None) => {
                    tracing::info!(%conn_id, "connection closed cleanly");
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!(%conn_id, error = %e, "recv error");
                    return Err(e.into());
                }
            };

            let msg = match self.state.codec.decode_message(&data) {
                Ok(msg) => msg,
                Err(ProtocolError::MalformedMessage(reason)) => {
                    tracing::warn!(%conn_id, %reason, "dropping malformed message");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(%conn_id, error = %e, "protocol violation, closing");
                    return Err(e.into());
                }
            };

            tracing::debug!(%conn_id, kind = %msg.kind(), "received message");
            if self.dispatch(msg).await? == Flow::Close {
                return Ok(());
            }
        }
    }

    async fn dispatch(&self, msg: Message) -> Result<Flow, CardroomError> {
        match msg {
            Message::SetPlayerInfo { name, color } => {
                self.apply(|game, id| {
                    game.upsert_player(id, &name, color.as_deref()).map(|_| ())
                })
                .await
            }

            Message::GetGameState => self.on_get_game_state().await,

            Message::StartGame => self.apply(|game, _| game.advance_phase().map(|_| ())).await,

            Message::SelectCards { cards } => self.on_select_cards(cards).await,

            Message::ChooseWinner { player_id } => {
                self.apply(|game, judge| game.choose_winner(judge, player_id).map(|_| ()))
                    .await
            }

            Message::Disconnect => {
                tracing::info!(player_id = %self.player_id, "client disconnected");
                Ok(Flow::Close)
            }

            Message::UpdateGameState(_)
            | Message::Ack
            | Message::Welcome { .. }
            | Message::Error { .. } => {
                tracing::warn!(
                    conn_id = %self.conn_id,
                    kind = %msg.kind(),
                    "dropping server-only message sent by client"
                );
                Ok(Flow::Continue)
            }
        }
    }

    async fn on_get_game_state(&self) -> Result<Flow, CardroomError> {
        let game = self.state.game.lock().await;
        let frame = encode(&self.state.codec, &Message::UpdateGameState(game.snapshot()))?;
        self.state.registry.lock().await.send_to(self.conn_id, frame)?;
        Ok(Flow::Continue)
    }

    async fn on_select_cards(&self, cards: Vec<ResponseCard>) -> Result<Flow, CardroomError> {
        self.apply(move |game, id| game.select_cards(id, cards).map(|_| ()))
            .await
    }

    /// Runs one game mutation under the game lock and reports the outcome.
    ///
    /// On success the new state is broadcast (if it changed) and the sender
    /// gets `Ack`. A rejected request gets `Error` and nothing else. A
    /// broken invariant is forwarded to the accept loop and ends this
    /// session.
    async fn apply<F>(&self, action: F) -> Result<Flow, CardroomError>
    where
        F: FnOnce(&mut GameState, PlayerId) -> Result<(), GameError>,
    {
        let mut game = self.state.game.lock().await;
        let before = game.revision();

        let outcome = action(&mut *game, self.player_id).and_then(|()| game.verify());

        let mut registry = self.state.registry.lock().await;
        match outcome {
            Ok(()) => {
                if game.revision() != before {
                    broadcast_state(&self.state.codec, &game, &mut registry)?;
                }
                let ack = encode(&self.state.codec, &Message::Ack)?;
                registry.send_to(self.conn_id, ack)?;
            }
            Err(e) if e.is_fatal() => {
                report_fatal(self.state, e.clone());
                return Err(e.into());
            }
            Err(e) => {
                if matches!(e, GameError::PoolExhausted { .. }) {
                    tracing::error!(player_id = %self.player_id, error = %e, "card pool exhausted");
                } else {
                    tracing::debug!(player_id = %self.player_id, error = %e, "request rejected");
                }
                send_error(&self.state.codec, &mut registry, self.conn_id, &e.to_string())?;
            }
        }
        Ok(Flow::Continue)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn encode(codec: &impl Codec, msg: &Message) -> Result<Frame, CardroomError> {
    Ok(Frame::from(codec.encode_message(msg)?))
}

/// Queues the current snapshot for every registered connection.
///
/// Must be called with the game lock held so the snapshot and its place
/// in every queue agree.
fn broadcast_state(
    codec: &impl Codec,
    game: &GameState,
    registry: &mut ConnectionRegistry,
) -> Result<usize, CardroomError> {
    let frame = encode(codec, &Message::UpdateGameState(game.snapshot()))?;
    let delivered = registry.broadcast(&frame);
    tracing::debug!(revision = game.revision(), delivered, "state broadcast");
    Ok(delivered)
}

/// Queues an `Error` message for one connection.
fn send_error(
    codec: &impl Codec,
    registry: &mut ConnectionRegistry,
    conn_id: ConnectionId,
    message: &str,
) -> Result<(), CardroomError> {
    let frame = encode(
        codec,
        &Message::Error {
            message: message.to_string(),
        },
    )?;
    registry.send_to(conn_id, frame)?;
    Ok(())
}

fn report_fatal<C: Codec>(state: &ServerState<C>, error: GameError) {
    tracing::error!(error = %error, "game invariant violated");
    if state.fatal.send(error).is_err() {
        tracing::error!("accept loop already gone");
    }
}
