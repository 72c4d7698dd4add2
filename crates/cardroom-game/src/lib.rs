//! Game rules for Cardroom.
//!
//! Everything here is synchronous, plain data. The server owns one
//! [`GameState`] behind a mutex and calls into it for every request; this
//! crate never sees a connection or a socket.
//!
//! # Key types
//!
//! - [`GameState`]: phases, players, roles, scoring
//! - [`CardPool`]: draw-without-replacement over a [`Deck`]
//! - [`GameSettings`]: hand size and winning score
//! - [`GameError`]: why a request was rejected

mod deck;
mod error;
mod pool;
mod settings;
mod state;

pub use deck::Deck;
pub use error::{CardKind, GameError};
pub use pool::{CardPool, Pile};
pub use settings::{DEFAULT_HAND_SIZE, DEFAULT_WINNING_SCORE, GameSettings, MIN_PLAYERS};
pub use state::GameState;
