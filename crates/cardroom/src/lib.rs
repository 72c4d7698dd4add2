//! # Cardroom
//!
//! Server-authoritative multiplayer card game over WebSockets.
//!
//! One server process runs one game. Players connect, name themselves,
//! and the server keeps every client in sync by broadcasting a full
//! snapshot after each change. A round has a judge who reads a prompt
//! card, contestants who answer with response cards from their hands,
//! and a winner who scores a point and judges the next round.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cardroom::prelude::*;
//!
//! # async fn run(deck: Deck) -> Result<(), CardroomError> {
//! let server = CardroomServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .deck(deck)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod client;
mod error;
mod handler;
mod server;

pub use client::{ClientConfig, DEFAULT_REQUEST_TIMEOUT, GameClient};
pub use error::{CardroomError, ClientError};
pub use server::{CardroomServer, CardroomServerBuilder, DEFAULT_BIND_ADDR, ServerConfig};

/// Re-exports of the types most programs need.
pub mod prelude {
    pub use crate::{
        CardroomError, CardroomServer, CardroomServerBuilder, ClientConfig, ClientError,
        GameClient, ServerConfig,
    };
    pub use cardroom_game::{Deck, GameError, GameSettings, GameState};
    pub use cardroom_protocol::{
        GameSnapshot, Message, MessageType, Phase, Player, PlayerId, PromptCard, ResponseCard,
        Role,
    };
}
