//! Wire protocol for Cardroom.
//!
//! This crate defines what clients and servers say to each other:
//!
//! - **Types** ([`PlayerId`], [`PromptCard`], [`ResponseCard`], [`Player`],
//!   [`Phase`], [`GameSnapshot`]): game data as it appears on the wire.
//! - **Messages** ([`Envelope`], [`Message`], [`MessageType`]): the
//!   tagged records exchanged over a connection.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how messages become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer sits between transport (raw bytes) and the game
//! server. It doesn't know about connections or game rules.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope → Message) → Server (game state)
//! ```

mod codec;
mod error;
mod message;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use message::{Envelope, MAX_COLOR_LEN, MAX_NAME_LEN, Message, MessageType};
pub use types::{
    GameSnapshot, Phase, Player, PlayerId, PromptCard, ResponseCard, Role,
};
