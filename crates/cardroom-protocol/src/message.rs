//! The message envelope and the typed messages it carries.
//!
//! On the wire every message is a JSON object with a `type` tag and a
//! `data` payload whose shape depends on the tag:
//!
//! ```text
//! { "type": "SetPlayerInfo", "data": { "name": "Ana", "color": "teal" } }
//! { "type": "GetGameState" }
//! ```
//!
//! [`Envelope`] is the untyped outer layer; [`Message`] is the typed view.
//! Keeping them separate lets the server tell "this isn't an envelope at
//! all" apart from "this envelope carries a bad payload".

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{GameSnapshot, PlayerId, ProtocolError, ResponseCard};

/// Longest display name accepted, in characters.
pub const MAX_NAME_LEN: usize = 32;

/// Longest color tag accepted, in characters.
pub const MAX_COLOR_LEN: usize = 16;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The outer wire record: a type tag plus an opaque payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,

    /// Absent on the wire for messages without a payload.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl Envelope {
    /// Wraps a typed message.
    pub fn from_message(msg: &Message) -> Result<Self, ProtocolError> {
        // `Message` serializes to exactly the envelope's shape.
        serde_json::to_value(msg)
            .and_then(serde_json::from_value)
            .map_err(ProtocolError::Encode)
    }

    /// Interprets the payload according to the type tag, then validates it.
    ///
    /// # Errors
    /// `ProtocolError::MalformedMessage` for an unknown tag, a payload of
    /// the wrong shape, or a payload that fails [`Message::validate`].
    pub fn into_message(self) -> Result<Message, ProtocolError> {
        let mut object = serde_json::Map::new();
        object.insert("type".to_string(), Value::String(self.kind));
        if !self.data.is_null() {
            object.insert("data".to_string(), self.data);
        }

        let msg: Message = serde_json::from_value(Value::Object(object))
            .map_err(|e| ProtocolError::MalformedMessage(e.to_string()))?;
        msg.validate()?;
        Ok(msg)
    }
}

// ---------------------------------------------------------------------------
// MessageType
// ---------------------------------------------------------------------------

/// The tag of a [`Message`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    SetPlayerInfo,
    GetGameState,
    UpdateGameState,
    Disconnect,
    Ack,
    Welcome,
    StartGame,
    SelectCards,
    ChooseWinner,
    Error,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SetPlayerInfo => "SetPlayerInfo",
            Self::GetGameState => "GetGameState",
            Self::UpdateGameState => "UpdateGameState",
            Self::Disconnect => "Disconnect",
            Self::Ack => "Ack",
            Self::Welcome => "Welcome",
            Self::StartGame => "StartGame",
            Self::SelectCards => "SelectCards",
            Self::ChooseWinner => "ChooseWinner",
            Self::Error => "Error",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Every message either side can send.
///
/// `#[serde(tag = "type", content = "data")]` produces the adjacently
/// tagged `{ "type": ..., "data": ... }` shape; unit variants omit `data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Message {
    /// Client → Server: "This is who I am." Creates the player on first
    /// use, renames/recolors it afterwards.
    SetPlayerInfo {
        name: String,
        #[serde(default)]
        color: Option<String>,
    },

    /// Client → Server: "Send me the current state."
    GetGameState,

    /// Server → Client: the full state; replaces the client's copy.
    UpdateGameState(GameSnapshot),

    /// Client → Server: "I'm leaving." The server removes the player and
    /// closes the connection.
    Disconnect,

    /// Server → Client: a prior request was accepted.
    Ack,

    /// Server → Client: sent once, right after the connection is accepted.
    Welcome { player_id: PlayerId },

    /// Client → Server: leave setup and deal the first round.
    StartGame,

    /// Client → Server: a contestant's answer for the current round.
    SelectCards { cards: Vec<ResponseCard> },

    /// Client → Server: the judge names the round's winner.
    ChooseWinner { player_id: PlayerId },

    /// Server → Client: a request was rejected by the game rules.
    Error { message: String },
}

impl Message {
    /// The message's type tag.
    pub fn kind(&self) -> MessageType {
        match self {
            Self::SetPlayerInfo { .. } => MessageType::SetPlayerInfo,
            Self::GetGameState => MessageType::GetGameState,
            Self::UpdateGameState(_) => MessageType::UpdateGameState,
            Self::Disconnect => MessageType::Disconnect,
            Self::Ack => MessageType::Ack,
            Self::Welcome { .. } => MessageType::Welcome,
            Self::StartGame => MessageType::StartGame,
            Self::SelectCards { .. } => MessageType::SelectCards,
            Self::ChooseWinner { .. } => MessageType::ChooseWinner,
            Self::Error { .. } => MessageType::Error,
        }
    }

    /// Structural checks that serde alone can't express.
    ///
    /// # Errors
    /// `ProtocolError::MalformedMessage` describing the first failed check.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            Self::SetPlayerInfo { name, color } => {
                check_text("name", name, MAX_NAME_LEN)?;
                if let Some(color) = color {
                    check_text("color", color, MAX_COLOR_LEN)?;
                }
            }
            Self::SelectCards { cards } => {
                if cards.is_empty() {
                    return Err(ProtocolError::MalformedMessage(
                        "card selection is empty".into(),
                    ));
                }
                let distinct: HashSet<&ResponseCard> = cards.iter().collect();
                if distinct.len() != cards.len() {
                    return Err(ProtocolError::MalformedMessage(
                        "card selection contains duplicates".into(),
                    ));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn check_text(field: &str, value: &str, max_len: usize) -> Result<(), ProtocolError> {
    if value.trim().is_empty() {
        return Err(ProtocolError::MalformedMessage(format!("{field} is empty")));
    }
    if value.chars().count() > max_len {
        return Err(ProtocolError::MalformedMessage(format!(
            "{field} is longer than {max_len} characters"
        )));
    }
    Ok(())
}
