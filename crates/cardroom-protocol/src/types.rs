//! Shared game types that travel on the wire.
//!
//! The server owns the authoritative copies of these values; clients only
//! ever see them inside a [`GameSnapshot`].

use std::fmt;

use cardroom_transport::ConnectionId;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// A player's identity is scoped to its connection: the server derives it
/// from the [`ConnectionId`] it assigned on accept, and it dies with that
/// connection. `#[serde(transparent)]` keeps it a plain number on the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

impl From<ConnectionId> for PlayerId {
    fn from(id: ConnectionId) -> Self {
        Self(id.into_inner())
    }
}

impl From<PlayerId> for ConnectionId {
    fn from(id: PlayerId) -> Self {
        ConnectionId::new(id.0)
    }
}

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

/// A card that asks a question; contestants answer it with `pick`
/// response cards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PromptCard {
    pub text: String,
    /// How many response cards each contestant must submit. Always >= 1.
    pub pick: u8,
}

impl PromptCard {
    pub fn new(text: impl Into<String>, pick: u8) -> Self {
        Self {
            text: text.into(),
            pick,
        }
    }
}

/// A card a contestant plays in answer to a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResponseCard {
    pub text: String,
}

impl ResponseCard {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// Whether a player judges the current round or plays in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Role {
    Judge,
    #[default]
    Contestant,
}

/// A seated player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub color: Option<String>,
    pub role: Role,
    /// Cards held, in the order they were dealt. No duplicates.
    pub hand: Vec<ResponseCard>,
    /// Cards submitted for the current round; always a subset of `hand`.
    pub selected: Vec<ResponseCard>,
    pub score: u32,
}

impl Player {
    /// Creates a contestant with an empty hand and no score.
    pub fn new(id: PlayerId, name: impl Into<String>, color: Option<String>) -> Self {
        Self {
            id,
            name: name.into(),
            color,
            role: Role::Contestant,
            hand: Vec::new(),
            selected: Vec::new(),
            score: 0,
        }
    }

    pub fn is_judge(&self) -> bool {
        self.role == Role::Judge
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// The stage of the current round.
///
/// ```text
/// Setup → PlayCards → Judgement → PlayCards → Judgement → ...
/// ```
///
/// `Setup` only happens once, before the first prompt is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Setup,
    PlayCards,
    Judgement,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup => write!(f, "Setup"),
            Self::PlayCards => write!(f, "PlayCards"),
            Self::Judgement => write!(f, "Judgement"),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// An immutable copy of the whole game state, as broadcast to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub phase: Phase,
    /// Number of prompts played so far; 0 during setup.
    pub round: u32,
    /// Bumped by the server on every mutation.
    pub revision: u64,
    /// Seated players, ordered by id.
    pub players: Vec<Player>,
    pub prompt: Option<PromptCard>,
    pub last_winner: Option<PlayerId>,
    /// Set once a player reaches `winning_score`; the game is over.
    pub champion: Option<PlayerId>,
    pub hand_size: u32,
    pub winning_score: u32,
    pub prompts_remaining: usize,
    pub responses_remaining: usize,
}

impl GameSnapshot {
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn judge(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_judge())
    }
}
