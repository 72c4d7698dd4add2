//! Error types for the game layer.

use std::fmt;

use cardroom_protocol::{Phase, PlayerId};

/// The two kinds of card a pool holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardKind {
    Prompt,
    Response,
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prompt => write!(f, "prompt"),
            Self::Response => write!(f, "response"),
        }
    }
}

/// Errors that can occur while driving the game.
///
/// Only [`InvariantViolation`](GameError::InvariantViolation) indicates a
/// bug; everything else is a rejected request and leaves the state as it
/// was before the call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// A draw asked for more cards than the pool has left.
    #[error("not enough {kind} cards: requested {requested}, {available} available")]
    PoolExhausted {
        kind: CardKind,
        requested: usize,
        available: usize,
    },

    /// The id doesn't belong to a seated player.
    #[error("unknown connection {0}")]
    UnknownConnection(PlayerId),

    /// The state broke one of its own rules. Fatal.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("invalid deck: {0}")]
    InvalidDeck(String),

    #[error("cannot {action} during {phase}")]
    WrongPhase { action: &'static str, phase: Phase },

    #[error("need at least {required} players, have {present}")]
    NotEnoughPlayers { required: usize, present: usize },

    #[error("waiting for {0} contestant(s) to submit")]
    SubmissionsPending(usize),

    #[error("waiting for the judge to choose a winner")]
    AwaitingJudgement,

    #[error("player {0} is not the judge")]
    NotJudge(PlayerId),

    #[error("player {0} is not a contestant")]
    NotContestant(PlayerId),

    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    #[error("player {0} cannot win this round")]
    InvalidWinner(PlayerId),

    #[error("game over, {0} won")]
    GameOver(PlayerId),
}

impl GameError {
    /// Returns `true` for errors that must stop the server.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}
