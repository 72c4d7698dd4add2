//! Game settings.

use serde::{Deserialize, Serialize};

use crate::GameError;

/// Cards each contestant holds at the start of a round.
pub const DEFAULT_HAND_SIZE: u32 = 5;

/// Points needed to win the game.
pub const DEFAULT_WINNING_SCORE: u32 = 5;

/// A round needs a judge and at least one contestant.
pub const MIN_PLAYERS: usize = 2;

/// Settings fixed for the lifetime of a game.
///
/// Construct with struct-update syntax over `Default` and pass to
/// [`GameState::new`](crate::GameState::new), which validates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    /// Target hand size for contestants.
    pub hand_size: u32,

    /// Score that ends the game.
    pub winning_score: u32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            hand_size: DEFAULT_HAND_SIZE,
            winning_score: DEFAULT_WINNING_SCORE,
        }
    }
}

impl GameSettings {
    /// Checks that every setting is a positive integer.
    ///
    /// # Errors
    /// [`GameError::InvalidSettings`] naming the offending field.
    pub fn validate(&self) -> Result<(), GameError> {
        if self.hand_size == 0 {
            return Err(GameError::InvalidSettings(
                "hand_size must be positive".into(),
            ));
        }
        if self.winning_score == 0 {
            return Err(GameError::InvalidSettings(
                "winning_score must be positive".into(),
            ));
        }
        Ok(())
    }
}
