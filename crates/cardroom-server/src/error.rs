//! Errors the binary reports before exiting.

use std::path::PathBuf;

use cardroom::{CardroomError, ClientError};
use cardroom_game::GameError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("cannot read deck {path}: {source}")]
    ReadDeck {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse deck {path}: {source}")]
    ParseDeck {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    Cardroom(#[from] CardroomError),

    #[error(transparent)]
    Client(#[from] ClientError),
}
