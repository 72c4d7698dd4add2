//! Loading decks from the Cards Against Humanity JSON format.
//!
//! ```json
//! {
//!   "name": "Base Set",
//!   "codeName": "base",
//!   "official": true,
//!   "blackCards": [{ "text": "Why can't I sleep at night? ___.", "pick": 1 }],
//!   "whiteCards": ["A windmill full of corpses."]
//! }
//! ```
//!
//! Card text in published decks is HTML-escaped, so entities are decoded
//! on load.

use std::path::{Path, PathBuf};

use cardroom_game::Deck;
use cardroom_protocol::{PromptCard, ResponseCard};
use serde::Deserialize;

use crate::error::CliError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeckFile {
    name: String,
    #[serde(default)]
    code_name: Option<String>,
    #[serde(default)]
    official: bool,
    #[serde(default)]
    black_cards: Vec<BlackCard>,
    #[serde(default)]
    white_cards: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BlackCard {
    text: String,
    pick: u8,
}

/// Parses one deck file's contents.
pub fn parse(json: &str) -> Result<Deck, ParseError> {
    let file: DeckFile = serde_json::from_str(json).map_err(ParseError::Json)?;
    tracing::debug!(
        name = %file.name,
        code_name = ?file.code_name,
        official = file.official,
        "parsed deck file"
    );
    let prompts = file
        .black_cards
        .into_iter()
        .map(|card| PromptCard::new(unescape(&card.text), card.pick))
        .collect();
    let responses = file
        .white_cards
        .iter()
        .map(|text| ResponseCard::new(unescape(text)))
        .collect();
    Deck::new(file.name, prompts, responses).map_err(ParseError::Invalid)
}

/// Why a deck file's contents were rejected.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Json(serde_json::Error),

    #[error(transparent)]
    Invalid(cardroom_game::GameError),
}

/// Reads every path and merges the decks into one, dropping duplicate
/// cards across files.
pub fn load(paths: &[PathBuf]) -> Result<Deck, CliError> {
    let mut names = Vec::with_capacity(paths.len());
    let mut prompts = Vec::new();
    let mut responses = Vec::new();

    for path in paths {
        let deck = load_one(path)?;
        tracing::info!(
            path = %path.display(),
            name = %deck.name(),
            prompts = deck.prompts().len(),
            responses = deck.responses().len(),
            "deck loaded"
        );
        let (name, deck_prompts, deck_responses) = deck.into_parts();
        names.push(name);
        prompts.extend(deck_prompts);
        responses.extend(deck_responses);
    }

    Ok(Deck::new(names.join(" + "), prompts, responses)?)
}

fn load_one(path: &Path) -> Result<Deck, CliError> {
    let json = std::fs::read_to_string(path).map_err(|source| CliError::ReadDeck {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&json).map_err(|e| match e {
        ParseError::Json(source) => CliError::ParseDeck {
            path: path.to_path_buf(),
            source,
        },
        ParseError::Invalid(e) => CliError::Game(e),
    })
}

/// Decodes the HTML entities that appear in published deck text.
fn unescape(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}
