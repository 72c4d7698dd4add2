//! The deck a game is built from.

use std::collections::HashSet;

use cardroom_protocol::{PromptCard, ResponseCard};

use crate::GameError;

/// A named set of prompt and response cards, imported once at startup.
///
/// Card text is the card's identity, so duplicate texts are dropped on
/// construction. The fields are private so every deck goes through
/// [`Deck::new`]; the pool relies on every card being distinct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    name: String,
    prompts: Vec<PromptCard>,
    responses: Vec<ResponseCard>,
}

impl Deck {
    /// Builds a deck, removing duplicates and keeping first occurrences.
    ///
    /// # Errors
    /// [`GameError::InvalidDeck`] if a prompt asks for zero cards.
    pub fn new(
        name: impl Into<String>,
        prompts: Vec<PromptCard>,
        responses: Vec<ResponseCard>,
    ) -> Result<Self, GameError> {
        if let Some(bad) = prompts.iter().find(|p| p.pick == 0) {
            return Err(GameError::InvalidDeck(format!(
                "prompt {:?} has pick 0",
                bad.text
            )));
        }

        let name = name.into();
        let prompts = dedup(prompts);
        let responses = dedup(responses);
        tracing::debug!(
            deck = %name,
            prompts = prompts.len(),
            responses = responses.len(),
            "deck loaded"
        );

        Ok(Self {
            name,
            prompts,
            responses,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prompts(&self) -> &[PromptCard] {
        &self.prompts
    }

    pub fn responses(&self) -> &[ResponseCard] {
        &self.responses
    }

    /// Largest `pick` of any prompt, or 0 for a deck without prompts.
    pub fn max_pick(&self) -> u8 {
        self.prompts.iter().map(|p| p.pick).max().unwrap_or(0)
    }

    /// Splits the deck into its name and card lists.
    pub fn into_parts(self) -> (String, Vec<PromptCard>, Vec<ResponseCard>) {
        (self.name, self.prompts, self.responses)
    }
}

fn dedup<T: Clone + Eq + std::hash::Hash>(cards: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::with_capacity(cards.len());
    cards
        .into_iter()
        .filter(|card| seen.insert(card.clone()))
        .collect()
}
