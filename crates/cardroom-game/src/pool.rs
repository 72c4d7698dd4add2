//! Draw-without-replacement over the deck's two card kinds.
//!
//! Each kind lives in a [`Pile`]: an *available* list to draw from and a
//! *used* list that records every card ever drawn, in draw order. A card
//! moves from available to used exactly once and never comes back, so
//! the two lists are always disjoint and their combined size never
//! changes.

use std::collections::HashSet;
use std::hash::Hash;

use cardroom_protocol::{PromptCard, ResponseCard};
use rand::rngs::StdRng;
use rand::Rng;

use crate::{CardKind, Deck, GameError};

/// One kind of card: what's left to draw and what has been drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pile<T> {
    available: Vec<T>,
    used: Vec<T>,
}

impl<T: Clone + Eq + Hash> Pile<T> {
    fn new(cards: Vec<T>) -> Self {
        Self {
            available: cards,
            used: Vec::new(),
        }
    }

    /// Removes `count` distinct cards chosen uniformly at random,
    /// appends them to `used` in draw order, and returns them.
    ///
    /// Checks the count before touching anything, so a failed draw leaves
    /// the pile (and the random source) exactly as it was.
    fn draw<R: Rng + ?Sized>(
        &mut self,
        count: usize,
        kind: CardKind,
        rng: &mut R,
    ) -> Result<Vec<T>, GameError> {
        if count > self.available.len() {
            return Err(GameError::PoolExhausted {
                kind,
                requested: count,
                available: self.available.len(),
            });
        }

        let mut drawn = Vec::with_capacity(count);
        for _ in 0..count {
            let index = rng.random_range(0..self.available.len());
            // Order of the available list carries no meaning.
            let card = self.available.swap_remove(index);
            self.used.push(card.clone());
            drawn.push(card);
        }
        Ok(drawn)
    }

    pub fn available(&self) -> &[T] {
        &self.available
    }

    pub fn used(&self) -> &[T] {
        &self.used
    }

    /// `true` if no card appears in both lists.
    pub fn is_disjoint(&self) -> bool {
        let used: HashSet<&T> = self.used.iter().collect();
        !self.available.iter().any(|card| used.contains(card))
    }
}

/// The server's supply of cards for one game.
///
/// The random source is a type parameter so tests can seed it; servers use
/// the default [`StdRng`] seeded from the OS.
#[derive(Debug, Clone)]
pub struct CardPool<R = StdRng> {
    prompts: Pile<PromptCard>,
    responses: Pile<ResponseCard>,
    rng: R,
}

impl<R: Rng> CardPool<R> {
    /// Creates a pool that draws with the given random source.
    pub fn with_rng(deck: Deck, rng: R) -> Self {
        let (_, prompts, responses) = deck.into_parts();
        Self {
            prompts: Pile::new(prompts),
            responses: Pile::new(responses),
            rng,
        }
    }

    /// Draws `count` prompt cards.
    ///
    /// # Errors
    /// [`GameError::PoolExhausted`] if fewer than `count` remain; nothing
    /// is drawn in that case.
    pub fn draw_prompts(&mut self, count: usize) -> Result<Vec<PromptCard>, GameError> {
        self.prompts.draw(count, CardKind::Prompt, &mut self.rng)
    }

    /// Draws `count` response cards.
    ///
    /// # Errors
    /// [`GameError::PoolExhausted`] if fewer than `count` remain; nothing
    /// is drawn in that case.
    pub fn draw_responses(
        &mut self,
        count: usize,
    ) -> Result<Vec<ResponseCard>, GameError> {
        self.responses.draw(count, CardKind::Response, &mut self.rng)
    }

    /// Draws a single prompt card.
    pub fn draw_prompt(&mut self) -> Result<PromptCard, GameError> {
        let mut drawn = self.draw_prompts(1)?;
        drawn.pop().ok_or(GameError::PoolExhausted {
            kind: CardKind::Prompt,
            requested: 1,
            available: 0,
        })
    }

    /// Fails with `PoolExhausted` unless both draws could succeed.
    ///
    /// Lets callers that need several draws check them up front and stay
    /// all-or-nothing.
    pub fn ensure_available(
        &self,
        prompts: usize,
        responses: usize,
    ) -> Result<(), GameError> {
        if prompts > self.prompts.available.len() {
            return Err(GameError::PoolExhausted {
                kind: CardKind::Prompt,
                requested: prompts,
                available: self.prompts.available.len(),
            });
        }
        if responses > self.responses.available.len() {
            return Err(GameError::PoolExhausted {
                kind: CardKind::Response,
                requested: responses,
                available: self.responses.available.len(),
            });
        }
        Ok(())
    }

    pub fn prompts(&self) -> &Pile<PromptCard> {
        &self.prompts
    }

    pub fn responses(&self) -> &Pile<ResponseCard> {
        &self.responses
    }

    pub fn prompts_remaining(&self) -> usize {
        self.prompts.available.len()
    }

    pub fn responses_remaining(&self) -> usize {
        self.responses.available.len()
    }
}
