//! The authoritative game state.
//!
//! `GameState` is plain data with no locking of its own. The server wraps
//! the single instance in a `tokio::sync::Mutex`, which makes every method
//! here atomic with respect to every other.
//!
//! # Round lifecycle
//!
//! ```text
//! Setup ──advance_phase──► PlayCards ──(all submitted)──► Judgement
//!                              ▲                              │
//!                              └────────choose_winner─────────┘
//! ```
//!
//! Every method that fails returns before mutating anything, so a rejected
//! request leaves the state exactly as it found it. Successful mutations
//! bump `revision`, which the server uses to decide whether to broadcast.

use std::collections::{BTreeMap, HashSet};

use cardroom_protocol::{GameSnapshot, Phase, Player, PlayerId, PromptCard, ResponseCard, Role};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::{CardPool, Deck, GameError, GameSettings, MIN_PLAYERS};

/// One game: settings, seated players, the active prompt and the pool.
///
/// Players are keyed by id in a `BTreeMap`, so "the lowest id" is always
/// the first entry.
#[derive(Debug)]
pub struct GameState<R = StdRng> {
    settings: GameSettings,
    phase: Phase,
    players: BTreeMap<PlayerId, Player>,
    prompt: Option<PromptCard>,
    pool: CardPool<R>,
    round: u32,
    revision: u64,
    last_winner: Option<PlayerId>,
    champion: Option<PlayerId>,
}

impl GameState<StdRng> {
    /// Creates a game in `Setup` with an OS-seeded pool.
    ///
    /// # Errors
    /// [`GameError::InvalidSettings`] if the settings fail validation.
    pub fn new(settings: GameSettings, deck: Deck) -> Result<Self, GameError> {
        Self::with_rng(settings, deck, StdRng::from_os_rng())
    }
}

impl<R: Rng> GameState<R> {
    /// Creates a game in `Setup` whose pool draws with `rng`.
    ///
    /// # Errors
    /// [`GameError::InvalidSettings`] if the settings fail validation, or
    /// if some prompt asks for more cards than a hand holds; such a round
    /// could never be completed.
    pub fn with_rng(settings: GameSettings, deck: Deck, rng: R) -> Result<Self, GameError> {
        settings.validate()?;
        let max_pick = u32::from(deck.max_pick());
        if max_pick > settings.hand_size {
            return Err(GameError::InvalidSettings(format!(
                "hand_size {} is smaller than the largest pick ({max_pick}) in deck {:?}",
                settings.hand_size,
                deck.name()
            )));
        }
        Ok(Self {
            settings,
            phase: Phase::Setup,
            players: BTreeMap::new(),
            prompt: None,
            pool: CardPool::with_rng(deck, rng),
            round: 0,
            revision: 0,
            last_winner: None,
            champion: None,
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// Incremented on every successful mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn prompt(&self) -> Option<&PromptCard> {
        self.prompt.as_ref()
    }

    pub fn pool(&self) -> &CardPool<R> {
        &self.pool
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Seated players in id order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn judge(&self) -> Option<&Player> {
        self.players.values().find(|p| p.is_judge())
    }

    pub fn last_winner(&self) -> Option<PlayerId> {
        self.last_winner
    }

    pub fn champion(&self) -> Option<PlayerId> {
        self.champion
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    /// Seats a new player, or updates the name and color of an existing one.
    ///
    /// Calling this again for the same id never creates a second player and
    /// never touches role, hand or score. A player who joins after `Setup`
    /// is dealt a full hand straight away, unless the table is empty, in
    /// which case they take over as judge.
    ///
    /// # Errors
    /// [`GameError::PoolExhausted`] if a late joiner's hand can't be dealt;
    /// the player is not seated.
    pub fn upsert_player(
        &mut self,
        id: PlayerId,
        name: &str,
        color: Option<&str>,
    ) -> Result<Player, GameError> {
        let name = name.trim();
        let color = color.map(str::trim).filter(|c| !c.is_empty());

        if let Some(player) = self.players.get_mut(&id) {
            let changed = player.name != name || player.color.as_deref() != color;
            if changed {
                player.name = name.to_string();
                player.color = color.map(str::to_string);
                let player = player.clone();
                self.touch();
                tracing::debug!(%id, name = %player.name, "player info updated");
                return Ok(player);
            }
            return Ok(player.clone());
        }

        let mut player = Player::new(id, name, color.map(str::to_string));
        let mid_game = self.phase != Phase::Setup && self.champion.is_none();
        if mid_game && self.judge().is_some() {
            player.hand = self.pool.draw_responses(self.hand_size())?;
        }

        self.players.insert(id, player);
        self.settle();
        self.touch();

        let player = self.players.get(&id).cloned().ok_or_else(|| {
            GameError::InvariantViolation(format!("player {id} vanished after insert"))
        })?;
        tracing::info!(
            %id,
            name = %player.name,
            role = ?player.role,
            players = self.players.len(),
            "player joined"
        );
        Ok(player)
    }

    /// Removes a player. Unknown ids are a no-op and return `None`.
    ///
    /// If the judge leaves, the player with the lowest remaining id takes
    /// over. The round is then re-settled, which may move it between
    /// `PlayCards` and `Judgement`.
    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        let player = self.players.remove(&id)?;
        self.settle();
        self.touch();
        tracing::info!(
            %id,
            was_judge = player.is_judge(),
            players = self.players.len(),
            "player left"
        );
        Some(player)
    }

    // -----------------------------------------------------------------------
    // Round flow
    // -----------------------------------------------------------------------

    /// Moves the game to its next phase, if the rules allow it.
    ///
    /// - `Setup` → `PlayCards`: seats a judge, draws a prompt and deals.
    /// - `PlayCards` → `Judgement`: once every contestant has submitted.
    /// - `Judgement` never advances here; the judge must call
    ///   [`choose_winner`](Self::choose_winner).
    ///
    /// Returns the new phase.
    pub fn advance_phase(&mut self) -> Result<Phase, GameError> {
        if let Some(champion) = self.champion {
            return Err(GameError::GameOver(champion));
        }

        match self.phase {
            Phase::Setup => self.start_game()?,
            Phase::PlayCards => {
                let contestants = self.contestants().count();
                if contestants == 0 {
                    return Err(GameError::NotEnoughPlayers {
                        required: MIN_PLAYERS,
                        present: self.players.len(),
                    });
                }
                let pending = self.pending_submissions();
                if pending > 0 {
                    return Err(GameError::SubmissionsPending(pending));
                }
                self.phase = Phase::Judgement;
                self.touch();
                tracing::info!(round = self.round, "all cards in, judging");
            }
            Phase::Judgement => return Err(GameError::AwaitingJudgement),
        }

        Ok(self.phase)
    }

    /// Records a contestant's submission for the current round.
    ///
    /// The cards must be exactly `pick` distinct cards from the player's
    /// hand. Submitting again replaces the previous selection. When the last
    /// contestant submits, the round moves to `Judgement`.
    ///
    /// Returns the phase after the submission.
    pub fn select_cards(
        &mut self,
        id: PlayerId,
        cards: Vec<ResponseCard>,
    ) -> Result<Phase, GameError> {
        if let Some(champion) = self.champion {
            return Err(GameError::GameOver(champion));
        }
        if self.phase != Phase::PlayCards {
            return Err(GameError::WrongPhase {
                action: "select cards",
                phase: self.phase,
            });
        }
        let pick = self.pick()?;
        let player = self
            .players
            .get_mut(&id)
            .ok_or(GameError::UnknownConnection(id))?;
        if player.is_judge() {
            return Err(GameError::NotContestant(id));
        }

        if cards.len() != pick {
            return Err(GameError::InvalidSelection(format!(
                "expected {pick} card(s), got {}",
                cards.len()
            )));
        }
        let mut seen = HashSet::with_capacity(cards.len());
        for card in &cards {
            if !seen.insert(card) {
                return Err(GameError::InvalidSelection(format!(
                    "card {:?} selected twice",
                    card.text
                )));
            }
            if !player.hand.contains(card) {
                return Err(GameError::InvalidSelection(format!(
                    "card {:?} is not in hand",
                    card.text
                )));
            }
        }

        player.selected = cards;
        tracing::debug!(%id, "cards submitted");

        if self.ready_for_judgement() {
            self.phase = Phase::Judgement;
            tracing::info!(round = self.round, "all cards in, judging");
        }
        self.touch();
        Ok(self.phase)
    }

    /// The judge names the round's winner and the next round is dealt.
    ///
    /// The winner scores a point and becomes the next judge; everyone else
    /// becomes a contestant. Submitted cards leave the hands and are
    /// replaced from the pool, contestants are topped up to the hand size,
    /// and a new prompt is drawn. If the winner reaches the winning score
    /// they become champion and no new round is dealt.
    ///
    /// Returns the phase after the call: `PlayCards` for a new round,
    /// `Judgement` if the game just ended.
    ///
    /// # Errors
    /// [`GameError::PoolExhausted`] if the next round can't be dealt; the
    /// round is left undecided.
    pub fn choose_winner(
        &mut self,
        judge: PlayerId,
        winner: PlayerId,
    ) -> Result<Phase, GameError> {
        if let Some(champion) = self.champion {
            return Err(GameError::GameOver(champion));
        }
        if self.phase != Phase::Judgement {
            return Err(GameError::WrongPhase {
                action: "choose a winner",
                phase: self.phase,
            });
        }
        let pick = self.pick()?;
        let caller = self
            .players
            .get(&judge)
            .ok_or(GameError::UnknownConnection(judge))?;
        if !caller.is_judge() {
            return Err(GameError::NotJudge(judge));
        }
        let winning_score = match self.players.get(&winner) {
            Some(p) if !p.is_judge() && p.selected.len() == pick => p.score + 1,
            _ => return Err(GameError::InvalidWinner(winner)),
        };
        let game_over = winning_score >= self.settings.winning_score;

        // Work out every draw before changing anything.
        let hand_size = self.hand_size();
        let deals: Vec<(PlayerId, usize)> = self
            .players
            .values()
            .map(|p| {
                let spent = p.selected.len();
                let kept = p.hand.len() - spent;
                let need = if p.id == winner {
                    spent
                } else {
                    hand_size.saturating_sub(kept)
                };
                (p.id, need)
            })
            .collect();
        if !game_over {
            let total = deals.iter().map(|(_, need)| need).sum();
            self.pool.ensure_available(1, total)?;
        }

        for player in self.players.values_mut() {
            let spent = std::mem::take(&mut player.selected);
            player.hand.retain(|card| !spent.contains(card));
            player.role = if player.id == winner {
                Role::Judge
            } else {
                Role::Contestant
            };
        }
        if let Some(p) = self.players.get_mut(&winner) {
            p.score = winning_score;
        }
        self.last_winner = Some(winner);
        tracing::info!(round = self.round, %winner, score = winning_score, "round won");

        if game_over {
            self.champion = Some(winner);
            self.touch();
            tracing::info!(%winner, "game over");
            return Ok(self.phase);
        }

        self.prompt = Some(self.pool.draw_prompt()?);
        for (id, need) in deals {
            let cards = self.pool.draw_responses(need)?;
            if let Some(player) = self.players.get_mut(&id) {
                player.hand.extend(cards);
            }
        }
        self.phase = Phase::PlayCards;
        self.round += 1;
        self.touch();
        tracing::info!(round = self.round, judge = %winner, "round started");
        Ok(self.phase)
    }

    // -----------------------------------------------------------------------
    // Snapshots and checks
    // -----------------------------------------------------------------------

    /// An immutable copy of the whole state, players ordered by id.
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            phase: self.phase,
            round: self.round,
            revision: self.revision,
            players: self.players.values().cloned().collect(),
            prompt: self.prompt.clone(),
            last_winner: self.last_winner,
            champion: self.champion,
            hand_size: self.settings.hand_size,
            winning_score: self.settings.winning_score,
            prompts_remaining: self.pool.prompts_remaining(),
            responses_remaining: self.pool.responses_remaining(),
        }
    }

    /// Checks the state's structural rules.
    ///
    /// # Errors
    /// [`GameError::InvariantViolation`] describing the first broken rule.
    pub fn verify(&self) -> Result<(), GameError> {
        let judges = self.players.values().filter(|p| p.is_judge()).count();
        if self.phase == Phase::Setup && judges != 0 {
            return Err(violation(format!("{judges} judge(s) during setup")));
        }
        if self.phase != Phase::Setup && !self.players.is_empty() && judges != 1 {
            return Err(violation(format!(
                "expected exactly one judge, found {judges}"
            )));
        }
        if !self.pool.prompts().is_disjoint() || !self.pool.responses().is_disjoint() {
            return Err(violation("card pool available and used overlap".into()));
        }

        let available: HashSet<&ResponseCard> =
            self.pool.responses().available().iter().collect();
        for player in self.players.values() {
            let hand: HashSet<&ResponseCard> = player.hand.iter().collect();
            if hand.len() != player.hand.len() {
                return Err(violation(format!("{} holds a duplicate card", player.id)));
            }
            if player.hand.iter().any(|card| available.contains(card)) {
                return Err(violation(format!(
                    "{} holds a card that is still in the pool",
                    player.id
                )));
            }
            if player.selected.iter().any(|card| !hand.contains(card)) {
                return Err(violation(format!(
                    "{} selected a card outside their hand",
                    player.id
                )));
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn start_game(&mut self) -> Result<(), GameError> {
        let present = self.players.len();
        if present < MIN_PLAYERS {
            return Err(GameError::NotEnoughPlayers {
                required: MIN_PLAYERS,
                present,
            });
        }

        let hand_size = self.hand_size();
        let judge = *self.players.keys().next().ok_or(GameError::NotEnoughPlayers {
            required: MIN_PLAYERS,
            present,
        })?;
        let deals: Vec<(PlayerId, usize)> = self
            .players
            .values()
            .filter(|p| p.id != judge)
            .map(|p| (p.id, hand_size.saturating_sub(p.hand.len())))
            .collect();
        let total = deals.iter().map(|(_, need)| need).sum();
        self.pool.ensure_available(1, total)?;

        self.prompt = Some(self.pool.draw_prompt()?);
        for (id, need) in deals {
            let cards = self.pool.draw_responses(need)?;
            if let Some(player) = self.players.get_mut(&id) {
                player.hand.extend(cards);
            }
        }
        if let Some(player) = self.players.get_mut(&judge) {
            player.role = Role::Judge;
        }
        self.phase = Phase::PlayCards;
        self.round = 1;
        self.touch();
        tracing::info!(players = present, %judge, "game started");
        Ok(())
    }

    /// Restores the round's rules after players come or go.
    fn settle(&mut self) {
        if self.phase == Phase::Setup {
            return;
        }
        if self.players.is_empty() {
            // Empty table: idle until someone joins.
            return;
        }

        if !self.players.values().any(|p| p.is_judge()) {
            if let Some(mut entry) = self.players.first_entry() {
                let judge = entry.get_mut();
                judge.role = Role::Judge;
                judge.selected.clear();
                tracing::info!(id = %judge.id, "judge reassigned");
            }
        }

        if self.champion.is_some() {
            return;
        }
        match self.phase {
            Phase::Judgement if self.submissions() == 0 => {
                self.phase = Phase::PlayCards;
                tracing::info!(round = self.round, "no submissions left, reopening round");
            }
            Phase::PlayCards if self.ready_for_judgement() => {
                self.phase = Phase::Judgement;
                tracing::info!(round = self.round, "all cards in, judging");
            }
            _ => {}
        }
    }

    fn contestants(&self) -> impl Iterator<Item = &Player> {
        self.players.values().filter(|p| !p.is_judge())
    }

    fn submissions(&self) -> usize {
        self.contestants().filter(|p| !p.selected.is_empty()).count()
    }

    fn pending_submissions(&self) -> usize {
        let pick = self.prompt.as_ref().map_or(0, |p| usize::from(p.pick));
        self.contestants()
            .filter(|p| p.selected.len() != pick)
            .count()
    }

    fn ready_for_judgement(&self) -> bool {
        self.contestants().next().is_some() && self.pending_submissions() == 0
    }

    fn pick(&self) -> Result<usize, GameError> {
        self.prompt
            .as_ref()
            .map(|p| usize::from(p.pick))
            .ok_or_else(|| violation(format!("no prompt during {}", self.phase)))
    }

    fn hand_size(&self) -> usize {
        self.settings.hand_size as usize
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

fn violation(message: String) -> GameError {
    tracing::error!(%message, "game invariant violated");
    GameError::InvariantViolation(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deck(prompts: &[u8], responses: usize) -> Deck {
        Deck::new(
            "test",
            prompts
                .iter()
                .enumerate()
                .map(|(i, &pick)| PromptCard::new(format!("prompt {i}"), pick))
                .collect(),
            (0..responses)
                .map(|i| ResponseCard::new(format!("response {i}")))
                .collect(),
        )
        .unwrap()
    }

    fn game(prompts: &[u8], responses: usize) -> GameState<StdRng> {
        let settings = GameSettings {
            hand_size: 3,
            winning_score: 2,
        };
        GameState::with_rng(settings, deck(prompts, responses), StdRng::seed_from_u64(1))
            .unwrap()
    }

    /// A started game with players 1 (judge), 2 and 3.
    fn started() -> GameState<StdRng> {
        let mut g = game(&[1, 1, 1, 1], 40);
        for (id, name) in [(1, "Ana"), (2, "Bo"), (3, "Cy")] {
            g.upsert_player(PlayerId(id), name, None).unwrap();
        }
        g.advance_phase().unwrap();
        g
    }

    fn submit_first(g: &mut GameState<StdRng>, id: u64) -> Phase {
        let card = g.player(PlayerId(id)).unwrap().hand[0].clone();
        g.select_cards(PlayerId(id), vec![card]).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_settings() {
        let settings = GameSettings {
            hand_size: 0,
            winning_score: 1,
        };
        let result = GameState::new(settings, deck(&[1], 1));
        assert!(matches!(result, Err(GameError::InvalidSettings(_))));
    }

    #[test]
    fn test_new_rejects_pick_larger_than_hand() {
        let settings = GameSettings {
            hand_size: 2,
            winning_score: 1,
        };
        let result = GameState::with_rng(settings, deck(&[1, 3], 10), StdRng::seed_from_u64(1));
        assert!(matches!(result, Err(GameError::InvalidSettings(_))));
    }

    #[test]
    fn test_new_accepts_pick_equal_to_hand() {
        let settings = GameSettings {
            hand_size: 3,
            winning_score: 1,
        };
        let mut g =
            GameState::with_rng(settings, deck(&[3], 10), StdRng::seed_from_u64(1)).unwrap();
        g.upsert_player(PlayerId(1), "Ana", None).unwrap();
        g.upsert_player(PlayerId(2), "Bo", None).unwrap();
        g.advance_phase().unwrap();

        let hand = g.player(PlayerId(2)).unwrap().hand.clone();
        assert_eq!(g.select_cards(PlayerId(2), hand), Ok(Phase::Judgement));
    }

    #[test]
    fn test_duplicate_cards_never_reach_the_pool() {
        let duplicated = Deck::new(
            "dupes",
            vec![PromptCard::new("Q?", 1), PromptCard::new("R?", 1)],
            vec![ResponseCard::new("x"); 10]
                .into_iter()
                .chain((0..6).map(|i| ResponseCard::new(format!("r{i}"))))
                .collect(),
        )
        .unwrap();
        let settings = GameSettings {
            hand_size: 3,
            winning_score: 1,
        };
        let mut g = GameState::with_rng(settings, duplicated, StdRng::seed_from_u64(1)).unwrap();
        g.upsert_player(PlayerId(1), "Ana", None).unwrap();
        g.upsert_player(PlayerId(2), "Bo", None).unwrap();
        g.advance_phase().unwrap();

        assert_eq!(g.verify(), Ok(()));
        assert_eq!(g.pool().responses_remaining(), 7 - 3);
    }

    #[test]
    fn test_new_game_starts_in_setup() {
        let g = game(&[1], 5);
        assert_eq!(g.phase(), Phase::Setup);
        assert_eq!(g.round(), 0);
        assert_eq!(g.player_count(), 0);
        assert!(g.prompt().is_none());
    }

    #[test]
    fn test_upsert_twice_keeps_one_player() {
        let mut g = game(&[1], 5);
        g.upsert_player(PlayerId(1), "Ana", None).unwrap();
        let updated = g.upsert_player(PlayerId(1), "Ana B", Some("red")).unwrap();

        assert_eq!(g.player_count(), 1);
        assert_eq!(updated.name, "Ana B");
        assert_eq!(updated.color.as_deref(), Some("red"));
    }

    #[test]
    fn test_upsert_unchanged_does_not_bump_revision() {
        let mut g = game(&[1], 5);
        g.upsert_player(PlayerId(1), "Ana", None).unwrap();
        let revision = g.revision();
        g.upsert_player(PlayerId(1), " Ana ", None).unwrap();
        assert_eq!(g.revision(), revision);
    }

    #[test]
    fn test_setup_has_no_judge() {
        let mut g = game(&[1], 5);
        g.upsert_player(PlayerId(1), "Ana", None).unwrap();
        g.upsert_player(PlayerId(2), "Bo", None).unwrap();
        assert!(g.judge().is_none());
        assert!(g.verify().is_ok());
    }

    #[test]
    fn test_start_needs_two_players() {
        let mut g = game(&[1], 5);
        g.upsert_player(PlayerId(1), "Ana", None).unwrap();
        assert_eq!(
            g.advance_phase(),
            Err(GameError::NotEnoughPlayers {
                required: 2,
                present: 1
            })
        );
        assert_eq!(g.phase(), Phase::Setup);
    }

    #[test]
    fn test_start_seats_lowest_id_as_judge_and_deals_contestants() {
        let g = started();

        assert_eq!(g.phase(), Phase::PlayCards);
        assert_eq!(g.round(), 1);
        assert!(g.prompt().is_some());
        assert_eq!(g.judge().map(|p| p.id), Some(PlayerId(1)));
        assert!(g.player(PlayerId(1)).unwrap().hand.is_empty());
        assert_eq!(g.player(PlayerId(2)).unwrap().hand.len(), 3);
        assert_eq!(g.player(PlayerId(3)).unwrap().hand.len(), 3);
        assert_eq!(g.pool().responses_remaining(), 34);
        assert!(g.verify().is_ok());
    }

    #[test]
    fn test_start_with_short_pool_changes_nothing() {
        let mut g = game(&[1], 5);
        for id in 1..=3 {
            g.upsert_player(PlayerId(id), "p", None).unwrap();
        }
        let before = g.snapshot();

        let result = g.advance_phase();

        assert!(matches!(result, Err(GameError::PoolExhausted { .. })));
        assert_eq!(g.snapshot(), before);
    }

    #[test]
    fn test_advance_before_submissions_is_pending() {
        let mut g = started();
        assert_eq!(g.advance_phase(), Err(GameError::SubmissionsPending(2)));
        submit_first(&mut g, 2);
        assert_eq!(g.advance_phase(), Err(GameError::SubmissionsPending(1)));
    }

    #[test]
    fn test_last_submission_moves_to_judgement() {
        let mut g = started();
        assert_eq!(submit_first(&mut g, 2), Phase::PlayCards);
        assert_eq!(submit_first(&mut g, 3), Phase::Judgement);
        assert_eq!(g.advance_phase(), Err(GameError::AwaitingJudgement));
    }

    #[test]
    fn test_select_rejects_cards_outside_hand() {
        let mut g = started();
        let result = g.select_cards(PlayerId(2), vec![ResponseCard::new("not dealt")]);
        assert!(matches!(result, Err(GameError::InvalidSelection(_))));
        assert!(g.player(PlayerId(2)).unwrap().selected.is_empty());
    }

    #[test]
    fn test_select_rejects_wrong_count() {
        let mut g = started();
        let hand = g.player(PlayerId(2)).unwrap().hand.clone();
        let result = g.select_cards(PlayerId(2), hand[..2].to_vec());
        assert!(matches!(result, Err(GameError::InvalidSelection(_))));
    }

    #[test]
    fn test_judge_cannot_select() {
        let mut g = started();
        assert_eq!(
            g.select_cards(PlayerId(1), vec![]),
            Err(GameError::NotContestant(PlayerId(1)))
        );
    }

    #[test]
    fn test_select_during_setup_is_wrong_phase() {
        let mut g = game(&[1], 5);
        g.upsert_player(PlayerId(1), "Ana", None).unwrap();
        assert!(matches!(
            g.select_cards(PlayerId(1), vec![]),
            Err(GameError::WrongPhase { phase: Phase::Setup, .. })
        ));
    }

    #[test]
    fn test_resubmission_overwrites() {
        let mut g = started();
        let hand = g.player(PlayerId(2)).unwrap().hand.clone();
        g.select_cards(PlayerId(2), vec![hand[0].clone()]).unwrap();
        g.select_cards(PlayerId(2), vec![hand[1].clone()]).unwrap();
        assert_eq!(g.player(PlayerId(2)).unwrap().selected, vec![hand[1].clone()]);
    }

    #[test]
    fn test_choose_winner_requires_judge() {
        let mut g = started();
        submit_first(&mut g, 2);
        submit_first(&mut g, 3);
        assert_eq!(
            g.choose_winner(PlayerId(2), PlayerId(3)),
            Err(GameError::NotJudge(PlayerId(2)))
        );
        assert_eq!(
            g.choose_winner(PlayerId(1), PlayerId(1)),
            Err(GameError::InvalidWinner(PlayerId(1)))
        );
    }

    #[test]
    fn test_choose_winner_rotates_judge_and_refills_hands() {
        let mut g = started();
        submit_first(&mut g, 2);
        submit_first(&mut g, 3);
        let spent = g.player(PlayerId(3)).unwrap().selected.clone();

        let phase = g.choose_winner(PlayerId(1), PlayerId(3)).unwrap();

        assert_eq!(phase, Phase::PlayCards);
        assert_eq!(g.round(), 2);
        assert_eq!(g.last_winner(), Some(PlayerId(3)));
        let winner = g.player(PlayerId(3)).unwrap();
        assert!(winner.is_judge());
        assert_eq!(winner.score, 1);
        assert_eq!(winner.hand.len(), 3);
        assert!(!winner.hand.contains(&spent[0]));
        let old_judge = g.player(PlayerId(1)).unwrap();
        assert!(!old_judge.is_judge());
        assert_eq!(old_judge.hand.len(), 3);
        assert!(g.players().all(|p| p.selected.is_empty()));
        assert!(g.verify().is_ok());
    }

    #[test]
    fn test_reaching_winning_score_ends_game() {
        let mut g = started();
        // Winners can't win twice in a row, so 2 needs three rounds.
        for _ in 0..3 {
            let judge = g.judge().unwrap().id;
            let contestants: Vec<u64> = g
                .players()
                .filter(|p| !p.is_judge())
                .map(|p| p.id.0)
                .collect();
            for id in &contestants {
                submit_first(&mut g, *id);
            }
            // Player 2 wins every round it plays; otherwise player 3 does.
            let winner = if contestants.contains(&2) { 2 } else { 3 };
            g.choose_winner(judge, PlayerId(winner)).unwrap();
        }

        let champion = g.champion().unwrap();
        assert_eq!(g.player(champion).unwrap().score, 2);
        assert_eq!(g.phase(), Phase::Judgement);
        assert_eq!(g.advance_phase(), Err(GameError::GameOver(champion)));
        assert!(g.verify().is_ok());
    }

    #[test]
    fn test_choose_winner_with_short_pool_leaves_round_undecided() {
        // Deck covers the first round but only one prompt.
        let mut g = game(&[1], 6);
        g.upsert_player(PlayerId(1), "Ana", None).unwrap();
        g.upsert_player(PlayerId(2), "Bo", None).unwrap();
        g.advance_phase().unwrap();
        submit_first(&mut g, 2);
        let before = g.snapshot();

        let result = g.choose_winner(PlayerId(1), PlayerId(2));

        assert!(matches!(result, Err(GameError::PoolExhausted { .. })));
        assert_eq!(g.snapshot(), before);
    }

    #[test]
    fn test_judge_leaving_reassigns_lowest_id() {
        let mut g = game(&[1], 40);
        for id in [4, 7, 9] {
            g.upsert_player(PlayerId(id), "p", None).unwrap();
        }
        g.advance_phase().unwrap();
        assert_eq!(g.judge().map(|p| p.id), Some(PlayerId(4)));

        g.remove_player(PlayerId(4));

        assert_eq!(g.judge().map(|p| p.id), Some(PlayerId(7)));
        assert!(g.verify().is_ok());
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut g = started();
        let revision = g.revision();
        assert!(g.remove_player(PlayerId(99)).is_none());
        assert_eq!(g.revision(), revision);
    }

    #[test]
    fn test_last_pending_contestant_leaving_moves_to_judgement() {
        let mut g = started();
        submit_first(&mut g, 2);
        g.remove_player(PlayerId(3));
        assert_eq!(g.phase(), Phase::Judgement);
    }

    #[test]
    fn test_only_submitter_leaving_reopens_round() {
        let mut g = started();
        submit_first(&mut g, 2);
        submit_first(&mut g, 3);
        g.remove_player(PlayerId(2));
        assert_eq!(g.phase(), Phase::Judgement);
        g.remove_player(PlayerId(3));
        assert_eq!(g.phase(), Phase::PlayCards);
    }

    #[test]
    fn test_late_joiner_is_dealt_a_hand() {
        let mut g = started();
        let joined = g.upsert_player(PlayerId(8), "Late", None).unwrap();
        assert_eq!(joined.role, Role::Contestant);
        assert_eq!(joined.hand.len(), 3);
        assert!(g.verify().is_ok());
    }

    #[test]
    fn test_joiner_at_empty_table_becomes_judge() {
        let mut g = started();
        for id in 1..=3 {
            g.remove_player(PlayerId(id));
        }
        assert!(g.judge().is_none());

        let joined = g.upsert_player(PlayerId(5), "Solo", None).unwrap();

        assert!(joined.is_judge());
        assert!(g.verify().is_ok());
    }

    #[test]
    fn test_every_mutation_bumps_revision() {
        let mut g = game(&[1, 1], 20);
        let mut last = g.revision();
        let mut check = |g: &GameState<StdRng>| {
            assert!(g.revision() > last);
            last = g.revision();
        };
        g.upsert_player(PlayerId(1), "Ana", None).unwrap();
        check(&g);
        g.upsert_player(PlayerId(2), "Bo", None).unwrap();
        check(&g);
        g.advance_phase().unwrap();
        check(&g);
        submit_first(&mut g, 2);
        check(&g);
        g.choose_winner(PlayerId(1), PlayerId(2)).unwrap();
        check(&g);
    }
}
