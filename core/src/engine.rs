use serde::{Deserialize, Serialize};

use crate::*;

/// Valid transitions:
/// - Idle -> AwaitingFirst (deal)
/// - AwaitingFirst -> AwaitingSecond (second pick of a mismatching pair)
/// - AwaitingSecond -> AwaitingFirst (mismatch hidden)
/// - AwaitingFirst -> Won (last pair matched)
/// - AwaitingFirst | AwaitingSecond -> Lost (countdown ran out)
///
/// A matching second pick resolves synchronously, so it never rests in `AwaitingSecond`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Idle,
    AwaitingFirst,
    AwaitingSecond,
    Won,
    Lost,
}

impl EngineState {
    pub const fn is_playing(self) -> bool {
        matches!(self, Self::AwaitingFirst | Self::AwaitingSecond)
    }

    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Identifies one pending mismatch hide, so that a late timer for an earlier pair is recognized and dropped.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HideToken(pub(crate) u32);

/// Remaining time of a play-through. Cancelling is idempotent: only the first call reports a stop.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    remaining: Seconds,
    running: bool,
}

impl Countdown {
    pub const fn start(secs: Seconds) -> Self {
        Self {
            remaining: secs,
            running: true,
        }
    }

    pub const fn stopped(secs: Seconds) -> Self {
        Self {
            remaining: secs,
            running: false,
        }
    }

    pub const fn remaining(&self) -> Seconds {
        self.remaining
    }

    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Stops the countdown, returning whether it was still running.
    pub fn cancel(&mut self) -> bool {
        core::mem::replace(&mut self.running, false)
    }

    fn tick(&mut self) -> Option<Seconds> {
        if !self.running {
            return None;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.running = false;
        }
        Some(self.remaining)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SelectOutcome {
    Ignored,
    Revealed,
    Matched { pairs: u8 },
    Mismatched(HideToken),
    Won,
}

impl SelectOutcome {
    pub const fn has_update(self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Ignored,
    Ticked(Seconds),
    Lost,
}

impl TickOutcome {
    pub const fn has_update(self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HideOutcome {
    Ignored,
    Hidden,
}

impl HideOutcome {
    pub const fn has_update(self) -> bool {
        matches!(self, Self::Hidden)
    }
}

/// State machine of one memory-game play-through.
///
/// It never touches a clock: the countdown advances through [`MatchGame::tick`] and a mismatching pair is put face
/// down through [`MatchGame::hide_mismatch`], both fed by whoever owns the real (or simulated) timers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchGame {
    deck: Deck,
    state: EngineState,
    first: Option<CardId>,
    second: Option<CardId>,
    matched_pairs: u8,
    input_locked: bool,
    countdown: Countdown,
    pending_hide: Option<HideToken>,
    next_token: u32,
}

impl MatchGame {
    pub fn new(deck: Deck, countdown_secs: Seconds) -> Self {
        Self {
            deck,
            state: EngineState::Idle,
            first: None,
            second: None,
            matched_pairs: 0,
            input_locked: false,
            countdown: Countdown::stopped(countdown_secs),
            pending_hide: None,
            next_token: 0,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.deck.card(id)
    }

    pub fn matched_pairs(&self) -> u8 {
        self.matched_pairs
    }

    pub fn is_input_locked(&self) -> bool {
        self.input_locked
    }

    pub fn remaining_secs(&self) -> Seconds {
        self.countdown.remaining()
    }

    pub fn countdown(&self) -> Countdown {
        self.countdown
    }

    pub fn selections(&self) -> (Option<CardId>, Option<CardId>) {
        (self.first, self.second)
    }

    pub fn pending_hide(&self) -> Option<HideToken> {
        self.pending_hide
    }

    /// Puts every card face down and starts the countdown.
    pub fn deal(&mut self) -> Result<()> {
        if self.state != EngineState::Idle {
            return Err(GameError::AlreadyDealt);
        }
        for id in 0..CARD_COUNT as CardId {
            self.deck.card_mut(id).hide();
        }
        self.countdown = Countdown::start(self.countdown.remaining());
        self.state = EngineState::AwaitingFirst;
        log::trace!("dealt {:?}", self.deck.symbols());
        Ok(())
    }

    pub fn can_select(&self, id: CardId) -> bool {
        let Some(card) = self.deck.card(id) else {
            return false;
        };
        self.state == EngineState::AwaitingFirst
            && !self.input_locked
            && !card.is_matched()
            && self.first != Some(id)
            && self.second != Some(id)
    }

    pub fn select(&mut self, id: CardId) -> Result<SelectOutcome> {
        let id = self.deck.validate_id(id)?;

        if !self.can_select(id) {
            log::trace!("select {} ignored in {:?}", id, self.state);
            return Ok(SelectOutcome::Ignored);
        }

        self.deck.card_mut(id).reveal();

        let Some(first) = self.first else {
            self.first = Some(id);
            return Ok(SelectOutcome::Revealed);
        };

        self.input_locked = true;
        self.second = Some(id);
        self.state = EngineState::AwaitingSecond;

        if self.deck[first].symbol() == self.deck[id].symbol() {
            self.deck.card_mut(first).mark_matched();
            self.deck.card_mut(id).mark_matched();
            self.matched_pairs += 1;
            self.first = None;
            self.second = None;
            self.input_locked = false;
            self.state = EngineState::AwaitingFirst;

            if self.matched_pairs == PAIR_COUNT {
                self.end_game(true);
                Ok(SelectOutcome::Won)
            } else {
                Ok(SelectOutcome::Matched {
                    pairs: self.matched_pairs,
                })
            }
        } else {
            let token = HideToken(self.next_token);
            self.next_token = self.next_token.wrapping_add(1);
            self.pending_hide = Some(token);
            Ok(SelectOutcome::Mismatched(token))
        }
    }

    /// Turns a mismatching pair back face down. Stale tokens and finished games are ignored.
    pub fn hide_mismatch(&mut self, token: HideToken) -> HideOutcome {
        if self.state != EngineState::AwaitingSecond || self.pending_hide != Some(token) {
            return HideOutcome::Ignored;
        }

        for id in [self.first.take(), self.second.take()].into_iter().flatten() {
            self.deck.card_mut(id).hide();
        }
        self.pending_hide = None;
        self.input_locked = false;
        self.state = EngineState::AwaitingFirst;
        HideOutcome::Hidden
    }

    /// One second elapsed. Reaching zero loses the game even with a mismatch hide still pending.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.state.is_playing() {
            return TickOutcome::Ignored;
        }

        match self.countdown.tick() {
            None => TickOutcome::Ignored,
            Some(0) => {
                self.end_game(false);
                TickOutcome::Lost
            }
            Some(remaining) => TickOutcome::Ticked(remaining),
        }
    }

    /// Stops the countdown, returning whether it was still running.
    pub fn cancel_countdown(&mut self) -> bool {
        self.countdown.cancel()
    }

    fn end_game(&mut self, won: bool) {
        if self.state.is_finished() {
            return;
        }

        self.countdown.cancel();
        self.pending_hide = None;
        self.input_locked = true;
        self.state = if won {
            EngineState::Won
        } else {
            EngineState::Lost
        };
        log::debug!("game finished: {:?}", self.state);
    }
}
