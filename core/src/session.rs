use std::cell::RefCell;

use rand::Rng;

use crate::*;

pub type SessionId = u32;

/// Proof that a game was won for a cell. Only the most recent win's ticket is accepted by the upload chain, so a
/// file read or store write completing late can't touch a newer session.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct UploadTicket {
    session: SessionId,
    cell: CellIndex,
}

impl UploadTicket {
    pub const fn session(&self) -> SessionId {
        self.session
    }

    pub const fn cell(&self) -> CellIndex {
        self.cell
    }
}

/// One play-through bound to exactly one cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameSession {
    id: SessionId,
    target: CellIndex,
    game: MatchGame,
}

impl GameSession {
    pub const fn id(&self) -> SessionId {
        self.id
    }

    pub const fn target(&self) -> CellIndex {
        self.target
    }

    pub const fn game(&self) -> &MatchGame {
        &self.game
    }

    pub fn is_active(&self) -> bool {
        !self.game.is_finished()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    NoChange,
    Updated,
    Won(UploadTicket),
    Lost {
        session: SessionId,
        cell: CellIndex,
    },
}

impl Transition {
    pub const fn has_update(self) -> bool {
        !matches!(self, Self::NoChange)
    }

    pub const fn is_final(self) -> bool {
        matches!(self, Self::Won(_) | Self::Lost { .. })
    }
}

/// Owns the single [`GameSession`] and drives it from clicks and timer events.
///
/// Timers are reached through the [`Timers`] seam: the browser uses real intervals, tests use [`SimClock`].
#[derive(Debug)]
pub struct SessionController<T: Timers> {
    config: WallConfig,
    timers: T,
    session: Option<GameSession>,
    next_id: SessionId,
    pending_upload: Option<UploadTicket>,
}

impl<T: Timers> SessionController<T> {
    pub fn new(config: WallConfig, timers: T) -> Self {
        Self {
            config,
            timers,
            session: None,
            next_id: 0,
            pending_upload: None,
        }
    }

    pub fn config(&self) -> &WallConfig {
        &self.config
    }

    pub fn timers(&self) -> &T {
        &self.timers
    }

    pub fn session(&self) -> Option<&GameSession> {
        self.session.as_ref()
    }

    /// Whether a game is being played; the game surface is shown exactly while this holds.
    pub fn is_active(&self) -> bool {
        self.session.as_ref().is_some_and(GameSession::is_active)
    }

    pub fn pending_upload(&self) -> Option<UploadTicket> {
        self.pending_upload
    }

    /// Whether clicking `cell` may start a game under the configured [`UnlockPolicy`].
    pub fn can_begin(&self, grid: &Grid, cell: CellIndex) -> bool {
        grid.contains(cell)
            && (grid.is_locked(cell) || self.config.unlock_policy == UnlockPolicy::AllowOverwrite)
            && self
                .session
                .as_ref()
                .is_none_or(|session| !session.is_active() || session.target == cell)
    }

    pub fn begin<R: Rng + ?Sized>(
        &mut self,
        grid: &Grid,
        cell: CellIndex,
        rng: &mut R,
    ) -> core::result::Result<SessionId, SessionError> {
        self.begin_with_deck(grid, cell, Deck::shuffled(rng))
    }

    /// Starts a game for `cell` with a fixed deck.
    ///
    /// A running game for another cell is left alone and reported; a running game for the same cell restarts.
    pub fn begin_with_deck(
        &mut self,
        grid: &Grid,
        cell: CellIndex,
        deck: Deck,
    ) -> core::result::Result<SessionId, SessionError> {
        if !grid.contains(cell) {
            return Err(SessionError::InvalidCell(cell));
        }
        if let Some(active) = self.session.as_ref().filter(|session| session.is_active()) {
            if active.target != cell {
                return Err(SessionError::AlreadyActive(active.target));
            }
        }
        if !grid.is_locked(cell) && self.config.unlock_policy == UnlockPolicy::LockedOnly {
            return Err(SessionError::CellUnlocked(cell));
        }

        self.teardown();

        let mut game = MatchGame::new(deck, self.config.game.countdown_secs);
        game.deal()?;
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.session = Some(GameSession {
            id,
            target: cell,
            game,
        });
        self.timers.start_countdown(self.config.game.tick_ms);

        log::debug!("session {} started for cell {}", id, cell);
        Ok(id)
    }

    pub fn select(&mut self, card: CardId) -> core::result::Result<Transition, SessionError> {
        let session = self.session.as_mut().ok_or(SessionError::NoSession)?;
        let outcome = session.game.select(card)?;
        log::trace!("session {} select {}: {:?}", session.id, card, outcome);

        Ok(match outcome {
            SelectOutcome::Ignored => Transition::NoChange,
            SelectOutcome::Revealed | SelectOutcome::Matched { .. } => Transition::Updated,
            SelectOutcome::Mismatched(token) => {
                self.timers
                    .schedule_hide(token, self.config.game.mismatch_delay_ms);
                Transition::Updated
            }
            SelectOutcome::Won => self.finish(true),
        })
    }

    /// Feeds one timer event. Events arriving for a finished or replaced game are no-ops.
    pub fn on_timer(&mut self, event: TimerEvent) -> Transition {
        let Some(session) = self.session.as_mut() else {
            return Transition::NoChange;
        };

        match event {
            TimerEvent::CountdownTick => match session.game.tick() {
                TickOutcome::Ignored => Transition::NoChange,
                TickOutcome::Ticked(_) => Transition::Updated,
                TickOutcome::Lost => self.finish(false),
            },
            TimerEvent::HideMismatch(token) => {
                if session.game.hide_mismatch(token).has_update() {
                    Transition::Updated
                } else {
                    Transition::NoChange
                }
            }
        }
    }

    fn finish(&mut self, won: bool) -> Transition {
        self.timers.cancel_countdown();
        self.timers.cancel_hide();

        let Some(session) = self.session.as_ref() else {
            return Transition::NoChange;
        };

        if won {
            let ticket = UploadTicket {
                session: session.id,
                cell: session.target,
            };
            log::info!("cell {} won, waiting for an image", session.target);
            self.pending_upload = Some(ticket);
            Transition::Won(ticket)
        } else {
            log::info!("cell {} lost, countdown ran out", session.target);
            Transition::Lost {
                session: session.id,
                cell: session.target,
            }
        }
    }

    fn teardown(&mut self) {
        self.timers.cancel_countdown();
        self.timers.cancel_hide();
        if let Some(mut session) = self.session.take() {
            session.game.cancel_countdown();
            log::debug!("session {} torn down", session.id);
        }
    }

    fn check_ticket(&self, ticket: UploadTicket) -> core::result::Result<(), UnlockError> {
        if self.pending_upload == Some(ticket) {
            Ok(())
        } else {
            log::debug!("dropping stale upload for cell {}", ticket.cell);
            Err(UnlockError::Stale)
        }
    }

    /// Turns the chosen file into the cell's thumbnail. The ticket stays valid on failure so the player can retry.
    pub fn accept_image(
        &self,
        ticket: UploadTicket,
        file: Option<&[u8]>,
    ) -> core::result::Result<Thumbnail, UnlockError> {
        self.check_ticket(ticket)?;
        let bytes = file.ok_or(UnlockError::NoFileSelected)?;
        Ok(encode_thumbnail(bytes, self.config.game.thumbnail_size)?)
    }

    /// Consumes the ticket once the store acknowledged the write. A failed write keeps it for a manual retry.
    pub fn finish_upload(
        &mut self,
        ticket: UploadTicket,
        written: core::result::Result<(), StoreError>,
    ) -> core::result::Result<CellIndex, UnlockError> {
        self.check_ticket(ticket)?;
        written?;
        self.pending_upload = None;
        log::info!("cell {} unlocked", ticket.cell);
        Ok(ticket.cell)
    }

    /// Whole upload chain: encode, show locally right away, then persist.
    ///
    /// The grid is only borrowed while the image is applied, never across the write, so it may be the same grid a
    /// store subscription feeds.
    pub async fn upload<S: CellStore>(
        &mut self,
        grid: &RefCell<Grid>,
        store: &S,
        ticket: UploadTicket,
        file: Option<&[u8]>,
    ) -> core::result::Result<CellIndex, UnlockError> {
        let image = self.accept_image(ticket, file)?;
        if let Err(err) = grid.borrow_mut().apply(ticket.cell, image.clone()) {
            log::warn!("could not show cell {} locally: {}", ticket.cell, err);
        }
        let written = GridSync::persist(store, ticket.cell, &image).await;
        self.finish_upload(ticket, written)
    }
}

impl SessionController<SimClock> {
    /// Advances the simulated clock, feeding every due event and collecting the transitions that changed something.
    pub fn advance(&mut self, ms: u64) -> Vec<Transition> {
        let deadline = self.timers.now_ms() + ms;
        let mut transitions = Vec::new();
        while let Some(event) = self.timers.pop_due(deadline) {
            let transition = self.on_timer(event);
            if transition.has_update() {
                transitions.push(transition);
            }
        }
        self.timers.settle(deadline);
        transitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use std::rc::Rc;
    use Symbol::*;

    const SCENARIO: [Symbol; CARD_COUNT] = [A, B, A, C, B, D, C, D];

    fn controller() -> SessionController<SimClock> {
        SessionController::new(WallConfig::default(), SimClock::new())
    }

    fn deck() -> Deck {
        Deck::from_symbols(SCENARIO).unwrap()
    }

    fn win(ctrl: &mut SessionController<SimClock>) -> UploadTicket {
        for (a, b) in [(0, 2), (1, 4), (3, 6), (5, 7)] {
            ctrl.select(a).unwrap();
            if let Transition::Won(ticket) = ctrl.select(b).unwrap() {
                return ticket;
            }
        }
        panic!("scenario did not win");
    }

    fn png() -> Vec<u8> {
        let image = RgbaImage::from_pixel(8, 4, Rgba([10, 20, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn scenario_a_wins_and_stops_countdown() {
        let grid = Grid::new(100);
        let mut ctrl = controller();
        ctrl.begin_with_deck(&grid, 9, deck()).unwrap();
        assert!(ctrl.is_active());

        let mut pairs = Vec::new();
        let mut finals = Vec::new();
        for (a, b) in [(0, 2), (1, 4), (3, 6), (5, 7)] {
            ctrl.select(a).unwrap();
            let transition = ctrl.select(b).unwrap();
            pairs.push(ctrl.session().unwrap().game().matched_pairs());
            if transition.is_final() {
                finals.push(transition);
            }
        }

        assert_eq!(pairs, vec![1, 2, 3, 4]);
        assert_eq!(finals.len(), 1);
        assert!(matches!(finals[0], Transition::Won(ticket) if ticket.cell() == 9));
        assert!(!ctrl.is_active());
        assert!(!ctrl.timers().is_countdown_running());
        assert_eq!(ctrl.timers().countdown_cancels(), 1);

        assert!(ctrl.advance(20_000).is_empty());
        assert_eq!(ctrl.session().unwrap().game().state(), EngineState::Won);
    }

    #[test]
    fn scenario_b_mismatch_hides_after_delay() {
        let grid = Grid::new(100);
        let mut ctrl = controller();
        ctrl.begin_with_deck(&grid, 0, deck()).unwrap();

        ctrl.select(0).unwrap();
        ctrl.select(1).unwrap();
        assert!(ctrl.advance(499).is_empty());
        assert!(ctrl.session().unwrap().game().card(1).unwrap().is_revealed());

        assert_eq!(ctrl.advance(1), vec![Transition::Updated]);

        let game = ctrl.session().unwrap().game();
        assert!(!game.card(0).unwrap().is_revealed());
        assert!(!game.card(1).unwrap().is_revealed());
        assert_eq!(game.matched_pairs(), 0);
        assert!(!game.is_input_locked());
    }

    #[test]
    fn scenario_c_timeout_loses_and_cell_stays_locked() {
        let grid = Grid::new(100);
        let mut ctrl = controller();
        ctrl.begin_with_deck(&grid, 5, deck()).unwrap();

        let transitions = ctrl.advance(10_000);

        let finals: Vec<_> = transitions.iter().filter(|t| t.is_final()).collect();
        assert_eq!(finals, vec![&Transition::Lost { session: 0, cell: 5 }]);
        assert!(!ctrl.is_active());
        assert!(grid.is_locked(5));
        assert_eq!(ctrl.pending_upload(), None);
        assert!(ctrl.advance(10_000).is_empty());
    }

    #[test]
    fn timeout_beats_pending_mismatch_hide() {
        let grid = Grid::new(100);
        let mut ctrl = controller();
        ctrl.begin_with_deck(&grid, 5, deck()).unwrap();
        ctrl.advance(9_600);

        ctrl.select(0).unwrap();
        ctrl.select(1).unwrap();
        let transitions = ctrl.advance(1_000);

        assert_eq!(transitions, vec![Transition::Lost { session: 0, cell: 5 }]);
        assert_eq!(ctrl.timers().pending_hide(), None);
        let game = ctrl.session().unwrap().game();
        assert_eq!(game.state(), EngineState::Lost);
        assert_eq!(ctrl.select(3).unwrap(), Transition::NoChange);
    }

    #[test]
    fn stray_timer_events_after_win_are_noops() {
        let grid = Grid::new(100);
        let mut ctrl = controller();
        ctrl.begin_with_deck(&grid, 1, deck()).unwrap();
        win(&mut ctrl);

        assert_eq!(ctrl.on_timer(TimerEvent::CountdownTick), Transition::NoChange);
        assert_eq!(ctrl.on_timer(TimerEvent::CountdownTick), Transition::NoChange);
        assert_eq!(ctrl.timers().countdown_cancels(), 1);
    }

    #[test]
    fn other_cell_is_rejected_while_playing() {
        let grid = Grid::new(100);
        let mut ctrl = controller();
        let first = ctrl.begin_with_deck(&grid, 1, deck()).unwrap();

        assert_eq!(
            ctrl.begin_with_deck(&grid, 2, deck()),
            Err(SessionError::AlreadyActive(1))
        );
        assert!(!ctrl.can_begin(&grid, 2));
        assert_eq!(ctrl.session().unwrap().id(), first);
        assert!(ctrl.timers().is_countdown_running());
    }

    #[test]
    fn same_cell_restarts_cleanly() {
        let grid = Grid::new(100);
        let mut ctrl = controller();
        ctrl.begin_with_deck(&grid, 1, deck()).unwrap();
        ctrl.select(0).unwrap();
        ctrl.select(2).unwrap();
        ctrl.advance(3_000);

        let second = ctrl.begin_with_deck(&grid, 1, deck()).unwrap();

        let session = ctrl.session().unwrap();
        assert_eq!(session.id(), second);
        assert_eq!(session.game().matched_pairs(), 0);
        assert_eq!(session.game().remaining_secs(), 10);
        assert_eq!(ctrl.timers().countdown_starts(), 2);
        assert_eq!(ctrl.timers().countdown_cancels(), 1);
    }

    #[test]
    fn new_session_after_loss_gets_a_fresh_countdown() {
        let grid = Grid::new(100);
        let mut ctrl = controller();
        ctrl.begin_with_deck(&grid, 1, deck()).unwrap();
        ctrl.advance(10_000);

        ctrl.begin_with_deck(&grid, 2, deck()).unwrap();
        let ticks = ctrl.advance(3_000);

        assert_eq!(ticks.len(), 3);
        assert_eq!(ctrl.session().unwrap().game().remaining_secs(), 7);
    }

    #[test]
    fn unlock_policy_controls_replays() {
        let mut grid = Grid::new(100);
        grid.apply(3, Thumbnail::from_store("data:x")).unwrap();

        let mut ctrl = controller();
        assert_eq!(
            ctrl.begin_with_deck(&grid, 3, deck()),
            Err(SessionError::CellUnlocked(3))
        );
        assert!(!ctrl.can_begin(&grid, 3));

        let config = WallConfig::default().with_policy(UnlockPolicy::AllowOverwrite);
        let mut ctrl = SessionController::new(config, SimClock::new());
        assert!(ctrl.can_begin(&grid, 3));
        assert!(ctrl.begin_with_deck(&grid, 3, deck()).is_ok());
    }

    #[test]
    fn unknown_cell_and_missing_session() {
        let grid = Grid::new(10);
        let mut ctrl = controller();
        assert_eq!(
            ctrl.begin_with_deck(&grid, 10, deck()),
            Err(SessionError::InvalidCell(10))
        );
        assert_eq!(ctrl.select(0), Err(SessionError::NoSession));
        assert_eq!(ctrl.on_timer(TimerEvent::CountdownTick), Transition::NoChange);
    }

    #[test]
    fn upload_chain_unlocks_and_persists() {
        let grid = RefCell::new(Grid::new(100));
        let store = MemoryStore::new();
        let mut ctrl = controller();
        ctrl.begin_with_deck(&grid.borrow(), 42, deck()).unwrap();
        let ticket = win(&mut ctrl);

        let png = png();
        let cell = ctrl
            .upload(&grid, &store, ticket, Some(&png))
            .now_or_never()
            .unwrap()
            .unwrap();

        assert_eq!(cell, 42);
        let shown = grid.borrow().cell(42).and_then(Cell::image).cloned().unwrap();
        assert_eq!(store.get("logos/42").as_deref(), Some(shown.as_str()));
        assert_eq!(ctrl.pending_upload(), None);
    }

    #[test]
    fn upload_into_grid_fed_by_its_own_subscription() {
        let grid = Rc::new(RefCell::new(Grid::new(100)));
        let sync = Rc::new(RefCell::new(GridSync::new()));
        let store = MemoryStore::new();
        let _subscription = GridSync::subscribe(&store, {
            let grid = grid.clone();
            let sync = sync.clone();
            move |event| {
                sync.borrow_mut().on_event(&mut grid.borrow_mut(), event);
            }
        })
        .unwrap();
        let mut ctrl = controller();
        ctrl.begin_with_deck(&grid.borrow(), 5, deck()).unwrap();
        let ticket = win(&mut ctrl);

        // the memory store echoes the write to the subscription before returning
        let png = png();
        let cell = ctrl
            .upload(&grid, &store, ticket, Some(&png))
            .now_or_never()
            .unwrap();

        assert_eq!(cell, Ok(5));
        assert!(!grid.borrow().is_locked(5));
        assert_eq!(grid.borrow().unlocked_count(), 1);
    }

    #[test]
    fn upload_failures_keep_prior_state() {
        let grid = RefCell::new(Grid::new(100));
        let store = MemoryStore::new();
        let mut ctrl = controller();
        ctrl.begin_with_deck(&grid.borrow(), 7, deck()).unwrap();
        let ticket = win(&mut ctrl);

        let no_file = ctrl.upload(&grid, &store, ticket, None).now_or_never().unwrap();
        assert_eq!(no_file, Err(UnlockError::NoFileSelected));

        let garbage = ctrl
            .upload(&grid, &store, ticket, Some(b"garbage"))
            .now_or_never()
            .unwrap();
        assert!(matches!(garbage, Err(UnlockError::Decode(_))));
        assert!(grid.borrow().is_locked(7));

        store.fail_writes(Some("offline"));
        let png = png();
        let offline = ctrl
            .upload(&grid, &store, ticket, Some(&png))
            .now_or_never()
            .unwrap();
        assert!(matches!(offline, Err(UnlockError::Persist(_))));
        assert!(!grid.borrow().is_locked(7));
        assert_eq!(store.get("logos/7"), None);
        assert_eq!(ctrl.pending_upload(), Some(ticket));

        store.fail_writes(None);
        let retried = ctrl
            .upload(&grid, &store, ticket, Some(&png))
            .now_or_never()
            .unwrap();
        assert_eq!(retried, Ok(7));
    }

    #[test]
    fn late_completion_for_old_win_is_stale() {
        let grid = Grid::new(100);
        let mut ctrl = controller();
        ctrl.begin_with_deck(&grid, 1, deck()).unwrap();
        let old = win(&mut ctrl);
        ctrl.begin_with_deck(&grid, 2, deck()).unwrap();
        let new = win(&mut ctrl);

        assert_eq!(ctrl.finish_upload(old, Ok(())), Err(UnlockError::Stale));
        assert_eq!(ctrl.accept_image(old, Some(&png())), Err(UnlockError::Stale));
        assert_eq!(ctrl.pending_upload(), Some(new));
        assert_eq!(ctrl.finish_upload(new, Ok(())), Ok(2));
        assert_eq!(ctrl.finish_upload(new, Ok(())), Err(UnlockError::Stale));
    }
}
