//! Pure display projection of wall and game state, shared by every renderer.

use crate::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CardFace {
    Down,
    Up(Symbol),
    Matched(Symbol),
}

impl CardFace {
    pub const fn symbol(self) -> Option<Symbol> {
        match self {
            Self::Down => None,
            Self::Up(symbol) | Self::Matched(symbol) => Some(symbol),
        }
    }
}

pub fn card_face(card: &Card) -> CardFace {
    if card.is_matched() {
        CardFace::Matched(card.symbol())
    } else if card.is_revealed() {
        CardFace::Up(card.symbol())
    } else {
        CardFace::Down
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CellFace<'a> {
    Locked,
    Unlocked(&'a Thumbnail),
}

pub fn cell_face(cell: &Cell) -> CellFace<'_> {
    match cell.image() {
        None => CellFace::Locked,
        Some(image) => CellFace::Unlocked(image),
    }
}

/// Formats remaining seconds as `M:SS`.
pub fn format_countdown(secs: Seconds) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CardView {
    pub id: CardId,
    pub face: CardFace,
    pub selectable: bool,
}

/// What the game overlay shows while a session is being played.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverlayView {
    pub target: CellIndex,
    pub countdown: String,
    pub matched_pairs: u8,
    pub cards: Vec<CardView>,
    pub interactive: bool,
}

/// The overlay is visible exactly while the session's game is unfinished.
pub fn overlay(session: Option<&GameSession>) -> Option<OverlayView> {
    let session = session.filter(|session| session.is_active())?;
    let game = session.game();

    Some(OverlayView {
        target: session.target(),
        countdown: format_countdown(game.remaining_secs()),
        matched_pairs: game.matched_pairs(),
        cards: game
            .deck()
            .iter()
            .map(|(id, card)| CardView {
                id,
                face: card_face(card),
                selectable: game.can_select(id),
            })
            .collect(),
        interactive: !game.is_input_locked(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use Symbol::*;

    fn controller() -> SessionController<SimClock> {
        SessionController::new(WallConfig::default(), SimClock::new())
    }

    fn deck() -> Deck {
        Deck::from_symbols([A, B, A, C, B, D, C, D]).unwrap()
    }

    #[test]
    fn countdown_is_minutes_and_padded_seconds() {
        assert_eq!(format_countdown(10), "0:10");
        assert_eq!(format_countdown(5), "0:05");
        assert_eq!(format_countdown(0), "0:00");
        assert_eq!(format_countdown(75), "1:15");
    }

    #[test]
    fn no_session_no_overlay() {
        assert_eq!(overlay(None), None);
    }

    #[test]
    fn fresh_game_shows_all_cards_down() {
        let grid = Grid::new(10);
        let mut ctrl = controller();
        ctrl.begin_with_deck(&grid, 4, deck()).unwrap();

        let view = overlay(ctrl.session()).unwrap();

        assert_eq!(view.target, 4);
        assert_eq!(view.countdown, "0:10");
        assert_eq!(view.cards.len(), CARD_COUNT);
        assert!(view.cards.iter().all(|card| card.face == CardFace::Down && card.selectable));
        assert!(view.interactive);
    }

    #[test]
    fn faces_follow_selection_and_matching() {
        let grid = Grid::new(10);
        let mut ctrl = controller();
        ctrl.begin_with_deck(&grid, 0, deck()).unwrap();
        ctrl.select(0).unwrap();
        ctrl.select(2).unwrap();
        ctrl.select(1).unwrap();

        let view = overlay(ctrl.session()).unwrap();

        assert_eq!(view.cards[0].face, CardFace::Matched(A));
        assert_eq!(view.cards[2].face, CardFace::Matched(A));
        assert_eq!(view.cards[1].face, CardFace::Up(B));
        assert_eq!(view.cards[3].face, CardFace::Down);
        assert!(!view.cards[0].selectable);
        assert!(!view.cards[1].selectable);
        assert_eq!(view.matched_pairs, 1);
    }

    #[test]
    fn mismatch_locks_the_overlay_until_hidden() {
        let grid = Grid::new(10);
        let mut ctrl = controller();
        ctrl.begin_with_deck(&grid, 0, deck()).unwrap();
        ctrl.select(0).unwrap();
        ctrl.select(1).unwrap();

        let view = overlay(ctrl.session()).unwrap();
        assert!(!view.interactive);
        assert!(view.cards.iter().all(|card| !card.selectable));

        ctrl.advance(500);
        let view = overlay(ctrl.session()).unwrap();
        assert!(view.interactive);
        assert_eq!(view.cards[1].face, CardFace::Down);
    }

    #[test]
    fn overlay_hides_once_the_countdown_runs_out() {
        let grid = Grid::new(10);
        let mut ctrl = controller();
        ctrl.begin_with_deck(&grid, 3, deck()).unwrap();

        ctrl.advance(5_000);
        assert_eq!(overlay(ctrl.session()).unwrap().countdown, "0:05");

        ctrl.advance(5_000);
        assert_eq!(overlay(ctrl.session()), None);
        assert_eq!(cell_face(grid.cell(3).unwrap()), CellFace::Locked);
    }

    #[test]
    fn unlocked_cell_shows_its_image() {
        let mut grid = Grid::new(10);
        let image = Thumbnail::from_store("data:x");
        grid.apply(1, image.clone()).unwrap();

        assert_eq!(cell_face(grid.cell(1).unwrap()), CellFace::Unlocked(&image));
        assert_eq!(cell_face(grid.cell(2).unwrap()), CellFace::Locked);
    }
}
