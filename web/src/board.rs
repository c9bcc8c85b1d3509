use crate::utils::Modal;
use unlockwall_core::view::{CardFace, CardView, OverlayView};
use unlockwall_core::{CardId, PAIR_COUNT};
use yew::prelude::*;

#[derive(Properties, Clone, PartialEq)]
struct CardProps {
    card: CardView,
    callback: Callback<CardId>,
}

#[function_component(CardButton)]
fn card_component(props: &CardProps) -> Html {
    let CardProps { card, callback } = props.clone();

    let class = classes!(
        "card",
        match card.face {
            CardFace::Down => classes!("down"),
            CardFace::Up(_) => classes!("up"),
            CardFace::Matched(_) => classes!("up", "matched"),
        }
    );
    let label = card
        .face
        .symbol()
        .map(|symbol| symbol.to_string())
        .unwrap_or_default();
    let onclick = Callback::from(move |_: MouseEvent| {
        log::trace!("card {} clicked", card.id);
        callback.emit(card.id)
    });

    html! {
        <button {class} {onclick} disabled={!card.selectable}>{label}</button>
    }
}

#[derive(Properties, Clone, PartialEq)]
pub(crate) struct BoardProps {
    pub view: OverlayView,
    pub on_card: Callback<CardId>,
}

/// Game overlay shown over the wall while a session is being played.
#[function_component(BoardView)]
pub(crate) fn board_component(props: &BoardProps) -> Html {
    let BoardProps { view, on_card } = props;

    html! {
        <Modal>
            <div class="overlay">
                <div class={classes!("board", (!view.interactive).then_some("resolving"))}>
                    <header>
                        <span class="target">{format!("#{}", view.target)}</span>
                        <span class="pairs">{format!("{}/{}", view.matched_pairs, PAIR_COUNT)}</span>
                        <span class="countdown">{&view.countdown}</span>
                    </header>
                    <div class="cards">
                        {
                            for view.cards.iter().map(|card| html! {
                                <CardButton key={card.id} card={*card} callback={on_card.clone()}/>
                            })
                        }
                    </div>
                </div>
            </div>
        </Modal>
    }
}
