use std::rc::Rc;

use crate::board::BoardView;
use crate::store::{WallStore, WallSubscription};
use crate::timers::BrowserTimers;
use crate::upload::{read_file, take_file};
use crate::utils::*;
use clap::Args;
use gloo::file::File;
use gloo::timers::callback::Timeout;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use unlockwall_core::view::{self, CellFace};
use unlockwall_core::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;

/// Lets the overlay close before the upload prompt shows up.
const WIN_PROMPT_DELAY_MS: u32 = 100;

#[derive(Args, Properties, Debug, Clone, PartialEq)]
pub(crate) struct WallProps {
    /// Realtime database shared by every viewer, e.g. https://my-wall.firebaseio.com
    #[arg(long)]
    pub database_url: Option<String>,

    /// Force a seed instead of random
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Allow replaying unlocked cells, a win replaces their image
    #[arg(long)]
    pub allow_overwrite: bool,
}

impl WallProps {
    fn config(&self) -> WallConfig {
        let policy = if self.allow_overwrite {
            UnlockPolicy::AllowOverwrite
        } else {
            UnlockPolicy::LockedOnly
        };
        WallConfig::default().with_policy(policy)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Notice {
    Lost(CellIndex),
    Unlocked(CellIndex),
    Failed(String),
}

impl Notice {
    fn text(&self) -> String {
        match self {
            Self::Lost(cell) => format!("Time's up! Cell #{} stays locked.", cell),
            Self::Unlocked(cell) => format!("Cell #{} unlocked.", cell),
            Self::Failed(reason) => reason.clone(),
        }
    }
}

fn failure_notice(err: &UnlockError) -> Notice {
    Notice::Failed(match err {
        UnlockError::NoFileSelected => "No file selected.".to_string(),
        UnlockError::Decode(_) => format!("That file could not be used as an image: {}", err),
        UnlockError::Persist(_) => format!("Saving failed, try again: {}", err),
        _ => err.to_string(),
    })
}

pub(crate) enum Msg {
    CellClicked(CellIndex),
    CardClicked(CardId),
    Timer(TimerEvent),
    Store(StoreEvent),
    PromptUpload(UploadTicket),
    FileChosen(UploadTicket, Option<File>),
    FileRead(UploadTicket, std::result::Result<Vec<u8>, UnlockError>),
    Persisted(UploadTicket, std::result::Result<(), StoreError>),
    ClosePrompt,
    DismissNotice,
}

pub(crate) struct WallView {
    grid: Grid,
    sync: GridSync,
    controller: SessionController<BrowserTimers>,
    store: Rc<WallStore>,
    rng: SmallRng,
    prompt: Option<UploadTicket>,
    uploading: bool,
    notice: Option<Notice>,
    file_input: NodeRef,
    _prompt_timeout: Option<Timeout>,
    _subscription: Option<WallSubscription>,
}

impl WallView {
    fn begin(&mut self, cell: CellIndex) -> bool {
        match self.controller.begin(&self.grid, cell, &mut self.rng) {
            Ok(session) => {
                log::debug!("session {} for cell {}", session, cell);
                self.notice = None;
                true
            }
            Err(SessionError::CellUnlocked(cell)) => {
                log::debug!("cell {} is already unlocked", cell);
                false
            }
            Err(SessionError::AlreadyActive(active)) => {
                log::debug!("ignoring cell {}, still playing for cell {}", cell, active);
                false
            }
            Err(err) => {
                log::warn!("could not start a game for cell {}: {}", cell, err);
                false
            }
        }
    }

    fn on_transition(&mut self, ctx: &Context<Self>, transition: Transition) -> bool {
        match transition {
            Transition::Won(ticket) => {
                let link = ctx.link().clone();
                self._prompt_timeout = Some(Timeout::new(WIN_PROMPT_DELAY_MS, move || {
                    link.send_message(Msg::PromptUpload(ticket))
                }));
            }
            Transition::Lost { cell, .. } => self.notice = Some(Notice::Lost(cell)),
            Transition::Updated | Transition::NoChange => {}
        }
        transition.has_update()
    }

    fn on_upload_error(&mut self, err: UnlockError) -> bool {
        self.uploading = false;
        if err == UnlockError::Stale {
            return true;
        }
        log::error!("upload failed: {}", err);
        self.notice = Some(failure_notice(&err));
        true
    }

    fn status_class(&self) -> &'static str {
        match self.sync.status() {
            _ if !self.store.is_shared() => "local",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
        }
    }

    fn view_cell(&self, ctx: &Context<Self>, cell: &Cell) -> Html {
        let index = cell.index();
        let playable = self.controller.can_begin(&self.grid, index);
        let onclick = ctx.link().callback(move |_: MouseEvent| Msg::CellClicked(index));
        let class = classes!("cell", playable.then_some("playable"));

        match view::cell_face(cell) {
            CellFace::Locked => html! {
                <button {class} {onclick} title={format!("#{}", index)}/>
            },
            CellFace::Unlocked(image) => html! {
                <img {class} {onclick} src={image.shared()} alt={format!("#{}", index)}/>
            },
        }
    }

    fn view_prompt(&self, ctx: &Context<Self>, ticket: UploadTicket) -> Html {
        let input = self.file_input.clone();
        let onchange = ctx.link().callback(move |_: Event| {
            let file = input.cast::<HtmlInputElement>().and_then(|input| take_file(&input));
            Msg::FileChosen(ticket, file)
        });
        let onclose = ctx.link().callback(|_: MouseEvent| Msg::ClosePrompt);

        html! {
            <Modal>
                <div class="overlay">
                    <div class="prompt">
                        <p>{format!("You won! Choose an image for cell #{}.", ticket.cell())}</p>
                        <label class={classes!("chooser", self.uploading.then_some("busy"))}>
                            {if self.uploading { "Uploading…" } else { "Choose image" }}
                            <input
                                ref={self.file_input.clone()}
                                type="file"
                                accept="image/*"
                                disabled={self.uploading}
                                {onchange}
                            />
                        </label>
                        <button onclick={onclose}>{"Later"}</button>
                    </div>
                </div>
            </Modal>
        }
    }
}

impl Component for WallView {
    type Message = Msg;
    type Properties = WallProps;

    fn create(ctx: &Context<Self>) -> Self {
        let props = ctx.props();
        let config = props.config();
        let seed = props.seed.unwrap_or_else(js_random_seed);
        log::debug!("seed: {}", seed);

        let store = Rc::new(WallStore::from_url(props.database_url.as_deref()));
        let subscription = {
            let link = ctx.link().clone();
            GridSync::subscribe(&*store, move |event| link.send_message(Msg::Store(event)))
        };
        let mut sync = GridSync::new();
        let mut grid = Grid::new(config.cell_count);
        let subscription = match subscription {
            Ok(subscription) => Some(subscription),
            Err(err) => {
                log::error!("could not subscribe, the wall stays locked: {}", err);
                sync.on_event(&mut grid, StoreEvent::Error(err));
                None
            }
        };

        let timers = BrowserTimers::new(ctx.link().callback(Msg::Timer));

        Self {
            grid,
            sync,
            controller: SessionController::new(config, timers),
            store,
            rng: SmallRng::seed_from_u64(seed),
            prompt: None,
            uploading: false,
            notice: None,
            file_input: NodeRef::default(),
            _prompt_timeout: None,
            _subscription: subscription,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        use Msg::*;

        match msg {
            CellClicked(cell) => self.begin(cell),
            CardClicked(card) => match self.controller.select(card) {
                Ok(transition) => self.on_transition(ctx, transition),
                Err(err) => {
                    log::warn!("select {}: {}", card, err);
                    false
                }
            },
            Timer(event) => {
                let transition = self.controller.on_timer(event);
                self.on_transition(ctx, transition)
            }
            Store(event) => {
                let changed = self.sync.on_event(&mut self.grid, event);
                log::trace!("{} cells changed", changed.len());
                true
            }
            PromptUpload(ticket) => {
                if self.controller.pending_upload() != Some(ticket) {
                    return false;
                }
                self.prompt = Some(ticket);
                true
            }
            FileChosen(ticket, None) => {
                let err = self.controller.accept_image(ticket, None).err();
                err.is_some_and(|err| self.on_upload_error(err))
            }
            FileChosen(ticket, Some(file)) => {
                self.uploading = true;
                let link = ctx.link().clone();
                spawn_local(async move {
                    let bytes = read_file(file).await;
                    link.send_message(FileRead(ticket, bytes));
                });
                true
            }
            FileRead(ticket, bytes) => {
                let image = bytes.and_then(|bytes| self.controller.accept_image(ticket, Some(&bytes)));
                match image {
                    Ok(image) => {
                        if let Err(err) = self.grid.apply(ticket.cell(), image.clone()) {
                            log::warn!("could not show cell {}: {}", ticket.cell(), err);
                        }
                        let store = self.store.clone();
                        let link = ctx.link().clone();
                        spawn_local(async move {
                            let written = GridSync::persist(&*store, ticket.cell(), &image).await;
                            link.send_message(Persisted(ticket, written));
                        });
                        true
                    }
                    Err(err) => self.on_upload_error(err),
                }
            }
            Persisted(ticket, written) => match self.controller.finish_upload(ticket, written) {
                Ok(cell) => {
                    self.uploading = false;
                    self.prompt = None;
                    self.notice = Some(Notice::Unlocked(cell));
                    true
                }
                Err(err) => self.on_upload_error(err),
            },
            ClosePrompt => self.prompt.take().is_some(),
            DismissNotice => self.notice.take().is_some(),
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let columns = self.controller.config().columns;
        let style = format!("grid-template-columns: repeat({}, 1fr)", columns);
        let overlay = view::overlay(self.controller.session());
        let on_card = ctx.link().callback(Msg::CardClicked);
        let on_dismiss = ctx.link().callback(|_: MouseEvent| Msg::DismissNotice);
        let reopen = self
            .controller
            .pending_upload()
            .filter(|_| self.prompt.is_none());

        html! {
            <div class="unlockwall">
                <nav>
                    <span>{format!("{}/{} unlocked", self.grid.unlocked_count(), self.grid.len())}</span>
                    if let Some(ticket) = reopen {
                        <button onclick={ctx.link().callback(move |_: MouseEvent| Msg::PromptUpload(ticket))}>
                            {format!("Choose image for #{}", ticket.cell())}
                        </button>
                    }
                    <small class={classes!("status", self.status_class())} title={self.status_class()}/>
                </nav>
                <div class="wall" {style}>
                    { for self.grid.iter().map(|cell| self.view_cell(ctx, cell)) }
                </div>
                if let Some(view) = overlay {
                    <BoardView {view} {on_card}/>
                }
                if let Some(ticket) = self.prompt {
                    { self.view_prompt(ctx, ticket) }
                }
                if let Some(notice) = &self.notice {
                    <Modal>
                        <div class="notice" onclick={on_dismiss}>{notice.text()}</div>
                    </Modal>
                }
            </div>
        }
    }
}
