use clap::Parser;
use wasm_bindgen::prelude::*;

mod board;
mod store;
mod timers;
mod upload;
mod utils;
mod wall;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// What log level to use
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity,

    #[command(flatten)]
    wall: wall::WallProps,
}

impl Args {
    /// Arguments come from the location hash, e.g. `#-vv&--database-url=https://...&--allow-overwrite`.
    fn from_hash(location_hash: &str) -> Result<Self, clap::Error> {
        Self::try_parse_from(location_hash.split(['#', '&']))
    }
}

#[wasm_bindgen(start)]
pub fn run_app() {
    use gloo::utils::{document, window};

    #[cfg(feature = "console_error_panic_hook")]
    {
        console_error_panic_hook::set_once();
    }

    let location_hash = window()
        .location()
        .hash()
        .unwrap_or_else(|_| "".to_string());

    let args = Args::from_hash(&location_hash).expect("Could not parse args");
    if let Some(log_level) = args.verbose.log_level() {
        console_log::init_with_level(log_level).expect("Error initializing logger");
    }
    log::debug!("args: {:?}", args);

    let root = document()
        .get_element_by_id("wall")
        .expect("Could not find id=\"wall\" element");

    log::debug!("App started");
    yew::Renderer::<wall::WallView>::with_root_and_props(root, args.wall).render();
}
