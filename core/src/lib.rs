//! Game and synchronization core of the unlock wall.
//!
//! Everything here is free of browser APIs: timers, the backing store and the file picker are reached through the
//! [`Timers`] and [`CellStore`] seams so the state machines can be driven by a simulated clock in tests.

pub use clock::*;
pub use codec::*;
pub use config::*;
pub use deck::*;
pub use engine::*;
pub use error::*;
pub use grid::*;
pub use session::*;
pub use store::*;
pub use sync::*;
pub use types::*;

mod clock;
mod codec;
mod config;
mod deck;
mod engine;
mod error;
mod grid;
mod session;
mod store;
mod sync;
mod types;
pub mod view;
