use thiserror::Error;

use crate::CellIndex;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Invalid card")]
    InvalidCard,
    #[error("Deck must hold every symbol exactly twice")]
    InvalidDeck,
    #[error("Cards were already dealt")]
    AlreadyDealt,
}

pub type Result<T> = core::result::Result<T, GameError>;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("A game for cell {0} is still running")]
    AlreadyActive(CellIndex),
    #[error("Cell {0} is not on the wall")]
    InvalidCell(CellIndex),
    #[error("Cell {0} is already unlocked")]
    CellUnlocked(CellIndex),
    #[error("No game is running")]
    NoSession,
    #[error(transparent)]
    Game(#[from] GameError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("image decode failed: {0}")]
    Decode(String),
    #[error("image encode failed: {0}")]
    Encode(String),
    #[error("invalid image dimensions")]
    Dimensions,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store write failed: {0}")]
    Persist(String),
    #[error("store subscription failed: {0}")]
    Subscription(String),
    #[error("malformed store event: {0}")]
    Parse(String),
}

/// Failures of the post-win upload chain, reported to the player and never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnlockError {
    #[error("No file selected")]
    NoFileSelected,
    #[error("Failed to read file: {0}")]
    Read(String),
    #[error("Failed to load image: {0}")]
    Decode(#[from] CodecError),
    #[error("Failed to save image: {0}")]
    Persist(#[from] StoreError),
    #[error("Upload no longer belongs to a won game")]
    Stale,
}
