use serde::{Deserialize, Serialize};

use crate::{CellIndex, Millis, Seconds};

/// Timing and output parameters of one play-through.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub countdown_secs: Seconds,
    pub tick_ms: Millis,
    pub mismatch_delay_ms: Millis,
    pub thumbnail_size: u32,
}

impl GameConfig {
    pub const fn standard() -> Self {
        Self {
            countdown_secs: 10,
            tick_ms: 1000,
            mismatch_delay_ms: 500,
            thumbnail_size: 60,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// What clicking an already unlocked cell does.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnlockPolicy {
    /// Only locked cells start a game.
    LockedOnly,
    /// Any cell starts a game and a win replaces its image.
    AllowOverwrite,
}

impl Default for UnlockPolicy {
    fn default() -> Self {
        Self::LockedOnly
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallConfig {
    pub cell_count: CellIndex,
    pub columns: u16,
    pub unlock_policy: UnlockPolicy,
    pub game: GameConfig,
}

impl WallConfig {
    pub fn new(cell_count: CellIndex, columns: u16) -> Self {
        Self {
            cell_count: cell_count.max(1),
            columns: columns.clamp(1, cell_count.max(1)),
            ..Self::default()
        }
    }

    pub const fn with_policy(mut self, unlock_policy: UnlockPolicy) -> Self {
        self.unlock_policy = unlock_policy;
        self
    }
}

impl Default for WallConfig {
    fn default() -> Self {
        Self {
            cell_count: 1000,
            columns: 40,
            unlock_policy: UnlockPolicy::default(),
            game: GameConfig::standard(),
        }
    }
}
