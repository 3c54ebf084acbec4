pub mod log_toggles;
use embassy_sync::{blocking_mutex::raw::RawMutex, signal::Signal};
use postcard::experimental::max_size::MaxSize;
use serde::{Deserialize, Serialize};

use crate::system_settings::log_toggles::LogChannelToggles;

/// Highest level of the tilt game which has been unlocked so far
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, MaxSize)]
pub struct GameProgress {
    pub level: u8,
}

pub type LogTogglesStoreSignal<M> = Signal<M, LogChannelToggles>;
pub type GameProgressStoreSignal<M> = Signal<M, GameProgress>;
pub type FormatSignal<M> = Signal<M, ()>;

/// Requests to the flash task. Whoever changes a persisted setting signals the new value
/// here instead of touching the flash directly.
pub struct StoreSignals<M: RawMutex + 'static> {
    pub log_toggles: LogTogglesStoreSignal<M>,
    pub game_progress: GameProgressStoreSignal<M>,
    pub format: FormatSignal<M>,
}

impl<M: RawMutex> StoreSignals<M> {
    pub const fn new() -> Self {
        Self {
            log_toggles: Signal::new(),
            game_progress: Signal::new(),
            format: Signal::new(),
        }
    }
}

impl<M: RawMutex> Default for StoreSignals<M> {
    fn default() -> Self {
        Self::new()
    }
}
