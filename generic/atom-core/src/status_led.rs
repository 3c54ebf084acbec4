use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use smart_leds::{RGB8, SmartLedsWrite};

use crate::matrix::{Frame, fill, show_linear};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedStatus {
    /// Not connected or something failed
    Error,
    Ok,
    /// Serving an HTTP client
    Network,
    Measure,
}

impl LedStatus {
    pub const fn color(self) -> RGB8 {
        match self {
            LedStatus::Error => RGB8 { r: 0x11, g: 0, b: 0 },
            LedStatus::Ok => RGB8 { r: 0, g: 0x11, b: 0 },
            LedStatus::Network => RGB8 { r: 0, g: 0, b: 0x11 },
            LedStatus::Measure => RGB8 {
                r: 0x11,
                g: 0x11,
                b: 0x11,
            },
        }
    }

    pub const fn frame(self) -> Frame {
        fill(self.color())
    }
}

pub struct StatusBoard {
    link_up: AtomicBool,
    serving: AtomicBool,
    measuring: AtomicBool,
    changed: Signal<CriticalSectionRawMutex, ()>,
}

impl StatusBoard {
    /// Starts out as [`LedStatus::Error`] since there is no link yet
    pub const fn new() -> Self {
        Self {
            link_up: AtomicBool::new(false),
            serving: AtomicBool::new(false),
            measuring: AtomicBool::new(false),
            changed: Signal::new(),
        }
    }

    fn update(&self, flag: &AtomicBool, value: bool) {
        if flag.swap(value, Ordering::Relaxed) != value {
            self.changed.signal(());
        }
    }

    pub fn set_link_up(&self, up: bool) {
        self.update(&self.link_up, up);
    }

    pub fn set_serving(&self, serving: bool) {
        self.update(&self.serving, serving);
    }

    pub fn set_measuring(&self, measuring: bool) {
        self.update(&self.measuring, measuring);
    }

    pub fn link_up(&self) -> bool {
        self.link_up.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> LedStatus {
        if self.serving.load(Ordering::Relaxed) {
            LedStatus::Network
        } else if self.measuring.load(Ordering::Relaxed) {
            LedStatus::Measure
        } else if !self.link_up() {
            LedStatus::Error
        } else {
            LedStatus::Ok
        }
    }

    pub async fn wait_changed(&self) {
        self.changed.wait().await
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep the matrix in sync with the board
pub async fn status_led<LED>(board: &StatusBoard, mut leds: LED) -> !
where
    LED: SmartLedsWrite,
    <LED as SmartLedsWrite>::Color: From<RGB8>,
{
    loop {
        let _ = show_linear(&mut leds, &board.status().frame());
        board.wait_changed().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boots_in_error_state() {
        assert_eq!(StatusBoard::new().status(), LedStatus::Error);
    }

    #[test]
    fn test_priorities() {
        let board = StatusBoard::new();
        board.set_link_up(true);
        assert_eq!(board.status(), LedStatus::Ok);
        board.set_measuring(true);
        assert_eq!(board.status(), LedStatus::Measure);
        board.set_serving(true);
        assert_eq!(board.status(), LedStatus::Network);
        board.set_link_up(false);
        assert_eq!(board.status(), LedStatus::Network);
        board.set_serving(false);
        board.set_measuring(false);
        assert_eq!(board.status(), LedStatus::Error);
    }

    #[test]
    fn test_only_changes_wake_the_led_task() {
        let board = StatusBoard::new();
        board.set_link_up(false);
        assert!(!board.changed.signaled());
        board.set_link_up(true);
        assert!(board.changed.signaled());
    }

    #[test]
    fn test_status_colors() {
        assert_eq!(LedStatus::Error.color(), RGB8::new(0x11, 0, 0));
        assert_eq!(LedStatus::Measure.frame()[24], RGB8::new(0x11, 0x11, 0x11));
    }
}
