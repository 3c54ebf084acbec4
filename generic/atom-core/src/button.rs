use embassy_time::{Duration, Instant};

pub const DEBOUNCE: Duration = Duration::from_millis(10);

/// Debounced press detection for a polled button.
/// The raw level has to be stable for [`DEBOUNCE`] before a change is accepted.
#[derive(Debug, Clone, Copy)]
pub struct Button {
    stable: bool,
    raw: bool,
    changed_at: Instant,
}

impl Button {
    pub const fn new() -> Self {
        Self {
            stable: false,
            raw: false,
            changed_at: Instant::from_ticks(0),
        }
    }

    /// Feed the current level (`true` = pressed). Returns true exactly once per press.
    pub fn update(&mut self, pressed: bool, now: Instant) -> bool {
        if pressed != self.raw {
            self.raw = pressed;
            self.changed_at = now;
            return false;
        }
        if pressed != self.stable && now.saturating_duration_since(self.changed_at) >= DEBOUNCE {
            self.stable = pressed;
            return pressed;
        }
        false
    }

    pub fn is_pressed(&self) -> bool {
        self.stable
    }
}

impl Default for Button {
    fn default() -> Self {
        Self::new()
    }
}
