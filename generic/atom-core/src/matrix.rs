pub mod glyphs;

use embassy_time::{Duration, Instant, Timer};
use heapless::Vec;
use smart_leds::{RGB8, SmartLedsWrite, brightness, gamma};

pub const WIDTH: usize = 5;
pub const PIXELS: usize = WIDTH * WIDTH;

/// The LEDs sit right behind a thin acrylic cover. Anything above this makes them
/// uncomfortably bright and hot.
pub const MAX_BRIGHTNESS: u8 = 20;

pub type Frame = [RGB8; PIXELS];

pub const BLACK: RGB8 = RGB8 { r: 0, g: 0, b: 0 };
pub const RED: RGB8 = RGB8 { r: 0xF0, g: 0, b: 0 };
pub const GREEN: RGB8 = RGB8 { r: 0, g: 0xF0, b: 0 };
pub const BLUE: RGB8 = RGB8 { r: 0, g: 0, b: 0xF0 };
pub const WHITE: RGB8 = RGB8 {
    r: 0x70,
    g: 0x70,
    b: 0x70,
};
pub const CYAN: RGB8 = RGB8 {
    r: 0,
    g: 0x70,
    b: 0x70,
};
pub const YELLOW: RGB8 = RGB8 {
    r: 0x70,
    g: 0x70,
    b: 0,
};
pub const MAGENTA: RGB8 = RGB8 {
    r: 0x70,
    g: 0,
    b: 0x70,
};

pub const DARK: Frame = [BLACK; PIXELS];

pub const fn fill(color: RGB8) -> Frame {
    [color; PIXELS]
}

/// Render five row bitmasks into a frame. Bit 4 of each row is the leftmost pixel.
pub const fn render(rows: [u8; WIDTH], color: RGB8) -> Frame {
    let mut frame = DARK;
    let mut row = 0;
    while row < WIDTH {
        let mut col = 0;
        while col < WIDTH {
            if rows[row] & (0b10000 >> col) != 0 {
                frame[row * WIDTH + col] = color;
            }
            col += 1;
        }
        row += 1;
    }
    frame
}

/// Write a frame with gamma correction and the global brightness cap applied
pub fn show<LED>(leds: &mut LED, frame: &Frame) -> Result<(), LED::Error>
where
    LED: SmartLedsWrite,
    <LED as SmartLedsWrite>::Color: From<RGB8>,
{
    leds.write(brightness(gamma(frame.iter().cloned()), MAX_BRIGHTNESS))
}

/// Same brightness cap as [`show`] but without gamma correction, which would turn the
/// dim status colors off completely.
pub fn show_linear<LED>(leds: &mut LED, frame: &Frame) -> Result<(), LED::Error>
where
    LED: SmartLedsWrite,
    <LED as SmartLedsWrite>::Color: From<RGB8>,
{
    leds.write(brightness(frame.iter().cloned(), MAX_BRIGHTNESS))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub frame: &'static Frame,
    pub hold: Duration,
}

impl Step {
    pub const fn new(frame: &'static Frame, hold_ms: u64) -> Self {
        Self {
            frame,
            hold: Duration::from_millis(hold_ms),
        }
    }
}

pub const MAX_STEPS: usize = 24;

/// A sequence of frames, each held for a fixed time
pub type Animation = Vec<Step, MAX_STEPS>;

/// Show every step of an animation, blocking the caller for the total duration
pub async fn play<LED>(leds: &mut LED, steps: &[Step])
where
    LED: SmartLedsWrite,
    <LED as SmartLedsWrite>::Color: From<RGB8>,
{
    for step in steps {
        let _ = show(leds, step.frame);
        Timer::after(step.hold).await;
    }
}

/// Deadline after which the matrix is switched off.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlankTimer {
    deadline: Option<Instant>,
}

impl BlankTimer {
    pub fn arm(&mut self, now: Instant, after: Duration) {
        self.deadline = Some(now + after);
    }

    /// Returns true exactly once when the deadline has passed
    pub fn expired(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now > deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
