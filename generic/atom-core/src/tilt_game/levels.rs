use embassy_time::Duration;

use crate::matrix::PIXELS;

pub const LEVEL_COUNT: u8 = 12;
pub const TURNS_PER_LEVEL: usize = 25;
/// A level is passed with more than 75% correct answers
pub const PASS_SCORE: u8 = 19;
/// In the warm-up level the first turns show the goal color on every pixel
pub const WARMUP_SOLID_TURNS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Goal,
    Decoy,
    Dark,
    Glare,
}

pub type Board = [Cell; PIXELS];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Solid color first, then the goal color on the top or bottom three rows
    Warmup,
    /// The cells of the board are shuffled for every turn
    Scattered(Board),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level {
    pub display_time: Duration,
    pub reaction_time: Duration,
    pub layout: Layout,
}

/// 1 goal, 2 decoy, 3 dark, 4 glare
const fn board(codes: [u8; PIXELS]) -> Board {
    let mut cells = [Cell::Goal; PIXELS];
    let mut i = 0;
    while i < PIXELS {
        cells[i] = match codes[i] {
            1 => Cell::Goal,
            2 => Cell::Decoy,
            3 => Cell::Dark,
            _ => Cell::Glare,
        };
        i += 1;
    }
    cells
}

const fn level(display_ms: u64, reaction_ms: u64, layout: Layout) -> Level {
    Level {
        display_time: Duration::from_millis(display_ms),
        reaction_time: Duration::from_millis(reaction_ms),
        layout,
    }
}

const fn scattered(display_ms: u64, reaction_ms: u64, codes: [u8; PIXELS]) -> Level {
    level(display_ms, reaction_ms, Layout::Scattered(board(codes)))
}

#[rustfmt::skip]
pub static WARMUP_TOP: Board = board([
    1,1,1,1,1, 1,1,1,1,1, 1,1,1,1,1, 2,2,2,2,2, 2,2,2,2,2,
]);

#[rustfmt::skip]
pub static WARMUP_BOTTOM: Board = board([
    2,2,2,2,2, 2,2,2,2,2, 1,1,1,1,1, 1,1,1,1,1, 1,1,1,1,1,
]);

#[rustfmt::skip]
pub static LEVELS: [Level; LEVEL_COUNT as usize] = [
    level(350, 1500, Layout::Warmup),
    scattered(300, 1250, [1,1,1,1,1, 1,1,1,1,1, 1,1,1,1,1, 1,1,2,2,2, 2,2,2,2,2]),
    scattered(250, 1000, [1,1,1,1,1, 1,1,1,1,1, 1,1,1,1,1, 2,2,2,2,2, 2,2,2,2,2]),
    scattered(200, 900,  [1,1,1,1,1, 1,1,1,1,1, 1,1,1,1,2, 2,2,2,2,2, 2,2,2,2,2]),
    scattered(200, 800,  [1,1,1,1,1, 1,1,1,1,1, 1,1,1,2,2, 2,2,2,2,2, 2,2,2,2,2]),
    scattered(150, 700,  [3,3,3,3,3, 1,1,1,1,1, 1,1,1,1,1, 2,2,2,2,2, 3,3,3,3,3]),
    scattered(100, 600,  [3,3,3,3,3, 3,1,1,1,1, 1,1,1,2,2, 2,2,2,2,3, 3,3,3,3,3]),
    scattered(50,  500,  [3,3,3,3,3, 3,3,3,1,1, 1,1,1,2,2, 2,2,3,3,3, 3,3,3,3,3]),
    scattered(40,  400,  [3,3,3,3,3, 4,4,4,1,1, 1,1,1,2,2, 2,2,4,4,4, 3,3,3,3,3]),
    scattered(30,  350,  [3,3,3,3,3, 4,4,4,4,1, 1,1,1,2,2, 2,4,4,4,4, 3,3,3,3,3]),
    scattered(20,  350,  [4,4,4,4,4, 3,3,3,1,1, 1,1,1,2,2, 2,2,3,3,3, 4,4,4,4,4]),
    scattered(10,  350,  [4,4,4,4,4, 4,4,4,4,1, 1,1,1,2,2, 2,4,4,4,4, 4,4,4,4,4]),
];

/// Level settings by their 1 based number. Out of range numbers are clamped.
pub fn settings(level: u8) -> &'static Level {
    let index = level.clamp(1, LEVEL_COUNT) as usize - 1;
    &LEVELS[index]
}
