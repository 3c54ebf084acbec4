use super::{BLUE, CYAN, Frame, GREEN, MAGENTA, RED, WHITE, WIDTH, YELLOW, render};

/// 3x5 font for the digits, bit 2 is the leftmost column
const FONT: [[u8; WIDTH]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b010, 0b010, 0b010],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

/// Numbers 0-9 are centered. 10-19 use a bar in the first column as the tens digit and
/// squeeze the unit digit into the three rightmost columns.
const fn number_frame(n: usize) -> Frame {
    let digit = FONT[n % 10];
    let mut rows = [0u8; WIDTH];
    let mut row = 0;
    while row < WIDTH {
        rows[row] = if n < 10 {
            digit[row] << 1
        } else {
            0b10000 | digit[row]
        };
        row += 1;
    }
    render(rows, BLUE)
}

const fn number_frames() -> [Frame; 20] {
    let mut frames = [super::DARK; 20];
    let mut n = 0;
    while n < 20 {
        frames[n] = number_frame(n);
        n += 1;
    }
    frames
}

pub static NUMBERS: [Frame; 20] = number_frames();

pub static LETTER_L: Frame = render([0b01000, 0b01000, 0b01000, 0b01000, 0b01110], BLUE);
pub static DOT: Frame = render([0, 0, 0b00100, 0, 0], WHITE);
pub static LINE: Frame = render([0, 0, 0b11111, 0, 0], CYAN);
pub static LEFT: Frame = render([0, 0b00011, 0b00100, 0b11000, 0], CYAN);
pub static RIGHT: Frame = render([0, 0b11000, 0b00100, 0b00011, 0], CYAN);
pub static CORRECT: Frame = render([0, 0b00001, 0b00010, 0b10100, 0b01000], GREEN);
pub static WRONG: Frame = render([0b10001, 0b01010, 0b00100, 0b01010, 0b10001], RED);
pub static RING: Frame = render([0b01110, 0b10001, 0b10001, 0b10001, 0b01110], YELLOW);
pub static SAD: Frame = render([0b01010, 0b01010, 0, 0b01110, 0b10001], MAGENTA);

pub static STAR: [Frame; 10] = [
    render([0, 0, 0b00100, 0, 0], YELLOW),
    render([0, 0b00100, 0b01110, 0b00100, 0], YELLOW),
    render([0b00100, 0b00100, 0b11111, 0b00100, 0b00100], YELLOW),
    render([0b10101, 0b01110, 0b11111, 0b01110, 0b10101], YELLOW),
    render([0b10001, 0b01010, 0b00100, 0b01010, 0b10001], YELLOW),
    render([0b00100, 0b01010, 0b10001, 0b01010, 0b00100], YELLOW),
    render([0b10101, 0, 0b10001, 0, 0b10101], YELLOW),
    render([0b10001, 0, 0, 0, 0b10001], YELLOW),
    render([0, 0b01010, 0, 0b01010, 0], YELLOW),
    super::DARK,
];

/// Frame for a number. Everything above 19 can not be shown and falls back to a dot.
pub fn number(n: usize) -> &'static Frame {
    NUMBERS.get(n).unwrap_or(&DOT)
}
