use crate::matrix::{Animation, DARK, Frame, GREEN, MAX_STEPS, RED, Step, glyphs};

use super::Outcome;

fn sequence(steps: impl IntoIterator<Item = Step>) -> Animation {
    steps.into_iter().take(MAX_STEPS).collect()
}

/// Swinging line shown at power up
pub fn startup() -> Animation {
    let swing = [&glyphs::LINE, &glyphs::LEFT, &glyphs::LINE, &glyphs::RIGHT];
    sequence(
        swing
            .into_iter()
            .cycle()
            .take(2 * swing.len() + 1)
            .map(|frame| Step::new(frame, 500)),
    )
}

/// "L", the level number, a pause and a three dot count down
pub fn intro(level: u8) -> Animation {
    let header = [
        Step::new(&glyphs::LETTER_L, 1000),
        Step::new(glyphs::number(level as usize), 1000),
        Step::new(&DARK, 1000),
    ];
    let countdown = [Step::new(&glyphs::DOT, 500), Step::new(&DARK, 500)];
    sequence(header.into_iter().chain(countdown.into_iter().cycle().take(6)))
}

/// Reaction time ran out
pub fn timeout() -> Animation {
    sequence([Step::new(&glyphs::RING, 500), Step::new(&DARK, 0)])
}

pub fn level_passed() -> Animation {
    sequence(
        glyphs::STAR
            .iter()
            .cycle()
            .take(2 * glyphs::STAR.len())
            .map(|frame| Step::new(frame, 100)),
    )
}

pub fn level_failed() -> Animation {
    let blink = [Step::new(&glyphs::SAD, 500), Step::new(&DARK, 500)];
    sequence(blink.into_iter().cycle().take(8))
}

/// Shown in a loop once every level is done
pub fn game_finished() -> Animation {
    sequence([Step::new(&glyphs::CORRECT, 1000), Step::new(&DARK, 1000)])
}

/// One pixel per turn, green for a correct answer and red otherwise
pub fn results(outcomes: &[Outcome]) -> Frame {
    let mut frame = DARK;
    for (pixel, outcome) in frame.iter_mut().zip(outcomes) {
        *pixel = match outcome {
            Outcome::Correct => GREEN,
            Outcome::Wrong | Outcome::Missed => RED,
        };
    }
    frame
}
