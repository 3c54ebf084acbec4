//! Tilt reaction game: red means tilt right, green means tilt left.

pub mod accel;
pub mod animations;
pub mod levels;
pub mod runner;

use embassy_time::{Duration, Instant};
use heapless::Vec;
use log::info;
use rand::{Rng, seq::SliceRandom};
use smart_leds::RGB8;

use crate::matrix::{Animation, BLACK, Frame, GREEN, PIXELS, RED, WHITE, fill, glyphs};
use accel::{Acceleration, Tilt, TiltFilter};
use levels::{
    Cell, LEVEL_COUNT, Layout, PASS_SCORE, TURNS_PER_LEVEL, WARMUP_BOTTOM, WARMUP_SOLID_TURNS,
    WARMUP_TOP,
};

/// Pause between holding the device flat and showing the board
pub const FLAT_WAIT: Duration = Duration::from_secs(1);
/// How long the check mark or cross stays visible
pub const RESULT_DISPLAY: Duration = Duration::from_millis(500);
/// Pause after the last turn of a level before the summary
pub const LEVEL_DONE_PAUSE: Duration = Duration::from_secs(1);
pub const SUMMARY_DISPLAY: Duration = Duration::from_millis(2500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Goal {
    /// Tilt right
    Red,
    /// Tilt left
    Green,
}

impl Goal {
    pub fn color(self) -> RGB8 {
        match self {
            Goal::Red => RED,
            Goal::Green => GREEN,
        }
    }

    pub fn decoy(self) -> RGB8 {
        match self {
            Goal::Red => GREEN,
            Goal::Green => RED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    /// Tilted to the wrong side
    Wrong,
    /// No tilt within the reaction time
    Missed,
}

impl Outcome {
    /// Red means right, green means left
    pub fn judge(goal: Goal, tilt: Tilt) -> Self {
        match (goal, tilt) {
            (Goal::Red, Tilt::Right) | (Goal::Green, Tilt::Left) => Outcome::Correct,
            (_, Tilt::Center) => Outcome::Missed,
            _ => Outcome::Wrong,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    /// Waiting for a button press to start the current level
    Start,
    WaitFlat,
    Wait { until: Instant },
    ShowColor,
    WaitTilt { until: Instant },
    ShowResult { tilt: Tilt },
    LevelDone { until: Instant },
    ShowFinal,
    /// Every level has been passed
    Finished,
}

#[derive(Debug, Clone, Copy)]
pub struct Input {
    pub now: Instant,
    /// A new, debounced press happened since the last tick
    pub button_pressed: bool,
    pub acceleration: Acceleration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Scene {
    Frame(Frame),
    Animation(Animation),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    LevelFinished { level: u8, score: u8, passed: bool },
}

/// What the display should do after a tick. Scenes are shown in order, the blank timer is
/// armed after the last one.
#[derive(Debug, Default, PartialEq)]
pub struct Tick {
    pub scenes: Vec<Scene, 2>,
    pub blank_after: Option<Duration>,
    pub event: Option<GameEvent>,
}

impl Tick {
    fn show(&mut self, scene: Scene) {
        // no state produces more than two scenes
        let _ = self.scenes.push(scene);
    }
}

pub struct TiltGame<R> {
    rng: R,
    filter: TiltFilter,
    state: GameState,
    level: u8,
    score: u8,
    turn: usize,
    goal: Goal,
    results: Vec<Outcome, TURNS_PER_LEVEL>,
}

impl<R: Rng> TiltGame<R> {
    pub fn new(rng: R) -> Self {
        Self::with_level(rng, 1)
    }

    /// Resume at a previously unlocked level. Anything above the last level means the game
    /// has already been completed.
    pub fn with_level(rng: R, level: u8) -> Self {
        let level = level.max(1);
        Self {
            rng,
            filter: TiltFilter::new(),
            state: if level > LEVEL_COUNT {
                GameState::Finished
            } else {
                GameState::Start
            },
            level: level.min(LEVEL_COUNT + 1),
            score: 0,
            turn: 0,
            goal: Goal::Red,
            results: Vec::new(),
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn turn(&self) -> usize {
        self.turn
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn goal(&self) -> Goal {
        self.goal
    }

    pub fn results(&self) -> &[Outcome] {
        &self.results
    }

    pub fn filter(&self) -> &TiltFilter {
        &self.filter
    }

    /// Advance the game by one step
    pub fn tick(&mut self, input: Input) -> Tick {
        self.filter.update(&input.acceleration);
        let now = input.now;
        let mut tick = Tick::default();

        match self.state {
            GameState::Start => {
                if input.button_pressed {
                    self.score = 0;
                    self.turn = 0;
                    self.results.clear();
                    tick.show(Scene::Animation(animations::intro(self.level)));
                    self.state = GameState::WaitFlat;
                }
            }
            GameState::WaitFlat => {
                if self.filter.is_flat() {
                    self.state = GameState::Wait {
                        until: now + FLAT_WAIT,
                    };
                }
            }
            GameState::Wait { until } => {
                if now > until {
                    self.state = GameState::ShowColor;
                }
            }
            GameState::ShowColor => {
                let settings = levels::settings(self.level);
                self.goal = self.pick_goal();
                let board = self.board(&settings.layout);
                tick.show(Scene::Frame(board));
                tick.blank_after = Some(settings.display_time);
                self.state = GameState::WaitTilt {
                    until: now + settings.reaction_time,
                };
            }
            GameState::WaitTilt { until } => {
                if now > until {
                    tick.show(Scene::Animation(animations::timeout()));
                    self.state = GameState::ShowResult { tilt: Tilt::Center };
                } else {
                    let tilt = self.filter.tilt();
                    if tilt != Tilt::Center {
                        self.state = GameState::ShowResult { tilt };
                    }
                }
            }
            GameState::ShowResult { tilt } => {
                let outcome = Outcome::judge(self.goal, tilt);
                match outcome {
                    Outcome::Correct => {
                        tick.show(Scene::Frame(glyphs::CORRECT));
                        self.score += 1;
                    }
                    Outcome::Wrong => tick.show(Scene::Frame(glyphs::WRONG)),
                    Outcome::Missed => {}
                }
                let _ = self.results.push(outcome);
                tick.blank_after = Some(RESULT_DISPLAY);
                self.turn += 1;
                self.state = if self.turn >= TURNS_PER_LEVEL {
                    GameState::LevelDone {
                        until: now + LEVEL_DONE_PAUSE,
                    }
                } else {
                    GameState::WaitFlat
                };
            }
            GameState::LevelDone { until } => {
                if now > until {
                    self.state = GameState::ShowFinal;
                }
            }
            GameState::ShowFinal => {
                info!("Level finished. Score: {}/{}", self.score, TURNS_PER_LEVEL);
                let level = self.level;
                let passed = self.score >= PASS_SCORE;
                if passed {
                    self.level += 1;
                    info!("[OK] Next level");
                    tick.show(Scene::Animation(animations::level_passed()));
                } else {
                    tick.show(Scene::Animation(animations::level_failed()));
                }
                tick.show(Scene::Frame(animations::results(&self.results)));
                tick.blank_after = Some(SUMMARY_DISPLAY);
                tick.event = Some(GameEvent::LevelFinished {
                    level,
                    score: self.score,
                    passed,
                });
                self.state = if self.level > LEVEL_COUNT {
                    GameState::Finished
                } else {
                    GameState::Start
                };
            }
            GameState::Finished => {
                tick.show(Scene::Animation(animations::game_finished()));
            }
        }
        tick
    }

    fn pick_goal(&mut self) -> Goal {
        let random = if self.rng.random_bool(0.5) {
            Goal::Red
        } else {
            Goal::Green
        };
        if self.level != 1 {
            return random;
        }
        // the warm-up always opens with red, green, red, green
        match self.turn {
            0 | 2 => Goal::Red,
            1 | 3 => Goal::Green,
            _ => random,
        }
    }

    fn board(&mut self, layout: &Layout) -> Frame {
        let goal = self.goal;
        let color = |cell: &Cell| match cell {
            Cell::Goal => goal.color(),
            Cell::Decoy => goal.decoy(),
            Cell::Dark => BLACK,
            Cell::Glare => WHITE,
        };
        let mut frame = [BLACK; PIXELS];
        match layout {
            Layout::Warmup if self.turn < WARMUP_SOLID_TURNS => return fill(goal.color()),
            Layout::Warmup => {
                let half = if self.rng.random_bool(0.5) {
                    &WARMUP_TOP
                } else {
                    &WARMUP_BOTTOM
                };
                for (pixel, cell) in frame.iter_mut().zip(half) {
                    *pixel = color(cell);
                }
            }
            Layout::Scattered(cells) => {
                let mut cells = *cells;
                cells.shuffle(&mut self.rng);
                for (pixel, cell) in frame.iter_mut().zip(&cells) {
                    *pixel = color(cell);
                }
            }
        }
        frame
    }
}
