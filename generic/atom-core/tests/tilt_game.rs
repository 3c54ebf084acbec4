use atom_core::tilt_game::accel::{Acceleration, Tilt};
use atom_core::tilt_game::levels::{LEVEL_COUNT, PASS_SCORE, TURNS_PER_LEVEL};
use atom_core::tilt_game::{
    GameEvent, GameState, Goal, Input, Outcome, Scene, Tick, TiltGame, animations,
};
use embassy_time::Instant;
use rand::{SeedableRng, rngs::SmallRng};

/// Drives the game like a player holding the device, 5ms per tick
struct Player {
    game: TiltGame<SmallRng>,
    now: u64,
}

impl Player {
    fn new(level: u8) -> Self {
        Self {
            game: TiltGame::with_level(SmallRng::seed_from_u64(42), level),
            now: 0,
        }
    }

    fn tick(&mut self, x: f32, button_pressed: bool) -> Tick {
        self.now += 5;
        self.game.tick(Input {
            now: Instant::from_millis(self.now),
            button_pressed,
            acceleration: Acceleration { x, y: 0.0, z: -1.0 },
        })
    }

    fn start(&mut self) {
        assert_eq!(self.game.state(), GameState::Start);
        self.tick(0.0, true);
    }

    /// Hold flat until the board shows up, then tilt to the right or the wrong side
    fn play_turn(&mut self, correct: bool) {
        while !matches!(self.game.state(), GameState::WaitTilt { .. }) {
            self.tick(0.0, false);
        }
        let right = (self.game.goal() == Goal::Red) == correct;
        let x = if right { 1.0 } else { -1.0 };
        while matches!(self.game.state(), GameState::WaitTilt { .. }) {
            self.tick(x, false);
        }
        // the result is judged on the following tick
        self.tick(x, false);
    }

    fn finish_level(&mut self) -> GameEvent {
        loop {
            if let Some(event) = self.tick(0.0, false).event {
                return event;
            }
        }
    }

    fn play_level(&mut self, correct: usize) -> GameEvent {
        self.start();
        for turn in 0..TURNS_PER_LEVEL {
            self.play_turn(turn < correct);
        }
        self.finish_level()
    }
}

#[test]
fn test_judge_table() {
    assert_eq!(Outcome::judge(Goal::Red, Tilt::Right), Outcome::Correct);
    assert_eq!(Outcome::judge(Goal::Green, Tilt::Left), Outcome::Correct);
    assert_eq!(Outcome::judge(Goal::Red, Tilt::Left), Outcome::Wrong);
    assert_eq!(Outcome::judge(Goal::Green, Tilt::Right), Outcome::Wrong);
    assert_eq!(Outcome::judge(Goal::Red, Tilt::Center), Outcome::Missed);
    assert_eq!(Outcome::judge(Goal::Green, Tilt::Center), Outcome::Missed);
}

#[test]
fn test_perfect_level_advances() {
    let mut player = Player::new(1);
    let event = player.play_level(TURNS_PER_LEVEL);
    assert_eq!(
        event,
        GameEvent::LevelFinished {
            level: 1,
            score: 25,
            passed: true
        }
    );
    assert_eq!(player.game.level(), 2);
    assert_eq!(player.game.state(), GameState::Start);
    assert!(player.game.results().iter().all(|o| *o == Outcome::Correct));
}

#[test]
fn test_pass_threshold() {
    let mut player = Player::new(3);
    let event = player.play_level(PASS_SCORE as usize - 1);
    assert_eq!(
        event,
        GameEvent::LevelFinished {
            level: 3,
            score: PASS_SCORE - 1,
            passed: false
        }
    );
    assert_eq!(player.game.level(), 3);

    let event = player.play_level(PASS_SCORE as usize);
    assert_eq!(
        event,
        GameEvent::LevelFinished {
            level: 3,
            score: PASS_SCORE,
            passed: true
        }
    );
    assert_eq!(player.game.level(), 4);
}

#[test]
fn test_start_resets_the_round() {
    let mut player = Player::new(2);
    player.play_level(5);
    assert_eq!(player.game.results().len(), TURNS_PER_LEVEL);
    assert_eq!(
        player.game.results()[TURNS_PER_LEVEL - 1],
        Outcome::Wrong
    );

    player.start();
    assert!(player.game.results().is_empty());
    assert_eq!(player.game.score(), 0);
    assert_eq!(player.game.turn(), 0);
    assert_eq!(player.game.state(), GameState::WaitFlat);
}

#[test]
fn test_summary_shows_every_turn() {
    let mut player = Player::new(4);
    player.start();
    for turn in 0..TURNS_PER_LEVEL {
        player.play_turn(turn % 2 == 0);
    }
    let tick = loop {
        let tick = player.tick(0.0, false);
        if tick.event.is_some() {
            break tick;
        }
    };
    assert_eq!(tick.scenes[0], Scene::Animation(animations::level_failed()));
    assert_eq!(
        tick.scenes[1],
        Scene::Frame(animations::results(player.game.results()))
    );
}

#[test]
fn test_last_level_finishes_the_game() {
    let mut player = Player::new(LEVEL_COUNT);
    let event = player.play_level(TURNS_PER_LEVEL);
    assert_eq!(
        event,
        GameEvent::LevelFinished {
            level: LEVEL_COUNT,
            score: 25,
            passed: true
        }
    );
    assert_eq!(player.game.state(), GameState::Finished);
    let tick = player.tick(0.0, true);
    assert_eq!(
        tick.scenes[0],
        Scene::Animation(animations::game_finished())
    );
    assert_eq!(player.game.state(), GameState::Finished);
}
