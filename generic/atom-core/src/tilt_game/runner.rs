use core::fmt::Write as _;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Delay, Duration, Instant, Timer};
use embedded_hal::digital::InputPin;
use log::{error, info};
use rand::Rng;
use smart_leds::{RGB8, SmartLedsWrite};

use super::accel::{Acceleration, Accelerometer};
use super::levels::TURNS_PER_LEVEL;
use super::{GameEvent, GameState, Input, Scene, TiltGame, animations};
use crate::button::Button;
use crate::cli::StatusReport;
use crate::matrix::{BlankTimer, DARK, glyphs, play, show};
use crate::system_settings::log_toggles::{LogChannel, LogToggleReceiver, may_log};
use crate::system_settings::{GameProgress, StoreSignals};

/// The game loop runs at roughly 200Hz
pub const TICK_INTERVAL: Duration = Duration::from_millis(5);
/// How long the IMU check result stays on before the display is cleared
const BOOT_RESULT_HOLD: Duration = Duration::from_secs(1);

/// Live view on the game for the CLI
pub struct GameStatus {
    level: AtomicU8,
    turn: AtomicU8,
    score: AtomicU8,
    finished: AtomicBool,
    imu_ready: AtomicBool,
}

impl GameStatus {
    pub const fn new() -> Self {
        Self {
            level: AtomicU8::new(1),
            turn: AtomicU8::new(0),
            score: AtomicU8::new(0),
            finished: AtomicBool::new(false),
            imu_ready: AtomicBool::new(false),
        }
    }

    pub fn publish<R: Rng>(&self, game: &TiltGame<R>) {
        self.level.store(game.level(), Ordering::Relaxed);
        self.turn.store(game.turn() as u8, Ordering::Relaxed);
        self.score.store(game.score(), Ordering::Relaxed);
        self.finished
            .store(game.state() == GameState::Finished, Ordering::Relaxed);
    }

    pub fn level(&self) -> u8 {
        self.level.load(Ordering::Relaxed)
    }

    pub fn turn(&self) -> u8 {
        self.turn.load(Ordering::Relaxed)
    }

    pub fn score(&self) -> u8 {
        self.score.load(Ordering::Relaxed)
    }

    pub fn finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }

    pub fn imu_ready(&self) -> bool {
        self.imu_ready.load(Ordering::Relaxed)
    }
}

impl Default for GameStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusReport for GameStatus {
    fn report(&self, out: &mut dyn core::fmt::Write) -> core::fmt::Result {
        if self.finished() {
            writeln!(out, "All levels passed")?;
        } else {
            writeln!(
                out,
                "Level {}, turn {}/{}, score {}",
                self.level(),
                self.turn(),
                TURNS_PER_LEVEL,
                self.score()
            )?;
        }
        writeln!(out, "IMU ready: {}", self.imu_ready())
    }
}

/// Everything the game loop needs from the hardware
pub struct GameHardware<LED, IMU, BTN> {
    pub leds: LED,
    pub imu: IMU,
    /// The ATOM button is active low
    pub button: BTN,
}

/// Boot animation, IMU bring up and then the game loop forever.
/// A failing IMU is reported on the matrix once, the game then runs with zero readings.
pub async fn run_tilt_game<LED, IMU, BTN, R, M>(
    mut game: TiltGame<R>,
    hardware: GameHardware<LED, IMU, BTN>,
    status: &GameStatus,
    store_signals: &'static StoreSignals<M>,
    mut log_receiver: LogToggleReceiver,
) -> !
where
    LED: SmartLedsWrite,
    <LED as SmartLedsWrite>::Color: From<RGB8>,
    IMU: Accelerometer,
    BTN: InputPin,
    R: Rng,
    M: RawMutex,
{
    let GameHardware {
        mut leds,
        mut imu,
        mut button,
    } = hardware;

    play(&mut leds, &animations::startup()).await;
    info!("INIT IMU");
    let imu_ready = match imu.init(&mut Delay).await {
        Ok(()) => {
            info!("[OK] INIT ready");
            let _ = show(&mut leds, &glyphs::CORRECT);
            true
        }
        Err(e) => {
            error!("[ERR] IMU INIT failed: {e:?}");
            let _ = show(&mut leds, &glyphs::WRONG);
            false
        }
    };
    status.imu_ready.store(imu_ready, Ordering::Relaxed);
    Timer::after(BOOT_RESULT_HOLD).await;

    let mut blank = BlankTimer::default();
    blank.arm(Instant::now(), BOOT_RESULT_HOLD);
    let mut debounce = Button::new();

    loop {
        let now = Instant::now();
        if blank.expired(now) {
            let _ = show(&mut leds, &DARK);
        }

        let acceleration = if imu_ready {
            match imu.acceleration().await {
                Ok(a) => a,
                Err(e) => {
                    may_log(&mut log_receiver, LogChannel::Imu, || {
                        error!("IMU read failed: {e:?}")
                    })
                    .await;
                    Acceleration::default()
                }
            }
        } else {
            Acceleration::default()
        };
        may_log(&mut log_receiver, LogChannel::Imu, || {
            info!(
                "acc: {:.2} {:.2} {:.2}",
                acceleration.x, acceleration.y, acceleration.z
            )
        })
        .await;

        let pressed = button.is_low().unwrap_or(false);
        let input = Input {
            now,
            button_pressed: debounce.update(pressed, now),
            acceleration,
        };
        let previous = game.state();
        let tick = game.tick(input);
        if game.state() != previous {
            may_log(&mut log_receiver, LogChannel::Game, || {
                info!("{:?} -> {:?}", previous, game.state())
            })
            .await;
        }

        for scene in &tick.scenes {
            match scene {
                Scene::Frame(frame) => {
                    let _ = show(&mut leds, frame);
                }
                Scene::Animation(animation) => play(&mut leds, animation).await,
            }
        }
        if let Some(after) = tick.blank_after {
            blank.arm(Instant::now(), after);
        }

        if let Some(GameEvent::LevelFinished {
            level,
            score,
            passed,
        }) = tick.event
        {
            may_log(&mut log_receiver, LogChannel::Game, || {
                info!("Level {level} done with {score} points, passed: {passed}")
            })
            .await;
            if passed {
                store_signals.game_progress.signal(GameProgress {
                    level: game.level(),
                });
            }
        }

        status.publish(&game);
        Timer::after(TICK_INTERVAL).await;
    }
}
