use atom_core::matrix::PIXELS;
use atom_core::system_settings::StoreSignals;
use atom_core::system_settings::log_toggles::LogToggleReceiver;
use atom_core::tilt_game::TiltGame;
use atom_core::tilt_game::runner::{GameHardware, GameStatus, run_tilt_game};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use esp_hal::gpio::{AnyPin, Input};
use esp_hal::{Async, i2c::master::I2c};
use esp_hal_smartled::{SmartLedsAdapter, smart_led_buffer};
use mpu6886::Mpu6886;
use rand::rngs::SmallRng;

use crate::led_matrix::RmtChannel;

pub type GameImu = Mpu6886<I2c<'static, Async>>;

#[embassy_executor::task]
#[allow(clippy::too_many_arguments)]
pub async fn tilt_game_task(
    rmt_channel: RmtChannel,
    led_pin: AnyPin<'static>,
    imu: GameImu,
    button: Input<'static>,
    game: TiltGame<SmallRng>,
    status: &'static GameStatus,
    store_signals: &'static StoreSignals<CriticalSectionRawMutex>,
    log_receiver: LogToggleReceiver,
) {
    let mut rmt_buffer = smart_led_buffer!(PIXELS);
    let leds = SmartLedsAdapter::new(rmt_channel, led_pin, &mut rmt_buffer);
    let hardware = GameHardware { leds, imu, button };
    run_tilt_game(game, hardware, status, store_signals, log_receiver).await
}
