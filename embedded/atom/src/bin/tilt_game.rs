#![no_std]
#![no_main]

use atom_core::flash::FlashHandling;
use atom_core::system_settings::StoreSignals;
use atom_core::system_settings::log_toggles::LogToggleWatcher;
use atom_core::tilt_game::TiltGame;
use atom_core::tilt_game::runner::GameStatus;
use atom_esp32::cli::menu_handler;
use atom_esp32::flash::{FlashHandler, flash_task};
use atom_esp32::tilt_game::tilt_game_task;
use embassy_executor::Spawner;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use esp_backtrace as _;
use esp_bootloader_esp_idf::partitions::{DataPartitionSubType, PartitionType};
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Input, InputConfig, Pull};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::interrupt::software::SoftwareInterruptControl;
use esp_hal::rmt::Rmt;
use esp_hal::rng::Rng;
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use esp_hal::uart::{Config as UartConfig, Uart};
use log::{error, info};
use mpu6886::Mpu6886;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use static_cell::StaticCell;

esp_bootloader_esp_idf::esp_app_desc!();

type LogWatcher = LogToggleWatcher<CriticalSectionRawMutex, 4>;

static GAME_STATUS: GameStatus = GameStatus::new();

#[esp_rtos::main]
async fn main(spawner: Spawner) {
    esp_println::logger::init_logger_from_env();
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(size: 32 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_int = SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_int.software_interrupt0);
    info!("Embassy initialized!");

    static LOG_TOGGLES: StaticCell<LogWatcher> = StaticCell::new();
    let log_toggles: &'static LogWatcher = LOG_TOGGLES.init(LogToggleWatcher::new());
    static SETTING_SIGNALS: StaticCell<StoreSignals<CriticalSectionRawMutex>> = StaticCell::new();
    let setting_signals = SETTING_SIGNALS.init(StoreSignals::new());

    let restored_state = match FlashHandler::new(
        peripherals.FLASH,
        PartitionType::Data(DataPartitionSubType::Fat),
    )
    .await
    {
        Ok(flash) => {
            static FLASH: StaticCell<FlashHandler> = StaticCell::new();
            let flash = FLASH.init(flash);
            let restored = flash.restore().await;
            spawner.must_spawn(flash_task(flash, setting_signals));
            Some(restored)
        }
        Err(e) => {
            error!("Settings storage unavailable: {e}");
            None
        }
    };
    let (initial_toggles, progress) = match restored_state {
        Some(state) => (state.log_toggles.unwrap_or_default(), state.game_progress),
        None => (Default::default(), None),
    };
    let level = progress.map_or(1, |progress| progress.level);
    info!("Starting at level {level}");

    let uart = match Uart::new(peripherals.UART0, UartConfig::default()) {
        Ok(uart) => uart
            .with_tx(peripherals.GPIO1)
            .with_rx(peripherals.GPIO3)
            .into_async(),
        Err(e) => panic!("Failed to set up UART0: {e:?}"),
    };
    spawner.must_spawn(menu_handler(
        uart,
        initial_toggles,
        log_toggles.dyn_sender(),
        setting_signals,
        &GAME_STATUS,
    ));

    // Internal I2C bus of the ATOM Matrix
    let imu_bus = match I2c::new(
        peripherals.I2C0,
        I2cConfig::default().with_frequency(Rate::from_khz(400)),
    ) {
        Ok(i2c) => i2c
            .with_sda(peripherals.GPIO25)
            .with_scl(peripherals.GPIO21)
            .into_async(),
        Err(e) => panic!("Failed to set up the IMU I2C bus: {e:?}"),
    };
    // GPIO39 is input only and has an external pull-up
    let button = Input::new(
        peripherals.GPIO39,
        InputConfig::default().with_pull(Pull::None),
    );

    let rng = Rng::new();
    let seed = ((rng.random() as u64) << 32) | rng.random() as u64;
    let game = TiltGame::with_level(SmallRng::seed_from_u64(seed), level);

    let rmt = match Rmt::new(peripherals.RMT, Rate::from_mhz(80)) {
        Ok(rmt) => rmt,
        Err(e) => panic!("Failed to set up the RMT peripheral: {e:?}"),
    };
    let log_receiver = match log_toggles.dyn_receiver() {
        Some(receiver) => receiver,
        None => panic!("Not enough log toggle receivers"),
    };
    spawner.must_spawn(tilt_game_task(
        rmt.channel0,
        peripherals.GPIO27.into(),
        Mpu6886::new(imu_bus),
        button,
        game,
        &GAME_STATUS,
        setting_signals,
        log_receiver,
    ));

    info!("All tasks spawned");
}
