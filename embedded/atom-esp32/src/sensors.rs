use atom_core::env_monitor::{LatestSnapshot, run_monitor};
use atom_core::i2c_scan::scan;
use atom_core::status_led::StatusBoard;
use atom_core::system_settings::log_toggles::LogToggleReceiver;
use embassy_embedded_hal::shared_bus::asynch::i2c::I2cDevice;
use embassy_sync::{blocking_mutex::raw::NoopRawMutex, mutex::Mutex};
use embassy_time::Delay;
use esp_hal::{Async, i2c::master::I2c};
use log::{error, info};
use static_cell::StaticCell;
use unit_env::{Qmp6988, Sht30, UnitEnv, qmp6988};

pub type GroveBus = Mutex<NoopRawMutex, I2c<'static, Async>>;
pub type GroveDevice = I2cDevice<'static, NoopRawMutex, I2c<'static, Async>>;
pub type EnvUnit = UnitEnv<GroveDevice, GroveDevice, Delay>;

/// Scan the Grove bus once, then share it between the two sensors of the ENV unit
pub async fn setup_env_unit(mut i2c: I2c<'static, Async>) -> EnvUnit {
    info!("Scanning the Grove I2C bus");
    scan(&mut i2c).await;

    static GROVE_BUS: StaticCell<GroveBus> = StaticCell::new();
    let bus = GROVE_BUS.init(Mutex::new(i2c));
    let mut unit = UnitEnv::new(
        Sht30::new(I2cDevice::new(bus)),
        Qmp6988::new(I2cDevice::new(bus)),
        Delay,
    );
    match unit.init(qmp6988::Config::HIGH_PRECISION).await {
        Ok(()) => info!("[OK] QMP6988 configured"),
        Err(e) => error!("[ERR] QMP6988 not ready, only temperature and humidity will be reported: {e}"),
    }
    unit
}

#[embassy_executor::task]
pub async fn monitor_task(
    unit: EnvUnit,
    latest: &'static LatestSnapshot,
    board: &'static StatusBoard,
    log_receiver: LogToggleReceiver,
) {
    run_monitor(unit, latest, board, log_receiver).await
}
