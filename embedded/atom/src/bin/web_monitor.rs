#![no_std]
#![no_main]

extern crate alloc;

use atom_core::env_monitor::{LatestSnapshot, MonitorStatus};
use atom_core::flash::FlashHandling;
use atom_core::http::Site;
use atom_core::status_led::StatusBoard;
use atom_core::system_settings::StoreSignals;
use atom_core::system_settings::log_toggles::LogToggleWatcher;
use atom_esp32::cli::menu_handler;
use atom_esp32::flash::{FlashHandler, flash_task};
use atom_esp32::led_matrix::status_led_task;
use atom_esp32::network::{EspWifiLink, http_server_task, net_task, wifi_task};
use atom_esp32::sensors::{monitor_task, setup_env_unit};
use embassy_executor::Spawner;
use embassy_net::StackResources;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use esp_backtrace as _;
use esp_bootloader_esp_idf::partitions::{DataPartitionSubType, PartitionType};
use esp_hal::clock::CpuClock;
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::interrupt::software::SoftwareInterruptControl;
use esp_hal::rmt::Rmt;
use esp_hal::rng::Rng;
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use esp_hal::uart::{Config as UartConfig, Uart};
use esp_radio::wifi::{ClientConfig, ModeConfig};
use log::{error, info};
use static_cell::StaticCell;

esp_bootloader_esp_idf::esp_app_desc!();

type LogWatcher = LogToggleWatcher<CriticalSectionRawMutex, 6>;

const WIFI_SSID: &str = env!("ATOM_WIFI_SSID");
const WIFI_PASSWORD: &str = env!("ATOM_WIFI_PASSWORD");

static SITE: Site = Site {
    index_html: include_bytes!("../../assets/index.html"),
    logo_jpeg: include_bytes!("../../assets/electric-idea_100x100.jpg"),
    favicon: include_bytes!("../../assets/favicon.ico"),
};

static STATUS_BOARD: StatusBoard = StatusBoard::new();
static LATEST: LatestSnapshot = LatestSnapshot::new();
static MONITOR_STATUS: MonitorStatus = MonitorStatus {
    latest: &LATEST,
    board: &STATUS_BOARD,
};

#[esp_rtos::main]
async fn main(spawner: Spawner) {
    esp_println::logger::init_logger_from_env();
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(size: 72 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_int = SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_int.software_interrupt0);
    info!("Embassy initialized!");

    static LOG_TOGGLES: StaticCell<LogWatcher> = StaticCell::new();
    let log_toggles: &'static LogWatcher = LOG_TOGGLES.init(LogToggleWatcher::new());
    static SETTING_SIGNALS: StaticCell<StoreSignals<CriticalSectionRawMutex>> = StaticCell::new();
    let setting_signals = SETTING_SIGNALS.init(StoreSignals::new());

    // Matrix first so the red "no link" state shows up right away
    let rmt = match Rmt::new(peripherals.RMT, Rate::from_mhz(80)) {
        Ok(rmt) => rmt,
        Err(e) => panic!("Failed to set up the RMT peripheral: {e:?}"),
    };
    spawner.must_spawn(status_led_task(
        rmt.channel0,
        peripherals.GPIO27.into(),
        &STATUS_BOARD,
    ));

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
    let initial_toggles = restored_state
        .and_then(|state| state.log_toggles)
        .unwrap_or_default();

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
        &MONITOR_STATUS,
    ));

    // Grove port
    let i2c = match I2c::new(
        peripherals.I2C0,
        I2cConfig::default().with_frequency(Rate::from_khz(100)),
    ) {
        Ok(i2c) => i2c
            .with_sda(peripherals.GPIO26)
            .with_scl(peripherals.GPIO32)
            .into_async(),
        Err(e) => panic!("Failed to set up the Grove I2C bus: {e:?}"),
    };
    let env_unit = setup_env_unit(i2c).await;

    // WiFi station
    static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
    let radio = match esp_radio::init() {
        Ok(radio) => RADIO.init(radio),
        Err(e) => panic!("esp-radio init failed: {e:?}"),
    };
    let (mut wifi_controller, interfaces) =
        match esp_radio::wifi::new(radio, peripherals.WIFI, esp_radio::wifi::Config::default()) {
            Ok(parts) => parts,
            Err(e) => panic!("WiFi peripheral init failed: {e:?}"),
        };
    let client_config = ClientConfig::default()
        .with_ssid(WIFI_SSID.into())
        .with_password(WIFI_PASSWORD.into());
    if let Err(e) = wifi_controller.set_config(&ModeConfig::Client(client_config)) {
        error!("WiFi configuration rejected: {e:?}");
    }

    let rng = Rng::new();
    let seed = ((rng.random() as u64) << 32) | rng.random() as u64;
    static NET_RESOURCES: StaticCell<StackResources<4>> = StaticCell::new();
    let (stack, net_runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        NET_RESOURCES.init(StackResources::new()),
        seed,
    );
    spawner.must_spawn(net_task(net_runner));

    let log_receiver = |watcher: &'static LogWatcher| match watcher.dyn_receiver() {
        Some(receiver) => receiver,
        None => panic!("Not enough log toggle receivers"),
    };
    spawner.must_spawn(wifi_task(
        EspWifiLink::new(wifi_controller, stack, WIFI_SSID),
        &STATUS_BOARD,
        log_receiver(log_toggles),
    ));
    spawner.must_spawn(http_server_task(
        stack,
        SITE,
        &LATEST,
        &STATUS_BOARD,
        log_receiver(log_toggles),
    ));
    spawner.must_spawn(monitor_task(
        env_unit,
        &LATEST,
        &STATUS_BOARD,
        log_receiver(log_toggles),
    ));

    info!("All tasks spawned");
    let stats = esp_alloc::HEAP.stats();
    info!("Current Heap stats: {}", stats);
}
