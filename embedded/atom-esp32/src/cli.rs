use atom_core::cli::{CLIHandler, StatusReport};
use atom_core::system_settings::StoreSignals;
use atom_core::system_settings::log_toggles::{LogChannelToggles, LogToggleSender};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use esp_hal::{Async, uart::Uart};

/// Serial console on UART0, the same port the log output goes to
#[embassy_executor::task]
pub async fn menu_handler(
    uart: Uart<'static, Async>,
    initial_log_toggles: LogChannelToggles,
    log_toggle_sender: LogToggleSender,
    store_signals: &'static StoreSignals<CriticalSectionRawMutex>,
    status: &'static dyn StatusReport,
) {
    let (mut rx, tx) = uart.split();

    let cli = CLIHandler::new(
        initial_log_toggles,
        log_toggle_sender,
        store_signals,
        status,
        tx,
    );
    if let Some(mut cli) = cli {
        loop {
            cli.run(&mut rx).await;
        }
    }
}
