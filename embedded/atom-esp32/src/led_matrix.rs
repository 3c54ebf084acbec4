use atom_core::matrix::PIXELS;
use atom_core::status_led::{StatusBoard, status_led};
use esp_hal::gpio::AnyPin;
use esp_hal_smartled::{SmartLedsAdapter, smart_led_buffer};

pub type RmtChannel = esp_hal::rmt::ChannelCreator<'static, esp_hal::Blocking, 0>;

/// Whole matrix status indication of the web monitor
#[embassy_executor::task]
pub async fn status_led_task(
    rmt_channel: RmtChannel,
    led_pin: AnyPin<'static>,
    board: &'static StatusBoard,
) {
    let mut rmt_buffer = smart_led_buffer!(PIXELS);
    let leds = SmartLedsAdapter::new(rmt_channel, led_pin, &mut rmt_buffer);
    status_led(board, leds).await
}
