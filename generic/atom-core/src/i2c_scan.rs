use embedded_hal_async::i2c::{Error, ErrorKind, I2c};
use heapless::Vec;
use log::{error, info};

/// Probe every 7 bit address with an empty write and return the ones which acknowledged.
/// A NACK is the normal "nobody there" answer, every other bus error gets logged.
pub async fn scan<I: I2c>(i2c: &mut I) -> Vec<u8, 128> {
    info!("Scanning I2C bus...");
    let mut found = Vec::new();
    for address in 1..127u8 {
        match i2c.write(address, &[]).await {
            Ok(()) => {
                let _ = found.push(address);
                info!("[OK] {} 0x{:02X}", found.len(), address);
            }
            Err(e) => {
                if !matches!(e.kind(), ErrorKind::NoAcknowledge(_)) {
                    error!("[ERR] {} 0x{:02X}: {:?}", found.len(), address, e.kind());
                }
            }
        }
    }
    info!("{} devices found", found.len());
    found
}
