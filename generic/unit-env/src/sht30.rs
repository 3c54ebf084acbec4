use core::fmt::Debug;

use embedded_hal_async::{delay::DelayNs, i2c::I2c};
use thiserror::Error;

pub const DEFAULT_ADDRESS: u8 = 0x44;

/// Single shot, high repeatability, clock stretching enabled
const MEASURE_HIGH_REPEATABILITY: [u8; 2] = [0x2C, 0x06];
/// Worst case conversion time for a high repeatability measurement is 15.5ms
const CONVERSION_TIME_MS: u32 = 20;

#[derive(Error, Debug)]
pub enum Error<E: Debug> {
    #[error("I2C transfer failed: {0:?}")]
    I2c(E),
    #[error("CRC mismatch in the {0} word")]
    Crc(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Temperature in °C
    pub temperature: f32,
    /// Relative humidity in %
    pub humidity: f32,
}

impl Measurement {
    pub fn from_raw(raw_temperature: u16, raw_humidity: u16) -> Self {
        Self {
            temperature: -45.0 + 175.0 * raw_temperature as f32 / 65535.0,
            humidity: 100.0 * raw_humidity as f32 / 65535.0,
        }
    }

    /// Decode the six byte response: temperature word, CRC, humidity word, CRC.
    pub fn from_response<E: Debug>(response: &[u8; 6]) -> Result<Self, Error<E>> {
        if crc8(&response[0..2]) != response[2] {
            return Err(Error::Crc("temperature"));
        }
        if crc8(&response[3..5]) != response[5] {
            return Err(Error::Crc("humidity"));
        }
        Ok(Self::from_raw(
            u16::from_be_bytes([response[0], response[1]]),
            u16::from_be_bytes([response[3], response[4]]),
        ))
    }
}

/// CRC-8 as used by Sensirion: polynomial 0x31, init 0xFF, no reflection
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0xFF;
    for byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}

pub struct Sht30<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Sht30<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            address: DEFAULT_ADDRESS,
        }
    }

    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    /// Trigger a single shot measurement and read the result
    pub async fn measure(
        &mut self,
        delay: &mut impl DelayNs,
    ) -> Result<Measurement, Error<I2C::Error>> {
        self.i2c
            .write(self.address, &MEASURE_HIGH_REPEATABILITY)
            .await
            .map_err(Error::I2c)?;
        delay.delay_ms(CONVERSION_TIME_MS).await;
        let mut response = [0u8; 6];
        self.i2c
            .read(self.address, &mut response)
            .await
            .map_err(Error::I2c)?;
        Measurement::from_response(&response)
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}
