#![no_std]

use core::fmt::Debug;

use embedded_hal_async::{delay::DelayNs, i2c::I2c};
use thiserror::Error;

pub const DEFAULT_ADDRESS: u8 = 0x68;

const WHO_AM_I_VALUE: u8 = 0x19;

mod reg {
    pub const SMPLRT_DIV: u8 = 0x19;
    pub const CONFIG: u8 = 0x1A;
    pub const GYRO_CONFIG: u8 = 0x1B;
    pub const ACCEL_CONFIG: u8 = 0x1C;
    pub const ACCEL_CONFIG2: u8 = 0x1D;
    pub const FIFO_EN: u8 = 0x23;
    pub const INT_PIN_CFG: u8 = 0x37;
    pub const INT_ENABLE: u8 = 0x38;
    pub const ACCEL_XOUT_H: u8 = 0x3B;
    pub const USER_CTRL: u8 = 0x6A;
    pub const PWR_MGMT_1: u8 = 0x6B;
    pub const WHO_AM_I: u8 = 0x75;
}

#[derive(Error, Debug)]
pub enum Error<E: Debug> {
    #[error("I2C transfer failed: {0:?}")]
    I2c(E),
    #[error("Unexpected WHO_AM_I value {0:#04x}")]
    UnknownDevice(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AccelRange {
    G2 = 0,
    G4 = 1,
    G8 = 2,
    G16 = 3,
}

impl AccelRange {
    /// g per LSB
    pub fn resolution(self) -> f32 {
        let full_scale = match self {
            AccelRange::G2 => 2.0,
            AccelRange::G4 => 4.0,
            AccelRange::G8 => 8.0,
            AccelRange::G16 => 16.0,
        };
        full_scale / 32768.0
    }
}

/// Acceleration in g. Axes as printed on the ATOM:
/// x points right, y backwards, z up (lying flat reads roughly -1g on z)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Acceleration {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Acceleration {
    pub fn from_raw(raw: &[u8; 6], range: AccelRange) -> Self {
        let res = range.resolution();
        let axis = |i: usize| i16::from_be_bytes([raw[i], raw[i + 1]]) as f32 * res;
        Self {
            x: axis(0),
            y: axis(2),
            z: axis(4),
        }
    }
}

pub struct Mpu6886<I2C> {
    i2c: I2C,
    address: u8,
    range: AccelRange,
}

impl<I2C: I2c> Mpu6886<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            address: DEFAULT_ADDRESS,
            range: AccelRange::G8,
        }
    }

    /// Check the device identity, reset it and configure the accelerometer for ±8g
    pub async fn init(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<I2C::Error>> {
        let id = self.read_register(reg::WHO_AM_I).await?;
        if id != WHO_AM_I_VALUE {
            return Err(Error::UnknownDevice(id));
        }
        delay.delay_ms(1).await;

        self.write_register(reg::PWR_MGMT_1, 0x00).await?;
        delay.delay_ms(10).await;
        // device reset
        self.write_register(reg::PWR_MGMT_1, 0x80).await?;
        delay.delay_ms(10).await;
        // auto select the best clock source
        self.write_register(reg::PWR_MGMT_1, 0x01).await?;
        delay.delay_ms(10).await;

        let sequence = [
            (reg::ACCEL_CONFIG, (self.range as u8) << 3),
            (reg::GYRO_CONFIG, 0x18),
            (reg::CONFIG, 0x01),
            (reg::SMPLRT_DIV, 0x05),
            (reg::INT_ENABLE, 0x00),
            (reg::ACCEL_CONFIG2, 0x00),
            (reg::USER_CTRL, 0x00),
            (reg::FIFO_EN, 0x00),
            (reg::INT_PIN_CFG, 0x22),
            (reg::INT_ENABLE, 0x01),
        ];
        for (register, value) in sequence {
            self.write_register(register, value).await?;
            delay.delay_ms(1).await;
        }
        delay.delay_ms(100).await;
        Ok(())
    }

    pub async fn acceleration(&mut self) -> Result<Acceleration, Error<I2C::Error>> {
        let mut raw = [0u8; 6];
        self.i2c
            .write_read(self.address, &[reg::ACCEL_XOUT_H], &mut raw)
            .await
            .map_err(Error::I2c)?;
        Ok(Acceleration::from_raw(&raw, self.range))
    }

    async fn read_register(&mut self, register: u8) -> Result<u8, Error<I2C::Error>> {
        let mut value = [0u8];
        self.i2c
            .write_read(self.address, &[register], &mut value)
            .await
            .map_err(Error::I2c)?;
        Ok(value[0])
    }

    async fn write_register(&mut self, register: u8, value: u8) -> Result<(), Error<I2C::Error>> {
        self.i2c
            .write(self.address, &[register, value])
            .await
            .map_err(Error::I2c)
    }
}
