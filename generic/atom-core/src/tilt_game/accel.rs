use core::fmt::Debug;

use embedded_hal_async::{delay::DelayNs, i2c::I2c};
use libm::fabsf;
pub use mpu6886::Acceleration;
use mpu6886::Mpu6886;

use crate::running_average::RunningAverage;

pub const FILTER_WINDOW: u16 = 15;
/// Held roughly level: z points down and x is within ~27°
pub const FLAT_Z_MAX: f32 = 0.7;
pub const FLAT_X_MAX: f32 = 0.3;
/// ~45° to either side counts as a tilt
pub const TILT_THRESHOLD: f32 = 0.5;

pub trait Accelerometer {
    type Error: Debug;

    fn init(
        &mut self,
        delay: &mut impl DelayNs,
    ) -> impl core::future::Future<Output = Result<(), Self::Error>>;

    /// Acceleration in g. x points to the right, z points up.
    fn acceleration(
        &mut self,
    ) -> impl core::future::Future<Output = Result<Acceleration, Self::Error>>;
}

impl<I2C: I2c> Accelerometer for Mpu6886<I2C> {
    type Error = mpu6886::Error<I2C::Error>;

    async fn init(&mut self, delay: &mut impl DelayNs) -> Result<(), Self::Error> {
        Mpu6886::init(self, delay).await
    }

    async fn acceleration(&mut self) -> Result<Acceleration, Self::Error> {
        Mpu6886::acceleration(self).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tilt {
    Center,
    Left,
    Right,
}

/// Smooths the raw accelerometer readings
#[derive(Debug, Clone, Copy)]
pub struct TiltFilter {
    x: RunningAverage,
    y: RunningAverage,
    z: RunningAverage,
}

impl TiltFilter {
    pub const fn new() -> Self {
        Self {
            x: RunningAverage::fixed(FILTER_WINDOW),
            y: RunningAverage::fixed(FILTER_WINDOW),
            z: RunningAverage::fixed(FILTER_WINDOW),
        }
    }

    pub fn update(&mut self, sample: &Acceleration) {
        self.x.add(sample.x);
        self.y.add(sample.y);
        self.z.add(sample.z);
    }

    pub fn average(&self) -> Acceleration {
        Acceleration {
            x: self.x.value(),
            y: self.y.value(),
            z: self.z.value(),
        }
    }

    pub fn is_flat(&self) -> bool {
        self.z.value() < FLAT_Z_MAX && fabsf(self.x.value()) < FLAT_X_MAX
    }

    pub fn tilt(&self) -> Tilt {
        let x = self.x.value();
        if x < -TILT_THRESHOLD {
            Tilt::Left
        } else if x > TILT_THRESHOLD {
            Tilt::Right
        } else {
            Tilt::Center
        }
    }
}

impl Default for TiltFilter {
    fn default() -> Self {
        Self::new()
    }
}
