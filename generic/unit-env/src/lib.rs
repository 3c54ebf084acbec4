#![no_std]

pub mod qmp6988;
pub mod sht30;

use core::fmt::Debug;

use embedded_hal_async::{delay::DelayNs, i2c::I2c};
use log::warn;
use thiserror::Error;

pub use qmp6988::Qmp6988;
pub use sht30::Sht30;

#[derive(Error, Debug)]
pub enum UnitEnvError<E: Debug> {
    #[error("SHT30 read failed: {0:?}")]
    Sht30(sht30::Error<E>),
    #[error("QMP6988 read failed: {0:?}")]
    Qmp6988(qmp6988::Error<E>),
}

/// A single combined reading of the ENV unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvReading {
    /// Temperature in °C as measured by the SHT30
    pub temperature: f32,
    /// Relative humidity in %
    pub humidity: f32,
    /// Absolute pressure in Pa, `None` when the QMP6988 could not be read
    pub pressure: Option<f32>,
}

/// Both sensors of the ENV unit. The two drivers may sit on different bus handles
/// which point to the same physical bus.
pub struct UnitEnv<T, P, D> {
    pub sht30: Sht30<T>,
    pub qmp6988: Qmp6988<P>,
    delay: D,
}

impl<T, P, D, E> UnitEnv<T, P, D>
where
    T: I2c<Error = E>,
    P: I2c<Error = E>,
    D: DelayNs,
    E: Debug,
{
    pub fn new(sht30: Sht30<T>, qmp6988: Qmp6988<P>, delay: D) -> Self {
        Self {
            sht30,
            qmp6988,
            delay,
        }
    }

    /// Bring up the pressure sensor with the given configuration.
    /// The SHT30 runs in single shot mode and needs no setup.
    pub async fn init(&mut self, config: qmp6988::Config) -> Result<(), UnitEnvError<E>> {
        self.qmp6988
            .init(&mut self.delay, config)
            .await
            .map_err(UnitEnvError::Qmp6988)
    }

    /// Read all sensors. Only a failing SHT30 fails the whole reading,
    /// a failing QMP6988 just leaves the pressure out.
    pub async fn read(&mut self) -> Result<EnvReading, UnitEnvError<E>> {
        let climate = self
            .sht30
            .measure(&mut self.delay)
            .await
            .map_err(UnitEnvError::Sht30)?;
        let pressure = match self.qmp6988.read().await {
            Ok(reading) => Some(reading.pressure),
            Err(e) => {
                warn!("QMP6988 read failed, leaving out the pressure: {e:?}");
                None
            }
        };
        Ok(EnvReading {
            temperature: climate.temperature,
            humidity: climate.humidity,
            pressure,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    extern crate std;
    use embedded_hal_async::i2c::{ErrorKind, ErrorType, NoAcknowledgeSource, Operation};
    use matches::assert_matches;

    struct NoDelay;

    impl DelayNs for NoDelay {
        async fn delay_ns(&mut self, _ns: u32) {}
    }

    /// An SHT30 reporting 25 °C and 50 %RH
    struct ClimateBus;

    impl ErrorType for ClimateBus {
        type Error = ErrorKind;
    }

    impl I2c for ClimateBus {
        async fn transaction(
            &mut self,
            _address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            let temperature = 0x6666u16.to_be_bytes();
            let humidity = 0x8000u16.to_be_bytes();
            let response = [
                temperature[0],
                temperature[1],
                sht30::crc8(&temperature),
                humidity[0],
                humidity[1],
                sht30::crc8(&humidity),
            ];
            for op in operations {
                if let Operation::Read(buf) = op {
                    buf.copy_from_slice(&response[..buf.len()]);
                }
            }
            Ok(())
        }
    }

    /// Nothing answers on this address
    struct AbsentBus;

    impl ErrorType for AbsentBus {
        type Error = ErrorKind;
    }

    impl I2c for AbsentBus {
        async fn transaction(
            &mut self,
            _address: u8,
            _operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))
        }
    }

    #[test]
    fn test_missing_pressure_sensor_keeps_climate_readings() {
        let mut unit = UnitEnv::new(Sht30::new(ClimateBus), Qmp6988::new(AbsentBus), NoDelay);
        let init = embassy_futures::block_on(unit.init(qmp6988::Config::HIGH_PRECISION));
        assert_matches!(init, Err(UnitEnvError::Qmp6988(qmp6988::Error::I2c(_))));

        let reading = embassy_futures::block_on(unit.read()).unwrap();
        assert!((reading.temperature - 25.0).abs() < 0.01);
        assert!((reading.humidity - 50.0).abs() < 0.01);
        assert_eq!(reading.pressure, None);
    }

    #[test]
    fn test_missing_climate_sensor_fails_the_reading() {
        let mut unit = UnitEnv::new(Sht30::new(AbsentBus), Qmp6988::new(AbsentBus), NoDelay);
        let result = embassy_futures::block_on(unit.read());
        assert_matches!(result, Err(UnitEnvError::Sht30(sht30::Error::I2c(_))));
    }
}
