use core::fmt::Debug;

use embedded_hal_async::{delay::DelayNs, i2c::I2c};
use thiserror::Error;

pub const DEFAULT_ADDRESS: u8 = 0x70;

const CHIP_ID: u8 = 0x5C;
const REG_CHIP_ID: u8 = 0xD1;
const REG_RESET: u8 = 0xE0;
const REG_CALIBRATION: u8 = 0xA0;
const REG_IIR_FILTER: u8 = 0xF1;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_DATA: u8 = 0xF7;

const RESET_COMMAND: u8 = 0xE6;
const CALIBRATION_LEN: usize = 25;
/// Raw readings are offset binary
const RAW_OFFSET: i32 = 1 << 23;

#[derive(Error, Debug)]
pub enum Error<E: Debug> {
    #[error("I2C transfer failed: {0:?}")]
    I2c(E),
    #[error("Unexpected chip id {0:#04x}")]
    WrongChipId(u8),
    #[error("Sensor was not initialized")]
    NotInitialized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Oversampling {
    Skipped = 0,
    X1 = 1,
    X2 = 2,
    X4 = 3,
    X8 = 4,
    X16 = 5,
    X32 = 6,
    X64 = 7,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Filter {
    Off = 0,
    Coefficient2 = 1,
    Coefficient4 = 2,
    Coefficient8 = 3,
    Coefficient16 = 4,
    Coefficient32 = 5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PowerMode {
    Sleep = 0,
    Forced = 1,
    Normal = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub filter: Filter,
    pub pressure_oversampling: Oversampling,
    pub temperature_oversampling: Oversampling,
    pub power_mode: PowerMode,
}

impl Config {
    /// Slow but precise setting for a stationary weather display
    pub const HIGH_PRECISION: Config = Config {
        filter: Filter::Coefficient32,
        pressure_oversampling: Oversampling::X32,
        temperature_oversampling: Oversampling::X4,
        power_mode: PowerMode::Normal,
    };

    fn ctrl_meas(&self) -> u8 {
        ((self.temperature_oversampling as u8) << 5)
            | ((self.pressure_oversampling as u8) << 2)
            | self.power_mode as u8
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            filter: Filter::Coefficient4,
            pressure_oversampling: Oversampling::X8,
            temperature_oversampling: Oversampling::X1,
            power_mode: PowerMode::Normal,
        }
    }
}

/// Fixed point compensation coefficients derived from the OTP calibration words.
/// The Q format of each coefficient is noted next to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    a0: i64,  // 20Q4
    b00: i64, // 20Q4
    a1: i64,  // 31Q23
    a2: i64,  // 30Q47
    bt1: i64, // 28Q15
    bt2: i64, // 34Q38
    bp1: i64, // 31Q20
    b11: i64, // 28Q34
    bp2: i64, // 29Q43
    b12: i64, // 29Q53
    b21: i64, // 29Q60
    bp3: i64, // 28Q65
}

impl Calibration {
    pub fn from_otp(otp: &[u8; CALIBRATION_LEN]) -> Self {
        let word = |i: usize| i16::from_be_bytes([otp[i], otp[i + 1]]) as i64;
        // 20 bit signed values, sign extended through the top of an i32
        let a0 = ((((otp[18] as u32) << 12) | ((otp[19] as u32) << 4) | (otp[24] as u32 & 0x0F))
            << 12) as i32
            >> 12;
        let b00 = ((((otp[0] as u32) << 12) | ((otp[1] as u32) << 4) | ((otp[24] as u32) >> 4))
            << 12) as i32
            >> 12;
        Self {
            a0: a0 as i64,
            b00: b00 as i64,
            a1: 3608 * word(20) - 1_731_677_965,
            a2: 16889 * word(22) - 87_619_360,
            bt1: 2982 * word(2) + 107_370_906,
            bt2: 329_854 * word(4) + 108_083_093,
            bp1: 19923 * word(6) + 1_133_836_764,
            b11: 2406 * word(8) + 118_215_883,
            bp2: 3079 * word(10) - 181_579_595,
            b12: 6846 * word(12) + 85_590_281,
            b21: 13836 * word(14) + 79_333_336,
            bp3: 2915 * word(16) + 157_155_561,
        }
    }

    /// Compensated temperature in 1/256 °C
    pub fn temperature(&self, dt: i32) -> i16 {
        let dt = dt as i64;
        let wk1 = self.a1 * dt;
        let mut wk2 = (self.a2 * dt) >> 14;
        wk2 = (wk2 * dt) >> 10;
        wk2 = ((wk1 + wk2) / 32767) >> 19;
        ((self.a0 + wk2) >> 4) as i16
    }

    /// Compensated pressure in 1/16 Pa, using the compensated temperature `tx`
    pub fn pressure(&self, dp: i32, tx: i16) -> i32 {
        let dp = dp as i64;
        let tx = tx as i64;

        let mut wk1 = self.bt1 * tx;
        wk1 += (self.bp1 * dp) >> 5;

        let mut wk3 = (((self.bt2 * tx) >> 1) * tx) >> 8;
        wk3 += (((self.b11 * tx) >> 4) * dp) >> 1;
        wk3 += (((self.bp2 * dp) >> 13) * dp) >> 1;
        wk1 += wk3 >> 14;

        let mut wk3 = ((((self.b12 * tx) * tx) >> 22) * dp) >> 1;
        wk3 += ((((self.b21 * tx) >> 6) * dp) >> 23) * dp >> 1;
        wk3 += ((((self.bp3 * dp) >> 12) * dp) >> 23) * dp;
        wk1 += wk3 >> 15;

        wk1 /= 32767;
        wk1 >>= 11;
        (wk1 + self.b00) as i32
    }

    /// Compensate a raw six byte data register dump (pressure first, then temperature)
    pub fn compensate(&self, raw: &[u8; 6]) -> Reading {
        let pressure_raw = i32::from_be_bytes([0, raw[0], raw[1], raw[2]]) - RAW_OFFSET;
        let temperature_raw = i32::from_be_bytes([0, raw[3], raw[4], raw[5]]) - RAW_OFFSET;
        let tx = self.temperature(temperature_raw);
        let px = self.pressure(pressure_raw, tx);
        Reading {
            temperature: tx as f32 / 256.0,
            pressure: px as f32 / 16.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Die temperature in °C
    pub temperature: f32,
    /// Absolute pressure in Pa
    pub pressure: f32,
}

pub struct Qmp6988<I2C> {
    i2c: I2C,
    address: u8,
    calibration: Option<Calibration>,
}

impl<I2C: I2c> Qmp6988<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            address: DEFAULT_ADDRESS,
            calibration: None,
        }
    }

    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    /// Verify the chip id, reset the sensor, load its calibration and apply `config`
    pub async fn init(
        &mut self,
        delay: &mut impl DelayNs,
        config: Config,
    ) -> Result<(), Error<I2C::Error>> {
        let id = self.read_register(REG_CHIP_ID).await?;
        if id != CHIP_ID {
            return Err(Error::WrongChipId(id));
        }
        self.write_register(REG_RESET, RESET_COMMAND).await?;
        delay.delay_ms(20).await;
        self.write_register(REG_RESET, 0x00).await?;

        let mut otp = [0u8; CALIBRATION_LEN];
        self.i2c
            .write_read(self.address, &[REG_CALIBRATION], &mut otp)
            .await
            .map_err(Error::I2c)?;
        self.calibration = Some(Calibration::from_otp(&otp));

        self.configure(config).await
    }

    pub async fn configure(&mut self, config: Config) -> Result<(), Error<I2C::Error>> {
        self.write_register(REG_IIR_FILTER, config.filter as u8)
            .await?;
        self.write_register(REG_CTRL_MEAS, config.ctrl_meas()).await
    }

    pub async fn read(&mut self) -> Result<Reading, Error<I2C::Error>> {
        let calibration = self.calibration.ok_or(Error::NotInitialized)?;
        let mut raw = [0u8; 6];
        self.i2c
            .write_read(self.address, &[REG_DATA], &mut raw)
            .await
            .map_err(Error::I2c)?;
        Ok(calibration.compensate(&raw))
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

#[cfg(test)]
mod tests {
    use super::*;
    extern crate std;
    use embedded_hal_async::i2c::{ErrorKind, ErrorType, Operation};
    use matches::assert_matches;
    use std::vec::Vec;

    const OTP: [u8; CALIBRATION_LEN] = [
        0x4A, 0x3C, 0xE1, 0x9E, 0x2A, 0x50, 0x0C, 0x42, 0x19, 0x07, 0xE4, 0x2A, 0x1F, 0xA0, 0x06,
        0x30, 0xFC, 0x60, 0xF8, 0x3F, 0x1E, 0x8A, 0xF7, 0x09, 0x8B,
    ];

    struct NoDelay;

    impl DelayNs for NoDelay {
        async fn delay_ns(&mut self, _ns: u32) {}
    }

    /// Register file backed fake of the sensor
    struct FakeSensor {
        registers: [u8; 256],
        pointer: u8,
        writes: Vec<[u8; 2]>,
    }

    impl FakeSensor {
        fn new(chip_id: u8) -> Self {
            let mut registers = [0u8; 256];
            registers[REG_CHIP_ID as usize] = chip_id;
            registers[REG_CALIBRATION as usize..][..CALIBRATION_LEN].copy_from_slice(&OTP);
            registers[REG_DATA as usize..][..6]
                .copy_from_slice(&[0x7A, 0x5C, 0x3E, 0x6B, 0x2A, 0x10]);
            Self {
                registers,
                pointer: 0,
                writes: Vec::new(),
            }
        }
    }

    impl ErrorType for FakeSensor {
        type Error = ErrorKind;
    }

    impl I2c for FakeSensor {
        async fn transaction(
            &mut self,
            _address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            for op in operations {
                match op {
                    Operation::Write([register]) => self.pointer = *register,
                    Operation::Write([register, value]) => {
                        self.writes.push([*register, *value]);
                        self.registers[*register as usize] = *value;
                    }
                    Operation::Write(_) => return Err(ErrorKind::Other),
                    Operation::Read(buf) => {
                        let start = self.pointer as usize;
                        buf.copy_from_slice(&self.registers[start..start + buf.len()]);
                    }
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_zero_calibration_offsets() {
        let cal = Calibration::from_otp(&[0; CALIBRATION_LEN]);
        assert_eq!(cal.a1, -1_731_677_965);
        assert_eq!(cal.bp3, 157_155_561);
        assert_eq!(cal.temperature(0), 0);
        assert_eq!(cal.pressure(0, 0), 0);
    }

    #[test]
    fn test_sign_extension_of_20_bit_coefficients() {
        let cal = Calibration::from_otp(&OTP);
        assert_eq!(cal.a0, -31749);
        assert_eq!(cal.b00, 304_072);
        assert_eq!(cal.bt2, 3_681_061_621);
    }

    #[test]
    fn test_compensation_matches_reference_math() {
        let cal = Calibration::from_otp(&OTP);
        let tx = cal.temperature(0x6B2A10 - RAW_OFFSET);
        assert_eq!(tx, 6427);
        assert_eq!(cal.pressure(0x7A5C3E - RAW_OFFSET, tx), 95745);

        let tx = cal.temperature(0);
        assert_eq!(tx, -1985);
        assert_eq!(cal.pressure(0, tx), 301_607);
    }

    #[test]
    fn test_config_register_layout() {
        assert_eq!(Config::HIGH_PRECISION.ctrl_meas(), 0b011_110_11);
    }

    #[test]
    fn test_read_before_init_fails() {
        let mut sensor = Qmp6988::new(FakeSensor::new(CHIP_ID));
        let result = embassy_futures::block_on(sensor.read());
        assert_matches!(result, Err(Error::NotInitialized));
    }

    #[test]
    fn test_init_rejects_foreign_chip() {
        let mut sensor = Qmp6988::new(FakeSensor::new(0x58));
        let result = embassy_futures::block_on(sensor.init(&mut NoDelay, Config::default()));
        assert_matches!(result, Err(Error::WrongChipId(0x58)));
    }

    #[test]
    fn test_init_and_read() {
        let mut fake = FakeSensor::new(CHIP_ID);
        let mut sensor = Qmp6988::new(&mut fake);
        embassy_futures::block_on(sensor.init(&mut NoDelay, Config::HIGH_PRECISION)).unwrap();
        let reading = embassy_futures::block_on(sensor.read()).unwrap();
        assert_eq!(reading.temperature, 6427.0 / 256.0);
        assert_eq!(reading.pressure, 95745.0 / 16.0);
        assert_eq!(
            fake.writes,
            [
                [REG_RESET, RESET_COMMAND],
                [REG_RESET, 0x00],
                [REG_IIR_FILTER, Filter::Coefficient32 as u8],
                [REG_CTRL_MEAS, Config::HIGH_PRECISION.ctrl_meas()],
            ]
        );
    }
}
