use core::cell::Cell;
use core::fmt::{Debug, Write};

use embassy_sync::blocking_mutex::{Mutex, raw::CriticalSectionRawMutex};
use embassy_time::{Duration, Ticker, Timer};
use embedded_hal_async::{delay::DelayNs, i2c::I2c};
use log::{error, info};
use unit_env::{EnvReading, UnitEnv, UnitEnvError};

use crate::cli::StatusReport;
use crate::running_average::RunningAverage;
use crate::status_led::StatusBoard;
use crate::system_settings::log_toggles::{LogChannel, LogToggleReceiver, may_log};

pub const FIRST_MEASUREMENT_DELAY: Duration = Duration::from_secs(1);
pub const MEASUREMENT_INTERVAL: Duration = Duration::from_secs(3);
pub const AVERAGE_WINDOW: u16 = 10;

/// Anything that can deliver temperature (°C), humidity (%RH) and pressure (Pa)
pub trait EnvSensor {
    type Error: Debug;

    fn read(&mut self) -> impl core::future::Future<Output = Result<EnvReading, Self::Error>>;
}

impl<T, P, D, E> EnvSensor for UnitEnv<T, P, D>
where
    T: I2c<Error = E>,
    P: I2c<Error = E>,
    D: DelayNs,
    E: Debug,
{
    type Error = UnitEnvError<E>;

    async fn read(&mut self) -> Result<EnvReading, Self::Error> {
        UnitEnv::read(self).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Snapshot {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub pressure_hpa: f32,
    /// Number of successful measurements so far
    pub samples: u32,
}

impl Snapshot {
    /// Render the values as the global variables the index page reads
    pub fn write_script<W: Write + ?Sized>(&self, out: &mut W) -> core::fmt::Result {
        writeln!(out, "var temperatureValue = {:.2};", self.temperature_c)?;
        writeln!(out, "var humidityValue = {:.2};", self.humidity_pct)?;
        writeln!(out, "var pressureValue = {:.2};", self.pressure_hpa)
    }
}

pub struct Averages {
    temperature: RunningAverage,
    humidity: RunningAverage,
    pressure: RunningAverage,
    samples: u32,
}

impl Averages {
    pub const fn new() -> Self {
        Self {
            temperature: RunningAverage::growing(AVERAGE_WINDOW),
            humidity: RunningAverage::growing(AVERAGE_WINDOW),
            pressure: RunningAverage::growing(AVERAGE_WINDOW),
            samples: 0,
        }
    }

    /// A reading without pressure leaves the pressure average where it was
    pub fn add(&mut self, reading: &EnvReading) -> Snapshot {
        self.samples = self.samples.saturating_add(1);
        let pressure = match reading.pressure {
            Some(pressure) => self.pressure.add(pressure),
            None => self.pressure.value(),
        };
        Snapshot {
            temperature_c: self.temperature.add(reading.temperature),
            humidity_pct: self.humidity.add(reading.humidity),
            pressure_hpa: pressure / 100.0,
            samples: self.samples,
        }
    }
}

impl Default for Averages {
    fn default() -> Self {
        Self::new()
    }
}

/// Latest averaged values, shared between the measurement task and the HTTP server
pub struct LatestSnapshot {
    inner: Mutex<CriticalSectionRawMutex, Cell<Snapshot>>,
}

impl LatestSnapshot {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(Snapshot {
                temperature_c: 0.0,
                humidity_pct: 0.0,
                pressure_hpa: 0.0,
                samples: 0,
            })),
        }
    }

    pub fn get(&self) -> Snapshot {
        self.inner.lock(|s| s.get())
    }

    pub fn set(&self, snapshot: Snapshot) {
        self.inner.lock(|s| s.set(snapshot));
    }
}

impl Default for LatestSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// What the `status` console command prints on the web monitor
pub struct MonitorStatus {
    pub latest: &'static LatestSnapshot,
    pub board: &'static StatusBoard,
}

impl StatusReport for MonitorStatus {
    fn report(&self, out: &mut dyn Write) -> core::fmt::Result {
        let snapshot = self.latest.get();
        writeln!(out, "LED status: {:?}", self.board.status())?;
        writeln!(out, "WiFi link up: {}", self.board.link_up())?;
        writeln!(out, "Measurements: {}", snapshot.samples)?;
        snapshot.write_script(out)
    }
}

/// A single measurement cycle. On a failed read the averages stay untouched.
pub async fn measure_once<S: EnvSensor>(
    sensor: &mut S,
    averages: &mut Averages,
    latest: &LatestSnapshot,
    board: &StatusBoard,
    log_receiver: &mut LogToggleReceiver,
) -> Option<Snapshot> {
    board.set_measuring(true);
    let reading = sensor.read().await;
    board.set_measuring(false);

    let reading = match reading {
        Ok(reading) => reading,
        Err(e) => {
            error!("Sensor read failed, skipping this cycle: {e:?}");
            return None;
        }
    };
    may_log(log_receiver, LogChannel::Measure, || match reading.pressure {
        Some(pressure) => info!(
            "Measure: {:.2} °C, {:.2} %RH, {:.2} Pa",
            reading.temperature, reading.humidity, pressure
        ),
        None => info!(
            "Measure: {:.2} °C, {:.2} %RH, no pressure",
            reading.temperature, reading.humidity
        ),
    })
    .await;

    let snapshot = averages.add(&reading);
    latest.set(snapshot);
    Some(snapshot)
}

/// First measurement one second after start, then every three seconds
pub async fn run_monitor<S: EnvSensor>(
    mut sensor: S,
    latest: &LatestSnapshot,
    board: &StatusBoard,
    mut log_receiver: LogToggleReceiver,
) -> ! {
    let mut averages = Averages::new();
    Timer::after(FIRST_MEASUREMENT_DELAY).await;
    let mut ticker = Ticker::every(MEASUREMENT_INTERVAL);
    loop {
        measure_once(&mut sensor, &mut averages, latest, board, &mut log_receiver).await;
        ticker.next().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    extern crate std;
    use crate::system_settings::log_toggles::{LogChannelToggles, LogToggleWatcher, LogToggles};
    use embassy_sync::watch::Watch;
    use std::collections::VecDeque;

    struct FakeSensor {
        readings: VecDeque<Result<EnvReading, ()>>,
    }

    impl EnvSensor for FakeSensor {
        type Error = ();

        async fn read(&mut self) -> Result<EnvReading, Self::Error> {
            self.readings.pop_front().unwrap_or(Err(()))
        }
    }

    fn reading(temperature: f32, humidity: f32, pressure: f32) -> Result<EnvReading, ()> {
        Ok(EnvReading {
            temperature,
            humidity,
            pressure: Some(pressure),
        })
    }

    fn receiver() -> LogToggleReceiver {
        static WATCH: LogToggleWatcher<CriticalSectionRawMutex, 4> = Watch::new();
        WATCH.dyn_sender().send(LogToggles {
            active: false,
            config: LogChannelToggles::all(false),
        });
        WATCH.dyn_receiver().unwrap()
    }

    #[test]
    fn test_script_format() {
        let snapshot = Snapshot {
            temperature_c: 21.374,
            humidity_pct: 45.1,
            pressure_hpa: 1013.25,
            samples: 1,
        };
        let mut out = heapless::String::<128>::new();
        snapshot.write_script(&mut out).unwrap();
        assert_eq!(
            out.as_str(),
            "var temperatureValue = 21.37;\nvar humidityValue = 45.10;\nvar pressureValue = 1013.25;\n"
        );
    }

    #[test]
    fn test_failed_read_keeps_previous_values() {
        let mut sensor = FakeSensor {
            readings: [
                reading(20.0, 40.0, 100_000.0),
                Err(()),
                reading(22.0, 50.0, 101_000.0),
            ]
            .into(),
        };
        let mut averages = Averages::new();
        let latest = LatestSnapshot::new();
        let board = StatusBoard::new();
        let mut log_receiver = receiver();

        let mut cycle = || {
            embassy_futures::block_on(measure_once(
                &mut sensor,
                &mut averages,
                &latest,
                &board,
                &mut log_receiver,
            ))
        };
        let first = cycle().unwrap();
        assert_eq!(first.pressure_hpa, 1000.0);
        assert!(cycle().is_none());
        assert_eq!(latest.get(), first);
        let third = cycle().unwrap();
        assert_eq!(third.samples, 2);
        assert!((third.temperature_c - 21.0).abs() < 1e-4);
        assert!((third.pressure_hpa - 1005.0).abs() < 1e-2);
        assert_eq!(latest.get(), third);
        assert_eq!(board.status(), crate::status_led::LedStatus::Error);
    }

    #[test]
    fn test_missing_pressure_keeps_publishing_climate() {
        let mut sensor = FakeSensor {
            readings: [
                Ok(EnvReading {
                    temperature: 20.0,
                    humidity: 40.0,
                    pressure: None,
                }),
                reading(22.0, 50.0, 101_000.0),
                Ok(EnvReading {
                    temperature: 24.0,
                    humidity: 60.0,
                    pressure: None,
                }),
            ]
            .into(),
        };
        let mut averages = Averages::new();
        let latest = LatestSnapshot::new();
        let board = StatusBoard::new();
        let mut log_receiver = receiver();

        let mut cycle = || {
            embassy_futures::block_on(measure_once(
                &mut sensor,
                &mut averages,
                &latest,
                &board,
                &mut log_receiver,
            ))
        };
        let first = cycle().unwrap();
        assert_eq!(first.temperature_c, 20.0);
        assert_eq!(first.humidity_pct, 40.0);
        assert_eq!(first.pressure_hpa, 0.0);
        assert_eq!(cycle().unwrap().pressure_hpa, 1010.0);
        let third = cycle().unwrap();
        assert!((third.temperature_c - 22.0).abs() < 1e-4);
        assert_eq!(third.pressure_hpa, 1010.0);
        assert_eq!(latest.get(), third);
    }
}
