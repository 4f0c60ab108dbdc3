//! Median-filtered view of one quantity measured by a shared [`HardwareReader`].

use core::cell::RefCell;
use core::fmt;

use serde::Deserialize;

use crate::reader::{Clock, DhtDriver, HardwareReader, Reading};
use crate::error::SetupError;
use crate::window::RollingWindow;

/// Accepted temperature range in degrees Celsius, lower bound inclusive.
const TEMPERATURE_RANGE_C: core::ops::Range<f32> = -20.0..80.0;

/// Accepted relative humidity range in percent.
const HUMIDITY_RANGE: core::ops::RangeInclusive<f32> = 0.0..=100.0;

/// Physical quantity a [`FilteredSensor`] reports.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantity {
    Temperature,
    Humidity,
}

impl Quantity {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Temperature => "Temperature",
            Self::Humidity => "Humidity",
        }
    }

    /// Unit the value is displayed in. Humidity is always a percentage.
    pub const fn unit(self, temperature_unit: TemperatureUnit) -> Unit {
        match self {
            Self::Temperature => match temperature_unit {
                TemperatureUnit::Celsius => Unit::Celsius,
                TemperatureUnit::Fahrenheit => Unit::Fahrenheit,
            },
            Self::Humidity => Unit::Percent,
        }
    }

    fn select(self, reading: &Reading) -> Option<f32> {
        match self {
            Self::Temperature => reading.temperature,
            Self::Humidity => reading.humidity,
        }
    }
}

/// Host-selected temperature display unit.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum TemperatureUnit {
    #[default]
    #[serde(alias = "°C", alias = "C")]
    Celsius,
    #[serde(alias = "°F", alias = "F")]
    Fahrenheit,
}

/// Unit of measurement of a sensor value.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unit {
    Celsius,
    Fahrenheit,
    Percent,
}

impl Unit {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
            Self::Percent => "%",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Rounds to one decimal place, half away from zero.
pub(crate) fn round1(value: f32) -> f32 {
    libm::roundf(value * 10.0) / 10.0
}

pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Display name of a sensor: the configured device name followed by the
/// quantity label, e.g. `DHT Sensor Temperature`.
#[derive(Clone, Copy, Debug)]
pub struct SensorName<'a> {
    client: &'a str,
    quantity: Quantity,
}

impl fmt::Display for SensorName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.client, self.quantity.label())
    }
}

/// One quantity of a DHT sensor, smoothed with a rolling lower median.
///
/// Each [`update`](Self::update) polls the shared reader, validates the
/// sample and pushes it into the window. The displayed value only changes
/// when the window holds exactly `median_count` samples, and only becomes
/// unknown once repeated no-data cycles have emptied the window.
pub struct FilteredSensor<'r, D, C> {
    reader: &'r RefCell<HardwareReader<D, C>>,
    client_name: &'r str,
    quantity: Quantity,
    temperature_unit: TemperatureUnit,
    window: RollingWindow,
    state: Option<f32>,
}

impl<'r, D: DhtDriver, C: Clock> FilteredSensor<'r, D, C> {
    /// Fails with [`SetupError::InvalidMedian`] unless `median_count` is odd
    /// and within `1..=MAX_MEDIAN_COUNT`.
    pub fn new(
        reader: &'r RefCell<HardwareReader<D, C>>,
        client_name: &'r str,
        quantity: Quantity,
        temperature_unit: TemperatureUnit,
        median_count: usize,
    ) -> Result<Self, SetupError> {
        Ok(Self {
            reader,
            client_name,
            quantity,
            temperature_unit,
            window: RollingWindow::new(median_count)?,
            state: None,
        })
    }

    pub fn name(&self) -> SensorName<'r> {
        SensorName {
            client: self.client_name,
            quantity: self.quantity,
        }
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn unit(&self) -> Unit {
        self.quantity.unit(self.temperature_unit)
    }

    /// Current filtered value, `None` while unknown.
    pub fn displayed_value(&self) -> Option<f32> {
        self.state
    }

    pub fn window(&self) -> &RollingWindow {
        &self.window
    }

    pub fn median_count(&self) -> usize {
        self.window.capacity()
    }

    /// Changes the window size at runtime, keeping the newest samples.
    ///
    /// Rejects the same counts as [`new`](Self::new) and then leaves the
    /// sensor unchanged.
    pub fn set_median_count(&mut self, median_count: usize) -> Result<(), SetupError> {
        self.window.resize(median_count)?;
        self.recompute();
        Ok(())
    }

    /// Polls the reader and folds the result into the filtered value.
    pub fn update(&mut self) {
        log::debug!("Polling data for {}", self.name());
        let reading = match self.reader.try_borrow_mut() {
            Ok(mut reader) => reader.poll(),
            Err(_) => {
                log::warn!("{}: reader busy, skipping poll", self.name());
                Reading::default()
            }
        };

        let Some(raw) = self.quantity.select(&reading) else {
            if reading.is_empty() {
                log::info!("Did not receive any data from DHT sensor {}", self.name());
            } else {
                log::info!("{}: reading has no {} value", self.name(), self.quantity.label());
            }
            self.decay();
            return;
        };
        log::debug!("{} = {:?}", self.name(), reading);

        let Some(sample) = self.accept(raw) else {
            log::debug!("{}: discarding implausible sample {}", self.name(), raw);
            return;
        };
        self.window.push(sample);
        self.recompute();
    }

    /// Rounds and range-checks a raw sample, converting temperature to the
    /// display unit. The range check always uses the Celsius value.
    fn accept(&self, raw: f32) -> Option<f32> {
        let value = round1(raw);
        match self.quantity {
            Quantity::Temperature if TEMPERATURE_RANGE_C.contains(&value) => {
                Some(match self.temperature_unit {
                    TemperatureUnit::Celsius => value,
                    TemperatureUnit::Fahrenheit => round1(celsius_to_fahrenheit(value)),
                })
            }
            Quantity::Humidity if HUMIDITY_RANGE.contains(&value) => Some(value),
            _ => None,
        }
    }

    fn decay(&mut self) {
        if self.window.decay().is_none() {
            self.state = None;
        }
    }

    fn recompute(&mut self) {
        match self.window.median() {
            Some(median) => {
                log::debug!("Median is: {}", median);
                self.state = Some(median);
            }
            None => log::debug!("Not yet enough data for median calculation"),
        }
    }
}
