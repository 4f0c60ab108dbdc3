//! Host configuration for one DHT sensor.
//!
//! Deserializes without an allocator; strings and lists are `heapless`.

use core::fmt;

use heapless::{String, Vec};
use serde::de::{self, Deserializer, IntoDeserializer, SeqAccess, Visitor};
use serde::Deserialize;

use crate::dht::ChipModel;
use crate::error::SetupError;
use crate::reader::{MIN_TIME_BETWEEN_UPDATES_MS, PIN_ID_LEN};
use crate::sensor::{Quantity, TemperatureUnit};
use crate::window::{DEFAULT_MEDIAN_COUNT, check_median_count};

/// Longest accepted device name.
pub const NAME_LEN: usize = 32;

const DEFAULT_NAME: &str = "DHT Sensor";

/// Platform configuration as provided by the host.
#[derive(Debug, Clone, Deserialize)]
pub struct DhtConfig {
    /// Chip model name: `DHT11`, `DHT22` or `AM2302`.
    pub sensor: String<8>,
    /// GPIO pin identifier.
    pub pin: String<PIN_ID_LEN>,
    /// Rolling median window size. 3 filters single outliers, 5 double
    /// outliers, 1 disables filtering.
    #[serde(default = "default_median")]
    pub median: u8,
    /// Quantities to expose. Empty means no sensors are created. Accepts a
    /// single name or a list; repeated entries are kept once.
    #[serde(default, deserialize_with = "unique_quantities")]
    pub monitored_conditions: Vec<Quantity, 2>,
    #[serde(default = "default_name")]
    pub name: String<NAME_LEN>,
    #[serde(default)]
    pub temperature_unit: TemperatureUnit,
    #[serde(default = "default_min_time_between_updates_secs")]
    pub min_time_between_updates_secs: u32,
}

fn default_median() -> u8 {
    DEFAULT_MEDIAN_COUNT as u8
}

fn default_name() -> String<NAME_LEN> {
    let mut name = String::new();
    // DEFAULT_NAME fits in NAME_LEN.
    let _ = name.push_str(DEFAULT_NAME);
    name
}

fn default_min_time_between_updates_secs() -> u32 {
    (MIN_TIME_BETWEEN_UPDATES_MS / 1000) as u32
}

fn unique_quantities<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<Quantity, 2>, D::Error> {
    struct UniqueQuantities;

    impl<'de> Visitor<'de> for UniqueQuantities {
        type Value = Vec<Quantity, 2>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a monitored condition or a list of them")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            let name: de::value::StrDeserializer<'_, E> = v.into_deserializer();
            let mut quantities = Vec::new();
            let _ = quantities.push(Quantity::deserialize(name)?);
            Ok(quantities)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut quantities: Vec<Quantity, 2> = Vec::new();
            while let Some(quantity) = seq.next_element::<Quantity>()? {
                if !quantities.contains(&quantity) {
                    // Only two quantities exist, so a deduplicated list always fits.
                    let _ = quantities.push(quantity);
                }
            }
            Ok(quantities)
        }
    }

    deserializer.deserialize_any(UniqueQuantities)
}

impl DhtConfig {
    /// Minimal configuration with defaults for every optional field.
    ///
    /// Overlong `sensor` or `pin` values are rejected as unsupported or missing.
    pub fn new(sensor: &str, pin: &str) -> Self {
        Self {
            sensor: String::try_from(sensor).unwrap_or_default(),
            pin: String::try_from(pin).unwrap_or_default(),
            median: default_median(),
            monitored_conditions: Vec::new(),
            name: default_name(),
            temperature_unit: TemperatureUnit::default(),
            min_time_between_updates_secs: default_min_time_between_updates_secs(),
        }
    }

    /// Adds `quantity` to the monitored set, ignoring duplicates.
    pub fn monitor(mut self, quantity: Quantity) -> Self {
        if !self.monitored_conditions.contains(&quantity) {
            // Only two quantities exist, so this always fits.
            let _ = self.monitored_conditions.push(quantity);
        }
        self
    }

    /// Checks the configuration and resolves the chip model.
    pub fn validate(&self) -> Result<ChipModel, SetupError> {
        let model = self.sensor.parse::<ChipModel>()?;
        if self.pin.is_empty() {
            return Err(SetupError::MissingPin);
        }
        check_median_count(self.median as usize)?;
        if self.min_time_between_updates_secs == 0 {
            return Err(SetupError::InvalidInterval);
        }
        Ok(model)
    }

    pub fn min_interval_ms(&self) -> u64 {
        u64::from(self.min_time_between_updates_secs) * 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_minimal_json() {
        let c: DhtConfig = serde_json::from_str(r#"{"sensor": "DHT22", "pin": "4"}"#).unwrap();
        assert_eq!(c.median, 3);
        assert_eq!(c.name.as_str(), "DHT Sensor");
        assert!(c.monitored_conditions.is_empty());
        assert_eq!(c.temperature_unit, TemperatureUnit::Celsius);
        assert_eq!(c.min_interval_ms(), 30_000);
        assert_eq!(c.validate(), Ok(ChipModel::Dht22));
    }

    #[test]
    fn full_json() {
        let c: DhtConfig = serde_json::from_str(
            r#"{
                "sensor": "AM2302",
                "pin": "GPIO17",
                "median": 5,
                "monitored_conditions": ["temperature", "humidity"],
                "name": "Greenhouse",
                "temperature_unit": "°F",
                "min_time_between_updates_secs": 10
            }"#,
        )
        .unwrap();
        assert_eq!(c.validate(), Ok(ChipModel::Am2302));
        assert_eq!(
            c.monitored_conditions.as_slice(),
            [Quantity::Temperature, Quantity::Humidity]
        );
        assert_eq!(c.temperature_unit, TemperatureUnit::Fahrenheit);
        assert_eq!(c.min_interval_ms(), 10_000);
    }

    #[test]
    fn unknown_condition_is_rejected() {
        let c = serde_json::from_str::<DhtConfig>(
            r#"{"sensor": "DHT22", "pin": "4", "monitored_conditions": ["pressure"]}"#,
        );
        assert!(c.is_err());
    }

    #[test]
    fn repeated_conditions_are_kept_once() {
        let c: DhtConfig = serde_json::from_str(
            r#"{"sensor": "DHT22", "pin": "4",
                "monitored_conditions": ["temperature", "temperature", "humidity", "humidity"]}"#,
        )
        .unwrap();
        assert_eq!(
            c.monitored_conditions.as_slice(),
            [Quantity::Temperature, Quantity::Humidity]
        );
    }

    #[test]
    fn single_condition_string_is_a_list() {
        let c: DhtConfig = serde_json::from_str(
            r#"{"sensor": "DHT22", "pin": "4", "monitored_conditions": "humidity"}"#,
        )
        .unwrap();
        assert_eq!(c.monitored_conditions.as_slice(), [Quantity::Humidity]);
    }

    #[test]
    fn validation_errors() {
        assert_eq!(
            DhtConfig::new("DHT33", "4").validate(),
            Err(SetupError::UnsupportedSensor)
        );
        assert_eq!(
            DhtConfig::new("DHT11", "").validate(),
            Err(SetupError::MissingPin)
        );

        let mut c = DhtConfig::new("DHT11", "4");
        c.median = 4;
        assert_eq!(c.validate(), Err(SetupError::InvalidMedian(4)));
        c.median = 0;
        assert_eq!(c.validate(), Err(SetupError::InvalidMedian(0)));
        c.median = 17;
        assert_eq!(c.validate(), Err(SetupError::InvalidMedian(17)));
        c.median = 1;
        c.min_time_between_updates_secs = 0;
        assert_eq!(c.validate(), Err(SetupError::InvalidInterval));
    }

    #[test]
    fn monitor_ignores_duplicates() {
        let c = DhtConfig::new("DHT22", "4")
            .monitor(Quantity::Humidity)
            .monitor(Quantity::Humidity);
        assert_eq!(c.monitored_conditions.len(), 1);
    }
}
