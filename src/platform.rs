use core::cell::RefCell;

use heapless::Vec;

use crate::config::DhtConfig;
use crate::error::SetupError;
use crate::reader::{Clock, DhtDriver, HardwareReader};
use crate::sensor::FilteredSensor;

/// One configured DHT chip: owns the shared [`HardwareReader`] and hands out
/// a [`FilteredSensor`] per monitored quantity.
pub struct DhtPlatform<D, C> {
    config: DhtConfig,
    reader: RefCell<HardwareReader<D, C>>,
}

impl<D: DhtDriver, C: Clock> DhtPlatform<D, C> {
    /// Validates `config` and builds the reader.
    ///
    /// Fails if the chip model is unsupported or a parameter is invalid;
    /// nothing is read from the hardware here.
    pub fn setup(config: DhtConfig, driver: D, clock: C) -> Result<Self, SetupError> {
        let model = config.validate().inspect_err(|e| log::error!("{}", e))?;
        let reader = HardwareReader::new(driver, clock, model, config.pin.clone())
            .with_min_interval_ms(config.min_interval_ms());
        log::debug!(
            "{} on pin {}: median of {}, monitoring {} quantities",
            model.as_str(),
            config.pin,
            config.median,
            config.monitored_conditions.len()
        );
        Ok(Self {
            config,
            reader: RefCell::new(reader),
        })
    }

    pub fn config(&self) -> &DhtConfig {
        &self.config
    }

    pub fn reader(&self) -> &RefCell<HardwareReader<D, C>> {
        &self.reader
    }

    /// Creates the sensors in configuration order and runs one initial
    /// update on each, as the host does when an entity is added.
    pub fn sensors(&self) -> Result<Vec<FilteredSensor<'_, D, C>, 2>, SetupError> {
        self.config
            .monitored_conditions
            .iter()
            .map(|quantity| {
                let mut sensor = FilteredSensor::new(
                    &self.reader,
                    &self.config.name,
                    *quantity,
                    self.config.temperature_unit,
                    self.config.median as usize,
                )?;
                sensor.update();
                Ok(sensor)
            })
            .collect()
    }
}
