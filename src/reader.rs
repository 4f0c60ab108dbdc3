//! Throttled access to one physical sensor.
//!
//! Every quantity read from the same chip goes through a single
//! [`HardwareReader`], so the chip is polled at most once per throttle
//! interval no matter how many sensors consume its data.

use core::fmt;

use heapless::String;

use crate::dht::ChipModel;

/// Default minimum time between two physical reads.
pub const MIN_TIME_BETWEEN_UPDATES_MS: u64 = 30_000;

/// Longest GPIO pin identifier accepted in configuration.
pub const PIN_ID_LEN: usize = 16;

/// One poll worth of data. `None` means the driver produced no usable
/// value for that quantity.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Reading {
    /// Relative humidity in percent.
    pub humidity: Option<f32>,
    /// Temperature in degrees Celsius.
    pub temperature: Option<f32>,
}

impl Reading {
    /// True when the poll produced neither quantity, e.g. after a driver
    /// failure.
    pub fn is_empty(&self) -> bool {
        self.humidity.is_none() && self.temperature.is_none()
    }
}

/// Hardware access used by [`HardwareReader`].
///
/// Implementations perform their own retries and return
/// `(humidity, temperature)`, either of which may be missing.
pub trait DhtDriver {
    type Error: fmt::Debug;

    fn read_retry(
        &mut self,
        model: ChipModel,
        pin: &str,
    ) -> Result<(Option<f32>, Option<f32>), Self::Error>;
}

/// Monotonic millisecond time source.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

impl<F: Fn() -> u64> Clock for F {
    fn now_ms(&self) -> u64 {
        self()
    }
}

/// Wraps a [`DhtDriver`], throttles physical reads and caches the last
/// known value of each quantity.
pub struct HardwareReader<D, C> {
    driver: D,
    clock: C,
    model: ChipModel,
    pin: String<PIN_ID_LEN>,
    min_interval_ms: u64,
    last_read_ms: Option<u64>,
    cache: Reading,
}

impl<D: DhtDriver, C: Clock> HardwareReader<D, C> {
    pub fn new(driver: D, clock: C, model: ChipModel, pin: String<PIN_ID_LEN>) -> Self {
        Self {
            driver,
            clock,
            model,
            pin,
            min_interval_ms: MIN_TIME_BETWEEN_UPDATES_MS,
            last_read_ms: None,
            cache: Reading::default(),
        }
    }

    pub fn with_min_interval_ms(mut self, min_interval_ms: u64) -> Self {
        self.min_interval_ms = min_interval_ms;
        self
    }

    pub fn model(&self) -> ChipModel {
        self.model
    }

    pub fn pin(&self) -> &str {
        &self.pin
    }

    /// Last cached reading, without touching the hardware.
    pub fn cached(&self) -> Reading {
        self.cache
    }

    /// Returns the cached reading, refreshing it from the hardware first if
    /// the throttle interval has passed since the last successful read.
    ///
    /// A failed hardware read is logged and yields an empty [`Reading`] for
    /// this call only; the cache and the throttle timestamp are kept, so the
    /// next call tries the hardware again.
    pub fn poll(&mut self) -> Reading {
        let now = self.clock.now_ms();
        let due = match self.last_read_ms {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.min_interval_ms,
        };
        if !due {
            log::debug!("{} on pin {} throttled, using cached data", self.model.as_str(), self.pin);
            return self.cache;
        }
        self.refresh(now)
    }

    /// Reads the hardware regardless of the throttle.
    pub fn force_poll(&mut self) -> Reading {
        let now = self.clock.now_ms();
        self.refresh(now)
    }

    fn refresh(&mut self, now: u64) -> Reading {
        match self.driver.read_retry(self.model, &self.pin) {
            Ok((humidity, temperature)) => {
                // Zero counts as missing: the driver reports failed fields as 0.
                if let Some(t) = temperature.filter(|t| *t != 0.0) {
                    self.cache.temperature = Some(t);
                }
                if let Some(h) = humidity.filter(|h| *h != 0.0) {
                    self.cache.humidity = Some(h);
                }
                self.last_read_ms = Some(now);
                self.cache
            }
            Err(e) => {
                log::warn!(
                    "Polling error on {} pin {}: {:?}",
                    self.model.as_str(),
                    self.pin,
                    e
                );
                Reading::default()
            }
        }
    }
}
