use core::str::FromStr;

use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};

use crate::error::{DhtError, SetupError};
use crate::reader::DhtDriver;

/// Maximum time to wait (in microseconds) for the pin to change state.
///
/// Used to detect timeouts when waiting for the sensor to respond.
const TIMEOUT_US: u8 = 100;

/// Number of read attempts made by [`Dht::read_with_retry`] unless configured otherwise.
pub const DEFAULT_RETRIES: u8 = 15;

/// Pause between two read attempts. DHT22 parts cannot be sampled faster
/// than once every two seconds.
const RETRY_DELAY_MS: u32 = 2_000;

/// Supported members of the DHT sensor family.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChipModel {
    Dht11,
    Dht22,
    /// Wired DHT22 variant; same protocol and encoding.
    Am2302,
}

impl ChipModel {
    /// Name used in host configuration.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dht11 => "DHT11",
            Self::Dht22 => "DHT22",
            Self::Am2302 => "AM2302",
        }
    }

    /// How long the host holds the line low to wake the sensor.
    const fn start_low_ms(self) -> u32 {
        match self {
            Self::Dht11 => 18,
            Self::Dht22 | Self::Am2302 => 1,
        }
    }
}

impl FromStr for ChipModel {
    type Err = SetupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DHT11" => Ok(Self::Dht11),
            "DHT22" => Ok(Self::Dht22),
            "AM2302" => Ok(Self::Am2302),
            _ => Err(SetupError::UnsupportedSensor),
        }
    }
}

/// Bit-banged driver for DHT11, DHT22 and AM2302 sensors.
pub struct Dht<PIN, D> {
    pin: PIN,
    delay: D,
    retries: u8,
}

/// Measurement decoded from one successful transfer.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Measurement {
    /// Temperature in degrees Celsius.
    pub temperature: f32,
    /// Relative humidity in percent.
    pub relative_humidity: f32,
}

impl<PIN, DELAY, E> Dht<PIN, DELAY>
where
    PIN: InputPin<Error = E> + OutputPin<Error = E>,
    DELAY: DelayNs,
{
    /// Creates a new driver instance.
    ///
    /// # Arguments
    ///
    /// * `pin` - The GPIO pin connected to the sensor data line. Must support both input and output.
    /// * `delay` - A delay provider implementing the `DelayNs` trait.
    pub fn new(pin: PIN, delay: DELAY) -> Self {
        Dht {
            pin,
            delay,
            retries: DEFAULT_RETRIES,
        }
    }

    /// Sets how many attempts [`Dht::read_with_retry`] makes. Zero is treated as one.
    pub fn with_retries(mut self, retries: u8) -> Self {
        self.retries = retries.max(1);
        self
    }

    /// Reads a temperature and humidity measurement from the sensor.
    ///
    /// This method performs the complete communication sequence:
    /// sending a start signal, waiting for the sensor's response,
    /// reading 5 bytes, validating the checksum, and decoding the result
    /// according to `model`.
    ///
    /// # Returns
    ///
    /// * `Ok(Measurement)` if the read is successful and the checksum is valid.
    /// * `Err(DhtError)` if a communication or checksum error occurs.
    pub fn read(&mut self, model: ChipModel) -> Result<Measurement, DhtError<E>> {
        self.start(model)?;

        let mut data = [0; 4];

        for b in data.iter_mut() {
            *b = self.read_byte()?;
        }

        let checksum = self.read_byte()?;
        if data.iter().fold(0u8, |sum, v| sum.wrapping_add(*v)) != checksum {
            Err(DhtError::ChecksumMismatch)
        } else {
            Ok(parse_data(model, data))
        }
    }

    /// Reads the sensor, retrying with a two second pause until a transfer
    /// succeeds or the configured number of attempts is used up.
    ///
    /// Returns the error of the last attempt when every attempt failed.
    pub fn read_with_retry(&mut self, model: ChipModel) -> Result<Measurement, DhtError<E>> {
        let mut attempt = 1;
        loop {
            match self.read(model) {
                Ok(measurement) => return Ok(measurement),
                Err(e) if attempt >= self.retries => return Err(e),
                Err(_) => {
                    log::debug!(
                        "{} read attempt {}/{} failed, retrying",
                        model.as_str(),
                        attempt,
                        self.retries
                    );
                    attempt += 1;
                    self.delay.delay_ms(RETRY_DELAY_MS);
                }
            }
        }
    }

    /// Sends the start signal and waits for the sensor's response.
    ///
    /// This includes pulling the line low (18 ms for DHT11, 1 ms otherwise),
    /// then high, followed by waiting for the sensor's 80us low
    /// and 80us high response.
    fn start(&mut self, model: ChipModel) -> Result<(), DhtError<E>> {
        // MCU sends start request
        self.pin.set_low()?;
        self.delay.delay_ms(model.start_low_ms());
        self.pin.set_high()?;
        self.delay.delay_us(40);

        // Waiting for sensor response
        self.wait_for_low()?; // 80us
        self.wait_for_high()?; // 80us
        Ok(())
    }

    /// Reads one byte (8 bits) from the sensor, MSB first.
    fn read_byte(&mut self) -> Result<u8, DhtError<E>> {
        let mut byte: u8 = 0;

        for i in 0..8 {
            let bit_mask = 1 << (7 - i);
            if self.read_bit()? {
                byte |= bit_mask;
            }
        }

        Ok(byte)
    }

    /// Reads a single bit from the sensor.
    ///
    /// The bit is determined by the duration of the high signal
    /// after the sensor pulls the line low.
    fn read_bit(&mut self) -> Result<bool, DhtError<E>> {
        self.wait_for_low()?; // ~50us
        self.wait_for_high()?;

        // Sample ~35us into the high phase: still high means 1
        self.delay.delay_us(35);
        let bit_is_one = self.pin.is_high()?;
        self.wait_for_low()?;

        Ok(bit_is_one)
    }

    fn wait_for_high(&mut self) -> Result<(), DhtError<E>> {
        Self::wait_for_state(&mut self.delay, || self.pin.is_high())
    }

    fn wait_for_low(&mut self) -> Result<(), DhtError<E>> {
        Self::wait_for_state(&mut self.delay, || self.pin.is_low())
    }

    /// Polls `condition` once per microsecond until it holds.
    ///
    /// # Errors
    ///
    /// Returns `DhtError::Timeout` if the timeout is exceeded
    fn wait_for_state<F>(delay: &mut DELAY, mut condition: F) -> Result<(), DhtError<E>>
    where
        F: FnMut() -> Result<bool, E>,
    {
        for _ in 0..TIMEOUT_US {
            if condition()? {
                return Ok(());
            }
            delay.delay_us(1);
        }
        Err(DhtError::Timeout)
    }
}

/// Decodes the four payload bytes.
///
/// DHT22/AM2302 send tenths as 16-bit big endian words with the sign in the
/// top bit of the temperature word. DHT11 sends an integral byte followed by
/// a tenths byte, with the sign in the top bit of the temperature tenths.
fn parse_data(model: ChipModel, data: [u8; 4]) -> Measurement {
    let [hum_hi, hum_lo, temp_hi, temp_lo] = data;

    match model {
        ChipModel::Dht11 => {
            let relative_humidity = hum_hi as f32 + hum_lo as f32 / 10.0;
            let mut temperature = temp_hi as f32 + (temp_lo & 0b0111_1111) as f32 / 10.0;
            if (temp_lo >> 7) != 0 {
                temperature = -temperature;
            }
            Measurement {
                temperature,
                relative_humidity,
            }
        }
        ChipModel::Dht22 | ChipModel::Am2302 => {
            let joined_humidity = u16::from_be_bytes([hum_hi, hum_lo]);
            let relative_humidity = joined_humidity as f32 / 10.0;

            let is_temp_negative = (temp_hi >> 7) != 0;
            let joined_temp = u16::from_be_bytes([temp_hi & 0b0111_1111, temp_lo]);
            let mut temperature = joined_temp as f32 / 10.0;
            if is_temp_negative {
                temperature = -temperature;
            }
            Measurement {
                temperature,
                relative_humidity,
            }
        }
    }
}

impl<PIN, DELAY, E> DhtDriver for Dht<PIN, DELAY>
where
    PIN: InputPin<Error = E> + OutputPin<Error = E>,
    DELAY: DelayNs,
    E: core::fmt::Debug,
{
    type Error = DhtError<E>;

    /// The GPIO line is bound when the driver is built; `pin` only labels it.
    fn read_retry(
        &mut self,
        model: ChipModel,
        _pin: &str,
    ) -> Result<(Option<f32>, Option<f32>), Self::Error> {
        let m = self.read_with_retry(model)?;
        Ok((Some(m.relative_humidity), Some(m.temperature)))
    }
}
