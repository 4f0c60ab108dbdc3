use core::fmt;

/// Possible errors from the DHT driver.
#[derive(Debug, PartialEq, Eq)]
pub enum DhtError<E> {
    /// Timed out waiting for a pin state change.
    Timeout,
    /// Checksum did not match the received data.
    ChecksumMismatch,
    /// Error from the GPIO pin (input/output).
    PinError(E),
}

impl<E> From<E> for DhtError<E> {
    fn from(value: E) -> Self {
        Self::PinError(value)
    }
}

impl<E: fmt::Debug> fmt::Display for DhtError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timed out waiting for the sensor"),
            Self::ChecksumMismatch => write!(f, "checksum mismatch"),
            Self::PinError(e) => write!(f, "GPIO error: {e:?}"),
        }
    }
}

/// Configuration problems reported to the host when the platform is set up.
///
/// These never occur on the per-cycle update path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    /// The configured chip model is not one of DHT11, DHT22 or AM2302.
    UnsupportedSensor,
    /// The median count must be odd and within `1..=MAX_MEDIAN_COUNT`.
    InvalidMedian(usize),
    /// No GPIO pin was configured.
    MissingPin,
    /// The throttle interval must be non-zero.
    InvalidInterval,
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedSensor => write!(f, "DHT sensor type is not supported"),
            Self::InvalidMedian(n) => write!(f, "median count {n} must be a small odd number"),
            Self::MissingPin => write!(f, "no GPIO pin configured"),
            Self::InvalidInterval => write!(f, "minimum time between updates must be positive"),
        }
    }
}
