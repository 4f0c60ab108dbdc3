//! Median-filtered DHT humidity and temperature sensor for Embedded Rust
//!
//! This crate polls a DHT11, DHT22 or AM2302 sensor, throttles physical
//! reads, and smooths each measured quantity with a rolling lower median
//! before exposing it to the host.
//!
//! # Pipeline
//! - [`Dht`]: platform-agnostic bit-banged driver built on [`embedded-hal`]
//! - [`HardwareReader`]: throttled, cached access to one chip, shared by
//!   every sensor reading it
//! - [`FilteredSensor`]: one per quantity; pushes validated samples into a
//!   [`RollingWindow`] and displays the window's lower median
//! - [`DhtPlatform`]: validates a [`DhtConfig`] and wires the pieces together
//!
//! # Features
//! - Designed for `no_std` environments, no allocator required
//! - Logging through the [`log`] facade
//! - Optional `defmt`: implements `defmt::Format` for the public data types
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal
//! [`log`]: https://docs.rs/log

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod dht;
pub mod error;
pub mod platform;
pub mod reader;
pub mod sensor;
pub mod window;

pub use config::DhtConfig;
pub use dht::{ChipModel, Dht, Measurement};
pub use error::{DhtError, SetupError};
pub use platform::DhtPlatform;
pub use reader::{Clock, DhtDriver, HardwareReader, Reading};
pub use sensor::{FilteredSensor, Quantity, TemperatureUnit, Unit};
pub use window::{MAX_MEDIAN_COUNT, RollingWindow};
