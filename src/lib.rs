//! HC-SR04 ultrasonic distance sensor driver for Linux boards.
//!
//! The sensor is wired through two GPIO lines: a trigger output and an echo
//! input. Each measurement sends a 10 µs trigger pulse, times the echo pulse
//! with kernel edge timestamps and converts the round trip to meters.
//!
//! ```no_run
//! use hcsr04::{DistanceSensorDriver, SensorConfig};
//!
//! let config = SensorConfig::new("pi", "D23", "D24");
//! let sensor = DistanceSensorDriver::new(&config)?;
//! println!("{:.3} m", sensor.get_distance()?);
//! # Ok::<(), hcsr04::Error>(())
//! ```
//!
//! With the `python` feature the crate builds the `hcsr04` extension module
//! used by the robot host.

pub mod board;
pub mod config;
pub mod delay;
pub mod driver;
pub mod interrupt;
pub mod pin;
pub mod sensor;
mod types;

#[cfg(feature = "python")]
mod python;

pub use board::Board;
pub use config::{ResolvedConfig, SensorConfig, DEFAULT_TIMEOUT};
pub use delay::SpinDelay;
pub use driver::{DistanceSensorDriver, MeasurementState, TRIGGER_PULSE_US};
pub use interrupt::GpiodLines;
pub use pin::{PinId, PinNotation};
pub use sensor::{Edge, Level, SensorLines};
pub use types::{distance_from_echo, Error, Measurement, Result, SPEED_OF_SOUND_M_S};
