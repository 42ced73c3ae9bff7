use std::time::Duration;

use nix::time::{clock_gettime, ClockId};
use thiserror::Error;

use crate::sensor::Edge;

/// Speed of sound in dry air at 20 °C
pub const SPEED_OF_SOUND_M_S: f64 = 343.0;

/// A single distance reading. Created per request, never retained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Seconds on the monotonic clock when the echo finished
    pub timestamp: f64,
    /// One-way distance to the target in meters
    pub distance_meters: f64,
    /// Width of the echo pulse (sound round trip)
    pub echo_duration: Duration,
}

impl Measurement {
    pub fn from_echo(echo_duration: Duration) -> Self {
        Measurement {
            timestamp: get_monotime(),
            distance_meters: distance_from_echo(echo_duration),
            echo_duration,
        }
    }
}

/// Converts an echo pulse width to the distance of the reflecting target.
///
/// The pulse covers the trip out and back, so the travelled distance is
/// halved.
pub fn distance_from_echo(echo_duration: Duration) -> f64 {
    echo_duration.as_secs_f64() * SPEED_OF_SOUND_M_S / 2.0
}

pub(crate) fn get_monotime() -> f64 {
    match clock_gettime(ClockId::CLOCK_MONOTONIC) {
        Ok(ts) => ts.tv_sec() as f64 + (ts.tv_nsec() as f64 / 1_000_000_000.0),

        Err(_) => 0.0, // never expecting this
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// Bad board or pin attributes. Fatal at construction.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The echo line never produced the expected edge.
    #[error("timed out after {waited:?} waiting for {edge} echo edge")]
    Timeout { edge: Edge, waited: Duration },
    /// GPIO access failed. The io error is passed through untouched.
    #[error("GPIO error: {0}")]
    Hardware(#[from] std::io::Error),
    /// Another measurement is already using the sensor.
    #[error("sensor busy: a measurement is already in progress")]
    Busy,
}

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_distance_from_echo() {
        let test_cases = vec![
            (0.0116, 1.9894),
            (0.0, 0.0),
            (0.001, 0.1715),
            (0.038, 6.517),
        ];

        for (seconds, expected) in test_cases {
            let distance = distance_from_echo(Duration::from_secs_f64(seconds));
            assert_relative_eq!(distance, expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_measurement_is_timestamped() {
        let before = get_monotime();
        let m = Measurement::from_echo(Duration::from_micros(5830));
        assert!(m.timestamp >= before);
        assert!(m.distance_meters >= 0.0);
        assert_relative_eq!(m.distance_meters, 0.999845, epsilon = 1e-9);
    }

    #[test]
    fn test_error_messages() {
        let err = Error::Timeout {
            edge: Edge::Rising,
            waited: Duration::from_millis(60),
        };
        assert_eq!(
            err.to_string(),
            "timed out after 60ms waiting for rising echo edge"
        );
        assert_eq!(
            Error::config("no such board").to_string(),
            "configuration error: no such board"
        );
    }
}
